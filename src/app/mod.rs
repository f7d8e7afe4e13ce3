mod catalog;
mod favorites;
mod format;
mod model;
mod playback;
mod process;
mod tui;
mod view;

#[cfg(test)]
mod tests;

use anyhow::{Result, anyhow};

use crate::cli::{Cli, Command, ListArgs};
use crate::config::Settings;
use crate::db::{Database, FavoriteKind};

pub use self::view::SortOrder;

use self::catalog::{CatalogClient, CatalogLoad};
use self::favorites::FavoritesLedger;
use self::format::{
    format_date_added, format_position, format_updated, heart, single_line, truncate,
};
use self::model::Show;
use self::playback::{load_resume_state, play_and_record, record_progress, select_episode};
use self::view::{ViewQuery, compute_view, favorite_shows_view};

pub fn run(cli: Cli) -> Result<()> {
    let settings = Settings::resolve(cli.api_base.as_deref())?;
    let db = open_db(&settings)?;
    let client = CatalogClient::from_settings(&settings);

    match cli.command {
        Some(Command::List(args)) => run_list(&db, &client, &args)?,
        Some(Command::Show { show_id }) => run_show(&db, &client, &show_id)?,
        Some(Command::Favorite { show_id }) => {
            run_toggle_favorite(&db, FavoriteKind::Show, &show_id)
        }
        Some(Command::FavoriteEpisode { episode_id }) => {
            run_toggle_favorite(&db, FavoriteKind::Episode, &episode_id)
        }
        Some(Command::Favorites { sort }) => run_favorites(&db, &client, sort)?,
        Some(Command::Play {
            show_id,
            episode_id,
            start,
        }) => run_play(&db, &client, &settings, &show_id, &episode_id, start)?,
        Some(Command::Resume) => run_resume(&db, &client, &settings)?,
        Some(Command::Progress {
            show_id,
            episode_id,
            seconds,
        }) => {
            let state = record_progress(&db, &show_id, &episode_id, seconds)?;
            println!(
                "Saved position: show {} | episode {} at {}",
                state.show_id,
                state.episode_id,
                format_position(state.timestamp_seconds)
            );
        }
        Some(Command::Tui) | None => tui::run_tui(&db, &client, &settings)?,
    }

    Ok(())
}

fn open_db(settings: &Settings) -> Result<Database> {
    let db = Database::open(&settings.database_path)?;
    db.migrate()?;
    Ok(db)
}

fn emit_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!("Warning: {warning}");
    }
}

fn load_catalog_or_report(client: &CatalogClient) -> Result<Vec<Show>> {
    let CatalogLoad { shows, failures } = client
        .load_catalog()
        .map_err(|err| anyhow!("Failed to load podcasts: {err}"))?;
    let warnings: Vec<String> = failures
        .iter()
        .map(|failure| format!("show {} skipped: {}", failure.id, failure.reason))
        .collect();
    emit_warnings(&warnings);
    Ok(shows)
}

fn run_list(db: &Database, client: &CatalogClient, args: &ListArgs) -> Result<()> {
    let shows = load_catalog_or_report(client)?;
    let favorites = FavoritesLedger::load_or_default(db);
    let query = ViewQuery {
        search: args.search.as_deref(),
        genre: args.genre.as_deref(),
        sort: args.sort,
    };
    let view = compute_view(&shows, &query);
    if view.is_empty() {
        println!("No shows match.");
        return Ok(());
    }

    println!(
        "{:<2} {:<8} {:<40} {:<8} {:<11} {:<30}",
        "", "ID", "TITLE", "SEASONS", "UPDATED", "GENRES"
    );
    for show in &view {
        println!(
            "{:<2} {:<8} {:<40} {:<8} {:<11} {:<30}",
            heart(favorites.is_favorite(FavoriteKind::Show, &show.id)),
            truncate(&show.id, 8),
            truncate(&show.title, 40),
            show.seasons.len(),
            format_updated(show.updated),
            truncate(&show.genres_display(), 30)
        );
    }
    Ok(())
}

fn run_show(db: &Database, client: &CatalogClient, show_id: &str) -> Result<()> {
    let show = client.fetch_show(show_id)?;
    let favorites = FavoritesLedger::load_or_default(db);

    println!(
        "{} {}",
        heart(favorites.is_favorite(FavoriteKind::Show, &show.id)),
        show.title
    );
    println!("  Updated: {}", format_updated(show.updated));
    if !show.genres.is_empty() {
        println!("  Genres: {}", show.genres_display());
    }
    if !show.image.is_empty() {
        println!("  Artwork: {}", show.image);
    }
    println!("  {}", truncate(&single_line(&show.description), 200));
    for season in &show.seasons {
        println!("\n  {} ({} episodes)", season.title, season.episodes.len());
        for episode in &season.episodes {
            println!(
                "    {} {:>3}. {:<50} {}",
                heart(favorites.is_favorite(FavoriteKind::Episode, &episode.id)),
                episode.number,
                truncate(&episode.title, 50),
                episode.id
            );
        }
    }
    if !show.episodes.is_empty() {
        println!("\n  Other episodes");
        for episode in &show.episodes {
            println!(
                "    {} {:<55} {}",
                heart(favorites.is_favorite(FavoriteKind::Episode, &episode.id)),
                truncate(&episode.title, 55),
                episode.id
            );
        }
    }
    Ok(())
}

fn run_toggle_favorite(db: &Database, kind: FavoriteKind, id: &str) {
    let mut favorites = FavoritesLedger::load_or_default(db);
    let entry = favorites.toggle_persisted(db, kind, id);
    let noun = match kind {
        FavoriteKind::Show => "Show",
        FavoriteKind::Episode => "Episode",
    };
    if entry.is_favorite {
        println!(
            "{noun} {id} added to favorites ({}).",
            format_date_added(entry.date_added)
        );
    } else {
        println!("{noun} {id} removed from favorites.");
    }
}

fn run_favorites(db: &Database, client: &CatalogClient, sort: SortOrder) -> Result<()> {
    let favorites = FavoritesLedger::load_or_default(db);
    let show_ids = favorites.shows.favorites_list();
    let episode_ids = favorites.episodes.favorites_list();
    if show_ids.is_empty() && episode_ids.is_empty() {
        println!("You have no favorites yet.");
        return Ok(());
    }

    if !show_ids.is_empty() {
        let shows = load_catalog_or_report(client)?;
        let favorite_shows = favorite_shows_view(&shows, show_ids.iter().copied(), sort);
        println!("Favorite shows:");
        for show in &favorite_shows {
            let added = favorites
                .shows
                .get(&show.id)
                .map(|entry| format_date_added(entry.date_added))
                .unwrap_or_default();
            println!(
                "  {:<40} updated {:<11} added {}",
                truncate(&show.title, 40),
                format_updated(show.updated),
                added
            );
        }
        let missing = show_ids.len().saturating_sub(favorite_shows.len());
        if missing > 0 {
            println!("  ({missing} favorite show(s) no longer in the catalog)");
        }
    }

    if !episode_ids.is_empty() {
        println!("Favorite episodes:");
        for id in episode_ids {
            let added = favorites
                .episodes
                .get(id)
                .map(|entry| format_date_added(entry.date_added))
                .unwrap_or_default();
            println!("  {id:<30} added {added}");
        }
    }
    Ok(())
}

fn run_play(
    db: &Database,
    client: &CatalogClient,
    settings: &Settings,
    show_id: &str,
    episode_id: &str,
    start: f64,
) -> Result<()> {
    let (show, episode) = select_episode(&[], client, show_id, episode_id)?;
    println!("Playing {} | {}", show.title, episode.title);
    let message = play_and_record(db, &settings.player_bin, &show, &episode, start)?;
    println!("{message}");
    Ok(())
}

fn run_resume(db: &Database, client: &CatalogClient, settings: &Settings) -> Result<()> {
    let shows = load_catalog_or_report(client)?;
    let Some(state) = load_resume_state(db, &shows) else {
        println!("Nothing to resume. Play an episode first.");
        return Ok(());
    };

    let (show, episode) = select_episode(&shows, client, &state.show_id, &state.episode_id)?;
    println!(
        "Resuming {} | {} at {}",
        show.title,
        episode.title,
        format_position(state.timestamp_seconds)
    );
    let message = play_and_record(
        db,
        &settings.player_bin,
        &show,
        &episode,
        state.timestamp_seconds,
    )?;
    println!("{message}");
    Ok(())
}
