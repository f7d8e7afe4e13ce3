use std::sync::mpsc;

use anyhow::{Result, anyhow};

use crate::config::Settings;
use crate::db::{Database, FavoriteKind};

use super::super::catalog::{CatalogClient, LoadTicket};
use super::super::format::format_position;
use super::super::model::{Episode, Show};
use super::super::playback::{load_resume_state, play_and_record, select_episode};
use super::super::view::{ViewAction, compute_view, favorite_shows_view};
use super::{CatalogLoadResult, Expanded, Focus, LoadState, TuiState};

pub(crate) fn status_info(msg: &str) -> String {
    format!("INFO: {msg}")
}

pub(crate) fn status_error(msg: &str) -> String {
    format!("ERROR: {msg}")
}

/// Seasons in number order, then the show-level episode list when present.
pub(crate) fn episode_groups(show: &Show) -> Vec<(String, &[Episode])> {
    let mut groups: Vec<(String, &[Episode])> = show
        .seasons
        .iter()
        .map(|season| (season.title.clone(), season.episodes.as_slice()))
        .collect();
    if !show.episodes.is_empty() {
        groups.push(("Other episodes".to_string(), show.episodes.as_slice()));
    }
    groups
}

pub(super) fn spawn_catalog_load(
    client: CatalogClient,
    ticket: LoadTicket,
    tx: mpsc::Sender<CatalogLoadResult>,
) {
    std::thread::spawn(move || {
        let result = client.load_catalog().map_err(|err| err.to_string());
        let _ = tx.send(CatalogLoadResult { ticket, result });
    });
}

impl TuiState {
    pub(crate) fn apply_load_result(&mut self, result: CatalogLoadResult, db: &Database) {
        if !self.store.is_current(result.ticket) {
            tracing::debug!(
                generation = result.ticket.generation(),
                "ignoring result of superseded load"
            );
            return;
        }

        let load = match result.result {
            Ok(load) => load,
            Err(err) => {
                self.load = LoadState::Failed(err.clone());
                self.status = status_error(&format!("Failed to load podcasts: {err}"));
                return;
            }
        };

        let failed = load.failures.len();
        self.store.commit(result.ticket, load.shows);
        self.load = LoadState::Ready;
        self.refresh_view();
        self.resume = load_resume_state(db, self.store.shows());

        let mut message = format!("Loaded {} shows.", self.store.shows().len());
        if failed > 0 {
            message.push_str(&format!(" {failed} show(s) could not be loaded."));
        }
        if let Some(resume) = &self.resume {
            message.push_str(&format!(
                " Press p to resume at {}.",
                format_position(resume.timestamp_seconds)
            ));
        }
        self.status = status_info(&message);
    }

    /// Recomputes the displayed list, keeping the selected show when it
    /// survives the new filter.
    pub(crate) fn refresh_view(&mut self) {
        let selected_id = self.selected_show().map(|show| show.id.clone());
        self.view = compute_view(self.store.shows(), &self.view_state.query());

        if self.view.is_empty() {
            self.table_state.select(None);
        } else {
            let idx = selected_id
                .and_then(|id| self.view.iter().position(|show| show.id == id))
                .unwrap_or(0);
            self.table_state.select(Some(idx));
        }

        let expanded_visible = self
            .expanded
            .as_ref()
            .is_some_and(|expanded| self.view.iter().any(|show| show.id == expanded.show_id));
        if !expanded_visible {
            self.expanded = None;
            self.focus = Focus::Library;
        }
    }

    fn apply_view_action(&mut self, action: ViewAction) {
        self.view_state.apply(action);
        self.refresh_view();
        self.status = status_info(&format!(
            "{} | {} shows",
            self.view_state.describe(),
            self.view.len()
        ));
    }

    pub(crate) fn submit_search(&mut self, term: String) {
        self.genre_cursor = 0;
        self.apply_view_action(ViewAction::Search(term));
    }

    pub(crate) fn cycle_sort(&mut self) {
        let next = self.view_state.sort.cycle();
        self.apply_view_action(ViewAction::Sort(next));
    }

    /// Filters by the selected show's genres, one more genre per press.
    pub(crate) fn cycle_genre(&mut self) {
        let Some(show) = self.selected_show() else {
            self.status = status_error("No show selected.");
            return;
        };
        if show.genres.is_empty() {
            self.status = status_error("Selected show has no genres.");
            return;
        }
        let genre = show.genres[self.genre_cursor % show.genres.len()].clone();
        self.genre_cursor = self.genre_cursor.wrapping_add(1);
        self.apply_view_action(ViewAction::GenreClick(genre));
    }

    /// Favorite shows for the side panel, ordered by the panel's own sort.
    pub(crate) fn favorite_panel_shows(&self) -> Vec<Show> {
        favorite_shows_view(
            self.store.shows(),
            self.favorites.shows.favorites_list(),
            self.favorites_sort,
        )
    }

    pub(crate) fn cycle_favorites_sort(&mut self) {
        self.favorites_sort = self.favorites_sort.cycle();
        self.status = status_info(&format!("Favorites: {}", self.favorites_sort.label()));
    }

    pub(crate) fn clear_filter(&mut self) {
        self.genre_cursor = 0;
        self.apply_view_action(ViewAction::ClearFilter);
    }

    pub(crate) fn expanded_show(&self) -> Option<&Show> {
        let expanded = self.expanded.as_ref()?;
        self.store.find_show(&expanded.show_id)
    }

    pub(crate) fn selected_episode(&self) -> Option<(&Show, &Episode)> {
        let expanded = self.expanded.as_ref()?;
        let show = self.store.find_show(&expanded.show_id)?;
        let episodes: &[Episode] = episode_groups(show).get(expanded.season_idx)?.1;
        let episode = episodes.get(expanded.episode_idx)?;
        Some((show, episode))
    }

    pub(crate) fn move_selection(&mut self, delta: i32) {
        match self.focus {
            Focus::Library => {
                if self.view.is_empty() {
                    return;
                }
                let current = self.table_state.selected().unwrap_or(0);
                let next = step_index(current, delta, self.view.len());
                if next != current {
                    self.genre_cursor = 0;
                }
                self.table_state.select(Some(next));
            }
            Focus::Episodes => {
                let Some(len) = self.current_group_len() else {
                    return;
                };
                if let Some(expanded) = self.expanded.as_mut() {
                    expanded.episode_idx = step_index(expanded.episode_idx, delta, len);
                }
            }
        }
    }

    fn current_group_len(&self) -> Option<usize> {
        let expanded = self.expanded.as_ref()?;
        let show = self.store.find_show(&expanded.show_id)?;
        episode_groups(show)
            .get(expanded.season_idx)
            .map(|(_, episodes)| episodes.len())
    }

    pub(crate) fn step_season(&mut self, delta: i32) {
        let Some(group_count) = self.expanded_show().map(|show| episode_groups(show).len())
        else {
            return;
        };
        if let Some(expanded) = self.expanded.as_mut() {
            let next = step_index(expanded.season_idx, delta, group_count);
            if next != expanded.season_idx {
                expanded.season_idx = next;
                expanded.episode_idx = 0;
            }
        }
    }

    pub(crate) fn toggle_expanded(&mut self) {
        let Some(show) = self.selected_show() else {
            return;
        };
        if self
            .expanded
            .as_ref()
            .is_some_and(|expanded| expanded.show_id == show.id)
        {
            self.collapse();
            return;
        }
        if show.episode_count() == 0 {
            self.status = status_info("This show has no episodes yet.");
            return;
        }
        self.expanded = Some(Expanded {
            show_id: show.id.clone(),
            season_idx: 0,
            episode_idx: 0,
        });
        self.focus = Focus::Episodes;
    }

    pub(crate) fn collapse(&mut self) {
        self.expanded = None;
        self.focus = Focus::Library;
    }

    pub(crate) fn toggle_focused_favorite(&mut self, db: &Database) {
        let (kind, id, title) = match self.focus {
            Focus::Episodes => match self.selected_episode() {
                Some((_, episode)) => (
                    FavoriteKind::Episode,
                    episode.id.clone(),
                    episode.title.clone(),
                ),
                None => return,
            },
            Focus::Library => match self.selected_show() {
                Some(show) => (FavoriteKind::Show, show.id.clone(), show.title.clone()),
                None => return,
            },
        };

        let entry = self.favorites.toggle_persisted(db, kind, &id);
        self.status = if entry.is_favorite {
            status_info(&format!("Added to favorites: {title}"))
        } else {
            status_info(&format!("Removed from favorites: {title}"))
        };
    }

    pub(crate) fn finish_playback(&mut self, result: Result<String>, db: &Database) {
        self.status = match result {
            Ok(message) => status_info(&message),
            Err(err) => status_error(&format!("Playback failed: {err:#}")),
        };
        self.resume = load_resume_state(db, self.store.shows());
    }
}

fn step_index(current: usize, delta: i32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let max = len - 1;
    if delta < 0 {
        current.saturating_sub(delta.unsigned_abs() as usize)
    } else {
        current.saturating_add(delta as usize).min(max)
    }
}

pub(super) fn play_selected_episode(
    state: &TuiState,
    db: &Database,
    client: &CatalogClient,
    settings: &Settings,
) -> Result<String> {
    let (show, episode) = state
        .selected_episode()
        .ok_or_else(|| anyhow!("no episode selected"))?;
    let start = state
        .resume
        .as_ref()
        .filter(|resume| resume.show_id == show.id && resume.episode_id == episode.id)
        .map(|resume| resume.timestamp_seconds)
        .unwrap_or(0.0);

    let (show, episode) = select_episode(state.store.shows(), client, &show.id, &episode.id)?;
    play_and_record(db, &settings.player_bin, &show, &episode, start)
}

pub(super) fn resume_last_episode(
    state: &TuiState,
    db: &Database,
    client: &CatalogClient,
    settings: &Settings,
) -> Result<String> {
    let resume = state
        .resume
        .as_ref()
        .ok_or_else(|| anyhow!("nothing to resume"))?;
    let (show, episode) = select_episode(
        state.store.shows(),
        client,
        &resume.show_id,
        &resume.episode_id,
    )?;
    play_and_record(
        db,
        &settings.player_bin,
        &show,
        &episode,
        resume.timestamp_seconds,
    )
}
