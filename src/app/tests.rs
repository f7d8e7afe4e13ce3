use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::db::{Database, FavoriteKind};
use crate::http::RetryPolicy;
use crate::http::test_server::{Behavior, TestServer};

use super::catalog::{CatalogClient, CatalogLoad, DetailFailure, FanoutPolicy};
use super::favorites::FavoritesLedger;
use super::model::Show;
use super::playback::{record_progress, select_episode};
use super::tui::{CatalogLoadResult, Focus, KeyOutcome, LoadState, TuiState, handle_key};
use super::view::{SortOrder, ViewFilter};

const ALPHA: &str = r#"{"id":"1","title":"Alpha","description":"first","genres":["Comedy","History"],"updated":"2024-01-01","seasons":[{"season":1,"episodes":[{"title":"A1","episode":1,"file":"https://cdn.test/a1.mp3"},{"title":"A2","episode":2,"file":"https://cdn.test/a2.mp3"}]},{"season":2,"episodes":[{"title":"A3","episode":1,"file":"https://cdn.test/a3.mp3"}]}]}"#;
const BETA: &str = r#"{"id":"2","title":"Beta","description":"second","genres":["History"],"updated":"2024-06-01","seasons":[{"season":1,"episodes":[{"title":"B1","episode":1,"file":"https://cdn.test/b1.mp3"}]}]}"#;

fn show(raw: &str) -> Show {
    Show::from_detail(serde_json::from_str(raw).expect("detail json"))
}

fn catalog() -> Vec<Show> {
    vec![show(ALPHA), show(BETA)]
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn titles(state: &TuiState) -> Vec<&str> {
    state.view.iter().map(|show| show.title.as_str()).collect()
}

fn loaded_state(db: &Database) -> TuiState {
    let mut state = TuiState::new(FavoritesLedger::load_or_default(db));
    let ticket = state.store.begin_load();
    state.apply_load_result(
        CatalogLoadResult {
            ticket,
            result: Ok(CatalogLoad {
                shows: catalog(),
                failures: Vec::new(),
            }),
        },
        db,
    );
    state
}

fn quick_retry() -> RetryPolicy {
    RetryPolicy {
        connect_timeout: Duration::from_millis(250),
        read_timeout: Duration::from_millis(500),
        attempts: 1,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(1),
    }
}

#[test]
fn successful_load_selects_first_show_and_reports_count() {
    let db = Database::open_in_memory().expect("db");
    let state = loaded_state(&db);

    assert_eq!(state.load, LoadState::Ready);
    assert_eq!(titles(&state), vec!["Alpha", "Beta"]);
    assert_eq!(state.table_state.selected(), Some(0));
    assert_eq!(state.status, "INFO: Loaded 2 shows.");
}

#[test]
fn superseded_load_result_is_ignored() {
    let db = Database::open_in_memory().expect("db");
    let mut state = TuiState::new(FavoritesLedger::default());
    let first = state.store.begin_load();
    let second = state.store.begin_load();

    state.apply_load_result(
        CatalogLoadResult {
            ticket: second,
            result: Ok(CatalogLoad {
                shows: catalog(),
                failures: Vec::new(),
            }),
        },
        &db,
    );
    state.apply_load_result(
        CatalogLoadResult {
            ticket: first,
            result: Err("index unavailable".to_string()),
        },
        &db,
    );

    assert_eq!(state.load, LoadState::Ready);
    assert_eq!(titles(&state), vec!["Alpha", "Beta"]);
}

#[test]
fn failed_load_keeps_previous_catalog_visible() {
    let db = Database::open_in_memory().expect("db");
    let mut state = loaded_state(&db);
    let ticket = state.store.begin_load();

    state.apply_load_result(
        CatalogLoadResult {
            ticket,
            result: Err("HTTP 503".to_string()),
        },
        &db,
    );

    assert_eq!(state.load, LoadState::Failed("HTTP 503".to_string()));
    assert_eq!(state.store.shows().len(), 2);
    assert!(state.status.starts_with("ERROR: Failed to load podcasts"));
}

#[test]
fn partial_load_mentions_skipped_shows() {
    let db = Database::open_in_memory().expect("db");
    let mut state = TuiState::new(FavoritesLedger::default());
    let ticket = state.store.begin_load();

    state.apply_load_result(
        CatalogLoadResult {
            ticket,
            result: Ok(CatalogLoad {
                shows: vec![show(ALPHA)],
                failures: vec![DetailFailure {
                    id: "2".to_string(),
                    reason: "HTTP 404".to_string(),
                }],
            }),
        },
        &db,
    );

    assert_eq!(titles(&state), vec!["Alpha"]);
    assert!(state.status.contains("1 show(s) could not be loaded"));
}

#[test]
fn genre_key_cycles_through_selected_show_genres() {
    let db = Database::open_in_memory().expect("db");
    let mut state = loaded_state(&db);

    handle_key(&mut state, key(KeyCode::Char('g')), &db);
    assert_eq!(state.view_state.filter, ViewFilter::Genre("Comedy".to_string()));
    assert_eq!(titles(&state), vec!["Alpha"]);

    handle_key(&mut state, key(KeyCode::Char('g')), &db);
    assert_eq!(state.view_state.filter, ViewFilter::Genre("History".to_string()));
    assert_eq!(titles(&state), vec!["Alpha", "Beta"]);

    handle_key(&mut state, key(KeyCode::Char('c')), &db);
    assert_eq!(state.view_state.filter, ViewFilter::All);
}

#[test]
fn search_replaces_an_active_genre_filter() {
    let db = Database::open_in_memory().expect("db");
    let mut state = loaded_state(&db);

    state.cycle_genre();
    state.submit_search("bet".to_string());

    assert_eq!(state.view_state.filter, ViewFilter::Search("bet".to_string()));
    assert_eq!(titles(&state), vec!["Beta"]);
}

#[test]
fn sorting_keeps_the_selected_show_selected() {
    let db = Database::open_in_memory().expect("db");
    let mut state = loaded_state(&db);
    handle_key(&mut state, key(KeyCode::Down), &db);
    assert_eq!(state.selected_show().map(|show| show.id.as_str()), Some("2"));

    while state.view_state.sort != SortOrder::TitleDesc {
        handle_key(&mut state, key(KeyCode::Char('o')), &db);
    }

    assert_eq!(titles(&state), vec!["Beta", "Alpha"]);
    assert_eq!(state.selected_show().map(|show| show.id.as_str()), Some("2"));
}

#[test]
fn favorite_key_toggles_selected_show_and_persists() {
    let db = Database::open_in_memory().expect("db");
    let mut state = loaded_state(&db);

    handle_key(&mut state, key(KeyCode::Char('f')), &db);
    assert!(state.favorites.is_favorite(FavoriteKind::Show, "1"));
    assert_eq!(state.status, "INFO: Added to favorites: Alpha");

    let reloaded = FavoritesLedger::load(&db).expect("reload");
    assert!(reloaded.is_favorite(FavoriteKind::Show, "1"));
    assert!(!reloaded.is_favorite(FavoriteKind::Show, "2"));

    handle_key(&mut state, key(KeyCode::Char('f')), &db);
    let reloaded = FavoritesLedger::load(&db).expect("reload");
    assert!(!reloaded.is_favorite(FavoriteKind::Show, "1"));
    assert!(reloaded.shows.get("1").is_some());
}

#[test]
fn episode_drill_down_navigates_seasons_and_favorites_episodes() {
    let db = Database::open_in_memory().expect("db");
    let mut state = loaded_state(&db);

    handle_key(&mut state, key(KeyCode::Enter), &db);
    assert_eq!(state.focus, Focus::Episodes);
    handle_key(&mut state, key(KeyCode::Down), &db);
    assert_eq!(
        state.selected_episode().map(|(_, episode)| episode.id.as_str()),
        Some("1-s1-e2")
    );

    handle_key(&mut state, key(KeyCode::Right), &db);
    assert_eq!(
        state.selected_episode().map(|(_, episode)| episode.id.as_str()),
        Some("1-s2-e1")
    );
    handle_key(&mut state, key(KeyCode::Right), &db);
    assert_eq!(state.expanded.as_ref().map(|e| e.season_idx), Some(1));

    handle_key(&mut state, key(KeyCode::Char('f')), &db);
    assert!(state.favorites.is_favorite(FavoriteKind::Episode, "1-s2-e1"));
    assert!(!state.favorites.is_favorite(FavoriteKind::Show, "1"));

    assert_eq!(handle_key(&mut state, key(KeyCode::Enter), &db), KeyOutcome::Play);
    handle_key(&mut state, key(KeyCode::Esc), &db);
    assert_eq!(state.focus, Focus::Library);
    assert!(state.expanded.is_none());
}

#[test]
fn filtering_out_the_expanded_show_collapses_it() {
    let db = Database::open_in_memory().expect("db");
    let mut state = loaded_state(&db);
    state.toggle_expanded();
    assert_eq!(state.focus, Focus::Episodes);

    state.submit_search("beta".to_string());

    assert!(state.expanded.is_none());
    assert_eq!(state.focus, Focus::Library);
}

#[test]
fn resume_point_is_restored_after_load() {
    let db = Database::open_in_memory().expect("db");
    record_progress(&db, "1", "1-s1-e2", 125.0).expect("record");

    let state = loaded_state(&db);

    let resume = state.resume.as_ref().expect("resume point");
    assert_eq!(resume.episode_id, "1-s1-e2");
    assert!(state.status.contains("Press p to resume at 2:05"));
}

#[test]
fn resume_point_for_a_show_missing_from_the_fresh_catalog_is_dropped() {
    let db = Database::open_in_memory().expect("db");
    record_progress(&db, "77", "77-s1-e1", 30.0).expect("record");

    let state = loaded_state(&db);

    assert!(state.resume.is_none());
    assert!(db.read_state("last_listened").expect("read").is_some());
}

#[test]
fn select_episode_fetches_detail_when_canonical_record_lacks_audio() {
    let detail = r#"{"id":"5","title":"Gamma","seasons":[{"season":1,"episodes":[{"title":"G1","episode":1,"file":"https://cdn.test/g1.mp3"}]}]}"#;
    let server = TestServer::spawn(vec![(
        "/id/5",
        vec![Behavior::Respond(200, detail.to_string())],
    )]);
    let client =
        CatalogClient::new(&server.base_url, 1, FanoutPolicy::Partial).with_retry(quick_retry());
    let stale = show(
        r#"{"id":"5","title":"Gamma","seasons":[{"season":1,"episodes":[{"title":"G1","episode":1}]}]}"#,
    );

    let (_, episode) = select_episode(&[stale], &client, "5", "5-s1-e1").expect("fetched");

    assert_eq!(episode.file, "https://cdn.test/g1.mp3");
    assert_eq!(server.request_count(), 1);
}

#[test]
fn select_episode_reports_unknown_episode() {
    let server = TestServer::spawn(vec![(
        "/id/2",
        vec![Behavior::Respond(200, BETA.to_string())],
    )]);
    let client =
        CatalogClient::new(&server.base_url, 1, FanoutPolicy::Partial).with_retry(quick_retry());

    let err = select_episode(&[], &client, "2", "2-s9-e9").expect_err("missing episode");
    assert!(err.to_string().contains("2-s9-e9"));
}

#[test]
fn full_catalog_load_feeds_the_directory_state() {
    let server = TestServer::spawn(vec![
        (
            "/shows",
            vec![Behavior::Respond(
                200,
                r#"[{"id":"1"},{"id":"2"}]"#.to_string(),
            )],
        ),
        ("/id/1", vec![Behavior::Respond(200, ALPHA.to_string())]),
        ("/id/2", vec![Behavior::Respond(200, BETA.to_string())]),
    ]);
    let client =
        CatalogClient::new(&server.base_url, 2, FanoutPolicy::Partial).with_retry(quick_retry());
    let db = Database::open_in_memory().expect("db");
    let mut state = TuiState::new(FavoritesLedger::default());
    let ticket = state.store.begin_load();

    let result = client.load_catalog().map_err(|err| err.to_string());
    state.apply_load_result(CatalogLoadResult { ticket, result }, &db);

    handle_key(&mut state, key(KeyCode::Char('o')), &db);
    handle_key(&mut state, key(KeyCode::Char('o')), &db);
    assert_eq!(state.view_state.sort, SortOrder::TitleDesc);
    assert_eq!(titles(&state), vec!["Beta", "Alpha"]);
}

#[test]
fn favorites_panel_has_its_own_sort_order() {
    let db = Database::open_in_memory().expect("db");
    let mut state = loaded_state(&db);
    handle_key(&mut state, key(KeyCode::Down), &db);
    handle_key(&mut state, key(KeyCode::Char('f')), &db);
    handle_key(&mut state, key(KeyCode::Up), &db);
    handle_key(&mut state, key(KeyCode::Char('f')), &db);

    let panel_titles = |state: &TuiState| -> Vec<String> {
        state
            .favorite_panel_shows()
            .into_iter()
            .map(|show| show.title)
            .collect()
    };
    assert_eq!(panel_titles(&state), vec!["Beta", "Alpha"]);

    handle_key(&mut state, key(KeyCode::Char('s')), &db);
    assert_eq!(state.favorites_sort, SortOrder::None);

    handle_key(&mut state, key(KeyCode::Char('v')), &db);
    handle_key(&mut state, key(KeyCode::Char('s')), &db);
    assert_eq!(state.favorites_sort, SortOrder::TitleAsc);
    assert_eq!(panel_titles(&state), vec!["Alpha", "Beta"]);
    assert_eq!(state.view_state.sort, SortOrder::None);
    assert_eq!(titles(&state), vec!["Alpha", "Beta"]);
}

#[test]
fn favoriting_one_of_two_same_numbered_episodes_marks_only_that_one() {
    let db = Database::open_in_memory().expect("db");
    let mut state = TuiState::new(FavoritesLedger::default());
    let ticket = state.store.begin_load();
    state.apply_load_result(
        CatalogLoadResult {
            ticket,
            result: Ok(CatalogLoad {
                shows: vec![show(
                    r#"{"id":"9","title":"Reruns","seasons":[{"season":1,"episodes":[{"title":"Take one","episode":1},{"title":"Take two","episode":1}]}]}"#,
                )],
                failures: Vec::new(),
            }),
        },
        &db,
    );

    handle_key(&mut state, key(KeyCode::Enter), &db);
    handle_key(&mut state, key(KeyCode::Down), &db);
    handle_key(&mut state, key(KeyCode::Char('f')), &db);

    let shown = &state.store.shows()[0].seasons[0].episodes;
    let hearts: Vec<bool> = shown
        .iter()
        .map(|episode| state.favorites.is_favorite(FavoriteKind::Episode, &episode.id))
        .collect();
    assert_eq!(hearts, vec![false, true]);
}
