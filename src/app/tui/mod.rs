mod actions;
mod render;

use std::io;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, enable_raw_mode};
use ratatui::DefaultTerminal;
use ratatui::widgets::TableState;

use crate::config::Settings;
use crate::db::Database;

use super::catalog::{CatalogClient, CatalogLoad, CatalogStore, LoadTicket};
use super::favorites::FavoritesLedger;
use super::model::Show;
use super::playback::PlaybackState;
use super::view::{SortOrder, ViewFilter, ViewState};

use self::actions::{play_selected_episode, resume_last_episode, spawn_catalog_load};
use self::render::draw_tui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Focus {
    Library,
    Episodes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InputMode {
    Normal,
    Search { buffer: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

/// Drill-down position inside one show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Expanded {
    pub(crate) show_id: String,
    pub(crate) season_idx: usize,
    pub(crate) episode_idx: usize,
}

#[derive(Debug)]
pub(crate) struct CatalogLoadResult {
    pub(crate) ticket: LoadTicket,
    pub(crate) result: Result<CatalogLoad, String>,
}

/// Everything the directory screen shows. Key handlers mutate it only through
/// the methods in `actions`.
#[derive(Debug)]
pub(crate) struct TuiState {
    pub(crate) store: CatalogStore,
    pub(crate) view_state: ViewState,
    pub(crate) view: Vec<Show>,
    pub(crate) table_state: TableState,
    pub(crate) favorites: FavoritesLedger,
    pub(crate) expanded: Option<Expanded>,
    pub(crate) focus: Focus,
    pub(crate) input: InputMode,
    pub(crate) load: LoadState,
    pub(crate) genre_cursor: usize,
    pub(crate) show_favorites_panel: bool,
    pub(crate) favorites_sort: SortOrder,
    pub(crate) resume: Option<PlaybackState>,
    pub(crate) status: String,
}

impl TuiState {
    pub(crate) fn new(favorites: FavoritesLedger) -> Self {
        Self {
            store: CatalogStore::default(),
            view_state: ViewState::default(),
            view: Vec::new(),
            table_state: TableState::default(),
            favorites,
            expanded: None,
            focus: Focus::Library,
            input: InputMode::Normal,
            load: LoadState::Loading,
            genre_cursor: 0,
            show_favorites_panel: false,
            favorites_sort: SortOrder::None,
            resume: None,
            status: actions::status_info("Loading podcasts..."),
        }
    }

    pub(crate) fn selected_show(&self) -> Option<&Show> {
        self.table_state.selected().and_then(|idx| self.view.get(idx))
    }
}

pub(crate) fn run_tui(db: &Database, client: &CatalogClient, settings: &Settings) -> Result<()> {
    let mut terminal = ratatui::try_init().context("failed to initialize terminal")?;
    let result = event_loop(&mut terminal, db, client, settings);
    ratatui::try_restore().context("failed to restore terminal")?;
    result
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    db: &Database,
    client: &CatalogClient,
    settings: &Settings,
) -> Result<()> {
    let mut state = TuiState::new(FavoritesLedger::load_or_default(db));
    let (load_tx, load_rx) = mpsc::channel::<CatalogLoadResult>();
    let ticket = state.store.begin_load();
    spawn_catalog_load(client.clone(), ticket, load_tx.clone());

    loop {
        while let Ok(result) = load_rx.try_recv() {
            state.apply_load_result(result, db);
        }

        terminal.draw(|frame| draw_tui(frame, &mut state))?;

        if !event::poll(Duration::from_millis(200))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if let InputMode::Search { buffer } = &mut state.input {
            match key.code {
                KeyCode::Enter => {
                    let term = std::mem::take(buffer);
                    state.input = InputMode::Normal;
                    state.submit_search(term);
                }
                KeyCode::Esc => {
                    state.input = InputMode::Normal;
                    state.status = actions::status_info("Search canceled.");
                }
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Char(ch) => buffer.push(ch),
                _ => {}
            }
            continue;
        }

        match handle_key(&mut state, key, db) {
            KeyOutcome::Quit => return Ok(()),
            KeyOutcome::Handled => {}
            KeyOutcome::Reload => {
                let ticket = state.store.begin_load();
                state.load = LoadState::Loading;
                state.status = actions::status_info("Reloading podcasts...");
                spawn_catalog_load(client.clone(), ticket, load_tx.clone());
            }
            KeyOutcome::Play => {
                let result = with_player_in_foreground(terminal, || {
                    play_selected_episode(&state, db, client, settings)
                })?;
                state.finish_playback(result, db);
            }
            KeyOutcome::Resume => {
                let result = with_player_in_foreground(terminal, || {
                    resume_last_episode(&state, db, client, settings)
                })?;
                state.finish_playback(result, db);
            }
        }
    }
}

/// Hands the plain terminal to the player for the duration of `play`, then
/// redraws the directory from scratch.
fn with_player_in_foreground<T>(
    terminal: &mut DefaultTerminal,
    play: impl FnOnce() -> T,
) -> Result<T> {
    ratatui::try_restore().context("failed to release terminal for the player")?;
    let outcome = play();
    enable_raw_mode().context("failed to enable raw mode")?;
    execute!(io::stdout(), EnterAlternateScreen).context("failed to enter alternate screen")?;
    terminal.clear()?;
    Ok(outcome)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyOutcome {
    Handled,
    Quit,
    Reload,
    Play,
    Resume,
}

pub(crate) fn handle_key(state: &mut TuiState, key: KeyEvent, db: &Database) -> KeyOutcome {
    match key.code {
        KeyCode::Char('q') => return KeyOutcome::Quit,
        KeyCode::Char('r') => return KeyOutcome::Reload,
        KeyCode::Char('p') => return KeyOutcome::Resume,
        KeyCode::Char('/') => {
            let buffer = match &state.view_state.filter {
                ViewFilter::Search(term) => term.clone(),
                _ => String::new(),
            };
            state.input = InputMode::Search { buffer };
        }
        KeyCode::Char('o') => state.cycle_sort(),
        KeyCode::Char('g') => state.cycle_genre(),
        KeyCode::Char('c') => state.clear_filter(),
        KeyCode::Char('v') => state.show_favorites_panel = !state.show_favorites_panel,
        KeyCode::Char('s') if state.show_favorites_panel => state.cycle_favorites_sort(),
        KeyCode::Char('f') => state.toggle_focused_favorite(db),
        KeyCode::Up => state.move_selection(-1),
        KeyCode::Down => state.move_selection(1),
        KeyCode::Left if state.focus == Focus::Episodes => state.step_season(-1),
        KeyCode::Right if state.focus == Focus::Episodes => state.step_season(1),
        KeyCode::Esc => state.collapse(),
        KeyCode::Enter => match state.focus {
            Focus::Library => state.toggle_expanded(),
            Focus::Episodes => return KeyOutcome::Play,
        },
        _ => {}
    }
    KeyOutcome::Handled
}
