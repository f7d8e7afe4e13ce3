use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};

use crate::db::FavoriteKind;

use super::super::format::{
    format_date_added, format_position, format_updated, heart, single_line, truncate,
};
use super::actions::episode_groups;
use super::{Focus, InputMode, LoadState, TuiState};

const ACCENT: Color = Color::Rgb(110, 170, 255);
const MUTED: Color = Color::Rgb(185, 195, 210);
const TEXT: Color = Color::Rgb(230, 235, 242);
const HEART: Color = Color::Rgb(255, 110, 130);

pub(super) fn draw_tui(frame: &mut Frame, state: &mut TuiState) {
    let bg = Block::default().style(Style::default().bg(Color::Black));
    frame.render_widget(bg, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_header(frame, state, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
        .split(chunks[1]);

    if state.show_favorites_panel {
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(6), Constraint::Length(9)])
            .split(body[0]);
        draw_library(frame, state, left[0]);
        draw_favorites(frame, state, left[1]);
    } else {
        draw_library(frame, state, body[0]);
    }

    if state.focus == Focus::Episodes {
        draw_episodes(frame, state, body[1]);
    } else {
        draw_show_details(frame, state, body[1]);
    }

    let controls = Paragraph::new(controls_line(state))
        .alignment(Alignment::Center)
        .block(panel_block("Controls"));
    frame.render_widget(controls, chunks[2]);

    let status = Paragraph::new(state.status.clone())
        .style(status_style(&state.status))
        .block(panel_block("Status"));
    frame.render_widget(status, chunks[3]);
}

fn draw_header(frame: &mut Frame, state: &TuiState, area: Rect) {
    let mut spans = vec![
        Span::styled(
            "PODGRID",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled(
            format!("{}/{} shows", state.view.len(), state.store.shows().len()),
            Style::default().fg(MUTED),
        ),
        Span::raw("   "),
        Span::styled(state.view_state.describe(), Style::default().fg(Color::Yellow)),
    ];
    if let InputMode::Search { buffer } = &state.input {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            format!("search: {buffer}_"),
            Style::default().fg(TEXT).add_modifier(Modifier::BOLD),
        ));
    }
    let header = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(panel_block("Directory"));
    frame.render_widget(header, area);
}

fn draw_library(frame: &mut Frame, state: &mut TuiState, area: Rect) {
    match &state.load {
        LoadState::Loading if !state.store.is_loaded() => {
            let loading = Paragraph::new("Loading...")
                .alignment(Alignment::Center)
                .style(Style::default().fg(MUTED))
                .block(panel_block("Library"));
            frame.render_widget(loading, area);
            return;
        }
        LoadState::Failed(err) if !state.store.is_loaded() => {
            let failed = Paragraph::new(format!(
                "Failed to load podcasts.\n\n{err}\n\nPress r to try again."
            ))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(Color::Rgb(255, 145, 120)))
            .block(panel_block("Library"));
            frame.render_widget(failed, area);
            return;
        }
        _ => {}
    }

    let rows: Vec<Row> = state
        .view
        .iter()
        .map(|show| {
            let favorite = state.favorites.is_favorite(FavoriteKind::Show, &show.id);
            Row::new(vec![
                Cell::from(heart(favorite)).style(heart_style(favorite)),
                Cell::from(show.title.clone()),
                Cell::from(show.seasons.len().to_string()),
                Cell::from(format_updated(show.updated)),
                Cell::from(show.genres_display()),
            ])
        })
        .collect();

    let title = if matches!(state.load, LoadState::Loading) {
        "Library (reloading)"
    } else {
        "Library"
    };
    let table = Table::new(
        rows,
        [
            Constraint::Length(2),
            Constraint::Percentage(45),
            Constraint::Length(8),
            Constraint::Length(11),
            Constraint::Min(10),
        ],
    )
    .header(
        Row::new(vec!["", "Title", "Seasons", "Updated", "Genres"])
            .style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
    )
    .block(panel_block(title))
    .row_highlight_style(
        Style::default()
            .bg(ACCENT)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("▸ ");
    frame.render_stateful_widget(table, area, &mut state.table_state);
}

fn draw_favorites(frame: &mut Frame, state: &TuiState, area: Rect) {
    let shows = state.favorite_panel_shows();
    let episode_count = state.favorites.episodes.favorites_list().len();

    let mut lines: Vec<Line> = shows
        .iter()
        .map(|show| {
            let added = state
                .favorites
                .shows
                .get(&show.id)
                .map(|entry| format_date_added(entry.date_added))
                .unwrap_or_default();
            Line::from(vec![
                Span::styled("♥ ", heart_style(true)),
                Span::styled(truncate(&show.title, 36), Style::default().fg(TEXT)),
                Span::styled(format!("  added {added}"), Style::default().fg(MUTED)),
            ])
        })
        .collect();
    if lines.is_empty() {
        lines.push(Line::from("You have no favorite shows yet."));
    }
    lines.push(Line::from(Span::styled(
        format!(
            "{episode_count} favorite episode(s) | {} (s to change)",
            state.favorites_sort.label()
        ),
        Style::default().fg(MUTED),
    )));

    let panel = Paragraph::new(lines).block(panel_block("Favorites"));
    frame.render_widget(panel, area);
}

fn draw_show_details(frame: &mut Frame, state: &TuiState, area: Rect) {
    let Some(show) = state.selected_show() else {
        let empty = Paragraph::new("No show selected.")
            .style(Style::default().fg(MUTED))
            .block(panel_block("Show"));
        frame.render_widget(empty, area);
        return;
    };

    let favorite = state.favorites.shows.get(&show.id).filter(|entry| entry.is_favorite);
    let mut lines = vec![
        Line::from(Span::styled(
            show.title.clone(),
            Style::default().fg(TEXT).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("Updated   {}", format_updated(show.updated))),
        Line::from(format!(
            "Seasons   {} ({} episodes)",
            show.seasons.len(),
            show.episode_count()
        )),
        Line::from(format!("Genres    {}", show.genres_display())),
    ];
    if let Some(entry) = favorite {
        lines.push(Line::from(Span::styled(
            format!("♥ Favorite since {}", format_date_added(entry.date_added)),
            heart_style(true),
        )));
    }
    if let Some(resume) = state.resume.as_ref().filter(|resume| resume.show_id == show.id) {
        lines.push(Line::from(Span::styled(
            format!(
                "Last listened at {} (press p)",
                format_position(resume.timestamp_seconds)
            ),
            Style::default().fg(Color::Yellow),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(single_line(&show.description)));

    let details = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(TEXT))
        .block(panel_block("Show"));
    frame.render_widget(details, area);
}

fn draw_episodes(frame: &mut Frame, state: &TuiState, area: Rect) {
    let (Some(show), Some(expanded)) = (state.expanded_show(), state.expanded.as_ref()) else {
        return;
    };
    let groups = episode_groups(show);
    let Some((group_title, episodes)) = groups.get(expanded.season_idx) else {
        return;
    };

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(3),
            Constraint::Length(4),
        ])
        .split(area.inner(Margin::new(1, 1)));
    frame.render_widget(panel_block("Episodes"), area);

    let season_line = Line::from(vec![
        Span::styled(
            truncate(&show.title, 30),
            Style::default().fg(TEXT).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            format!(
                "◂ {group_title} ▸ ({}/{})",
                expanded.season_idx + 1,
                groups.len()
            ),
            Style::default().fg(Color::Yellow),
        ),
    ]);
    frame.render_widget(Paragraph::new(season_line), sections[0]);

    let rows: Vec<Row> = episodes
        .iter()
        .map(|episode| {
            let favorite = state.favorites.is_favorite(FavoriteKind::Episode, &episode.id);
            let resume_marker = state
                .resume
                .as_ref()
                .filter(|resume| resume.episode_id == episode.id)
                .map(|resume| format_position(resume.timestamp_seconds))
                .unwrap_or_default();
            Row::new(vec![
                Cell::from(heart(favorite)).style(heart_style(favorite)),
                Cell::from(episode_label(episode.season, episode.number)),
                Cell::from(episode.title.clone()),
                Cell::from(resume_marker),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(2),
            Constraint::Length(7),
            Constraint::Min(10),
            Constraint::Length(8),
        ],
    )
    .row_highlight_style(
        Style::default()
            .bg(ACCENT)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("▸ ");
    let mut episode_state = TableState::default();
    episode_state.select((!episodes.is_empty()).then_some(expanded.episode_idx));
    frame.render_stateful_widget(table, sections[1], &mut episode_state);

    if let Some(episode) = episodes.get(expanded.episode_idx) {
        let mut summary = single_line(&episode.description);
        if summary.is_empty() {
            summary = "No description.".to_string();
        }
        if !episode.has_audio() {
            summary.push_str(" (no audio file listed)");
        }
        let about = Paragraph::new(summary)
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(MUTED));
        frame.render_widget(about, sections[2]);
    }
}

fn episode_label(season: u32, number: u32) -> String {
    if season == 0 {
        format!("E{number}")
    } else {
        format!("S{season}E{number}")
    }
}

fn panel_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(125, 135, 150)))
        .title(title)
}

fn heart_style(is_favorite: bool) -> Style {
    if is_favorite {
        Style::default().fg(HEART).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(MUTED)
    }
}

fn key_hint(key: &'static str, label: &'static str) -> [Span<'static>; 2] {
    [
        Span::styled(
            format!(" {key} "),
            Style::default()
                .bg(Color::Rgb(72, 82, 96))
                .fg(TEXT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {label}  "), Style::default().fg(MUTED)),
    ]
}

fn controls_line(state: &TuiState) -> Line<'static> {
    let hints: &[(&'static str, &'static str)] = match (&state.input, state.focus) {
        (InputMode::Search { .. }, _) => &[("Enter", "apply"), ("Esc", "cancel")],
        (InputMode::Normal, Focus::Episodes) => &[
            ("↑/↓", "episode"),
            ("←/→", "season"),
            ("Enter", "play"),
            ("f", "favorite"),
            ("Esc", "back"),
            ("q", "quit"),
        ],
        (InputMode::Normal, Focus::Library) => &[
            ("Enter", "open"),
            ("/", "search"),
            ("o", "sort"),
            ("g", "genre"),
            ("c", "clear"),
            ("f", "favorite"),
            ("v", "favorites"),
            ("p", "resume"),
            ("r", "reload"),
            ("q", "quit"),
        ],
    };
    let spans: Vec<Span<'static>> = hints
        .iter()
        .flat_map(|&(key, label)| key_hint(key, label))
        .collect();
    Line::from(spans)
}

fn status_style(status: &str) -> Style {
    if status.starts_with("ERROR:") {
        Style::default()
            .fg(Color::Rgb(255, 145, 120))
            .add_modifier(Modifier::BOLD)
    } else if status.starts_with("INFO:") {
        Style::default().fg(Color::Rgb(205, 165, 255))
    } else {
        Style::default().fg(TEXT)
    }
}
