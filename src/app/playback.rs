use std::path::Path;
use std::process::{Command as ProcessCommand, Stdio};
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::db::Database;

use super::catalog::CatalogClient;
use super::model::{Episode, Show};
use super::process::{run_interactive_cmd, with_sigint_ignored};

const RESUME_STATE_KEY: &str = "last_listened";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaybackState {
    pub(crate) show_id: String,
    pub(crate) episode_id: String,
    pub(crate) timestamp_seconds: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct PlaybackOutcome {
    pub(crate) success: bool,
    pub(crate) position_seconds: f64,
    pub(crate) failure_detail: Option<String>,
}

pub(crate) fn record_progress(
    db: &Database,
    show_id: &str,
    episode_id: &str,
    timestamp_seconds: f64,
) -> Result<PlaybackState> {
    let state = PlaybackState {
        show_id: show_id.to_string(),
        episode_id: episode_id.to_string(),
        timestamp_seconds: sanitize_seconds(timestamp_seconds),
    };
    let raw = serde_json::to_string(&state).context("failed to encode playback state")?;
    db.write_state(RESUME_STATE_KEY, &raw)
        .context("failed to persist playback state")?;
    tracing::debug!(show_id, episode_id, seconds = state.timestamp_seconds, "recorded progress");
    Ok(state)
}

/// The persisted resume point, if it still refers to a show and episode in
/// `catalog`. Missing, unreadable or dangling records all yield `None`.
pub(crate) fn load_resume_state(db: &Database, catalog: &[Show]) -> Option<PlaybackState> {
    let raw = match db.read_state(RESUME_STATE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            tracing::warn!(error = %err, "failed to read resume state");
            return None;
        }
    };
    let state: PlaybackState = match serde_json::from_str(&raw) {
        Ok(state) => state,
        Err(err) => {
            tracing::warn!(error = %err, "ignoring unreadable resume state");
            return None;
        }
    };
    resolve_resume_state(state, catalog)
}

pub(crate) fn resolve_resume_state(
    state: PlaybackState,
    catalog: &[Show],
) -> Option<PlaybackState> {
    let show = catalog.iter().find(|show| show.id == state.show_id)?;
    if show.find_episode(&state.episode_id).is_none() {
        tracing::debug!(
            show_id = %state.show_id,
            episode_id = %state.episode_id,
            "resume episode no longer in catalog"
        );
        return None;
    }
    Some(state)
}

/// Looks up an episode for playback.
///
/// The canonical record is used when it carries an audio file; otherwise the
/// show detail is fetched again and searched.
pub(crate) fn select_episode(
    catalog: &[Show],
    client: &CatalogClient,
    show_id: &str,
    episode_id: &str,
) -> Result<(Show, Episode)> {
    if let Some(show) = catalog.iter().find(|show| show.id == show_id)
        && let Some(episode) = show.find_episode(episode_id)
        && episode.has_audio()
    {
        return Ok((show.clone(), episode.clone()));
    }

    tracing::info!(show_id, episode_id, "fetching show detail for episode");
    let show = client
        .fetch_show(show_id)
        .with_context(|| format!("failed to fetch show {show_id}"))?;
    let episode = show
        .find_episode(episode_id)
        .cloned()
        .ok_or_else(|| anyhow!("episode {episode_id} not found in show {show_id}"))?;
    if !episode.has_audio() {
        return Err(anyhow!("episode {episode_id} has no audio file"));
    }
    Ok((show, episode))
}

pub(crate) fn player_args(episode: &Episode, start_seconds: f64) -> Vec<String> {
    let mut args = vec!["--no-video".to_string()];
    let start = sanitize_seconds(start_seconds);
    if start > 0.0 {
        args.push(format!("--start={start:.0}"));
    }
    args.push(episode.file.clone());
    args
}

/// Runs the external player in the foreground. The reported position is the
/// start offset plus the time the player ran.
pub(crate) fn play_episode(
    player_bin: &Path,
    episode: &Episode,
    start_seconds: f64,
) -> Result<PlaybackOutcome> {
    let args = player_args(episode, start_seconds);
    tracing::info!(player = %player_bin.display(), episode_id = %episode.id, start_seconds, "launching player");

    let started = Instant::now();
    let status = with_sigint_ignored(|| {
        let mut cmd = ProcessCommand::new(player_bin);
        cmd.args(&args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        run_interactive_cmd(cmd)
            .with_context(|| format!("failed to launch {}", player_bin.display()))
    })?;
    let elapsed = started.elapsed().as_secs_f64();

    let position_seconds = sanitize_seconds(start_seconds) + elapsed;
    if status.success() {
        Ok(PlaybackOutcome {
            success: true,
            position_seconds,
            failure_detail: None,
        })
    } else {
        tracing::warn!(%status, "player exited unsuccessfully");
        Ok(PlaybackOutcome {
            success: false,
            position_seconds,
            failure_detail: Some(format!("player exited with status: {status}")),
        })
    }
}

/// Plays `episode` and stores the resulting position on success.
pub(crate) fn play_and_record(
    db: &Database,
    player_bin: &Path,
    show: &Show,
    episode: &Episode,
    start_seconds: f64,
) -> Result<String> {
    let outcome = play_episode(player_bin, episode, start_seconds)?;
    if !outcome.success {
        let detail = outcome
            .failure_detail
            .unwrap_or_else(|| "unknown failure".to_string());
        return Ok(format!(
            "Playback failed/interrupted: {detail}. Progress not updated."
        ));
    }

    match record_progress(db, &show.id, &episode.id, outcome.position_seconds) {
        Ok(state) => Ok(format!(
            "Saved position for {} | {} at {}",
            show.title,
            episode.title,
            super::format::format_position(state.timestamp_seconds)
        )),
        Err(err) => {
            tracing::warn!(error = %err, "resume position not saved");
            Ok(format!(
                "Finished {} | {} (position not saved: {err})",
                show.title, episode.title
            ))
        }
    }
}

fn sanitize_seconds(raw: f64) -> f64 {
    if raw.is_finite() && raw > 0.0 { raw } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Show> {
        let raw = r#"{"id":"10","title":"Tales","seasons":[{"season":1,"episodes":[{"title":"One","episode":1,"file":"https://cdn.test/one.mp3"},{"title":"Two","episode":2}]}]}"#;
        vec![Show::from_detail(serde_json::from_str(raw).expect("detail"))]
    }

    #[test]
    fn resume_state_round_trips_through_storage() {
        let db = Database::open_in_memory().expect("db");
        record_progress(&db, "10", "10-s1-e1", 93.5).expect("record");

        let state = load_resume_state(&db, &catalog()).expect("resumable");
        assert_eq!(state.episode_id, "10-s1-e1");
        assert_eq!(state.timestamp_seconds, 93.5);
    }

    #[test]
    fn resume_state_for_missing_show_is_discarded() {
        let db = Database::open_in_memory().expect("db");
        record_progress(&db, "99", "99-s1-e1", 10.0).expect("record");
        assert_eq!(load_resume_state(&db, &catalog()), None);
    }

    #[test]
    fn resume_state_for_missing_episode_is_discarded() {
        let db = Database::open_in_memory().expect("db");
        record_progress(&db, "10", "10-s9-e1", 10.0).expect("record");
        assert_eq!(load_resume_state(&db, &catalog()), None);
    }

    #[test]
    fn unreadable_resume_state_is_ignored() {
        let db = Database::open_in_memory().expect("db");
        db.write_state(RESUME_STATE_KEY, "{oops").expect("write");
        assert_eq!(load_resume_state(&db, &catalog()), None);
    }

    #[test]
    fn resume_state_uses_camel_case_json() {
        let db = Database::open_in_memory().expect("db");
        record_progress(&db, "10", "10-s1-e2", -4.0).expect("record");
        let raw = db
            .read_state(RESUME_STATE_KEY)
            .expect("read")
            .expect("present");
        assert_eq!(
            raw,
            r#"{"showId":"10","episodeId":"10-s1-e2","timestampSeconds":0.0}"#
        );
    }

    #[test]
    fn select_episode_prefers_canonical_record_with_audio() {
        let client = CatalogClient::new(
            "http://127.0.0.1:9",
            1,
            super::super::catalog::FanoutPolicy::Partial,
        );
        let (show, episode) =
            select_episode(&catalog(), &client, "10", "10-s1-e1").expect("canonical");
        assert_eq!(show.id, "10");
        assert_eq!(episode.file, "https://cdn.test/one.mp3");
    }

    #[test]
    fn player_args_skip_zero_start() {
        let show = &catalog()[0];
        let episode = show.find_episode("10-s1-e1").expect("episode");
        assert_eq!(
            player_args(episode, 0.0),
            vec!["--no-video", "https://cdn.test/one.mp3"]
        );
        assert_eq!(
            player_args(episode, 61.7),
            vec!["--no-video", "--start=62", "https://cdn.test/one.mp3"]
        );
    }
}
