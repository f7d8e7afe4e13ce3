use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::Result;

use crate::paths::database_file_path;

pub(crate) const DEFAULT_API_BASE: &str = "https://podcast-api.netlify.app";
pub(crate) const DEFAULT_PLAYER: &str = "mpv";
pub(crate) const DEFAULT_FETCH_PARALLELISM: usize = 8;
const MAX_FETCH_PARALLELISM: usize = 32;

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) api_base: String,
    pub(crate) player_bin: PathBuf,
    pub(crate) fetch_parallelism: usize,
    pub(crate) strict_catalog: bool,
    pub(crate) database_path: PathBuf,
}

impl Settings {
    pub(crate) fn resolve(api_base_override: Option<&str>) -> Result<Self> {
        let api_base = match api_base_override {
            Some(value) => normalize_api_base(value),
            None => api_base_from_env(env::var_os("PODGRID_API_BASE")),
        };
        let database_path = match env::var_os("PODGRID_DB") {
            Some(value) if !value.is_empty() => PathBuf::from(value),
            _ => database_file_path()?,
        };

        Ok(Self {
            api_base,
            player_bin: player_bin_from_env(env::var_os("PODGRID_PLAYER")),
            fetch_parallelism: fetch_parallelism_from_env(env::var_os(
                "PODGRID_FETCH_PARALLELISM",
            )),
            strict_catalog: strict_catalog_from_env(env::var_os("PODGRID_STRICT_CATALOG")),
            database_path,
        })
    }
}

pub(crate) fn api_base_from_env(env_value: Option<OsString>) -> String {
    match env_value.and_then(|value| value.into_string().ok()) {
        Some(value) if !value.trim().is_empty() => normalize_api_base(&value),
        _ => DEFAULT_API_BASE.to_string(),
    }
}

fn normalize_api_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

pub(crate) fn player_bin_from_env(env_value: Option<OsString>) -> PathBuf {
    match env_value {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from(DEFAULT_PLAYER),
    }
}

pub(crate) fn fetch_parallelism_from_env(env_value: Option<OsString>) -> usize {
    env_value
        .and_then(|value| value.into_string().ok())
        .and_then(|value| value.trim().parse::<usize>().ok())
        .map(|value| value.clamp(1, MAX_FETCH_PARALLELISM))
        .unwrap_or(DEFAULT_FETCH_PARALLELISM)
}

pub(crate) fn strict_catalog_from_env(env_value: Option<OsString>) -> bool {
    env_value
        .and_then(|value| value.into_string().ok())
        .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_base_defaults_and_trims_trailing_slash() {
        assert_eq!(api_base_from_env(None), DEFAULT_API_BASE);
        assert_eq!(api_base_from_env(Some(OsString::from("  "))), DEFAULT_API_BASE);
        assert_eq!(
            api_base_from_env(Some(OsString::from("http://127.0.0.1:9000/"))),
            "http://127.0.0.1:9000"
        );
    }

    #[test]
    fn player_bin_falls_back_to_mpv_when_empty() {
        assert_eq!(player_bin_from_env(None), PathBuf::from("mpv"));
        assert_eq!(player_bin_from_env(Some(OsString::new())), PathBuf::from("mpv"));
        assert_eq!(
            player_bin_from_env(Some(OsString::from("/usr/bin/vlc"))),
            PathBuf::from("/usr/bin/vlc")
        );
    }

    #[test]
    fn fetch_parallelism_is_clamped() {
        assert_eq!(fetch_parallelism_from_env(None), DEFAULT_FETCH_PARALLELISM);
        assert_eq!(fetch_parallelism_from_env(Some(OsString::from("0"))), 1);
        assert_eq!(fetch_parallelism_from_env(Some(OsString::from("500"))), 32);
        assert_eq!(
            fetch_parallelism_from_env(Some(OsString::from("abc"))),
            DEFAULT_FETCH_PARALLELISM
        );
    }

    #[test]
    fn strict_catalog_accepts_common_truthy_values() {
        assert!(strict_catalog_from_env(Some(OsString::from("1"))));
        assert!(strict_catalog_from_env(Some(OsString::from("TRUE"))));
        assert!(!strict_catalog_from_env(Some(OsString::from("0"))));
        assert!(!strict_catalog_from_env(None));
    }
}
