use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

/// Identifiers arrive as strings from the public API but as numbers from some
/// mirrors; both are kept as text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Number(number) => number.to_string(),
        }
    }
}

/// One entry of the catalog index. Only the id is used.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ShowPreview {
    pub(crate) id: RawId,
}

impl ShowPreview {
    pub(crate) fn id(&self) -> String {
        self.id.clone().into_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawShowDetail {
    pub(crate) id: RawId,
    #[serde(default)]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default)]
    pub(crate) seasons: Vec<RawSeason>,
    #[serde(default)]
    pub(crate) image: Option<String>,
    #[serde(default)]
    pub(crate) genres: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) updated: Option<String>,
    #[serde(default)]
    pub(crate) episodes: Option<Vec<RawEpisode>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawSeason {
    pub(crate) season: u32,
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) episodes: Vec<RawEpisode>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawEpisode {
    #[serde(default)]
    pub(crate) id: Option<RawId>,
    #[serde(default)]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default)]
    pub(crate) episode: Option<u32>,
    #[serde(default)]
    pub(crate) file: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Show {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) seasons: Vec<Season>,
    pub(crate) image: String,
    pub(crate) genres: Vec<String>,
    pub(crate) updated: Option<DateTime<Utc>>,
    pub(crate) episodes: Vec<Episode>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Season {
    pub(crate) season: u32,
    pub(crate) title: String,
    pub(crate) episodes: Vec<Episode>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Episode {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) file: String,
    pub(crate) season: u32,
    pub(crate) number: u32,
}

impl Episode {
    pub(crate) fn has_audio(&self) -> bool {
        !self.file.trim().is_empty()
    }
}

impl Show {
    pub(crate) fn from_detail(raw: RawShowDetail) -> Self {
        let id = raw.id.into_string();
        let mut taken = HashSet::new();

        let mut seasons: Vec<Season> = raw
            .seasons
            .into_iter()
            .map(|season| Season {
                season: season.season,
                title: season
                    .title
                    .filter(|title| !title.trim().is_empty())
                    .unwrap_or_else(|| format!("Season {}", season.season)),
                episodes: normalize_episodes(&id, season.season, season.episodes, &mut taken),
            })
            .collect();
        seasons.sort_by_key(|season| season.season);

        let mut genres: Vec<String> = Vec::new();
        for genre in raw.genres.unwrap_or_default() {
            let genre = genre.trim();
            if !genre.is_empty() && !genres.iter().any(|existing| existing == genre) {
                genres.push(genre.to_string());
            }
        }

        let episodes = normalize_episodes(&id, 0, raw.episodes.unwrap_or_default(), &mut taken);

        Self {
            updated: raw.updated.as_deref().and_then(parse_updated),
            title: raw.title.trim().to_string(),
            description: raw.description,
            image: raw.image.unwrap_or_default(),
            seasons,
            genres,
            episodes,
            id,
        }
    }

    pub(crate) fn genres_display(&self) -> String {
        self.genres.join(", ")
    }

    pub(crate) fn has_genre(&self, genre: &str) -> bool {
        let wanted = genre.trim();
        self.genres
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(wanted))
    }

    pub(crate) fn all_episodes(&self) -> impl Iterator<Item = &Episode> {
        self.seasons
            .iter()
            .flat_map(|season| season.episodes.iter())
            .chain(self.episodes.iter())
    }

    pub(crate) fn find_episode(&self, episode_id: &str) -> Option<&Episode> {
        self.all_episodes().find(|episode| episode.id == episode_id)
    }

    pub(crate) fn episode_count(&self) -> usize {
        self.all_episodes().count()
    }
}

/// Episode ids are unique within a show. `taken` carries the ids already
/// handed out by earlier seasons.
fn normalize_episodes(
    show_id: &str,
    season: u32,
    raw: Vec<RawEpisode>,
    taken: &mut HashSet<String>,
) -> Vec<Episode> {
    raw.into_iter()
        .enumerate()
        .map(|(idx, episode)| {
            let position = (idx + 1) as u32;
            let number = episode.episode.unwrap_or(position);
            let preferred = episode
                .id
                .map(RawId::into_string)
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| canonical_episode_id(show_id, season, number));
            let id = claim_episode_id(taken, preferred, show_id, season, position);
            Episode {
                id,
                title: episode.title.trim().to_string(),
                description: episode.description,
                file: episode.file.unwrap_or_default(),
                season,
                number,
            }
        })
        .collect()
}

/// Takes `preferred` if free, else the positional id, else `preferred-<n>`.
fn claim_episode_id(
    taken: &mut HashSet<String>,
    preferred: String,
    show_id: &str,
    season: u32,
    position: u32,
) -> String {
    let mut id = preferred;
    if taken.contains(&id) {
        let positional = canonical_episode_id(show_id, season, position);
        if taken.contains(&positional) {
            let mut suffix = 2;
            while taken.contains(&format!("{id}-{suffix}")) {
                suffix += 1;
            }
            id = format!("{id}-{suffix}");
        } else {
            id = positional;
        }
    }
    taken.insert(id.clone());
    id
}

pub(crate) fn canonical_episode_id(show_id: &str, season: u32, number: u32) -> String {
    format!("{show_id}-s{season}-e{number}")
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates.
pub(crate) fn parse_updated(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(raw: &str) -> Show {
        let parsed: RawShowDetail = serde_json::from_str(raw).expect("detail should parse");
        Show::from_detail(parsed)
    }

    #[test]
    fn missing_genres_and_episodes_default_to_empty() {
        let show = detail(r#"{"id":"7","title":"Quiet","description":"d","seasons":[],"updated":"2024-01-01"}"#);
        assert!(show.genres.is_empty());
        assert!(show.episodes.is_empty());
        assert_eq!(show.genres_display(), "");
        assert_eq!(show.image, "");
    }

    #[test]
    fn numeric_ids_become_text() {
        let show = detail(r#"{"id":1,"title":"Alpha"}"#);
        assert_eq!(show.id, "1");
    }

    #[test]
    fn episode_ids_are_canonicalized_from_season_and_number() {
        let show = detail(
            r#"{
                "id":"10716",
                "title":"Something",
                "seasons":[
                    {"season":2,"episodes":[{"title":"B1","episode":1,"file":"b1.mp3"}]},
                    {"season":1,"title":"Pilot Run","episodes":[
                        {"title":"A1","episode":1,"file":"a1.mp3"},
                        {"title":"A-untracked","file":"a2.mp3"},
                        {"id":"explicit","title":"A3","episode":3}
                    ]}
                ],
                "episodes":[{"title":"Bonus"}]
            }"#,
        );

        assert_eq!(show.seasons[0].season, 1);
        assert_eq!(show.seasons[0].title, "Pilot Run");
        assert_eq!(show.seasons[1].title, "Season 2");
        let ids: Vec<&str> = show.all_episodes().map(|ep| ep.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "10716-s1-e1",
                "10716-s1-e2",
                "explicit",
                "10716-s2-e1",
                "10716-s0-e1"
            ]
        );
        assert!(!show.find_episode("explicit").expect("episode").has_audio());
    }

    #[test]
    fn clashing_episode_numbers_still_get_distinct_ids() {
        let show = detail(
            r#"{
                "id":"9",
                "seasons":[
                    {"season":1,"episodes":[{"title":"Two","episode":2},{"title":"Unnumbered"}]},
                    {"season":2,"episodes":[
                        {"title":"First","episode":1},
                        {"title":"First again","episode":1},
                        {"title":"Dup id","id":"9-s2-e1"}
                    ]}
                ]
            }"#,
        );

        let ids: Vec<&str> = show.all_episodes().map(|ep| ep.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["9-s1-e2", "9-s1-e2-2", "9-s2-e1", "9-s2-e2", "9-s2-e3"]
        );
        let distinct: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(distinct.len(), ids.len());
        assert_eq!(
            show.find_episode("9-s2-e2").map(|ep| ep.title.as_str()),
            Some("First again")
        );
    }

    #[test]
    fn genres_are_deduplicated_and_matched_case_insensitively() {
        let show = detail(r#"{"id":"3","genres":["Comedy"," Comedy","History",""]}"#);
        assert_eq!(show.genres, vec!["Comedy", "History"]);
        assert_eq!(show.genres_display(), "Comedy, History");
        assert!(show.has_genre("history"));
        assert!(!show.has_genre("Hist"));
    }

    #[test]
    fn updated_accepts_rfc3339_and_plain_dates() {
        let full = parse_updated("2022-11-03T07:00:00.000Z").expect("rfc3339");
        assert_eq!(full.to_rfc3339(), "2022-11-03T07:00:00+00:00");
        let date = parse_updated("2024-06-01").expect("date");
        assert_eq!(date.to_rfc3339(), "2024-06-01T00:00:00+00:00");
        assert!(parse_updated("yesterday").is_none());
    }
}
