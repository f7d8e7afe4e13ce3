use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::db::{Database, FavoriteKind, FavoriteRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FavoriteEntry {
    pub(crate) is_favorite: bool,
    pub(crate) date_added: DateTime<Utc>,
}

/// Toggle map for one kind of item, in first-toggle order.
///
/// Un-favoriting keeps the entry (and its last add time) in place, so a later
/// re-favorite does not move it to the end.
#[derive(Debug, Clone, Default)]
pub(crate) struct Ledger {
    entries: Vec<(String, FavoriteEntry)>,
    index: HashMap<String, usize>,
}

impl Ledger {
    pub(crate) fn toggle(&mut self, id: &str, now: DateTime<Utc>) -> FavoriteEntry {
        match self.index.get(id) {
            Some(&position) => {
                let entry = &mut self.entries[position].1;
                entry.is_favorite = !entry.is_favorite;
                if entry.is_favorite {
                    entry.date_added = now;
                }
                *entry
            }
            None => {
                let entry = FavoriteEntry {
                    is_favorite: true,
                    date_added: now,
                };
                self.index.insert(id.to_string(), self.entries.len());
                self.entries.push((id.to_string(), entry));
                entry
            }
        }
    }

    pub(crate) fn is_favorite(&self, id: &str) -> bool {
        self.get(id).is_some_and(|entry| entry.is_favorite)
    }

    pub(crate) fn get(&self, id: &str) -> Option<FavoriteEntry> {
        self.index.get(id).map(|&position| self.entries[position].1)
    }

    pub(crate) fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Ids currently marked favorite, in toggle-map order.
    pub(crate) fn favorites_list(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_favorite)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    fn insert_loaded(&mut self, id: String, entry: FavoriteEntry) {
        if self.index.contains_key(&id) {
            return;
        }
        self.index.insert(id.clone(), self.entries.len());
        self.entries.push((id, entry));
    }

    fn from_rows(kind: FavoriteKind, rows: Vec<FavoriteRow>) -> Self {
        let mut ledger = Self::default();
        for row in rows {
            let Ok(date_added) = DateTime::parse_from_rfc3339(&row.date_added) else {
                tracing::warn!(?kind, item_id = %row.item_id, raw = %row.date_added, "skipping favorite with unreadable date");
                continue;
            };
            ledger.insert_loaded(
                row.item_id,
                FavoriteEntry {
                    is_favorite: row.is_favorite,
                    date_added: date_added.with_timezone(&Utc),
                },
            );
        }
        ledger
    }
}

/// Show and episode favorites, kept apart even when ids collide.
#[derive(Debug, Clone, Default)]
pub(crate) struct FavoritesLedger {
    pub(crate) shows: Ledger,
    pub(crate) episodes: Ledger,
}

impl FavoritesLedger {
    pub(crate) fn load(db: &Database) -> Result<Self> {
        Ok(Self {
            shows: Ledger::from_rows(FavoriteKind::Show, db.list_favorites(FavoriteKind::Show)?),
            episodes: Ledger::from_rows(
                FavoriteKind::Episode,
                db.list_favorites(FavoriteKind::Episode)?,
            ),
        })
    }

    /// Loads persisted favorites, starting empty if storage is unreadable.
    pub(crate) fn load_or_default(db: &Database) -> Self {
        Self::load(db).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to load favorites, starting empty");
            Self::default()
        })
    }

    pub(crate) fn ledger(&self, kind: FavoriteKind) -> &Ledger {
        match kind {
            FavoriteKind::Show => &self.shows,
            FavoriteKind::Episode => &self.episodes,
        }
    }

    pub(crate) fn toggle_show_favorite(&mut self, id: &str) -> FavoriteEntry {
        self.shows.toggle(id, Utc::now())
    }

    pub(crate) fn toggle_episode_favorite(&mut self, id: &str) -> FavoriteEntry {
        self.episodes.toggle(id, Utc::now())
    }

    pub(crate) fn is_favorite(&self, kind: FavoriteKind, id: &str) -> bool {
        self.ledger(kind).is_favorite(id)
    }

    /// Flips one entry and writes it through to `db`.
    ///
    /// A failed write is logged and otherwise ignored: the in-memory ledger
    /// remains the source of truth for this session.
    pub(crate) fn toggle_persisted(
        &mut self,
        db: &Database,
        kind: FavoriteKind,
        id: &str,
    ) -> FavoriteEntry {
        let entry = match kind {
            FavoriteKind::Show => self.toggle_show_favorite(id),
            FavoriteKind::Episode => self.toggle_episode_favorite(id),
        };
        let position = self.ledger(kind).position(id).unwrap_or_default();
        let row = FavoriteRow {
            item_id: id.to_string(),
            is_favorite: entry.is_favorite,
            date_added: entry.date_added.to_rfc3339(),
        };
        if let Err(err) = db.upsert_favorite(kind, &row, position) {
            tracing::warn!(?kind, item_id = %id, error = %err, "failed to persist favorite");
        }
        entry
    }
}
