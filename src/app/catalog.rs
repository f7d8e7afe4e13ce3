use std::sync::Arc;
use std::thread;

use thiserror::Error;

use crate::config::Settings;
use crate::http::{RetryPolicy, get_text_with_retries};

use super::model::{RawShowDetail, Show, ShowPreview};

#[derive(Debug, Error)]
pub(crate) enum CatalogError {
    #[error("failed to load show index: {0}")]
    Index(String),
    #[error("failed to load show {id}: {reason}")]
    Detail { id: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DetailFailure {
    pub(crate) id: String,
    pub(crate) reason: String,
}

/// Result of one full catalog fan-out. `shows` keeps index order.
#[derive(Debug, Clone, Default)]
pub(crate) struct CatalogLoad {
    pub(crate) shows: Vec<Show>,
    pub(crate) failures: Vec<DetailFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FanoutPolicy {
    /// Any failed detail fetch fails the whole load.
    AllOrNothing,
    /// Successful details are kept and failures are reported per id.
    Partial,
}

#[derive(Debug, Clone)]
pub(crate) struct CatalogClient {
    api_base: String,
    retry: RetryPolicy,
    parallelism: usize,
    policy: FanoutPolicy,
}

impl CatalogClient {
    pub(crate) fn new(api_base: &str, parallelism: usize, policy: FanoutPolicy) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
            parallelism: parallelism.max(1),
            policy,
        }
    }

    pub(crate) fn from_settings(settings: &Settings) -> Self {
        let policy = if settings.strict_catalog {
            FanoutPolicy::AllOrNothing
        } else {
            FanoutPolicy::Partial
        };
        Self::new(&settings.api_base, settings.fetch_parallelism, policy)
    }

    #[cfg(test)]
    pub(crate) fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn index_url(&self) -> String {
        format!("{}/shows", self.api_base)
    }

    fn detail_url(&self, id: &str) -> String {
        format!("{}/id/{}", self.api_base, id)
    }

    pub(crate) fn fetch_index(&self) -> Result<Vec<String>, CatalogError> {
        let body = get_text_with_retries(&self.index_url(), &self.retry)
            .map_err(CatalogError::Index)?;
        let previews: Vec<ShowPreview> = serde_json::from_str(&body)
            .map_err(|err| CatalogError::Index(format!("invalid index payload: {err}")))?;
        Ok(previews.iter().map(ShowPreview::id).collect())
    }

    pub(crate) fn fetch_show(&self, id: &str) -> Result<Show, CatalogError> {
        let detail_error = |reason: String| CatalogError::Detail {
            id: id.to_string(),
            reason,
        };
        let body = get_text_with_retries(&self.detail_url(id), &self.retry).map_err(detail_error)?;
        let raw: RawShowDetail = serde_json::from_str(&body)
            .map_err(|err| detail_error(format!("invalid detail payload: {err}")))?;
        Ok(Show::from_detail(raw))
    }

    /// Fetches the index, then every show detail, and waits for all of them.
    ///
    /// Details are fetched on scoped threads in batches of at most
    /// `parallelism` requests. Nothing is cached: every call refetches.
    pub(crate) fn load_catalog(&self) -> Result<CatalogLoad, CatalogError> {
        let ids = self.fetch_index()?;
        tracing::info!(shows = ids.len(), "fetched catalog index");

        let mut results: Vec<(String, Result<Show, CatalogError>)> = Vec::with_capacity(ids.len());
        for batch in ids.chunks(self.parallelism) {
            let batch_results = thread::scope(|scope| {
                let handles: Vec<_> = batch
                    .iter()
                    .map(|id| scope.spawn(move || self.fetch_show(id)))
                    .collect();
                handles
                    .into_iter()
                    .zip(batch)
                    .map(|(handle, id)| {
                        let result = handle.join().unwrap_or_else(|_| {
                            Err(CatalogError::Detail {
                                id: id.clone(),
                                reason: "detail worker panicked".to_string(),
                            })
                        });
                        (id.clone(), result)
                    })
                    .collect::<Vec<_>>()
            });
            results.extend(batch_results);
        }

        let mut load = CatalogLoad::default();
        for (id, result) in results {
            match result {
                Ok(show) => load.shows.push(show),
                Err(err) => {
                    tracing::warn!(show_id = %id, error = %err, "show detail fetch failed");
                    if self.policy == FanoutPolicy::AllOrNothing {
                        return Err(err);
                    }
                    let reason = match err {
                        CatalogError::Detail { reason, .. } => reason,
                        CatalogError::Index(reason) => reason,
                    };
                    load.failures.push(DetailFailure { id, reason });
                }
            }
        }

        tracing::info!(
            loaded = load.shows.len(),
            failed = load.failures.len(),
            "catalog load finished"
        );
        Ok(load)
    }
}

/// Handle for one catalog load; only the most recently issued ticket may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LoadTicket(u64);

impl LoadTicket {
    pub(crate) fn generation(self) -> u64 {
        self.0
    }
}

/// The canonical show list from the last committed load.
///
/// The list is shared immutably and only ever replaced as a whole.
#[derive(Debug, Default)]
pub(crate) struct CatalogStore {
    shows: Arc<[Show]>,
    issued: u64,
    committed: Option<u64>,
}

impl CatalogStore {
    pub(crate) fn shows(&self) -> &[Show] {
        &self.shows
    }

    pub(crate) fn is_loaded(&self) -> bool {
        self.committed.is_some()
    }

    pub(crate) fn find_show(&self, id: &str) -> Option<&Show> {
        self.shows.iter().find(|show| show.id == id)
    }

    pub(crate) fn begin_load(&mut self) -> LoadTicket {
        self.issued += 1;
        LoadTicket(self.issued)
    }

    pub(crate) fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.issued
    }

    /// Replaces the canonical list if `ticket` is still the latest load.
    /// Returns false and keeps the current list for superseded loads.
    pub(crate) fn commit(&mut self, ticket: LoadTicket, shows: Vec<Show>) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                stale = ticket.0,
                latest = self.issued,
                "dropping superseded catalog load"
            );
            return false;
        }
        self.shows = shows.into();
        self.committed = Some(ticket.0);
        true
    }
}
