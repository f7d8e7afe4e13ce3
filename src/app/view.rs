use std::cmp::Ordering;

use clap::ValueEnum;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use super::model::Show;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SortOrder {
    #[default]
    None,
    #[value(name = "az")]
    TitleAsc,
    #[value(name = "za")]
    TitleDesc,
    #[value(name = "date-asc")]
    UpdatedAsc,
    #[value(name = "date-desc")]
    UpdatedDesc,
}

impl SortOrder {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::None => "unsorted",
            Self::TitleAsc => "title A-Z",
            Self::TitleDesc => "title Z-A",
            Self::UpdatedAsc => "oldest first",
            Self::UpdatedDesc => "newest first",
        }
    }

    pub(crate) fn cycle(self) -> Self {
        match self {
            Self::None => Self::TitleAsc,
            Self::TitleAsc => Self::TitleDesc,
            Self::TitleDesc => Self::UpdatedAsc,
            Self::UpdatedAsc => Self::UpdatedDesc,
            Self::UpdatedDesc => Self::None,
        }
    }
}

/// The single active narrowing of the catalog. Search and genre filtering
/// replace each other; they never combine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) enum ViewFilter {
    #[default]
    All,
    Search(String),
    Genre(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ViewAction {
    Search(String),
    GenreClick(String),
    ClearFilter,
    Sort(SortOrder),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct ViewState {
    pub(crate) filter: ViewFilter,
    pub(crate) sort: SortOrder,
}

impl ViewState {
    pub(crate) fn apply(&mut self, action: ViewAction) {
        match action {
            ViewAction::Search(term) => {
                let term = term.trim();
                self.filter = if term.is_empty() {
                    ViewFilter::All
                } else {
                    ViewFilter::Search(term.to_string())
                };
            }
            ViewAction::GenreClick(genre) => {
                let genre = genre.trim();
                if !genre.is_empty() {
                    self.filter = ViewFilter::Genre(genre.to_string());
                }
            }
            ViewAction::ClearFilter => self.filter = ViewFilter::All,
            ViewAction::Sort(order) => self.sort = order,
        }
    }

    pub(crate) fn query(&self) -> ViewQuery<'_> {
        match &self.filter {
            ViewFilter::All => ViewQuery {
                search: None,
                genre: None,
                sort: self.sort,
            },
            ViewFilter::Search(term) => ViewQuery {
                search: Some(term),
                genre: None,
                sort: self.sort,
            },
            ViewFilter::Genre(genre) => ViewQuery {
                search: None,
                genre: Some(genre),
                sort: self.sort,
            },
        }
    }

    pub(crate) fn describe(&self) -> String {
        let filter = match &self.filter {
            ViewFilter::All => "all shows".to_string(),
            ViewFilter::Search(term) => format!("search \"{term}\""),
            ViewFilter::Genre(genre) => format!("genre {genre}"),
        };
        format!("{filter} | {}", self.sort.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct ViewQuery<'a> {
    pub(crate) search: Option<&'a str>,
    pub(crate) genre: Option<&'a str>,
    pub(crate) sort: SortOrder,
}

/// Derives the displayed list from the canonical one.
///
/// A non-empty search wins over a genre filter. The result is always a fresh
/// vector; `canonical` is only read.
pub(crate) fn compute_view(canonical: &[Show], query: &ViewQuery<'_>) -> Vec<Show> {
    let search = query.search.map(str::trim).filter(|term| !term.is_empty());

    let mut shows: Vec<Show> = if let Some(term) = search {
        rank_by_title(canonical, term)
            .into_iter()
            .map(|idx| canonical[idx].clone())
            .collect()
    } else if let Some(genre) = query.genre {
        canonical
            .iter()
            .filter(|show| show.has_genre(genre))
            .cloned()
            .collect()
    } else {
        canonical.to_vec()
    };

    sort_shows(&mut shows, query.sort);
    shows
}

/// Favorite shows, in ledger order, resolved against the canonical list and
/// then sorted like the main view. Ids that no longer exist are skipped.
pub(crate) fn favorite_shows_view<'a, I>(canonical: &[Show], ids: I, sort: SortOrder) -> Vec<Show>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut shows: Vec<Show> = ids
        .into_iter()
        .filter_map(|id| canonical.iter().find(|show| show.id == id))
        .cloned()
        .collect();
    sort_shows(&mut shows, sort);
    shows
}

/// Indices of shows whose title fuzzily matches `term`, best match first.
/// Equal scores keep canonical order.
pub(crate) fn rank_by_title(canonical: &[Show], term: &str) -> Vec<usize> {
    let matcher = SkimMatcherV2::default().ignore_case();
    let term_lower = term.to_lowercase();

    let mut ranked: Vec<(usize, i64)> = canonical
        .iter()
        .enumerate()
        .filter_map(|(idx, show)| {
            let base = matcher.fuzzy_match(&show.title, term)?;
            Some((idx, base + title_bonus(&show.title.to_lowercase(), &term_lower)))
        })
        .collect();

    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.into_iter().map(|(idx, _)| idx).collect()
}

fn title_bonus(title_lower: &str, term_lower: &str) -> i64 {
    if title_lower == term_lower {
        return 100_000;
    }
    let mut bonus = 0;
    if title_lower.starts_with(term_lower) {
        bonus += 25_000;
    }
    if title_lower.contains(term_lower) {
        bonus += 10_000;
    }
    if title_lower
        .split_whitespace()
        .any(|word| word.starts_with(term_lower))
    {
        bonus += 5_000;
    }
    bonus
}

pub(crate) fn sort_shows(shows: &mut [Show], order: SortOrder) {
    match order {
        SortOrder::None => {}
        SortOrder::TitleAsc => shows.sort_by(|a, b| compare_titles(&a.title, &b.title)),
        SortOrder::TitleDesc => shows.sort_by(|a, b| compare_titles(&b.title, &a.title)),
        SortOrder::UpdatedAsc => shows.sort_by(|a, b| a.updated.cmp(&b.updated)),
        SortOrder::UpdatedDesc => shows.sort_by(|a, b| b.updated.cmp(&a.updated)),
    }
}

/// Case-insensitive title order with the raw title as tie-breaker, so titles
/// differing only in case still get a deterministic order.
pub(crate) fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
