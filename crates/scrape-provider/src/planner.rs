//! Pure target planner: expands high-level scrape options into a flat list
//! of abstract scrape targets. No network or store access happens here.

use serde::{Deserialize, Serialize};

/// Time window modifier accepted by `TOP` and `CONTROVERSIAL` listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFilter {
    Hour,
    Day,
    Week,
    Month,
    Year,
    All,
}

/// Result ordering for search and user-timeline targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    Relevance,
    Hot,
    Top,
    New,
    Comments,
}

/// A subreddit listing kind, minus `Search` (which carries its own queries
/// and is represented by `ListingSpec::Search` instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    New,
    Hot,
    Top,
    Rising,
    Controversial,
}

impl ListingKind {
    fn supports_time_filter(self) -> bool {
        matches!(self, ListingKind::Top | ListingKind::Controversial)
    }
}

/// One requested listing. `Search` carries its queries inline so "SEARCH
/// requested with no queries" is a value that can't be constructed by a
/// caller going through `ListingSpec::search`, rather than a runtime
/// validation failure discovered later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingSpec {
    Listing(ListingKind),
    Search(Vec<String>),
}

impl ListingSpec {
    pub fn search(queries: Vec<String>) -> Self {
        ListingSpec::Search(queries)
    }
}

/// High-level knobs the planner expands into concrete targets.
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub listings: Vec<ListingSpec>,
    pub time_filters: Vec<TimeFilter>,
    pub search_sort: SortMode,
    pub user_timelines: Vec<String>,
    pub per_listing_limit: u32,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            listings: vec![
                ListingSpec::Listing(ListingKind::New),
                ListingSpec::Listing(ListingKind::Hot),
                ListingSpec::Listing(ListingKind::Top),
            ],
            time_filters: Vec::new(),
            search_sort: SortMode::New,
            user_timelines: Vec::new(),
            per_listing_limit: 100,
        }
    }
}

/// A validation failure in a `ScrapeOptions` value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("per_listing_limit must be positive")]
    NonPositiveLimit,
    #[error("search listing requires at least one query")]
    EmptySearchQueries,
}

/// Validate cross-field rules the type system doesn't already enforce.
///
/// `ListingSpec::Search` always carries its queries, so an empty-vec
/// `Search` is the only remaining way to construct the "SEARCH but no
/// queries" boundary case; this still has to be rejected at runtime.
pub fn validate(options: &ScrapeOptions) -> Result<(), ValidationError> {
    if options.per_listing_limit == 0 {
        return Err(ValidationError::NonPositiveLimit);
    }
    for listing in &options.listings {
        if let ListingSpec::Search(queries) = listing {
            if queries.is_empty() {
                return Err(ValidationError::EmptySearchQueries);
            }
        }
    }
    Ok(())
}

/// One abstract unit of scraping work, to be executed by the external
/// scraping collaborator. No target enumerates actual submissions.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Submissions {
        subreddit: String,
        listing: ListingKind,
        time_filter: Option<TimeFilter>,
        limit: u32,
    },
    Search {
        subreddit: String,
        query: String,
        sort: SortMode,
        time_filter: Option<TimeFilter>,
        limit: u32,
    },
    UserTimeline {
        username: String,
        surface: UserSurface,
        sort: SortMode,
        limit: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSurface {
    Submissions,
    Comments,
}

/// Expand `options` into the flat list of targets to execute against
/// `subreddit`. Validates first; callers that already validated may ignore
/// the error variant but must still handle it.
pub fn plan(subreddit: &str, options: &ScrapeOptions) -> Result<Vec<Target>, ValidationError> {
    validate(options)?;
    let mut targets = Vec::new();

    for listing in &options.listings {
        match listing {
            ListingSpec::Listing(kind) if kind.supports_time_filter() => {
                let filters: Vec<Option<TimeFilter>> = if options.time_filters.is_empty() {
                    vec![None]
                } else {
                    options.time_filters.iter().map(|tf| Some(*tf)).collect()
                };
                for time_filter in filters {
                    targets.push(Target::Submissions {
                        subreddit: subreddit.to_string(),
                        listing: *kind,
                        time_filter,
                        limit: options.per_listing_limit,
                    });
                }
            }
            ListingSpec::Listing(kind) => {
                targets.push(Target::Submissions {
                    subreddit: subreddit.to_string(),
                    listing: *kind,
                    time_filter: None,
                    limit: options.per_listing_limit,
                });
            }
            ListingSpec::Search(queries) => {
                let filters: Vec<Option<TimeFilter>> = if options.time_filters.is_empty() {
                    vec![None]
                } else {
                    options.time_filters.iter().map(|tf| Some(*tf)).collect()
                };
                for query in queries {
                    for time_filter in &filters {
                        targets.push(Target::Search {
                            subreddit: subreddit.to_string(),
                            query: query.clone(),
                            sort: options.search_sort,
                            time_filter: *time_filter,
                            limit: options.per_listing_limit,
                        });
                    }
                }
            }
        }
    }

    for username in &options.user_timelines {
        targets.push(Target::UserTimeline {
            username: username.clone(),
            surface: UserSurface::Submissions,
            sort: SortMode::New,
            limit: options.per_listing_limit,
        });
        targets.push(Target::UserTimeline {
            username: username.clone(),
            surface: UserSurface::Comments,
            sort: SortMode::New,
            limit: options.per_listing_limit,
        });
    }

    Ok(targets)
}
