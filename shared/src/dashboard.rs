//! Dashboard search and sport filtering.
//!
//! Filtering is always derived from the full collection, so realtime
//! updates stay visible through an active filter.

use crate::models::event::{EventWithVenues, SportType};
use crate::realtime::DashboardEvents;
use serde::{Deserialize, Serialize};

pub const DASHBOARD_PATH: &str = "/dashboard";

/// Raw `q` / `sport` URL parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub sport: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardFilters {
    pub search_query: Option<String>,
    pub sport: Option<SportType>,
}

impl DashboardFilters {
    /// An empty sport, `all` or an unknown sport means no sport filter.
    pub fn from_params(params: &DashboardParams) -> Self {
        let search_query = params
            .q
            .as_deref()
            .map(str::trim)
            .filter(|query| !query.is_empty())
            .map(str::to_string);
        let sport = params
            .sport
            .as_deref()
            .map(str::trim)
            .filter(|sport| !sport.is_empty() && *sport != "all")
            .and_then(|sport| sport.parse::<SportType>().ok());
        Self { search_query, sport }
    }

    /// Parses a raw query string such as `q=cup&sport=Soccer` with the same
    /// decoder the server's query extractor uses. A query that does not
    /// decode yields no filters.
    pub fn from_query_string(query: &str) -> Self {
        let params = serde_urlencoded::from_str::<DashboardParams>(query.trim_start_matches('?'))
            .unwrap_or_default();
        Self::from_params(&params)
    }

    pub fn to_params(&self) -> DashboardParams {
        DashboardParams {
            q: self.search_query.clone(),
            sport: self.sport.map(|sport| sport.to_string()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.search_query.is_some() || self.sport.is_some()
    }

    pub fn query_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(query) = &self.search_query {
            parts.push(format!("q={}", urlencoding::encode(query)));
        }
        if let Some(sport) = self.sport {
            parts.push(format!("sport={}", sport));
        }
        parts.join("&")
    }

    /// Canonical dashboard URL for these filters.
    pub fn to_url(&self) -> String {
        let query = self.query_string();
        if query.is_empty() {
            DASHBOARD_PATH.to_string()
        } else {
            format!("{}?{}", DASHBOARD_PATH, query)
        }
    }

    pub fn matches(&self, event: &EventWithVenues) -> bool {
        let name_matches = self
            .search_query
            .as_ref()
            .map(|query| event.name.to_lowercase().contains(&query.to_lowercase()))
            .unwrap_or(true);
        let sport_matches = self.sport.map(|sport| event.sport_type == sport).unwrap_or(true);
        name_matches && sport_matches
    }
}

pub fn filter_events(events: &[EventWithVenues], filters: &DashboardFilters) -> Vec<EventWithVenues> {
    events
        .iter()
        .filter(|event| filters.matches(event))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyState {
    /// The user has no events at all.
    NoEvents,
    /// Events exist but none match the active filters.
    NoResults,
}

impl EmptyState {
    pub fn message(&self) -> &'static str {
        match self {
            EmptyState::NoEvents => "No events yet. Create your first event to get started.",
            EmptyState::NoResults => "No events match your filters.",
        }
    }
}

pub fn empty_state(total: usize, visible: usize) -> Option<EmptyState> {
    match (total, visible) {
        (0, _) => Some(EmptyState::NoEvents),
        (_, 0) => Some(EmptyState::NoResults),
        _ => None,
    }
}

/// Memoized filtered view over a [`DashboardEvents`] collection. The subset
/// is recomputed only when the collection revision or the filters change.
#[derive(Debug, Default)]
pub struct FilteredEvents {
    key: Option<(u64, DashboardFilters)>,
    visible: Vec<EventWithVenues>,
    computations: usize,
}

impl FilteredEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, source: &DashboardEvents, filters: &DashboardFilters) -> &[EventWithVenues] {
        let fresh = matches!(&self.key, Some((revision, cached)) if *revision == source.revision() && cached == filters);
        if !fresh {
            self.visible = filter_events(source.events(), filters);
            self.key = Some((source.revision(), filters.clone()));
            self.computations += 1;
        }
        &self.visible
    }

    pub fn empty_state(&mut self, source: &DashboardEvents, filters: &DashboardFilters) -> Option<EmptyState> {
        let visible = self.get(source, filters).len();
        empty_state(source.events().len(), visible)
    }

    /// How many times the subset has been recomputed.
    pub fn computations(&self) -> usize {
        self.computations
    }
}
