//! Filters for browsing one add-on's logs.
//!
//! Levels and actors arrive as token lists. A few literal tokens switch a
//! filter off entirely: `any` for levels, and `any` or `0` for actors. The
//! actor token `system` selects entries with no acting user.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Disables the level or actor filter.
pub const ANY_TOKEN: &str = "any";

/// Disables the actor filter.
pub const ALL_USERS_TOKEN: &str = "0";

/// Selects system-originated entries (`user_id IS NULL`).
pub const SYSTEM_TOKEN: &str = "system";

/// Default page size of the log browser.
pub const DEFAULT_PER_PAGE: i64 = 20;

/// Largest page size a caller may request.
pub const MAX_PER_PAGE: i64 = 100;

// ---------------------------------------------------------------------------
// LogFilter
// ---------------------------------------------------------------------------

/// Optional constraints on a log listing. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub user_ids: Vec<String>,
}

/// Resolved actor constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorConstraint {
    /// Match entries with no acting user.
    pub include_system: bool,
    /// Match entries by any of these users.
    pub user_ids: Vec<DbId>,
}

impl LogFilter {
    /// Levels to match, or `None` when the level filter is off.
    pub fn type_constraint(&self) -> Option<Vec<String>> {
        if self.types.is_empty() || self.types.iter().any(|t| t == ANY_TOKEN) {
            return None;
        }
        Some(self.types.clone())
    }

    /// Actors to match, or `None` when the actor filter is off.
    ///
    /// Tokens that are neither `system` nor a numeric user id name no actor
    /// and match nothing.
    pub fn actor_constraint(&self) -> Option<ActorConstraint> {
        if self.actors_unfiltered() {
            return None;
        }

        let mut constraint = ActorConstraint::default();
        for token in &self.user_ids {
            if token.eq_ignore_ascii_case(SYSTEM_TOKEN) {
                constraint.include_system = true;
            } else if let Ok(id) = token.trim().parse::<DbId>() {
                constraint.user_ids.push(id);
            }
        }
        Some(constraint)
    }

    /// Whether any non-default filter was supplied.
    pub fn has_filters(&self) -> bool {
        self.start_date.is_some()
            || self.end_date.is_some()
            || self.type_constraint().is_some()
            || !self.actors_unfiltered()
    }

    fn actors_unfiltered(&self) -> bool {
        self.user_ids.is_empty()
            || self
                .user_ids
                .iter()
                .any(|u| u == ANY_TOKEN || u == ALL_USERS_TOKEN)
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Split a comma-separated query value into trimmed, non-empty tokens.
pub fn split_tokens(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Parse a date bound given either as RFC 3339 or as `YYYY-MM-DD`
/// (midnight UTC). Blank input means no bound.
pub fn parse_date_bound(raw: Option<&str>) -> Result<Option<Timestamp>, CoreError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Some(dt.and_utc()))
        .ok_or_else(|| CoreError::Validation(format!("Invalid date: '{raw}'")))
}

/// Clamp a requested page size, falling back to the default.
pub fn clamp_per_page(per_page: Option<i64>) -> i64 {
    per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
}

/// Row offset of a 1-based page. Pages past the end of the `i64` range
/// saturate, which simply yields no rows.
pub fn page_offset(page: i64, per_page: i64) -> i64 {
    (page.max(1) - 1).saturating_mul(per_page.max(0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
