//! Property viewings
//!
//! A viewing is a visitor's request to tour a property. Admins move it
//! between statuses freely; there is no enforced state machine. The one
//! rule attached to a transition is that entering `cancelled` from any
//! other status notifies the visitor exactly once.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default viewing length in minutes
pub const DEFAULT_DURATION_MINUTES: u32 = 30;
/// Shortest bookable viewing
pub const MIN_DURATION_MINUTES: u32 = 15;
/// Longest bookable viewing
pub const MAX_DURATION_MINUTES: u32 = 240;

/// Lifecycle status of a viewing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewingStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

impl ViewingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewingStatus::Scheduled => "scheduled",
            ViewingStatus::Confirmed => "confirmed",
            ViewingStatus::Completed => "completed",
            ViewingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "scheduled" => Ok(ViewingStatus::Scheduled),
            "confirmed" => Ok(ViewingStatus::Confirmed),
            "completed" => Ok(ViewingStatus::Completed),
            "cancelled" => Ok(ViewingStatus::Cancelled),
            other => Err(Error::UnknownVariant {
                kind: "viewing status",
                value: other.to_string(),
            }),
        }
    }
}

/// Whether moving from `old` to `new` must notify the visitor of a cancellation
pub fn triggers_cancellation(old: ViewingStatus, new: ViewingStatus) -> bool {
    new == ViewingStatus::Cancelled && old != ViewingStatus::Cancelled
}

/// A persisted viewing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewing {
    pub id: i64,
    pub property_id: i64,
    pub visitor_name: String,
    pub visitor_email: String,
    pub visitor_phone: Option<String>,
    pub viewing_date: DateTime<Utc>,
    /// Requested time of day, `HH:MM`
    pub viewing_time: String,
    /// Minutes
    pub duration: u32,
    pub notes: Option<String>,
    pub status: ViewingStatus,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Viewing request as submitted by a visitor.
///
/// Required fields default to empty so that a missing field is reported by
/// [`NewViewing::validate`] with a readable message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewViewing {
    pub property_id: i64,
    #[serde(default)]
    pub visitor_name: String,
    #[serde(default)]
    pub visitor_email: String,
    #[serde(default)]
    pub visitor_phone: Option<String>,
    #[serde(default)]
    pub viewing_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub viewing_time: String,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A viewing request that passed validation and can be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct ViewingDraft {
    pub property_id: i64,
    pub visitor_name: String,
    pub visitor_email: String,
    pub visitor_phone: Option<String>,
    pub viewing_date: DateTime<Utc>,
    pub viewing_time: String,
    pub duration: u32,
    pub notes: Option<String>,
}

impl NewViewing {
    /// Validate the request as of `now`
    pub fn validate(self, now: DateTime<Utc>) -> Result<ViewingDraft> {
        let visitor_name = self.visitor_name.trim().to_string();
        if visitor_name.is_empty() {
            return Err(Error::Validation("visitor name is required".into()));
        }

        let visitor_email = self.visitor_email.trim().to_string();
        if visitor_email.is_empty() {
            return Err(Error::Validation("visitor email is required".into()));
        }
        if !looks_like_email(&visitor_email) {
            return Err(Error::Validation("visitor email is invalid".into()));
        }

        let viewing_date = self
            .viewing_date
            .ok_or_else(|| Error::Validation("viewing date is required".into()))?;
        if viewing_date < now {
            return Err(Error::Validation(
                "viewing date cannot be in the past".into(),
            ));
        }

        let viewing_time = self.viewing_time.trim().to_string();
        if NaiveTime::parse_from_str(&viewing_time, "%H:%M").is_err() {
            return Err(Error::Validation(
                "viewing time must be HH:MM".into(),
            ));
        }

        let duration = self.duration.unwrap_or(DEFAULT_DURATION_MINUTES);
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration) {
            return Err(Error::Validation(format!(
                "duration must be between {} and {} minutes",
                MIN_DURATION_MINUTES, MAX_DURATION_MINUTES
            )));
        }

        Ok(ViewingDraft {
            property_id: self.property_id,
            visitor_name,
            visitor_email,
            visitor_phone: blank_to_none(self.visitor_phone),
            viewing_date,
            viewing_time,
            duration,
            notes: blank_to_none(self.notes),
        })
    }
}

fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Admin listing filter. Every set field must match; date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewingFilter {
    #[serde(default)]
    pub status: Option<ViewingStatus>,
    #[serde(default)]
    pub property_id: Option<i64>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub search_query: Option<String>,
}

impl ViewingFilter {
    pub fn matches(&self, viewing: &Viewing) -> bool {
        if let Some(status) = self.status {
            if viewing.status != status {
                return false;
            }
        }
        if let Some(property_id) = self.property_id {
            if viewing.property_id != property_id {
                return false;
            }
        }
        if let Some(start) = self.start_date {
            if viewing.viewing_date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if viewing.viewing_date > end {
                return false;
            }
        }
        if let Some(query) = self.search_query.as_deref().map(str::trim) {
            if !query.is_empty() && !text_matches(viewing, query) {
                return false;
            }
        }
        true
    }
}

fn text_matches(viewing: &Viewing, query: &str) -> bool {
    let needle = query.to_lowercase();
    let fields = [
        Some(viewing.visitor_name.as_str()),
        Some(viewing.visitor_email.as_str()),
        viewing.visitor_phone.as_deref(),
        viewing.notes.as_deref(),
    ];
    fields
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// Listing order: latest viewing date first, newest id breaking ties
pub fn sort_for_listing(viewings: &mut [Viewing]) {
    viewings.sort_by(|a, b| {
        b.viewing_date
            .cmp(&a.viewing_date)
            .then_with(|| b.id.cmp(&a.id))
    });
}
