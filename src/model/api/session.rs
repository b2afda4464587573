use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::db::Session;
use crate::model::store::Id;

/// A session specification, as submitted by an admin.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSpec {
    pub title: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub seats: Option<u32>,
    #[serde(default)]
    pub positions: Vec<Id>,
}

impl From<SessionSpec> for Session {
    fn from(spec: SessionSpec) -> Self {
        Session {
            id: Id::new(),
            title: spec.title,
            start_time: spec.start_time,
            end_time: spec.end_time,
            seats: spec.seats.unwrap_or(1),
            positions: spec.positions,
            closed: false,
        }
    }
}

/// The mutable session fields. `closed` is deliberately absent: closing
/// goes through its own endpoint and never reverts.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub seats: Option<u32>,
}

impl SessionUpdate {
    pub fn apply(self, session: &mut Session) {
        if let Some(title) = self.title {
            session.title = title;
        }
        if let Some(start_time) = self.start_time {
            session.start_time = Some(start_time);
        }
        if let Some(end_time) = self.end_time {
            session.end_time = Some(end_time);
        }
        if let Some(seats) = self.seats {
            session.seats = seats;
        }
    }
}

/// A session as returned by the API, with its activity precomputed so
/// clients don't re-implement the eligibility rules.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub id: Id,
    pub title: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub seats: u32,
    pub positions: Vec<Id>,
    pub closed: bool,
    pub active: bool,
}

impl SessionView {
    pub fn new(session: Session, now: DateTime<Utc>) -> Self {
        let active = session.is_active(now);
        Self {
            id: session.id,
            title: session.title,
            start_time: session.start_time,
            end_time: session.end_time,
            seats: session.seats,
            positions: session.positions,
            closed: session.closed,
            active,
        }
    }
}

/// A position specification.
#[derive(Debug, Serialize, Deserialize)]
pub struct PositionSpec {
    pub title: String,
    #[serde(default)]
    pub session_id: Option<Id>,
}

/// The mutable position fields.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PositionUpdate {
    #[serde(default)]
    pub title: Option<String>,
}

/// A candidate specification.
#[derive(Debug, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub position_id: Id,
    pub name: String,
}

/// The mutable candidate fields.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CandidateUpdate {
    #[serde(default)]
    pub name: Option<String>,
}
