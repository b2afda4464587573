use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::model::store::{Coll, Id, StoreError};

/// A bounded voting event with contestable positions.
///
/// `closed` moves false → true exactly once, either through the close
/// endpoint or the auto-close sweep, and never reverts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Id,
    pub title: String,
    /// Missing or unreadable start means "open immediately".
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub start_time: Option<DateTime<Utc>>,
    /// Missing or unreadable end means "never auto-closes".
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub end_time: Option<DateTime<Utc>>,
    /// How many positions must be attached before voting can open.
    #[serde(default = "default_seats")]
    pub seats: u32,
    #[serde(default)]
    pub positions: Vec<Id>,
    #[serde(default)]
    pub closed: bool,
}

fn default_seats() -> u32 {
    1
}

impl Session {
    /// Whether the session is open for voting at `now`: not closed, inside
    /// its time window, and with enough positions attached to fill its
    /// seats.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        if self.closed {
            return false;
        }
        if let Some(start) = self.start_time {
            if now < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if now > end {
                return false;
            }
        }
        self.positions.len() >= self.seats.max(1) as usize
    }

    /// Attach a position, ignoring duplicates.
    pub fn attach_position(&mut self, position: Id) {
        if !self.positions.contains(&position) {
            self.positions.push(position);
        }
    }
}

/// Close every session whose end time is strictly in the past. The store is
/// written at most once, and only when something actually changed, so
/// repeated sweeps settle immediately. Returns how many sessions closed.
pub fn auto_close_expired(
    sessions: &Coll<Session>,
    now: DateTime<Utc>,
) -> Result<usize, StoreError> {
    let mut all = sessions.all();
    let mut closed = 0;
    for session in all.iter_mut() {
        if !session.closed && session.end_time.map_or(false, |end| end < now) {
            session.closed = true;
            closed += 1;
        }
    }
    if closed > 0 {
        sessions.save(all)?;
    }
    Ok(closed)
}

/// Accept RFC 3339 strings or epoch milliseconds for the session time
/// bounds; anything unreadable is treated as an unset bound rather than
/// poisoning the whole collection.
fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(parse_datetime))
}

fn parse_datetime(value: serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}
