use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::StatusFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    Booked,
    Cancelled,
}

impl StatusFilter for SlotStatus {
    const ALL: &'static [Self] = &[SlotStatus::Available, SlotStatus::Booked, SlotStatus::Cancelled];

    fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Available => "available",
            SlotStatus::Booked => "booked",
            SlotStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub trainer_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub is_booked: bool,
    #[serde(default)]
    pub booked_by: Option<String>,
    #[serde(default)]
    pub is_cancelled: bool,
}

impl Slot {
    pub fn status(&self) -> SlotStatus {
        if self.is_cancelled {
            SlotStatus::Cancelled
        } else if self.is_booked {
            SlotStatus::Booked
        } else {
            SlotStatus::Available
        }
    }

    /// Booked slots must be cancelled, not deleted.
    pub fn can_delete(&self) -> bool {
        self.status() == SlotStatus::Available
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// Three-letter upper-case weekday code used on the wire.
pub fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MON",
        Weekday::Tue => "TUE",
        Weekday::Wed => "WED",
        Weekday::Thu => "THU",
        Weekday::Fri => "FRI",
        Weekday::Sat => "SAT",
        Weekday::Sun => "SUN",
    }
}

/// One slot on a local calendar day. Carries plain strings, never an instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleSlotPayload {
    date: String,
    start_time: String,
}

impl SingleSlotPayload {
    pub fn new(date: NaiveDate, start_time: NaiveTime) -> Self {
        SingleSlotPayload {
            date: date.format(DATE_FORMAT).to_string(),
            start_time: start_time.format(TIME_FORMAT).to_string(),
        }
    }
}

/// A weekly schedule between two local calendar days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringSlotPayload {
    start_date: String,
    end_date: String,
    start_time: String,
    weekdays: Vec<String>,
}

impl RecurringSlotPayload {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        start_time: NaiveTime,
        weekdays: &[Weekday],
    ) -> Self {
        RecurringSlotPayload {
            start_date: start_date.format(DATE_FORMAT).to_string(),
            end_date: end_date.format(DATE_FORMAT).to_string(),
            start_time: start_time.format(TIME_FORMAT).to_string(),
            weekdays: weekdays.iter().map(|d| weekday_code(*d).to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn booked_slots_cannot_be_deleted() {
        let slot: Slot = serde_json::from_value(json!({
            "_id": "s1",
            "trainerId": "t1",
            "startTime": "2026-01-26T03:30:00Z",
            "endTime": "2026-01-26T04:30:00Z",
            "isBooked": true,
            "bookedBy": "u9"
        }))
        .unwrap();
        assert_eq!(slot.status(), SlotStatus::Booked);
        assert!(!slot.can_delete());
    }
}
