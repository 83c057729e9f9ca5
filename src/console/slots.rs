//! Slot forms. Picker values are reduced to local calendar components
//! before anything else happens to them; no UTC instant is ever formed.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use schemars::JsonSchema;
use serde::Deserialize;

use super::FieldErrors;
use crate::models::{RecurringSlotPayload, SingleSlotPayload};

/// Calendar day of a picker value. Accepts `YYYY-MM-DD`, a naive
/// date-time, or an RFC 3339 value whose own offset is kept.
pub fn local_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.date_naive());
    }
    naive_date_time(value).map(|at| at.date())
}

/// Wall-clock time of a picker value: `HH:MM`, `HH:MM:SS`, or a date-time.
pub fn local_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    for format in ["%H:%M", "%H:%M:%S"] {
        if let Ok(time) = NaiveTime::parse_from_str(value, format) {
            return Some(time);
        }
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.time());
    }
    naive_date_time(value).map(|at| at.time())
}

fn naive_date_time(value: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Parses weekday names (`MON`, `wed`, `Friday`), dropping repeats while
/// keeping the order they were picked in.
pub fn weekdays(values: &[String]) -> Result<Vec<Weekday>, String> {
    let mut days = Vec::with_capacity(values.len());
    for value in values {
        let day: Weekday = value
            .trim()
            .parse()
            .map_err(|_| format!("Unknown weekday: {}", value))?;
        if !days.contains(&day) {
            days.push(day);
        }
    }
    Ok(days)
}

fn require<T>(errors: &mut FieldErrors, field: &str, value: Option<T>, message: &str) -> Option<T> {
    if value.is_none() {
        errors
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }
    value
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SingleSlotForm {
    pub date: String,
    pub start_time: String,
}

impl SingleSlotForm {
    pub fn payload(&self) -> Result<SingleSlotPayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        let date = require(&mut errors, "date", local_date(&self.date), "Pick a valid date");
        let time = require(
            &mut errors,
            "startTime",
            local_time(&self.start_time),
            "Pick a valid start time",
        );
        match (date, time) {
            (Some(date), Some(time)) => Ok(SingleSlotPayload::new(date, time)),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecurringSlotForm {
    pub start_date: String,
    pub end_date: String,
    pub start_time: String,
    #[serde(default)]
    pub weekdays: Vec<String>,
}

impl RecurringSlotForm {
    pub fn payload(&self) -> Result<RecurringSlotPayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        let start = require(
            &mut errors,
            "startDate",
            local_date(&self.start_date),
            "Pick a valid start date",
        );
        let end = require(
            &mut errors,
            "endDate",
            local_date(&self.end_date),
            "Pick a valid end date",
        );
        let time = require(
            &mut errors,
            "startTime",
            local_time(&self.start_time),
            "Pick a valid start time",
        );

        let days = match weekdays(&self.weekdays) {
            Ok(days) if days.is_empty() => {
                errors.insert("weekdays".to_string(), vec!["Pick at least one weekday".to_string()]);
                None
            }
            Ok(days) => Some(days),
            Err(message) => {
                errors.insert("weekdays".to_string(), vec![message]);
                None
            }
        };

        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                errors
                    .entry("endDate".to_string())
                    .or_default()
                    .push("End date must be on or after the start date".to_string());
            }
        }

        match (start, end, time, days) {
            (Some(start), Some(end), Some(time), Some(days)) if errors.is_empty() => {
                Ok(RecurringSlotPayload::new(start, end, time, &days))
            }
            _ => Err(errors),
        }
    }
}
