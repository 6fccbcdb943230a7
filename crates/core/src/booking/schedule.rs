use std::iter;

use chrono::{Datelike, NaiveDate};

use crate::document::model::Booking;

const MIN_STEP_MINUTES: u32 = 10;

impl Booking {
    /// Slot start times (`HH:MM`) offered on `date`.
    ///
    /// Slots start at the day's opening time and are emitted while a full
    /// slot still fits before closing. Days without hours, unparsable times
    /// and reversed ranges yield nothing.
    pub fn slots_for(&self, date: NaiveDate) -> Vec<String> {
        let dow = date.weekday().number_from_monday();
        let Some(day) = self.days.iter().find(|d| u32::from(d.dow) == dow) else {
            return Vec::new();
        };
        let (Some(start), Some(end)) = (parse_minutes(&day.start), parse_minutes(&day.end)) else {
            return Vec::new();
        };
        if end <= start {
            return Vec::new();
        }

        let step = self.slot_minutes.max(MIN_STEP_MINUTES);
        let fits = |t: &u32| t.checked_add(step).is_some_and(|slot_end| slot_end <= end);
        iter::successors(Some(start), |t| t.checked_add(step))
            .take_while(fits)
            .map(format_minutes)
            .collect()
    }
}

/// Parse `H:MM` / `HH:MM` into minutes after midnight.
pub fn parse_minutes(s: &str) -> Option<u32> {
    let (hh, mm) = s.split_once(':')?;
    if hh.is_empty() || hh.len() > 2 || mm.len() != 2 {
        return None;
    }
    if !hh.bytes().chain(mm.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (hh, mm): (u32, u32) = (hh.parse().ok()?, mm.parse().ok()?);
    (hh <= 23 && mm <= 59).then_some(hh * 60 + mm)
}

fn format_minutes(mins: u32) -> String {
    format!("{:02}:{:02}", mins / 60, mins % 60)
}
