//! Explicit timetable decoding.
//!
//! Timetables arrive as a JSON document with a `trips` array; per-stop
//! arrivals are "HH:MM" strings, decoded here to minutes since midnight
//! and never seen again past this boundary. A malformed trip entry is
//! skipped with a warning; an absent `trips` collection yields an empty
//! list, which callers treat as "fall back to synthesis", not an error.

use std::path::Path;

use log::{info, warn};
use serde::Deserialize;

use crate::model::{DayType, RouteKey, Schedule, StopTime};
use crate::{Error, Minutes};

#[derive(Debug, Deserialize)]
struct TimetableTrip {
    line_id: u32,
    variant_id: u32,
    direction: i8,
    day_type: u8,
    stops: Vec<TimetableArrival>,
}

#[derive(Debug, Deserialize)]
struct TimetableArrival {
    stop_id: u32,
    arrival: String,
}

pub fn load_timetable(path: &Path) -> Result<Vec<Schedule>, Error> {
    if !path.exists() {
        info!("Timetable file '{}' not found", path.display());
        return Ok(Vec::new());
    }
    parse_timetable(&std::fs::read_to_string(path)?)
}

pub fn parse_timetable(input: &str) -> Result<Vec<Schedule>, Error> {
    let document: serde_json::Value = serde_json::from_str(input)?;
    let Some(trips) = document.get("trips").and_then(|t| t.as_array()).cloned() else {
        info!("Timetable document carries no trip collection");
        return Ok(Vec::new());
    };

    let mut schedules = Vec::new();
    for trip in trips {
        let trip = match serde_json::from_value::<TimetableTrip>(trip) {
            Ok(trip) => trip,
            Err(e) => {
                warn!("Skipping unreadable trip entry: {e}");
                continue;
            }
        };
        if let Some(schedule) = schedule_from_trip(schedules.len() as u32, trip) {
            schedules.push(schedule);
        }
    }
    Ok(schedules)
}

fn schedule_from_trip(schedule_id: u32, trip: TimetableTrip) -> Option<Schedule> {
    let Some(day_type) = DayType::from_code(trip.day_type) else {
        warn!(
            "Skipping trip on line {} with unknown day type {}",
            trip.line_id, trip.day_type
        );
        return None;
    };
    if trip.stops.is_empty() {
        warn!("Skipping trip on line {} with no stop arrivals", trip.line_id);
        return None;
    }

    let mut stop_times = Vec::with_capacity(trip.stops.len());
    for (sequence, arrival) in trip.stops.iter().enumerate() {
        let Some(minutes) = parse_minutes(&arrival.arrival) else {
            warn!(
                "Skipping trip on line {}: unparseable arrival time '{}'",
                trip.line_id, arrival.arrival
            );
            return None;
        };
        stop_times.push(StopTime {
            stop_id: arrival.stop_id,
            sequence: sequence as u32,
            arrival: minutes,
        });
    }

    if stop_times.windows(2).any(|pair| pair[1].arrival < pair[0].arrival) {
        warn!(
            "Skipping trip on line {} with decreasing arrival times",
            trip.line_id
        );
        return None;
    }

    Some(Schedule {
        schedule_id,
        route: RouteKey {
            line_id: trip.line_id,
            variant_id: trip.variant_id,
            direction: trip.direction,
        },
        day_type,
        departure: stop_times[0].arrival,
        stop_times,
    })
}

/// Decodes "HH:MM" to minutes since midnight in [0, 1440).
fn parse_minutes(text: &str) -> Option<Minutes> {
    let (hours, minutes) = text.trim().split_once(':')?;
    let hours: Minutes = hours.parse().ok()?;
    let minutes: Minutes = minutes.parse().ok()?;
    if hours >= 24 || minutes >= 60 {
        return None;
    }
    Some(hours * 60 + minutes)
}
