//! In-game clock
//!
//! Game time is derived from real elapsed time: `starting_hour` plus elapsed
//! seconds multiplied by `time_scale`, wrapped at 24 hours. A scale of zero
//! freezes the clock.

use std::time::{Duration, Instant};

use super::Describe;

/// Period of the day used in descriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimePeriod {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimePeriod {
    pub fn from_hour(hour: f32) -> Self {
        if (5.0..12.0).contains(&hour) {
            TimePeriod::Morning
        } else if (12.0..17.0).contains(&hour) {
            TimePeriod::Afternoon
        } else if (17.0..21.0).contains(&hour) {
            TimePeriod::Evening
        } else {
            TimePeriod::Night
        }
    }
}

impl std::fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TimePeriod::Morning => "Morning",
            TimePeriod::Afternoon => "Afternoon",
            TimePeriod::Evening => "Evening",
            TimePeriod::Night => "Night",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct GameClock {
    starting_hour: f32,
    /// Game hours per real second
    time_scale: f32,
    started_at: Instant,
}

impl GameClock {
    pub fn new(starting_hour: f32, time_scale: f32) -> Self {
        Self {
            starting_hour: starting_hour.rem_euclid(24.0),
            time_scale,
            started_at: Instant::now(),
        }
    }

    /// A clock that stays at the given hour
    pub fn frozen_at(hour: f32) -> Self {
        Self::new(hour, 0.0)
    }

    /// Current hour of day in 24-hour format (0.0 - 23.99)
    pub fn current_hour(&self) -> f32 {
        self.hour_after(self.started_at.elapsed())
    }

    /// Hour of day after `elapsed` real time has passed since the clock started
    pub fn hour_after(&self, elapsed: Duration) -> f32 {
        (self.starting_hour + elapsed.as_secs_f32() * self.time_scale).rem_euclid(24.0)
    }

    /// Whole game hours elapsed since the clock started
    pub fn hours_elapsed(&self) -> u64 {
        (self.started_at.elapsed().as_secs_f32() * self.time_scale).max(0.0) as u64
    }

    /// Formatted 12-hour time for a given hour, e.g. "3:30 PM"
    pub fn format_hour(hour: f32) -> String {
        let mut hour12 = (hour % 12.0).floor() as u32;
        if hour12 == 0 {
            hour12 = 12;
        }
        let minutes = ((hour % 1.0) * 60.0).floor() as u32;
        let suffix = if hour < 12.0 { "AM" } else { "PM" };
        format!("{}:{:02} {}", hour12, minutes, suffix)
    }

    pub fn formatted_time(&self) -> String {
        Self::format_hour(self.current_hour())
    }

    pub fn time_period(&self) -> TimePeriod {
        TimePeriod::from_hour(self.current_hour())
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new(12.0, 1.0 / 60.0)
    }
}

impl Describe for GameClock {
    fn describe(&self) -> String {
        let hour = self.current_hour();
        format!(
            "It is {} ({})",
            Self::format_hour(hour),
            TimePeriod::from_hour(hour)
        )
    }
}
