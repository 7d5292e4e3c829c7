//! Description capability shared by every scene entry
//!
//! Anything that can appear in the scene context (world facts, locations,
//! characters, events, the clock) produces a human-readable description on
//! demand. Descriptions are read synchronously while a prompt is rendered and
//! must be cheap and side-effect free.

use std::sync::Arc;

/// Produces a description string that a language model can read
pub trait Describe: Send + Sync {
    fn describe(&self) -> String;
}

/// Shared handle to a description provider held by the scene context
pub type DescriptionProvider = Arc<dyn Describe>;

impl Describe for String {
    fn describe(&self) -> String {
        self.clone()
    }
}

impl Describe for &'static str {
    fn describe(&self) -> String {
        (*self).to_string()
    }
}

/// Convert a value on a 0-10 scale to words
pub fn ten_scale_to_text(value: i32) -> &'static str {
    match value {
        0 => "None",
        1 => "Very Low",
        2 => "Low",
        3 => "Moderate",
        4 => "Average",
        5 => "Normal",
        6 => "Above Average",
        7 => "High",
        8 => "Very High",
        9 => "Extreme",
        10 => "Maximum",
        _ => "Unknown",
    }
}

/// Convert a value on a 0-100 scale to words, in steps of ten
pub fn hundred_scale_to_text(value: i32) -> &'static str {
    if value == 0 {
        return "None";
    }
    ten_scale_to_text(value / 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ten_scale_bounds() {
        assert_eq!(ten_scale_to_text(0), "None");
        assert_eq!(ten_scale_to_text(6), "Above Average");
        assert_eq!(ten_scale_to_text(10), "Maximum");
        assert_eq!(ten_scale_to_text(11), "Unknown");
        assert_eq!(ten_scale_to_text(-1), "Unknown");
    }

    #[test]
    fn test_hundred_scale_steps_by_ten() {
        assert_eq!(hundred_scale_to_text(0), "None");
        assert_eq!(hundred_scale_to_text(5), "None");
        assert_eq!(hundred_scale_to_text(35), "Moderate");
        assert_eq!(hundred_scale_to_text(100), "Maximum");
    }

    #[test]
    fn test_string_describes_itself() {
        let fact = String::from("The harbour is frozen");
        assert_eq!(fact.describe(), "The harbour is frozen");
    }
}
