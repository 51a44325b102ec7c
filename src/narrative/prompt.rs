//! Prompt rendering for safety narration.

use crate::monitoring::data::{Channel, Reading, SafeRanges};
use std::fmt::Write;

/// System message sent alongside every prompt.
pub const DEFAULT_SYSTEM_CONTEXT: &str = "You are a pipeline monitoring assistant.";

/// Question that closes every prompt.
pub const CLOSING_QUESTION: &str =
    "Is the pipeline operating within safe conditions? Provide a brief analysis.";

/// Render the narration prompt for a reading.
///
/// One sentence per channel that is both configured and sampled, in the
/// order the ranges were declared, then the closing question. Output depends
/// only on the arguments.
pub fn build_prompt(reading: &Reading, ranges: &SafeRanges) -> String {
    let mut prompt = String::new();

    for (channel, range) in ranges.iter() {
        let Some(value) = reading.get(channel) else {
            continue;
        };
        let label = channel.label();
        // Writing to a String cannot fail.
        let _ = write!(prompt, "The current {} is {}. ", label, with_unit(value, channel));
        let _ = match (range.has_min(), range.has_max()) {
            (true, true) => write!(
                prompt,
                "The safe range for {} is between {} and {}. ",
                label,
                number(range.min),
                with_unit(range.max, channel),
            ),
            (true, false) => write!(
                prompt,
                "The {} is safe at or above {}. ",
                label,
                with_unit(range.min, channel),
            ),
            (false, true) => write!(
                prompt,
                "The {} is safe at or below {}. ",
                label,
                with_unit(range.max, channel),
            ),
            (false, false) => write!(prompt, "Any {} is considered safe. ", label),
        };
    }

    prompt.push_str(CLOSING_QUESTION);
    prompt
}

fn number(value: f64) -> String {
    format!("{:.2}", value)
}

fn with_unit(value: f64, channel: Channel) -> String {
    match channel.unit() {
        Some(unit) => format!("{:.2} {}", value, unit),
        None => number(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges() -> SafeRanges {
        SafeRanges::new()
            .with(Channel::Pressure, 50.0, 100.0)
            .unwrap()
            .with(Channel::Vibration, 2.0, 7.0)
            .unwrap()
            .with(Channel::Temperature, -5.0, 40.0)
            .unwrap()
    }

    #[test]
    fn test_prompt_text() {
        let reading = Reading::at(
            0,
            1,
            [
                (Channel::Pressure, 95.0),
                (Channel::Vibration, 8.0),
                (Channel::Temperature, 20.0),
            ],
        );

        let expected = "The current pressure is 95.00 psi. \
            The safe range for pressure is between 50.00 and 100.00 psi. \
            The current vibration level is 8.00. \
            The safe range for vibration level is between 2.00 and 7.00. \
            The current temperature is 20.00 °C. \
            The safe range for temperature is between -5.00 and 40.00 °C. \
            Is the pipeline operating within safe conditions? Provide a brief analysis.";
        assert_eq!(build_prompt(&reading, &ranges()), expected);
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let reading = Reading::new(
            3,
            [
                (Channel::Temperature, 12.3456),
                (Channel::Pressure, 61.0),
                (Channel::Vibration, 4.2),
            ],
        );
        let first = build_prompt(&reading, &ranges());
        for _ in 0..10 {
            assert_eq!(build_prompt(&reading, &ranges()), first);
        }
    }

    #[test]
    fn test_prompt_follows_declared_order() {
        let reversed = SafeRanges::new()
            .with(Channel::Temperature, -5.0, 40.0)
            .unwrap()
            .with(Channel::Pressure, 50.0, 100.0)
            .unwrap();
        let reading = Reading::new(1, [(Channel::Pressure, 70.0), (Channel::Temperature, 10.0)]);

        let prompt = build_prompt(&reading, &reversed);
        let temperature = prompt.find("temperature").unwrap();
        let pressure = prompt.find("pressure").unwrap();
        assert!(temperature < pressure);
    }

    #[test]
    fn test_prompt_skips_missing_and_unconfigured_channels() {
        let reading = Reading::new(1, [(Channel::Pressure, 70.0), (Channel::Energy, 99.0)]);
        let prompt = build_prompt(&reading, &ranges());

        assert!(prompt.contains("pressure"));
        assert!(!prompt.contains("vibration"));
        assert!(!prompt.contains("energy"));
        assert!(prompt.ends_with(CLOSING_QUESTION));
    }

    #[test]
    fn test_prompt_for_one_sided_ranges() {
        let reading = Reading::at(
            0,
            1,
            [(Channel::Pressure, 58.0), (Channel::FlowRate, 250.0)],
        );
        let prompt = build_prompt(&reading, &SafeRanges::leak_detection());

        assert_eq!(
            prompt,
            "The current pressure is 58.00 psi. \
            The pressure is safe at or above 60.00 psi. \
            The current flow rate is 250.00 gal/min. \
            The flow rate is safe at or above 220.00 gal/min. \
            Is the pipeline operating within safe conditions? Provide a brief analysis."
        );
        assert!(!prompt.contains("inf"));
    }

    #[test]
    fn test_prompt_without_channels_is_just_the_question() {
        let reading = Reading::new(1, []);
        assert_eq!(build_prompt(&reading, &ranges()), CLOSING_QUESTION);
    }
}
