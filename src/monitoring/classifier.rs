//! Safe-range classification of readings.
//!
//! Every function here is pure: no state, no I/O, total over all `f64`
//! inputs. Non-finite values are always Abnormal.

use crate::monitoring::data::{
    Assessment, ChannelAssessment, ChannelStatus, PipelineStatus, Reading, SafeRange, SafeRanges,
};

/// Classify one value against its range. Bounds are inclusive.
pub fn classify_channel(value: f64, range: SafeRange) -> ChannelStatus {
    if value.is_finite() && range.contains(value) {
        ChannelStatus::Normal
    } else {
        ChannelStatus::Abnormal
    }
}

/// Aggregate verdict for a reading.
///
/// Only channels present in both the reading and `ranges` are evaluated;
/// with nothing to evaluate the pipeline is Normal.
pub fn classify(reading: &Reading, ranges: &SafeRanges) -> PipelineStatus {
    let any_abnormal = evaluated(reading, ranges)
        .any(|(value, range)| classify_channel(value, range) == ChannelStatus::Abnormal);

    if any_abnormal {
        PipelineStatus::Abnormal
    } else {
        PipelineStatus::Normal
    }
}

/// Per-channel breakdown in configuration order, plus the aggregate.
pub fn assess(reading: &Reading, ranges: &SafeRanges) -> Assessment {
    let channels: Vec<ChannelAssessment> = ranges
        .iter()
        .filter_map(|(channel, range)| {
            reading.get(channel).map(|value| ChannelAssessment {
                channel,
                value,
                range,
                status: classify_channel(value, range),
            })
        })
        .collect();

    let status = if channels.iter().all(|c| c.status.is_normal()) {
        PipelineStatus::Normal
    } else {
        PipelineStatus::Abnormal
    };

    Assessment { channels, status }
}

fn evaluated<'a>(
    reading: &'a Reading,
    ranges: &'a SafeRanges,
) -> impl Iterator<Item = (f64, SafeRange)> + 'a {
    ranges
        .iter()
        .filter_map(move |(channel, range)| reading.get(channel).map(|value| (value, range)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::data::Channel;

    fn range(min: f64, max: f64) -> SafeRange {
        SafeRange::new(min, max).unwrap()
    }

    fn scenario_ranges() -> SafeRanges {
        SafeRanges::new()
            .with(Channel::Pressure, 50.0, 100.0)
            .unwrap()
            .with(Channel::Vibration, 2.0, 7.0)
            .unwrap()
            .with(Channel::Temperature, -5.0, 40.0)
            .unwrap()
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let r = range(50.0, 100.0);
        assert_eq!(classify_channel(50.0, r), ChannelStatus::Normal);
        assert_eq!(classify_channel(100.0, r), ChannelStatus::Normal);
        assert_eq!(classify_channel(75.0, r), ChannelStatus::Normal);
        assert_eq!(classify_channel(49.999, r), ChannelStatus::Abnormal);
        assert_eq!(classify_channel(100.001, r), ChannelStatus::Abnormal);
    }

    #[test]
    fn test_degenerate_range() {
        let r = range(3.0, 3.0);
        assert_eq!(classify_channel(3.0, r), ChannelStatus::Normal);
        assert_eq!(classify_channel(3.1, r), ChannelStatus::Abnormal);
    }

    #[test]
    fn test_non_finite_values_are_abnormal() {
        let ranges = [
            range(50.0, 100.0),
            range(f64::NEG_INFINITY, f64::INFINITY),
            range(f64::MIN, f64::MAX),
        ];
        for r in ranges {
            assert_eq!(classify_channel(f64::NAN, r), ChannelStatus::Abnormal);
            assert_eq!(classify_channel(f64::INFINITY, r), ChannelStatus::Abnormal);
            assert_eq!(classify_channel(f64::NEG_INFINITY, r), ChannelStatus::Abnormal);
        }
    }

    #[test]
    fn test_mixed_reading_is_abnormal() {
        let reading = Reading::new(
            1,
            [
                (Channel::Pressure, 95.0),
                (Channel::Vibration, 8.0),
                (Channel::Temperature, 20.0),
            ],
        );
        let assessment = assess(&reading, &scenario_ranges());

        let statuses: Vec<ChannelStatus> = assessment.channels.iter().map(|c| c.status).collect();
        assert_eq!(
            statuses,
            vec![
                ChannelStatus::Normal,
                ChannelStatus::Abnormal,
                ChannelStatus::Normal
            ]
        );
        assert_eq!(assessment.status, PipelineStatus::Abnormal);
        assert_eq!(classify(&reading, &scenario_ranges()), PipelineStatus::Abnormal);
    }

    #[test]
    fn test_all_lower_bounds_is_normal() {
        let reading = Reading::new(
            1,
            [
                (Channel::Pressure, 50.0),
                (Channel::Vibration, 2.0),
                (Channel::Temperature, -5.0),
            ],
        );
        let assessment = assess(&reading, &scenario_ranges());
        assert!(assessment.channels.iter().all(|c| c.status.is_normal()));
        assert_eq!(assessment.status, PipelineStatus::Normal);
        assert_eq!(classify(&reading, &scenario_ranges()), PipelineStatus::Normal);
    }

    #[test]
    fn test_unconfigured_channels_are_ignored() {
        let ranges = SafeRanges::new()
            .with(Channel::Pressure, 50.0, 100.0)
            .unwrap();
        let reading = Reading::new(1, [(Channel::Pressure, 75.0), (Channel::Vibration, 12.0)]);
        assert_eq!(classify(&reading, &ranges), PipelineStatus::Normal);
        assert_eq!(assess(&reading, &ranges).channels.len(), 1);
    }

    #[test]
    fn test_nothing_evaluated_is_normal() {
        let reading = Reading::new(1, [(Channel::Energy, f64::NAN)]);
        assert_eq!(classify(&reading, &scenario_ranges()), PipelineStatus::Normal);
        assert_eq!(classify(&reading, &SafeRanges::new()), PipelineStatus::Normal);
        assert!(assess(&reading, &scenario_ranges()).channels.is_empty());
    }

    #[test]
    fn test_nan_channel_makes_pipeline_abnormal() {
        let reading = Reading::new(
            1,
            [
                (Channel::Pressure, f64::NAN),
                (Channel::Vibration, 4.0),
                (Channel::Temperature, 10.0),
            ],
        );
        assert_eq!(classify(&reading, &scenario_ranges()), PipelineStatus::Abnormal);
    }

    #[test]
    fn test_classify_agrees_with_assess() {
        let values = [-100.0, -5.0, 0.0, 2.0, 7.0, 7.5, 40.0, 50.0, 100.0, 120.0];
        for p in values {
            for v in values {
                for t in values {
                    let reading = Reading::new(
                        1,
                        [
                            (Channel::Pressure, p),
                            (Channel::Vibration, v),
                            (Channel::Temperature, t),
                        ],
                    );
                    let ranges = scenario_ranges();
                    assert_eq!(classify(&reading, &ranges), assess(&reading, &ranges).status);
                }
            }
        }
    }

    #[test]
    fn test_classify_from_many_threads() {
        let reading = std::sync::Arc::new(Reading::new(
            1,
            [(Channel::Pressure, 95.0), (Channel::Vibration, 8.0)],
        ));
        let ranges = std::sync::Arc::new(scenario_ranges());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reading = reading.clone();
                let ranges = ranges.clone();
                std::thread::spawn(move || classify(&reading, &ranges))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), PipelineStatus::Abnormal);
        }
    }

    #[test]
    fn test_leak_detection_floors() {
        let ranges = SafeRanges::leak_detection();
        let healthy = Reading::new(
            1,
            [(Channel::Pressure, 60.0), (Channel::FlowRate, 1_000.0), (Channel::Temperature, 90.0)],
        );
        assert_eq!(classify(&healthy, &ranges), PipelineStatus::Normal);

        let low_flow = Reading::new(2, [(Channel::Pressure, 80.0), (Channel::FlowRate, 219.9)]);
        assert_eq!(classify(&low_flow, &ranges), PipelineStatus::Abnormal);

        let low_pressure = Reading::new(3, [(Channel::Pressure, 59.0), (Channel::FlowRate, 250.0)]);
        assert_eq!(classify(&low_pressure, &ranges), PipelineStatus::Abnormal);
    }
}
