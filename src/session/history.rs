//! Session history for trending.

use crate::monitoring::data::{Channel, PipelineStatus};
use crate::monitoring::energy::EnergyLedger;
use crate::session::events::{NarrationRecord, TickReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Append-only record of a session's ticks.
///
/// Every series has one entry per tick; a channel missing from a reading is
/// recorded as `None` so series stay aligned with `timestamps`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    timestamps: Vec<u64>,
    series: BTreeMap<Channel, Vec<Option<f64>>>,
    statuses: Vec<PipelineStatus>,
    /// Grid energy left after the renewable offset, per tick
    grid_kwh: Vec<Option<f64>>,
    /// Carbon emitted by the grid energy, per tick
    carbon_kg: Vec<Option<f64>>,
    latest: Option<TickReport>,
    last_narration: Option<NarrationRecord>,
    energy: EnergyLedger,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tick.
    pub fn record_tick(&mut self, report: &TickReport) {
        let ticks = self.timestamps.len();
        self.timestamps.push(report.reading.timestamp);

        for (channel, value) in report.reading.iter() {
            self.series
                .entry(channel)
                .or_insert_with(|| vec![None; ticks])
                .push(Some(value));
        }
        // Pad channels this reading did not carry.
        for values in self.series.values_mut() {
            if values.len() == ticks {
                values.push(None);
            }
        }

        self.statuses.push(report.assessment.status);
        self.grid_kwh.push(report.energy.map(|e| e.grid_kwh));
        self.carbon_kg.push(report.energy.map(|e| e.carbon_kg));
        if let Some(sample) = &report.energy {
            self.energy.record(sample);
        }
        self.latest = Some(report.clone());
    }

    /// Remember the latest narration outcome.
    pub fn record_narration(&mut self, record: NarrationRecord) {
        self.last_narration = Some(record);
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Number of ticks recorded.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[u64] {
        &self.timestamps
    }

    /// Values recorded for a channel, one per tick.
    pub fn series(&self, channel: Channel) -> Option<&[Option<f64>]> {
        self.series.get(&channel).map(Vec::as_slice)
    }

    /// Channels with at least one recorded value.
    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.series.keys().copied()
    }

    pub fn statuses(&self) -> &[PipelineStatus] {
        &self.statuses
    }

    pub fn latest(&self) -> Option<&TickReport> {
        self.latest.as_ref()
    }

    /// Pipeline status of the most recent tick.
    pub fn last_status(&self) -> Option<PipelineStatus> {
        self.statuses.last().copied()
    }

    pub fn last_narration(&self) -> Option<&NarrationRecord> {
        self.last_narration.as_ref()
    }

    /// Grid kWh per tick; `None` where the tick metered no energy.
    pub fn grid_series(&self) -> &[Option<f64>] {
        &self.grid_kwh
    }

    /// Carbon kg per tick, aligned like [`History::grid_series`].
    pub fn carbon_series(&self) -> &[Option<f64>] {
        &self.carbon_kg
    }

    pub fn energy(&self) -> &EnergyLedger {
        &self.energy
    }

    /// How many recorded ticks were Abnormal.
    pub fn abnormal_count(&self) -> usize {
        self.statuses.iter().filter(|s| !s.is_normal()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::data::{Assessment, Reading};
    use crate::monitoring::energy::{EnergySample, RenewableGeneration};

    fn report(sequence: u64, values: &[(Channel, f64)], status: PipelineStatus) -> TickReport {
        TickReport {
            reading: Reading::at(sequence * 1000, sequence, values.iter().copied()),
            assessment: Assessment {
                channels: Vec::new(),
                status,
            },
            energy: None,
        }
    }

    #[test]
    fn test_series_stay_aligned() {
        let mut history = History::new();
        history.record_tick(&report(1, &[(Channel::Pressure, 60.0)], PipelineStatus::Normal));
        history.record_tick(&report(
            2,
            &[(Channel::Pressure, 70.0), (Channel::Vibration, 9.0)],
            PipelineStatus::Abnormal,
        ));
        history.record_tick(&report(3, &[(Channel::Vibration, 3.0)], PipelineStatus::Normal));

        assert_eq!(history.len(), 3);
        assert_eq!(history.timestamps(), &[1000, 2000, 3000]);
        assert_eq!(
            history.series(Channel::Pressure).unwrap(),
            &[Some(60.0), Some(70.0), None]
        );
        assert_eq!(
            history.series(Channel::Vibration).unwrap(),
            &[None, Some(9.0), Some(3.0)]
        );
        assert!(history.series(Channel::Temperature).is_none());
        assert_eq!(history.abnormal_count(), 1);
        assert_eq!(history.last_status(), Some(PipelineStatus::Normal));
        assert_eq!(history.latest().unwrap().sequence(), 3);
    }

    #[test]
    fn test_energy_totals_and_clear() {
        let mut history = History::new();
        let mut tick = report(1, &[(Channel::Energy, 100.0)], PipelineStatus::Normal);
        tick.energy = Some(EnergySample::compute(
            100.0,
            RenewableGeneration {
                solar_kwh: 25.0,
                wind_kwh: 25.0,
            },
            1.0,
        ));
        history.record_tick(&tick);
        history.record_tick(&report(2, &[(Channel::Pressure, 70.0)], PipelineStatus::Normal));
        assert_eq!(history.energy().grid_kwh, 50.0);
        assert_eq!(history.grid_series(), &[Some(50.0), None]);
        assert_eq!(history.carbon_series(), &[Some(50.0), None]);
        assert_eq!(history.grid_series().len(), history.timestamps().len());

        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.energy(), &EnergyLedger::default());
        assert!(history.latest().is_none());
        assert!(history.grid_series().is_empty());
    }

    #[test]
    fn test_energy_series_track_offset() {
        let mut history = History::new();
        for (sequence, consumed, renewable) in [(1, 80.0, 30.0), (2, 40.0, 60.0)] {
            let mut tick = report(sequence, &[(Channel::Energy, consumed)], PipelineStatus::Normal);
            tick.energy = Some(EnergySample::compute(
                consumed,
                RenewableGeneration {
                    solar_kwh: renewable,
                    wind_kwh: 0.0,
                },
                0.5,
            ));
            history.record_tick(&tick);
        }

        assert_eq!(history.grid_series(), &[Some(50.0), Some(0.0)]);
        assert_eq!(history.carbon_series(), &[Some(25.0), Some(0.0)]);
        assert_eq!(
            history.series(Channel::Energy).unwrap(),
            &[Some(80.0), Some(40.0)]
        );
    }
}
