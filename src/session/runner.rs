//! The tick loop: sample, classify, record, narrate.

use crate::error::{GenerationError, Result};
use crate::monitoring::classifier::assess;
use crate::monitoring::data::{now_millis, Channel, Reading, SafeRanges};
use crate::monitoring::energy::{EnergySample, RenewableGeneration};
use crate::monitoring::sampler::{SamplerProfile, SensorSampler};
use crate::monitoring::traits::ReadingSource;
use crate::narrative::reporter::NarrativeReporter;
use crate::session::config::MonitorConfig;
use crate::session::events::{NarrationOutcome, NarrationRecord, SessionEvent, TickReport};
use crate::session::history::History;
use futures_util::stream::BoxStream;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock, RwLockReadGuard};
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Buffered events per subscriber before slow readers start lagging.
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// What a single tick produced.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub report: TickReport,
    /// `None` when narration was skipped for this tick or discarded on stop
    pub narration: Option<NarrationRecord>,
}

/// A monitoring session.
///
/// Owns the reading source, the reporter and the history. The history is
/// shared with readers through a [`SessionHandle`], but only the session
/// writes to it.
pub struct Session {
    id: Uuid,
    config: MonitorConfig,
    source: Box<dyn ReadingSource>,
    reporter: NarrativeReporter,
    history: Arc<RwLock<History>>,
    events: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
    ticks: u64,
}

/// Cloneable view of a session for displays and controllers.
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    safe_ranges: Arc<SafeRanges>,
    history: Arc<RwLock<History>>,
    events: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
}

impl Session {
    /// Create a session over any reading source.
    ///
    /// The configuration is validated here, so a session that exists can
    /// always run. The reporter picks up the configured token budget and
    /// system context.
    pub fn new(
        config: MonitorConfig,
        source: impl ReadingSource + 'static,
        reporter: NarrativeReporter,
    ) -> Result<Self> {
        config.validate()?;

        let reporter = reporter
            .with_max_output_tokens(config.max_output_tokens)
            .with_system_context(config.narration.system_context.clone());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            id: Uuid::new_v4(),
            config,
            source: Box::new(source),
            reporter,
            history: Arc::new(RwLock::new(History::new())),
            events,
            cancel: CancellationToken::new(),
            ticks: 0,
        })
    }

    /// Create a session driven by the simulated sensors of `config.profile`.
    pub fn simulated(config: MonitorConfig, reporter: NarrativeReporter) -> Result<Self> {
        let profile = SamplerProfile::for_kind(config.profile);
        let sampler = match config.seed {
            Some(seed) => SensorSampler::with_seed(profile, seed)?,
            None => SensorSampler::new(profile)?,
        };
        Self::new(config, sampler, reporter)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            id: self.id,
            safe_ranges: Arc::new(self.config.safe_ranges.clone()),
            history: self.history.clone(),
            events: self.events.clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// Run one tick.
    ///
    /// The history write lock is released before narration starts, so
    /// readers see the new reading while the generator is still working.
    /// A failed narration is recorded and returned; it never touches the
    /// reading, the verdict or the history entry of this tick.
    pub async fn tick(&mut self) -> TickOutcome {
        self.ticks += 1;
        let sequence = self.ticks;

        let reading = self.source.next_reading().with_sequence(sequence);
        let assessment = assess(&reading, &self.config.safe_ranges);
        let energy = self.energy_for(&reading);
        let report = TickReport {
            reading,
            assessment,
            energy,
        };

        self.history.write().await.record_tick(&report);

        if report.status().is_normal() {
            debug!(sequence, "Pipeline normal");
        } else {
            let abnormal: Vec<&str> = report
                .assessment
                .abnormal_channels()
                .map(|c| c.channel.name())
                .collect();
            info!(sequence, channels = ?abnormal, "Pipeline abnormal");
        }

        // No subscribers is fine.
        let _ = self.events.send(SessionEvent::Tick(report.clone()));

        let narration = if self.config.narrates_on(sequence) {
            self.narrate(&report).await
        } else {
            None
        };

        TickOutcome { report, narration }
    }

    /// Tick on the configured interval until stopped. Returns the tick count.
    pub async fn run(mut self) -> u64 {
        let cancel = self.cancel.clone();
        let mut interval = tokio::time::interval(self.config.sample_interval());
        // Narration may overrun the interval; never burst to catch up.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            session = %self.id,
            interval_secs = self.config.sample_interval_secs,
            generator = self.reporter.generator_name(),
            "Monitoring session started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }

        let _ = self.events.send(SessionEvent::Stopped { ticks: self.ticks });
        info!(session = %self.id, ticks = self.ticks, "Monitoring session stopped");
        self.ticks
    }

    fn energy_for(&mut self, reading: &Reading) -> Option<EnergySample> {
        let consumed = reading.get(Channel::Energy).filter(|v| v.is_finite())?;
        let generation = self.source.renewables().unwrap_or(RenewableGeneration {
            solar_kwh: 0.0,
            wind_kwh: 0.0,
        });
        Some(EnergySample::compute(
            consumed,
            generation,
            self.config.carbon_intensity,
        ))
    }

    async fn narrate(&mut self, report: &TickReport) -> Option<NarrationRecord> {
        let sequence = report.sequence();
        let prompt = self
            .reporter
            .build_prompt(&report.reading, &self.config.safe_ranges);
        let timeout = self.config.narration_timeout();

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(sequence, "Session stopped, discarding narration");
                return None;
            }
            result = tokio::time::timeout(timeout, self.reporter.report(&prompt)) => {
                result.unwrap_or_else(|_| Err(GenerationError::TimedOut(timeout)))
            }
        };

        // Stop may have landed while the result was being produced.
        if self.cancel.is_cancelled() {
            debug!(sequence, "Session stopped, discarding narration");
            return None;
        }

        let outcome = match result {
            Ok(text) => NarrationOutcome::Text { text },
            Err(err) => {
                warn!(sequence, error = %err, "Narration failed");
                NarrationOutcome::Failed {
                    error: err.to_string(),
                }
            }
        };
        let record = NarrationRecord {
            sequence,
            completed_at: now_millis(),
            outcome,
        };

        self.history.write().await.record_narration(record.clone());
        let _ = self.events.send(SessionEvent::Narration(record.clone()));
        Some(record)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("reporter", &self.reporter)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Ranges the session classifies against.
    pub fn safe_ranges(&self) -> &SafeRanges {
        &self.safe_ranges
    }

    /// Stop the session. Idempotent.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the session has been asked to stop.
    pub async fn stopped(&self) {
        self.cancel.cancelled().await
    }

    /// Read access to the history. Hold the guard briefly.
    pub async fn history(&self) -> RwLockReadGuard<'_, History> {
        self.history.read().await
    }

    /// Receive events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Events as a stream. Events missed by a lagging reader are skipped.
    pub fn stream(&self) -> BoxStream<'static, SessionEvent> {
        let stream = BroadcastStream::new(self.subscribe()).filter_map(|event| match event {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "Event subscriber lagging, events dropped");
                None
            }
        });
        Box::pin(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::data::PipelineStatus;
    use crate::narrative::generator::OfflineGenerator;

    struct Fixed(Vec<(Channel, f64)>);

    impl ReadingSource for Fixed {
        fn next_reading(&mut self) -> Reading {
            Reading::new(0, self.0.iter().copied())
        }
    }

    fn reporter() -> NarrativeReporter {
        NarrativeReporter::new(Arc::new(OfflineGenerator))
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_start() {
        let config = MonitorConfig::default().with_interval_secs(-1.0);
        assert!(Session::new(config, Fixed(vec![]), reporter()).is_err());
    }

    #[test]
    fn test_rejected_config_reports_session_debug() {
        let config = MonitorConfig::default().with_interval_secs(0.0);
        let err = Session::new(config, Fixed(vec![]), reporter()).unwrap_err();
        assert!(err.to_string().contains("sample_interval_secs"));

        let session = Session::new(MonitorConfig::default(), Fixed(vec![]), reporter()).unwrap();
        let debug = format!("{:?}", session);
        assert!(debug.starts_with("Session"));
        assert!(debug.contains("ticks: 0"));
    }

    #[tokio::test]
    async fn test_tick_numbers_readings() {
        let mut session = Session::new(
            MonitorConfig::default(),
            Fixed(vec![(Channel::Pressure, 75.0)]),
            reporter(),
        )
        .unwrap();

        let first = session.tick().await;
        let second = session.tick().await;
        assert_eq!(first.report.sequence(), 1);
        assert_eq!(second.report.sequence(), 2);
        assert_eq!(second.report.status(), PipelineStatus::Normal);
    }

    #[tokio::test]
    async fn test_narration_throttle() {
        let config = MonitorConfig::default().with_narration_every_ticks(3);
        let mut session = Session::new(config, Fixed(vec![]), reporter()).unwrap();

        let narrated: Vec<bool> = {
            let mut flags = Vec::new();
            for _ in 0..7 {
                flags.push(session.tick().await.narration.is_some());
            }
            flags
        };
        assert_eq!(narrated, vec![true, false, false, true, false, false, true]);
    }

    #[tokio::test]
    async fn test_energy_without_renewables() {
        let config = MonitorConfig::default();
        let mut session =
            Session::new(config, Fixed(vec![(Channel::Energy, 80.0)]), reporter()).unwrap();
        let energy = session.tick().await.report.energy.unwrap();
        assert_eq!(energy.grid_kwh, 80.0);
    }

    #[tokio::test]
    async fn test_simulated_oil_session_meters_energy() {
        let config = MonitorConfig::default()
            .with_profile(crate::monitoring::sampler::ProfileKind::OilTransmission)
            .with_seed(Some(5));
        let mut session = Session::simulated(config, reporter()).unwrap();
        let outcome = session.tick().await;

        let energy = outcome.report.energy.unwrap();
        assert!(energy.grid_kwh >= 0.0);
        assert!((50.0..=150.0).contains(&energy.consumed_kwh));
        assert_eq!(session.handle().history().await.energy().ticks, 1);
    }
}
