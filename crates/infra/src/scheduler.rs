//! Daily buffer recalculation runner.
//!
//! A background thread that sweeps every configured organization through
//! [`BufferRecalculator::recalculate_all`] on a fixed cadence, or earlier when
//! triggered. Failures are logged and retried with bounded backoff; they never
//! propagate to the caller. A disabled runner starts no thread at all.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use flowplan_core::OrganizationId;

use crate::config::SchedulerConfig;
use crate::engine::{BatchRecalculationReport, BufferRecalculator};

/// Receives each finished organization sweep.
pub trait RecalculationReportSink: Send + Sync + 'static {
    fn report(&self, report: BatchRecalculationReport);
}

/// Discards reports (they are already logged).
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlySink;

impl RecalculationReportSink for LogOnlySink {
    fn report(&self, _report: BatchRecalculationReport) {}
}

/// Keeps every report, for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryReportSink {
    inner: std::sync::Mutex<Vec<BatchRecalculationReport>>,
}

impl InMemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<BatchRecalculationReport> {
        match self.inner.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl RecalculationReportSink for InMemoryReportSink {
    fn report(&self, report: BatchRecalculationReport) {
        if let Ok(mut g) = self.inner.lock() {
            g.push(report);
        }
    }
}

impl<S> RecalculationReportSink for std::sync::Arc<S>
where
    S: RecalculationReportSink + ?Sized,
{
    fn report(&self, report: BatchRecalculationReport) {
        (**self).report(report)
    }
}

#[derive(Debug, Clone)]
pub struct DailyRecalculationRunner {
    pub enabled: bool,
    pub interval: Duration,
    pub organizations: Vec<OrganizationId>,
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for DailyRecalculationRunner {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }
}

/// Handle for the running sweep (shutdown + trigger hook).
#[derive(Debug)]
pub struct DailyRecalculationHandle {
    shutdown: mpsc::Sender<()>,
    trigger: mpsc::SyncSender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl DailyRecalculationHandle {
    /// Request a sweep now. Triggers coalesce: a pending sweep absorbs new ones.
    pub fn trigger(&self) {
        let _ = self.trigger.try_send(());
    }

    /// Stop the runner and wait for the thread to exit.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

impl DailyRecalculationRunner {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            enabled: config.enabled,
            interval: config.interval,
            organizations: config.organizations.clone(),
            max_retries: 3,
            base_backoff: Duration::from_millis(500),
        }
    }

    /// Spawn the runner thread. The first sweep starts right away.
    ///
    /// When disabled, the returned handle is inert: triggers are dropped and
    /// `shutdown` returns immediately.
    pub fn spawn<S>(&self, recalculator: BufferRecalculator, sink: S) -> DailyRecalculationHandle
    where
        S: RecalculationReportSink,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let (trigger_tx, trigger_rx) = mpsc::sync_channel::<()>(1);

        if !self.enabled {
            info!("daily recalculation runner disabled");
            return DailyRecalculationHandle {
                shutdown: shutdown_tx,
                trigger: trigger_tx,
                join: None,
            };
        }

        let cfg = self.clone();
        let join = thread::Builder::new()
            .name("ddmrp-daily-recalculation".to_string())
            .spawn(move || runner_loop(cfg, shutdown_rx, trigger_rx, recalculator, sink))
            .expect("failed to spawn daily recalculation thread");

        DailyRecalculationHandle {
            shutdown: shutdown_tx,
            trigger: trigger_tx,
            join: Some(join),
        }
    }

    /// Like [`spawn`](Self::spawn), with reports only logged.
    pub fn spawn_logging(&self, recalculator: BufferRecalculator) -> DailyRecalculationHandle {
        self.spawn(recalculator, LogOnlySink)
    }
}

fn runner_loop<S>(
    cfg: DailyRecalculationRunner,
    shutdown_rx: mpsc::Receiver<()>,
    trigger_rx: mpsc::Receiver<()>,
    recalculator: BufferRecalculator,
    sink: S,
) where
    S: RecalculationReportSink,
{
    info!(organizations = cfg.organizations.len(), "daily recalculation runner started");

    let mut next_tick = Instant::now() + cfg.interval;
    let mut pending: Vec<OrganizationId> = cfg.organizations.clone();
    let mut failures: u32 = 0;
    let mut backoff_until: Option<Instant> = None;

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        let now = Instant::now();
        if now >= next_tick {
            pending = cfg.organizations.clone();
            while next_tick <= now {
                next_tick += cfg.interval;
            }
        }

        while trigger_rx.try_recv().is_ok() {
            pending = cfg.organizations.clone();
        }

        if let Some(until) = backoff_until {
            if Instant::now() < until {
                thread::sleep(Duration::from_millis(50));
                continue;
            }
            backoff_until = None;
        }

        // One organization per iteration keeps shutdown responsive mid-sweep.
        let Some(&organization_id) = pending.first() else {
            let sleep_for = next_tick
                .saturating_duration_since(Instant::now())
                .min(Duration::from_millis(250));
            thread::sleep(sleep_for);
            continue;
        };

        match recalculator.recalculate_all(organization_id) {
            Ok(report) => {
                failures = 0;
                pending.remove(0);
                info!(
                    organization = %organization_id,
                    total = report.total(),
                    succeeded = report.succeeded(),
                    failed = report.failed(),
                    "organization sweep finished"
                );
                sink.report(report);
            }
            Err(e) => {
                warn!(organization = %organization_id, error = %e, "organization sweep failed");
                failures += 1;
                if failures <= cfg.max_retries {
                    backoff_until = Some(Instant::now() + backoff(cfg.base_backoff, failures));
                } else {
                    failures = 0;
                    pending.remove(0);
                }
            }
        }
    }

    info!("daily recalculation runner stopped");
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    let pow = 1u32 << attempt.saturating_sub(1).min(10);
    let ms = base.as_millis().saturating_mul(pow as u128);
    Duration::from_millis(ms.min(10_000) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff(base, 1), Duration::from_millis(100));
        assert_eq!(backoff(base, 2), Duration::from_millis(200));
        assert_eq!(backoff(base, 4), Duration::from_millis(800));
        assert_eq!(backoff(base, 30), Duration::from_millis(10_000));
    }

    #[test]
    fn runner_copies_schedule_from_config() {
        let org = OrganizationId::new();
        let cfg = SchedulerConfig {
            enabled: true,
            interval: Duration::from_secs(60),
            organizations: vec![org],
        };
        let runner = DailyRecalculationRunner::from_config(&cfg);
        assert!(runner.enabled);
        assert_eq!(runner.interval, Duration::from_secs(60));
        assert_eq!(runner.organizations, vec![org]);
    }
}
