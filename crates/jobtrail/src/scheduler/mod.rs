//! Background scan scheduler.
//!
//! State machine: Idle -> Scanning -> Idle on success, or
//! Idle -> Scanning -> Backoff -> Idle on transient failure. Runs on a
//! dedicated thread with a current-thread runtime; wakes on the interval
//! tick or a manual trigger. Only one scan is ever in flight; triggers
//! that arrive mid-scan are coalesced, not queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::broadcast;

use crate::error::JobtrailError;
use crate::events::{ScanEvent, ScanEventBroadcaster};
use crate::mail::MailSource;
use crate::pipeline::ScanPipeline;

/// Delay before the first retry after a transient failure.
const INITIAL_BACKOFF: Duration = Duration::from_secs(30);
/// Upper bound for the doubling backoff.
const MAX_BACKOFF: Duration = Duration::from_secs(15 * 60);

/// Doubles the backoff, capped at [`MAX_BACKOFF`].
fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}

/// Single-flight guard: at most one scan runs at a time. A trigger
/// arriving while a scan is in flight is a no-op.
pub struct ScanGate {
    in_flight: AtomicBool,
}

impl ScanGate {
    pub fn new() -> Self {
        Self {
            in_flight: AtomicBool::new(false),
        }
    }

    /// Claims the gate. Returns false when a scan is already running.
    pub fn try_begin(&self) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn end(&self) {
        self.in_flight.store(false, Ordering::Release);
    }

    pub fn is_scanning(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Default for ScanGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodic scan scheduler driving the pipeline.
pub struct ScanScheduler {
    pipeline: Arc<ScanPipeline>,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
    broadcaster: Arc<ScanEventBroadcaster>,
    gate: Arc<ScanGate>,
}

impl ScanScheduler {
    pub fn new(
        pipeline: Arc<ScanPipeline>,
        interval: Duration,
        broadcaster: Arc<ScanEventBroadcaster>,
    ) -> Self {
        Self {
            pipeline,
            interval,
            shutdown: Arc::new(AtomicBool::new(false)),
            broadcaster,
            gate: Arc::new(ScanGate::new()),
        }
    }

    pub fn gate(&self) -> Arc<ScanGate> {
        Arc::clone(&self.gate)
    }

    /// Starts the scan loop in a background thread. `make_source` builds
    /// a fresh mail source per pass (a failed session is never reused);
    /// `trigger_rx` delivers manual scan requests.
    pub fn start<S, F>(
        &self,
        mut make_source: F,
        mut trigger_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()>
    where
        S: MailSource + 'static,
        F: FnMut() -> S + Send + 'static,
    {
        let pipeline = Arc::clone(&self.pipeline);
        let shutdown = Arc::clone(&self.shutdown);
        let interval = self.interval;
        let broadcaster = Arc::clone(&self.broadcaster);
        let gate = Arc::clone(&self.gate);

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build scheduler runtime");

            rt.block_on(async {
                let mut interval_timer = tokio::time::interval(interval);
                interval_timer.tick().await; // skip immediate first tick

                let mut backoff = INITIAL_BACKOFF;
                let mut next_auto_attempt = Instant::now();
                let mut auth_failed = false;

                loop {
                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    let manual = tokio::select! {
                        _ = interval_timer.tick() => false,
                        Ok(()) = trigger_rx.recv() => {
                            log::info!("Manual scan triggered");
                            true
                        },
                    };

                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    // Automatic ticks respect backoff and the fatal-auth
                    // pause; a manual trigger always runs (it is how the
                    // user retries after fixing credentials).
                    if !manual && (auth_failed || Instant::now() < next_auto_attempt) {
                        continue;
                    }

                    if !gate.try_begin() {
                        log::debug!("Scan already in flight, trigger coalesced");
                        continue;
                    }

                    let started_at = Utc::now();
                    let mut source = make_source();
                    let result = pipeline.run(&mut source).await;
                    gate.end();

                    // Triggers that queued up during the scan are
                    // satisfied by the pass that just ran.
                    while trigger_rx.try_recv().is_ok() {}

                    match result {
                        Ok(summary) => {
                            backoff = INITIAL_BACKOFF;
                            next_auto_attempt = Instant::now();
                            auth_failed = false;
                            broadcaster.send(ScanEvent::success(
                                pipeline.mailbox_name(),
                                started_at,
                                summary,
                            ));
                        }
                        Err(failure) => {
                            let fatal =
                                matches!(&failure.error, JobtrailError::Mail(m) if m.is_fatal());
                            if fatal {
                                log::error!(
                                    "Scan failed, automatic retries paused: {}",
                                    failure.error
                                );
                                auth_failed = true;
                            } else {
                                log::error!(
                                    "Scan failed: {} (next automatic attempt in {:?})",
                                    failure.error,
                                    backoff
                                );
                                next_auto_attempt = Instant::now() + backoff;
                                backoff = next_backoff(backoff);
                            }
                            // The failure still carries the counts from
                            // before the abort; report them.
                            broadcaster.send(ScanEvent::failure(
                                pipeline.mailbox_name(),
                                started_at,
                                failure.summary,
                                &failure.error.to_string(),
                                fatal,
                            ));
                        }
                    }
                }
            });
        })
    }

    /// Signals the scheduler to stop. An in-flight scan finishes its
    /// pass; the watermark is never left half-written.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanSettings;
    use crate::mail::{self, FetchBatch, MailError, RawMessage, Watermark};
    use crate::store::Database;
    use async_trait::async_trait;

    struct EmptySource;

    #[async_trait]
    impl MailSource for EmptySource {
        async fn fetch_since(&mut self, _watermark: Option<Watermark>) -> mail::Result<FetchBatch> {
            Ok(FetchBatch {
                uidvalidity: 1,
                ..Default::default()
            })
        }

        async fn close(&mut self) -> mail::Result<()> {
            Ok(())
        }
    }

    struct TwoApplicationsSource;

    #[async_trait]
    impl MailSource for TwoApplicationsSource {
        async fn fetch_since(&mut self, _watermark: Option<Watermark>) -> mail::Result<FetchBatch> {
            let mk = |uid: u32, sender: &str, subject: &str, body: &str| RawMessage {
                uid,
                message_id: format!("<m{uid}@test>"),
                sender: sender.to_string(),
                sender_display: None,
                subject: subject.to_string(),
                body: body.to_string(),
                received: chrono::Utc::now(),
            };
            Ok(FetchBatch {
                uidvalidity: 1,
                messages: vec![
                    mk(
                        1,
                        "careers@acmecorp.com",
                        "Your application to Acme Corp",
                        "Thank you for applying for the Backend Engineer position.",
                    ),
                    mk(
                        2,
                        "talent@initech.com",
                        "Your application to Initech",
                        "Thank you for applying for the Data Analyst position.",
                    ),
                ],
                parse_failures: 0,
                last_fetched_uid: Some(2),
            })
        }

        async fn close(&mut self) -> mail::Result<()> {
            Ok(())
        }
    }

    struct AuthFailingSource;

    #[async_trait]
    impl MailSource for AuthFailingSource {
        async fn fetch_since(&mut self, _watermark: Option<Watermark>) -> mail::Result<FetchBatch> {
            Err(MailError::AuthenticationFailed("LOGIN rejected".into()))
        }

        async fn close(&mut self) -> mail::Result<()> {
            Ok(())
        }
    }

    fn scheduler(interval: Duration) -> (ScanScheduler, Arc<ScanEventBroadcaster>) {
        let db = Database::open_in_memory().unwrap();
        let pipeline = Arc::new(ScanPipeline::new(
            db,
            "me@example.com".to_string(),
            &ScanSettings::default(),
        ));
        let broadcaster = Arc::new(ScanEventBroadcaster::default());
        let scheduler = ScanScheduler::new(pipeline, interval, Arc::clone(&broadcaster));
        (scheduler, broadcaster)
    }

    fn wait_for_event(rx: &mut broadcast::Receiver<ScanEvent>) -> Option<ScanEvent> {
        for _ in 0..100 {
            if let Ok(event) = rx.try_recv() {
                return Some(event);
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        None
    }

    #[test]
    fn test_gate_is_single_flight() {
        let gate = ScanGate::new();
        assert!(gate.try_begin());
        assert!(gate.is_scanning());
        // Second claim while scanning is refused.
        assert!(!gate.try_begin());
        gate.end();
        assert!(gate.try_begin());
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = INITIAL_BACKOFF;
        backoff = next_backoff(backoff);
        assert_eq!(backoff, INITIAL_BACKOFF * 2);
        for _ in 0..20 {
            backoff = next_backoff(backoff);
        }
        assert_eq!(backoff, MAX_BACKOFF);
    }

    #[test]
    fn test_scheduler_shutdown() {
        let (scheduler, _broadcaster) = scheduler(Duration::from_millis(50));
        let (trigger_tx, trigger_rx) = broadcast::channel(16);
        let handle = scheduler.start(|| EmptySource, trigger_rx);

        // Let it run briefly then stop
        std::thread::sleep(Duration::from_millis(100));
        scheduler.stop();

        // Send a trigger to wake up the select loop so it sees the shutdown
        let _ = trigger_tx.send(());

        // Should join within a reasonable time
        handle.join().expect("scheduler thread panicked");
    }

    #[test]
    fn test_manual_trigger_emits_one_event() {
        let (scheduler, broadcaster) = scheduler(Duration::from_secs(3600));
        let mut rx = broadcaster.subscribe();
        let (trigger_tx, trigger_rx) = broadcast::channel(16);
        let handle = scheduler.start(|| EmptySource, trigger_rx);

        trigger_tx.send(()).unwrap();
        let event = wait_for_event(&mut rx).expect("no scan event received");
        assert_eq!(event.mailbox, "me@example.com");
        assert!(event.error.is_none());

        scheduler.stop();
        let _ = trigger_tx.send(());
        handle.join().unwrap();
    }

    #[test]
    fn test_failure_event_carries_partial_counts() {
        let db = Database::open_in_memory().unwrap();
        // Refuse every insert after the first, as a disk-full stand-in.
        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER block_second_application BEFORE INSERT ON applications
                 WHEN (SELECT COUNT(*) FROM applications) >= 1
                 BEGIN SELECT RAISE(ABORT, 'insert refused'); END;",
            )?;
            Ok(())
        })
        .unwrap();

        let pipeline = Arc::new(ScanPipeline::new(
            db,
            "me@example.com".to_string(),
            &ScanSettings::default(),
        ));
        let broadcaster = Arc::new(ScanEventBroadcaster::default());
        let scheduler =
            ScanScheduler::new(pipeline, Duration::from_secs(3600), Arc::clone(&broadcaster));
        let mut rx = broadcaster.subscribe();
        let (trigger_tx, trigger_rx) = broadcast::channel(16);
        let handle = scheduler.start(|| TwoApplicationsSource, trigger_rx);

        trigger_tx.send(()).unwrap();
        let event = wait_for_event(&mut rx).expect("no scan event received");

        // The pass failed on the second message, but the record created
        // before the abort is still reported.
        assert!(event.error.is_some());
        assert!(!event.auth_failed);
        assert_eq!(event.summary.fetched, 2);
        assert_eq!(event.summary.created, 1);
        assert!(!event.summary.errors.is_empty());

        scheduler.stop();
        let _ = trigger_tx.send(());
        handle.join().unwrap();
    }

    #[test]
    fn test_auth_failure_surfaces_as_actionable() {
        let (scheduler, broadcaster) = scheduler(Duration::from_secs(3600));
        let mut rx = broadcaster.subscribe();
        let (trigger_tx, trigger_rx) = broadcast::channel(16);
        let handle = scheduler.start(|| AuthFailingSource, trigger_rx);

        trigger_tx.send(()).unwrap();
        let event = wait_for_event(&mut rx).expect("no scan event received");
        assert!(event.auth_failed);
        assert!(event.error.as_deref().unwrap().contains("Authentication"));

        scheduler.stop();
        let _ = trigger_tx.send(());
        handle.join().unwrap();
    }
}
