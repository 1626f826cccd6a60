//! The daily scheduler loop: wakes hourly, triggers once the configured
//! time of day is reached, runs one fetch/format/send cycle, then sleeps
//! through to the next day.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveTime, Timelike};

use std::sync::Arc;
use std::time::Duration;

use crate::digest::{digest_subject, format_digest};
use crate::email::DigestTransport;
use crate::error::CycleError;
use crate::fetcher::{fetch_todays_likes, LikesSource};
use crate::post::Post;

const SECS_PER_DAY: u64 = 86_400;

/// Wall-clock capability. Production uses [`SystemClock`]; tests inject a
/// fake so no test ever blocks on real time.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    async fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Waiting,
    Triggered,
}

/// Outcome of one triggered cycle. Failures are already logged when this
/// is returned; the loop never terminates on them.
#[derive(Debug)]
pub enum CycleOutcome {
    Sent { posts: usize },
    Empty,
    Failed(CycleError),
}

#[derive(Debug, Clone)]
pub struct Schedule {
    pub trigger_time: NaiveTime,
    pub poll_interval: Duration,
    pub max_results: u32,
}

pub struct Scheduler {
    source: Arc<dyn LikesSource>,
    transport: Arc<dyn DigestTransport>,
    clock: Arc<dyn Clock>,
    schedule: Schedule,
    state: SchedulerState,
    // Daily buffer: only this loop ever touches it.
    buffer: Vec<Post>,
}

impl Scheduler {
    pub fn new(
        source: Arc<dyn LikesSource>,
        transport: Arc<dyn DigestTransport>,
        clock: Arc<dyn Clock>,
        schedule: Schedule,
    ) -> Self {
        Self {
            source,
            transport,
            clock,
            schedule,
            state: SchedulerState::Waiting,
            buffer: vec![],
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub async fn run_loop(&mut self) -> Result<()> {
        tracing::info!(
            "Starting X favorites digest service (trigger time {})",
            self.schedule.trigger_time.format("%H:%M")
        );

        loop {
            self.tick().await;
        }
    }

    /// One scheduling decision: trigger and sleep until tomorrow, or wait
    /// out the poll interval and re-check.
    async fn tick(&mut self) {
        let now = self.clock.now();
        tracing::info!("Current time: {}", now.format("%H:%M:%S"));

        if should_trigger(now.time(), self.schedule.trigger_time) {
            self.state = SchedulerState::Triggered;
            tracing::info!("Trigger time reached, sending digest");

            match self.run_cycle(now.date_naive()).await {
                CycleOutcome::Sent { posts } => {
                    tracing::info!("Digest sent with {posts} favorites");
                }
                CycleOutcome::Empty => {
                    tracing::info!("No favorites to send");
                }
                CycleOutcome::Failed(err) => {
                    tracing::error!("Digest cycle failed: {err}");
                }
            }

            let until_tomorrow = sleep_until_tomorrow(now.time());
            tracing::info!("Sleeping until tomorrow ({}s)", until_tomorrow.as_secs());
            self.clock.sleep(until_tomorrow).await;
            self.state = SchedulerState::Waiting;
        } else {
            tracing::info!(
                "Not time for digest yet, checking again in {}s",
                self.schedule.poll_interval.as_secs()
            );
            self.clock.sleep(self.schedule.poll_interval).await;
        }
    }

    /// Fetch, format, send. The buffer is cleared on every exit path, so
    /// a failed cycle never leaks posts into the next day.
    pub async fn run_cycle(&mut self, today: NaiveDate) -> CycleOutcome {
        let outcome = self.try_cycle(today).await;
        self.buffer.clear();

        match outcome {
            Ok(outcome) => outcome,
            Err(err) => CycleOutcome::Failed(err),
        }
    }

    async fn try_cycle(&mut self, today: NaiveDate) -> Result<CycleOutcome, CycleError> {
        let posts = fetch_todays_likes(self.source.as_ref(), self.schedule.max_results, today)
            .await
            .map_err(CycleError::Fetch)?;
        self.buffer.extend(posts);

        let Some(body) = format_digest(&self.buffer) else {
            return Ok(CycleOutcome::Empty);
        };

        let subject = digest_subject(today);
        self.transport
            .send(&subject, &body)
            .await
            .map_err(CycleError::classify)?;

        Ok(CycleOutcome::Sent {
            posts: self.buffer.len(),
        })
    }
}

pub fn should_trigger(now: NaiveTime, trigger_time: NaiveTime) -> bool {
    now >= trigger_time
}

/// Sleep duration after a triggered cycle: (next midnight - now) + 24h.
/// Always positive; lands the loop in the following day's waiting phase.
pub fn sleep_until_tomorrow(now: NaiveTime) -> Duration {
    let since_midnight = u64::from(now.num_seconds_from_midnight());
    Duration::from_secs(SECS_PER_DAY - since_midnight + SECS_PER_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    use anyhow::anyhow;
    use chrono::TimeZone;

    use std::sync::Mutex;

    use crate::error::DeliveryError;
    use crate::fetcher::tests::{post_at, FakeSource};

    struct FakeTransport {
        fail_with: Option<FakeFailure>,
        sent: Mutex<Vec<(String, String)>>,
    }

    enum FakeFailure {
        Delivery,
        Other,
    }

    impl FakeTransport {
        fn working() -> Self {
            Self {
                fail_with: None,
                sent: Mutex::new(vec![]),
            }
        }

        fn failing(failure: FakeFailure) -> Self {
            Self {
                fail_with: Some(failure),
                sent: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl DigestTransport for FakeTransport {
        async fn send(&self, subject: &str, body: &str) -> Result<()> {
            match self.fail_with {
                Some(FakeFailure::Delivery) => Err(anyhow::Error::new(DeliveryError::Address(
                    "bad".parse::<lettre::Address>().unwrap_err(),
                ))),
                Some(FakeFailure::Other) => Err(anyhow!("transport exploded")),
                None => {
                    self.sent
                        .lock()
                        .unwrap()
                        .push((subject.to_string(), body.to_string()));
                    Ok(())
                }
            }
        }
    }

    struct FrozenClock {
        now: DateTime<Local>,
        slept: Mutex<Vec<Duration>>,
    }

    impl FrozenClock {
        fn at(hour: u32, minute: u32) -> Self {
            Self {
                now: Local.with_ymd_and_hms(2025, 6, 1, hour, minute, 0).unwrap(),
                slept: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl Clock for FrozenClock {
        fn now(&self) -> DateTime<Local> {
            self.now
        }

        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    fn schedule() -> Schedule {
        Schedule {
            trigger_time: NaiveTime::from_hms_opt(23, 30, 0).unwrap(),
            poll_interval: Duration::from_secs(3600),
            max_results: 100,
        }
    }

    fn todays_posts(n: usize) -> Vec<Post> {
        let noon = Local.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        (0..n)
            .map(|i| post_at(&i.to_string(), noon.with_timezone(&chrono::Utc)))
            .collect()
    }

    fn scheduler_with(
        source: Arc<FakeSource>,
        transport: Arc<FakeTransport>,
        clock: Arc<FrozenClock>,
    ) -> Scheduler {
        Scheduler::new(source, transport, clock, schedule())
    }

    #[test]
    fn triggers_iff_time_of_day_reached() {
        let trigger = NaiveTime::from_hms_opt(23, 30, 0).unwrap();
        assert!(!should_trigger(
            NaiveTime::from_hms_opt(23, 29, 59).unwrap(),
            trigger
        ));
        assert!(should_trigger(trigger, trigger));
        assert!(should_trigger(
            NaiveTime::from_hms_opt(23, 31, 0).unwrap(),
            trigger
        ));
    }

    #[test]
    fn sleep_lands_in_tomorrows_waiting_phase() {
        // 23:31 -> 29 minutes to midnight, plus a full day
        let now = NaiveTime::from_hms_opt(23, 31, 0).unwrap();
        assert_eq!(
            sleep_until_tomorrow(now),
            Duration::from_secs(29 * 60 + 86_400)
        );

        let midnight = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        assert_eq!(sleep_until_tomorrow(midnight), Duration::from_secs(172_800));
    }

    #[tokio::test]
    async fn triggered_cycle_sends_digest_and_clears_buffer() {
        let source = Arc::new(FakeSource::with_posts(todays_posts(2)));
        let transport = Arc::new(FakeTransport::working());
        let clock = Arc::new(FrozenClock::at(23, 31));
        let mut scheduler = scheduler_with(source, transport.clone(), clock.clone());

        scheduler.tick().await;

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (subject, body) = &sent[0];
        assert_eq!(subject, "X Favorites Digest - 2025-06-01");
        assert!(body.contains("1. post 0"));
        assert!(body.contains("2. post 1"));

        assert_eq!(scheduler.buffer_len(), 0);
        assert_eq!(scheduler.state(), SchedulerState::Waiting);
        // Slept through to the day after tomorrow's midnight
        assert_eq!(
            *clock.slept.lock().unwrap(),
            vec![Duration::from_secs(29 * 60 + 86_400)]
        );
    }

    #[tokio::test]
    async fn waiting_phase_sleeps_poll_interval() {
        let source = Arc::new(FakeSource::with_posts(todays_posts(1)));
        let transport = Arc::new(FakeTransport::working());
        let clock = Arc::new(FrozenClock::at(10, 0));
        let mut scheduler = scheduler_with(source, transport.clone(), clock.clone());

        scheduler.tick().await;

        assert!(transport.sent.lock().unwrap().is_empty());
        assert_eq!(
            *clock.slept.lock().unwrap(),
            vec![Duration::from_secs(3600)]
        );
    }

    #[tokio::test]
    async fn empty_fetch_skips_sending() {
        let source = Arc::new(FakeSource::with_posts(vec![]));
        let transport = Arc::new(FakeTransport::working());
        let clock = Arc::new(FrozenClock::at(23, 31));
        let mut scheduler = scheduler_with(source, transport.clone(), clock);

        let outcome = scheduler.run_cycle(clock_date()).await;

        assert!(matches!(outcome, CycleOutcome::Empty));
        assert!(transport.sent.lock().unwrap().is_empty());
        assert_eq!(scheduler.buffer_len(), 0);
    }

    #[tokio::test]
    async fn fetch_failure_skips_send_and_clears_buffer() {
        let source = Arc::new(FakeSource::failing_listing("rate limited"));
        let transport = Arc::new(FakeTransport::working());
        let clock = Arc::new(FrozenClock::at(23, 31));
        let mut scheduler = scheduler_with(source, transport.clone(), clock);

        let outcome = scheduler.run_cycle(clock_date()).await;

        assert!(matches!(outcome, CycleOutcome::Failed(CycleError::Fetch(_))));
        assert!(transport.sent.lock().unwrap().is_empty());
        assert_eq!(scheduler.buffer_len(), 0);
    }

    #[tokio::test]
    async fn delivery_failure_is_classified_and_buffer_cleared() {
        let source = Arc::new(FakeSource::with_posts(todays_posts(1)));
        let transport = Arc::new(FakeTransport::failing(FakeFailure::Delivery));
        let clock = Arc::new(FrozenClock::at(23, 31));
        let mut scheduler = scheduler_with(source, transport, clock);

        let outcome = scheduler.run_cycle(clock_date()).await;

        assert!(matches!(
            outcome,
            CycleOutcome::Failed(CycleError::Delivery(_))
        ));
        assert_eq!(scheduler.buffer_len(), 0);
    }

    #[tokio::test]
    async fn unknown_transport_failure_is_unexpected() {
        let source = Arc::new(FakeSource::with_posts(todays_posts(1)));
        let transport = Arc::new(FakeTransport::failing(FakeFailure::Other));
        let clock = Arc::new(FrozenClock::at(23, 31));
        let mut scheduler = scheduler_with(source, transport, clock);

        let outcome = scheduler.run_cycle(clock_date()).await;

        assert!(matches!(
            outcome,
            CycleOutcome::Failed(CycleError::Unexpected(_))
        ));
    }

    #[tokio::test]
    async fn failed_cycle_still_sleeps_until_tomorrow() {
        let source = Arc::new(FakeSource::failing_listing("down"));
        let transport = Arc::new(FakeTransport::working());
        let clock = Arc::new(FrozenClock::at(23, 45));
        let mut scheduler = scheduler_with(source, transport, clock.clone());

        scheduler.tick().await;

        assert_eq!(scheduler.state(), SchedulerState::Waiting);
        assert_eq!(
            *clock.slept.lock().unwrap(),
            vec![Duration::from_secs(15 * 60 + 86_400)]
        );
    }

    fn clock_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }
}
