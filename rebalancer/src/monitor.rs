//! Fill monitoring: wait, then poll order status until settled or timed out.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use tradelink::{OrderExecutionRecord, OrderRequest};
use tradelink_broker::Brokerage;

use crate::error::{Error, Result};

/// Longest single sleep; the cancel flag is checked between slices.
const SLEEP_SLICE: Duration = Duration::from_secs(1);

/// Monotonic time source.
pub trait Clock: Send + Sync {
    /// Time since the clock was created.
    fn elapsed(&self) -> Duration;
    fn sleep(&self, duration: Duration);
}

/// Wall clock.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that advances only when slept on.
#[derive(Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) += duration;
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// An order accepted by the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedOrder {
    pub order_id: String,
    pub request: OrderRequest,
}

/// Result of one monitoring window.
#[derive(Debug, Clone)]
pub struct MonitorResult {
    /// One record per submitted order, in submission order.
    pub records: Vec<OrderExecutionRecord>,
    /// Every order reached a terminal status.
    pub settled: bool,
    pub polls: u32,
}

pub struct FillMonitor<'a> {
    clock: &'a dyn Clock,
    cancel: &'a AtomicBool,
    pub initial_wait: Duration,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl<'a> FillMonitor<'a> {
    pub fn new(clock: &'a dyn Clock, cancel: &'a AtomicBool) -> Self {
        Self {
            clock,
            cancel,
            initial_wait: Duration::from_secs(30),
            poll_interval: Duration::from_secs(300),
            timeout: Duration::from_secs(1800),
        }
    }

    pub fn with_timing(
        mut self,
        initial_wait: Duration,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        self.initial_wait = initial_wait;
        self.poll_interval = poll_interval;
        self.timeout = timeout;
        self
    }

    fn check_cancel(&self) -> Result<()> {
        if self.cancel.load(Ordering::Relaxed) {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep up to `duration`, in slices, bailing out on cancellation.
    fn wait(&self, duration: Duration) -> Result<()> {
        let mut left = duration;
        while !left.is_zero() {
            self.check_cancel()?;
            let slice = left.min(SLEEP_SLICE);
            self.clock.sleep(slice);
            left -= slice;
        }
        self.check_cancel()
    }

    /// Wait for `orders` to settle. Always polls at least once.
    pub fn wait_for_fills<B: Brokerage + ?Sized>(
        &self,
        broker: &B,
        account_id: &str,
        orders: &[SubmittedOrder],
    ) -> Result<MonitorResult> {
        let start = self.clock.elapsed();
        let deadline = start + self.timeout;
        debug!("Waiting {:?} before first status poll", self.initial_wait);
        self.wait(self.initial_wait.min(self.timeout))?;

        let mut polls = 0;
        loop {
            self.check_cancel()?;
            let listing = broker
                .order_status(account_id)
                .map_err(|e| Error::broker("order status", account_id, e))?;
            polls += 1;

            let records: Vec<OrderExecutionRecord> = orders
                .iter()
                .map(|o| {
                    listing
                        .iter()
                        .find(|r| r.order_id == o.order_id)
                        .cloned()
                        .unwrap_or_else(|| {
                            OrderExecutionRecord::unobserved(&o.order_id, &o.request)
                        })
                })
                .collect();
            let open = records.iter().filter(|r| !r.is_settled()).count();
            info!(
                "Poll {polls}: {} of {} orders settled",
                records.len() - open,
                records.len()
            );

            if open == 0 {
                return Ok(MonitorResult {
                    records,
                    settled: true,
                    polls,
                });
            }
            let now = self.clock.elapsed();
            if now >= deadline {
                warn!("Monitoring timed out with {open} orders still open");
                return Ok(MonitorResult {
                    records,
                    settled: false,
                    polls,
                });
            }
            self.wait(self.poll_interval.min(deadline - now))?;
        }
    }
}
