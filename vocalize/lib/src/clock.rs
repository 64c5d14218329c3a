//! The 1 Hz application clock.
//!
//! One tokio task drives a one-second interval and forwards the local
//! wall-clock time into the event loop's channel. The task ends when the
//! [`Clock`] is stopped or dropped, or when the receiving side goes away.

use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

/// Tick period.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Handle to the running clock task.
///
/// ## Examples
///
/// ```no_run
/// use tokio::sync::mpsc;
/// use vocalize_lib::Clock;
///
/// # async fn example() {
/// let (tx, mut rx) = mpsc::channel(8);
/// let clock = Clock::start(tx, |now| now);
///
/// if let Some(now) = rx.recv().await {
///     println!("tick at {now}");
/// }
/// clock.stop();
/// # }
/// ```
#[derive(Debug)]
pub struct Clock {
    handle: JoinHandle<()>,
}

impl Clock {
    /// Starts ticking. The first tick is delivered immediately.
    ///
    /// `wrap` turns each timestamp into the channel's message type, so the
    /// clock can feed an event enum directly.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<T, F>(tx: mpsc::Sender<T>, wrap: F) -> Self
    where
        T: Send + 'static,
        F: Fn(NaiveDateTime) -> T + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval(TICK_INTERVAL);
            // A stalled loop must not produce a burst of catch-up ticks.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let now = Local::now().naive_local();
                if tx.send(wrap(now)).await.is_err() {
                    debug!("Clock receiver closed, stopping");
                    break;
                }
            }
        });

        Self { handle }
    }

    /// Returns true while the ticking task is alive.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stops the clock.
    pub fn stop(self) {
        // Drop does the work.
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
