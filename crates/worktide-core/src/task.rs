//! Cancel-and-replace slots for timers and in-flight work.
//!
//! Every slot holds at most one spawned task. Arming a slot aborts whatever
//! it held before. Tasks report back over a channel tagged with the
//! generation they were armed with, and the owner accepts a report only if
//! the slot still holds that generation. A report that raced past `abort`
//! is therefore discarded.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Default)]
pub(crate) struct TaskSlot {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl TaskSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn arm<F>(&mut self, generation: u64, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.generation = generation;
        self.handle = Some(tokio::spawn(task));
    }

    /// True while the slot holds the task armed with `generation`.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.handle.is_some() && self.generation == generation
    }

    /// Consume the slot if it still holds `generation`.
    ///
    /// Used for one-shot tasks: returns `true` exactly once per arming.
    pub(crate) fn complete(&mut self, generation: u64) -> bool {
        if self.is_current(generation) {
            self.handle = None;
            true
        } else {
            false
        }
    }

    pub(crate) fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Shortest period a repeating task runs at. `interval_at` rejects zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Send `message` once after `delay`.
pub(crate) async fn send_after<T: Send>(tx: UnboundedSender<T>, delay: Duration, message: T) {
    tokio::time::sleep(delay).await;
    let _ = tx.send(message);
}

/// Send a message every `period` until the receiver goes away.
///
/// With `immediate`, the first message is sent right away.
pub(crate) async fn send_every<T, F>(
    tx: UnboundedSender<T>,
    period: Duration,
    immediate: bool,
    mut message: F,
) where
    T: Send,
    F: FnMut() -> T + Send,
{
    let period = period.max(MIN_PERIOD);
    let start = if immediate {
        Instant::now()
    } else {
        Instant::now() + period
    };
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if tx.send(message()).is_err() {
            break;
        }
    }
}
