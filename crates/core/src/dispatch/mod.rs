//! Deferred execution on the host's main-thread tick.
//!
//! Work that must not race the host's update/render loop (creating simulated
//! scene objects, for instance) is queued here and executed when the host
//! calls [`MainThreadQueue::tick`] from its per-frame update.

use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{GlassesError, Result};

type Action = Box<dyn FnOnce() + Send>;

thread_local! {
    static DISPATCHING: Cell<bool> = const { Cell::new(false) };
}

/// Returns true while the current thread is draining a [`MainThreadQueue`].
pub fn is_dispatching() -> bool {
    DISPATCHING.with(Cell::get)
}

/// Fails with [`GlassesError::OffMainThread`] unless called from inside a tick.
pub fn ensure_main_thread(operation: &'static str) -> Result<()> {
    if is_dispatching() {
        Ok(())
    } else {
        Err(GlassesError::OffMainThread(operation))
    }
}

struct Delayed {
    due: f32,
    action: Action,
}

#[derive(Default)]
struct QueueState {
    actions: VecDeque<Action>,
    delayed: Vec<Delayed>,
    now: f32,
}

/// Cloneable handle to a single-consumer action queue.
#[derive(Clone, Default)]
pub struct MainThreadQueue {
    shared: Arc<Mutex<QueueState>>,
}

impl MainThreadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `action` on the next tick.
    pub fn enqueue(&self, action: impl FnOnce() + Send + 'static) {
        match self.lock() {
            Ok(mut state) => state.actions.push_back(Box::new(action)),
            Err(err) => tracing::error!(%err, "dropping main-thread action"),
        }
    }

    /// Runs `action` on the first tick at least `delay_seconds` after the
    /// most recent tick.
    pub fn enqueue_delayed(&self, delay_seconds: f32, action: impl FnOnce() + Send + 'static) {
        if delay_seconds <= 0.0 {
            self.enqueue(action);
            return;
        }

        match self.lock() {
            Ok(mut state) => {
                let due = state.now + delay_seconds;
                state.delayed.push(Delayed {
                    due,
                    action: Box::new(action),
                });
            }
            Err(err) => tracing::error!(%err, "dropping delayed main-thread action"),
        }
    }

    /// Number of actions that have not run yet.
    pub fn pending(&self) -> usize {
        self.lock()
            .map(|state| state.actions.len() + state.delayed.len())
            .unwrap_or(0)
    }

    /// Drains the queue at host time `time_seconds` and returns how many
    /// actions ran.
    ///
    /// Immediate actions run first in FIFO order, then every delayed action
    /// that has come due. Anything enqueued by a running action waits for the
    /// next tick. The lock is released while actions execute.
    pub fn tick(&self, time_seconds: f32) -> usize {
        let (immediate, due) = match self.lock() {
            Ok(mut state) => {
                state.now = time_seconds;
                let immediate: Vec<Action> = state.actions.drain(..).collect();
                let (due, waiting): (Vec<Delayed>, Vec<Delayed>) = state
                    .delayed
                    .drain(..)
                    .partition(|item| item.due <= time_seconds);
                state.delayed = waiting;
                (immediate, due)
            }
            Err(err) => {
                tracing::error!(%err, "main-thread queue unavailable");
                return 0;
            }
        };

        let count = immediate.len() + due.len();
        let _guard = DispatchGuard::enter();
        for action in immediate {
            action();
        }
        for item in due {
            (item.action)();
        }
        if count > 0 {
            tracing::trace!(count, time_seconds, "drained main-thread queue");
        }
        count
    }

    fn lock(&self) -> Result<MutexGuard<'_, QueueState>> {
        self.shared
            .lock()
            .map_err(|_| GlassesError::Poisoned("main-thread queue"))
    }
}

impl fmt::Debug for MainThreadQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainThreadQueue")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Marks the current thread as dispatching; restores the previous flag on drop.
struct DispatchGuard {
    previous: bool,
}

impl DispatchGuard {
    fn enter() -> Self {
        let previous = DISPATCHING.with(|flag| flag.replace(true));
        Self { previous }
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        DISPATCHING.with(|flag| flag.set(self.previous));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[test]
    fn runs_actions_in_fifo_order_on_tick() {
        let queue = MainThreadQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for index in 0..3 {
            let log = log.clone();
            queue.enqueue(move || log.lock().unwrap().push(index));
        }

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(queue.tick(0.0), 3);
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn actions_enqueued_during_tick_wait_for_next_tick() {
        let queue = MainThreadQueue::new();
        let ran = Arc::new(AtomicBool::new(false));
        let inner_queue = queue.clone();
        let inner_ran = ran.clone();
        queue.enqueue(move || {
            inner_queue.enqueue(move || inner_ran.store(true, Ordering::SeqCst));
        });

        assert_eq!(queue.tick(0.0), 1);
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(queue.tick(0.016), 1);
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn delayed_actions_wait_for_host_time() {
        let queue = MainThreadQueue::new();
        queue.tick(1.0);
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        queue.enqueue_delayed(0.5, move || flag.store(true, Ordering::SeqCst));

        assert_eq!(queue.tick(1.2), 0);
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(queue.tick(1.5), 1);
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn dispatch_flag_is_only_set_inside_tick() {
        assert!(ensure_main_thread("spawn").is_err());

        let queue = MainThreadQueue::new();
        let observed = Arc::new(AtomicBool::new(false));
        let flag = observed.clone();
        queue.enqueue(move || flag.store(ensure_main_thread("spawn").is_ok(), Ordering::SeqCst));
        queue.tick(0.0);

        assert!(observed.load(Ordering::SeqCst));
        assert!(!is_dispatching());
    }
}
