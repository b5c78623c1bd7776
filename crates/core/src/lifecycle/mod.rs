//! Lifecycle state machine shared by every subsystem.
//!
//! ```text
//! Stopped ── start / resume ──► Running ── pause ──► Paused
//!    ▲                           │  ▲                  │
//!    │                           │  └───── resume ─────┤
//!    └─────────── stop ──────────┴──────── stop ───────┘
//! ```
//!
//! Redundant requests (start while running, pause or stop while stopped, ...)
//! are absorbed here and never reach the provider. The state is flipped
//! before the provider is called and is not rolled back if the provider
//! reports a failure.

use serde::{Deserialize, Serialize};

/// Externally observable state of a subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SubsystemState {
    #[default]
    Stopped,
    Running,
    Paused,
}

/// Transitions every provider implements.
///
/// Each call reports whether the backend managed to act.
pub trait Lifecycle: Send {
    fn start(&mut self) -> bool;
    fn pause(&mut self) -> bool;
    fn resume(&mut self) -> bool;
    fn stop(&mut self) -> bool;
}

/// The guard table. Each `begin_*` returns true when the caller must forward
/// the transition to its provider, having already moved to the new state.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleState {
    state: SubsystemState,
}

impl LifecycleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SubsystemState {
        self.state
    }

    pub fn running(&self) -> bool {
        self.state == SubsystemState::Running
    }

    pub fn begin_start(&mut self) -> bool {
        self.enter_if(!self.running(), SubsystemState::Running)
    }

    pub fn begin_pause(&mut self) -> bool {
        self.enter_if(self.running(), SubsystemState::Paused)
    }

    pub fn begin_resume(&mut self) -> bool {
        self.enter_if(!self.running(), SubsystemState::Running)
    }

    pub fn begin_stop(&mut self) -> bool {
        self.enter_if(self.state != SubsystemState::Stopped, SubsystemState::Stopped)
    }

    fn enter_if(&mut self, allowed: bool, next: SubsystemState) -> bool {
        if allowed {
            self.state = next;
        }
        allowed
    }
}

/// Common surface of every lifecycle-managed subsystem.
pub trait Subsystem: Send {
    /// Registry id, e.g. `"Subsystem.Tracking"`.
    fn id(&self) -> &'static str;
    fn state(&self) -> SubsystemState;

    fn running(&self) -> bool {
        self.state() == SubsystemState::Running
    }

    fn start(&mut self) -> bool;
    fn pause(&mut self) -> bool;
    fn resume(&mut self) -> bool;
    fn stop(&mut self) -> bool;
}

/// A provider bound to a guard table.
///
/// Concrete subsystems embed one of these and add their domain queries on
/// top of [`SubsystemCore::provider`]. Transitions that the guard absorbs
/// return `true`; forwarded ones return the provider's outcome.
pub struct SubsystemCore<P: Lifecycle + ?Sized> {
    id: &'static str,
    lifecycle: LifecycleState,
    provider: Box<P>,
}

impl<P: Lifecycle + ?Sized> SubsystemCore<P> {
    pub fn new(id: &'static str, provider: Box<P>) -> Self {
        Self {
            id,
            lifecycle: LifecycleState::new(),
            provider,
        }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn state(&self) -> SubsystemState {
        self.lifecycle.state()
    }

    pub fn running(&self) -> bool {
        self.lifecycle.running()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn start(&mut self) -> bool {
        if !self.lifecycle.begin_start() {
            tracing::trace!(id = self.id, "start ignored, already running");
            return true;
        }
        tracing::debug!(id = self.id, "starting subsystem");
        let succeeded = self.provider.start();
        self.report("start", succeeded)
    }

    pub fn pause(&mut self) -> bool {
        if !self.lifecycle.begin_pause() {
            tracing::trace!(id = self.id, state = ?self.state(), "pause ignored, not running");
            return true;
        }
        tracing::debug!(id = self.id, "pausing subsystem");
        let succeeded = self.provider.pause();
        self.report("pause", succeeded)
    }

    pub fn resume(&mut self) -> bool {
        if !self.lifecycle.begin_resume() {
            tracing::trace!(id = self.id, "resume ignored, already running");
            return true;
        }
        tracing::debug!(id = self.id, "resuming subsystem");
        let succeeded = self.provider.resume();
        self.report("resume", succeeded)
    }

    pub fn stop(&mut self) -> bool {
        if !self.lifecycle.begin_stop() {
            tracing::trace!(id = self.id, "stop ignored, already stopped");
            return true;
        }
        tracing::debug!(id = self.id, "stopping subsystem");
        let succeeded = self.provider.stop();
        self.report("stop", succeeded)
    }

    fn report(&self, transition: &'static str, succeeded: bool) -> bool {
        if !succeeded {
            tracing::warn!(
                id = self.id,
                transition,
                state = ?self.state(),
                "provider failed its transition; subsystem state kept"
            );
        }
        succeeded
    }
}

impl<P: Lifecycle + ?Sized> std::fmt::Debug for SubsystemCore<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubsystemCore")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Provider that records every call it receives.
    pub(crate) struct RecordingProvider {
        pub calls: Arc<Mutex<Vec<&'static str>>>,
        pub succeed: bool,
    }

    impl RecordingProvider {
        pub(crate) fn new() -> (Self, Arc<Mutex<Vec<&'static str>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    calls: calls.clone(),
                    succeed: true,
                },
                calls,
            )
        }

        fn push(&self, call: &'static str) -> bool {
            self.calls.lock().unwrap().push(call);
            self.succeed
        }
    }

    impl Lifecycle for RecordingProvider {
        fn start(&mut self) -> bool {
            self.push("start")
        }

        fn pause(&mut self) -> bool {
            self.push("pause")
        }

        fn resume(&mut self) -> bool {
            self.push("resume")
        }

        fn stop(&mut self) -> bool {
            self.push("stop")
        }
    }

    fn core() -> (SubsystemCore<RecordingProvider>, Arc<Mutex<Vec<&'static str>>>) {
        let (provider, calls) = RecordingProvider::new();
        (SubsystemCore::new("Subsystem.Test", Box::new(provider)), calls)
    }

    #[test]
    fn starts_stopped() {
        let (core, calls) = core();
        assert_eq!(core.state(), SubsystemState::Stopped);
        assert!(!core.running());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn double_start_invokes_provider_once() {
        let (mut core, calls) = core();
        assert!(core.start());
        assert!(core.start());
        assert_eq!(*calls.lock().unwrap(), vec!["start"]);
        assert_eq!(core.state(), SubsystemState::Running);
    }

    #[test]
    fn stop_while_stopped_is_silent() {
        let (mut core, calls) = core();
        assert!(core.stop());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn full_cycle_forwards_one_call_per_transition() {
        let (mut core, calls) = core();
        let mut observed = Vec::new();

        core.start();
        observed.push(core.running());
        core.pause();
        observed.push(core.running());
        assert_eq!(core.state(), SubsystemState::Paused);
        core.resume();
        observed.push(core.running());
        core.stop();
        observed.push(core.running());

        assert_eq!(observed, vec![true, false, true, false]);
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["start", "pause", "resume", "stop"]
        );
        assert_eq!(core.state(), SubsystemState::Stopped);
    }

    #[test]
    fn pause_is_ignored_unless_running() {
        let (mut core, calls) = core();
        core.pause();
        assert_eq!(core.state(), SubsystemState::Stopped);

        core.start();
        core.pause();
        core.pause();
        assert_eq!(*calls.lock().unwrap(), vec!["start", "pause"]);
    }

    #[test]
    fn stop_from_paused_reaches_provider() {
        let (mut core, calls) = core();
        core.start();
        core.pause();
        core.stop();
        assert_eq!(*calls.lock().unwrap(), vec!["start", "pause", "stop"]);
        assert_eq!(core.state(), SubsystemState::Stopped);
    }

    #[test]
    fn resume_from_stopped_forwards_resume() {
        let (mut core, calls) = core();
        core.resume();
        assert!(core.running());
        assert_eq!(*calls.lock().unwrap(), vec!["resume"]);
    }

    #[test]
    fn provider_failure_keeps_requested_state() {
        let (mut provider, calls) = RecordingProvider::new();
        provider.succeed = false;
        let mut core = SubsystemCore::new("Subsystem.Test", Box::new(provider));

        assert!(!core.start());
        assert!(core.running());
        assert!(core.start());
        assert_eq!(*calls.lock().unwrap(), vec!["start"]);
    }
}
