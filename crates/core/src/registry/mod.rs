//! Keyed factory that keeps at most one live instance per subsystem id.
//!
//! ```text
//! create(descriptor)
//!   ├─ id cached ──► same Arc as before (downcast to the descriptor's type)
//!   └─ id missing ─► descriptor.factory(context)
//!                      ├─ Ok  ──► cache, return
//!                      └─ Err ──► log, Construction error, nothing cached
//! ```

mod context;

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use crate::{GlassesError, Result, Subsystem, SubsystemState};

pub use context::SubsystemContext;

/// Shared handle to a cached subsystem.
pub type SubsystemHandle<S> = Arc<Mutex<S>>;

type Factory<S> = dyn Fn(&SubsystemContext) -> Result<S> + Send + Sync;

/// Locks a subsystem handle, mapping poisoning into [`GlassesError::Poisoned`].
pub fn lock<S: ?Sized>(handle: &Arc<Mutex<S>>) -> Result<MutexGuard<'_, S>> {
    handle
        .lock()
        .map_err(|_| GlassesError::Poisoned("subsystem"))
}

/// Id plus the explicit constructor for one subsystem type.
pub struct SubsystemDescriptor<S> {
    id: &'static str,
    factory: Arc<Factory<S>>,
}

impl<S: Subsystem + 'static> SubsystemDescriptor<S> {
    pub fn new<F>(id: &'static str, factory: F) -> Self
    where
        F: Fn(&SubsystemContext) -> Result<S> + Send + Sync + 'static,
    {
        Self {
            id,
            factory: Arc::new(factory),
        }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn construct(&self, context: &SubsystemContext) -> Result<S> {
        (self.factory)(context)
    }
}

impl<S> Clone for SubsystemDescriptor<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            factory: self.factory.clone(),
        }
    }
}

impl<S> fmt::Debug for SubsystemDescriptor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubsystemDescriptor")
            .field("id", &self.id)
            .field("type", &type_name::<S>())
            .finish()
    }
}

/// Two views of the same allocation: typed (for downcasting) and erased
/// (for session-wide lifecycle calls).
struct Entry {
    instance: Arc<dyn Any + Send + Sync>,
    lifecycle: Arc<Mutex<dyn Subsystem>>,
}

/// Cache of live subsystems, in creation order.
///
/// The session-wide transitions (`pause_all`, `resume_all`, `clear`) skip
/// any subsystem whose handle is locked at the time of the call, so a caller
/// still holding a guard gets a `false` result rather than a deadlock.
#[derive(Default)]
pub struct SubsystemRegistry {
    entries: HashMap<&'static str, Entry>,
    order: Vec<&'static str>,
    paused: Vec<&'static str>,
}

impl SubsystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached instance for the descriptor's id, constructing it
    /// on first demand.
    pub fn create<S: Subsystem + 'static>(
        &mut self,
        descriptor: &SubsystemDescriptor<S>,
        context: &SubsystemContext,
    ) -> Result<SubsystemHandle<S>> {
        let id = descriptor.id();
        if let Some(entry) = self.entries.get(id) {
            return Self::downcast(id, entry);
        }

        let subsystem = descriptor.construct(context).map_err(|err| {
            tracing::error!(id, subsystem = type_name::<S>(), %err, "failed to construct subsystem");
            GlassesError::Construction {
                id: id.to_string(),
                type_name: type_name::<S>(),
                reason: err.to_string(),
            }
        })?;

        let handle = Arc::new(Mutex::new(subsystem));
        let lifecycle: Arc<Mutex<dyn Subsystem>> = handle.clone();
        self.entries.insert(
            id,
            Entry {
                instance: handle.clone(),
                lifecycle,
            },
        );
        self.order.push(id);
        tracing::debug!(id, subsystem = type_name::<S>(), "subsystem created");
        Ok(handle)
    }

    /// Cached instance for `id`, if one exists with type `S`.
    pub fn get<S: Subsystem + 'static>(&self, id: &str) -> Option<SubsystemHandle<S>> {
        let entry = self.entries.get(id)?;
        entry.instance.clone().downcast::<Mutex<S>>().ok()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached ids, oldest first.
    pub fn ids(&self) -> &[&'static str] {
        &self.order
    }

    /// Pauses every running subsystem in creation order and remembers which
    /// ones it paused.
    pub fn pause_all(&mut self) -> bool {
        let mut paused = Vec::new();
        let all = self.for_each_in(self.order.iter().copied(), |id, subsystem| {
            if !subsystem.running() {
                return true;
            }
            paused.push(id);
            subsystem.pause()
        });
        self.paused.extend(paused);
        all
    }

    /// Resumes the subsystems paused by [`SubsystemRegistry::pause_all`] that
    /// are still paused. Anything else is left alone.
    pub fn resume_all(&mut self) -> bool {
        let paused = std::mem::take(&mut self.paused);
        self.for_each_in(paused.into_iter(), |id, subsystem| {
            if subsystem.state() != SubsystemState::Paused {
                tracing::trace!(id, state = ?subsystem.state(), "not resuming, no longer paused");
                return true;
            }
            subsystem.resume()
        })
    }

    /// Stops every cached subsystem, newest first, then forgets them all.
    ///
    /// Handles already given out stay valid but are no longer returned by
    /// [`SubsystemRegistry::create`].
    pub fn clear(&mut self) -> bool {
        let stopped = self.for_each_in(self.order.iter().rev().copied(), |_, subsystem| {
            subsystem.stop()
        });
        self.entries.clear();
        self.order.clear();
        self.paused.clear();
        stopped
    }

    fn for_each_in(
        &self,
        ids: impl Iterator<Item = &'static str>,
        mut transition: impl FnMut(&'static str, &mut dyn Subsystem) -> bool,
    ) -> bool {
        let mut all = true;
        for id in ids {
            let Some(entry) = self.entries.get(id) else {
                continue;
            };
            match entry.lifecycle.try_lock() {
                Ok(mut subsystem) => all &= transition(id, &mut *subsystem),
                Err(TryLockError::WouldBlock) => {
                    tracing::warn!(id, "subsystem is locked by another holder, skipping");
                    all = false;
                }
                Err(TryLockError::Poisoned(_)) => {
                    tracing::error!(id, "subsystem lock poisoned, skipping");
                    all = false;
                }
            }
        }
        all
    }

    fn downcast<S: Subsystem + 'static>(id: &str, entry: &Entry) -> Result<SubsystemHandle<S>> {
        entry
            .instance
            .clone()
            .downcast::<Mutex<S>>()
            .map_err(|_| GlassesError::DescriptorMismatch {
                id: id.to_string(),
                expected: type_name::<S>(),
            })
    }
}

impl fmt::Debug for SubsystemRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubsystemRegistry")
            .field("ids", &self.order)
            .field("paused", &self.paused)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::lifecycle::tests::RecordingProvider;
    use crate::{SdkConfig, SubsystemCore, SubsystemState};

    #[derive(Debug)]
    struct Recorded {
        core: SubsystemCore<RecordingProvider>,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Recorded {
        fn new(id: &'static str) -> Self {
            let (provider, calls) = RecordingProvider::new();
            Self {
                core: SubsystemCore::new(id, Box::new(provider)),
                calls,
            }
        }
    }

    impl Subsystem for Recorded {
        fn id(&self) -> &'static str {
            self.core.id()
        }

        fn state(&self) -> SubsystemState {
            self.core.state()
        }

        fn start(&mut self) -> bool {
            self.core.start()
        }

        fn pause(&mut self) -> bool {
            self.core.pause()
        }

        fn resume(&mut self) -> bool {
            self.core.resume()
        }

        fn stop(&mut self) -> bool {
            self.core.stop()
        }
    }

    #[derive(Debug)]
    struct Other;

    impl Subsystem for Other {
        fn id(&self) -> &'static str {
            "Subsystem.Sample"
        }

        fn state(&self) -> SubsystemState {
            SubsystemState::Stopped
        }

        fn start(&mut self) -> bool {
            true
        }

        fn pause(&mut self) -> bool {
            true
        }

        fn resume(&mut self) -> bool {
            true
        }

        fn stop(&mut self) -> bool {
            true
        }
    }

    fn context() -> SubsystemContext {
        SubsystemContext::new(SdkConfig::emulated(), None)
    }

    fn counting_descriptor(
        id: &'static str,
        built: Arc<AtomicUsize>,
    ) -> SubsystemDescriptor<Recorded> {
        SubsystemDescriptor::new(id, move |_| {
            built.fetch_add(1, Ordering::SeqCst);
            Ok(Recorded::new(id))
        })
    }

    #[test]
    fn repeated_create_returns_identical_instance() {
        let built = Arc::new(AtomicUsize::new(0));
        let descriptor = counting_descriptor("Subsystem.Sample", built.clone());
        let mut registry = SubsystemRegistry::new();
        let ctx = context();

        let first = registry.create(&descriptor, &ctx).unwrap();
        let second = registry.create(&descriptor, &ctx).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn separate_descriptors_with_same_id_share_the_instance() {
        let built = Arc::new(AtomicUsize::new(0));
        let mut registry = SubsystemRegistry::new();
        let ctx = context();

        let first = registry
            .create(&counting_descriptor("Subsystem.Sample", built.clone()), &ctx)
            .unwrap();
        let second = registry
            .create(&counting_descriptor("Subsystem.Sample", built.clone()), &ctx)
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_construction_is_not_cached() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let descriptor = SubsystemDescriptor::new("Subsystem.Sample", move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(GlassesError::msg("native create failed"))
            } else {
                Ok(Recorded::new("Subsystem.Sample"))
            }
        });
        let mut registry = SubsystemRegistry::new();
        let ctx = context();

        let err = registry.create(&descriptor, &ctx).unwrap_err();
        match err {
            GlassesError::Construction { id, type_name, reason } => {
                assert_eq!(id, "Subsystem.Sample");
                assert!(type_name.ends_with("Recorded"));
                assert!(reason.contains("native create failed"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!registry.contains("Subsystem.Sample"));

        assert!(registry.create(&descriptor, &ctx).is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(registry.contains("Subsystem.Sample"));
    }

    #[test]
    fn mismatched_type_for_cached_id_is_rejected() {
        let mut registry = SubsystemRegistry::new();
        let ctx = context();
        registry
            .create(&counting_descriptor("Subsystem.Sample", Arc::default()), &ctx)
            .unwrap();

        let other = SubsystemDescriptor::new("Subsystem.Sample", |_| Ok(Other));
        let err = registry.create(&other, &ctx).unwrap_err();
        assert!(matches!(err, GlassesError::DescriptorMismatch { .. }));
        assert!(registry.get::<Other>("Subsystem.Sample").is_none());
        assert!(registry.get::<Recorded>("Subsystem.Sample").is_some());
    }

    #[test]
    fn clear_stops_newest_first_and_allows_rebuild() {
        let built = Arc::new(AtomicUsize::new(0));
        let first_descriptor = counting_descriptor("Subsystem.First", built.clone());
        let second_descriptor = counting_descriptor("Subsystem.Second", built.clone());
        let mut registry = SubsystemRegistry::new();
        let ctx = context();

        let first = registry.create(&first_descriptor, &ctx).unwrap();
        let second = registry.create(&second_descriptor, &ctx).unwrap();
        lock(&first).unwrap().start();
        lock(&second).unwrap().start();
        assert_eq!(registry.ids(), &["Subsystem.First", "Subsystem.Second"]);

        assert!(registry.clear());
        assert!(registry.is_empty());
        assert!(!lock(&first).unwrap().running());
        assert_eq!(
            *lock(&second).unwrap().calls.lock().unwrap(),
            vec!["start", "stop"]
        );

        let rebuilt = registry.create(&first_descriptor, &ctx).unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(built.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn pause_and_resume_reach_every_cached_subsystem() {
        let mut registry = SubsystemRegistry::new();
        let ctx = context();
        let sample = registry
            .create(&counting_descriptor("Subsystem.Sample", Arc::default()), &ctx)
            .unwrap();
        lock(&sample).unwrap().start();

        assert!(registry.pause_all());
        assert_eq!(lock(&sample).unwrap().state(), SubsystemState::Paused);
        assert!(registry.resume_all());
        assert!(lock(&sample).unwrap().running());
    }

    #[test]
    fn resume_all_only_touches_what_pause_all_paused() {
        let mut registry = SubsystemRegistry::new();
        let ctx = context();
        let idle = registry
            .create(&counting_descriptor("Subsystem.Idle", Arc::default()), &ctx)
            .unwrap();
        let active = registry
            .create(&counting_descriptor("Subsystem.Active", Arc::default()), &ctx)
            .unwrap();
        let stopped_later = registry
            .create(&counting_descriptor("Subsystem.StoppedLater", Arc::default()), &ctx)
            .unwrap();

        assert!(registry.resume_all());
        assert_eq!(lock(&idle).unwrap().state(), SubsystemState::Stopped);

        lock(&active).unwrap().start();
        lock(&stopped_later).unwrap().start();
        assert!(registry.pause_all());
        assert_eq!(lock(&idle).unwrap().state(), SubsystemState::Stopped);
        lock(&stopped_later).unwrap().stop();

        assert!(registry.resume_all());
        assert!(lock(&active).unwrap().running());
        assert_eq!(lock(&idle).unwrap().state(), SubsystemState::Stopped);
        assert_eq!(lock(&stopped_later).unwrap().state(), SubsystemState::Stopped);
        assert!(lock(&idle).unwrap().calls.lock().unwrap().is_empty());
        assert_eq!(
            *lock(&stopped_later).unwrap().calls.lock().unwrap(),
            vec!["start", "pause", "stop"]
        );

        assert!(registry.resume_all());
        assert_eq!(*lock(&active).unwrap().calls.lock().unwrap(), vec!["start", "pause", "resume"]);
    }

    #[test]
    fn held_guard_is_skipped_instead_of_deadlocking() {
        let mut registry = SubsystemRegistry::new();
        let ctx = context();
        let sample = registry
            .create(&counting_descriptor("Subsystem.Sample", Arc::default()), &ctx)
            .unwrap();
        let mut guard = lock(&sample).unwrap();
        guard.start();

        assert!(!registry.pause_all());
        assert!(guard.running());
        drop(guard);

        assert!(registry.pause_all());
        assert_eq!(lock(&sample).unwrap().state(), SubsystemState::Paused);
    }
}
