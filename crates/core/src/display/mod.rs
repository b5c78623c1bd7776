//! Display subsystem: owns the glasses' multi-display output.

use std::sync::Arc;

use crate::native::{NativeDisplay, ResolutionCallback};
use crate::{
    Lifecycle, NativeInterface, ProviderBackend, Resolution, Result, Subsystem, SubsystemContext,
    SubsystemCore, SubsystemDescriptor, SubsystemState,
};

pub const DISPLAY_SUBSYSTEM_ID: &str = "Subsystem.Display";

/// Resolution the emulated display reports.
pub const EMULATED_RESOLUTION: Resolution = Resolution::new(1920, 1080);

pub trait DisplayProvider: Lifecycle {
    fn listen_main_screen_resolution_changed(&mut self, callback: ResolutionCallback) -> bool;
}

/// Display output through the native runtime. Created with the provider,
/// torn down on stop and created again by the next start. Resume without a
/// successful start performs the start.
pub struct NativeDisplayProvider {
    display: Arc<dyn NativeDisplay>,
    created: bool,
    started: bool,
}

impl NativeDisplayProvider {
    pub fn new(native: &NativeInterface) -> Result<Self> {
        native.display.create().into_result("display.create")?;
        Ok(Self {
            display: native.display.clone(),
            created: true,
            started: false,
        })
    }
}

impl Lifecycle for NativeDisplayProvider {
    fn start(&mut self) -> bool {
        if !self.created {
            if !self.display.create().succeeded("display.create") {
                return false;
            }
            self.created = true;
        }
        self.started = self.display.start().succeeded("display.start");
        self.started
    }

    fn pause(&mut self) -> bool {
        if !self.started {
            tracing::debug!("native display not started, nothing to pause");
            return false;
        }
        self.display.pause().succeeded("display.pause")
    }

    fn resume(&mut self) -> bool {
        if !self.started {
            return self.start();
        }
        self.display.resume().succeeded("display.resume")
    }

    fn stop(&mut self) -> bool {
        if !self.created {
            return true;
        }
        self.created = false;
        self.started = false;
        let stopped = self.display.stop().succeeded("display.stop");
        let destroyed = self.display.destroy().succeeded("display.destroy");
        stopped && destroyed
    }
}

impl DisplayProvider for NativeDisplayProvider {
    fn listen_main_screen_resolution_changed(&mut self, callback: ResolutionCallback) -> bool {
        self.display
            .listen_main_screen_resolution_changed(callback)
            .succeeded("display.listen_resolution")
    }
}

/// Display stand-in: announces [`EMULATED_RESOLUTION`] to listeners on start.
#[derive(Default)]
pub struct EmulatedDisplayProvider {
    listeners: Vec<ResolutionCallback>,
}

impl EmulatedDisplayProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Lifecycle for EmulatedDisplayProvider {
    fn start(&mut self) -> bool {
        for listener in &self.listeners {
            listener(EMULATED_RESOLUTION);
        }
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

impl DisplayProvider for EmulatedDisplayProvider {
    fn listen_main_screen_resolution_changed(&mut self, callback: ResolutionCallback) -> bool {
        self.listeners.push(callback);
        true
    }
}

pub struct DisplaySubsystem {
    core: SubsystemCore<dyn DisplayProvider>,
}

impl DisplaySubsystem {
    pub fn descriptor() -> SubsystemDescriptor<Self> {
        SubsystemDescriptor::new(DISPLAY_SUBSYSTEM_ID, Self::from_context)
    }

    pub fn from_context(context: &SubsystemContext) -> Result<Self> {
        let provider: Box<dyn DisplayProvider> = match context.backend() {
            ProviderBackend::Hardware => {
                Box::new(NativeDisplayProvider::new(context.native("display")?)?)
            }
            ProviderBackend::Emulated => Box::new(EmulatedDisplayProvider::new()),
        };
        Ok(Self::with_provider(provider))
    }

    pub fn with_provider(provider: Box<dyn DisplayProvider>) -> Self {
        Self {
            core: SubsystemCore::new(DISPLAY_SUBSYSTEM_ID, provider),
        }
    }

    pub fn listen_main_screen_resolution_changed(
        &mut self,
        callback: impl Fn(Resolution) + Send + Sync + 'static,
    ) -> bool {
        self.core
            .provider_mut()
            .listen_main_screen_resolution_changed(Arc::new(callback))
    }
}

impl Subsystem for DisplaySubsystem {
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

impl std::fmt::Debug for DisplaySubsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplaySubsystem")
            .field("state", &self.core.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{InMemoryDevice, SdkConfig};

    #[test]
    fn native_display_is_created_with_the_subsystem_and_destroyed_on_stop() {
        let device = Arc::new(InMemoryDevice::new());
        let context = SubsystemContext::new(
            SdkConfig::default(),
            Some(NativeInterface::from_device(device.clone())),
        );
        let mut display = DisplaySubsystem::from_context(&context).unwrap();
        assert_eq!(device.calls(), vec!["display.create"]);

        display.start();
        display.stop();
        display.stop();

        assert_eq!(
            device.calls(),
            vec![
                "display.create",
                "display.start",
                "display.stop",
                "display.destroy"
            ]
        );
    }

    #[test]
    fn resume_after_stop_recreates_instead_of_resuming() {
        let device = Arc::new(InMemoryDevice::new());
        let context = SubsystemContext::new(
            SdkConfig::default(),
            Some(NativeInterface::from_device(device.clone())),
        );
        let mut display = DisplaySubsystem::from_context(&context).unwrap();
        display.start();
        display.stop();
        device.clear_calls();

        assert!(display.resume());
        assert_eq!(device.calls(), vec!["display.create", "display.start"]);
        assert_eq!(device.call_count("display.resume"), 0);
    }

    #[test]
    fn native_resolution_changes_reach_listeners() {
        let device = Arc::new(InMemoryDevice::new());
        let context = SubsystemContext::new(
            SdkConfig::default(),
            Some(NativeInterface::from_device(device.clone())),
        );
        let mut display = DisplaySubsystem::from_context(&context).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        assert!(display.listen_main_screen_resolution_changed(move |resolution| {
            sink.lock().unwrap().push(resolution);
        }));
        device.emit_resolution_change(Resolution::new(3840, 1080));

        assert_eq!(*seen.lock().unwrap(), vec![Resolution::new(3840, 1080)]);
    }

    #[test]
    fn emulated_display_announces_resolution_on_start() {
        let context = SubsystemContext::new(SdkConfig::emulated(), None);
        let mut display = DisplaySubsystem::from_context(&context).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        display.listen_main_screen_resolution_changed(move |resolution| {
            sink.lock().unwrap().push(resolution);
        });

        display.start();
        display.start();

        assert_eq!(*seen.lock().unwrap(), vec![EMULATED_RESOLUTION]);
    }
}
