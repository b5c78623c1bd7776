//! Glasses device subsystem: model information, per-eye resolution and
//! brightness control.
//!
//! Unlike tracking, device queries are only answered while the glasses are
//! available (running, the last bring-up succeeded and the glasses have not
//! been unplugged); otherwise they return [`GlassesError::DeviceUnavailable`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::native::{GlassesEventCallback, NativeGlasses};
use crate::{
    DisplayEye, GlassesError, GlassesEvent, GlassesModel, Lifecycle, NativeInterface, ProviderBackend,
    Resolution, Result, Subsystem, SubsystemContext, SubsystemCore, SubsystemDescriptor,
    SubsystemState,
};

pub const DEVICE_SUBSYSTEM_ID: &str = "Subsystem.HMD";

pub const BRIGHTNESS_MIN: i32 = 0;
pub const BRIGHTNESS_MAX: i32 = 7;

pub trait DeviceProvider: Lifecycle {
    fn glasses_model(&self) -> Result<GlassesModel>;
    fn brightness(&self) -> Result<i32>;
    fn set_brightness(&mut self, brightness: i32) -> Result<()>;
    fn eye_resolution(&self, eye: DisplayEye) -> Result<Resolution>;
    /// Routes wear and disconnect notifications to `callback`.
    fn listen_glasses_events(&mut self, callback: GlassesEventCallback) -> bool;
}

/// Glasses controller in the native runtime, created on each start.
///
/// The event listener is registered with every new controller, between
/// create and start.
pub struct NativeDeviceProvider {
    glasses: Arc<dyn NativeGlasses>,
    events: Option<GlassesEventCallback>,
    created: bool,
}

impl NativeDeviceProvider {
    pub fn new(native: &NativeInterface) -> Self {
        Self {
            glasses: native.glasses.clone(),
            events: None,
            created: false,
        }
    }

    fn register_events(&self) -> bool {
        match &self.events {
            Some(callback) => self
                .glasses
                .listen_glasses_events(callback.clone())
                .succeeded("glasses.listen_events"),
            None => true,
        }
    }
}

impl Lifecycle for NativeDeviceProvider {
    fn start(&mut self) -> bool {
        if !self.created {
            if !self.glasses.create().succeeded("glasses.create") {
                return false;
            }
            self.created = true;
            self.register_events();
        }
        self.glasses.start().succeeded("glasses.start")
    }

    fn pause(&mut self) -> bool {
        if !self.created {
            tracing::debug!("no glasses controller to pause");
            return false;
        }
        self.glasses.pause().succeeded("glasses.pause")
    }

    fn resume(&mut self) -> bool {
        if !self.created {
            return self.start();
        }
        self.glasses.resume().succeeded("glasses.resume")
    }

    fn stop(&mut self) -> bool {
        if !self.created {
            return true;
        }
        self.created = false;
        let stopped = self.glasses.stop().succeeded("glasses.stop");
        let destroyed = self.glasses.destroy().succeeded("glasses.destroy");
        stopped && destroyed
    }
}

impl DeviceProvider for NativeDeviceProvider {
    fn glasses_model(&self) -> Result<GlassesModel> {
        self.glasses
            .glasses_model()
            .map_err(|result| native_error("glasses.model", result))
    }

    fn brightness(&self) -> Result<i32> {
        self.glasses
            .brightness()
            .map_err(|result| native_error("glasses.brightness", result))
    }

    fn set_brightness(&mut self, brightness: i32) -> Result<()> {
        self.glasses
            .set_brightness(brightness)
            .into_result("glasses.set_brightness")
    }

    fn eye_resolution(&self, eye: DisplayEye) -> Result<Resolution> {
        self.glasses
            .eye_resolution(eye)
            .map_err(|result| native_error("glasses.eye_resolution", result))
    }

    fn listen_glasses_events(&mut self, callback: GlassesEventCallback) -> bool {
        self.events = Some(callback);
        !self.created || self.register_events()
    }
}

fn native_error(operation: &'static str, result: crate::native::NativeResult) -> GlassesError {
    GlassesError::Native { operation, result }
}

/// Device stand-in with fixed hardware characteristics.
#[derive(Debug)]
pub struct EmulatedDeviceProvider {
    brightness: i32,
}

impl EmulatedDeviceProvider {
    pub const RESOLUTION: Resolution = Resolution::new(1920, 1080);

    pub fn new(brightness: i32) -> Self {
        Self {
            brightness: brightness.clamp(BRIGHTNESS_MIN, BRIGHTNESS_MAX),
        }
    }
}

impl Lifecycle for EmulatedDeviceProvider {
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

impl DeviceProvider for EmulatedDeviceProvider {
    fn glasses_model(&self) -> Result<GlassesModel> {
        Ok(GlassesModel::Light)
    }

    fn brightness(&self) -> Result<i32> {
        Ok(self.brightness)
    }

    fn set_brightness(&mut self, brightness: i32) -> Result<()> {
        self.brightness = brightness;
        Ok(())
    }

    fn eye_resolution(&self, _eye: DisplayEye) -> Result<Resolution> {
        Ok(Self::RESOLUTION)
    }

    /// Emulated glasses are always worn and never unplugged.
    fn listen_glasses_events(&mut self, _callback: GlassesEventCallback) -> bool {
        true
    }
}

/// Glasses state fed by controller notifications, which may arrive on a
/// runtime thread.
#[derive(Default)]
struct GlassesStatus {
    plugged_out: AtomicBool,
    listeners: Mutex<Vec<GlassesEventCallback>>,
}

impl GlassesStatus {
    fn handle(&self, event: GlassesEvent) {
        if let GlassesEvent::Disconnected(reason) = event {
            if self.plugged_out.swap(true, Ordering::SeqCst) {
                return;
            }
            tracing::warn!(?reason, "glasses disconnected");
        } else {
            tracing::debug!(?event, "glasses wear state changed");
        }

        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener(event);
        }
    }
}

pub struct DeviceSubsystem {
    core: SubsystemCore<dyn DeviceProvider>,
    status: Arc<GlassesStatus>,
    start_failed: bool,
}

impl DeviceSubsystem {
    pub fn descriptor() -> SubsystemDescriptor<Self> {
        SubsystemDescriptor::new(DEVICE_SUBSYSTEM_ID, Self::from_context)
    }

    pub fn from_context(context: &SubsystemContext) -> Result<Self> {
        let provider: Box<dyn DeviceProvider> = match context.backend() {
            ProviderBackend::Hardware => Box::new(NativeDeviceProvider::new(context.native("glasses")?)),
            ProviderBackend::Emulated => Box::new(EmulatedDeviceProvider::new(
                context.config().device.default_brightness,
            )),
        };
        Ok(Self::with_provider(provider))
    }

    pub fn with_provider(mut provider: Box<dyn DeviceProvider>) -> Self {
        let status = Arc::new(GlassesStatus::default());
        let sink = status.clone();
        provider.listen_glasses_events(Arc::new(move |event: GlassesEvent| sink.handle(event)));
        Self {
            core: SubsystemCore::new(DEVICE_SUBSYSTEM_ID, provider),
            status,
            start_failed: false,
        }
    }

    pub fn is_available(&self) -> bool {
        self.core.running() && !self.start_failed && !self.is_plugged_out()
    }

    /// Latched by the first disconnect; stays set for this subsystem's life.
    pub fn is_plugged_out(&self) -> bool {
        self.status.plugged_out.load(Ordering::SeqCst)
    }

    /// Registers `callback` for wear changes and the first disconnect.
    pub fn listen_glasses_events(
        &mut self,
        callback: impl Fn(GlassesEvent) + Send + Sync + 'static,
    ) {
        self.status
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(callback));
    }

    pub fn glasses_model(&self) -> Result<GlassesModel> {
        self.available()?.glasses_model()
    }

    pub fn brightness(&self) -> Result<i32> {
        self.available()?.brightness()
    }

    /// Sets the brightness, clamped to `BRIGHTNESS_MIN..=BRIGHTNESS_MAX`.
    /// Returns the value actually applied.
    pub fn set_brightness(&mut self, brightness: i32) -> Result<i32> {
        self.available()?;
        let level = brightness.clamp(BRIGHTNESS_MIN, BRIGHTNESS_MAX);
        self.core.provider_mut().set_brightness(level)?;
        Ok(level)
    }

    pub fn eye_resolution(&self, eye: DisplayEye) -> Result<Resolution> {
        self.available()?.eye_resolution(eye)
    }

    fn available(&self) -> Result<&dyn DeviceProvider> {
        if self.is_available() {
            Ok(self.core.provider())
        } else {
            Err(GlassesError::DeviceUnavailable)
        }
    }
}

impl Subsystem for DeviceSubsystem {
    fn id(&self) -> &'static str {
        self.core.id()
    }

    fn state(&self) -> SubsystemState {
        self.core.state()
    }

    fn start(&mut self) -> bool {
        let was_running = self.core.running();
        let started = self.core.start();
        if !was_running {
            self.start_failed = !started;
        }
        started
    }

    fn pause(&mut self) -> bool {
        self.core.pause()
    }

    fn resume(&mut self) -> bool {
        let was_stopped = self.core.state() == SubsystemState::Stopped;
        let resumed = self.core.resume();
        if !resumed || was_stopped {
            self.start_failed = !resumed;
        }
        resumed
    }

    fn stop(&mut self) -> bool {
        self.core.stop()
    }
}

impl std::fmt::Debug for DeviceSubsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSubsystem")
            .field("state", &self.core.state())
            .field("available", &self.is_available())
            .field("plugged_out", &self.is_plugged_out())
            .finish()
    }
}
