use crate::{
    EmulatorScene, GlassesError, MainThreadQueue, NativeInterface, ProviderBackend, Result,
    SdkConfig,
};

/// Everything a subsystem factory may need to build its provider.
///
/// Owned by the session and lent to factories on a registry miss.
#[derive(Debug, Clone)]
pub struct SubsystemContext {
    config: SdkConfig,
    native: Option<NativeInterface>,
    main_thread: MainThreadQueue,
    scene: EmulatorScene,
}

impl SubsystemContext {
    pub fn new(config: SdkConfig, native: Option<NativeInterface>) -> Self {
        Self {
            config,
            native,
            main_thread: MainThreadQueue::new(),
            scene: EmulatorScene::new(),
        }
    }

    pub fn backend(&self) -> ProviderBackend {
        self.config.backend
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// Native layer for `component`, required by hardware-backed providers.
    pub fn native(&self, component: &'static str) -> Result<&NativeInterface> {
        self.native
            .as_ref()
            .ok_or(GlassesError::MissingNativeLayer(component))
    }

    pub fn main_thread(&self) -> &MainThreadQueue {
        &self.main_thread
    }

    pub fn scene(&self) -> &EmulatorScene {
        &self.scene
    }
}
