use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Pose, Result, TrackingMode};

/// Which provider family subsystems bind to when they are constructed.
///
/// Chosen once by the embedding application; subsystems never re-evaluate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderBackend {
    /// Real glasses reached through the native device layer.
    #[default]
    Hardware,
    /// In-process simulation used during development.
    Emulated,
}

/// Top-level configuration structure for an SDK session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    pub backend: ProviderBackend,
    pub tracking_mode: TrackingMode,
    pub emulator: EmulatorConfig,
    pub device: DeviceConfig,
}

impl SdkConfig {
    pub fn emulated() -> Self {
        Self {
            backend: ProviderBackend::Emulated,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Configuration specific to the emulated providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Pose the simulated head starts at (and returns to on recenter).
    pub initial_pose: Pose,
    /// How far the emulated HMD clock advances per query.
    pub hmd_time_step_nanos: u64,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            initial_pose: Pose::IDENTITY,
            hmd_time_step_nanos: 16_666_667,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub default_brightness: i32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            default_brightness: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = SdkConfig::from_json_str(r#"{ "backend": "emulated" }"#).unwrap();
        assert_eq!(config.backend, ProviderBackend::Emulated);
        assert_eq!(config.tracking_mode, TrackingMode::SixDof);
        assert_eq!(config.emulator.hmd_time_step_nanos, 16_666_667);
        assert_eq!(config.device.default_brightness, 3);
    }

    #[test]
    fn pretty_json_round_trips_through_the_loader() {
        let mut config = SdkConfig::emulated();
        config.device.default_brightness = 6;
        let json = config.to_json_pretty().unwrap();
        assert!(json.contains("\"emulated\""));

        let parsed = SdkConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed.device.default_brightness, 6);
    }

    #[test]
    fn rejects_unknown_backend() {
        let err = SdkConfig::from_json_str(r#"{ "backend": "cloud" }"#).unwrap_err();
        assert!(format!("{err}").contains("invalid configuration"));
    }

    #[test]
    fn loads_from_disk() {
        let path = std::env::temp_dir().join(format!("xr-glasses-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "tracking_mode": "three_dof" }"#).unwrap();

        let config = SdkConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.tracking_mode, TrackingMode::ThreeDof);
        assert_eq!(config.backend, ProviderBackend::Hardware);
    }
}
