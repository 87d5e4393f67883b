//! Audio device enumeration.

use cpal::traits::{DeviceTrait, HostTrait};

use crate::error::VoiceError;

/// Information about an available audio device.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDeviceInfo {
    /// Human-readable device name.
    pub name: String,
    /// Whether this is the system default device for its direction.
    pub is_default: bool,
}

/// List available audio input devices.
pub fn list_input_devices() -> Result<Vec<AudioDeviceInfo>, VoiceError> {
    let host = cpal::default_host();
    let default_name = host
        .default_input_device()
        .and_then(|d| d.name().ok())
        .unwrap_or_default();

    let devices = host
        .input_devices()
        .map_err(|e| VoiceError::InputStreamError(e.to_string()))?;

    Ok(describe(devices, &default_name))
}

/// List available audio output devices.
pub fn list_output_devices() -> Result<Vec<AudioDeviceInfo>, VoiceError> {
    let host = cpal::default_host();
    let default_name = host
        .default_output_device()
        .and_then(|d| d.name().ok())
        .unwrap_or_default();

    let devices = host
        .output_devices()
        .map_err(|e| VoiceError::OutputStreamError(e.to_string()))?;

    Ok(describe(devices, &default_name))
}

fn describe(devices: impl Iterator<Item = cpal::Device>, default_name: &str) -> Vec<AudioDeviceInfo> {
    devices
        .filter_map(|device| device.name().ok())
        .map(|name| AudioDeviceInfo {
            is_default: name == default_name,
            name,
        })
        .collect()
}
