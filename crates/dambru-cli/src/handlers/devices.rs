//! Devices command handler.

use anyhow::Result;
use dambru_voice::{AudioDeviceInfo, list_input_devices, list_output_devices};

use crate::error::CliError;

/// Print the audio devices the default host exposes.
pub fn execute() -> Result<()> {
    let inputs = list_input_devices().map_err(CliError::from)?;
    let outputs = list_output_devices().map_err(CliError::from)?;

    print_group("Input devices", &inputs);
    println!();
    print_group("Output devices", &outputs);
    Ok(())
}

fn print_group(title: &str, devices: &[AudioDeviceInfo]) {
    println!("{title}:");
    if devices.is_empty() {
        println!("  (none found)");
        return;
    }
    for device in devices {
        let marker = if device.is_default { " (default)" } else { "" };
        println!("  {}{marker}", device.name);
    }
}
