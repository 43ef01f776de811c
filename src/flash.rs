// SPDX-License-Identifier: GPL-3.0-only

//! Torch control via Linux sysfs flash LEDs
//!
//! Discovers flash LEDs exposed at `/sys/class/leds/*:flash` and drives them
//! in torch mode through the `brightness` file, which is group-writable by
//! `feedbackd`. The root-only `flash_strobe` interface is never touched.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const LEDS_DIR: &str = "/sys/class/leds";

/// A flash LED device discovered via sysfs
#[derive(Debug, Clone)]
pub struct FlashDevice {
    /// Sysfs path, e.g. `/sys/class/leds/white:flash`
    path: PathBuf,
    /// Maximum brightness value (from `max_brightness` file)
    max_brightness: u32,
    /// Directory basename
    name: String,
}

impl FlashDevice {
    /// Scan `/sys/class/leds/` for writable `*:flash` entries
    pub fn discover() -> Vec<FlashDevice> {
        Self::discover_in(Path::new(LEDS_DIR))
    }

    /// Scan `leds_dir` for writable `*:flash` entries
    pub fn discover_in(leds_dir: &Path) -> Vec<FlashDevice> {
        let Ok(entries) = std::fs::read_dir(leds_dir) else {
            debug!(dir = %leds_dir.display(), "No LED class directory, torch unavailable");
            return Vec::new();
        };

        let mut devices: Vec<FlashDevice> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                // Match entries like "white:flash", "yellow:flash"
                if !name.ends_with(":flash") {
                    return None;
                }
                Self::from_sysfs(entry.path(), name)
            })
            .collect();

        // white before yellow
        devices.sort_by(|a, b| a.name.cmp(&b.name));
        devices
    }

    fn from_sysfs(path: PathBuf, name: String) -> Option<FlashDevice> {
        let max_brightness_path = path.join("max_brightness");
        let max_brightness = match std::fs::read_to_string(&max_brightness_path) {
            Ok(s) => match s.trim().parse::<u32>() {
                Ok(v) if v > 0 => v,
                _ => {
                    warn!(path = %max_brightness_path.display(), "Invalid max_brightness value");
                    return None;
                }
            },
            Err(e) => {
                warn!(path = %max_brightness_path.display(), error = %e, "Cannot read max_brightness");
                return None;
            }
        };

        let brightness_path = path.join("brightness");
        if let Err(e) = std::fs::OpenOptions::new()
            .write(true)
            .open(&brightness_path)
        {
            warn!(
                path = %brightness_path.display(),
                error = %e,
                "Flash LED found but not writable, user may need to be in 'feedbackd' group"
            );
            return None;
        }

        info!(name = %name, max_brightness, "Discovered flash LED");
        Some(FlashDevice {
            path,
            max_brightness,
            name,
        })
    }

    /// Get the device name (e.g. "white:flash")
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set raw brightness value (0 = off, max_brightness = full)
    pub fn set_brightness(&self, value: u32) -> io::Result<()> {
        let clamped = value.min(self.max_brightness);
        std::fs::write(self.path.join("brightness"), clamped.to_string())
    }

    /// Turn off the LED
    pub fn off(&self) -> io::Result<()> {
        self.set_brightness(0)
    }

    /// Turn on at a fraction of max brightness (0.0 = off, 1.0 = full)
    pub fn torch(&self, intensity: f32) -> io::Result<()> {
        let clamped = intensity.clamp(0.0, 1.0);
        let value = (clamped * self.max_brightness as f32).round() as u32;
        self.set_brightness(value)
    }
}

/// All torch LEDs next to the active camera, switched together
#[derive(Debug, Clone, Default)]
pub struct Torch {
    devices: Vec<FlashDevice>,
}

impl Torch {
    /// Torch backed by the system's flash LEDs
    pub fn discover() -> Self {
        Self::from_devices(FlashDevice::discover())
    }

    pub fn from_devices(devices: Vec<FlashDevice>) -> Self {
        Self { devices }
    }

    /// Whether there is anything to switch
    pub fn is_available(&self) -> bool {
        !self.devices.is_empty()
    }

    /// Switch every LED on (full brightness) or off
    ///
    /// Fails on the first LED that rejects the write; LEDs switched before it
    /// are turned back off so the light is never left half on.
    pub fn set(&self, on: bool) -> io::Result<()> {
        if !self.is_available() {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "no controllable flash LED",
            ));
        }

        for (index, dev) in self.devices.iter().enumerate() {
            let result = if on { dev.torch(1.0) } else { dev.off() };
            if let Err(e) = result {
                warn!(device = %dev.name, error = %e, on, "Failed to switch flash LED");
                if on {
                    for earlier in &self.devices[..index] {
                        let _ = earlier.off();
                    }
                }
                return Err(e);
            }
        }

        debug!(on, count = self.devices.len(), "Torch switched");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_led(root: &Path, name: &str, max: &str) -> PathBuf {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("max_brightness"), max).unwrap();
        std::fs::write(dir.join("brightness"), "0").unwrap();
        dir
    }

    #[test]
    fn test_discover_only_flash_entries() {
        let root = tempfile::tempdir().unwrap();
        fake_led(root.path(), "yellow:flash", "255\n");
        fake_led(root.path(), "white:flash", "100\n");
        fake_led(root.path(), "input3::capslock", "1\n");
        fake_led(root.path(), "red:flash", "0\n");

        let devices = FlashDevice::discover_in(root.path());
        let names: Vec<&str> = devices.iter().map(FlashDevice::name).collect();
        assert_eq!(names, vec!["white:flash", "yellow:flash"]);
    }

    #[test]
    fn test_torch_writes_brightness() {
        let root = tempfile::tempdir().unwrap();
        let dir = fake_led(root.path(), "white:flash", "100");
        let torch = Torch::from_devices(FlashDevice::discover_in(root.path()));

        torch.set(true).unwrap();
        assert_eq!(std::fs::read_to_string(dir.join("brightness")).unwrap(), "100");

        torch.set(false).unwrap();
        assert_eq!(std::fs::read_to_string(dir.join("brightness")).unwrap(), "0");
    }

    #[test]
    fn test_missing_torch_is_unsupported() {
        let torch = Torch::default();
        assert!(!torch.is_available());
        assert_eq!(
            torch.set(true).unwrap_err().kind(),
            io::ErrorKind::Unsupported
        );
    }
}
