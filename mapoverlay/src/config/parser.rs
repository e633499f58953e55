//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::{Ini, Properties};
use std::path::PathBuf;
use std::str::FromStr;

use super::defaults::MAX_DEVICE_SCALE;
use super::file::ConfigFileError;
use super::settings::ConfigFile;
use super::size::parse_size;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [icons] section
    if let Some(section) = ini.section(Some("icons")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.icons.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("memory_size") {
            config.icons.memory_size =
                parse_size(v).map_err(|_| ConfigFileError::InvalidValue {
                    section: "icons".to_string(),
                    key: "memory_size".to_string(),
                    value: v.to_string(),
                    reason: "expected format like '12MB', '500KB', or '1GB'".to_string(),
                })?;
        }
        if let Some(v) = section.get("disk_size") {
            config.icons.disk_size = parse_size(v).map_err(|_| ConfigFileError::InvalidValue {
                section: "icons".to_string(),
                key: "disk_size".to_string(),
                value: v.to_string(),
                reason: "expected format like '50MB', '1GB', or '0' to disable".to_string(),
            })? as u64;
        }
        config.icons.disk_max_files = parse_number(
            section,
            "icons",
            "disk_max_files",
            config.icons.disk_max_files,
            "must be a non-negative integer",
        )?;
        config.icons.default_size = parse_number(
            section,
            "icons",
            "default_size",
            config.icons.default_size,
            "must be a positive integer (points)",
        )?;
        if let Some(v) = section.get("device_scale") {
            let scale: f32 = v.trim().parse().unwrap_or(f32::NAN);
            if !(scale > 0.0 && scale <= MAX_DEVICE_SCALE) {
                return Err(ConfigFileError::InvalidValue {
                    section: "icons".to_string(),
                    key: "device_scale".to_string(),
                    value: v.to_string(),
                    reason: format!("must be a number in (0, {}]", MAX_DEVICE_SCALE),
                });
            }
            config.icons.device_scale = scale;
        }
        config.icons.fetch_timeout = parse_number(
            section,
            "icons",
            "fetch_timeout",
            config.icons.fetch_timeout,
            "must be a positive integer (seconds)",
        )?;
        if let Some(v) = section.get("asset_root") {
            let v = v.trim();
            if !v.is_empty() {
                config.icons.asset_root = expand_tilde(v);
            }
        }
    }

    // [clustering] section
    if let Some(section) = ini.section(Some("clustering")) {
        if let Some(v) = section.get("enabled") {
            config.clustering.enabled = parse_bool(v);
        }
        config.clustering.distance = parse_number(
            section,
            "clustering",
            "distance",
            config.clustering.distance,
            "must be a number (pixels)",
        )?;
        config.clustering.zoom = parse_number(
            section,
            "clustering",
            "zoom",
            config.clustering.zoom,
            "must be a number",
        )?;
    }

    // [animation] section
    if let Some(section) = ini.section(Some("animation")) {
        let anim = &mut config.animation;
        anim.bounce_duration_ms = parse_number(
            section,
            "animation",
            "bounce_duration_ms",
            anim.bounce_duration_ms,
            "must be a non-negative integer (milliseconds)",
        )?;
        anim.bounce_height = parse_number(
            section,
            "animation",
            "bounce_height",
            anim.bounce_height,
            "must be a number (points)",
        )?;
        anim.pulse_duration_ms = parse_number(
            section,
            "animation",
            "pulse_duration_ms",
            anim.pulse_duration_ms,
            "must be a non-negative integer (milliseconds)",
        )?;
        anim.pulse_max_radius = parse_number(
            section,
            "animation",
            "pulse_max_radius",
            anim.pulse_max_radius,
            "must be a number (meters)",
        )?;
        if let Some(v) = section.get("pulse_color") {
            anim.pulse_color = parse_color(v).ok_or_else(|| ConfigFileError::InvalidValue {
                section: "animation".to_string(),
                key: "pulse_color".to_string(),
                value: v.to_string(),
                reason: "expected ARGB like '0x553F51B5'".to_string(),
            })?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

/// Parse an optional numeric key, keeping `current` when it is absent.
fn parse_number<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
    current: T,
    reason: &str,
) -> Result<T, ConfigFileError> {
    match section.get(key) {
        None => Ok(current),
        Some(v) => v.trim().parse().map_err(|_| ConfigFileError::InvalidValue {
            section: section_name.to_string(),
            key: key.to_string(),
            value: v.to_string(),
            reason: reason.to_string(),
        }),
    }
}

/// Parse a color as `0xAARRGGBB`, `#AARRGGBB` or a decimal integer.
pub(super) fn parse_color(value: &str) -> Option<u32> {
    let v = value.trim();
    let hex = v
        .strip_prefix("0x")
        .or_else(|| v.strip_prefix("0X"))
        .or_else(|| v.strip_prefix('#'));
    match hex {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => v.parse().ok(),
    }
}

/// Parse a boolean value from a config string.
/// Accepts: true/false, yes/no, 1/0, on/off (case-insensitive)
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
