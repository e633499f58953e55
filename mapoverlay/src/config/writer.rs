//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;
use super::size::format_size;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let icons = &config.icons;
    let clustering = &config.clustering;
    let anim = &config.animation;

    format!(
        r#"[icons]
; Directory for the persistent icon cache. Files are stored flat as <hash>.png
; Example: directory = ~/.cache/mapoverlay/icons
directory = {}
; Memory cache size for decoded icons (default: 12MB)
; Supports: KB, MB, GB suffixes (e.g., 500KB, 12MB)
memory_size = {}
; Disk cache size (default: 50MB). Set to 0 to keep icons in memory only
disk_size = {}
; Maximum number of files in the disk cache (default: 500)
disk_max_files = {}
; Icon size in points when a marker does not specify one (default: 48)
default_size = {}
; Pixels per point on the target display (default: 1.0)
device_scale = {}
; Timeout in seconds for remote icon downloads (default: 4)
fetch_timeout = {}
; Directory that asset:// and bare icon paths are resolved against
asset_root = {}

[clustering]
; Start with marker clustering enabled (default: false)
enabled = {}
; Markers closer than this many screen pixels are grouped (default: 100)
distance = {}
; Camera zoom assumed until the host moves the camera (default: 14)
zoom = {}

[animation]
; Bounce cycle length in milliseconds (default: 700)
bounce_duration_ms = {}
; Bounce height in points (default: 20)
bounce_height = {}
; Pulse cycle length in milliseconds (default: 1500)
pulse_duration_ms = {}
; Pulse circle radius at the end of a cycle, in meters (default: 60)
pulse_max_radius = {}
; Pulse fill color as 0xAARRGGBB; the alpha fades to zero over a cycle
pulse_color = 0x{:08X}

[logging]
; Log file path (truncated at the start of every session)
file = {}
"#,
        path_to_string(&icons.directory),
        format_size(icons.memory_size),
        format_size(icons.disk_size as usize),
        icons.disk_max_files,
        icons.default_size,
        icons.device_scale,
        icons.fetch_timeout,
        path_to_string(&icons.asset_root),
        clustering.enabled,
        clustering.distance,
        clustering.zoom,
        anim.bounce_duration_ms,
        anim.bounce_height,
        anim.pulse_duration_ms,
        anim.pulse_max_radius,
        anim.pulse_color,
        path_to_string(&config.logging.file),
    )
}

/// Render a path, abbreviating the home directory to `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_string_has_all_sections() {
        let text = to_config_string(&ConfigFile::default());
        for section in ["[icons]", "[clustering]", "[animation]", "[logging]"] {
            assert!(text.contains(section), "missing {}", section);
        }
        assert!(text.contains("memory_size = 12MB"));
        assert!(text.contains("disk_size = 50MB"));
        assert!(text.contains("pulse_color = 0x553F51B5"));
    }

    #[test]
    fn test_written_config_parses_back_to_defaults() {
        let ini = ini::Ini::load_from_str(&to_config_string(&ConfigFile::default())).unwrap();
        let parsed = super::super::parser::parse_ini(&ini).unwrap();
        assert_eq!(parsed, ConfigFile::default());
    }
}
