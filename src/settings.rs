use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::zoom::ZoomLevel;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPosition {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

/// Main window placement and zoom, restored at startup and saved on exit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub position: Option<WindowPosition>,
    pub size: Option<WindowSize>,
    pub maximized: bool,
    pub minimized: bool,
    pub zoom: Option<usize>,
}

impl WindowSettings {
    /// `None` for a missing or out-of-range zoom index.
    pub fn zoom_level(&self) -> Option<ZoomLevel> {
        self.zoom.and_then(ZoomLevel::from_index)
    }

    /// `None` means platform default size.
    pub fn restore_size(&self) -> Option<WindowSize> {
        self.size.filter(|s| s.width > 0 && s.height > 0)
    }
}

/// JSON file holding [`WindowSettings`].
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(SETTINGS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable settings fall back to defaults.
    pub fn load(&self) -> WindowSettings {
        match self.try_load() {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring settings at {}: {}", self.path.display(), e);
                WindowSettings::default()
            }
        }
    }

    pub fn try_load(&self) -> Result<WindowSettings> {
        if !self.path.exists() {
            debug!("No settings file at {}", self.path.display());
            return Ok(WindowSettings::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, settings: &WindowSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, payload)?;
        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }
}

/// Remembers the last position and size the window had in its normal state,
/// so a maximized or minimized window still saves usable restore bounds.
#[derive(Debug, Default)]
pub struct BoundsTracker {
    position: Option<WindowPosition>,
    size: Option<WindowSize>,
}

impl BoundsTracker {
    pub fn from_settings(settings: &WindowSettings) -> Self {
        Self {
            position: settings.position,
            size: settings.restore_size(),
        }
    }

    pub fn moved(&mut self, x: i32, y: i32, normal: bool) {
        if normal {
            self.position = Some(WindowPosition { x, y });
        }
    }

    pub fn resized(&mut self, width: u32, height: u32, normal: bool) {
        if normal && width > 0 && height > 0 {
            self.size = Some(WindowSize { width, height });
        }
    }

    pub fn snapshot(&self, maximized: bool, minimized: bool, zoom: ZoomLevel) -> WindowSettings {
        WindowSettings {
            position: self.position,
            size: self.size,
            maximized,
            minimized: minimized && !maximized,
            zoom: Some(zoom.index()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::in_dir(dir.path());

        let settings = store.load();
        assert_eq!(settings, WindowSettings::default());
        assert!(settings.zoom_level().is_none());
        assert!(settings.restore_size().is_none());
    }

    #[test]
    fn save_then_load_restores_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::in_dir(dir.path().join("nested"));
        let settings = WindowSettings {
            position: Some(WindowPosition { x: -20, y: 40 }),
            size: Some(WindowSize { width: 900, height: 700 }),
            maximized: true,
            minimized: false,
            zoom: Some(12),
        };

        store.save(&settings).unwrap();
        let loaded = store.load();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.zoom_level().map(|z| z.percent()), Some(400));
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::in_dir(dir.path());

        std::fs::write(store.path(), "{ not json").unwrap();
        assert!(store.try_load().is_err());
        assert_eq!(store.load(), WindowSettings::default());

        std::fs::write(
            store.path(),
            r#"{ "zoom": 42, "size": { "width": 0, "height": 0 } }"#,
        )
        .unwrap();
        let settings = store.load();
        assert!(settings.zoom_level().is_none());
        assert!(settings.restore_size().is_none());
        assert!(!settings.maximized);
    }

    #[test]
    fn tracker_keeps_normal_bounds_while_maximized() {
        let mut tracker = BoundsTracker::default();
        tracker.moved(100, 50, true);
        tracker.resized(800, 600, true);
        tracker.moved(0, 0, false);
        tracker.resized(1920, 1080, false);

        let settings = tracker.snapshot(true, false, ZoomLevel::default());
        assert_eq!(settings.position, Some(WindowPosition { x: 100, y: 50 }));
        assert_eq!(settings.size, Some(WindowSize { width: 800, height: 600 }));
        assert!(settings.maximized);
        assert_eq!(settings.zoom, Some(9));
    }

    #[test]
    fn tracker_starts_from_loaded_settings() {
        let loaded = WindowSettings {
            position: Some(WindowPosition { x: 5, y: 6 }),
            size: Some(WindowSize { width: 0, height: 10 }),
            ..Default::default()
        };
        let tracker = BoundsTracker::from_settings(&loaded);

        let settings = tracker.snapshot(false, true, ZoomLevel::MIN);
        assert_eq!(settings.position, Some(WindowPosition { x: 5, y: 6 }));
        assert_eq!(settings.size, None);
        assert!(settings.minimized);
        assert_eq!(settings.zoom, Some(0));
    }
}
