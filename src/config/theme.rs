//! Widget theme and the screenshot background presets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Theme forwarded to the widget. Applied live, never forces a restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    #[default]
    Dark,
    System,
}

impl ThemeMode {
    pub fn storage_value(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
            ThemeMode::System => "system",
        }
    }

    /// Light <-> Dark; System flips to Dark
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Dark => ThemeMode::Light,
            ThemeMode::Light | ThemeMode::System => ThemeMode::Dark,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_value())
    }
}

impl FromStr for ThemeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            "system" => Ok(ThemeMode::System),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

/// Background preset used when capturing store screenshots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenshotTheme {
    pub name: &'static str,
    /// RGB background, `None` for the regular harness view
    pub background: Option<[u8; 3]>,
}

pub const SCREENSHOT_THEMES: [ScreenshotTheme; 7] = [
    ScreenshotTheme { name: "default", background: None },
    ScreenshotTheme { name: "Brave Dark", background: Some([0x3B, 0x3B, 0x3F]) },
    ScreenshotTheme { name: "Brave Light", background: Some([0xFF, 0xFF, 0xFF]) },
    ScreenshotTheme { name: "Chrome Mobile Dark", background: Some([0x11, 0x15, 0x10]) },
    ScreenshotTheme { name: "Chrome Mobile Light", background: Some([0xF7, 0xFB, 0xF4]) },
    ScreenshotTheme { name: "In App Dark", background: Some([0x1B, 0x1D, 0x21]) },
    ScreenshotTheme { name: "In App Light", background: Some([0xFF, 0xFF, 0xFF]) },
];

/// Index of the preset after `index`, wrapping around
pub fn next_screenshot_theme(index: usize) -> usize {
    (index + 1) % SCREENSHOT_THEMES.len()
}
