use anyhow::{Context, Result};
use crossterm::style::Color;
use directories::ProjectDirs;
use focus_ipc::SessionType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::timer::{DurationMap, MessageMap};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{0} duration must be at least one minute")]
    ZeroDuration(SessionType),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub pomodoro_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    /// Pomodoros before a long break; 0 falls back to 4
    pub long_break_interval: u32,
    pub pomodoro_message: String,
    pub short_break_message: String,
    pub long_break_message: String,
    pub notify: bool,
    pub auto_start_pomodoro: bool,
    pub auto_start_break: bool,
    pub theme: Theme,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Theme {
    #[serde(deserialize_with = "hex_to_color", serialize_with = "color_to_hex")]
    pub pomodoro: Color,
    #[serde(deserialize_with = "hex_to_color", serialize_with = "color_to_hex")]
    pub short_break: Color,
    #[serde(deserialize_with = "hex_to_color", serialize_with = "color_to_hex")]
    pub long_break: Color,
    #[serde(deserialize_with = "hex_to_color", serialize_with = "color_to_hex")]
    pub countdown: Color,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pomodoro_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            long_break_interval: 4,
            pomodoro_message: "Focus on your task".to_string(),
            short_break_message: "Take a breather".to_string(),
            long_break_message: "Take a long break".to_string(),
            notify: true,
            auto_start_pomodoro: false,
            auto_start_break: false,
            theme: Theme::default(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            pomodoro: Color::Rgb { r: 138, g: 154, b: 123 },
            short_break: Color::Rgb { r: 196, g: 178, b: 138 },
            long_break: Color::Rgb { r: 127, g: 180, b: 202 },
            countdown: Color::Rgb { r: 197, g: 201, b: 199 },
        }
    }
}

impl Theme {
    pub fn session_color(&self, session: SessionType) -> Color {
        match session {
            SessionType::Pomodoro => self.pomodoro,
            SessionType::ShortBreak => self.short_break,
            SessionType::LongBreak => self.long_break,
        }
    }
}

impl Settings {
    /// Reject durations the timer cannot run.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for session in SessionType::ALL {
            if self.durations().get(session) == 0 {
                return Err(SettingsError::ZeroDuration(session));
            }
        }
        Ok(())
    }

    pub fn durations(&self) -> DurationMap {
        DurationMap::new(
            self.pomodoro_minutes,
            self.short_break_minutes,
            self.long_break_minutes,
        )
    }

    pub fn messages(&self) -> MessageMap {
        MessageMap::new(
            self.pomodoro_message.clone(),
            self.short_break_message.clone(),
            self.long_break_message.clone(),
        )
    }

    /// Load and validate the settings stored at `path`, or the defaults if
    /// there is no file yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings: Settings = if path.exists() {
            let config_str = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file at {:?}", path))?;
            toml::from_str(&config_str)
                .with_context(|| format!("Failed to parse config file at {:?}", path))?
        } else {
            Settings::default()
        };
        settings
            .validate()
            .with_context(|| format!("Invalid config file at {:?}", path))?;
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory {:?}", dir))?;
        }
        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml).with_context(|| format!("Failed to write config file at {:?}", path))?;
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "focus", "focus")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(proj_dirs.config_dir().join("focus.toml"))
}

pub fn load_settings() -> Result<Settings> {
    match config_path() {
        Ok(path) => Settings::load_from(&path),
        Err(_) => Ok(Settings::default()),
    }
}

fn hex_to_color<'de, D>(deserializer: D) -> Result<Color, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = serde::Deserialize::deserialize(deserializer)?;
    let hex = s
        .strip_prefix('#')
        .filter(|hex| hex.len() == 6 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(|| <D::Error as serde::de::Error>::custom("invalid hex color format"))?;
    let channel = |i: usize| -> Result<u8, D::Error> {
        u8::from_str_radix(&hex[i..i + 2], 16).map_err(serde::de::Error::custom)
    };
    Ok(Color::Rgb {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
    })
}

fn color_to_hex<S>(color: &Color, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match color {
        Color::Rgb { r, g, b } => serializer.serialize_str(&format!("#{:02x}{:02x}{:02x}", r, g, b)),
        other => Err(serde::ser::Error::custom(format!(
            "only rgb colors can be saved, got {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("focus.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("focus.toml");
        fs::write(
            &path,
            "pomodoro_minutes = 50\nnotify = false\n[theme]\npomodoro = \"#ff0000\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.pomodoro_minutes, 50);
        assert!(!settings.notify);
        assert_eq!(settings.short_break_minutes, 5);
        assert_eq!(settings.theme.pomodoro, Color::Rgb { r: 255, g: 0, b: 0 });
        assert_eq!(settings.theme.long_break, Theme::default().long_break);
    }

    #[test]
    fn zero_duration_is_rejected() {
        let settings = Settings {
            short_break_minutes: 0,
            ..Settings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::ZeroDuration(SessionType::ShortBreak))
        );

        let dir = tempdir().unwrap();
        let path = dir.path().join("focus.toml");
        fs::write(&path, "long_break_minutes = 0\n").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }

    #[test]
    fn zero_interval_is_not_a_validation_error() {
        let settings = Settings {
            long_break_interval: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn bad_hex_color_fails_to_parse() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("focus.toml");
        fs::write(&path, "[theme]\ncountdown = \"blue\"\n").unwrap();
        let err = Settings::load_from(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid hex color format"));
    }

    #[test]
    fn non_ascii_hex_color_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("focus.toml");
        fs::write(&path, "[theme]\ncountdown = \"#1\u{e9}234\"\n").unwrap();
        let err = Settings::load_from(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid hex color format"));

        fs::write(&path, "[theme]\ncountdown = \"#12345g\"\n").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }

    #[test]
    fn saved_settings_load_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("focus.toml");
        let settings = Settings {
            long_break_interval: 3,
            pomodoro_message: "Write the report".to_string(),
            auto_start_break: true,
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }
}
