use clap::ValueEnum;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_FADE_OUT_SECONDS: f64 = 20.0;

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("reading {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("writing {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("parsing settings: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("locating config directory")]
    NoConfigDir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    #[default]
    BottomLeft,
    BottomRight,
    TopRight,
    TopLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Axis {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Spacing {
    Minimum,
    Medium,
    Maximum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum License {
    #[default]
    Free,
    Pro,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub arrangement_corner: Corner,
    #[serde(default)]
    pub arrangement_axis: Axis,
    #[serde(default = "default_corner_margin")]
    pub arrangement_corner_margin: Spacing,
    #[serde(default = "default_spacing")]
    pub arrangement_spacing: Spacing,
    #[serde(default)]
    pub license: License,
    #[serde(default = "default_fade_out_seconds")]
    pub fade_out_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_version: Option<String>,
}

impl Corner {
    pub fn is_right(&self) -> bool {
        matches!(self, Corner::BottomRight | Corner::TopRight)
    }

    pub fn is_top(&self) -> bool {
        matches!(self, Corner::TopLeft | Corner::TopRight)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Corner::BottomLeft => "bottom-left",
            Corner::BottomRight => "bottom-right",
            Corner::TopRight => "top-right",
            Corner::TopLeft => "top-left",
        }
    }
}

impl Spacing {
    pub fn points(&self) -> i32 {
        match self {
            Spacing::Minimum => 20,
            Spacing::Medium => 40,
            Spacing::Maximum => 60,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            arrangement_corner: Corner::default(),
            arrangement_axis: Axis::default(),
            arrangement_corner_margin: default_corner_margin(),
            arrangement_spacing: default_spacing(),
            license: License::default(),
            fade_out_seconds: default_fade_out_seconds(),
            last_seen_version: None,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let data = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if data.trim().is_empty() {
            return Ok(Settings::default());
        }
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let serialized = serde_yaml::to_string(self)?;
        fs::write(path, serialized).map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn is_pro(&self) -> bool {
        self.license == License::Pro
    }
}

pub fn default_settings_path() -> Result<PathBuf, SettingsError> {
    let dirs = ProjectDirs::from("", "", "stickydesk").ok_or(SettingsError::NoConfigDir)?;
    Ok(dirs.config_dir().join("settings.yml"))
}

fn default_corner_margin() -> Spacing {
    Spacing::Medium
}

fn default_spacing() -> Spacing {
    Spacing::Minimum
}

fn default_fade_out_seconds() -> f64 {
    DEFAULT_FADE_OUT_SECONDS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.arrangement_corner, Corner::BottomLeft);
        assert_eq!(settings.arrangement_axis, Axis::Horizontal);
        assert_eq!(settings.arrangement_corner_margin.points(), 40);
        assert_eq!(settings.arrangement_spacing.points(), 20);
        assert_eq!(settings.license, License::Free);
        assert_eq!(settings.fade_out_seconds, 20.0);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yml");
        fs::write(&path, "arrangement_corner: top-right\nlicense: pro\n").unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.arrangement_corner, Corner::TopRight);
        assert!(settings.is_pro());
        assert_eq!(settings.arrangement_spacing, Spacing::Minimum);
    }

    #[test]
    fn missing_file_yields_defaults_and_save_creates_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("settings.yml");
        let mut settings = Settings::load(&path).unwrap();
        assert_eq!(settings, Settings::default());
        settings.arrangement_axis = Axis::Vertical;
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap().arrangement_axis, Axis::Vertical);
    }
}
