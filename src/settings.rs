use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::vision::blink::DEFAULT_BLINK_THRESHOLD;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NudgeFrequency {
    Low,
    Medium,
    High,
}

impl NudgeFrequency {
    pub fn interval_secs(&self) -> u64 {
        match self {
            NudgeFrequency::Low => 300,
            NudgeFrequency::Medium => 180,
            NudgeFrequency::High => 120,
        }
    }
}

impl Default for NudgeFrequency {
    fn default() -> Self {
        NudgeFrequency::Medium
    }
}

/// User-facing preferences. Values are trusted as already validated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub blink_threshold: f64,
    #[serde(rename = "breakInterval")]
    pub break_interval_secs: u64,
    pub notifications_enabled: bool,
    pub sound_enabled: bool,
    pub nudges_enabled: bool,
    pub nudge_frequency: NudgeFrequency,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            blink_threshold: DEFAULT_BLINK_THRESHOLD,
            break_interval_secs: 1200,
            notifications_enabled: true,
            sound_enabled: true,
            nudges_enabled: true,
            nudge_frequency: NudgeFrequency::Medium,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unreadable settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Current values; callers re-read on every tick so edits apply live.
    pub fn current(&self) -> UserSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update(&self, settings: UserSettings) -> Result<()> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
