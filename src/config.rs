use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use log::warn;

use crate::vision::JsonLinesInput;

pub const DEBUG_ENV: &str = "EYECARE_DEBUG";

/// Sources are paced in whole milliseconds.
pub const MAX_FPS: u32 = 1000;

/// Where landmark frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    Simulated,
    JsonLines(JsonLinesInput),
}

impl SourceKind {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "simulated" | "sim" => SourceKind::Simulated,
            other => SourceKind::JsonLines(JsonLinesInput::parse(other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub source: SourceKind,
    /// Frame rate of the simulated source, and replay pacing for files.
    pub fps: u32,
    /// Mean time between blinks of the simulated face.
    pub blink_gap: Duration,
    /// Stop on our own after this long. `None` runs until ctrl-c.
    pub duration: Option<Duration>,
    pub debug: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let duration_secs = env_or_parse("EYECARE_DURATION_SECS", 0_u64);
        Self {
            data_dir: PathBuf::from(env_or("EYECARE_DATA_DIR", "./data")),
            source: SourceKind::parse(&env_or("EYECARE_SOURCE", "simulated")),
            fps: env_or_parse("EYECARE_FPS", 30_u32).clamp(1, MAX_FPS),
            blink_gap: Duration::from_secs(env_or_parse("EYECARE_BLINK_GAP_SECS", 4_u64).max(1)),
            duration: (duration_secs > 0).then(|| Duration::from_secs(duration_secs)),
            debug: debug_mode(),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("eyecare.sqlite3")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }
}

/// `EYECARE_DEBUG=1` logs a heartbeat on every tick.
pub fn debug_mode() -> bool {
    env_or_bool(DEBUG_ENV, false)
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                warn!("Failed to parse {key}={raw:?}, using default");
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use super::*;

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    const KEYS: &[&str] = &[
        "EYECARE_DATA_DIR",
        "EYECARE_SOURCE",
        "EYECARE_FPS",
        "EYECARE_DURATION_SECS",
        "EYECARE_BLINK_GAP_SECS",
        DEBUG_ENV,
    ];

    fn clear_keys() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn loads_defaults_when_missing() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys();

        let cfg = Config::from_env();
        assert_eq!(cfg.data_dir, PathBuf::from("./data"));
        assert_eq!(cfg.source, SourceKind::Simulated);
        assert_eq!(cfg.fps, 30);
        assert_eq!(cfg.blink_gap, Duration::from_secs(4));
        assert_eq!(cfg.duration, None);
        assert!(!cfg.debug);
        assert_eq!(cfg.database_path(), PathBuf::from("./data/eyecare.sqlite3"));
    }

    #[test]
    fn reads_overrides_and_ignores_garbage() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys();
        env::set_var("EYECARE_DATA_DIR", "/tmp/eyes");
        env::set_var("EYECARE_SOURCE", "-");
        env::set_var("EYECARE_FPS", "fast");
        env::set_var("EYECARE_DURATION_SECS", "90");
        env::set_var(DEBUG_ENV, "true");

        let cfg = Config::from_env();
        clear_keys();

        assert_eq!(cfg.settings_path(), PathBuf::from("/tmp/eyes/settings.json"));
        assert_eq!(cfg.source, SourceKind::JsonLines(JsonLinesInput::Stdin));
        assert_eq!(cfg.fps, 30);
        assert_eq!(cfg.duration, Some(Duration::from_secs(90)));
        assert!(cfg.debug);
    }

    #[test]
    fn clamps_frame_rate_and_blink_gap() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys();
        env::set_var("EYECARE_FPS", "2000");
        env::set_var("EYECARE_BLINK_GAP_SECS", "0");
        let fast = Config::from_env();
        env::set_var("EYECARE_FPS", "0");
        env::set_var("EYECARE_BLINK_GAP_SECS", "9");
        let stalled = Config::from_env();
        clear_keys();

        assert_eq!(fast.fps, MAX_FPS);
        assert_eq!(fast.blink_gap, Duration::from_secs(1));
        assert_eq!(stalled.fps, 1);
        assert_eq!(stalled.blink_gap, Duration::from_secs(9));
    }

    #[test]
    fn source_kind_parsing() {
        assert_eq!(SourceKind::parse("simulated"), SourceKind::Simulated);
        assert_eq!(
            SourceKind::parse("recordings/session.jsonl"),
            SourceKind::JsonLines(JsonLinesInput::File(PathBuf::from(
                "recordings/session.jsonl"
            )))
        );
    }
}
