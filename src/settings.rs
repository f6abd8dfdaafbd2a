//! Runtime configuration.
//!
//! Layered lookup: hard defaults, then an optional `showcase.toml` next to
//! the binary, then `SHOWCASE_`-prefixed environment variables.

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub window_title: String,
    pub fullscreen: bool,
    /// Auto-advance interval for the carousel, in milliseconds.
    pub autoplay_interval_ms: u64,
    /// "cut" or "fade".
    pub transition: String,
    pub transition_duration_ms: u32,
    pub cache_dir: PathBuf,
    pub cache_max_gb: u64,
    pub font_path: PathBuf,
    /// Optional JSON file overriding the compiled-in slide deck.
    pub deck_path: Option<PathBuf>,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("window_title", "Showcase")?
            .set_default("fullscreen", true)?
            .set_default("autoplay_interval_ms", 1800_i64)?
            .set_default("transition", "fade")?
            .set_default("transition_duration_ms", 500_i64)?
            .set_default("cache_dir", "cache")?
            .set_default("cache_max_gb", 2_i64)?
            .set_default(
                "font_path",
                "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            )?
            .add_source(File::new("showcase", FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("SHOWCASE"))
            .build()?
            .try_deserialize()
    }

    pub fn autoplay_interval(&self) -> Duration {
        Duration::from_millis(self.autoplay_interval_ms)
    }

    pub fn transition_duration(&self) -> Duration {
        Duration::from_millis(self.transition_duration_ms as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::load().expect("defaults must load");
        assert_eq!(settings.autoplay_interval(), Duration::from_millis(1800));
        assert_eq!(settings.transition, "fade");
        assert!(settings.deck_path.is_none());
        assert_eq!(settings.cache_max_gb, 2);
    }
}
