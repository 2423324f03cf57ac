//! Configuration
//!
//! `MusicConfig` is the slice of the site configuration owned by the content
//! store. `ControllerOptions` and `PlayerVars` are controller-side defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Well-known location of the IFrame Player API script
pub const DEFAULT_SCRIPT_URL: &str = "https://www.youtube.com/iframe_api";

/// Background music settings as stored with the site content
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MusicConfig {
    /// Raw reference typed by the editor (id or URL)
    #[serde(alias = "youtubeUrl", alias = "musicUrl")]
    pub media_reference: String,
    /// Whether background music is switched on for the site
    #[serde(alias = "musicEnabled")]
    pub enabled: bool,
    /// Restart the track when it ends
    #[serde(rename = "loop", alias = "loopMusic")]
    pub loop_playback: bool,
}

impl MusicConfig {
    pub fn new(media_reference: impl Into<String>, enabled: bool, loop_playback: bool) -> Self {
        Self {
            media_reference: media_reference.into(),
            enabled,
            loop_playback,
        }
    }

    /// Parse the music settings from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pull the music settings out of a full site configuration.
    ///
    /// Looks for a `music` or `backgroundMusic` object first and falls back
    /// to reading the fields from the top level.
    pub fn from_site_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let section = value
            .get("music")
            .or_else(|| value.get("backgroundMusic"))
            .cloned()
            .unwrap_or(value);
        Ok(serde_json::from_value(section)?)
    }
}

/// Player parameters passed to the platform constructor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerVars {
    pub autoplay: u8,
    pub controls: u8,
    pub modestbranding: u8,
    pub rel: u8,
    pub playsinline: u8,
    pub iv_load_policy: u8,
    pub disablekb: u8,
    pub fs: u8,
}

impl Default for PlayerVars {
    fn default() -> Self {
        // No `loop`/`playlist` here: looping is driven by the synchronizer.
        Self {
            autoplay: 1,
            controls: 0,
            modestbranding: 1,
            rel: 0,
            playsinline: 1,
            iv_load_policy: 3,
            disablekb: 1,
            fs: 0,
        }
    }
}

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerOptions {
    /// Script injected by the loader
    pub script_url: String,
    /// Constructor parameters for every session
    pub player_vars: PlayerVars,
    /// Report `Playing` as soon as play is issued on ready
    pub optimistic_play: bool,
    /// Volume (0-100) applied on ready, platform default when unset
    pub volume: Option<u8>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            script_url: DEFAULT_SCRIPT_URL.to_string(),
            player_vars: PlayerVars::default(),
            optimistic_play: true,
            volume: None,
        }
    }
}

impl ControllerOptions {
    /// Parse options from JSON and validate them
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.script_url.trim().is_empty() {
            return Err(Error::InvalidConfig("script_url must not be empty".into()));
        }
        if let Some(volume) = self.volume {
            if volume > 100 {
                return Err(Error::InvalidConfig(format!(
                    "volume must be within 0-100, got {volume}"
                )));
            }
        }
        Ok(())
    }
}
