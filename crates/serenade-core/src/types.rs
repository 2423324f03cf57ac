//! Core types for Serenade

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform-native media identifier extracted from a media reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalId(String);

impl CanonicalId {
    /// Wrap a token that has already been validated by the resolver
    pub(crate) fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for CanonicalId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Which recognized reference shape produced a canonical id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlShape {
    /// The reference already was a bare identifier
    BareId,
    /// `youtube.com/watch?v=ID`
    Watch,
    /// `youtu.be/ID`
    Short,
    /// `youtube.com/embed/ID`
    Embed,
    /// `youtube.com/shorts/ID`
    Shorts,
}

impl std::fmt::Display for UrlShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UrlShape::BareId => write!(f, "bare-id"),
            UrlShape::Watch => write!(f, "watch"),
            UrlShape::Short => write!(f, "short-link"),
            UrlShape::Embed => write!(f, "embed"),
            UrlShape::Shorts => write!(f, "shorts"),
        }
    }
}

/// DOM element id the player binds to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MountPoint(String);

impl MountPoint {
    pub fn new(element_id: impl Into<String>) -> Self {
        Self(element_id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MountPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one created player session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle(pub Uuid);

impl SessionHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Host-observable playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// No live session
    #[default]
    Idle,
    /// Player reported ready
    Ready,
    /// Player reported playing (or play was issued on ready)
    Playing,
    /// Player reported paused
    Paused,
    /// Player reported the end of the track
    Ended,
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Ready => write!(f, "ready"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Ended => write!(f, "ended"),
        }
    }
}

/// Lifecycle events emitted asynchronously by the embedded player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerEvent {
    Ready,
    Playing,
    Paused,
    Ended,
}

impl PlayerEvent {
    /// Map an IFrame API `onStateChange` code to an event.
    ///
    /// Unstarted (-1), buffering (3) and cued (5) carry no meaning for
    /// background music and map to `None`.
    pub fn from_state_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(PlayerEvent::Ended),
            1 => Some(PlayerEvent::Playing),
            2 => Some(PlayerEvent::Paused),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlayerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerEvent::Ready => write!(f, "ready"),
            PlayerEvent::Playing => write!(f, "playing"),
            PlayerEvent::Paused => write!(f, "paused"),
            PlayerEvent::Ended => write!(f, "ended"),
        }
    }
}

/// Imperative commands issued to a live player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum PlayerCommand {
    Play,
    Pause,
    SeekTo { seconds: f64 },
    SetVolume { volume: u8 },
}

impl PlayerCommand {
    /// Seek back to the beginning of the track
    pub const SEEK_TO_START: PlayerCommand = PlayerCommand::SeekTo { seconds: 0.0 };
}

impl std::fmt::Display for PlayerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerCommand::Play => write!(f, "play"),
            PlayerCommand::Pause => write!(f, "pause"),
            PlayerCommand::SeekTo { seconds } => write!(f, "seek({seconds})"),
            PlayerCommand::SetVolume { volume } => write!(f, "volume({volume})"),
        }
    }
}

/// Platform API loader states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoaderStatus {
    Unloaded,
    Loading,
    Loaded,
}

impl std::fmt::Display for LoaderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoaderStatus::Unloaded => write!(f, "unloaded"),
            LoaderStatus::Loading => write!(f, "loading"),
            LoaderStatus::Loaded => write!(f, "loaded"),
        }
    }
}
