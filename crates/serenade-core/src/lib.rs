//! Serenade Core - Background Playback Controller
//!
//! This crate drives the background music of a microsite:
//! - Media reference resolution (ids, watch/short/embed/shorts URLs)
//! - One-shot loading of the embeddable player platform API
//! - A single live player session per runtime
//! - Lifecycle event mirroring with loop support
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Serenade Core                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │  Reference   │  │   Platform   │  │   Session    │           │
//! │  │   Resolver   │  │    Loader    │  │   Registry   │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │ Background  │                              │
//! │                    │    Music    │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │   State     │                              │
//! │                    │ Synchronizer│                              │
//! │                    └─────────────┘                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is single-threaded: shared state is `Rc`/`RefCell`, and
//! the platform delivers events from its own event loop.

pub mod config;
pub mod controller;
pub mod error;
pub mod loader;
pub mod registry;
pub mod resolver;
pub mod runtime;
pub mod sync;
pub mod types;

pub use config::{ControllerOptions, MusicConfig, PlayerVars, DEFAULT_SCRIPT_URL};
pub use controller::BackgroundMusic;
pub use error::{Error, Result};
pub use loader::{PlatformLoader, ReadySignal, ScriptInjector};
pub use registry::{
    EventSink, PlayerInstance, PlayerPlatform, PlayerSpec, RegistryStats, SessionInfo,
    SessionOptions, SessionRegistry,
};
pub use resolver::{is_canonical_id, resolve, resolve_with_shape};
pub use runtime::PlaybackRuntime;
pub use sync::{react, Reaction, SyncPolicy, Synchronizer};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log library initialization
pub fn init() {
    tracing::info!(version = VERSION, "Serenade Core initialized");
}
