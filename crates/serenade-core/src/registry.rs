//! Player Session Manager
//!
//! Owns the single live player of a runtime. Creating a session always
//! destroys the previous one first, whoever owned it, so at most one audio
//! stream exists at a time.

use crate::{
    config::PlayerVars,
    loader::PlatformLoader,
    types::{CanonicalId, MountPoint, PlayerCommand, PlayerEvent, SessionHandle},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, info, instrument, warn};

/// Receives lifecycle events from a live player
pub type EventSink = Rc<dyn Fn(PlayerEvent)>;

/// Everything the platform needs to construct a player
#[derive(Debug, Clone, Copy)]
pub struct PlayerSpec<'a> {
    pub canonical_id: &'a CanonicalId,
    pub mount_point: &'a MountPoint,
    pub player_vars: &'a PlayerVars,
}

/// One embedded player created by the platform
pub trait PlayerInstance {
    fn play(&self);
    fn pause(&self);
    fn seek_to(&self, seconds: f64);

    fn set_volume(&self, _volume: u8) {}

    /// Tear the player down and stop emitting events
    fn destroy(&self);
}

/// Constructor side of the embeddable-player platform
pub trait PlayerPlatform {
    /// The mount point exists in the document right now
    fn mount_exists(&self, mount_point: &MountPoint) -> bool;

    /// Construct a player; lifecycle events go to `events`, never
    /// synchronously from a command call
    fn create_player(&self, spec: &PlayerSpec<'_>, events: EventSink) -> Result<Rc<dyn PlayerInstance>>;
}

/// Per-session settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    pub loop_playback: bool,
    pub player_vars: PlayerVars,
}

/// Read-only view of the live session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub handle: SessionHandle,
    pub canonical_id: CanonicalId,
    pub mount_point: MountPoint,
    pub loop_playback: bool,
}

/// Lifetime counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub created: usize,
    pub destroyed: usize,
    pub live: usize,
    /// `destroy_session` calls, including no-ops
    pub releases: usize,
}

/// Runs once when a session is torn down, whoever tears it down
pub type DestroyHook = Box<dyn FnOnce()>;

struct LiveSession {
    info: SessionInfo,
    player: Rc<dyn PlayerInstance>,
    on_destroyed: Vec<DestroyHook>,
}

/// Singleton holder for the live player session
pub struct SessionRegistry {
    loader: Rc<PlatformLoader>,
    platform: Box<dyn PlayerPlatform>,
    live: RefCell<Option<LiveSession>>,
    created: Cell<usize>,
    destroyed: Cell<usize>,
    releases: Cell<usize>,
}

impl SessionRegistry {
    pub fn new(loader: Rc<PlatformLoader>, platform: impl PlayerPlatform + 'static) -> Self {
        Self {
            loader,
            platform: Box::new(platform),
            live: RefCell::new(None),
            created: Cell::new(0),
            destroyed: Cell::new(0),
            releases: Cell::new(0),
        }
    }

    /// Create the live session, replacing any existing one.
    ///
    /// Fails without side effects when the platform is not loaded or the
    /// mount point is missing.
    pub fn create_session(
        &self,
        canonical_id: &CanonicalId,
        mount_point: &MountPoint,
        options: &SessionOptions,
        events: EventSink,
    ) -> Result<SessionHandle> {
        self.create_session_as(SessionHandle::new(), canonical_id, mount_point, options, events)
    }

    /// Create the live session under a handle the caller reserved up front.
    ///
    /// Lets an owner hold its handle before the session exists, so releasing
    /// it is always possible and a no-op when creation never happened.
    #[instrument(skip(self, options, events), fields(session = %handle, canonical_id = %canonical_id, mount = %mount_point))]
    pub fn create_session_as(
        &self,
        handle: SessionHandle,
        canonical_id: &CanonicalId,
        mount_point: &MountPoint,
        options: &SessionOptions,
        events: EventSink,
    ) -> Result<SessionHandle> {
        if !self.loader.is_loaded() {
            warn!(status = %self.loader.status(), "create_session called before the platform API was ready");
            return Err(Error::PlatformNotReady);
        }

        if !self.platform.mount_exists(mount_point) {
            warn!("Mount point is not in the document");
            return Err(Error::MountPointMissing {
                mount: mount_point.to_string(),
            });
        }

        let previous = self.live.borrow_mut().take();
        if let Some(previous) = previous {
            self.teardown(previous, "replaced");
        }

        let spec = PlayerSpec {
            canonical_id,
            mount_point,
            player_vars: &options.player_vars,
        };
        let player = self.platform.create_player(&spec, events).map_err(|e| {
            warn!(error = %e, code = e.error_code(), "Player creation failed");
            e
        })?;

        *self.live.borrow_mut() = Some(LiveSession {
            info: SessionInfo {
                handle,
                canonical_id: canonical_id.clone(),
                mount_point: mount_point.clone(),
                loop_playback: options.loop_playback,
            },
            player,
            on_destroyed: Vec::new(),
        });
        self.created.set(self.created.get() + 1);

        info!(session = %handle, loop_playback = options.loop_playback, "Session created");
        Ok(handle)
    }

    /// Destroy the session behind `handle`.
    ///
    /// Unknown or already destroyed handles are a no-op returning false.
    pub fn destroy_session(&self, handle: &SessionHandle) -> bool {
        self.releases.set(self.releases.get() + 1);
        let session = {
            let mut live = self.live.borrow_mut();
            match live.as_ref() {
                Some(session) if session.info.handle == *handle => live.take(),
                _ => None,
            }
        };

        match session {
            Some(session) => {
                self.teardown(session, "released");
                true
            }
            None => {
                debug!(session = %handle, "No live session for handle");
                false
            }
        }
    }

    /// Destroy whatever session is live
    pub fn destroy_live(&self) -> bool {
        let session = self.live.borrow_mut().take();
        match session {
            Some(session) => {
                self.teardown(session, "cleared");
                true
            }
            None => false,
        }
    }

    /// Send a command to the session behind `handle`.
    ///
    /// Returns false when that session is not the live one.
    pub fn command(&self, handle: &SessionHandle, command: PlayerCommand) -> bool {
        let player = self
            .live
            .borrow()
            .as_ref()
            .filter(|session| session.info.handle == *handle)
            .map(|session| Rc::clone(&session.player));

        let Some(player) = player else {
            debug!(session = %handle, %command, "Command for a session that is not live");
            return false;
        };

        debug!(session = %handle, %command, "Player command");
        match command {
            PlayerCommand::Play => player.play(),
            PlayerCommand::Pause => player.pause(),
            PlayerCommand::SeekTo { seconds } => player.seek_to(seconds),
            PlayerCommand::SetVolume { volume } => player.set_volume(volume.min(100)),
        }
        true
    }

    /// Run `hook` when the session behind `handle` is destroyed.
    ///
    /// Returns false, dropping the hook, when that session is not live.
    pub fn on_destroyed(&self, handle: &SessionHandle, hook: impl FnOnce() + 'static) -> bool {
        let mut live = self.live.borrow_mut();
        match live.as_mut() {
            Some(session) if session.info.handle == *handle => {
                session.on_destroyed.push(Box::new(hook));
                true
            }
            _ => false,
        }
    }

    pub fn is_live(&self, handle: &SessionHandle) -> bool {
        self.live
            .borrow()
            .as_ref()
            .is_some_and(|session| session.info.handle == *handle)
    }

    pub fn live_handle(&self) -> Option<SessionHandle> {
        self.live.borrow().as_ref().map(|session| session.info.handle)
    }

    pub fn live_session(&self) -> Option<SessionInfo> {
        self.live.borrow().as_ref().map(|session| session.info.clone())
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            created: self.created.get(),
            destroyed: self.destroyed.get(),
            live: usize::from(self.live.borrow().is_some()),
            releases: self.releases.get(),
        }
    }

    pub fn loader(&self) -> &Rc<PlatformLoader> {
        &self.loader
    }

    /// Runs with `live` already released, so hooks may call back in
    fn teardown(&self, session: LiveSession, reason: &'static str) {
        session.player.destroy();
        self.destroyed.set(self.destroyed.get() + 1);
        info!(session = %session.info.handle, reason, "Session destroyed");

        for hook in session.on_destroyed {
            hook();
        }
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("live", &self.live_session())
            .field("stats", &self.stats())
            .finish()
    }
}
