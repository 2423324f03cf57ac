//! Background music controller
//!
//! Binds the playback pipeline to the lifecycle of the component that owns
//! the music: mount resolves the reference and auto-starts at most once,
//! unmount tears everything down. Remounting starts over from scratch.
//!
//! ```text
//!   mount ──► resolve ──► ensure_loaded ──► create_session ──► synchronizer
//!     ▲                        (queued)          (destroys any         │
//!     │                                           other session)       ▼
//!   unmount ◄──────────── unsubscribe + destroy_session ◄──── PlaybackState
//! ```

use crate::{
    config::MusicConfig,
    registry::SessionOptions,
    resolver::resolve,
    runtime::PlaybackRuntime,
    sync::{SyncPolicy, Synchronizer},
    types::{CanonicalId, MountPoint, PlaybackState, PlayerCommand, SessionHandle},
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// State that lives exactly as long as one mount
struct MountScope {
    generation: u64,
    config: MusicConfig,
    canonical_id: Option<CanonicalId>,
    has_auto_started: bool,
    awaiting_platform: bool,
    /// Handle the next session of this mount is created under
    session: SessionHandle,
    sync: Option<Rc<Synchronizer>>,
}

impl MountScope {
    fn wants_playback(&self) -> bool {
        self.config.enabled && self.canonical_id.is_some()
    }
}

struct Shared {
    runtime: PlaybackRuntime,
    mount_point: MountPoint,
    state: Rc<watch::Sender<PlaybackState>>,
    scope: RefCell<Option<MountScope>>,
    generation: Cell<u64>,
}

/// Background music for one owning component
pub struct BackgroundMusic {
    shared: Rc<Shared>,
}

impl BackgroundMusic {
    pub fn new(runtime: &PlaybackRuntime, mount_point: MountPoint) -> Self {
        let (state_tx, _) = watch::channel(PlaybackState::Idle);
        Self {
            shared: Rc::new(Shared {
                runtime: runtime.clone(),
                mount_point,
                state: Rc::new(state_tx),
                scope: RefCell::new(None),
                generation: Cell::new(0),
            }),
        }
    }

    /// Mount with the given music settings.
    ///
    /// Mounting an already mounted controller unmounts it first.
    #[instrument(skip(self, config), fields(mount = %self.shared.mount_point))]
    pub fn mount(&self, config: MusicConfig) {
        if self.is_mounted() {
            debug!("Already mounted, remounting");
            self.unmount();
        }

        let generation = self.shared.generation.get() + 1;
        self.shared.generation.set(generation);

        let canonical_id = resolve(&config.media_reference);
        match &canonical_id {
            Some(id) => debug!(canonical_id = %id, enabled = config.enabled, "Reference resolved"),
            None if !config.media_reference.trim().is_empty() => {
                debug!(reference = %config.media_reference, "Reference did not resolve, nothing to play")
            }
            None => {}
        }

        *self.shared.scope.borrow_mut() = Some(MountScope {
            generation,
            config,
            canonical_id,
            has_auto_started: false,
            awaiting_platform: false,
            session: SessionHandle::new(),
            sync: None,
        });
        self.shared.set_state(PlaybackState::Idle);
        info!(generation, "Mounted");

        self.shared.auto_start();
    }

    /// Re-render with possibly changed settings.
    ///
    /// Identical settings are a no-op. A different track or loop flag
    /// replaces the session; disabling tears it down; enabling starts it.
    #[instrument(skip(self, config), fields(mount = %self.shared.mount_point))]
    pub fn update(&self, config: MusicConfig) {
        let (media_changed, enabled_rising, wants_playback) = {
            let mut guard = self.shared.scope.borrow_mut();
            let Some(scope) = guard.as_mut() else {
                warn!("Update on an unmounted controller ignored");
                return;
            };
            if scope.config == config {
                return;
            }

            let canonical_id = resolve(&config.media_reference);
            let media_changed = canonical_id != scope.canonical_id
                || config.loop_playback != scope.config.loop_playback;
            let enabled_rising = config.enabled && !scope.config.enabled;

            scope.canonical_id = canonical_id;
            scope.config = config;
            (media_changed, enabled_rising, scope.wants_playback())
        };

        let enabled = self.shared.with_scope(|scope| scope.config.enabled).unwrap_or(false);
        if !enabled || media_changed {
            self.shared.release_session();
            self.shared.set_state(PlaybackState::Idle);
        }

        if wants_playback && (media_changed || enabled_rising) {
            debug!(media_changed, enabled_rising, "Settings changed, starting playback");
            self.shared.with_scope_mut(|scope| scope.has_auto_started = true);
            self.shared.request_start();
        }
    }

    /// Play/pause button handler.
    ///
    /// Without a live session this is what starts everything, since
    /// browsers may block autoplay until a user gesture.
    #[instrument(skip(self), fields(mount = %self.shared.mount_point))]
    pub fn toggle_playback(&self) {
        let Some((sync, session, wants_playback)) = self
            .shared
            .with_scope(|scope| (scope.sync.clone(), scope.session, scope.wants_playback()))
        else {
            debug!("Toggle on an unmounted controller ignored");
            return;
        };

        let registry = self.shared.runtime.registry();
        let live = sync
            .as_ref()
            .map(|_| session)
            .filter(|handle| registry.is_live(handle));

        match live {
            Some(handle) => {
                let command = if self.state().is_playing() {
                    PlayerCommand::Pause
                } else {
                    PlayerCommand::Play
                };
                registry.command(&handle, command);
            }
            None if wants_playback => {
                if sync.is_some() {
                    debug!("Session was replaced elsewhere, starting a new one");
                    self.shared.release_session();
                }
                self.shared.request_start();
            }
            None => debug!("Nothing to play"),
        }
    }

    /// Tear down the mount. Safe to call repeatedly.
    ///
    /// Releases the mount's session handle exactly once, even when no
    /// session ever came to exist under it.
    #[instrument(skip(self), fields(mount = %self.shared.mount_point))]
    pub fn unmount(&self) {
        let scope = self.shared.scope.borrow_mut().take();
        let Some(scope) = scope else {
            return;
        };

        if scope.awaiting_platform {
            debug!("Unmounted while the platform API was still loading");
        }

        self.shared.teardown(scope.sync.as_deref(), scope.session);
        self.shared.set_state(PlaybackState::Idle);
        info!(generation = scope.generation, "Unmounted");
    }

    pub fn state(&self) -> PlaybackState {
        *self.shared.state.borrow()
    }

    /// Observe mirrored playback state
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.shared.state.subscribe()
    }

    pub fn is_mounted(&self) -> bool {
        self.shared.scope.borrow().is_some()
    }

    pub fn has_auto_started(&self) -> bool {
        self.shared
            .with_scope(|scope| scope.has_auto_started)
            .unwrap_or(false)
    }

    pub fn canonical_id(&self) -> Option<CanonicalId> {
        self.shared
            .with_scope(|scope| scope.canonical_id.clone())
            .flatten()
    }

    /// Handle of the session this mount created, if it is still live
    pub fn session_handle(&self) -> Option<SessionHandle> {
        let handle = self
            .shared
            .with_scope(|scope| scope.sync.as_ref().map(|_| scope.session))
            .flatten()?;
        self.shared
            .runtime
            .registry()
            .is_live(&handle)
            .then_some(handle)
    }

    pub fn mount_point(&self) -> &MountPoint {
        &self.shared.mount_point
    }
}

impl Drop for BackgroundMusic {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl std::fmt::Debug for BackgroundMusic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundMusic")
            .field("mount_point", &self.shared.mount_point)
            .field("mounted", &self.is_mounted())
            .field("state", &self.state())
            .finish()
    }
}

impl Shared {
    fn with_scope<R>(&self, f: impl FnOnce(&MountScope) -> R) -> Option<R> {
        self.scope.borrow().as_ref().map(f)
    }

    fn with_scope_mut<R>(&self, f: impl FnOnce(&mut MountScope) -> R) -> Option<R> {
        self.scope.borrow_mut().as_mut().map(f)
    }

    fn set_state(&self, next: PlaybackState) {
        self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next;
            true
        });
    }

    /// Start once per mount when enabled and resolvable
    fn auto_start(self: &Rc<Self>) {
        let should_start = self
            .with_scope_mut(|scope| {
                if scope.has_auto_started || !scope.wants_playback() {
                    return false;
                }
                scope.has_auto_started = true;
                true
            })
            .unwrap_or(false);

        if should_start {
            debug!("Auto-starting background music");
            self.request_start();
        }
    }

    /// Queue session creation behind loader readiness
    fn request_start(self: &Rc<Self>) {
        let generation = self.with_scope_mut(|scope| {
            if scope.awaiting_platform {
                None
            } else {
                scope.awaiting_platform = true;
                Some(scope.generation)
            }
        });

        let generation = match generation {
            Some(Some(generation)) => generation,
            Some(None) => {
                self.runtime.loader().note_waiting();
                return;
            }
            None => return,
        };

        let weak = Rc::downgrade(self);
        self.runtime.loader().ensure_loaded(move || {
            if let Some(shared) = weak.upgrade() {
                shared.start_session(generation);
            }
        });
    }

    fn start_session(self: &Rc<Self>, generation: u64) {
        let request = {
            let mut guard = self.scope.borrow_mut();
            match guard.as_mut() {
                Some(scope) if scope.generation == generation => {
                    scope.awaiting_platform = false;
                    if scope.config.enabled {
                        scope
                            .canonical_id
                            .clone()
                            .map(|id| (id, scope.config.loop_playback))
                    } else {
                        None
                    }
                }
                _ => {
                    debug!(generation, "Platform ready for a mount that is gone");
                    return;
                }
            }
        };
        let Some((canonical_id, loop_playback)) = request else {
            debug!("Music disabled or unresolved by the time the platform was ready");
            return;
        };

        self.release_session();
        let Some(handle) = self.with_scope(|scope| scope.session) else {
            return;
        };

        let options = self.runtime.options();
        let sync = Synchronizer::new(
            Rc::clone(self.runtime.registry()),
            SyncPolicy {
                loop_playback,
                optimistic_play: options.optimistic_play,
                volume: options.volume,
            },
            Rc::clone(&self.state),
        );
        let session_options = SessionOptions {
            loop_playback,
            player_vars: options.player_vars.clone(),
        };

        let created = self.runtime.registry().create_session_as(
            handle,
            &canonical_id,
            &self.mount_point,
            &session_options,
            sync.event_sink(),
        );

        match created {
            Ok(handle) => {
                sync.bind(handle);
                let stored = self
                    .with_scope_mut(|scope| scope.sync = Some(Rc::clone(&sync)))
                    .is_some();
                if !stored {
                    self.teardown(Some(&sync), handle);
                }
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Background music unavailable");
                sync.unsubscribe();
                self.set_state(PlaybackState::Idle);
            }
        }
    }

    /// Drop this mount's session, keeping the mount itself
    fn release_session(&self) {
        let released = self
            .with_scope_mut(|scope| {
                let sync = scope.sync.take()?;
                let handle = std::mem::replace(&mut scope.session, SessionHandle::new());
                Some((sync, handle))
            })
            .flatten();
        if let Some((sync, handle)) = released {
            self.teardown(Some(&sync), handle);
        }
    }

    /// Unsubscribe, then destroy whatever lives under `handle`
    fn teardown(&self, sync: Option<&Synchronizer>, handle: SessionHandle) {
        if let Some(sync) = sync {
            sync.unsubscribe();
        }
        self.runtime.registry().destroy_session(&handle);
    }
}
