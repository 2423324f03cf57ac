//! Playback State Synchronizer
//!
//! Mirrors the live player's asynchronous lifecycle into a
//! `watch::Sender<PlaybackState>` the host can observe.
//!
//! ```text
//!   event     enter    commands                    settle
//!   ───────   ───────  ──────────────────────────  ───────────────────
//!   ready     Ready    [volume], play              Playing (optimistic)
//!   playing   Playing  -                           -
//!   paused    Paused   -                           -
//!   ended     Ended    seek(0), play   (loop only) -
//! ```

use crate::{
    registry::{EventSink, SessionRegistry},
    types::{PlaybackState, PlayerCommand, PlayerEvent, SessionHandle},
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio::sync::watch;
use tracing::debug;

/// Knobs that shape the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncPolicy {
    pub loop_playback: bool,
    pub optimistic_play: bool,
    pub volume: Option<u8>,
}

/// What the synchronizer does in response to one event
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    /// State entered as soon as the event arrives
    pub enter: PlaybackState,
    /// Commands issued after entering
    pub commands: Vec<PlayerCommand>,
    /// State entered once the commands are issued
    pub settle: Option<PlaybackState>,
}

/// Event-to-transition table
pub fn react(event: PlayerEvent, policy: &SyncPolicy) -> Reaction {
    match event {
        PlayerEvent::Ready => {
            let mut commands = Vec::with_capacity(2);
            if let Some(volume) = policy.volume {
                commands.push(PlayerCommand::SetVolume { volume });
            }
            commands.push(PlayerCommand::Play);
            Reaction {
                enter: PlaybackState::Ready,
                commands,
                settle: policy.optimistic_play.then_some(PlaybackState::Playing),
            }
        }
        PlayerEvent::Playing => Reaction {
            enter: PlaybackState::Playing,
            commands: Vec::new(),
            settle: None,
        },
        PlayerEvent::Paused => Reaction {
            enter: PlaybackState::Paused,
            commands: Vec::new(),
            settle: None,
        },
        PlayerEvent::Ended => Reaction {
            enter: PlaybackState::Ended,
            commands: if policy.loop_playback {
                vec![PlayerCommand::SEEK_TO_START, PlayerCommand::Play]
            } else {
                Vec::new()
            },
            settle: None,
        },
    }
}

/// Event subscriber bound to one session
pub struct Synchronizer {
    registry: Rc<SessionRegistry>,
    policy: SyncPolicy,
    state: Rc<watch::Sender<PlaybackState>>,
    handle: Cell<Option<SessionHandle>>,
    subscribed: Cell<bool>,
    early: RefCell<Vec<PlayerEvent>>,
}

impl Synchronizer {
    pub fn new(
        registry: Rc<SessionRegistry>,
        policy: SyncPolicy,
        state: Rc<watch::Sender<PlaybackState>>,
    ) -> Rc<Self> {
        Rc::new(Self {
            registry,
            policy,
            state,
            handle: Cell::new(None),
            subscribed: Cell::new(true),
            early: RefCell::new(Vec::new()),
        })
    }

    /// Sink to hand to the platform when creating the player.
    ///
    /// Holds only a weak reference, so a dropped synchronizer stops
    /// receiving events.
    pub fn event_sink(self: &Rc<Self>) -> EventSink {
        let weak = Rc::downgrade(self);
        Rc::new(move |event| {
            if let Some(sync) = weak.upgrade() {
                sync.handle_event(event);
            }
        })
    }

    /// Attach to the session the registry created.
    ///
    /// Events that raced ahead of the handle are replayed here. If the
    /// session is later destroyed by anyone else, the mirrored state drops
    /// back to `Idle`.
    pub fn bind(self: &Rc<Self>, handle: SessionHandle) {
        self.handle.set(Some(handle));
        let weak = Rc::downgrade(self);
        self.registry.on_destroyed(&handle, move || {
            if let Some(sync) = weak.upgrade() {
                sync.session_lost();
            }
        });
        let early = std::mem::take(&mut *self.early.borrow_mut());
        for event in early {
            self.handle_event(event);
        }
    }

    pub fn handle(&self) -> Option<SessionHandle> {
        self.handle.get()
    }

    pub fn policy(&self) -> &SyncPolicy {
        &self.policy
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed.get()
    }

    /// Stop reacting to events. Idempotent.
    pub fn unsubscribe(&self) {
        if self.subscribed.replace(false) {
            self.early.borrow_mut().clear();
            debug!(session = ?self.handle.get(), "Synchronizer unsubscribed");
        }
    }

    /// The bound session was destroyed without this subscriber letting go
    fn session_lost(&self) {
        if self.subscribed.get() {
            debug!(session = ?self.handle.get(), "Session destroyed elsewhere");
            self.unsubscribe();
            self.set_state(PlaybackState::Idle);
        }
    }

    pub fn handle_event(&self, event: PlayerEvent) {
        if !self.subscribed.get() {
            debug!(%event, "Event after unsubscribe ignored");
            return;
        }

        let Some(handle) = self.handle.get() else {
            self.early.borrow_mut().push(event);
            return;
        };

        if !self.registry.is_live(&handle) {
            debug!(session = %handle, %event, "Event from a session that is no longer live");
            return;
        }

        let reaction = react(event, &self.policy);
        self.set_state(reaction.enter);
        for command in &reaction.commands {
            self.registry.command(&handle, *command);
        }
        if let Some(settle) = reaction.settle {
            self.set_state(settle);
        }
    }

    fn set_state(&self, next: PlaybackState) {
        self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            debug!(from = %state, to = %next, "Playback state");
            *state = next;
            true
        });
    }
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("handle", &self.handle.get())
            .field("policy", &self.policy)
            .field("subscribed", &self.subscribed.get())
            .field("state", &self.state())
            .finish()
    }
}
