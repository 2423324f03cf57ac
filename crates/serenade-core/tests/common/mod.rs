//! Recording fakes for the platform seams

#![allow(dead_code)]

use serenade_core::{
    ControllerOptions, EventSink, MountPoint, PlaybackRuntime, PlayerEvent, PlayerInstance,
    PlayerPlatform, PlayerSpec, ReadySignal, Result, ScriptInjector,
};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

pub const MOUNT: &str = "bg-music";

/// Everything the fakes observed, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Inject,
    Create { player: usize, id: String, mount: String },
    Play(usize),
    Pause(usize),
    Seek(usize, f64),
    Volume(usize, u8),
    Destroy(usize),
}

pub type Journal = Rc<RefCell<Vec<Call>>>;

#[derive(Clone, Default)]
pub struct FakeInjector {
    journal: Journal,
    hook: Rc<RefCell<Option<ReadySignal>>>,
    present: Rc<Cell<bool>>,
}

impl ScriptInjector for FakeInjector {
    fn script_present(&self, _src: &str) -> bool {
        self.present.get()
    }

    fn on_ready(&self, ready: ReadySignal) {
        *self.hook.borrow_mut() = Some(ready);
    }

    fn inject(&self, _src: &str) -> Result<()> {
        self.journal.borrow_mut().push(Call::Inject);
        self.present.set(true);
        Ok(())
    }
}

pub struct FakePlayer {
    index: usize,
    journal: Journal,
    events: EventSink,
    destroyed: Cell<bool>,
}

impl FakePlayer {
    /// Deliver a lifecycle event the way the platform would
    pub fn emit(&self, event: PlayerEvent) {
        if !self.destroyed.get() {
            (self.events)(event);
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }
}

impl PlayerInstance for FakePlayer {
    fn play(&self) {
        self.journal.borrow_mut().push(Call::Play(self.index));
    }

    fn pause(&self) {
        self.journal.borrow_mut().push(Call::Pause(self.index));
    }

    fn seek_to(&self, seconds: f64) {
        self.journal.borrow_mut().push(Call::Seek(self.index, seconds));
    }

    fn set_volume(&self, volume: u8) {
        self.journal.borrow_mut().push(Call::Volume(self.index, volume));
    }

    fn destroy(&self) {
        self.destroyed.set(true);
        self.journal.borrow_mut().push(Call::Destroy(self.index));
    }
}

#[derive(Clone, Default)]
pub struct FakePlatform {
    journal: Journal,
    mounts: Rc<RefCell<HashSet<String>>>,
    players: Rc<RefCell<Vec<Rc<FakePlayer>>>>,
    fail_create: Rc<Cell<bool>>,
}

impl PlayerPlatform for FakePlatform {
    fn mount_exists(&self, mount_point: &MountPoint) -> bool {
        self.mounts.borrow().contains(mount_point.as_str())
    }

    fn create_player(&self, spec: &PlayerSpec<'_>, events: EventSink) -> Result<Rc<dyn PlayerInstance>> {
        if self.fail_create.get() {
            return Err(serenade_core::Error::player("constructor threw"));
        }

        let index = self.players.borrow().len();
        self.journal.borrow_mut().push(Call::Create {
            player: index,
            id: spec.canonical_id.to_string(),
            mount: spec.mount_point.to_string(),
        });

        let player = Rc::new(FakePlayer {
            index,
            journal: Rc::clone(&self.journal),
            events,
            destroyed: Cell::new(false),
        });
        self.players.borrow_mut().push(Rc::clone(&player));
        Ok(player)
    }
}

/// A runtime wired to fakes sharing one journal
pub struct Harness {
    pub runtime: PlaybackRuntime,
    pub injector: FakeInjector,
    pub platform: FakePlatform,
    pub journal: Journal,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_options(ControllerOptions::default())
    }

    pub fn with_options(options: ControllerOptions) -> Self {
        let journal: Journal = Rc::default();
        let injector = FakeInjector {
            journal: Rc::clone(&journal),
            ..Default::default()
        };
        let platform = FakePlatform {
            journal: Rc::clone(&journal),
            ..Default::default()
        };
        platform.mounts.borrow_mut().insert(MOUNT.to_string());

        let runtime = PlaybackRuntime::new(injector.clone(), platform.clone(), options);
        Self {
            runtime,
            injector,
            platform,
            journal,
        }
    }

    pub fn mount_point(&self) -> MountPoint {
        MountPoint::new(MOUNT)
    }

    pub fn add_mount(&self, id: &str) {
        self.platform.mounts.borrow_mut().insert(id.to_string());
    }

    pub fn remove_mount(&self, id: &str) {
        self.platform.mounts.borrow_mut().remove(id);
    }

    pub fn fail_creation(&self, fail: bool) {
        self.platform.fail_create.set(fail);
    }

    /// Fire the platform's global readiness hook
    pub fn fire_ready(&self) {
        let hook = self.injector.hook.borrow().clone();
        hook.expect("loader installed its ready hook").notify();
    }

    pub fn player(&self, index: usize) -> Rc<FakePlayer> {
        Rc::clone(&self.platform.players.borrow()[index])
    }

    pub fn player_count(&self) -> usize {
        self.platform.players.borrow().len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.journal.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.journal.borrow().iter().filter(|call| pred(call)).count()
    }

    pub fn clear_calls(&self) {
        self.journal.borrow_mut().clear();
    }
}

pub fn is_destroy(call: &Call) -> bool {
    matches!(call, Call::Destroy(_))
}

pub fn is_create(call: &Call) -> bool {
    matches!(call, Call::Create { .. })
}

pub fn is_inject(call: &Call) -> bool {
    matches!(call, Call::Inject)
}
