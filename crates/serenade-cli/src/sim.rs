//! Simulated player platform
//!
//! Stands in for the browser: the injected "script" becomes ready after a
//! delay and players emit lifecycle events from spawned local tasks, so the
//! controller sees the same asynchronous ordering it would see on a page.
//! Everything runs inside a `tokio::task::LocalSet`.

use serde::Serialize;
use serenade_core::{
    EventSink, MountPoint, PlayerEvent, PlayerInstance, PlayerPlatform, PlayerSpec, ReadySignal,
    Result, ScriptInjector,
};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tabled::Tabled;
use tokio::task::spawn_local;
use tokio::time::sleep;
use tracing::debug;

/// Delay between player construction and its ready event
const READY_DELAY: Duration = Duration::from_millis(10);

/// Delay between a play request and the playing event
const START_DELAY: Duration = Duration::from_millis(5);

/// One observed step of a simulation run
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct TraceEntry {
    #[tabled(rename = "t (ms)")]
    pub at_ms: u64,
    pub source: &'static str,
    pub what: String,
}

/// Shared, time-stamped journal of a run
#[derive(Clone)]
pub struct Trace {
    started: Instant,
    entries: Rc<RefCell<Vec<TraceEntry>>>,
}

impl Trace {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            entries: Rc::default(),
        }
    }

    pub fn record(&self, source: &'static str, what: impl Into<String>) {
        let what = what.into();
        let at_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(at_ms, source, %what, "trace");
        self.entries.borrow_mut().push(TraceEntry { at_ms, source, what });
    }

    pub fn entries(&self) -> Vec<TraceEntry> {
        self.entries.borrow().clone()
    }

    pub fn count(&self, source: &str, what: &str) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.source == source && entry.what == what)
            .count()
    }
}

/// Script loader that becomes ready after `load_delay`
pub struct SimInjector {
    load_delay: Duration,
    hook: Rc<RefCell<Option<ReadySignal>>>,
    trace: Trace,
}

impl SimInjector {
    pub fn new(load_delay: Duration, trace: Trace) -> Self {
        Self {
            load_delay,
            hook: Rc::default(),
            trace,
        }
    }
}

impl ScriptInjector for SimInjector {
    fn script_present(&self, _src: &str) -> bool {
        false
    }

    fn on_ready(&self, ready: ReadySignal) {
        *self.hook.borrow_mut() = Some(ready);
    }

    fn inject(&self, src: &str) -> Result<()> {
        self.trace.record("page", format!("inject {src}"));

        let hook = Rc::clone(&self.hook);
        let trace = self.trace.clone();
        let delay = self.load_delay;
        spawn_local(async move {
            sleep(delay).await;
            let ready = hook.borrow().clone();
            if let Some(ready) = ready {
                trace.record("page", "api ready");
                ready.notify();
            }
        });
        Ok(())
    }
}

/// Player factory with a fixed track length
#[derive(Clone)]
pub struct SimPlatform {
    track: Duration,
    mounts: Rc<RefCell<HashSet<String>>>,
    created: Rc<Cell<usize>>,
    trace: Trace,
}

impl SimPlatform {
    pub fn new(track: Duration, trace: Trace) -> Self {
        Self {
            track,
            mounts: Rc::default(),
            created: Rc::default(),
            trace,
        }
    }

    pub fn add_mount(&self, id: &str) {
        self.mounts.borrow_mut().insert(id.to_string());
    }
}

impl PlayerPlatform for SimPlatform {
    fn mount_exists(&self, mount_point: &MountPoint) -> bool {
        self.mounts.borrow().contains(mount_point.as_str())
    }

    fn create_player(&self, spec: &PlayerSpec<'_>, events: EventSink) -> Result<Rc<dyn PlayerInstance>> {
        let index = self.created.get();
        self.created.set(index + 1);
        self.trace.record(
            "player",
            format!("create #{index} {} in #{}", spec.canonical_id, spec.mount_point),
        );

        let player = Rc::new(SimPlayer {
            index,
            track: self.track,
            events,
            destroyed: Rc::new(Cell::new(false)),
            epoch: Rc::new(Cell::new(0)),
            trace: self.trace.clone(),
        });

        let destroyed = Rc::clone(&player.destroyed);
        let events = Rc::clone(&player.events);
        let trace = self.trace.clone();
        spawn_local(async move {
            sleep(READY_DELAY).await;
            if !destroyed.get() {
                trace.record("event", PlayerEvent::Ready.to_string());
                events(PlayerEvent::Ready);
            }
        });

        Ok(player)
    }
}

struct SimPlayer {
    index: usize,
    track: Duration,
    events: EventSink,
    destroyed: Rc<Cell<bool>>,
    /// Bumped by every command so stale timers stay silent
    epoch: Rc<Cell<u64>>,
    trace: Trace,
}

impl SimPlayer {
    fn next_epoch(&self) -> u64 {
        let epoch = self.epoch.get() + 1;
        self.epoch.set(epoch);
        epoch
    }

    /// Emit `event` after `delay` unless destroyed or superseded
    fn emit_later(&self, delay: Duration, event: PlayerEvent, epoch: u64) {
        let destroyed = Rc::clone(&self.destroyed);
        let current = Rc::clone(&self.epoch);
        let events = Rc::clone(&self.events);
        let trace = self.trace.clone();
        spawn_local(async move {
            sleep(delay).await;
            if !destroyed.get() && current.get() == epoch {
                trace.record("event", event.to_string());
                events(event);
            }
        });
    }
}

impl PlayerInstance for SimPlayer {
    fn play(&self) {
        if self.destroyed.get() {
            return;
        }
        self.trace.record("player", format!("#{} play", self.index));
        let epoch = self.next_epoch();
        self.emit_later(START_DELAY, PlayerEvent::Playing, epoch);
        self.emit_later(START_DELAY + self.track, PlayerEvent::Ended, epoch);
    }

    fn pause(&self) {
        if self.destroyed.get() {
            return;
        }
        self.trace.record("player", format!("#{} pause", self.index));
        let epoch = self.next_epoch();
        self.emit_later(START_DELAY, PlayerEvent::Paused, epoch);
    }

    fn seek_to(&self, seconds: f64) {
        if !self.destroyed.get() {
            self.trace.record("player", format!("#{} seek {seconds}", self.index));
        }
    }

    fn set_volume(&self, volume: u8) {
        if !self.destroyed.get() {
            self.trace.record("player", format!("#{} volume {volume}", self.index));
        }
    }

    fn destroy(&self) {
        if !self.destroyed.replace(true) {
            self.trace.record("player", format!("destroy #{}", self.index));
        }
    }
}
