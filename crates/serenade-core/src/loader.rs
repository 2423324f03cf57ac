//! Platform API Loader
//!
//! One-shot loader for the embeddable player script. The first caller
//! triggers injection; every caller (before or after readiness) gets its
//! callback run exactly once, in registration order.
//!
//! There is no timeout. If the platform never signals readiness the loader
//! stays in `Loading` and queued callbacks never run; the owning UI decides
//! whether to surface that.

use crate::{types::LoaderStatus, Result};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, warn};

type ReadyCallback = Box<dyn FnOnce()>;

/// Document-side operations the loader needs
pub trait ScriptInjector {
    /// The platform API is already usable without loading anything
    fn api_available(&self) -> bool {
        false
    }

    /// A script tag for `src` is already in the document
    fn script_present(&self, src: &str) -> bool;

    /// Arrange for `ready.notify()` to be called once the API is ready
    fn on_ready(&self, ready: ReadySignal);

    /// Insert the script tag
    fn inject(&self, src: &str) -> Result<()>;
}

/// Handle the platform's readiness hook uses to wake the loader
#[derive(Clone)]
pub struct ReadySignal {
    loader: Weak<PlatformLoader>,
}

impl ReadySignal {
    /// Deliver the external "API ready" notification
    pub fn notify(&self) {
        match self.loader.upgrade() {
            Some(loader) => loader.mark_ready(),
            None => debug!("Ready notification for a dropped loader"),
        }
    }
}

impl std::fmt::Debug for ReadySignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadySignal")
            .field("alive", &(self.loader.strong_count() > 0))
            .finish()
    }
}

struct LoaderInner {
    status: LoaderStatus,
    pending: VecDeque<ReadyCallback>,
    injections: usize,
    stall_warned: bool,
}

/// Process-wide loader state
pub struct PlatformLoader {
    script_url: String,
    injector: Box<dyn ScriptInjector>,
    inner: RefCell<LoaderInner>,
    this: Weak<PlatformLoader>,
}

impl PlatformLoader {
    /// Create a loader for `script_url`
    pub fn new(script_url: impl Into<String>, injector: impl ScriptInjector + 'static) -> Rc<Self> {
        let script_url = script_url.into();
        Rc::new_cyclic(|this| Self {
            script_url,
            injector: Box::new(injector),
            inner: RefCell::new(LoaderInner {
                status: LoaderStatus::Unloaded,
                pending: VecDeque::new(),
                injections: 0,
                stall_warned: false,
            }),
            this: this.clone(),
        })
    }

    pub fn status(&self) -> LoaderStatus {
        self.inner.borrow().status
    }

    pub fn is_loaded(&self) -> bool {
        self.status() == LoaderStatus::Loaded
    }

    /// Number of callbacks waiting for readiness
    pub fn pending(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// How many times the injection side effect ran
    pub fn injections(&self) -> usize {
        self.inner.borrow().injections
    }

    pub fn script_url(&self) -> &str {
        &self.script_url
    }

    pub fn ready_signal(&self) -> ReadySignal {
        ReadySignal {
            loader: self.this.clone(),
        }
    }

    /// Run `callback` once the platform API is ready.
    ///
    /// Runs it immediately when already loaded.
    pub fn ensure_loaded(&self, callback: impl FnOnce() + 'static) {
        let status = self.status();
        match status {
            LoaderStatus::Loaded => callback(),
            LoaderStatus::Loading => {
                let mut inner = self.inner.borrow_mut();
                inner.pending.push_back(Box::new(callback));
                debug!(pending = inner.pending.len(), "Platform API still loading, callback queued");
            }
            LoaderStatus::Unloaded => self.begin_loading(Box::new(callback)),
        }
    }

    fn begin_loading(&self, callback: ReadyCallback) {
        if self.injector.api_available() {
            self.inner.borrow_mut().status = LoaderStatus::Loaded;
            info!("Platform API already available");
            callback();
            return;
        }

        {
            let mut inner = self.inner.borrow_mut();
            inner.status = LoaderStatus::Loading;
            inner.pending.push_back(callback);
        }

        self.injector.on_ready(self.ready_signal());

        if self.injector.script_present(&self.script_url) {
            debug!(src = %self.script_url, "Platform script already present, waiting for readiness");
            return;
        }

        self.inner.borrow_mut().injections += 1;
        match self.injector.inject(&self.script_url) {
            Ok(()) => info!(src = %self.script_url, "Platform script injected"),
            Err(e) => error!(
                src = %self.script_url,
                error = %e,
                code = e.error_code(),
                "Platform script injection failed, waiting indefinitely"
            ),
        }
    }

    fn mark_ready(&self) {
        let drained = {
            let mut inner = self.inner.borrow_mut();
            if inner.status != LoaderStatus::Loading {
                debug!(status = %inner.status, "Ready notification outside Loading ignored");
                return;
            }
            inner.status = LoaderStatus::Loaded;
            inner.stall_warned = false;
            std::mem::take(&mut inner.pending)
        };

        info!(callbacks = drained.len(), "Platform API ready");
        for callback in drained {
            callback();
        }
    }

    /// Log the unbounded wait once per load attempt.
    ///
    /// Returns true while the loader is still waiting for readiness.
    pub fn note_waiting(&self) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.status != LoaderStatus::Loading {
            return false;
        }
        if !inner.stall_warned {
            inner.stall_warned = true;
            warn!(
                src = %self.script_url,
                pending = inner.pending.len(),
                "Platform API has not signalled readiness yet"
            );
        }
        true
    }

    /// Return to `Unloaded`, dropping queued callbacks
    pub fn reset(&self) {
        let dropped = {
            let mut inner = self.inner.borrow_mut();
            inner.status = LoaderStatus::Unloaded;
            inner.injections = 0;
            inner.stall_warned = false;
            std::mem::take(&mut inner.pending)
        };
        debug!(dropped = dropped.len(), "Loader reset");
    }
}

impl std::fmt::Debug for PlatformLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("PlatformLoader")
            .field("script_url", &self.script_url)
            .field("status", &inner.status)
            .field("pending", &inner.pending.len())
            .field("injections", &inner.injections)
            .finish()
    }
}
