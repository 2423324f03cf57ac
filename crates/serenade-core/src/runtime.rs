//! Playback runtime
//!
//! Bundles the process-wide loader and session registry behind one cheap
//! clonable handle. Hosts keep one per thread; tests build a fresh one per
//! case or call [`PlaybackRuntime::reset`].

use crate::{
    config::ControllerOptions,
    loader::{PlatformLoader, ScriptInjector},
    registry::{PlayerPlatform, SessionRegistry},
};
use std::rc::Rc;
use tracing::info;

#[derive(Clone)]
pub struct PlaybackRuntime {
    loader: Rc<PlatformLoader>,
    registry: Rc<SessionRegistry>,
    options: Rc<ControllerOptions>,
}

impl PlaybackRuntime {
    pub fn new(
        injector: impl ScriptInjector + 'static,
        platform: impl PlayerPlatform + 'static,
        options: ControllerOptions,
    ) -> Self {
        let loader = PlatformLoader::new(options.script_url.clone(), injector);
        let registry = Rc::new(SessionRegistry::new(Rc::clone(&loader), platform));
        Self {
            loader,
            registry,
            options: Rc::new(options),
        }
    }

    pub fn loader(&self) -> &Rc<PlatformLoader> {
        &self.loader
    }

    pub fn registry(&self) -> &Rc<SessionRegistry> {
        &self.registry
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.options
    }

    /// Destroy the live session and return the loader to `Unloaded`
    pub fn reset(&self) {
        self.registry.destroy_live();
        self.loader.reset();
        info!("Playback runtime reset");
    }
}

impl std::fmt::Debug for PlaybackRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackRuntime")
            .field("loader", &self.loader)
            .field("registry", &self.registry)
            .finish()
    }
}
