//! Serenade WASM - Browser bindings for background music
//!
//! Wires the core playback controller to the real page:
//! - Script injection and the global readiness hook (`dom`)
//! - The IFrame Player API (`youtube`)
//! - A component-shaped wrapper for the host framework (`component`)
//!
//! ## Usage
//!
//! ```javascript
//! import init, { SerenadeMusic } from '@serenade/wasm';
//!
//! await init();
//! const music = new SerenadeMusic('bg-music');
//! music.mount({ mediaReference: 'https://youtu.be/dQw4w9WgXcQ', enabled: true, loop: true });
//! music.onStateChange((state) => button.classList.toggle('playing', state === 'playing'));
//! ```

use serenade_core::{resolve, ControllerOptions, LoaderStatus, PlaybackRuntime};
use std::cell::RefCell;
use wasm_bindgen::prelude::*;

mod component;
mod dom;
mod youtube;

pub use component::SerenadeMusic;
pub use dom::DomScriptInjector;
pub use youtube::{YouTubePlatform, YouTubePlayer};

thread_local! {
    static RUNTIME: RefCell<Option<PlaybackRuntime>> = const { RefCell::new(None) };
}

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    serenade_core::init();
    log("Initialized");
}

/// Library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Canonical id for a media reference, `undefined` when it does not resolve
#[wasm_bindgen(js_name = resolveReference)]
pub fn resolve_reference(reference: &str) -> Option<String> {
    resolve(reference).map(|id| id.to_string())
}

/// Replace the page runtime's options.
///
/// Only allowed before the platform API starts loading.
#[wasm_bindgen]
pub fn configure(options: JsValue) -> Result<(), JsValue> {
    let options: ControllerOptions = serde_wasm_bindgen::from_value(options)?;
    options
        .validate()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    RUNTIME.with(|slot| {
        let mut slot = slot.borrow_mut();
        if let Some(runtime) = slot.as_ref() {
            if runtime.loader().status() != LoaderStatus::Unloaded {
                return Err(JsValue::from_str(
                    "options cannot change after the player API started loading",
                ));
            }
        }
        *slot = Some(build_runtime(options));
        Ok(())
    })
}

/// Destroy the live player and forget the loaded API state
#[wasm_bindgen(js_name = resetRuntime)]
pub fn reset_runtime() {
    RUNTIME.with(|slot| {
        if let Some(runtime) = slot.borrow().as_ref() {
            runtime.reset();
        }
    });
}

/// The page-wide runtime, created with default options on first use
pub(crate) fn runtime() -> PlaybackRuntime {
    RUNTIME.with(|slot| {
        slot.borrow_mut()
            .get_or_insert_with(|| build_runtime(ControllerOptions::default()))
            .clone()
    })
}

fn build_runtime(options: ControllerOptions) -> PlaybackRuntime {
    PlaybackRuntime::new(DomScriptInjector, YouTubePlatform::new(), options)
}

pub(crate) fn log(message: &str) {
    web_sys::console::log_1(&format!("[Serenade WASM] {message}").into());
}

pub(crate) fn warn(message: &str) {
    web_sys::console::warn_1(&format!("[Serenade WASM] {message}").into());
}
