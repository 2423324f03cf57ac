//! Component-shaped wrapper around [`BackgroundMusic`]
//!
//! The host calls `mount`/`update`/`unmount` from its own lifecycle hooks and
//! binds `togglePlayback` to the play/pause button.

use crate::{runtime, warn};
use serenade_core::{BackgroundMusic, MountPoint, MusicConfig, PlaybackState};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct SerenadeMusic {
    inner: BackgroundMusic,
}

#[wasm_bindgen]
impl SerenadeMusic {
    /// Music that renders into the element with the given id
    #[wasm_bindgen(constructor)]
    pub fn new(mount_element_id: String) -> Self {
        Self {
            inner: BackgroundMusic::new(&runtime(), MountPoint::new(mount_element_id)),
        }
    }

    /// Mount with `{ mediaReference, enabled, loop }`
    pub fn mount(&self, config: JsValue) -> Result<(), JsValue> {
        let config: MusicConfig = serde_wasm_bindgen::from_value(config)?;
        self.inner.mount(config);
        Ok(())
    }

    /// Apply changed settings on re-render
    pub fn update(&self, config: JsValue) -> Result<(), JsValue> {
        let config: MusicConfig = serde_wasm_bindgen::from_value(config)?;
        self.inner.update(config);
        Ok(())
    }

    pub fn unmount(&self) {
        self.inner.unmount();
    }

    #[wasm_bindgen(js_name = togglePlayback)]
    pub fn toggle_playback(&self) {
        self.inner.toggle_playback();
    }

    /// One of `idle`, `ready`, `playing`, `paused`, `ended`
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        self.inner.state().to_string()
    }

    #[wasm_bindgen(getter, js_name = isPlaying)]
    pub fn is_playing(&self) -> bool {
        self.inner.state() == PlaybackState::Playing
    }

    #[wasm_bindgen(getter, js_name = hasAutoStarted)]
    pub fn has_auto_started(&self) -> bool {
        self.inner.has_auto_started()
    }

    #[wasm_bindgen(getter, js_name = canonicalId)]
    pub fn canonical_id(&self) -> Option<String> {
        self.inner.canonical_id().map(|id| id.to_string())
    }

    /// Call `callback(state)` on every mirrored state change.
    ///
    /// The listener lives until this object is freed.
    #[wasm_bindgen(js_name = onStateChange)]
    pub fn on_state_change(&self, callback: js_sys::Function) {
        let mut rx = self.inner.subscribe();
        wasm_bindgen_futures::spawn_local(async move {
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().to_string();
                if let Err(e) = callback.call1(&JsValue::NULL, &JsValue::from_str(&state)) {
                    warn(&format!("State listener threw: {e:?}"));
                }
            }
        });
    }
}
