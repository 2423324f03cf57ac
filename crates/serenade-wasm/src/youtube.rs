//! IFrame Player API bindings
//!
//! `YT.Player` replaces the mount element with an iframe and reports its
//! lifecycle through `onReady`/`onStateChange` callbacks. State codes are
//! mapped with [`PlayerEvent::from_state_code`]; buffering and cued codes
//! are dropped there.

use crate::warn;
use js_sys::{Object, Reflect};
use serde::Serialize;
use serenade_core::{
    Error, EventSink, MountPoint, PlayerEvent, PlayerInstance, PlayerPlatform, PlayerSpec,
    PlayerVars, Result,
};
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = YT, js_name = Player)]
    pub type YtPlayer;

    #[wasm_bindgen(catch, constructor, js_namespace = YT, js_class = "Player")]
    fn new(element_id: &str, options: &JsValue) -> std::result::Result<YtPlayer, JsValue>;

    #[wasm_bindgen(catch, method, js_name = playVideo)]
    fn play_video(this: &YtPlayer) -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(catch, method, js_name = pauseVideo)]
    fn pause_video(this: &YtPlayer) -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(catch, method, js_name = seekTo)]
    fn seek_to(this: &YtPlayer, seconds: f64, allow_seek_ahead: bool)
        -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(catch, method, js_name = setVolume)]
    fn set_volume(this: &YtPlayer, volume: u8) -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(catch, method)]
    fn destroy(this: &YtPlayer) -> std::result::Result<(), JsValue>;
}

/// Constructor options, minus the `events` callbacks
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlayerOptions<'a> {
    video_id: &'a str,
    width: &'static str,
    height: &'static str,
    player_vars: &'a PlayerVars,
}

/// Creates players inside elements looked up by id
#[derive(Debug, Default)]
pub struct YouTubePlatform;

impl YouTubePlatform {
    pub fn new() -> Self {
        Self
    }
}

impl PlayerPlatform for YouTubePlatform {
    fn mount_exists(&self, mount_point: &MountPoint) -> bool {
        web_sys::window()
            .and_then(|window| window.document())
            .and_then(|doc| doc.get_element_by_id(mount_point.as_str()))
            .is_some()
    }

    fn create_player(&self, spec: &PlayerSpec<'_>, events: EventSink) -> Result<Rc<dyn PlayerInstance>> {
        let options = serde_wasm_bindgen::to_value(&PlayerOptions {
            video_id: spec.canonical_id.as_str(),
            width: "0",
            height: "0",
            player_vars: spec.player_vars,
        })
        .map_err(|e| Error::player(format!("player options: {e}")))?;

        let on_ready = Closure::<dyn FnMut(JsValue)>::new({
            let events = Rc::clone(&events);
            move |_event: JsValue| events(PlayerEvent::Ready)
        });
        let on_state_change = Closure::<dyn FnMut(JsValue)>::new(move |event: JsValue| {
            let code = Reflect::get(&event, &JsValue::from_str("data"))
                .ok()
                .and_then(|data| data.as_f64());
            if let Some(event) = code.and_then(|code| PlayerEvent::from_state_code(code as i32)) {
                events(event);
            }
        });

        let callbacks = Object::new();
        Reflect::set(&callbacks, &"onReady".into(), on_ready.as_ref())
            .and_then(|_| {
                Reflect::set(
                    &callbacks,
                    &"onStateChange".into(),
                    on_state_change.as_ref(),
                )
            })
            .and_then(|_| Reflect::set(&options, &"events".into(), &callbacks))
            .map_err(|e| Error::player(format!("player callbacks: {e:?}")))?;

        let player = YtPlayer::new(spec.mount_point.as_str(), &options)
            .map_err(|e| Error::player(format!("YT.Player threw: {e:?}")))?;

        Ok(Rc::new(YouTubePlayer {
            player,
            destroyed: Cell::new(false),
            _on_ready: on_ready,
            _on_state_change: on_state_change,
        }))
    }
}

/// One embedded player. Owns the callbacks handed to the platform.
pub struct YouTubePlayer {
    player: YtPlayer,
    destroyed: Cell<bool>,
    _on_ready: Closure<dyn FnMut(JsValue)>,
    _on_state_change: Closure<dyn FnMut(JsValue)>,
}

impl YouTubePlayer {
    fn call(&self, name: &str, result: std::result::Result<(), JsValue>) {
        if let Err(e) = result {
            warn(&format!("{name} failed: {e:?}"));
        }
    }
}

impl PlayerInstance for YouTubePlayer {
    fn play(&self) {
        if !self.destroyed.get() {
            self.call("playVideo", self.player.play_video());
        }
    }

    fn pause(&self) {
        if !self.destroyed.get() {
            self.call("pauseVideo", self.player.pause_video());
        }
    }

    fn seek_to(&self, seconds: f64) {
        if !self.destroyed.get() {
            self.call("seekTo", self.player.seek_to(seconds, true));
        }
    }

    fn set_volume(&self, volume: u8) {
        if !self.destroyed.get() {
            self.call("setVolume", self.player.set_volume(volume));
        }
    }

    fn destroy(&self) {
        if !self.destroyed.replace(true) {
            self.call("destroy", self.player.destroy());
        }
    }
}
