//! Script injection against the live document

use crate::warn;
use js_sys::{Function, Reflect};
use serenade_core::{Error, ReadySignal, Result, ScriptInjector};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{Document, HtmlScriptElement};

/// Global the player API calls once it has finished loading
const READY_HOOK: &str = "onYouTubeIframeAPIReady";

#[derive(Debug, Default, Clone, Copy)]
pub struct DomScriptInjector;

fn document() -> Option<Document> {
    web_sys::window()?.document()
}

fn js_error(context: &str, value: JsValue) -> Error {
    Error::ScriptInjection(format!("{context}: {value:?}"))
}

impl ScriptInjector for DomScriptInjector {
    /// `window.YT.Player` exists when the API was loaded by someone else
    fn api_available(&self) -> bool {
        let Some(window) = web_sys::window() else {
            return false;
        };
        let Ok(yt) = Reflect::get(&window, &JsValue::from_str("YT")) else {
            return false;
        };
        if yt.is_undefined() || yt.is_null() {
            return false;
        }
        Reflect::get(&yt, &JsValue::from_str("Player"))
            .map(|player| player.is_function())
            .unwrap_or(false)
    }

    fn script_present(&self, src: &str) -> bool {
        document()
            .and_then(|doc| doc.query_selector(&format!("script[src=\"{src}\"]")).ok().flatten())
            .is_some()
    }

    fn on_ready(&self, ready: ReadySignal) {
        let Some(window) = web_sys::window() else {
            warn("No window, readiness hook not installed");
            return;
        };
        let hook_name = JsValue::from_str(READY_HOOK);

        // Another embed on the page may have installed its own hook
        let previous = Reflect::get(&window, &hook_name)
            .ok()
            .and_then(|hook| hook.dyn_into::<Function>().ok());

        let hook = Closure::once_into_js(move || {
            if let Some(previous) = previous {
                if let Err(e) = previous.call0(&JsValue::NULL) {
                    warn(&format!("Previous readiness hook threw: {e:?}"));
                }
            }
            ready.notify();
        });

        if let Err(e) = Reflect::set(&window, &hook_name, &hook) {
            warn(&format!("Could not install readiness hook: {e:?}"));
        }
    }

    fn inject(&self, src: &str) -> Result<()> {
        let doc = document().ok_or_else(|| Error::ScriptInjection("no document".into()))?;

        let script: HtmlScriptElement = doc
            .create_element("script")
            .map_err(|e| js_error("create script element", e))?
            .dyn_into()
            .map_err(|_| Error::ScriptInjection("created element is not a script".into()))?;
        script.set_src(src);
        script.set_async(true);

        match doc.head() {
            Some(head) => head.append_child(&script),
            None => doc
                .body()
                .ok_or_else(|| Error::ScriptInjection("document has no head or body".into()))?
                .append_child(&script),
        }
        .map_err(|e| js_error("append script element", e))?;

        Ok(())
    }
}
