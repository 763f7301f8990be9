use std::sync::Once;

use bottlematch_core::{ComposeRequest, DEFAULT_INTENT_BASE, HostEnvironment, ShareError, ShareHost};
use js_sys::{Function, JSON, Promise, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::Url;

use crate::utils::js_error_message;

static READY: Once = Once::new();

pub(crate) fn host_sdk(sdk_global: &str) -> Option<JsValue> {
    Reflect::get(&gloo::utils::window(), &sdk_global.into())
        .ok()
        .filter(|sdk| sdk.is_object())
}

/// Looks up `sdk.actions.<name>`, returning the action and its `this`.
fn sdk_action(sdk: &JsValue, name: &str) -> Option<(JsValue, Function)> {
    let actions = Reflect::get(sdk, &"actions".into()).ok()?;
    let action = Reflect::get(&actions, &name.into()).ok()?.dyn_into().ok()?;
    Some((actions, action))
}

pub(crate) fn detect(sdk_global: &str) -> HostEnvironment {
    if host_sdk(sdk_global).is_some() {
        HostEnvironment::EmbeddedHost
    } else {
        HostEnvironment::StandaloneWallet
    }
}

/// Tells the host the page is ready to be shown, at most once per page load.
pub(crate) fn signal_ready(sdk_global: &str) {
    let Some(sdk) = host_sdk(sdk_global) else {
        log::debug!("no host sdk at window.{}, skipping ready signal", sdk_global);
        return;
    };

    READY.call_once(move || {
        let Some((actions, ready)) = sdk_action(&sdk, "ready") else {
            log::warn!("host sdk has no ready action");
            return;
        };
        spawn_local(async move {
            let outcome = match ready.call0(&actions) {
                Ok(pending) => JsFuture::from(Promise::resolve(&pending)).await,
                Err(err) => Err(err),
            };
            match outcome {
                Ok(_) => log::debug!("host ready signal sent"),
                Err(err) => log::error!("host ready signal failed: {}", js_error_message(&err)),
            }
        });
    });
}

/// Compose URL with `text` as its query parameter.
pub(crate) fn intent_url(base: &str, text: &str) -> Result<String, ShareError> {
    let url = Url::new(base).map_err(|err| ShareError::Intent(js_error_message(&err)))?;
    url.search_params().set("text", text);
    Ok(url.href())
}

/// Share integrations of the current page.
#[derive(Clone, Debug)]
pub(crate) struct PageHost {
    environment: HostEnvironment,
    sdk_global: String,
}

impl PageHost {
    pub(crate) fn new(environment: HostEnvironment, sdk_global: String) -> Self {
        Self {
            environment,
            sdk_global,
        }
    }
}

impl ShareHost for PageHost {
    fn environment(&self) -> HostEnvironment {
        self.environment
    }

    fn can_open_intent(&self) -> bool {
        true
    }

    fn open_intent(&self, text: &str) -> Result<(), ShareError> {
        let url = intent_url(DEFAULT_INTENT_BASE, text)?;
        let opened = gloo::utils::window()
            .open_with_url_and_target(&url, "_blank")
            .map_err(|err| ShareError::Intent(js_error_message(&err)))?;
        if opened.is_none() {
            log::warn!("share window was blocked");
        }
        Ok(())
    }

    async fn compose(&self, request: &ComposeRequest) -> Result<(), ShareError> {
        let sdk = host_sdk(&self.sdk_global).ok_or(ShareError::Unavailable)?;
        let (actions, compose) = sdk_action(&sdk, "composeCast").ok_or(ShareError::Unavailable)?;

        let payload = serde_json::to_string(request)
            .map_err(|err| ShareError::Compose(err.to_string()))
            .and_then(|json| {
                JSON::parse(&json).map_err(|err| ShareError::Compose(js_error_message(&err)))
            })?;
        let pending = compose
            .call1(&actions, &payload)
            .map_err(|err| ShareError::Compose(js_error_message(&err)))?;
        JsFuture::from(Promise::resolve(&pending))
            .await
            .map_err(|err| ShareError::Compose(js_error_message(&err)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn intent_url_encodes_text() {
        let url = intent_url(DEFAULT_INTENT_BASE, "I scored 3 & won?").unwrap();

        assert_eq!(
            url,
            "https://warpcast.com/~/compose?text=I+scored+3+%26+won%3F"
        );
    }

    #[wasm_bindgen_test]
    async fn ready_is_signalled_once() {
        let name = "__bottlematch_ready_sdk";
        let actions = js_sys::Object::new();
        let ready = Function::new_no_args("this.calls = (this.calls || 0) + 1;");
        Reflect::set(&actions, &"ready".into(), &ready).unwrap();
        let sdk = js_sys::Object::new();
        Reflect::set(&sdk, &"actions".into(), &actions).unwrap();
        Reflect::set(&gloo::utils::window(), &name.into(), &sdk).unwrap();

        signal_ready(name);
        signal_ready(name);
        gloo::timers::future::TimeoutFuture::new(20).await;

        let calls = Reflect::get(&actions, &"calls".into()).unwrap();
        assert_eq!(calls.as_f64(), Some(1.0));
        Reflect::delete_property(&gloo::utils::window(), &name.into()).unwrap();
    }

    #[wasm_bindgen_test]
    fn missing_sdk_means_standalone() {
        assert_eq!(
            detect("__bottlematch_no_such_sdk"),
            HostEnvironment::StandaloneWallet
        );
    }
}
