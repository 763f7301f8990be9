use bottlematch_core::{HostEnvironment, WalletProvider, WalletRpcError};
use js_sys::{Function, JSON, Object, Promise, Reflect};
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

use crate::host::host_sdk;
use crate::utils::js_error_message;

fn rpc_error(err: JsValue) -> WalletRpcError {
    let code = Reflect::get(&err, &"code".into())
        .ok()
        .and_then(|code| code.as_f64())
        .map(|code| code as i64);
    WalletRpcError::new(code, js_error_message(&err))
}

fn to_js(value: &Value) -> Result<JsValue, WalletRpcError> {
    JSON::parse(&value.to_string()).map_err(rpc_error)
}

fn from_js(value: &JsValue) -> Result<Value, WalletRpcError> {
    if value.is_undefined() || value.is_null() {
        return Ok(Value::Null);
    }
    let text: String = JSON::stringify(value).map_err(rpc_error)?.into();
    serde_json::from_str(&text).map_err(|err| WalletRpcError::new(None, err.to_string()))
}

/// Wallet object the host SDK hands out, either `wallet.ethProvider` or the result of
/// `wallet.getEthereumProvider()`.
async fn host_provider(sdk_global: &str) -> Option<JsValue> {
    let sdk = host_sdk(sdk_global)?;
    let wallet = Reflect::get(&sdk, &"wallet".into())
        .ok()
        .filter(JsValue::is_object)?;

    let provider = Reflect::get(&wallet, &"ethProvider".into())
        .ok()
        .filter(JsValue::is_object);
    if provider.is_some() {
        return provider;
    }

    let getter: Function = Reflect::get(&wallet, &"getEthereumProvider".into())
        .ok()?
        .dyn_into()
        .ok()?;
    let pending = getter.call0(&wallet).ok()?;
    JsFuture::from(Promise::resolve(&pending))
        .await
        .ok()
        .filter(JsValue::is_object)
}

/// EIP-1193 provider, from the host SDK when embedded or injected by a browser wallet as
/// `window.ethereum`.
#[derive(Clone, Debug)]
pub(crate) struct InjectedWallet {
    provider: Option<JsValue>,
}

impl InjectedWallet {
    /// Picks the wallet for `environment`, falling back to `window.ethereum` when an embedded
    /// host offers none.
    pub(crate) async fn for_host(environment: HostEnvironment, sdk_global: &str) -> Self {
        if environment == HostEnvironment::EmbeddedHost {
            if let Some(provider) = host_provider(sdk_global).await {
                log::debug!("using the host wallet provider");
                return Self {
                    provider: Some(provider),
                };
            }
            log::warn!("host sdk offers no wallet, trying window.ethereum");
        }
        Self::detect()
    }

    pub(crate) fn detect() -> Self {
        let provider = Reflect::get(&gloo::utils::window(), &"ethereum".into())
            .ok()
            .filter(|provider| provider.is_object());
        if provider.is_none() {
            log::debug!("no injected wallet found");
        }
        Self { provider }
    }
}

impl WalletProvider for InjectedWallet {
    fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletRpcError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| WalletRpcError::new(None, "no wallet provider"))?;
        let request: Function = Reflect::get(provider, &"request".into())
            .and_then(|request| request.dyn_into())
            .map_err(rpc_error)?;

        let args = Object::new();
        Reflect::set(&args, &"method".into(), &method.into()).map_err(rpc_error)?;
        Reflect::set(&args, &"params".into(), &to_js(&params)?).map_err(rpc_error)?;

        log::debug!("wallet request {}", method);
        let pending = request.call1(provider, &args).map_err(rpc_error)?;
        let result = JsFuture::from(Promise::resolve(&pending))
            .await
            .map_err(|err| {
                let err = rpc_error(err);
                log::error!("wallet request {} failed: {}", method, err);
                err
            })?;
        from_js(&result)
    }

    async fn sleep(&self, millis: u32) {
        gloo::timers::future::TimeoutFuture::new(millis).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    fn install_sdk(name: &str, wallet: &JsValue) {
        let sdk = Object::new();
        Reflect::set(&sdk, &"wallet".into(), wallet).unwrap();
        Reflect::set(&gloo::utils::window(), &name.into(), &sdk).unwrap();
    }

    fn remove_sdk(name: &str) {
        Reflect::delete_property(&gloo::utils::window(), &name.into()).unwrap();
    }

    fn tag(wallet: &InjectedWallet) -> Option<String> {
        let provider = wallet.provider.as_ref()?;
        Reflect::get(provider, &"tag".into()).ok()?.as_string()
    }

    #[wasm_bindgen_test]
    async fn embedded_uses_host_provider() {
        let name = "__bottlematch_wallet_sdk";
        install_sdk(name, &JSON::parse(r#"{"ethProvider":{"tag":"host"}}"#).unwrap());

        let wallet = InjectedWallet::for_host(HostEnvironment::EmbeddedHost, name).await;

        assert!(wallet.is_available());
        assert_eq!(tag(&wallet).as_deref(), Some("host"));
        remove_sdk(name);
    }

    #[wasm_bindgen_test]
    async fn embedded_awaits_provider_getter() {
        let name = "__bottlematch_wallet_getter_sdk";
        let wallet_obj = Object::new();
        let getter = Function::new_no_args("return Promise.resolve({ tag: 'lazy-host' });");
        Reflect::set(&wallet_obj, &"getEthereumProvider".into(), &getter).unwrap();
        install_sdk(name, &wallet_obj);

        let wallet = InjectedWallet::for_host(HostEnvironment::EmbeddedHost, name).await;

        assert_eq!(tag(&wallet).as_deref(), Some("lazy-host"));
        remove_sdk(name);
    }

    #[wasm_bindgen_test]
    async fn standalone_ignores_host_provider() {
        let name = "__bottlematch_wallet_ignored_sdk";
        install_sdk(name, &JSON::parse(r#"{"ethProvider":{"tag":"host"}}"#).unwrap());

        let wallet = InjectedWallet::for_host(HostEnvironment::StandaloneWallet, name).await;

        assert_ne!(tag(&wallet).as_deref(), Some("host"));
        remove_sdk(name);
    }
}
