use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::future::Future;
use core::str::FromStr;
use serde::Serialize;
use thiserror::Error;

use crate::Score;

pub const DEFAULT_INTENT_BASE: &str = "https://warpcast.com/~/compose";

/// Which integration the page runs under, decided once at startup.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum HostEnvironment {
    /// Plain page, wallet comes from the browser extension and sharing goes through a web intent.
    #[default]
    StandaloneWallet,
    /// Page embedded in a host app that provides its own SDK.
    EmbeddedHost,
}

impl FromStr for HostEnvironment {
    type Err = ShareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standalone" => Ok(Self::StandaloneWallet),
            "embedded" => Ok(Self::EmbeddedHost),
            _ => Err(ShareError::UnknownHost(String::from(s))),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShareError {
    #[error("Sharing is not available here")]
    Unavailable,
    #[error("Could not open the share window: {0}")]
    Intent(String),
    #[error("Share failed: {0}")]
    Compose(String),
    #[error("Unknown host environment {0:?}")]
    UnknownHost(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShareOutcome {
    Composed,
    IntentOpened,
}

/// Payload for the host compose action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeRequest {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_key: Option<String>,
}

pub fn share_text(score: Score) -> String {
    format!("🍾 I just scored {score} in Bottle Match Scorecard! Can you beat me?")
}

impl ComposeRequest {
    /// Local `data:` URLs are not embeddable and get dropped.
    pub fn new(text: String, image_url: &str, channel_key: Option<String>) -> Self {
        let embeds = if image_url.starts_with("http://") || image_url.starts_with("https://") {
            vec![String::from(image_url)]
        } else {
            Vec::new()
        };
        Self {
            text,
            embeds,
            channel_key,
        }
    }
}

/// Share integrations offered by the page host.
pub trait ShareHost {
    fn environment(&self) -> HostEnvironment;

    /// Whether a web intent can be opened.
    fn can_open_intent(&self) -> bool;

    fn open_intent(&self, text: &str) -> Result<(), ShareError>;

    fn compose(&self, request: &ComposeRequest) -> impl Future<Output = Result<(), ShareError>>;
}

/// Shares through the host compose action when embedded, the web intent otherwise.
///
/// An embedded host without a compose action still gets the web intent.
pub async fn share<H: ShareHost>(
    host: &H,
    text: String,
    image_url: &str,
    channel_key: Option<String>,
) -> Result<ShareOutcome, ShareError> {
    if host.environment() == HostEnvironment::EmbeddedHost {
        let request = ComposeRequest::new(text, image_url, channel_key);
        match host.compose(&request).await {
            Ok(()) => return Ok(ShareOutcome::Composed),
            Err(ShareError::Unavailable) => {
                log::warn!("host has no compose action, falling back to the web intent");
                return open_intent(host, &request.text);
            }
            Err(err) => return Err(err),
        }
    }
    open_intent(host, &text)
}

fn open_intent<H: ShareHost>(host: &H, text: &str) -> Result<ShareOutcome, ShareError> {
    if !host.can_open_intent() {
        return Err(ShareError::Unavailable);
    }
    host.open_intent(text)?;
    Ok(ShareOutcome::IntentOpened)
}
