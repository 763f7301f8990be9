use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::future::Future;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Score;

pub const DEFAULT_PIN_ENDPOINT: &str = "https://api.pinata.cloud/pinning/pinFileToIPFS";
pub const DEFAULT_GATEWAY: &str = "https://gateway.pinata.cloud";
pub const SCORECARD_FILE_NAME: &str = "scorecard.png";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("No pinning token configured")]
    MissingToken,
    #[error("Upload request failed: {0}")]
    Transport(String),
    #[error("Pinning service answered with HTTP {0}")]
    Status(u16),
    #[error("Pinning response has no content identifier")]
    MissingIdentifier,
    #[error("Pinning response is not valid JSON: {0}")]
    InvalidBody(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinningConfig {
    pub endpoint: String,
    pub gateway: String,
    pub token: Option<String>,
}

impl Default for PinningConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_PIN_ENDPOINT.to_string(),
            gateway: DEFAULT_GATEWAY.to_string(),
            token: None,
        }
    }
}

impl PinningConfig {
    pub fn gateway_url(&self, cid: &str) -> String {
        format!("{}/ipfs/{}", self.gateway.trim_end_matches('/'), cid)
    }
}

/// Multipart upload of a single `file` field with bearer authorization.
#[derive(Copy, Clone, Debug)]
pub struct UploadRequest<'a> {
    pub endpoint: &'a str,
    pub token: &'a str,
    pub file_name: &'a str,
    pub bytes: &'a [u8],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadResponse {
    pub status: u16,
    pub body: String,
}

impl UploadResponse {
    pub const fn is_success(&self) -> bool {
        matches!(self.status, 200..=299)
    }
}

/// HTTP transport for the pinning call.
pub trait Uploader {
    fn upload(
        &self,
        request: UploadRequest<'_>,
    ) -> impl Future<Output = Result<UploadResponse, UploadError>>;
}

#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: Option<String>,
}

/// Rendered scorecard kept in memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScorecardImage {
    pub png: Vec<u8>,
    /// `data:image/png;base64,...` form of the same image.
    pub data_url: String,
}

/// Result of the end-screen pipeline: the image plus where it can be found publicly, if anywhere.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScorecardArtifact {
    pub score: Score,
    pub image: ScorecardImage,
    pub remote_url: Option<String>,
}

impl ScorecardArtifact {
    /// URL to share and mint, the local data URL when publishing failed.
    pub fn share_url(&self) -> &str {
        self.remote_url.as_deref().unwrap_or(&self.image.data_url)
    }

    pub fn is_published(&self) -> bool {
        self.remote_url.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct ArtifactPublisher<U> {
    uploader: U,
    config: PinningConfig,
}

impl<U: Uploader> ArtifactPublisher<U> {
    pub fn new(uploader: U, config: PinningConfig) -> Self {
        Self { uploader, config }
    }

    /// Pins `png` and returns its public gateway URL.
    pub async fn publish(&self, png: &[u8]) -> Result<String, UploadError> {
        let token = self
            .config
            .token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or(UploadError::MissingToken)?;

        let response = self
            .uploader
            .upload(UploadRequest {
                endpoint: &self.config.endpoint,
                token,
                file_name: SCORECARD_FILE_NAME,
                bytes: png,
            })
            .await?;

        if !response.is_success() {
            return Err(UploadError::Status(response.status));
        }

        let parsed: PinResponse = serde_json::from_str(&response.body)
            .map_err(|err| UploadError::InvalidBody(err.to_string()))?;
        let cid = parsed
            .ipfs_hash
            .filter(|cid| !cid.is_empty())
            .ok_or(UploadError::MissingIdentifier)?;

        Ok(self.config.gateway_url(&cid))
    }

    /// Like [`publish`](Self::publish) but never fails, the artifact falls back to the local image.
    pub async fn publish_or_fallback(&self, score: Score, image: ScorecardImage) -> ScorecardArtifact {
        let remote_url = match self.publish(&image.png).await {
            Ok(url) => {
                log::info!("scorecard pinned at {}", url);
                Some(url)
            }
            Err(err) => {
                log::warn!("scorecard upload failed, using local image: {}", err);
                None
            }
        };
        ScorecardArtifact {
            score,
            image,
            remote_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use core::cell::RefCell;
    use futures_executor::block_on;

    struct FakeUploader {
        response: Result<UploadResponse, UploadError>,
        seen: RefCell<Vec<(String, String, usize)>>,
    }

    impl FakeUploader {
        fn answering(status: u16, body: &str) -> Self {
            Self {
                response: Ok(UploadResponse {
                    status,
                    body: body.to_string(),
                }),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Uploader for FakeUploader {
        async fn upload(&self, request: UploadRequest<'_>) -> Result<UploadResponse, UploadError> {
            self.seen.borrow_mut().push((
                request.token.to_string(),
                request.file_name.to_string(),
                request.bytes.len(),
            ));
            self.response.clone()
        }
    }

    fn config(token: Option<&str>) -> PinningConfig {
        PinningConfig {
            gateway: "https://gw.example/".to_string(),
            token: token.map(ToString::to_string),
            ..Default::default()
        }
    }

    fn image() -> ScorecardImage {
        ScorecardImage {
            png: vec![0x89, b'P', b'N', b'G'],
            data_url: "data:image/png;base64,iVBORw==".to_string(),
        }
    }

    #[test]
    fn publish_builds_gateway_url_from_cid() {
        let publisher = ArtifactPublisher::new(
            FakeUploader::answering(200, r#"{"IpfsHash":"bafy123","PinSize":4}"#),
            config(Some("jwt")),
        );

        let url = block_on(publisher.publish(&[1, 2, 3])).unwrap();

        assert_eq!(url, "https://gw.example/ipfs/bafy123");
        assert_eq!(
            publisher.uploader.seen.borrow()[0],
            ("jwt".to_string(), "scorecard.png".to_string(), 3)
        );
    }

    #[test]
    fn non_ok_status_is_an_upload_error() {
        let publisher = ArtifactPublisher::new(
            FakeUploader::answering(401, r#"{"error":"unauthorized"}"#),
            config(Some("jwt")),
        );

        assert_eq!(
            block_on(publisher.publish(&[1])),
            Err(UploadError::Status(401))
        );
    }

    #[test]
    fn body_without_identifier_is_an_upload_error() {
        let publisher =
            ArtifactPublisher::new(FakeUploader::answering(200, "{}"), config(Some("jwt")));

        assert_eq!(
            block_on(publisher.publish(&[1])),
            Err(UploadError::MissingIdentifier)
        );
    }

    #[test]
    fn missing_token_skips_the_request() {
        let publisher = ArtifactPublisher::new(FakeUploader::answering(200, "{}"), config(None));

        assert_eq!(
            block_on(publisher.publish(&[1])),
            Err(UploadError::MissingToken)
        );
        assert!(publisher.uploader.seen.borrow().is_empty());
    }

    #[test]
    fn failed_upload_falls_back_to_local_image() {
        let publisher = ArtifactPublisher::new(
            FakeUploader::answering(500, "Internal Server Error"),
            config(Some("jwt")),
        );

        let artifact = block_on(publisher.publish_or_fallback(8, image()));

        assert!(!artifact.is_published());
        assert_eq!(artifact.share_url(), "data:image/png;base64,iVBORw==");
        assert_eq!(artifact.score, 8);
    }

    #[test]
    fn published_artifact_shares_remote_url() {
        let publisher = ArtifactPublisher::new(
            FakeUploader::answering(200, r#"{"IpfsHash":"Qm42"}"#),
            config(Some("jwt")),
        );

        let artifact = block_on(publisher.publish_or_fallback(8, image()));

        assert_eq!(artifact.share_url(), "https://gw.example/ipfs/Qm42");
    }
}
