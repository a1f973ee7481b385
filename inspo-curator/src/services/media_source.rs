//! Media sources for candidate clips
//!
//! Resolves a candidate's `media_ref` to raw bytes plus a declared media type.
//! Two backends: a local directory and an HTTP base URL.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("inspo-curator/", env!("CARGO_PKG_VERSION"));
const FALLBACK_MIME_TYPE: &str = "audio/mpeg";

/// Media retrieval errors
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Media not found: {0}")]
    NotFound(String),

    /// Reference would escape the media root or is malformed
    #[error("Invalid media reference: {0}")]
    InvalidReference(String),

    #[error("IO error reading {media_ref}: {source}")]
    Io {
        media_ref: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {0} fetching {1}")]
    Status(u16, String),

    #[error("Media is empty: {0}")]
    Empty(String),
}

/// Raw clip bytes and their media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl MediaBlob {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Retrieves clip bytes by reference
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn fetch(&self, media_ref: &str) -> Result<MediaBlob, MediaError>;
}

/// Detect the media type of a clip
///
/// Sniffs magic bytes first, then the file extension, then assumes MP3.
/// Only audio kinds are taken from the sniffer.
pub fn detect_mime_type(bytes: &[u8], media_ref: &str) -> String {
    let sniffed = infer::get(bytes).filter(|k| k.matcher_type() == infer::MatcherType::Audio);
    if let Some(kind) = sniffed {
        return kind.mime_type().to_string();
    }

    let extension = Path::new(media_ref)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("aac") => "audio/aac",
        _ => FALLBACK_MIME_TYPE,
    }
    .to_string()
}

/// `media_ref` as a relative path of plain components
fn checked_relative(media_ref: &str) -> Result<&Path, MediaError> {
    let relative = Path::new(media_ref);
    if media_ref.trim().is_empty()
        || relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(MediaError::InvalidReference(media_ref.to_string()));
    }
    Ok(relative)
}

/// Reads clips from a local directory
pub struct FsMediaSource {
    root: PathBuf,
}

impl FsMediaSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join `media_ref` onto the root, refusing absolute paths and `..`
    fn resolve(&self, media_ref: &str) -> Result<PathBuf, MediaError> {
        Ok(self.root.join(checked_relative(media_ref)?))
    }
}

#[async_trait]
impl MediaSource for FsMediaSource {
    async fn fetch(&self, media_ref: &str) -> Result<MediaBlob, MediaError> {
        let path = self.resolve(media_ref)?;

        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MediaError::NotFound(media_ref.to_string())
            } else {
                MediaError::Io {
                    media_ref: media_ref.to_string(),
                    source: e,
                }
            }
        })?;

        if bytes.is_empty() {
            return Err(MediaError::Empty(media_ref.to_string()));
        }

        tracing::debug!(media_ref, size = bytes.len(), "Read clip from disk");
        let mime_type = detect_mime_type(&bytes, media_ref);
        Ok(MediaBlob { bytes, mime_type })
    }
}

/// Fetches clips relative to a base URL
pub struct HttpMediaSource {
    http_client: reqwest::Client,
    base_url: reqwest::Url,
}

impl HttpMediaSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, MediaError> {
        let base_url = base_url.into();
        let parsed = reqwest::Url::parse(&base_url)
            .ok()
            .filter(|u| !u.cannot_be_a_base())
            .ok_or_else(|| MediaError::InvalidReference(base_url.clone()))?;

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MediaError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: parsed,
        })
    }

    /// Append `media_ref` to the base path, one percent-encoded segment per
    /// component
    fn url_for(&self, media_ref: &str) -> Result<reqwest::Url, MediaError> {
        let relative = checked_relative(media_ref)?;
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| MediaError::InvalidReference(media_ref.to_string()))?
            .pop_if_empty()
            .extend(relative.components().filter_map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            }));
        Ok(url)
    }
}

#[async_trait]
impl MediaSource for HttpMediaSource {
    async fn fetch(&self, media_ref: &str) -> Result<MediaBlob, MediaError> {
        let url = self.url_for(media_ref)?;
        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| MediaError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MediaError::NotFound(media_ref.to_string()));
        }
        if !status.is_success() {
            return Err(MediaError::Status(status.as_u16(), url.to_string()));
        }

        let declared = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("audio/"))
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MediaError::Network(e.to_string()))?
            .to_vec();

        if bytes.is_empty() {
            return Err(MediaError::Empty(media_ref.to_string()));
        }

        tracing::debug!(media_ref, size = bytes.len(), "Fetched clip over HTTP");
        let mime_type = declared.unwrap_or_else(|| detect_mime_type(&bytes, media_ref));
        Ok(MediaBlob { bytes, mime_type })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(detect_mime_type(b"not audio", "a.wav"), "audio/wav");
        assert_eq!(detect_mime_type(b"not audio", "B.FLAC"), "audio/flac");
        assert_eq!(detect_mime_type(b"not audio", "clip"), "audio/mpeg");
    }

    #[test]
    fn test_mime_from_magic_bytes() {
        // ID3v2 header wins over a misleading extension
        let bytes = b"ID3\x04\x00\x00\x00\x00\x00\x00rest-of-frame";
        assert_eq!(detect_mime_type(bytes, "clip.wav"), "audio/mpeg");
    }

    #[test]
    fn test_non_audio_magic_bytes_ignored() {
        // PNG signature
        let png = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";
        assert_eq!(detect_mime_type(png, "clip.ogg"), "audio/ogg");

        // zip local file header
        let zip = b"PK\x03\x04\x14\x00\x00\x00\x08\x00";
        assert_eq!(detect_mime_type(zip, "clip"), "audio/mpeg");
    }

    #[test]
    fn test_fs_rejects_escaping_refs() {
        let source = FsMediaSource::new("/srv/audio");
        assert!(matches!(
            source.resolve("../secret.mp3"),
            Err(MediaError::InvalidReference(_))
        ));
        assert!(matches!(
            source.resolve("/etc/passwd"),
            Err(MediaError::InvalidReference(_))
        ));
        assert!(matches!(source.resolve(""), Err(MediaError::InvalidReference(_))));
        assert_eq!(
            source.resolve("sub/song1.mp3").unwrap(),
            PathBuf::from("/srv/audio/sub/song1.mp3")
        );
    }

    #[tokio::test]
    async fn test_fs_fetch_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("song1.mp3"), b"fake mp3 payload").unwrap();

        let source = FsMediaSource::new(dir.path());
        let blob = source.fetch("song1.mp3").await.unwrap();
        assert_eq!(blob.len(), 16);
        assert_eq!(blob.mime_type, "audio/mpeg");
    }

    #[tokio::test]
    async fn test_fs_fetch_missing_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("empty.mp3"), b"").unwrap();

        let source = FsMediaSource::new(dir.path());
        assert!(matches!(
            source.fetch("missing.mp3").await,
            Err(MediaError::NotFound(_))
        ));
        assert!(matches!(
            source.fetch("empty.mp3").await,
            Err(MediaError::Empty(_))
        ));
    }

    #[test]
    fn test_http_url_join() {
        let source = HttpMediaSource::new("http://localhost:8000/audio/").unwrap();
        assert_eq!(
            source.url_for("song1.mp3").unwrap().as_str(),
            "http://localhost:8000/audio/song1.mp3"
        );
        assert_eq!(
            source.url_for("./live/My Song #2.mp3").unwrap().as_str(),
            "http://localhost:8000/audio/live/My%20Song%20%232.mp3"
        );

        let bare = HttpMediaSource::new("http://localhost:8000").unwrap();
        assert_eq!(
            bare.url_for("song1.mp3").unwrap().as_str(),
            "http://localhost:8000/song1.mp3"
        );
    }

    #[test]
    fn test_http_rejects_escaping_refs() {
        let source = HttpMediaSource::new("http://localhost:8000/audio").unwrap();
        for bad in ["../admin/secret.mp3", "/song2.mp3", "a/../../b.mp3", "  "] {
            assert!(
                matches!(source.url_for(bad), Err(MediaError::InvalidReference(_))),
                "{} should be rejected",
                bad
            );
        }
        assert!(matches!(
            HttpMediaSource::new("not a url"),
            Err(MediaError::InvalidReference(_))
        ));
    }
}
