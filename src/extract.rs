//! Attachment text extraction.
//!
//! Downloads an attachment's bytes and turns them into plain text:
//!
//! | Content type       | Extraction                                      |
//! |--------------------|-------------------------------------------------|
//! | `image/*`          | decode, grayscale, PNG, then the [`OcrEngine`]  |
//! | `application/pdf`  | text layer via `pdf-extract`                    |
//! | `text/*`           | lossy UTF-8                                     |
//!
//! Results are cached per content reference for the lifetime of the
//! extractor. Concurrent requests for the same reference share one download
//! and one OCR run. A failure never reaches the caller as an error: it comes
//! back as empty text with a warning, and is not cached.

use async_trait::async_trait;
use moka::future::Cache;
use std::io::Cursor;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::{Config, OcrConfig};
use crate::error::excerpt;
use crate::models::{Credentials, ExtractedText};

pub const MIME_PDF: &str = "application/pdf";

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("download failed: {0}")]
    Download(String),

    #[error("attachment is larger than {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("unsupported content type: {0}")]
    Unsupported(String),
}

/// Turns a PNG image into text.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn recognize(&self, png: Vec<u8>) -> Result<String, ExtractError>;
}

/// OCR through the `tesseract` executable, image on stdin, text on stdout.
pub struct TesseractOcr {
    command: String,
    language: String,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(command: impl Into<String>, language: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
            timeout,
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.language.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    fn name(&self) -> &str {
        &self.command
    }

    async fn recognize(&self, png: Vec<u8>) -> Result<String, ExtractError> {
        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", &self.language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExtractError::Ocr(format!("failed to start {}: {}", self.command, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ExtractError::Ocr("stdin not captured".to_string()))?;
        let writer = tokio::spawn(async move {
            stdin.write_all(&png).await?;
            stdin.shutdown().await
        });

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                ExtractError::Ocr(format!("{} timed out after {:?}", self.command, self.timeout))
            })?
            .map_err(|e| ExtractError::Ocr(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Ocr(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                excerpt(stderr.trim())
            )));
        }
        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(ExtractError::Ocr(format!("failed to send image: {}", e))),
            Err(e) => return Err(ExtractError::Ocr(e.to_string())),
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

pub struct AttachmentExtractor {
    http: reqwest::Client,
    ocr: Arc<dyn OcrEngine>,
    cache: Cache<String, Arc<str>>,
    max_bytes: u64,
}

impl AttachmentExtractor {
    pub fn new(
        http: reqwest::Client,
        ocr: Arc<dyn OcrEngine>,
        max_bytes: u64,
        cache_capacity: u64,
    ) -> Self {
        Self {
            http,
            ocr,
            cache: Cache::new(cache_capacity),
            max_bytes,
        }
    }

    /// Extractor with a fresh HTTP client and the configured tesseract.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.retrieval.timeout())
            .build()?;
        Ok(Self::new(
            http,
            Arc::new(TesseractOcr::from_config(&config.ocr)),
            config.ocr.max_bytes,
            config.ocr.cache_capacity,
        ))
    }

    /// Text of the attachment at `content_ref`.
    ///
    /// Never fails: problems become an empty text with a warning.
    pub async fn extract_text(
        &self,
        content_ref: &str,
        mime_type: &str,
        credentials: &Credentials,
    ) -> ExtractedText {
        let result = self
            .cache
            .try_get_with(
                content_ref.to_string(),
                self.fetch_and_extract(content_ref, mime_type, credentials),
            )
            .await;

        match result {
            Ok(text) => ExtractedText {
                text: text.to_string(),
                warning: None,
            },
            Err(err) => {
                warn!(content_ref, mime_type, error = %err, "attachment text extraction failed");
                ExtractedText {
                    text: String::new(),
                    warning: Some(err.to_string()),
                }
            }
        }
    }

    async fn fetch_and_extract(
        &self,
        content_ref: &str,
        mime_type: &str,
        credentials: &Credentials,
    ) -> Result<Arc<str>, ExtractError> {
        let bytes = self.download(content_ref, credentials).await?;
        debug!(content_ref, bytes = bytes.len(), "attachment downloaded");
        let text = self.extract_bytes(bytes, mime_type).await?;
        Ok(Arc::from(text))
    }

    async fn download(&self, url: &str, credentials: &Credentials) -> Result<Vec<u8>, ExtractError> {
        let mut resp = self
            .http
            .get(url)
            .basic_auth(&credentials.username, Some(&credentials.secret))
            .send()
            .await
            .map_err(|e| ExtractError::Download(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ExtractError::Download(format!(
                "HTTP {}: {}",
                status.as_u16(),
                excerpt(&body)
            )));
        }

        let limit = self.max_bytes;
        if resp.content_length().is_some_and(|len| len > limit) {
            return Err(ExtractError::TooLarge { limit });
        }

        let mut buf = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| ExtractError::Download(e.to_string()))?
        {
            if (buf.len() + chunk.len()) as u64 > limit {
                return Err(ExtractError::TooLarge { limit });
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(buf)
    }

    /// Extract text from already-downloaded bytes. Uncached.
    pub async fn extract_bytes(&self, bytes: Vec<u8>, mime_type: &str) -> Result<String, ExtractError> {
        let essence = mime_essence(mime_type);

        if essence.starts_with("image/") || (is_opaque(&essence) && image::guess_format(&bytes).is_ok()) {
            let png = tokio::task::spawn_blocking(move || grayscale_png(&bytes))
                .await
                .map_err(|e| ExtractError::Decode(e.to_string()))??;
            debug!(engine = self.ocr.name(), png_bytes = png.len(), "running OCR");
            return self.ocr.recognize(png).await;
        }

        if essence == MIME_PDF {
            return tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
            })
            .await
            .map_err(|e| ExtractError::Pdf(e.to_string()))?;
        }

        if essence.starts_with("text/") {
            return Ok(String::from_utf8_lossy(&bytes).into_owned());
        }

        Err(ExtractError::Unsupported(mime_type.to_string()))
    }
}

/// `jlens extract`: print the text of one attachment.
pub async fn run_extract(config: &Config, url: &str, mime_type: &str) -> anyhow::Result<()> {
    let credentials = config.credentials_from_env()?;
    let extractor = AttachmentExtractor::from_config(config)?;
    let extracted = extractor.extract_text(url, mime_type, &credentials).await;

    if let Some(ref warning) = extracted.warning {
        println!("Warning: {}", warning);
    }
    if extracted.text.is_empty() {
        println!("(no text)");
    } else {
        println!("{}", extracted.text);
    }
    Ok(())
}

/// `image/PNG; name=x.png` -> `image/png`
fn mime_essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn is_opaque(essence: &str) -> bool {
    essence.is_empty() || essence == "application/octet-stream"
}

fn grayscale_png(bytes: &[u8]) -> Result<Vec<u8>, ExtractError> {
    let img = image::load_from_memory(bytes).map_err(|e| ExtractError::Decode(e.to_string()))?;
    let gray = image::DynamicImage::ImageLuma8(img.to_luma8());
    let mut out = Cursor::new(Vec::new());
    gray.write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| ExtractError::Decode(e.to_string()))?;
    Ok(out.into_inner())
}
