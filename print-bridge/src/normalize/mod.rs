//! Payload normalization
//!
//! Turns whatever the host hands over into a typed [`ReceiptPayload`]:
//!
//! | input | result |
//! |---|---|
//! | `data:image/...;base64,` string or known base64 magic | `image` / `pdf`, prefix stripped |
//! | markup string (`<div>`, `<table>`, ...) | rendered once → `image` |
//! | [`VisualElement`] | rendered → `image` |
//! | bytes | sniffed → `image` / `pdf`, else `raw` |
//! | anything else | best-effort render, else `UnsupportedFormat` |

mod renderer;
mod sniff;

pub use renderer::{ReceiptRenderer, RenderError, VisualElement};
pub use sniff::{split_data_url, strip_data_url};

use std::fmt;
use std::sync::Arc;

use shared::{PayloadKind, ReceiptPayload, models::sniff_bytes};
use tracing::debug;

use crate::error::{BridgeError, BridgeResult};
use sniff::{Sniffed, sniff};

/// A receipt as produced by the host, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawReceipt {
    /// Base64 image/PDF (optionally as a data URL), or markup
    Text(String),
    /// Renderable element
    Element(VisualElement),
    /// Raw bytes: printer commands or an encoded image/PDF
    Bytes(Vec<u8>),
    /// Already normalized
    Payload(ReceiptPayload),
}

impl From<String> for RawReceipt {
    fn from(s: String) -> Self {
        RawReceipt::Text(s)
    }
}

impl From<&str> for RawReceipt {
    fn from(s: &str) -> Self {
        RawReceipt::Text(s.to_string())
    }
}

impl From<Vec<u8>> for RawReceipt {
    fn from(bytes: Vec<u8>) -> Self {
        RawReceipt::Bytes(bytes)
    }
}

impl From<VisualElement> for RawReceipt {
    fn from(element: VisualElement) -> Self {
        RawReceipt::Element(element)
    }
}

impl From<ReceiptPayload> for RawReceipt {
    fn from(payload: ReceiptPayload) -> Self {
        RawReceipt::Payload(payload)
    }
}

/// Receipt → payload converter
#[derive(Clone, Default)]
pub struct Normalizer {
    renderer: Option<Arc<dyn ReceiptRenderer>>,
}

impl fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Normalizer")
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}

impl Normalizer {
    /// Normalizer without a renderer: markup and elements are rejected
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_renderer(renderer: Arc<dyn ReceiptRenderer>) -> Self {
        Self {
            renderer: Some(renderer),
        }
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    pub async fn normalize(&self, receipt: impl Into<RawReceipt>) -> BridgeResult<ReceiptPayload> {
        match receipt.into() {
            RawReceipt::Payload(payload) => Ok(payload),
            RawReceipt::Bytes(bytes) => Self::classify_bytes(&bytes),
            RawReceipt::Element(element) => {
                let Some(renderer) = &self.renderer else {
                    return Err(BridgeError::UnsupportedFormat(
                        "visual element but no renderer configured".into(),
                    ));
                };
                Self::render_with(renderer.as_ref(), &element).await
            }
            RawReceipt::Text(text) => self.classify_text(&text).await,
        }
    }

    async fn classify_text(&self, text: &str) -> BridgeResult<ReceiptPayload> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(BridgeError::UnsupportedFormat("receipt is empty".into()));
        }

        match sniff(trimmed) {
            Sniffed::Binary { kind, mime, data } => {
                debug!(%kind, mime, "classified receipt by content");
                Ok(ReceiptPayload::from_base64(kind, data, mime)?)
            }
            Sniffed::Markup => self.render_markup(trimmed).await,
            Sniffed::Unknown => {
                // Best effort: some hosts hand over markup without any known tag
                if self.renderer.is_none() {
                    return Err(BridgeError::UnsupportedFormat(
                        "receipt is neither base64 image/pdf nor markup".into(),
                    ));
                }
                self.render_markup(trimmed).await
            }
        }
    }

    async fn render_markup(&self, markup: &str) -> BridgeResult<ReceiptPayload> {
        let Some(renderer) = &self.renderer else {
            return Err(BridgeError::UnsupportedFormat(
                "markup receipt but no renderer configured".into(),
            ));
        };
        Self::render_with(renderer.as_ref(), &VisualElement::new(markup)).await
    }

    async fn render_with(
        renderer: &dyn ReceiptRenderer,
        element: &VisualElement,
    ) -> BridgeResult<ReceiptPayload> {
        let bitmap = renderer
            .render(element)
            .await
            .map_err(|e| BridgeError::UnsupportedFormat(format!("rendering failed: {e}")))?;

        let mime = match sniff_bytes(&bitmap) {
            Some((PayloadKind::Image, mime)) => mime,
            _ => PayloadKind::Image.default_mime(),
        };
        Ok(ReceiptPayload::from_bytes(PayloadKind::Image, &bitmap, mime)?)
    }

    fn classify_bytes(bytes: &[u8]) -> BridgeResult<ReceiptPayload> {
        let (kind, mime) =
            sniff_bytes(bytes).unwrap_or((PayloadKind::Raw, PayloadKind::Raw.default_mime()));
        Ok(ReceiptPayload::from_bytes(kind, bytes, mime)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PNG_1X1: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    /// Returns a fixed PNG header and counts calls
    struct CountingRenderer {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingRenderer {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReceiptRenderer for CountingRenderer {
        async fn render(&self, _element: &VisualElement) -> Result<Vec<u8>, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RenderError("layout engine unavailable".into()));
            }
            Ok(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec())
        }
    }

    #[tokio::test]
    async fn test_data_url_is_stripped() {
        let n = Normalizer::new();
        let prefixed = format!("data:image/png;base64,{PNG_1X1}");

        let a = n.normalize(prefixed.as_str()).await.unwrap();
        let b = n.normalize(PNG_1X1).await.unwrap();

        assert_eq!(a.kind(), PayloadKind::Image);
        assert_eq!(a.data(), PNG_1X1);
        assert_eq!(a.decoded().unwrap(), b.decoded().unwrap());
        assert_eq!(a, b);
        assert_eq!(n.normalize(strip_data_url(&prefixed)).await.unwrap(), a);
    }

    #[tokio::test]
    async fn test_pdf_magic_is_kept_verbatim() {
        let n = Normalizer::new();
        let p = n.normalize("JVBERi0xLjQK").await.unwrap();
        assert_eq!(p.kind(), PayloadKind::Pdf);
        assert_eq!(p.data(), "JVBERi0xLjQK");
        assert_eq!(p.mime(), "application/pdf");
    }

    #[tokio::test]
    async fn test_magic_with_broken_base64_is_rejected() {
        let err = Normalizer::new().normalize("iVBOR!!!").await.unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_markup_renders_exactly_once() {
        let renderer = CountingRenderer::new(false);
        let n = Normalizer::with_renderer(renderer.clone());

        let p = n
            .normalize("<div class=\"receipt\"><p>Total 12.50</p></div>")
            .await
            .unwrap();

        assert_eq!(renderer.calls(), 1);
        assert_eq!(p.kind(), PayloadKind::Image);
        assert_eq!(p.mime(), "image/png");
    }

    #[tokio::test]
    async fn test_markup_render_failure_is_unsupported_format() {
        let renderer = CountingRenderer::new(true);
        let n = Normalizer::with_renderer(renderer.clone());

        let err = n.normalize("<table><tr><td>1</td></tr></table>").await.unwrap_err();

        assert_eq!(renderer.calls(), 1);
        assert!(matches!(err, BridgeError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_unknown_text_best_effort() {
        let renderer = CountingRenderer::new(false);
        let n = Normalizer::with_renderer(renderer.clone());
        let p = n.normalize("Table 4 - 2x Coffee").await.unwrap();
        assert_eq!(p.kind(), PayloadKind::Image);
        assert_eq!(renderer.calls(), 1);

        let err = Normalizer::new().normalize("Table 4 - 2x Coffee").await.unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_element_requires_renderer() {
        let err = Normalizer::new()
            .normalize(VisualElement::new("<div/>"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedFormat(_)));
        assert_eq!(err.kind(), crate::FailureKind::UnsupportedFormat);

        let renderer = CountingRenderer::new(false);
        let p = Normalizer::with_renderer(renderer.clone())
            .normalize(VisualElement::new("<div/>").with_width(576))
            .await
            .unwrap();
        assert_eq!(p.kind(), PayloadKind::Image);
    }

    #[tokio::test]
    async fn test_bytes_are_sniffed() {
        let n = Normalizer::new();

        let pdf = n.normalize(b"%PDF-1.4\n".to_vec()).await.unwrap();
        assert_eq!(pdf.kind(), PayloadKind::Pdf);

        let raw = n.normalize(b"\x1b@Hello\n\x1dV\x00".to_vec()).await.unwrap();
        assert_eq!(raw.kind(), PayloadKind::Raw);
        assert_eq!(raw.decoded().unwrap(), b"\x1b@Hello\n\x1dV\x00");

        let err = n.normalize(Vec::new()).await.unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_text_starting_with_bm_stays_raw() {
        let n = Normalizer::new();
        let raw = n.normalize(b"BMW order #12\n".to_vec()).await.unwrap();
        assert_eq!(raw.kind(), PayloadKind::Raw);
        assert_eq!(raw.decoded().unwrap(), b"BMW order #12\n");
    }

    #[tokio::test]
    async fn test_payload_passes_through() {
        let payload = ReceiptPayload::from_base64(PayloadKind::Raw, "aGk=", "text/plain").unwrap();
        let out = Normalizer::new().normalize(payload.clone()).await.unwrap();
        assert_eq!(out, payload);
    }
}
