//! Renderer capability
//!
//! Turning markup into a bitmap needs a layout engine the bridge does not
//! carry (a browser, a headless renderer, a native view). The host plugs one
//! in through [`ReceiptRenderer`].

use async_trait::async_trait;
use thiserror::Error;

/// Renderable receipt element handed over by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualElement {
    /// Markup describing the element
    pub markup: String,
    /// Target width in pixels (printer paper width), if known
    pub width_px: Option<u32>,
}

impl VisualElement {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            width_px: None,
        }
    }

    pub fn with_width(mut self, width_px: u32) -> Self {
        self.width_px = Some(width_px);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct RenderError(pub String);

/// Renders a visual element to bitmap bytes (PNG unless stated otherwise)
#[async_trait]
pub trait ReceiptRenderer: Send + Sync {
    async fn render(&self, element: &VisualElement) -> Result<Vec<u8>, RenderError>;
}
