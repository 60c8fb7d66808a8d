//! Plain-text QR "renderer"
//!
//! The CLI does not draw QR symbols. It emits the payload as text so an
//! external encoder can do it, e.g. `qrencode -r backup_qr.txt -o backup.png`.

use pinseed_core::{QrRenderer, RenderError};

pub const QR_PAYLOAD_FILE: &str = "backup_qr.txt";

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

impl QrRenderer for PlainTextRenderer {
    fn render(&self, payload: &str) -> Result<Vec<u8>, RenderError> {
        let mut out = Vec::with_capacity(payload.len() + 1);
        out.extend_from_slice(payload.as_bytes());
        out.push(b'\n');
        Ok(out)
    }
}
