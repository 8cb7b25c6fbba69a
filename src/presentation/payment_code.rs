//! Scannable payment code rendering

use qrcode::{Color, QrCode};

use crate::error::PresentationError;

/// 8-bit grayscale raster, row-major, 0 = black
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeImage {
    pub width: u32,
    pub height: u32,
    pub luma: Vec<u8>,
}

impl CodeImage {
    pub fn new(width: u32, height: u32, luma: Vec<u8>) -> Result<Self, PresentationError> {
        if width == 0 || height == 0 || luma.len() != (width as usize) * (height as usize) {
            return Err(PresentationError::CodeGeneration(format!(
                "{}x{} raster with {} samples",
                width,
                height,
                luma.len()
            )));
        }
        Ok(Self { width, height, luma })
    }
}

/// Turns a payment address into an image placed on the presentation page
pub trait PaymentCodeRenderer: Send + Sync {
    fn render(&self, payload: &str) -> Result<CodeImage, PresentationError>;
}

/// QR code renderer: one sample per module, surrounded by a light quiet zone
#[derive(Debug, Clone)]
pub struct QrCodeRenderer {
    quiet_zone: u32,
}

impl QrCodeRenderer {
    pub const DEFAULT_QUIET_ZONE: u32 = 4;

    pub fn new() -> Self {
        Self {
            quiet_zone: Self::DEFAULT_QUIET_ZONE,
        }
    }

    pub fn with_quiet_zone(quiet_zone: u32) -> Self {
        Self { quiet_zone }
    }
}

impl Default for QrCodeRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentCodeRenderer for QrCodeRenderer {
    fn render(&self, payload: &str) -> Result<CodeImage, PresentationError> {
        let code = QrCode::new(payload.as_bytes()).map_err(|e| PresentationError::CodeGeneration(e.to_string()))?;
        let modules = code.width() as u32;
        let colors = code.to_colors();
        let side = modules + 2 * self.quiet_zone;

        let mut luma = vec![0xFFu8; (side * side) as usize];
        for (i, color) in colors.iter().enumerate() {
            if *color == Color::Dark {
                let x = i as u32 % modules + self.quiet_zone;
                let y = i as u32 / modules + self.quiet_zone;
                luma[(y * side + x) as usize] = 0x00;
            }
        }
        CodeImage::new(side, side, luma)
    }
}
