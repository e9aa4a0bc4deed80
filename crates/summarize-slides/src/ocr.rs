//! OCR text cleaning (§4.5 "OCR cleaning") and the external-tool
//! capability trait slides extraction invokes per slide.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use summarize_core::Result;

use crate::tools::{self, ToolPaths};

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image_path: &Path) -> Result<String>;
}

/// Shells out to a tesseract-style binary: `tesseract <image> stdout`.
pub struct TesseractOcr {
    pub binary: String,
    pub timeout: Duration,
}

impl TesseractOcr {
    pub fn from_tool_paths(paths: &ToolPaths, timeout: Duration) -> Self {
        Self { binary: paths.tesseract.clone(), timeout }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image_path: &Path) -> Result<String> {
        let path = image_path.to_string_lossy();
        let output = tools::run(&self.binary, &[path.as_ref(), "stdout"], self.timeout).await?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Drop lines under 2 characters, lines over 20 characters with no spaces
/// (likely a garbled run), and lines with no alphanumeric content at all.
/// Confidence approximates the alphanumeric ratio of what survives.
pub fn clean_ocr_text(raw: &str) -> (String, f32) {
    let lines: Vec<&str> = raw
        .lines()
        .map(|l| l.trim())
        .filter(|l| l.chars().count() >= 2)
        .filter(|l| !(l.chars().count() > 20 && !l.contains(' ')))
        .filter(|l| l.chars().any(|c| c.is_ascii_alphanumeric() || c.is_alphanumeric()))
        .collect();
    let text = lines.join("\n");

    let non_space: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    let confidence = if non_space.is_empty() {
        0.0
    } else {
        let alnum = non_space.iter().filter(|c| c.is_alphanumeric()).count();
        (alnum as f32 / non_space.len() as f32).clamp(0.0, 1.0)
    };
    (text, confidence)
}
