use std::ffi::OsString;
use std::io::{Cursor, Write};
use std::process::{Command, Stdio};

use image::{GrayImage, ImageFormat};
use plate_capture_core::VisionError;

/// Reads text from a cleaned, binarized plate region.
///
/// Implemented by:
/// - `CommandTextReader` (external OCR process)
pub trait TextReader: Send + Sync {
    fn name(&self) -> &str;

    /// Ok(None) when the reader found nothing legible.
    fn read_text(&self, region: &GrayImage) -> Result<Option<String>, VisionError>;
}

/// Runs an OCR command per region: PNG on stdin, text on stdout.
#[derive(Debug, Clone)]
pub struct CommandTextReader {
    program: OsString,
    args: Vec<OsString>,
}

impl CommandTextReader {
    pub fn new<I, S>(program: impl Into<OsString>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Tesseract in single-line mode, restricted to plate characters.
    pub fn tesseract() -> Self {
        Self::new(
            "tesseract",
            [
                "stdin",
                "stdout",
                "--psm",
                "7",
                "-c",
                "tessedit_char_whitelist=ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789",
            ],
        )
    }

    /// Whether the program can be started at all (`<program> --version`).
    pub fn probe(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }

    fn encode_png(region: &GrayImage) -> Result<Vec<u8>, VisionError> {
        let mut png = Vec::new();
        region
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| VisionError::TextExtraction(format!("PNG encode failed: {}", e)))?;
        Ok(png)
    }
}

impl TextReader for CommandTextReader {
    fn name(&self) -> &str {
        self.program.to_str().unwrap_or("ocr-command")
    }

    fn read_text(&self, region: &GrayImage) -> Result<Option<String>, VisionError> {
        let png = Self::encode_png(region)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                VisionError::TextExtraction(format!("failed to start {:?}: {}", self.program, e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A reader that exits without consuming stdin is judged by its exit status.
            if let Err(e) = stdin.write_all(&png) {
                log::debug!("OCR stdin closed early: {}", e);
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| VisionError::TextExtraction(e.to_string()))?;

        if !output.status.success() {
            return Err(VisionError::TextExtraction(format!(
                "{:?} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!text.is_empty()).then_some(text))
    }
}
