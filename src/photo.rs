use anyhow::{Context, Result};
use base64::Engine;
use std::path::Path;
use std::sync::Arc;

/// A selected photo: the encoded file bytes plus the original file name.
///
/// Immutable once loaded. Cloning is cheap; the bytes are shared. Decoding
/// is left to the composition step so a broken file is reported there.
#[derive(Clone)]
pub struct Photo {
    name: String,
    bytes: Arc<[u8]>,
}

impl Photo {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a photo from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read photo {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::from_bytes(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// MIME type sniffed from the file header.
    pub fn mime_type(&self) -> &'static str {
        image::guess_format(&self.bytes)
            .map(|f| f.to_mime_type())
            .unwrap_or("application/octet-stream")
    }

    pub fn base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    /// Self-describing `data:<mime>;base64,<data>` form sent to AI services.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), self.base64())
    }
}

impl std::fmt::Debug for Photo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Photo")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}
