use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use thiserror::Error;

const MIB: usize = 1024 * 1024;

/// What an uploaded image is for. Each purpose has its own size cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    ProfilePhoto,
    Certificate,
}

impl ImageKind {
    pub fn max_bytes(self) -> usize {
        match self {
            ImageKind::ProfilePhoto => 2 * MIB,
            ImageKind::Certificate => 5 * MIB,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("'{file_name}' is not an image ({mime_type}). Please select image files only.")]
    NotAnImage { file_name: String, mime_type: String },

    #[error("'{file_name}' is too large ({size} bytes). Maximum {}MB.", .limit / MIB)]
    TooLarge {
        file_name: String,
        size: usize,
        limit: usize,
    },

    #[error("No file was provided")]
    Empty,
}

/// A file received from the picker or a drag-and-drop, before validation.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
    /// Size the client sent. Larger than `bytes.len()` when the body was cut
    /// short at the size cap.
    pub size: usize,
}

impl Upload {
    /// Builds an upload, sniffing the MIME type from the content when the
    /// client did not send one.
    pub fn new(file_name: impl Into<String>, mime_type: Option<&str>, bytes: Bytes) -> Self {
        let mime_type = match mime_type {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => image::guess_format(&bytes)
                .map(|f| f.to_mime_type().to_string())
                .unwrap_or_else(|_| "application/octet-stream".to_string()),
        };
        Upload {
            file_name: file_name.into(),
            mime_type,
            size: bytes.len(),
            bytes,
        }
    }

    /// An upload whose body was only partly kept; `size` is what was sent.
    pub fn truncated(mut self, size: usize) -> Self {
        self.size = self.size.max(size);
        self
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn validate(&self, kind: ImageKind) -> Result<(), ValidationError> {
        if !self.is_image() {
            return Err(ValidationError::NotAnImage {
                file_name: self.file_name.clone(),
                mime_type: self.mime_type.clone(),
            });
        }
        if self.size > kind.max_bytes() {
            return Err(ValidationError::TooLarge {
                file_name: self.file_name.clone(),
                size: self.size,
                limit: kind.max_bytes(),
            });
        }
        Ok(())
    }

    /// `data:<mime>;base64,<payload>`, the form images are persisted in.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}
