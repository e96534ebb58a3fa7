use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;

use crate::FaceIdError;

/// An encoded still image (JPEG, PNG, ...) handed to the extractor.
///
/// Width and height are 0 when unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    pub mime: String,
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
}

impl ImageBuffer {
    pub fn new(mime: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            mime: mime.into(),
            data: data.into(),
            width: 0,
            height: 0,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Parses a `data:<mime>;base64,<payload>` URL.
    pub fn from_data_url(url: &str) -> Result<Self, FaceIdError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| FaceIdError::InvalidImage("missing data: scheme".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| FaceIdError::InvalidImage("missing ',' separator".into()))?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or_else(|| {
                FaceIdError::InvalidImage("only base64 data URLs are supported".into())
            })?;
        if mime.is_empty() {
            return Err(FaceIdError::InvalidImage("missing mime type".into()));
        }
        let data = STANDARD
            .decode(payload.trim())
            .map_err(|e| FaceIdError::InvalidImage(e.to_string()))?;
        Ok(Self::new(mime, data))
    }

    /// Encodes the image as a base64 data URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.data))
    }

    /// Returns a file extension for the mime type.
    pub fn extension(&self) -> &'static str {
        match self.mime.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "bin",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_parsing() {
        let img = ImageBuffer::from_data_url("data:image/jpeg;base64,AQID").unwrap();
        assert_eq!(img.mime, "image/jpeg");
        assert_eq!(&img.data[..], &[1, 2, 3]);
        assert_eq!(img.extension(), "jpg");
        assert_eq!(img.to_data_url(), "data:image/jpeg;base64,AQID");
    }

    #[test]
    fn data_url_errors() {
        assert!(ImageBuffer::from_data_url("http://example.com/a.jpg").is_err());
        assert!(ImageBuffer::from_data_url("data:image/png;base64").is_err());
        assert!(ImageBuffer::from_data_url("data:image/png,AQID").is_err());
        assert!(ImageBuffer::from_data_url("data:;base64,AQID").is_err());
        assert!(ImageBuffer::from_data_url("data:image/png;base64,!!!").is_err());
    }
}
