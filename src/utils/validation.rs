use data_encoding::BASE64;
use regex::Regex;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::client::Upload;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

static PHONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?[0-9]{7,15}$").unwrap());

pub fn validate_phone(phone: &str) -> bool {
    let compact: String = phone.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    PHONE.is_match(&compact)
}

pub fn is_valid_document_mime(mime_type: &str) -> bool {
    matches!(
        mime_type,
        "image/jpeg" | "image/jpg" | "image/png" | "application/pdf"
    )
}

pub fn is_valid_image_mime(mime_type: &str) -> bool {
    matches!(
        mime_type,
        "image/jpeg" | "image/jpg" | "image/png" | "image/webp"
    )
}

/// A file posted to the console as base64 JSON.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Base64Upload {
    pub filename: String,
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Document,
    Image,
}

impl Base64Upload {
    pub fn decode(&self, kind: UploadKind) -> Result<Upload, String> {
        let allowed = match kind {
            UploadKind::Document => is_valid_document_mime(&self.mime_type),
            UploadKind::Image => is_valid_image_mime(&self.mime_type),
        };
        if !allowed {
            return Err(match kind {
                UploadKind::Document => format!(
                    "Invalid file type: {}. Allowed: PDF, JPEG, PNG",
                    self.mime_type
                ),
                UploadKind::Image => format!(
                    "Invalid image type: {}. Allowed: JPEG, PNG, WEBP",
                    self.mime_type
                ),
            });
        }

        // Data URLs arrive with a "data:<mime>;base64," prefix.
        let encoded = self
            .data
            .split_once(";base64,")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.data);

        let bytes = BASE64
            .decode(encoded.trim().as_bytes())
            .map_err(|_| "Invalid base64 data".to_string())?;

        if bytes.is_empty() {
            return Err("File is empty".to_string());
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err("File size exceeds 10MB limit".to_string());
        }

        Ok(Upload {
            file_name: self.filename.clone(),
            mime_type: self.mime_type.clone(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(mime: &str, data: &str) -> Base64Upload {
        Base64Upload {
            filename: "cert.pdf".to_string(),
            mime_type: mime.to_string(),
            data: data.to_string(),
        }
    }

    #[test]
    fn phone_accepts_common_formats() {
        assert!(validate_phone("+44 7700 900123"));
        assert!(validate_phone("987-654-3210"));
        assert!(!validate_phone("12ab"));
    }

    #[test]
    fn decodes_plain_and_data_url_payloads() {
        let plain = upload("application/pdf", "JVBERi0xLjQ=").decode(UploadKind::Document).unwrap();
        assert_eq!(plain.bytes, b"%PDF-1.4");

        let data_url = upload("application/pdf", "data:application/pdf;base64,JVBERi0xLjQ=")
            .decode(UploadKind::Document)
            .unwrap();
        assert_eq!(data_url.bytes, plain.bytes);
    }

    #[test]
    fn rejects_wrong_type_and_bad_encoding() {
        assert!(upload("image/webp", "AAAA").decode(UploadKind::Document).is_err());
        assert!(upload("image/webp", "AAAA").decode(UploadKind::Image).is_ok());
        assert_eq!(
            upload("application/pdf", "not base64!").decode(UploadKind::Document),
            Err("Invalid base64 data".to_string())
        );
    }
}
