//! Object storage for resumes, onboarding documents and training resources.
//! Works against AWS S3 or a local MinIO.

use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;

pub const RESUME_PREFIX: &str = "resumes";
pub const TRAINING_PREFIX: &str = "training";

#[derive(Clone)]
pub struct Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl Storage {
    /// Constructs an S3 client configured for MinIO (local) or AWS (production).
    pub async fn connect(config: &Config) -> Self {
        let credentials = Credentials::new(
            &config.aws_access_key_id,
            &config.aws_secret_access_key,
            None,
            None,
            "talentdesk-static",
        );

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .endpoint_url(&config.s3_endpoint)
            .load()
            .await;

        // MinIO only serves path-style URLs.
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: config.s3_bucket.clone(),
        }
    }

    pub async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), AppError> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| AppError::S3(format!("Failed to upload {key}: {e}")))?;

        info!("Uploaded s3://{}/{} ({} bytes)", self.bucket, key, size);
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Bytes, AppError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    AppError::NotFound("File not found in storage".to_string())
                } else {
                    AppError::S3(format!("Failed to download {key}: {service_error}"))
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| AppError::S3(format!("Failed to read {key}: {e}")))?;
        Ok(data.into_bytes())
    }
}

/// Builds a unique key under `prefix`, keeping the original file extension.
pub fn object_key(prefix: &str, original_name: &str) -> String {
    match extension(original_name) {
        Some(ext) => format!("{prefix}/{}.{ext}", Uuid::new_v4()),
        None => format!("{prefix}/{}", Uuid::new_v4()),
    }
}

fn extension(name: &str) -> Option<String> {
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// `Content-Disposition: inline` for a user-supplied file name. Control
/// characters would make the header invalid; quotes and backslashes would
/// break out of the quoted string.
pub fn inline_disposition(name: &str) -> String {
    let name: String = name
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '"' | '\\'))
        .collect();
    let name = name.trim();
    let name = if name.is_empty() { "file" } else { name };
    format!("inline; filename=\"{name}\"")
}

/// Content type served for a stored file, derived from its original name.
pub fn content_type_for(name: &str) -> &'static str {
    match extension(name).as_deref() {
        Some("pdf") => "application/pdf",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_disposition_strips_header_breakers() {
        assert_eq!(
            inline_disposition("offer.pdf"),
            "inline; filename=\"offer.pdf\""
        );
        let d = inline_disposition("evil\r\nSet-Cookie: x=1\t\"a\\b\u{7f}.pdf");
        assert_eq!(d, "inline; filename=\"evilSet-Cookie: x=1ab.pdf\"");
        assert!(axum::http::HeaderValue::try_from(d).is_ok());
        assert_eq!(inline_disposition("\n\""), "inline; filename=\"file\"");
    }

    #[test]
    fn test_content_type_from_extension() {
        assert_eq!(content_type_for("aadhar.PDF"), "application/pdf");
        assert_eq!(content_type_for("scan.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("photo.jpg"), "image/jpeg");
        assert_eq!(content_type_for("pan.png"), "image/png");
        assert_eq!(content_type_for("notes.docx"), "application/octet-stream");
        assert_eq!(content_type_for("no_extension"), "application/octet-stream");
    }

    #[test]
    fn test_object_key_keeps_extension() {
        let key = object_key("documents/abc", "Offer Letter.PDF");
        assert!(key.starts_with("documents/abc/"));
        assert!(key.ends_with(".pdf"));
    }

    #[test]
    fn test_object_key_drops_odd_extension() {
        let key = object_key(RESUME_PREFIX, "resume.p d f");
        assert!(!key.contains(' '));
    }
}
