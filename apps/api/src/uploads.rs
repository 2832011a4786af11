use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;

use crate::errors::AppError;

/// Per-file limit for resumes, onboarding documents and training resources.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Request body limit for multipart routes, with room for form overhead.
pub const MAX_BODY_BYTES: usize = MAX_UPLOAD_BYTES + 512 * 1024;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn require_file(self, field: &str) -> Result<(UploadedFile, HashMap<String, String>), AppError> {
        match self.file {
            Some(file) => Ok((file, self.fields)),
            None => Err(AppError::Validation(format!(
                "No file uploaded (expected field '{field}')"
            ))),
        }
    }
}

pub fn check_size(filename: &str, len: usize) -> Result<(), AppError> {
    if len == 0 {
        return Err(AppError::Validation(format!("File '{filename}' is empty")));
    }
    if len > MAX_UPLOAD_BYTES {
        return Err(AppError::Validation(format!(
            "File '{filename}' exceeds the {} MB limit",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Reads a multipart form with one file field named `file_field`; every other
/// field is collected as text.
pub async fn read_form(mut multipart: Multipart, file_field: &str) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == file_field {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
            check_size(&filename, bytes.len())?;
            form.file = Some(UploadedFile {
                filename,
                content_type,
                bytes,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read field '{name}': {e}")))?;
            form.fields.insert(name, value);
        }
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_limits() {
        assert!(check_size("a.pdf", 0).is_err());
        assert!(check_size("a.pdf", 1024).is_ok());
        assert!(check_size("a.pdf", MAX_UPLOAD_BYTES).is_ok());
        let err = check_size("a.pdf", MAX_UPLOAD_BYTES + 1).unwrap_err();
        assert!(err.to_string().contains("5 MB"));
    }

    #[test]
    fn test_require_file() {
        let err = UploadForm::default().require_file("resume").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
