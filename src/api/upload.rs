//! Image upload storage
//!
//! Reads multipart forms and writes the image part to the upload directory
//! as `{user_id}-{uuid}.{ext}`. Handlers call the use cases only after the
//! file is on disk and pass the stored reference `images/{file}` on.

use axum::body::Bytes;
use axum::extract::Multipart;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

use crate::api::validation::BIND_FAILED;
use crate::config::UploadConfig;
use crate::models::{Envelope, FailureKind};

/// URL prefix stored images are served under
pub const IMAGES_ROUTE: &str = "/images";

/// File part of a multipart form
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Decoded multipart form: one file part plus plain text fields
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Read every part of a multipart body, keeping the part named `file_field` as the file
pub async fn read_form(mut multipart: Multipart, file_field: &str) -> Result<UploadForm, Envelope> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(bind_failed)? {
        let name = field.name().unwrap_or("").to_string();

        if name == file_field {
            let file_name = field.file_name().unwrap_or("unknown").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field.bytes().await.map_err(bind_failed)?;

            form.file = Some(UploadedFile {
                file_name,
                content_type,
                data,
            });
        } else {
            let value = field.text().await.map_err(bind_failed)?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

fn bind_failed(e: axum::extract::multipart::MultipartError) -> Envelope {
    Envelope::failure(BIND_FAILED, FailureKind::Validation, [e.body_text()])
}

/// Check type and size, then write the file for `user_id`.
///
/// Returns the stored reference (`images/{user_id}-{uuid}.{ext}`).
pub async fn store_image(
    config: &UploadConfig,
    user_id: i64,
    file: &UploadedFile,
) -> Result<String, Envelope> {
    if !config.is_type_allowed(&file.content_type) {
        return Err(Envelope::failure(
            "Invalid file type",
            FailureKind::Validation,
            [format!(
                "{} is not allowed; allowed types: {}",
                file.content_type,
                config.allowed_types.join(", ")
            )],
        ));
    }

    if file.data.len() as u64 > config.max_file_size {
        return Err(Envelope::failure(
            "File too large",
            FailureKind::Validation,
            [format!("Maximum size is {} bytes", config.max_file_size)],
        ));
    }

    ensure_upload_dir(&config.path).await?;

    let ext = get_extension(&file.file_name, &file.content_type, config);
    let stored_name = format!("{}-{}.{}", user_id, Uuid::new_v4(), ext);

    fs::write(config.path.join(&stored_name), &file.data)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, file = %stored_name, "failed to write uploaded image");
            Envelope::failure(
                "Failed to save file",
                FailureKind::Internal,
                [e.to_string()],
            )
        })?;

    Ok(format!("{}/{}", IMAGES_ROUTE.trim_start_matches('/'), stored_name))
}

async fn ensure_upload_dir(path: &Path) -> Result<(), Envelope> {
    fs::create_dir_all(path).await.map_err(|e| {
        tracing::error!(error = %e, path = %path.display(), "failed to create upload directory");
        Envelope::failure(
            "Failed to create upload directory",
            FailureKind::Internal,
            [e.to_string()],
        )
    })
}

/// Extension from the original file name when it is a known image type,
/// otherwise derived from the content type
fn get_extension(file_name: &str, content_type: &str, config: &UploadConfig) -> String {
    let from_name = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match from_name.as_deref() {
        Some(ext @ ("jpg" | "jpeg" | "png" | "gif" | "webp")) => ext.to_string(),
        _ => config.get_extension(content_type).to_string(),
    }
}
