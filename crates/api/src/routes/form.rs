//! Helpers for form and multipart request bodies.

use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::Multipart;
use domain::MediaUpload;

use crate::error::ApiError;

/// Parses an optional integer id field. Blank values count as absent.
pub fn parse_id<T: From<i64>>(raw: Option<&str>, name: &str) -> Result<Option<T>, ApiError> {
    parse_field::<i64>(raw, name).map(|id| id.map(T::from))
}

/// Parses an optional field with [`FromStr`]. Blank values count as absent.
pub fn parse_field<T: FromStr>(raw: Option<&str>, name: &str) -> Result<Option<T>, ApiError> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("Invalid {name}."))),
    }
}

/// A fully read multipart body.
///
/// Blank text fields and file parts without a name or content are dropped,
/// so callers only see what was actually submitted.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, MediaUpload>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                    if !file_name.is_empty() && !bytes.is_empty() {
                        form.files.insert(
                            name,
                            MediaUpload {
                                file_name,
                                content_type,
                                bytes: bytes.to_vec(),
                            },
                        );
                    }
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                    if !text.trim().is_empty() {
                        form.fields.insert(name, text);
                    }
                }
            }
        }

        Ok(form)
    }

    pub fn text(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    pub fn file(&mut self, name: &str) -> Option<MediaUpload> {
        self.files.remove(name)
    }

    pub fn id<T: From<i64>>(&self, name: &str) -> Result<Option<T>, ApiError> {
        parse_id(self.fields.get(name).map(String::as_str), name)
    }

    pub fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>, ApiError> {
        parse_field(self.fields.get(name).map(String::as_str), name)
    }
}
