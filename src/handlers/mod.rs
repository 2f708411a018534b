//! Request handlers, grouped per resource. Routing and access-tier
//! segregation live in `crate::routes`; authorization decisions are delegated
//! to `crate::policy` and cascading deletions to `crate::cascade`.

use axum::extract::Multipart;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::error::ApiError;

pub mod admin;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod dashboard;
pub mod newsletter;
pub mod posts;
pub mod users;

/// An image part pulled out of a multipart request body.
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// Splits a multipart body into its text fields and the (optional) part named
/// `image`. Non-image binary parts are rejected as invalid input.
pub(crate) async fn read_multipart(
    multipart: &mut Multipart,
) -> Result<(HashMap<String, String>, Option<UploadedImage>), ApiError> {
    let mut fields = HashMap::new();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::invalid("Malformed multipart body"))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let filename = field.file_name().unwrap_or("upload.bin").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            if !content_type.starts_with("image/") {
                return Err(ApiError::invalid("Only image uploads are accepted !"));
            }
            let bytes = field
                .bytes()
                .await
                .map_err(|_| ApiError::invalid("Malformed multipart body"))?
                .to_vec();
            image = Some(UploadedImage {
                bytes,
                filename,
                content_type,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|_| ApiError::invalid("Malformed multipart body"))?;
            fields.insert(name, value);
        }
    }

    Ok((fields, image))
}

/// The trailing-30-day window used by every `*_last_month` counter.
pub(crate) fn month_ago() -> DateTime<Utc> {
    Utc::now() - Duration::days(30)
}

/// Shared pagination parameters.
#[derive(serde::Deserialize, utoipa::IntoParams)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(20).clamp(1, 100)
    }
}

/// Shared limit parameter for the "latest N" endpoints.
#[derive(serde::Deserialize, utoipa::IntoParams)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}
