//! File storage: uploaded images land under the uploads directory keyed by
//! the owning account, and are served back under a public `/files/{name}`
//! URL.

use std::path::Path as FsPath;

use axum::{
    debug_handler,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use base64::Engine;

use crate::{res, AppError, AppResult, Config};

/// Decodes a `data:image/…;base64,…` URL and writes it under `dir`,
/// returning the public URL it will be served from.
pub async fn store_data_url(dir: &FsPath, key: &str, data_url: &str) -> AppResult<String> {
    let Some((meta, payload)) = data_url.split_once(',') else {
        return Err(AppError::Validation("malformed image data".to_string()));
    };
    if !meta.contains(";base64") {
        return Err(AppError::Validation("image data must be base64 encoded".to_string()));
    }

    let ext = match () {
        _ if meta.contains("image/png") => "png",
        _ if meta.contains("image/gif") => "gif",
        _ if meta.contains("image/webp") => "webp",
        _ => "jpg",
    };

    let bytes = base64::engine::general_purpose::STANDARD.decode(payload.trim())?;

    tokio::fs::create_dir_all(dir).await?;
    let name = format!("{key}.{ext}");
    tokio::fs::write(dir.join(&name), &bytes).await?;

    Ok(format!("/files/{name}"))
}

#[debug_handler(state = crate::AppState)]
pub async fn serve(
    Path(name): Path<String>,
    State(config): State<Config>,
) -> AppResult<Response> {
    // uploads are flat; anything path-like is not ours
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return res::sorry("file");
    }

    match tokio::fs::read(config.uploads_dir.join(&name)).await {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, mime_for(&name))], bytes).into_response()),
        Err(_) => res::sorry("file"),
    }
}

fn mime_for(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}
