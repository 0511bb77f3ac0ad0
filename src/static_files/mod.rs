//! Static file fallback for single-page applications.
//!
//! Serves `root + path` when that file exists, otherwise `root/index.html`
//! so that client-side routes (`/dashboard`, `/users/42`) load the app shell.

pub mod mime;

use std::io;
use std::path::{Component, Path, PathBuf};

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use percent_encoding::percent_decode_str;
use thiserror::Error;
use tokio::fs;
use tokio_util::io::ReaderStream;

use crate::config::StaticFilesConfig;

#[derive(Debug, Error)]
pub enum StaticError {
    /// Neither the requested file nor the index file could be served.
    #[error("static asset missing for '{path}'")]
    AssetMissing { path: String },
}

/// A static asset root with its client-side-routing index file.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    index: String,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>, index: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            index: index.into(),
        }
    }

    /// `None` when no root is configured.
    pub fn from_config(config: &StaticFilesConfig) -> Option<Self> {
        config
            .root
            .as_ref()
            .map(|root| Self::new(root.clone(), config.index.clone()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Serve `path` from the root, falling back to the index file.
    /// With `head_only` the body is omitted but the headers describe it.
    pub async fn serve(&self, path: &str, head_only: bool) -> Result<Response<Body>, StaticError> {
        if let Some(file) = self.resolve(path).await {
            if let Ok(response) = read_response(&file, head_only, false).await {
                return Ok(response);
            }
        }

        let index = self.root.join(&self.index);
        match read_response(&index, head_only, true).await {
            Ok(response) => {
                tracing::trace!(path = %path, "Serving index fallback");
                Ok(response)
            }
            Err(e) => {
                tracing::debug!(path = %path, index = %index.display(), error = %e, "Index file unavailable");
                Err(StaticError::AssetMissing {
                    path: path.to_string(),
                })
            }
        }
    }

    /// Map a request path onto a regular file inside the root.
    async fn resolve(&self, path: &str) -> Option<PathBuf> {
        let Some(decoded) = decode_path(path) else {
            tracing::warn!(path = %path, "Undecodable request path");
            return None;
        };
        let relative = Path::new(decoded.trim_start_matches('/'));
        if relative.as_os_str().is_empty() {
            return None;
        }
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            tracing::warn!(path = %path, "Path traversal attempt blocked");
            return None;
        }

        let candidate = self.root.join(relative);
        let metadata = fs::metadata(&candidate).await.ok()?;
        if !metadata.is_file() {
            return None;
        }

        // Symlinks may still point outside the root.
        let root = fs::canonicalize(&self.root).await.ok()?;
        let resolved = fs::canonicalize(&candidate).await.ok()?;
        if !resolved.starts_with(&root) {
            tracing::warn!(path = %path, resolved = %resolved.display(), "Path escapes static root");
            return None;
        }
        Some(candidate)
    }
}

/// Percent-decode a request path. `None` for invalid UTF-8 or an embedded NUL.
fn decode_path(path: &str) -> Option<String> {
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    if decoded.contains('\0') {
        return None;
    }
    Some(decoded.into_owned())
}

async fn read_response(file: &Path, head_only: bool, is_index: bool) -> io::Result<Response<Body>> {
    let handle = fs::File::open(file).await?;
    let metadata = handle.metadata().await?;
    if !metadata.is_file() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"));
    }

    let body = if head_only {
        Body::empty()
    } else {
        Body::from_stream(ReaderStream::new(handle))
    };

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(mime::content_type_for(file)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.len()));
    if is_index {
        // The shell must be revalidated so new deployments are picked up.
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    }
    Ok(response)
}
