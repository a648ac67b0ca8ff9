// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use async_trait::async_trait;

use tokio::io::AsyncRead;

use std::io;
use std::path::{Path, PathBuf};

use fortezza_http::{
    BodySupplier,
    Method,
    Request,
    Response,
};

use fortezza_resources::{fs, MediaType};

use crate::handler::RequestHandler;

/// Serves files from the document root. Holds only immutable
/// configuration, so one instance is shared by all connection tasks.
#[derive(Debug)]
pub struct FileHandler {
    document_root: PathBuf,
}

impl FileHandler {
    /// The document root is created if missing and stored in its
    /// absolute, normalized form so containment checks are a plain
    /// prefix match.
    pub fn new(document_root: &Path) -> io::Result<FileHandler> {
        Ok(FileHandler {
            document_root: fs::prepare_document_root(document_root)?,
        })
    }

    #[must_use]
    pub fn document_root(&self) -> &Path {
        &self.document_root
    }
}

#[async_trait]
impl RequestHandler for FileHandler {
    async fn handle(&self, request: &Request) -> anyhow::Result<Response> {
        if !matches!(request.method, Method::Get | Method::Head) {
            return Ok(Response::method_not_allowed("GET, HEAD"));
        }

        // The request path arrives raw; escape attempts fall out of
        // the prefix check inside resolve_request_path.
        let Some(path) = fs::resolve_request_path(&self.document_root, &request.path) else {
            return Ok(Response::not_found());
        };

        let Ok(metadata) = tokio::fs::metadata(&path).await else {
            return Ok(Response::not_found());
        };

        let (path, metadata) = if metadata.is_dir() {
            let index = path.join("index.html");
            match tokio::fs::metadata(&index).await {
                Ok(index_metadata) if index_metadata.is_file() => (index, index_metadata),
                _ => return Ok(Response::not_found()),
            }
        } else {
            (path, metadata)
        };

        let mut response = Response::new();
        response
            .content_type(MediaType::from_path(&path).as_str())
            .body_length(metadata.len())
            .set_body_supplier(Box::new(FileSupplier { path }));
        Ok(response)
    }
}

/// Opens a fresh handle per transfer, so a response body is streamed
/// without holding the file open between build and write.
struct FileSupplier {
    path: PathBuf,
}

#[async_trait]
impl BodySupplier for FileSupplier {
    async fn open(&self) -> io::Result<Box<dyn AsyncRead + Send + Unpin>> {
        Ok(Box::new(tokio::fs::File::open(&self.path).await?))
    }
}
