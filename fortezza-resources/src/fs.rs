// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Document-root path resolution.
//!
//! Request paths arrive raw from the parser, so `..` and `.` segments
//! must be eliminated lexically before any filesystem access, and the
//! result must stay under the document root. Percent-encoded dots
//! (`%2e%2e`) are never decoded here and therefore resolve as plain
//! file-name characters, which cannot escape the root.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Ensure the document root exists and return its absolute,
/// normalized form.
pub fn prepare_document_root(path: &Path) -> io::Result<PathBuf> {
    std::fs::create_dir_all(path)?;
    path.canonicalize()
}

/// Resolve a raw request path against the document root. `None`
/// means the normalized result escaped the root.
#[must_use]
pub fn resolve_request_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = request_path.strip_prefix('/').unwrap_or(request_path);
    let relative = if relative.is_empty() { "." } else { relative };

    let resolved = normalize_lexically(&root.join(relative));
    if resolved.starts_with(root) {
        Some(resolved)
    } else {
        None
    }
}

/// Eliminate `.` and `..` components without touching the
/// filesystem. A `..` at the filesystem root stays there.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
                    normalized.pop();
                }
            }
            Component::Normal(segment) => normalized.push(segment),
        }
    }
    normalized
}
