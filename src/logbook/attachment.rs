//-
// Copyright (c) 2026, Jason Lingle
//
// This file is part of elog-client.
//
// elog-client is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// elog-client is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with elog-client. If not, see <http://www.gnu.org/licenses/>.

use std::fs;
use std::path::PathBuf;

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::support::error::{Error, Result};

/// One attachment input, classified up front instead of duck-typed at the
/// point of use.
#[derive(Debug, Clone)]
pub enum Attachment {
    /// In-memory content with an optional display name. Without a name
    /// the positional upload name is used.
    Bytes {
        name: Option<String>,
        data: Vec<u8>,
    },
    /// A local file, opened and read while the post is being composed and
    /// released again on every exit path.
    Path(PathBuf),
    /// An attachment already hosted by this very server, as returned by
    /// `read`. Re-posting one is a no-op rather than a re-upload; a URL
    /// pointing anywhere else is rejected outright.
    Url(String),
}

impl Attachment {
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Attachment::Bytes {
            name: None,
            data: data.into(),
        }
    }

    pub fn named_bytes(
        name: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Attachment::Bytes {
            name: Some(name.into()),
            data: data.into(),
        }
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        Attachment::Path(path.into())
    }

    pub fn url(url: impl Into<String>) -> Self {
        Attachment::Url(url.into())
    }
}

/// An attachment materialized for upload: the positional `attfileN` form
/// field, the display filename, and the content.
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub field: String,
    pub filename: String,
    pub data: Vec<u8>,
}

/// Materializes attachment inputs into upload parts.
///
/// The positional counter is 1-based and counts only parts that actually
/// upload; same-server URLs vanish without consuming a number. Errors
/// identify the offending input by its position in `attachments`.
pub fn resolve(
    attachments: &[Attachment],
    base_url: &str,
) -> Result<Vec<UploadPart>> {
    let mut parts = Vec::new();
    let mut counter = 0;

    for (index, attachment) in attachments.iter().enumerate() {
        match attachment {
            Attachment::Bytes { name, data } => {
                counter += 1;
                let field = format!("attfile{}", counter);
                let filename = match name {
                    Some(name) if !name.is_empty() => name.clone(),
                    _ => field.clone(),
                };
                parts.push(UploadPart {
                    field,
                    filename,
                    data: data.clone(),
                });
            },
            Attachment::Path(path) => {
                counter += 1;
                let field = format!("attfile{}", counter);
                let data = fs::read(path).map_err(|e| {
                    Error::InvalidAttachment {
                        index,
                        reason: format!(
                            "cannot read {}: {}",
                            path.display(),
                            e
                        ),
                    }
                })?;
                let filename = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| field.clone());
                parts.push(UploadPart {
                    field,
                    filename,
                    data,
                });
            },
            Attachment::Url(url) => {
                if url.starts_with(base_url) {
                    // Already stored by this server; nothing to upload.
                    debug!("dropping own-server attachment {}", url);
                } else {
                    return Err(Error::InvalidAttachment {
                        index,
                        reason: format!(
                            "{:?} does not point at this logbook server",
                            url
                        ),
                    });
                }
            },
        }
    }

    Ok(parts)
}

lazy_static! {
    // The server prefixes stored attachment files with YYMMDD_HHMMSS_.
    static ref TIMESTAMP_PREFIX: Regex =
        Regex::new(r"^\d{6}_\d{6}_").unwrap();
}

/// The display name of a stored attachment URL: the basename with the
/// server's timestamp prefix removed. This is the name uploads are
/// compared against when deciding whether a re-post duplicates an
/// existing attachment.
pub fn stored_display_name(url: &str) -> &str {
    let basename = url.rsplit('/').next().unwrap_or(url);
    match TIMESTAMP_PREFIX.find(basename) {
        Some(prefix) => &basename[prefix.end()..],
        None => basename,
    }
}

/// The basename of a stored attachment URL, timestamp prefix included.
/// This is what the `attachmentN` attributes carry on an edit.
pub fn stored_basename(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}
