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

//! Parser for the `?cmd=download` plaintext dump.
//!
//! The format is a block of `Name: value` header lines, a delimiter line
//! of exactly 40 `=` characters, then the raw message body:
//!
//! ```text
//! $@MID@$: 12
//! Date: Mon, 03 Aug 2026 11:02:00 +0200
//! Author: rv
//! Attachment: 260803_110200_data.csv
//! Encoding: plain
//! ========================================
//! The body, verbatim, possibly containing = lines shorter than 40.
//! ```

use encoding_rs::mem::decode_latin1;

use crate::protocol::attribute::Attributes;
use crate::support::error::{Error, Result};

/// 40 `=` characters. The server emits this exact line between headers
/// and body.
pub const DELIMITER: &str =
    "========================================";

/// One decoded message download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub body: String,
    pub attributes: Attributes,
    /// Full URLs to the attachments, on the session's own endpoint.
    pub attachments: Vec<String>,
}

/// Decodes a download response body. `base_url` is prepended to each
/// attachment filename so callers get addresses they can fetch directly.
pub fn parse(bytes: &[u8], base_url: &str) -> Result<Download> {
    let text = decode_latin1(bytes);
    let lines: Vec<&str> = text.lines().collect();
    let delimiter = lines
        .iter()
        .position(|line| *line == DELIMITER)
        .ok_or_else(|| {
            Error::ServerProblem(
                "malformed download response: missing delimiter line"
                    .to_owned(),
            )
        })?;

    let body = lines[delimiter + 1..].join("\n");

    let mut attributes = Attributes::new();
    let mut attachments = Vec::new();
    for line in &lines[..delimiter] {
        // Only the first ": " separates name from value; the value itself
        // may contain colons (dates do).
        let (name, value) = match line.find(": ") {
            Some(at) => (&line[..at], &line[at + 2..]),
            None => (*line, ""),
        };
        if name == "Attachment" {
            // An empty value means no attachments at all, not one
            // attachment with an empty name (which would decode to the
            // bare base URL).
            if value.is_empty() {
                attachments = Vec::new();
            } else {
                attachments = value
                    .split(',')
                    .map(|filename| format!("{}{}", base_url, filename))
                    .collect();
            }
        } else {
            // Last occurrence wins; the server should not emit duplicates.
            attributes.set(name, value);
        }
    }

    Ok(Download {
        body,
        attributes,
        attachments,
    })
}
