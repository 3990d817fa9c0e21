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

//! Interpretation of raw HTTP responses.
//!
//! The server signals almost everything in-band: rejections arrive as HTML
//! fragments, authentication failures as either a `fail` redirect or a
//! login page served with status 200, and the id of a newly stored message
//! as the last path segment of a 302 `Location`. This module turns all of
//! that into either a [`Validated`] response or a typed error.

use lazy_static::lazy_static;
use log::warn;
use regex::Regex;

use crate::support::error::{Error, Result};
use crate::support::transport::RawResponse;

lazy_static! {
    static ref ERROR_CELL: Regex =
        Regex::new(r#"(?s)<td[^>]*class="errormsg"[^>]*>.*?</td>"#).unwrap();
    static ref TAGS: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
}

/// A response the server accepted.
#[derive(Debug, Clone)]
pub struct Validated {
    pub body: Vec<u8>,
    /// The message id the server redirected to, when there was one.
    /// Deleting the last entry of a logbook legitimately redirects to the
    /// bare logbook page, so `None` here is not an error by itself.
    pub message_id: Option<u32>,
}

/// Validates one exchange. Anything that is not a clean 200/302 with
/// non-suspicious content becomes an error.
pub fn validate(response: RawResponse) -> Result<Validated> {
    if response.status != 200 && response.status != 302 {
        return Err(rejection(&response));
    }

    let mut message_id = None;
    if let Some(location) = &response.location {
        if location.contains("has moved") {
            return Err(Error::ServerProblem(
                "logbook server has moved to another location".to_owned(),
            ));
        }
        if location.contains("fail") {
            return Err(Error::Authentication);
        }
        message_id = id_from_location(location);
        if message_id.is_none() {
            warn!("redirect location carries no message id: {:?}", location);
        }
    }

    // The server answers some credential failures with its login page and
    // status 200; the password prompt is the only reliable marker.
    let text = String::from_utf8_lossy(&response.body);
    if text.contains("form name=form1") || text.contains("type=password") {
        return Err(Error::Authentication);
    }

    Ok(Validated {
        body: response.body,
        message_id,
    })
}

/// True if the body carries the server's error cell. Used by the
/// existence probe, where the server reports a missing message inside an
/// otherwise successful page.
pub fn contains_error_cell(body: &[u8]) -> bool {
    ERROR_CELL.is_match(&String::from_utf8_lossy(body))
}

fn rejection(response: &RawResponse) -> Error {
    let text = String::from_utf8_lossy(&response.body);

    if let Some(found) = ERROR_CELL.find(&text) {
        let scraped = scrape(found.as_str());
        if !scraped.is_empty() {
            return Error::MessageRejected(scraped);
        }
    }

    // Older servers answer with bare text starting "Error: ...".
    let stripped = scrape(&text);
    if stripped.starts_with("Error:") {
        return Error::MessageRejected(stripped);
    }

    Error::MessageRejected("unknown error".to_owned())
}

/// Removes markup and the trailing "go back" instruction meant for
/// browser users.
fn scrape(fragment: &str) -> String {
    let text = TAGS.replace_all(fragment, "");
    let text: &str = match text.find("Please go back") {
        Some(at) => &text[..at],
        None => &text,
    };
    text.trim().to_owned()
}

fn id_from_location(location: &str) -> Option<u32> {
    let path = location
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or(location);
    path.rsplit('/').next().and_then(|segment| segment.parse().ok())
}
