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

//! A client library for PSI ELOG electronic logbook servers.
//!
//! ELOG only speaks the HTML-form protocol meant for browsers, so this
//! crate is mostly a protocol-adaptation layer: it renders typed messages
//! into the exact multipart/form-data submissions the server parses,
//! scrapes its plaintext and HTML responses back into structured data, and
//! reconciles state across edits (attribute merging, attachment
//! de-duplication by content, reply-thread navigation).
//!
//! ```no_run
//! use elog_client::{Logbook, Message};
//!
//! # fn main() -> elog_client::Result<()> {
//! let logbook = Logbook::open("https://elog.example.org/demo")?;
//! let id = logbook.post(
//!     &Message::new("Cooldown started").attribute("Author", "AB"),
//!     None,
//! )?;
//! let entry = logbook.read(id, None)?;
//! assert_eq!("Cooldown started", entry.body);
//! # Ok(())
//! # }
//! ```
//!
//! All calls are synchronous and blocking, one request/response at a time;
//! there are no background tasks and no implicit retries. Failures
//! propagate as [`Error`], with timeouts kept separate so callers can
//! retry exactly those.

#[cfg(test)]
macro_rules! assert_matches {
    ($expected:pat, $actual:expr) => {
        match $actual {
            $expected => (),
            unexpected => panic!(
                "Expected {} matches {}, got {:?}",
                stringify!($expected),
                stringify!($actual),
                unexpected
            ),
        }
    };
}

mod logbook;
mod protocol;
mod support;

pub use crate::logbook::{
    Attachment, Config, Encoding, Entry, Logbook, Message, Search,
};
pub use crate::protocol::attribute::Attributes;
pub use crate::support::error::{Error, Result};
pub use crate::support::transport::{
    FilePart, FormField, HttpTransport, RawResponse, Transport,
};
