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

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while talking to an ELOG server.
///
/// The library never retries or recovers on its own; every failure
/// propagates to the caller as one of these variants. `ServerTimeout` is
/// deliberately separate from `ServerProblem` so that callers can retry on
/// the former without also retrying on conditions that will never improve
/// (connection refused, relocated server, unsupported configuration).
#[derive(Error, Debug)]
pub enum Error {
    /// The server refused the configured user name or password, either via
    /// a `fail` redirect or by answering with its login page.
    #[error("Invalid username or password")]
    Authentication,
    /// The server could not be reached, or it responded in a way that no
    /// well-configured ELOG instance should.
    #[error("Logbook server problem: {0}")]
    ServerProblem(String),
    /// The per-call timeout elapsed before the server answered.
    #[error("Request to the logbook server timed out")]
    ServerTimeout,
    /// The server's own validation rejected the submission, or the message
    /// could not even be composed. Carries the scraped server-side reason
    /// when one was recognizable.
    #[error("Message rejected by the logbook server: {0}")]
    MessageRejected(String),
    /// An attachment input was not usable; `index` is its position in the
    /// caller-supplied list. Raised before any network traffic.
    #[error("Invalid attachment [{index}]: {reason}")]
    InvalidAttachment { index: usize, reason: String },
    /// No message with this ID exists on the logbook, or the server claimed
    /// success but returned an ID outside the valid positive range.
    #[error("No message with ID {0} on the logbook server")]
    InvalidMessageId(u32),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::ServerTimeout
        } else {
            Error::ServerProblem(e.to_string())
        }
    }
}
