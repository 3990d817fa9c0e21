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

//! The logbook session: owns the endpoint, the prepared credentials, and
//! the transport, and sequences every multi-request operation (edit
//! merges, attachment diffing, thread walks) the protocol demands.

use std::str::FromStr;
use std::time::Duration;

use log::debug;
use url::Url;

use crate::protocol::{attribute, download, listing, response};
use crate::protocol::attribute::Attributes;
use crate::support::credentials;
use crate::support::endpoint::LogbookEndpoint;
use crate::support::error::{Error, Result};
use crate::support::transport::{
    FilePart, FormField, HttpTransport, RawResponse, Transport,
};

pub mod attachment;
mod thread;

#[cfg(test)]
mod testutil;


pub use self::attachment::Attachment;

/// The message body encoding modes the server understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Plain,
    Html,
    ElCode,
}

impl Encoding {
    /// The exact spelling the server expects in the `Encoding` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Plain => "plain",
            Encoding::Html => "HTML",
            Encoding::ElCode => "ELCode",
        }
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plain" => Ok(Encoding::Plain),
            "HTML" => Ok(Encoding::Html),
            "ELCode" => Ok(Encoding::ElCode),
            _ => Err(Error::MessageRejected(format!(
                "invalid message encoding {:?}; valid options: \
                 plain, HTML, ELCode",
                s
            ))),
        }
    }
}

/// A message to be posted: body text plus everything that travels with it.
#[derive(Debug, Clone, Default)]
pub struct Message {
    pub body: String,
    pub encoding: Option<Encoding>,
    pub attributes: Attributes,
    pub attachments: Vec<Attachment>,
    /// Sets `suppress=1` so the server sends no notification mails.
    pub suppress_notification: bool,
}

impl Message {
    pub fn new(body: impl Into<String>) -> Self {
        Message {
            body: body.into(),
            ..Message::default()
        }
    }

    pub fn attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.attributes.set(name, value);
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn suppress_notification(mut self) -> Self {
        self.suppress_notification = true;
        self
    }
}

/// One message as read back from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub body: String,
    pub attributes: Attributes,
    /// Full URLs of the stored attachments, on this session's endpoint.
    pub attachments: Vec<String>,
}

/// How to reach and authenticate against one logbook.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server hostname, or a full URL from which logbook, port, subdir and
    /// scheme are taken.
    pub hostname: String,
    pub logbook: String,
    pub port: Option<u16>,
    pub subdir: String,
    pub use_ssl: bool,
    pub user: Option<String>,
    pub password: Option<String>,
    /// When set (the default), `password` is hashed client-side the way
    /// the server expects. Turn it off to supply an already-hashed value.
    pub hash_password: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            hostname: String::new(),
            logbook: String::new(),
            port: None,
            subdir: String::new(),
            use_ssl: true,
            user: None,
            password: None,
            hash_password: true,
        }
    }
}

/// A search request: either a term applied to one scope, or a structured
/// attribute filter.
#[derive(Debug, Clone)]
pub struct Search {
    filter: Filter,
    n_results: u32,
    scope: String,
}

#[derive(Debug, Clone)]
enum Filter {
    Term(String),
    Attributes(Attributes),
}

impl Search {
    /// A free-text search; by default the term applies to the `subtext`
    /// scope (message bodies).
    pub fn term(term: impl Into<String>) -> Self {
        Search {
            filter: Filter::Term(term.into()),
            n_results: 20,
            scope: "subtext".to_owned(),
        }
    }

    /// A structured filter of attribute name/value pairs.
    pub fn attributes(attributes: Attributes) -> Self {
        Search {
            filter: Filter::Attributes(attributes),
            n_results: 20,
            scope: "subtext".to_owned(),
        }
    }

    pub fn n_results(mut self, n_results: u32) -> Self {
        self.n_results = n_results;
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }
}

#[derive(Clone, Copy)]
enum Target {
    New,
    Reply(u32),
    Edit(u32),
}

/// A session against one logbook on one server.
///
/// All calls are synchronous and blocking; operations that need several
/// requests (edits, probes, thread walks) run them sequentially on this
/// session. The server's edit lock is always bypassed (`skiplock`), so
/// nothing here coordinates with other clients.
pub struct Logbook {
    endpoint: LogbookEndpoint,
    user: Option<String>,
    password: Option<String>,
    transport: Box<dyn Transport>,
}

impl Logbook {
    /// Opens a logbook from a single URL,
    /// `scheme://host[:port]/[subdir/]logbook`.
    pub fn open(url: &str) -> Result<Self> {
        Self::connect(Config {
            hostname: url.to_owned(),
            ..Config::default()
        })
    }

    /// Opens a logbook from explicit configuration.
    pub fn connect(config: Config) -> Result<Self> {
        let transport = Box::new(HttpTransport::new()?);
        Self::with_transport(config, transport)
    }

    /// Opens a logbook over a caller-supplied transport. This is the seam
    /// the tests drive an in-memory server through; production callers
    /// normally want [`Logbook::connect`].
    pub fn with_transport(
        config: Config,
        transport: Box<dyn Transport>,
    ) -> Result<Self> {
        let endpoint = LogbookEndpoint::resolve(
            &config.hostname,
            &config.logbook,
            config.port,
            &config.subdir,
            config.use_ssl,
        )?;
        let hash_password = config.hash_password;
        let password = config.password.map(|password| {
            credentials::prepare_password(&password, hash_password)
        });
        Ok(Logbook {
            endpoint,
            user: config.user,
            password,
            transport,
        })
    }

    /// The normalized base URL of this logbook.
    pub fn base_url(&self) -> &str {
        self.endpoint.base_str()
    }

    /// Posts a new message and returns its server-assigned id.
    pub fn post(
        &self,
        message: &Message,
        timeout: Option<Duration>,
    ) -> Result<u32> {
        self.submit(Target::New, message, timeout)
    }

    /// Posts a reply to message `id`. The target must exist; replying to
    /// a missing message is a hard failure, never a silent new post.
    pub fn reply(
        &self,
        id: u32,
        message: &Message,
        timeout: Option<Duration>,
    ) -> Result<u32> {
        self.submit(Target::Reply(id), message, timeout)
    }

    /// Edits message `id`: the stored message is read first, the given
    /// attributes are merged over the stored ones (caller wins), and
    /// attachments are diffed against the stored set so re-posting
    /// identical content uploads nothing.
    pub fn edit(
        &self,
        id: u32,
        message: &Message,
        timeout: Option<Duration>,
    ) -> Result<u32> {
        self.submit(Target::Edit(id), message, timeout)
    }

    /// Reads message `id` back as body, attributes and attachment URLs.
    pub fn read(
        &self,
        id: u32,
        timeout: Option<Duration>,
    ) -> Result<Entry> {
        self.probe(id, timeout)?;
        let raw = self.transport.get(
            &self.endpoint.download_url(id),
            &self.cookie_headers(),
            timeout,
        )?;
        let validated = response::validate(raw)?;
        let download =
            download::parse(&validated.body, self.endpoint.base_str())?;
        Ok(Entry {
            body: download.body,
            attributes: download.attributes,
            attachments: download.attachments,
        })
    }

    /// Deletes message `id` together with its whole reply subtree and
    /// attachments (server semantics).
    pub fn delete(
        &self,
        id: u32,
        timeout: Option<Duration>,
    ) -> Result<()> {
        self.probe(id, timeout)?;
        let raw = self.transport.get(
            &self.endpoint.delete_url(id),
            &self.cookie_headers(),
            timeout,
        )?;
        let status = raw.status;
        response::validate(raw)?;
        // A delete that worked redirects. A 200 means the command was not
        // executed at all: the server's language configuration does not
        // know the English command vocabulary this client speaks.
        if status == 200 {
            return Err(Error::ServerProblem(
                "cannot process delete command \
                 (only logbooks in English supported)"
                    .to_owned(),
            ));
        }
        Ok(())
    }

    /// Searches the logbook, returning matching message ids newest first.
    pub fn search(
        &self,
        search: &Search,
        timeout: Option<Duration>,
    ) -> Result<Vec<u32>> {
        // npp=0 crashes the server, also from its own web UI.
        let n_results = search.n_results.max(1);
        let mut params: Vec<(String, String)> = vec![
            ("mode".to_owned(), "full".to_owned()),
            ("reverse".to_owned(), "1".to_owned()),
            ("npp".to_owned(), n_results.to_string()),
        ];
        match &search.filter {
            Filter::Term(term) => {
                params.push((search.scope.clone(), term.clone()))
            },
            Filter::Attributes(attributes) => {
                for (name, value) in attributes.iter() {
                    params.push((name.to_owned(), value.to_owned()));
                }
            },
        }
        // The server redirects requests carrying empty-valued parameters
        // and drops them on the way, with surprising results; strip them
        // here instead.
        params.retain(|(_, value)| !value.is_empty());

        let raw = self.transport.get(
            &self.endpoint.query_url(&params),
            &self.cookie_headers(),
            timeout,
        )?;
        let validated = response::validate(raw)?;
        Ok(listing::message_ids(&String::from_utf8_lossy(
            &validated.body,
        )))
    }

    /// All message ids in the logbook, newest first.
    pub fn message_ids(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Vec<u32>> {
        let raw = self.transport.get(
            &self.endpoint.listing_url(),
            &self.cookie_headers(),
            timeout,
        )?;
        let validated = response::validate(raw)?;
        Ok(listing::message_ids(&String::from_utf8_lossy(
            &validated.body,
        )))
    }

    /// The id of the most recent message, or `None` in an empty logbook.
    pub fn last_message_id(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Option<u32>> {
        Ok(self.message_ids(timeout)?.first().copied())
    }

    /// One submission, whatever its target. This is the state machine the
    /// whole posting protocol hangs off.
    fn submit(
        &self,
        target: Target,
        message: &Message,
        timeout: Option<Duration>,
    ) -> Result<u32> {
        let mut attributes = message.attributes.clone();
        if let Some(encoding) = message.encoding {
            attributes.set("Encoding", encoding.as_str());
        }
        if message.suppress_notification {
            attributes.set("suppress", "1");
        }

        let mut existing_attachments: Vec<String> = Vec::new();
        match target {
            Target::New => {
                // Stamp the creation time unless the caller chose one.
                if !attributes.contains("When") {
                    attributes.set(
                        "When",
                        chrono::Utc::now().timestamp().to_string(),
                    );
                }
            },
            Target::Reply(id) => {
                self.probe(id, timeout)?;
                attributes.set("reply_to", id.to_string());
            },
            Target::Edit(id) => {
                let current = self.read(id, timeout)?;
                let mut merged = current.attributes.clone();
                merged.merge_from(&attributes);
                attributes = merged;
                // Existing attachments are retained by naming them in
                // plain attachmentN attributes.
                renumber_attachments(
                    &mut attributes,
                    &current.attachments,
                );
                attributes.set("edit_id", id.to_string());
                attributes.set("skiplock", "1");
                existing_attachments = current.attachments;
            },
        }

        let mut parts = attachment::resolve(
            &message.attachments,
            self.endpoint.base_str(),
        )?;

        if let Target::Edit(..) = target {
            parts = self.diff_attachments(
                parts,
                existing_attachments,
                &message.body,
                &mut attributes,
                timeout,
            )?;
        }

        let raw = self.post_form(
            "Submit",
            &attributes,
            parts,
            &message.body,
            timeout,
        )?;
        let validated = response::validate(raw)?;
        match validated.message_id {
            Some(id) if id >= 1 => Ok(id),
            other => Err(Error::InvalidMessageId(other.unwrap_or(0))),
        }
    }

    /// Compares freshly supplied parts against the attachments already
    /// stored for `id`. Identical content under an identical name is
    /// dropped; changed content evicts the stale server copy first.
    fn diff_attachments(
        &self,
        parts: Vec<attachment::UploadPart>,
        mut existing: Vec<String>,
        body: &str,
        attributes: &mut Attributes,
        timeout: Option<Duration>,
    ) -> Result<Vec<attachment::UploadPart>> {
        let mut kept = Vec::new();
        for part in parts {
            let slot = existing.iter().position(|url| {
                attachment::stored_display_name(url) == part.filename
            });
            let slot = match slot {
                Some(slot) => slot,
                None => {
                    kept.push(part);
                    continue;
                },
            };

            let stored = self.fetch_attachment(&existing[slot], timeout)?;
            if stored == part.data {
                debug!(
                    "attachment {:?} unchanged, skipping upload",
                    part.filename
                );
                continue;
            }

            debug!(
                "attachment {:?} changed, deleting stale copy {}",
                part.filename, existing[slot]
            );
            self.delete_attachment(slot, attributes, body, timeout)?;
            existing.remove(slot);
            renumber_attachments(attributes, &existing);
            kept.push(part);
        }
        Ok(kept)
    }

    /// Issues the `Update` sub-request that removes the stored attachment
    /// in `slot`, leaving body and attributes otherwise unchanged.
    fn delete_attachment(
        &self,
        slot: usize,
        attributes: &Attributes,
        body: &str,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let mut attributes = attributes.clone();
        attributes.set(format!("delatt{}", slot), "Delete");
        let raw = self.post_form(
            "Update",
            &attributes,
            Vec::new(),
            body,
            timeout,
        )?;
        response::validate(raw)?;
        Ok(())
    }

    /// Downloads a stored attachment for content comparison.
    fn fetch_attachment(
        &self,
        url: &str,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>> {
        let url = Url::parse(url).map_err(|e| {
            Error::ServerProblem(format!(
                "invalid attachment URL {:?}: {}",
                url, e
            ))
        })?;
        let raw =
            self.transport.get(&url, &self.cookie_headers(), timeout)?;
        if raw.status != 200 {
            return Err(Error::ServerProblem(format!(
                "attachment download answered with status {}",
                raw.status
            )));
        }
        Ok(raw.body)
    }

    /// Composes and sends one multipart submission. The body always
    /// travels as a file part named `Text` with an empty filename — the
    /// server only parses attribute-bearing submissions in multipart
    /// form encoding, and a field-only POST is rejected when no
    /// attachment parts are present.
    fn post_form(
        &self,
        command: &str,
        attributes: &Attributes,
        parts: Vec<attachment::UploadPart>,
        body: &str,
        timeout: Option<Duration>,
    ) -> Result<RawResponse> {
        let mut fields = attribute::encode(attributes);
        fields.push(FormField {
            name: "cmd".to_owned(),
            value: command.as_bytes().to_vec(),
        });
        fields.push(FormField {
            name: "exp".to_owned(),
            value: attribute::encode_value(self.endpoint.logbook_name()),
        });
        if let Some(user) = &self.user {
            fields.push(FormField {
                name: "unm".to_owned(),
                value: user.as_bytes().to_vec(),
            });
        }
        if let Some(password) = &self.password {
            fields.push(FormField {
                name: "upwd".to_owned(),
                value: password.as_bytes().to_vec(),
            });
        }

        let mut files: Vec<FilePart> = parts
            .into_iter()
            .map(|part| FilePart {
                name: part.field,
                filename: part.filename,
                data: part.data,
            })
            .collect();
        files.push(FilePart {
            name: "Text".to_owned(),
            filename: String::new(),
            data: attribute::encode_value(body),
        });

        self.transport.post_multipart(
            self.endpoint.base_url(),
            fields,
            files,
            timeout,
        )
    }

    /// Checks that message `id` exists. The server answers a request for
    /// a missing message with status 200 and an error cell in the page,
    /// so this cannot be folded into plain response validation.
    fn probe(&self, id: u32, timeout: Option<Duration>) -> Result<()> {
        let raw = self.transport.get(
            &self.endpoint.message_url(id),
            &self.cookie_headers(),
            timeout,
        )?;
        let validated = response::validate(raw)?;
        if response::contains_error_cell(&validated.body) {
            return Err(Error::InvalidMessageId(id));
        }
        Ok(())
    }

    /// Credentials for GET requests travel as a cookie, not form fields.
    fn cookie_headers(&self) -> Vec<(String, String)> {
        let mut cookie = String::new();
        if let Some(user) = &self.user {
            cookie.push_str(&format!("unm={};", user));
        }
        if let Some(password) = &self.password {
            cookie.push_str(&format!("upwd={};", password));
        }
        if cookie.is_empty() {
            Vec::new()
        } else {
            vec![("Cookie".to_owned(), cookie)]
        }
    }
}

/// Rewrites the `attachmentN` attributes to name exactly the URLs in
/// `existing`, contiguously from 0.
fn renumber_attachments(attributes: &mut Attributes, existing: &[String]) {
    let stale: Vec<String> = attributes
        .iter()
        .filter(|(name, _)| is_attachment_slot(name))
        .map(|(name, _)| name.to_owned())
        .collect();
    for name in stale {
        attributes.remove(&name);
    }
    for (slot, url) in existing.iter().enumerate() {
        attributes.set(
            format!("attachment{}", slot),
            attachment::stored_basename(url),
        );
    }
}

fn is_attachment_slot(name: &str) -> bool {
    match name.strip_prefix("attachment") {
        Some(suffix) => {
            !suffix.is_empty()
                && suffix.chars().all(|c| c.is_ascii_digit())
        },
        None => false,
    }
}
