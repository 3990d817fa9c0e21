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

//! An in-memory stand-in for an ELOG server, wired in below the
//! [`Transport`] seam.
//!
//! It reproduces the protocol surface the client depends on — multipart
//! `Submit`/`Update` handling including `attachmentN`/`delattN`, the
//! plaintext download dump, listing pages, `errormsg` pages for missing
//! messages, `fail` redirects and login pages for bad credentials — while
//! keeping all state inspectable for assertions.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use encoding_rs::mem::decode_latin1;
use url::Url;

use crate::protocol::attribute;
use crate::protocol::download::DELIMITER;
use crate::support::error::{Error, Result};
use crate::support::transport::{
    FilePart, FormField, RawResponse, Transport,
};
use super::Config;

pub const BASE: &str = "https://elog.example.org/demo/";

#[derive(Debug, Default, Clone)]
pub struct Stored {
    pub body: String,
    pub attributes: Vec<(String, String)>,
    /// (stored filename with timestamp prefix, content)
    pub attachments: Vec<(String, Vec<u8>)>,
    pub parent: Option<u32>,
    pub children: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct RecordedPost {
    pub fields: Vec<(String, String)>,
    /// (field name, filename, content)
    pub files: Vec<(String, String, Vec<u8>)>,
}

#[derive(Default)]
struct State {
    messages: BTreeMap<u32, Stored>,
    next_id: u32,
    next_file: u32,
    require_auth: Option<(String, String)>,
    delete_unsupported: bool,
    posts: Vec<RecordedPost>,
    queries: Vec<Url>,
}

#[derive(Clone)]
pub struct MockServer {
    state: Rc<RefCell<State>>,
    base: Url,
}

impl MockServer {
    pub fn new() -> Self {
        MockServer {
            state: Rc::new(RefCell::new(State {
                next_id: 1,
                next_file: 1,
                ..State::default()
            })),
            base: Url::parse(BASE).unwrap(),
        }
    }

    /// A client configuration pointing at this server.
    pub fn config() -> Config {
        Config {
            hostname: BASE.to_owned(),
            ..Config::default()
        }
    }

    /// Requires `unm`/`upwd` (the latter already prepared) on every
    /// request from now on.
    pub fn require_auth(&self, user: &str, prepared_password: &str) {
        self.state.borrow_mut().require_auth =
            Some((user.to_owned(), prepared_password.to_owned()));
    }

    /// Makes delete answer 200 like a server whose language
    /// configuration lacks the English commands.
    pub fn set_delete_unsupported(&self) {
        self.state.borrow_mut().delete_unsupported = true;
    }

    pub fn message_count(&self) -> usize {
        self.state.borrow().messages.len()
    }

    pub fn stored(&self, id: u32) -> Option<Stored> {
        self.state.borrow().messages.get(&id).cloned()
    }

    pub fn attachment_names(&self, id: u32) -> Vec<String> {
        self.stored(id)
            .map(|stored| {
                stored
                    .attachments
                    .iter()
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn attachment_content(
        &self,
        id: u32,
        stored_name: &str,
    ) -> Option<Vec<u8>> {
        self.stored(id).and_then(|stored| {
            stored
                .attachments
                .into_iter()
                .find(|(name, _)| name == stored_name)
                .map(|(_, data)| data)
        })
    }

    pub fn last_post(&self) -> Option<RecordedPost> {
        self.state.borrow().posts.last().cloned()
    }

    pub fn posts(&self) -> Vec<RecordedPost> {
        self.state.borrow().posts.clone()
    }

    pub fn last_query(&self) -> Option<Url> {
        self.state.borrow().queries.last().cloned()
    }

    fn redirect(&self, location: String) -> RawResponse {
        RawResponse {
            status: 302,
            location: Some(location),
            body: Vec::new(),
        }
    }

    fn page(&self, html: &str) -> RawResponse {
        RawResponse {
            status: 200,
            location: None,
            body: html.as_bytes().to_vec(),
        }
    }

    fn missing_message_page(&self) -> RawResponse {
        self.page(
            r#"<table><tr><td class="errormsg">This entry has been deleted</td></tr></table>"#,
        )
    }

    fn login_page(&self) -> RawResponse {
        self.page(
            r#"<form name=form1><input type=password name=upwd></form>"#,
        )
    }

    fn fail_redirect(&self) -> RawResponse {
        self.redirect(format!("{}?cmd=Login&fail=1", self.base))
    }

    fn cookie_ok(&self, headers: &[(String, String)]) -> bool {
        let state = self.state.borrow();
        let (user, password) = match &state.require_auth {
            Some(auth) => auth,
            None => return true,
        };
        let cookie = headers
            .iter()
            .find(|(name, _)| name == "Cookie")
            .map(|(_, value)| value.as_str())
            .unwrap_or("");
        cookie.contains(&format!("unm={};", user))
            && cookie.contains(&format!("upwd={};", password))
    }

    /// The server renames uploads with a timestamp prefix; the counter
    /// keeps names unique within one test.
    fn store_name(state: &mut State, filename: &str) -> String {
        let n = state.next_file;
        state.next_file += 1;
        format!("260807_{:06}_{}", n, filename)
    }

    fn render_download(&self, id: u32) -> Option<String> {
        let state = self.state.borrow();
        let stored = state.messages.get(&id)?;
        let mut out = String::new();
        out.push_str(&format!("$@MID@$: {}\n", id));
        for (name, value) in &stored.attributes {
            out.push_str(&format!("{}: {}\n", name, value));
        }
        if let Some(parent) = stored.parent {
            out.push_str(&format!("In reply to: {}\n", parent));
        }
        if !stored.children.is_empty() {
            let children: Vec<String> = stored
                .children
                .iter()
                .map(|child| child.to_string())
                .collect();
            out.push_str(&format!(
                "Reply to: {}\n",
                children.join(", ")
            ));
        }
        let names: Vec<&str> = stored
            .attachments
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        out.push_str(&format!("Attachment: {}\n", names.join(",")));
        out.push_str(DELIMITER);
        out.push('\n');
        out.push_str(&stored.body);
        Some(out)
    }

    fn render_listing(&self, ids: &[u32]) -> RawResponse {
        let mut html = String::from("<table>");
        for (i, id) in ids.iter().enumerate() {
            let class = if i % 2 == 0 { "list1" } else { "list2" };
            html.push_str(&format!(
                r#"<tr><td class="{0}"><a href="{1}{2}">{2}</a></td><td class="{0}"><a href="{1}{2}">entry</a></td></tr>"#,
                class, self.base, id
            ));
        }
        html.push_str("</table>");
        self.page(&html)
    }

    fn listing_ids(&self, query: &[(String, String)]) -> Vec<u32> {
        let state = self.state.borrow();
        let npp = query
            .iter()
            .find(|(name, _)| name == "npp")
            .and_then(|(_, value)| value.parse::<usize>().ok())
            .unwrap_or(20);
        let filters: Vec<&(String, String)> = query
            .iter()
            .filter(|(name, _)| {
                !matches!(
                    name.as_str(),
                    "mode" | "reverse" | "npp" | "cmd"
                )
            })
            .collect();
        state
            .messages
            .iter()
            .rev()
            .filter(|(_, stored)| {
                filters.iter().all(|(name, value)| {
                    if name == "subtext" {
                        stored.body.contains(value.as_str())
                    } else {
                        stored.attributes.iter().any(|(n, v)| {
                            n == name && v.contains(value.as_str())
                        })
                    }
                })
            })
            .map(|(id, _)| *id)
            .take(npp)
            .collect()
    }

    fn delete_subtree(state: &mut State, id: u32) {
        if let Some(stored) = state.messages.remove(&id) {
            for child in stored.children {
                Self::delete_subtree(state, child);
            }
            if let Some(parent) = stored.parent {
                if let Some(parent) = state.messages.get_mut(&parent) {
                    parent.children.retain(|&child| child != id);
                }
            }
        }
    }

    /// Resolves the attachment set after an edit: `attachmentN` keeps,
    /// `delattN` removals, then fresh uploads.
    fn merge_attachments(
        state: &mut State,
        previous: &[(String, Vec<u8>)],
        fields: &[(String, String)],
        uploads: Vec<(String, Vec<u8>)>,
    ) -> Vec<(String, Vec<u8>)> {
        let mut slots: Vec<(usize, &str)> = fields
            .iter()
            .filter_map(|(name, value)| {
                name.strip_prefix("attachment")
                    .and_then(|n| n.parse::<usize>().ok())
                    .map(|n| (n, value.as_str()))
            })
            .collect();
        slots.sort();
        let mut kept: Vec<(String, Vec<u8>)> = slots
            .into_iter()
            .filter_map(|(_, stored_name)| {
                previous
                    .iter()
                    .find(|(name, _)| name == stored_name)
                    .cloned()
            })
            .collect();

        let mut deletions: Vec<usize> = fields
            .iter()
            .filter_map(|(name, _)| {
                name.strip_prefix("delatt")
                    .and_then(|n| n.parse::<usize>().ok())
            })
            .collect();
        deletions.sort();
        for slot in deletions.into_iter().rev() {
            if slot < kept.len() {
                kept.remove(slot);
            }
        }

        for (filename, data) in uploads {
            let stored_name = Self::store_name(state, &filename);
            kept.push((stored_name, data));
        }
        kept
    }
}

fn is_control_field(name: &str) -> bool {
    matches!(
        name,
        "cmd" | "exp"
            | "unm"
            | "upwd"
            | "edit_id"
            | "skiplock"
            | "reply_to"
            | "suppress"
            | "In_reply_to"
            | "Reply_to"
    ) || name
        .strip_prefix("attachment")
        .map_or(false, |n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        || name
            .strip_prefix("delatt")
            .map_or(false, |n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

impl Transport for MockServer {
    fn get(
        &self,
        url: &Url,
        headers: &[(String, String)],
        _timeout: Option<Duration>,
    ) -> Result<RawResponse> {
        if !self.cookie_ok(headers) {
            return Ok(self.login_page());
        }

        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();
        let cmd = query
            .iter()
            .find(|(name, _)| name == "cmd")
            .map(|(_, value)| value.as_str())
            .unwrap_or("");
        let segment = url
            .path()
            .strip_prefix(self.base.path())
            .unwrap_or("")
            .to_owned();

        if segment.is_empty() || segment == "page" {
            self.state.borrow_mut().queries.push(url.clone());
            let ids = self.listing_ids(&query);
            return Ok(self.render_listing(&ids));
        }

        if let Ok(id) = segment.parse::<u32>() {
            return Ok(match cmd {
                "download" => match self.render_download(id) {
                    Some(dump) => RawResponse {
                        status: 200,
                        location: None,
                        body: attribute::encode_value(&dump),
                    },
                    None => self.missing_message_page(),
                },
                "Delete" => {
                    if self.state.borrow().delete_unsupported {
                        self.page("<html>entry page</html>")
                    } else if self
                        .state
                        .borrow()
                        .messages
                        .contains_key(&id)
                    {
                        Self::delete_subtree(
                            &mut self.state.borrow_mut(),
                            id,
                        );
                        self.redirect(self.base.to_string())
                    } else {
                        self.missing_message_page()
                    }
                },
                _ => {
                    if self.state.borrow().messages.contains_key(&id) {
                        self.page("<html>entry page</html>")
                    } else {
                        self.missing_message_page()
                    }
                },
            });
        }

        // Attachment download by stored filename.
        let state = self.state.borrow();
        for stored in state.messages.values() {
            if let Some((_, data)) = stored
                .attachments
                .iter()
                .find(|(name, _)| *name == segment)
            {
                return Ok(RawResponse {
                    status: 200,
                    location: None,
                    body: data.clone(),
                });
            }
        }
        Err(Error::ServerProblem(format!(
            "mock server has no route for {}",
            url
        )))
    }

    fn post_multipart(
        &self,
        _url: &Url,
        fields: Vec<FormField>,
        files: Vec<FilePart>,
        _timeout: Option<Duration>,
    ) -> Result<RawResponse> {
        let fields: Vec<(String, String)> = fields
            .into_iter()
            .map(|field| {
                (field.name, decode_latin1(&field.value).into_owned())
            })
            .collect();
        let files: Vec<(String, String, Vec<u8>)> = files
            .into_iter()
            .map(|file| (file.name, file.filename, file.data))
            .collect();

        self.state.borrow_mut().posts.push(RecordedPost {
            fields: fields.clone(),
            files: files.clone(),
        });

        let get = |name: &str| {
            fields
                .iter()
                .rev()
                .find(|(n, _)| n == name)
                .map(|(_, value)| value.clone())
        };

        if let Some((user, password)) =
            self.state.borrow().require_auth.clone()
        {
            if get("unm").as_deref() != Some(user.as_str())
                || get("upwd").as_deref() != Some(password.as_str())
            {
                return Ok(self.fail_redirect());
            }
        }

        let body = files
            .iter()
            .find(|(name, _, _)| name == "Text")
            .map(|(_, _, data)| decode_latin1(data).into_owned())
            .unwrap_or_default();
        let uploads: Vec<(String, Vec<u8>)> = files
            .iter()
            .filter(|(name, _, _)| name.starts_with("attfile"))
            .map(|(_, filename, data)| (filename.clone(), data.clone()))
            .collect();
        let mut attributes: Vec<(String, String)> = fields
            .iter()
            .filter(|(name, _)| !is_control_field(name))
            .cloned()
            .collect();
        if !attributes.iter().any(|(name, _)| name == "Date") {
            attributes.insert(
                0,
                (
                    "Date".to_owned(),
                    "Fri, 07 Aug 2026 10:00:00 +0200".to_owned(),
                ),
            );
        }

        let edit_id =
            get("edit_id").and_then(|value| value.parse::<u32>().ok());
        let reply_to =
            get("reply_to").and_then(|value| value.parse::<u32>().ok());

        let mut state = self.state.borrow_mut();
        if let Some(id) = edit_id {
            let previous = match state.messages.get(&id) {
                Some(stored) => stored.attachments.clone(),
                None => return Ok(self.missing_message_page()),
            };
            let merged = Self::merge_attachments(
                &mut state, &previous, &fields, uploads,
            );
            let stored = state.messages.get_mut(&id).unwrap();
            stored.body = body;
            stored.attributes = attributes;
            stored.attachments = merged;
            Ok(self.redirect(format!("{}{}", self.base, id)))
        } else {
            let id = state.next_id;
            state.next_id += 1;
            let attachments: Vec<(String, Vec<u8>)> = uploads
                .into_iter()
                .map(|(filename, data)| {
                    (Self::store_name(&mut state, &filename), data)
                })
                .collect();
            if let Some(parent) = reply_to {
                if let Some(parent) = state.messages.get_mut(&parent) {
                    parent.children.push(id);
                }
            }
            state.messages.insert(
                id,
                Stored {
                    body,
                    attributes,
                    attachments,
                    parent: reply_to,
                    children: Vec::new(),
                },
            );
            Ok(self.redirect(format!("{}{}", self.base, id)))
        }
    }
}

/// A transport whose every request times out, as the production
/// transport reports it.
pub struct TimeoutTransport;

impl Transport for TimeoutTransport {
    fn get(
        &self,
        _url: &Url,
        _headers: &[(String, String)],
        _timeout: Option<Duration>,
    ) -> Result<RawResponse> {
        Err(Error::ServerTimeout)
    }

    fn post_multipart(
        &self,
        _url: &Url,
        _fields: Vec<FormField>,
        _files: Vec<FilePart>,
        _timeout: Option<Duration>,
    ) -> Result<RawResponse> {
        Err(Error::ServerTimeout)
    }
}
