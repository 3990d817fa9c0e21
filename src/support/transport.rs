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

//! The seam between the protocol layer and actual HTTP.
//!
//! Everything above this module speaks in terms of [`Transport`]; the
//! production implementation is [`HttpTransport`] over the blocking
//! `reqwest` client. Redirects are never followed — the `Location` header
//! of a 302 carries the assigned message id and must reach the response
//! validator intact.

use std::time::Duration;

use log::debug;
use url::Url;

use super::error::Result;

/// What the protocol layer needs back from one HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// The `Location` response header, if any.
    pub location: Option<String>,
    pub body: Vec<u8>,
}

/// A plain (non-file) multipart form field. The value bytes are already in
/// the server's transport charset.
#[derive(Debug, Clone)]
pub struct FormField {
    pub name: String,
    pub value: Vec<u8>,
}

/// A multipart file part. The message body itself travels as one of these
/// (field `Text`, empty filename) because the server only parses
/// attribute-bearing submissions in multipart encoding.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub name: String,
    pub filename: String,
    pub data: Vec<u8>,
}

/// Blocking HTTP as this library needs it: a GET with optional extra
/// headers and a multipart POST, both with an optional per-call timeout
/// passed straight through.
pub trait Transport {
    fn get(
        &self,
        url: &Url,
        headers: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<RawResponse>;

    fn post_multipart(
        &self,
        url: &Url,
        fields: Vec<FormField>,
        files: Vec<FilePart>,
        timeout: Option<Duration>,
    ) -> Result<RawResponse>;
}

/// Production transport over `reqwest::blocking`.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        // Certificate verification is off to match the reference client;
        // ELOG instances habitually run on self-signed certificates.
        let client = reqwest::blocking::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(HttpTransport { client })
    }

    fn finish(resp: reqwest::blocking::Response) -> Result<RawResponse> {
        let status = resp.status().as_u16();
        let location = resp
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = resp.bytes()?.to_vec();
        debug!("<- status {}, {} body bytes", status, body.len());
        Ok(RawResponse {
            status,
            location,
            body,
        })
    }
}

impl Transport for HttpTransport {
    fn get(
        &self,
        url: &Url,
        headers: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<RawResponse> {
        debug!("-> GET {}", url);
        let mut request = self.client.get(url.as_str());
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        Self::finish(request.send()?)
    }

    fn post_multipart(
        &self,
        url: &Url,
        fields: Vec<FormField>,
        files: Vec<FilePart>,
        timeout: Option<Duration>,
    ) -> Result<RawResponse> {
        debug!(
            "-> POST {} ({} fields, {} file parts)",
            url,
            fields.len(),
            files.len()
        );
        // reqwest generates a fresh random boundary per request, which is
        // what keeps arbitrary attachment content safe to embed.
        let mut form = reqwest::blocking::multipart::Form::new();
        for field in fields {
            form = form.part(
                field.name,
                reqwest::blocking::multipart::Part::bytes(field.value),
            );
        }
        for file in files {
            form = form.part(
                file.name,
                reqwest::blocking::multipart::Part::bytes(file.data)
                    .file_name(file.filename),
            );
        }
        let mut request = self.client.post(url.as_str()).multipart(form);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        Self::finish(request.send()?)
    }
}
