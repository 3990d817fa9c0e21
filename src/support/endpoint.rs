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

use url::Url;

use super::error::{Error, Result};

/// The resolved connection target of one logbook.
///
/// Built once when the session is created, from either a full URL or
/// explicit parts. Invariants maintained here so nothing downstream has to
/// re-check them:
///
/// - the logbook path begins and ends with exactly one `/` and contains no
///   doubled separators;
/// - default ports (80 for http, 443 for https) are omitted;
/// - a scheme given in the URL string overrides the `use_ssl` flag, while a
///   bare hostname gets the scheme `use_ssl` implies.
#[derive(Debug, Clone)]
pub struct LogbookEndpoint {
    base: Url,
    logbook: String,
}

impl LogbookEndpoint {
    /// Resolves an endpoint from a hostname (or full URL) plus the explicit
    /// parameters.
    ///
    /// If `hostname` carries a path, that path wins over `subdir`: with a
    /// non-empty `logbook` the path is treated as the subdirectory and the
    /// logbook name is appended, otherwise the last path segment becomes the
    /// logbook name.
    pub fn resolve(
        hostname: &str,
        logbook: &str,
        port: Option<u16>,
        subdir: &str,
        use_ssl: bool,
    ) -> Result<Self> {
        let hostname = hostname.trim();

        // An explicit scheme in the URL overrides use_ssl.
        let (use_ssl, with_scheme) = if hostname.starts_with("http://") {
            (false, hostname.to_owned())
        } else if hostname.starts_with("https://") {
            (true, hostname.to_owned())
        } else {
            let scheme = if use_ssl { "https" } else { "http" };
            (use_ssl, format!("{}://{}", scheme, hostname))
        };

        let parsed = Url::parse(&with_scheme).map_err(|e| {
            Error::ServerProblem(format!(
                "invalid logbook URL {:?}: {}",
                hostname, e
            ))
        })?;
        let host = parsed.host_str().ok_or_else(|| {
            Error::ServerProblem(format!(
                "no host in logbook URL {:?}",
                hostname
            ))
        })?;

        // The url crate already drops the port when it is the scheme
        // default; an explicitly non-default port in the URL wins over the
        // port argument.
        let port = parsed.port().or_else(|| match port {
            Some(80) if !use_ssl => None,
            Some(443) if use_ssl => None,
            other => other,
        });

        let url_segments: Vec<&str> = parsed
            .path()
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        let mut segments: Vec<String>;
        let logbook_name: String;
        if !url_segments.is_empty() {
            segments =
                url_segments.iter().map(|s| (*s).to_owned()).collect();
            if logbook.is_empty() {
                logbook_name = segments.last().cloned().unwrap_or_default();
            } else {
                logbook_name = logbook.to_owned();
                segments.push(logbook_name.clone());
            }
        } else {
            segments = subdir
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect();
            if !logbook.is_empty() {
                segments.push(logbook.to_owned());
            }
            logbook_name = logbook.to_owned();
        }

        let mut path = String::from("/");
        for segment in &segments {
            path.push_str(segment);
            path.push('/');
        }

        let scheme = if use_ssl { "https" } else { "http" };
        let base = match port {
            Some(p) => format!("{}://{}:{}{}", scheme, host, p, path),
            None => format!("{}://{}{}", scheme, host, path),
        };
        let base = Url::parse(&base).map_err(|e| {
            Error::ServerProblem(format!(
                "invalid logbook URL {:?}: {}",
                hostname, e
            ))
        })?;

        Ok(LogbookEndpoint {
            base,
            logbook: logbook_name,
        })
    }

    /// The logbook base URL, `scheme://host[:port]/subdir/logbook/`.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn base_str(&self) -> &str {
        self.base.as_str()
    }

    /// The logbook name as sent in the `exp` form field.
    pub fn logbook_name(&self) -> &str {
        &self.logbook
    }

    /// `<base><id>`, used for the existence probe.
    pub fn message_url(&self, id: u32) -> Url {
        self.join(&id.to_string())
    }

    /// `<base><id>?cmd=download`.
    pub fn download_url(&self, id: u32) -> Url {
        let mut url = self.message_url(id);
        url.query_pairs_mut().append_pair("cmd", "download");
        url
    }

    /// `<base><id>?cmd=Delete&confirm=Yes`.
    pub fn delete_url(&self, id: u32) -> Url {
        let mut url = self.message_url(id);
        url.query_pairs_mut()
            .append_pair("cmd", "Delete")
            .append_pair("confirm", "Yes");
        url
    }

    /// `<base>page`, the unfiltered listing.
    pub fn listing_url(&self) -> Url {
        self.join("page")
    }

    /// The base URL carrying arbitrary query parameters (search).
    pub fn query_url(&self, params: &[(String, String)]) -> Url {
        let mut url = self.base.clone();
        for (name, value) in params {
            url.query_pairs_mut().append_pair(name, value);
        }
        url
    }

    fn join(&self, suffix: &str) -> Url {
        // The base always ends with '/' and the suffixes are plain path
        // segments, so this cannot fail.
        self.base
            .join(suffix)
            .expect("join onto normalized base URL")
    }
}
