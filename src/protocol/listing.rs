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

//! Extraction of message ids from the listing page.
//!
//! The listing is an HTML table whose data rows alternate between cells of
//! class `list1` and `list2`. Every cell of a row links to the same
//! message, so only the first matching cell per row is taken; the id is
//! the final path segment of the anchor's `href`.

use lazy_static::lazy_static;
use log::warn;
use regex::Regex;

lazy_static! {
    static ref LIST_CELL: Regex = Regex::new(
        r#"(?s)<td[^>]*class="list[12]"[^>]*>.*?<a[^>]*href="([^"]+)""#
    )
    .unwrap();
}

/// Returns the message ids in the order the server listed them (newest
/// first when the request asked for `reverse=1`).
pub fn message_ids(html: &str) -> Vec<u32> {
    let mut ids = Vec::new();
    for row in html.split("<tr") {
        let href = match LIST_CELL.captures(row) {
            Some(captures) => captures[1].to_owned(),
            None => continue,
        };
        match id_from_href(&href) {
            Some(id) => ids.push(id),
            None => {
                warn!("listing anchor with no trailing id: {:?}", href)
            },
        }
    }
    ids
}

fn id_from_href(href: &str) -> Option<u32> {
    let path = href
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or(href);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
}
