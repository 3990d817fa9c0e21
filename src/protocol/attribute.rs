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

use std::fmt;

use crate::support::transport::FormField;

/// Attribute names the server manages itself. Client-supplied values are
/// stripped before transmission, even when set explicitly — the server
/// would reject or silently drop them, and `Text` would collide with the
/// body part.
pub const RESERVED: &[&str] = &["Text", "Date", "Attachment", "$@MID@$"];

/// An ordered attribute mapping.
///
/// Iteration order is insertion order; setting an existing name replaces
/// the value in place. This mirrors what the server round-trips, so an
/// edit that merges and re-posts attributes does not shuffle them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Attributes::default()
    }

    pub fn set(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder-style `set` for literal construction.
    pub fn with(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overlays `other` onto `self`, `other` winning on name collision.
    pub fn merge_from(&mut self, other: &Attributes) {
        for (name, value) in other.iter() {
            self.set(name, value);
        }
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        Ok(())
    }
}

impl<N: Into<String>, V: Into<String>> std::iter::FromIterator<(N, V)>
    for Attributes
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (name, value) in iter {
            attributes.set(name, value);
        }
        attributes
    }
}

impl IntoIterator for Attributes {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Rewrites an attribute name the way the server itself mangles form field
/// names: every character outside `[0-9A-Za-z]` becomes `_`. The client
/// must apply the same rewrite or a write followed by a read would not
/// round-trip.
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Encodes an attribute value into the server's transport charset.
///
/// ELOG serves and parses its forms as Latin-1; encoding with the
/// windows-1252 encoder reproduces what a browser submits to such a form,
/// including numeric character references for anything unmappable.
pub fn encode_value(value: &str) -> Vec<u8> {
    let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(value);
    bytes.into_owned()
}

/// Maps attributes to outgoing form fields: reserved names stripped,
/// remaining keys sanitized, values converted to the transport charset.
pub fn encode(attributes: &Attributes) -> Vec<FormField> {
    attributes
        .iter()
        .filter(|(name, _)| !RESERVED.contains(name))
        .map(|(name, value)| FormField {
            name: sanitize_key(name),
            value: encode_value(value),
        })
        .collect()
}
