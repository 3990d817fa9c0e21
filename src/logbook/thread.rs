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

//! Navigation of reply threads.
//!
//! The server stores the thread tree as two attributes on each message:
//! `In reply to` names the parent and `Reply to` lists the direct
//! children. Nothing here is cached — every relation is derived by
//! reading messages again, so the answers reflect the server's current
//! state.

use std::collections::HashSet;
use std::time::Duration;

use super::{Entry, Logbook};
use crate::support::error::Result;

impl Logbook {
    /// The chain of parents of `id`, nearest first, ending at the thread
    /// root.
    pub fn ancestors(
        &self,
        id: u32,
        timeout: Option<Duration>,
    ) -> Result<Vec<u32>> {
        let mut ancestors = Vec::new();
        let mut current = id;
        loop {
            let entry = self.read(current, timeout)?;
            let parent = match parent_of(&entry) {
                Some(parent) => parent,
                None => break,
            };
            // A parent chain that loops back would be a corrupt logbook;
            // stop rather than spin.
            if parent == id || ancestors.contains(&parent) {
                break;
            }
            ancestors.push(parent);
            current = parent;
        }
        Ok(ancestors)
    }

    /// Every message in the reply subtree below `id`, depth-first in the
    /// server's child order. `id` itself is not included.
    pub fn descendants(
        &self,
        id: u32,
        timeout: Option<Duration>,
    ) -> Result<Vec<u32>> {
        let mut descendants = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(id);

        let root = self.read(id, timeout)?;
        let mut stack = children_of(&root);
        stack.reverse();
        while let Some(next) = stack.pop() {
            if !seen.insert(next) {
                continue;
            }
            descendants.push(next);
            let entry = self.read(next, timeout)?;
            let mut children = children_of(&entry);
            children.reverse();
            stack.extend(children);
        }
        Ok(descendants)
    }

    /// The other direct children of the immediate parent of `id`. A
    /// thread root has no siblings.
    pub fn siblings(
        &self,
        id: u32,
        timeout: Option<Duration>,
    ) -> Result<Vec<u32>> {
        let entry = self.read(id, timeout)?;
        let parent = match parent_of(&entry) {
            Some(parent) => parent,
            None => return Ok(Vec::new()),
        };
        let parent_entry = self.read(parent, timeout)?;
        Ok(children_of(&parent_entry)
            .into_iter()
            .filter(|&child| child != id)
            .collect())
    }
}

fn parent_of(entry: &Entry) -> Option<u32> {
    entry
        .attributes
        .get("In reply to")
        .and_then(|value| value.trim().parse().ok())
        .filter(|&parent| parent != 0)
}

fn children_of(entry: &Entry) -> Vec<u32> {
    match entry.attributes.get("Reply to") {
        Some(value) => value
            .split(',')
            .filter_map(|child| child.trim().parse().ok())
            .collect(),
        None => Vec::new(),
    }
}
