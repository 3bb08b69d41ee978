//! Expand/collapse and selection state for the channel sidebar.
//!
//! The state only holds ids, so it survives a rebuild of the forest. Call
//! [`ChannelTreeState::retain_existing`] after a rebuild to forget channels
//! that disappeared. Nothing here touches the disk unless `save` is called.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use huddle_shared::hierarchy::{flatten, ChannelNode, HierarchyItem};

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelTreeState {
    expanded: BTreeSet<String>,
    selected: Option<String>,
}

/// One line of the sidebar as it should be drawn.
#[derive(Debug, PartialEq, Eq)]
pub struct TreeRow<'a, T> {
    pub channel: &'a T,
    pub level: usize,
    pub has_children: bool,
    pub expanded: bool,
    pub selected: bool,
}

impl ChannelTreeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    pub fn expand(&mut self, id: &str) {
        self.expanded.insert(id.to_string());
    }

    pub fn collapse(&mut self, id: &str) {
        self.expanded.remove(id);
    }

    /// Returns the new expanded state.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(id.to_string());
            true
        }
    }

    /// Expands every node that has children.
    pub fn expand_all<T: HierarchyItem>(&mut self, forest: &[ChannelNode<T>]) {
        for node in flatten(forest) {
            if node.has_children() {
                self.expanded.insert(node.id().to_string());
            }
        }
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn select(&mut self, id: &str) {
        self.selected = Some(id.to_string());
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Rows in display order. Children appear only below expanded parents.
    pub fn visible_rows<'a, T: HierarchyItem>(
        &self,
        forest: &'a [ChannelNode<T>],
    ) -> Vec<TreeRow<'a, T>> {
        let mut rows = Vec::new();
        let mut stack: Vec<&ChannelNode<T>> = forest.iter().rev().collect();

        while let Some(node) = stack.pop() {
            let expanded = self.is_expanded(node.id());
            rows.push(TreeRow {
                channel: &node.channel,
                level: node.level,
                has_children: node.has_children(),
                expanded,
                selected: self.selected.as_deref() == Some(node.id()),
            });
            if expanded {
                stack.extend(node.children.iter().rev());
            }
        }

        rows
    }

    /// Forget ids that no longer exist in `forest`.
    pub fn retain_existing<T: HierarchyItem>(&mut self, forest: &[ChannelNode<T>]) {
        let ids: BTreeSet<&str> = flatten(forest).into_iter().map(|n| n.id()).collect();
        self.expanded.retain(|id| ids.contains(id.as_str()));
        if self
            .selected
            .as_deref()
            .is_some_and(|id| !ids.contains(id))
        {
            self.selected = None;
        }
    }

    pub fn to_json(&self) -> ClientResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> ClientResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> ClientResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// A missing file yields the empty state.
    pub fn load(path: impl AsRef<Path>) -> ClientResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ClientError::Io(e)),
        }
    }
}
