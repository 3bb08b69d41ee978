//! Channel forest built from flat channel rows.
//!
//! The store hands back channels as a flat list with an optional `parent_id`.
//! [`build_hierarchy`] turns that into roots with nested children. Nothing in
//! the input is ever dropped: a channel whose parent is missing from the list
//! becomes a root, and channels caught in a parent cycle are surfaced by
//! promoting the first of them (in input order) to a root.

use serde::Serialize;
use std::collections::HashMap;

/// Anything that can be placed in the channel forest.
pub trait HierarchyItem {
    fn id(&self) -> &str;
    fn parent_id(&self) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelNode<T> {
    pub channel: T,
    pub children: Vec<ChannelNode<T>>,
    /// Depth in the forest, roots are level 0.
    pub level: usize,
}

impl<T: HierarchyItem> ChannelNode<T> {
    pub fn id(&self) -> &str {
        self.channel.id()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Build the forest. Sibling order follows input order.
pub fn build_hierarchy<T: HierarchyItem>(items: Vec<T>) -> Vec<ChannelNode<T>> {
    let (children, roots) = {
        // First occurrence wins if the input repeats an id.
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            index.entry(item.id()).or_insert(i);
        }

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); items.len()];
        let mut roots = Vec::new();
        for (i, item) in items.iter().enumerate() {
            match item.parent_id().and_then(|pid| index.get(pid)) {
                Some(&parent) if parent != i => children[parent].push(i),
                _ => roots.push(i),
            }
        }
        (children, roots)
    };

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();

    let mut forest: Vec<ChannelNode<T>> = roots
        .iter()
        .filter_map(|&root| attach(root, &mut slots, &children))
        .collect();

    // Whatever is left was only reachable through a parent cycle.
    for i in 0..slots.len() {
        if slots[i].is_some() {
            if let Some(node) = attach(i, &mut slots, &children) {
                forest.push(node);
            }
        }
    }

    forest
}

/// Builds the subtree under `root` with an explicit stack of partially built
/// nodes, so nesting depth never turns into call depth.
fn attach<T>(root: usize, slots: &mut [Option<T>], children: &[Vec<usize>]) -> Option<ChannelNode<T>> {
    let channel = slots[root].take()?;
    // (node being built, its input index, next child position)
    let mut stack = vec![(
        ChannelNode {
            channel,
            children: Vec::new(),
            level: 0,
        },
        root,
        0usize,
    )];

    loop {
        let (_, index, next) = stack.last_mut()?;
        if let Some(&child) = children[*index].get(*next) {
            *next += 1;
            if let Some(channel) = slots[child].take() {
                let level = stack.len();
                stack.push((
                    ChannelNode {
                        channel,
                        children: Vec::new(),
                        level,
                    },
                    child,
                    0,
                ));
            }
            continue;
        }

        let (done, _, _) = stack.pop()?;
        match stack.last_mut() {
            Some((parent, _, _)) => parent.children.push(done),
            None => return Some(done),
        }
    }
}

impl<T> Drop for ChannelNode<T> {
    // The derived drop would recurse once per level.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Depth-first listing of every node, parents before their children.
pub fn flatten<T>(forest: &[ChannelNode<T>]) -> Vec<&ChannelNode<T>> {
    let mut out = Vec::new();
    let mut stack: Vec<&ChannelNode<T>> = forest.iter().rev().collect();
    while let Some(node) = stack.pop() {
        out.push(node);
        stack.extend(node.children.iter().rev());
    }
    out
}

pub fn find_node<'a, T: HierarchyItem>(
    forest: &'a [ChannelNode<T>],
    id: &str,
) -> Option<&'a ChannelNode<T>> {
    flatten(forest).into_iter().find(|node| node.id() == id)
}
