//! Generalized suffix tree over owned text buffers, Ukkonen-style online
//! construction, with a per-node payload set of row ids.
//!
//! Like the B+tree, this would naturally be a graph of nodes linked by
//! parent/child/suffix-link references in every direction; the arena +
//! `NodeId` pattern from [`crate::btree::node`] avoids the reference
//! cycles a suffix-link graph would otherwise require. Edge labels are
//! stored as `(text id, start, end)` triples into an append-only arena of
//! owned `Vec<char>` buffers (`texts`) rather than as borrowed slices, so
//! an edge never outlives the text it points into and multiple `put`
//! calls can share structure across different input strings.

use std::collections::{BTreeSet, HashMap};

type NodeId = u32;
const NULL: NodeId = u32::MAX;
const ROOT: NodeId = 0;

/// Whether an edge's end is pinned or tracks "end of its text", the
/// classic Ukkonen trick for growing all open leaf edges for free as a
/// text is extended one character at a time.
#[derive(Clone, Copy, PartialEq, Eq)]
enum EdgeEnd {
    Leaf,
    Fixed(usize),
}

#[derive(Clone, Copy)]
struct Edge {
    text_id: u32,
    start: usize,
    end: EdgeEnd,
    target: NodeId,
}

struct SuffixNode {
    children: HashMap<char, Edge>,
    suffix_link: NodeId,
    payload: BTreeSet<u32>,
}

impl SuffixNode {
    fn new() -> Self {
        Self {
            children: HashMap::new(),
            suffix_link: NULL,
            payload: BTreeSet::new(),
        }
    }
}

/// Generalized suffix tree keyed by text, payload = set of row ids.
pub struct SuffixTree {
    nodes: Vec<SuffixNode>,
    texts: Vec<Vec<char>>,
}

impl Default for SuffixTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SuffixTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![SuffixNode::new()],
            texts: Vec::new(),
        }
    }

    fn alloc(&mut self) -> NodeId {
        self.nodes.push(SuffixNode::new());
        (self.nodes.len() - 1) as NodeId
    }

    fn edge_end_index(&self, edge: &Edge) -> usize {
        match edge.end {
            EdgeEnd::Leaf => self.texts[edge.text_id as usize].len() - 1,
            EdgeEnd::Fixed(e) => e,
        }
    }

    fn edge_length(&self, edge: &Edge) -> usize {
        self.edge_end_index(edge) - edge.start + 1
    }

    fn edge_chars(&self, edge: &Edge) -> &[char] {
        let end = self.edge_end_index(edge);
        &self.texts[edge.text_id as usize][edge.start..=end]
    }

    /// Insert every suffix of `text`, tagging every node visited by any
    /// suffix with `id`. Re-inserting an already-present text for a new
    /// id reuses the existing structure; nothing but payload sets change.
    pub fn put(&mut self, text: &str, id: u32) {
        let chars: Vec<char> = text.chars().collect();
        let text_id = self.texts.len() as u32;
        self.texts.push(chars);
        let n = self.texts[text_id as usize].len();
        if n == 0 {
            self.add_with_propagation(ROOT, id);
            return;
        }

        let mut active_node = ROOT;
        let mut active_edge: usize = 0;
        let mut active_length: usize = 0;
        let mut remaining: usize = 0;

        for i in 0..n {
            let mut last_created: NodeId = NULL;
            remaining += 1;
            while remaining > 0 {
                if active_length == 0 {
                    active_edge = i;
                }
                let edge_char = self.texts[text_id as usize][active_edge];
                let existing = self.nodes[active_node as usize].children.get(&edge_char).copied();

                match existing {
                    None => {
                        let leaf = self.alloc();
                        self.nodes[active_node as usize].children.insert(
                            edge_char,
                            Edge {
                                text_id,
                                start: i,
                                end: EdgeEnd::Leaf,
                                target: leaf,
                            },
                        );
                        if last_created != NULL {
                            self.nodes[last_created as usize].suffix_link = active_node;
                            last_created = NULL;
                        }
                    }
                    Some(edge) => {
                        let edge_len = self.edge_length(&edge);
                        if active_length >= edge_len {
                            active_edge += edge_len;
                            active_length -= edge_len;
                            active_node = edge.target;
                            continue;
                        }
                        let char_on_edge = self.edge_chars(&edge)[active_length];
                        if char_on_edge == self.texts[text_id as usize][i] {
                            if last_created != NULL && active_node != ROOT {
                                self.nodes[last_created as usize].suffix_link = active_node;
                            }
                            active_length += 1;
                            break;
                        }

                        let split = self.alloc();
                        let to_split = Edge {
                            text_id: edge.text_id,
                            start: edge.start,
                            end: EdgeEnd::Fixed(edge.start + active_length - 1),
                            target: split,
                        };
                        self.nodes[active_node as usize].children.insert(edge_char, to_split);

                        let tail_char = self.edge_chars(&edge)[active_length];
                        self.nodes[split as usize].children.insert(
                            tail_char,
                            Edge {
                                text_id: edge.text_id,
                                start: edge.start + active_length,
                                end: edge.end,
                                target: edge.target,
                            },
                        );

                        let new_leaf = self.alloc();
                        self.nodes[split as usize].children.insert(
                            self.texts[text_id as usize][i],
                            Edge {
                                text_id,
                                start: i,
                                end: EdgeEnd::Leaf,
                                target: new_leaf,
                            },
                        );

                        if last_created != NULL {
                            self.nodes[last_created as usize].suffix_link = split;
                        }
                        last_created = split;
                    }
                }

                remaining -= 1;
                if active_node == ROOT && active_length > 0 {
                    active_length -= 1;
                    active_edge = i + 1 - remaining;
                } else if active_node != ROOT {
                    let link = self.nodes[active_node as usize].suffix_link;
                    active_node = if link == NULL { ROOT } else { link };
                }
            }
        }

        self.mark_suffixes(text_id, id);
    }

    /// Re-walk every suffix of the just-inserted text over the now-complete
    /// structure, tagging every explicit node the walk passes through and
    /// propagating along suffix links from each, stopping at a node that
    /// already carries `id`.
    fn mark_suffixes(&mut self, text_id: u32, id: u32) {
        let n = self.texts[text_id as usize].len();
        for start in 0..n {
            let mut node = ROOT;
            let mut pos = start;
            while pos < n {
                let c = self.texts[text_id as usize][pos];
                let edge = match self.nodes[node as usize].children.get(&c).copied() {
                    Some(e) => e,
                    None => break,
                };
                let edge_len = self.edge_length(&edge);
                self.add_with_propagation(edge.target, id);
                node = edge.target;
                pos += edge_len;
            }
        }
    }

    fn add_with_propagation(&mut self, mut node: NodeId, id: u32) {
        loop {
            let n = &mut self.nodes[node as usize];
            if n.payload.contains(&id) {
                return;
            }
            n.payload.insert(id);
            let link = n.suffix_link;
            if link == NULL || link == node {
                return;
            }
            node = link;
        }
    }

    fn descend(&self, pattern: &[char]) -> Option<NodeId> {
        let mut node = ROOT;
        let mut pos = 0;
        while pos < pattern.len() {
            let c = pattern[pos];
            let edge = self.nodes[node as usize].children.get(&c)?;
            let label = self.edge_chars(edge);
            let remaining = pattern.len() - pos;
            let take = remaining.min(label.len());
            if pattern[pos..pos + take] != label[..take] {
                return None;
            }
            if take < label.len() {
                return Some(edge.target);
            }
            pos += take;
            node = edge.target;
        }
        Some(node)
    }

    fn collect(&self, node: NodeId, out: &mut BTreeSet<u32>) {
        out.extend(self.nodes[node as usize].payload.iter().copied());
        let children: Vec<Edge> = self.nodes[node as usize].children.values().copied().collect();
        for edge in children {
            self.collect(edge.target, out);
        }
    }

    /// Substring search: the payload of the node reached by `pattern`,
    /// unioned with every descendant's payload (a match at an internal
    /// point implies every longer context through it also matches).
    /// Returns `None` when `pattern` does not occur at all.
    pub fn find(&self, pattern: &str) -> Option<BTreeSet<u32>> {
        let chars: Vec<char> = pattern.chars().collect();
        if chars.is_empty() {
            let mut out = BTreeSet::new();
            self.collect(ROOT, &mut out);
            return Some(out);
        }
        let node = self.descend(&chars)?;
        let mut out = BTreeSet::new();
        self.collect(node, &mut out);
        Some(out)
    }

    /// Remove `id` from the node reached by `text` and every descendant of
    /// that node, dropping a node's outgoing edges once its payload is
    /// empty. This is intentionally broader than undoing one `put`: a
    /// descendant may carry `id` because of an entirely different
    /// inserted text that happens to share this prefix, and it still
    /// loses `id` here.
    pub fn delete(&mut self, text: &str, id: u32) {
        let chars: Vec<char> = text.chars().collect();
        if let Some(node) = self.descend(&chars) {
            self.strip_recursive(node, id);
        }
    }

    fn strip_recursive(&mut self, node: NodeId, id: u32) {
        self.nodes[node as usize].payload.remove(&id);
        let empty = self.nodes[node as usize].payload.is_empty();
        let children: Vec<Edge> = self.nodes[node as usize].children.values().copied().collect();
        for edge in children {
            self.strip_recursive(edge.target, id);
        }
        if empty {
            self.nodes[node as usize].children.clear();
        }
    }
}
