pub mod archive;
pub mod atx;
pub mod junit;
pub mod tree;
pub mod trf;
pub mod unit;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where a report node points: a file inside a local archive, or a page on the
/// reporting service. A node never carries both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportLink {
    File {
        /// `/`-separated path relative to the archive root.
        path: String,
        size: u64,
    },
    Url {
        url: String,
        /// Aggregate history view rather than a single run.
        #[serde(default)]
        trend: bool,
    },
}

/// One entry in a report tree. Children are kept in traversal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportNode {
    pub id: u32,
    pub title: String,
    pub link: ReportLink,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ReportNode>,
}

impl ReportNode {
    pub fn new(id: u32, title: impl Into<String>, link: ReportLink) -> Self {
        Self {
            id,
            title: title.into(),
            link,
            children: Vec::new(),
        }
    }

    pub fn add_child(&mut self, child: ReportNode) {
        self.children.push(child);
    }

    pub fn url(&self) -> Option<&str> {
        match &self.link {
            ReportLink::Url { url, .. } => Some(url),
            ReportLink::File { .. } => None,
        }
    }

    /// Ids of this node and all descendants in pre-order.
    pub fn preorder_ids(&self) -> Vec<u32> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, ids: &mut Vec<u32>) {
        ids.push(self.id);
        for child in &self.children {
            child.collect_ids(ids);
        }
    }
}

/// Pre-order ids across a whole forest.
pub fn preorder_ids(roots: &[ReportNode]) -> Vec<u32> {
    roots.iter().flat_map(ReportNode::preorder_ids).collect()
}

/// Sequential 1-based ids shared by one whole traversal.
#[derive(Debug, Default)]
pub struct IdSequence {
    last: u32,
}

impl IdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> u32 {
        self.last += 1;
        self.last
    }

    pub fn last(&self) -> u32 {
        self.last
    }
}

/// Writes a report forest as pretty JSON.
pub fn write_json(roots: &[ReportNode], out: &Path) -> std::io::Result<()> {
    let body = serde_json::to_string_pretty(roots).map_err(std::io::Error::other)?;
    std::fs::write(out, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut ids = IdSequence::new();
        assert_eq!(ids.last(), 0);
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
        assert_eq!(ids.last(), 2);
    }

    #[test]
    fn link_serializes_tagged() {
        let node = ReportNode::new(
            3,
            "Smoke",
            ReportLink::File {
                path: "Smoke/Smoke.trf".into(),
                size: 4096,
            },
        );
        let v = serde_json::to_value(&node).unwrap();
        assert_eq!(v["link"]["type"], "file");
        assert_eq!(v["link"]["size"], 4096);
        assert!(v.get("children").is_none());
        assert_eq!(node.url(), None);
    }
}
