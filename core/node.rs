//! The filtered view of the filesystem: nodes, their ordering contract and
//! the read-only queries the sidebar runs against them.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Directory,
    File,
}

/// Soft failure recorded on the node it affected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Annotation {
    /// The directory could not be listed; its children are unknown.
    Unreadable { message: String },
    /// A symlinked directory pointing back at one of its own ancestors.
    SymlinkCycle { target: PathBuf },
}

impl Annotation {
    pub fn tag(&self) -> &'static str {
        match self {
            Annotation::Unreadable { .. } => "unreadable",
            Annotation::SymlinkCycle { .. } => "symlink cycle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub name: String,
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_root: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Annotation>,
}

/// What the sidebar shows for the node under the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSummary {
    pub name: String,
    pub path: PathBuf,
    pub children: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TreeStats {
    pub directories: usize,
    pub files: usize,
    pub annotated: usize,
}

impl TreeStats {
    pub fn total(&self) -> usize {
        self.directories + self.files
    }
}

impl Node {
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::File,
            children: Vec::new(),
            is_root: false,
            annotation: None,
        }
    }

    pub fn directory(name: impl Into<String>, path: impl Into<PathBuf>, children: Vec<Node>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::Directory,
            children,
            is_root: false,
            annotation: None,
        }
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn summary(&self) -> NodeSummary {
        NodeSummary {
            name: self.name.clone(),
            path: self.path.clone(),
            children: self.children.len(),
        }
    }

    /// Pre-order `(node, depth)` pairs, the node itself at depth 0.
    pub fn flatten(&self) -> Vec<(&Node, usize)> {
        let mut out = Vec::new();
        let mut pending = vec![(self, 0)];
        while let Some((node, depth)) = pending.pop() {
            out.push((node, depth));
            pending.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
        }
        out
    }

    pub fn find(&self, path: &Path) -> Option<&Node> {
        if self.path == path {
            return Some(self);
        }
        if !path.starts_with(&self.path) {
            return None;
        }
        self.children.iter().find_map(|child| child.find(path))
    }

    /// Counts every node below this one, excluding itself.
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        let mut pending: Vec<&Node> = self.children.iter().collect();
        while let Some(node) = pending.pop() {
            match node.kind {
                NodeKind::Directory => stats.directories += 1,
                NodeKind::File => stats.files += 1,
            }
            if node.annotation.is_some() {
                stats.annotated += 1;
            }
            pending.extend(&node.children);
        }
        stats
    }

    /// Keeps the entries whose name contains one of `needles`
    /// (case-insensitive) and the directories leading to them.
    ///
    /// A matching directory is kept with its whole subtree. The node this is
    /// called on is always kept. An empty needle list returns an unchanged clone.
    pub fn filter_by_name(&self, needles: &[String]) -> Node {
        let lowered: Vec<String> = needles
            .iter()
            .map(|n| n.trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        if lowered.is_empty() {
            return self.clone();
        }
        let mut kept = self.clone();
        kept.children = self
            .children
            .iter()
            .filter_map(|child| child.retain_matching(&lowered))
            .collect();
        kept
    }

    fn retain_matching(&self, needles: &[String]) -> Option<Node> {
        let name = self.name.to_lowercase();
        if needles.iter().any(|n| name.contains(n.as_str())) {
            return Some(self.clone());
        }
        if !self.is_dir() {
            return None;
        }
        let children: Vec<Node> = self
            .children
            .iter()
            .filter_map(|child| child.retain_matching(needles))
            .collect();
        if children.is_empty() {
            return None;
        }
        let mut kept = self.clone();
        kept.children = children;
        Some(kept)
    }
}

/// Sibling order: directories before files, then case-insensitive by name.
/// Names differing only in case fall back to byte order so the result is total.
pub fn compare_entries(a_name: &str, a_kind: NodeKind, b_name: &str, b_kind: NodeKind) -> Ordering {
    match (a_kind, b_kind) {
        (NodeKind::Directory, NodeKind::File) => Ordering::Less,
        (NodeKind::File, NodeKind::Directory) => Ordering::Greater,
        _ => a_name
            .to_lowercase()
            .cmp(&b_name.to_lowercase())
            .then_with(|| a_name.cmp(b_name)),
    }
}

/// Display name of a path: its last component, or the whole path for `/`.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
