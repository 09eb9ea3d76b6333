use crate::error::MergeError;
use crate::node::{Node, TreeStats};
use indexmap::IndexSet;
use log;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Ordered set of selected roots. Insertion order is the presentation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    roots: IndexSet<PathBuf>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a root; returns `false` when it is already selected.
    ///
    /// Paths are compared in canonical form when they resolve, so `./a` and
    /// `a` are the same root. Unresolvable paths are kept as given and fail
    /// later, at walk time.
    pub fn add(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let inserted = self.roots.insert(key);
        if !inserted {
            log::debug!("Root already selected: {}", path.display());
        }
        inserted
    }

    pub fn remove(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.roots.shift_remove(&key) || self.roots.shift_remove(path)
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.roots.contains(&key)
    }

    pub fn clear(&mut self) {
        self.roots.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.roots.iter()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

impl<P: AsRef<Path>> FromIterator<P> for Selection {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        let mut selection = Selection::new();
        for path in iter {
            selection.add(path);
        }
        selection
    }
}

/// The merged result: one logical root over the selected top-level nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Forest {
    pub roots: Vec<Node>,
}

impl Forest {
    pub fn find(&self, path: &Path) -> Option<&Node> {
        self.roots.iter().find_map(|root| root.find(path))
    }

    pub fn flatten(&self) -> Vec<(&Node, usize)> {
        self.roots.iter().flat_map(|root| root.flatten()).collect()
    }

    /// Counts every node in the forest, roots included as directories.
    pub fn stats(&self) -> TreeStats {
        self.roots.iter().fold(TreeStats::default(), |mut acc, root| {
            let stats = root.stats();
            acc.directories += stats.directories + 1;
            acc.files += stats.files;
            acc.annotated += stats.annotated + usize::from(root.annotation.is_some());
            acc
        })
    }

    pub fn filter_by_name(&self, needles: &[String]) -> Forest {
        Forest {
            roots: self.roots.iter().map(|root| root.filter_by_name(needles)).collect(),
        }
    }
}

/// Combines walked roots, in the given order, into one forest.
pub fn merge<I>(walked: I) -> Result<Forest, MergeError>
where
    I: IntoIterator<Item = (PathBuf, Node)>,
{
    let roots: Vec<Node> = walked
        .into_iter()
        .map(|(path, mut node)| {
            log::trace!("Merging root {} as '{}'", path.display(), node.name);
            node.is_root = true;
            node
        })
        .collect();

    if roots.is_empty() {
        log::debug!("Merge requested with no roots");
        return Err(MergeError::EmptySelection);
    }
    log::debug!("Merged {} roots into forest", roots.len());
    Ok(Forest { roots })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_merge_is_an_error() {
        assert_eq!(merge(Vec::<(PathBuf, Node)>::new()), Err(MergeError::EmptySelection));
    }

    #[test]
    fn merge_preserves_given_order_and_flags_roots() {
        let b = Node::directory("b", "/b", Vec::new());
        let a = Node::directory("a", "/a", Vec::new());
        let forest = merge(vec![(PathBuf::from("/b"), b), (PathBuf::from("/a"), a)]).unwrap();
        let names: Vec<&str> = forest.roots.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(forest.roots.iter().all(|r| r.is_root));
    }

    #[test]
    fn selection_rejects_duplicates_and_keeps_order() {
        let temp = TempDir::new().unwrap();
        let z = temp.path().join("z");
        let a = temp.path().join("a");
        std::fs::create_dir(&z).unwrap();
        std::fs::create_dir(&a).unwrap();

        let mut selection = Selection::new();
        assert!(selection.add(&z));
        assert!(selection.add(&a));
        assert!(!selection.add(z.join("..").join("z")));
        assert_eq!(selection.len(), 2);

        let order: Vec<PathBuf> = selection.iter().cloned().collect();
        assert_eq!(order[0].file_name().unwrap(), "z");
        assert_eq!(order[1].file_name().unwrap(), "a");

        assert!(selection.remove(&z));
        assert!(!selection.contains(&z));
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn forest_stats_count_roots_as_directories() {
        let root = Node::directory("r", "/r", vec![Node::file("f", "/r/f")]);
        let forest = merge(vec![(PathBuf::from("/r"), root)]).unwrap();
        let stats = forest.stats();
        assert_eq!(stats.directories, 1);
        assert_eq!(stats.files, 1);
        assert!(forest.find(Path::new("/r/f")).is_some());
    }
}
