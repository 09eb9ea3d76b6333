//! Filtered depth-first directory walk.
//!
//! Built on [`walkdir`] with links followed. Every entry is checked against
//! the [`RuleSet`] before it is descended into, so nothing below an excluded
//! directory is listed. The walk keeps no recursion of its own: entries are
//! collected into an arena and assembled into [`Node`]s bottom-up, then each
//! directory's children are sorted (directories first, then
//! case-insensitive).

use crate::error::WalkError;
use crate::node::{Annotation, Node, NodeKind, compare_entries, display_name};
use crate::rules::RuleSet;
use log;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Soft per-entry failures. The walk continues past every one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WalkWarning {
    UnreadableDirectory { path: PathBuf, message: String },
    UnreadableEntry { path: PathBuf, message: String },
    UnresolvableSymlink { path: PathBuf, message: String },
    SymlinkCycle { path: PathBuf, target: PathBuf },
}

impl WalkWarning {
    pub fn path(&self) -> &Path {
        match self {
            WalkWarning::UnreadableDirectory { path, .. }
            | WalkWarning::UnreadableEntry { path, .. }
            | WalkWarning::UnresolvableSymlink { path, .. }
            | WalkWarning::SymlinkCycle { path, .. } => path,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            WalkWarning::UnreadableDirectory { path, message } => {
                format!("Unreadable directory {}: {}", path.display(), message)
            }
            WalkWarning::UnreadableEntry { path, message } => {
                format!("Unreadable entry {}: {}", path.display(), message)
            }
            WalkWarning::UnresolvableSymlink { path, message } => {
                format!("Skipped unresolvable symlink {}: {}", path.display(), message)
            }
            WalkWarning::SymlinkCycle { path, target } => format!(
                "Symlink cycle at {} (points back to {})",
                path.display(),
                target.display()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalkOutcome {
    pub root: Node,
    pub warnings: Vec<WalkWarning>,
}

pub fn walk(root_path: &Path, rules: &RuleSet) -> Result<Node, WalkError> {
    walk_with_warnings(root_path, rules).map(|outcome| outcome.root)
}

pub fn walk_with_warnings(root_path: &Path, rules: &RuleSet) -> Result<WalkOutcome, WalkError> {
    let metadata = fs::metadata(root_path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => WalkError::RootNotFound(root_path.to_path_buf()),
        _ => WalkError::RootInaccessible {
            path: root_path.to_path_buf(),
            message: e.to_string(),
        },
    })?;
    if !metadata.is_dir() {
        return Err(WalkError::RootNotADirectory(root_path.to_path_buf()));
    }

    let canonical_root = fs::canonicalize(root_path).map_err(|e| WalkError::RootInaccessible {
        path: root_path.to_path_buf(),
        message: e.to_string(),
    })?;
    log::info!("Walking root: {}", canonical_root.display());

    let mut tree = TreeBuilder::new(&canonical_root);
    let mut warnings = Vec::new();
    let walker = WalkDir::new(&canonical_root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !entry_is_excluded(entry, rules));

    for result in walker {
        match result {
            Ok(entry) if entry.depth() == 0 => {}
            Ok(entry) => {
                log::trace!("Entry: {}", entry.path().display());
                let name = entry.file_name().to_string_lossy().into_owned();
                tree.insert(match kind_of(&entry) {
                    NodeKind::Directory => Node::directory(name, entry.path(), Vec::new()),
                    NodeKind::File => Node::file(name, entry.path()),
                });
            }
            Err(err) => {
                if let Some(warning) = tree.record_error(&err, rules) {
                    log::warn!("{}", warning.describe());
                    warnings.push(warning);
                }
            }
        }
    }
    warnings.sort_by(|a, b| a.path().cmp(b.path()));

    let root = tree.finish();
    let stats = root.stats();
    log::info!(
        "Walk of {} complete: {} directories, {} files, {} warnings",
        canonical_root.display(),
        stats.directories,
        stats.files,
        warnings.len()
    );
    Ok(WalkOutcome { root, warnings })
}

/// Links are already resolved here, so a link to a directory is a directory.
fn kind_of(entry: &DirEntry) -> NodeKind {
    if entry.file_type().is_dir() {
        NodeKind::Directory
    } else {
        NodeKind::File
    }
}

fn entry_is_excluded(entry: &DirEntry, rules: &RuleSet) -> bool {
    let name = entry.file_name().to_string_lossy();
    let excluded = rules.is_excluded(&name, kind_of(entry), parent_of(entry.path()));
    if excluded {
        log::trace!("Excluded: {}", entry.path().display());
    }
    excluded
}

fn parent_of(path: &Path) -> &Path {
    path.parent().unwrap_or(path)
}

/// Whether a rule drops `path` whatever kind of entry it turns out to be.
fn name_is_excluded(path: &Path, kinds: &[NodeKind], rules: &RuleSet) -> bool {
    let name = display_name(path);
    kinds
        .iter()
        .any(|kind| rules.is_excluded(&name, *kind, parent_of(path)))
}

/// Walked entries in pre-order. `None` as a parent stands for the root.
struct TreeBuilder {
    root: Node,
    slots: Vec<Option<Node>>,
    parents: Vec<Option<usize>>,
    directories: HashMap<PathBuf, Option<usize>>,
}

impl TreeBuilder {
    fn new(canonical_root: &Path) -> Self {
        let mut root = Node::directory(display_name(canonical_root), canonical_root, Vec::new());
        root.is_root = true;
        let mut directories = HashMap::new();
        directories.insert(canonical_root.to_path_buf(), None);
        Self {
            root,
            slots: Vec::new(),
            parents: Vec::new(),
            directories,
        }
    }

    fn insert(&mut self, node: Node) {
        let Some(&parent) = node.path.parent().and_then(|p| self.directories.get(p)) else {
            log::debug!("No parent walked for {}, skipping", node.path.display());
            return;
        };
        let index = self.slots.len();
        if node.is_dir() {
            self.directories.insert(node.path.clone(), Some(index));
        }
        self.slots.push(Some(node));
        self.parents.push(parent);
    }

    fn annotate(&mut self, path: &Path, annotation: Annotation) -> bool {
        let node = match self.directories.get(path) {
            Some(None) => Some(&mut self.root),
            Some(Some(index)) => self.slots[*index].as_mut(),
            None => None,
        };
        match node {
            Some(node) => {
                node.annotation = Some(annotation);
                true
            }
            None => false,
        }
    }

    /// Turns a walk error into a tree annotation and a warning. Errors on
    /// entries a rule would drop are discarded.
    fn record_error(&mut self, err: &walkdir::Error, rules: &RuleSet) -> Option<WalkWarning> {
        let message = err
            .io_error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| err.to_string());
        let Some(path) = err.path().map(Path::to_path_buf) else {
            return Some(WalkWarning::UnreadableEntry {
                path: self.root.path.clone(),
                message,
            });
        };

        if let Some(ancestor) = err.loop_ancestor() {
            if name_is_excluded(&path, &[NodeKind::Directory], rules) {
                return None;
            }
            let target = ancestor.to_path_buf();
            self.insert(
                Node::directory(display_name(&path), &path, Vec::new())
                    .with_annotation(Annotation::SymlinkCycle { target: target.clone() }),
            );
            return Some(WalkWarning::SymlinkCycle { path, target });
        }

        // A directory that was entered but could not be listed.
        if self.annotate(&path, Annotation::Unreadable { message: message.clone() }) {
            return Some(WalkWarning::UnreadableDirectory { path, message });
        }

        if name_is_excluded(&path, &[NodeKind::Directory, NodeKind::File], rules) {
            log::trace!("Dropping error on excluded entry {}", path.display());
            return None;
        }
        let is_symlink = fs::symlink_metadata(&path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        if is_symlink {
            Some(WalkWarning::UnresolvableSymlink { path, message })
        } else {
            Some(WalkWarning::UnreadableEntry { path, message })
        }
    }

    /// Attaches every slot to its parent, deepest first, sorting each
    /// directory once all of its children are in.
    fn finish(mut self) -> Node {
        for index in (0..self.slots.len()).rev() {
            let Some(mut node) = self.slots[index].take() else {
                continue;
            };
            sort_children(&mut node);
            let parent = match self.parents[index] {
                Some(parent) => self.slots[parent].as_mut(),
                None => Some(&mut self.root),
            };
            if let Some(parent) = parent {
                parent.children.push(node);
            }
        }
        sort_children(&mut self.root);
        self.root
    }
}

fn sort_children(node: &mut Node) {
    node.children
        .sort_by(|a, b| compare_entries(&a.name, a.kind, &b.name, b.kind));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rule;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(path, "").expect("Failed to write file");
    }

    fn child_names(node: &Node) -> Vec<&str> {
        node.children.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn missing_root_is_reported() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        assert_eq!(
            walk(&missing, &RuleSet::new()),
            Err(WalkError::RootNotFound(missing.clone()))
        );
    }

    #[test]
    fn file_root_is_not_a_directory() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "file.txt");
        let file = temp.path().join("file.txt");
        assert_eq!(
            walk(&file, &RuleSet::new()),
            Err(WalkError::RootNotADirectory(file.clone()))
        );
    }

    #[test]
    fn root_node_is_flagged_and_named_after_directory() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("proj")).unwrap();
        let root = walk(&temp.path().join("proj"), &RuleSet::new()).unwrap();
        assert_eq!(root.name, "proj");
        assert!(root.is_root);
        assert!(root.is_dir());
        assert!(root.children.is_empty());
    }

    #[test]
    fn entries_are_sorted_directories_first_case_insensitive() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "b.txt");
        touch(temp.path(), "A.txt");
        touch(temp.path(), "zdir/x");
        touch(temp.path(), "Adir/x");
        touch(temp.path(), "c.txt");
        let root = walk(temp.path(), &RuleSet::empty()).unwrap();
        assert_eq!(child_names(&root), vec!["Adir", "zdir", "A.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn excluded_directories_are_pruned_and_empty_ones_kept() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "src/a.py");
        touch(temp.path(), "src/__pycache__/x.pyc");
        touch(temp.path(), "docs/.DS_Store");
        let root = walk(temp.path(), &RuleSet::new()).unwrap();
        assert_eq!(child_names(&root), vec!["docs", "src"]);
        let docs = &root.children[0];
        assert!(docs.children.is_empty());
        assert_eq!(child_names(&root.children[1]), vec!["a.py"]);
    }

    #[test]
    fn children_carry_absolute_paths() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "src/lib.rs");
        let root = walk(temp.path(), &RuleSet::empty()).unwrap();
        let lib = &root.children[0].children[0];
        assert!(lib.path.is_absolute());
        assert_eq!(lib.path, root.path.join("src").join("lib.rs"));
        assert!(!lib.is_root);
    }

    #[test]
    fn custom_directory_rule_applies_at_every_depth() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a/target/x");
        touch(temp.path(), "a/b/target/y");
        touch(temp.path(), "a/b/keep.rs");
        let mut rules = RuleSet::empty();
        rules.add_rule(Rule::DirectoryName("target".into()));
        let root = walk(temp.path(), &rules).unwrap();
        let names: Vec<&str> = root.flatten().into_iter().map(|(n, _)| n.name.as_str()).collect();
        assert!(!names.contains(&"target"));
        assert!(names.contains(&"keep.rs"));
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_skipped_with_warning() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "real.txt");
        std::os::unix::fs::symlink(temp.path().join("gone"), temp.path().join("broken")).unwrap();
        let outcome = walk_with_warnings(temp.path(), &RuleSet::empty()).unwrap();
        assert_eq!(child_names(&outcome.root), vec!["real.txt"]);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(matches!(
            outcome.warnings[0],
            WalkWarning::UnresolvableSymlink { .. }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_takes_target_kind() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "real/inner.txt");
        std::os::unix::fs::symlink(temp.path().join("real"), temp.path().join("alias")).unwrap();
        let root = walk(temp.path(), &RuleSet::empty()).unwrap();
        assert_eq!(child_names(&root), vec!["alias", "real"]);
        assert!(root.children[0].is_dir());
        assert_eq!(child_names(&root.children[0]), vec!["inner.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycle_is_annotated_not_followed() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a/file.txt");
        std::os::unix::fs::symlink(temp.path().join("a"), temp.path().join("a").join("loop")).unwrap();
        let outcome = walk_with_warnings(temp.path(), &RuleSet::empty()).unwrap();
        let a = &outcome.root.children[0];
        assert_eq!(child_names(a), vec!["loop", "file.txt"]);
        let looped = &a.children[0];
        assert!(looped.children.is_empty());
        assert!(matches!(looped.annotation, Some(Annotation::SymlinkCycle { .. })));
        assert!(matches!(outcome.warnings[0], WalkWarning::SymlinkCycle { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn excluded_dangling_symlinks_are_dropped_silently() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "keep.txt");
        std::os::unix::fs::symlink(temp.path().join("gone"), temp.path().join(".DS_Store")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("gone"), temp.path().join("node_modules")).unwrap();
        let outcome = walk_with_warnings(temp.path(), &RuleSet::new()).unwrap();
        assert_eq!(child_names(&outcome.root), vec!["keep.txt"]);
        assert!(outcome.warnings.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn excluded_symlink_cycle_is_not_reported() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a/file.txt");
        std::os::unix::fs::symlink(temp.path().join("a"), temp.path().join("a").join(".git")).unwrap();
        let outcome = walk_with_warnings(temp.path(), &RuleSet::new()).unwrap();
        assert_eq!(child_names(&outcome.root.children[0]), vec!["file.txt"]);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn deeply_nested_chain_is_walked_completely() {
        const DEPTH: usize = 1000;
        let temp = TempDir::new().unwrap();
        let mut deepest = temp.path().to_path_buf();
        for _ in 0..DEPTH {
            deepest.push("d");
        }
        fs::create_dir_all(&deepest).unwrap();
        fs::write(deepest.join("leaf.txt"), "").unwrap();

        let root = walk(temp.path(), &RuleSet::empty()).unwrap();
        let stats = root.stats();
        assert_eq!(stats.directories, DEPTH);
        assert_eq!(stats.files, 1);
        let (leaf, depth) = root.flatten().pop().unwrap();
        assert_eq!(leaf.name, "leaf.txt");
        assert_eq!(depth, DEPTH + 1);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_root_is_annotated() {
        use std::os::unix::fs::PermissionsExt;
        let temp = TempDir::new().unwrap();
        let locked = temp.path().join("locked");
        touch(temp.path(), "locked/secret.txt");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        let readable_anyway = fs::read_dir(&locked).is_ok();
        let outcome = walk_with_warnings(&locked, &RuleSet::empty());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        if readable_anyway {
            eprintln!("skipping unreadable_root_is_annotated: permissions are not enforced for this user");
            return;
        }
        let outcome = outcome.unwrap();
        assert!(outcome.root.children.is_empty());
        assert!(matches!(outcome.root.annotation, Some(Annotation::Unreadable { .. })));
        assert!(matches!(outcome.warnings[0], WalkWarning::UnreadableDirectory { .. }));
    }
}
