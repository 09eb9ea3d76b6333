use crate::error::ParseError;
use crate::node::NodeKind;
use crate::output_formats::get_default_ignore_rules;
use indexmap::IndexSet;
use log;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path};

pub mod grammar;

pub use grammar::{parse_rule, parse_rule_line};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "pattern", rename_all = "snake_case")]
pub enum Rule {
    /// Directory whose name equals the payload (stored without the trailing `/`).
    DirectoryName(String),
    /// File whose name equals the payload exactly.
    ExactFileName(String),
    /// File whose name ends with the payload minus its leading `*`.
    ExtensionGlob(String),
}

impl Rule {
    pub fn matches(&self, name: &str, kind: NodeKind) -> bool {
        match self {
            Rule::DirectoryName(dir) => {
                kind == NodeKind::Directory && name == dir.trim_end_matches('/')
            }
            Rule::ExactFileName(file) => kind == NodeKind::File && name == file,
            Rule::ExtensionGlob(pattern) => {
                kind == NodeKind::File
                    && pattern
                        .strip_prefix('*')
                        .is_some_and(|suffix| !suffix.is_empty() && name.ends_with(suffix))
            }
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Rule::DirectoryName(_) => "directory",
            Rule::ExactFileName(_) => "file",
            Rule::ExtensionGlob(_) => "extension",
        }
    }
}

/// Renders the rule back in the custom-rule grammar.
impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::DirectoryName(dir) => write!(f, "{}/", dir.trim_end_matches('/')),
            Rule::ExactFileName(file) => write!(f, "{}", file),
            Rule::ExtensionGlob(pattern) => write!(f, "\"{}\"", pattern),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added(Rule),
    Duplicate(Rule),
}

impl AddOutcome {
    pub fn rule(&self) -> &Rule {
        match self {
            AddOutcome::Added(rule) | AddOutcome::Duplicate(rule) => rule,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, AddOutcome::Duplicate(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveRule {
    pub rule: Rule,
    pub is_default: bool,
}

/// A rule line that could not be parsed. `line` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRule {
    pub line: usize,
    pub text: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    defaults: IndexSet<Rule>,
    custom: IndexSet<Rule>,
    defaults_enabled: bool,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleSet {
    /// Built-in defaults, enabled, no custom rules.
    pub fn new() -> Self {
        Self::with_defaults(get_default_ignore_rules().iter().cloned(), true)
    }

    /// No defaults and no custom rules: filtering is a no-op.
    pub fn empty() -> Self {
        Self::with_defaults(std::iter::empty(), false)
    }

    pub fn with_defaults<I>(defaults: I, enabled: bool) -> Self
    where
        I: IntoIterator<Item = Rule>,
    {
        Self {
            defaults: defaults.into_iter().collect(),
            custom: IndexSet::new(),
            defaults_enabled: enabled,
        }
    }

    pub fn defaults_enabled(&self) -> bool {
        self.defaults_enabled
    }

    pub fn set_defaults_enabled(&mut self, enabled: bool) {
        if self.defaults_enabled != enabled {
            log::debug!("Default ignore rules {}", if enabled { "enabled" } else { "disabled" });
        }
        self.defaults_enabled = enabled;
    }

    pub fn defaults(&self) -> impl Iterator<Item = &Rule> {
        self.defaults.iter()
    }

    pub fn custom(&self) -> impl Iterator<Item = &Rule> {
        self.custom.iter()
    }

    pub fn add_custom(&mut self, text: &str) -> Result<AddOutcome, ParseError> {
        let rule = parse_rule(text)?;
        Ok(self.add_rule(rule))
    }

    /// A rule already present among the custom rules, or among the defaults
    /// while they are enabled, is reported as a duplicate and not inserted.
    pub fn add_rule(&mut self, rule: Rule) -> AddOutcome {
        let shadowed_by_default = self.defaults_enabled && self.defaults.contains(&rule);
        if shadowed_by_default || self.custom.contains(&rule) {
            log::debug!("Ignoring duplicate rule: {}", rule);
            return AddOutcome::Duplicate(rule);
        }
        log::debug!("Added custom rule: {}", rule);
        self.custom.insert(rule.clone());
        AddOutcome::Added(rule)
    }

    /// Adds one rule per line. Blank lines and duplicates are skipped;
    /// lines that fail to parse are returned.
    pub fn add_custom_lines(&mut self, text: &str) -> Vec<RejectedRule> {
        let mut rejected = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            match parse_rule_line(line) {
                Ok(Some(rule)) => {
                    self.add_rule(rule);
                }
                Ok(None) => {}
                Err(e) => {
                    log::warn!("Skipping invalid rule on line {}: '{}' ({})", idx + 1, line.trim(), e);
                    rejected.push(RejectedRule {
                        line: idx + 1,
                        text: line.trim().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        rejected
    }

    /// Removes a custom rule. Default rules are unaffected.
    pub fn remove_custom(&mut self, rule: &Rule) -> bool {
        let removed = self.custom.shift_remove(rule);
        if removed {
            log::debug!("Removed custom rule: {}", rule);
        }
        removed
    }

    /// Enabled defaults first, then custom rules in insertion order; a rule
    /// present in both partitions is listed once, as a default.
    pub fn list_active(&self) -> Vec<ActiveRule> {
        let mut active: Vec<ActiveRule> = Vec::new();
        if self.defaults_enabled {
            active.extend(self.defaults.iter().map(|rule| ActiveRule {
                rule: rule.clone(),
                is_default: true,
            }));
        }
        active.extend(
            self.custom
                .iter()
                .filter(|rule| !(self.defaults_enabled && self.defaults.contains(*rule)))
                .map(|rule| ActiveRule {
                    rule: rule.clone(),
                    is_default: false,
                }),
        );
        active
    }

    /// True when no rule participates in matching.
    pub fn is_noop(&self) -> bool {
        self.custom.is_empty() && (!self.defaults_enabled || self.defaults.is_empty())
    }

    fn active_rules(&self) -> impl Iterator<Item = &Rule> {
        let defaults = self.defaults.iter().filter(|_| self.defaults_enabled);
        defaults.chain(self.custom.iter())
    }

    pub fn is_excluded(&self, name: &str, kind: NodeKind, parent: &Path) -> bool {
        match self.active_rules().find(|rule| rule.matches(name, kind)) {
            Some(rule) => {
                log::trace!("Excluded '{}' in {} (rule {})", name, parent.display(), rule);
                true
            }
            None => false,
        }
    }

    /// Whether `path` (somewhere below `root`) is, or lies inside, an excluded
    /// entry. Intermediate components are checked as directories; the last
    /// component is checked as whatever it currently is on disk, and as
    /// either kind when it no longer exists.
    pub fn excludes_path(&self, root: &Path, path: &Path) -> bool {
        let Some(relative) = pathdiff::diff_paths(path, root) else {
            return false;
        };
        let names: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        if relative.components().any(|c| matches!(c, Component::ParentDir)) {
            return false;
        }

        let mut parent = root.to_path_buf();
        for (idx, name) in names.iter().enumerate() {
            let excluded = if idx + 1 < names.len() || path.is_dir() {
                self.is_excluded(name, NodeKind::Directory, &parent)
            } else if path.exists() {
                self.is_excluded(name, NodeKind::File, &parent)
            } else {
                self.is_excluded(name, NodeKind::Directory, &parent)
                    || self.is_excluded(name, NodeKind::File, &parent)
            };
            if excluded {
                return true;
            }
            parent.push(name);
        }
        false
    }
}
