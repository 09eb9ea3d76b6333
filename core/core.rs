pub mod config;
pub mod engine;
pub mod error;
pub mod merge;
pub mod node;
pub mod output_formats;
pub mod render;
pub mod rules;
pub mod walk;

pub use config::{
    Config, GeneralConfig, OutputConfig, ResolvedRules, RulesConfig, SaveConfig, WatchConfig, resolve_rules,
};
pub use engine::{Generation, RootFailure, Snapshot, TreeEngine, generate};
pub use error::{AppError, MergeError, ParseError, Result, WalkError};
pub use merge::{Forest, Selection, merge};
pub use node::{Annotation, Node, NodeKind, NodeSummary, TreeStats};
pub use output_formats::{get_default_ignore_patterns, get_default_ignore_rules};
pub use render::{RenderOptions, render, render_to_string, render_with};
pub use rules::{ActiveRule, AddOutcome, RejectedRule, Rule, RuleSet};
pub use walk::{WalkOutcome, WalkWarning, walk, walk_with_warnings};
