//! The walk → merge → render pipeline as one call, plus a cache that reuses
//! the last generation while its inputs are unchanged.

use crate::error::{MergeError, WalkError};
use crate::merge::{Forest, Selection, merge};
use crate::render::{RenderOptions, render_with};
use crate::rules::RuleSet;
use crate::walk::{WalkWarning, walk_with_warnings};
use log;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootFailure {
    pub path: PathBuf,
    #[serde(serialize_with = "serialize_display")]
    pub error: WalkError,
}

/// Everything one run of the pipeline produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Generation {
    #[serde(serialize_with = "serialize_forest_result")]
    pub forest: Result<Forest, MergeError>,
    pub failures: Vec<RootFailure>,
    pub warnings: Vec<WalkWarning>,
}

impl Generation {
    pub fn forest(&self) -> Option<&Forest> {
        self.forest.as_ref().ok()
    }

    /// Rendered lines; empty when there is nothing to generate.
    pub fn render(&self, options: &RenderOptions) -> Vec<String> {
        self.forest()
            .map(|forest| render_with(forest, options))
            .unwrap_or_default()
    }

    pub fn text(&self, options: &RenderOptions) -> Option<String> {
        self.forest().map(|_| self.render(options).join("\n"))
    }
}

/// Walks every selected root, merges the survivors and reports the rest.
///
/// A root that fails to walk is listed in `failures` and the remaining roots
/// still appear in the forest. Roots are walked in parallel and reported in
/// selection order.
pub fn generate(selection: &Selection, rules: &RuleSet) -> Generation {
    log::debug!(
        "Generating tree for {} roots ({} active rules)",
        selection.len(),
        rules.list_active().len()
    );
    let roots: Vec<&PathBuf> = selection.iter().collect();
    let outcomes: Vec<_> = roots
        .par_iter()
        .map(|root| (*root, walk_with_warnings(root, rules)))
        .collect();

    let mut walked = Vec::with_capacity(selection.len());
    let mut failures = Vec::new();
    let mut warnings = Vec::new();
    for (root, outcome) in outcomes {
        match outcome {
            Ok(outcome) => {
                warnings.extend(outcome.warnings);
                walked.push((root.clone(), outcome.root));
            }
            Err(error) => {
                log::warn!("Skipping root {}: {}", root.display(), error);
                failures.push(RootFailure {
                    path: root.clone(),
                    error,
                });
            }
        }
    }

    Generation {
        forest: merge(walked),
        failures,
        warnings,
    }
}

/// Inputs of one generation. Two equal snapshots walk to the same result
/// as long as the filesystem is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub selection: Selection,
    pub rules: RuleSet,
}

#[derive(Debug, Default)]
pub struct TreeEngine {
    cached: Option<(Snapshot, Generation)>,
}

impl TreeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached generation when `selection` and `rules` match the
    /// last call, otherwise re-runs the pipeline.
    pub fn refresh(&mut self, selection: &Selection, rules: &RuleSet) -> &Generation {
        let stale = match &self.cached {
            Some((snapshot, _)) => snapshot.selection != *selection || snapshot.rules != *rules,
            None => true,
        };
        if stale {
            self.cached = None;
        } else {
            log::trace!("Inputs unchanged, reusing cached generation");
        }
        let (_, generation) = self.cached.get_or_insert_with(|| {
            let snapshot = Snapshot {
                selection: selection.clone(),
                rules: rules.clone(),
            };
            (snapshot, generate(selection, rules))
        });
        generation
    }

    /// Drops the cache, e.g. after the filesystem changed underneath it.
    pub fn invalidate(&mut self) {
        if self.cached.take().is_some() {
            log::debug!("Tree cache invalidated");
        }
    }

    pub fn cached(&self) -> Option<&Generation> {
        self.cached.as_ref().map(|(_, generation)| generation)
    }

    /// Whether a filesystem change at `path` can affect the cached result.
    /// Changes inside excluded entries of a selected root cannot.
    pub fn is_relevant_change(&self, path: &Path) -> bool {
        let Some((snapshot, _)) = &self.cached else {
            return true;
        };
        let owning_root = snapshot.selection.iter().find(|root| path.starts_with(root));
        match owning_root {
            Some(root) => !snapshot.rules.excludes_path(root, path),
            None => true,
        }
    }
}

fn serialize_display<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
    T: std::fmt::Display,
{
    serializer.collect_str(value)
}

fn serialize_forest_result<S>(value: &Result<Forest, MergeError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Ok(forest) => serde::Serialize::serialize(&forest.roots, serializer),
        Err(_) => serializer.serialize_none(),
    }
}
