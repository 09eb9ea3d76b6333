use crate::cli_args::WatchArgs;
use crate::commands::generate::{self, OutputTargetArgs};
use crate::{
    ConfigOverrides, load_config_for_command, report_rejected_rules, resolve_rules_for_command,
    selection_from_args,
};
use anyhow::{Context, Result};
use colored::*;
use log;
use notify::{ErrorKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebouncedEvent, Debouncer, new_debouncer};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use treemaker_core::config::locate_import;
use treemaker_core::{Config, RuleSet, Selection, TreeEngine};

/// Inputs reloaded together whenever the config file changes.
struct WatchState {
    config: Config,
    rules: RuleSet,
}

fn load_state(base_dir: &Path, watch_args: &WatchArgs, quiet: bool) -> Result<WatchState> {
    let config = load_config_for_command(
        base_dir,
        &watch_args.project_config,
        &ConfigOverrides {
            rule_opts: Some(&watch_args.rule_opts),
            display: Some(&watch_args.display),
            format_output: Some(&watch_args.format_output),
            watch_delay: watch_args.watch_delay.as_ref(),
        },
    )?;
    let resolved = resolve_rules_for_command(&config, base_dir, Some(&watch_args.rule_opts))?;
    report_rejected_rules(&resolved, quiet);
    Ok(WatchState {
        config,
        rules: resolved.rules,
    })
}

fn watch_path(
    watcher: &mut Debouncer<RecommendedWatcher>,
    path: &Path,
    mode: RecursiveMode,
    watched_paths: &mut HashSet<PathBuf>,
    quiet: bool,
) {
    let path_to_watch = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    if !path_to_watch.exists() {
        log::trace!("Skipping watch for non-existent path: {}", path.display());
        return;
    }
    if watched_paths.contains(&path_to_watch) {
        log::trace!("Already watching: {}", path_to_watch.display());
        return;
    }
    match watcher.watcher().watch(&path_to_watch, mode) {
        Ok(_) => {
            log::debug!("Watching ({:?}): {}", mode, path_to_watch.display());
            watched_paths.insert(path_to_watch);
        }
        Err(e) => {
            if !quiet {
                eprintln!("{} Failed to watch {}: {}", "⚠️".yellow(), path.display(), e);
            }
            log::warn!("Failed to watch {}: {}", path.display(), e);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn setup_watches(
    base_dir: &Path,
    watch_args: &WatchArgs,
    selection: &Selection,
    state: &WatchState,
    watcher: &mut Debouncer<RecommendedWatcher>,
    current_watched: &mut HashSet<PathBuf>,
    quiet: bool,
    verbose: u8,
) -> Result<()> {
    log::debug!("Clearing {} previous watches.", current_watched.len());
    for path in current_watched.drain() {
        if let Err(e) = watcher.watcher().unwatch(&path) {
            match e.kind {
                ErrorKind::WatchNotFound => log::trace!("Watch not found for {}", path.display()),
                _ => log::warn!("Failed to unwatch {}: {}", path.display(), e),
            }
        }
    }

    for root in selection.iter() {
        watch_path(watcher, root, RecursiveMode::Recursive, current_watched, quiet);
    }

    for import in &state.config.rules.import {
        match locate_import(base_dir, import) {
            Some(path) => watch_path(watcher, &path, RecursiveMode::NonRecursive, current_watched, quiet),
            None => log::warn!("Could not find imported rule file to watch: {}", import.display()),
        }
    }
    for file in &watch_args.rule_opts.ignore_file {
        watch_path(watcher, file, RecursiveMode::NonRecursive, current_watched, quiet);
    }

    if let Some(config_path) = active_config_path(base_dir, watch_args)? {
        watch_path(watcher, &config_path, RecursiveMode::NonRecursive, current_watched, quiet);
    }

    if current_watched.is_empty() {
        if !quiet {
            println!("{}", "⚠️ No roots or rule files found to watch.".yellow());
        }
    } else if !quiet && verbose > 0 {
        println!("🔍 Watching {} paths...", current_watched.len());
    }
    Ok(())
}

fn active_config_path(base_dir: &Path, watch_args: &WatchArgs) -> Result<Option<PathBuf>> {
    Ok(Config::locate_config_file(
        base_dir,
        watch_args.project_config.config_file.as_deref(),
        watch_args.project_config.disable_config_file,
    )?)
}

/// Whether any event touched a rule source: the config file, an imported rule
/// file or an `--ignore-file`.
fn rule_sources_changed(
    events: &[DebouncedEvent],
    base_dir: &Path,
    watch_args: &WatchArgs,
    state: &WatchState,
) -> bool {
    let mut sources: Vec<PathBuf> = Vec::new();
    if let Ok(Some(config_path)) = active_config_path(base_dir, watch_args) {
        sources.push(config_path);
    }
    sources.extend(
        state
            .config
            .rules
            .import
            .iter()
            .filter_map(|import| locate_import(base_dir, import)),
    );
    sources.extend(watch_args.rule_opts.ignore_file.iter().cloned());

    let canonical: Vec<PathBuf> = sources
        .iter()
        .map(|p| p.canonicalize().unwrap_or_else(|_| p.clone()))
        .collect();
    events.iter().any(|event| {
        let event_path = event.path.canonicalize().unwrap_or_else(|_| event.path.clone());
        canonical.contains(&event_path)
    })
}

fn redraw(
    engine: &mut TreeEngine,
    selection: &Selection,
    state: &WatchState,
    base_dir: &Path,
    watch_args: &WatchArgs,
    quiet: bool,
    verbose: u8,
) -> Result<()> {
    if watch_args.clear || state.config.watch.clear_screen {
        clearscreen::clear().context("Failed to clear screen")?;
    }
    let output_target_args = OutputTargetArgs {
        save: &watch_args.save,
        stdout: watch_args.save.is_none(),
        filter: &watch_args.display.filter,
    };
    generate::trigger_generation(
        engine,
        selection,
        &state.rules,
        &state.config,
        base_dir,
        &output_target_args,
        quiet,
        verbose,
    )
}

pub fn run_watch_mode(watch_args: WatchArgs, quiet: bool, verbose: u8) -> Result<()> {
    let base_dir = Config::determine_base_dir(watch_args.project_config.base_dir.as_ref())
        .context("Failed to determine base directory for watch mode")?;
    let selection = selection_from_args(&watch_args.roots)?;

    if !quiet {
        let roots: Vec<String> = selection.iter().map(|r| r.display().to_string()).collect();
        println!(
            "👀 Starting watch mode for '{}'. Press Ctrl+C to exit.",
            roots.join("', '")
        );
    }

    let mut state = load_state(&base_dir, &watch_args, quiet)
        .context("Failed to load initial configuration for watch mode")?;
    let mut engine = TreeEngine::new();

    if let Err(e) = redraw(&mut engine, &selection, &state, &base_dir, &watch_args, quiet, verbose) {
        if !quiet {
            eprintln!("{} {:#}\n", "⚠️ Error during initial generation:".yellow(), e);
        }
    }

    let (tx, rx) = mpsc::channel();
    let delay_duration = state
        .config
        .get_watch_delay()
        .context("Invalid watch delay duration")?;
    let mut debouncer = new_debouncer(delay_duration, tx)
        .map_err(|e| anyhow::anyhow!("Failed to create debouncer: {}", e))?;
    let mut watched_paths = HashSet::new();
    setup_watches(
        &base_dir,
        &watch_args,
        &selection,
        &state,
        &mut debouncer,
        &mut watched_paths,
        quiet,
        verbose,
    )?;

    loop {
        let debounced_events = match rx.recv() {
            Ok(Ok(events)) => events,
            Ok(Err(error)) => {
                if !quiet {
                    eprintln!("{} {:#}\n", "⚠️ Watch error:".yellow(), error);
                }
                log::error!("Notify error received: {:?}", error);
                continue;
            }
            Err(e) => {
                eprintln!("{} {:#}\n", "⛔ Watcher channel error:".red(), e);
                break Ok(());
            }
        };
        if debounced_events.is_empty() {
            log::trace!("Received empty debounced event list.");
            continue;
        }
        for event in &debounced_events {
            log::trace!("Debounced event: {:?}", event);
        }

        if rule_sources_changed(&debounced_events, &base_dir, &watch_args, &state) {
            if !quiet && verbose > 0 {
                eprintln!("{}", "🔄 Rule sources changed. Reloading configuration...".blue());
            }
            match load_state(&base_dir, &watch_args, quiet) {
                Ok(reloaded) => {
                    state = reloaded;
                    engine.invalidate();
                    if let Err(e) = setup_watches(
                        &base_dir,
                        &watch_args,
                        &selection,
                        &state,
                        &mut debouncer,
                        &mut watched_paths,
                        quiet,
                        verbose,
                    ) {
                        if !quiet {
                            eprintln!("{} {:#}", "⚠️ Error setting up watches after reload:".yellow(), e);
                        }
                    }
                }
                Err(e) => {
                    if !quiet {
                        eprintln!("{} {:#}\n", "⚠️ Error reloading config:".yellow(), e);
                    }
                    continue;
                }
            }
        } else if debounced_events
            .iter()
            .all(|event| !engine.is_relevant_change(&event.path))
        {
            log::debug!(
                "Ignoring {} event(s) inside excluded entries.",
                debounced_events.len()
            );
            continue;
        } else {
            // The tree on disk changed while the inputs stayed equal.
            engine.invalidate();
        }

        if !quiet && verbose > 0 {
            eprintln!(
                "\n{} {} event(s) detected. Regenerating tree...",
                "🔄".blue(),
                debounced_events.len()
            );
        }
        if let Err(e) = redraw(&mut engine, &selection, &state, &base_dir, &watch_args, quiet, verbose) {
            if !quiet {
                eprintln!("{} {:#}\n", "⚠️ Error during regeneration:".yellow(), e);
            }
        }
    }
}
