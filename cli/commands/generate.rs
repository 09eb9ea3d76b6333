use crate::cli_args::GenerateArgs;
use crate::output;
use crate::{
    ConfigOverrides, load_config_for_command, report_rejected_rules, resolve_rules_for_command,
    selection_from_args,
};
use anyhow::{Context, Result};
use log;
use std::path::{Path, PathBuf};
use treemaker_core::{Config, Generation, RuleSet, Selection, TreeEngine};

pub fn handle_generate_command(args: GenerateArgs, quiet: bool, verbose: u8) -> Result<()> {
    let base_dir = Config::determine_base_dir(args.project_config.base_dir.as_ref())
        .context("Failed to determine base directory")?;
    log::info!("Base directory determined: {}", base_dir.display());

    let config = load_config_for_command(
        &base_dir,
        &args.project_config,
        &ConfigOverrides {
            rule_opts: Some(&args.rule_opts),
            display: Some(&args.display),
            format_output: Some(&args.format_output),
            watch_delay: None,
        },
    )
    .context("Failed to load configuration")?;

    let resolved = resolve_rules_for_command(&config, &base_dir, Some(&args.rule_opts))
        .context("Failed to resolve ignore rules")?;
    report_rejected_rules(&resolved, quiet);

    let selection = selection_from_args(&args.roots)?;

    let output_target_args = OutputTargetArgs {
        save: &args.save,
        stdout: args.stdout,
        filter: &args.display.filter,
    };

    let mut engine = TreeEngine::new();
    trigger_generation(
        &mut engine,
        &selection,
        &resolved.rules,
        &config,
        &base_dir,
        &output_target_args,
        quiet,
        verbose,
    )
}

// Called by both `generate` and `watch`.
#[allow(clippy::too_many_arguments)]
pub fn trigger_generation(
    engine: &mut TreeEngine,
    selection: &Selection,
    rules: &RuleSet,
    config: &Config,
    base_dir: &Path,
    output_target_args: &OutputTargetArgs,
    quiet: bool,
    verbose: u8,
) -> Result<()> {
    log::info!("Starting tree generation for {} roots", selection.len());

    let generation: &Generation = engine.refresh(selection, rules);
    output::report_generation_problems(generation, quiet);

    if verbose > 0 && !quiet {
        if let Some(forest) = generation.forest() {
            let stats = forest.stats();
            log::info!(
                "Generated {} directories and {} files ({} annotated)",
                stats.directories,
                stats.files,
                stats.annotated
            );
        }
    }

    let output_target_path = output_target_args
        .save
        .as_ref()
        .map(|cli_save| resolve_save_path(config, cli_save.as_ref(), base_dir));
    match &output_target_path {
        Some(path) => log::debug!("Output target set to file: {}", path.display()),
        None if output_target_args.stdout => log::debug!("Output target set to stdout (forced)."),
        None => log::debug!("Output target set to stdout (default)."),
    }

    output::print_tree_or_save(
        generation,
        config,
        output_target_args.filter,
        output_target_path.as_deref(),
        quiet,
    )
}

pub struct OutputTargetArgs<'a> {
    pub save: &'a Option<Option<PathBuf>>,
    pub stdout: bool,
    pub filter: &'a [String],
}

/// The CLI path when given, else `[save] output_file`; relative paths are
/// taken from the base directory.
pub fn resolve_save_path(config: &Config, cli_path: Option<&PathBuf>, base_dir: &Path) -> PathBuf {
    let path = match cli_path {
        Some(path) => {
            log::trace!("Save path explicitly provided via CLI: {}", path.display());
            path.clone()
        }
        None => {
            log::trace!(
                "Save flag used without path, using configured/default output file: {}",
                config.save.output_file.display()
            );
            config.save.output_file.clone()
        }
    };
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}
