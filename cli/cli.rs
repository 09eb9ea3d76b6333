mod cli_args;
mod commands;
mod output;
mod watch;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use log;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use cli_args::{Cli, Commands, FormatOutputOpts, ProjectConfigOpts, RuleOpts, TreeDisplayOpts};
use treemaker_core::{AppError, Config, ResolvedRules, Selection, config::expand_path, resolve_rules};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;
    let verbose = cli_args.verbose;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet, verbose) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = match e.downcast_ref::<AppError>() {
                Some(AppError::Config(_)) => 1,
                Some(AppError::TomlParse(_)) => 1,
                Some(AppError::TomlSerialize(_)) => 1,
                Some(AppError::DataLoading(_)) => 1,
                Some(AppError::Io(_)) => 2,
                Some(AppError::FileRead { .. }) => 2,
                Some(AppError::FileWrite { .. }) => 2,
                Some(AppError::Walk(_)) => 2,
                Some(AppError::Merge(_)) => 2,
                Some(AppError::Rule(_)) => 5,
                Some(AppError::InvalidArgument(_)) => 5,
                Some(AppError::DurationParse(_)) => 5,
                Some(AppError::JsonSerialize(_)) => 6,
                Some(AppError::YamlError(_)) => 6,
                Some(_) => 1,
                None => 1,
            };

            if !quiet || exit_code == 1 || exit_code == 5 {
                eprintln!("{} {:#}\n", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }

            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool, verbose: u8) -> Result<()> {
    match cli.command {
        None => {
            Cli::command().print_help()?;
        }
        Some(command) => match command {
            Commands::Completion(args) => {
                log::debug!("Executing 'completion' command...");
                commands::completion::handle_completion_command(&args, quiet)?;
            }
            Commands::Config(args) => {
                log::debug!("Executing 'config' command...");
                let base_dir = Config::determine_base_dir(args.project_config.base_dir.as_ref())
                    .context("Failed to determine base directory for config command")?;
                commands::config::handle_config_command(&args, &base_dir, quiet)?;
            }
            Commands::Generate(args) => {
                log::debug!("Executing 'generate' command...");
                commands::generate::handle_generate_command(args, quiet, verbose)?;
            }
            Commands::Watch(args) => {
                log::debug!("Executing 'watch' command...");
                watch::run_watch_mode(args, quiet, verbose)?;
            }
            Commands::Rules(args) => {
                log::debug!("Executing 'rules' command...");
                commands::rules::handle_rules_command(args, quiet)?;
            }
            Commands::Debug(args) => {
                log::debug!("Executing 'debug' command...");
                commands::debug::handle_debug_command(args, quiet, verbose)?;
            }
        },
    }
    Ok(())
}

/// Command-line values that can override the loaded configuration.
#[derive(Default)]
pub struct ConfigOverrides<'a> {
    pub rule_opts: Option<&'a RuleOpts>,
    pub display: Option<&'a TreeDisplayOpts>,
    pub format_output: Option<&'a FormatOutputOpts>,
    pub watch_delay: Option<&'a String>,
}

fn merge_config_with_cli_overrides(mut config: Config, overrides: &ConfigOverrides) -> Config {
    log::trace!("Applying CLI overrides to config...");

    if let Some(rule_opts) = overrides.rule_opts {
        if rule_opts.no_defaults {
            config.general.include_defaults = false;
        }
        if rule_opts.with_defaults {
            config.general.include_defaults = true;
        }
        // CLI rules go after the configured ones.
        config.rules.custom.extend(rule_opts.ignore.iter().cloned());
    }

    if let Some(display) = overrides.display {
        if display.dir_suffix {
            config.output.dir_suffix = true;
        }
        if display.annotate {
            config.output.show_annotations = true;
        }
    }

    if let Some(fmt_opts) = overrides.format_output {
        if let Some(format) = &fmt_opts.format {
            config.output.format = format.clone();
        }
        if fmt_opts.disable_json_minify {
            config.output.json_minify = false;
        }
        if fmt_opts.enable_json_minify {
            config.output.json_minify = true;
        }
    }

    if let Some(delay) = overrides.watch_delay {
        config.watch.delay = delay.clone();
    }

    log::trace!("Config after CLI overrides: {:?}", config);
    config
}

pub fn load_config_for_command(
    base_dir: &Path,
    project_opts: &ProjectConfigOpts,
    overrides: &ConfigOverrides,
) -> Result<Config> {
    let config_path = Config::locate_config_file(
        base_dir,
        project_opts.config_file.as_deref(),
        project_opts.disable_config_file,
    )
    .context("Failed to resolve configuration path")?;

    let config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    Ok(merge_config_with_cli_overrides(config, overrides))
}

/// Resolves the configured rules and then appends `--ignore-file` contents.
///
/// Unlike config imports, a missing `--ignore-file` is an error.
pub fn resolve_rules_for_command(
    config: &Config,
    base_dir: &Path,
    rule_opts: Option<&RuleOpts>,
) -> Result<ResolvedRules> {
    let mut resolved = resolve_rules(&config.rules, config.general.include_defaults, base_dir);
    if let Some(rule_opts) = rule_opts {
        for file in &rule_opts.ignore_file {
            let path = expand_path(&file.to_string_lossy());
            let content = fs::read_to_string(&path).map_err(|e| AppError::FileRead {
                path: path.clone(),
                source: e,
            })?;
            let origin = path.display().to_string();
            for rejection in resolved.rules.add_custom_lines(&content) {
                resolved.rejected.push((origin.clone(), rejection));
            }
        }
    }
    Ok(resolved)
}

/// Roots in the order given, or the current directory when none are.
pub fn selection_from_args(roots: &[PathBuf]) -> Result<Selection> {
    if roots.is_empty() {
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        return Ok([cwd].into_iter().collect());
    }
    let mut selection = Selection::new();
    for root in roots {
        let expanded = expand_path(&root.to_string_lossy());
        if !selection.add(&expanded) {
            log::warn!("Root '{}' given more than once; keeping first position.", root.display());
        }
    }
    Ok(selection)
}

pub fn report_rejected_rules(resolved: &ResolvedRules, quiet: bool) {
    if quiet {
        return;
    }
    for (origin, rejected) in &resolved.rejected {
        eprintln!(
            "{} {}:{}: '{}' ({})",
            "Skipped rule".yellow(),
            origin,
            rejected.line,
            rejected.text,
            rejected.error
        );
    }
}
