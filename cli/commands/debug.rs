use crate::cli_args::DebugArgs;
use crate::output::{print_data_or_text, print_rules_table};
use crate::{ConfigOverrides, load_config_for_command, resolve_rules_for_command, selection_from_args};
use anyhow::{Context, Result};
use colored::*;
use log;
use pathdiff;
use serde::Serialize;
use std::path::{Path, PathBuf};
use toml;
use treemaker_core::{ActiveRule, Config, RejectedRule, RootFailure, TreeStats, WalkWarning, generate};

#[derive(Debug, Serialize)]
struct RejectedLine<'a> {
    origin: &'a str,
    #[serde(flatten)]
    rejected: &'a RejectedRule,
}

#[derive(Debug, Serialize)]
struct DebugInfo<'a> {
    effective_config: &'a Config,
    base_dir: &'a Path,
    roots: Vec<PathBuf>,
    active_rules: Vec<ActiveRule>,
    rejected_rules: Vec<RejectedLine<'a>>,
    failures: &'a [RootFailure],
    warnings: &'a [WalkWarning],
    stats: Option<TreeStats>,
}

pub fn handle_debug_command(args: DebugArgs, _quiet: bool, _verbose: u8) -> Result<()> {
    let base_dir = Config::determine_base_dir(args.project_config.base_dir.as_ref())
        .context("Failed to determine base directory")?;
    log::info!("Base directory determined: {}", base_dir.display());

    let config = load_config_for_command(
        &base_dir,
        &args.project_config,
        &ConfigOverrides {
            rule_opts: Some(&args.rule_opts),
            ..ConfigOverrides::default()
        },
    )
    .context("Failed to load configuration for debug command")?;

    log::debug!("Debug: Resolving rules...");
    let resolved = resolve_rules_for_command(&config, &base_dir, Some(&args.rule_opts))
        .context("Failed to resolve rules for debug")?;

    let selection = selection_from_args(&args.roots)?;
    log::debug!("Debug: Walking {} roots...", selection.len());
    let generation = generate(&selection, &resolved.rules);

    let debug_data = DebugInfo {
        effective_config: &config,
        base_dir: &base_dir,
        roots: selection.iter().cloned().collect(),
        active_rules: resolved.rules.list_active(),
        rejected_rules: resolved
            .rejected
            .iter()
            .map(|(origin, rejected)| RejectedLine { origin, rejected })
            .collect(),
        failures: &generation.failures,
        warnings: &generation.warnings,
        stats: generation.forest().map(|forest| forest.stats()),
    };

    if args.format_output.format.is_none() {
        print_debug_info_pretty(&debug_data)?;
    } else {
        print_data_or_text(&debug_data, None, &args.format_output, "json")?;
    }
    Ok(())
}

fn print_debug_info_pretty(debug_info: &DebugInfo) -> Result<()> {
    println!(
        "{}",
        "\n--- Effective Configuration ---"
            .green()
            .bold()
            .underline()
    );
    let config_toml = toml::to_string_pretty(debug_info.effective_config)
        .context("Failed to serialize effective config to TOML")?;
    println!("{}", config_toml);

    print_path_list("Selected Roots", &relative_paths(&debug_info.roots, debug_info.base_dir));

    println!("{}", "\n--- Active Rules ---".green().bold().underline());
    print_rules_table(&debug_info.active_rules);

    println!("{}", "\n--- Rejected Rule Lines ---".green().bold().underline());
    if debug_info.rejected_rules.is_empty() {
        println!("{}", "(None)".dimmed());
    } else {
        for line in &debug_info.rejected_rules {
            println!(
                "- {}:{} '{}' {}",
                line.origin.blue(),
                line.rejected.line,
                line.rejected.text.cyan(),
                line.rejected.error.dimmed()
            );
        }
    }

    println!("{}", "\n--- Root Failures ---".green().bold().underline());
    if debug_info.failures.is_empty() {
        println!("{}", "(None)".dimmed());
    } else {
        for failure in debug_info.failures {
            println!("- {} {}", failure.path.display().to_string().cyan(), failure.error.to_string().yellow());
        }
    }

    let warnings: Vec<String> = debug_info.warnings.iter().map(|w| w.describe()).collect();
    print_path_list("Walk Warnings", &warnings);

    println!("{}", "\n--- Tree Statistics ---".green().bold().underline());
    match &debug_info.stats {
        Some(stats) => {
            println!("{:<15} {}", "Directories:".green(), stats.directories.to_string().cyan());
            println!("{:<15} {}", "Files:".green(), stats.files.to_string().cyan());
            println!("{:<15} {}", "Annotated:".green(), stats.annotated.to_string().cyan());
        }
        None => println!("{}", "(Nothing generated)".dimmed()),
    }

    println!("{}", "\n--- End Debug Info ---".green().bold());
    Ok(())
}

fn relative_paths(paths: &[PathBuf], base_dir: &Path) -> Vec<String> {
    paths
        .iter()
        .map(|p| {
            pathdiff::diff_paths(p, base_dir)
                .filter(|rel| !rel.as_os_str().is_empty())
                .map(|rel| rel.to_string_lossy().to_string())
                .unwrap_or_else(|| p.to_string_lossy().to_string())
        })
        .collect()
}

fn print_path_list(title: &str, items: &[String]) {
    println!(
        "{}",
        format!("\n--- {} ---", title).green().bold().underline()
    );
    if items.is_empty() {
        println!("{}", "(None)".dimmed());
    } else {
        items.iter().for_each(|p| println!("- {}", p.cyan()));
    }
}
