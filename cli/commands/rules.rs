use crate::cli_args::RulesArgs;
use crate::output::{print_data_or_text, print_rules_table};
use crate::{ConfigOverrides, load_config_for_command, report_rejected_rules, resolve_rules_for_command};
use anyhow::{Context, Result};
use colored::*;
use serde::Serialize;
use std::path::Path;
use treemaker_core::{ActiveRule, Config, NodeKind, RuleSet};

#[derive(Debug, Serialize)]
struct RuleCheck<'a> {
    name: &'a str,
    kind: NodeKind,
    excluded: bool,
    matched_by: Option<String>,
}

pub fn handle_rules_command(args: RulesArgs, quiet: bool) -> Result<()> {
    let base_dir = Config::determine_base_dir(args.project_config.base_dir.as_ref())
        .context("Failed to determine base directory")?;
    let config = load_config_for_command(
        &base_dir,
        &args.project_config,
        &ConfigOverrides {
            rule_opts: Some(&args.rule_opts),
            format_output: Some(&args.format_output),
            ..ConfigOverrides::default()
        },
    )
    .context("Failed to load configuration for rules command")?;
    let resolved = resolve_rules_for_command(&config, &base_dir, Some(&args.rule_opts))
        .context("Failed to resolve ignore rules")?;
    report_rejected_rules(&resolved, quiet);

    match &args.check {
        Some(name) => {
            let kind = if args.as_dir {
                NodeKind::Directory
            } else {
                NodeKind::File
            };
            let check = check_name(&resolved.rules, name, kind, &base_dir);
            let text = match &check.matched_by {
                Some(rule) => format!("{} '{}' is excluded by rule {}", "✗".red(), name, rule.cyan()),
                None => format!("{} '{}' is kept", "✓".green(), name),
            };
            print_data_or_text(&check, Some(text), &args.format_output, "text")
        }
        None => {
            let active = resolved.rules.list_active();
            if args.format_output.format.as_deref().unwrap_or("text") == "text" {
                if !quiet {
                    println!(
                        "{} Built-in defaults {}",
                        "ℹ".blue(),
                        if resolved.rules.defaults_enabled() {
                            "enabled".green()
                        } else {
                            "disabled".yellow()
                        }
                    );
                }
                print_rules_table(&active);
                Ok(())
            } else {
                print_data_or_text::<Vec<ActiveRule>>(&active, None, &args.format_output, "json")
            }
        }
    }
}

fn check_name<'a>(rules: &RuleSet, name: &'a str, kind: NodeKind, parent: &Path) -> RuleCheck<'a> {
    let matched_by = rules
        .list_active()
        .into_iter()
        .find(|active| active.rule.matches(name, kind))
        .map(|active| active.rule.to_string());
    RuleCheck {
        name,
        kind,
        excluded: rules.is_excluded(name, kind, parent),
        matched_by,
    }
}
