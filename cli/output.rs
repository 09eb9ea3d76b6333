use anyhow::{Context, Result};
use colored::*;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use treemaker_core::{
    ActiveRule, Config, Forest, Generation, RootFailure, WalkWarning, output_formats, render_to_string,
};

use crate::cli_args::FormatOutputOpts;

/// Machine-readable form of one generation, after the name filter.
#[derive(Debug, Serialize)]
pub struct TreeReport<'a> {
    pub roots: &'a [treemaker_core::Node],
    pub failures: &'a [RootFailure],
    pub warnings: &'a [WalkWarning],
}

/// The forest to present: the merged result narrowed by `filter`, or `None`
/// when nothing could be generated.
pub fn presented_forest(generation: &Generation, filter: &[String]) -> Option<Forest> {
    let forest = generation.forest()?;
    if filter.is_empty() {
        Some(forest.clone())
    } else {
        log::debug!("Applying name filter: {:?}", filter);
        Some(forest.filter_by_name(filter))
    }
}

pub fn print_tree_or_save(
    generation: &Generation,
    config: &Config,
    filter: &[String],
    output_path: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let Some(forest) = presented_forest(generation, filter) else {
        if !quiet {
            eprintln!("{}", "Nothing to generate: no root could be walked.".yellow());
        }
        return Ok(());
    };

    let content = match config.output.format.to_lowercase().as_str() {
        "text" => render_to_string(&forest, &config.render_options()),
        format => {
            let report = TreeReport {
                roots: &forest.roots,
                failures: &generation.failures,
                warnings: &generation.warnings,
            };
            serialize_output(&report, format, !config.output.json_minify)?
        }
    };

    match output_path {
        Some(path) => {
            write_to_file(path, &content)?;
            if !quiet {
                println!(
                    "{} Tree saved to: {}",
                    "✅".green(),
                    path.display().to_string().blue()
                );
            }
        }
        None => {
            write_to_stdout(&content)?;
        }
    }
    Ok(())
}

/// Failed roots and walk warnings go to stderr; they never stop output.
pub fn report_generation_problems(generation: &Generation, quiet: bool) {
    if quiet {
        return;
    }
    for failure in &generation.failures {
        eprintln!(
            "{} {}: {}",
            "⚠️ Skipped root".yellow(),
            failure.path.display(),
            failure.error
        );
    }
    for warning in &generation.warnings {
        eprintln!("{} {}", "⚠️".yellow(), warning.describe());
    }
}

// Helper for commands that might output structured data or plain text
pub fn print_data_or_text<T: Serialize>(
    data: &T,
    plain_text: Option<String>,
    format_opts: &FormatOutputOpts,
    default_format: &str,
) -> Result<()> {
    let format = format_opts
        .format
        .as_deref()
        .unwrap_or(default_format)
        .to_lowercase();

    if format == "text" {
        match plain_text {
            Some(text) => write_to_stdout(&text),
            None => {
                let content = output_formats::serialize_to_json(data, true)?;
                write_to_stdout(&content)
            }
        }
    } else {
        let pretty_json = format_opts.disable_json_minify;
        let content = serialize_output(data, &format, pretty_json)?;
        write_to_stdout(&content)
    }
}

pub fn print_rules_table(rules: &[ActiveRule]) {
    if rules.is_empty() {
        println!("{}", "(No active rules)".dimmed());
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Rule").fg(Color::Green),
        Cell::new("Kind").fg(Color::Green),
        Cell::new("Origin").fg(Color::Green),
    ]);
    for active in rules {
        let (origin, color) = if active.is_default {
            ("default", Color::Cyan)
        } else {
            ("custom", Color::Blue)
        };
        table.add_row(vec![
            Cell::new(active.rule.to_string()).fg(Color::White),
            Cell::new(active.rule.kind_label()).fg(Color::DarkGrey),
            Cell::new(origin).fg(color),
        ]);
    }
    println!("{table}");
}

fn serialize_output<T: Serialize>(data: &T, format: &str, pretty_json: bool) -> Result<String> {
    match format.to_lowercase().as_str() {
        "yaml" | "yml" => output_formats::serialize_to_yaml(data).map_err(anyhow::Error::from),
        _ => output_formats::serialize_to_json(data, pretty_json).map_err(anyhow::Error::from),
    }
}

pub fn write_to_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut file =
        File::create(path).with_context(|| format!("Failed to create file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to file {}", path.display()))?;
    if !content.ends_with('\n') {
        file.write_all(b"\n")
            .with_context(|| format!("Failed to write to file {}", path.display()))?;
    }
    Ok(())
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}
