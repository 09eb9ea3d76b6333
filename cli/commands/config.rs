use crate::cli_args::ConfigArgs;
use crate::commands::completion::confirm_overwrite;
use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::Path;
use treemaker_core::Config;
use treemaker_core::config::{DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME};

pub fn handle_config_command(args: &ConfigArgs, base_dir: &Path, quiet: bool) -> Result<()> {
    let content = default_config_toml()?;

    if !args.save {
        print!("{}", content);
        return Ok(());
    }

    let config_dir = base_dir.join(DEFAULT_CONFIG_DIR);
    let save_path = config_dir.join(DEFAULT_CONFIG_FILENAME);
    if save_path.exists() && !confirm_overwrite(&save_path, quiet)? {
        println!("Save cancelled.");
        return Ok(());
    }

    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create directory {}", config_dir.display()))?;
    fs::write(&save_path, &content)
        .with_context(|| format!("Failed to write config to {}", save_path.display()))?;

    if !quiet {
        println!(
            "{} Default config saved to: {}",
            "✅".green(),
            save_path.display().to_string().blue()
        );
    }
    Ok(())
}

/// The default configuration as TOML, with a commented rule example.
fn default_config_toml() -> Result<String> {
    let body = Config::default()
        .to_toml_string()
        .context("Failed to serialize default config")?;
    Ok(format!(
        "# treemaker configuration\n\
         # Custom rules: 'name/' for directories, '\"*.ext\"' for extensions,\n\
         # anything else for an exact file name. Example:\n\
         #   custom = [\"target/\", '\"*.log\"']\n\n{}",
        body
    ))
}
