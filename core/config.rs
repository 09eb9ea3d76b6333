use crate::error::{AppError, Result};
use crate::render::RenderOptions;
use crate::rules::{RejectedRule, RuleSet};
use log;
use parse_duration::parse;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_DIR: &str = ".treemaker";
pub const DEFAULT_CONFIG_FILENAME: &str = "treemaker.toml";
pub const DEFAULT_OUTPUT_FILE: &str = "tree_output.txt";
pub const DEFAULT_WATCH_DELAY: &str = "300ms";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub save: SaveConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    #[serde(default = "default_true")]
    pub include_defaults: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RulesConfig {
    /// Custom rules in the rule grammar, e.g. `target/`, `"*.log"`.
    #[serde(default)]
    pub custom: Vec<String>,
    /// Rule files, one rule per line, relative to the base directory or the
    /// config directory.
    #[serde(default)]
    pub import: Vec<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_true")]
    pub json_minify: bool,
    #[serde(default = "default_false")]
    pub dir_suffix: bool,
    #[serde(default = "default_false")]
    pub show_annotations: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SaveConfig {
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    #[serde(default = "default_watch_delay_string")]
    pub delay: String,
    #[serde(default = "default_false")]
    pub clear_screen: bool,
}

fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_format() -> String {
    "text".to_string()
}
fn default_output_file() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_FILE)
}
fn default_watch_delay_string() -> String {
    DEFAULT_WATCH_DELAY.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            rules: RulesConfig::default(),
            output: OutputConfig::default(),
            save: SaveConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}
impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            include_defaults: default_true(),
        }
    }
}
impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            json_minify: default_true(),
            dir_suffix: default_false(),
            show_annotations: default_false(),
        }
    }
}
impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            output_file: default_output_file(),
        }
    }
}
impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            delay: default_watch_delay_string(),
            clear_screen: default_false(),
        }
    }
}

impl Config {
    /// Directory the config file and relative rule imports are resolved
    /// against: the CLI value, then `TREEMAKER_BASE_DIR`, then the cwd.
    pub fn determine_base_dir(cli_base_dir: Option<&PathBuf>) -> Result<PathBuf> {
        let path_str_opt = cli_base_dir
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| env::var("TREEMAKER_BASE_DIR").ok().filter(|s| !s.is_empty()));

        let path_to_resolve = match path_str_opt {
            Some(p_str) => expand_path(&p_str),
            None => env::current_dir().map_err(AppError::Io)?,
        };

        path_to_resolve.canonicalize().map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to canonicalize base directory '{}': {}",
                    path_to_resolve.display(),
                    e
                ),
            ))
        })
    }

    /// The config file to load: `requested` when given, else the project
    /// default if it exists. `None` when loading is disabled.
    pub fn locate_config_file(
        base_dir: &Path,
        requested: Option<&str>,
        disabled: bool,
    ) -> Result<Option<PathBuf>> {
        if disabled {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }
        match requested {
            Some(requested) => requested_config_file(base_dir, requested).map(Some),
            None => Ok(project_config_file(base_dir)),
        }
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&toml_content).map_err(|e| match e {
            AppError::TomlParse(msg) => AppError::TomlParse(format!(
                "Error parsing config file '{}': {}",
                config_path.display(),
                msg
            )),
            other => other,
        })
    }

    pub fn from_toml_str(toml_content: &str) -> Result<Self> {
        toml::from_str::<Config>(toml_content).map_err(|e| {
            AppError::TomlParse(format!("{}. Check TOML syntax and structure.", e))
        })
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn get_watch_delay(&self) -> Result<Duration> {
        parse(&self.watch.delay).map_err(|e| {
            AppError::InvalidArgument(format!(
                "Invalid watch delay duration '{}': {}. Use format like '500ms', '2s'.",
                self.watch.delay, e
            ))
        })
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            dir_suffix: self.output.dir_suffix,
            show_annotations: self.output.show_annotations,
        }
    }
}

/// A rule set assembled from configuration, with the lines that were rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRules {
    pub rules: RuleSet,
    pub rejected: Vec<(String, RejectedRule)>,
}

/// Builds the effective rule set: built-in defaults (toggled by
/// `include_defaults`), then inline custom rules, then imported rule files.
///
/// Invalid rules never abort resolution; they are logged and returned in
/// `rejected`, keyed by where they came from.
pub fn resolve_rules(rules_config: &RulesConfig, include_defaults: bool, base_dir: &Path) -> ResolvedRules {
    let mut rules = RuleSet::new();
    rules.set_defaults_enabled(include_defaults);
    let mut rejected = Vec::new();

    let inline = rules_config.custom.join("\n");
    for rejection in rules.add_custom_lines(&inline) {
        rejected.push(("config".to_string(), rejection));
    }

    if !rules_config.import.is_empty() {
        log::debug!("Loading imported rules from: {:?}", rules_config.import);
    }
    for import_path_rel in &rules_config.import {
        let Some(import_path) = locate_import(base_dir, import_path_rel) else {
            log::warn!(
                "Could not find imported rule file '{}' relative to base directory or config dir. Skipping.",
                import_path_rel.display()
            );
            continue;
        };
        match fs::read_to_string(&import_path) {
            Ok(content) => {
                let origin = import_path.display().to_string();
                for rejection in rules.add_custom_lines(&content) {
                    rejected.push((origin.clone(), rejection));
                }
                log::trace!("Loaded imported rules: {}", import_path.display());
            }
            Err(e) => {
                log::warn!(
                    "Failed to read imported rule file '{}': {}",
                    import_path.display(),
                    e
                );
            }
        }
    }

    log::info!(
        "Resolved {} active rules ({} rejected).",
        rules.list_active().len(),
        rejected.len()
    );
    ResolvedRules { rules, rejected }
}

pub fn locate_import(base_dir: &Path, import_path_rel: &Path) -> Option<PathBuf> {
    let expanded = expand_path(&import_path_rel.to_string_lossy());
    let direct = base_dir.join(&expanded);
    if direct.exists() {
        return Some(direct);
    }
    let in_config_dir = base_dir.join(DEFAULT_CONFIG_DIR).join(&expanded);
    if in_config_dir.exists() {
        log::trace!(
            "Found import {} relative to config dir",
            import_path_rel.display()
        );
        return Some(in_config_dir);
    }
    None
}

/// A bare name (`alt`, `alt.toml`) is looked up in the project's config
/// directory. Anything path-like is taken as given, with `.toml` added when
/// it has no extension and does not exist as written.
fn requested_config_file(base_dir: &Path, requested: &str) -> Result<PathBuf> {
    let path = expand_path(requested);
    let is_bare_name = !path.is_absolute() && !requested.contains(['/', '\\']);
    let candidate = if is_bare_name {
        let mut file_name = path.into_os_string();
        if !requested.ends_with(".toml") {
            file_name.push(".toml");
        }
        base_dir.join(DEFAULT_CONFIG_DIR).join(file_name)
    } else if path.exists() || path.extension().is_some() {
        path
    } else {
        path.with_extension("toml")
    };

    if !candidate.exists() {
        return Err(AppError::Config(format!(
            "Config file '{}' not found (looked for {})",
            requested,
            candidate.display()
        )));
    }
    log::debug!("Using requested config file: {}", candidate.display());
    Ok(candidate)
}

fn project_config_file(base_dir: &Path) -> Option<PathBuf> {
    let path = base_dir.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILENAME);
    if path.exists() {
        log::debug!("Using project config file: {}", path.display());
        Some(path)
    } else {
        log::debug!("No project config file at {}", path.display());
        None
    }
}

pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}
