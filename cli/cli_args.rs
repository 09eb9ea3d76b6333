use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectConfigOpts {
    #[arg(
        long,
        help = "Directory used to locate the config file and rule imports (default: current dir).",
        help_heading = "Project Setup",
        value_name = "PATH"
    )]
    pub base_dir: Option<PathBuf>,

    #[arg(
        long,
        help = "Specify path/filename of the TOML config file (default: .treemaker/treemaker.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "disable_config_file",
        help_heading = "Project Setup"
    )]
    pub config_file: Option<String>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "config_file",
        help_heading = "Project Setup"
    )]
    pub disable_config_file: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FormatOutputOpts {
    #[arg(short = 'f', long, help = "Set the output format.", value_name = "FORMAT", value_parser = ["text", "json", "yaml"], help_heading = "Output Formatting")]
    pub format: Option<String>,

    #[arg(
        long,
        help = "Ensure JSON output is compact (minified) [default].",
        conflicts_with = "disable_json_minify",
        help_heading = "Output Formatting"
    )]
    pub enable_json_minify: bool,

    #[arg(
        long,
        help = "Ensure JSON output is pretty-printed (readable).",
        conflicts_with = "enable_json_minify",
        help_heading = "Output Formatting"
    )]
    pub disable_json_minify: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RuleOpts {
    #[arg(long = "ignore", value_name = "RULE", action = clap::ArgAction::Append, help = "Add a custom ignore rule (e.g. 'target/', '\"*.log\"', 'Thumbs.db').", help_heading = "Ignore Rules")]
    pub ignore: Vec<String>,

    #[arg(long = "ignore-file", value_name = "PATH", action = clap::ArgAction::Append, help = "Read custom ignore rules from a file, one per line.", help_heading = "Ignore Rules")]
    pub ignore_file: Vec<PathBuf>,

    #[arg(
        long,
        help = "Enable the built-in default ignore rules [default: enabled].",
        overrides_with = "no_defaults",
        help_heading = "Ignore Rules"
    )]
    pub with_defaults: bool,

    #[arg(
        long,
        help = "Disable the built-in default ignore rules.",
        overrides_with = "with_defaults",
        help_heading = "Ignore Rules"
    )]
    pub no_defaults: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct TreeDisplayOpts {
    #[arg(long = "filter", value_name = "TEXT", action = clap::ArgAction::Append, help = "Only show entries whose name contains TEXT (case-insensitive), with their ancestors.", help_heading = "Tree Display")]
    pub filter: Vec<String>,

    #[arg(long, help = "Append '/' to directory names.", help_heading = "Tree Display")]
    pub dir_suffix: bool,

    #[arg(
        long,
        help = "Mark unreadable directories and symlink cycles.",
        help_heading = "Tree Display"
    )]
    pub annotate: bool,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Render filtered directory trees with box-drawing characters.",
    long_about = "treemaker walks one or more root directories, drops entries matching the \nbuilt-in and custom ignore rules, and renders the merged result as a text tree \n(or JSON/YAML). Supports saving, watching and shell completions.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  treemaker generate ./proj --ignore '\"*.log\"'\n  treemaker generate a b --save\n  treemaker rules --check node_modules --as-dir\n  treemaker watch . --clear",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "g",
        visible_alias = "gen",
        about = "Walk, filter and render the selected roots."
    )]
    Generate(GenerateArgs),

    #[command(
        visible_alias = "w",
        about = "Monitor the selected roots and re-render on change."
    )]
    Watch(WatchArgs),

    #[command(
        visible_alias = "r",
        about = "List the active ignore rules or check a name against them."
    )]
    Rules(RulesArgs),

    #[command(
        visible_alias = "d",
        about = "Show effective configuration, rules, failures and tree statistics."
    )]
    Debug(DebugArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),

    #[command(about = "Show or save the default configuration file structure.")]
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(value_name = "ROOTS", help = "Root directories to render, in order (default: current dir).")]
    pub roots: Vec<PathBuf>,

    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub rule_opts: RuleOpts,
    #[clap(flatten)]
    pub display: TreeDisplayOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,

    #[arg(
        long,
        help = "Force output of the tree to standard output.",
        help_heading = "Output Control",
        conflicts_with = "save"
    )]
    pub stdout: bool,

    #[arg(
        short = 's', long, value_name = "FILE",
        num_args = 0..=1,
        help_heading = "Output Control",
        help = "Save the tree. Optional FILE overrides config/default (tree_output.txt).",
    )]
    pub save: Option<Option<PathBuf>>,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    #[arg(value_name = "ROOTS", help = "Root directories to watch, in order (default: current dir).")]
    pub roots: Vec<PathBuf>,

    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub rule_opts: RuleOpts,
    #[clap(flatten)]
    pub display: TreeDisplayOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,

    #[arg(
        long,
        value_name = "DELAY_STRING",
        help = "Set debounce delay for watch mode [default: 300ms]"
    )]
    pub watch_delay: Option<String>,

    #[arg(long, help = "Clear the screen before each redraw.")]
    pub clear: bool,

    #[arg( short = 's', long, value_name = "FILE", num_args = 0..=1, help = "Save the tree on change. Optional FILE overrides config/default.", )]
    pub save: Option<Option<PathBuf>>,
}

#[derive(Args, Debug, Clone)]
pub struct RulesArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub rule_opts: RuleOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,

    #[arg(
        long,
        value_name = "NAME",
        help = "Report whether an entry named NAME would be excluded."
    )]
    pub check: Option<String>,

    #[arg(
        long,
        requires = "check",
        help = "Check NAME as a directory instead of a file."
    )]
    pub as_dir: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DebugArgs {
    #[arg(value_name = "ROOTS", help = "Root directories to inspect (default: current dir).")]
    pub roots: Vec<PathBuf>,

    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub rule_opts: RuleOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh) [default: fish]"
    )]
    pub shell: Option<String>,
    #[arg(
        long,
        help = "Save completion script to default location (prompts overwrite)."
    )]
    pub save: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,

    #[arg(
        long,
        help = "Save default config structure to default path (prompts overwrite)."
    )]
    pub save: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_accepts_roots_and_rule_flags() {
        let cli = Cli::try_parse_from([
            "treemaker",
            "gen",
            "b",
            "a",
            "--ignore",
            "target/",
            "--ignore",
            "\"*.log\"",
            "--no-defaults",
            "-s",
        ])
        .unwrap();
        let Some(Commands::Generate(args)) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.roots, vec![PathBuf::from("b"), PathBuf::from("a")]);
        assert_eq!(args.rule_opts.ignore, vec!["target/", "\"*.log\""]);
        assert!(args.rule_opts.no_defaults);
        assert_eq!(args.save, Some(None));
    }

    #[test]
    fn as_dir_requires_check() {
        assert!(Cli::try_parse_from(["treemaker", "rules", "--as-dir"]).is_err());
        assert!(Cli::try_parse_from(["treemaker", "rules", "--check", "dist", "--as-dir"]).is_ok());
    }
}
