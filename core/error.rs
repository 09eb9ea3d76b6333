use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// Malformed custom rule text. The rule is not added.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Rule text is empty")]
    Empty,

    #[error("Quoted pattern \"{0}\" must start with '*' (e.g. \"*.log\")")]
    MissingWildcard(String),

    #[error("Quoted pattern \"{0}\" must continue with '.' after '*' (e.g. \"*.log\")")]
    MissingDot(String),

    #[error("Quoted pattern \"{0}\" has no extension after '*.'")]
    EmptySuffix(String),

    #[error("Quoted pattern \"{0}\" uses more than one '*'; only a single leading wildcard is supported")]
    UnsupportedWildcard(String),
}

/// Root-level walk failure. Fatal for that root only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalkError {
    #[error("Root path not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Root path is not a directory: {}", .0.display())]
    RootNotADirectory(PathBuf),

    #[error("Root path '{}' is not accessible: {message}", .path.display())]
    RootInaccessible { path: PathBuf, message: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("Nothing to generate: no roots selected")]
    EmptySelection,
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("TOML Parsing Error: {0}")]
    TomlParse(String),

    #[error("TOML Serialization Error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON Serialization Error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("YAML Parsing/Serialization Error: {0}")]
    YamlError(#[from] serde_yml::Error),

    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File Read Error: Path '{path}', Error: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File Write Error: Path '{path}', Error: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Rule Error: {0}")]
    Rule(#[from] ParseError),

    #[error("Walk Error: {0}")]
    Walk(#[from] WalkError),

    #[error("{0}")]
    Merge(#[from] MergeError),

    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),

    #[error("Data Loading Error: {0}")]
    DataLoading(String),

    #[error("Duration Parsing Error: {0}")]
    DurationParse(String),
}

impl From<parse_duration::parse::Error> for AppError {
    fn from(err: parse_duration::parse::Error) -> Self {
        AppError::DurationParse(err.to_string())
    }
}
