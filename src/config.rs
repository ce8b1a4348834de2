//! REPL settings read from `CHARME_*` environment variables.

use crate::evaluator::DEFAULT_MAX_DEPTH;
use crate::parser::Grammar;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_HISTORY_FILE: &str = "charme_history.txt";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var}: expected one of {expected}, got '{found}'")]
    InvalidChoice {
        var: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("{var}: expected a positive integer, got '{found}'")]
    InvalidNumber { var: &'static str, found: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Emacs,
    Vi,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplConfig {
    pub edit_mode: EditMode,
    /// `None` disables history.
    pub history_file: Option<PathBuf>,
    pub grammar: Grammar,
    /// End the session on a syntax error instead of reading the next line.
    pub strict_syntax: bool,
    pub max_depth: usize,
}

impl Default for ReplConfig {
    fn default() -> Self {
        ReplConfig {
            edit_mode: EditMode::Emacs,
            history_file: Some(PathBuf::from(DEFAULT_HISTORY_FILE)),
            grammar: Grammar::Canonical,
            strict_syntax: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ReplConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup, so tests need not touch the process environment.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let mut config = ReplConfig::default();

        if let Some(mode) = lookup("CHARME_EDIT_MODE") {
            config.edit_mode = match mode.trim().to_ascii_lowercase().as_str() {
                "emacs" => EditMode::Emacs,
                "vi" => EditMode::Vi,
                _ => {
                    return Err(ConfigError::InvalidChoice {
                        var: "CHARME_EDIT_MODE",
                        expected: "emacs, vi",
                        found: mode,
                    });
                }
            };
        }

        if let Some(path) = lookup("CHARME_HISTORY") {
            config.history_file = match path.trim() {
                "" => None,
                path => Some(PathBuf::from(path)),
            };
        }

        if let Some(grammar) = lookup("CHARME_GRAMMAR") {
            config.grammar = match grammar.trim().to_ascii_lowercase().as_str() {
                "canonical" => Grammar::Canonical,
                "legacy" => Grammar::Legacy,
                _ => {
                    return Err(ConfigError::InvalidChoice {
                        var: "CHARME_GRAMMAR",
                        expected: "canonical, legacy",
                        found: grammar,
                    });
                }
            };
        }

        config.strict_syntax = lookup("CHARME_STRICT_SYNTAX").is_some();

        if let Some(depth) = lookup("CHARME_MAX_DEPTH") {
            config.max_depth = match depth.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        var: "CHARME_MAX_DEPTH",
                        found: depth,
                    });
                }
            };
        }

        Ok(config)
    }
}
