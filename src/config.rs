//! Run configuration for one conversion: where tokens come from, what is
//! filtered out and where the result goes.

use std::path::{Path, PathBuf};

use log::{log, Level};
use serde::{Deserialize, Serialize};

use crate::data::filter::{remove_tokens, Thresholds};
use crate::data::loader::load_token_file;
use crate::data::model::TokenCollection;
use crate::data::writer::OutputFormat;
use crate::error::{Result, TokenFileError};

/// Settings for loading, filtering and writing a token file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    /// Token file to read (binary or XML).
    pub input: PathBuf,
    /// Optional second token file merged into `input`.
    pub merge_input: Option<PathBuf>,
    /// Destination; `None` writes to standard output.
    pub output: Option<PathBuf>,
    /// Output format. When `None` it is guessed from `output`'s extension and
    /// falls back to text.
    pub format: Option<OutputFormat>,
    /// Append the format's extension to `output` when it is missing.
    pub ensure_extension: bool,
    /// Tokens are dropped unless they reach one of these counts.
    pub thresholds: Thresholds,
    /// Report run progress at debug level instead of info.
    pub quiet: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(crate::codec::binary::DEFAULT_FILE_NAME),
            merge_input: None,
            output: None,
            format: None,
            ensure_extension: true,
            thresholds: Thresholds::default(),
            quiet: false,
        }
    }
}

impl RunConfig {
    /// Configuration reading `input` with every other setting at its default.
    pub fn for_input(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    /// Format that will actually be written.
    pub fn effective_format(&self) -> OutputFormat {
        self.format
            .or_else(|| self.output.as_deref().and_then(OutputFormat::from_path))
            .unwrap_or_default()
    }

    /// Path that will actually be written, with the extension fixed up if
    /// requested.
    pub fn effective_output(&self) -> Option<PathBuf> {
        let output = self.output.as_deref()?;
        if self.ensure_extension {
            Some(self.effective_format().ensure_extension(output))
        } else {
            Some(output.to_path_buf())
        }
    }

    /// Level used for run progress messages.
    pub fn progress_level(&self) -> Level {
        if self.quiet {
            Level::Debug
        } else {
            Level::Info
        }
    }

    /// Load `input`, merge `merge_input` into it and apply the thresholds.
    pub fn prepare(&self) -> Result<TokenCollection> {
        let level = self.progress_level();
        let mut collection = load_token_file(&self.input)?;
        log!(level, "loaded {} tokens from {}", collection.len(), self.input.display());

        if let Some(other) = &self.merge_input {
            collection.absorb(load_token_file(other)?);
            log!(level, "merged collection holds {} tokens", collection.len());
        }

        let removed = remove_tokens(&mut collection, self.thresholds.good, self.thresholds.bad);
        if removed > 0 {
            log!(level, "removed {removed} tokens below the thresholds");
        }
        Ok(collection)
    }

    /// Checks the invariants required before a run.
    pub fn validate(&self) -> Result<()> {
        if self.input.as_os_str().is_empty() {
            return Err(TokenFileError::InvalidConfig("an input file is required".into()));
        }
        if self.merge_input.as_deref() == Some(self.input.as_path()) {
            return Err(TokenFileError::InvalidConfig(format!(
                "{} cannot be merged with itself",
                self.input.display()
            )));
        }
        if let Some(output) = self.effective_output() {
            let overwrites_merge_input =
                self.merge_input.as_deref().is_some_and(|m| same_file(&output, m));
            if same_file(&output, &self.input) || overwrites_merge_input {
                return Err(TokenFileError::InvalidConfig(format!(
                    "output {} would overwrite an input file",
                    output.display()
                )));
            }
        }
        if self.effective_format() == OutputFormat::Data && self.output.is_none() {
            return Err(TokenFileError::InvalidConfig(
                "binary output needs an output file".into(),
            ));
        }
        Ok(())
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
