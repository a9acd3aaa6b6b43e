//! Tools for the token files a Bayesian junk-mail filter keeps between runs.
//!
//! A token file records how many good and bad messages were trained and, for
//! every token seen, how often it occurred in each kind. Two on-disk layouts
//! exist: the compact binary `training.dat` and an XML document validated by
//! `trainer_xml.dtd`. This crate reads both, merges and filters token sets,
//! presents them as a sortable table for editors, and writes them back as
//! binary, XML, text, HTML or CSV.
//!
//! ```no_run
//! use std::path::Path;
//! use bayes_junk_tool::{load_token_file, remove_tokens, write_token_file, OutputFormat};
//!
//! # fn main() -> bayes_junk_tool::Result<()> {
//! let mut tokens = load_token_file(Path::new("training.dat"))?;
//! remove_tokens(&mut tokens, 5, -1);
//! write_token_file(&tokens, Path::new("tokens.xml"), OutputFormat::Xml)?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod codec;
pub mod config;
pub mod data;
pub mod error;
pub mod state;
pub mod view;

pub use config::RunConfig;
pub use data::filter::{remove_tokens, Thresholds};
pub use data::loader::{load_token_file, merge_files};
pub use data::merge::{merge_collections, merge_token_sets};
pub use data::model::{TokenCollection, TokenRecord, TokenSet};
pub use data::writer::{write_token_file, OutputFormat};
pub use error::{Result, TokenFileError};
pub use state::{Session, Summary};
pub use view::sorter::StableIndexSorter;
pub use view::table::TokenTable;
