//! Tabular presentation of a token collection.
//!
//! [`table::TokenTable`] exposes the collection as rows and columns through
//! [`source::TableSource`]; [`sorter::StableIndexSorter`] keeps a stable sorted
//! permutation over any such source and maps displayed rows back to source
//! rows.

pub mod sorter;
pub mod source;
pub mod table;
