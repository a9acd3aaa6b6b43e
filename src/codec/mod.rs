//! Readers and writers for the two token file formats.
//!
//! Both decoders are free of side effects until they succeed, so a caller can
//! probe the binary format first and fall back to XML on a
//! [`Format`](crate::error::TokenFileError::Format) error.

pub mod binary;
pub mod bytes;
pub mod xml;
