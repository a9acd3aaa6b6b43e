//! The native `training.dat` layout.
//!
//! ```text
//! [FE ED FA CE]
//! [good messages][bad messages][good token count]
//! good token count × [count][byte length][UTF-8 bytes]
//! [bad token count]
//! bad token count  × [count][byte length][UTF-8 bytes]
//! ```
//!
//! All integers are unsigned 32-bit big-endian. A token present on both sides
//! is stored twice, once per side, and merged back together on decode.

use std::io::Write;

use log::{debug, info, warn};

use super::bytes::{ByteReader, make_bytes};
use crate::data::merge::merge_token_sets;
use crate::data::model::{TokenCollection, TokenRecord, TokenSet, count_positive, insert_first};
use crate::error::{Result, TokenFileError};

/// Magic header identifying a binary training file.
pub const MAGIC: [u8; 4] = [0xFE, 0xED, 0xFA, 0xCE];

/// Default file name used by the mail client for its training data.
pub const DEFAULT_FILE_NAME: &str = "training.dat";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Good,
    Bad,
}

/// Whether `bytes` starts with the binary magic header.
pub fn has_magic(bytes: &[u8]) -> bool {
    bytes.len() >= MAGIC.len() && bytes[..MAGIC.len()] == MAGIC
}

/// Decode a binary training file.
///
/// Fails with [`TokenFileError::Format`] when the magic header does not
/// match, so callers can fall back to another codec, and with
/// [`TokenFileError::Truncated`] when the data ends early.
pub fn decode(bytes: &[u8]) -> Result<TokenCollection> {
    if !has_magic(bytes) {
        return Err(TokenFileError::Format(
            "missing FE ED FA CE header, not a binary token file".into(),
        ));
    }
    let mut reader = ByteReader::new(bytes);
    reader.take(MAGIC.len(), "header")?;

    let good_messages = reader.read_u32("good message count")?;
    let bad_messages = reader.read_u32("bad message count")?;
    info!("good messages: {good_messages}, bad messages: {bad_messages}");

    let good_tokens = reader.read_u32("good token count")?;
    debug!("reading {good_tokens} good tokens");
    let good_side = read_side(&mut reader, good_tokens, Side::Good)?;

    let bad_tokens = reader.read_u32("bad token count")?;
    debug!("reading {bad_tokens} bad tokens");
    let bad_side = read_side(&mut reader, bad_tokens, Side::Bad)?;

    if reader.remaining() > 0 {
        warn!(
            "ignoring {} trailing bytes after the bad token list",
            reader.remaining()
        );
    }

    debug!("merging good and bad token lists");
    let merged = merge_token_sets(good_side, bad_side);
    Ok(TokenCollection::from_parts(good_messages, bad_messages, merged))
}

fn read_side(reader: &mut ByteReader<'_>, count: u32, side: Side) -> Result<TokenSet> {
    let mut set = TokenSet::new();
    for _ in 0..count {
        let record = read_token(reader, side)?;
        let token = record.token().to_string();
        if !insert_first(&mut set, record) {
            debug!("dropping repeated {side:?} entry for token {token:?}");
        }
    }
    Ok(set)
}

fn read_token(reader: &mut ByteReader<'_>, side: Side) -> Result<TokenRecord> {
    let count = reader.read_u32("token count")?;
    let len = reader.read_u32("token length")? as usize;
    let raw = reader.take(len, "token text")?;
    let token = match std::str::from_utf8(raw) {
        Ok(text) => text.to_owned(),
        Err(_) => {
            let lossy = String::from_utf8_lossy(raw).into_owned();
            warn!("token {lossy:?} is not valid UTF-8, invalid sequences replaced");
            lossy
        }
    };
    Ok(match side {
        Side::Good => TokenRecord::good(token, count),
        Side::Bad => TokenRecord::bad(token, count),
    })
}

/// Encode `collection` in the binary layout. Good/bad token counts are
/// recomputed from the records rather than taken from the cache.
pub fn encode(collection: &TokenCollection) -> Vec<u8> {
    let mut out = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write(collection, &mut out);
    out
}

/// Stream the binary layout of `collection` into `out`.
pub fn write<W: Write>(collection: &TokenCollection, out: &mut W) -> std::io::Result<()> {
    let (num_good, num_bad) = count_positive(collection.token_set());

    out.write_all(&MAGIC)?;
    out.write_all(&make_bytes(collection.good_message_count()))?;
    out.write_all(&make_bytes(collection.bad_message_count()))?;

    out.write_all(&make_bytes(to_u32(num_good)))?;
    for record in collection.records().filter(|r| r.good_count > 0) {
        write_token(out, record.good_count, record.token())?;
    }

    out.write_all(&make_bytes(to_u32(num_bad)))?;
    for record in collection.records().filter(|r| r.bad_count > 0) {
        write_token(out, record.bad_count, record.token())?;
    }
    Ok(())
}

fn write_token<W: Write>(out: &mut W, count: u32, token: &str) -> std::io::Result<()> {
    let bytes = token.as_bytes();
    out.write_all(&make_bytes(count))?;
    out.write_all(&make_bytes(to_u32(bytes.len())))?;
    out.write_all(bytes)
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(out: &mut Vec<u8>, count: u32, token: &str) {
        out.extend_from_slice(&count.to_be_bytes());
        out.extend_from_slice(&(token.len() as u32).to_be_bytes());
        out.extend_from_slice(token.as_bytes());
    }

    fn foo_file() -> Vec<u8> {
        let mut bytes = MAGIC.to_vec();
        for v in [10u32, 5, 1] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        entry(&mut bytes, 3, "foo");
        bytes.extend_from_slice(&1u32.to_be_bytes());
        entry(&mut bytes, 2, "foo");
        bytes
    }

    #[test]
    fn good_and_bad_entries_merge_into_one_record() {
        let collection = decode(&foo_file()).unwrap();
        assert_eq!(collection.good_message_count(), 10);
        assert_eq!(collection.bad_message_count(), 5);
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get("foo"), Some(&TokenRecord::new("foo", 3, 2)));
        assert_eq!(collection.num_good_tokens(), 1);
        assert_eq!(collection.num_bad_tokens(), 1);
    }

    #[test]
    fn encode_reproduces_input_bytes() {
        let bytes = foo_file();
        assert_eq!(encode(&decode(&bytes).unwrap()), bytes);
    }

    #[test]
    fn wrong_magic_is_a_format_error() {
        let mut bytes = foo_file();
        bytes[3] = 0xCF;
        assert!(decode(&bytes).unwrap_err().is_format());
        assert!(decode(b"<?xml").unwrap_err().is_format());
        assert!(decode(&[]).unwrap_err().is_format());
    }

    #[test]
    fn short_file_is_truncated_not_format() {
        let bytes = foo_file();
        let err = decode(&bytes[..bytes.len() - 2]).unwrap_err();
        assert!(matches!(err, TokenFileError::Truncated { what: "token text" }));
    }

    #[test]
    fn lengths_count_utf8_bytes() {
        let collection = TokenCollection::from_records(1, 0, vec![TokenRecord::good("größe", 4)]);
        let bytes = encode(&collection);
        // magic + 3 ints, then count and length
        let len = u32::from_be_bytes(bytes[20..24].try_into().unwrap());
        assert_eq!(len, "größe".len() as u32);
        assert_eq!(len, 7);
    }

    #[test]
    fn round_trip_mixed_collection() {
        let collection = TokenCollection::from_records(
            42,
            17,
            vec![
                TokenRecord::new("résumé", 3, 0),
                TokenRecord::new("日本語", 0, 9),
                TokenRecord::new("both", 5, 6),
                TokenRecord::new("zero", 0, 0),
            ],
        );
        let decoded = decode(&encode(&collection)).unwrap();
        // zero/zero tokens are not representable in the binary layout
        let mut expected = collection.clone();
        expected.remove("zero");
        assert_eq!(decoded, expected);
    }

    #[test]
    fn empty_collection_round_trips() {
        let collection = TokenCollection::new();
        let bytes = encode(&collection);
        assert_eq!(bytes.len(), 4 + 4 * 4);
        assert_eq!(decode(&bytes).unwrap(), collection);
    }

    #[test]
    fn repeated_entry_on_one_side_keeps_first() {
        let mut bytes = MAGIC.to_vec();
        for v in [1u32, 1, 2] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        entry(&mut bytes, 3, "dup");
        entry(&mut bytes, 8, "dup");
        bytes.extend_from_slice(&0u32.to_be_bytes());
        let collection = decode(&bytes).unwrap();
        assert_eq!(collection.get("dup"), Some(&TokenRecord::good("dup", 3)));
    }
}
