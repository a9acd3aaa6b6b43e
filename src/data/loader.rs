use std::path::Path;

use log::{debug, info};

use super::merge::merge_collections;
use super::model::TokenCollection;
use crate::codec::{binary, xml};
use crate::error::{Result, TokenFileError};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a token file from disk, whatever its format.
///
/// The binary layout is tried first; when its header does not match, the file
/// is parsed as XML. Only when both codecs reject the content is a
/// [`TokenFileError::Format`] error returned. IO failures propagate unchanged.
pub fn load_token_file(path: &Path) -> Result<TokenCollection> {
    let bytes = std::fs::read(path).map_err(|e| TokenFileError::io(e, Some(path.to_path_buf())))?;
    decode_any(&bytes).map_err(|err| match err {
        TokenFileError::Format(reason) => TokenFileError::Format(format!(
            "{} is not a binary or XML token file ({reason})",
            path.display()
        )),
        other => other,
    })
}

/// Decode bytes holding either format.
pub fn decode_any(bytes: &[u8]) -> Result<TokenCollection> {
    debug!("checking for a binary token file");
    match binary::decode(bytes) {
        Ok(collection) => {
            log_loaded("binary", &collection);
            return Ok(collection);
        }
        Err(err) if err.is_format() => debug!("not binary: {err}"),
        Err(err) => return Err(err),
    }

    debug!("checking for an XML token file");
    let collection = xml::decode(bytes)?;
    log_loaded("XML", &collection);
    Ok(collection)
}

/// Load two token files and combine them: message counters are summed and
/// token counts merged per token.
pub fn merge_files(path_a: &Path, path_b: &Path) -> Result<TokenCollection> {
    let a = load_token_file(path_a)?;
    let b = load_token_file(path_b)?;
    let merged = merge_collections(&a, &b);
    info!(
        "merged {} + {} tokens into {}",
        a.len(),
        b.len(),
        merged.len()
    );
    Ok(merged)
}

fn log_loaded(kind: &str, collection: &TokenCollection) {
    info!(
        "loaded {kind} token file: {} tokens ({} good, {} bad)",
        collection.len(),
        collection.num_good_tokens(),
        collection.num_bad_tokens()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::TokenRecord;
    use pretty_assertions::assert_eq;

    fn sample() -> TokenCollection {
        TokenCollection::from_records(
            10,
            5,
            vec![TokenRecord::new("foo", 3, 2), TokenRecord::new("bar", 0, 1)],
        )
    }

    #[test]
    fn probes_binary_then_xml() {
        let dir = tempfile::tempdir().unwrap();
        let dat = dir.path().join("training.dat");
        let xml_path = dir.path().join("tokens.xml");
        std::fs::write(&dat, binary::encode(&sample())).unwrap();
        std::fs::write(&xml_path, xml::encode(&sample())).unwrap();

        assert_eq!(load_token_file(&dat).unwrap(), sample());
        assert_eq!(load_token_file(&xml_path).unwrap(), sample());
    }

    #[test]
    fn garbage_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.txt");
        std::fs::write(&path, "hello world").unwrap();
        let err = load_token_file(&path).unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("junk.txt"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_token_file(&dir.path().join("absent.dat")).unwrap_err();
        assert!(matches!(err, TokenFileError::Io { path: Some(_), .. }));
    }

    #[test]
    fn truncated_binary_does_not_fall_back_to_xml() {
        let bytes = binary::encode(&sample());
        let err = decode_any(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, TokenFileError::Truncated { .. }));
    }

    #[test]
    fn merge_files_sums_everything() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.dat");
        let b = dir.path().join("b.xml");
        std::fs::write(&a, binary::encode(&sample())).unwrap();
        let other = TokenCollection::from_records(1, 2, vec![TokenRecord::new("foo", 1, 1)]);
        std::fs::write(&b, xml::encode(&other)).unwrap();

        let merged = merge_files(&a, &b).unwrap();
        assert_eq!(merged.good_message_count(), 11);
        assert_eq!(merged.bad_message_count(), 7);
        assert_eq!(merged.get("foo"), Some(&TokenRecord::new("foo", 4, 3)));
        assert_eq!(merged.get("bar"), Some(&TokenRecord::new("bar", 0, 1)));
    }
}
