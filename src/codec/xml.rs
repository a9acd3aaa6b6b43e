//! XML form of a training file and the DTD it references.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <!DOCTYPE tokenfile SYSTEM "trainer_xml.dtd"><tokenfile>
//!     <good_msgs>10</good_msgs>
//!     <bad_msgs>5</bad_msgs>
//!     <token>
//!         <name>foo</name>
//!         <good>3</good>
//!         <bad>2</bad>
//!     </token>
//! </tokenfile>
//! ```

use std::fmt::Write as _;

use log::{debug, info, warn};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::data::model::{TokenCollection, TokenRecord, TokenSet, insert_first};
use crate::error::{Result, TokenFileError};

/// Name the document's DOCTYPE must carry.
pub const DOCTYPE_NAME: &str = "tokenfile";

/// File name of the DTD, written next to every XML document.
pub const DTD_FILE_NAME: &str = "trainer_xml.dtd";

/// Grammar for the XML token format.
pub const DTD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>

<!-- The root element of a junk-mail filter training data XML file. -->
<!ELEMENT tokenfile (good_msgs, bad_msgs, token*)>

<!-- Represents the number of good (non-junk) messages processed by this token file. -->
<!ELEMENT good_msgs (#PCDATA)>

<!-- Represents the number of bad (junk) messages processed by this token file. -->
<!ELEMENT bad_msgs (#PCDATA)>

<!-- Represents a single token in the training file. -->
<!ELEMENT token (name, good, bad)>

<!-- Represents the string associated with this token. -->
<!ELEMENT name (#PCDATA)>

<!-- Represents the number of times this token has appeared in good (non-junk) emails. -->
<!ELEMENT good (#PCDATA)>

<!-- Represents the number of times this token has appeared in bad (junk) emails. -->
<!ELEMENT bad (#PCDATA)>
"#;

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Leaf elements whose character data we collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leaf {
    GoodMsgs,
    BadMsgs,
    Name,
    Good,
    Bad,
}

impl Leaf {
    fn tag(self) -> &'static str {
        match self {
            Leaf::GoodMsgs => "good_msgs",
            Leaf::BadMsgs => "bad_msgs",
            Leaf::Name => "name",
            Leaf::Good => "good",
            Leaf::Bad => "bad",
        }
    }
}

/// Children of one `<token>` element, in whatever order they appeared.
#[derive(Debug, Default)]
struct PartialToken {
    name: Option<String>,
    good: Option<u32>,
    bad: Option<u32>,
}

#[derive(Debug, Default)]
struct DocumentState {
    doctype_checked: bool,
    good_msgs: Option<u32>,
    bad_msgs: Option<u32>,
    token: Option<PartialToken>,
    leaf: Option<Leaf>,
    text: String,
    tokens: TokenSet,
    seen_tokens: usize,
}

impl DocumentState {
    fn start(&mut self, tag: &[u8]) -> Result<()> {
        if !self.doctype_checked {
            return Err(TokenFileError::Format(
                "document has no DOCTYPE, expected DOCTYPE [tokenfile]".into(),
            ));
        }
        let leaf = match tag {
            b"token" => {
                self.token = Some(PartialToken::default());
                None
            }
            b"good_msgs" if self.good_msgs.is_none() => Some(Leaf::GoodMsgs),
            b"bad_msgs" if self.bad_msgs.is_none() => Some(Leaf::BadMsgs),
            b"name" if self.token.is_some() => Some(Leaf::Name),
            b"good" if self.token.is_some() => Some(Leaf::Good),
            b"bad" if self.token.is_some() => Some(Leaf::Bad),
            _ => None,
        };
        if leaf.is_some() {
            self.leaf = leaf;
            self.text.clear();
        }
        Ok(())
    }

    fn end(&mut self, tag: &[u8]) -> Result<()> {
        if let Some(leaf) = self.leaf {
            if leaf.tag().as_bytes() == tag {
                self.leaf = None;
                return self.finish_leaf(leaf);
            }
        }
        if tag == b"token" {
            if let Some(partial) = self.token.take() {
                self.finish_token(partial)?;
            }
        }
        Ok(())
    }

    fn finish_leaf(&mut self, leaf: Leaf) -> Result<()> {
        let text = std::mem::take(&mut self.text);
        match leaf {
            Leaf::GoodMsgs => self.good_msgs = Some(parse_count(leaf, &text)?),
            Leaf::BadMsgs => self.bad_msgs = Some(parse_count(leaf, &text)?),
            Leaf::Name => {
                if let Some(token) = self.token.as_mut() {
                    token.name = Some(text);
                }
            }
            Leaf::Good => {
                let count = parse_count(leaf, &text)?;
                if let Some(token) = self.token.as_mut() {
                    token.good = Some(count);
                }
            }
            Leaf::Bad => {
                let count = parse_count(leaf, &text)?;
                if let Some(token) = self.token.as_mut() {
                    token.bad = Some(count);
                }
            }
        }
        Ok(())
    }

    fn finish_token(&mut self, partial: PartialToken) -> Result<()> {
        self.seen_tokens += 1;
        let name = match partial.name {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Err(TokenFileError::Format(format!(
                    "token element #{} has no name",
                    self.seen_tokens
                )));
            }
        };
        let record = TokenRecord::new(name, partial.good.unwrap_or(0), partial.bad.unwrap_or(0));
        let token = record.token().to_string();
        if !insert_first(&mut self.tokens, record) {
            warn!("duplicate token {token:?} in XML file, keeping the first occurrence");
        }
        Ok(())
    }
}

fn parse_count(leaf: Leaf, text: &str) -> Result<u32> {
    text.trim().parse::<u32>().map_err(|_| {
        TokenFileError::Format(format!(
            "<{}> must hold a non-negative integer, found {:?}",
            leaf.tag(),
            text.trim()
        ))
    })
}

/// Extract the root name from the body of a `<!DOCTYPE ...>` declaration.
fn doctype_name(raw: &str) -> &str {
    raw.trim_start()
        .split(|c: char| c.is_whitespace() || c == '[')
        .next()
        .unwrap_or("")
}

/// Decode an XML token document.
///
/// The DOCTYPE must name `tokenfile`, and both `good_msgs` and `bad_msgs`
/// must be present; anything else is a [`TokenFileError::Format`] error.
pub fn decode(bytes: &[u8]) -> Result<TokenCollection> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| TokenFileError::Format(format!("XML token file is not UTF-8: {e}")))?;
    decode_str(text)
}

/// Decode an XML token document held in a string.
pub fn decode_str(text: &str) -> Result<TokenCollection> {
    let mut reader = Reader::from_str(text);
    let mut state = DocumentState::default();

    loop {
        match reader.read_event()? {
            Event::DocType(raw) => {
                let raw = String::from_utf8_lossy(&raw);
                let name = doctype_name(&raw);
                if name != DOCTYPE_NAME {
                    return Err(TokenFileError::Format(format!(
                        "not an XML token file: DOCTYPE [{name}] found, \
                         DOCTYPE [{DOCTYPE_NAME}] expected"
                    )));
                }
                state.doctype_checked = true;
            }
            Event::Start(e) => state.start(e.name().as_ref())?,
            Event::Empty(e) => {
                let tag = e.name().as_ref().to_vec();
                state.start(&tag)?;
                state.end(&tag)?;
            }
            Event::End(e) => state.end(e.name().as_ref())?,
            Event::Text(e) => {
                if state.leaf.is_some() {
                    state.text.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if state.leaf.is_some() {
                    state.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !state.doctype_checked {
        return Err(TokenFileError::Format(
            "document has no DOCTYPE, expected DOCTYPE [tokenfile]".into(),
        ));
    }
    let good_msgs = state
        .good_msgs
        .ok_or_else(|| TokenFileError::Format("XML token file has no <good_msgs>".into()))?;
    let bad_msgs = state
        .bad_msgs
        .ok_or_else(|| TokenFileError::Format("XML token file has no <bad_msgs>".into()))?;

    info!("good messages: {good_msgs}, bad messages: {bad_msgs}");
    debug!(
        "read {} token elements, {} distinct tokens",
        state.seen_tokens,
        state.tokens.len()
    );
    Ok(TokenCollection::from_parts(good_msgs, bad_msgs, state.tokens))
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Render `collection` as an XML document referencing [`DTD_FILE_NAME`].
/// Every record is written, including those with two zero counts.
pub fn encode(collection: &TokenCollection) -> String {
    let mut out = String::with_capacity(64 + collection.len() * 64);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = write!(out, "<!DOCTYPE {DOCTYPE_NAME} SYSTEM \"{DTD_FILE_NAME}\">");
    out.push_str("<tokenfile>\n");
    let _ = writeln!(out, "\t<good_msgs>{}</good_msgs>", collection.good_message_count());
    let _ = writeln!(out, "\t<bad_msgs>{}</bad_msgs>", collection.bad_message_count());
    for record in collection.records() {
        out.push_str("\t<token>\n");
        let _ = writeln!(out, "\t\t<name>{}</name>", escape(record.token()));
        let _ = writeln!(out, "\t\t<good>{}</good>", record.good_count);
        let _ = writeln!(out, "\t\t<bad>{}</bad>", record.bad_count);
        out.push_str("\t</token>\n");
    }
    out.push_str("</tokenfile>\n");
    out
}
