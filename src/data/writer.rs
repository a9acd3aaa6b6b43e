use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::info;
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};

use super::model::TokenCollection;
use crate::codec::{binary, xml};
use crate::error::{Result, TokenFileError};

const OUTPUT_BUFFER_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Output formats
// ---------------------------------------------------------------------------

/// Every format a collection can be written in. Only `Data` and `Xml` can be
/// read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Binary `training.dat` layout.
    Data,
    /// XML document plus `trainer_xml.dtd`.
    Xml,
    /// Plain-text listing.
    #[default]
    Text,
    /// HTML table.
    Html,
    /// Comma separated `token,good,bad`.
    Csv,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Data,
        OutputFormat::Xml,
        OutputFormat::Text,
        OutputFormat::Html,
        OutputFormat::Csv,
    ];

    /// Canonical file extension (without the dot).
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Data => "dat",
            OutputFormat::Xml => "xml",
            OutputFormat::Text => "txt",
            OutputFormat::Html => "html",
            OutputFormat::Csv => "csv",
        }
    }

    /// Guess the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "dat" => Some(OutputFormat::Data),
            "xml" => Some(OutputFormat::Xml),
            "txt" => Some(OutputFormat::Text),
            "html" | "htm" => Some(OutputFormat::Html),
            "csv" => Some(OutputFormat::Csv),
            _ => None,
        }
    }

    /// Append this format's extension unless `path` already carries one the
    /// format accepts.
    pub fn ensure_extension(self, path: &Path) -> PathBuf {
        if OutputFormat::from_path(path) == Some(self) {
            return path.to_path_buf();
        }
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(self.extension());
        PathBuf::from(name)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Data => "data",
            OutputFormat::Xml => "xml",
            OutputFormat::Text => "text",
            OutputFormat::Html => "html",
            OutputFormat::Csv => "csv",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = TokenFileError;

    fn from_str(s: &str) -> Result<Self> {
        OutputFormat::ALL
            .into_iter()
            .find(|format| format.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                TokenFileError::IllegalArgument(format!(
                    "unknown output format {s:?}, expected one of data, xml, text, html, csv"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Write `collection` to `path` in `format`, replacing any existing file.
/// XML output also writes [`xml::DTD_FILE_NAME`] into the same directory.
pub fn write_token_file(
    collection: &TokenCollection,
    path: &Path,
    format: OutputFormat,
) -> Result<()> {
    let io_err = |e| TokenFileError::io(e, Some(path.to_path_buf()));
    let file = File::create(path).map_err(io_err)?;
    let mut out = BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, file);
    render_into(collection, format, &mut out).map_err(|err| with_path(err, path))?;
    out.flush().map_err(io_err)?;

    if format == OutputFormat::Xml {
        let dtd_path = path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(xml::DTD_FILE_NAME);
        write_dtd(&dtd_path)?;
    }
    info!(
        "wrote {} tokens to {} as {format}",
        collection.len(),
        path.display()
    );
    Ok(())
}

/// Write the XML grammar file.
pub fn write_dtd(path: &Path) -> Result<()> {
    std::fs::write(path, xml::DTD).map_err(|e| TokenFileError::io(e, Some(path.to_path_buf())))
}

/// Render `collection` in memory.
pub fn render(collection: &TokenCollection, format: OutputFormat) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    render_into(collection, format, &mut out)?;
    Ok(out)
}

fn render_into<W: Write>(
    collection: &TokenCollection,
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    let io_err = |e| TokenFileError::io(e, None);
    match format {
        OutputFormat::Data => binary::write(collection, out).map_err(io_err),
        OutputFormat::Xml => out.write_all(xml::encode(collection).as_bytes()).map_err(io_err),
        OutputFormat::Text => write_text(collection, out).map_err(io_err),
        OutputFormat::Html => write_html(collection, out).map_err(io_err),
        OutputFormat::Csv => write_csv(collection, out),
    }
}

fn with_path(err: TokenFileError, path: &Path) -> TokenFileError {
    match err {
        TokenFileError::Io { source, path: None } => {
            TokenFileError::io(source, Some(path.to_path_buf()))
        }
        other => other,
    }
}

fn write_text<W: Write>(collection: &TokenCollection, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "Good messages: {}", collection.good_message_count())?;
    writeln!(out, "Bad messages: {}", collection.bad_message_count())?;
    write!(out, "\nList of tokens\n--------------\n")?;
    for record in collection.records() {
        writeln!(out, "{record}")?;
    }
    Ok(())
}

const HTML_HEAD: &str = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD HTML 4.01 Transitional//EN">
<html lang="en">
	<head>
		<meta http-equiv="Content-Type" content="text/html; charset=UTF-8">
		<title>
			Bayesian Filter Tokens
		</title>
	</head>

	<body>
		<h1>
			<div align="center">
				Bayesian Filter Tokens
			</div>
		</h1>
		<dl>
			<dt>
				Token
			</dt>
			<dd>
				The string which has been detected
				and tracked by the Bayesian filter.
			</dd>
			<dt>
				Good
			</dt>
			<dd>
				The number of occurences of this
				token in non-junk (good) emails.
			</dd>
			<dt>
				Bad
			</dt>
			<dd>
				The number of occurences of this
				token in junk (bad) emails.
			</dd>
		</dl>
		<table align="center" rules="all">
			<tr>
				<th><strong>Token</strong></th>
				<th><strong>Good</strong></th>
				<th><strong>Bad</strong></th>
			</tr>
"#;

const HTML_FOOT: &str = "\t\t</table>\n\t</body>\n</html>\n";

fn write_html<W: Write>(collection: &TokenCollection, out: &mut W) -> std::io::Result<()> {
    out.write_all(HTML_HEAD.as_bytes())?;
    for record in collection.records() {
        writeln!(
            out,
            "\t\t\t<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(record.token()),
            record.good_count,
            record.bad_count
        )?;
    }
    out.write_all(HTML_FOOT.as_bytes())
}

fn write_csv<W: Write>(collection: &TokenCollection, out: &mut W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["token", "good", "bad"])?;
    for record in collection.records() {
        let good = record.good_count.to_string();
        let bad = record.bad_count.to_string();
        writer.write_record([record.token(), good.as_str(), bad.as_str()])?;
    }
    writer.flush().map_err(|e| TokenFileError::io(e, None))
}
