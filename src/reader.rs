//! Loading JSON documents from files and byte streams.

use crate::error::Result;
use crate::parser::Parser;
use crate::value::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// The UTF-8 encoding of U+FEFF, as written at the start of some text files.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Remove a leading UTF-8 byte-order mark, if present.
pub fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// Read a whole stream and parse it as one JSON document.
///
/// A leading byte-order mark is skipped. The input must be UTF-8.
///
/// # Example
///
/// ```rust
/// use rsal::reader::from_reader;
/// use std::io::Cursor;
///
/// let value = from_reader(Cursor::new(b"\xEF\xBB\xBF{\"test\": \"value\"}"))?;
/// assert_eq!(value.get("test")?.as_str()?, "value");
/// # Ok::<(), rsal::Error>(())
/// ```
pub fn from_reader<R: Read>(input: R) -> Result<Value> {
    from_reader_with(input, &Parser::new())
}

/// Like [`from_reader`], with a caller-supplied parser.
pub fn from_reader_with<R: Read>(mut input: R, parser: &Parser) -> Result<Value> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;

    let body = strip_bom(&bytes);
    let has_bom = body.len() != bytes.len();

    let text = String::from_utf8(body.to_vec())?;
    debug!(bytes = text.len(), has_bom, "read JSON input");
    parser.parse(&text)
}

/// Load and parse a JSON file.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Value> {
    load_from_file_with(path, &Parser::new())
}

/// Like [`load_from_file`], with a caller-supplied parser.
pub fn load_from_file_with(path: impl AsRef<Path>, parser: &Parser) -> Result<Value> {
    let path = path.as_ref();
    debug!(path = %path.display(), "loading JSON file");
    let file = File::open(path)?;
    from_reader_with(BufReader::new(file), parser)
}
