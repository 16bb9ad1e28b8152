//! Indented text records
//!
//! A record is the type name, an opening brace, one line per serializable
//! property and a closing brace:
//!
//! ```text
//! Test
//! {
//!   value 42
//!   inner Inner
//!   {
//!     flag true
//!   }
//! }
//! ```
//!
//! Only properties marked serializable are written, but every property of
//! the type (inherited ones included) is accepted when reading.

mod reader;
mod value;
mod writer;

pub use reader::TextReader;
pub use value::TextValue;
pub use writer::TextWriter;

use crate::error::ReflectResult;
use crate::registry::Reflect;

/// Render `value` as a text record.
pub fn to_text<T: Reflect>(value: &T) -> ReflectResult<String> {
    let mut buf = Vec::new();
    {
        let mut writer = TextWriter::new(&mut buf);
        writer.write_record(value)?;
        writer.flush()?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Read a text record into `value`. A field `T` does not have is fatal.
pub fn from_text<T: Reflect>(text: &str, value: &mut T) -> ReflectResult<()> {
    TextReader::new(text).read_record(value)
}

/// Read a text record into `value`, returning unknown fields as errors.
pub fn try_from_text<T: Reflect>(text: &str, value: &mut T) -> ReflectResult<()> {
    TextReader::new(text).try_read_record(value)
}
