//! Text encodings for field values

use super::{TextReader, TextWriter};
use crate::error::{ReflectError, ReflectResult};

/// A value that can appear after a field name in a text record.
///
/// Scalars encode as a single token. Records implement this through
/// [`impl_text_record!`](crate::impl_text_record) or `#[derive(Reflect)]`
/// and nest a full record.
pub trait TextValue {
    fn write_text(&self, writer: &mut TextWriter<'_>) -> ReflectResult<()>;
    fn read_text(&mut self, reader: &mut TextReader) -> ReflectResult<()>;
}

macro_rules! impl_text_parsed {
    ($($ty:ty => $expected:literal),* $(,)?) => {
        $(
            impl TextValue for $ty {
                fn write_text(&self, writer: &mut TextWriter<'_>) -> ReflectResult<()> {
                    writer.write_display(self)
                }

                fn read_text(&mut self, reader: &mut TextReader) -> ReflectResult<()> {
                    *self = reader.read_parsed($expected)?;
                    Ok(())
                }
            }
        )*
    };
}

impl_text_parsed! {
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    isize => "isize",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    usize => "usize",
    f32 => "f32",
    f64 => "f64",
}

impl TextValue for bool {
    fn write_text(&self, writer: &mut TextWriter<'_>) -> ReflectResult<()> {
        writer.write_str(if *self { "true" } else { "false" })
    }

    fn read_text(&mut self, reader: &mut TextReader) -> ReflectResult<()> {
        *self = reader.read_parsed("`true` or `false`")?;
        Ok(())
    }
}

impl TextValue for char {
    fn write_text(&self, writer: &mut TextWriter<'_>) -> ReflectResult<()> {
        writer.write_quoted(self.encode_utf8(&mut [0; 4]))
    }

    fn read_text(&mut self, reader: &mut TextReader) -> ReflectResult<()> {
        let text = reader.read_quoted()?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                *self = c;
                Ok(())
            }
            _ => Err(ReflectError::Parse {
                expected: "a single character",
                token: text,
            }),
        }
    }
}

// Embedded quotes are written as is and end the string early on read.
// A `'"'` char is written as `"""` and fails to read back for the same reason.
impl TextValue for String {
    fn write_text(&self, writer: &mut TextWriter<'_>) -> ReflectResult<()> {
        writer.write_quoted(self)
    }

    fn read_text(&mut self, reader: &mut TextReader) -> ReflectResult<()> {
        *self = reader.read_quoted()?;
        Ok(())
    }
}

impl TextValue for () {
    fn write_text(&self, _writer: &mut TextWriter<'_>) -> ReflectResult<()> {
        Ok(())
    }

    fn read_text(&mut self, _reader: &mut TextReader) -> ReflectResult<()> {
        Ok(())
    }
}

/// Implement [`TextValue`] for a registered record type so it can be used
/// as a field of another record.
///
/// ```ignore
/// typemeta_core::impl_text_record!(Point);
/// ```
#[macro_export]
macro_rules! impl_text_record {
    ($ty:ty) => {
        impl $crate::TextValue for $ty {
            fn write_text(&self, writer: &mut $crate::TextWriter<'_>) -> $crate::ReflectResult<()> {
                writer.write_record(self)
            }

            fn read_text(&mut self, reader: &mut $crate::TextReader) -> $crate::ReflectResult<()> {
                reader.try_read_record(self)
            }
        }
    };
}
