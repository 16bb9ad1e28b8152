//! Text record reader

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::any::AnyValue;
use crate::error::{fatal, ReflectError, ReflectResult};
use crate::registry::{type_of, Reflect, TypeData};

/// Reads text records produced by [`TextWriter`](super::TextWriter).
///
/// The whole source is buffered up front; reading then walks it
/// token by token. Tokens are separated by whitespace.
pub struct TextReader {
    chars: Vec<char>,
    pos: usize,
    path: Option<PathBuf>,
    open: bool,
    failed: bool,
}

impl TextReader {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            chars: text.into().chars().collect(),
            pos: 0,
            path: None,
            open: true,
            failed: false,
        }
    }

    /// Buffer the whole file at `path`.
    pub fn open(path: impl AsRef<Path>) -> ReflectResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        debug!("Opened {} for reading", path.display());
        let mut reader = Self::new(text);
        reader.path = Some(path.to_path_buf());
        Ok(reader)
    }

    pub fn from_reader<R: Read>(mut source: R) -> ReflectResult<Self> {
        let mut text = String::new();
        source.read_to_string(&mut text)?;
        Ok(Self::new(text))
    }

    // ============================================================================
    // Stream state
    // ============================================================================

    pub fn opened_file(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// True while the reader is open, nothing failed and input remains.
    pub fn is_good(&self) -> bool {
        self.open && !self.failed && self.pos < self.chars.len()
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn is_eof(&self) -> bool {
        !self.open || self.pos >= self.chars.len()
    }

    pub fn close(&mut self) {
        self.chars.clear();
        self.pos = 0;
        self.open = false;
    }

    fn fail(&mut self, err: ReflectError) -> ReflectError {
        self.failed = true;
        err
    }

    // ============================================================================
    // Primitives
    // ============================================================================

    fn peek(&self) -> Option<char> {
        if !self.open {
            return None;
        }
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Advance past the next occurrence of `target`. Returns false and
    /// leaves the reader at the end if it never appears.
    pub fn read_until(&mut self, target: char) -> bool {
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == target {
                return true;
            }
        }
        false
    }

    /// Read the next non-whitespace character.
    pub fn read_char(&mut self) -> Option<char> {
        self.skip_whitespace();
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    /// Read the next whitespace-delimited token. Empty at end of input.
    pub fn read_token(&mut self) -> String {
        self.skip_whitespace();
        let mut token = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                break;
            }
            token.push(c);
            self.pos += 1;
        }
        token
    }

    /// Read a double-quoted string. The closing quote is the next `"`.
    pub fn read_quoted(&mut self) -> ReflectResult<String> {
        match self.read_char() {
            Some('"') => {}
            Some(c) => {
                return Err(self.fail(ReflectError::Parse {
                    expected: "'\"'",
                    token: c.to_string(),
                }))
            }
            None => return Err(self.fail(ReflectError::UnexpectedEof { expected: "'\"'" })),
        }

        let mut text = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == '"' {
                return Ok(text);
            }
            text.push(c);
        }
        Err(self.fail(ReflectError::UnexpectedEof { expected: "closing '\"'" }))
    }

    /// Read a token and parse it with [`FromStr`].
    pub fn read_parsed<T: FromStr>(&mut self, expected: &'static str) -> ReflectResult<T> {
        let token = self.read_token();
        if token.is_empty() {
            return Err(self.fail(ReflectError::UnexpectedEof { expected }));
        }
        match token.parse() {
            Ok(value) => Ok(value),
            Err(_) => Err(self.fail(ReflectError::Parse { expected, token })),
        }
    }

    // ============================================================================
    // Records
    // ============================================================================

    /// Read a record into `value`, leaving fields absent from the text as is.
    ///
    /// A field the type does not have is fatal. Stream and parse failures
    /// are returned.
    pub fn read_record<T: Reflect>(&mut self, value: &mut T) -> ReflectResult<()> {
        escalate(self.try_read_record(value))
    }

    /// Like [`read_record`](Self::read_record), but an unknown field is
    /// returned as [`ReflectError::UnknownProperty`].
    pub fn try_read_record<T: Reflect>(&mut self, value: &mut T) -> ReflectResult<()> {
        self.read_object(type_of::<T>(), NonNull::from(value).cast())
    }

    /// Read a record into a type-erased value. An unknown field is fatal.
    pub fn read_value(&mut self, value: &mut AnyValue<'_>) -> ReflectResult<()> {
        escalate(self.try_read_value(value))
    }

    pub fn try_read_value(&mut self, value: &mut AnyValue<'_>) -> ReflectResult<()> {
        let Some(ty) = value.type_data() else {
            return Err(ReflectError::NotWritable);
        };
        match value.as_mut_ptr() {
            Some(ptr) => self.read_object(ty, ptr),
            None => Err(ReflectError::NotWritable),
        }
    }

    fn read_object(&mut self, ty: &TypeData, ptr: NonNull<u8>) -> ReflectResult<()> {
        if !self.read_until('{') {
            return Err(self.fail(ReflectError::UnexpectedEof { expected: "'{'" }));
        }

        loop {
            let token = self.read_token();
            if token.is_empty() || token.contains('}') {
                return Ok(());
            }

            let Some(property) = ty.property(&token) else {
                return Err(self.fail(ReflectError::UnknownProperty {
                    ty: ty.name().to_string(),
                    property: token,
                }));
            };
            trace!("Reading {}.{}", ty.name(), token);
            property.read_field(ty, ptr, self)?;
        }
    }
}

fn escalate(result: ReflectResult<()>) -> ReflectResult<()> {
    match result {
        Err(err @ ReflectError::UnknownProperty { .. }) => fatal(err),
        other => other,
    }
}

impl std::fmt::Debug for TextReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextReader")
            .field("path", &self.path)
            .field("pos", &self.pos)
            .field("len", &self.chars.len())
            .field("failed", &self.failed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_and_chars() {
        let mut reader = TextReader::new("  alpha\tbeta\n  {  }");
        assert_eq!(reader.read_token(), "alpha");
        assert_eq!(reader.read_token(), "beta");
        assert_eq!(reader.read_char(), Some('{'));
        assert_eq!(reader.read_token(), "}");
        assert_eq!(reader.read_token(), "");
        assert!(reader.is_eof());
        assert!(!reader.failed());
    }

    #[test]
    fn test_read_until() {
        let mut reader = TextReader::new("Name\n{\n  x 1\n}");
        assert!(reader.read_until('{'));
        assert_eq!(reader.read_token(), "x");
        assert!(!reader.read_until('#'));
        assert!(reader.is_eof());
    }

    #[test]
    fn test_quoted_keeps_inner_spaces() {
        let mut reader = TextReader::new(" \"Fourty two\" next");
        assert_eq!(reader.read_quoted().unwrap(), "Fourty two");
        assert_eq!(reader.read_token(), "next");
    }

    #[test]
    fn test_unterminated_quote_fails() {
        let mut reader = TextReader::new("\"open");
        assert!(matches!(
            reader.read_quoted(),
            Err(ReflectError::UnexpectedEof { .. })
        ));
        assert!(reader.failed());
        assert!(!reader.is_good());
    }

    #[test]
    fn test_read_parsed() {
        let mut reader = TextReader::new("42 4.5 nope");
        assert_eq!(reader.read_parsed::<i32>("integer").unwrap(), 42);
        assert_eq!(reader.read_parsed::<f64>("float").unwrap(), 4.5);
        let err = reader.read_parsed::<u8>("integer").unwrap_err();
        assert!(matches!(err, ReflectError::Parse { ref token, .. } if token == "nope"));
    }

    #[test]
    fn test_close() {
        let mut reader = TextReader::new("a b");
        assert!(reader.is_good());
        reader.close();
        assert!(!reader.is_good());
        assert_eq!(reader.read_token(), "");
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("typemeta-reader-missing-file.txt");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(TextReader::open(&path), Err(ReflectError::Io(_))));
    }
}
