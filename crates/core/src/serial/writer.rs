//! Text record writer

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use tracing::trace;

use crate::any::AnyValue;
use crate::error::{ReflectError, ReflectResult};
use crate::registry::{type_of, Reflect, TypeData};

/// Writes reflected values as indented text records.
///
/// ```text
/// Test
/// {
///   value 42
///   s "Fourty two"
/// }
/// ```
pub struct TextWriter<'a> {
    out: Box<dyn Write + 'a>,
    path: Option<PathBuf>,
    tabs: usize,
    indent: usize,
    at_line_start: bool,
    open: bool,
    failed: bool,
}

impl TextWriter<'static> {
    /// Create or truncate a file.
    pub fn create(path: impl AsRef<Path>) -> ReflectResult<Self> {
        let path = path.as_ref();
        let file = File::create(path)?;
        Ok(Self::with_file(file, path))
    }

    /// Open a file for appending, creating it if needed.
    pub fn append(path: impl AsRef<Path>) -> ReflectResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::with_file(file, path))
    }

    fn with_file(file: File, path: &Path) -> Self {
        let mut writer = Self::new(BufWriter::new(file));
        writer.path = Some(path.to_path_buf());
        writer
    }
}

impl<'a> TextWriter<'a> {
    pub fn new<W: Write + 'a>(out: W) -> Self {
        Self {
            out: Box::new(out),
            path: None,
            tabs: 0,
            indent: crate::config::current().indent_width,
            at_line_start: true,
            open: true,
            failed: false,
        }
    }

    /// Override the number of spaces per nesting level.
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    // ============================================================================
    // Stream state
    // ============================================================================

    /// Path of the file being written, if any
    pub fn opened_file(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_good(&self) -> bool {
        self.open && !self.failed
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn flush(&mut self) -> ReflectResult<()> {
        let result = self.out.flush();
        self.track(result)
    }

    /// Flush and stop accepting output.
    pub fn close(&mut self) -> ReflectResult<()> {
        if !self.open {
            return Ok(());
        }
        let flushed = self.flush();
        self.out = Box::new(io::sink());
        self.open = false;
        flushed
    }

    fn track<T>(&mut self, result: io::Result<T>) -> ReflectResult<T> {
        result.map_err(|err| {
            self.failed = true;
            ReflectError::Io(err)
        })
    }

    // ============================================================================
    // Primitives
    // ============================================================================

    /// Write raw text.
    pub fn write_str(&mut self, text: &str) -> ReflectResult<()> {
        if text.is_empty() {
            return Ok(());
        }
        if !self.open {
            return Err(ReflectError::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                "writer is closed",
            )));
        }
        let result = self.out.write_all(text.as_bytes());
        self.track(result)?;
        self.at_line_start = text.ends_with('\n');
        Ok(())
    }

    pub fn write_display<T: std::fmt::Display + ?Sized>(&mut self, value: &T) -> ReflectResult<()> {
        self.write_str(&value.to_string())
    }

    /// Write `text` between double quotes. Embedded quotes are not escaped.
    pub fn write_quoted(&mut self, text: &str) -> ReflectResult<()> {
        self.write_str("\"")?;
        self.write_str(text)?;
        self.write_str("\"")
    }

    pub fn insert_tabs(&mut self) -> ReflectResult<()> {
        let pad = " ".repeat(self.tabs * self.indent);
        self.write_str(&pad)
    }

    pub fn insert_newline(&mut self) -> ReflectResult<()> {
        self.write_str("\n")
    }

    pub fn increment_tabs(&mut self) {
        self.tabs += 1;
    }

    pub fn decrement_tabs(&mut self) {
        self.tabs = self.tabs.saturating_sub(1);
    }

    /// Current nesting level
    pub fn tabs(&self) -> usize {
        self.tabs
    }

    // ============================================================================
    // Records
    // ============================================================================

    /// Write `value` as a record.
    pub fn write_record<T: Reflect>(&mut self, value: &T) -> ReflectResult<()> {
        self.write_object(type_of::<T>(), NonNull::from(value).cast())
    }

    /// Write a type-erased value as a record.
    pub fn write_value(&mut self, value: &AnyValue<'_>) -> ReflectResult<()> {
        match (value.type_data(), value.as_ptr()) {
            (Some(ty), Some(ptr)) => self.write_object(ty, ptr),
            _ => Err(ReflectError::NotWritable),
        }
    }

    fn write_object(&mut self, ty: &TypeData, ptr: NonNull<u8>) -> ReflectResult<()> {
        if self.at_line_start {
            self.insert_tabs()?;
        }
        self.write_str(ty.name())?;
        self.insert_newline()?;
        self.insert_tabs()?;
        self.write_str("{")?;
        self.insert_newline()?;

        self.increment_tabs();
        for property in ty.serializable_properties() {
            trace!("Writing {}.{}", ty.name(), property.name());
            self.insert_tabs()?;
            self.write_str(property.name())?;
            self.write_str(" ")?;
            property.write_field(ty, ptr, self)?;
            if !self.at_line_start {
                self.insert_newline()?;
            }
        }
        self.decrement_tabs();

        self.insert_tabs()?;
        self.write_str("}")?;
        self.insert_newline()
    }
}

impl std::fmt::Debug for TextWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextWriter")
            .field("path", &self.path)
            .field("tabs", &self.tabs)
            .field("open", &self.open)
            .field("failed", &self.failed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_tabs_and_quotes() {
        let mut buf = Vec::new();
        {
            let mut writer = TextWriter::new(&mut buf).with_indent(2);
            writer.increment_tabs();
            writer.increment_tabs();
            writer.insert_tabs().unwrap();
            writer.write_quoted("say \"hi\"").unwrap();
            writer.insert_newline().unwrap();
            writer.decrement_tabs();
            writer.decrement_tabs();
            writer.decrement_tabs();
            assert_eq!(writer.tabs(), 0);
        }
        assert_eq!(String::from_utf8(buf).unwrap(), "    \"say \"hi\"\"\n");
    }

    #[test]
    fn test_failure_is_reported() {
        let mut writer = TextWriter::new(Broken);
        assert!(writer.is_good());
        assert!(matches!(writer.write_str("x"), Err(ReflectError::Io(_))));
        assert!(writer.failed());
        assert!(!writer.is_good());
    }

    #[test]
    fn test_closed_writer_rejects_output() {
        let mut writer = TextWriter::new(Vec::new());
        writer.close().unwrap();
        assert!(!writer.is_good());
        assert!(writer.write_str("late").is_err());
        assert!(writer.opened_file().is_none());
    }

    #[test]
    fn test_empty_value_is_not_written() {
        let mut writer = TextWriter::new(Vec::new());
        assert!(matches!(
            writer.write_value(&AnyValue::empty()),
            Err(ReflectError::NotWritable)
        ));
    }
}
