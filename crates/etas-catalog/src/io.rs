//! Line sources and sinks consumed by section and file reading/writing.

use std::io::{BufRead, Write};

use crate::error::Result;

/// Pull-based supplier of lines. `Ok(None)` marks end of input.
pub trait LineSource {
    fn next_line(&mut self) -> Result<Option<String>>;
}

/// Push-based consumer of lines (without terminators).
pub trait LineSink {
    fn accept(&mut self, line: &str) -> Result<()>;
}

/// Adapts any iterator of strings into a [`LineSource`].
#[derive(Debug)]
pub struct IterSource<I> {
    inner: I,
}

impl<I> IterSource<I> {
    pub fn new(inner: I) -> Self {
        Self { inner }
    }
}

impl<I, S> LineSource for IterSource<I>
where
    I: Iterator<Item = S>,
    S: Into<String>,
{
    fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.inner.next().map(Into::into))
    }
}

/// Source over the lines of a string slice.
pub fn str_source(text: &str) -> IterSource<std::str::Lines<'_>> {
    IterSource::new(text.lines())
}

/// Reads lines from a buffered reader, stripping `\n` / `\r\n`.
#[derive(Debug)]
pub struct BufReadSource<R> {
    reader: R,
}

impl<R: BufRead> BufReadSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for BufReadSource<R> {
    fn next_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}

impl LineSink for Vec<String> {
    fn accept(&mut self, line: &str) -> Result<()> {
        self.push(line.to_string());
        Ok(())
    }
}

/// Writes each line followed by `\n`.
#[derive(Debug)]
pub struct WriteSink<W> {
    writer: W,
}

impl<W: Write> WriteSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> LineSink for WriteSink<W> {
    fn accept(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}
