//! Buffer replicas.
//!
//! A [`BufferReplica`] is the server's copy of one open file: its text plus
//! the version that text corresponds to. Replicas are values. An edit
//! produces a new replica rather than mutating the old one, so text and
//! version always change together.
//!
//! Text is stored in a [`Rope`], which makes row/column addressing and
//! cloning cheap regardless of file size. Line breaks are `\n`, `\r\n` and
//! lone `\r`; columns count chars.

use file_types::{Point, Range};
use ropey::{Rope, RopeSlice};
use sha2::{Digest, Sha256};

use crate::error::RangeError;

/// Text and version of one open file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferReplica {
    text: Rope,
    version: u64,
}

impl BufferReplica {
    /// Create a replica holding `contents` at `version`.
    pub fn new(contents: &str, version: u64) -> Self {
        Self {
            text: Rope::from_str(contents),
            version,
        }
    }

    /// The full text.
    pub fn text(&self) -> String {
        self.text.to_string()
    }

    /// The underlying rope.
    pub fn rope(&self) -> &Rope {
        &self.text
    }

    /// The version the text corresponds to.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Length of the text in chars.
    pub fn len_chars(&self) -> usize {
        self.text.len_chars()
    }

    /// Number of lines. An empty buffer has one (empty) line.
    pub fn line_count(&self) -> usize {
        self.text.len_lines()
    }

    /// Position just past the last char.
    pub fn end_point(&self) -> Point {
        let last_row = self.text.len_lines() - 1;
        Point::new(
            last_row as u32,
            line_content_len(self.text.line(last_row)) as u32,
        )
    }

    /// Range covering the whole buffer.
    pub fn range(&self) -> Range {
        Range::new(Point::ZERO, self.end_point())
    }

    /// Text inside `range`.
    pub fn text_in_range(&self, range: &Range) -> Result<String, RangeError> {
        let (start, end) = self.char_span(range)?;
        Ok(self.text.slice(start..end).to_string())
    }

    /// A new replica with `range` replaced by `new_text`, at `version`.
    ///
    /// `self` is left untouched, so a failed edit never leaves a
    /// half-applied replica behind.
    pub fn with_edit(&self, range: &Range, new_text: &str, version: u64) -> Result<Self, RangeError> {
        let (start, end) = self.char_span(range)?;
        let mut text = self.text.clone();
        text.remove(start..end);
        text.insert(start, new_text);
        Ok(Self { text, version })
    }

    /// Hex SHA-256 of the text.
    ///
    /// Two replicas with the same digest hold identical text, which makes
    /// it cheap to compare server and client state when chasing drift.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for chunk in self.text.chunks() {
            hasher.update(chunk.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Resolve a range to `[start, end)` char indices.
    fn char_span(&self, range: &Range) -> Result<(usize, usize), RangeError> {
        if !range.is_ordered() {
            return Err(RangeError::Reversed { range: *range });
        }
        Ok((self.char_index(range.start)?, self.char_index(range.end)?))
    }

    fn char_index(&self, point: Point) -> Result<usize, RangeError> {
        let row = point.row as usize;
        let line_count = self.text.len_lines();
        if row >= line_count {
            return Err(RangeError::RowOutOfBounds {
                row: point.row,
                line_count,
            });
        }

        let line_len = line_content_len(self.text.line(row));
        let column = point.column as usize;
        if column > line_len {
            return Err(RangeError::ColumnOutOfBounds { point, line_len });
        }

        Ok(self.text.line_to_char(row) + column)
    }
}

/// Range occupied by `text` once inserted at `start`.
#[cfg(test)]
pub(crate) fn range_after_insert(start: Point, text: &str) -> Range {
    let inserted = Rope::from_str(text);
    let extra_rows = inserted.len_lines() - 1;
    let last_len = line_content_len(inserted.line(extra_rows)) as u32;
    let end = if extra_rows == 0 {
        Point::new(start.row, start.column + last_len)
    } else {
        Point::new(start.row + extra_rows as u32, last_len)
    };
    Range::new(start, end)
}

/// Length of a line without its terminator.
fn line_content_len(line: RopeSlice<'_>) -> usize {
    let mut len = line.len_chars();
    if len > 0 && line.char(len - 1) == '\n' {
        len -= 1;
    }
    if len > 0 && line.char(len - 1) == '\r' {
        len -= 1;
    }
    len
}
