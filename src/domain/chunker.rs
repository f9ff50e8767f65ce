//! Recursive text splitting.
//!
//! A document is first broken into pieces no longer than the chunk size,
//! trying paragraph breaks, then line breaks, sentence ends, clause marks and
//! finally spaces. Text with none of those is broken into single chars.
//! Pieces are then merged greedily into chunks, and each chunk after the first
//! starts up to `overlap` chars before the end of the previous one.
//!
//! Chunks are exact slices of the source, so dropping the leading `overlap`
//! chars of every chunk but the first and concatenating gives back the
//! original text.

use crate::domain::{errors::DomainError, ChunkMetadata, Document, DocumentChunk};

const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "! ", "? ", "; ", ", ", " "];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    max_length: usize,
    overlap: usize,
}

impl TextChunker {
    pub fn new(max_length: usize, overlap: usize) -> Result<Self, DomainError> {
        if max_length == 0 {
            return Err(DomainError::config("chunk size must be greater than 0"));
        }
        if overlap >= max_length {
            return Err(DomainError::config(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({max_length})"
            )));
        }
        Ok(Self {
            max_length,
            overlap,
        })
    }

    /// Lazily yields the chunks of `document` in source order.
    ///
    /// Blank documents yield nothing. Calling `split` again, or cloning the
    /// returned iterator, restarts from the first chunk.
    pub fn split<'a>(&self, document: &'a Document) -> Segments<'a> {
        let text = document.content.as_str();
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        offsets.push(text.len());

        let mut piece_ends = Vec::new();
        if !document.is_blank() {
            atomize(text, 0, self.max_length, SEPARATORS, &mut piece_ends);
        }

        Segments {
            document,
            offsets,
            piece_ends,
            max_length: self.max_length,
            overlap: self.overlap,
            next_piece: 0,
            previous: None,
            index: 0,
        }
    }
}

/// Iterator over the chunks of one document.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    document: &'a Document,
    /// Byte offset of every char, plus the text length.
    offsets: Vec<usize>,
    /// Char position where each piece ends, ascending.
    piece_ends: Vec<usize>,
    max_length: usize,
    overlap: usize,
    next_piece: usize,
    previous: Option<(usize, usize)>,
    index: usize,
}

impl Segments<'_> {
    fn char_at(&self, pos: usize) -> Option<char> {
        self.document.content[self.offsets[pos]..].chars().next()
    }

    fn is_word_start(&self, pos: usize) -> bool {
        pos > 0
            && self.char_at(pos - 1).is_some_and(char::is_whitespace)
            && self.char_at(pos).is_some_and(|c| !c.is_whitespace())
    }

    /// Where the chunk following `[prev_start, prev_end)` should begin.
    ///
    /// Prefers the first word start inside the overlap window. Inside an
    /// unbroken run the window is used as is; a window that only holds the
    /// tail of a word is skipped entirely.
    fn overlap_start(&self, prev_start: usize, prev_end: usize) -> usize {
        if self.overlap == 0 {
            return prev_end;
        }
        let lower = prev_end.saturating_sub(self.overlap).max(prev_start + 1);
        if lower >= prev_end {
            return prev_end;
        }

        if let Some(pos) = (lower..prev_end).find(|&p| self.is_word_start(p)) {
            return pos;
        }

        let unbroken = (lower - 1..prev_end)
            .all(|p| self.char_at(p).is_some_and(|c| !c.is_whitespace()));
        if unbroken {
            lower
        } else {
            prev_end
        }
    }
}

impl Iterator for Segments<'_> {
    type Item = DocumentChunk;

    fn next(&mut self) -> Option<DocumentChunk> {
        let first_end = *self.piece_ends.get(self.next_piece)?;

        let (start, shared) = match self.previous {
            None => (0, 0),
            Some((prev_start, prev_end)) => {
                // The next piece must still fit after the overlap.
                let start = self
                    .overlap_start(prev_start, prev_end)
                    .max(first_end.saturating_sub(self.max_length));
                (start, prev_end - start)
            }
        };

        let mut end = first_end;
        self.next_piece += 1;
        while let Some(&candidate) = self.piece_ends.get(self.next_piece) {
            if candidate - start > self.max_length {
                break;
            }
            end = candidate;
            self.next_piece += 1;
        }

        let content = &self.document.content[self.offsets[start]..self.offsets[end]];
        let chunk = DocumentChunk::new(self.document.id, content, self.index).with_metadata(
            ChunkMetadata {
                source: self.document.name.clone(),
                start,
                end,
                overlap: shared,
            },
        );

        self.previous = Some((start, end));
        self.index += 1;
        Some(chunk)
    }
}

/// Pushes the end positions of pieces no longer than `max_length` chars.
fn atomize(
    text: &str,
    base: usize,
    max_length: usize,
    separators: &[&str],
    ends: &mut Vec<usize>,
) {
    let len = text.chars().count();
    if len <= max_length {
        ends.push(base + len);
        return;
    }

    let Some((separator, rest)) = separators.split_first() else {
        ends.extend((1..=len).map(|i| base + i));
        return;
    };

    let parts = split_keeping_separator(text, separator);
    if parts.len() == 1 {
        atomize(text, base, max_length, rest, ends);
        return;
    }

    let mut pos = base;
    for part in parts {
        let part_len = part.chars().count();
        if part_len <= max_length {
            ends.push(pos + part_len);
        } else {
            atomize(part, pos, max_length, rest, ends);
        }
        pos += part_len;
    }
}

/// Split at `separator`, keeping it attached to the preceding part.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        parts.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        parts.push(&text[start..]);
    }

    parts
}
