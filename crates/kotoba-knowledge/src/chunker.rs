// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sliding-window text chunker with exact overlap guarantees.
//!
//! [`split`] cuts text into character-bounded segments where consecutive
//! segments share exactly `overlap` characters, so concatenating the
//! segments with overlaps removed reconstructs the input byte-for-byte.
//! [`split_markdown`] packs heading/paragraph blocks under the same size
//! budget before falling back to the windowed splitter for oversized blocks.

use kotoba_core::KotobaError;

/// Split `text` into segments of at most `max_size` characters where
/// consecutive segments share exactly `overlap` characters.
///
/// Guarantees:
/// - every segment's char length <= `max_size`;
/// - segment `i+1` begins with the last `overlap` chars of segment `i`;
/// - segments cover the entire input with no gaps;
/// - deterministic for a given input and parameters.
///
/// Input no longer than `max_size` yields a single segment with no overlap
/// applied. Fails with `InvalidParameter` when `max_size == 0` or
/// `overlap >= max_size`.
pub fn split(text: &str, max_size: usize, overlap: usize) -> Result<Vec<String>, KotobaError> {
    validate_params(max_size, overlap)?;

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_size {
        return Ok(vec![text.to_string()]);
    }

    let step = max_size - overlap;
    let mut segments = Vec::with_capacity(chars.len() / step + 1);
    let mut start = 0;

    loop {
        let end = (start + max_size).min(chars.len());
        segments.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok(segments)
}

/// Split `text` like [`split`], additionally reporting each segment's
/// character span `(start, end)` within the input.
pub fn split_with_spans(
    text: &str,
    max_size: usize,
    overlap: usize,
) -> Result<Vec<(String, usize, usize)>, KotobaError> {
    validate_params(max_size, overlap)?;

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_size {
        return Ok(vec![(text.to_string(), 0, chars.len())]);
    }

    let step = max_size - overlap;
    let mut segments = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + max_size).min(chars.len());
        segments.push((chars[start..end].iter().collect(), start, end));
        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok(segments)
}

/// Split markdown-ish text on heading and paragraph boundaries, packing
/// blocks into segments no longer than `max_size` characters.
///
/// A heading line (`#`-prefixed paragraph) always starts a fresh segment.
/// A single block longer than `max_size` falls back to the windowed
/// splitter, which preserves the overlap guarantee within that block.
pub fn split_markdown(
    text: &str,
    max_size: usize,
    overlap: usize,
) -> Result<Vec<String>, KotobaError> {
    validate_params(max_size, overlap)?;

    let mut segments: Vec<String> = Vec::new();
    let mut buffer = String::new();
    let mut buffer_chars = 0usize;

    for block in text.split("\n\n") {
        let trimmed = block.trim();
        if trimmed.is_empty() {
            continue;
        }
        let block_chars = trimmed.chars().count();
        let is_heading = trimmed.starts_with('#');

        let joined_chars = if buffer.is_empty() {
            block_chars
        } else {
            buffer_chars + 2 + block_chars
        };

        if !buffer.is_empty() && (is_heading || joined_chars > max_size) {
            segments.push(std::mem::take(&mut buffer));
            buffer_chars = 0;
        }

        if block_chars > max_size {
            // Oversized block: flush anything pending, then window it.
            if !buffer.is_empty() {
                segments.push(std::mem::take(&mut buffer));
                buffer_chars = 0;
            }
            segments.extend(split(trimmed, max_size, overlap)?);
            continue;
        }

        if buffer.is_empty() {
            buffer.push_str(trimmed);
            buffer_chars = block_chars;
        } else {
            buffer.push_str("\n\n");
            buffer.push_str(trimmed);
            buffer_chars += 2 + block_chars;
        }
    }

    if !buffer.is_empty() {
        segments.push(buffer);
    }

    if segments.is_empty() {
        segments.push(String::new());
    }

    Ok(segments)
}

fn validate_params(max_size: usize, overlap: usize) -> Result<(), KotobaError> {
    if max_size == 0 {
        return Err(KotobaError::InvalidParameter(
            "chunk max_size must be at least 1".to_string(),
        ));
    }
    if overlap >= max_size {
        return Err(KotobaError::InvalidParameter(format!(
            "chunk overlap ({overlap}) must be smaller than max_size ({max_size})"
        )));
    }
    Ok(())
}
