//! Parser input segmentation for recognized (plain) text.
//!
//! Primary segmentation is line-based. A secondary pass repairs the common
//! OCR failure where a whole prescription collapses into one long line: when
//! the line count is implausibly small relative to the number of inline
//! numbered-list markers, the text is re-split at the marker positions.

use crate::pipeline::lexicon::INLINE_MARKER;
use crate::pipeline::types::TextSegment;

/// Split normalized text into one segment per non-empty line.
pub fn segment_lines(text: &str) -> Vec<TextSegment> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .enumerate()
        .map(|(index, line)| TextSegment {
            index,
            text: line.to_string(),
        })
        .collect()
}

/// Re-segment collapsed text on numbered-marker positions when line-based
/// segmentation produced fewer segments than there are markers.
pub fn resegment_if_collapsed(text: &str, segments: Vec<TextSegment>) -> Vec<TextSegment> {
    let marker_count = INLINE_MARKER.find_iter(text).count();
    if marker_count < 2 || segments.len() >= marker_count {
        return segments;
    }

    tracing::debug!(
        segments = segments.len(),
        markers = marker_count,
        "collapsed prescription detected, re-splitting on markers"
    );

    let flat = text.replace('\n', " ");
    let starts: Vec<usize> = INLINE_MARKER
        .find_iter(&flat)
        // The match may open with the preceding whitespace; the block starts
        // at the digit itself.
        .map(|m| m.start() + flat[m.start()..].find(|c: char| c.is_ascii_digit()).unwrap_or(0))
        .collect();

    let mut out = Vec::with_capacity(starts.len() + 1);
    let mut index = 0;

    // Anything ahead of the first marker (header, patient block) stays one
    // segment so appointment/instruction scans still see it.
    if let Some(&first) = starts.first() {
        let head = flat[..first].trim();
        if !head.is_empty() {
            out.push(TextSegment {
                index,
                text: head.to_string(),
            });
            index += 1;
        }
    }

    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(flat.len());
        let block = flat[start..end].trim();
        if !block.is_empty() {
            out.push(TextSegment {
                index,
                text: block.to_string(),
            });
            index += 1;
        }
    }
    out
}

/// Full text front-end: line segmentation plus the collapse repair pass.
pub fn segment_text(text: &str) -> Vec<TextSegment> {
    let segments = segment_lines(text);
    resegment_if_collapsed(text, segments)
}
