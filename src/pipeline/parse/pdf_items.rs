//! PDF text-layer front-end.
//!
//! A digital PDF arrives as position-tagged text items, so record boundaries
//! are precise: items are grouped into lines by vertical position, kept in
//! reading order by horizontal position, and separator runs of repeated
//! dashes act as explicit delimiters between records. Annotation dates on
//! items are collected per line for the appointment scan, where they are
//! authoritative over text-derived dates.

use super::appointment::AnnotationDates;
use crate::pipeline::types::{PdfTextItem, TextSegment};

/// Items within this vertical distance belong to the same line.
const LINE_TOLERANCE: f32 = 2.0;

/// Minimum run of dashes that reads as a record separator.
const SEPARATOR_MIN_RUN: usize = 3;

/// Segmented PDF text plus the annotation dates found along the way.
#[derive(Debug, Default)]
pub struct PdfSegments {
    pub segments: Vec<TextSegment>,
    pub annotations: AnnotationDates,
}

/// Group positioned items into line segments.
pub fn segment_pdf_items(items: &[PdfTextItem]) -> PdfSegments {
    if items.is_empty() {
        return PdfSegments::default();
    }

    let mut sorted: Vec<&PdfTextItem> = items.iter().collect();
    sorted.sort_by(|a, b| {
        a.y.partial_cmp(&b.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut lines: Vec<Vec<&PdfTextItem>> = Vec::new();
    for item in sorted {
        match lines.last_mut() {
            Some(line) if (item.y - line[0].y).abs() <= LINE_TOLERANCE => line.push(item),
            _ => lines.push(vec![item]),
        }
    }
    // Jitter within the tolerance can put a right-hand item first in the
    // y-sorted stream; reading order within a line is x order.
    for line in &mut lines {
        line.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
    }

    let mut out = PdfSegments::default();
    let mut index = 0;
    for line in lines {
        let text = line
            .iter()
            .map(|i| i.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if text.is_empty() || is_separator(&text) {
            continue;
        }
        if let Some(date) = line.iter().find_map(|i| i.annotation_date) {
            out.annotations.insert(index, date);
        }
        out.segments.push(TextSegment { index, text });
        index += 1;
    }
    out
}

/// A run of dashes (any common dash glyph) with nothing else on the line.
fn is_separator(text: &str) -> bool {
    let dashes = text
        .chars()
        .filter(|c| matches!(c, '-' | '–' | '—' | '_'))
        .count();
    dashes >= SEPARATOR_MIN_RUN && dashes == text.chars().filter(|c| !c.is_whitespace()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn item(text: &str, x: f32, y: f32) -> PdfTextItem {
        PdfTextItem {
            text: text.into(),
            x,
            y,
            annotation_date: None,
        }
    }

    #[test]
    fn items_group_into_lines_in_reading_order() {
        let items = vec![
            item("500mg", 120.0, 100.0),
            item("1. Paracetamol", 10.0, 100.5),
            item("2. Amoxicillin 250mg", 10.0, 130.0),
        ];
        let parsed = segment_pdf_items(&items);
        assert_eq!(parsed.segments.len(), 2);
        assert_eq!(parsed.segments[0].text, "1. Paracetamol 500mg");
        assert_eq!(parsed.segments[1].text, "2. Amoxicillin 250mg");
    }

    #[test]
    fn separator_runs_dropped() {
        let items = vec![
            item("1. Paracetamol 500mg", 10.0, 100.0),
            item("----------------", 10.0, 115.0),
            item("2. Berberin 100mg", 10.0, 130.0),
        ];
        let parsed = segment_pdf_items(&items);
        assert_eq!(parsed.segments.len(), 2);
        assert_eq!(parsed.segments[1].index, 1);
    }

    #[test]
    fn dashes_inside_text_are_not_separators() {
        let items = vec![item("Tái khám ngày 20-01-2025", 10.0, 100.0)];
        let parsed = segment_pdf_items(&items);
        assert_eq!(parsed.segments.len(), 1);
    }

    #[test]
    fn annotation_dates_keyed_by_segment() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 22).unwrap();
        let items = vec![
            item("1. Paracetamol 500mg", 10.0, 100.0),
            PdfTextItem {
                text: "Tái khám".into(),
                x: 10.0,
                y: 130.0,
                annotation_date: Some(date),
            },
        ];
        let parsed = segment_pdf_items(&items);
        assert_eq!(parsed.annotations.get(&1), Some(&date));
    }

    #[test]
    fn empty_input_yields_nothing() {
        let parsed = segment_pdf_items(&[]);
        assert!(parsed.segments.is_empty());
        assert!(parsed.annotations.is_empty());
    }
}
