//! Follow-up appointment extraction.
//!
//! Scans for follow-up keywords, then looks for date and time patterns in a
//! bounded window below the keyword line. A date carried by a document
//! annotation layer (PDF variant) is authoritative over text-derived dates.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;

use crate::pipeline::lexicon::{self, SPECIALIST_KEYWORDS};
use crate::pipeline::types::{AppointmentKind, AppointmentRecord, TextSegment};

/// Lines below the keyword line that may still carry its date/time.
const DATE_LOOKAHEAD: usize = 3;

/// Day-first numeric date: 20-01-2025, 20/01/2025, 20.01.2025.
static DATE_DMY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})[-/.](\d{1,2})[-/.](\d{4})\b").unwrap());

/// ISO date as some printed forms emit it.
static DATE_ISO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());

/// Clock time: 08:00, 8h30, 14h.
static TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})(?::(\d{2})|h(\d{2})?)\b").unwrap());

/// Per-segment annotation dates, keyed by segment index. Empty for the
/// plain-text variant.
pub type AnnotationDates = std::collections::HashMap<usize, NaiveDate>;

pub fn extract_appointments(
    segments: &[TextSegment],
    annotations: &AnnotationDates,
) -> Vec<AppointmentRecord> {
    let mut out = Vec::new();

    for (i, seg) in segments.iter().enumerate() {
        if !lexicon::contains_appointment_keyword(&seg.text) {
            continue;
        }

        let lower = seg.text.to_lowercase();
        let kind = if SPECIALIST_KEYWORDS.iter().any(|k| lower.contains(k)) {
            AppointmentKind::Specialist
        } else {
            AppointmentKind::General
        };

        let window_end = (i + 1 + DATE_LOOKAHEAD).min(segments.len());
        let window = &segments[i..window_end];

        let annotated = window.iter().find_map(|s| annotations.get(&s.index)).copied();
        let date = annotated.or_else(|| window.iter().find_map(|s| parse_date(&s.text)));
        let time = window.iter().find_map(|s| parse_time(&s.text));

        let notes = appointment_notes(&seg.text);
        let record = AppointmentRecord {
            kind,
            date,
            time,
            notes,
        };

        if record.has_signal() {
            tracing::debug!(?kind, ?date, ?time, "follow-up appointment extracted");
            out.push(record);
        }
    }
    out
}

/// First parseable date in a line. Day-first forms are tried before ISO,
/// matching how Vietnamese prescriptions are printed.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    if let Some(caps) = DATE_DMY.captures(text) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        if let Some(d) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(d);
        }
    }
    if let Some(caps) = DATE_ISO.captures(text) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    None
}

/// First clock time in a line: colon form or Vietnamese "h" form.
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    for caps in TIME.captures_iter(text) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps
            .get(2)
            .or_else(|| caps.get(3))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        // Reject date fragments like "20-01" read as hours.
        if hour < 24 && minute < 60 {
            return NaiveTime::from_hms_opt(hour, minute, 0);
        }
    }
    None
}

/// The keyword line stripped of its date/time patterns; what remains is the
/// human note ("mang theo kết quả xét nghiệm").
fn appointment_notes(line: &str) -> Option<String> {
    let without_date = DATE_DMY.replace_all(line, "");
    let without_iso = DATE_ISO.replace_all(&without_date, "");
    let without_time = TIME.replace_all(&without_iso, "");
    let cleaned = without_time
        .trim()
        .trim_matches(|c: char| matches!(c, ':' | ',' | '-' | '.'))
        .trim()
        .to_string();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
