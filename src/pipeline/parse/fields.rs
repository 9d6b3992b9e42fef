//! Per-record field extraction.
//!
//! A segment that yields a medication name opens a record span. Dosage terms
//! are read from the name's own line only: continuation lines of one
//! medication sit next to the name line of the next, and borrowing dosage
//! across that boundary cross-contaminates adjacent records. Quantity may
//! additionally come from an explicitly labeled "SL:" continuation line.
//! Frequency, timing, duration and instructions are lexically distinctive,
//! so they may come from a bounded lookahead window below the name line.

use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::lexicon::{
    self, DOSAGE_TERM, DURATION, FREQUENCY, LIST_MARKER, QUANTITY,
};
use crate::pipeline::types::{InstructionNote, MedicationRecord, TextSegment};

/// How many segments below the name line may contribute fields 4–7.
pub const LOOKAHEAD_WINDOW: usize = 5;

/// Trailing dosage baggage glued to a name token ("Paracetamol500mg").
static NAME_DOSE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?(?:mg|mcg|g|ml|ui|iu)?)$").unwrap()
});

/// Extract every valid medication record from the segment list.
pub fn extract_medications(segments: &[TextSegment]) -> Vec<MedicationRecord> {
    // Record spans are delimited by name-bearing segments.
    let starts: Vec<usize> = segments
        .iter()
        .enumerate()
        .filter(|(_, s)| extract_name(&s.text).is_some())
        .map(|(i, _)| i)
        .collect();

    let mut records = Vec::new();
    for (k, &start) in starts.iter().enumerate() {
        let span_end = starts
            .get(k + 1)
            .copied()
            .unwrap_or(segments.len())
            .min(start + 1 + LOOKAHEAD_WINDOW);

        if let Some(record) = extract_record(&segments[start..span_end]) {
            records.push(record);
        }
    }
    records
}

/// Build one record from its span (name line first). Returns `None` when the
/// signal gate fails; a span with no usable name never reaches here.
fn extract_record(span: &[TextSegment]) -> Option<MedicationRecord> {
    let name_line = &span[0].text;
    let (name, glued_dose) = extract_name_and_glued_dose(name_line)?;
    let mut record = MedicationRecord::new(name);

    // (2) dosage terms: name line only.
    if let Some(dose) = glued_dose {
        record.push_dosage_term(dose);
    }
    for m in DOSAGE_TERM.find_iter(name_line) {
        record.push_dosage_term(m.as_str().to_lowercase());
    }

    // (3) quantity + unit: name line, or a continuation line that carries
    // an explicit "SL:"/"số lượng" label. Unlabeled counts below the name
    // line stay ignored; they are usually the next record's dose advice.
    if let Some(caps) = QUANTITY.captures(name_line) {
        record.quantity = Some(caps[1].to_string());
        record.unit = Some(caps[2].to_lowercase());
    }

    // (4)–(7): whole span, bounded by the window and the next record.
    for seg in span {
        let line = &seg.text;

        if record.quantity.is_none() {
            if let Some(caps) = QUANTITY.captures(line) {
                let matched = caps[0].to_lowercase();
                if matched.starts_with("sl") || matched.starts_with("số lượng") {
                    record.quantity = Some(caps[1].to_string());
                    record.unit = Some(caps[2].to_lowercase());
                }
            }
        }

        if record.frequency.is_none() {
            if let Some(m) = FREQUENCY.find(line) {
                record.frequency = Some(m.as_str().trim().to_string());
            }
        }

        for tag in lexicon::timing_tags_in(line) {
            record.timing.insert(tag);
        }

        if record.duration_text.is_none() {
            if let Some(caps) = DURATION.captures(line) {
                let days = caps.get(1).or_else(|| caps.get(2));
                if let Some(days) = days {
                    record.duration_text = Some(format!("{} ngày", days.as_str()));
                }
            }
        }

        if lexicon::contains_instruction_keyword(line) && line.chars().count() >= 10 {
            let text = line.to_string();
            if !record.instructions.contains(&text) {
                record.instructions.push(text);
            }
        }
    }

    if record.has_signal() {
        Some(record)
    } else {
        tracing::debug!(name = %record.name, "medication without dosage/frequency/timing/duration dropped");
        None
    }
}

/// First capitalized token run of at least 3 characters that is not
/// stop-listed. Trailing digit/unit suffixes are stripped greedily; a dose
/// glued to the final name token is returned alongside the name.
pub fn extract_name(line: &str) -> Option<String> {
    extract_name_and_glued_dose(line).map(|(name, _)| name)
}

fn extract_name_and_glued_dose(line: &str) -> Option<(String, Option<String>)> {
    let body = LIST_MARKER.replace(line, "");
    // Labels like "SL:" keep their colon through tokenization; punctuation
    // never belongs to a name, so trim it before any length or stop-word
    // check can see it.
    let tokens: Vec<&str> = body
        .split_whitespace()
        .map(|t| t.trim_end_matches(|c: char| !c.is_alphanumeric()))
        .collect();

    let mut i = 0;
    while i < tokens.len() {
        if !starts_uppercase(tokens[i]) || lexicon::is_stop_word(tokens[i]) {
            i += 1;
            continue;
        }

        // Extend the run over consecutive capitalized tokens.
        let mut run = Vec::new();
        let mut glued_dose = None;
        let mut j = i;
        while j < tokens.len() && starts_uppercase(tokens[j]) && !lexicon::is_stop_word(tokens[j])
        {
            let (stripped, dose) = strip_dose_suffix(tokens[j]);
            if dose.is_some() {
                glued_dose = dose;
            }
            if !stripped.is_empty() {
                run.push(stripped);
            }
            // A dose suffix ends the name run.
            if glued_dose.is_some() {
                j += 1;
                break;
            }
            j += 1;
        }

        let name = run.join(" ");
        if name.chars().count() >= 3 {
            return Some((name, glued_dose));
        }
        i = j.max(i + 1);
    }
    None
}

fn starts_uppercase(token: &str) -> bool {
    token.chars().next().is_some_and(|c| c.is_uppercase())
}

/// Greedily strip trailing digits and digit+unit groups from a name token.
/// Returns the cleaned token and the dose term when one was glued on.
fn strip_dose_suffix(token: &str) -> (String, Option<String>) {
    let mut current = token.to_string();
    let mut dose = None;

    while let Some(m) = NAME_DOSE_SUFFIX.find(&current) {
        if m.as_str().is_empty() || m.start() == 0 {
            break;
        }
        let suffix = m.as_str().to_lowercase();
        // Only a number+unit group is a dose; bare trailing digits are
        // recognition noise and just dropped.
        if suffix.chars().any(|c| c.is_alphabetic()) {
            dose = Some(suffix);
        }
        current.truncate(m.start());
    }
    (current, dose)
}

/// Advisory lines extracted independently of any medication span.
pub fn extract_instruction_notes(segments: &[TextSegment]) -> Vec<InstructionNote> {
    segments
        .iter()
        .filter(|s| {
            lexicon::contains_instruction_keyword(&s.text) && s.text.chars().count() >= 10
        })
        .map(|s| InstructionNote(s.text.clone()))
        .collect()
}
