//! Record deduplication and canonical output ordering.
//!
//! OCR noise and the two-source overlap (text dates plus annotation dates,
//! local plus remote records) produce near-duplicate records. Duplicates
//! are folded by canonical key; merging keeps the first-seen value for
//! scalar fields and unions the set-like ones.

use std::collections::HashMap;

use tracing::debug;

use super::types::{AppointmentRecord, ExtractionResult, InstructionNote, MedicationRecord};

/// Fold duplicates in place and order the output canonically.
pub fn dedup_result(result: &mut ExtractionResult) {
    let before = result.medications.len() + result.appointments.len();
    result.medications = dedup_medications(std::mem::take(&mut result.medications));
    result.appointments = dedup_appointments(std::mem::take(&mut result.appointments));
    result.instructions = dedup_instructions(std::mem::take(&mut result.instructions));
    let after = result.medications.len() + result.appointments.len();
    if after < before {
        debug!(folded = before - after, "deduplicated records");
    }
}

/// Key under which two medication records count as the same drug: the name
/// lowercased with everything but letters and digits removed. "Paracetamol",
/// "paracetamol." and "PARACETAMOL" all fold together.
fn medication_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

fn dedup_medications(medications: Vec<MedicationRecord>) -> Vec<MedicationRecord> {
    let mut merged: Vec<MedicationRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for med in medications {
        let key = medication_key(&med.name);
        match index.get(&key) {
            Some(&i) => merge_medication(&mut merged[i], med),
            None => {
                index.insert(key, merged.len());
                merged.push(med);
            }
        }
    }

    // Earliest daily timing first; untimed medications sink to the end.
    // The sort is stable, so first-seen order breaks ties.
    merged.sort_by_key(|m| m.timing.iter().next().copied().map(|t| t as u8).unwrap_or(u8::MAX));
    merged
}

/// First record wins every scalar; later records only contribute what the
/// first one was missing, plus their set-like fields.
fn merge_medication(kept: &mut MedicationRecord, other: MedicationRecord) {
    for term in other.dosage_terms {
        kept.push_dosage_term(term);
    }
    if kept.quantity.is_none() {
        kept.quantity = other.quantity;
    }
    if kept.unit.is_none() {
        kept.unit = other.unit;
    }
    if kept.frequency.is_none() {
        kept.frequency = other.frequency;
    }
    if kept.duration_text.is_none() {
        kept.duration_text = other.duration_text;
    }
    kept.timing.extend(other.timing);
    for instruction in other.instructions {
        if !kept.instructions.contains(&instruction) {
            kept.instructions.push(instruction);
        }
    }
}

fn dedup_appointments(appointments: Vec<AppointmentRecord>) -> Vec<AppointmentRecord> {
    let mut merged: Vec<AppointmentRecord> = Vec::new();

    // Duplicates keep the first record wholesale; later notes are dropped
    // rather than merged.
    for appt in appointments {
        let duplicate = merged
            .iter()
            .any(|kept| kept.kind == appt.kind && kept.date == appt.date && kept.time == appt.time);
        if !duplicate {
            merged.push(appt);
        }
    }

    merged
}

fn dedup_instructions(instructions: Vec<InstructionNote>) -> Vec<InstructionNote> {
    let mut seen: Vec<InstructionNote> = Vec::new();
    for note in instructions {
        if !seen.contains(&note) {
            seen.push(note);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{AppointmentKind, ExtractionMethod, TimingTag};
    use chrono::NaiveDate;

    fn med(name: &str) -> MedicationRecord {
        MedicationRecord::new(name)
    }

    fn result_with(medications: Vec<MedicationRecord>) -> ExtractionResult {
        ExtractionResult {
            medications,
            ..ExtractionResult::empty(ExtractionMethod::Local)
        }
    }

    #[test]
    fn case_and_punctuation_variants_fold_together() {
        let mut a = med("Paracetamol");
        a.push_dosage_term("500mg");
        a.timing.insert(TimingTag::Morning);

        let mut b = med("PARACETAMOL.");
        b.push_dosage_term("500mg");
        b.timing.insert(TimingTag::Evening);
        b.frequency = Some("2 lần/ngày".into());

        let mut result = result_with(vec![a, b]);
        dedup_result(&mut result);

        assert_eq!(result.medications.len(), 1);
        let kept = &result.medications[0];
        assert_eq!(kept.name, "Paracetamol");
        assert_eq!(kept.dosage_terms, vec!["500mg"]);
        assert_eq!(
            kept.timing.iter().copied().collect::<Vec<_>>(),
            vec![TimingTag::Morning, TimingTag::Evening]
        );
        assert_eq!(kept.frequency.as_deref(), Some("2 lần/ngày"));
    }

    #[test]
    fn first_record_wins_scalar_conflicts() {
        let mut a = med("Amoxicillin");
        a.frequency = Some("2 lần/ngày".into());
        a.timing.insert(TimingTag::Morning);
        let mut b = med("amoxicillin");
        b.frequency = Some("3 lần/ngày".into());
        b.quantity = Some("14".into());

        let mut result = result_with(vec![a, b]);
        dedup_result(&mut result);

        let kept = &result.medications[0];
        assert_eq!(kept.frequency.as_deref(), Some("2 lần/ngày"));
        // The gap the first record had is filled from the second.
        assert_eq!(kept.quantity.as_deref(), Some("14"));
    }

    #[test]
    fn output_is_ordered_by_earliest_timing_untimed_last() {
        let mut night = med("Loratadin");
        night.timing.insert(TimingTag::Night);
        let mut untimed = med("Oresol");
        untimed.frequency = Some("3 lần/ngày".into());
        let mut morning = med("Omeprazol");
        morning.timing.insert(TimingTag::Morning);
        morning.timing.insert(TimingTag::Evening);

        let mut result = result_with(vec![night, untimed, morning]);
        dedup_result(&mut result);

        let names: Vec<&str> = result.medications.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Omeprazol", "Loratadin", "Oresol"]);
    }

    #[test]
    fn ordering_is_stable_under_input_shuffles() {
        let build = |names: &[&str]| {
            let meds = names
                .iter()
                .map(|n| {
                    let mut m = med(n);
                    m.timing.insert(TimingTag::Morning);
                    m
                })
                .collect();
            let mut result = result_with(meds);
            dedup_result(&mut result);
            result
                .medications
                .into_iter()
                .map(|m| m.name)
                .collect::<Vec<_>>()
        };

        // Same timing tag everywhere: first-seen order is preserved, and a
        // duplicate's position is its first occurrence.
        assert_eq!(build(&["A1", "B2", "A1", "C3"]), vec!["A1", "B2", "C3"]);
        assert_eq!(build(&["C3", "A1", "B2"]), vec!["C3", "A1", "B2"]);
    }

    #[test]
    fn appointments_fold_on_kind_date_and_time() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 20);
        let a = AppointmentRecord {
            kind: AppointmentKind::General,
            date,
            time: None,
            notes: None,
        };
        let b = AppointmentRecord {
            kind: AppointmentKind::General,
            date,
            time: None,
            notes: Some("mang theo đơn thuốc cũ".into()),
        };
        let c = AppointmentRecord {
            kind: AppointmentKind::Specialist,
            date,
            time: None,
            notes: None,
        };

        let mut result = result_with(vec![]);
        result.appointments = vec![a, b, c];
        dedup_result(&mut result);

        assert_eq!(result.appointments.len(), 2);
        // First record wins wholesale; the duplicate's notes are not merged.
        assert_eq!(result.appointments[0].notes, None);
        assert_eq!(result.appointments[1].kind, AppointmentKind::Specialist);
    }

    #[test]
    fn duplicate_instruction_notes_fold() {
        let mut result = result_with(vec![]);
        result.instructions = vec![
            InstructionNote("uống nhiều nước mỗi ngày".into()),
            InstructionNote("uống nhiều nước mỗi ngày".into()),
        ];
        dedup_result(&mut result);
        assert_eq!(result.instructions.len(), 1);
    }
}
