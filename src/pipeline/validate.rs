//! Plausibility check: is this extraction a genuine prescription?
//!
//! Weighted signals over the final record set produce a 0-100 score.
//! Scores of 60 and above pass cleanly, 40-59 pass with a low-confidence
//! warning, anything lower is rejected as likely not a prescription.

use tracing::info;

use super::lexicon;
use super::types::{ExtractionResult, MedicationRecord, PlausibilityReport};

const VALID_THRESHOLD: u8 = 60;
const WARNING_THRESHOLD: u8 = 40;

const MAX_PLAUSIBLE_MEDICATIONS: usize = 50;
const LOW_OCR_CONFIDENCE: f32 = 50.0;
const KEYWORD_POINTS: u32 = 2;
const KEYWORD_CAP: u32 = 10;

pub fn validate(result: &ExtractionResult) -> PlausibilityReport {
    // A document with no medications and no appointments has nothing a
    // prescription would have; short-circuit to a hard reject.
    if result.medications.is_empty() && result.appointments.is_empty() {
        return PlausibilityReport {
            score: 0,
            is_valid: false,
            warning: Some("không tìm thấy thuốc hay lịch hẹn nào".to_string()),
        };
    }

    let mut score = 0.0f32;

    let med_count = result.medications.len();
    if (1..=MAX_PLAUSIBLE_MEDICATIONS).contains(&med_count) {
        score += 20.0;
    }

    if med_count > 0 {
        let valid_names = result
            .medications
            .iter()
            .filter(|m| has_plausible_name(m))
            .count();
        score += 30.0 * valid_names as f32 / med_count as f32;

        let with_dosage = result
            .medications
            .iter()
            .filter(|m| !m.dosage_terms.is_empty())
            .count();
        score += 20.0 * with_dosage as f32 / med_count as f32;
    }

    if !result.appointments.is_empty() {
        score += 15.0;
    }
    if !result.instructions.is_empty()
        || result.medications.iter().any(|m| !m.instructions.is_empty())
    {
        score += 15.0;
    }

    let hits = lexicon::domain_keyword_hits(&searchable_text(result)) as u32;
    score += (hits * KEYWORD_POINTS).min(KEYWORD_CAP) as f32;

    let score = score.round().clamp(0.0, 100.0) as u8;
    let mut warning = match score {
        s if s >= VALID_THRESHOLD => None,
        s if s >= WARNING_THRESHOLD => {
            Some("độ tin cậy thấp, nên kiểm tra lại kết quả".to_string())
        }
        _ => Some("văn bản có vẻ không phải đơn thuốc".to_string()),
    };
    // A clean score can still ride on shaky recognition; surface that as
    // a quality warning without touching validity.
    if warning.is_none() {
        if let Some(conf) = result.ocr_confidence {
            if conf < LOW_OCR_CONFIDENCE {
                warning = Some("ảnh mờ, kết quả nhận dạng có thể thiếu chính xác".to_string());
            }
        }
    }
    let report = PlausibilityReport {
        score,
        is_valid: score >= WARNING_THRESHOLD,
        warning,
    };
    info!(
        score = report.score,
        is_valid = report.is_valid,
        medications = med_count,
        "plausibility check complete"
    );
    report
}

/// Lexical validity of an extracted drug name: long enough, not
/// boilerplate, and mostly letters.
fn has_plausible_name(med: &MedicationRecord) -> bool {
    let name = med.name.trim();
    if name.chars().count() < 3 || lexicon::is_stop_word(name) {
        return false;
    }
    let letters = name.chars().filter(|c| c.is_alphabetic()).count();
    letters * 2 > name.chars().count()
}

/// Everything keyword counting should see, concatenated.
fn searchable_text(result: &ExtractionResult) -> String {
    let mut text = String::new();
    for med in &result.medications {
        text.push_str(&med.name);
        text.push('\n');
        for i in &med.instructions {
            text.push_str(i);
            text.push('\n');
        }
    }
    for appt in &result.appointments {
        if let Some(notes) = &appt.notes {
            text.push_str(notes);
            text.push('\n');
        }
    }
    for note in &result.instructions {
        text.push_str(&note.0);
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{
        AppointmentKind, AppointmentRecord, ExtractionMethod, InstructionNote,
    };
    use chrono::NaiveDate;

    fn result() -> ExtractionResult {
        ExtractionResult::empty(ExtractionMethod::Local)
    }

    fn dosed(name: &str) -> MedicationRecord {
        let mut med = MedicationRecord::new(name);
        med.push_dosage_term("500mg");
        med
    }

    #[test]
    fn empty_extraction_scores_zero_and_is_invalid() {
        let report = validate(&result());
        assert_eq!(report.score, 0);
        assert!(!report.is_valid);
    }

    #[test]
    fn full_prescription_passes_cleanly() {
        let mut r = result();
        r.medications = vec![dosed("Paracetamol"), dosed("Amoxicillin")];
        r.appointments = vec![AppointmentRecord {
            kind: AppointmentKind::General,
            date: NaiveDate::from_ymd_opt(2025, 1, 20),
            time: None,
            notes: None,
        }];
        r.instructions = vec![InstructionNote("uống nhiều nước mỗi ngày".into())];

        // 20 (count) + 30 (names) + 20 (dosage) + 15 (appt) + 15 (instr)
        let report = validate(&r);
        assert_eq!(report.score, 100);
        assert!(report.is_valid);
        assert!(report.warning.is_none());
    }

    #[test]
    fn medications_alone_with_dosage_pass() {
        let mut r = result();
        r.medications = vec![dosed("Paracetamol")];

        // 20 + 30 + 20 = 70
        let report = validate(&r);
        assert_eq!(report.score, 70);
        assert!(report.is_valid);
        assert!(report.warning.is_none());
    }

    #[test]
    fn weak_extraction_passes_with_warning() {
        let mut r = result();
        let mut med = MedicationRecord::new("Paracetamol");
        med.frequency = Some("2 lần/ngày".into());
        r.medications = vec![med];

        // 20 + 30 + 0: dosage missing costs the clean-pass band
        let report = validate(&r);
        assert_eq!(report.score, 50);
        assert!(report.is_valid);
        assert!(report.warning.is_some());
    }

    #[test]
    fn garbage_names_drag_the_score_down() {
        let mut r = result();
        let mut garbage = MedicationRecord::new("12345678");
        garbage.push_dosage_term("500mg");
        r.medications = vec![garbage];

        // 20 + 0 (name all digits) + 20 = 40: barely passes, warned
        let report = validate(&r);
        assert_eq!(report.score, 40);
        assert!(report.is_valid);
        assert!(report.warning.is_some());
    }

    #[test]
    fn appointment_only_extraction_is_scored_not_gated() {
        let mut r = result();
        r.appointments = vec![AppointmentRecord {
            kind: AppointmentKind::Specialist,
            date: NaiveDate::from_ymd_opt(2025, 2, 1),
            time: None,
            notes: Some("tái khám chuyên khoa tim mạch".into()),
        }];

        // 15 (appt) + 2 ("tái khám" in notes): scored, but below threshold
        let report = validate(&r);
        assert_eq!(report.score, 17);
        assert!(!report.is_valid);
    }

    #[test]
    fn appointment_slip_with_instructions_passes_the_warning_band() {
        let mut r = result();
        r.appointments = vec![AppointmentRecord {
            kind: AppointmentKind::General,
            date: NaiveDate::from_ymd_opt(2025, 2, 1),
            time: None,
            notes: Some("tái khám tại phòng khám của bác sĩ, mang theo đơn thuốc".into()),
        }];
        r.instructions = vec![InstructionNote("nhịn ăn sáng trước khi đến bệnh viện".into())];

        // 15 (appt) + 15 (instr) + 10 (keyword cap): a medication-free
        // follow-up slip is plausible, with the low-confidence warning.
        let report = validate(&r);
        assert_eq!(report.score, 40);
        assert!(report.is_valid);
        assert!(report.warning.is_some());
    }

    #[test]
    fn low_recognition_confidence_warns_without_failing() {
        let mut r = result();
        r.medications = vec![dosed("Paracetamol")];
        r.ocr_confidence = Some(32.0);

        let report = validate(&r);
        assert_eq!(report.score, 70);
        assert!(report.is_valid);
        assert!(report.warning.as_deref().unwrap().contains("mờ"));
    }

    #[test]
    fn domain_keywords_add_capped_points() {
        let mut r = result();
        r.medications = vec![dosed("Paracetamol")];
        r.instructions = vec![InstructionNote(
            "đơn thuốc của bác sĩ tại bệnh viện, chẩn đoán viêm họng, liều dùng theo chỉ định, số lượng đủ 7 ngày, tái khám phòng khám cũ".into(),
        )];

        // 20 + 30 + 20 + 15 (instr) + 10 (keyword cap)
        let report = validate(&r);
        assert_eq!(report.score, 95);
    }
}
