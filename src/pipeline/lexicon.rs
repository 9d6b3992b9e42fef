//! Shared prescription vocabulary: stop words, timing words, dosage units,
//! frequency/duration patterns and segment classification.
//!
//! Everything downstream (parser, remote payload filter, validator) reads the
//! same tables so a word classified as "timing" in one place cannot be a
//! medication name in another.

use std::sync::LazyLock;

use regex::Regex;

use super::types::TimingTag;

/// Capitalized lead tokens that are prescription boilerplate, never drug
/// names. Lowercase, diacritics included; compared case-insensitively.
/// "sl" and "đc" are the quantity and address label abbreviations.
const STOP_WORDS: &[&str] = &[
    "bác", "bảo", "bệnh", "chẩn", "chiều", "chú", "dùng", "đc", "đêm",
    "điều", "đoán", "đơn", "ghi", "giờ", "hẹn", "họ", "khám", "kê", "liều",
    "lưu", "ngày", "người", "phòng", "sáng", "sau", "sl", "số", "tái",
    "tên", "thuốc", "toa", "tối", "trưa", "trước", "tuổi", "uống", "viên",
    "địa",
];

/// Dosage units that may be glued to a number ("500mg").
pub const DOSE_UNITS: &[&str] = &["mg", "mcg", "g", "ml", "ui", "iu"];

/// Dispensing units used in quantity lines ("SL: 14 viên").
pub const PACKAGE_UNITS: &[&str] = &["viên", "gói", "ống", "chai", "lọ", "tuýp"];

/// `<number><unit>` dosage term, as emitted by the normalizer (unit glued).
pub static DOSAGE_TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d+(?:\.\d+)?(?:mg|mcg|g|ml|ui|iu)\b").unwrap()
});

/// Quantity plus dispensing unit, with or without an "SL:" style prefix.
pub static QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:(?:sl|số lượng)\s*:?\s*)?(\d{1,3})\s*(viên|gói|ống|chai|lọ|tuýp)\b")
        .unwrap()
});

/// Dose frequency: "2 lần/ngày", "ngày uống 2 lần", "ngày 2 lần".
pub static FREQUENCY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d)\s*lần\s*/\s*ngày|ngày\s+(?:uống\s+)?(\d)\s*lần").unwrap()
});

/// Treatment duration: "trong 7 ngày", "x 7 ngày", "7 ngày". The negative
/// class ahead of the number keeps "lần/ngày" from matching as a duration.
pub static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:trong|x)\s*(\d{1,3})\s*ngày|(?:^|[^/\d])(\d{1,3})\s*ngày").unwrap()
});

/// Numbered-list marker at the start of a line: "1.", "12)".
pub static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d{1,2}[.)]\s+").unwrap());

/// Numbered-list markers anywhere in running text, for detecting a
/// prescription that collapsed into one recognized line.
pub static INLINE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(\d{1,2})[.)]\s+\p{Lu}").unwrap());

/// Follow-up appointment keywords. Checked lowercase.
pub const APPOINTMENT_KEYWORDS: &[&str] = &["tái khám", "khám lại", "hẹn khám"];

/// Marks a follow-up as specialist rather than general.
pub const SPECIALIST_KEYWORDS: &[&str] = &["chuyên khoa"];

/// Advisory keywords that flag a free-text instruction line.
pub const INSTRUCTION_KEYWORDS: &[&str] = &[
    "lưu ý", "kiêng", "tránh", "không uống rượu", "uống nhiều nước",
    "nghỉ ngơi", "sau ăn", "trước ăn", "sau khi ăn", "trước khi ăn",
    "theo dõi", "nếu",
];

/// Domain keywords the plausibility validator counts as prescription signal.
pub const DOMAIN_KEYWORDS: &[&str] = &[
    "đơn thuốc", "toa thuốc", "chẩn đoán", "bác sĩ", "bệnh viện",
    "phòng khám", "liều dùng", "cách dùng", "số lượng", "tái khám",
];

/// How a line participates in the prescription, for remote payload filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentClass {
    Medication,
    Appointment,
    Instruction,
    Other,
}

pub fn is_stop_word(token: &str) -> bool {
    let lower = token.to_lowercase();
    STOP_WORDS.contains(&lower.as_str())
}

/// Map a timing word (diacritics already restored) to its tag.
pub fn timing_tag(word: &str) -> Option<TimingTag> {
    match word.to_lowercase().as_str() {
        "sáng" => Some(TimingTag::Morning),
        "trưa" => Some(TimingTag::Noon),
        "chiều" => Some(TimingTag::Afternoon),
        "tối" => Some(TimingTag::Evening),
        "đêm" | "khuya" => Some(TimingTag::Night),
        _ => None,
    }
}

/// All timing tags mentioned in a piece of text, in daily order.
pub fn timing_tags_in(text: &str) -> Vec<TimingTag> {
    let mut found = std::collections::BTreeSet::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        if let Some(tag) = timing_tag(word) {
            found.insert(tag);
        }
    }
    found.into_iter().collect()
}

pub fn contains_appointment_keyword(line: &str) -> bool {
    let lower = line.to_lowercase();
    APPOINTMENT_KEYWORDS.iter().any(|k| lower.contains(k))
}

pub fn contains_instruction_keyword(line: &str) -> bool {
    let lower = line.to_lowercase();
    INSTRUCTION_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Count distinct domain keywords present in the text.
pub fn domain_keyword_hits(text: &str) -> usize {
    let lower = text.to_lowercase();
    DOMAIN_KEYWORDS.iter().filter(|k| lower.contains(*k)).count()
}

/// Classify one line for the remote payload filter. Medication signal wins
/// over instruction signal because dosage lines often embed advice too.
pub fn classify_segment(line: &str) -> SegmentClass {
    if contains_appointment_keyword(line) {
        return SegmentClass::Appointment;
    }
    if LIST_MARKER.is_match(line) || DOSAGE_TERM.is_match(line) || FREQUENCY.is_match(line) {
        return SegmentClass::Medication;
    }
    if contains_instruction_keyword(line) {
        return SegmentClass::Instruction;
    }
    SegmentClass::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_words_catch_boilerplate_case_insensitively() {
        assert!(is_stop_word("Thuốc"));
        assert!(is_stop_word("tái"));
        assert!(is_stop_word("UỐNG"));
        assert!(!is_stop_word("Paracetamol"));
    }

    #[test]
    fn timing_words_map_to_tags() {
        assert_eq!(timing_tag("sáng"), Some(TimingTag::Morning));
        assert_eq!(timing_tag("Tối"), Some(TimingTag::Evening));
        assert_eq!(timing_tag("đêm"), Some(TimingTag::Night));
        assert_eq!(timing_tag("500mg"), None);
    }

    #[test]
    fn timing_tags_in_line_come_out_in_daily_order() {
        let tags = timing_tags_in("uống tối và sáng sau ăn");
        assert_eq!(tags, vec![TimingTag::Morning, TimingTag::Evening]);
    }

    #[test]
    fn dosage_term_matches_glued_units() {
        assert!(DOSAGE_TERM.is_match("Paracetamol 500mg"));
        assert!(DOSAGE_TERM.is_match("2.5ml mỗi lần"));
        assert!(!DOSAGE_TERM.is_match("uống sau ăn"));
    }

    #[test]
    fn frequency_matches_both_phrasings() {
        assert!(FREQUENCY.is_match("2 lần/ngày"));
        assert!(FREQUENCY.is_match("ngày uống 3 lần"));
        assert!(FREQUENCY.is_match("Ngày 2 lần"));
        assert!(!FREQUENCY.is_match("trong 7 ngày"));
    }

    #[test]
    fn duration_does_not_eat_frequency() {
        assert!(DURATION.is_match("trong 7 ngày"));
        assert!(DURATION.is_match("x 5 ngày"));
        // "2 lần/ngày" alone must not read as a 2-day duration
        let caps = DURATION.captures("2 lần/ngày");
        assert!(caps.is_none());
    }

    #[test]
    fn list_markers() {
        assert!(LIST_MARKER.is_match("1. Paracetamol 500mg"));
        assert!(LIST_MARKER.is_match(" 12) Amoxicillin"));
        assert!(!LIST_MARKER.is_match("Paracetamol 1. viên"));
    }

    #[test]
    fn classify_lines() {
        assert_eq!(
            classify_segment("1. Paracetamol 500mg sáng tối"),
            SegmentClass::Medication
        );
        assert_eq!(
            classify_segment("Tái khám ngày: 20-01-2025"),
            SegmentClass::Appointment
        );
        assert_eq!(
            classify_segment("Lưu ý: uống nhiều nước, nghỉ ngơi"),
            SegmentClass::Instruction
        );
        assert_eq!(classify_segment("BỆNH VIỆN ĐA KHOA"), SegmentClass::Other);
    }

    #[test]
    fn domain_keywords_counted_once_each() {
        let text = "ĐƠN THUỐC — bác sĩ Nguyễn, chẩn đoán viêm họng, bác sĩ ký tên";
        assert_eq!(domain_keyword_hits(text), 3);
    }
}
