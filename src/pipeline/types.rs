use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A document handed in by the upload collaborator.
///
/// Ephemeral: owned by the caller, never persisted by the pipeline.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub id: Uuid,
    pub payload: DocumentPayload,
}

impl RawDocument {
    pub fn image(bytes: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload: DocumentPayload::Image(bytes),
        }
    }

    pub fn pdf_text_layer(items: Vec<PdfTextItem>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload: DocumentPayload::PdfTextItems(items),
        }
    }
}

/// Source kind plus the raw content for that kind.
///
/// Scanned images carry encoded bytes; digital PDFs arrive as the
/// position-tagged text items their text layer already provides (the PDF
/// renderer collaborator is outside this core).
#[derive(Debug, Clone)]
pub enum DocumentPayload {
    Image(Vec<u8>),
    PdfTextItems(Vec<PdfTextItem>),
}

/// One positioned text run from a PDF text layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfTextItem {
    pub text: String,
    /// Top coordinate in page space; items on the same line share it.
    pub y: f32,
    /// Left coordinate, used to keep reading order within a line.
    pub x: f32,
    /// Annotation date attached to the item, when the document carries one.
    /// Authoritative over any date parsed out of the text.
    pub annotation_date: Option<NaiveDate>,
}

/// One OCR attempt: the recognized text, the engine's confidence and the
/// heuristic features the selector scores.
#[derive(Debug, Clone)]
pub struct RecognitionCandidate {
    pub text: String,
    /// Engine confidence scaled to 0–100.
    pub confidence: f32,
    pub strategy: &'static str,
    pub features: TextFeatures,
}

/// Structure signals derived from recognized text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFeatures {
    pub line_count: usize,
    pub has_numbered_list: bool,
    pub has_capitalized_token: bool,
}

/// A logical unit of parser input: one line, or one marker-delimited block.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSegment {
    pub index: usize,
    pub text: String,
}

/// Daily period a dose is tied to. `Ord` is the canonical daily order and is
/// relied on for both emission order and deduplicated output ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TimingTag {
    Morning,
    Noon,
    Afternoon,
    Evening,
    Night,
}

impl TimingTag {
    pub const ALL: [TimingTag; 5] = [
        TimingTag::Morning,
        TimingTag::Noon,
        TimingTag::Afternoon,
        TimingTag::Evening,
        TimingTag::Night,
    ];

    /// Canonical clock time for a timing word.
    pub fn clock_time(self) -> NaiveTime {
        let (h, m) = match self {
            TimingTag::Morning => (7, 0),
            TimingTag::Noon => (12, 0),
            TimingTag::Afternoon => (17, 0),
            TimingTag::Evening => (20, 0),
            TimingTag::Night => (22, 0),
        };
        NaiveTime::from_hms_opt(h, m, 0).expect("static clock time")
    }

    pub fn label_vi(self) -> &'static str {
        match self {
            TimingTag::Morning => "sáng",
            TimingTag::Noon => "trưa",
            TimingTag::Afternoon => "chiều",
            TimingTag::Evening => "tối",
            TimingTag::Night => "đêm",
        }
    }
}

/// One extracted medication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationRecord {
    pub name: String,
    /// Ordered, first-seen-wins; never merged across duplicate records.
    pub dosage_terms: Vec<String>,
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub frequency: Option<String>,
    /// BTreeSet keeps tags in the fixed daily order on iteration.
    pub timing: BTreeSet<TimingTag>,
    pub duration_text: Option<String>,
    pub instructions: Vec<String>,
}

impl MedicationRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dosage_terms: Vec::new(),
            quantity: None,
            unit: None,
            frequency: None,
            timing: BTreeSet::new(),
            duration_text: None,
            instructions: Vec::new(),
        }
    }

    /// A record with no dosage, frequency, timing and duration carries no
    /// actionable signal and is discarded by the parser's own gate.
    pub fn has_signal(&self) -> bool {
        !self.dosage_terms.is_empty()
            || self.frequency.is_some()
            || !self.timing.is_empty()
            || self.duration_text.is_some()
    }

    /// Push a dosage term unless the exact term is already present.
    pub fn push_dosage_term(&mut self, term: impl Into<String>) {
        let term = term.into();
        if !self.dosage_terms.contains(&term) {
            self.dosage_terms.push(term);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentKind {
    General,
    Specialist,
}

/// One extracted follow-up appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub kind: AppointmentKind,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub notes: Option<String>,
}

impl AppointmentRecord {
    /// Dateless, timeless appointments with trivial notes are noise.
    pub fn has_signal(&self) -> bool {
        self.date.is_some()
            || self.time.is_some()
            || self.notes.as_deref().map(|n| n.chars().count() > 10).unwrap_or(false)
    }
}

/// Free-text advisory line extracted independently of medication records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionNote(pub String);

/// Which path produced the final result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Local parse accepted by the orchestrator's predicate.
    Local,
    /// Remote extraction accepted.
    Remote,
    /// Remote attempted and failed; local result returned instead.
    LocalFallback,
    /// Remote disabled by configuration; local result is final regardless
    /// of the acceptance predicate.
    LocalOnly,
}

/// Structured output of one document's extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub medications: Vec<MedicationRecord>,
    pub appointments: Vec<AppointmentRecord>,
    pub instructions: Vec<InstructionNote>,
    pub method: ExtractionMethod,
    pub elapsed_ms: u64,
    /// Remote error carried as audit metadata on the fallback path.
    pub remote_error: Option<String>,
    /// Confidence of the winning recognition attempt; absent on the PDF
    /// text-layer path.
    pub ocr_confidence: Option<f32>,
    /// What the local parse found, kept for comparison when remote records
    /// replaced it.
    pub local_audit: Option<LocalAudit>,
}

/// Record counts of a local parse that lost to the remote result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAudit {
    pub medications: usize,
    pub appointments: usize,
}

impl ExtractionResult {
    pub fn empty(method: ExtractionMethod) -> Self {
        Self {
            medications: Vec::new(),
            appointments: Vec::new(),
            instructions: Vec::new(),
            method,
            elapsed_ms: 0,
            remote_error: None,
            ocr_confidence: None,
            local_audit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    Medication,
    Appointment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
    Daily,
}

/// One scheduled notification. Immutable after creation: regeneration
/// replaces the whole set, never patches individual events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderEvent {
    pub kind: ReminderKind,
    pub scheduled_at: NaiveDateTime,
    pub repeat: Option<Repeat>,
    pub title: String,
    pub body: String,
    /// True when the clock times were synthesized from a frequency-pattern
    /// fallback rather than explicit timing words.
    pub is_default_schedule: bool,
}

/// Outcome of the plausibility check over a whole extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlausibilityReport {
    /// 0–100 heuristic confidence that this is a genuine prescription.
    pub score: u8,
    pub is_valid: bool,
    pub warning: Option<String>,
}
