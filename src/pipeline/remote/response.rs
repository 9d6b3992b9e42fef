//! Lenient parsing of the remote completion.
//!
//! Completion models wrap JSON in markdown fences, prepend prose, or emit
//! half-broken items. The parse is forgiving at every level: fences are
//! stripped, the JSON object is located by substring when needed, and array
//! items that fail to deserialize are skipped instead of failing the whole
//! reply. Only a reply with no parseable JSON object at all is an error.

use serde::Deserialize;

use super::RemoteError;
use crate::pipeline::lexicon;
use crate::pipeline::parse::appointment::{parse_date, parse_time};
use crate::pipeline::parse::ParsedDocument;
use crate::pipeline::types::{
    AppointmentKind, AppointmentRecord, InstructionNote, MedicationRecord,
};

#[derive(Deserialize)]
struct RawCompletion {
    medications: Option<Vec<serde_json::Value>>,
    appointments: Option<Vec<serde_json::Value>>,
    instructions: Option<Vec<serde_json::Value>>,
    #[allow(dead_code)]
    summary: Option<String>,
}

#[derive(Deserialize)]
struct RawMedication {
    name: String,
    dosage: Option<String>,
    quantity: Option<String>,
    unit: Option<String>,
    frequency: Option<String>,
    #[serde(default)]
    timing: Vec<String>,
    duration: Option<String>,
    #[serde(default)]
    instructions: Vec<String>,
}

#[derive(Deserialize)]
struct RawAppointment {
    #[serde(rename = "type")]
    kind: Option<String>,
    date: Option<String>,
    time: Option<String>,
    notes: Option<String>,
}

/// Parse a raw completion into records. The same record gates as the local
/// parser apply: the remote model does not get to bypass them.
pub fn parse_completion(raw: &str) -> Result<ParsedDocument, RemoteError> {
    let json_str = locate_json(raw)
        .ok_or_else(|| RemoteError::MalformedResponse("no JSON object in reply".into()))?;

    let completion: RawCompletion = serde_json::from_str(json_str)
        .map_err(|e| RemoteError::MalformedResponse(e.to_string()))?;

    let medications = lenient_items::<RawMedication>(completion.medications)
        .into_iter()
        .filter_map(convert_medication)
        .collect();
    let appointments = lenient_items::<RawAppointment>(completion.appointments)
        .into_iter()
        .filter_map(convert_appointment)
        .collect();
    let instructions = lenient_items::<String>(completion.instructions)
        .into_iter()
        .filter(|s| s.chars().count() >= 10)
        .map(InstructionNote)
        .collect();

    Ok(ParsedDocument {
        medications,
        appointments,
        instructions,
    })
}

/// Find the JSON object: strip markdown fences first, then fall back to the
/// outermost brace span.
fn locate_json(raw: &str) -> Option<&str> {
    let body = if let Some(start) = raw.find("```json") {
        let after = &raw[start + 7..];
        match after.find("```") {
            Some(end) => &after[..end],
            None => after,
        }
    } else if let Some(start) = raw.find("```") {
        let after = &raw[start + 3..];
        match after.find("```") {
            Some(end) => &after[..end],
            None => after,
        }
    } else {
        raw
    };

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end < start {
        return None;
    }
    Some(body[start..=end].trim())
}

fn lenient_items<T: for<'de> Deserialize<'de>>(items: Option<Vec<serde_json::Value>>) -> Vec<T> {
    items
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect()
}

fn convert_medication(raw: RawMedication) -> Option<MedicationRecord> {
    let name = raw.name.trim().to_string();
    if name.chars().count() < 3 || lexicon::is_stop_word(&name) {
        return None;
    }

    let mut record = MedicationRecord::new(name);
    if let Some(dosage) = raw.dosage.filter(|d| !d.trim().is_empty()) {
        record.push_dosage_term(dosage.trim().to_lowercase());
    }
    record.quantity = raw.quantity.filter(|q| !q.trim().is_empty());
    record.unit = raw.unit.filter(|u| !u.trim().is_empty());
    record.frequency = raw.frequency.filter(|f| !f.trim().is_empty());
    for word in raw.timing {
        if let Some(tag) = timing_from_remote(&word) {
            record.timing.insert(tag);
        }
    }
    record.duration_text = raw.duration.filter(|d| !d.trim().is_empty());
    record.instructions = raw
        .instructions
        .into_iter()
        .filter(|i| !i.trim().is_empty())
        .collect();

    record.has_signal().then_some(record)
}

/// The template pins the Vietnamese vocabulary but models drift into
/// English; accept both.
fn timing_from_remote(word: &str) -> Option<crate::pipeline::types::TimingTag> {
    use crate::pipeline::types::TimingTag;
    lexicon::timing_tag(word).or(match word.trim().to_lowercase().as_str() {
        "morning" => Some(TimingTag::Morning),
        "noon" => Some(TimingTag::Noon),
        "afternoon" => Some(TimingTag::Afternoon),
        "evening" => Some(TimingTag::Evening),
        "night" => Some(TimingTag::Night),
        _ => None,
    })
}

fn convert_appointment(raw: RawAppointment) -> Option<AppointmentRecord> {
    let kind = match raw.kind.as_deref() {
        Some("specialist") => AppointmentKind::Specialist,
        _ => AppointmentKind::General,
    };
    let record = AppointmentRecord {
        kind,
        date: raw.date.as_deref().and_then(parse_date),
        time: raw.time.as_deref().and_then(parse_time),
        notes: raw.notes.filter(|n| !n.trim().is_empty()),
    };
    record.has_signal().then_some(record)
}
