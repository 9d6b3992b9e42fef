//! Structural parsing of semi-structured prescription text.
//!
//! One extraction core, two segmentation front-ends: recognized plain text
//! (line heuristics plus a collapse-repair pass) and PDF text-layer items
//! (precise, position-tagged boundaries). Both produce the same
//! `ParsedDocument` contract.

pub mod appointment;
pub mod fields;
pub mod pdf_items;
pub mod segment;

use appointment::AnnotationDates;

use super::types::{
    AppointmentRecord, InstructionNote, MedicationRecord, PdfTextItem, TextSegment,
};

/// Everything structural parsing can pull from one document.
#[derive(Debug, Default)]
pub struct ParsedDocument {
    pub medications: Vec<MedicationRecord>,
    pub appointments: Vec<AppointmentRecord>,
    pub instructions: Vec<InstructionNote>,
}

impl ParsedDocument {
    pub fn is_empty(&self) -> bool {
        self.medications.is_empty() && self.appointments.is_empty() && self.instructions.is_empty()
    }
}

/// Parse normalized recognized text.
pub fn parse_text(text: &str) -> ParsedDocument {
    let segments = segment::segment_text(text);
    parse_segments(&segments, &AnnotationDates::new())
}

/// Parse a PDF text layer's positioned items.
pub fn parse_pdf(items: &[PdfTextItem]) -> ParsedDocument {
    let pdf = pdf_items::segment_pdf_items(items);
    parse_segments(&pdf.segments, &pdf.annotations)
}

fn parse_segments(segments: &[TextSegment], annotations: &AnnotationDates) -> ParsedDocument {
    let parsed = ParsedDocument {
        medications: fields::extract_medications(segments),
        appointments: appointment::extract_appointments(segments, annotations),
        instructions: fields::extract_instruction_notes(segments),
    };
    tracing::debug!(
        medications = parsed.medications.len(),
        appointments = parsed.appointments.len(),
        instructions = parsed.instructions.len(),
        "structural parse complete"
    );
    parsed
}
