//! toascan: Vietnamese prescription extraction.
//!
//! Turns a photographed or digital prescription into structured medication
//! and follow-up records plus a reminder schedule. Recognition and the
//! optional AI-assisted extraction are injected behind traits; everything
//! else is deterministic and offline.

pub mod config;
pub mod pipeline;

pub use config::PipelineConfig;
pub use pipeline::ocr::OcrEngine;
pub use pipeline::remote::RemoteExtractor;
pub use pipeline::types::{
    AppointmentRecord, DocumentPayload, ExtractionMethod, ExtractionResult, LocalAudit,
    MedicationRecord, PdfTextItem, PlausibilityReport, RawDocument, ReminderEvent, TimingTag,
};
pub use pipeline::{DocumentPipeline, PipelineError, ProcessedDocument};

#[cfg(feature = "ocr")]
pub use pipeline::ocr::tesseract::BundledTesseract;
