//! Local-first extraction with a single bounded remote attempt.
//!
//! The decision sequence per document:
//!
//! 1. Run the local path.
//! 2. Remote disabled: the local result is final.
//! 3. Local result passes the acceptance predicate: accept it, never
//!    calling out.
//! 4. Otherwise make exactly one remote attempt. Success replaces the
//!    local records; any failure falls back to the local records with the
//!    failure carried as metadata.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use super::local::LocalExtractionEngine;
use super::ocr::OcrError;
use super::parse::ParsedDocument;
use super::remote::{prompt, RemoteExtractor};
use super::types::{ExtractionMethod, ExtractionResult, LocalAudit, RawDocument};
use crate::config::PipelineConfig;

pub struct ExtractionOrchestrator {
    local: LocalExtractionEngine,
    remote: Option<Arc<dyn RemoteExtractor>>,
    config: PipelineConfig,
}

impl ExtractionOrchestrator {
    pub fn new(
        local: LocalExtractionEngine,
        remote: Option<Arc<dyn RemoteExtractor>>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            local,
            remote,
            config,
        }
    }

    pub fn extract(&self, document: &RawDocument) -> Result<ExtractionResult, OcrError> {
        let started = Instant::now();
        let local = self.local.extract(document)?;
        let ocr_confidence = local.recognition.as_ref().map(|c| c.confidence);

        let remote = match &self.remote {
            Some(remote) if self.config.remote_enabled => remote,
            _ => {
                info!(document_id = %document.id, "remote disabled, local result is final");
                return Ok(finish(
                    local.parsed,
                    ExtractionMethod::LocalOnly,
                    None,
                    ocr_confidence,
                    started,
                ));
            }
        };

        if self.accepts(&local.parsed) {
            info!(
                document_id = %document.id,
                medications = local.parsed.medications.len(),
                "local result accepted"
            );
            return Ok(finish(
                local.parsed,
                ExtractionMethod::Local,
                None,
                ocr_confidence,
                started,
            ));
        }

        // One attempt, no retry. The filtered view keeps only lines that
        // look like medication, appointment or instruction content.
        let filtered = prompt::filter_important_segments(&local.normalized_text);
        match remote.extract(&filtered) {
            Ok(parsed) if !parsed.is_empty() => {
                info!(
                    document_id = %document.id,
                    medications = parsed.medications.len(),
                    "remote result accepted"
                );
                let mut result =
                    finish(parsed, ExtractionMethod::Remote, None, ocr_confidence, started);
                result.local_audit = Some(LocalAudit {
                    medications: local.parsed.medications.len(),
                    appointments: local.parsed.appointments.len(),
                });
                Ok(result)
            }
            Ok(_) => {
                warn!(document_id = %document.id, "remote returned no records, keeping local");
                Ok(finish(
                    local.parsed,
                    ExtractionMethod::LocalFallback,
                    Some("remote extraction returned no records".to_string()),
                    ocr_confidence,
                    started,
                ))
            }
            Err(e) => {
                warn!(document_id = %document.id, error = %e, "remote extraction failed, keeping local");
                Ok(finish(
                    local.parsed,
                    ExtractionMethod::LocalFallback,
                    Some(e.to_string()),
                    ocr_confidence,
                    started,
                ))
            }
        }
    }

    /// A local result is good enough when it found a plausible medication
    /// list, or when the document is appointment-centric and found the
    /// appointments it needs.
    fn accepts(&self, parsed: &ParsedDocument) -> bool {
        if parsed.medications.len() >= self.config.min_medications_local {
            return true;
        }
        let needed = self.config.min_appointments_local.max(1);
        parsed.appointments.len() >= needed
    }
}

fn finish(
    parsed: ParsedDocument,
    method: ExtractionMethod,
    remote_error: Option<String>,
    ocr_confidence: Option<f32>,
    started: Instant,
) -> ExtractionResult {
    ExtractionResult {
        medications: parsed.medications,
        appointments: parsed.appointments,
        instructions: parsed.instructions,
        method,
        elapsed_ms: started.elapsed().as_millis() as u64,
        remote_error,
        ocr_confidence,
        local_audit: None,
    }
}
