//! Prescription extraction pipeline.
//!
//! One document flows recognition → cleanup → structural parse →
//! local/remote orchestration → dedup → plausibility check → reminder
//! synthesis. Each run is independent; no state is shared across
//! documents.

pub mod correction;
pub mod dedup;
pub mod lexicon;
pub mod local;
pub mod normalize;
pub mod ocr;
pub mod orchestrator;
pub mod parse;
pub mod remote;
pub mod schedule;
pub mod types;
pub mod validate;

use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;

use crate::config::PipelineConfig;
use local::LocalExtractionEngine;
use ocr::{OcrEngine, OcrError};
use orchestrator::ExtractionOrchestrator;
use remote::{ollama::OllamaExtractor, RemoteExtractor};
use types::{ExtractionResult, PlausibilityReport, RawDocument, ReminderEvent};

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Every recognition strategy failed; nothing to parse.
    #[error("recognition failed: {0}")]
    Recognition(#[from] OcrError),

    /// The result scored too low to be a prescription. Carries the score
    /// and reason so the caller can show an actionable rejection.
    #[error("extraction rejected (score {score}): {reason}")]
    Rejected { score: u8, reason: String },
}

/// Everything one document produces: the records, the confidence verdict
/// and the ready-to-register reminder events.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub result: ExtractionResult,
    pub plausibility: PlausibilityReport,
    pub reminders: Vec<ReminderEvent>,
}

/// End-to-end runner over injected recognition and remote seams.
pub struct DocumentPipeline {
    orchestrator: ExtractionOrchestrator,
    config: PipelineConfig,
}

impl DocumentPipeline {
    pub fn new(
        ocr: Box<dyn OcrEngine>,
        remote: Option<Arc<dyn RemoteExtractor>>,
        config: PipelineConfig,
    ) -> Self {
        let local = LocalExtractionEngine::new(ocr);
        Self {
            orchestrator: ExtractionOrchestrator::new(local, remote, config.clone()),
            config,
        }
    }

    /// Wire the default remote extractor from the configured endpoint.
    pub fn with_default_remote(ocr: Box<dyn OcrEngine>, config: PipelineConfig) -> Self {
        let remote: Option<Arc<dyn RemoteExtractor>> = config.remote_enabled.then(|| {
            Arc::new(
                OllamaExtractor::new(&config.remote_base_url, config.remote_timeout_secs)
                    .with_model(&config.remote_model),
            ) as Arc<dyn RemoteExtractor>
        });
        Self::new(ocr, remote, config)
    }

    /// Process one document, anchoring medication reminders at
    /// `reminder_start` (normally today).
    pub fn process(
        &self,
        document: &RawDocument,
        reminder_start: NaiveDate,
    ) -> Result<ProcessedDocument, PipelineError> {
        let mut result = self.orchestrator.extract(document)?;
        dedup::dedup_result(&mut result);

        let plausibility = validate::validate(&result);
        if plausibility.score < self.config.reject_below_score {
            return Err(PipelineError::Rejected {
                score: plausibility.score,
                reason: plausibility
                    .warning
                    .unwrap_or_else(|| "văn bản có vẻ không phải đơn thuốc".to_string()),
            });
        }

        let reminders = schedule::schedule_reminders(&result, reminder_start);
        info!(
            document_id = %document.id,
            method = ?result.method,
            medications = result.medications.len(),
            appointments = result.appointments.len(),
            reminders = reminders.len(),
            score = plausibility.score,
            "document processed"
        );
        Ok(ProcessedDocument {
            result,
            plausibility,
            reminders,
        })
    }
}
