//! Local extraction path: recognition, cleanup and structural parsing,
//! entirely on-device.

use tracing::{debug, info};

use super::correction::correct_drug_names;
use super::normalize::{normalize_text, sanitize_text};
use super::ocr::{strategy, OcrEngine, OcrError};
use super::parse::{self, ParsedDocument};
use super::types::{DocumentPayload, PdfTextItem, RawDocument, RecognitionCandidate};

/// What the local path produced for one document: the structured records
/// plus the cleaned text the remote path reuses as its input.
pub struct LocalExtraction {
    pub parsed: ParsedDocument,
    pub normalized_text: String,
    /// Winning recognition attempt; absent on the PDF text-layer path.
    pub recognition: Option<RecognitionCandidate>,
}

/// Runs the deterministic half of the pipeline.
pub struct LocalExtractionEngine {
    ocr: Box<dyn OcrEngine>,
}

impl LocalExtractionEngine {
    pub fn new(ocr: Box<dyn OcrEngine>) -> Self {
        Self { ocr }
    }

    pub fn extract(&self, document: &RawDocument) -> Result<LocalExtraction, OcrError> {
        match &document.payload {
            DocumentPayload::Image(bytes) => self.extract_from_image(bytes),
            DocumentPayload::PdfTextItems(items) => Ok(extract_from_pdf_items(items)),
        }
    }

    fn extract_from_image(&self, bytes: &[u8]) -> Result<LocalExtraction, OcrError> {
        let candidate = strategy::recognize_best(self.ocr.as_ref(), bytes)?;
        info!(
            strategy = candidate.strategy,
            confidence = candidate.confidence,
            lines = candidate.features.line_count,
            "recognition complete"
        );

        let normalized = clean(&candidate.text);
        let parsed = parse::parse_text(&normalized);
        Ok(LocalExtraction {
            parsed,
            normalized_text: normalized,
            recognition: Some(candidate),
        })
    }
}

/// The PDF text layer needs no recognition, but its text goes through the
/// same cleanup chain so both sources feed the parser identical shapes.
fn extract_from_pdf_items(items: &[PdfTextItem]) -> LocalExtraction {
    debug!(items = items.len(), "extracting from PDF text layer");
    let cleaned: Vec<PdfTextItem> = items
        .iter()
        .map(|item| PdfTextItem {
            text: clean(&item.text),
            ..item.clone()
        })
        .collect();

    let parsed = parse::parse_pdf(&cleaned);
    let normalized_text = cleaned
        .iter()
        .map(|i| i.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    LocalExtraction {
        parsed,
        normalized_text,
        recognition: None,
    }
}

fn clean(raw: &str) -> String {
    correct_drug_names(&normalize_text(&sanitize_text(raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ocr::MockOcrEngine;
    use crate::pipeline::types::TimingTag;

    const RECOGNIZED: &str = "\
BỆNH VIỆN ĐA KHOA
1. Paracetamol 5OOmg
2 lần/ngày sang toi trong 7 ngay
Tái khám ngày 20-01-2025";

    #[test]
    fn image_path_recognizes_cleans_and_parses() {
        let engine =
            LocalExtractionEngine::new(Box::new(MockOcrEngine::uniform(RECOGNIZED, 80.0)));
        let doc = RawDocument::image(vec![1, 2, 3]);

        let result = engine.extract(&doc).unwrap();
        assert!(result.recognition.is_some());
        assert_eq!(result.parsed.medications.len(), 1);

        let med = &result.parsed.medications[0];
        assert_eq!(med.name, "Paracetamol");
        // Cleanup repaired both the O-for-0 dose and the stripped diacritics.
        assert_eq!(med.dosage_terms, vec!["500mg"]);
        assert!(med.timing.contains(&TimingTag::Morning));
        assert!(med.timing.contains(&TimingTag::Evening));
        assert_eq!(result.parsed.appointments.len(), 1);
    }

    #[test]
    fn pdf_path_skips_recognition_and_cleans_items() {
        let items = vec![
            PdfTextItem {
                text: "1. Amoxicillin 5OOmg sang".into(),
                x: 10.0,
                y: 50.0,
                annotation_date: None,
            },
        ];
        let engine = LocalExtractionEngine::new(Box::new(MockOcrEngine::new()));
        let doc = RawDocument::pdf_text_layer(items);

        let result = engine.extract(&doc).unwrap();
        assert!(result.recognition.is_none());
        assert_eq!(result.parsed.medications.len(), 1);
        assert_eq!(result.parsed.medications[0].dosage_terms, vec!["500mg"]);
        assert!(result.normalized_text.contains("500mg"));
    }

    #[test]
    fn normalized_text_carries_the_cleaned_lines() {
        let engine =
            LocalExtractionEngine::new(Box::new(MockOcrEngine::uniform(RECOGNIZED, 80.0)));
        let doc = RawDocument::image(vec![0]);

        let result = engine.extract(&doc).unwrap();
        assert!(result.normalized_text.contains("500mg"));
        assert!(result.normalized_text.contains("sáng"));
        assert!(!result.normalized_text.contains("5OO"));
    }
}
