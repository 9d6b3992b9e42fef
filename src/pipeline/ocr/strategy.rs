//! Multi-strategy recognition and candidate selection.
//!
//! Each fixed configuration is run over the same prepared image; outputs are
//! scored on engine confidence plus structure signals (a prescription has
//! many lines, numbered items and capitalized drug names), and the best
//! candidate wins. List order is the tie-break, so earlier strategies are
//! implicitly preferred.

use std::sync::LazyLock;

use regex::Regex;

use super::preprocess::{self, PreparedImage};
use super::{OcrEngine, OcrError, PageSegmentation, StrategyConfig};
use crate::pipeline::lexicon::{INLINE_MARKER, LIST_MARKER};
use crate::pipeline::types::{RecognitionCandidate, TextFeatures};

/// The fixed configuration list. Order is the tie-break priority.
pub const STRATEGIES: &[StrategyConfig] = &[
    StrategyConfig {
        name: "full-page-auto",
        segmentation: PageSegmentation::FullPageAuto,
        hybrid_engine: false,
    },
    StrategyConfig {
        name: "single-block",
        segmentation: PageSegmentation::SingleBlock,
        hybrid_engine: false,
    },
    StrategyConfig {
        name: "sparse-text",
        segmentation: PageSegmentation::SparseText,
        hybrid_engine: false,
    },
    StrategyConfig {
        name: "single-column",
        segmentation: PageSegmentation::SingleColumn,
        hybrid_engine: false,
    },
    StrategyConfig {
        name: "hybrid-engine",
        segmentation: PageSegmentation::FullPageAuto,
        hybrid_engine: true,
    },
];

/// Capitalized token of three or more letters, drug-name shaped.
static CAPITALIZED_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\p{Lu}\p{L}{2,}\b").unwrap());

/// Run every strategy over the image and return the best candidate.
///
/// Individual strategy failures are absorbed and logged; only the case where
/// every strategy fails surfaces as [`OcrError::AllStrategiesFailed`].
pub fn recognize_best(
    engine: &dyn OcrEngine,
    image_bytes: &[u8],
) -> Result<RecognitionCandidate, OcrError> {
    let prepared = preprocess::prepare(image_bytes);

    let mut best: Option<(f32, RecognitionCandidate)> = None;
    let mut attempts = 0usize;

    for strategy in STRATEGIES {
        attempts += 1;
        let output = match engine.recognize(&prepared, strategy) {
            Ok(o) => o,
            Err(e) => {
                tracing::warn!(strategy = strategy.name, error = %e, "recognition strategy failed");
                continue;
            }
        };

        let features = text_features(&output.text);
        let candidate = RecognitionCandidate {
            text: output.text,
            confidence: output.confidence.clamp(0.0, 100.0),
            strategy: strategy.name,
            features,
        };
        let score = score_candidate(&candidate);
        tracing::debug!(
            strategy = strategy.name,
            confidence = candidate.confidence,
            score,
            lines = features.line_count,
            "recognition candidate"
        );

        // Strict comparison keeps the first-encountered candidate on ties.
        match &best {
            Some((best_score, _)) if score <= *best_score => {}
            _ => best = Some((score, candidate)),
        }
    }

    match best {
        Some((score, candidate)) => {
            tracing::info!(strategy = candidate.strategy, score, "recognition candidate selected");
            Ok(candidate)
        }
        None => Err(OcrError::AllStrategiesFailed { attempts }),
    }
}

/// Structure signals used by the selector.
pub fn text_features(text: &str) -> TextFeatures {
    let line_count = text.lines().filter(|l| !l.trim().is_empty()).count();
    let has_numbered_list =
        text.lines().any(|l| LIST_MARKER.is_match(l)) || INLINE_MARKER.is_match(text);
    let has_capitalized_token = CAPITALIZED_TOKEN.is_match(text);
    TextFeatures {
        line_count,
        has_numbered_list,
        has_capitalized_token,
    }
}

/// `confidence + 10·(lines>10) + 15·(numbered list) + 10·(capitalized token)`.
pub fn score_candidate(candidate: &RecognitionCandidate) -> f32 {
    let f = candidate.features;
    candidate.confidence
        + if f.line_count > 10 { 10.0 } else { 0.0 }
        + if f.has_numbered_list { 15.0 } else { 0.0 }
        + if f.has_capitalized_token { 10.0 } else { 0.0 }
}
