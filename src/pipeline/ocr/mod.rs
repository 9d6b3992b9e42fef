//! Optical recognition boundary.
//!
//! The engine itself sits behind the `OcrEngine` trait so the pipeline and
//! its tests run without a native Tesseract install; the bundled engine is
//! compiled in with the `ocr` feature.

pub mod preprocess;
pub mod strategy;
#[cfg(feature = "ocr")]
pub mod tesseract;

use std::collections::HashMap;

use thiserror::Error;

use preprocess::PreparedImage;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine initialization failed: {0}")]
    EngineInit(String),

    #[error("image decoding failed: {0}")]
    InvalidImage(String),

    #[error("recognition failed: {0}")]
    Recognition(String),

    #[error("all {attempts} recognition strategies failed")]
    AllStrategiesFailed { attempts: usize },
}

/// Page-segmentation mode a strategy runs the engine in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSegmentation {
    FullPageAuto,
    SingleBlock,
    SparseText,
    SingleColumn,
}

/// One fixed recognition configuration. The list order in
/// [`strategy::STRATEGIES`] is itself the tie-break priority.
#[derive(Debug, Clone, Copy)]
pub struct StrategyConfig {
    pub name: &'static str,
    pub segmentation: PageSegmentation,
    /// Run the engine's combined legacy+LSTM mode instead of LSTM only.
    pub hybrid_engine: bool,
}

/// Raw output of one engine run.
#[derive(Debug, Clone)]
pub struct OcrOutput {
    pub text: String,
    /// Scaled to 0–100.
    pub confidence: f32,
}

/// Recognition engine seam. Implementations must be side-effect free per
/// call so strategies can run in any order.
pub trait OcrEngine {
    fn recognize(
        &self,
        image: &PreparedImage,
        strategy: &StrategyConfig,
    ) -> Result<OcrOutput, OcrError>;
}

/// Test engine: per-strategy canned outputs, with a call log for asserting
/// which strategies ran.
pub struct MockOcrEngine {
    outputs: HashMap<&'static str, OcrOutput>,
    calls: std::cell::RefCell<Vec<&'static str>>,
}

impl MockOcrEngine {
    pub fn new() -> Self {
        Self {
            outputs: HashMap::new(),
            calls: std::cell::RefCell::new(Vec::new()),
        }
    }

    /// Same text/confidence for every strategy.
    pub fn uniform(text: &str, confidence: f32) -> Self {
        let mut mock = Self::new();
        for s in strategy::STRATEGIES {
            mock.outputs.insert(
                s.name,
                OcrOutput {
                    text: text.to_string(),
                    confidence,
                },
            );
        }
        mock
    }

    pub fn with_output(mut self, strategy: &'static str, text: &str, confidence: f32) -> Self {
        self.outputs.insert(
            strategy,
            OcrOutput {
                text: text.to_string(),
                confidence,
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }
}

impl Default for MockOcrEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for MockOcrEngine {
    fn recognize(
        &self,
        _image: &PreparedImage,
        strategy: &StrategyConfig,
    ) -> Result<OcrOutput, OcrError> {
        self.calls.borrow_mut().push(strategy.name);
        self.outputs
            .get(strategy.name)
            .cloned()
            .ok_or_else(|| OcrError::Recognition(format!("no canned output for {}", strategy.name)))
    }
}
