//! Bundled Tesseract engine. Only compiled with the `ocr` feature.

use std::path::{Path, PathBuf};

use tesseract::{OcrEngineMode, Tesseract};

use super::preprocess::PreparedImage;
use super::{OcrEngine, OcrError, OcrOutput, PageSegmentation, StrategyConfig};

/// Tesseract backed by an on-disk tessdata directory.
///
/// Defaults to `vie+eng` when Vietnamese traineddata is installed, falling
/// back to `eng` alone.
pub struct BundledTesseract {
    tessdata_dir: PathBuf,
    lang: String,
    /// One drug name per line; improves recognition of brand names.
    drug_wordlist: Option<PathBuf>,
}

impl BundledTesseract {
    pub fn new(tessdata_dir: &Path) -> Result<Self, OcrError> {
        if !tessdata_dir.join("eng.traineddata").exists() {
            return Err(OcrError::EngineInit(format!(
                "tessdata not found at {}",
                tessdata_dir.display()
            )));
        }

        let lang = if tessdata_dir.join("vie.traineddata").exists() {
            "vie+eng".to_string()
        } else {
            tracing::warn!(
                dir = %tessdata_dir.display(),
                "vie.traineddata missing, recognizing with English only"
            );
            "eng".to_string()
        };

        Ok(Self {
            tessdata_dir: tessdata_dir.to_path_buf(),
            lang,
            drug_wordlist: None,
        })
    }

    pub fn with_languages(mut self, langs: &str) -> Self {
        self.lang = langs.to_string();
        self
    }

    pub fn with_drug_wordlist(mut self, path: &Path) -> Self {
        if path.exists() {
            self.drug_wordlist = Some(path.to_path_buf());
        } else {
            tracing::warn!(path = %path.display(), "drug wordlist not found, skipping");
        }
        self
    }

    fn page_seg_mode(segmentation: PageSegmentation) -> &'static str {
        // Tesseract PSM numbers.
        match segmentation {
            PageSegmentation::FullPageAuto => "3",
            PageSegmentation::SingleColumn => "4",
            PageSegmentation::SingleBlock => "6",
            PageSegmentation::SparseText => "11",
        }
    }
}

impl OcrEngine for BundledTesseract {
    fn recognize(
        &self,
        image: &PreparedImage,
        strategy: &StrategyConfig,
    ) -> Result<OcrOutput, OcrError> {
        let datapath = self
            .tessdata_dir
            .to_str()
            .ok_or_else(|| OcrError::EngineInit("non-UTF-8 tessdata path".into()))?;

        let oem = if strategy.hybrid_engine {
            OcrEngineMode::TesseractLstmCombined
        } else {
            OcrEngineMode::LstmOnly
        };

        let tess = Tesseract::new_with_oem(Some(datapath), Some(&self.lang), oem)
            .map_err(|e| OcrError::EngineInit(format!("{e:?}")))?;

        let tess = tess
            .set_variable(
                "tessedit_pageseg_mode",
                Self::page_seg_mode(strategy.segmentation),
            )
            .map_err(|e| OcrError::Recognition(format!("{e:?}")))?;

        let tess = match &self.drug_wordlist {
            Some(path) => match path.to_str() {
                Some(p) => tess
                    .set_variable("user_words_file", p)
                    .map_err(|e| OcrError::Recognition(format!("{e:?}")))?,
                None => tess,
            },
            None => tess,
        };

        let mut tess = tess
            .set_image_from_mem(image.bytes())
            .map_err(|e| OcrError::Recognition(format!("{e:?}")))?;

        let text = tess
            .get_text()
            .map_err(|e| OcrError::Recognition(format!("{e:?}")))?;
        let confidence = tess.mean_text_conf().max(0) as f32;

        Ok(OcrOutput { text, confidence })
    }
}
