//! Image preparation ahead of recognition.
//!
//! The chain is grayscale → upscale-if-small → brightness normalization →
//! contrast stretch → sharpen → denoise → binarize. Every step is
//! best-effort: if anything in the chain fails, recognition proceeds on the
//! original image rather than failing the pipeline.
//!
//! The prepared image is also written to a scoped temp artifact; the
//! artifact is removed on every exit path, with bounded retries for
//! transient file locks.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageFormat, Luma};

use super::OcrError;

/// Below this longest-side size the image is doubled before recognition.
const UPSCALE_THRESHOLD: u32 = 1000;

/// Target mean luma for brightness normalization.
const TARGET_BRIGHTNESS: f32 = 140.0;

const CLEANUP_RETRIES: usize = 3;

/// Recognition-ready image bytes plus their on-disk artifact.
#[derive(Debug)]
pub struct PreparedImage {
    bytes: Vec<u8>,
    /// Present when preprocessing succeeded; `None` means the original
    /// bytes are being used unmodified.
    artifact: Option<ScopedArtifact>,
}

impl PreparedImage {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Path of the preprocessed artifact, when one exists.
    pub fn artifact_path(&self) -> Option<&Path> {
        self.artifact.as_ref().map(|a| a.path.as_path())
    }

    /// Wrap raw bytes without preprocessing (tests, fallback path).
    pub fn raw(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            artifact: None,
        }
    }
}

/// Temp file removed on drop, tolerating transient lock errors.
#[derive(Debug)]
struct ScopedArtifact {
    path: PathBuf,
}

impl Drop for ScopedArtifact {
    fn drop(&mut self) {
        for attempt in 0..CLEANUP_RETRIES {
            match std::fs::remove_file(&self.path) {
                Ok(()) => return,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
                Err(e) => {
                    tracing::debug!(
                        path = %self.path.display(),
                        attempt,
                        error = %e,
                        "artifact cleanup retry"
                    );
                    std::thread::sleep(std::time::Duration::from_millis(20));
                }
            }
        }
        tracing::warn!(path = %self.path.display(), "failed to remove preprocessed artifact");
    }
}

/// Prepare image bytes for recognition. Never fails the pipeline: on any
/// preprocessing error the original bytes are returned unmodified.
pub fn prepare(image_bytes: &[u8]) -> PreparedImage {
    match preprocess(image_bytes) {
        Ok(prepared) => prepared,
        Err(e) => {
            tracing::warn!(error = %e, "image preprocessing failed, recognizing original");
            PreparedImage::raw(image_bytes.to_vec())
        }
    }
}

fn preprocess(image_bytes: &[u8]) -> Result<PreparedImage, OcrError> {
    let decoded = image::load_from_memory(image_bytes)
        .map_err(|e| OcrError::InvalidImage(e.to_string()))?;

    let mut gray = decoded.to_luma8();
    if gray.width().max(gray.height()) < UPSCALE_THRESHOLD {
        gray = image::imageops::resize(
            &gray,
            gray.width() * 2,
            gray.height() * 2,
            image::imageops::FilterType::Lanczos3,
        );
    }
    normalize_brightness(&mut gray);
    stretch_contrast(&mut gray);
    let gray = sharpen(&gray);
    let gray = denoise(&gray);
    let gray = binarize(&gray);

    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(gray)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| OcrError::InvalidImage(e.to_string()))?;

    let artifact = write_artifact(&bytes)?;
    Ok(PreparedImage {
        bytes,
        artifact: Some(artifact),
    })
}

fn write_artifact(bytes: &[u8]) -> Result<ScopedArtifact, OcrError> {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("toascan-prep-{}.png", uuid::Uuid::new_v4()));
    std::fs::write(&path, bytes)?;
    Ok(ScopedArtifact { path })
}

/// Shift mean luma toward the target, clamped at the byte range.
fn normalize_brightness(img: &mut GrayImage) {
    let pixels = img.pixels().count() as f32;
    if pixels == 0.0 {
        return;
    }
    let mean: f32 = img.pixels().map(|p| p.0[0] as f32).sum::<f32>() / pixels;
    let shift = TARGET_BRIGHTNESS - mean;
    for p in img.pixels_mut() {
        p.0[0] = (p.0[0] as f32 + shift).clamp(0.0, 255.0) as u8;
    }
}

/// Min-max stretch to the full byte range.
fn stretch_contrast(img: &mut GrayImage) {
    let (mut min, mut max) = (255u8, 0u8);
    for p in img.pixels() {
        min = min.min(p.0[0]);
        max = max.max(p.0[0]);
    }
    if max <= min {
        return;
    }
    let range = (max - min) as f32;
    for p in img.pixels_mut() {
        p.0[0] = (((p.0[0] - min) as f32 / range) * 255.0) as u8;
    }
}

/// Unsharp-style 3×3 high-pass kernel.
fn sharpen(img: &GrayImage) -> GrayImage {
    let kernel: [f32; 9] = [0.0, -0.5, 0.0, -0.5, 3.0, -0.5, 0.0, -0.5, 0.0];
    image::imageops::filter3x3(img, &kernel)
}

/// 3×3 median filter; removes salt-and-pepper speckle without blurring
/// stroke edges the way a box blur would.
fn denoise(img: &GrayImage) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut out = img.clone();
    if w < 3 || h < 3 {
        return out;
    }
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut window = [0u8; 9];
            let mut k = 0;
            for dy in 0..3 {
                for dx in 0..3 {
                    window[k] = img.get_pixel(x + dx - 1, y + dy - 1).0[0];
                    k += 1;
                }
            }
            window.sort_unstable();
            out.put_pixel(x, y, Luma([window[4]]));
        }
    }
    out
}

/// Otsu global threshold.
fn binarize(img: &GrayImage) -> GrayImage {
    let threshold = otsu_threshold(img);
    let mut out = img.clone();
    for p in out.pixels_mut() {
        p.0[0] = if p.0[0] > threshold { 255 } else { 0 };
    }
    out
}

fn otsu_threshold(img: &GrayImage) -> u8 {
    let mut histogram = [0u32; 256];
    for p in img.pixels() {
        histogram[p.0[0] as usize] += 1;
    }
    let total: u32 = histogram.iter().sum();
    if total == 0 {
        return 127;
    }

    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut sum_bg = 0f64;
    let mut weight_bg = 0u32;
    let mut best_threshold = 127u8;
    let mut best_variance = 0f64;

    for t in 0..256usize {
        weight_bg += histogram[t];
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }
        sum_bg += t as f64 * histogram[t] as f64;

        let mean_bg = sum_bg / weight_bg as f64;
        let mean_fg = (sum_all - sum_bg) / weight_fg as f64;
        let variance =
            weight_bg as f64 * weight_fg as f64 * (mean_bg - mean_fg) * (mean_bg - mean_fg);
        if variance > best_variance {
            best_variance = variance;
            best_threshold = t as u8;
        }
    }
    best_threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, _| {
            if x % 7 == 0 {
                Rgb([20, 20, 20])
            } else {
                Rgb([230, 228, 225])
            }
        });
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn prepare_produces_artifact_and_cleans_it_up() {
        let bytes = sample_png(64, 48);
        let path = {
            let prepared = prepare(&bytes);
            let path = prepared.artifact_path().expect("artifact expected").to_path_buf();
            assert!(path.exists());
            assert!(!prepared.bytes().is_empty());
            path
        };
        assert!(!path.exists(), "artifact should be removed on drop");
    }

    #[test]
    fn small_images_are_upscaled() {
        let bytes = sample_png(50, 40);
        let prepared = prepare(&bytes);
        let img = image::load_from_memory(prepared.bytes()).unwrap();
        assert_eq!(img.width(), 100);
        assert_eq!(img.height(), 80);
    }

    #[test]
    fn garbage_bytes_fall_back_to_original() {
        let garbage = b"not an image at all".to_vec();
        let prepared = prepare(&garbage);
        assert_eq!(prepared.bytes(), garbage.as_slice());
        assert!(prepared.artifact_path().is_none());
    }

    #[test]
    fn binarized_output_is_two_level() {
        let bytes = sample_png(64, 48);
        let prepared = prepare(&bytes);
        let img = image::load_from_memory(prepared.bytes()).unwrap().to_luma8();
        assert!(img.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn otsu_separates_bimodal_histogram() {
        let img = GrayImage::from_fn(32, 32, |x, _| {
            if x < 16 {
                Luma([30])
            } else {
                Luma([220])
            }
        });
        let t = otsu_threshold(&img);
        assert!((30..220).contains(&(t as i32)));
    }
}
