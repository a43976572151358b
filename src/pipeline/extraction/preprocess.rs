//! Deterministic preprocessing recipes for recognition.
//!
//! Each recipe is a fixed sequence of steps over a grayscale buffer. Recipes
//! are never chosen adaptively: every image goes through all of them and the
//! recognition results are scored afterwards.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageOutputFormat};

use super::ExtractionError;
use crate::models::enums::{PreprocessingMethod, RecognitionProfile};

// ═══════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════

/// Maximum decoded-image input size (in bytes) before rejecting.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

/// Minimum valid image size in bytes (smallest valid PNG is ~67 bytes).
const MIN_IMAGE_BYTES: usize = 67;

/// Upscaling recipes never enlarge more than this factor.
const MAX_UPSCALE: f32 = 2.0;

// ═══════════════════════════════════════════════════════════
// Recipes
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Scale so the longest edge is at most `max_dim`.
    Fit { max_dim: u32, upscale: bool },
    /// Stretch the 1st..99th percentile to the full range.
    Normalize,
    /// `v * gain + offset`, clamped.
    Linear { gain: f32, offset: f32 },
    Brighten(f32),
    Gamma(f32),
    Sharpen,
    /// Tiled, clip-limited histogram equalization.
    LocalContrast { tile: u32, clip: f32 },
    /// `v >= t` becomes white, everything else black.
    Threshold(u8),
}

#[derive(Debug)]
pub struct Recipe {
    pub method: PreprocessingMethod,
    pub steps: &'static [Step],
    pub profiles: &'static [RecognitionProfile],
}

const BOTH_PROFILES: &[RecognitionProfile] =
    &[RecognitionProfile::General, RecognitionProfile::SingleBlock];
const GENERAL_ONLY: &[RecognitionProfile] = &[RecognitionProfile::General];

pub const RECIPES: &[Recipe] = &[
    Recipe {
        method: PreprocessingMethod::HighContrast,
        steps: &[
            Step::Fit { max_dim: 2000, upscale: false },
            Step::Normalize,
            Step::Linear { gain: 1.3, offset: -35.0 },
            Step::Threshold(128),
        ],
        profiles: BOTH_PROFILES,
    },
    Recipe {
        method: PreprocessingMethod::TablePreserving,
        steps: &[
            Step::Fit { max_dim: 2000, upscale: false },
            Step::Sharpen,
            Step::Normalize,
            Step::Brighten(1.15),
            Step::Linear { gain: 1.4, offset: -40.0 },
        ],
        profiles: BOTH_PROFILES,
    },
    Recipe {
        method: PreprocessingMethod::AdaptiveContrast,
        steps: &[
            Step::Fit { max_dim: 3000, upscale: true },
            Step::LocalContrast { tile: 64, clip: 3.0 },
            Step::Gamma(1.2),
            Step::Sharpen,
            Step::Threshold(110),
        ],
        profiles: GENERAL_ONLY,
    },
    Recipe {
        method: PreprocessingMethod::Conservative,
        steps: &[
            Step::Fit { max_dim: 2500, upscale: false },
            Step::Normalize,
            Step::Sharpen,
        ],
        profiles: GENERAL_ONLY,
    },
];

/// Last-chance pass: larger image, light touch, no character whitelist.
pub static DESPERATION: Recipe = Recipe {
    method: PreprocessingMethod::Desperation,
    steps: &[Step::Fit { max_dim: 3500, upscale: true }, Step::Normalize],
    profiles: &[RecognitionProfile::Relaxed],
};

impl Recipe {
    pub fn apply(&self, base: &GrayImage) -> GrayImage {
        self.steps
            .iter()
            .fold(base.clone(), |img, step| step.apply(img))
    }

    /// Apply and encode as PNG for the recognition engine.
    pub fn render(&self, base: &GrayImage) -> Result<Vec<u8>, ExtractionError> {
        encode_png(&self.apply(base))
    }
}

impl Step {
    pub fn apply(&self, img: GrayImage) -> GrayImage {
        match *self {
            Step::Fit { max_dim, upscale } => fit(img, max_dim, upscale),
            Step::Normalize => normalize(img),
            Step::Linear { gain, offset } => map_levels(img, |v| v * gain + offset),
            Step::Brighten(factor) => map_levels(img, |v| v * factor),
            Step::Gamma(gamma) => map_levels(img, |v| 255.0 * (v / 255.0).powf(1.0 / gamma)),
            Step::Sharpen => imageops::unsharpen(&img, 1.0, 2),
            Step::LocalContrast { tile, clip } => local_contrast(&img, tile, clip),
            Step::Threshold(t) => {
                map_levels(img, |v| if v >= f32::from(t) { 255.0 } else { 0.0 })
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Steps
// ═══════════════════════════════════════════════════════════

fn fit(img: GrayImage, max_dim: u32, upscale: bool) -> GrayImage {
    let (w, h) = img.dimensions();
    let (new_w, new_h) = fit_dimensions(w, h, max_dim, upscale);
    if (new_w, new_h) == (w, h) {
        return img;
    }
    imageops::resize(&img, new_w, new_h, FilterType::CatmullRom)
}

/// Dimensions whose longest edge is `max_dim`, aspect ratio preserved.
/// Small images are only enlarged when `upscale` is set, and at most 2x.
pub fn fit_dimensions(width: u32, height: u32, max_dim: u32, upscale: bool) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (1, 1);
    }

    let scale = max_dim as f32 / width.max(height) as f32;
    let scale = if upscale {
        scale.min(MAX_UPSCALE)
    } else {
        scale.min(1.0)
    };

    let new_w = ((width as f32 * scale).round() as u32).clamp(1, max_dim);
    let new_h = ((height as f32 * scale).round() as u32).clamp(1, max_dim);
    (new_w, new_h)
}

fn map_levels(mut img: GrayImage, f: impl Fn(f32) -> f32) -> GrayImage {
    let mut lut = [0u8; 256];
    for (v, out) in lut.iter_mut().enumerate() {
        *out = f(v as f32).round().clamp(0.0, 255.0) as u8;
    }
    for p in img.pixels_mut() {
        p[0] = lut[p[0] as usize];
    }
    img
}

fn histogram(img: &GrayImage) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for p in img.pixels() {
        hist[p[0] as usize] += 1;
    }
    hist
}

fn normalize(img: GrayImage) -> GrayImage {
    let hist = histogram(&img);
    let total: u32 = hist.iter().sum();
    if total == 0 {
        return img;
    }
    let cut = total / 100;

    let low = percentile_level(hist.iter().enumerate(), cut);
    let high = percentile_level(hist.iter().enumerate().rev(), cut);
    if high <= low {
        return img;
    }

    let (low, span) = (low as f32, (high - low) as f32);
    map_levels(img, |v| (v - low) * 255.0 / span)
}

/// First level at which the running count exceeds `cut`.
fn percentile_level<'a>(bins: impl Iterator<Item = (usize, &'a u32)>, cut: u32) -> usize {
    let mut seen = 0;
    for (level, count) in bins {
        seen += count;
        if seen > cut {
            return level;
        }
    }
    0
}

fn local_contrast(img: &GrayImage, tile: u32, clip: f32) -> GrayImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || tile == 0 {
        return img.clone();
    }
    let tiles_x = w.div_ceil(tile);
    let tiles_y = h.div_ceil(tile);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let (x0, y0) = (tx * tile, ty * tile);
            let (x1, y1) = ((x0 + tile).min(w), (y0 + tile).min(h));
            let view = imageops::crop_imm(img, x0, y0, x1 - x0, y1 - y0).to_image();
            luts.push(clipped_equalization(&histogram(&view), clip));
        }
    }

    let lut_at = |tx: u32, ty: u32, v: u8| f32::from(luts[(ty * tiles_x + tx) as usize][v as usize]);
    let neighbours = |pos: u32, count: u32| {
        let f = (pos as f32 + 0.5) / tile as f32 - 0.5;
        let lo = (f.floor().max(0.0) as u32).min(count - 1);
        let hi = (lo + 1).min(count - 1);
        (lo, hi, (f - lo as f32).clamp(0.0, 1.0))
    };

    let mut out = GrayImage::new(w, h);
    for (x, y, p) in out.enumerate_pixels_mut() {
        let v = img.get_pixel(x, y)[0];
        let (tx0, tx1, wx) = neighbours(x, tiles_x);
        let (ty0, ty1, wy) = neighbours(y, tiles_y);
        let top = lut_at(tx0, ty0, v) * (1.0 - wx) + lut_at(tx1, ty0, v) * wx;
        let bottom = lut_at(tx0, ty1, v) * (1.0 - wx) + lut_at(tx1, ty1, v) * wx;
        p[0] = (top * (1.0 - wy) + bottom * wy).round().clamp(0.0, 255.0) as u8;
    }
    out
}

fn clipped_equalization(hist: &[u32; 256], clip: f32) -> [u8; 256] {
    let total: u32 = hist.iter().sum();
    let limit = ((clip * total as f32 / 256.0).ceil() as u32).max(1);

    let mut clipped = *hist;
    let mut excess = 0;
    for bin in clipped.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let bonus = excess / 256;
    for bin in clipped.iter_mut() {
        *bin += bonus;
    }

    let sum: u32 = clipped.iter().sum::<u32>().max(1);
    let mut lut = [0u8; 256];
    let mut cdf = 0u64;
    for (level, bin) in clipped.iter().enumerate() {
        cdf += u64::from(*bin);
        lut[level] = (cdf * 255 / u64::from(sum)) as u8;
    }
    lut
}

// ═══════════════════════════════════════════════════════════
// Decode / encode
// ═══════════════════════════════════════════════════════════

/// Validate image bytes before decoding.
pub fn validate_image_bytes(bytes: &[u8]) -> Result<(), ExtractionError> {
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(ExtractionError::ImageDecode(
            "Image data too small to be valid".into(),
        ));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ExtractionError::ImageDecode(format!(
            "Image data exceeds {}MB limit",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Decode, correct EXIF orientation, and convert to grayscale.
pub fn load_grayscale(bytes: &[u8]) -> Result<GrayImage, ExtractionError> {
    validate_image_bytes(bytes)?;
    let img = image::load_from_memory(bytes)
        .map_err(|e| ExtractionError::ImageDecode(e.to_string()))?;
    let img = apply_orientation(img, read_exif_orientation(bytes));
    Ok(img.to_luma8())
}

/// EXIF tag 0x0112; 1 (normal) when absent.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let Ok(reader) = exif::Reader::new().read_from_container(&mut cursor) else {
        return 1;
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// 1 = normal, 2 = mirrored, 3 = 180, 4 = flipped, 5..8 = rotated (and mirrored).
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>, ExtractionError> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img.clone())
        .write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;
    Ok(cursor.into_inner())
}


#[cfg(test)]
mod tests {
    use super::fixtures::report_png;
    use super::*;
    use image::{GenericImageView, Luma};

    fn gradient(width: u32, from: u8) -> GrayImage {
        GrayImage::from_fn(width, 4, |x, _| Luma([from + x as u8]))
    }

    #[test]
    fn fit_downscales_large_images() {
        assert_eq!(fit_dimensions(4000, 3000, 2000, false), (2000, 1500));
        assert_eq!(fit_dimensions(800, 600, 2000, false), (800, 600));
    }

    #[test]
    fn fit_upscale_is_bounded() {
        assert_eq!(fit_dimensions(800, 600, 3000, true), (1600, 1200));
        assert_eq!(fit_dimensions(2000, 1000, 3000, true), (3000, 1500));
        assert_eq!(fit_dimensions(0, 10, 3000, true), (1, 1));
    }

    #[test]
    fn normalize_stretches_to_full_range() {
        let out = Step::Normalize.apply(gradient(51, 100));
        let levels: Vec<u8> = out.pixels().map(|p| p[0]).collect();
        assert_eq!(*levels.iter().min().unwrap(), 0);
        assert_eq!(*levels.iter().max().unwrap(), 255);
    }

    #[test]
    fn normalize_leaves_flat_image_alone() {
        let flat = GrayImage::from_pixel(10, 10, Luma([90]));
        assert_eq!(Step::Normalize.apply(flat.clone()), flat);
    }

    #[test]
    fn threshold_binarizes() {
        let out = Step::Threshold(128).apply(gradient(200, 0));
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert_eq!(out.get_pixel(127, 0)[0], 0);
        assert_eq!(out.get_pixel(128, 0)[0], 255);
    }

    #[test]
    fn linear_clamps() {
        let out = Step::Linear { gain: 1.3, offset: -35.0 }.apply(gradient(200, 0));
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(199, 0)[0], 224);
    }

    #[test]
    fn gamma_brightens_midtones() {
        let out = Step::Gamma(1.2).apply(GrayImage::from_pixel(2, 2, Luma([128])));
        assert!(out.get_pixel(0, 0)[0] > 128);
    }

    #[test]
    fn local_contrast_spreads_low_contrast_tiles() {
        let img = GrayImage::from_fn(130, 70, |x, _| Luma([if x % 2 == 0 { 120 } else { 130 }]));
        let out = Step::LocalContrast { tile: 64, clip: 3.0 }.apply(img);
        assert_eq!(out.dimensions(), (130, 70));
        let min = out.pixels().map(|p| p[0]).min().unwrap();
        let max = out.pixels().map(|p| p[0]).max().unwrap();
        assert!(max - min > 10, "contrast should widen, got {min}..{max}");
    }

    #[test]
    fn recipe_table_shape() {
        assert_eq!(RECIPES.len(), 4);
        let attempts: usize = RECIPES.iter().map(|r| r.profiles.len()).sum();
        assert_eq!(attempts, 6);
        assert_eq!(DESPERATION.profiles, &[RecognitionProfile::Relaxed]);
    }

    #[test]
    fn recipes_are_deterministic() {
        let base = load_grayscale(&report_png(120, 80)).unwrap();
        for recipe in RECIPES {
            assert_eq!(recipe.render(&base).unwrap(), recipe.render(&base).unwrap());
        }
    }

    #[test]
    fn upscaling_recipe_enlarges_small_scans() {
        let base = load_grayscale(&report_png(120, 80)).unwrap();
        let out = DESPERATION.apply(&base);
        assert_eq!(out.dimensions(), (240, 160));
    }

    #[test]
    fn rendered_variant_is_png() {
        let base = load_grayscale(&report_png(120, 80)).unwrap();
        let png = RECIPES[0].render(&base).unwrap();
        assert_eq!(&png[0..4], b"\x89PNG");
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = load_grayscale(&[0u8; 200]).unwrap_err();
        assert!(matches!(err, ExtractionError::ImageDecode(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn tiny_input_rejected_before_decode() {
        assert!(validate_image_bytes(b"\x89PNG").is_err());
    }

    #[test]
    fn orientation_rotates() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(2, 3));
        assert_eq!(apply_orientation(img.clone(), 6).dimensions(), (3, 2));
        assert_eq!(apply_orientation(img, 1).dimensions(), (2, 3));
    }

    #[test]
    fn missing_exif_defaults_to_normal() {
        assert_eq!(read_exif_orientation(&report_png(20, 20)), 1);
    }
}
