//! Morphological primitives
//!
//! Grayscale erosion/dilation with elliptical structuring elements, the
//! derived top-hat and black-hat transforms, and the binary operations used
//! to clean defect masks.
//!
//! The elliptical element follows the usual discrete construction: for each
//! row `dy` of a `size` x `size` window, the row spans
//! `c - dx ..= c + dx` where `dx = round(c * sqrt(1 - dy^2 / r^2))`.
//! A 3x3 ellipse is therefore a cross, which matches the L1 unit ball used by
//! `imageproc`'s binary morphology.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

use super::types::{DefectMask, MASK_OFF, MASK_ON};

// ============================================================
// Structuring Element
// ============================================================

/// Elliptical structuring element stored as horizontal runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    size: u32,
    /// (row offset, first column offset, last column offset), inclusive
    runs: Vec<(i32, i32, i32)>,
}

impl StructuringElement {
    /// Build a square-bounded ellipse of the given size
    pub fn ellipse(size: u32) -> Self {
        let size = size.max(1);
        let r = (size / 2) as i32;
        let c = (size / 2) as i32;
        let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };

        let mut runs = Vec::with_capacity(size as usize);
        for i in 0..size as i32 {
            let dy = i - r;
            if dy.abs() > r {
                continue;
            }
            let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round() as i32;
            let j1 = (c - dx).max(0);
            let j2 = (c + dx + 1).min(size as i32);
            if j2 > j1 {
                runs.push((dy, j1 - c, j2 - 1 - c));
            }
        }

        Self { size, runs }
    }

    /// Window size
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of active cells
    pub fn area(&self) -> usize {
        self.runs
            .iter()
            .map(|(_, x0, x1)| (x1 - x0 + 1) as usize)
            .sum()
    }
}

// ============================================================
// Grayscale Morphology
// ============================================================

#[derive(Clone, Copy)]
enum Extremum {
    Min,
    Max,
}

/// Apply a min or max filter over the element; out-of-bounds cells are ignored
fn rank_filter(src: &GrayImage, element: &StructuringElement, op: Extremum) -> GrayImage {
    let (width, height) = src.dimensions();
    let w = width as i32;
    let h = height as i32;
    let data = src.as_raw();
    let mut out = GrayImage::new(width, height);

    for y in 0..h {
        for x in 0..w {
            let mut acc = match op {
                Extremum::Min => u8::MAX,
                Extremum::Max => u8::MIN,
            };
            for &(dy, x0, x1) in &element.runs {
                let sy = y + dy;
                if sy < 0 || sy >= h {
                    continue;
                }
                let sx0 = (x + x0).max(0);
                let sx1 = (x + x1).min(w - 1);
                if sx0 > sx1 {
                    continue;
                }
                let row = (sy * w) as usize;
                let span = &data[row + sx0 as usize..=row + sx1 as usize];
                acc = match op {
                    Extremum::Min => span.iter().copied().fold(acc, u8::min),
                    Extremum::Max => span.iter().copied().fold(acc, u8::max),
                };
            }
            out.put_pixel(x as u32, y as u32, Luma([acc]));
        }
    }

    out
}

/// Grayscale erosion (local minimum)
pub fn erode(src: &GrayImage, element: &StructuringElement) -> GrayImage {
    rank_filter(src, element, Extremum::Min)
}

/// Grayscale dilation (local maximum)
pub fn dilate(src: &GrayImage, element: &StructuringElement) -> GrayImage {
    rank_filter(src, element, Extremum::Max)
}

/// Grayscale opening: erosion followed by dilation
pub fn open(src: &GrayImage, element: &StructuringElement) -> GrayImage {
    dilate(&erode(src, element), element)
}

/// Grayscale closing: dilation followed by erosion
pub fn close(src: &GrayImage, element: &StructuringElement) -> GrayImage {
    erode(&dilate(src, element), element)
}

/// Top-hat: bright structures smaller than the element (`src - open(src)`)
pub fn top_hat(src: &GrayImage, element: &StructuringElement) -> GrayImage {
    let opened = open(src, element);
    zip_map(src, &opened, |s, o| s.saturating_sub(o))
}

/// Black-hat: dark structures smaller than the element (`close(src) - src`)
pub fn black_hat(src: &GrayImage, element: &StructuringElement) -> GrayImage {
    let closed = close(src, element);
    zip_map(&closed, src, |c, s| c.saturating_sub(s))
}

/// Saturating per-pixel sum
pub fn saturating_add(a: &GrayImage, b: &GrayImage) -> GrayImage {
    zip_map(a, b, u8::saturating_add)
}

fn zip_map(a: &GrayImage, b: &GrayImage, f: impl Fn(u8, u8) -> u8) -> GrayImage {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    let (width, height) = a.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        Luma([f(a.get_pixel(x, y).0[0], b.get_pixel(x, y).0[0])])
    })
}

/// Stretch intensities linearly so the minimum maps to 0 and the maximum to 255
///
/// A constant image maps to all zeros.
pub fn normalize_min_max(src: &GrayImage) -> GrayImage {
    let (min, max) = src
        .as_raw()
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    let (width, height) = src.dimensions();
    if width == 0 || height == 0 || max <= min {
        return GrayImage::new(width, height);
    }

    let scale = 255.0 / (max - min) as f64;
    let mut out = src.clone();
    for p in out.pixels_mut() {
        p.0[0] = ((p.0[0] - min) as f64 * scale).round().min(255.0) as u8;
    }
    out
}

/// Binary threshold: pixels at or above `threshold` become defect pixels
pub fn threshold_at_least(src: &GrayImage, threshold: u8) -> DefectMask {
    let mut out = src.clone();
    for p in out.pixels_mut() {
        p.0[0] = if p.0[0] >= threshold { MASK_ON } else { MASK_OFF };
    }
    out
}

// ============================================================
// Binary Mask Morphology (3x3 ellipse)
// ============================================================

/// Binary opening with the 3x3 elliptical element
pub fn mask_open(mask: &DefectMask) -> DefectMask {
    morphology::open(mask, Norm::L1, 1)
}

/// Largest L1 radius passed to `imageproc` in one call; its distances saturate at 255
const MAX_DILATE_STEP: u8 = 254;

/// Binary dilation with the 3x3 elliptical element, repeated `iterations` times
///
/// An empty mask stays empty for any iteration count.
pub fn mask_dilate(mask: &DefectMask, iterations: u8) -> DefectMask {
    if iterations == 0 || !mask.pixels().any(|p| p.0[0] > 0) {
        return mask.clone();
    }
    let first = iterations.min(MAX_DILATE_STEP);
    let dilated = morphology::dilate(mask, Norm::L1, first);
    if iterations > first {
        morphology::dilate(&dilated, Norm::L1, iterations - first)
    } else {
        dilated
    }
}

/// Binary erosion with the 3x3 elliptical element, one iteration
pub fn mask_erode(mask: &DefectMask) -> DefectMask {
    morphology::erode(mask, Norm::L1, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contains(el: &StructuringElement, dx: i32, dy: i32) -> bool {
        el.runs
            .iter()
            .any(|&(ry, x0, x1)| ry == dy && dx >= x0 && dx <= x1)
    }

    #[test]
    fn test_ellipse_three_is_cross() {
        let el = StructuringElement::ellipse(3);
        assert_eq!(el.area(), 5);
        assert!(contains(&el, 0, 0));
        assert!(contains(&el, 1, 0));
        assert!(contains(&el, 0, -1));
        assert!(!contains(&el, 1, 1));
        assert!(!contains(&el, -1, -1));
    }

    #[test]
    fn test_ellipse_seven_shape() {
        let el = StructuringElement::ellipse(7);
        assert_eq!(el.size(), 7);
        // Rows: 1, 5, 7, 7, 7, 5, 1
        assert_eq!(el.area(), 33);
        assert!(contains(&el, 0, -3));
        assert!(!contains(&el, 1, -3));
        assert!(contains(&el, 3, 1));
        assert!(!contains(&el, 3, 2));
    }

    #[test]
    fn test_ellipse_one_is_point() {
        let el = StructuringElement::ellipse(1);
        assert_eq!(el.area(), 1);
        assert!(contains(&el, 0, 0));
    }

    #[test]
    fn test_erode_dilate_flat_image() {
        let gray = GrayImage::from_pixel(10, 10, Luma([90]));
        let el = StructuringElement::ellipse(5);
        assert_eq!(erode(&gray, &el), gray);
        assert_eq!(dilate(&gray, &el), gray);
    }

    #[test]
    fn test_top_hat_highlights_bright_speck() {
        let mut gray = GrayImage::from_pixel(21, 21, Luma([100]));
        gray.put_pixel(10, 10, Luma([220]));

        let th = top_hat(&gray, &StructuringElement::ellipse(7));
        assert_eq!(th.get_pixel(10, 10).0[0], 120);
        assert_eq!(th.get_pixel(0, 0).0[0], 0);
        assert_eq!(th.get_pixel(11, 10).0[0], 0);
    }

    #[test]
    fn test_black_hat_highlights_dark_speck() {
        let mut gray = GrayImage::from_pixel(21, 21, Luma([100]));
        gray.put_pixel(10, 10, Luma([30]));

        let bh = black_hat(&gray, &StructuringElement::ellipse(7));
        assert_eq!(bh.get_pixel(10, 10).0[0], 70);
        assert_eq!(bh.get_pixel(5, 5).0[0], 0);

        let th = top_hat(&gray, &StructuringElement::ellipse(7));
        assert_eq!(th.get_pixel(10, 10).0[0], 0);
    }

    #[test]
    fn test_normalize_min_max() {
        let mut gray = GrayImage::from_pixel(4, 4, Luma([10]));
        gray.put_pixel(0, 0, Luma([60]));
        let norm = normalize_min_max(&gray);
        assert_eq!(norm.get_pixel(0, 0).0[0], 255);
        assert_eq!(norm.get_pixel(1, 1).0[0], 0);
    }

    #[test]
    fn test_normalize_constant_is_zero() {
        let gray = GrayImage::from_pixel(4, 4, Luma([42]));
        let norm = normalize_min_max(&gray);
        assert!(norm.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut gray = GrayImage::from_pixel(3, 1, Luma([0]));
        gray.put_pixel(0, 0, Luma([45]));
        gray.put_pixel(1, 0, Luma([46]));
        gray.put_pixel(2, 0, Luma([47]));
        let mask = threshold_at_least(&gray, 46);
        assert_eq!(mask.get_pixel(0, 0).0[0], MASK_OFF);
        assert_eq!(mask.get_pixel(1, 0).0[0], MASK_ON);
        assert_eq!(mask.get_pixel(2, 0).0[0], MASK_ON);
    }

    #[test]
    fn test_mask_open_removes_single_pixel() {
        let mut mask = DefectMask::new(9, 9);
        mask.put_pixel(4, 4, Luma([MASK_ON]));
        let opened = mask_open(&mask);
        assert!(opened.pixels().all(|p| p.0[0] == MASK_OFF));
    }

    #[test]
    fn test_mask_dilate_grows_diamond() {
        let mut mask = DefectMask::new(9, 9);
        mask.put_pixel(4, 4, Luma([MASK_ON]));

        let once = mask_dilate(&mask, 1);
        assert_eq!(once.pixels().filter(|p| p.0[0] > 0).count(), 5);

        let twice = mask_dilate(&mask, 2);
        assert_eq!(twice.pixels().filter(|p| p.0[0] > 0).count(), 13);

        assert_eq!(mask_dilate(&mask, 0), mask);
    }

    #[test]
    fn test_mask_dilate_empty_mask_stays_empty() {
        let mask = DefectMask::new(64, 48);
        for iterations in [1, 254, 255] {
            let dilated = mask_dilate(&mask, iterations);
            assert!(dilated.pixels().all(|p| p.0[0] == MASK_OFF), "{}", iterations);
        }
    }

    #[test]
    fn test_mask_dilate_max_iterations_is_bounded() {
        // Diamond of radius 255 clipped to three rows of a 600-wide image
        let mut mask = DefectMask::new(600, 3);
        mask.put_pixel(300, 1, Luma([MASK_ON]));

        let dilated = mask_dilate(&mask, 255);
        assert_eq!(dilated.pixels().filter(|p| p.0[0] > 0).count(), 511 + 509 * 2);
        assert_eq!(dilated.get_pixel(45, 1).0[0], MASK_ON);
        assert_eq!(dilated.get_pixel(44, 1).0[0], MASK_OFF);
        assert_eq!(dilated.get_pixel(0, 0).0[0], MASK_OFF);
    }

    #[test]
    fn test_mask_erode_shrinks_block() {
        let mut mask = DefectMask::new(11, 11);
        for y in 3..8 {
            for x in 3..8 {
                mask.put_pixel(x, y, Luma([MASK_ON]));
            }
        }
        let eroded = mask_erode(&mask);
        let count = eroded.pixels().filter(|p| p.0[0] > 0).count();
        assert_eq!(count, 9);
        assert_eq!(eroded.get_pixel(5, 5).0[0], MASK_ON);
        assert_eq!(eroded.get_pixel(3, 3).0[0], MASK_OFF);
    }
}
