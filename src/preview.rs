//! Side-by-side preview of a restoration run
//!
//! Composes {original, mask, result} into one strip and opens it with the
//! platform image viewer. The composite lives in a temporary file only.

use image::{GrayImage, Rgb, RgbImage};
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

use crate::restore::{RestoreError, Result};

/// Gap between panels in pixels
const PANEL_GAP: u32 = 8;

/// Separator color
const GAP_COLOR: Rgb<u8> = Rgb([32, 32, 32]);

/// Viewer commands tried in order
const VIEWERS: [&str; 3] = ["xdg-open", "open", "explorer"];

/// Place original, mask and result left to right
///
/// Panels smaller than the tallest one are top-aligned.
pub fn compose_side_by_side(original: &RgbImage, mask: &GrayImage, result: &RgbImage) -> RgbImage {
    let mask_rgb = image::DynamicImage::ImageLuma8(mask.clone()).to_rgb8();
    let panels = [original, &mask_rgb, result];

    let width = panels.iter().map(|p| p.width()).sum::<u32>() + PANEL_GAP * 2;
    let height = panels.iter().map(|p| p.height()).max().unwrap_or(0);
    let mut canvas = RgbImage::from_pixel(width, height, GAP_COLOR);

    let mut offset_x = 0;
    for panel in panels {
        for (x, y, pixel) in panel.enumerate_pixels() {
            canvas.put_pixel(offset_x + x, y, *pixel);
        }
        offset_x += panel.width() + PANEL_GAP;
    }

    canvas
}

/// Find an available image viewer
pub fn find_viewer() -> Option<PathBuf> {
    VIEWERS.iter().find_map(|cmd| which::which(cmd).ok())
}

/// Write the composite to a temporary file and open it in the viewer
///
/// Blocks until the viewer command returns.
pub fn show(original: &RgbImage, mask: &GrayImage, result: &RgbImage) -> Result<()> {
    let viewer = find_viewer().ok_or_else(|| {
        RestoreError::InvalidParameter("no image viewer found for --show".to_string())
    })?;

    let composite = compose_side_by_side(original, mask, result);
    let file = tempfile::Builder::new()
        .prefix("scan-restore-preview-")
        .suffix(".png")
        .tempfile()?;
    composite
        .save(file.path())
        .map_err(|e| RestoreError::SaveFailed {
            path: file.path().to_path_buf(),
            reason: e.to_string(),
        })?;

    debug!(viewer = %viewer.display(), path = %file.path().display(), "opening preview");
    Command::new(&viewer).arg(file.path()).status()?;

    // Keep the file until the user has had a look; it is removed on drop
    eprintln!("Preview open. Press Enter to close.");
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_compose_dimensions() {
        let original = RgbImage::from_pixel(10, 6, Rgb([1, 2, 3]));
        let mask = GrayImage::from_pixel(10, 6, Luma([255]));
        let result = RgbImage::from_pixel(10, 6, Rgb([4, 5, 6]));

        let canvas = compose_side_by_side(&original, &mask, &result);
        assert_eq!(canvas.dimensions(), (30 + PANEL_GAP * 2, 6));
    }

    #[test]
    fn test_compose_panel_placement() {
        let original = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        let mask = GrayImage::from_pixel(4, 4, Luma([255]));
        let result = RgbImage::from_pixel(4, 4, Rgb([40, 50, 60]));

        let canvas = compose_side_by_side(&original, &mask, &result);
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([10, 20, 30]));
        assert_eq!(canvas.get_pixel(4, 0), &GAP_COLOR);
        assert_eq!(canvas.get_pixel(4 + PANEL_GAP, 0), &Rgb([255, 255, 255]));
        let last = 8 + PANEL_GAP * 2;
        assert_eq!(canvas.get_pixel(last, 3), &Rgb([40, 50, 60]));
    }
}
