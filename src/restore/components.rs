//! Connected component analysis for defect masks
//!
//! Components are 8-connected sets of defect pixels. For each component the
//! second central moments are accumulated during the flood fill, from which
//! the best-fit ellipse axes and the thinness ratio are derived.

use image::Luma;
use std::collections::VecDeque;

use super::types::{DefectMask, MASK_OFF, MASK_ON};

/// Guard added to the major axis before division
pub const THINNESS_EPSILON: f64 = 1e-6;

/// 8-connected neighborhood
const NEIGHBORS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

// ============================================================
// Blob Features
// ============================================================

/// Shape and size features of one connected component
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlobFeatures {
    /// Pixel count
    pub area: u32,
    /// Bounding box (min_x, min_y, max_x, max_y), inclusive
    pub bbox: (u32, u32, u32, u32),
    /// Centroid (x, y)
    pub centroid: (f64, f64),
    /// Major axis length of the best-fit ellipse
    pub major_axis: f64,
    /// Minor axis length of the best-fit ellipse
    pub minor_axis: f64,
}

impl BlobFeatures {
    /// Minor-to-major axis ratio; 1.0 when the major axis is zero
    pub fn thinness_ratio(&self) -> f64 {
        thinness_ratio(self.minor_axis, self.major_axis)
    }
}

/// Thinness of an ellipse given its axis lengths
pub fn thinness_ratio(minor_axis: f64, major_axis: f64) -> f64 {
    if major_axis > 0.0 {
        (minor_axis / (major_axis + THINNESS_EPSILON)).clamp(0.0, 1.0)
    } else {
        1.0
    }
}

// ============================================================
// Component
// ============================================================

/// A labelled connected component with its pixel list
#[derive(Debug, Clone)]
pub struct Component {
    pixels: Vec<(u32, u32)>,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    sum_x: f64,
    sum_y: f64,
    sum_xx: f64,
    sum_yy: f64,
    sum_xy: f64,
}

impl Component {
    fn new(x: u32, y: u32) -> Self {
        let mut component = Self {
            pixels: Vec::new(),
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            sum_x: 0.0,
            sum_y: 0.0,
            sum_xx: 0.0,
            sum_yy: 0.0,
            sum_xy: 0.0,
        };
        component.expand(x, y);
        component
    }

    fn expand(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);

        let (fx, fy) = (x as f64, y as f64);
        self.sum_x += fx;
        self.sum_y += fy;
        self.sum_xx += fx * fx;
        self.sum_yy += fy * fy;
        self.sum_xy += fx * fy;

        self.pixels.push((x, y));
    }

    /// Pixel count
    pub fn area(&self) -> u32 {
        self.pixels.len() as u32
    }

    /// Compute size and best-fit ellipse features
    ///
    /// Axis lengths are `4 * sqrt(lambda)` for the eigenvalues of the
    /// normalized central second-moment matrix.
    pub fn features(&self) -> BlobFeatures {
        let n = self.pixels.len() as f64;
        let cx = self.sum_x / n;
        let cy = self.sum_y / n;

        let var_x = (self.sum_xx / n - cx * cx).max(0.0);
        let var_y = (self.sum_yy / n - cy * cy).max(0.0);
        let cov = self.sum_xy / n - cx * cy;

        let half_trace = (var_x + var_y) / 2.0;
        let spread = (((var_x - var_y) / 2.0).powi(2) + cov * cov).sqrt();
        let lambda_major = (half_trace + spread).max(0.0);
        let lambda_minor = (half_trace - spread).max(0.0);

        BlobFeatures {
            area: self.area(),
            bbox: (self.min_x, self.min_y, self.max_x, self.max_y),
            centroid: (cx, cy),
            major_axis: 4.0 * lambda_major.sqrt(),
            minor_axis: 4.0 * lambda_minor.sqrt(),
        }
    }

    /// Paint this component into a mask
    pub fn paint(&self, mask: &mut DefectMask) {
        for &(x, y) in &self.pixels {
            mask.put_pixel(x, y, Luma([MASK_ON]));
        }
    }
}

// ============================================================
// Labelling
// ============================================================

/// Find all 8-connected components of defect pixels
pub fn find_components(mask: &DefectMask) -> Vec<Component> {
    let (width, height) = mask.dimensions();
    let mut visited = vec![false; (width as usize) * (height as usize)];
    let mut components = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let idx = (y * width + x) as usize;
            if !visited[idx] && mask.get_pixel(x, y).0[0] > 0 {
                components.push(flood_fill(mask, x, y, &mut visited));
            }
        }
    }

    components
}

fn flood_fill(mask: &DefectMask, start_x: u32, start_y: u32, visited: &mut [bool]) -> Component {
    let (width, height) = mask.dimensions();
    let mut component = Component::new(start_x, start_y);
    let mut queue = VecDeque::new();
    queue.push_back((start_x, start_y));
    visited[(start_y * width + start_x) as usize] = true;

    while let Some((x, y)) = queue.pop_front() {
        for (dx, dy) in &NEIGHBORS {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx < 0 || nx >= width as i32 || ny < 0 || ny >= height as i32 {
                continue;
            }
            let (nx, ny) = (nx as u32, ny as u32);
            let idx = (ny * width + nx) as usize;
            if !visited[idx] && mask.get_pixel(nx, ny).0[0] > 0 {
                visited[idx] = true;
                component.expand(nx, ny);
                queue.push_back((nx, ny));
            }
        }
    }

    component
}

/// Drop components with fewer than `min_size` pixels
pub fn remove_small_components(mask: &DefectMask, min_size: u32) -> DefectMask {
    let (width, height) = mask.dimensions();
    let mut out = DefectMask::from_pixel(width, height, Luma([MASK_OFF]));
    for component in find_components(mask) {
        if component.area() >= min_size {
            component.paint(&mut out);
        }
    }
    out
}
