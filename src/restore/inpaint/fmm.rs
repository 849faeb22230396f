//! Fast-marching hole filling
//!
//! Pixels under the mask are visited in order of their distance from the
//! known region (Eikonal distance, propagated with a min-heap). Each newly
//! reached pixel is filled immediately from the already known pixels within
//! the radius, so later pixels can build on earlier fills.

use image::RgbImage;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::InpaintMethod;
use crate::restore::types::DefectMask;

/// Distance assigned to pixels not yet reached
const FAR: f32 = 1.0e6;

/// Floor for the direction factor so pixels beside the normal still count
const MIN_DIRECTION: f32 = 1.0e-6;

/// Directions below this magnitude are treated as perpendicular
const DIRECTION_CUTOFF: f32 = 0.01;

/// Isotropic share of the isophote weight
const ISOPHOTE_FLOOR: f32 = 1.0e-3;

const CHANNELS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Original pixel outside the mask, or already finalized
    Known,
    /// Filled pixel on the marching front
    Band,
    /// Masked pixel not yet reached
    Inside,
}

#[derive(Debug, Clone, Copy)]
struct Front {
    dist: f32,
    idx: usize,
}

impl PartialEq for Front {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Front {}

impl PartialOrd for Front {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Front {
    // Reversed so BinaryHeap pops the smallest distance first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

/// Working state for one fill pass
struct Marcher {
    width: i32,
    height: i32,
    state: Vec<State>,
    dist: Vec<f32>,
    planes: [Vec<f32>; CHANNELS],
}

impl Marcher {
    fn new(image: &RgbImage, mask: &DefectMask) -> Self {
        let (width, height) = image.dimensions();
        let len = (width as usize) * (height as usize);

        let mut planes: [Vec<f32>; CHANNELS] = [
            Vec::with_capacity(len),
            Vec::with_capacity(len),
            Vec::with_capacity(len),
        ];
        for pixel in image.pixels() {
            for (c, plane) in planes.iter_mut().enumerate() {
                plane.push(pixel.0[c] as f32);
            }
        }

        let mut state = vec![State::Known; len];
        let mut dist = vec![0.0f32; len];
        for (i, m) in mask.as_raw().iter().enumerate() {
            if *m > 0 {
                state[i] = State::Inside;
                dist[i] = FAR;
            }
        }

        Self {
            width: width as i32,
            height: height as i32,
            state,
            dist,
            planes,
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            None
        } else {
            Some((y * self.width + x) as usize)
        }
    }

    fn is_known(&self, x: i32, y: i32) -> bool {
        self.index(x, y)
            .is_some_and(|i| self.state[i] != State::Inside)
    }

    /// Known pixels 4-adjacent to the mask form the initial front
    fn initial_front(&mut self) -> BinaryHeap<Front> {
        let mut heap = BinaryHeap::new();
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = (y * self.width + x) as usize;
                if self.state[idx] != State::Known {
                    continue;
                }
                let touches_mask = [(1, 0), (-1, 0), (0, 1), (0, -1)].iter().any(|(dx, dy)| {
                    self.index(x + dx, y + dy)
                        .is_some_and(|n| self.state[n] == State::Inside)
                });
                if touches_mask {
                    self.state[idx] = State::Band;
                    heap.push(Front { dist: 0.0, idx });
                }
            }
        }
        heap
    }

    /// Eikonal update from two orthogonal neighbors
    fn solve(&self, (x1, y1): (i32, i32), (x2, y2): (i32, i32)) -> f32 {
        let a = self.index(x1, y1).filter(|&i| self.state[i] != State::Inside);
        let b = self.index(x2, y2).filter(|&i| self.state[i] != State::Inside);

        match (a, b) {
            (Some(a), Some(b)) => {
                let (t1, t2) = (self.dist[a], self.dist[b]);
                let diff = t1 - t2;
                let disc = 2.0 - diff * diff;
                if disc > 0.0 {
                    let r = disc.sqrt();
                    let s = (t1 + t2 - r) / 2.0;
                    if s >= t1 && s >= t2 {
                        return s;
                    }
                    let s = s + r;
                    if s >= t1 && s >= t2 {
                        return s;
                    }
                }
                1.0 + t1.min(t2)
            }
            (Some(a), None) => 1.0 + self.dist[a],
            (None, Some(b)) => 1.0 + self.dist[b],
            (None, None) => FAR,
        }
    }

    fn arrival_time(&self, x: i32, y: i32) -> f32 {
        [
            self.solve((x - 1, y), (x, y - 1)),
            self.solve((x + 1, y), (x, y - 1)),
            self.solve((x - 1, y), (x, y + 1)),
            self.solve((x + 1, y), (x, y + 1)),
        ]
        .into_iter()
        .fold(FAR, f32::min)
    }

    /// Central difference where both sides are known, one-sided otherwise
    fn gradient(&self, values: &[f32], x: i32, y: i32) -> (f32, f32) {
        let here = values[(y * self.width + x) as usize];
        let axis = |(ax, ay): (i32, i32), (bx, by): (i32, i32)| -> f32 {
            let fwd = self.index(ax, ay).filter(|&i| self.state[i] != State::Inside);
            let back = self.index(bx, by).filter(|&i| self.state[i] != State::Inside);
            match (fwd, back) {
                (Some(f), Some(b)) => (values[f] - values[b]) * 0.5,
                (Some(f), None) => values[f] - here,
                (None, Some(b)) => here - values[b],
                (None, None) => 0.0,
            }
        };
        (
            axis((x + 1, y), (x - 1, y)),
            axis((x, y + 1), (x, y - 1)),
        )
    }

    fn fill_pixel(&mut self, x: i32, y: i32, radius: i32, method: InpaintMethod) {
        let idx = (y * self.width + x) as usize;
        let grad_t = self.gradient(&self.dist, x, y);
        let radius_sq = radius * radius;

        for c in 0..CHANNELS {
            let mut weighted = 0.0f32;
            let mut weights = 0.0f32;

            for qy in (y - radius)..=(y + radius) {
                for qx in (x - radius)..=(x + radius) {
                    let (rx, ry) = (x - qx, y - qy);
                    let len_sq = rx * rx + ry * ry;
                    if len_sq == 0 || len_sq > radius_sq || !self.is_known(qx, qy) {
                        continue;
                    }
                    let q = (qy * self.width + qx) as usize;
                    let (rx, ry, len_sq) = (rx as f32, ry as f32, len_sq as f32);
                    let value = self.planes[c][q];
                    let grad_i = self.gradient(&self.planes[c], qx, qy);

                    let (w, estimate) = match method {
                        InpaintMethod::Telea => {
                            let mut dir = rx * grad_t.0 + ry * grad_t.1;
                            if dir.abs() <= DIRECTION_CUTOFF {
                                dir = MIN_DIRECTION;
                            }
                            let dst = 1.0 / (len_sq * len_sq.sqrt());
                            let lev = 1.0 / (1.0 + (self.dist[q] - self.dist[idx]).abs());
                            let w = (dir * dst * lev).abs();
                            (w, value + grad_i.0 * rx + grad_i.1 * ry)
                        }
                        InpaintMethod::NavierStokes => {
                            let grad_len = (grad_i.0 * grad_i.0 + grad_i.1 * grad_i.1).sqrt();
                            let along = if grad_len > f32::EPSILON {
                                // Isophote direction is perpendicular to the gradient
                                let (iso_x, iso_y) = (-grad_i.1 / grad_len, grad_i.0 / grad_len);
                                (rx * iso_x + ry * iso_y).abs() / len_sq.sqrt()
                            } else {
                                1.0
                            };
                            ((along + ISOPHOTE_FLOOR) / len_sq, value)
                        }
                    };

                    weighted += w * estimate;
                    weights += w;
                }
            }

            if weights > 0.0 {
                self.planes[c][idx] = (weighted / weights).clamp(0.0, 255.0);
            }
        }
    }

    fn run(&mut self, radius: u32, method: InpaintMethod) {
        let radius = radius as i32;
        let mut heap = self.initial_front();

        while let Some(Front { idx, .. }) = heap.pop() {
            self.state[idx] = State::Known;
            let x = idx as i32 % self.width;
            let y = idx as i32 / self.width;

            for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                let (nx, ny) = (x + dx, y + dy);
                let Some(n) = self.index(nx, ny) else {
                    continue;
                };
                if self.state[n] != State::Inside {
                    continue;
                }
                self.dist[n] = self.arrival_time(nx, ny);
                self.fill_pixel(nx, ny, radius, method);
                self.state[n] = State::Band;
                heap.push(Front {
                    dist: self.dist[n],
                    idx: n,
                });
            }
        }
    }
}

/// Fill every masked pixel of `image` in place using the given radius
///
/// Pixels outside the mask are left untouched.
pub fn fill(image: &mut RgbImage, mask: &DefectMask, radius: u32, method: InpaintMethod) {
    let mut marcher = Marcher::new(image, mask);
    marcher.run(radius, method);

    let width = image.width() as usize;
    for (i, m) in mask.as_raw().iter().enumerate() {
        if *m == 0 {
            continue;
        }
        let (x, y) = ((i % width) as u32, (i / width) as u32);
        let pixel = image.get_pixel_mut(x, y);
        for c in 0..CHANNELS {
            pixel.0[c] = marcher.planes[c][i].round() as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    fn square_mask(width: u32, height: u32, x0: u32, y0: u32, size: u32) -> DefectMask {
        let mut mask = DefectMask::new(width, height);
        for y in y0..y0 + size {
            for x in x0..x0 + size {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        mask
    }

    #[test]
    fn test_front_orders_by_distance() {
        let mut heap = BinaryHeap::new();
        heap.push(Front { dist: 3.0, idx: 0 });
        heap.push(Front { dist: 1.0, idx: 1 });
        heap.push(Front { dist: 2.0, idx: 2 });
        assert_eq!(heap.pop().map(|f| f.idx), Some(1));
        assert_eq!(heap.pop().map(|f| f.idx), Some(2));
        assert_eq!(heap.pop().map(|f| f.idx), Some(0));
    }

    #[test]
    fn test_fill_flat_region_both_methods() {
        for method in [InpaintMethod::Telea, InpaintMethod::NavierStokes] {
            let mut image = RgbImage::from_pixel(20, 20, Rgb([90, 140, 200]));
            let mask = square_mask(20, 20, 8, 8, 4);
            for y in 8..12 {
                for x in 8..12 {
                    image.put_pixel(x, y, Rgb([255, 0, 0]));
                }
            }

            fill(&mut image, &mask, 3, method);

            for p in image.pixels() {
                assert_eq!(p.0, [90, 140, 200], "{:?}", method);
            }
        }
    }

    #[test]
    fn test_fill_leaves_unmasked_pixels() {
        let mut image = RgbImage::new(16, 16);
        for (x, y, p) in image.enumerate_pixels_mut() {
            *p = Rgb([(x * 10) as u8, (y * 10) as u8, 50]);
        }
        let original = image.clone();
        let mask = square_mask(16, 16, 6, 6, 3);

        fill(&mut image, &mask, 2, InpaintMethod::Telea);

        for (x, y, p) in image.enumerate_pixels() {
            if mask.get_pixel(x, y).0[0] == 0 {
                assert_eq!(p, original.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn test_fill_is_bounded_by_known_neighbors() {
        let mut image = RgbImage::new(30, 10);
        for (x, _, p) in image.enumerate_pixels_mut() {
            let v = (x * 8) as u8;
            *p = Rgb([v, v, v]);
        }
        let mask = square_mask(30, 10, 13, 3, 3);
        fill(&mut image, &mask, 3, InpaintMethod::NavierStokes);

        // Known values within reach span columns 10..=18
        for y in 3..6 {
            for x in 13..16 {
                let v = image.get_pixel(x, y).0[0] as i32;
                assert!((80..=144).contains(&v), "({x},{y}) = {v}");
            }
        }
    }

    #[test]
    fn test_fill_empty_mask_is_noop() {
        let mut image = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
        image.put_pixel(4, 4, Rgb([200, 100, 50]));
        let original = image.clone();
        fill(&mut image, &DefectMask::new(8, 8), 5, InpaintMethod::Telea);
        assert_eq!(image, original);
    }
}
