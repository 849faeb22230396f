//! Restoration benchmarks
//!
//! Detection and inpainting on a synthetic scan with dust and scratches.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use scan_restore::restore::to_gray;
use scan_restore::{Config, DefectMaskDetector, MultiPassInpainter, PipelineConfig};

fn synthetic_scan(width: u32, height: u32) -> RgbImage {
    let mut img = RgbImage::from_fn(width, height, |x, y| {
        let v = (96 + (x * 64 / width) + (y * 32 / height)) as u8;
        Rgb([v, v, v])
    });
    // Dust specks
    for i in 0..40u32 {
        let cx = (i * 37) % (width - 4);
        let cy = (i * 53) % (height - 4);
        for dy in 0..3 {
            for dx in 0..3 {
                img.put_pixel(cx + dx, cy + dy, Rgb([250, 250, 250]));
            }
        }
    }
    // Scratch
    for x in 10..width - 10 {
        let y = height / 3 + x / 16;
        if y < height {
            img.put_pixel(x, y, Rgb([20, 20, 20]));
        }
    }
    img
}

fn bench_detection(c: &mut Criterion) {
    let config = PipelineConfig::from(&Config::default());
    let scan = synthetic_scan(512, 384);
    let gray = to_gray(&scan);

    c.bench_function("detect_512x384", |b| {
        b.iter(|| DefectMaskDetector::detect(black_box(&gray), &config.detection))
    });
}

fn bench_inpaint(c: &mut Criterion) {
    let config = PipelineConfig::from(&Config::default());
    let scan = synthetic_scan(512, 384);
    let gray = to_gray(&scan);
    let Ok(mask) = DefectMaskDetector::detect(&gray, &config.detection) else {
        return;
    };

    c.bench_function("inpaint_512x384", |b| {
        b.iter(|| MultiPassInpainter::inpaint(black_box(&scan), &mask, &config.inpaint))
    });
}

criterion_group!(benches, bench_detection, bench_inpaint);
criterion_main!(benches);
