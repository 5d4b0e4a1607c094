//! Compositing benchmarks
//!
//! Measures the pixel work done after segmentation: layering instance
//! images, blending with a person mask and scaling masks back to source size.

use background_remover::{
    compose::{blend_with_mask, combine_observations, layer_over, scale_mask_to_extent},
    segmenter::{InstanceObservation, MaskedInstances},
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{GrayImage, Luma, Rgba, RgbaImage};
use std::sync::Arc;

const SIZES: [(u32, u32); 3] = [(256, 256), (1024, 768), (2048, 1536)];

fn source(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    })
}

fn ellipse_mask(width: u32, height: u32) -> GrayImage {
    let (cx, cy) = (f64::from(width) / 2.0, f64::from(height) / 2.0);
    GrayImage::from_fn(width, height, |x, y| {
        let dx = (f64::from(x) - cx) / cx;
        let dy = (f64::from(y) - cy) / cy;
        if dx * dx + dy * dy < 0.5 {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

fn bench_layer_over(c: &mut Criterion) {
    let mut group = c.benchmark_group("layer_over");
    for (width, height) in SIZES {
        let layer = source(width, height);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{width}x{height}")),
            &layer,
            |b, layer| {
                b.iter(|| {
                    let mut base = RgbaImage::new(width, height);
                    layer_over(&mut base, black_box(layer)).unwrap();
                    base
                });
            },
        );
    }
    group.finish();
}

fn bench_blend_with_mask(c: &mut Criterion) {
    let mut group = c.benchmark_group("blend_with_mask");
    for (width, height) in SIZES {
        let image = source(width, height);
        let mask = ellipse_mask(width, height);
        group.bench_function(format!("{width}x{height}"), |b| {
            b.iter(|| blend_with_mask(black_box(&image), black_box(&mask)).unwrap());
        });
    }
    group.finish();
}

fn bench_combine(c: &mut Criterion) {
    let (width, height) = (1024, 768);
    let frame = Arc::new(source(width, height));
    let observations: Vec<Box<dyn InstanceObservation>> = (0..3)
        .map(|_| {
            Box::new(MaskedInstances::new(
                Arc::clone(&frame),
                vec![(1, ellipse_mask(width, height))],
            )) as Box<dyn InstanceObservation>
        })
        .collect();

    c.bench_function("combine_observations/3x1024x768", |b| {
        b.iter(|| combine_observations(black_box(&observations), (width, height)).unwrap());
    });
}

fn bench_scale_mask(c: &mut Criterion) {
    let half = ellipse_mask(512, 384);
    c.bench_function("scale_mask_to_extent/512x384->1024x768", |b| {
        b.iter(|| scale_mask_to_extent(black_box(half.clone()), (1024, 768)));
    });
}

criterion_group!(
    benches,
    bench_layer_over,
    bench_blend_with_mask,
    bench_combine,
    bench_scale_mask
);
criterion_main!(benches);
