#![allow(dead_code)]

use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use pngoptim_assets::{ConversionOptions, Converter, EligibilityPolicy, RunOptions};
use pngoptim_image::{ImageCodec, Passthrough};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

/// Deterministic pseudo-random bytes.
struct Lcg(u32);

impl Lcg {
    fn next(&mut self) -> u8 {
        self.0 = self.0.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        (self.0 >> 16) as u8
    }
}

fn encode(img: DynamicImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageOutputFormat::Png).unwrap();
    out.into_inner()
}

/// Large opaque photo-like PNG: smooth gradients with grain, which PNG
/// compresses poorly and JPEG well.
pub fn opaque_png(size: u32, seed: u32) -> Vec<u8> {
    let mut rng = Lcg(seed);
    let img = RgbImage::from_fn(size, size, |x, y| {
        let grain = rng.next() % 24;
        Rgb([
            (x as u8).wrapping_mul(2).wrapping_add(grain),
            (y as u8).wrapping_mul(2).wrapping_add(grain),
            ((x + y) as u8).wrapping_add(grain),
        ])
    });
    encode(DynamicImage::ImageRgb8(img))
}

/// PNG whose pixels really use transparency.
pub fn translucent_png(size: u32) -> Vec<u8> {
    let mut rng = Lcg(7);
    let img = RgbaImage::from_fn(size, size, |x, _| {
        Rgba([rng.next(), rng.next(), rng.next(), (x * 4) as u8])
    });
    encode(DynamicImage::ImageRgba8(img))
}

/// A few-dozen-byte opaque PNG.
pub fn tiny_png() -> Vec<u8> {
    encode(DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([200, 100, 50]))))
}

pub fn write(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, bytes).unwrap();
}

pub fn converter() -> Converter {
    Converter::new(
        Arc::new(ImageCodec),
        Arc::new(Passthrough),
        ConversionOptions {
            quality: 75,
            max_output_ratio: 1.0,
            jobs: 2,
        },
    )
}

pub fn run_options(min_size_bytes: u64) -> RunOptions {
    RunOptions {
        dry_run: false,
        inspect_alpha_pixels: true,
        policy: EligibilityPolicy {
            min_size_bytes,
            skip_color_profiles: true,
        },
    }
}

/// Names of leftover temporary files under `dir`.
pub fn temp_files(dir: &Path) -> Vec<String> {
    walk(dir)
        .into_iter()
        .filter(|name| name.ends_with(".tmp"))
        .collect()
}

fn walk(dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        if entry.file_type().unwrap().is_dir() {
            names.extend(walk(&entry.path()));
        } else {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names
}

/// The three-image project used by several tests.
pub fn abc_project(root: &Path) {
    write(&root.join("a.png"), &opaque_png(128, 1));
    write(&root.join("b.png"), &translucent_png(50));
    write(&root.join("c.png"), &tiny_png());
    write(&root.join("assets.manifest"), b"a.png\nb.png\nc.png\n");
}
