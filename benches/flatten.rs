use criterion::{criterion_group, criterion_main, Criterion};
use ideation_canvas::canvas::composite::encode_png;
use ideation_canvas::canvas::crop::recover_crop;
use ideation_canvas::canvas::ingest::SourceFile;
use ideation_canvas::canvas::model::{FrameGeometry, Point};
use ideation_canvas::canvas::{BackendError, GenerationBackend, IdeationSession, SessionConfig};
use ideation_canvas::canvas::generate::{GeneratedImage, GenerationRequest};
use image::{Rgba, RgbaImage};
use std::sync::Arc;

struct Unused;

impl GenerationBackend for Unused {
    fn generate(&self, _request: &GenerationRequest) -> Result<GeneratedImage, BackendError> {
        Err(BackendError::Transport("bench".into()))
    }
}

fn photo(w: u32, h: u32) -> SourceFile {
    let img = RgbaImage::from_fn(w, h, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255]));
    SourceFile::new("photo.png", "image/png", encode_png(&img).unwrap())
}

fn bench_flatten(c: &mut Criterion) {
    let mut session = IdeationSession::new(SessionConfig::default(), Arc::new(Unused));
    session.import_photo(photo(1024, 768)).unwrap();
    session.add_references((0..6).map(|_| photo(256, 256)).collect());
    session.set_device_pixel_ratio(2.0);
    session.pointer_down(1, Point::new(300.0, 300.0));
    for i in 0..200 {
        session.pointer_move(1, Point::new(300.0 + i as f32 * 3.0, 300.0 + (i % 40) as f32 * 5.0));
    }
    session.pointer_up(1, Point::new(900.0, 500.0));

    c.bench_function("flatten_1024x768_dpr2", |b| b.iter(|| session.flatten()));
}

fn bench_recover_crop(c: &mut Criterion) {
    let frame = FrameGeometry::new(1024, 768, 160);
    let exact = RgbaImage::from_pixel(frame.width(), frame.height(), Rgba([10, 20, 30, 255]));
    let scaled = RgbaImage::from_pixel(1024, 1024, Rgba([10, 20, 30, 255]));

    c.bench_function("recover_crop_exact", |b| b.iter(|| recover_crop(&exact, frame)));
    c.bench_function("recover_crop_rescaled", |b| b.iter(|| recover_crop(&scaled, frame)));
}

criterion_group!(benches, bench_flatten, bench_recover_crop);
criterion_main!(benches);
