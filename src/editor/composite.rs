//! Flattening a picture and its props into a single image
//!
//! The [`CompositeRenderer`] seam lets the workflow treat composition as a
//! best-effort step. [`ImageCompositor`] is the `image`-crate implementation:
//! props are loaded, scaled, rotated about their centre and alpha-blended onto
//! a copy of the base picture in insertion order, then written out as JPEG.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use log::{debug, info};

use super::props::{Placement, PropOverlay};
use crate::capture::{Picture, PictureMetadata};
use crate::error::CompositeError;

#[async_trait]
pub trait CompositeRenderer: Send + Sync {
    /// Produce a new picture with `props` drawn over `base`.
    ///
    /// `base` is never modified.
    async fn compose(
        &self,
        base: &Picture,
        props: &[PropOverlay],
    ) -> Result<Picture, CompositeError>;
}

/// A scaled prop may span at most this many canvas widths or heights
pub const MAX_CANVAS_SPAN: u32 = 4;

static COMPOSITE_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Debug)]
pub struct ImageCompositor {
    output_dir: PathBuf,
    quality: u8,
}

impl ImageCompositor {
    pub fn new(output_dir: impl Into<PathBuf>, quality: u8) -> Self {
        Self {
            output_dir: output_dir.into(),
            quality: quality.clamp(1, 100),
        }
    }

    fn next_output_path(&self) -> PathBuf {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let sequence = COMPOSITE_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.output_dir.join(format!("composite_{}_{}.jpg", timestamp, sequence))
    }
}

#[async_trait]
impl CompositeRenderer for ImageCompositor {
    async fn compose(
        &self,
        base: &Picture,
        props: &[PropOverlay],
    ) -> Result<Picture, CompositeError> {
        let base_path = base.path.clone();
        let props = props.to_vec();
        let output = self.next_output_path();
        let output_dir = self.output_dir.clone();
        let quality = self.quality;

        debug!(
            "Composing {} props onto {:?} into {:?}",
            props.len(),
            base_path,
            output
        );

        let metadata = tokio::task::spawn_blocking(move || {
            let canvas = flatten(&base_path, &props)?;
            std::fs::create_dir_all(&output_dir)?;
            write_jpeg(&canvas, &output, quality)?;
            Ok::<_, CompositeError>((output, canvas.width(), canvas.height()))
        })
        .await??;

        let (path, width, height) = metadata;
        info!("Wrote {}x{} composite to {:?}", width, height, path);

        Ok(Picture::new(path).with_metadata(PictureMetadata {
            format: Some("jpg".to_string()),
            width,
            height,
        }))
    }
}

fn load_rgba(path: &Path) -> Result<RgbaImage, CompositeError> {
    image::open(path)
        .map(|image| image.to_rgba8())
        .map_err(|source| CompositeError::Load {
            path: path.to_path_buf(),
            source,
        })
}

/// Draw every prop onto a copy of the base image, first prop at the bottom
pub fn flatten(base: &Path, props: &[PropOverlay]) -> Result<RgbaImage, CompositeError> {
    let mut canvas = load_rgba(base)?;
    for prop in props {
        let image = load_rgba(prop.source())?;
        draw_prop(&mut canvas, &image, &prop.placement)?;
    }
    Ok(canvas)
}

/// Blend one prop onto the canvas; parts falling outside it are clipped
pub fn draw_prop(
    canvas: &mut RgbaImage,
    prop: &RgbaImage,
    placement: &Placement,
) -> Result<(), CompositeError> {
    let scaled = scale_prop(prop, placement.scale, canvas.dimensions())?;
    let (scaled_w, scaled_h) = scaled.dimensions();

    if placement.rotation == 0.0 {
        imageops::overlay(canvas, &scaled, placement.x, placement.y);
        return Ok(());
    }

    let rotated = rotate_about_center(&scaled, placement.rotation);
    // Keep the centre fixed while the bounding box grows
    let dx = (i64::from(rotated.width()) - i64::from(scaled_w)) / 2;
    let dy = (i64::from(rotated.height()) - i64::from(scaled_h)) / 2;
    imageops::overlay(
        canvas,
        &rotated,
        placement.x.saturating_sub(dx),
        placement.y.saturating_sub(dy),
    );
    Ok(())
}

fn scale_prop(
    prop: &RgbaImage,
    scale: f64,
    (canvas_w, canvas_h): (u32, u32),
) -> Result<RgbaImage, CompositeError> {
    let width = (f64::from(prop.width()) * scale).round().max(1.0);
    let height = (f64::from(prop.height()) * scale).round().max(1.0);
    let max_w = u64::from(canvas_w.max(1)) * u64::from(MAX_CANVAS_SPAN);
    let max_h = u64::from(canvas_h.max(1)) * u64::from(MAX_CANVAS_SPAN);
    if width > max_w as f64 || height > max_h as f64 {
        return Err(CompositeError::PropTooLarge {
            width: width as u64,
            height: height as u64,
        });
    }

    if scale == 1.0 {
        return Ok(prop.clone());
    }
    Ok(imageops::resize(
        prop,
        width as u32,
        height as u32,
        FilterType::Triangle,
    ))
}

/// Rotate clockwise by `degrees` into a canvas large enough to hold the result
pub fn rotate_about_center(image: &RgbaImage, degrees: f64) -> RgbaImage {
    let quarter_turns = degrees / 90.0;
    if quarter_turns.fract() == 0.0 {
        return match (quarter_turns as i64).rem_euclid(4) {
            1 => imageops::rotate90(image),
            2 => imageops::rotate180(image),
            3 => imageops::rotate270(image),
            _ => image.clone(),
        };
    }

    let (width, height) = (f64::from(image.width()), f64::from(image.height()));
    let (sin, cos) = degrees.to_radians().sin_cos();
    let out_w = (width * cos.abs() + height * sin.abs()).ceil().max(1.0) as u32;
    let out_h = (width * sin.abs() + height * cos.abs()).ceil().max(1.0) as u32;

    let (src_cx, src_cy) = (width / 2.0, height / 2.0);
    let (dst_cx, dst_cy) = (f64::from(out_w) / 2.0, f64::from(out_h) / 2.0);

    let mut out = RgbaImage::from_pixel(out_w, out_h, Rgba([0, 0, 0, 0]));
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let rx = f64::from(x) + 0.5 - dst_cx;
        let ry = f64::from(y) + 0.5 - dst_cy;
        // Inverse rotation maps the output pixel back into the source
        let sx = rx * cos + ry * sin + src_cx;
        let sy = -rx * sin + ry * cos + src_cy;
        if sx >= 0.0 && sy >= 0.0 && sx < width && sy < height {
            *pixel = *image.get_pixel(sx as u32, sy as u32);
        }
    }
    out
}

fn write_jpeg(canvas: &RgbaImage, path: &Path, quality: u8) -> Result<(), CompositeError> {
    // JPEG has no alpha channel; props are already blended in
    let rgb = DynamicImage::ImageRgba8(canvas.clone()).to_rgb8();
    let writer = BufWriter::new(File::create(path)?);
    let mut encoder = JpegEncoder::new_with_quality(writer, quality);
    encoder.encode_image(&rgb)?;
    Ok(())
}
