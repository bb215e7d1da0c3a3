use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("rasterizer command failed: {0}")]
    Command(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not decode raster: {0}")]
    Decode(#[from] image::ImageError),

    #[error("decode task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A page region ready to be captured.
#[derive(Debug, Clone)]
pub struct CaptureRegion {
    pub id: String,
    pub html: String,
}

/// Fixed capture options.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterOptions {
    /// Pixel density multiplier.
    pub scale: f32,
    pub use_cors: bool,
    pub allow_taint: bool,
    pub background: Rgb<u8>,
    /// Explicit CSS pixel width of the region; `None` lets the renderer decide.
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl RasterOptions {
    pub fn for_export(width: Option<u32>) -> Self {
        RasterOptions {
            scale: 2.0,
            use_cors: true,
            allow_taint: true,
            background: Rgb([255, 255, 255]),
            width,
            height: None,
        }
    }
}

/// A captured image, opaque RGB. Cloning shares the pixel buffer.
#[derive(Debug, Clone)]
pub struct Raster {
    pixels: Arc<RgbImage>,
}

impl Raster {
    pub fn new(pixels: RgbImage) -> Self {
        Raster {
            pixels: Arc::new(pixels),
        }
    }

    /// Solid-colour raster, mostly useful as a stand-in capture.
    pub fn filled(width: u32, height: u32, colour: Rgb<u8>) -> Self {
        Self::new(RgbImage::from_pixel(width, height, colour))
    }

    /// Decodes an encoded image and composites any transparency onto `background`.
    pub fn decode(bytes: &[u8], background: Rgb<u8>) -> Result<Self, RasterError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let mut rgb = RgbImage::new(rgba.width(), rgba.height());
        for (x, y, px) in rgba.enumerate_pixels() {
            let alpha = u16::from(px[3]);
            let blend = |c: u8, bg: u8| -> u8 {
                ((u16::from(c) * alpha + u16::from(bg) * (255 - alpha) + 127) / 255) as u8
            };
            rgb.put_pixel(
                x,
                y,
                Rgb([
                    blend(px[0], background[0]),
                    blend(px[1], background[1]),
                    blend(px[2], background[2]),
                ]),
            );
        }
        Ok(Self::new(rgb))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// True when both values share the same pixel buffer.
    pub fn same_buffer(&self, other: &Raster) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

/// Turns a rendered region into pixels.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(
        &self,
        region: &CaptureRegion,
        options: &RasterOptions,
    ) -> Result<Raster, RasterError>;
}

/// Runs an external HTML-to-PNG tool on a temporary copy of the region.
///
/// Arguments may reference `{input}`, `{output}`, `{scale}` and `{width}`.
pub struct CommandRasterizer {
    program: PathBuf,
    args: Vec<String>,
}

pub const DEFAULT_RASTERIZER_ARGS: &str =
    "--quiet --format png --zoom {scale} --width {width} {input} {output}";

impl CommandRasterizer {
    pub fn new(program: impl Into<PathBuf>, args: &str) -> Self {
        CommandRasterizer {
            program: program.into(),
            args: args.split_whitespace().map(str::to_string).collect(),
        }
    }

    fn expand_args(&self, input: &str, output: &str, options: &RasterOptions) -> Vec<String> {
        let width = options.width.map(|w| w.to_string()).unwrap_or_default();
        let scale = options.scale.to_string();
        self.args
            .iter()
            .map(|a| {
                a.replace("{input}", input)
                    .replace("{output}", output)
                    .replace("{scale}", &scale)
                    .replace("{width}", &width)
            })
            .collect()
    }
}

#[async_trait]
impl Rasterizer for CommandRasterizer {
    async fn rasterize(
        &self,
        region: &CaptureRegion,
        options: &RasterOptions,
    ) -> Result<Raster, RasterError> {
        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join(format!("{}.html", region.id));
        let output = workdir.path().join(format!("{}.png", region.id));

        let document = format!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head>\
             <body style=\"margin: 0; background: #ffffff;\">{}</body></html>",
            region.html
        );
        tokio::fs::write(&input, document).await?;

        let args = self.expand_args(
            &input.to_string_lossy(),
            &output.to_string_lossy(),
            options,
        );
        debug!("Running rasterizer {} {:?}", self.program.display(), args);

        let result = tokio::process::Command::new(&self.program)
            .args(&args)
            .output()
            .await?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(RasterError::Command(format!(
                "{} exited with {}: {}",
                self.program.display(),
                result.status,
                stderr.trim()
            )));
        }

        let bytes = tokio::fs::read(&output).await?;
        let background = options.background;
        let raster =
            tokio::task::spawn_blocking(move || Raster::decode(&bytes, background)).await??;
        info!(
            "Rasterized region '{}' to {}x{}",
            region.id,
            raster.width(),
            raster.height()
        );
        Ok(raster)
    }
}
