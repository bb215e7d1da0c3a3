//! Page layout for a single tall raster on A4 portrait pages.
//!
//! The raster is scaled to the page width. When it is taller than one page the
//! same image is placed on every page, shifted up by one page height each
//! time; the page boundary crops each slice.

use serde::Serialize;

use super::ExportError;

pub const PAGE_WIDTH_MM: f64 = 210.0;
pub const PAGE_HEIGHT_MM: f64 = 297.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub page_index: usize,
    /// Vertical offset in raster pixels: `-(page_index * 297) * raster_width / 210`.
    pub y_offset_px: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagePlan {
    pub image_width_mm: f64,
    pub image_height_mm: f64,
    /// Raster pixels per millimetre at page width.
    pub px_per_mm: f64,
    pub placements: Vec<Placement>,
}

impl PagePlan {
    pub fn page_count(&self) -> usize {
        self.placements.len()
    }

    /// Offset of a placement in page units (millimetres).
    pub fn y_offset_mm(&self, placement: &Placement) -> f64 {
        placement.y_offset_px / self.px_per_mm
    }
}

pub fn plan_pages(raster_width: u32, raster_height: u32) -> Result<PagePlan, ExportError> {
    if raster_width == 0 || raster_height == 0 {
        return Err(ExportError::Capture(format!(
            "rasterizer returned an empty image ({raster_width}x{raster_height})"
        )));
    }

    let width = f64::from(raster_width);
    let image_height_mm = f64::from(raster_height) * PAGE_WIDTH_MM / width;

    let pages = if image_height_mm > PAGE_HEIGHT_MM {
        (image_height_mm / PAGE_HEIGHT_MM).ceil() as usize
    } else {
        1
    };

    let placements = (0..pages)
        .map(|i| Placement {
            page_index: i,
            y_offset_px: -(i as f64 * PAGE_HEIGHT_MM) * width / PAGE_WIDTH_MM,
        })
        .collect();

    Ok(PagePlan {
        image_width_mm: PAGE_WIDTH_MM,
        image_height_mm,
        px_per_mm: width / PAGE_WIDTH_MM,
        placements,
    })
}
