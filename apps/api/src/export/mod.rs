pub mod capture;
pub mod filename;
pub mod handlers;
pub mod pagination;
pub mod pdf;
pub mod raster;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::editor::{lock_page, FieldKey, SharedPage};
use crate::view::{render_region, RESUME_REGION_ID};

use self::capture::{BusyGuard, CaptureGuard};
use self::filename::export_file_name;
use self::pagination::{plan_pages, PagePlan, PAGE_WIDTH_MM};
use self::pdf::{PdfAssembler, PdfError, PdfSetup};
use self::raster::{CaptureRegion, Raster, RasterError, RasterOptions, Rasterizer};

pub use self::pdf::LopdfAssembler;
pub use self::raster::CommandRasterizer;

/// Which rendering collaborator is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    Rasterizer,
    PdfAssembler,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{}", missing_message(.0))]
    DependencyMissing(Dependency),

    #[error("An export is already in progress")]
    InProgress,

    #[error("Region '{0}' not found")]
    RegionNotFound(String),

    #[error("Failed to generate PDF: {0}")]
    Capture(String),

    #[error("Failed to generate PDF: {0}")]
    Assembly(#[from] PdfError),
}

fn missing_message(dependency: &Dependency) -> &'static str {
    match dependency {
        Dependency::Rasterizer => {
            "Error: the page rasterizer is not available. Check that it is configured."
        }
        Dependency::PdfAssembler => {
            "Error: the PDF writer is not available. Check that it is configured."
        }
    }
}

impl From<RasterError> for ExportError {
    fn from(err: RasterError) -> Self {
        ExportError::Capture(err.to_string())
    }
}

/// A finished PDF ready to download.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub bytes: Bytes,
    pub page_count: usize,
}

#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Wait between preparing the region and capturing it.
    pub settle_delay: Duration,
    /// CSS pixel width handed to the rasterizer.
    pub region_width_px: Option<u32>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        ExportSettings {
            settle_delay: Duration::from_millis(500),
            region_width_px: Some(794),
        }
    }
}

/// Turns the resume region into a paginated A4 PDF.
pub struct Exporter {
    rasterizer: Option<Arc<dyn Rasterizer>>,
    assembler: Option<Arc<dyn PdfAssembler>>,
    settings: ExportSettings,
    in_flight: AtomicBool,
}

/// Releases the in-flight flag on every path out of `export`.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Exporter {
    pub fn new(
        rasterizer: Option<Arc<dyn Rasterizer>>,
        assembler: Option<Arc<dyn PdfAssembler>>,
        settings: ExportSettings,
    ) -> Self {
        Exporter {
            rasterizer,
            assembler,
            settings,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn export(
        &self,
        page: &SharedPage,
        region_id: &str,
    ) -> Result<ExportArtifact, ExportError> {
        let rasterizer = self
            .rasterizer
            .clone()
            .ok_or(ExportError::DependencyMissing(Dependency::Rasterizer))?;
        let assembler = self
            .assembler
            .clone()
            .ok_or(ExportError::DependencyMissing(Dependency::PdfAssembler))?;

        if region_id != RESUME_REGION_ID {
            return Err(ExportError::RegionNotFound(region_id.to_string()));
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Export requested while another is running; ignoring");
            return Err(ExportError::InProgress);
        }
        let _in_flight = InFlight(&self.in_flight);
        let _busy = BusyGuard::new(page);

        let result = self.run(page, region_id, rasterizer, assembler).await;
        match &result {
            Ok(artifact) => info!(
                "Exported {} ({} pages, {} bytes)",
                artifact.file_name,
                artifact.page_count,
                artifact.bytes.len()
            ),
            Err(e) => error!("PDF export failed: {}", e),
        }
        result
    }

    async fn run(
        &self,
        page: &SharedPage,
        region_id: &str,
        rasterizer: Arc<dyn Rasterizer>,
        assembler: Arc<dyn PdfAssembler>,
    ) -> Result<ExportArtifact, ExportError> {
        let raster = {
            let capture = CaptureGuard::begin(page);
            tokio::time::sleep(self.settings.settle_delay).await;

            let region = CaptureRegion {
                id: region_id.to_string(),
                html: render_region(&lock_page(page)),
            };
            let options = RasterOptions::for_export(self.settings.region_width_px);
            let raster = rasterizer.rasterize(&region, &options).await?;
            capture.restore();
            raster
        };

        let plan = plan_pages(raster.width(), raster.height())?;
        let (bytes, page_count) =
            tokio::task::spawn_blocking(move || assemble(assembler.as_ref(), &raster, &plan))
                .await
                .map_err(PdfError::from)??;

        let full_name = lock_page(page).field(FieldKey::FullName).to_string();
        Ok(ExportArtifact {
            file_name: export_file_name(&full_name, Utc::now().date_naive()),
            bytes: Bytes::from(bytes),
            page_count,
        })
    }
}

/// Places the raster once per planned page. Compression and serialization
/// are CPU-bound; callers run this on the blocking pool.
fn assemble(
    assembler: &dyn PdfAssembler,
    raster: &Raster,
    plan: &PagePlan,
) -> Result<(Vec<u8>, usize), PdfError> {
    let mut doc = assembler.create(&PdfSetup::a4_portrait());
    for placement in &plan.placements {
        if placement.page_index > 0 {
            doc.add_page();
        }
        doc.add_image(
            raster,
            0.0,
            plan.y_offset_mm(placement),
            PAGE_WIDTH_MM,
            plan.image_height_mm,
        )?;
    }
    let page_count = doc.page_count();
    Ok((doc.finish()?, page_count))
}
