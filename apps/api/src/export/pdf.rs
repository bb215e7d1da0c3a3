use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document as PdfFile, Object, ObjectId, Stream};
use thiserror::Error;

use super::pagination::{PAGE_HEIGHT_MM, PAGE_WIDTH_MM};
use super::raster::Raster;

const PT_PER_MM: f64 = 72.0 / 25.4;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF error: {0}")]
    Lopdf(#[from] lopdf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Millimetre,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFormat {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PageFormat {
    pub const A4: PageFormat = PageFormat {
        width_mm: PAGE_WIDTH_MM,
        height_mm: PAGE_HEIGHT_MM,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfSetup {
    pub orientation: Orientation,
    pub unit: Unit,
    pub format: PageFormat,
}

impl PdfSetup {
    pub fn a4_portrait() -> Self {
        PdfSetup {
            orientation: Orientation::Portrait,
            unit: Unit::Millimetre,
            format: PageFormat::A4,
        }
    }

    /// Page size in the document unit after applying orientation.
    pub fn page_size(&self) -> (f64, f64) {
        let PageFormat {
            width_mm,
            height_mm,
        } = self.format;
        match self.orientation {
            Orientation::Portrait => (width_mm, height_mm),
            Orientation::Landscape => (height_mm, width_mm),
        }
    }
}

/// A PDF under construction. Starts with one empty page.
pub trait PdfDocument: Send {
    /// Draws `raster` on the current page with its top-left corner at (`x`, `y`)
    /// and the given size, all in document units measured from the top-left.
    fn add_image(&mut self, raster: &Raster, x: f64, y: f64, width: f64, height: f64)
        -> Result<(), PdfError>;

    fn add_page(&mut self);

    fn page_count(&self) -> usize;

    fn finish(self: Box<Self>) -> Result<Vec<u8>, PdfError>;
}

pub trait PdfAssembler: Send + Sync {
    fn create(&self, setup: &PdfSetup) -> Box<dyn PdfDocument>;
}

/// Writes PDFs with `lopdf`. A raster placed several times is embedded once.
pub struct LopdfAssembler;

impl PdfAssembler for LopdfAssembler {
    fn create(&self, setup: &PdfSetup) -> Box<dyn PdfDocument> {
        Box::new(LopdfDocument::new(setup))
    }
}

#[derive(Default)]
struct PageContent {
    operations: Vec<Operation>,
    xobjects: Dictionary,
}

pub struct LopdfDocument {
    file: PdfFile,
    pages_id: ObjectId,
    width_pt: f64,
    height_pt: f64,
    finished: Vec<PageContent>,
    current: PageContent,
    images: Vec<(Raster, String, ObjectId)>,
}

impl LopdfDocument {
    pub fn new(setup: &PdfSetup) -> Self {
        let mut file = PdfFile::with_version("1.5");
        let pages_id = file.new_object_id();
        let (width, height) = setup.page_size();
        LopdfDocument {
            file,
            pages_id,
            width_pt: width * PT_PER_MM,
            height_pt: height * PT_PER_MM,
            finished: Vec::new(),
            current: PageContent::default(),
            images: Vec::new(),
        }
    }

    fn image_object(&mut self, raster: &Raster) -> Result<(String, ObjectId), PdfError> {
        if let Some((_, name, id)) = self.images.iter().find(|(r, _, _)| r.same_buffer(raster)) {
            return Ok((name.clone(), *id));
        }

        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(raster.width()),
                "Height" => i64::from(raster.height()),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            raster.pixels().as_raw().clone(),
        );
        stream.compress()?;

        let id = self.file.add_object(stream);
        let name = format!("Im{}", self.images.len());
        self.images.push((raster.clone(), name.clone(), id));
        Ok((name, id))
    }
}

impl PdfDocument for LopdfDocument {
    fn add_image(
        &mut self,
        raster: &Raster,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<(), PdfError> {
        let (name, id) = self.image_object(raster)?;

        let w = width * PT_PER_MM;
        let h = height * PT_PER_MM;
        let left = x * PT_PER_MM;
        // PDF space grows upwards from the bottom-left corner.
        let bottom = self.height_pt - (y + height) * PT_PER_MM;

        let page = &mut self.current;
        page.xobjects.set(name.clone(), Object::Reference(id));
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    (w as f32).into(),
                    0.into(),
                    0.into(),
                    (h as f32).into(),
                    (left as f32).into(),
                    (bottom as f32).into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn add_page(&mut self) {
        let done = std::mem::take(&mut self.current);
        self.finished.push(done);
    }

    fn page_count(&self) -> usize {
        self.finished.len() + 1
    }

    fn finish(mut self: Box<Self>) -> Result<Vec<u8>, PdfError> {
        let media_box: Vec<Object> = vec![
            0.into(),
            0.into(),
            (self.width_pt as f32).into(),
            (self.height_pt as f32).into(),
        ];

        let mut pages = std::mem::take(&mut self.finished);
        pages.push(std::mem::take(&mut self.current));

        let mut kids = Vec::with_capacity(pages.len());
        for page in pages {
            let content = Content {
                operations: page.operations,
            };
            let content_id = self
                .file
                .add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = self.file.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => self.pages_id,
                "MediaBox" => media_box.clone(),
                "Contents" => content_id,
                "Resources" => dictionary! { "XObject" => page.xobjects },
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        self.file.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.file.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.file.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        self.file.save_to(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_a4_portrait_size() {
        assert_eq!(PdfSetup::a4_portrait().page_size(), (210.0, 297.0));
        let landscape = PdfSetup {
            orientation: Orientation::Landscape,
            ..PdfSetup::a4_portrait()
        };
        assert_eq!(landscape.page_size(), (297.0, 210.0));
    }

    #[test]
    fn test_writes_one_page_per_add_page() {
        let raster = Raster::filled(20, 60, Rgb([10, 20, 30]));
        let mut doc = LopdfAssembler.create(&PdfSetup::a4_portrait());
        for i in 0..3 {
            if i > 0 {
                doc.add_page();
            }
            doc.add_image(&raster, 0.0, -(i as f64) * 297.0, 210.0, 630.0)
                .unwrap();
        }
        assert_eq!(doc.page_count(), 3);

        let bytes = doc.finish().unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        let parsed = PdfFile::load_mem(&bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 3);
    }

    #[test]
    fn test_shared_raster_embedded_once() {
        let raster = Raster::filled(4, 4, Rgb([0, 0, 0]));
        let mut doc = LopdfDocument::new(&PdfSetup::a4_portrait());
        doc.add_image(&raster, 0.0, 0.0, 210.0, 210.0).unwrap();
        doc.add_page();
        doc.add_image(&raster.clone(), 0.0, -297.0, 210.0, 210.0)
            .unwrap();
        assert_eq!(doc.images.len(), 1);
    }
}
