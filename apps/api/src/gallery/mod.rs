//! Certificate gallery: an ordered list of image attachments shown three at a
//! time. Uploads from the file picker and from drag-and-drop share `add_batch`.

pub mod handlers;

use serde::Serialize;
use tracing::{debug, info};

use crate::models::{Certificate, CertificateId, ImageKind, Upload, ValidationError};

pub const CERTIFICATES_PER_PAGE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GalleryState {
    Empty,
    HasItems,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub visible: bool,
    pub previous_enabled: bool,
    pub next_enabled: bool,
}

/// What the gallery currently displays.
#[derive(Debug, Serialize)]
pub struct GalleryView<'a> {
    pub state: GalleryState,
    pub items: &'a [Certificate],
    pub navigation: Navigation,
    pub current_page: usize,
    pub page_count: usize,
    pub counter: Option<String>,
}

/// Result of uploading several files at once. Each file is judged on its own.
#[derive(Debug, Default, Serialize)]
pub struct BatchOutcome {
    pub added: Vec<CertificateId>,
    #[serde(serialize_with = "serialize_errors")]
    pub rejected: Vec<ValidationError>,
}

fn serialize_errors<S: serde::Serializer>(
    errors: &[ValidationError],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(|e| e.to_string()))
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Gallery {
    certificates: Vec<Certificate>,
    current_page: usize,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn state(&self) -> GalleryState {
        if self.is_empty() {
            GalleryState::Empty
        } else {
            GalleryState::HasItems
        }
    }

    pub fn page_count(&self) -> usize {
        self.certificates.len().div_ceil(CERTIFICATES_PER_PAGE)
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn find(&self, id: &CertificateId) -> Option<&Certificate> {
        self.certificates.iter().find(|c| &c.id == id)
    }

    /// Validates and appends one certificate.
    pub fn add(&mut self, upload: &Upload) -> Result<CertificateId, ValidationError> {
        upload.validate(ImageKind::Certificate)?;
        let certificate = Certificate::new(upload.to_data_url(), upload.file_name.clone());
        let id = certificate.id.clone();
        info!("Added certificate '{}' ({id})", upload.file_name);
        self.certificates.push(certificate);
        Ok(id)
    }

    pub fn add_batch(&mut self, uploads: &[Upload]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for upload in uploads {
            match self.add(upload) {
                Ok(id) => outcome.added.push(id),
                Err(e) => {
                    debug!("Rejected upload: {e}");
                    outcome.rejected.push(e);
                }
            }
        }
        outcome
    }

    /// Removes every certificate carrying `id` and keeps the page index valid.
    /// Returns how many were removed.
    pub fn remove(&mut self, id: &CertificateId) -> usize {
        let before = self.certificates.len();
        self.certificates.retain(|c| &c.id != id);
        self.clamp_page();
        before - self.certificates.len()
    }

    /// Replaces the whole list, e.g. when rehydrating from storage.
    pub fn replace_all(&mut self, certificates: Vec<Certificate>) {
        self.certificates = certificates;
        self.clamp_page();
    }

    pub fn clear(&mut self) {
        self.certificates.clear();
        self.current_page = 0;
    }

    pub fn next_page(&mut self) -> bool {
        if self.current_page + 1 < self.page_count() {
            self.current_page += 1;
            true
        } else {
            false
        }
    }

    pub fn previous_page(&mut self) -> bool {
        if self.current_page > 0 {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }

    pub fn view(&self) -> GalleryView<'_> {
        let page_count = self.page_count();
        let start = (self.current_page * CERTIFICATES_PER_PAGE).min(self.certificates.len());
        let end = (start + CERTIFICATES_PER_PAGE).min(self.certificates.len());

        let navigation = if page_count <= 1 {
            Navigation {
                visible: false,
                previous_enabled: false,
                next_enabled: false,
            }
        } else {
            Navigation {
                visible: true,
                previous_enabled: self.current_page > 0,
                next_enabled: self.current_page < page_count - 1,
            }
        };

        let counter = (!self.is_empty()).then(|| {
            format!(
                "{} of {} ({} certificates)",
                self.current_page + 1,
                page_count,
                self.certificates.len()
            )
        });

        GalleryView {
            state: self.state(),
            items: &self.certificates[start..end],
            navigation,
            current_page: self.current_page,
            page_count,
            counter,
        }
    }

    fn clamp_page(&mut self) {
        let max_page = self.page_count().saturating_sub(1);
        if self.current_page > max_page {
            self.current_page = max_page;
        }
    }
}
