use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::editor::fields::{EducationField, EntryId, ExperienceField, FieldKey};
use crate::gallery::Gallery;
use crate::modal::Modal;
use crate::models::{Document, EducationEntry, ExperienceEntry, ImageKind, Upload, ValidationError};
use crate::view::RegionState;

pub type SharedPage = Arc<Mutex<Page>>;

/// Locks the page, recovering the guard if a previous holder panicked.
pub fn lock_page(page: &SharedPage) -> MutexGuard<'_, Page> {
    page.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Error, PartialEq)]
pub enum PageError {
    #[error("Entry {0} not found")]
    UnknownEntry(EntryId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperienceItem {
    pub id: EntryId,
    #[serde(flatten)]
    pub entry: ExperienceEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EducationItem {
    pub id: EntryId,
    #[serde(flatten)]
    pub entry: EducationEntry,
}

/// The live editing state. A `Document` is only materialized from it on
/// save, load and export.
#[derive(Debug, Clone, Default)]
pub struct Page {
    fields: BTreeMap<FieldKey, String>,
    profile_photo: Option<String>,
    experience: Vec<ExperienceItem>,
    education: Vec<EducationItem>,
    pub gallery: Gallery,
    pub modal: Modal,
    pub region: RegionState,
    /// Set while an export is running; drives the export button label.
    pub export_busy: bool,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedPage {
        Arc::new(Mutex::new(self))
    }

    // ── Scalar fields ───────────────────────────────────────────────────────

    pub fn field(&self, key: FieldKey) -> &str {
        self.fields.get(&key).map(String::as_str).unwrap_or("")
    }

    pub fn set_field(&mut self, key: FieldKey, text: impl Into<String>) {
        self.fields.insert(key, text.into());
    }

    // ── Profile photo ───────────────────────────────────────────────────────

    pub fn profile_photo(&self) -> Option<&str> {
        self.profile_photo.as_deref()
    }

    pub fn set_profile_photo(&mut self, upload: &Upload) -> Result<(), ValidationError> {
        upload.validate(ImageKind::ProfilePhoto)?;
        self.profile_photo = Some(upload.to_data_url());
        Ok(())
    }

    /// Returns whether there was a photo to delete.
    pub fn delete_profile_photo(&mut self) -> bool {
        self.profile_photo.take().is_some()
    }

    // ── Experience ──────────────────────────────────────────────────────────

    pub fn experience(&self) -> &[ExperienceItem] {
        &self.experience
    }

    pub fn add_experience(&mut self) -> EntryId {
        let id = EntryId::new();
        self.experience.push(ExperienceItem {
            id,
            entry: ExperienceEntry::template(),
        });
        id
    }

    pub fn update_experience(
        &mut self,
        id: EntryId,
        field: ExperienceField,
        text: impl Into<String>,
    ) -> Result<(), PageError> {
        let item = self
            .experience
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(PageError::UnknownEntry(id))?;
        let text = text.into();
        match field {
            ExperienceField::JobTitle => item.entry.job_title = text,
            ExperienceField::JobPeriod => item.entry.job_period = text,
            ExperienceField::CompanyName => item.entry.company_name = text,
            ExperienceField::JobDescription => item.entry.job_description_markup = text,
        }
        Ok(())
    }

    pub fn remove_experience(&mut self, id: EntryId) -> Result<(), PageError> {
        let before = self.experience.len();
        self.experience.retain(|i| i.id != id);
        if self.experience.len() == before {
            return Err(PageError::UnknownEntry(id));
        }
        Ok(())
    }

    // ── Education ───────────────────────────────────────────────────────────

    pub fn education(&self) -> &[EducationItem] {
        &self.education
    }

    pub fn add_education(&mut self) -> EntryId {
        let id = EntryId::new();
        self.education.push(EducationItem {
            id,
            entry: EducationEntry::default(),
        });
        id
    }

    pub fn update_education(
        &mut self,
        id: EntryId,
        field: EducationField,
        text: impl Into<String>,
    ) -> Result<(), PageError> {
        let item = self
            .education
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(PageError::UnknownEntry(id))?;
        let text = text.into();
        match field {
            EducationField::DegreeTitle => item.entry.degree_title = text,
            EducationField::EducationPeriod => item.entry.education_period = text,
            EducationField::InstitutionName => item.entry.institution_name = text,
        }
        Ok(())
    }

    pub fn remove_education(&mut self, id: EntryId) -> Result<(), PageError> {
        let before = self.education.len();
        self.education.retain(|i| i.id != id);
        if self.education.len() == before {
            return Err(PageError::UnknownEntry(id));
        }
        Ok(())
    }

    // ── Document snapshot ───────────────────────────────────────────────────

    /// Captures the current page as a document. Entries without any
    /// identifying text are left out.
    pub fn extract_current(&self) -> Document {
        let text = |key| self.field(key).trim().to_string();

        Document {
            full_name: text(FieldKey::FullName),
            profession: text(FieldKey::Profession),
            email: text(FieldKey::Email),
            phone: text(FieldKey::Phone),
            location: text(FieldKey::Location),
            website: text(FieldKey::Website),
            summary: text(FieldKey::Summary),
            skills: text(FieldKey::Skills),
            profile_photo: self.profile_photo.clone(),
            experience: self
                .experience
                .iter()
                .map(|i| ExperienceEntry {
                    job_title: i.entry.job_title.trim().to_string(),
                    job_period: i.entry.job_period.trim().to_string(),
                    company_name: i.entry.company_name.trim().to_string(),
                    job_description_markup: i.entry.job_description_markup.clone(),
                })
                .filter(ExperienceEntry::is_identified)
                .collect(),
            education: self
                .education
                .iter()
                .map(|i| EducationEntry {
                    degree_title: i.entry.degree_title.trim().to_string(),
                    education_period: i.entry.education_period.trim().to_string(),
                    institution_name: i.entry.institution_name.trim().to_string(),
                })
                .filter(EducationEntry::is_identified)
                .collect(),
            certificates: self.gallery.certificates().to_vec(),
            last_updated: Utc::now(),
        }
    }

    /// Writes a document back into the page.
    ///
    /// Empty scalar values leave the current field alone. Experience and
    /// education are rebuilt with fresh ids when the document has entries of
    /// that kind; the gallery is replaced when it has certificates.
    pub fn apply(&mut self, document: &Document) {
        let scalars = [
            (FieldKey::FullName, &document.full_name),
            (FieldKey::Profession, &document.profession),
            (FieldKey::Email, &document.email),
            (FieldKey::Phone, &document.phone),
            (FieldKey::Location, &document.location),
            (FieldKey::Website, &document.website),
            (FieldKey::Summary, &document.summary),
            (FieldKey::Skills, &document.skills),
        ];
        for (key, value) in scalars {
            if !value.is_empty() {
                self.set_field(key, value.clone());
            }
        }

        if let Some(photo) = document.profile_photo.as_deref().filter(|p| !p.is_empty()) {
            self.profile_photo = Some(photo.to_string());
        }

        if !document.experience.is_empty() {
            self.experience = document
                .experience
                .iter()
                .map(|entry| ExperienceItem {
                    id: EntryId::new(),
                    entry: entry.clone(),
                })
                .collect();
        }

        if !document.education.is_empty() {
            self.education = document
                .education
                .iter()
                .map(|entry| EducationItem {
                    id: EntryId::new(),
                    entry: entry.clone(),
                })
                .collect();
        }

        if !document.certificates.is_empty() {
            self.gallery.replace_all(document.certificates.clone());
        }

        debug!(
            "Applied document: {} experience, {} education, {} certificates",
            self.experience.len(),
            self.education.len(),
            self.gallery.len()
        );
    }
}
