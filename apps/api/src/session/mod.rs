//! The application controller. Owns the page, the store and the exporter,
//! turns user interactions into page mutations and keeps the saved copy
//! current through debounced, periodic and final saves.

pub mod handlers;
pub mod notices;
pub mod shortcuts;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::editor::{
    lock_page, EducationField, EntryId, ExperienceField, FieldKey, Page, PageError, SharedPage,
};
use crate::export::{ExportArtifact, ExportError, Exporter};
use crate::gallery::BatchOutcome;
use crate::modal::ModalInput;
use crate::models::{CertificateId, Document, Upload, ValidationError};
use crate::store::PersistenceStore;
use crate::view::RESUME_REGION_ID;

use self::notices::{Notice, Notices};
use self::shortcuts::{KeyPress, Shortcut};

pub const SAVE_FAILED_MESSAGE: &str = "Error saving data. Local storage may be full.";
pub const SAVED_MESSAGE: &str = "Data saved";

/// A destructive action was requested without confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct NotConfirmed(pub &'static str);

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub periodic_save: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            periodic_save: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub experience_items: usize,
    pub education_items: usize,
    pub certificates: usize,
    pub has_profile_photo: bool,
    pub last_updated: DateTime<Utc>,
}

/// What a key press did.
#[derive(Debug)]
pub enum KeyOutcome {
    Saved(bool),
    Exported(Result<ExportArtifact, ExportError>),
    ModalClosed(bool),
    Ignored,
}

/// Extracts the page and writes it, reporting failures as notices.
#[derive(Clone)]
struct Saver {
    page: SharedPage,
    store: Arc<PersistenceStore>,
    notices: Notices,
    /// Set by a clear, unset by the next edit or explicit save.
    cleared: Arc<AtomicBool>,
}

impl Saver {
    async fn save(&self) -> bool {
        self.cleared.store(false, Ordering::SeqCst);
        let document = lock_page(&self.page).extract_current();
        let saved = self.store.save(&document).await;
        if !saved {
            self.notices.error(SAVE_FAILED_MESSAGE);
        }
        saved
    }

    /// Background saves leave a cleared store empty until the page is edited.
    async fn save_unless_cleared(&self) -> bool {
        if self.cleared.load(Ordering::SeqCst) {
            debug!("Skipping save: storage was cleared and the page is untouched");
            return false;
        }
        self.save().await
    }
}

pub struct Session {
    saver: Saver,
    exporter: Exporter,
    settings: SessionSettings,
    periodic: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    pub fn new(
        page: SharedPage,
        store: Arc<PersistenceStore>,
        exporter: Exporter,
        notices: Notices,
        settings: SessionSettings,
    ) -> Self {
        Session {
            saver: Saver {
                page,
                store,
                notices,
                cleared: Arc::new(AtomicBool::new(false)),
            },
            exporter,
            settings,
            periodic: Mutex::new(None),
        }
    }

    pub fn page(&self) -> &SharedPage {
        &self.saver.page
    }

    pub fn notices(&self) -> &Notices {
        &self.saver.notices
    }

    /// Loads the saved document into the page and starts the periodic save.
    pub async fn start(&self) {
        match self.saver.store.load().await {
            Some(document) => {
                lock_page(self.page()).apply(&document);
                info!("Loaded saved document from '{}'", self.saver.store.key());
            }
            None => info!("No saved document found; starting empty"),
        }

        let period = self.settings.periodic_save;
        if period.is_zero() {
            warn!("Periodic save disabled (zero period)");
            return;
        }
        let saver = self.saver.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if saver.save_unless_cleared().await {
                    debug!("Periodic save complete");
                }
            }
        });
        if let Some(previous) = self.periodic_slot().replace(task) {
            previous.abort();
        }
    }

    /// Stops the timers and writes the page one last time. Returns whether
    /// the page was written.
    pub async fn shutdown(&self) -> bool {
        if let Some(task) = self.periodic_slot().take() {
            task.abort();
        }
        self.saver.store.cancel_pending();
        let saved = self.saver.save_unless_cleared().await;
        info!("Session shut down (final save: {saved})");
        saved
    }

    /// Read-only access to the page.
    pub fn read<R>(&self, f: impl FnOnce(&Page) -> R) -> R {
        f(&lock_page(self.page()))
    }

    /// Mutates the page and schedules a debounced save.
    fn edit<R>(&self, f: impl FnOnce(&mut Page) -> R) -> R {
        let result = f(&mut lock_page(self.page()));
        self.schedule_save();
        result
    }

    /// Like `edit`, but only schedules a save when `f` succeeds.
    fn try_edit<T, E>(&self, f: impl FnOnce(&mut Page) -> Result<T, E>) -> Result<T, E> {
        let result = f(&mut lock_page(self.page()));
        if result.is_ok() {
            self.schedule_save();
        }
        result
    }

    fn schedule_save(&self) {
        self.saver.cleared.store(false, Ordering::SeqCst);
        let saver = self.saver.clone();
        self.saver
            .store
            .schedule_debounced_save(move || async move {
                saver.save().await;
            });
    }

    // ── Fields and entries ──────────────────────────────────────────────────

    pub fn set_field(&self, key: FieldKey, text: String) {
        self.edit(|page| page.set_field(key, text));
    }

    pub fn add_experience(&self) -> EntryId {
        self.edit(Page::add_experience)
    }

    pub fn update_experience(
        &self,
        id: EntryId,
        field: ExperienceField,
        text: String,
    ) -> Result<(), PageError> {
        self.try_edit(|page| page.update_experience(id, field, text))
    }

    pub fn remove_experience(&self, id: EntryId) -> Result<(), PageError> {
        self.try_edit(|page| page.remove_experience(id))
    }

    pub fn add_education(&self) -> EntryId {
        self.edit(Page::add_education)
    }

    pub fn update_education(
        &self,
        id: EntryId,
        field: EducationField,
        text: String,
    ) -> Result<(), PageError> {
        self.try_edit(|page| page.update_education(id, field, text))
    }

    pub fn remove_education(&self, id: EntryId) -> Result<(), PageError> {
        self.try_edit(|page| page.remove_education(id))
    }

    // ── Profile photo ───────────────────────────────────────────────────────

    pub fn set_profile_photo(&self, upload: &Upload) -> Result<(), ValidationError> {
        let result = self.try_edit(|page| page.set_profile_photo(upload));
        if let Err(e) = &result {
            warn!("Profile photo rejected: {e}");
            self.notices().error(e.to_string());
        }
        result
    }

    /// Returns whether a photo was removed.
    pub fn delete_profile_photo(&self, confirmed: bool) -> Result<bool, NotConfirmed> {
        if !confirmed {
            return Err(NotConfirmed(
                "Are you sure you want to delete the profile photo?",
            ));
        }
        let removed = lock_page(self.page()).delete_profile_photo();
        if removed {
            self.schedule_save();
        }
        Ok(removed)
    }

    pub fn open_profile_photo(&self) -> bool {
        let mut page = lock_page(self.page());
        let photo = page.profile_photo().map(str::to_string);
        match photo {
            Some(photo) => {
                page.modal.open(&photo);
                true
            }
            None => false,
        }
    }

    // ── Certificates ────────────────────────────────────────────────────────

    pub fn upload_certificates(&self, uploads: &[Upload]) -> BatchOutcome {
        let outcome = lock_page(self.page()).gallery.add_batch(uploads);
        for rejected in &outcome.rejected {
            self.notices().error(rejected.to_string());
        }
        if !outcome.added.is_empty() {
            self.schedule_save();
        }
        outcome
    }

    /// Returns whether a certificate with `id` existed.
    pub fn remove_certificate(&self, id: &CertificateId, confirmed: bool) -> Result<bool, NotConfirmed> {
        if !confirmed {
            return Err(NotConfirmed(
                "Are you sure you want to delete this certificate?",
            ));
        }
        let removed = lock_page(self.page()).gallery.remove(id);
        if removed > 0 {
            self.schedule_save();
        }
        Ok(removed > 0)
    }

    pub fn open_certificate(&self, id: &CertificateId) -> bool {
        let mut page = lock_page(self.page());
        let image = page.gallery.find(id).map(|c| c.image_data.clone());
        match image {
            Some(image) => {
                page.modal.open(&image);
                true
            }
            None => false,
        }
    }

    pub fn next_certificates(&self) -> bool {
        lock_page(self.page()).gallery.next_page()
    }

    pub fn previous_certificates(&self) -> bool {
        lock_page(self.page()).gallery.previous_page()
    }

    pub fn modal_input(&self, input: ModalInput) -> bool {
        lock_page(self.page()).modal.handle(input)
    }

    // ── Whole document ──────────────────────────────────────────────────────

    pub fn document(&self) -> Document {
        self.read(Page::extract_current)
    }

    pub fn import(&self, document: &Document) {
        self.edit(|page| page.apply(document));
        info!("Imported document");
    }

    pub async fn save_now(&self) -> bool {
        self.saver.store.cancel_pending();
        self.saver.save().await
    }

    /// Wipes storage and returns the page to its initial state. Periodic and
    /// final saves stay off until the page is edited again.
    pub async fn clear_all(&self, confirmed: bool) -> Result<bool, NotConfirmed> {
        if !confirmed {
            return Err(NotConfirmed(
                "Are you sure you want to clear all data? This cannot be undone.",
            ));
        }
        self.saver.store.cancel_pending();
        self.saver.cleared.store(true, Ordering::SeqCst);
        let cleared = self.saver.store.clear().await;
        *lock_page(self.page()) = Page::new();
        info!("All data cleared");
        Ok(cleared)
    }

    pub fn stats(&self) -> Stats {
        let document = self.document();
        Stats {
            experience_items: document.experience.len(),
            education_items: document.education.len(),
            certificates: document.certificates.len(),
            has_profile_photo: document.profile_photo.is_some(),
            last_updated: document.last_updated,
        }
    }

    pub fn drain_notices(&self) -> Vec<Notice> {
        self.notices().drain()
    }

    // ── Export and shortcuts ────────────────────────────────────────────────

    pub async fn export(&self) -> Result<ExportArtifact, ExportError> {
        let result = self.exporter.export(self.page(), RESUME_REGION_ID).await;
        match &result {
            Ok(artifact) => self
                .notices()
                .info(format!("PDF exported: {}", artifact.file_name)),
            Err(ExportError::InProgress) => {}
            Err(e) => self.notices().error(e.to_string()),
        }
        result
    }

    pub async fn handle_key(&self, press: &KeyPress) -> KeyOutcome {
        match Shortcut::from_key(press) {
            Some(Shortcut::SaveNow) => {
                let saved = self.save_now().await;
                if saved {
                    self.notices().info(SAVED_MESSAGE);
                }
                KeyOutcome::Saved(saved)
            }
            Some(Shortcut::Export) => KeyOutcome::Exported(self.export().await),
            Some(Shortcut::CloseModal) => KeyOutcome::ModalClosed(self.modal_input(ModalInput::Escape)),
            None => KeyOutcome::Ignored,
        }
    }

    fn periodic_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.periodic.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(task) = self.periodic_slot().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{ExportSettings, LopdfAssembler};
    use crate::models::ExperienceEntry;
    use crate::store::{KeyValueStore, MemoryStore, DEFAULT_STORAGE_KEY};
    use bytes::Bytes;
    use super::notices::NoticeLevel;

    fn session_with(backend: Arc<dyn KeyValueStore>, debounce: Duration) -> (Session, Arc<PersistenceStore>) {
        session_with_settings(backend, debounce, SessionSettings::default())
    }

    fn session_with_settings(
        backend: Arc<dyn KeyValueStore>,
        debounce: Duration,
        settings: SessionSettings,
    ) -> (Session, Arc<PersistenceStore>) {
        let store = Arc::new(PersistenceStore::new(backend, DEFAULT_STORAGE_KEY, debounce));
        let exporter = Exporter::new(None, Some(Arc::new(LopdfAssembler)), ExportSettings::default());
        let session = Session::new(Page::new().shared(), store.clone(), exporter, Notices::new(), settings);
        (session, store)
    }

    fn session() -> (Session, Arc<PersistenceStore>) {
        session_with(Arc::new(MemoryStore::new()), Duration::from_millis(1000))
    }

    fn png(name: &str) -> Upload {
        Upload::new(name, Some("image/png"), Bytes::from_static(b"png"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_are_saved_after_quiet_period() {
        let (session, store) = session();
        session.set_field(FieldKey::FullName, "Ada".into());
        session.set_field(FieldKey::FullName, "Ada Lovelace".into());
        assert!(store.load().await.is_none());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        let saved = store.load().await.unwrap();
        assert_eq!(saved.full_name, "Ada Lovelace");
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_loads_saved_document() {
        let (session, store) = session();
        let document = Document {
            full_name: "Grace Hopper".into(),
            experience: vec![ExperienceEntry {
                job_title: "Admiral".into(),
                ..ExperienceEntry::template()
            }],
            ..Default::default()
        };
        assert!(store.save(&document).await);

        session.start().await;
        assert_eq!(session.read(|p| p.field(FieldKey::FullName).to_string()), "Grace Hopper");
        assert_eq!(session.stats().experience_items, 1);
        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_save() {
        let (session, store) = session_with(Arc::new(MemoryStore::new()), Duration::from_secs(3600));
        session.start().await;

        // Bypass the debounced path.
        lock_page(session.page()).set_field(FieldKey::Email, "a@b.c");
        tokio::time::sleep(Duration::from_secs(31)).await;

        assert_eq!(store.load().await.unwrap().email, "a@b.c");
        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_disables_periodic_save() {
        let settings = SessionSettings {
            periodic_save: Duration::ZERO,
        };
        let (session, store) =
            session_with_settings(Arc::new(MemoryStore::new()), Duration::from_millis(1000), settings);
        session.start().await;
        assert!(session.periodic_slot().is_none());

        // Debounced saves keep working.
        session.set_field(FieldKey::Email, "a@b.c".into());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(store.load().await.unwrap().email, "a@b.c");
        assert!(session.shutdown().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleared_storage_stays_empty_until_next_edit() {
        let (session, store) = session();
        session.start().await;
        session.set_field(FieldKey::FullName, "Ada".into());
        assert!(session.save_now().await);

        assert_eq!(session.clear_all(true).await, Ok(true));
        tokio::time::sleep(Duration::from_secs(95)).await;
        assert!(store.load().await.is_none());
        assert!(!session.shutdown().await);
        assert!(store.load().await.is_none());

        session.start().await;
        session.set_field(FieldKey::FullName, "Grace".into());
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(store.load().await.unwrap().full_name, "Grace");
        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_saves_and_cancels_pending() {
        let (session, store) = session();
        session.set_field(FieldKey::Skills, "Rust".into());
        assert!(store.has_pending_save());

        assert!(session.shutdown().await);
        assert!(!store.has_pending_save());
        assert_eq!(store.load().await.unwrap().skills, "Rust");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_pushes_notice() {
        let (session, _) = session_with(Arc::new(MemoryStore::with_quota(16)), Duration::from_millis(1000));
        session.set_field(FieldKey::Summary, "far too long for the quota".into());

        assert!(!session.save_now().await);
        let notices = session.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[0].message, SAVE_FAILED_MESSAGE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ctrl_s_saves_with_notice() {
        let (session, store) = session();
        session.set_field(FieldKey::FullName, "Ada".into());

        let outcome = session.handle_key(&KeyPress::new(true, "s")).await;
        assert!(matches!(outcome, KeyOutcome::Saved(true)));
        assert_eq!(store.load().await.unwrap().full_name, "Ada");
        assert_eq!(session.drain_notices()[0].message, SAVED_MESSAGE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_escape_closes_modal() {
        let (session, _) = session();
        session.upload_certificates(&[png("a.png")]);
        let id = session.read(|p| p.gallery.certificates()[0].id.clone());

        assert!(session.open_certificate(&id));
        assert!(session.read(|p| p.modal.is_open()));

        let outcome = session.handle_key(&KeyPress::new(false, "Escape")).await;
        assert!(matches!(outcome, KeyOutcome::ModalClosed(true)));
        assert!(!session.read(|p| p.modal.is_open()));

        let outcome = session.handle_key(&KeyPress::new(false, "Escape")).await;
        assert!(matches!(outcome, KeyOutcome::ModalClosed(false)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ctrl_e_without_rasterizer_reports() {
        let (session, _) = session();
        let outcome = session.handle_key(&KeyPress::new(true, "e")).await;
        assert!(matches!(
            outcome,
            KeyOutcome::Exported(Err(ExportError::DependencyMissing(_)))
        ));
        assert_eq!(session.drain_notices()[0].level, NoticeLevel::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_all_requires_confirmation() {
        let (session, store) = session();
        session.set_field(FieldKey::FullName, "Ada".into());
        assert!(session.save_now().await);

        assert!(session.clear_all(false).await.is_err());
        assert!(store.load().await.is_some());

        assert_eq!(session.clear_all(true).await, Ok(true));
        assert!(store.load().await.is_none());
        assert!(!store.has_pending_save());
        assert_eq!(session.read(|p| p.field(FieldKey::FullName).to_string()), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_rejections_become_notices() {
        let (session, _) = session();
        let text = Upload::new("notes.txt", Some("text/plain"), Bytes::from_static(b"hi"));
        let outcome = session.upload_certificates(&[png("a.png"), text]);

        assert_eq!(outcome.added.len(), 1);
        assert_eq!(outcome.rejected.len(), 1);
        let notices = session.drain_notices();
        assert!(notices[0].message.contains("notes.txt"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_destructive_deletes_need_confirmation() {
        let (session, _) = session();
        session.upload_certificates(&[png("a.png")]);
        let id = session.read(|p| p.gallery.certificates()[0].id.clone());

        assert!(session.remove_certificate(&id, false).is_err());
        assert_eq!(session.remove_certificate(&id, true), Ok(true));
        assert_eq!(session.remove_certificate(&id, true), Ok(false));

        assert!(session.delete_profile_photo(false).is_err());
        assert_eq!(session.delete_profile_photo(true), Ok(false));
        session.set_profile_photo(&png("me.png")).unwrap();
        assert_eq!(session.delete_profile_photo(true), Ok(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_import_then_document() {
        let (session, _) = session();
        session.import(&Document {
            profession: "Engineer".into(),
            ..Default::default()
        });
        assert_eq!(session.document().profession, "Engineer");
    }
}
