use tracing::debug;

use crate::editor::{lock_page, SharedPage};
use crate::view::RegionState;

/// Prepares the resume region for capture and puts it back when dropped.
///
/// While alive, controls are hidden, editing is off and sizing is normalized so
/// off-screen content is rendered. Dropping restores the region exactly as it
/// was, on success and failure alike.
pub struct CaptureGuard {
    page: SharedPage,
    saved: Option<RegionState>,
}

impl CaptureGuard {
    pub fn begin(page: &SharedPage) -> Self {
        let mut locked = lock_page(page);
        let saved = locked.region.clone();

        let region = &mut locked.region;
        for (key, value) in [
            ("width", "auto"),
            ("height", "auto"),
            ("overflow", "visible"),
            ("transform", "none"),
        ] {
            region.inline_style.insert(key.to_string(), value.to_string());
        }
        region.controls_visible = false;
        region.editable = false;
        debug!("Region prepared for capture");

        drop(locked);
        CaptureGuard {
            page: page.clone(),
            saved: Some(saved),
        }
    }

    /// Restores the region now instead of at drop.
    pub fn restore(mut self) {
        self.restore_region();
    }

    fn restore_region(&mut self) {
        if let Some(saved) = self.saved.take() {
            let mut locked = lock_page(&self.page);
            locked.region = saved;
            debug!("Region restored after capture");
        }
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.restore_region();
    }
}

/// Marks the page as exporting until dropped.
pub struct BusyGuard {
    page: SharedPage,
}

impl BusyGuard {
    pub fn new(page: &SharedPage) -> Self {
        lock_page(page).export_busy = true;
        BusyGuard { page: page.clone() }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        lock_page(&self.page).export_busy = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::Page;

    #[test]
    fn test_prepare_and_restore() {
        let page = Page::new().shared();
        let original = lock_page(&page).region.clone();

        let guard = CaptureGuard::begin(&page);
        {
            let p = lock_page(&page);
            assert!(!p.region.controls_visible);
            assert!(!p.region.editable);
            assert_eq!(p.region.inline_style["overflow"], "visible");
            assert_eq!(p.region.inline_style["width"], "auto");
        }
        guard.restore();

        assert_eq!(lock_page(&page).region, original);
    }

    #[test]
    fn test_drop_restores_after_panic_path() {
        let page = Page::new().shared();
        let original = lock_page(&page).region.clone();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = CaptureGuard::begin(&page);
            panic!("capture blew up");
        }));
        assert!(result.is_err());
        assert_eq!(lock_page(&page).region, original);
    }

    #[test]
    fn test_busy_flag_cleared_on_drop() {
        let page = Page::new().shared();
        {
            let _busy = BusyGuard::new(&page);
            assert!(lock_page(&page).export_busy);
        }
        assert!(!lock_page(&page).export_busy);
    }
}
