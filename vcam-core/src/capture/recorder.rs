//! Screen recorder: selection + exclusions on top of the engine.
//!
//! One configuration-driven component replaces the old display-only
//! and exclusion-list recorder variants: the exclusion sets are simply
//! empty when unused. The recorder owns the capture target selection,
//! rebuilds the content filter whenever selection or exclusions
//! change, pushes the update to the running engine, and notifies an
//! optional persistence hook so the host can write the excluded-app
//! list out on every change.

use std::collections::BTreeSet;

use tracing::debug;

use crate::capture::config::{CaptureConfig, CaptureTarget, ContentFilter};
use crate::capture::engine::{CaptureEngine, FrameStream};
use crate::capture::source::CaptureSource;
use crate::capture::types::Size;
use crate::error::VcamError;

/// Callback invoked with the new excluded-app set after each change.
pub type ExclusionsChangedHook = Box<dyn Fn(&BTreeSet<String>) + Send + Sync>;

/// A display reported by the shareable-content enumerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayInfo {
    pub id: u32,
    pub width: u32,
    pub height: u32,
}

/// A window reported by the shareable-content enumerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub id: u64,
    pub title: String,
    pub app: String,
}

// ── ScreenRecorder ───────────────────────────────────────────────

/// Holds what to capture and drives the engine accordingly.
pub struct ScreenRecorder<S: CaptureSource> {
    engine: CaptureEngine<S>,
    config: CaptureConfig,
    target: Option<CaptureTarget>,
    excluded_apps: BTreeSet<String>,
    excluded_windows: BTreeSet<String>,
    exclusions_hook: Option<ExclusionsChangedHook>,
    available_displays: Vec<DisplayInfo>,
    available_windows: Vec<WindowInfo>,
    /// Last content size observed by the relay loop.
    content_size: Size,
}

impl<S: CaptureSource> ScreenRecorder<S> {
    pub fn new(source: S, config: CaptureConfig) -> Self {
        Self {
            engine: CaptureEngine::new(source),
            config,
            target: None,
            excluded_apps: BTreeSet::new(),
            excluded_windows: BTreeSet::new(),
            exclusions_hook: None,
            available_displays: Vec::new(),
            available_windows: Vec::new(),
            content_size: Size::new(1, 1),
        }
    }

    /// Register a hook fired after every excluded-app change.
    pub fn on_exclusions_changed(&mut self, hook: ExclusionsChangedHook) {
        self.exclusions_hook = Some(hook);
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    pub fn content_size(&self) -> Size {
        self.content_size
    }

    /// Record the content size seen on the most recent frame.
    pub fn note_content_size(&mut self, size: Size) {
        self.content_size = size;
    }

    pub fn excluded_apps(&self) -> &BTreeSet<String> {
        &self.excluded_apps
    }

    // ── Available content ────────────────────────────────────────

    /// Record the enumerator's latest shareable content.
    ///
    /// When nothing has been selected yet, the first display becomes
    /// the target; an explicit selection is never overridden.
    pub fn refresh_available_content(
        &mut self,
        displays: Vec<DisplayInfo>,
        windows: Vec<WindowInfo>,
    ) {
        self.available_displays = displays;
        self.available_windows = windows;
        if self.target.is_none() {
            if let Some(first) = self.available_displays.first() {
                self.target = Some(CaptureTarget::Display(first.id));
                self.content_size = Size::new(first.width, first.height);
                debug!(display = first.id, "auto-selected first available display");
            }
        }
    }

    pub fn available_displays(&self) -> &[DisplayInfo] {
        &self.available_displays
    }

    pub fn available_windows(&self) -> &[WindowInfo] {
        &self.available_windows
    }

    // ── Selection ────────────────────────────────────────────────

    /// Choose the capture target (display or window).
    pub async fn select_target(&mut self, target: CaptureTarget) {
        self.target = Some(target);
        self.push_update().await;
    }

    /// Replace the excluded-application set.
    pub async fn set_excluded_apps(&mut self, apps: BTreeSet<String>) {
        if apps == self.excluded_apps {
            return;
        }
        self.excluded_apps = apps;
        if let Some(hook) = &self.exclusions_hook {
            hook(&self.excluded_apps);
        }
        self.push_update().await;
    }

    /// Replace the excluded-window set.
    pub async fn set_excluded_windows(&mut self, windows: BTreeSet<String>) {
        if windows == self.excluded_windows {
            return;
        }
        self.excluded_windows = windows;
        self.push_update().await;
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Start capturing with the current selection.
    ///
    /// Fails with [`VcamError::NoContentSelected`] when no target has
    /// been chosen — fatal to this attempt only, never to the process.
    pub async fn start(&mut self) -> Result<FrameStream, VcamError> {
        let filter = self.build_filter()?;
        self.engine.start_capture(&self.config, &filter).await
    }

    /// Stop capturing. Idempotent, safe when never started.
    pub async fn stop(&mut self) {
        self.engine.stop_capture().await;
    }

    // ── Internal ─────────────────────────────────────────────────

    fn build_filter(&self) -> Result<ContentFilter, VcamError> {
        let target = self.target.ok_or(VcamError::NoContentSelected)?;
        Ok(ContentFilter {
            target,
            excluded_apps: self.excluded_apps.clone(),
            excluded_windows: self.excluded_windows.clone(),
        })
    }

    /// Rebuild the filter and apply it to a running session.
    async fn push_update(&mut self) {
        if !self.engine.is_running() {
            return;
        }
        match self.build_filter() {
            Ok(filter) => self.engine.update(&self.config, &filter).await,
            Err(_) => debug!("no capture target selected; filter update skipped"),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::synthetic::SyntheticSource;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn recorder() -> ScreenRecorder<SyntheticSource> {
        let config = CaptureConfig {
            min_frame_interval: Duration::from_millis(1),
            ..CaptureConfig::with_fps(32, 16, 60)
        };
        ScreenRecorder::new(SyntheticSource::new(), config)
    }

    #[tokio::test]
    async fn start_without_selection_fails() {
        let mut rec = recorder();
        let err = rec.start().await.unwrap_err();
        assert!(matches!(err, VcamError::NoContentSelected));
        assert!(!rec.is_running());
    }

    #[tokio::test]
    async fn start_after_selecting_display() {
        let mut rec = recorder();
        rec.select_target(CaptureTarget::Display(0)).await;
        let mut stream = rec.start().await.unwrap();
        assert!(stream.next().await.unwrap().is_valid());
        rec.stop().await;
    }

    #[tokio::test]
    async fn exclusion_change_fires_persistence_hook() {
        let mut rec = recorder();
        let fired = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&fired);
        rec.on_exclusions_changed(Box::new(move |apps| {
            observed.fetch_add(1, Ordering::SeqCst);
            assert!(apps.contains("com.example.chat"));
        }));

        rec.set_excluded_apps(BTreeSet::from(["com.example.chat".to_string()]))
            .await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Setting the identical set again is a no-op.
        rec.set_excluded_apps(BTreeSet::from(["com.example.chat".to_string()]))
            .await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exclusions_update_running_session() {
        let mut rec = recorder();
        rec.select_target(CaptureTarget::Display(0)).await;
        let mut stream = rec.start().await.unwrap();

        rec.set_excluded_windows(BTreeSet::from(["com.example.chat.Main".to_string()]))
            .await;

        // Session keeps producing after the filter update.
        assert!(stream.next().await.unwrap().is_valid());
        rec.stop().await;
    }

    #[test]
    fn refresh_auto_selects_the_first_display() {
        let mut rec = recorder();
        rec.refresh_available_content(
            vec![
                DisplayInfo {
                    id: 3,
                    width: 2560,
                    height: 1440,
                },
                DisplayInfo {
                    id: 4,
                    width: 1920,
                    height: 1080,
                },
            ],
            Vec::new(),
        );
        assert_eq!(rec.available_displays().len(), 2);
        assert_eq!(rec.content_size(), Size::new(2560, 1440));
    }

    #[tokio::test]
    async fn refresh_never_overrides_an_explicit_selection() {
        let mut rec = recorder();
        rec.select_target(CaptureTarget::Display(7)).await;
        rec.refresh_available_content(
            vec![DisplayInfo {
                id: 1,
                width: 800,
                height: 600,
            }],
            Vec::new(),
        );
        // Still display 7: starting must use the explicit selection.
        let mut stream = rec.start().await.unwrap();
        assert!(stream.next().await.unwrap().is_valid());
        rec.stop().await;
    }

    #[tokio::test]
    async fn content_size_tracking() {
        let mut rec = recorder();
        assert_eq!(rec.content_size(), Size::new(1, 1));
        rec.note_content_size(Size::new(1280, 720));
        assert_eq!(rec.content_size(), Size::new(1280, 720));
    }
}
