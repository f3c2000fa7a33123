use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assets::decode::{PreparedImage, decode_image};
use crate::assets::media::{decode_video_frame, probe_video, spill_to_temp};
use crate::assets::pending::{Pending, Readiness};
use crate::assets::template::spawn_template_load;
use crate::export::delivery::Artifact;
use crate::export::snapshot::ExportSnapshot;
use crate::export::still::{StillExport, export_still};
use crate::export::video::{VideoEncodeSettings, VideoExportRequest, VideoExporter};
use crate::foundation::core::{Canvas, Point};
use crate::foundation::error::{BrandframeError, BrandframeResult};
use crate::model::adjustments::Adjustments;
use crate::model::annotation::{
    AnnotationId, AnnotationList, FALLBACK_FAMILY, TextAnnotation, TextPatch,
};
use crate::model::media::{MediaKind, SourceMedia, VideoMedia};
use crate::render::backend::FrameRGBA;
use crate::render::compositor::{Compositor, FrameInputs};
use crate::session::hit_test::{DragController, to_canvas};
use crate::settings::auth::CredentialVerifier;
use crate::settings::model::{Department, FontCatalogEntry};
use crate::settings::service::SettingsService;
use crate::settings::store::SettingsStore;
use crate::text::layout::TextEngine;

/// Interactive editing state plus the controller that turns it into frames.
///
/// Nothing is drawn until every resource the frame needs (template, incoming media, fonts of
/// visible annotations) has settled. Until then [`EditorSession::refresh`] keeps returning the
/// previous frame.
pub struct EditorSession {
    canvas: Canvas,
    /// Directory relative template and font paths resolve against.
    base_dir: PathBuf,
    compositor: Compositor,

    departments: Vec<Department>,
    catalog: Vec<FontCatalogEntry>,
    department: Option<Department>,
    template: Option<Pending<PreparedImage>>,

    media: Option<SourceMedia>,
    incoming: Option<Pending<SourceMedia>>,
    adjustments: Adjustments,
    annotations: AnnotationList,
    selected: Option<AnnotationId>,
    drag: DragController,
    display_size: (f64, f64),

    last_frame: Option<FrameRGBA>,
    dirty: bool,
    last_error: Option<BrandframeError>,
}

impl EditorSession {
    pub fn new(text: TextEngine, base_dir: impl Into<PathBuf>) -> Self {
        Self::with_canvas(text, base_dir, Canvas::SOCIAL)
    }

    pub fn with_canvas(text: TextEngine, base_dir: impl Into<PathBuf>, canvas: Canvas) -> Self {
        Self {
            canvas,
            base_dir: base_dir.into(),
            compositor: Compositor::new(text),
            departments: Vec::new(),
            catalog: Vec::new(),
            department: None,
            template: None,
            media: None,
            incoming: None,
            adjustments: Adjustments::IDENTITY,
            annotations: AnnotationList::new(),
            selected: None,
            drag: DragController::new(),
            display_size: (canvas.width_f64(), canvas.height_f64()),
            last_frame: None,
            dirty: true,
            last_error: None,
        }
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    // Settings ------------------------------------------------------------------------------

    /// Full reload of the shared department list and font catalog.
    pub fn sync_settings<S, V>(&mut self, service: &SettingsService<S, V>) -> BrandframeResult<()>
    where
        S: SettingsStore,
        V: CredentialVerifier,
    {
        let departments = service.departments()?;
        let fonts = service.fonts()?;
        self.apply_settings(departments, fonts);
        Ok(())
    }

    /// Replace the department list and font catalog.
    ///
    /// A selected department that disappeared is deselected; one whose template changed is
    /// reloaded.
    pub fn apply_settings(&mut self, departments: Vec<Department>, fonts: Vec<FontCatalogEntry>) {
        if fonts != self.catalog {
            self.install_catalog(&fonts);
            self.catalog = fonts;
            self.dirty = true;
        }
        self.departments = departments;

        let Some(current) = self.department.clone() else {
            return;
        };
        match self.departments.iter().find(|d| d.id == current.id).cloned() {
            None => {
                tracing::info!(id = %current.id, "selected department removed");
                self.department = None;
                self.template = None;
                self.dirty = true;
            }
            Some(updated) if updated.template_url != current.template_url => {
                self.start_template_load(&updated);
                self.department = Some(updated);
            }
            Some(updated) => self.department = Some(updated),
        }
    }

    fn install_catalog(&mut self, fonts: &[FontCatalogEntry]) {
        let book = self.compositor.text_mut().fonts_mut();
        for old in &self.catalog {
            if !fonts.iter().any(|f| f.name == old.name) {
                book.remove(&old.name);
            }
        }
        for entry in fonts {
            if self.catalog.contains(entry) {
                continue;
            }
            match entry.data.as_deref() {
                Some(data) => book.install_reference(&entry.name, data, &self.base_dir),
                None => book.alias_default(&entry.name),
            }
        }
    }

    pub fn departments(&self) -> &[Department] {
        &self.departments
    }

    pub fn font_catalog(&self) -> &[FontCatalogEntry] {
        &self.catalog
    }

    pub fn department(&self) -> Option<&Department> {
        self.department.as_ref()
    }

    /// Choose the department whose template overlays the canvas. `None` removes the overlay.
    pub fn select_department(&mut self, id: Option<&str>) -> BrandframeResult<()> {
        let Some(id) = id else {
            self.department = None;
            self.template = None;
            self.dirty = true;
            return Ok(());
        };
        let dept = self
            .departments
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| BrandframeError::validation(format!("unknown department '{id}'")))?;
        self.start_template_load(&dept);
        self.department = Some(dept);
        Ok(())
    }

    fn start_template_load(&mut self, dept: &Department) {
        tracing::debug!(id = %dept.id, url = %dept.template_url, "loading template");
        self.template = Some(spawn_template_load(
            dept.template_url.clone(),
            self.base_dir.clone(),
            self.canvas,
        ));
        self.dirty = true;
    }

    /// Template handle of the selected department.
    pub fn template(&self) -> Option<&Pending<PreparedImage>> {
        self.template.as_ref()
    }

    // Media ---------------------------------------------------------------------------------

    /// Start decoding an upload. The current media stays active until the new one is ready;
    /// a failed decode leaves it in place and is reported through [`EditorSession::take_error`].
    pub fn load_media(
        &mut self,
        bytes: Vec<u8>,
        kind: MediaKind,
        file_name: Option<&str>,
    ) -> Pending<SourceMedia> {
        let ext = file_name
            .and_then(|n| n.rsplit_once('.'))
            .map(|(_, e)| e.to_ascii_lowercase())
            .unwrap_or_else(|| "bin".to_owned());
        let pending = Pending::spawn("media", move || match kind {
            MediaKind::Image => decode_image(&bytes).map(SourceMedia::Image),
            MediaKind::Video => {
                let guard = spill_to_temp(&bytes, &ext)?;
                let path = guard.path().to_path_buf();
                open_video(&path, Some(Arc::new(guard)))
            }
        });
        self.incoming = Some(pending.clone());
        pending
    }

    /// Start loading media straight from a file on disk.
    pub fn load_media_path(&mut self, path: PathBuf, kind: MediaKind) -> Pending<SourceMedia> {
        let pending = Pending::spawn("media", move || match kind {
            MediaKind::Image => {
                let bytes = std::fs::read(&path).map_err(|e| {
                    BrandframeError::input_decode(format!(
                        "failed to read '{}': {e}",
                        path.display()
                    ))
                })?;
                decode_image(&bytes).map(SourceMedia::Image)
            }
            MediaKind::Video => open_video(&path, None),
        });
        self.incoming = Some(pending.clone());
        pending
    }

    /// Replace the media immediately (already decoded elsewhere).
    pub fn set_media(&mut self, media: SourceMedia) {
        self.incoming = None;
        self.install_media(media);
    }

    fn install_media(&mut self, media: SourceMedia) {
        let (w, h) = media.natural_size();
        tracing::info!(kind = ?media.kind(), width = w, height = h, "media loaded");
        self.media = Some(media);
        self.adjustments = Adjustments::IDENTITY;
        self.dirty = true;
    }

    pub fn media(&self) -> Option<&SourceMedia> {
        self.media.as_ref()
    }

    /// Show the video frame at `t` seconds. Images ignore this.
    pub fn seek_preview(&mut self, t: f64) -> BrandframeResult<()> {
        let Some(SourceMedia::Video(video)) = self.media.as_mut() else {
            return Ok(());
        };
        let t = t.clamp(0.0, video.info.duration_sec.max(0.0));
        video.preview_frame = decode_video_frame(&video.info, t)?;
        video.preview_time_sec = t;
        self.dirty = true;
        Ok(())
    }

    // Adjustments ---------------------------------------------------------------------------

    pub fn adjustments(&self) -> &Adjustments {
        &self.adjustments
    }

    pub fn set_adjustments(&mut self, adj: Adjustments) {
        self.adjustments = adj.clamped();
        self.dirty = true;
    }

    pub fn reset_adjustments(&mut self) {
        self.set_adjustments(Adjustments::IDENTITY);
    }

    pub fn rotate_clockwise(&mut self) {
        self.adjustments.rotate_clockwise();
        self.dirty = true;
    }

    pub fn toggle_flip_h(&mut self) {
        self.adjustments.flip_h = !self.adjustments.flip_h;
        self.dirty = true;
    }

    pub fn toggle_flip_v(&mut self) {
        self.adjustments.flip_v = !self.adjustments.flip_v;
        self.dirty = true;
    }

    // Text ----------------------------------------------------------------------------------

    /// Add a default-styled annotation at the canvas center and select it.
    pub fn add_text(&mut self) -> AnnotationId {
        let family = self
            .catalog
            .first()
            .map(|f| f.name.clone())
            .unwrap_or_else(|| FALLBACK_FAMILY.to_owned());
        let canvas = self.canvas;
        let id = self
            .annotations
            .add_with(|id| TextAnnotation::with_defaults(id, family, canvas));
        self.selected = Some(id);
        self.dirty = true;
        id
    }

    /// Add a fully specified annotation; its id is replaced by a fresh one.
    pub fn insert_text(&mut self, ann: TextAnnotation) -> AnnotationId {
        let id = self.annotations.add_with(|id| TextAnnotation { id, ..ann });
        self.dirty = true;
        id
    }

    pub fn update_text(&mut self, id: AnnotationId, patch: &TextPatch) -> bool {
        let changed = self.annotations.update(id, patch);
        self.dirty |= changed;
        changed
    }

    pub fn delete_text(&mut self, id: AnnotationId) -> bool {
        let removed = self.annotations.remove(id).is_some();
        if removed {
            if self.selected == Some(id) {
                self.selected = None;
            }
            if self.drag.dragged() == Some(id) {
                self.drag.pointer_up();
            }
            self.dirty = true;
        }
        removed
    }

    pub fn annotations(&self) -> &AnnotationList {
        &self.annotations
    }

    pub fn selected(&self) -> Option<AnnotationId> {
        self.selected
    }

    pub fn select(&mut self, id: Option<AnnotationId>) {
        if self.selected != id {
            self.selected = id.filter(|id| self.annotations.get(*id).is_some());
            self.dirty = true;
        }
    }

    // Pointer -------------------------------------------------------------------------------

    /// Size the canvas is displayed at; pointer positions are given in this space.
    pub fn set_display_size(&mut self, width: f64, height: f64) {
        self.display_size = (width, height);
    }

    fn pointer_to_canvas(&self, p: Point) -> Option<Point> {
        to_canvas(p, self.display_size.0, self.display_size.1, self.canvas)
    }

    /// Press: select the top-most annotation under the pointer, or clear the selection.
    pub fn pointer_down(&mut self, display: Point) -> Option<AnnotationId> {
        let Some(p) = self.pointer_to_canvas(display) else {
            return self.selected;
        };
        let hit = self
            .drag
            .pointer_down(self.compositor.text_mut(), &self.annotations, p);
        if hit != self.selected {
            self.selected = hit;
            self.dirty = true;
        }
        hit
    }

    pub fn pointer_move(&mut self, display: Point) -> bool {
        let Some(p) = self.pointer_to_canvas(display) else {
            return false;
        };
        let moved = self.drag.pointer_move(&mut self.annotations, p);
        self.dirty |= moved;
        moved
    }

    pub fn pointer_up(&mut self) {
        self.drag.pointer_up();
    }

    pub fn pointer_leave(&mut self) {
        self.drag.pointer_leave();
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    // Frames --------------------------------------------------------------------------------

    /// Whether every resource the next frame needs has settled.
    pub fn is_ready(&mut self) -> bool {
        self.poll_incoming();
        if self.incoming.is_some() {
            return false;
        }
        if let Some(t) = &self.template
            && !matches!(t.poll(), Readiness::Ready)
        {
            return false;
        }
        let book = self.compositor.text_mut().fonts_mut();
        !self
            .annotations
            .iter()
            .any(|a| book.is_loading(&a.font_family))
    }

    fn poll_incoming(&mut self) {
        let Some(p) = &self.incoming else {
            return;
        };
        match p.poll() {
            Readiness::Loading => {}
            Readiness::Ready => {
                let media = p.get();
                self.incoming = None;
                if let Some(media) = media {
                    self.install_media(media.as_ref().clone());
                }
            }
            Readiness::Failed(msg) => {
                self.incoming = None;
                tracing::warn!(error = %msg, "media upload failed; keeping previous media");
                self.last_error = Some(BrandframeError::input_decode(msg));
            }
        }
    }

    /// Recompose if inputs changed and everything is ready; otherwise keep the last frame.
    pub fn refresh(&mut self) -> Option<&FrameRGBA> {
        if !self.is_ready() {
            return self.last_frame.as_ref();
        }
        if self.dirty || self.last_frame.is_none() {
            let template = self.template.as_ref().and_then(Pending::get);
            let inputs = FrameInputs {
                canvas: self.canvas,
                background: self.media.as_ref().map(SourceMedia::current_frame),
                adjustments: &self.adjustments,
                template: template.as_deref(),
                annotations: self.annotations.as_slice(),
                selected: self.selected,
            };
            match self.compositor.compose(&inputs) {
                Ok(frame) => {
                    self.last_frame = Some(frame);
                    self.dirty = false;
                }
                Err(e) => tracing::warn!(error = %e, "compose failed; keeping previous frame"),
            }
        }
        self.last_frame.as_ref()
    }

    /// Block until pending resources settle, then refresh.
    pub fn wait_ready(&mut self) -> Option<&FrameRGBA> {
        if let Some(p) = self.incoming.clone() {
            let _ = p.wait();
        }
        if let Some(t) = self.template.clone() {
            let _ = t.wait();
        }
        self.refresh()
    }

    pub fn last_frame(&self) -> Option<&FrameRGBA> {
        self.last_frame.as_ref()
    }

    /// The most recent user-facing load error, cleared on read.
    pub fn take_error(&mut self) -> Option<BrandframeError> {
        self.poll_incoming();
        self.last_error.take()
    }

    // Export --------------------------------------------------------------------------------

    /// Frozen copy of the current state for an export. The template is included only if loaded.
    pub fn snapshot(&self) -> ExportSnapshot {
        ExportSnapshot {
            canvas: self.canvas,
            department: self.department.as_ref().map(|d| d.name.clone()),
            adjustments: self.adjustments,
            annotations: self.annotations.as_slice().to_vec(),
            template: self.template.as_ref().and_then(Pending::get),
        }
    }

    /// Fail while an upload is still decoding; exporting now would capture the media it replaces.
    fn ensure_media_settled(&mut self) -> BrandframeResult<()> {
        self.poll_incoming();
        if self.incoming.is_some() {
            return Err(BrandframeError::validation(
                "media is still loading; export once it is ready",
            ));
        }
        Ok(())
    }

    /// Export the current image, or the previewed video frame, as PNG.
    pub fn export_still(&mut self, ts_millis: u64) -> BrandframeResult<StillExport> {
        self.ensure_media_settled()?;
        let mut snapshot = self.snapshot();
        if let Some(t) = &self.template {
            snapshot.template = Some(t.wait()?);
        }
        let background = self.media.as_ref().map(SourceMedia::current_frame);
        export_still(&mut self.compositor, &snapshot, background, ts_millis)
    }

    /// Re-encode the loaded video through `exporter`. Requires a selected department template.
    pub fn export_video(
        &mut self,
        exporter: &mut VideoExporter,
        settings: VideoEncodeSettings,
        out_dir: &Path,
        ts_millis: u64,
    ) -> BrandframeResult<Artifact> {
        self.ensure_media_settled()?;
        if self.template.is_none() {
            return Err(BrandframeError::validation(
                "video export needs a department template",
            ));
        }
        let Some(SourceMedia::Video(video)) = &self.media else {
            return Err(BrandframeError::validation(
                "video export needs a video source",
            ));
        };
        let req = VideoExportRequest {
            snapshot: ExportSnapshot {
                template: None,
                ..self.snapshot()
            },
            template: self.template.clone(),
            source: video.info.clone(),
            settings,
            out_dir: out_dir.to_path_buf(),
            ts_millis,
        };
        exporter.run(&mut self.compositor, req)
    }

    pub fn compositor_mut(&mut self) -> &mut Compositor {
        &mut self.compositor
    }
}

fn open_video(
    path: &Path,
    backing_file: Option<Arc<crate::assets::media::TempFileGuard>>,
) -> BrandframeResult<SourceMedia> {
    let info = probe_video(path)?;
    let preview_frame = decode_video_frame(&info, 0.0)?;
    Ok(SourceMedia::Video(VideoMedia {
        info,
        preview_frame,
        preview_time_sec: 0.0,
        backing_file,
    }))
}

#[cfg(test)]
#[path = "../../tests/unit/session/editor.rs"]
mod tests;
