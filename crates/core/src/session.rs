//! Tab/session management
//!
//! [`SessionManager`] owns the ordered tabs and is the only mutation entry
//! point for the host shell. Each [`DocumentSession`] owns its own annotation
//! store, gesture overlay and view state; nothing is shared between tabs.
//! Process-wide defaults live in [`Preferences`] and are resolved against
//! per-tab overrides at read time.

use crate::annotation::{AnnotationId, AnnotationStore};
use crate::coordinates::{CoordinateMapper, PageMetrics, Viewport};
use crate::geometry::{DocRect, ScreenRect};
use crate::keymap::{Command, Dispatch};
use crate::loader::LoadedDocument;
use crate::outline::Bookmark;
use crate::overlay::{AnnotationStyle, GestureOutcome, OverlayPrimitive, PointerEvent, RenderOverlay};
use doc_model::{
    apply_zoom_action, clamp_brightness, dim_opacity, DocumentKind, FontFamily, Preferences,
    ScrollPosition, SessionId, ThemeId, ToolMode, ViewState, ZoomAction,
};
use pdf_engine::PageSize;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no active session")]
    NoActiveSession,
    #[error("unknown session {0}")]
    UnknownSession(SessionId),
    #[error("session {0} does not support annotations")]
    AnnotationsUnsupported(SessionId),
    #[error("session {0} does not support font switching")]
    FontUnsupported(SessionId),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// One open tab.
#[derive(Debug)]
pub struct DocumentSession {
    id: SessionId,
    path: Option<PathBuf>,
    kind: DocumentKind,
    title: String,
    view: ViewState,
    metrics: PageMetrics,
    store: AnnotationStore,
    overlay: RenderOverlay,
    bookmarks: Vec<Bookmark>,
    word_count: Option<usize>,
}

impl DocumentSession {
    fn new(id: SessionId, path: Option<PathBuf>, kind: DocumentKind) -> Self {
        let title = match &path {
            Some(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            None => "Untitled".to_string(),
        };
        let metrics = match kind {
            DocumentKind::Markdown => PageMetrics::continuous(PageSize::default()),
            // Page count arrives later from the PDF collaborator.
            DocumentKind::Pdf => PageMetrics::default(),
        };
        Self {
            id,
            path,
            kind,
            title,
            view: ViewState::default(),
            metrics,
            store: AnnotationStore::new(),
            overlay: RenderOverlay::new(),
            bookmarks: Vec::new(),
            word_count: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// `None` for transient tabs.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn metrics(&self) -> &PageMetrics {
        &self.metrics
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn word_count(&self) -> Option<usize> {
        self.word_count
    }

    pub fn is_drawing(&self) -> bool {
        self.overlay.is_drawing()
    }

    fn mapper(&self, viewport: Viewport) -> CoordinateMapper {
        CoordinateMapper::new(&self.metrics, self.view.zoom, self.view.scroll, viewport)
    }

    fn cancel_gesture(&mut self) -> bool {
        let cancelled = self.overlay.cancel(&mut self.store);
        if cancelled {
            log::debug!("cancelled in-progress gesture on session {}", self.id);
        }
        cancelled
    }
}

/// Screen placement of one visible page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PagePlacement {
    pub page_index: u32,
    pub rect: ScreenRect,
}

/// Everything the shell needs to composite the active session for one repaint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub session: SessionId,
    pub kind: DocumentKind,
    pub theme: ThemeId,
    pub font: FontFamily,
    pub zoom: f32,
    /// Opacity of the black brightness layer; `0.0` means no layer.
    pub dim_opacity: f32,
    pub pages: Vec<PagePlacement>,
    pub primitives: Vec<OverlayPrimitive>,
}

/// Horizontal room, in screen pixels, left beside a page fitted to width.
pub const FIT_WIDTH_MARGIN: f32 = 60.0;
/// Zoom range a fit-to-width factor is held to.
pub const FIT_WIDTH_RANGE: (f32, f32) = (0.5, 2.0);

#[derive(Debug)]
pub struct SessionManager {
    sessions: Vec<DocumentSession>,
    active: Option<SessionId>,
    next_id: u64,
    preferences: Preferences,
    viewport: Viewport,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(Preferences::default())
    }
}

impl SessionManager {
    pub fn new(preferences: Preferences) -> Self {
        let preferences = preferences.normalized();
        Self { sessions: Vec::new(), active: None, next_id: 0, preferences, viewport: Viewport::default() }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Sessions in tab order.
    pub fn sessions(&self) -> &[DocumentSession] {
        &self.sessions
    }

    pub fn session(&self, id: SessionId) -> Option<&DocumentSession> {
        self.sessions.iter().find(|session| session.id == id)
    }

    pub fn active_id(&self) -> Option<SessionId> {
        self.active
    }

    pub fn active_session(&self) -> Option<&DocumentSession> {
        self.active.and_then(|id| self.session(id))
    }

    /// Opens a new tab for `path` and makes it active. The same path may be
    /// open in several tabs, each with independent state.
    pub fn open_document(&mut self, path: impl Into<PathBuf>, kind: DocumentKind) -> SessionId {
        self.push_session(Some(path.into()), kind)
    }

    /// Opens a transient tab with no backing file.
    pub fn open_untitled(&mut self, kind: DocumentKind) -> SessionId {
        self.push_session(None, kind)
    }

    /// Opens a tab from a loaded document, seeding its page metrics,
    /// bookmarks and statistics. PDFs open fitted to the viewport width.
    pub fn open_loaded(&mut self, document: LoadedDocument) -> SessionId {
        let id = self.push_session(Some(document.path), document.kind);
        if let Some(session) = self.session_mut(id) {
            session.title = document.title;
            session.metrics = document.metrics;
            session.bookmarks = document.bookmarks;
            session.word_count = document.word_count;
        }
        if document.kind == DocumentKind::Pdf {
            // The new tab is active, so this cannot miss.
            let _ = self.fit_to_width();
        }
        id
    }

    fn push_session(&mut self, path: Option<PathBuf>, kind: DocumentKind) -> SessionId {
        self.next_id += 1;
        let id = SessionId(self.next_id);
        let session = DocumentSession::new(id, path, kind);
        log::info!("opened session {id} ({}, {})", kind.label(), session.title);
        self.sessions.push(session);
        self.activate(id);
        id
    }

    /// Removes a tab. Closing the active tab activates its left neighbor, or
    /// the new leftmost tab when it was first.
    pub fn close_document(&mut self, id: SessionId) -> SessionResult<()> {
        let index = self.index_of(id)?;
        let session = self.sessions.remove(index);
        log::info!("closed session {id} ({})", session.title);

        if self.active == Some(id) {
            self.active = if self.sessions.is_empty() {
                None
            } else {
                let neighbor = index.saturating_sub(1).min(self.sessions.len() - 1);
                Some(self.sessions[neighbor].id)
            };
        }
        Ok(())
    }

    /// Switches the visible tab. An in-progress gesture on the tab being left
    /// is cancelled; every other piece of its view state is kept as is.
    pub fn set_active(&mut self, id: SessionId) -> SessionResult<()> {
        self.index_of(id)?;
        self.activate(id);
        Ok(())
    }

    fn activate(&mut self, id: SessionId) {
        if self.active == Some(id) {
            return;
        }
        if let Some(previous) = self.active {
            if let Some(session) = self.session_mut(previous) {
                session.cancel_gesture();
            }
        }
        self.active = Some(id);
    }

    pub fn apply_theme_globally(&mut self, theme: ThemeId) {
        self.preferences.theme = theme;
    }

    /// Flips the process-wide theme and returns the new one.
    pub fn toggle_theme(&mut self) -> ThemeId {
        let theme = self.preferences.theme.toggled();
        self.apply_theme_globally(theme);
        theme
    }

    /// Sets or clears (`None`) a tab's own theme.
    pub fn set_theme_override(&mut self, id: SessionId, theme: Option<ThemeId>) -> SessionResult<()> {
        let session = self.session_mut(id).ok_or(SessionError::UnknownSession(id))?;
        session.view.theme_override = theme;
        Ok(())
    }

    pub fn effective_theme(&self, id: SessionId) -> SessionResult<ThemeId> {
        let session = self.session(id).ok_or(SessionError::UnknownSession(id))?;
        Ok(session.view.effective_theme(self.preferences.theme))
    }

    pub fn effective_font(&self, id: SessionId) -> SessionResult<FontFamily> {
        let session = self.session(id).ok_or(SessionError::UnknownSession(id))?;
        Ok(session.view.effective_font(self.preferences.font))
    }

    /// Toggles the active markdown tab between serif and sans-serif.
    pub fn toggle_font(&mut self) -> SessionResult<FontFamily> {
        let default = self.preferences.font;
        let session = self.active_mut()?;
        if session.kind != DocumentKind::Markdown {
            return Err(SessionError::FontUnsupported(session.id));
        }
        let font = session.view.effective_font(default).toggled();
        session.view.font_override = Some(font);
        Ok(font)
    }

    /// Sets the process-wide brightness, clamped to the supported range.
    pub fn set_brightness(&mut self, brightness: u8) -> u8 {
        self.preferences.brightness = clamp_brightness(brightness);
        self.preferences.brightness
    }

    /// Applies a zoom action to the active tab and returns the new factor.
    pub fn zoom(&mut self, action: ZoomAction) -> SessionResult<f32> {
        let bounds = self.preferences.zoom;
        let session = self.active_mut()?;
        apply_zoom_action(&mut session.view, action, &bounds);
        log::debug!("session {} zoom {:.2}", session.id, session.view.zoom);
        Ok(session.view.zoom)
    }

    /// Zooms the active PDF so the page at the top of the view spans the
    /// viewport width less [`FIT_WIDTH_MARGIN`]. The factor stays within
    /// [`FIT_WIDTH_RANGE`] and the configured zoom bounds. Tabs without a known
    /// page keep their zoom.
    pub fn fit_to_width(&mut self) -> SessionResult<f32> {
        let viewport = self.viewport;
        let bounds = self.preferences.zoom;
        let session = self.active_mut()?;
        let width = session
            .metrics
            .page_size(session.view.scroll.page_index)
            .or_else(|| session.metrics.page_size(0))
            .map(|size| size.width_pt)
            .filter(|width| *width > 0.0);
        let Some(width) = width.filter(|_| session.kind == DocumentKind::Pdf) else {
            return Ok(session.view.zoom);
        };

        let (low, high) = FIT_WIDTH_RANGE;
        let factor = ((viewport.width - FIT_WIDTH_MARGIN) / width).clamp(low, high);
        apply_zoom_action(&mut session.view, ZoomAction::Set(factor), &bounds);
        log::debug!("session {} fit to width {:.2}", session.id, session.view.zoom);
        Ok(session.view.zoom)
    }

    /// Moves the active tab to `position` with the fraction clamped to
    /// `0..=1`. On a known page the offset is also kept inside the scrollable
    /// range; positions on pages not laid out yet are stored as given.
    pub fn scroll_to(&mut self, position: ScrollPosition) -> SessionResult<()> {
        let viewport = self.viewport;
        let session = self.active_mut()?;
        let fraction = if position.fraction.is_finite() { position.fraction.clamp(0.0, 1.0) } else { 0.0 };
        let position = ScrollPosition { fraction, ..position };

        session.view.scroll = if session.metrics.contains_page(position.page_index) {
            let mapper = session.mapper(viewport);
            mapper.scroll_position_at(mapper.offset_for(position))
        } else {
            position
        };
        Ok(())
    }

    /// Scrolls the active tab by screen pixels, clamped to the content.
    pub fn scroll_by(&mut self, delta: f32) -> SessionResult<ScrollPosition> {
        let viewport = self.viewport;
        let session = self.active_mut()?;
        let mapper = session.mapper(viewport);
        let position = mapper.scroll_position_at(mapper.scroll_offset() + delta);
        session.view.scroll = position;
        Ok(position)
    }

    /// Scrolls so the top of 1-based `page` sits at the top of the view.
    /// Pages beyond the known count clamp to the last page.
    pub fn go_to_bookmark(&mut self, page: u32) -> SessionResult<()> {
        let session = self.active_mut()?;
        let last = session.metrics.page_count().saturating_sub(1);
        session.view.scroll = ScrollPosition::top_of(page.saturating_sub(1).min(last));
        Ok(())
    }

    /// Switches the active tab's tool. Any gesture made with the old tool is
    /// cancelled.
    pub fn set_tool_mode(&mut self, tool: ToolMode) -> SessionResult<()> {
        let session = self.active_mut()?;
        if tool != ToolMode::None && !session.kind.supports_annotations() {
            return Err(SessionError::AnnotationsUnsupported(session.id));
        }
        if session.view.tool != tool {
            session.cancel_gesture();
            session.view.tool = tool;
        }
        Ok(())
    }

    /// Stores the active tab's search query. An empty query closes search.
    pub fn set_search_query(&mut self, query: &str) -> SessionResult<()> {
        let session = self.active_mut()?;
        session.view.search_query = (!query.is_empty()).then(|| query.to_string());
        Ok(())
    }

    /// Adds a highlight to the active tab directly, bypassing pointer input.
    /// The page does not have to be known yet.
    pub fn add_highlight(&mut self, page_index: u32, rect: DocRect) -> SessionResult<AnnotationId> {
        let color = self.preferences.highlight_color;
        let session = self.active_mut()?;
        if !session.kind.supports_annotations() {
            return Err(SessionError::AnnotationsUnsupported(session.id));
        }
        Ok(session.store.add_highlight(page_index, rect, color))
    }

    /// Removes every annotation from the active tab, including one being
    /// drawn.
    pub fn clear_annotations(&mut self) -> SessionResult<()> {
        let session = self.active_mut()?;
        session.store.clear_all();
        session.overlay.reset();
        Ok(())
    }

    /// Routes a pointer event to the active tab's overlay.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> SessionResult<GestureOutcome> {
        let viewport = self.viewport;
        let style = AnnotationStyle::from(&self.preferences);
        let session = self.active_mut()?;
        if !session.kind.supports_annotations() {
            return Ok(GestureOutcome::Ignored);
        }
        let mapper = session.mapper(viewport);
        let tool = session.view.tool;
        Ok(session.overlay.handle_pointer(event, tool, &mapper, &mut session.store, &style))
    }

    /// Cancels the active tab's gesture, e.g. when the window loses focus.
    pub fn cancel_gesture(&mut self) -> SessionResult<bool> {
        Ok(self.active_mut()?.cancel_gesture())
    }

    /// Publishes page geometry for any tab. Annotations already stored on
    /// newly confirmed pages start painting on the next frame.
    pub fn update_page_metrics(&mut self, id: SessionId, metrics: PageMetrics) -> SessionResult<()> {
        let session = self.session_mut(id).ok_or(SessionError::UnknownSession(id))?;
        log::debug!(
            "session {id}: page metrics {} -> {} page(s)",
            session.metrics.page_count(),
            metrics.page_count()
        );
        session.metrics = metrics;
        Ok(())
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Builds the active tab's frame.
    pub fn paint(&self) -> SessionResult<Frame> {
        let session = self.active_session().ok_or(SessionError::NoActiveSession)?;
        let mapper = session.mapper(self.viewport);
        let pages = mapper
            .visible_pages()
            .into_iter()
            .filter_map(|page_index| {
                mapper.page_rect(page_index).map(|rect| PagePlacement { page_index, rect })
            })
            .collect();
        let primitives = if session.kind.supports_annotations() {
            session.overlay.paint(&mapper, &session.store)
        } else {
            Vec::new()
        };

        Ok(Frame {
            session: session.id,
            kind: session.kind,
            theme: session.view.effective_theme(self.preferences.theme),
            font: session.view.effective_font(self.preferences.font),
            zoom: session.view.zoom,
            dim_opacity: dim_opacity(self.preferences.brightness),
            pages,
            primitives,
        })
    }

    /// Runs a keyboard command. Commands that need the host shell are handed
    /// back as [`Dispatch::Shell`].
    pub fn execute(&mut self, command: Command) -> SessionResult<Dispatch> {
        match command {
            Command::OpenFile | Command::ShowSearch => return Ok(Dispatch::Shell(command)),
            Command::ToggleTheme => {
                self.toggle_theme();
            }
            Command::ZoomIn => {
                self.zoom(ZoomAction::In)?;
            }
            Command::ZoomOut => {
                self.zoom(ZoomAction::Out)?;
            }
            Command::ResetZoom => {
                self.zoom(ZoomAction::Reset)?;
            }
            Command::CloseSearch => self.set_search_query("")?,
        }
        Ok(Dispatch::Handled)
    }

    fn index_of(&self, id: SessionId) -> SessionResult<usize> {
        self.sessions
            .iter()
            .position(|session| session.id == id)
            .ok_or(SessionError::UnknownSession(id))
    }

    fn session_mut(&mut self, id: SessionId) -> Option<&mut DocumentSession> {
        self.sessions.iter_mut().find(|session| session.id == id)
    }

    fn active_mut(&mut self) -> SessionResult<&mut DocumentSession> {
        let id = self.active.ok_or(SessionError::NoActiveSession)?;
        self.session_mut(id).ok_or(SessionError::NoActiveSession)
    }
}
