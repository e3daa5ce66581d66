//! Scripted session replay.
//!
//! A script is a JSON object with an optional viewport and a list of steps,
//! each tagged by `op`. Steps run in order against one [`SessionManager`].
//! Session-level failures (no active tab, unsupported tool) are recorded in
//! the output and the script continues; malformed scripts and unreadable
//! files abort.

use anyhow::{Context, Result};
use doc_model::{DocumentKind, Preferences, ScrollPosition, ThemeId, ToolMode, ZoomAction};
use lumina_core::{
    command_for, command_for_wheel, Command, Dispatch, DocPoint, DocRect, DocumentLoader, Frame,
    GestureOutcome, KeyChord, PageMetrics, PointerEvent, SessionError, SessionManager, Viewport,
};
use pdf_engine::{default_engine, LopdfEngine, PageSize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Script {
    #[serde(default)]
    viewport: Option<ViewportSpec>,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct ViewportSpec {
    width: f32,
    height: f32,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Step {
    /// Opens a tab. With `load`, the file is read for page geometry and
    /// bookmarks; otherwise only the path is recorded.
    Open {
        path: PathBuf,
        #[serde(default)]
        kind: Option<DocumentKind>,
        #[serde(default)]
        load: bool,
    },
    OpenUntitled {
        kind: DocumentKind,
    },
    Close {
        session: u64,
    },
    Activate {
        session: u64,
    },
    /// Publishes page sizes `[width, height]` in points for a tab.
    Metrics {
        session: u64,
        pages: Vec<[f32; 2]>,
    },
    Viewport {
        width: f32,
        height: f32,
    },
    Tool {
        tool: ToolMode,
    },
    Down {
        x: f32,
        y: f32,
    },
    Move {
        x: f32,
        y: f32,
    },
    Up {
        x: f32,
        y: f32,
    },
    Cancel,
    Key {
        chord: String,
    },
    Wheel {
        delta_y: f32,
        #[serde(default)]
        ctrl: bool,
    },
    Zoom {
        factor: f32,
    },
    FitWidth,
    Scroll {
        by: f32,
    },
    ScrollTo {
        page_index: u32,
        #[serde(default)]
        fraction: f32,
    },
    Bookmark {
        page: u32,
    },
    Theme {
        theme: ThemeId,
    },
    ThemeOverride {
        session: u64,
        theme: Option<ThemeId>,
    },
    Font,
    Brightness {
        value: u8,
    },
    Search {
        query: String,
    },
    /// `rect` is `[left, top, right, bottom]` in normalized page coordinates.
    Highlight {
        page: u32,
        rect: [f32; 4],
    },
    Clear,
    Paint,
}

#[derive(Debug, Serialize)]
struct ReplayOutput {
    active: Option<u64>,
    theme: ThemeId,
    brightness: u8,
    sessions: Vec<SessionSummary>,
    frames: Vec<Frame>,
    /// Steps that changed nothing, as `step N: reason`.
    skipped: Vec<String>,
    /// Commands handed back to the host shell.
    shell: Vec<Command>,
}

#[derive(Debug, Serialize)]
struct SessionSummary {
    id: u64,
    title: String,
    kind: DocumentKind,
    page_count: u32,
    zoom: f32,
    scroll: ScrollPosition,
    tool: ToolMode,
    theme: ThemeId,
    search: Option<String>,
    annotation_count: usize,
    annotations_per_page: BTreeMap<u32, usize>,
    bookmark_count: usize,
}

struct Replayer {
    manager: SessionManager,
    loader: DocumentLoader<LopdfEngine>,
    base_dir: PathBuf,
    frames: Vec<Frame>,
    skipped: Vec<String>,
    shell: Vec<Command>,
}

pub fn run_script(path: &Path, preferences: Preferences) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    let script: Script = serde_json::from_str(&text)
        .with_context(|| format!("invalid replay script {}", path.display()))?;

    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut replayer = Replayer::new(preferences, base_dir);
    if let Some(viewport) = script.viewport {
        replayer.manager.set_viewport(Viewport::new(viewport.width, viewport.height));
    }

    for (index, step) in script.steps.into_iter().enumerate() {
        replayer.apply(index + 1, step)?;
    }

    let json = serde_json::to_string_pretty(&replayer.finish())?;
    println!("{json}");
    Ok(())
}

impl Replayer {
    fn new(preferences: Preferences, base_dir: PathBuf) -> Self {
        Self {
            manager: SessionManager::new(preferences),
            loader: DocumentLoader::new(default_engine()),
            base_dir,
            frames: Vec::new(),
            skipped: Vec::new(),
            shell: Vec::new(),
        }
    }

    fn apply(&mut self, number: usize, step: Step) -> Result<()> {
        log::debug!("step {number}: {step:?}");
        let result = match step {
            Step::Open { path, kind, load } => return self.open(number, path, kind, load),
            Step::OpenUntitled { kind } => {
                self.manager.open_untitled(kind);
                Ok(())
            }
            Step::Close { session } => self.manager.close_document(doc_model::SessionId(session)),
            Step::Activate { session } => self.manager.set_active(doc_model::SessionId(session)),
            Step::Metrics { session, pages } => {
                let sizes = pages
                    .into_iter()
                    .map(|[width_pt, height_pt]| PageSize { width_pt, height_pt })
                    .collect();
                self.manager.update_page_metrics(doc_model::SessionId(session), PageMetrics::new(sizes))
            }
            Step::Viewport { width, height } => {
                self.manager.set_viewport(Viewport::new(width, height));
                Ok(())
            }
            Step::Tool { tool } => self.manager.set_tool_mode(tool),
            Step::Down { x, y } => self.pointer(number, PointerEvent::Down { x, y }),
            Step::Move { x, y } => self.pointer(number, PointerEvent::Move { x, y }),
            Step::Up { x, y } => self.pointer(number, PointerEvent::Up { x, y }),
            Step::Cancel => self.pointer(number, PointerEvent::Cancel),
            Step::Key { chord } => {
                let parsed = KeyChord::parse(&chord)
                    .with_context(|| format!("step {number}: unrecognized key chord '{chord}'"))?;
                match command_for(parsed) {
                    Some(command) => self.command(command),
                    None => {
                        self.skipped.push(format!("step {number}: '{chord}' is not bound"));
                        Ok(())
                    }
                }
            }
            Step::Wheel { delta_y, ctrl } => match command_for_wheel(delta_y, ctrl) {
                Some(command) => self.command(command),
                None => self.manager.scroll_by(delta_y).map(|_| ()),
            },
            Step::Zoom { factor } => self.manager.zoom(ZoomAction::Set(factor)).map(|_| ()),
            Step::FitWidth => self.manager.fit_to_width().map(|_| ()),
            Step::Scroll { by } => self.manager.scroll_by(by).map(|_| ()),
            Step::ScrollTo { page_index, fraction } => {
                self.manager.scroll_to(ScrollPosition { page_index, fraction })
            }
            Step::Bookmark { page } => self.manager.go_to_bookmark(page),
            Step::Theme { theme } => {
                self.manager.apply_theme_globally(theme);
                Ok(())
            }
            Step::ThemeOverride { session, theme } => {
                self.manager.set_theme_override(doc_model::SessionId(session), theme)
            }
            Step::Font => self.manager.toggle_font().map(|_| ()),
            Step::Brightness { value } => {
                self.manager.set_brightness(value);
                Ok(())
            }
            Step::Search { query } => self.manager.set_search_query(&query),
            Step::Highlight { page, rect: [left, top, right, bottom] } => {
                let rect = DocRect::from_corners(DocPoint::new(left, top), DocPoint::new(right, bottom));
                self.manager.add_highlight(page, rect).map(|_| ())
            }
            Step::Clear => self.manager.clear_annotations(),
            Step::Paint => self.manager.paint().map(|frame| self.frames.push(frame)),
        };

        if let Err(err) = result {
            self.skip(number, &err);
        }
        Ok(())
    }

    fn open(&mut self, number: usize, path: PathBuf, kind: Option<DocumentKind>, load: bool) -> Result<()> {
        let path = if path.is_absolute() { path } else { self.base_dir.join(path) };
        if load {
            let document = self
                .loader
                .load(&path)
                .with_context(|| format!("step {number}: failed to open document"))?;
            self.manager.open_loaded(document);
            return Ok(());
        }

        let kind = kind
            .or_else(|| DocumentKind::from_path(&path))
            .with_context(|| format!("step {number}: cannot tell document kind of {}", path.display()))?;
        self.manager.open_document(path, kind);
        Ok(())
    }

    fn pointer(&mut self, number: usize, event: PointerEvent) -> Result<(), SessionError> {
        let outcome = self.manager.handle_pointer(event)?;
        if outcome == GestureOutcome::Ignored {
            self.skipped.push(format!("step {number}: pointer event ignored"));
        }
        Ok(())
    }

    fn command(&mut self, command: Command) -> Result<(), SessionError> {
        if let Dispatch::Shell(command) = self.manager.execute(command)? {
            self.shell.push(command);
        }
        Ok(())
    }

    fn skip(&mut self, number: usize, err: &SessionError) {
        log::debug!("step {number} skipped: {err}");
        self.skipped.push(format!("step {number}: {err}"));
    }

    fn finish(self) -> ReplayOutput {
        let manager = &self.manager;
        let sessions = manager
            .sessions()
            .iter()
            .map(|session| {
                let store = session.annotations();
                SessionSummary {
                    id: session.id().0,
                    title: session.title().to_string(),
                    kind: session.kind(),
                    page_count: session.metrics().page_count(),
                    zoom: session.view().zoom,
                    scroll: session.view().scroll,
                    tool: session.view().tool,
                    theme: session.view().effective_theme(manager.preferences().theme),
                    search: session.view().search_query.clone(),
                    annotation_count: store.len(),
                    annotations_per_page: store
                        .annotated_pages()
                        .map(|page| (page, store.annotations_for_page(page).len()))
                        .collect(),
                    bookmark_count: session.bookmarks().iter().map(lumina_core::Bookmark::count).sum(),
                }
            })
            .collect();

        ReplayOutput {
            active: manager.active_id().map(|id| id.0),
            theme: manager.preferences().theme,
            brightness: manager.preferences().brightness,
            sessions,
            frames: self.frames,
            skipped: self.skipped,
            shell: self.shell,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Script {
        serde_json::from_str(json).expect("script should parse")
    }

    fn replay(json: &str) -> ReplayOutput {
        let script = parse(json);
        let mut replayer = Replayer::new(Preferences::default(), PathBuf::new());
        if let Some(viewport) = script.viewport {
            replayer.manager.set_viewport(Viewport::new(viewport.width, viewport.height));
        }
        for (index, step) in script.steps.into_iter().enumerate() {
            replayer.apply(index + 1, step).expect("step should not abort");
        }
        replayer.finish()
    }

    #[test]
    fn pen_stroke_and_tab_switch() {
        let output = replay(
            r#"{
                "viewport": {"width": 1000, "height": 800},
                "steps": [
                    {"op": "open", "path": "/docs/a.pdf"},
                    {"op": "metrics", "session": 1, "pages": [[612, 792], [612, 792]]},
                    {"op": "tool", "tool": "pen"},
                    {"op": "down", "x": 300, "y": 300},
                    {"op": "move", "x": 320, "y": 310},
                    {"op": "up", "x": 320, "y": 310},
                    {"op": "down", "x": 300, "y": 400},
                    {"op": "move", "x": 330, "y": 420},
                    {"op": "open", "path": "/docs/b.md"},
                    {"op": "activate", "session": 1},
                    {"op": "paint"}
                ]
            }"#,
        );

        assert_eq!(output.active, Some(1));
        assert_eq!(output.sessions.len(), 2);
        assert_eq!(output.sessions[0].annotation_count, 1);
        assert_eq!(output.sessions[0].tool, ToolMode::Pen);
        assert_eq!(output.sessions[1].kind, DocumentKind::Markdown);
        assert_eq!(output.frames.len(), 1);
        assert_eq!(output.frames[0].primitives.len(), 1);
        assert!(output.skipped.is_empty(), "{:?}", output.skipped);
    }

    #[test]
    fn failures_are_recorded_not_fatal() {
        let output = replay(
            r#"{"steps": [
                {"op": "zoom", "factor": 2.0},
                {"op": "open", "path": "notes.md"},
                {"op": "tool", "tool": "highlight"},
                {"op": "key", "chord": "ctrl+o"},
                {"op": "key", "chord": "ctrl+="},
                {"op": "close", "session": 1},
                {"op": "paint"}
            ]}"#,
        );

        assert_eq!(output.skipped.len(), 3);
        assert!(output.skipped[0].contains("no active session"));
        assert!(output.skipped[1].contains("does not support annotations"));
        assert!(output.skipped[2].starts_with("step 7"));
        assert_eq!(output.shell, vec![Command::OpenFile]);
        assert!(output.sessions.is_empty());
        assert_eq!(output.active, None);
    }

    #[test]
    fn unknown_ops_fail_to_parse() {
        let result: Result<Script, _> = serde_json::from_str(r#"{"steps": [{"op": "explode"}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn fit_width_follows_viewport_and_scroll_is_clamped() {
        let output = replay(
            r#"{
                "viewport": {"width": 978, "height": 800},
                "steps": [
                    {"op": "fit_width"},
                    {"op": "open", "path": "wide.pdf"},
                    {"op": "metrics", "session": 1, "pages": [[612, 792], [612, 792]]},
                    {"op": "fit_width"},
                    {"op": "scroll_to", "page_index": 0, "fraction": 7.5}
                ]
            }"#,
        );

        assert_eq!(output.skipped.len(), 1);
        assert_eq!(output.sessions[0].zoom, 1.5);
        assert_eq!(output.sessions[0].scroll.page_index, 0);
        assert!(output.sessions[0].scroll.fraction <= 1.0);
    }

    #[test]
    fn deferred_highlight_shows_after_metrics() {
        let output = replay(
            r#"{"steps": [
                {"op": "open", "path": "late.pdf"},
                {"op": "highlight", "page": 2, "rect": [0.1, 0.1, 0.5, 0.2]},
                {"op": "bookmark", "page": 3},
                {"op": "paint"},
                {"op": "metrics", "session": 1, "pages": [[612, 792], [612, 792], [612, 792]]},
                {"op": "bookmark", "page": 3},
                {"op": "paint"}
            ]}"#,
        );

        assert!(output.frames[0].primitives.is_empty());
        assert_eq!(output.frames[1].primitives.len(), 1);
        assert_eq!(output.sessions[0].annotations_per_page.get(&2), Some(&1));
    }
}
