//! Pointer gesture state machine and annotation painting
//!
//! The overlay is `Idle` or `Drawing`. A pointer-down on a page with a drawing
//! tool active starts a gesture, moves extend it, pointer-up commits it, and
//! cancellation drops it without touching committed annotations.

use crate::annotation::{Annotation, AnnotationId, AnnotationStore, StrokeHandle};
use crate::coordinates::CoordinateMapper;
use crate::geometry::{DocPoint, DocRect, ScreenPoint, ScreenRect};
use doc_model::{Color, Preferences, ToolMode};
use serde::{Deserialize, Serialize};

/// Pen moves are buffered and flushed to the store in batches of this size.
const COALESCE_LIMIT: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up { x: f32, y: f32 },
    Cancel,
}

/// Colors and widths used for new annotations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationStyle {
    pub highlight_color: Color,
    pub pen_color: Color,
    pub pen_width: f32,
}

impl From<&Preferences> for AnnotationStyle {
    fn from(prefs: &Preferences) -> Self {
        Self {
            highlight_color: prefs.highlight_color,
            pen_color: prefs.pen_color,
            pen_width: prefs.pen_width,
        }
    }
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self::from(&Preferences::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureOutcome {
    /// The event did not apply in the current state.
    Ignored,
    Started,
    Extended,
    Committed(AnnotationId),
    /// The gesture ended but produced nothing worth keeping.
    Discarded,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
enum Gesture {
    Pen { handle: StrokeHandle, page_index: u32, pending: Vec<DocPoint> },
    Highlight { page_index: u32, anchor: DocPoint, current: DocPoint, color: Color },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverlayPrimitive {
    Rectangle { rect: ScreenRect, color: Color },
    Polyline { points: Vec<ScreenPoint>, color: Color, width: f32 },
}

#[derive(Debug, Default)]
pub struct RenderOverlay {
    gesture: Option<Gesture>,
}

impl RenderOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_drawing(&self) -> bool {
        self.gesture.is_some()
    }

    /// Page the current gesture is anchored to.
    pub fn gesture_page(&self) -> Option<u32> {
        match self.gesture.as_ref()? {
            Gesture::Pen { page_index, .. } | Gesture::Highlight { page_index, .. } => {
                Some(*page_index)
            }
        }
    }

    pub fn handle_pointer(
        &mut self,
        event: PointerEvent,
        tool: ToolMode,
        mapper: &CoordinateMapper,
        store: &mut AnnotationStore,
        style: &AnnotationStyle,
    ) -> GestureOutcome {
        match event {
            PointerEvent::Down { x, y } => {
                self.pointer_down(ScreenPoint::new(x, y), tool, mapper, store, style)
            }
            PointerEvent::Move { x, y } => self.pointer_move(ScreenPoint::new(x, y), mapper, store),
            PointerEvent::Up { x, y } => self.pointer_up(ScreenPoint::new(x, y), mapper, store),
            PointerEvent::Cancel => {
                if self.cancel(store) {
                    GestureOutcome::Cancelled
                } else {
                    GestureOutcome::Ignored
                }
            }
        }
    }

    fn pointer_down(
        &mut self,
        point: ScreenPoint,
        tool: ToolMode,
        mapper: &CoordinateMapper,
        store: &mut AnnotationStore,
        style: &AnnotationStyle,
    ) -> GestureOutcome {
        if self.gesture.is_some() || tool == ToolMode::None {
            return GestureOutcome::Ignored;
        }
        let Some(hit) = mapper.to_document_space(point) else {
            return GestureOutcome::Ignored;
        };

        match tool {
            ToolMode::Pen => {
                match store.begin_stroke(hit.page_index, hit.point, style.pen_color, style.pen_width) {
                    Ok(handle) => {
                        self.gesture =
                            Some(Gesture::Pen { handle, page_index: hit.page_index, pending: Vec::new() });
                    }
                    Err(err) => {
                        log::warn!("pen gesture not started: {err}");
                        return GestureOutcome::Ignored;
                    }
                }
            }
            ToolMode::Highlight => {
                self.gesture = Some(Gesture::Highlight {
                    page_index: hit.page_index,
                    anchor: hit.point,
                    current: hit.point,
                    color: style.highlight_color,
                });
            }
            ToolMode::None => return GestureOutcome::Ignored,
        }
        GestureOutcome::Started
    }

    fn pointer_move(
        &mut self,
        point: ScreenPoint,
        mapper: &CoordinateMapper,
        store: &mut AnnotationStore,
    ) -> GestureOutcome {
        let Some(page_index) = self.gesture_page() else {
            return GestureOutcome::Ignored;
        };
        // The anchor page can disappear if the host shrinks the page count
        // mid-gesture; the gesture then holds still until released.
        let Some(doc) = mapper.project_onto_page(page_index, point).map(DocPoint::clamped) else {
            return GestureOutcome::Ignored;
        };

        let mut flush = false;
        match self.gesture.as_mut() {
            Some(Gesture::Pen { pending, .. }) => {
                pending.push(doc);
                flush = pending.len() >= COALESCE_LIMIT;
            }
            Some(Gesture::Highlight { current, .. }) => *current = doc,
            None => return GestureOutcome::Ignored,
        }
        if flush {
            self.flush(store);
        }
        GestureOutcome::Extended
    }

    fn pointer_up(
        &mut self,
        point: ScreenPoint,
        mapper: &CoordinateMapper,
        store: &mut AnnotationStore,
    ) -> GestureOutcome {
        self.flush(store);
        match self.gesture.take() {
            None => GestureOutcome::Ignored,
            Some(Gesture::Pen { handle, .. }) => match store.commit_stroke(handle) {
                Ok(Some(id)) => GestureOutcome::Committed(id),
                Ok(None) => GestureOutcome::Discarded,
                Err(err) => {
                    log::warn!("pen gesture lost: {err}");
                    GestureOutcome::Discarded
                }
            },
            Some(Gesture::Highlight { page_index, anchor, current, color }) => {
                let end = mapper
                    .project_onto_page(page_index, point)
                    .map(DocPoint::clamped)
                    .unwrap_or(current);
                let rect = DocRect::from_corners(anchor, end);
                if rect.is_empty() {
                    log::debug!("discarding zero-area highlight on page {page_index}");
                    return GestureOutcome::Discarded;
                }
                GestureOutcome::Committed(store.add_highlight(page_index, rect, color))
            }
        }
    }

    /// Pushes buffered pen points into the store.
    pub fn flush(&mut self, store: &mut AnnotationStore) {
        if let Some(Gesture::Pen { handle, pending, .. }) = self.gesture.as_mut() {
            if pending.is_empty() {
                return;
            }
            if let Err(err) = store.append_points(*handle, pending.drain(..)) {
                log::warn!("dropping buffered pen points: {err}");
                self.gesture = None;
            }
        }
    }

    /// Abandons the current gesture. Committed annotations are untouched.
    /// Returns whether a gesture was in progress.
    pub fn cancel(&mut self, store: &mut AnnotationStore) -> bool {
        match self.gesture.take() {
            Some(Gesture::Pen { .. }) => {
                store.discard_in_progress();
                true
            }
            Some(Gesture::Highlight { .. }) => true,
            None => false,
        }
    }

    /// Forgets the gesture after the store was cleared underneath it.
    pub(crate) fn reset(&mut self) {
        self.gesture = None;
    }

    /// Committed annotations on visible known pages, then the live gesture
    /// preview, all in screen space. Annotations on pages the mapper does not
    /// know yet are skipped.
    pub fn paint(&self, mapper: &CoordinateMapper, store: &AnnotationStore) -> Vec<OverlayPrimitive> {
        let mut primitives = Vec::new();
        for page_index in mapper.visible_pages() {
            for annotation in store.annotations_for_page(page_index) {
                let primitive = match annotation {
                    Annotation::Highlight { rect, color, .. } => {
                        highlight_primitive(mapper, page_index, rect, *color)
                    }
                    Annotation::Stroke { points, color, width, .. } => {
                        stroke_primitive(mapper, page_index, points.iter().copied(), *color, *width)
                    }
                };
                primitives.extend(primitive);
            }
        }

        match &self.gesture {
            Some(Gesture::Pen { page_index, pending, .. }) => {
                if let Some(stroke) = store.in_progress() {
                    let points = stroke.points.iter().chain(pending.iter()).copied();
                    primitives.extend(stroke_primitive(
                        mapper,
                        *page_index,
                        points,
                        stroke.color,
                        stroke.width,
                    ));
                }
            }
            Some(Gesture::Highlight { page_index, anchor, current, color }) => {
                let rect = DocRect::from_corners(*anchor, *current);
                if !rect.is_empty() {
                    primitives.extend(highlight_primitive(mapper, *page_index, &rect, *color));
                }
            }
            None => {}
        }
        primitives
    }
}

fn highlight_primitive(
    mapper: &CoordinateMapper,
    page_index: u32,
    rect: &DocRect,
    color: Color,
) -> Option<OverlayPrimitive> {
    let top_left = mapper.to_screen_space(page_index, rect.top_left())?;
    let bottom_right = mapper.to_screen_space(page_index, rect.bottom_right())?;
    Some(OverlayPrimitive::Rectangle {
        rect: ScreenRect::new(
            top_left.x,
            top_left.y,
            bottom_right.x - top_left.x,
            bottom_right.y - top_left.y,
        ),
        color,
    })
}

fn stroke_primitive(
    mapper: &CoordinateMapper,
    page_index: u32,
    points: impl Iterator<Item = DocPoint>,
    color: Color,
    width: f32,
) -> Option<OverlayPrimitive> {
    let points = points
        .map(|point| mapper.to_screen_space(page_index, point))
        .collect::<Option<Vec<_>>>()?;
    Some(OverlayPrimitive::Polyline { points, color, width: width * mapper.zoom() })
}
