//! Per-session annotation store
//!
//! Committed annotations are kept per page in insertion order. At most one
//! stroke may be in progress at a time. It is invisible to
//! [`AnnotationStore::annotations_for_page`] until committed.
//! All coordinates are normalized page coordinates (see [`crate::geometry`]).

use crate::geometry::{DocPoint, DocRect};
use doc_model::Color;
use serde::Serialize;
use std::collections::BTreeMap;

/// Unique identifier for a committed annotation.
pub type AnnotationId = uuid::Uuid;

/// Identifies the in-progress stroke that `begin_stroke` opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct StrokeHandle(u64);

impl std::fmt::Display for StrokeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stroke-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    Highlight {
        id: AnnotationId,
        page_index: u32,
        rect: DocRect,
        color: Color,
    },
    /// Freehand polyline. `width` is in PDF points.
    Stroke {
        id: AnnotationId,
        page_index: u32,
        points: Vec<DocPoint>,
        color: Color,
        width: f32,
    },
}

impl Annotation {
    pub fn id(&self) -> AnnotationId {
        match self {
            Self::Highlight { id, .. } | Self::Stroke { id, .. } => *id,
        }
    }

    pub fn page_index(&self) -> u32 {
        match self {
            Self::Highlight { page_index, .. } | Self::Stroke { page_index, .. } => *page_index,
        }
    }
}

/// A stroke between `begin_stroke` and `commit_stroke`.
#[derive(Debug, Clone, PartialEq)]
pub struct InProgressStroke {
    pub handle: StrokeHandle,
    pub page_index: u32,
    pub points: Vec<DocPoint>,
    pub color: Color,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnnotationError {
    #[error("a stroke is already in progress ({0})")]
    GestureInProgress(StrokeHandle),
    #[error("invalid gesture handle {0}")]
    InvalidGestureHandle(StrokeHandle),
}

pub type AnnotationResult<T> = Result<T, AnnotationError>;

/// Strokes with fewer points than this are dropped on commit.
pub const MIN_STROKE_POINTS: usize = 2;

#[derive(Debug, Default)]
pub struct AnnotationStore {
    pages: BTreeMap<u32, Vec<Annotation>>,
    in_progress: Option<InProgressStroke>,
    next_handle: u64,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a stroke on `page_index` starting at `point`.
    pub fn begin_stroke(
        &mut self,
        page_index: u32,
        point: DocPoint,
        color: Color,
        width: f32,
    ) -> AnnotationResult<StrokeHandle> {
        if let Some(stroke) = &self.in_progress {
            return Err(AnnotationError::GestureInProgress(stroke.handle));
        }
        self.next_handle += 1;
        let handle = StrokeHandle(self.next_handle);
        self.in_progress =
            Some(InProgressStroke { handle, page_index, points: vec![point], color, width });
        Ok(handle)
    }

    pub fn append_point(&mut self, handle: StrokeHandle, point: DocPoint) -> AnnotationResult<()> {
        self.append_points(handle, std::iter::once(point))
    }

    /// Appends a batch of points in order.
    pub fn append_points(
        &mut self,
        handle: StrokeHandle,
        points: impl IntoIterator<Item = DocPoint>,
    ) -> AnnotationResult<()> {
        let stroke = self.stroke_mut(handle)?;
        stroke.points.extend(points);
        Ok(())
    }

    /// Moves the in-progress stroke into the committed set. Returns `None` if
    /// the stroke was too short to keep; the handle is spent either way.
    pub fn commit_stroke(&mut self, handle: StrokeHandle) -> AnnotationResult<Option<AnnotationId>> {
        self.stroke_mut(handle)?;
        let Some(stroke) = self.in_progress.take() else {
            return Err(AnnotationError::InvalidGestureHandle(handle));
        };

        if stroke.points.len() < MIN_STROKE_POINTS {
            log::debug!("discarding {} with {} point(s)", stroke.handle, stroke.points.len());
            return Ok(None);
        }

        let id = AnnotationId::new_v4();
        self.insert(Annotation::Stroke {
            id,
            page_index: stroke.page_index,
            points: stroke.points,
            color: stroke.color,
            width: stroke.width,
        });
        Ok(Some(id))
    }

    /// Drops the in-progress stroke without committing. Returns whether one
    /// existed.
    pub fn discard_in_progress(&mut self) -> bool {
        self.in_progress.take().is_some()
    }

    pub fn add_highlight(&mut self, page_index: u32, rect: DocRect, color: Color) -> AnnotationId {
        let id = AnnotationId::new_v4();
        self.insert(Annotation::Highlight { id, page_index, rect, color });
        id
    }

    /// Removes every committed annotation and any in-progress stroke.
    pub fn clear_all(&mut self) {
        self.pages.clear();
        self.in_progress = None;
    }

    /// Committed annotations on a page, oldest first.
    pub fn annotations_for_page(&self, page_index: u32) -> &[Annotation] {
        self.pages.get(&page_index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn in_progress(&self) -> Option<&InProgressStroke> {
        self.in_progress.as_ref()
    }

    /// Pages that hold at least one committed annotation, ascending.
    pub fn annotated_pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.pages.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    fn insert(&mut self, annotation: Annotation) {
        self.pages.entry(annotation.page_index()).or_default().push(annotation);
    }

    fn stroke_mut(&mut self, handle: StrokeHandle) -> AnnotationResult<&mut InProgressStroke> {
        match self.in_progress.as_mut() {
            Some(stroke) if stroke.handle == handle => Ok(stroke),
            _ => Err(AnnotationError::InvalidGestureHandle(handle)),
        }
    }
}
