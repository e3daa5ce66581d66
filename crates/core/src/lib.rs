//! Lumina core library
//!
//! Per-tab view state, annotation storage and pointer-gesture handling for
//! the document viewer. Rendering of page content is left to the host.

pub mod annotation;
pub mod coordinates;
pub mod geometry;
pub mod keymap;
pub mod loader;
pub mod outline;
pub mod overlay;
pub mod session;
pub mod stats;

pub use annotation::{
    Annotation, AnnotationError, AnnotationId, AnnotationResult, AnnotationStore,
    InProgressStroke, StrokeHandle,
};
pub use coordinates::{CoordinateMapper, PageMetrics, Viewport, PAGE_GAP};
pub use geometry::{DocPoint, DocRect, PageHit, ScreenPoint, ScreenRect};
pub use keymap::{command_for, command_for_wheel, Command, Dispatch, Key, KeyChord};
pub use loader::{DocumentLoader, LoadError, LoadResult, LoadedDocument};
pub use outline::{build_bookmark_tree, bookmarks_for, page_bookmarks, Bookmark};
pub use overlay::{AnnotationStyle, GestureOutcome, OverlayPrimitive, PointerEvent, RenderOverlay};
pub use session::{
    DocumentSession, Frame, PagePlacement, SessionError, SessionManager, SessionResult,
};
pub use stats::{count_markdown_words, format_file_size};
