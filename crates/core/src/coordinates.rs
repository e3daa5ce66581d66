//! Screen <-> document coordinate mapping
//!
//! Pages are stacked vertically with a fixed gap and centered horizontally in
//! the viewport. One PDF point maps to `zoom` screen pixels. The vertical
//! scroll offset is derived from the zoom-independent [`ScrollPosition`], so
//! a zoom change keeps the same page region under the top edge.

use crate::geometry::{DocPoint, PageHit, ScreenPoint, ScreenRect};
use doc_model::ScrollPosition;
use pdf_engine::PageSize;

/// Gap between stacked pages, and above the first page, in screen pixels.
pub const PAGE_GAP: f32 = 20.0;

/// Confirmed page geometry of a document.
///
/// Until the host reports a page, it is unknown to the mapper: points on it
/// cannot be mapped and annotations on it are not painted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetrics {
    pages: Vec<PageSize>,
}

impl PageMetrics {
    pub fn new(pages: Vec<PageSize>) -> Self {
        Self { pages }
    }

    /// Single continuous "page" for reflowed content such as markdown.
    pub fn continuous(size: PageSize) -> Self {
        Self { pages: vec![size] }
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn page_size(&self, page_index: u32) -> Option<PageSize> {
        self.pages.get(page_index as usize).copied()
    }

    pub fn contains_page(&self, page_index: u32) -> bool {
        (page_index as usize) < self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Visible area of the document view in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1024.0, height: 768.0 }
    }
}

/// Page placement in content space (screen pixels before scrolling).
#[derive(Debug, Clone, Copy, PartialEq)]
struct PageLayout {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl PageLayout {
    fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Snapshot mapping for one session's metrics, zoom, scroll and viewport.
///
/// `to_document_space` and `to_screen_space` are exact inverses for every
/// point that lies on a known page.
#[derive(Debug, Clone)]
pub struct CoordinateMapper {
    layouts: Vec<PageLayout>,
    zoom: f32,
    scroll_offset: f32,
    viewport: Viewport,
    content_height: f32,
}

impl CoordinateMapper {
    pub fn new(metrics: &PageMetrics, zoom: f32, scroll: ScrollPosition, viewport: Viewport) -> Self {
        let mut layouts = Vec::with_capacity(metrics.pages.len());
        let mut y = PAGE_GAP;
        for size in &metrics.pages {
            let width = size.width_pt.max(0.0) * zoom;
            let height = size.height_pt.max(0.0) * zoom;
            let x = ((viewport.width - width) / 2.0).max(PAGE_GAP);
            layouts.push(PageLayout { x, y, width, height });
            y += height + PAGE_GAP;
        }

        let mut mapper = Self { layouts, zoom, scroll_offset: 0.0, viewport, content_height: y };
        mapper.scroll_offset = mapper.offset_for(scroll);
        mapper
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Total stacked height including gaps, in screen pixels.
    pub fn content_height(&self) -> f32 {
        self.content_height
    }

    /// Vertical scroll offset in content pixels.
    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    pub fn max_scroll_offset(&self) -> f32 {
        (self.content_height - self.viewport.height).max(0.0)
    }

    /// Content-pixel offset of a scroll position. Positions on unknown pages
    /// fall back to the top of the document.
    pub fn offset_for(&self, scroll: ScrollPosition) -> f32 {
        match self.layouts.get(scroll.page_index as usize) {
            Some(layout) => layout.y + scroll.fraction * layout.height,
            None => 0.0,
        }
    }

    /// Inverse of [`offset_for`](Self::offset_for), after clamping the offset
    /// to the scrollable range.
    pub fn scroll_position_at(&self, offset: f32) -> ScrollPosition {
        let offset = offset.clamp(0.0, self.max_scroll_offset());
        if self.layouts.is_empty() {
            return ScrollPosition::default();
        }
        let index = self.layouts.iter().rposition(|layout| layout.y <= offset).unwrap_or(0);

        let layout = self.layouts[index];
        let fraction = if layout.height > 0.0 { (offset - layout.y) / layout.height } else { 0.0 };
        ScrollPosition { page_index: index as u32, fraction }
    }

    /// Screen rectangle of a known page, whether or not it is visible.
    pub fn page_rect(&self, page_index: u32) -> Option<ScreenRect> {
        let layout = self.layouts.get(page_index as usize)?;
        Some(ScreenRect::new(layout.x, layout.y - self.scroll_offset, layout.width, layout.height))
    }

    /// Known pages intersecting the viewport, top to bottom.
    pub fn visible_pages(&self) -> Vec<u32> {
        let top = self.scroll_offset;
        let bottom = top + self.viewport.height;
        self.layouts
            .iter()
            .enumerate()
            .filter(|(_, layout)| !layout.is_degenerate())
            .filter(|(_, layout)| layout.y < bottom && layout.y + layout.height > top)
            .map(|(index, _)| index as u32)
            .collect()
    }

    /// Maps a screen point onto the page under it. Points in gaps, margins or
    /// beyond the last known page hit nothing.
    pub fn to_document_space(&self, point: ScreenPoint) -> Option<PageHit> {
        let content_y = point.y + self.scroll_offset;
        self.layouts.iter().enumerate().find_map(|(index, layout)| {
            if layout.is_degenerate() {
                return None;
            }
            let inside = point.x >= layout.x
                && point.x <= layout.x + layout.width
                && content_y >= layout.y
                && content_y <= layout.y + layout.height;
            inside.then(|| PageHit {
                page_index: index as u32,
                point: DocPoint::new(
                    (point.x - layout.x) / layout.width,
                    (content_y - layout.y) / layout.height,
                ),
            })
        })
    }

    /// Projects a screen point into a specific page's normalized space without
    /// clamping. Used to follow a gesture that wanders off its page.
    pub fn project_onto_page(&self, page_index: u32, point: ScreenPoint) -> Option<DocPoint> {
        let layout = self.layouts.get(page_index as usize)?;
        if layout.is_degenerate() {
            return None;
        }
        let content_y = point.y + self.scroll_offset;
        Some(DocPoint::new((point.x - layout.x) / layout.width, (content_y - layout.y) / layout.height))
    }

    pub fn to_screen_space(&self, page_index: u32, point: DocPoint) -> Option<ScreenPoint> {
        let layout = self.layouts.get(page_index as usize)?;
        Some(ScreenPoint::new(
            layout.x + point.x * layout.width,
            layout.y + point.y * layout.height - self.scroll_offset,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter_pages(count: usize) -> PageMetrics {
        PageMetrics::new(vec![PageSize::default(); count])
    }

    fn close(a: ScreenPoint, b: ScreenPoint) -> bool {
        (a.x - b.x).abs() < 1e-2 && (a.y - b.y).abs() < 1e-2
    }

    #[test]
    fn pages_are_stacked_and_centered() {
        let mapper = CoordinateMapper::new(
            &letter_pages(2),
            1.0,
            ScrollPosition::default(),
            Viewport::new(1000.0, 800.0),
        );

        assert_eq!(mapper.page_rect(0), Some(ScreenRect::new(194.0, 20.0, 612.0, 792.0)));
        assert_eq!(mapper.page_rect(1), Some(ScreenRect::new(194.0, 832.0, 612.0, 792.0)));
        assert_eq!(mapper.content_height(), 20.0 + 2.0 * (792.0 + 20.0));
        assert_eq!(mapper.page_rect(2), None);
    }

    #[test]
    fn screen_document_round_trip_across_zoom_and_scroll() {
        let metrics = PageMetrics::new(vec![
            PageSize { width_pt: 612.0, height_pt: 792.0 },
            PageSize { width_pt: 400.0, height_pt: 300.0 },
        ]);
        let viewport = Viewport::new(900.0, 700.0);

        for zoom in [0.5, 1.0, 1.7, 3.0] {
            for scroll in [
                ScrollPosition::default(),
                ScrollPosition { page_index: 0, fraction: 0.4 },
                ScrollPosition { page_index: 1, fraction: 0.1 },
            ] {
                let mapper = CoordinateMapper::new(&metrics, zoom, scroll, viewport);
                for page_index in 0..2 {
                    let rect = mapper.page_rect(page_index).expect("known page");
                    let probe =
                        ScreenPoint::new(rect.x + rect.width * 0.3, rect.y + rect.height * 0.6);
                    let hit = mapper.to_document_space(probe).expect("probe is on a page");
                    assert_eq!(hit.page_index, page_index);
                    let back = mapper.to_screen_space(hit.page_index, hit.point).expect("known");
                    assert!(close(back, probe), "zoom {zoom}: {back:?} != {probe:?}");
                }
            }
        }
    }

    #[test]
    fn points_off_pages_map_to_nothing() {
        let mapper = CoordinateMapper::new(
            &letter_pages(1),
            1.0,
            ScrollPosition::default(),
            Viewport::new(1000.0, 800.0),
        );

        assert_eq!(mapper.to_document_space(ScreenPoint::new(500.0, 5.0)), None);
        assert_eq!(mapper.to_document_space(ScreenPoint::new(10.0, 100.0)), None);
        assert!(mapper.to_document_space(ScreenPoint::new(500.0, 100.0)).is_some());
    }

    #[test]
    fn document_coordinates_are_zoom_independent() {
        let metrics = letter_pages(1);
        let viewport = Viewport::new(2000.0, 2000.0);
        let at_one = CoordinateMapper::new(&metrics, 1.0, ScrollPosition::default(), viewport);
        let at_two = CoordinateMapper::new(&metrics, 2.0, ScrollPosition::default(), viewport);

        let doc = DocPoint::new(0.25, 0.5);
        let a = at_one.to_screen_space(0, doc).expect("known page");
        let b = at_two.to_screen_space(0, doc).expect("known page");
        assert_ne!(a, b);
        assert_eq!(at_one.to_document_space(a).map(|hit| hit.point), Some(doc));
        assert_eq!(at_two.to_document_space(b).map(|hit| hit.point), Some(doc));
    }

    #[test]
    fn scroll_position_inverts_offset() {
        let mapper = CoordinateMapper::new(
            &letter_pages(3),
            1.5,
            ScrollPosition::default(),
            Viewport::new(800.0, 600.0),
        );
        let position = mapper.scroll_position_at(1500.0);
        assert_eq!(position.page_index, 1);
        assert!((mapper.offset_for(position) - 1500.0).abs() < 1e-3);

        let top = mapper.scroll_position_at(-50.0);
        assert_eq!(top.page_index, 0);
        assert!(mapper.offset_for(top).abs() < 1e-3);
        let bottom = mapper.scroll_position_at(f32::MAX);
        assert!((mapper.offset_for(bottom) - mapper.max_scroll_offset()).abs() < 1e-2);
    }

    #[test]
    fn only_pages_in_viewport_are_visible() {
        let metrics = letter_pages(5);
        let viewport = Viewport::new(800.0, 600.0);
        let top = CoordinateMapper::new(&metrics, 1.0, ScrollPosition::default(), viewport);
        assert_eq!(top.visible_pages(), vec![0]);

        let straddling =
            CoordinateMapper::new(&metrics, 1.0, ScrollPosition { page_index: 1, fraction: 0.9 }, viewport);
        assert_eq!(straddling.visible_pages(), vec![1, 2]);
    }

    #[test]
    fn unknown_scroll_page_falls_back_to_top() {
        let mapper = CoordinateMapper::new(
            &letter_pages(1),
            1.0,
            ScrollPosition::top_of(7),
            Viewport::default(),
        );
        assert_eq!(mapper.scroll_offset(), 0.0);
    }
}
