//! Bookmark tree built from a document's flattened outline.

use pdf_engine::OutlineEntry;
use serde::Serialize;

/// Documents without an outline get one bookmark per page, up to this many.
pub const MAX_FALLBACK_BOOKMARKS: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bookmark {
    pub title: String,
    /// 1-based target page.
    pub page: u32,
    pub level: u32,
    pub children: Vec<Bookmark>,
}

impl Bookmark {
    fn leaf(entry: &OutlineEntry) -> Self {
        Self { title: entry.title.clone(), page: entry.page, level: entry.level, children: Vec::new() }
    }

    /// Number of bookmarks in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Bookmark::count).sum::<usize>()
    }
}

/// Nests a depth-first `(level, title, page)` list into a tree.
///
/// An entry becomes a child of the closest preceding entry with a lower
/// level. Level-1 entries, and entries with no shallower predecessor, are
/// roots. Skipped levels attach to the nearest available ancestor.
pub fn build_bookmark_tree(entries: &[OutlineEntry]) -> Vec<Bookmark> {
    let mut roots: Vec<Bookmark> = Vec::new();
    // Child indices from the roots down to the most recent entry.
    let mut path: Vec<usize> = Vec::new();

    for entry in entries {
        let bookmark = Bookmark::leaf(entry);
        let depth = (entry.level.max(1) - 1) as usize;
        path.truncate(depth.min(path.len()));

        match node_at(&mut roots, &path) {
            Some(parent) => {
                parent.children.push(bookmark);
                let index = parent.children.len() - 1;
                path.push(index);
            }
            None => {
                roots.push(bookmark);
                path = vec![roots.len() - 1];
            }
        }
    }

    roots
}

fn node_at<'a>(roots: &'a mut [Bookmark], path: &[usize]) -> Option<&'a mut Bookmark> {
    let (first, rest) = path.split_first()?;
    let mut node = roots.get_mut(*first)?;
    for &index in rest {
        node = node.children.get_mut(index)?;
    }
    Some(node)
}

/// "Page N" bookmarks for the first pages of a document without an outline.
pub fn page_bookmarks(page_count: u32) -> Vec<Bookmark> {
    (1..=page_count.min(MAX_FALLBACK_BOOKMARKS))
        .map(|page| Bookmark { title: format!("Page {page}"), page, level: 1, children: Vec::new() })
        .collect()
}

/// Bookmark tree for a document, falling back to per-page entries.
pub fn bookmarks_for(entries: &[OutlineEntry], page_count: u32) -> Vec<Bookmark> {
    if entries.is_empty() {
        page_bookmarks(page_count)
    } else {
        build_bookmark_tree(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(level: u32, title: &str, page: u32) -> OutlineEntry {
        OutlineEntry { level, title: title.to_string(), page }
    }

    fn titles(bookmarks: &[Bookmark]) -> Vec<&str> {
        bookmarks.iter().map(|bookmark| bookmark.title.as_str()).collect()
    }

    #[test]
    fn nests_by_level() {
        let tree = build_bookmark_tree(&[
            entry(1, "Intro", 1),
            entry(1, "Methods", 2),
            entry(2, "Setup", 2),
            entry(3, "Hardware", 2),
            entry(2, "Runs", 3),
            entry(1, "Results", 4),
        ]);

        assert_eq!(titles(&tree), vec!["Intro", "Methods", "Results"]);
        assert_eq!(titles(&tree[1].children), vec!["Setup", "Runs"]);
        assert_eq!(titles(&tree[1].children[0].children), vec!["Hardware"]);
        assert_eq!(tree.iter().map(Bookmark::count).sum::<usize>(), 6);
    }

    #[test]
    fn skipped_levels_attach_to_nearest_ancestor() {
        let tree = build_bookmark_tree(&[entry(1, "Part", 1), entry(3, "Deep", 2), entry(2, "Mid", 3)]);
        assert_eq!(titles(&tree[0].children), vec!["Deep", "Mid"]);
        assert_eq!(tree[0].children[0].level, 3);
    }

    #[test]
    fn orphan_entries_become_roots() {
        let tree = build_bookmark_tree(&[entry(2, "Orphan", 1), entry(3, "Child", 1)]);
        assert_eq!(titles(&tree), vec!["Orphan"]);
        assert_eq!(titles(&tree[0].children), vec!["Child"]);
    }

    #[test]
    fn fallback_lists_pages_up_to_cap() {
        let few = bookmarks_for(&[], 3);
        assert_eq!(titles(&few), vec!["Page 1", "Page 2", "Page 3"]);
        assert_eq!(few[2].page, 3);

        assert_eq!(page_bookmarks(400).len(), 50);
        assert!(page_bookmarks(0).is_empty());
    }
}
