//! Document loader
//!
//! Reads just enough of a file to open a session: kind, page geometry and
//! bookmarks for PDFs, and a word count for markdown. Page rendering and
//! markdown layout belong to the host.

use crate::coordinates::PageMetrics;
use crate::outline::{bookmarks_for, Bookmark};
use crate::stats::count_markdown_words;
use doc_model::DocumentKind;
use pdf_engine::{OpenSource, PageSize, PdfEngine, PdfEngineError};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("unsupported file type: {} (expected .md, .markdown or .pdf)", .0.display())]
    UnsupportedKind(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open PDF {}: {source}", path.display())]
    Pdf {
        path: PathBuf,
        #[source]
        source: PdfEngineError,
    },
}

pub type LoadResult<T> = Result<T, LoadError>;

/// Everything a session needs from the file at open time.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub kind: DocumentKind,
    pub title: String,
    pub file_size: u64,
    pub metrics: PageMetrics,
    pub bookmarks: Vec<Bookmark>,
    /// Markdown only.
    pub word_count: Option<usize>,
}

impl LoadedDocument {
    pub fn page_count(&self) -> u32 {
        self.metrics.page_count()
    }
}

pub struct DocumentLoader<E: PdfEngine> {
    engine: E,
}

impl<E: PdfEngine> DocumentLoader<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> LoadResult<LoadedDocument> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                LoadError::NotFound(path.to_path_buf())
            } else {
                LoadError::Io { path: path.to_path_buf(), source }
            }
        })?;
        if !metadata.is_file() {
            return Err(LoadError::NotAFile(path.to_path_buf()));
        }
        let kind = DocumentKind::from_path(path)
            .ok_or_else(|| LoadError::UnsupportedKind(path.to_path_buf()))?;

        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let (metrics, bookmarks, word_count) = match kind {
            DocumentKind::Pdf => {
                let (metrics, bookmarks) = self
                    .load_pdf(path)
                    .map_err(|source| LoadError::Pdf { path: path.to_path_buf(), source })?;
                (metrics, bookmarks, None)
            }
            DocumentKind::Markdown => {
                let text = std::fs::read_to_string(path)
                    .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
                (PageMetrics::continuous(PageSize::default()), Vec::new(), Some(count_markdown_words(&text)))
            }
        };

        log::info!(
            "loaded {} ({}, {} page(s), {} bytes)",
            path.display(),
            kind.label(),
            metrics.page_count(),
            metadata.len()
        );

        Ok(LoadedDocument {
            path: path.to_path_buf(),
            kind,
            title,
            file_size: metadata.len(),
            metrics,
            bookmarks,
            word_count,
        })
    }

    fn load_pdf(&mut self, path: &Path) -> Result<(PageMetrics, Vec<Bookmark>), PdfEngineError> {
        let handle = self.engine.open(OpenSource::from(path))?;
        let result = self.read_pdf(handle);
        if let Err(err) = self.engine.close(handle) {
            log::warn!("failed to release {}: {err}", path.display());
        }
        result
    }

    fn read_pdf(
        &self,
        handle: pdf_engine::DocumentHandle,
    ) -> Result<(PageMetrics, Vec<Bookmark>), PdfEngineError> {
        let page_count = self.engine.page_count(handle)?;
        let sizes = (0..page_count)
            .map(|index| self.engine.page_size(handle, index))
            .collect::<Result<Vec<_>, _>>()?;
        let outline = self.engine.outline(handle)?;
        Ok((PageMetrics::new(sizes), bookmarks_for(&outline, page_count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_engine::testing::{sample_pdf, OutlineSpec};
    use pdf_engine::LopdfEngine;
    use std::fs;
    use tempfile::TempDir;

    fn loader() -> DocumentLoader<LopdfEngine> {
        DocumentLoader::new(LopdfEngine::new())
    }

    #[test]
    fn loads_pdf_geometry_and_bookmarks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("paper.pdf");
        let outline = [OutlineSpec::new("Intro", 1, &[]), OutlineSpec::new("Body", 2, &[("Detail", 2)])];
        fs::write(&path, sample_pdf(&[(612, 792), (400, 300)], &outline)).unwrap();

        let doc = loader().load(&path).unwrap();
        assert_eq!(doc.kind, DocumentKind::Pdf);
        assert_eq!(doc.title, "paper.pdf");
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.metrics.page_size(1), Some(PageSize { width_pt: 400.0, height_pt: 300.0 }));
        assert_eq!(doc.bookmarks.len(), 2);
        assert_eq!(doc.bookmarks[1].children[0].title, "Detail");
        assert_eq!(doc.word_count, None);
        assert!(doc.file_size > 0);
    }

    #[test]
    fn pdf_without_outline_gets_page_bookmarks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.PDF");
        fs::write(&path, sample_pdf(&[(612, 792); 3], &[])).unwrap();

        let doc = loader().load(&path).unwrap();
        let titles: Vec<_> = doc.bookmarks.iter().map(|bookmark| bookmark.title.as_str()).collect();
        assert_eq!(titles, vec!["Page 1", "Page 2", "Page 3"]);
    }

    #[test]
    fn loads_markdown_with_word_count() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.md");
        fs::write(&path, "# Notes\n\nThree plain words.").unwrap();

        let doc = loader().load(&path).unwrap();
        assert_eq!(doc.kind, DocumentKind::Markdown);
        assert_eq!(doc.word_count, Some(4));
        assert_eq!(doc.page_count(), 1);
        assert!(doc.bookmarks.is_empty());
    }

    #[test]
    fn rejects_missing_and_unsupported_files() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.pdf");
        assert!(matches!(loader().load(&missing), Err(LoadError::NotFound(_))));

        let image = dir.path().join("photo.png");
        fs::write(&image, b"png").unwrap();
        assert!(matches!(loader().load(&image), Err(LoadError::UnsupportedKind(_))));

        assert!(matches!(loader().load(dir.path()), Err(LoadError::NotAFile(_))));
    }

    #[test]
    fn corrupt_pdf_reports_engine_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"not a pdf at all").unwrap();

        let err = loader().load(&path).unwrap_err();
        assert!(matches!(err, LoadError::Pdf { .. }));
        assert!(err.to_string().contains("broken.pdf"));
    }
}
