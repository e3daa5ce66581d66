use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

/// Outline nesting deeper than this is treated as malformed and cut off.
const MAX_OUTLINE_DEPTH: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Page size in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl Default for PageSize {
    fn default() -> Self {
        Self { width_pt: 612.0, height_pt: 792.0 }
    }
}

/// One flattened outline (bookmark) item. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub level: u32,
    pub title: String,
    pub page: u32,
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported in the default backend")]
    EncryptedUnsupported,
    #[error("document has no pages")]
    NoPages,
}

/// Page geometry and outline provider. Rasterization is the renderer's job.
pub trait PdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError>;
    fn page_size(&self, handle: DocumentHandle, page_index: u32)
        -> Result<PageSize, PdfEngineError>;
    fn outline(&self, handle: DocumentHandle) -> Result<Vec<OutlineEntry>, PdfEngineError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError>;
}

#[derive(Debug, Clone)]
struct DocumentRecord {
    page_sizes: Vec<PageSize>,
    outline: Vec<OutlineEntry>,
}

#[derive(Debug, Default)]
pub struct LopdfEngine {
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(bytes: &[u8]) -> Result<DocumentRecord, PdfEngineError> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(PdfEngineError::EncryptedUnsupported);
        }

        let doc = Document::load_mem(bytes)?;
        let pages = doc.get_pages();
        let mut page_sizes = Vec::with_capacity(pages.len());
        let mut page_numbers = HashMap::with_capacity(pages.len());

        for (page_number, object_id) in pages {
            page_numbers.insert(object_id, page_number);
            let dict = doc.get_dictionary(object_id)?;
            let size = dict
                .get(b"MediaBox")
                .ok()
                .and_then(|obj| obj.as_array().ok())
                .and_then(|array| {
                    if array.len() != 4 {
                        return None;
                    }
                    let x0 = array[0].as_float().ok()?;
                    let y0 = array[1].as_float().ok()?;
                    let x1 = array[2].as_float().ok()?;
                    let y1 = array[3].as_float().ok()?;
                    Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
                })
                .unwrap_or_default();

            page_sizes.push(size);
        }

        if page_sizes.is_empty() {
            return Err(PdfEngineError::NoPages);
        }

        let outline = read_outline(&doc, &page_numbers);
        log::debug!("parsed PDF: {} pages, {} outline entries", page_sizes.len(), outline.len());

        Ok(DocumentRecord { page_sizes, outline })
    }

    fn record(&self, handle: DocumentHandle) -> Result<&DocumentRecord, PdfEngineError> {
        self.docs.get(&handle).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

impl PdfEngine for LopdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
        let bytes = match source {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        let record = Self::parse(&bytes)?;

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        self.docs.insert(handle, record);

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        Ok(self.record(handle)?.page_sizes.len() as u32)
    }

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError> {
        let record = self.record(handle)?;
        record.page_sizes.get(page_index as usize).copied().ok_or(PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: record.page_sizes.len() as u32,
        })
    }

    fn outline(&self, handle: DocumentHandle) -> Result<Vec<OutlineEntry>, PdfEngineError> {
        Ok(self.record(handle)?.outline.clone())
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

pub fn default_engine() -> LopdfEngine {
    LopdfEngine::new()
}

fn read_outline(doc: &Document, page_numbers: &HashMap<ObjectId, u32>) -> Vec<OutlineEntry> {
    let mut entries = Vec::new();
    let Some(first) = outline_first_item(doc) else {
        return entries;
    };

    let mut visited = HashSet::new();
    walk_outline(doc, first, 1, page_numbers, &mut visited, &mut entries);
    entries
}

fn outline_first_item(doc: &Document) -> Option<ObjectId> {
    let root_id = doc.trailer.get(b"Root").ok()?.as_reference().ok()?;
    let catalog = doc.get_dictionary(root_id).ok()?;
    let outlines = resolve_dictionary(doc, catalog.get(b"Outlines").ok()?)?;
    outlines.get(b"First").ok()?.as_reference().ok()
}

fn walk_outline(
    doc: &Document,
    first: ObjectId,
    level: u32,
    page_numbers: &HashMap<ObjectId, u32>,
    visited: &mut HashSet<ObjectId>,
    entries: &mut Vec<OutlineEntry>,
) {
    if level > MAX_OUTLINE_DEPTH {
        log::warn!("outline deeper than {MAX_OUTLINE_DEPTH} levels, truncating");
        return;
    }

    let mut current = Some(first);
    while let Some(item_id) = current {
        // Sibling chains in damaged files can loop back on themselves.
        if !visited.insert(item_id) {
            break;
        }
        let Ok(item) = doc.get_dictionary(item_id) else {
            break;
        };

        let title = item.get(b"Title").ok().map(|title| decode_text(doc, title)).unwrap_or_default();
        let page = destination_page(doc, item, page_numbers).unwrap_or(1);
        entries.push(OutlineEntry { level, title, page });

        if let Some(child) = item.get(b"First").ok().and_then(|obj| obj.as_reference().ok()) {
            walk_outline(doc, child, level + 1, page_numbers, visited, entries);
        }

        current = item.get(b"Next").ok().and_then(|obj| obj.as_reference().ok());
    }
}

fn destination_page(
    doc: &Document,
    item: &Dictionary,
    page_numbers: &HashMap<ObjectId, u32>,
) -> Option<u32> {
    let destination = match item.get(b"Dest") {
        Ok(dest) => dest,
        Err(_) => {
            let action = resolve_dictionary(doc, item.get(b"A").ok()?)?;
            if action.get(b"S").ok()?.as_name().ok()? != b"GoTo" {
                return None;
            }
            action.get(b"D").ok()?
        }
    };

    let destination = match destination {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let page_id = destination.as_array().ok()?.first()?.as_reference().ok()?;
    page_numbers.get(&page_id).copied()
}

fn resolve_dictionary<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match object {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Decodes a PDF text string: UTF-16BE with BOM, otherwise byte-per-char.
fn decode_text(doc: &Document, object: &Object) -> String {
    let object = match object {
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(resolved) => resolved,
            Err(_) => return String::new(),
        },
        other => other,
    };
    let Object::String(bytes, _) = object else {
        return String::new();
    };

    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> =
            utf16.chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]])).collect();
        return String::from_utf16_lossy(&units);
    }

    bytes.iter().map(|&byte| char::from(byte)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_pdf, OutlineSpec};

    #[test]
    fn opens_pdf_and_reads_page_geometry() {
        let mut engine = LopdfEngine::new();
        let bytes = sample_pdf(&[(612, 792), (300, 400)], &[]);
        let handle = engine.open(OpenSource::Bytes(bytes)).expect("open should succeed");

        assert_eq!(engine.page_count(handle).expect("count should succeed"), 2);
        let size = engine.page_size(handle, 1).expect("page 2 should exist");
        assert_eq!(size, PageSize { width_pt: 300.0, height_pt: 400.0 });
    }

    #[test]
    fn page_size_out_of_range_is_reported() {
        let mut engine = LopdfEngine::new();
        let handle = engine
            .open(OpenSource::Bytes(sample_pdf(&[(612, 792)], &[])))
            .expect("open should succeed");

        let err = engine.page_size(handle, 3).expect_err("page 4 does not exist");
        assert!(matches!(err, PdfEngineError::PageOutOfRange { page: 3, page_count: 1 }));
    }

    #[test]
    fn outline_is_flattened_depth_first() {
        let outline = [
            OutlineSpec::new("Intro", 1, &[]),
            OutlineSpec::new("Methods", 2, &[("Setup", 2), ("Runs", 3)]),
            OutlineSpec::new("Results", 3, &[]),
        ];
        let bytes = sample_pdf(&[(612, 792); 3], &outline);

        let mut engine = LopdfEngine::new();
        let handle = engine.open(OpenSource::Bytes(bytes)).expect("open should succeed");
        let entries = engine.outline(handle).expect("outline should load");

        let flat: Vec<(u32, &str, u32)> =
            entries.iter().map(|e| (e.level, e.title.as_str(), e.page)).collect();
        assert_eq!(
            flat,
            vec![
                (1, "Intro", 1),
                (1, "Methods", 2),
                (2, "Setup", 2),
                (2, "Runs", 3),
                (1, "Results", 3),
            ]
        );
    }

    #[test]
    fn missing_outline_yields_empty_list() {
        let mut engine = LopdfEngine::new();
        let handle = engine
            .open(OpenSource::Bytes(sample_pdf(&[(612, 792)], &[])))
            .expect("open should succeed");
        assert!(engine.outline(handle).expect("outline should load").is_empty());
    }

    #[test]
    fn encrypted_marker_is_rejected() {
        let mut engine = LopdfEngine::new();
        let err = engine
            .open(OpenSource::Bytes(b"%PDF-1.4\n/Encrypt 5 0 R\n".to_vec()))
            .expect_err("encrypted input should fail");
        assert!(matches!(err, PdfEngineError::EncryptedUnsupported));
    }

    #[test]
    fn garbage_fails_to_parse() {
        let mut engine = LopdfEngine::new();
        let err = engine
            .open(OpenSource::Bytes(b"not a pdf".to_vec()))
            .expect_err("garbage should fail");
        assert!(matches!(err, PdfEngineError::Parse(_)));
    }

    #[test]
    fn invalid_handle_returns_error() {
        let engine = LopdfEngine::new();
        let err =
            engine.page_count(DocumentHandle(999)).expect_err("should fail for unknown handle");

        assert!(matches!(err, PdfEngineError::InvalidHandle(999)));
    }

    #[test]
    fn utf16_titles_are_decoded() {
        let doc = Document::with_version("1.5");
        let title = Object::String(
            vec![0xFE, 0xFF, 0x00, 0x43, 0x00, 0xE9],
            lopdf::StringFormat::Hexadecimal,
        );
        assert_eq!(decode_text(&doc, &title), "Cé");
    }
}
