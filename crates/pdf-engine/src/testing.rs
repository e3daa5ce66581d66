//! In-memory PDF builders for tests.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};

/// A top-level outline item with optional one-level children `(title, page)`.
/// Pages are 1-based. Top-level items link with `/Dest`, children with a
/// `/GoTo` action so both destination forms get exercised.
#[derive(Debug, Clone, Copy)]
pub struct OutlineSpec {
    pub title: &'static str,
    pub page: u32,
    pub children: &'static [(&'static str, u32)],
}

impl OutlineSpec {
    pub const fn new(
        title: &'static str,
        page: u32,
        children: &'static [(&'static str, u32)],
    ) -> Self {
        Self { title, page, children }
    }
}

/// Builds a PDF with one page per `(width, height)` entry (points).
pub fn sample_pdf(pages: &[(i64, i64)], outline: &[OutlineSpec]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let page_ids: Vec<ObjectId> = pages
        .iter()
        .map(|&(width, height)| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            })
        })
        .collect();

    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as i64,
        }),
    );

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };

    if !outline.is_empty() {
        let outlines_id = add_outline(&mut doc, &page_ids, outline);
        catalog.set("Outlines", outlines_id);
    }

    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("in-memory PDF should serialize");
    bytes
}

fn add_outline(doc: &mut Document, page_ids: &[ObjectId], outline: &[OutlineSpec]) -> ObjectId {
    let outlines_id = doc.new_object_id();
    let top_ids: Vec<ObjectId> = outline.iter().map(|_| doc.new_object_id()).collect();

    for (index, spec) in outline.iter().enumerate() {
        let mut item = dictionary! {
            "Title" => Object::string_literal(spec.title),
            "Parent" => outlines_id,
            "Dest" => destination(page_ids, spec.page),
        };
        link_siblings(&mut item, &top_ids, index);

        if !spec.children.is_empty() {
            let child_ids: Vec<ObjectId> = spec.children.iter().map(|_| doc.new_object_id()).collect();
            for (child_index, &(title, page)) in spec.children.iter().enumerate() {
                let mut child = dictionary! {
                    "Title" => Object::string_literal(title),
                    "Parent" => top_ids[index],
                    "A" => dictionary! {
                        "S" => "GoTo",
                        "D" => destination(page_ids, page),
                    },
                };
                link_siblings(&mut child, &child_ids, child_index);
                doc.objects.insert(child_ids[child_index], Object::Dictionary(child));
            }
            item.set("First", child_ids[0]);
            item.set("Last", child_ids[child_ids.len() - 1]);
            item.set("Count", child_ids.len() as i64);
        }

        doc.objects.insert(top_ids[index], Object::Dictionary(item));
    }

    doc.objects.insert(
        outlines_id,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => top_ids[0],
            "Last" => top_ids[top_ids.len() - 1],
            "Count" => top_ids.len() as i64,
        }),
    );

    outlines_id
}

fn destination(page_ids: &[ObjectId], page: u32) -> Object {
    let page_id = page_ids[(page.max(1) - 1) as usize];
    Object::Array(vec![Object::Reference(page_id), Object::Name(b"Fit".to_vec())])
}

fn link_siblings(item: &mut Dictionary, ids: &[ObjectId], index: usize) {
    if index > 0 {
        item.set("Prev", ids[index - 1]);
    }
    if let Some(&next) = ids.get(index + 1) {
        item.set("Next", next);
    }
}
