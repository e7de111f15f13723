// src/merge.rs

use crate::acroform;
use crate::error::{FormError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use std::path::Path;
use tracing::debug;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Accumulates the pages of several documents under a single page tree.
pub struct PageMerger {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl Default for PageMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl PageMerger {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append every page of `source`, in order. Returns the number of pages added.
    pub fn append(&mut self, mut source: Document) -> Result<usize> {
        source.renumber_objects_with(self.doc.max_id + 1);

        let pages: Vec<ObjectId> = source.get_pages().into_values().collect();
        for &page_id in &pages {
            let resolved: Vec<(&[u8], Object)> = INHERITABLE
                .iter()
                .filter_map(|&key| {
                    acroform::inherited(&source, page_id, key).map(|v| (key, v.clone()))
                })
                .collect();

            let page = source.get_dictionary_mut(page_id)?;
            for (key, value) in resolved {
                page.set(key, value);
            }
            page.set("Parent", self.pages_id);
        }

        // The source page tree and catalog are replaced by ours.
        let max_id = source.max_id;
        for (id, object) in source.objects {
            if is_tree_root(&object) {
                continue;
            }
            self.doc.objects.insert(id, object);
        }
        self.doc.max_id = self.doc.max_id.max(max_id);
        self.kids.extend(&pages);

        debug!(pages = pages.len(), total = self.kids.len(), "Pages appended");
        Ok(pages.len())
    }

    /// Write the merged document to `path`.
    pub fn save(mut self, path: &Path) -> Result<()> {
        let kids: Vec<Object> = self.kids.iter().map(|&id| Object::Reference(id)).collect();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => self.kids.len() as i64,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        save_pdf(&mut self.doc, path)
    }
}

fn is_tree_root(object: &Object) -> bool {
    let Object::Dictionary(dict) = object else {
        return false;
    };
    type_is(dict, b"Catalog") || type_is(dict, b"Pages")
}

fn type_is(dict: &Dictionary, expected: &[u8]) -> bool {
    matches!(dict.get(b"Type"), Ok(Object::Name(name)) if name.as_slice() == expected)
}

/// Drop unreachable objects, compress streams and write `doc` to `path`.
pub fn save_pdf(doc: &mut Document, path: &Path) -> Result<()> {
    doc.prune_objects();
    doc.compress();
    doc.save(path)
        .map(|_| ())
        .map_err(|e| FormError::pdf_save(path, e))
}
