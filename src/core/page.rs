//! Page tree walker: depth-first traversal, resource inheritance, and
//! content-stream merging.
//!
//! A page is a thin view over a dictionary plus its identity; the
//! inheritance and traversal logic follows pdfls's `Page.resources`
//! property and `Document._load_pages`.

use tracing::{debug, info};

use super::document::Document;
use super::error::{PdfError, PdfResult};
use super::filter::decode_stream;
use super::object::{Dictionary, Name, Object, ObjectId};

/// A single leaf page, in document (depth-first, left-to-right) order.
pub struct Leaf {
    /// 1-based position in the depth-first leaf ordering.
    pub index: usize,
    pub object_id: ObjectId,
    /// Whether this leaf's `Resources` came from an ancestor rather than
    /// its own dictionary.
    pub resources_inherited: bool,
    pub resources: Option<Dictionary>,
    pub content: Vec<u8>,
}

/// The flattened page tree: an ordered list of leaves.
pub struct PageTree {
    pub leaves: Vec<Leaf>,
}

impl PageTree {
    /// Walks the page tree rooted at the catalog's `Pages` entry.
    pub fn walk(doc: &Document) -> PdfResult<Self> {
        let catalog = doc.resolve(doc.catalog_id)?;
        let catalog_dict = catalog
            .as_dict()
            .ok_or_else(|| PdfError::conformance("catalog is not a dictionary"))?;
        let pages_ref = catalog_dict
            .get(&Name(b"Pages".to_vec()))
            .and_then(Object::as_reference)
            .ok_or_else(|| PdfError::conformance("catalog Pages entry is not an indirect reference"))?;

        let mut leaves = Vec::new();
        visit(doc, pages_ref, None, &mut leaves)?;
        info!(count = leaves.len(), "walked page tree");
        Ok(PageTree { leaves })
    }
}

fn visit(doc: &Document, node_ref: ObjectId, parent_resources: Option<&Dictionary>, leaves: &mut Vec<Leaf>) -> PdfResult<()> {
    let node = doc.resolve(node_ref)?;
    let dict = node
        .as_dict()
        .ok_or_else(|| PdfError::conformance(format!("page tree node {} is not a dictionary", node_ref)))?;

    let node_type = dict
        .get(&Name(b"Type".to_vec()))
        .and_then(Object::as_name)
        .ok_or_else(|| PdfError::conformance(format!("page tree node {} is missing a Type name", node_ref)))?;

    let own_resources = dict.get(&Name(b"Resources".to_vec())).and_then(Object::as_dict).cloned();
    let effective_resources = own_resources.clone().or_else(|| parent_resources.cloned());

    match node_type.as_bytes() {
        b"Pages" => {
            let kids = dict
                .get(&Name(b"Kids".to_vec()))
                .and_then(Object::as_array)
                .ok_or_else(|| PdfError::conformance(format!("Pages node {} is missing Kids", node_ref)))?;
            if !dict.contains_key(&Name(b"Count".to_vec())) {
                return Err(PdfError::conformance(format!("Pages node {} is missing Count", node_ref)));
            }
            debug!(node = %node_ref, kids = kids.len(), "visiting Pages node");
            for kid in kids {
                let kid_ref = kid
                    .as_reference()
                    .ok_or_else(|| PdfError::conformance("Kids array entry is not an indirect reference"))?;
                visit(doc, kid_ref, effective_resources.as_ref(), leaves)?;
            }
            Ok(())
        }
        b"Page" => {
            let content = merge_content(doc, dict)?;
            let inherited = own_resources.is_none();
            debug!(node = %node_ref, content_len = content.len(), inherited, "visiting Page node");
            leaves.push(Leaf {
                index: leaves.len() + 1,
                object_id: node_ref,
                resources_inherited: inherited,
                resources: effective_resources,
                content,
            });
            Ok(())
        }
        b"Template" => {
            debug!(node = %node_ref, "visiting Template node (not recursed, not a leaf)");
            Ok(())
        }
        other => Err(PdfError::conformance(format!("page tree node {} has unsupported Type /{}", node_ref, String::from_utf8_lossy(other)))),
    }
}

/// Resolves `Contents` (absent, a single stream reference, or an array of
/// stream references) and concatenates the decoded payloads in order.
fn merge_content(doc: &Document, page_dict: &Dictionary) -> PdfResult<Vec<u8>> {
    let contents = match page_dict.get(&Name(b"Contents".to_vec())) {
        None => return Ok(Vec::new()),
        Some(obj) => obj,
    };

    let refs: Vec<ObjectId> = match contents {
        Object::Reference(id) => vec![*id],
        Object::Array(items) => items
            .iter()
            .map(|o| o.as_reference().ok_or_else(|| PdfError::conformance("Contents array entry is not an indirect reference")))
            .collect::<PdfResult<_>>()?,
        other => return Err(PdfError::conformance(format!("Contents must be a reference or array of references, found {}", other.type_name()))),
    };

    let mut merged = Vec::new();
    for id in refs {
        let obj = doc.resolve(id)?;
        let stream = obj
            .as_stream()
            .ok_or_else(|| PdfError::conformance(format!("Contents entry {} does not resolve to a stream", id)))?;
        let decoded = decode_stream(&stream.dict, &stream.raw_data)?;
        merged.extend_from_slice(&decoded);
    }
    Ok(merged)
}
