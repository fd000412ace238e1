//! Summary emitter: renders a loaded document to plain text or JSON.
//!
//! Both renderings are views over the same in-memory [`DocumentSummary`] so
//! they can never diverge; the CLI front-end picks which view to print.

use serde::Serialize;

use super::document::Document;
use super::page::PageTree;

#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub index: usize,
    pub resource_count: usize,
    pub resources_inherited: bool,
    pub content_length: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub version_major: u32,
    pub version_minor: u32,
    pub catalog_object: String,
    pub page_count: usize,
    pub pages: Vec<PageSummary>,
}

impl DocumentSummary {
    pub fn build(doc: &Document, tree: &PageTree) -> Self {
        let pages = tree
            .leaves
            .iter()
            .map(|leaf| PageSummary {
                index: leaf.index,
                resource_count: leaf.resources.as_ref().map_or(0, |r| r.len()),
                resources_inherited: leaf.resources_inherited,
                content_length: leaf.content.len(),
            })
            .collect();

        DocumentSummary {
            version_major: doc.version.major,
            version_minor: doc.version.minor,
            catalog_object: doc.catalog_id.to_string(),
            page_count: tree.leaves.len(),
            pages,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Plain-text report. When `instructions` is set, each page's raw merged
    /// content bytes are additionally dumped, ASCII-escaped, as byte
    /// recovery rather than content-stream operator interpretation.
    pub fn to_text(&self, tree: &PageTree, instructions: bool) -> String {
        let mut out = String::new();
        out.push_str(&format!("PDF version: {}.{}\n", self.version_major, self.version_minor));
        out.push_str(&format!("Catalog: {}\n", self.catalog_object));
        out.push_str(&format!("Pages: {}\n", self.page_count));
        for page in &self.pages {
            out.push_str(&format!(
                "  page {}: {} resources ({}), {} content bytes\n",
                page.index,
                page.resource_count,
                if page.resources_inherited { "inherited" } else { "own" },
                page.content_length
            ));
        }
        if instructions {
            out.push_str("\ncontent bytes:\n");
            for leaf in &tree.leaves {
                out.push_str(&format!("  page {}: {}\n", leaf.index, escape_ascii(&leaf.content)));
            }
        }
        out
    }
}

fn escape_ascii(bytes: &[u8]) -> String {
    bytes.iter().flat_map(|&b| std::ascii::escape_default(b)).map(|b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::document::Document;

    fn one_page_pdf() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n");
        let obj1 = buf.len();
        buf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        let obj2 = buf.len();
        buf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n");
        let obj3 = buf.len();
        buf.extend_from_slice(b"3 0 obj\n<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources << >> >>\nendobj\n");
        let obj4 = buf.len();
        buf.extend_from_slice(b"4 0 obj\n<< /Length 2 >>\nstream\nhi\nendstream\nendobj\n");
        let xref_offset = buf.len();
        buf.extend_from_slice(b"xref\n0 5\n");
        buf.extend_from_slice(b"0000000000 65535 f \n");
        for off in [obj1, obj2, obj3, obj4] {
            buf.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes());
        }
        buf.extend_from_slice(b"trailer\n<< /Size 5 /Root 1 0 R >>\n");
        buf.extend_from_slice(b"startxref\n");
        buf.extend_from_slice(format!("{}\n", xref_offset).as_bytes());
        buf.extend_from_slice(b"%%EOF");
        buf
    }

    #[test]
    fn json_and_text_agree_on_page_count_and_version() {
        let pdf = one_page_pdf();
        let doc = Document::load(&pdf).unwrap();
        let tree = PageTree::walk(&doc).unwrap();
        let summary = DocumentSummary::build(&doc, &tree);

        let json = summary.to_json().unwrap();
        let text = summary.to_text(&tree, false);

        assert!(json.contains("\"page_count\": 1"));
        assert!(text.contains("Pages: 1"));
        assert!(json.contains("\"version_major\": 1"));
        assert!(text.contains("PDF version: 1.4"));
    }

    #[test]
    fn instructions_flag_dumps_content_bytes() {
        let pdf = one_page_pdf();
        let doc = Document::load(&pdf).unwrap();
        let tree = PageTree::walk(&doc).unwrap();
        let summary = DocumentSummary::build(&doc, &tree);
        let text = summary.to_text(&tree, true);
        assert!(text.contains("hi"));
    }
}
