//! CLI-level scenarios, exercised against the library entry point rather
//! than the built binary process, per the synchronous core contract:
//! `--json` and plain text must agree, and error kinds must map to the
//! documented exit codes.

use pdf_inspect::core::document::Document;
use pdf_inspect::core::page::PageTree;
use pdf_inspect::core::summary::DocumentSummary;
use pdf_inspect::PdfError;

mod support;
use support::PdfBuilder;

fn one_page_pdf() -> Vec<u8> {
    let mut b = PdfBuilder::new();
    let pages = b.reserve();
    let page = b.reserve();
    let content = b.reserve();
    let catalog = b.object(format!("<< /Type /Catalog /Pages {} 0 R >>", pages));
    b.define(pages, format!("<< /Type /Pages /Kids [{} 0 R] /Count 1 >>", page));
    b.define(page, format!("<< /Type /Page /Parent {} 0 R /Contents {} 0 R /Resources << /Font << >> >> >>", pages, content));
    b.define(content, "<< /Length 12 >>\nstream\nhello, page!\nendstream");
    b.finish(catalog)
}

#[test]
fn json_and_text_reports_agree_on_page_count_version_and_resources() {
    let pdf = one_page_pdf();
    let doc = Document::load(&pdf).unwrap();
    let tree = PageTree::walk(&doc).unwrap();
    let summary = DocumentSummary::build(&doc, &tree);

    let json = summary.to_json().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let text = summary.to_text(&tree, false);

    assert_eq!(parsed["page_count"], 1);
    assert!(text.contains("Pages: 1"));
    assert_eq!(parsed["version_major"], 1);
    assert_eq!(parsed["version_minor"], 4);
    assert!(text.contains("PDF version: 1.4"));
    assert_eq!(parsed["pages"][0]["resource_count"], 1);
    assert!(text.contains("1 resources"));
}

#[test]
fn not_supported_condition_maps_to_exit_code_two() {
    let mut b = PdfBuilder::new();
    let pages = b.reserve();
    let catalog = b.object(format!("<< /Type /Catalog /Pages {} 0 R >>", pages));
    b.define(pages, "<< /Type /Pages /Kids [] /Count 0 >>".to_string());
    b.set_extra_trailer_entry("/Prev 0");
    let pdf = b.finish(catalog);

    let err = Document::load(&pdf).unwrap_err();
    assert!(matches!(err, PdfError::NotSupported(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn conformance_violation_maps_to_exit_code_one() {
    let mut b = PdfBuilder::new();
    b.reserve();
    let pdf = b.finish_without_root();

    let err = Document::load(&pdf).unwrap_err();
    assert!(matches!(err, PdfError::Conformance(_)));
    assert_eq!(err.exit_code(), 1);
}
