//! Cross-reference table: maps object numbers to their byte offsets.
//!
//! Cross-reference streams and object streams are out of scope here, so an
//! entry is either free or a plain uncompressed `(offset, generation)` pair.

use std::collections::BTreeMap;

use tracing::debug;

use super::cursor::Cursor;
use super::error::{PdfError, PdfResult};

/// A single cross-reference table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    Free { generation: u32 },
    InUse { offset: usize, generation: u32 },
}

impl XRefEntry {
    pub fn is_free(&self) -> bool {
        matches!(self, XRefEntry::Free { .. })
    }
}

/// Cross-reference table, keyed by object number. Only the most recent
/// entry per object number is retained, which is already what a `BTreeMap`
/// insert does on a repeated key.
#[derive(Debug, Default)]
pub struct XRefTable {
    entries: BTreeMap<u32, XRefEntry>,
}

impl XRefTable {
    pub fn new() -> Self {
        XRefTable { entries: BTreeMap::new() }
    }

    pub fn insert(&mut self, object_number: u32, entry: XRefEntry) {
        self.entries.insert(object_number, entry);
    }

    pub fn get(&self, object_number: u32) -> Option<XRefEntry> {
        self.entries.get(&object_number).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, XRefEntry)> + '_ {
        self.entries.iter().map(|(&n, &e)| (n, e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Scans lines bottom-up for the literal `startxref`, returning the decimal
/// byte offset on the line immediately following it.
pub fn find_last_startxref_offset(cursor: &Cursor) -> PdfResult<usize> {
    if cursor.num_lines() == 0 {
        return Err(PdfError::conformance("PDF has no lines to search for startxref"));
    }
    for i in (0..cursor.num_lines()).rev() {
        if cursor.get_line(i) == b"startxref" {
            if i + 1 >= cursor.num_lines() {
                return Err(PdfError::conformance("startxref has no following offset line"));
            }
            let offset_line = cursor.get_line(i + 1);
            let text = std::str::from_utf8(offset_line)
                .map_err(|_| PdfError::conformance("startxref offset line is not valid UTF-8"))?
                .trim();
            let offset: usize = text
                .parse()
                .map_err(|_| PdfError::conformance(format!("startxref offset {:?} is not a decimal integer", text)))?;
            debug!(offset, "found startxref");
            return Ok(offset);
        }
    }
    Err(PdfError::conformance("no startxref found in PDF"))
}

/// Reads the classic `xref` table at the current cursor
/// position. The cursor's line index is used to read each fixed-format
/// entry line; `xref` itself must be the immediately preceding line.
pub fn read_xref_table(cursor: &mut Cursor) -> PdfResult<XRefTable> {
    let offset = cursor.tell();
    let line_idx = cursor
        .find_line_containing(offset)
        .ok_or_else(|| PdfError::conformance("startxref offset does not point at a line boundary"))?;

    if cursor.get_line(line_idx) != b"xref" {
        return Err(PdfError::conformance("xref offset does not point at the literal 'xref'"));
    }

    let mut table = XRefTable::new();
    let mut line_idx = line_idx + 1;

    loop {
        if line_idx >= cursor.num_lines() {
            return Err(PdfError::conformance("PDF exhausted while reading xref subsections"));
        }
        let header_line = cursor.get_line(line_idx);
        let header_text = std::str::from_utf8(header_line)
            .map_err(|_| PdfError::conformance("xref subsection header is not valid UTF-8"))?
            .trim();
        if header_text == "trailer" {
            break;
        }
        let mut parts = header_text.split_whitespace();
        let first_obj_num: u32 = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| PdfError::conformance("xref subsection header is missing the first object number"))?;
        let num_entries: u32 = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| PdfError::conformance("xref subsection header is missing the entry count"))?;
        line_idx += 1;

        for i in 0..num_entries {
            if line_idx >= cursor.num_lines() {
                return Err(PdfError::conformance("PDF exhausted while reading xref entries"));
            }
            let entry_line = cursor.get_line(line_idx);
            let entry = parse_xref_entry_line(entry_line)?;
            table.insert(first_obj_num + i, entry);
            line_idx += 1;
        }
    }

    cursor.seek_to_line(line_idx);
    Ok(table)
}

/// Parses one `NNNNNNNNNN GGGGG f|n` entry line (10-digit offset, 5-digit
/// generation, single-char flag).
fn parse_xref_entry_line(line: &[u8]) -> PdfResult<XRefEntry> {
    let text = std::str::from_utf8(line).map_err(|_| PdfError::conformance("xref entry is not valid UTF-8"))?;
    let text = text.trim_end();
    if text.len() < 18 {
        return Err(PdfError::conformance(format!("xref entry line {:?} is too short", text)));
    }
    let offset_str = &text[0..10];
    let gen_str = &text[11..16];
    let flag = text.as_bytes()[17];

    let offset: usize = offset_str
        .parse()
        .map_err(|_| PdfError::conformance(format!("xref entry offset {:?} is not numeric", offset_str)))?;
    let generation: u32 = gen_str
        .parse()
        .map_err(|_| PdfError::conformance(format!("xref entry generation {:?} is not numeric", gen_str)))?;

    match flag {
        b'n' => Ok(XRefEntry::InUse { offset, generation }),
        b'f' => Ok(XRefEntry::Free { generation }),
        other => Err(PdfError::conformance(format!("xref entry flag must be 'f' or 'n', found {:?}", other as char))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_last_startxref() {
        let buf = b"%PDF-1.4\nstuff\nstartxref\n123\n%%EOF";
        let cursor = Cursor::new(buf);
        assert_eq!(find_last_startxref_offset(&cursor).unwrap(), 123);
    }

    #[test]
    fn reads_simple_xref_table() {
        let buf = b"xref\n0 2\n0000000000 65535 f \n0000000017 00000 n \ntrailer\n";
        let mut cursor = Cursor::new(buf);
        let table = read_xref_table(&mut cursor).unwrap();
        assert_eq!(table.get(0), Some(XRefEntry::Free { generation: 65535 }));
        assert_eq!(table.get(1), Some(XRefEntry::InUse { offset: 17, generation: 0 }));
    }

    #[test]
    fn rejects_malformed_entry() {
        let buf = b"xref\n0 1\nshort\ntrailer\n";
        let mut cursor = Cursor::new(buf);
        assert!(read_xref_table(&mut cursor).is_err());
    }
}
