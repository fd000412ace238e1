//! Document loader: header, xref, trailer, catalog, and object store
//! materialization.
//!
//! Based on PDF.js's `PDFDocument` for the overall "open orchestrates
//! header/xref/trailer/catalog" shape, with the load sequence itself
//! following pdfls's `Document` (`_read_header`, `_find_last_xref_offset`,
//! `_read_xref`, `_read_trailer`, `_load_objects`, `_load_catalog`).

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::cursor::Cursor;
use super::error::{PdfError, PdfResult};
use super::object::{Name, Object, ObjectId};
use super::parser::Parser;
use super::xref::{find_last_startxref_offset, read_xref_table, XRefEntry, XRefTable};

/// PDF version tuple read from the header (`%PDF-M.N`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub fn at_least(&self, major: u32, minor: u32) -> bool {
        (self.major, self.minor) >= (major, minor)
    }
}

/// Object store: every in-use indirect object, materialized eagerly at
/// document-open time.
pub type ObjectStore = BTreeMap<ObjectId, Object>;

/// A fully loaded PDF document: its version, cross-reference table, trailer,
/// and object store, plus the resolved catalog dictionary.
pub struct Document {
    pub version: Version,
    pub xref: XRefTable,
    pub trailer: super::object::Dictionary,
    pub objects: ObjectStore,
    pub catalog_id: ObjectId,
}

impl Document {
    /// Loads a document from a complete in-memory byte buffer. Runs the
    /// full open sequence: header, last startxref, xref table, trailer,
    /// object materialization, catalog resolution.
    pub fn load(data: &[u8]) -> PdfResult<Self> {
        let mut cursor = Cursor::new(data);

        let version = Self::read_header(&cursor)?;
        info!(major = version.major, minor = version.minor, "parsed header");

        let startxref = find_last_startxref_offset(&cursor)?;
        cursor.seek(startxref);
        let xref = read_xref_table(&mut cursor)?;
        info!(entries = xref.len(), "loaded xref table");

        let trailer = Self::read_trailer(&mut cursor)?;
        Self::validate_trailer(&trailer, &version)?;
        info!("validated trailer");

        let objects = Self::materialize_objects(data, &xref)?;
        info!(count = objects.len(), "materialized object store");

        let root = trailer
            .get(&Name(b"Root".to_vec()))
            .and_then(Object::as_reference)
            .ok_or_else(|| PdfError::conformance("trailer Root is not an indirect reference"))?;

        let catalog = objects
            .get(&root)
            .ok_or_else(|| PdfError::conformance("trailer Root does not resolve to a materialized object"))?;
        let catalog_dict = catalog
            .as_dict()
            .ok_or_else(|| PdfError::conformance("catalog object is not a dictionary"))?;
        let catalog_type = catalog_dict
            .get(&Name(b"Type".to_vec()))
            .and_then(Object::as_name)
            .ok_or_else(|| PdfError::conformance("catalog is missing a Type name"))?;
        if catalog_type.as_bytes() != b"Catalog" {
            return Err(PdfError::conformance("Root object's Type is not /Catalog"));
        }
        if !catalog_dict.contains_key(&Name(b"Pages".to_vec())) {
            return Err(PdfError::conformance("catalog is missing a Pages entry"));
        }
        info!("resolved catalog");

        Ok(Document { version, xref, trailer, objects, catalog_id: root })
    }

    fn read_header(cursor: &Cursor) -> PdfResult<Version> {
        if cursor.num_lines() == 0 {
            return Err(PdfError::conformance("PDF has no header line"));
        }
        let line = cursor.get_line(0);
        let text = std::str::from_utf8(line).map_err(|_| PdfError::conformance("PDF header is not valid UTF-8"))?;
        let rest = text
            .strip_prefix("%PDF-")
            .ok_or_else(|| PdfError::conformance(format!("PDF header {:?} does not begin with %PDF-", text)))?;
        let mut parts = rest.trim().splitn(2, '.');
        let major: u32 = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| PdfError::conformance(format!("PDF header version {:?} is malformed", rest)))?;
        let minor: u32 = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| PdfError::conformance(format!("PDF header version {:?} is malformed", rest)))?;
        Ok(Version { major, minor })
    }

    /// Scans bottom-up for the literal `trailer`, then parses the
    /// dictionary that follows it.
    fn read_trailer(cursor: &mut Cursor) -> PdfResult<super::object::Dictionary> {
        let buffer = cursor.buffer();
        for i in (0..cursor.num_lines()).rev() {
            if cursor.get_line(i) == b"trailer" {
                cursor.seek_to_line(i + 1);
                let offset = cursor.tell();
                let mut parser = Parser::new(buffer);
                parser.seek(offset);
                let obj = parser.next_object()?;
                return match obj {
                    Object::Dictionary(d) => Ok(d),
                    other => Err(PdfError::conformance(format!("trailer is not a dictionary, found {}", other.type_name()))),
                };
            }
        }
        Err(PdfError::conformance("no trailer found in PDF"))
    }

    fn validate_trailer(trailer: &super::object::Dictionary, version: &Version) -> PdfResult<()> {
        if !trailer.contains_key(&Name(b"Size".to_vec())) {
            return Err(PdfError::conformance("trailer is missing Size"));
        }
        if !trailer.contains_key(&Name(b"Root".to_vec())) {
            return Err(PdfError::conformance("trailer is missing Root"));
        }
        let needs_id = version.at_least(2, 0) || trailer.contains_key(&Name(b"Encrypt".to_vec()));
        if needs_id && !trailer.contains_key(&Name(b"ID".to_vec())) {
            return Err(PdfError::conformance("trailer is missing ID, required at this version or with Encrypt present"));
        }
        if trailer.contains_key(&Name(b"Prev".to_vec())) {
            return Err(PdfError::not_supported("incremental updates (trailer Prev) are not supported"));
        }
        Ok(())
    }

    /// Seeks to each in-use xref entry's offset and parses the indirect
    /// object there, checking its `(number, generation)` against the xref
    /// entry it came from.
    fn materialize_objects(data: &[u8], xref: &XRefTable) -> PdfResult<ObjectStore> {
        let mut store = ObjectStore::new();
        for (object_number, entry) in xref.iter() {
            let XRefEntry::InUse { offset, generation } = entry else {
                continue;
            };
            let mut parser = Parser::new(data);
            parser.seek(offset);
            let obj = parser.next_object()?;
            match obj {
                Object::IndirectObject { id, value } => {
                    if id.number != object_number || id.generation != generation {
                        return Err(PdfError::conformance(format!(
                            "xref entry for object {} {} does not match the object header found at its offset ({} {})",
                            object_number, generation, id.number, id.generation
                        )));
                    }
                    debug!(object = id.number, generation = id.generation, "materialized object");
                    store.insert(id, *value);
                }
                other => {
                    return Err(PdfError::conformance(format!(
                        "xref entry for object {} does not point at an indirect object, found {}",
                        object_number,
                        other.type_name()
                    )))
                }
            }
        }
        Ok(store)
    }

    /// Resolves a reference against the object store.
    pub fn resolve(&self, id: ObjectId) -> PdfResult<&Object> {
        self.objects
            .get(&id)
            .ok_or_else(|| PdfError::conformance(format!("reference to unresolvable object {}", id)))
    }

    /// Resolves an object that may itself be a reference, one level deep
    /// (PDF references are never chained).
    pub fn resolve_object<'a>(&'a self, obj: &'a Object) -> PdfResult<&'a Object> {
        match obj {
            Object::Reference(id) => self.resolve(*id),
            other => Ok(other),
        }
    }
}
