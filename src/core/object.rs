//! The PDF object algebra (ISO 32000-2 §7.3).
//!
//! `Object` is a tagged union over the eight basic object types plus the two
//! structural wrappers a parser actually has to produce: an indirect
//! reference (`n g R`) and a fully-materialized indirect object (`n g obj
//! ... endobj`). Streams carry their dictionary and raw (still-encoded)
//! bytes; filter decoding happens later, in the filter pipeline, not here.
//!
//! Based on pdfls's `objects.py` object hierarchy, recast as a Rust enum
//! instead of a class hierarchy.

use std::collections::BTreeMap;
use std::fmt;

/// An indirect object's identity: object number and generation number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId {
    pub number: u32,
    pub generation: u32,
}

impl ObjectId {
    pub fn new(number: u32, generation: u32) -> Self {
        ObjectId { number, generation }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// A PDF name object, stored with its `#xx` escapes already decoded.
///
/// Names are compared and hashed by decoded byte content, per §7.3.5: `/A#42`
/// and `/AB` denote the same name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(pub Vec<u8>);

impl Name {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.as_str_lossy())
    }
}

/// A dictionary, ordered by insertion so that `print_summary`-style output is
/// stable across runs. Keyed by decoded [`Name`] bytes, not by the literal
/// escape sequence used in the source.
pub type Dictionary = BTreeMap<Name, Object>;

/// A stream object: its dictionary plus the raw (still filter-encoded) bytes
/// between `stream` and `endstream`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub dict: Dictionary,
    pub raw_data: Vec<u8>,
}

/// A single PDF object, in any of its ten surface forms.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    LiteralString(Vec<u8>),
    HexString(Vec<u8>),
    Name(Name),
    Array(Vec<Object>),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(ObjectId),
    /// A fully parsed `n g obj ... endobj` wrapper. Only ever produced at the
    /// top level by the parser when reading an object at a known offset; an
    /// `IndirectObject` is never itself a legal child of another object.
    IndirectObject { id: ObjectId, value: Box<Object> },
}

impl Object {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Object::Real(r) => Some(*r),
            Object::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Object::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Object]> {
        match self {
            Object::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Object::Stream(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            Object::Reference(id) => Some(*id),
            _ => None,
        }
    }

    /// Unwraps a top-level `IndirectObject`, returning its inner value.
    /// Returns `self` unchanged for anything else.
    pub fn into_inner(self) -> Object {
        match self {
            Object::IndirectObject { value, .. } => *value,
            other => other,
        }
    }

    pub fn inner(&self) -> &Object {
        match self {
            Object::IndirectObject { value, .. } => value,
            other => other,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "null",
            Object::Boolean(_) => "boolean",
            Object::Integer(_) => "integer",
            Object::Real(_) => "real",
            Object::LiteralString(_) => "literal-string",
            Object::HexString(_) => "hex-string",
            Object::Name(_) => "name",
            Object::Array(_) => "array",
            Object::Dictionary(_) => "dictionary",
            Object::Stream(_) => "stream",
            Object::Reference(_) => "reference",
            Object::IndirectObject { .. } => "indirect-object",
        }
    }
}
