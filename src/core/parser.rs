//! Recursive-descent object parser driving the [`super::lexer::Lexer`].
//!
//! Based on PDF.js's `Parser` in spirit (a lexer-driven recursive descent
//! parser with lookahead for indirect references), but the lookahead
//! discipline here is implemented via tokenizer `tell`/`seek` rollback
//! rather than a fixed 2-token buffer, since the integer/reference/object
//! ambiguity needs up to three tokens before it resolves.

use std::collections::BTreeMap;

use tracing::debug;

use super::error::{PdfError, PdfResult};
use super::lexer::Lexer;
use super::object::{Dictionary, Name, Object, ObjectId, Stream};
use super::token::Token;

/// Parses PDF objects out of a byte buffer via a driven [`Lexer`].
pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

fn is_ascii_digit(ch: u8) -> bool {
    ch.is_ascii_digit()
}

fn parse_integer(bytes: &[u8]) -> Option<i64> {
    let s = std::str::from_utf8(bytes).ok()?;
    s.parse::<i64>().ok()
}

fn looks_like_number(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }
    let rest = if matches!(bytes[0], b'+' | b'-') { &bytes[1..] } else { bytes };
    !rest.is_empty() && rest.iter().all(|&b| is_ascii_digit(b) || b == b'.')
}

fn looks_like_integer(bytes: &[u8]) -> bool {
    looks_like_number(bytes) && !bytes.contains(&b'.')
}

fn parse_real(bytes: &[u8]) -> Option<f64> {
    let s = std::str::from_utf8(bytes).ok()?;
    s.parse::<f64>().ok()
}

impl<'a> Parser<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Parser { lexer: Lexer::new(buffer) }
    }

    pub fn from_lexer(lexer: Lexer<'a>) -> Self {
        Parser { lexer }
    }

    pub fn tell(&self) -> usize {
        self.lexer.tell()
    }

    pub fn seek(&mut self, offset: usize) {
        self.lexer.seek(offset);
    }

    /// Parses the single direct or indirect object starting at the current
    /// position. This is the entry point for top-level reads (e.g. at an
    /// xref-table offset) as well as for nested direct-object reads.
    pub fn next_object(&mut self) -> PdfResult<Object> {
        let tok = self
            .lexer
            .next()?
            .ok_or_else(|| PdfError::conformance("PDF exhausted while an object was expected"))?;
        self.parse_from_token(tok)
    }

    fn parse_from_token(&mut self, tok: Token) -> PdfResult<Object> {
        match tok {
            Token::ArrayStart => self.parse_array(),
            Token::DictStart => self.parse_dict_or_stream(),
            Token::Solidus => self.parse_name(),
            Token::LitStart => self.parse_literal_string(),
            Token::HexStart => self.parse_hex_string(),
            Token::Literal(bytes) => self.parse_literal_keyword_or_number(bytes),
            Token::Comment(_) => self.next_object(),
            other => Err(PdfError::conformance(format!("unexpected token {:?} where an object was expected", other))),
        }
    }

    fn parse_name(&mut self) -> PdfResult<Object> {
        match self.lexer.next()? {
            Some(Token::Literal(bytes)) => Ok(Object::Name(Name(bytes))),
            other => Err(PdfError::bug(format!("lexer did not follow Solidus with a name literal: {:?}", other))),
        }
    }

    fn parse_literal_string(&mut self) -> PdfResult<Object> {
        let bytes = match self.lexer.next()? {
            Some(Token::Literal(bytes)) => bytes,
            other => return Err(PdfError::bug(format!("lexer did not follow LitStart with literal content: {:?}", other))),
        };
        match self.lexer.next()? {
            Some(Token::LitEnd) => Ok(Object::LiteralString(bytes)),
            other => Err(PdfError::conformance(format!("expected ) to close literal string, found {:?}", other))),
        }
    }

    fn parse_hex_string(&mut self) -> PdfResult<Object> {
        let bytes = match self.lexer.next()? {
            Some(Token::Literal(bytes)) => bytes,
            other => return Err(PdfError::bug(format!("lexer did not follow HexStart with hex content: {:?}", other))),
        };
        match self.lexer.next()? {
            Some(Token::HexEnd) => Ok(Object::HexString(bytes)),
            other => Err(PdfError::conformance(format!("expected > to close hex string, found {:?}", other))),
        }
    }

    fn parse_array(&mut self) -> PdfResult<Object> {
        let mut items = Vec::new();
        loop {
            let tok = self
                .lexer
                .next()?
                .ok_or_else(|| PdfError::conformance("PDF exhausted while reading an array"))?;
            if tok == Token::ArrayEnd {
                return Ok(Object::Array(items));
            }
            items.push(self.parse_from_token(tok)?);
        }
    }

    fn parse_dict_or_stream(&mut self) -> PdfResult<Object> {
        let dict = self.parse_dict_body()?;

        let checkpoint = self.lexer.tell();
        match self.lexer.next()? {
            Some(Token::Literal(kw)) if kw == b"stream" => {
                let raw = self.read_stream_payload(&dict)?;
                Ok(Object::Stream(Stream { dict, raw_data: raw }))
            }
            _ => {
                self.lexer.seek(checkpoint);
                Ok(Object::Dictionary(dict))
            }
        }
    }

    fn parse_dict_body(&mut self) -> PdfResult<Dictionary> {
        let mut dict: Dictionary = BTreeMap::new();
        loop {
            let tok = self
                .lexer
                .next()?
                .ok_or_else(|| PdfError::conformance("PDF exhausted while reading a dictionary"))?;
            if tok == Token::DictEnd {
                return Ok(dict);
            }
            let key = match tok {
                Token::Solidus => match self.lexer.next()? {
                    Some(Token::Literal(bytes)) => Name(bytes),
                    other => return Err(PdfError::bug(format!("lexer did not follow Solidus with a name literal: {:?}", other))),
                },
                other => return Err(PdfError::conformance(format!("expected a name key in dictionary, found {:?}", other))),
            };
            let value = self.next_object()?;

            if (key.as_bytes() == b"Type" || key.as_bytes() == b"Subtype") && !matches!(value, Object::Name(_)) {
                return Err(PdfError::conformance(format!("{} value must be a name", key)));
            }

            // A Null value is semantically equivalent to absence.
            if !matches!(value, Object::Null) {
                dict.insert(key, value);
            }
        }
    }

    /// After a dictionary is immediately followed by the keyword `stream`,
    /// reads the raw (still filter-encoded) payload bytes. The payload
    /// length comes from the dictionary's `Length` entry; no tokenization
    /// happens over the payload itself.
    fn read_stream_payload(&mut self, dict: &Dictionary) -> PdfResult<Vec<u8>> {
        let length = dict
            .get(&Name(b"Length".to_vec()))
            .and_then(Object::as_integer)
            .ok_or_else(|| PdfError::conformance("stream dictionary is missing an integer Length entry"))?;
        if length < 0 {
            return Err(PdfError::bug("stream Length is negative"));
        }
        let length = length as usize;

        let cursor = self.lexer.cursor_mut();
        // `stream` keyword is followed by CR LF or LF (never a lone CR) before
        // the payload begins (ISO 32000-2 §7.3.8.1); consume that EOL explicitly.
        match cursor.peek_byte() {
            Some(b'\r') => {
                cursor.read_byte();
            }
            Some(b'\n') => {
                cursor.read_byte();
            }
            _ => {}
        }

        let raw = cursor
            .read_exact(length)
            .ok_or_else(|| PdfError::conformance("stream payload runs past end of file"))?
            .to_vec();

        self.lexer.seek(self.lexer.tell());
        self.skip_whitespace_and_eol();

        match self.lexer.next()? {
            Some(Token::Literal(kw)) if kw == b"endstream" => {}
            other => return Err(PdfError::conformance(format!("expected endstream, found {:?}", other))),
        }

        Ok(raw)
    }

    fn skip_whitespace_and_eol(&mut self) {
        let cursor = self.lexer.cursor_mut();
        while let Some(ch) = cursor.peek_byte() {
            if matches!(ch, 0x00 | 0x09 | 0x0C | 0x20 | 0x0A | 0x0D) {
                cursor.read_byte();
            } else {
                break;
            }
        }
    }

    fn parse_literal_keyword_or_number(&mut self, bytes: Vec<u8>) -> PdfResult<Object> {
        match bytes.as_slice() {
            b"true" => return Ok(Object::Boolean(true)),
            b"false" => return Ok(Object::Boolean(false)),
            b"null" => return Ok(Object::Null),
            _ => {}
        }

        if looks_like_integer(&bytes) {
            let value = parse_integer(&bytes)
                .ok_or_else(|| PdfError::conformance(format!("malformed integer literal: {:?}", String::from_utf8_lossy(&bytes))))?;
            return self.resolve_integer_lookahead(value);
        }

        if looks_like_number(&bytes) {
            let value = parse_real(&bytes)
                .ok_or_else(|| PdfError::conformance(format!("malformed real literal: {:?}", String::from_utf8_lossy(&bytes))))?;
            return Ok(Object::Real(value));
        }

        Err(PdfError::conformance(format!("unrecognized keyword {:?}", String::from_utf8_lossy(&bytes))))
    }

    /// Three-token lookahead for `n g R` / `n g obj ... endobj` vs a bare
    /// integer. `v` is the already-consumed first integer.
    fn resolve_integer_lookahead(&mut self, v: i64) -> PdfResult<Object> {
        let checkpoint = self.lexer.tell();

        let second = self.lexer.next()?;
        let Some(Token::Literal(g_bytes)) = second else {
            self.lexer.seek(checkpoint);
            return Ok(Object::Integer(v));
        };
        if !looks_like_integer(&g_bytes) {
            self.lexer.seek(checkpoint);
            return Ok(Object::Integer(v));
        }
        let Some(g) = parse_integer(&g_bytes) else {
            self.lexer.seek(checkpoint);
            return Ok(Object::Integer(v));
        };

        let third_checkpoint = self.lexer.tell();
        let third = self.lexer.next()?;
        match third {
            Some(Token::Literal(kw)) if kw == b"R" => {
                if v <= 0 {
                    return Err(PdfError::conformance("indirect reference object number must be positive"));
                }
                if !(0..=u32::MAX as i64).contains(&g) {
                    return Err(PdfError::conformance(format!("indirect reference generation {} is out of range", g)));
                }
                let id = ObjectId::new(v as u32, g as u32);
                debug!(object = v, generation = g, "parsed indirect reference");
                Ok(Object::Reference(id))
            }
            Some(Token::Literal(kw)) if kw == b"obj" => {
                if v <= 0 {
                    return Err(PdfError::conformance("indirect object number must be positive"));
                }
                if !(0..=u32::MAX as i64).contains(&g) {
                    return Err(PdfError::conformance(format!("indirect object generation {} is out of range", g)));
                }
                let body = self.next_object()?;
                let id = ObjectId::new(v as u32, g as u32);
                debug!(object = v, generation = g, kind = body.type_name(), "parsed indirect object");

                match self.lexer.next()? {
                    Some(Token::Literal(kw)) if kw == b"endobj" => {}
                    other => return Err(PdfError::conformance(format!("expected endobj, found {:?}", other))),
                }
                Ok(Object::IndirectObject { id, value: Box::new(body) })
            }
            _ => {
                self.lexer.seek(third_checkpoint);
                self.lexer.seek(checkpoint);
                Ok(Object::Integer(v))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(input: &[u8]) -> Object {
        let mut parser = Parser::new(input);
        parser.next_object().unwrap()
    }

    #[test]
    fn integers_parse() {
        for (src, expected) in [("123", 123i64), ("43445", 43445), ("+17", 17), ("-98", -98), ("0", 0)] {
            assert_eq!(parse_one(src.as_bytes()), Object::Integer(expected));
        }
    }

    #[test]
    fn reals_parse() {
        for (src, expected) in [("34.5", 34.5f64), ("-3.62", -3.62), ("+123.6", 123.6), ("4.", 4.0), ("-.002", -0.002), ("0.0", 0.0)] {
            match parse_one(src.as_bytes()) {
                Object::Real(v) => assert!((v - expected).abs() < 1e-9, "{} != {}", v, expected),
                other => panic!("expected Real, got {:?}", other),
            }
        }
    }

    #[test]
    fn literal_string_parses() {
        assert_eq!(parse_one(b"(This is a string)"), Object::LiteralString(b"This is a string".to_vec()));
    }

    #[test]
    fn hex_string_parses() {
        assert_eq!(parse_one(b"<4E6F76>"), Object::HexString(b"Nov".to_vec()));
    }

    #[test]
    fn array_parses_mixed_elements() {
        let obj = parse_one(b"[549 3.14 false (Ralph) /SomeName]");
        let items = obj.as_array().unwrap();
        assert_eq!(items.len(), 5);
        assert_eq!(items[0], Object::Integer(549));
        assert!(matches!(items[1], Object::Real(_)));
        assert_eq!(items[2], Object::Boolean(false));
        assert_eq!(items[3], Object::LiteralString(b"Ralph".to_vec()));
        assert_eq!(items[4], Object::Name(Name(b"SomeName".to_vec())));
    }

    #[test]
    fn dictionary_drops_null_values() {
        let obj = parse_one(b"<< /A 1 /B null /C 2 >>");
        let dict = obj.as_dict().unwrap();
        assert!(!dict.contains_key(&Name(b"B".to_vec())));
        assert_eq!(dict.get(&Name(b"A".to_vec())), Some(&Object::Integer(1)));
        assert_eq!(dict.get(&Name(b"C".to_vec())), Some(&Object::Integer(2)));
    }

    #[test]
    fn indirect_object_parses() {
        let obj = parse_one(b"12 0 obj (Brillig) endobj");
        match obj {
            Object::IndirectObject { id, value } => {
                assert_eq!(id, ObjectId::new(12, 0));
                assert_eq!(*value, Object::LiteralString(b"Brillig".to_vec()));
            }
            other => panic!("expected IndirectObject, got {:?}", other),
        }
    }

    #[test]
    fn indirect_reference_inside_array() {
        let obj = parse_one(b"[12 0 R]");
        let items = obj.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0], Object::Reference(ObjectId::new(12, 0)));
    }

    #[test]
    fn bare_integers_are_not_mistaken_for_references() {
        let obj = parse_one(b"[1 2 3]");
        let items = obj.as_array().unwrap();
        assert_eq!(items, vec![Object::Integer(1), Object::Integer(2), Object::Integer(3)]);
    }

    #[test]
    fn stream_reads_raw_payload_by_length() {
        let input = b"<< /Length 5 >>\nstream\nhello\nendstream";
        let obj = parse_one(input);
        let stream = obj.as_stream().unwrap();
        assert_eq!(stream.raw_data, b"hello");
    }

    #[test]
    fn names_with_different_surface_encodings_compare_equal() {
        let plain = parse_one(b"/Type");
        let escaped = parse_one(b"/T#79pe");
        assert_eq!(plain, Object::Name(Name(b"Type".to_vec())));
        assert_eq!(escaped, Object::Name(Name(b"Type".to_vec())));
        assert_eq!(plain, escaped);
    }
}
