//! Context-sensitive tokenizer over raw PDF bytes.
//!
//! The PDF lexical grammar is not regular in the usual sense: literal
//! strings, hex strings, names, and comments each have their own character
//! rules that only apply once their introducing delimiter has been seen.
//! [`Lexer`] models this as an explicit five-state machine (ISO 32000-2
//! §7.2.3) rather than threading ad hoc lookahead through a single `next`
//! loop.
//!
//! Based on pdfls's `Tokenizer` (stateful, five contexts).

use tracing::trace;

use super::cursor::Cursor;
use super::error::{PdfError, PdfResult};
use super::token::Token;

const LF: u8 = 0x0A;
const CR: u8 = 0x0D;

fn is_whitespace(ch: u8) -> bool {
    matches!(ch, 0x00 | 0x09 | 0x0C | 0x20)
}

fn is_eol(ch: u8) -> bool {
    matches!(ch, LF | CR)
}

fn is_delimiter(ch: u8) -> bool {
    matches!(ch, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn hex_value(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        _ => None,
    }
}

/// The five lexical contexts a [`Lexer`] can be in.
///
/// Seeking always resets the context to `Free`; callers must never seek
/// into the middle of a string or name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Free,
    Comment,
    LiteralString,
    HexString,
    Name,
}

/// Tokenizer producing a lazy, restartable sequence of [`Token`]s.
///
/// Holds a [`Cursor`] (shared with the document loader for line scanning)
/// and its own lexical [`Context`]. By default comments are consumed and
/// discarded transparently; construct with [`Lexer::with_comments`] to get
/// them back as [`Token::Comment`].
pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    context: Context,
    skip_comments: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Lexer { cursor: Cursor::new(buffer), context: Context::Free, skip_comments: true }
    }

    pub fn from_cursor(cursor: Cursor<'a>) -> Self {
        Lexer { cursor, context: Context::Free, skip_comments: true }
    }

    pub fn with_comments(buffer: &'a [u8]) -> Self {
        Lexer { cursor: Cursor::new(buffer), context: Context::Free, skip_comments: false }
    }

    pub fn tell(&self) -> usize {
        self.cursor.tell()
    }

    /// Seeks to an absolute byte offset, resetting lexical context to
    /// `Free`. The caller is responsible for never seeking into the middle
    /// of a string, name, or comment.
    pub fn seek(&mut self, offset: usize) {
        self.cursor.seek(offset);
        self.context = Context::Free;
    }

    pub fn cursor(&self) -> &Cursor<'a> {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut Cursor<'a> {
        &mut self.cursor
    }

    /// Produces the next token, or `Ok(None)` at end of input.
    pub fn next(&mut self) -> PdfResult<Option<Token>> {
        trace!(pos = self.cursor.tell(), context = ?self.context, "lexing from position");
        match self.context {
            Context::Free => self.next_in_free_context(),
            Context::Comment => {
                let tok = self.read_comment_content()?;
                self.context = Context::Free;
                Ok(Some(tok))
            }
            Context::LiteralString => {
                let tok = self.read_literal_string_content()?;
                self.context = Context::Free;
                Ok(Some(tok))
            }
            Context::HexString => {
                let tok = self.read_hex_string_content()?;
                self.context = Context::Free;
                Ok(Some(tok))
            }
            Context::Name => {
                let tok = self.read_name_content()?;
                self.context = Context::Free;
                Ok(Some(tok))
            }
        }
    }

    fn next_in_free_context(&mut self) -> PdfResult<Option<Token>> {
        let mut literal: Option<Vec<u8>> = None;
        loop {
            let ch = match self.cursor.read_byte() {
                Some(ch) => ch,
                None => return Ok(literal.map(Token::Literal)),
            };

            if is_whitespace(ch) || is_eol(ch) {
                if let Some(lit) = literal {
                    return Ok(Some(Token::Literal(lit)));
                }
                continue;
            }

            if is_delimiter(ch) {
                if let Some(lit) = literal {
                    // Roll back one byte so the delimiter is re-read on the
                    // next call, after this literal is returned.
                    self.cursor.seek(self.cursor.tell() - 1);
                    return Ok(Some(Token::Literal(lit)));
                }
                return self.read_delimiter(ch);
            }

            literal.get_or_insert_with(Vec::new).push(ch);
        }
    }

    fn read_delimiter(&mut self, ch: u8) -> PdfResult<Option<Token>> {
        match ch {
            b'(' => {
                self.context = Context::LiteralString;
                Ok(Some(Token::LitStart))
            }
            b')' => Ok(Some(Token::LitEnd)),
            b'<' => {
                if self.cursor.peek_byte() == Some(b'<') {
                    self.cursor.read_byte();
                    Ok(Some(Token::DictStart))
                } else {
                    self.context = Context::HexString;
                    Ok(Some(Token::HexStart))
                }
            }
            b'>' => {
                if self.cursor.peek_byte() == Some(b'>') {
                    self.cursor.read_byte();
                    Ok(Some(Token::DictEnd))
                } else {
                    Ok(Some(Token::HexEnd))
                }
            }
            b'[' => Ok(Some(Token::ArrayStart)),
            b']' => Ok(Some(Token::ArrayEnd)),
            b'{' | b'}' => Err(PdfError::not_supported("{ and } are not part of supported PDF syntax")),
            b'/' => {
                self.context = Context::Name;
                Ok(Some(Token::Solidus))
            }
            b'%' => {
                self.context = Context::Comment;
                if self.skip_comments {
                    let _ = self.read_comment_content()?;
                    self.context = Context::Free;
                    self.next_in_free_context()
                } else {
                    Ok(Some(Token::Comment(Vec::new())))
                }
            }
            other => Err(PdfError::bug(format!("{:#04x} is not a delimiter character", other))),
        }
    }

    fn read_comment_content(&mut self) -> PdfResult<Token> {
        let mut buf = Vec::new();
        loop {
            match self.cursor.read_byte() {
                None => return Err(PdfError::conformance("PDF exhausted before comment was terminated")),
                Some(ch) if is_eol(ch) => return Ok(Token::Comment(buf)),
                Some(ch) => buf.push(ch),
            }
        }
    }

    fn read_literal_string_content(&mut self) -> PdfResult<Token> {
        let mut buf = Vec::new();
        let mut depth: i32 = 0;
        loop {
            let ch = self
                .cursor
                .read_byte()
                .ok_or_else(|| PdfError::conformance("PDF exhausted reading literal string before )"))?;

            if is_eol(ch) {
                buf.push(LF);
            } else if ch == b'\\' {
                self.read_literal_escape(&mut buf)?;
            } else if ch == b'(' {
                depth += 1;
                buf.push(ch);
            } else if ch == b')' {
                if depth > 0 {
                    depth -= 1;
                    buf.push(ch);
                } else {
                    self.cursor.seek(self.cursor.tell() - 1);
                    break;
                }
            } else {
                buf.push(ch);
            }
        }
        Ok(Token::Literal(buf))
    }

    fn read_literal_escape(&mut self, buf: &mut Vec<u8>) -> PdfResult<()> {
        let ch = self
            .cursor
            .read_byte()
            .ok_or_else(|| PdfError::conformance("PDF exhausted reading literal string escape before )"))?;
        match ch {
            b'n' => buf.push(0x0A),
            b'r' => buf.push(0x0D),
            b't' => buf.push(0x09),
            b'b' => buf.push(0x08),
            b'f' => buf.push(0x0C),
            b'(' => buf.push(b'('),
            b')' => buf.push(b')'),
            b'\\' => buf.push(b'\\'),
            _ if is_eol(ch) => {
                // line continuation: \EOL emits nothing
            }
            d1 if d1.is_ascii_digit() => {
                let mut value = (d1 - b'0') as u32;
                for _ in 0..2 {
                    match self.cursor.peek_byte() {
                        Some(d) if d.is_ascii_digit() => {
                            self.cursor.read_byte();
                            value = value * 8 + (d - b'0') as u32;
                        }
                        _ => break,
                    }
                }
                if value >= 0x100 {
                    return Err(PdfError::conformance("\\ddd octal escape is greater than 0xFF"));
                }
                buf.push(value as u8);
            }
            _ => {
                // unknown escape: drop the backslash silently
            }
        }
        Ok(())
    }

    fn read_hex_string_content(&mut self) -> PdfResult<Token> {
        let mut buf = Vec::new();
        let mut pending: Option<u8> = None;
        loop {
            let ch = self
                .cursor
                .read_byte()
                .ok_or_else(|| PdfError::conformance("PDF exhausted reading hex string before >"))?;
            if ch == b'>' {
                self.cursor.seek(self.cursor.tell() - 1);
                break;
            }
            let nibble = hex_value(ch)
                .ok_or_else(|| PdfError::conformance(format!("non-hex character {:#04x} in hex string", ch)))?;
            match pending.take() {
                None => pending = Some(nibble),
                Some(hi) => buf.push((hi << 4) | nibble),
            }
        }
        if let Some(hi) = pending {
            buf.push(hi << 4);
        }
        Ok(Token::Literal(buf))
    }

    fn read_name_content(&mut self) -> PdfResult<Token> {
        let mut buf = Vec::new();
        loop {
            let ch = match self.cursor.read_byte() {
                None => break,
                Some(ch) => ch,
            };
            if ch == b'#' {
                let d1 = self
                    .cursor
                    .read_byte()
                    .ok_or_else(|| PdfError::conformance("PDF exhausted reading name #xx escape"))?;
                let v1 = hex_value(d1)
                    .ok_or_else(|| PdfError::conformance(format!("non-hex character {:#04x} in name escape", d1)))?;
                let d2 = self
                    .cursor
                    .read_byte()
                    .ok_or_else(|| PdfError::conformance("PDF exhausted reading name #xx escape"))?;
                let v2 = hex_value(d2)
                    .ok_or_else(|| PdfError::conformance(format!("non-hex character {:#04x} in name escape", d2)))?;
                buf.push((v1 << 4) | v2);
            } else if is_whitespace(ch) || is_eol(ch) {
                break;
            } else if is_delimiter(ch) {
                self.cursor.seek(self.cursor.tell() - 1);
                break;
            } else {
                buf.push(ch);
            }
        }
        if buf.is_empty() {
            return Err(PdfError::conformance("zero-length name"));
        }
        Ok(Token::Literal(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &[u8]) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        while let Some(tok) = lexer.next().unwrap() {
            out.push(tok);
        }
        out
    }

    #[test]
    fn delimiters_produce_structural_tokens() {
        assert_eq!(tokens(b"/"), vec![Token::Solidus]);
        assert_eq!(tokens(b"<<"), vec![Token::DictStart]);
        assert_eq!(tokens(b">>"), vec![Token::DictEnd]);
        assert_eq!(tokens(b"["), vec![Token::ArrayStart]);
        assert_eq!(tokens(b"]"), vec![Token::ArrayEnd]);
        assert_eq!(tokens(b"<"), vec![Token::HexStart]);
        assert_eq!(tokens(b">"), vec![Token::HexEnd]);
        assert_eq!(tokens(b"("), vec![Token::LitStart]);
    }

    #[test]
    fn iso_32000_2_7_2_4_example() {
        let toks = tokens(b"abc%comment (/%) blah blah blah\n123");
        assert_eq!(toks, vec![Token::Literal(b"abc".to_vec()), Token::Literal(b"123".to_vec())]);
    }

    #[test]
    fn eol_variants_separate_literals() {
        for marker in [&b"\n"[..], &b"\r"[..], &b"\r\n"[..]] {
            let mut buf = b"abc".to_vec();
            buf.extend_from_slice(marker);
            buf.extend_from_slice(b"def");
            let toks = tokens(&buf);
            assert_eq!(toks, vec![Token::Literal(b"abc".to_vec()), Token::Literal(b"def".to_vec())]);
        }
    }

    #[test]
    fn literal_string_escapes() {
        let mut lexer = Lexer::new(b"(This is a string)");
        assert_eq!(lexer.next().unwrap(), Some(Token::LitStart));
        assert_eq!(lexer.next().unwrap(), Some(Token::Literal(b"This is a string".to_vec())));
        assert_eq!(lexer.next().unwrap(), Some(Token::LitEnd));
    }

    #[test]
    fn literal_string_balanced_parens() {
        let mut lexer = Lexer::new(b"(())");
        lexer.next().unwrap();
        assert_eq!(lexer.next().unwrap(), Some(Token::Literal(b"()".to_vec())));
    }

    #[test]
    fn literal_string_octal_escapes() {
        let mut lexer = Lexer::new(b"(\\053)");
        lexer.next().unwrap();
        assert_eq!(lexer.next().unwrap(), Some(Token::Literal(b"+".to_vec())));

        let mut lexer = Lexer::new(b"(\\53)");
        lexer.next().unwrap();
        assert_eq!(lexer.next().unwrap(), Some(Token::Literal(b"+".to_vec())));

        let mut lexer = Lexer::new(b"(\\5)");
        lexer.next().unwrap();
        assert_eq!(lexer.next().unwrap(), Some(Token::Literal(vec![0x05])));
    }

    #[test]
    fn literal_string_line_continuation_emits_nothing() {
        let mut lexer = Lexer::new(b"(\\\r\n)");
        lexer.next().unwrap();
        assert_eq!(lexer.next().unwrap(), Some(Token::Literal(Vec::new())));
    }

    #[test]
    fn literal_string_eol_normalizes_to_lf() {
        let mut lexer = Lexer::new(b"(a\r\nb)");
        lexer.next().unwrap();
        assert_eq!(lexer.next().unwrap(), Some(Token::Literal(b"a\nb".to_vec())));
    }

    #[test]
    fn hex_string_decodes_pairs() {
        let mut lexer = Lexer::new(b"<4E6F76>");
        lexer.next().unwrap();
        assert_eq!(lexer.next().unwrap(), Some(Token::Literal(b"Nov".to_vec())));
    }

    #[test]
    fn hex_string_pads_odd_digit_count() {
        let mut lexer = Lexer::new(b"<901FA>");
        lexer.next().unwrap();
        assert_eq!(lexer.next().unwrap(), Some(Token::Literal(vec![0x90, 0x1f, 0xa0])));
    }

    #[test]
    fn hex_string_rejects_non_hex() {
        let mut lexer = Lexer::new(b"<12G4>");
        lexer.next().unwrap();
        assert!(lexer.next().is_err());
    }

    #[test]
    fn name_decodes_hash_escapes() {
        let mut lexer = Lexer::new(b"/Lime#20Green");
        lexer.next().unwrap();
        assert_eq!(lexer.next().unwrap(), Some(Token::Literal(b"Lime Green".to_vec())));

        let mut lexer = Lexer::new(b"/A#42");
        lexer.next().unwrap();
        assert_eq!(lexer.next().unwrap(), Some(Token::Literal(b"AB".to_vec())));
    }

    #[test]
    fn name_empty_is_conformance_error() {
        let mut lexer = Lexer::new(b"/ ");
        lexer.next().unwrap();
        assert!(lexer.next().is_err());
    }

    #[test]
    fn seek_resets_context_to_free() {
        let mut lexer = Lexer::new(b"(abc)123");
        lexer.next().unwrap(); // LitStart
        lexer.seek(5);
        assert_eq!(lexer.next().unwrap(), Some(Token::Literal(b"123".to_vec())));
    }
}
