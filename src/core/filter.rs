//! Stream filter pipeline: decodes a stream's raw payload into its logical
//! bytes by chaining the filters named in its dictionary.
//!
//! `FlateDecode` decompression is the one filter with a solid crate anchor
//! (`flate2`); `LZWDecode`, `ASCIIHexDecode`, and `ASCII85Decode` have no
//! corresponding crate in this workspace's dependency set and are
//! hand-rolled here, the same way real-world PDF crates (e.g. `lopdf`)
//! carry their own narrow LZW implementation rather than pull in a
//! dependency for it.

use flate2::read::ZlibDecoder;
use std::io::Read;

use super::error::{PdfError, PdfResult};
use super::object::{Dictionary, Name, Object};

/// Reads `Filter` and `DecodeParms` off a stream dictionary and applies each
/// named filter left to right over `raw`.
pub fn decode_stream(dict: &Dictionary, raw: &[u8]) -> PdfResult<Vec<u8>> {
    let filters = filter_names(dict)?;
    let params = decode_params(dict, filters.len())?;

    let mut data = raw.to_vec();
    for (name, parms) in filters.iter().zip(params.iter()) {
        data = apply_filter(name, &data, parms.as_ref())?;
    }
    Ok(data)
}

fn filter_names(dict: &Dictionary) -> PdfResult<Vec<Name>> {
    match dict.get(&Name(b"Filter".to_vec())) {
        None => Ok(Vec::new()),
        Some(Object::Name(n)) => Ok(vec![n.clone()]),
        Some(Object::Array(items)) => items
            .iter()
            .map(|o| o.as_name().cloned().ok_or_else(|| PdfError::conformance("Filter array must contain only names")))
            .collect(),
        Some(other) => Err(PdfError::conformance(format!("Filter must be a name or array of names, found {}", other.type_name()))),
    }
}

fn decode_params(dict: &Dictionary, num_filters: usize) -> PdfResult<Vec<Option<Dictionary>>> {
    match dict.get(&Name(b"DecodeParms".to_vec())) {
        None => Ok(vec![None; num_filters]),
        Some(Object::Dictionary(d)) => Ok(vec![Some(d.clone())]),
        Some(Object::Null) => Ok(vec![None; num_filters]),
        Some(Object::Array(items)) => items
            .iter()
            .map(|o| match o {
                Object::Dictionary(d) => Ok(Some(d.clone())),
                Object::Null => Ok(None),
                other => Err(PdfError::conformance(format!("DecodeParms array entries must be dictionaries or null, found {}", other.type_name()))),
            })
            .collect(),
        Some(other) => Err(PdfError::conformance(format!("DecodeParms must be a dictionary or array, found {}", other.type_name()))),
    }
}

fn predictor_of(parms: Option<&Dictionary>) -> i64 {
    parms
        .and_then(|d| d.get(&Name(b"Predictor".to_vec())))
        .and_then(Object::as_integer)
        .unwrap_or(1)
}

fn apply_filter(name: &Name, data: &[u8], parms: Option<&Dictionary>) -> PdfResult<Vec<u8>> {
    match name.as_bytes() {
        b"FlateDecode" | b"Fl" => {
            if predictor_of(parms) != 1 {
                return Err(PdfError::not_supported("FlateDecode with a non-identity Predictor"));
            }
            decode_flate(data)
        }
        b"LZWDecode" | b"LZW" => {
            if predictor_of(parms) != 1 {
                return Err(PdfError::not_supported("LZWDecode with a non-identity Predictor"));
            }
            decode_lzw(data)
        }
        b"ASCIIHexDecode" | b"AHx" => decode_ascii_hex(data),
        b"ASCII85Decode" | b"A85" => decode_ascii85(data),
        b"RunLengthDecode" | b"RL" => Err(PdfError::not_supported("RunLengthDecode")),
        b"CCITTFaxDecode" | b"CCF" => Err(PdfError::not_supported("CCITTFaxDecode")),
        b"JBIG2Decode" => Err(PdfError::not_supported("JBIG2Decode")),
        b"DCTDecode" | b"DCT" => Err(PdfError::not_supported("DCTDecode")),
        b"JPXDecode" => Err(PdfError::not_supported("JPXDecode")),
        b"Crypt" => Err(PdfError::not_supported("Crypt")),
        _ => Err(PdfError::conformance(format!("unknown stream filter {}", name))),
    }
}

/// Raw zlib inflate.
fn decode_flate(data: &[u8]) -> PdfResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| PdfError::conformance(format!("FlateDecode: {}", e)))?;
    Ok(out)
}

/// Hex-decodes the payload, tolerating the trailing `>` terminator and
/// whitespace; an odd trailing nibble is padded with a zero low nibble, the
/// same tolerance rule the tokenizer applies to hex strings.
fn decode_ascii_hex(data: &[u8]) -> PdfResult<Vec<u8>> {
    let mut out = Vec::new();
    let mut pending: Option<u8> = None;
    for &ch in data {
        if ch == b'>' {
            break;
        }
        if matches!(ch, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20) {
            continue;
        }
        let nibble = match ch {
            b'0'..=b'9' => ch - b'0',
            b'A'..=b'F' => ch - b'A' + 10,
            b'a'..=b'f' => ch - b'a' + 10,
            _ => return Err(PdfError::conformance(format!("non-hex byte {:#04x} in ASCIIHexDecode stream", ch))),
        };
        match pending.take() {
            None => pending = Some(nibble),
            Some(hi) => out.push((hi << 4) | nibble),
        }
    }
    if let Some(hi) = pending {
        out.push(hi << 4);
    }
    Ok(out)
}

const ASCII85_OFFSET: u8 = b'!';

/// Adobe-flavored ASCII-85: groups of 5 printable bytes decode to 4 output
/// bytes via base-85, `z` is a shorthand for an all-zero group, and the
/// stream is terminated by `~>`.
fn decode_ascii85(data: &[u8]) -> PdfResult<Vec<u8>> {
    let mut out = Vec::new();
    let mut group: Vec<u8> = Vec::with_capacity(5);
    let mut iter = data.iter().copied().peekable();

    while let Some(ch) = iter.next() {
        if matches!(ch, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20) {
            continue;
        }
        if ch == b'~' {
            break;
        }
        if ch == b'z' && group.is_empty() {
            out.extend_from_slice(&[0, 0, 0, 0]);
            continue;
        }
        if !(ASCII85_OFFSET..=ASCII85_OFFSET + 84).contains(&ch) {
            return Err(PdfError::conformance(format!("byte {:#04x} is out of range for ASCII85Decode", ch)));
        }
        group.push(ch - ASCII85_OFFSET);
        if group.len() == 5 {
            out.extend_from_slice(&ascii85_group_to_bytes(&group, 4));
            group.clear();
        }
    }

    if !group.is_empty() {
        let n = group.len();
        if n == 1 {
            return Err(PdfError::conformance("ASCII85Decode final group has only one byte"));
        }
        // Pad the partial group with the highest symbol value (84) before
        // decoding, then keep only n - 1 output bytes.
        while group.len() < 5 {
            group.push(84);
        }
        out.extend_from_slice(&ascii85_group_to_bytes(&group, n - 1));
    }

    Ok(out)
}

fn ascii85_group_to_bytes(group: &[u8], keep: usize) -> Vec<u8> {
    let mut value: u32 = 0;
    for &digit in group {
        value = value.wrapping_mul(85).wrapping_add(digit as u32);
    }
    let bytes = value.to_be_bytes();
    bytes[..keep].to_vec()
}

/// Reads the next `width`-bit code from a big-endian bitstream, advancing
/// `bit_buf`/`bit_count`/`byte_pos`. Returns `None` once the stream is
/// exhausted.
fn next_lzw_code(data: &[u8], width: u32, bit_buf: &mut u32, bit_count: &mut u32, byte_pos: &mut usize) -> Option<u16> {
    while *bit_count < width {
        if *byte_pos >= data.len() {
            return None;
        }
        *bit_buf = (*bit_buf << 8) | data[*byte_pos] as u32;
        *byte_pos += 1;
        *bit_count += 8;
    }
    let shift = *bit_count - width;
    let code = (*bit_buf >> shift) & ((1 << width) - 1);
    *bit_count = shift;
    Some(code as u16)
}

fn reset_lzw_table(table: &mut Vec<Vec<u8>>) {
    table.clear();
    for b in 0..256u16 {
        table.push(vec![b as u8]);
    }
    table.push(Vec::new()); // 256: clear-table marker, unused as data
    table.push(Vec::new()); // 257: end-of-data marker, unused as data
}

/// 9-to-12-bit-code LZW decoder, early-change variant (PDF's LZW always uses
/// `EarlyChange = 1` semantics: the code width grows one code early).
fn decode_lzw(data: &[u8]) -> PdfResult<Vec<u8>> {
    const CLEAR_TABLE: u16 = 256;
    const EOD: u16 = 257;

    let mut out = Vec::new();
    let mut table: Vec<Vec<u8>> = Vec::new();
    reset_lzw_table(&mut table);

    let mut code_width: u32 = 9;
    let mut bit_buf: u32 = 0;
    let mut bit_count: u32 = 0;
    let mut byte_pos = 0usize;
    let mut prev: Option<Vec<u8>> = None;

    loop {
        let code = match next_lzw_code(data, code_width, &mut bit_buf, &mut bit_count, &mut byte_pos) {
            Some(c) => c,
            None => break,
        };

        if code == EOD {
            break;
        }
        if code == CLEAR_TABLE {
            reset_lzw_table(&mut table);
            code_width = 9;
            prev = None;
            continue;
        }

        let entry = if (code as usize) < table.len() {
            table[code as usize].clone()
        } else if code as usize == table.len() {
            let mut e = prev.clone().ok_or_else(|| PdfError::conformance("LZWDecode references an undefined code with no prior entry"))?;
            let first = e[0];
            e.push(first);
            e
        } else {
            return Err(PdfError::conformance("LZWDecode code references beyond the known table"));
        };

        out.extend_from_slice(&entry);

        if let Some(p) = prev.take() {
            let mut new_entry = p;
            new_entry.push(entry[0]);
            table.push(new_entry);
        }
        prev = Some(entry);

        let table_len = table.len();
        if table_len + 1 >= (1 << code_width) && code_width < 12 {
            code_width += 1;
        }
    }

    Ok(out)
}
