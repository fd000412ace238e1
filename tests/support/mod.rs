//! Minimal hand-rolled PDF byte-buffer builder for constructing fixtures in
//! integration tests, without needing real-world sample files on disk.

use std::collections::BTreeMap;

enum Body {
    Dict(String),
    Stream { dict: String, raw: Vec<u8> },
}

pub struct PdfBuilder {
    next: u32,
    objects: BTreeMap<u32, Body>,
    extra_trailer_entry: Option<String>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        PdfBuilder { next: 1, objects: BTreeMap::new(), extra_trailer_entry: None }
    }

    pub fn reserve(&mut self) -> u32 {
        let n = self.next;
        self.next += 1;
        n
    }

    pub fn object(&mut self, body: impl Into<String>) -> u32 {
        let n = self.reserve();
        self.define(n, body);
        n
    }

    pub fn define(&mut self, num: u32, body: impl Into<String>) {
        self.objects.insert(num, Body::Dict(body.into()));
    }

    pub fn define_stream(&mut self, num: u32, dict_without_length: &str, raw: &[u8]) {
        let dict = dict_without_length.trim_end();
        let dict = dict.strip_suffix(">>").expect("stream dict must end with >>").trim_end();
        let dict = format!("{} /Length {} >>", dict, raw.len());
        self.objects.insert(num, Body::Stream { dict, raw: raw.to_vec() });
    }

    pub fn set_extra_trailer_entry(&mut self, entry: &str) {
        self.extra_trailer_entry = Some(entry.to_string());
    }

    pub fn finish(&mut self, catalog: u32) -> Vec<u8> {
        self.build(Some(catalog))
    }

    pub fn finish_without_root(&mut self) -> Vec<u8> {
        self.build(None)
    }

    fn build(&mut self, catalog: Option<u32>) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n");

        let max_num = self.objects.keys().copied().max().unwrap_or(0);
        let mut offsets: BTreeMap<u32, usize> = BTreeMap::new();

        for num in 1..=max_num {
            if let Some(body) = self.objects.get(&num) {
                offsets.insert(num, buf.len());
                buf.extend_from_slice(format!("{} 0 obj\n", num).as_bytes());
                match body {
                    Body::Dict(d) => {
                        buf.extend_from_slice(d.as_bytes());
                        buf.extend_from_slice(b"\n");
                    }
                    Body::Stream { dict, raw } => {
                        buf.extend_from_slice(dict.as_bytes());
                        buf.extend_from_slice(b"\nstream\n");
                        buf.extend_from_slice(raw);
                        buf.extend_from_slice(b"\nendstream\n");
                    }
                }
                buf.extend_from_slice(b"endobj\n");
            }
        }

        let xref_offset = buf.len();
        buf.extend_from_slice(format!("xref\n0 {}\n", max_num + 1).as_bytes());
        buf.extend_from_slice(b"0000000000 65535 f \n");
        for num in 1..=max_num {
            match offsets.get(&num) {
                Some(off) => buf.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes()),
                None => buf.extend_from_slice(b"0000000000 00000 f \n"),
            }
        }

        let mut trailer = format!("<< /Size {}", max_num + 1);
        if let Some(cat) = catalog {
            trailer.push_str(&format!(" /Root {} 0 R", cat));
        }
        if let Some(extra) = &self.extra_trailer_entry {
            trailer.push(' ');
            trailer.push_str(extra);
        }
        trailer.push_str(" >>\n");
        buf.extend_from_slice(b"trailer\n");
        buf.extend_from_slice(trailer.as_bytes());
        buf.extend_from_slice(b"startxref\n");
        buf.extend_from_slice(format!("{}\n", xref_offset).as_bytes());
        buf.extend_from_slice(b"%%EOF");

        buf
    }
}
