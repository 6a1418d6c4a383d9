use bytes::{Buf, BytesMut};

/// Splits a chunked byte stream into complete lines.
///
/// Works on raw bytes so that a multi-byte character split across two
/// chunks is only decoded once its line is whole.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: BytesMut,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every line it completed, without the
    /// trailing `\n` or `\r\n`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line = self.pending.split_to(pos);
            self.pending.advance(1);
            lines.push(decode(&line));
        }
        lines
    }

    /// Takes the trailing fragment left when the stream ends without a
    /// final newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = self.pending.split();
        Some(decode(&rest))
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
