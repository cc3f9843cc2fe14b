//! Streaming decoders (Bytes -> text -> SSE `data:` payloads)
//!
//! Chunk boundaries from the transport are arbitrary: a chunk may end in the
//! middle of a line or in the middle of a multi-byte character. Both decoders
//! here carry the incomplete tail over to the next chunk.

/// Incremental UTF-8 decoder.
///
/// Invalid sequences become U+FFFD; an incomplete sequence at the end of a
/// chunk is held back until the next chunk completes it.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let buf = if self.pending.is_empty() {
            // Fast path: most chunks are complete, valid UTF-8.
            if let Ok(s) = std::str::from_utf8(chunk) {
                return s.to_string();
            }
            chunk.to_vec()
        } else {
            let mut buf = std::mem::take(&mut self.pending);
            buf.extend_from_slice(chunk);
            buf
        };

        let mut out = String::with_capacity(buf.len());
        let mut start = 0;
        loop {
            match std::str::from_utf8(&buf[start..]) {
                Ok(s) => {
                    out.push_str(s);
                    start = buf.len();
                    break;
                }
                Err(err) => {
                    let valid_end = start + err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&buf[start..valid_end]));
                    match err.error_len() {
                        Some(invalid_len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + invalid_len;
                        }
                        None => {
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }
        self.pending = buf[start..].to_vec();
        out
    }

    /// Flush at end of input; a dangling partial character becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Payload of an SSE `data:` line, if `line` is one.
///
/// Whitespace after the colon is skipped, as is trailing whitespace.
pub fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:")
        .map(|rest| rest.trim_start().trim_end())
}

/// Line buffer for the event stream.
///
/// Lines end in `\n`, `\r\n` or a lone `\r`. Complete `data:` lines are
/// consumed exactly once; other complete lines (comments, `event:`, blank
/// separators) are dropped; the trailing incomplete line is carried into the
/// next push.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: String,
    // The previous push ended on `\r`; a leading `\n` belongs to that line.
    skip_lf: bool,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: &str) -> Vec<String> {
        let mut text = text;
        if self.skip_lf && !text.is_empty() {
            self.skip_lf = false;
            text = text.strip_prefix('\n').unwrap_or(text);
        }
        self.pending.push_str(text);

        let mut payloads = Vec::new();
        let mut start = 0;
        while let Some(rel) = self.pending[start..].find(&['\r', '\n'][..]) {
            let end = start + rel;
            let line = &self.pending[start..end];
            match data_payload(line) {
                Some(payload) => payloads.push(payload.to_string()),
                None if !line.is_empty() => tracing::trace!(line, "skipping non-data SSE line"),
                None => {}
            }
            start = end + 1;
            if self.pending.as_bytes()[end] == b'\r' {
                match self.pending.as_bytes().get(start).copied() {
                    Some(b'\n') => start += 1,
                    Some(_) => {}
                    None => self.skip_lf = true,
                }
            }
        }
        if start > 0 {
            self.pending.drain(..start);
        }
        payloads
    }

    /// End of stream: a final `data:` line without a terminator is still delivered.
    ///
    /// The raw tail stays in [`SseLineBuffer::pending`] until the caller
    /// [`clear`](SseLineBuffer::clear)s it, so a failed stream can report a
    /// tail it could not use.
    pub fn finish(&self) -> Option<String> {
        data_payload(&self.pending).map(str::to_string)
    }

    /// Text received but not yet consumed as a complete line.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.skip_lf = false;
    }
}
