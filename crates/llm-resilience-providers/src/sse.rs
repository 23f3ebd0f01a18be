//! Minimal SSE frame decoder: `data: ...\n\n` events, terminated by
//! `data: [DONE]` (§4.5).

/// Incrementally feeds raw bytes in and yields complete `data:` payloads
/// out, one per call. Lines not prefixed with `data:` (comments, blank
/// keep-alives) are skipped.
#[derive(Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` to the internal buffer and drains every complete
    /// line, returning the `data:` payloads found (sans prefix). Returns
    /// `None` entries already filtered out; `Some("[DONE]")` signals the
    /// terminal frame so the caller can stop polling.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));
        let mut payloads = Vec::new();

        while let Some(newline_pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline_pos).collect();
            let line = line.trim();

            if let Some(payload) = line.strip_prefix("data:") {
                let payload = payload.trim();
                if !payload.is_empty() {
                    payloads.push(payload.to_string());
                }
            }
        }

        payloads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_single_complete_frame() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.push(b"data: {\"token\":\"hi\"}\n\n");
        assert_eq!(payloads, vec!["{\"token\":\"hi\"}".to_string()]);
    }

    #[test]
    fn decodes_frame_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"tok").is_empty());
        let payloads = decoder.push(b"en\":\"hi\"}\n");
        assert_eq!(payloads, vec!["{\"token\":\"hi\"}".to_string()]);
    }

    #[test]
    fn recognizes_terminal_done_marker() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.push(b"data: [DONE]\n");
        assert_eq!(payloads, vec!["[DONE]".to_string()]);
    }

    #[test]
    fn ignores_blank_keepalive_lines() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.push(b"\n\ndata: {\"token\":\"x\"}\n\n");
        assert_eq!(payloads, vec!["{\"token\":\"x\"}".to_string()]);
    }
}
