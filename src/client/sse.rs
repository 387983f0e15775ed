/// One server-sent event. Comment-only frames (keep-alives) are never produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub id: Option<String>,
    pub event: Option<String>,
    pub data: String,
}

/// Incremental `text/event-stream` decoder. Chunks may split frames, lines or
/// UTF-8 sequences anywhere.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut frames = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let raw: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(frame) = parse_frame(&String::from_utf8_lossy(&raw)) {
                frames.push(frame);
            }
        }
        frames
    }
}

fn parse_frame(raw: &str) -> Option<SseFrame> {
    let mut frame = SseFrame::default();
    let mut data_lines: Vec<&str> = Vec::new();

    for line in raw.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "id" => frame.id = Some(value.to_string()),
            "event" => frame.event = Some(value.to_string()),
            "data" => data_lines.push(value),
            _ => (),
        }
    }

    if data_lines.is_empty() && frame.event.is_none() {
        return None;
    }
    frame.data = data_lines.join("\n");
    Some(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: review\ndata: {\"id\"").is_empty());
        let frames = decoder.push(b":5}\nid: 5\n\nevent: review\n");

        assert_eq!(
            frames,
            vec![SseFrame {
                id: Some("5".into()),
                event: Some("review".into()),
                data: "{\"id\":5}".into(),
            }]
        );
        assert_eq!(decoder.push(b"data: x\n\n")[0].event.as_deref(), Some("review"));
    }

    #[test]
    fn keep_alives_are_skipped() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b":\n\n: ping\n\n").is_empty());
    }

    #[test]
    fn crlf_and_multiline_data() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: one\r\ndata: two\r\n\r\n");
        assert_eq!(frames[0].data, "one\ntwo");
        assert_eq!(frames[0].id, None);
    }

    #[test]
    fn utf8_split_mid_character() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: caf\u{e9}\n\n".as_bytes();
        let (head, tail) = bytes.split_at(10);
        assert!(decoder.push(head).is_empty());
        assert_eq!(decoder.push(tail)[0].data, "caf\u{e9}");
    }
}
