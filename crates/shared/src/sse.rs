//! Server-Sent Events framing, decoupled from any transport.
//!
//! Wire format: `event: <name>\ndata: <json>\n\n`, UTF-8, frames separated
//! by a blank line. The decoder accepts arbitrary byte slices and buffers a
//! trailing partial frame until its terminator arrives, so a frame split
//! across two network reads is still emitted exactly once.

use serde_json::Value;

use crate::models::StreamEvent;

/// Encode a single named event as one SSE frame.
pub fn encode_event(name: &str, payload: &Value) -> String {
    format!("event: {name}\ndata: {payload}\n\n")
}

pub fn encode_stream_event(event: &StreamEvent) -> String {
    encode_event(event.name(), &event.payload())
}

/// A decoded frame: event name plus its JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct SseMessage {
    pub event: String,
    pub data: Value,
}

impl SseMessage {
    pub fn as_stream_event(&self) -> Option<StreamEvent> {
        StreamEvent::from_parts(&self.event, &self.data)
    }
}

/// Incremental frame decoder over a raw byte buffer.
///
/// Bytes are accumulated until a `\n\n` terminator is seen; only then is the
/// frame parsed, so multi-byte UTF-8 sequences split across reads never
/// corrupt a frame. Frames that are not valid UTF-8 or carry unparseable
/// JSON are skipped, not fatal.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseMessage> {
        self.buffer.extend_from_slice(bytes);

        let mut messages = Vec::new();
        while let Some(end) = frame_terminator(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..end + 2).collect();
            let Ok(text) = std::str::from_utf8(&frame[..end]) else {
                continue;
            };
            if let Some(message) = parse_frame(text) {
                messages.push(message);
            }
        }
        messages
    }

    /// Bytes still waiting for a frame terminator.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

fn frame_terminator(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|pair| pair == b"\n\n")
}

fn parse_frame(text: &str) -> Option<SseMessage> {
    let mut event = None;
    let mut data = String::new();

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            event = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }

    if data.is_empty() {
        return None;
    }
    let data = serde_json::from_str(&data).ok()?;
    Some(SseMessage {
        // Unnamed frames default to "message" per the SSE convention.
        event: event.unwrap_or_else(|| "message".to_string()),
        data,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{SseDecoder, encode_event};

    #[test]
    fn encodes_named_event_with_double_newline_terminator() {
        let frame = encode_event("answer-start", &json!({ "totalChars": 42 }));
        assert_eq!(frame, "event: answer-start\ndata: {\"totalChars\":42}\n\n");
    }

    #[test]
    fn decodes_event_split_across_two_reads_exactly_once() {
        let frame = encode_event("run-created", &json!({ "runId": "run_1", "status": "queued" }));
        let bytes = frame.as_bytes();

        // Split at every possible boundary, including mid-terminator.
        for split in 0..bytes.len() {
            let mut decoder = SseDecoder::new();
            let mut messages = decoder.push(&bytes[..split]);
            messages.extend(decoder.push(&bytes[split..]));

            assert_eq!(messages.len(), 1, "split at {split}");
            assert_eq!(messages[0].event, "run-created");
            assert_eq!(messages[0].data["runId"], "run_1");
            assert_eq!(decoder.pending_len(), 0);
        }
    }

    #[test]
    fn decodes_multiple_frames_from_one_read() {
        let mut payload = encode_event("start", &json!({ "message": "Starting agent run" }));
        payload.push_str(&encode_event("heartbeat", &json!({ "pollCount": 5, "elapsed": 5 })));

        let mut decoder = SseDecoder::new();
        let messages = decoder.push(payload.as_bytes());

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].event, "start");
        assert_eq!(messages[1].event, "heartbeat");
    }

    #[test]
    fn keeps_partial_frame_buffered_until_terminated() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: done\ndata: {\"success\":true,").is_empty());
        assert!(decoder.pending_len() > 0);

        let messages = decoder.push(b"\"answerLength\":1,\"documentLength\":2}\n\n");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].data["success"], true);
    }

    #[test]
    fn split_inside_multibyte_character_survives_reassembly() {
        let frame = encode_event("answer-chunk", &json!({ "chunk": "【policy.pdf】", "progress": 1, "total": 1 }));
        let bytes = frame.as_bytes();
        // Split in the middle of the first CJK bracket's UTF-8 sequence.
        let split = frame.find('【').expect("chunk contains the bracket glyph") + 1;

        let mut decoder = SseDecoder::new();
        let mut messages = decoder.push(&bytes[..split]);
        messages.extend(decoder.push(&bytes[split..]));

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].data["chunk"], "【policy.pdf】");
    }

    #[test]
    fn malformed_json_frame_is_skipped_without_poisoning_the_stream() {
        let mut decoder = SseDecoder::new();
        let mut input = String::from("event: status-update\ndata: {not json\n\n");
        input.push_str(&encode_event("done", &json!({ "success": true, "answerLength": 0, "documentLength": 0 })));

        let messages = decoder.push(input.as_bytes());
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].event, "done");
    }
}
