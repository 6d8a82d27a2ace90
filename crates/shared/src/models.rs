use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub reset_conversation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// One frame of the chat stream. The event name travels in the SSE `event:`
/// field; only the payload is JSON-encoded into `data:`.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Start {
        message: String,
    },
    RunCreated {
        run_id: String,
        status: String,
    },
    StatusUpdate {
        status: String,
        poll_count: u32,
    },
    Heartbeat {
        poll_count: u32,
        elapsed_seconds: u64,
    },
    AnswerStart {
        total_chars: usize,
    },
    AnswerChunk {
        chunk: String,
        progress: usize,
        total: usize,
    },
    AnswerComplete {
        answer: String,
    },
    DocumentStart {
        total_chars: usize,
    },
    DocumentChunk {
        chunk: String,
        progress: usize,
        total: usize,
    },
    DocumentComplete {
        full_document: String,
    },
    Done {
        success: bool,
        answer_length: usize,
        document_length: usize,
    },
    Error {
        error: String,
        error_type: Option<String>,
    },
}

impl StreamEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::RunCreated { .. } => "run-created",
            Self::StatusUpdate { .. } => "status-update",
            Self::Heartbeat { .. } => "heartbeat",
            Self::AnswerStart { .. } => "answer-start",
            Self::AnswerChunk { .. } => "answer-chunk",
            Self::AnswerComplete { .. } => "answer-complete",
            Self::DocumentStart { .. } => "document-start",
            Self::DocumentChunk { .. } => "document-chunk",
            Self::DocumentComplete { .. } => "document-complete",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            Self::Start { message } => json!({ "message": message }),
            Self::RunCreated { run_id, status } => {
                json!({ "runId": run_id, "status": status })
            }
            Self::StatusUpdate { status, poll_count } => {
                json!({ "status": status, "pollCount": poll_count })
            }
            Self::Heartbeat {
                poll_count,
                elapsed_seconds,
            } => json!({ "pollCount": poll_count, "elapsed": elapsed_seconds }),
            Self::AnswerStart { total_chars } => json!({ "totalChars": total_chars }),
            Self::AnswerChunk {
                chunk,
                progress,
                total,
            } => json!({ "chunk": chunk, "progress": progress, "total": total }),
            Self::AnswerComplete { answer } => json!({ "answer": answer }),
            Self::DocumentStart { total_chars } => json!({ "totalChars": total_chars }),
            Self::DocumentChunk {
                chunk,
                progress,
                total,
            } => json!({ "chunk": chunk, "progress": progress, "total": total }),
            Self::DocumentComplete { full_document } => {
                json!({ "fullDocument": full_document })
            }
            Self::Done {
                success,
                answer_length,
                document_length,
            } => json!({
                "success": success,
                "answerLength": answer_length,
                "documentLength": document_length,
            }),
            Self::Error { error, error_type } => match error_type {
                Some(error_type) => json!({ "error": error, "errorType": error_type }),
                None => json!({ "error": error }),
            },
        }
    }

    /// Rebuild an event from a decoded frame. Returns `None` for unknown
    /// names or payloads missing required fields; a consumer skips those
    /// rather than failing the stream.
    pub fn from_parts(name: &str, payload: &Value) -> Option<Self> {
        let str_field = |key: &str| payload.get(key)?.as_str().map(ToString::to_string);
        let usize_field = |key: &str| payload.get(key)?.as_u64().map(|value| value as usize);
        let u32_field = |key: &str| payload.get(key)?.as_u64().map(|value| value as u32);

        match name {
            "start" => Some(Self::Start {
                message: str_field("message")?,
            }),
            "run-created" => Some(Self::RunCreated {
                run_id: str_field("runId")?,
                status: str_field("status")?,
            }),
            "status-update" => Some(Self::StatusUpdate {
                status: str_field("status")?,
                poll_count: u32_field("pollCount")?,
            }),
            "heartbeat" => Some(Self::Heartbeat {
                poll_count: u32_field("pollCount")?,
                elapsed_seconds: payload.get("elapsed")?.as_u64()?,
            }),
            "answer-start" => Some(Self::AnswerStart {
                total_chars: usize_field("totalChars")?,
            }),
            "answer-chunk" => Some(Self::AnswerChunk {
                chunk: str_field("chunk")?,
                progress: usize_field("progress")?,
                total: usize_field("total")?,
            }),
            "answer-complete" => Some(Self::AnswerComplete {
                answer: str_field("answer")?,
            }),
            "document-start" => Some(Self::DocumentStart {
                total_chars: usize_field("totalChars")?,
            }),
            "document-chunk" => Some(Self::DocumentChunk {
                chunk: str_field("chunk")?,
                progress: usize_field("progress")?,
                total: usize_field("total")?,
            }),
            "document-complete" => Some(Self::DocumentComplete {
                full_document: str_field("fullDocument")?,
            }),
            "done" => Some(Self::Done {
                success: payload.get("success")?.as_bool()?,
                answer_length: usize_field("answerLength")?,
                document_length: usize_field("documentLength")?,
            }),
            "error" => Some(Self::Error {
                error: str_field("error")?,
                error_type: str_field("errorType"),
            }),
            _ => None,
        }
    }
}
