//! Response normalization into [`ResponseEnvelope`]s.

use chrono::Utc;
use futures::StreamExt;
use vertexai_core::Tokenizer;

use crate::types::{
    ChunkStream, EnvelopeObject, EnvelopeStream, Payload, RawPrediction, ResponseEnvelope, Usage,
};

/// Finish reason reported for every complete (non-streaming) response.
pub const FINISH_STOP: &str = "stop";

fn envelope_id(chat: bool) -> String {
    let prefix = if chat { "chatcmpl" } else { "cmpl" };
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

fn payload(text: String, chat: bool, stream: bool) -> Payload {
    match (chat, stream) {
        (true, false) => Payload::Message {
            role: "assistant".to_string(),
            content: text,
        },
        (true, true) => Payload::Delta { content: text },
        (false, _) => Payload::Text { text },
    }
}

/// Build one envelope.
///
/// Complete responses get `finish_reason = "stop"` and usage with
/// `total = prompt + completion`. Streaming chunks get neither.
pub fn normalize(
    model: &str,
    text: String,
    prompt_tokens: usize,
    completion_tokens: usize,
    stream: bool,
    chat: bool,
) -> ResponseEnvelope {
    ResponseEnvelope {
        id: envelope_id(chat),
        object: EnvelopeObject::new(chat, stream),
        model: model.to_string(),
        created: Utc::now().timestamp(),
        finish_reason: (!stream).then(|| FINISH_STOP.to_string()),
        payload: payload(text, chat, stream),
        usage: (!stream).then(|| Usage::new(prompt_tokens, completion_tokens)),
    }
}

/// Normalize a single-shot prediction.
///
/// Provider token metadata wins. Otherwise the prompt side is `prompt_estimate`
/// (the trimmed conversation's cost) and the completion side is counted with
/// `tokenizer`.
pub fn normalize_prediction(
    model: &str,
    prediction: RawPrediction,
    chat: bool,
    prompt_estimate: usize,
    tokenizer: &dyn Tokenizer,
) -> ResponseEnvelope {
    let (prompt_tokens, completion_tokens) = match prediction.token_metadata {
        Some(meta) => (meta.input_tokens, meta.output_tokens),
        None => (prompt_estimate, tokenizer.count_text(&prediction.text)),
    };
    normalize(model, prediction.text, prompt_tokens, completion_tokens, false, chat)
}

/// Lazily wrap each upstream chunk in a chunk envelope.
///
/// Nothing is buffered and no usage is tracked. Dropping the returned stream
/// drops the upstream one.
pub fn normalize_stream(model: &str, chat: bool, upstream: ChunkStream) -> EnvelopeStream {
    let id = envelope_id(chat);
    let created = Utc::now().timestamp();
    let model = model.to_string();

    upstream
        .map(move |chunk| {
            chunk.map(|chunk| ResponseEnvelope {
                id: id.clone(),
                object: EnvelopeObject::new(chat, true),
                model: model.clone(),
                created,
                finish_reason: None,
                payload: payload(chunk.text, chat, true),
                usage: None,
            })
        })
        .boxed()
}
