//! Voice handlers (`/api/voice`).

use super::error::ApiError;
use super::server::{AppState, blocking};
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/voice/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    message: String,
}

/// Response of `POST /api/voice/chat`.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    success: bool,
    text: String,
    source: &'static str,
}

/// Response of `POST /api/voice/interact`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractResponse {
    transcript: String,
    answer: String,
    source: &'static str,
    /// Base64-encoded PCM.
    audio: String,
    format: &'static str,
    sample_rate: u32,
    fallback: bool,
}

/// `POST /api/voice/chat`
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(body) = body?;
    let voice = state.voice.clone();
    let reply = blocking(move || voice.chat(&body.message)).await?;
    Ok(Json(ChatResponse {
        success: true,
        text: reply.text,
        source: reply.source,
    }))
}

/// `POST /api/voice/interact`, body is raw 16 kHz 16-bit mono PCM.
pub async fn interact(
    State(state): State<AppState>,
    audio: Bytes,
) -> Result<Json<InteractResponse>, ApiError> {
    let voice = state.voice.clone();
    let reply = blocking(move || voice.interact(&audio)).await?;
    Ok(Json(InteractResponse {
        transcript: reply.transcript,
        answer: reply.answer,
        source: reply.source,
        audio: STANDARD.encode(&reply.audio),
        format: "pcm",
        sample_rate: reply.sample_rate,
        fallback: reply.fallback,
    }))
}
