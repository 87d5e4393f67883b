//! Wire types for the Gemini Live and `generateContent` JSON protocols.
//!
//! Outbound messages are built from core DTOs; inbound frames are parsed
//! into [`ServerFrame`]s. Unknown fields are ignored on both paths.

use dambru_core::{
    EncodedFrame, IncomingAudioChunk, LiveConnectConfig, LiveMessage, ResponseModality,
    SearchAnswer, SearchSource,
};
use serde::{Deserialize, Serialize};

use crate::error::{LiveError, LiveResult};

/// Returned in place of an empty grounded answer.
pub const NO_RESPONSE_TEXT: &str = "No response generated.";

// ============================================================================
// Outbound: live session
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetupMessage<'a> {
    setup: Setup<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Setup<'a> {
    model: String,
    generation_config: GenerationConfig<'a>,
    system_instruction: Content<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: [ResponseModality; 1],
    speech_config: SpeechConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig<'a> {
    voice_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<TextPart<'a>>,
}

impl<'a> Content<'a> {
    fn text(role: Option<&'a str>, text: &'a str) -> Self {
        Self {
            role,
            parts: vec![TextPart { text }],
        }
    }
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RealtimeInputMessage<'a> {
    realtime_input: RealtimeInput<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RealtimeInput<'a> {
    media_chunks: [&'a EncodedFrame; 1],
}

/// The first frame of every live session.
pub fn setup_message(config: &LiveConnectConfig) -> LiveResult<String> {
    let model = if config.model.starts_with("models/") {
        config.model.clone()
    } else {
        format!("models/{}", config.model)
    };
    let message = SetupMessage {
        setup: Setup {
            model,
            generation_config: GenerationConfig {
                response_modalities: [config.response_modality],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: &config.voice_id,
                        },
                    },
                },
            },
            system_instruction: Content::text(None, &config.system_instruction),
        },
    };
    Ok(serde_json::to_string(&message)?)
}

/// One outbound microphone frame.
pub fn realtime_input_message(frame: &EncodedFrame) -> LiveResult<String> {
    let message = RealtimeInputMessage {
        realtime_input: RealtimeInput {
            media_chunks: [frame],
        },
    };
    Ok(serde_json::to_string(&message)?)
}

// ============================================================================
// Inbound: live session
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerMessage {
    setup_complete: Option<serde_json::Value>,
    server_content: Option<ServerContent>,
    go_away: Option<GoAway>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerContent {
    model_turn: Option<InboundContent>,
    #[serde(default)]
    interrupted: bool,
    #[serde(default)]
    turn_complete: bool,
}

#[derive(Debug, Default, Deserialize)]
struct InboundContent {
    #[serde(default)]
    parts: Vec<InboundPart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InboundPart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoAway {
    time_left: Option<String>,
}

/// What a single inbound live frame means to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame {
    /// Handshake acknowledged.
    SetupComplete,
    /// Audio, interruption or turn boundary.
    Content(LiveMessage),
    /// The server will close the connection soon.
    GoAway { time_left: Option<String> },
    /// Anything the session does not act on.
    Ignored,
}

/// Parse one inbound frame (text or binary JSON).
pub fn parse_server_frame(payload: &[u8]) -> LiveResult<ServerFrame> {
    let message: ServerMessage = serde_json::from_slice(payload)?;

    if message.setup_complete.is_some() {
        return Ok(ServerFrame::SetupComplete);
    }
    if let Some(content) = message.server_content {
        let audio: Vec<IncomingAudioChunk> = content
            .model_turn
            .map(|turn| turn.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| part.inline_data)
            .map(|inline| IncomingAudioChunk {
                mime_type: inline.mime_type,
                data: inline.data,
            })
            .collect();

        if audio.is_empty() && !content.interrupted && !content.turn_complete {
            return Ok(ServerFrame::Ignored);
        }
        return Ok(ServerFrame::Content(LiveMessage {
            audio,
            interrupted: content.interrupted,
            turn_complete: content.turn_complete,
        }));
    }
    if let Some(go_away) = message.go_away {
        return Ok(ServerFrame::GoAway {
            time_left: go_away.time_left,
        });
    }
    Ok(ServerFrame::Ignored)
}

// ============================================================================
// Grounded search (generateContent)
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    system_instruction: Content<'a>,
    tools: [Tool; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: EmptyObject,
}

#[derive(Debug, Serialize)]
struct EmptyObject {}

/// Body of a grounded `generateContent` request.
pub fn search_request(query: &str, system_instruction: &str) -> LiveResult<serde_json::Value> {
    let request = GenerateContentRequest {
        contents: [Content::text(Some("user"), query)],
        system_instruction: Content::text(None, system_instruction),
        tools: [Tool {
            google_search: EmptyObject {},
        }],
    };
    Ok(serde_json::to_value(&request)?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<InboundContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Default, Deserialize)]
struct WebSource {
    title: Option<String>,
    uri: Option<String>,
}

/// Reduce a `generateContent` response to the answer and its web sources.
pub fn parse_search_response(response: GenerateContentResponse) -> LiveResult<SearchAnswer> {
    let candidate =
        response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LiveError::InvalidResponse {
                message: "response contained no candidates".to_string(),
            })?;

    let text: String = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| part.text)
        .collect();
    let text = if text.trim().is_empty() {
        NO_RESPONSE_TEXT.to_string()
    } else {
        text
    };

    let sources = candidate
        .grounding_metadata
        .map(|meta| meta.grounding_chunks)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|chunk| chunk.web)
        .filter_map(|web| {
            let uri = web.uri?;
            let title = web.title.unwrap_or_else(|| uri.clone());
            Some(SearchSource { title, uri })
        })
        .collect();

    Ok(SearchAnswer { text, sources })
}
