//! Gemini REST implementation of [`PatientGateway`].
//!
//! All five operations go through the `generateContent` endpoint of the
//! generativelanguage API, with per-operation model selection from
//! [`GatewayConfig`]. The evaluation call requests JSON output and parses
//! it into an [`EvaluationReport`] before returning; anything that does
//! not parse is a hard error.

use anyhow::Result;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::sim::evaluation::EvaluationReport;
use crate::sim::store::DataCategory;

use super::{ChatRole, ChatSession, PatientGateway};

// ── Wire types ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    data: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfigWire,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfigWire {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn first_text(&self) -> Result<String, GatewayError> {
        let parts = self.first_parts()?;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.is_empty() {
            return Err(GatewayError::EmptyResponse);
        }
        Ok(text)
    }

    /// First inline-data payload of the first candidate.
    fn first_inline_data(&self) -> Result<&InlineData, GatewayError> {
        self.first_parts()?
            .iter()
            .find_map(|p| p.inline_data.as_ref())
            .ok_or(GatewayError::EmptyResponse)
    }

    fn first_parts(&self) -> Result<&[Part], GatewayError> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .ok_or(GatewayError::EmptyResponse)
    }
}

fn text_content(role: Option<&str>, text: &str) -> Content {
    Content {
        role: role.map(str::to_string),
        parts: vec![Part {
            text: Some(text.to_string()),
            inline_data: None,
        }],
    }
}

/// Strip an optional markdown code fence from a model reply.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

// ── Gateway ──────────────────────────────────────────────────────

pub struct GeminiGateway {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    config: GatewayConfig,
}

impl GeminiGateway {
    pub fn new(config: &GatewayConfig, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            config: config.clone(),
        }
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GatewayError> {
        let url = format!("{}/models/{}:generateContent", self.api_base, model);
        debug!(model, "generateContent request");
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl PatientGateway for GeminiGateway {
    async fn chat_turn(&self, session: &mut ChatSession, user_text: &str) -> Result<String> {
        // Full history plus the new message; the session is only extended
        // once the turn succeeds.
        let mut contents: Vec<Content> = session
            .history()
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    ChatRole::User => "user",
                    ChatRole::Model => "model",
                };
                text_content(Some(role), &turn.text)
            })
            .collect();
        contents.push(text_content(Some("user"), user_text));

        let request = GenerateContentRequest {
            contents,
            system_instruction: Some(text_content(None, session.system_instruction())),
            generation_config: None,
        };

        let response = self.generate(&self.config.chat_model, &request).await?;
        let reply = response.first_text()?;
        session.push_user(user_text);
        session.push_model(reply.clone());
        Ok(reply)
    }

    async fn generate_category_data(
        &self,
        category: DataCategory,
        prompt: &str,
    ) -> Result<String> {
        debug!(category = category.label(), "generating data panel");
        let request = GenerateContentRequest {
            contents: vec![text_content(Some("user"), prompt)],
            system_instruction: None,
            generation_config: None,
        };
        let response = self.generate(&self.config.data_model, &request).await?;
        Ok(response.first_text()?)
    }

    async fn evaluate(&self, rubric: &str, submission: &str) -> Result<EvaluationReport> {
        let prompt = format!("{rubric}\n\nStudent's Submission:\n---\n{submission}\n---");
        let request = GenerateContentRequest {
            contents: vec![text_content(Some("user"), &prompt)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                ..Default::default()
            }),
        };
        let response = self.generate(&self.config.eval_model, &request).await?;
        let text = response.first_text()?;
        let report: EvaluationReport = serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| GatewayError::MalformedReport(e.to_string()))?;
        Ok(report)
    }

    async fn synthesize_speech(&self, text: &str, voice: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![text_content(None, text)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfigWire {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.to_string(),
                        },
                    },
                }),
                ..Default::default()
            }),
        };
        let response = self.generate(&self.config.tts_model, &request).await?;
        Ok(response.first_inline_data()?.data.clone())
    }

    async fn generate_portrait(&self, prompt: &str) -> Result<Vec<u8>> {
        let request = GenerateContentRequest {
            contents: vec![text_content(Some("user"), prompt)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                image_config: Some(ImageConfig {
                    aspect_ratio: "1:1".to_string(),
                }),
                ..Default::default()
            }),
        };
        let response = self.generate(&self.config.image_model, &request).await?;
        let inline = response.first_inline_data()?;
        Ok(BASE64
            .decode(&inline.data)
            .map_err(|e| GatewayError::MalformedReport(e.to_string()))?)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strip_code_fence_variants() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn request_serializes_camel_case() {
        let request = GenerateContentRequest {
            contents: vec![text_content(Some("user"), "hi")],
            system_instruction: Some(text_content(None, "persona")),
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                ..Default::default()
            }),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "persona");
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
        // Unused config knobs stay off the wire.
        assert!(value["generationConfig"].get("speechConfig").is_none());
    }

    #[test]
    fn speech_request_carries_voice_config() {
        let config = GenerationConfig {
            response_modalities: Some(vec!["AUDIO".to_string()]),
            speech_config: Some(SpeechConfig {
                voice_config: VoiceConfigWire {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: "Kore".to_string(),
                    },
                },
            }),
            ..Default::default()
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["responseModalities"][0], "AUDIO");
        assert_eq!(
            value["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Kore"
        );
    }

    #[test]
    fn response_first_text_concatenates_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "It hurts "}, {"text": "a lot."}]
                }
            }]
        }))
        .unwrap();
        assert_eq!(response.first_text().unwrap(), "It hurts a lot.");
    }

    #[test]
    fn empty_candidates_is_empty_response() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({"candidates": []})).unwrap();
        assert!(matches!(
            response.first_text(),
            Err(GatewayError::EmptyResponse)
        ));
    }

    #[test]
    fn inline_data_extraction() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "parts": [{"inlineData": {"mimeType": "audio/pcm", "data": "AAAA"}}]
                }
            }]
        }))
        .unwrap();
        assert_eq!(response.first_inline_data().unwrap().data, "AAAA");
    }

    #[test]
    fn fenced_report_parses() {
        let text = "```json\n{\"score\":72,\"overallSummary\":\"ok\",\"criticalChecklist\":[],\"missedOpportunities\":[],\"textbookInsight\":\"tip\"}\n```";
        let report: EvaluationReport =
            serde_json::from_str(strip_code_fence(text)).unwrap();
        assert_eq!(report.score, 72);
    }
}
