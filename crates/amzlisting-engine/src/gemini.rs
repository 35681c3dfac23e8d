use std::time::{Duration, Instant};

use amzlisting_contracts::image::UploadedImage;
use amzlisting_contracts::listing::{listing_response_schema, GeneratedListing};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::GenerationError;
use crate::generator::{ListingGenerator, ListingRequest};

pub const LISTING_INSTRUCTION: &str = "Analyze this product mockup image and generate a highly optimized Amazon listing.
The listing must be conversion-focused, SEO-optimized, and follow Amazon's best practices.

1. Title: Compelling, including main keywords, under 200 characters.
2. 5 Feature Bullets: Highlighting benefits and solving pain points.
3. Product Description: Detailed and engaging.
4. Backend Search Terms: A string of relevant keywords for backend SEO (max 250 bytes).

Return the response in JSON format.";

const API_KEY_HEADER: &str = "x-goog-api-key";
const ERROR_BODY_MAX_CHARS: usize = 512;

/// Gemini `generateContent` client constrained to the listing response schema.
pub struct GeminiListingGenerator {
    api_base: String,
    timeout: Duration,
    http: HttpClient,
}

impl GeminiListingGenerator {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_base: api_base.into().trim().trim_end_matches('/').to_string(),
            timeout,
            http: HttpClient::new(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.api_base.clone(), config.request_timeout)
    }

    pub fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    pub fn build_payload(image: &UploadedImage) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": image.mime_type,
                            "data": image.data,
                        }
                    },
                    { "text": LISTING_INSTRUCTION },
                ],
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": listing_response_schema(),
            },
        })
    }

    /// Joins the text parts of the first candidate, skipping thought summaries.
    fn extract_text(response_payload: &Value) -> String {
        let parts = response_payload
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        parts
            .iter()
            .filter(|part| !part.get("thought").and_then(Value::as_bool).unwrap_or(false))
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<&str>>()
            .join("")
    }

    fn empty_text_detail(response_payload: &Value) -> String {
        let block_reason = response_payload
            .get("promptFeedback")
            .and_then(|feedback| feedback.get("blockReason"))
            .and_then(Value::as_str);
        let finish_reason = response_payload
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.get("finishReason"))
            .and_then(Value::as_str);
        match (block_reason, finish_reason) {
            (Some(reason), _) => format!("Gemini returned no text (prompt blocked: {reason})"),
            (None, Some(reason)) => format!("Gemini returned no text (finish reason: {reason})"),
            (None, None) => "Gemini returned no text".to_string(),
        }
    }

    /// Prefers `error.message` from the Gemini error envelope over the raw body.
    fn upstream_error_message(body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|parsed| {
                parsed
                    .get("error")
                    .and_then(|error| error.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| truncate_text(body.trim(), ERROR_BODY_MAX_CHARS))
    }
}

impl ListingGenerator for GeminiListingGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, request: &ListingRequest<'_>) -> Result<GeneratedListing, GenerationError> {
        let Some(api_key) = request
            .api_key
            .map(str::trim)
            .filter(|value| !value.is_empty())
        else {
            return Err(GenerationError::MissingCredential);
        };
        let endpoint = self.endpoint_for_model(request.model);
        let payload = Self::build_payload(request.image);
        debug!(
            %endpoint,
            mime_type = %request.image.mime_type,
            image_bytes = request.image.byte_len(),
            "sending listing generation request"
        );

        let started = Instant::now();
        let response = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, api_key)
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .map_err(|err| {
                GenerationError::transport(format!("Gemini request failed: {}", err.without_url()), None)
            })?;

        let status = response.status();
        let code = status.as_u16();
        let body = response.text().map_err(|err| {
            GenerationError::transport(
                format!("Gemini response body read failed: {}", err.without_url()),
                Some(code),
            )
        })?;
        if !status.is_success() {
            return Err(GenerationError::transport(
                format!(
                    "Gemini request failed ({code}): {}",
                    Self::upstream_error_message(&body)
                ),
                Some(code),
            ));
        }

        let response_payload: Value = serde_json::from_str(&body).map_err(|err| {
            GenerationError::format(format!("Gemini returned invalid JSON payload: {err}"))
        })?;
        let text = Self::extract_text(&response_payload);
        if text.trim().is_empty() {
            return Err(GenerationError::format(Self::empty_text_detail(
                &response_payload,
            )));
        }
        let listing = GeneratedListing::from_json_text(&text)?;

        let usage = response_payload
            .get("usageMetadata")
            .cloned()
            .unwrap_or(Value::Null);
        let latency_ms = started.elapsed().as_millis() as u64;
        info!(
            model = request.model,
            latency_ms,
            usage = %usage,
            "listing generated"
        );
        Ok(listing)
    }
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use amzlisting_contracts::image::UploadedImage;
    use mockito::Matcher;
    use serde_json::{json, Value};

    use super::{truncate_text, GeminiListingGenerator, LISTING_INSTRUCTION};
    use crate::error::{GenerationError, INVALID_FORMAT_MESSAGE};
    use crate::generator::{ListingGenerator, ListingRequest};

    const MODEL: &str = "gemini-3-flash-preview";
    const ENDPOINT_PATH: &str = "/models/gemini-3-flash-preview:generateContent";

    fn sample_image() -> UploadedImage {
        UploadedImage::from_bytes(b"\x89PNG\r\n\x1a\nfake", "image/png")
    }

    fn candidate_body(text: &str) -> String {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP",
            }],
            "usageMetadata": { "promptTokenCount": 1290, "candidatesTokenCount": 412 },
        })
        .to_string()
    }

    fn generator_for(server: &mockito::ServerGuard) -> GeminiListingGenerator {
        GeminiListingGenerator::new(server.url(), Duration::from_secs(15))
    }

    #[test]
    fn endpoint_accepts_bare_and_prefixed_model_names() {
        let generator =
            GeminiListingGenerator::new("https://example.test/v1beta/", Duration::from_secs(30));
        assert_eq!(
            generator.endpoint_for_model("gemini-2.5-pro"),
            "https://example.test/v1beta/models/gemini-2.5-pro:generateContent"
        );
        assert_eq!(
            generator.endpoint_for_model(" models/gemini-2.5-pro "),
            "https://example.test/v1beta/models/gemini-2.5-pro:generateContent"
        );
    }

    #[test]
    fn payload_carries_inline_image_instruction_and_schema() {
        let image = sample_image();
        let payload = GeminiListingGenerator::build_payload(&image);
        let parts = &payload["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], json!("image/png"));
        assert_eq!(parts[0]["inlineData"]["data"], json!(image.data));
        assert_eq!(parts[1]["text"], json!(LISTING_INSTRUCTION));
        assert_eq!(
            payload["generationConfig"]["responseMimeType"],
            json!("application/json")
        );
        assert_eq!(
            payload["generationConfig"]["responseSchema"]["required"],
            json!(["title", "bullets", "description", "searchTerms"])
        );
    }

    #[test]
    fn successful_response_is_parsed_into_listing() -> anyhow::Result<()> {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", ENDPOINT_PATH)
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::PartialJson(json!({
                "generationConfig": { "responseMimeType": "application/json" }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(candidate_body(
                r#"{"title":"T","bullets":["a","b","c","d","e"],"description":"D","searchTerms":"S"}"#,
            ))
            .expect(1)
            .create();

        let image = sample_image();
        let listing = generator_for(&server).generate(&ListingRequest {
            image: &image,
            model: MODEL,
            api_key: Some("test-key"),
        })?;

        mock.assert();
        assert_eq!(listing.title, "T");
        assert_eq!(listing.bullets, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(listing.description, "D");
        assert_eq!(listing.search_terms, "S");
        Ok(())
    }

    #[test]
    fn response_without_usage_metadata_still_parses() -> anyhow::Result<()> {
        let mut server = mockito::Server::new();
        let body = json!({
            "candidates": [{
                "content": { "parts": [{
                    "text": r#"{"title":"T","bullets":["a","b","c","d","e"],"description":"D","searchTerms":"S"}"#
                }] },
            }],
        });
        let _mock = server
            .mock("POST", ENDPOINT_PATH)
            .with_status(200)
            .with_body(body.to_string())
            .create();

        let image = sample_image();
        let listing = generator_for(&server).generate(&ListingRequest {
            image: &image,
            model: MODEL,
            api_key: Some("test-key"),
        })?;
        assert_eq!(listing.title, "T");
        Ok(())
    }

    #[test]
    fn non_json_text_is_a_format_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", ENDPOINT_PATH)
            .with_status(200)
            .with_body(candidate_body("Here is a great listing for your product!"))
            .create();

        let image = sample_image();
        let err = generator_for(&server)
            .generate(&ListingRequest {
                image: &image,
                model: MODEL,
                api_key: Some("test-key"),
            })
            .unwrap_err();
        assert!(matches!(err, GenerationError::Format { .. }));
        assert_eq!(err.to_string(), INVALID_FORMAT_MESSAGE);
    }

    #[test]
    fn four_bullets_are_rejected() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", ENDPOINT_PATH)
            .with_status(200)
            .with_body(candidate_body(
                r#"{"title":"T","bullets":["a","b","c","d"],"description":"D","searchTerms":"S"}"#,
            ))
            .create();

        let image = sample_image();
        let err = generator_for(&server)
            .generate(&ListingRequest {
                image: &image,
                model: MODEL,
                api_key: Some("test-key"),
            })
            .unwrap_err();
        match err {
            GenerationError::Format { detail } => assert!(detail.contains("got 4")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blocked_prompt_without_text_is_a_format_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", ENDPOINT_PATH)
            .with_status(200)
            .with_body(json!({ "promptFeedback": { "blockReason": "SAFETY" } }).to_string())
            .create();

        let image = sample_image();
        let err = generator_for(&server)
            .generate(&ListingRequest {
                image: &image,
                model: MODEL,
                api_key: Some("test-key"),
            })
            .unwrap_err();
        match err {
            GenerationError::Format { detail } => assert!(detail.contains("SAFETY")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn upstream_error_envelope_becomes_transport_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", ENDPOINT_PATH)
            .with_status(404)
            .with_body(
                json!({
                    "error": {
                        "code": 404,
                        "message": "Requested entity was not found.",
                        "status": "NOT_FOUND",
                    }
                })
                .to_string(),
            )
            .create();

        let image = sample_image();
        let err = generator_for(&server)
            .generate(&ListingRequest {
                image: &image,
                model: MODEL,
                api_key: Some("expired-key"),
            })
            .unwrap_err();
        match &err {
            GenerationError::Transport { message, status } => {
                assert_eq!(*status, Some(404));
                assert_eq!(
                    message,
                    "Gemini request failed (404): Requested entity was not found."
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_key_sends_no_request() {
        let mut server = mockito::Server::new();
        let mock = server.mock("POST", Matcher::Any).expect(0).create();

        let image = sample_image();
        let err = generator_for(&server)
            .generate(&ListingRequest {
                image: &image,
                model: MODEL,
                api_key: Some("  "),
            })
            .unwrap_err();
        assert!(matches!(err, GenerationError::MissingCredential));
        mock.assert();
    }

    #[test]
    fn thought_parts_are_skipped() {
        let payload: Value = json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "planning the listing", "thought": true },
                    { "text": "{\"title\":" },
                    { "text": "\"T\"}" },
                ] }
            }]
        });
        assert_eq!(GeminiListingGenerator::extract_text(&payload), "{\"title\":\"T\"}");
    }

    #[test]
    fn raw_error_bodies_are_truncated() {
        let body = "x".repeat(600);
        let message = GeminiListingGenerator::upstream_error_message(&body);
        assert_eq!(message.chars().count(), 513);
        assert_eq!(truncate_text("short", 10), "short");
    }
}
