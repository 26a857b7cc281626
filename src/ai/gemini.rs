use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{Value, json};

use super::{BusinessAdvisor, BusinessSuggestion, SuggestionRequest, build_prompt, parse_ai_response};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Google Gemini `generateContent` with the photo sent inline.
pub struct GeminiService {
    api_key: String,
    model: String,
    client: Client,
}

impl GeminiService {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{API_BASE}/{}:generateContent", self.model)
    }

    fn request_body(&self, request: &SuggestionRequest) -> Value {
        let prompt = build_prompt(&request.location, &request.candidates);
        let photo = json!({
            "inline_data": {
                "mime_type": request.photo.mime_type(),
                "data": request.photo.base64()
            }
        });
        json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }, photo] }],
            "generationConfig": {
                "temperature": 0.2,
                "maxOutputTokens": 300,
                "responseMimeType": "application/json"
            }
        })
    }
}

/// First text part of the first candidate.
fn reply_text(json: &Value) -> Option<&str> {
    json["candidates"][0]["content"]["parts"]
        .as_array()?
        .iter()
        .find_map(|part| part["text"].as_str())
}

#[async_trait::async_trait]
impl BusinessAdvisor for GeminiService {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn suggest(&self, request: &SuggestionRequest) -> Result<BusinessSuggestion> {
        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(request))
            .send()
            .await
            .context("Gemini request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("Failed to read Gemini response")?;
        if !status.is_success() {
            anyhow::bail!("Gemini API error ({}): {}", status, text);
        }

        let json: Value = serde_json::from_str(&text).context("Failed to parse Gemini response JSON")?;
        if let Some(reason) = json["promptFeedback"]["blockReason"].as_str() {
            anyhow::bail!("Gemini blocked the request: {reason}");
        }
        let content = reply_text(&json).context("No content in Gemini response")?;
        log::debug!("Gemini reply: {content}");

        parse_ai_response(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photo::Photo;

    fn png_request() -> SuggestionRequest {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 10, 10, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        SuggestionRequest {
            photo: Photo::from_bytes("shop.png", out.into_inner()),
            location: "Government Avenue, Manama, Bahrain".into(),
            candidates: vec!["Bab Al Bahrain".into(), "Manama Souq".into()],
        }
    }

    // ── request_body ─────────────────────────────────────────────────

    #[test]
    fn body_carries_prompt_photo_and_json_mode() {
        let service = GeminiService::new("g-test".into(), "gemini-2.0-flash".into());
        let request = png_request();
        let body = service.request_body(&request);

        let parts = &body["contents"][0]["parts"];
        assert_eq!(
            parts[0]["text"].as_str(),
            Some(build_prompt(&request.location, &request.candidates).as_str())
        );
        assert!(parts[0]["text"].as_str().unwrap().contains("Manama Souq"));
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(parts[1]["inline_data"]["data"].as_str(), Some(request.photo.base64().as_str()));
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn endpoint_keeps_key_out_of_url() {
        let service = GeminiService::new("g-secret".into(), "gemini-2.0-flash".into());
        let url = service.endpoint();
        assert!(url.ends_with("/gemini-2.0-flash:generateContent"));
        assert!(!url.contains("g-secret"));
    }

    // ── reply_text ───────────────────────────────────────────────────

    #[test]
    fn reply_text_skips_parts_without_text() {
        let json = json!({
            "candidates": [{ "content": { "parts": [
                { "functionCall": { "name": "lookup" } },
                { "text": "{\"businessName\": \"Manama Souq\"}" }
            ] } }]
        });
        assert_eq!(reply_text(&json), Some("{\"businessName\": \"Manama Souq\"}"));
        assert_eq!(reply_text(&json!({ "candidates": [] })), None);
    }
}
