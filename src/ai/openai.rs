use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::json;

use super::{BusinessAdvisor, BusinessSuggestion, SuggestionRequest, build_prompt, parse_ai_response};

const ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiService {
    api_key: String,
    model: String,
    client: Client,
}

impl OpenAiService {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: Client::new(),
        }
    }

    fn request_body(&self, request: &SuggestionRequest) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You pick relevant businesses for photo captions. You MUST respond with valid JSON only. No markdown, no code blocks, no extra text."
                },
                {
                    "role": "user",
                    "content": [
                        {
                            "type": "text",
                            "text": build_prompt(&request.location, &request.candidates)
                        },
                        {
                            "type": "image_url",
                            "image_url": {
                                "url": request.photo.data_uri(),
                                "detail": "low"
                            }
                        }
                    ]
                }
            ],
            "max_tokens": 300,
            "response_format": { "type": "json_object" }
        })
    }
}

#[async_trait::async_trait]
impl BusinessAdvisor for OpenAiService {
    fn name(&self) -> &str {
        "OpenAI"
    }

    async fn suggest(&self, request: &SuggestionRequest) -> Result<BusinessSuggestion> {
        let resp = self
            .client
            .post(ENDPOINT)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.request_body(request))
            .send()
            .await
            .context("OpenAI request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("Failed to read OpenAI response")?;

        if !status.is_success() {
            anyhow::bail!("OpenAI API error ({}): {}", status, text);
        }

        let json: serde_json::Value =
            serde_json::from_str(&text).context("Failed to parse OpenAI response JSON")?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .context("No content in OpenAI response")?;

        parse_ai_response(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photo::Photo;

    #[test]
    fn body_carries_prompt_and_photo() {
        let service = OpenAiService::new("sk-test".into(), "gpt-4o-mini".into());
        let request = SuggestionRequest {
            photo: Photo::from_bytes("p.bin", vec![0, 1, 2]),
            location: "Manama, Bahrain".into(),
            candidates: vec!["Bab Al Bahrain".into()],
        };
        let body = service.request_body(&request);

        assert_eq!(body["model"], "gpt-4o-mini");
        let text = body["messages"][1]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Bab Al Bahrain"));
        let url = body["messages"][1]["content"][1]["image_url"]["url"].as_str().unwrap();
        assert!(url.starts_with("data:application/octet-stream;base64,"));
    }
}
