mod gemini;
mod openai;

pub use gemini::GeminiService;
pub use openai::OpenAiService;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::photo::Photo;

/// What the AI advisor returns for a photo and its surroundings.
///
/// An absent or blank `include_business` is a valid answer meaning "no
/// business is worth naming", not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSuggestion {
    #[serde(default, alias = "include_business", alias = "business")]
    pub include_business: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl BusinessSuggestion {
    /// The suggested business name, if one was actually chosen.
    pub fn business(&self) -> Option<&str> {
        self.include_business
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Input to a business suggestion.
#[derive(Debug, Clone)]
pub struct SuggestionRequest {
    pub photo: Photo,
    /// Human-readable description of where the photo was taken.
    pub location: String,
    /// Nearby business names, closest first.
    pub candidates: Vec<String>,
}

/// Trait for AI services that pick a relevant nearby business.
///
/// The library ships with [`OpenAiService`] and [`GeminiService`];
/// [`AdvisorChain`] tries several in order.
#[async_trait::async_trait]
pub trait BusinessAdvisor: Send + Sync {
    /// The display name of this service (e.g., "OpenAI", "Gemini").
    fn name(&self) -> &str;
    /// Decide which candidate, if any, belongs in the photo's caption.
    async fn suggest(&self, request: &SuggestionRequest) -> Result<BusinessSuggestion>;
}

/// Build the prompt sent alongside the photo.
pub fn build_prompt(location: &str, candidates: &[String]) -> String {
    format!(
        r#"You advise on which nearby business, if any, to name in a photo's location tag.

Location: {location}
Nearby businesses: {businesses}

Look at the photo and consider how relevant each business is to what it shows and to the location. Only pick a business if naming it adds real context or interest to the photo. If none is relevant, leave "includeBusiness" empty.

Return a JSON object:
{{
  "includeBusiness": "exact name from the list, or empty",
  "reason": "one or two sentences explaining the choice"
}}

Return ONLY the JSON object, no markdown formatting, no code blocks, no extra text."#,
        businesses = candidates.join(", ")
    )
}

/// Parse raw AI response text into a [`BusinessSuggestion`].
///
/// Handles markdown code fences, prose around the JSON and trailing commas.
pub fn parse_ai_response(text: &str) -> Result<BusinessSuggestion> {
    log::debug!("Raw AI response:\n{text}");

    for candidate in extract_json_candidates(text.trim()) {
        if let Ok(suggestion) = serde_json::from_str::<BusinessSuggestion>(&candidate) {
            return Ok(suggestion);
        }
        let fixed = fix_trailing_commas(&candidate);
        if let Ok(suggestion) = serde_json::from_str::<BusinessSuggestion>(&fixed) {
            return Ok(suggestion);
        }
    }

    anyhow::bail!("Could not parse AI response as JSON")
}

/// Possible JSON object strings inside an AI response, most specific first.
fn extract_json_candidates(text: &str) -> Vec<String> {
    let mut candidates = Vec::new();

    if text.contains("```") {
        let fenced = text
            .lines()
            .skip_while(|l| !l.trim().starts_with("```"))
            .skip(1)
            .take_while(|l| !l.trim().starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n");
        if !fenced.is_empty() {
            candidates.push(fenced);
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            candidates.push(text[start..=end].to_string());
        }
    }

    candidates.push(text.to_string());
    candidates
}

/// Drop commas that directly precede a closing `}` or `]`.
fn fix_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escape_next = false;

    while let Some(c) = chars.next() {
        if escape_next {
            result.push(c);
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            ',' if !in_string => {
                let rest = chars.clone().find(|n| !n.is_whitespace());
                if matches!(rest, Some('}') | Some(']')) {
                    continue;
                }
            }
            _ => {}
        }
        result.push(c);
    }
    result
}

/// Failover chain over several advisors.
///
/// Advisors are tried in order until one answers. A "no business" answer
/// counts as an answer.
pub struct AdvisorChain {
    advisors: Vec<Box<dyn BusinessAdvisor>>,
}

impl AdvisorChain {
    pub fn new(advisors: Vec<Box<dyn BusinessAdvisor>>) -> Self {
        Self { advisors }
    }

    pub fn is_empty(&self) -> bool {
        self.advisors.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.advisors.iter().map(|a| a.name()).collect()
    }
}

#[async_trait::async_trait]
impl BusinessAdvisor for AdvisorChain {
    fn name(&self) -> &str {
        "AI chain"
    }

    async fn suggest(&self, request: &SuggestionRequest) -> Result<BusinessSuggestion> {
        if self.advisors.is_empty() {
            anyhow::bail!("No AI services configured");
        }

        let mut errors = Vec::new();
        for advisor in &self.advisors {
            log::debug!("Asking {} about {} candidate(s)", advisor.name(), request.candidates.len());
            match advisor.suggest(request).await {
                Ok(suggestion) => {
                    log::info!(
                        "{} suggested: {}",
                        advisor.name(),
                        suggestion.business().unwrap_or("(none)")
                    );
                    return Ok(suggestion);
                }
                Err(e) => {
                    log::warn!("{} failed: {e}", advisor.name());
                    errors.push(format!("{}: {e}", advisor.name()));
                }
            }
        }

        anyhow::bail!("All AI services failed: {}", errors.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request() -> SuggestionRequest {
        SuggestionRequest {
            photo: Photo::from_bytes("p.jpg", vec![1, 2, 3]),
            location: "Main St, Springfield, USA".into(),
            candidates: vec!["Joe's Diner".into(), "Springfield Library".into()],
        }
    }

    struct Scripted {
        name: &'static str,
        answer: Option<&'static str>,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl BusinessAdvisor for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn suggest(&self, _request: &SuggestionRequest) -> Result<BusinessSuggestion> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("quota exceeded");
            }
            Ok(BusinessSuggestion {
                include_business: self.answer.map(String::from),
                reason: None,
            })
        }
    }

    // ── build_prompt ─────────────────────────────────────────────────

    #[test]
    fn prompt_lists_location_and_candidates() {
        let req = request();
        let prompt = build_prompt(&req.location, &req.candidates);
        assert!(prompt.contains("Location: Main St, Springfield, USA"));
        assert!(prompt.contains("Joe's Diner, Springfield Library"));
        assert!(prompt.contains("includeBusiness"));
        assert!(prompt.contains("JSON"));
    }

    // ── BusinessSuggestion ───────────────────────────────────────────

    #[test]
    fn blank_business_is_no_suggestion() {
        let s = BusinessSuggestion {
            include_business: Some("   ".into()),
            reason: Some("nothing relevant".into()),
        };
        assert_eq!(s.business(), None);
        assert_eq!(BusinessSuggestion::default().business(), None);
    }

    // ── parse_ai_response ────────────────────────────────────────────

    #[test]
    fn parse_plain_json() {
        let s = parse_ai_response(r#"{"includeBusiness": "Joe's Diner", "reason": "Diner sign in frame"}"#)
            .unwrap();
        assert_eq!(s.business(), Some("Joe's Diner"));
        assert_eq!(s.reason.as_deref(), Some("Diner sign in frame"));
    }

    #[test]
    fn parse_empty_object_is_no_suggestion() {
        let s = parse_ai_response("{}").unwrap();
        assert_eq!(s.business(), None);
    }

    #[test]
    fn parse_snake_case_alias() {
        let s = parse_ai_response(r#"{"include_business": "Cafe"}"#).unwrap();
        assert_eq!(s.business(), Some("Cafe"));
    }

    #[test]
    fn parse_markdown_fence() {
        let text = "Here you go:\n```json\n{\"includeBusiness\": \"\", \"reason\": \"none fit\"}\n```";
        let s = parse_ai_response(text).unwrap();
        assert_eq!(s.business(), None);
        assert_eq!(s.reason.as_deref(), Some("none fit"));
    }

    #[test]
    fn parse_trailing_comma_and_prose() {
        let text = "Sure! {\"includeBusiness\": \"Library\", \"reason\": \"books, shelves\",} Hope it helps";
        let s = parse_ai_response(text).unwrap();
        assert_eq!(s.business(), Some("Library"));
        assert_eq!(s.reason.as_deref(), Some("books, shelves"));
    }

    #[test]
    fn parse_garbage_fails() {
        assert!(parse_ai_response("no idea").is_err());
        assert!(parse_ai_response("").is_err());
    }

    // ── fix_trailing_commas ──────────────────────────────────────────

    #[test]
    fn trailing_commas_removed_outside_strings() {
        assert_eq!(fix_trailing_commas(r#"{"a": 1,}"#), r#"{"a": 1}"#);
        assert_eq!(fix_trailing_commas(r#"["a", ]"#), r#"["a" ]"#);
        let s = r#"{"a": "x,}"}"#;
        assert_eq!(fix_trailing_commas(s), s);
    }

    // ── AdvisorChain ─────────────────────────────────────────────────

    #[tokio::test]
    async fn chain_fails_over_to_next_advisor() {
        let first_calls = Arc::new(AtomicUsize::new(0));
        let second_calls = Arc::new(AtomicUsize::new(0));
        let chain = AdvisorChain::new(vec![
            Box::new(Scripted { name: "A", answer: None, fail: true, calls: first_calls.clone() }),
            Box::new(Scripted { name: "B", answer: Some("Cafe"), fail: false, calls: second_calls.clone() }),
        ]);

        let s = chain.suggest(&request()).await.unwrap();
        assert_eq!(s.business(), Some("Cafe"));
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn chain_accepts_no_suggestion_without_failover() {
        let second_calls = Arc::new(AtomicUsize::new(0));
        let chain = AdvisorChain::new(vec![
            Box::new(Scripted { name: "A", answer: None, fail: false, calls: Arc::default() }),
            Box::new(Scripted { name: "B", answer: Some("Cafe"), fail: false, calls: second_calls.clone() }),
        ]);

        let s = chain.suggest(&request()).await.unwrap();
        assert_eq!(s.business(), None);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn chain_reports_all_failures() {
        let chain = AdvisorChain::new(vec![
            Box::new(Scripted { name: "A", answer: None, fail: true, calls: Arc::default() }),
            Box::new(Scripted { name: "B", answer: None, fail: true, calls: Arc::default() }),
        ]);
        let err = chain.suggest(&request()).await.unwrap_err().to_string();
        assert!(err.contains("A: quota exceeded"));
        assert!(err.contains("B: quota exceeded"));

        let empty = AdvisorChain::new(Vec::new());
        assert!(empty.is_empty());
        assert!(empty.suggest(&request()).await.is_err());
    }
}
