use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
// Low temperature keeps the model on the facts it found
pub const DEFAULT_TEMPERATURE: f64 = 0.1;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("model endpoint returned {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("response is not JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response JSON is not an array")]
    NotArray,
}

/// Source of real travel times for one batch of destinations
#[async_trait]
pub trait TravelTimeQuery: Send + Sync {
    /// Returns the raw model text, or `None` when the answer carried no text
    async fn query_batch(&self, center: &str, cities: &[String]) -> Result<Option<String>, QueryError>;
}

/// One `{city, minutes}` record decoded from a batch answer
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRecord {
    pub city: String,
    pub minutes: u32,
}

// Function to create the prompt for one batch
pub fn create_batch_prompt(center: &str, cities: &[String]) -> String {
    let city_list = cities.join(", ");
    format!(
        "Task: find the fastest high-speed rail (G or D series) travel time from {center} to each of these cities: {city_list}.\n\
         \n\
         Instructions:\n\
         1. Search current train timetables (for example 12306 or Trip.com).\n\
         2. Report the shortest scheduled duration in minutes.\n\
         3. If there is no direct train, estimate the fastest connection from what you found.\n\
         4. Return ONLY a JSON array, without Markdown and without explanations.\n\
         \n\
         Format:\n\
         [{{\"city\": \"CityName\", \"minutes\": 120}}, {{\"city\": \"CityName2\", \"minutes\": 300}}]"
    )
}

// Remove Markdown code fences the model sometimes wraps around its JSON
pub fn strip_code_fences(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.strip_prefix("json").unwrap_or(rest);
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Decodes a batch answer. The answer as a whole must be a JSON array; elements
/// without a string `city` or with `minutes` outside `0..=u32::MAX` are skipped.
pub fn parse_batch_response(text: &str) -> Result<Vec<BatchRecord>, DecodeError> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fences(text))?;
    let items = value.as_array().ok_or(DecodeError::NotArray)?;

    let records = items
        .iter()
        .filter_map(|item| {
            let city = item.get("city")?.as_str()?.trim();
            let minutes = item.get("minutes")?.as_f64()?;
            if city.is_empty() || !minutes.is_finite() || minutes < 0.0 || minutes.round() > u32::MAX as f64 {
                return None;
            }
            Some(BatchRecord {
                city: city.to_string(),
                minutes: minutes.round() as u32,
            })
        })
        .collect();

    Ok(records)
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

#[derive(Debug, Deserialize, Serialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Search-grounded Gemini `generateContent` client
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        // Search grounding cannot be combined with a response schema, so the
        // format is only requested in the prompt
        json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "tools": [{ "google_search": {} }],
            "generationConfig": { "temperature": self.temperature },
        })
    }
}

#[async_trait]
impl TravelTimeQuery for GeminiClient {
    async fn query_batch(&self, center: &str, cities: &[String]) -> Result<Option<String>, QueryError> {
        let prompt = create_batch_prompt(center, cities);
        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(&prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QueryError::Status(response.status()));
        }

        let body: GenerateContentResponse = response.json().await?;
        Ok(body.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fences() {
        let text = "```json\n[{\"city\": \"上海\", \"minutes\": 268}]\n```";
        assert_eq!(strip_code_fences(text), "[{\"city\": \"上海\", \"minutes\": 268}]");
        assert_eq!(strip_code_fences("  []  "), "[]");
        assert_eq!(strip_code_fences("```\n[]\n```"), "[]");
    }

    #[test]
    fn parses_records_and_skips_bad_elements() {
        let text = r#"[
            {"city": "上海", "minutes": 268},
            {"city": "天津", "minutes": 29.6},
            {"city": "南京"},
            {"city": "杭州", "minutes": "about 4h"},
            {"city": "合肥", "minutes": -5},
            {"minutes": 10}
        ]"#;
        let records = parse_batch_response(text).unwrap();
        assert_eq!(
            records,
            vec![
                BatchRecord { city: "上海".into(), minutes: 268 },
                BatchRecord { city: "天津".into(), minutes: 30 },
            ]
        );
    }

    #[test]
    fn skips_minutes_too_large_for_u32() {
        let records = parse_batch_response(
            r#"[{"city": "上海", "minutes": 1e12}, {"city": "天津", "minutes": 4294967295}]"#,
        )
        .unwrap();
        assert_eq!(records, vec![BatchRecord { city: "天津".into(), minutes: u32::MAX }]);
    }

    #[test]
    fn rejects_non_array_and_prose() {
        assert!(matches!(
            parse_batch_response("{\"city\": \"上海\", \"minutes\": 1}"),
            Err(DecodeError::NotArray)
        ));
        assert!(matches!(
            parse_batch_response("Sorry, I could not find schedules."),
            Err(DecodeError::Json(_))
        ));
        assert!(parse_batch_response("").is_err());
    }

    #[test]
    fn prompt_lists_every_city() {
        let prompt = create_batch_prompt("北京", &["上海".to_string(), "广州".to_string()]);
        assert!(prompt.contains("from 北京"));
        assert!(prompt.contains("上海, 广州"));
        assert!(prompt.contains("\"minutes\": 120"));
    }

    #[test]
    fn extracts_first_candidate_text() {
        let body: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "[{\"city\""}, {"text": ": \"上海\", \"minutes\": 1}]"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(body.text().as_deref(), Some("[{\"city\": \"上海\", \"minutes\": 1}]"));

        let empty: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.text(), None);
    }

    #[test]
    fn request_body_enables_search_grounding() {
        let client = GeminiClient::new("key").with_base_url("http://localhost:1/");
        assert_eq!(client.endpoint(), "http://localhost:1/models/gemini-2.5-flash:generateContent");
        let body = client.request_body("hi");
        assert_eq!(body["tools"][0]["google_search"], json!({}));
        assert_eq!(body["generationConfig"]["temperature"], json!(0.1));
    }
}
