//! Gemini API clients
//!
//! Embeddings come from `models/{model}:embedContent` and rankings from
//! `models/{model}:generateContent`. The ranking model answers in free text,
//! so its reply is unwrapped from Markdown code fences before being parsed
//! as a JSON array of `{id, rationale}` objects.

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{CandidatePool, RankedRecommendation},
    services::providers::{Embedder, RankingService},
};

/// Gemini accepts the key as a header, which keeps it out of request URLs
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct GeminiEmbedder {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
    cache: Cache,
    cache_ttl: u64,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

impl GeminiEmbedder {
    pub fn new(
        cache: Cache,
        api_key: String,
        api_url: String,
        model: String,
        cache_ttl: u64,
    ) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            model,
            cache,
            cache_ttl,
        }
    }

    fn request_body(text: &str) -> Value {
        json!({
            "content": { "parts": [{ "text": text }] },
            "taskType": "SEMANTIC_SIMILARITY"
        })
    }

    async fn call_api(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!(
            "{}/v1beta/models/{}:embedContent",
            self.api_url, self.model
        );

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&Self::request_body(text))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Gemini embedding API returned status {}: {}",
                status, body
            )));
        }

        let parsed: EmbedResponse = response.json().await?;
        if parsed.embedding.values.is_empty() {
            return Err(AppError::ExternalService(
                "Gemini embedding API returned an empty vector".to_string(),
            ));
        }

        tracing::debug!(
            dimensions = parsed.embedding.values.len(),
            provider = "gemini",
            "Embedding generated"
        );

        Ok(parsed.embedding.values)
    }
}

#[async_trait::async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Cannot embed empty text".to_string(),
            ));
        }

        cached!(
            self.cache,
            CacheKey::Embedding {
                model: self.model.clone(),
                text: text.to_string(),
            },
            self.cache_ttl,
            self.call_api(text)
        )
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Booth entry shown to the ranking model
#[derive(Debug, Serialize)]
struct RankingCandidate<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    company_name_kor: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    company_description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    products: Option<&'a str>,
    similarity: f64,
}

#[derive(Clone)]
pub struct GeminiRanker {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
    count: usize,
}

impl GeminiRanker {
    pub fn new(api_key: String, api_url: String, model: String, count: usize) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            model,
            count,
        }
    }

    fn build_prompt(&self, pool: &CandidatePool, profile_text: &str) -> AppResult<String> {
        let candidates: Vec<RankingCandidate> = pool
            .candidates()
            .iter()
            .map(|c| RankingCandidate {
                id: &c.booth_id,
                company_name_kor: c.booth.as_ref().map(|b| b.company_name_kor.as_str()),
                category: c.booth.as_ref().and_then(|b| b.category.as_deref()),
                company_description: c.booth.as_ref().map(|b| b.company_description.as_str()),
                products: c.booth.as_ref().map(|b| b.products.as_str()),
                similarity: c.similarity_score,
            })
            .collect();

        let booth_json = serde_json::to_string_pretty(&candidates)
            .map_err(|e| AppError::Internal(format!("Failed to serialize candidates: {}", e)))?;

        Ok(format!(
            r#"
전시회 참관객 정보가 주어지면, 전체 중에서 가장 적합성이 높은 부스 {count}개를 rationale과 함께 등수가 높은 것부터 낮은 순으로 알려주세요.

참관객 정보: {profile}

부스 데이터:
{booths}

응답은 반드시 다음 JSON 형식으로만 제공해주세요:
[{{"id": "B2404", "rationale": "이 부스가 적합한 이유를 상세히 설명"}}, {{"id": "A2101", "rationale": "이 부스가 적합한 이유를 상세히 설명"}}, ...]

중요:
1. 반드시 {count}개의 부스를 추천해주세요
2. id는 부스 데이터의 id 필드 값을 사용하세요
3. rationale은 해당 부스가 왜 참관객에게 적합한지 구체적으로 설명해주세요
4. 등수가 높은 것부터 낮은 순으로 정렬해주세요
5. 응답은 오직 JSON 배열 형태로만 제공하고 다른 텍스트는 포함하지 마세요
6. 중복된 부스(id)가 절대 포함되지 않도록 주의하세요. {count}개의 id는 모두 달라야 합니다.
"#,
            count = self.count,
            profile = profile_text,
            booths = booth_json,
        ))
    }

    /// Pulls the generated text out of a `generateContent` response
    fn extract_text(response: &Value) -> AppResult<String> {
        response["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                AppError::ExternalService("Gemini ranking response contained no text".to_string())
            })
    }
}

/// Strips a surrounding Markdown code fence (```json or bare ```)
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let (marker, start) = if let Some(idx) = text.find("```json") {
        ("```json", idx)
    } else if let Some(idx) = text.find("```") {
        ("```", idx)
    } else {
        return text;
    };

    let body_start = start + marker.len();
    let body = &text[body_start..];
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Parses the ranking model's reply into ranked recommendations
///
/// Ids may come back as strings or numbers; entries without an id are
/// skipped. Ranks are 1-based positions among the kept entries.
pub(crate) fn parse_ranking(text: &str) -> AppResult<Vec<RankedRecommendation>> {
    let json_text = strip_code_fence(text);
    let items: Vec<Value> = serde_json::from_str(json_text).map_err(|e| {
        tracing::error!(error = %e, "Failed to parse ranking response");
        AppError::ExternalService(format!("Failed to parse ranking response: {}", e))
    })?;

    let ranked: Vec<RankedRecommendation> = items
        .iter()
        .filter_map(|item| {
            let id = match &item["id"] {
                Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            let rationale = item["rationale"].as_str().unwrap_or_default().to_string();
            Some((id, rationale))
        })
        .enumerate()
        .map(|(i, (id, rationale))| RankedRecommendation::new(id, rationale, i + 1))
        .collect();

    Ok(ranked)
}

#[async_trait::async_trait]
impl RankingService for GeminiRanker {
    async fn rank(
        &self,
        pool: &CandidatePool,
        profile_text: &str,
    ) -> AppResult<Vec<RankedRecommendation>> {
        let prompt = self.build_prompt(pool, profile_text)?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url, self.model
        );

        tracing::info!(
            candidates = pool.len(),
            requested = self.count,
            provider = "gemini",
            "Requesting ranking"
        );

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&json!({ "contents": [{ "parts": [{ "text": prompt }] }] }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Gemini ranking API returned status {}: {}",
                status, body
            )));
        }

        let body: Value = response.json().await?;
        let text = Self::extract_text(&body)?;
        let ranked = parse_ranking(&text)?;

        if ranked.len() != self.count {
            tracing::warn!(
                expected = self.count,
                received = ranked.len(),
                "Ranking service returned an unexpected number of booths"
            );
        }

        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Booth, Candidate};

    fn test_ranker() -> GeminiRanker {
        GeminiRanker::new(
            "test_key".to_string(),
            "http://test.local".to_string(),
            "test-model".to_string(),
            20,
        )
    }

    #[test]
    fn test_strip_code_fence_json_block() {
        let text = "여기 결과입니다\n```json\n[{\"id\": \"A1\"}]\n```\n";
        assert_eq!(strip_code_fence(text), "[{\"id\": \"A1\"}]");
    }

    #[test]
    fn test_strip_code_fence_bare_block() {
        let text = "```\n[]\n```";
        assert_eq!(strip_code_fence(text), "[]");
    }

    #[test]
    fn test_strip_code_fence_plain_text() {
        assert_eq!(strip_code_fence("  [1, 2] "), "[1, 2]");
    }

    #[test]
    fn test_parse_ranking_assigns_ranks_and_accepts_numeric_ids() {
        let text = r#"```json
[
  {"id": "B2404", "rationale": "치즈 전문"},
  {"id": 1234, "rationale": "우유"},
  {"rationale": "id 없음"},
  {"id": "A2101"}
]
```"#;

        let ranked = parse_ranking(text).unwrap();
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0], RankedRecommendation::new("B2404", "치즈 전문", 1));
        assert_eq!(ranked[1], RankedRecommendation::new("1234", "우유", 2));
        assert_eq!(ranked[2], RankedRecommendation::new("A2101", "", 3));
    }

    #[test]
    fn test_parse_ranking_keeps_duplicates_for_the_list_manager() {
        let ranked = parse_ranking(r#"[{"id": "A"}, {"id": "A"}]"#).unwrap();
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_parse_ranking_invalid_json_is_external_failure() {
        let err = parse_ranking("추천할 수 없습니다").unwrap_err();
        assert!(err.is_external());
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "[{\"id\":" }, { "text": "\"A\"}]" }] } }]
        });
        assert_eq!(
            GeminiRanker::extract_text(&response).unwrap(),
            "[{\"id\":\"A\"}]"
        );
    }

    #[test]
    fn test_extract_text_missing_candidates_fails() {
        assert!(GeminiRanker::extract_text(&json!({ "candidates": [] })).is_err());
    }

    #[test]
    fn test_build_prompt_lists_candidates_and_count() {
        let mut pool = CandidatePool::new();
        pool.merge(
            Candidate::new("B2404", 0.81).with_booth(Booth {
                id: "B2404".to_string(),
                company_name_kor: "치즈공방".to_string(),
                category: Some("유제품".to_string()),
                company_description: "수제 치즈".to_string(),
                products: "모짜렐라".to_string(),
                products_description: String::new(),
            }),
        );
        pool.merge(Candidate::new("A0001", 0.5));

        let prompt = test_ranker().build_prompt(&pool, "나이: 30세").unwrap();
        assert!(prompt.contains("부스 20개"));
        assert!(prompt.contains("참관객 정보: 나이: 30세"));
        assert!(prompt.contains("\"company_name_kor\": \"치즈공방\""));
        assert!(prompt.contains("\"id\": \"A0001\""));
    }

    #[test]
    fn test_embed_request_body_shape() {
        let body = GeminiEmbedder::request_body("우유");
        assert_eq!(body["content"]["parts"][0]["text"], "우유");
        assert_eq!(body["taskType"], "SEMANTIC_SIMILARITY");
    }

    #[tokio::test]
    async fn test_transport_failure_does_not_expose_api_key() {
        let ranker = GeminiRanker::new(
            "SECRET_KEY_123".to_string(),
            "http://127.0.0.1:1".to_string(),
            "test-model".to_string(),
            20,
        );
        let mut pool = CandidatePool::new();
        pool.merge(Candidate::new("B01", 0.5));

        let err = ranker.rank(&pool, "관심사: 유제품: 치즈").await.unwrap_err();
        assert!(!err.to_string().contains("SECRET_KEY_123"));

        let response = axum::response::IntoResponse::into_response(err);
        assert_eq!(response.status(), axum::http::StatusCode::BAD_GATEWAY);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8_lossy(&body);
        assert!(!body.contains("SECRET_KEY_123"));
        assert!(!body.contains("127.0.0.1"));
    }
}
