//! End-to-end tests for the search pipeline
//!
//! A scripted LLM stands in for the chat service and a keyword-count
//! embedder for the embedding service, so rankings are fully predictable:
//! vectors are `[#boston, #cambridge, #quiet, 1.0]` over lowercased text.

use async_trait::async_trait;
use smartlease_core::{
    embed_pending, ingest_records, ChatMessage, Config, DatabasePool, Embedder, LLMClient,
    PropertyRecord, RerankOutcome, Result, RetrievalPath, SearchOptions, SearchPipeline,
    SmartLeaseError,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

struct ScriptedLlm {
    extraction_reply: String,
    rerank_reply: String,
    delay: Option<Duration>,
    /// (stage, temperature) per chat call
    temperatures: Mutex<Vec<(&'static str, f32)>>,
}

impl ScriptedLlm {
    fn new(extraction_reply: &str, rerank_reply: &str) -> Self {
        Self {
            extraction_reply: extraction_reply.to_string(),
            rerank_reply: rerank_reply.to_string(),
            delay: None,
            temperatures: Mutex::new(Vec::new()),
        }
    }
}

fn keyword_vector(text: &str) -> Vec<f32> {
    let text = text.to_lowercase();
    vec![
        text.matches("boston").count() as f32,
        text.matches("cambridge").count() as f32,
        text.matches("quiet").count() as f32,
        1.0,
    ]
}

#[async_trait]
impl LLMClient for ScriptedLlm {
    async fn chat_completion(&self, messages: Vec<ChatMessage>, temperature: f32) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let prompt = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        let stage = if prompt.contains("ranked_properties") {
            "rerank"
        } else {
            "extract"
        };
        self.temperatures.lock().unwrap().push((stage, temperature));
        if stage == "rerank" {
            Ok(self.rerank_reply.clone())
        } else {
            Ok(self.extraction_reply.clone())
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(keyword_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }

    fn model_name(&self) -> &str {
        "scripted-chat"
    }

    fn embedding_model(&self) -> &str {
        "keyword-counts"
    }
}

#[async_trait]
impl Embedder for ScriptedLlm {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(keyword_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }

    fn model_name(&self) -> &str {
        "keyword-counts"
    }
}

fn listing(id: &str, address: &str, price: &str, neighborhoods: &str) -> PropertyRecord {
    PropertyRecord::from_fields([
        ("property_id", id),
        ("address", address),
        ("list_price", price),
        ("neighborhoods", neighborhoods),
    ])
    .unwrap()
}

struct Fixture {
    _dir: TempDir,
    pool: DatabasePool,
    config: Config,
}

async fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let pool = DatabasePool::open(dir.path().join("properties.sqlite"), 2).unwrap();

    {
        let db = pool.acquire().await.unwrap();
        ingest_records(
            &db,
            &[
                listing("p1", "1 Beacon St, Boston", "2500", "Back Bay, quiet"),
                listing("p2", "20 Main St, Cambridge", "1800", "Kendall"),
                listing("p3", "5 Elm St, Boston", "1500", "Dorchester"),
                listing("p4", "9 Oak St, Somerville", "1900", "Davis, quiet"),
            ],
        )
        .unwrap();
    }

    let embedder = ScriptedLlm::new("{}", "{}");
    let embedded = embed_pending(&pool, &embedder, 2, None::<fn(usize, usize)>)
        .await
        .unwrap();
    assert_eq!(embedded, 4);

    Fixture {
        _dir: dir,
        pool,
        config: Config::default(),
    }
}

fn pipeline(fx: &Fixture, llm: ScriptedLlm) -> SearchPipeline {
    let llm = Arc::new(llm);
    SearchPipeline::new(&fx.config, fx.pool.clone(), llm.clone(), llm)
}

fn ids(report: &smartlease_core::SearchReport) -> Vec<&str> {
    report
        .candidates
        .iter()
        .map(|c| c.record.property_id.as_str())
        .collect()
}

const NO_RERANK: SearchOptions = SearchOptions { rerank: false };

#[tokio::test]
async fn test_empty_metadata_filters_nothing() {
    let fx = fixture().await;
    let pipeline = pipeline(&fx, ScriptedLlm::new("{}", "{}"));

    let report = pipeline
        .search_with("quiet place in boston", NO_RERANK)
        .await
        .unwrap();

    assert!(report.predicate.is_empty());
    assert_eq!(ids(&report), vec!["p1", "p3", "p4", "p2"]);
    for c in &report.candidates {
        assert_eq!(c.source, RetrievalPath::Filtered);
        assert!((c.final_score - c.similarity - 0.1).abs() < 1e-9);
    }
}

#[tokio::test]
async fn test_price_ceiling_boosts_cheaper_listings() {
    let fx = fixture().await;
    let pipeline = pipeline(&fx, ScriptedLlm::new(r#"{"list_price": "<2000"}"#, "{}"));

    let report = pipeline
        .search_with("quiet place in boston under 2000", NO_RERANK)
        .await
        .unwrap();

    assert_eq!(report.predicate.to_string(), "numeric(list_price) < 2000");
    assert_eq!(ids(&report), vec!["p1", "p3", "p4", "p2"]);

    let p1 = &report.candidates[0];
    assert_eq!(p1.source, RetrievalPath::Semantic);
    assert!((p1.final_score - 1.0).abs() < 1e-6);

    // p3 is in both pools: kept once, from the filtered pool, boosted
    let p3: Vec<_> = report
        .candidates
        .iter()
        .filter(|c| c.record.property_id == "p3")
        .collect();
    assert_eq!(p3.len(), 1);
    assert_eq!(p3[0].source, RetrievalPath::Filtered);
    assert!((p3[0].final_score - p3[0].similarity - 0.1).abs() < 1e-9);
}

#[tokio::test]
async fn test_substring_filter_is_case_insensitive() {
    let fx = fixture().await;
    let pipeline = pipeline(&fx, ScriptedLlm::new(r#"{"address": "CAMBRIDGE"}"#, "{}"));

    let report = pipeline
        .search_with("something in cambridge", NO_RERANK)
        .await
        .unwrap();

    assert_eq!(ids(&report)[0], "p2");
    assert_eq!(report.candidates[0].source, RetrievalPath::Filtered);
    assert!(report.candidates[1..]
        .iter()
        .all(|c| c.source == RetrievalPath::Semantic));
}

#[tokio::test]
async fn test_unparsed_metadata_falls_back_to_semantic() {
    let fx = fixture().await;
    let pipeline = pipeline(&fx, ScriptedLlm::new("I am not sure what you mean.", "{}"));

    let report = pipeline
        .search_with("quiet place in boston", NO_RERANK)
        .await
        .unwrap();

    assert!(!report.metadata.is_parsed());
    assert!(report.predicate.is_empty());
    assert_eq!(report.candidates.len(), 4);
}

#[tokio::test]
async fn test_non_json_rerank_returns_raw_response() {
    let fx = fixture().await;
    let reply = "The best option is p1, it is quiet.";
    let pipeline = pipeline(&fx, ScriptedLlm::new("{}", reply));

    let outcome = pipeline.search("quiet place in boston").await.unwrap();

    match outcome {
        RerankOutcome::Failed { raw_response, .. } => assert_eq!(raw_response, reply),
        other => panic!("expected failure outcome, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rerank_keeps_only_known_ids() {
    let fx = fixture().await;
    let reply = r#"```json
{"ranked_properties": [
  {"property_id": "p3", "pros": ["cheap", "Boston"], "cons": ["busy"], "suggestion": "Tour it"},
  {"property_id": "p99", "pros": [], "cons": [], "suggestion": "?"}
]}
```"#;
    let pipeline = pipeline(&fx, ScriptedLlm::new("{}", reply));

    let outcome = pipeline.search("quiet place in boston").await.unwrap();

    let RerankOutcome::Ranked { ranked_properties } = outcome else {
        panic!("expected ranking");
    };
    assert_eq!(ranked_properties.len(), 1);
    assert_eq!(ranked_properties[0].property_id, "p3");
    assert_eq!(ranked_properties[0].suggestion, "Tour it");
}

#[tokio::test]
async fn test_rerank_samples_warmer_than_extraction() {
    let fx = fixture().await;
    let llm = Arc::new(ScriptedLlm::new(
        "{}",
        r#"{"ranked_properties": [{"property_id": "p1"}]}"#,
    ));
    let pipeline = SearchPipeline::new(&fx.config, fx.pool.clone(), llm.clone(), llm.clone());

    let outcome = pipeline.search("quiet place in boston").await.unwrap();
    assert!(outcome.is_ranked());

    let temperatures = llm.temperatures.lock().unwrap().clone();
    assert_eq!(temperatures, vec![("extract", 0.0), ("rerank", 0.7)]);
}

#[tokio::test]
async fn test_retrieval_is_idempotent() {
    let fx = fixture().await;
    let pipeline = pipeline(&fx, ScriptedLlm::new(r#"{"list_price": "<2000"}"#, "{}"));

    let first = pipeline.search_with("quiet boston", NO_RERANK).await.unwrap();
    let second = pipeline.search_with("quiet boston", NO_RERANK).await.unwrap();

    assert_eq!(ids(&first), ids(&second));
    let scores = |r: &smartlease_core::SearchReport| -> Vec<f64> {
        r.candidates.iter().map(|c| c.final_score).collect()
    };
    assert_eq!(scores(&first), scores(&second));
}

#[tokio::test]
async fn test_final_k_caps_results() {
    let mut fx = fixture().await;
    fx.config.search.final_k = 2;
    let pipeline = pipeline(&fx, ScriptedLlm::new("{}", "{}"));

    let report = pipeline.search_with("quiet boston", NO_RERANK).await.unwrap();
    assert_eq!(ids(&report), vec!["p1", "p3"]);
}

#[tokio::test]
async fn test_empty_query_rejected() {
    let fx = fixture().await;
    let pipeline = pipeline(&fx, ScriptedLlm::new("{}", "{}"));

    let err = pipeline.search("   ").await.unwrap_err();
    assert!(matches!(err, SmartLeaseError::InvalidInput(_)));
}

#[tokio::test]
async fn test_timeout_bounds_request() {
    let fx = fixture().await;
    let mut llm = ScriptedLlm::new("{}", "{}");
    llm.delay = Some(Duration::from_secs(5));
    let pipeline = pipeline(&fx, llm);

    let started = tokio::time::Instant::now();
    let err = pipeline
        .search_until("quiet boston", started + Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, SmartLeaseError::Timeout(_)));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_step_log_snapshots_each_stage() {
    let mut fx = fixture().await;
    let log_dir = fx._dir.path().join("steps");
    fx.config.search.step_log_dir = Some(log_dir.clone());
    let pipeline = pipeline(&fx, ScriptedLlm::new(r#"{"beds": 2}"#, "not json"));

    pipeline.search("two bed in boston").await.unwrap();

    let metadata: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(log_dir.join("metadata.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(metadata["user_query"], "two bed in boston");
    assert_eq!(metadata["metadata"]["beds"], 2);

    let results: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(log_dir.join("search_results.json")).unwrap(),
    )
    .unwrap();
    let first = &results.as_array().unwrap()[0];
    assert!(first.get("property_id").is_some());
    assert!(first.get("final_score").is_some());
    assert!(first.get("embedding").is_none());

    let final_results: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(log_dir.join("final_results.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(final_results["raw_response"], "not json");

    assert_eq!(pipeline.step_log().clear().unwrap(), 3);
}
