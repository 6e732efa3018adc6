use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use gh_core::{Category, Enricher, SourceLink, StoryGroup};
use gh_inference::{GeminiEnricher, InferenceConfig, ModelKind};
use serde_json::{json, Value};
use url::Url;

type Calls = Arc<Mutex<Vec<&'static str>>>;

async fn generate(State(calls): State<Calls>, Json(body): Json<Value>) -> Json<Value> {
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default();
    let routine = prompt.contains("Title: Local team");

    let (kind, reply) = if prompt.contains("news quality evaluator") {
        let reply = if prompt.contains("Title: Celebrity") {
            "2: Celebrity gossip."
        } else if routine {
            "5: Routine match report."
        } else {
            "7: Important economic policy change."
        };
        ("quality", reply)
    } else if prompt.starts_with("Classify") {
        ("category", if routine { "sports" } else { "Business" })
    } else if prompt.contains("news summarizer") {
        (
            "summary",
            "```json\n{\"summary\": \"The Fed raised rates by a quarter point.\", \"imagePrompt\": \"federal reserve building at dusk\"}\n```",
        )
    } else if prompt.contains("Daily Life Impact") {
        ("impact", "Loan and mortgage payments will rise for new borrowers.")
    } else {
        ("unknown", "")
    };

    calls.lock().unwrap().push(kind);
    Json(json!({ "candidates": [{ "content": { "parts": [{ "text": reply }] } }] }))
}

async fn spawn_mock() -> (SocketAddr, Calls) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/v1beta/models/:action", post(generate))
        .with_state(calls.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, calls)
}

fn config(base_url: String) -> InferenceConfig {
    InferenceConfig {
        model: ModelKind::Gemini,
        api_key: Some("test-key".to_string()),
        base_url,
        request_spacing_ms: 0,
        ..InferenceConfig::default()
    }
}

fn story(title: &str, category: Category) -> StoryGroup {
    let pub_date = Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap();
    StoryGroup {
        title: title.to_string(),
        description: "Original feed description.".to_string(),
        link: Url::parse("https://news.example.com/story").unwrap(),
        source: "A".to_string(),
        original_id: String::new(),
        image_url: None,
        pub_date,
        category,
        sources: vec!["A".to_string()],
        descriptions: vec!["Original feed description.".to_string()],
        links: vec![SourceLink {
            source: "A".to_string(),
            url: "https://news.example.com/story".to_string(),
        }],
        categories: vec![category],
        pub_dates: vec![pub_date],
        source_diversity: 1,
        unique_categories: vec![category],
        combined_description: "Original feed description.".to_string(),
    }
}

#[tokio::test]
async fn test_full_enrichment() {
    let (addr, calls) = spawn_mock().await;
    let enricher = GeminiEnricher::new(&config(format!("http://{}/v1beta", addr))).unwrap();

    let enrichment = enricher
        .enrich(&story("Fed raises interest rates by 0.25%", Category::General))
        .await
        .unwrap();

    assert!(enrichment.should_publish);
    assert_eq!(enrichment.quality_score, 7);
    assert_eq!(enrichment.quality_reason, "Important economic policy change.");
    assert_eq!(enrichment.category, Category::Business);
    assert_eq!(enrichment.summary.as_deref(), Some("The Fed raised rates by a quarter point."));
    assert_eq!(enrichment.image_keywords.as_deref(), Some("federal reserve building at dusk"));
    assert_eq!(
        enrichment.daily_life_impact.as_deref(),
        Some("Loan and mortgage payments will rise for new borrowers.")
    );
    assert_eq!(*calls.lock().unwrap(), vec!["quality", "category", "summary", "impact"]);
}

#[tokio::test]
async fn test_low_quality_stops_after_rating() {
    let (addr, calls) = spawn_mock().await;
    let enricher = GeminiEnricher::new(&config(format!("http://{}/v1beta", addr))).unwrap();

    let enrichment = enricher
        .enrich(&story("Celebrity spotted at cafe", Category::Entertainment))
        .await
        .unwrap();

    assert!(!enrichment.should_publish);
    assert_eq!(enrichment.quality_score, 2);
    assert_eq!(enrichment.summary, None);
    assert_eq!(*calls.lock().unwrap(), vec!["quality"]);
}

#[tokio::test]
async fn test_routine_sports_skips_impact() {
    let (addr, calls) = spawn_mock().await;
    let enricher = GeminiEnricher::new(&config(format!("http://{}/v1beta", addr))).unwrap();

    let enrichment = enricher
        .enrich(&story("Local team wins again", Category::General))
        .await
        .unwrap();

    assert!(enrichment.should_publish);
    assert_eq!(enrichment.category, Category::Sports);
    assert_eq!(enrichment.daily_life_impact, None);
    assert_eq!(*calls.lock().unwrap(), vec!["quality", "category", "summary"]);
}

#[tokio::test]
async fn test_unreachable_service_falls_back() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let enricher = GeminiEnricher::new(&config(format!("http://{}/v1beta", addr))).unwrap();
    let enrichment = enricher
        .enrich(&story("Storm hits coast", Category::World))
        .await
        .unwrap();

    assert!(enrichment.should_publish);
    assert_eq!(enrichment.quality_score, 5);
    assert_eq!(enrichment.quality_reason, "Evaluation error");
    assert_eq!(enrichment.category, Category::World);
    assert_eq!(enrichment.summary.as_deref(), Some("Original feed description."));
    assert_eq!(enrichment.image_keywords.as_deref(), Some("storm hits coast"));
    assert_eq!(enrichment.daily_life_impact, None);
}

#[test]
fn test_requires_api_key() {
    let mut config = config("http://localhost/v1beta".to_string());
    config.api_key = Some("   ".to_string());
    assert!(GeminiEnricher::new(&config).is_err());
}

#[test]
fn test_debug_redacts_key() {
    let enricher = GeminiEnricher::new(&config("http://localhost/v1beta".to_string())).unwrap();
    assert!(!format!("{:?}", enricher).contains("test-key"));
}
