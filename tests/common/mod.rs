#![allow(dead_code)]

use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use axum::{http::StatusCode, response::Html, routing::get, Json, Router};
use serde_json::json;
use statuspage_aggregator::{
	aggregator::Aggregator,
	api::{self, AppState},
	config::{self, Config},
	publisher::Publisher,
	source, upstream,
};

pub async fn serve(router: Router) -> SocketAddr {
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
		.await
		.expect("bind listener");
	let addr = listener.local_addr().expect("local addr");
	tokio::spawn(async move { axum::serve(listener, router).await.expect("serve") });
	addr
}

/// Four upstream status pages, one per adapter shape.
pub fn fake_upstreams() -> Router {
	Router::new()
		.route(
			"/openai",
			get(|| async {
				Json(json!({
					"summary": {
						"name": "OpenAI",
						"public_url": "https://status.openai.com",
						"components": [
							{"id": "o1", "name": "APIs"},
							{"id": "o2", "name": "ChatGPT"}
						]
					}
				}))
			}),
		)
		.route(
			"/anthropic/status.json",
			get(|| async {
				Json(json!({
					"page": {"url": "https://status.anthropic.com"},
					"status": {"indicator": "none", "description": "All Systems Operational"}
				}))
			}),
		)
		.route(
			"/anthropic/components.json",
			get(|| async {
				Json(json!({"components": [
					{"id": "a1", "name": "claude.ai", "status": "operational"},
					{"id": "a2", "name": "Claude API", "status": "operational"}
				]}))
			}),
		)
		.route(
			"/cursor",
			get(|| async {
				Json(json!({
					"status": {"indicator": "minor", "description": "Minor Service Outage"},
					"components": [
						{"id": "c1", "name": "Editor Sync", "status": "degraded_performance"},
						{"id": "c2", "name": "API", "status": "operational"}
					]
				}))
			}),
		)
		.route(
			"/aistudio",
			get(|| async { Html("<html><body><p>Gemini API</p><p>Operational</p></body></html>") }),
		)
		.route("/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
}

pub struct App {
	pub addr: SocketAddr,
	pub publisher: Arc<Publisher>,
}

pub fn config(upstream: SocketAddr, overrides: &[(&str, &str)]) -> Config {
	let mut vars: HashMap<String, String> = [
		("APP_NAME", "Test Status".to_owned()),
		("REQUEST_TIMEOUT_SECS", "1".to_owned()),
		("MAX_RETRIES", "2".to_owned()),
		("RETRY_BASE_DELAY_MS", "10".to_owned()),
		("OPENAI_STATUS_URL", format!("http://{upstream}/openai")),
		("ANTHROPIC_STATUS_URL", format!("http://{upstream}/anthropic/status.json")),
		(
			"ANTHROPIC_COMPONENTS_URLS",
			format!("http://{upstream}/anthropic/components.json"),
		),
		("CURSOR_STATUS_URL", format!("http://{upstream}/cursor")),
		("GOOGLE_AISTUDIO_STATUS_URL", format!("http://{upstream}/aistudio")),
	]
	.into_iter()
	.map(|(k, v)| (k.to_owned(), v))
	.collect();
	for (key, value) in overrides {
		vars.insert((*key).to_owned(), value.replace("{upstream}", &upstream.to_string()));
	}
	config::from_lookup(|key| vars.get(key).cloned()).expect("test config")
}

pub async fn start(config: Config) -> App {
	let client = upstream::new(&config).expect("upstream client");
	let publisher = Arc::new(Publisher::new(Aggregator::new(
		source::from_config(&config.sources),
		client,
	)));
	let addr = serve(api::router(AppState {
		publisher: publisher.clone(),
		config: Arc::new(config),
	}))
	.await;
	App { addr, publisher }
}

pub async fn start_default() -> App {
	let upstream = serve(fake_upstreams()).await;
	start(config(upstream, &[])).await
}
