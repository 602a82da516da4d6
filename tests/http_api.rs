mod common;

use serde_json::Value;

async fn get(addr: std::net::SocketAddr, path: &str) -> (u16, Value) {
	let response = reqwest::get(format!("http://{addr}{path}"))
		.await
		.expect("request");
	let status = response.status().as_u16();
	let body = response.json().await.expect("json body");
	(status, body)
}

#[tokio::test]
async fn health_names_the_service() {
	let app = common::start_default().await;

	let (status, body) = get(app.addr, "/health").await;
	assert_eq!(status, 200);
	assert_eq!(body["status"], "healthy");
	assert_eq!(body["service"], "Test Status");
}

#[tokio::test]
async fn aggregate_status_covers_every_source_in_order() {
	let app = common::start_default().await;

	let (status, body) = get(app.addr, "/status").await;
	assert_eq!(status, 200);
	assert_eq!(body["refresh_interval_seconds"], 30);
	assert!(body["generated_at"].is_string());

	let services = body["services"].as_array().unwrap();
	let names: Vec<_> = services
		.iter()
		.map(|s| s["service_name"].as_str().unwrap())
		.collect();
	assert_eq!(names, ["openai", "anthropic", "cursor", "google_aistudio"]);

	assert_eq!(services[0]["overall_status"], "operational");
	assert_eq!(services[0]["page_url"], "https://status.openai.com");
	assert_eq!(services[1]["components"].as_array().unwrap().len(), 2);
	assert_eq!(services[2]["overall_status"], "degraded_performance");
	assert_eq!(services[2]["components"][0]["status"], "degraded_performance");
	assert_eq!(services[3]["overall_status"], "operational");
	assert_eq!(services[3]["components"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn refresh_interval_is_bounded() {
	let app = common::start_default().await;

	let (status, body) = get(app.addr, "/status?refresh_interval=60").await;
	assert_eq!(status, 200);
	assert_eq!(body["refresh_interval_seconds"], 60);

	for out_of_range in ["4", "301"] {
		let (status, body) = get(app.addr, &format!("/status?refresh_interval={out_of_range}")).await;
		assert_eq!(status, 422);
		assert!(body["detail"].as_str().unwrap().contains("between 5 and 300"));
	}
}

#[tokio::test]
async fn single_service_lookup_ignores_case() {
	let app = common::start_default().await;

	let (status, body) = get(app.addr, "/status/CURSOR").await;
	assert_eq!(status, 200);
	assert_eq!(body["service_name"], "cursor");
	assert_eq!(body["overall_status"], "degraded_performance");

	let (_, again) = get(app.addr, "/status/cursor").await;
	assert_eq!(again["components"], body["components"]);
	assert_eq!(again["overall_status"], body["overall_status"]);
}

#[tokio::test]
async fn repeated_lookups_agree_apart_from_timestamps() {
	let app = common::start_default().await;

	let (status, first) = get(app.addr, "/status/openai").await;
	assert_eq!(status, 200);
	let (status, second) = get(app.addr, "/status/openai").await;
	assert_eq!(status, 200);

	assert_eq!(first["overall_status"], "operational");
	for field in ["service_name", "overall_status", "description", "page_url"] {
		assert_eq!(first[field], second[field], "{field} differs");
	}
	let stable = |body: &Value| {
		body["components"]
			.as_array()
			.unwrap()
			.iter()
			.map(|c| (c["id"].clone(), c["name"].clone(), c["status"].clone()))
			.collect::<Vec<_>>()
	};
	assert_eq!(stable(&first).len(), 2);
	assert_eq!(stable(&first), stable(&second));
}

#[tokio::test]
async fn unknown_service_lists_what_is_available() {
	let app = common::start_default().await;

	let (status, body) = get(app.addr, "/status/bard").await;
	assert_eq!(status, 404);
	assert!(body["detail"].as_str().unwrap().contains("'bard' not found"));
	assert_eq!(
		body["available_services"],
		serde_json::json!(["openai", "anthropic", "cursor", "google_aistudio"])
	);
}

#[tokio::test]
async fn broken_upstream_only_affects_its_own_entry() {
	let upstream = common::serve(common::fake_upstreams()).await;
	let app = common::start(common::config(
		upstream,
		&[("CURSOR_STATUS_URL", "http://{upstream}/broken")],
	))
	.await;

	let (status, body) = get(app.addr, "/status").await;
	assert_eq!(status, 200);
	let services = body["services"].as_array().unwrap();
	assert_eq!(services.len(), 4);
	assert_eq!(services[2]["service_name"], "cursor");
	assert_eq!(services[2]["overall_status"], "unknown");
	assert_eq!(services[2]["components"], serde_json::json!([]));
	assert!(services[2]["description"]
		.as_str()
		.unwrap()
		.contains("Failed to fetch"));
	for i in [0, 1, 3] {
		assert_ne!(services[i]["overall_status"], "unknown");
	}
}

#[tokio::test]
async fn missing_auxiliary_components_fall_back_to_expected_list() {
	let upstream = common::serve(common::fake_upstreams()).await;
	let app = common::start(common::config(
		upstream,
		&[("ANTHROPIC_COMPONENTS_URLS", "http://{upstream}/broken")],
	))
	.await;

	let (_, body) = get(app.addr, "/status/anthropic").await;
	assert_eq!(body["overall_status"], "operational");
	let components = body["components"].as_array().unwrap();
	assert_eq!(components.len(), 7);
	assert_eq!(components[0]["name"], "Claude Chat");
	assert!(components.iter().all(|c| c["status"] == "operational"));
}
