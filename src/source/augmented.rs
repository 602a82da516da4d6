use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use super::{indicator, json, slug, str_field, vocabulary, Fetched, StatusSource};
use crate::{
	error::{FetchError, ParseError},
	status::{Component, ServiceSnapshot, StatusLevel},
	upstream,
};

/// A page whose primary endpoint only gives the overall indicator; the
/// component list comes from auxiliary endpoints, or failing those from a
/// fixed list of components we expect the service to have.
pub struct AugmentedSource {
	name: String,
	url: String,
	auxiliary_urls: Vec<String>,
	expected_components: &'static [&'static str],
}

impl AugmentedSource {
	pub fn new(
		name: &str,
		url: &str,
		auxiliary_urls: Vec<String>,
		expected_components: &'static [&'static str],
	) -> Self {
		Self {
			name: name.to_owned(),
			url: url.to_owned(),
			auxiliary_urls,
			expected_components,
		}
	}

	fn expected(&self, polled_at: DateTime<Utc>) -> Vec<Component> {
		self.expected_components
			.iter()
			.map(|name| Component {
				id: slug(name),
				name: (*name).to_owned(),
				status: StatusLevel::Operational,
				description: None,
				updated_at: Some(polled_at),
			})
			.collect()
	}
}

#[async_trait]
impl StatusSource for AugmentedSource {
	fn name(&self) -> &str {
		&self.name
	}

	fn url(&self) -> &str {
		&self.url
	}

	async fn fetch(&self, client: &upstream::Client) -> Result<Fetched, FetchError> {
		let primary = client.fetch(&self.url).await?;

		let auxiliary = join_all(self.auxiliary_urls.iter().map(|url| client.fetch(url)))
			.await
			.into_iter()
			.zip(&self.auxiliary_urls)
			.filter_map(|(result, url)| match result {
				Ok(payload) => Some(payload),
				Err(e) => {
					warn!(%url, error = %e, "Auxiliary fetch failed");
					None
				},
			})
			.collect();

		Ok(Fetched { primary, auxiliary })
	}

	fn parse(&self, fetched: Fetched, polled_at: DateTime<Utc>)
		-> Result<ServiceSnapshot, ParseError> {
		let body = json(&fetched.primary)?;
		let status = body.get("status").ok_or(ParseError::MissingField("status"))?;
		let indicator = str_field(status, "indicator").unwrap_or("unknown");

		let listed = fetched.auxiliary.iter().find_map(|payload| {
			json(payload)
				.ok()
				.and_then(|value| value.get("components"))
				.and_then(Value::as_array)
				.filter(|components| !components.is_empty())
		});
		let components = match listed {
			Some(components) => components.iter().map(indicator::component).collect(),
			None => {
				debug!("No auxiliary component list, using the expected components");
				self.expected(polled_at)
			},
		};

		let page_url = body
			.get("page")
			.and_then(|page| str_field(page, "url"))
			.unwrap_or(&self.url);

		Ok(ServiceSnapshot {
			service_name: self.name.clone(),
			overall_status: StatusLevel::from_indicator(vocabulary::STATUSPAGE, indicator),
			components,
			description: str_field(status, "description")
				.filter(|d| !d.is_empty())
				.map(String::from),
			updated_at: polled_at,
			page_url: page_url.to_owned(),
		})
	}
}

#[cfg(test)]
mod tests {
	use axum::{http::StatusCode, routing::get, Json, Router};
	use serde_json::json;

	use super::*;
	use crate::{testing, upstream::Payload};

	const EXPECTED: &[&str] = &["Claude Chat", "Anthropic API"];

	fn source(url: &str, auxiliary: Vec<String>) -> AugmentedSource {
		AugmentedSource::new("anthropic", url, auxiliary, EXPECTED)
	}

	fn primary() -> Payload {
		Payload::Json(json!({
			"page": {"url": "https://status.anthropic.com"},
			"status": {"indicator": "major", "description": "Partial System Outage"}
		}))
	}

	#[test]
	fn auxiliary_components_are_used() {
		let fetched = Fetched {
			primary: primary(),
			auxiliary: vec![
				Payload::Json(json!({"components": []})),
				Payload::Json(json!({"components": [
					{"id": "k1", "name": "claude.ai", "status": "partial_outage"}
				]})),
			],
		};

		let snapshot = source("u", Vec::new()).parse(fetched, Utc::now()).unwrap();
		assert_eq!(snapshot.overall_status, StatusLevel::PartialOutage);
		assert_eq!(snapshot.page_url, "https://status.anthropic.com");
		assert_eq!(snapshot.components.len(), 1);
		assert_eq!(snapshot.components[0].status, StatusLevel::PartialOutage);
	}

	#[test]
	fn expected_components_fill_in_without_auxiliary_data() {
		let snapshot = source("u", Vec::new())
			.parse(primary().into(), Utc::now())
			.unwrap();

		let names: Vec<_> = snapshot.components.iter().map(|c| c.name.as_str()).collect();
		assert_eq!(names, EXPECTED);
		assert_eq!(snapshot.components[1].id, "anthropic_api");
		assert!(snapshot
			.components
			.iter()
			.all(|c| c.status == StatusLevel::Operational));
	}

	#[tokio::test]
	async fn failing_auxiliary_endpoints_do_not_fail_the_fetch() {
		let base = testing::serve(
			Router::new()
				.route(
					"/api/v2/status.json",
					get(|| async { Json(json!({"status": {"indicator": "none"}})) }),
				)
				.route(
					"/api/v2/components.json",
					get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
				),
		)
		.await;
		let source = source(
			&format!("{base}/api/v2/status.json"),
			vec![format!("{base}/api/v2/components.json")],
		);

		let snapshot = super::super::retrieve(&source, &testing::client()).await;
		assert_eq!(snapshot.overall_status, StatusLevel::Operational);
		assert_eq!(snapshot.components.len(), EXPECTED.len());
	}
}
