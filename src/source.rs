//! Source adapters: one per upstream status page, each turning that page's
//! own shape into a [`ServiceSnapshot`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info_span, warn, Instrument};

use crate::{
	config,
	error::{FetchError, ParseError},
	status::ServiceSnapshot,
	upstream::{self, Payload},
};

mod augmented;
mod indicator;
mod keyword;
mod summary;
pub mod vocabulary;

pub use augmented::AugmentedSource;
pub use indicator::IndicatorSource;
pub use keyword::KeywordSource;
pub use summary::SummarySource;

/// Everything one poll of a source pulled over the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
	pub primary: Payload,
	/// Secondary endpoints that answered; failed ones are simply absent.
	pub auxiliary: Vec<Payload>,
}

impl From<Payload> for Fetched {
	fn from(primary: Payload) -> Self {
		Self {
			primary,
			auxiliary: Vec::new(),
		}
	}
}

#[async_trait]
pub trait StatusSource: Send + Sync {
	fn name(&self) -> &str;

	fn url(&self) -> &str;

	async fn fetch(&self, client: &upstream::Client) -> Result<Fetched, FetchError> {
		client.fetch(self.url()).await.map(Fetched::from)
	}

	fn parse(&self, fetched: Fetched, polled_at: DateTime<Utc>)
		-> Result<ServiceSnapshot, ParseError>;
}

/// Fetches and parses one source. Never fails: fetch and parse errors come
/// back as an `Unknown` snapshot describing what went wrong.
pub async fn retrieve(source: &dyn StatusSource, client: &upstream::Client) -> ServiceSnapshot {
	let span = info_span!("retrieve", source = source.name());
	async {
		let fetched = match source.fetch(client).await {
			Ok(fetched) => fetched,
			Err(e) => {
				warn!(error = %e, "Fetch failed");
				return ServiceSnapshot::unknown(
					source.name(),
					source.url(),
					format!("Failed to fetch status data for {}: {e}", source.name()),
				);
			},
		};
		match source.parse(fetched, Utc::now()) {
			Ok(snapshot) => snapshot,
			Err(e) => {
				warn!(error = %e, "Parse failed");
				ServiceSnapshot::unknown(
					source.name(),
					source.url(),
					format!("Failed to parse status data: {e}"),
				)
			},
		}
	}
	.instrument(span)
	.await
}

/// The configured sources, in the order they are reported.
pub fn from_config(sources: &config::SourceUrls) -> Vec<Arc<dyn StatusSource>> {
	vec![
		Arc::new(SummarySource::new("openai", &sources.openai)),
		Arc::new(AugmentedSource::new(
			"anthropic",
			&sources.anthropic,
			sources.anthropic_components.clone(),
			&[
				"Claude Chat",
				"Anthropic API",
				"Claude Pro",
				"API Console",
				"Claude-3 Opus",
				"Claude-3 Sonnet",
				"Claude-3 Haiku",
			],
		)),
		Arc::new(IndicatorSource::new("cursor", &sources.cursor)),
		Arc::new(KeywordSource::new(
			"google_aistudio",
			&sources.google_aistudio,
			"Google AI Studio",
			&["AI Studio", "Gemini API", "Model Serving", "Authentication"],
		)),
	]
}

fn json(payload: &Payload) -> Result<&Value, ParseError> {
	match payload {
		Payload::Json(value) => Ok(value),
		Payload::Text(_) => Err(ParseError::ExpectedJson),
	}
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
	value.get(key).and_then(Value::as_str)
}

fn timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
	raw.and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
		.map(|at| at.with_timezone(&Utc))
}

fn slug(name: &str) -> String {
	name.to_lowercase()
		.split(|c: char| !c.is_alphanumeric())
		.filter(|part| !part.is_empty())
		.collect::<Vec<_>>()
		.join("_")
}
