//! The HTTP transport shared by every source adapter.

use std::time::Duration;

use color_eyre::eyre;
use reqwest::{header, StatusCode};
use tracing::{debug, error, warn};

use crate::{config, error::FetchError};

/// What an upstream handed back, after content negotiation.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
	Json(serde_json::Value),
	Text(String),
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub base_delay: Duration,
}

impl RetryPolicy {
	/// Delay before retrying after the given (0-based) failed attempt.
	pub fn backoff(&self, attempt: u32) -> Duration {
		self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
	}
}

#[derive(Clone)]
pub struct Client {
	client: reqwest::Client,
	retry: RetryPolicy,
}

enum Failure {
	Transient(FetchError),
	Fatal(FetchError),
}

impl Client {
	const fn new(client: reqwest::Client, retry: RetryPolicy) -> Self {
		Self { client, retry }
	}

	pub fn get(&self, url: &str) -> reqwest::RequestBuilder {
		self.client.get(url)
	}

	/// GETs `url`, retrying transient failures with exponential backoff.
	///
	/// # Errors
	///
	/// Returns a `FetchError` once the retry budget is spent, or straight away
	/// for a non-transient HTTP status.
	pub async fn fetch(&self, url: &str) -> Result<Payload, FetchError> {
		let attempts = self.retry.max_attempts.max(1);
		let mut attempt = 0;
		loop {
			let failure = match self.fetch_once(url).await {
				Ok(payload) => return Ok(payload),
				Err(Failure::Fatal(e)) => {
					error!(%url, error = %e, "Upstream refused the request");
					return Err(e);
				},
				Err(Failure::Transient(e)) => e,
			};

			attempt += 1;
			if attempt >= attempts {
				error!(%url, attempts, "All attempts failed");
				return Err(match failure {
					FetchError::Transport { url, source, .. } => FetchError::Transport {
						url,
						attempts,
						source,
					},
					other => other,
				});
			}

			let delay = self.retry.backoff(attempt - 1);
			warn!(%url, attempt, ?delay, error = %failure, "Attempt failed, backing off");
			tokio::time::sleep(delay).await;
		}
	}

	async fn fetch_once(&self, url: &str) -> Result<Payload, Failure> {
		let transport = |source| {
			Failure::Transient(FetchError::Transport {
				url: url.to_owned(),
				attempts: 1,
				source,
			})
		};

		let response = self.get(url).send().await.map_err(transport)?;
		let status = response.status();
		if !status.is_success() {
			let e = FetchError::Status {
				url: url.to_owned(),
				status,
			};
			return Err(if is_transient(status) {
				Failure::Transient(e)
			} else {
				Failure::Fatal(e)
			});
		}

		let is_json = response
			.headers()
			.get(header::CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.is_some_and(|value| value.to_ascii_lowercase().contains("json"));
		let body = response.text().await.map_err(transport)?;
		debug!(%url, is_json, bytes = body.len(), "Fetched upstream");

		if !is_json {
			return Ok(Payload::Text(body));
		}
		match serde_json::from_str(&body) {
			Ok(value) => Ok(Payload::Json(value)),
			Err(e) => {
				warn!(%url, error = %e, "Upstream declared JSON but sent something else");
				Ok(Payload::Text(body))
			},
		}
	}
}

fn is_transient(status: StatusCode) -> bool {
	status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

pub fn new(config: &config::Config) -> eyre::Result<Client> {
	let mut headers = header::HeaderMap::new();
	headers.insert(
		header::USER_AGENT,
		header::HeaderValue::from_str(&config.user_agent)?,
	);

	let client = reqwest::Client::builder()
		.default_headers(headers)
		.timeout(config.request_timeout)
		.build()?;
	Ok(Client::new(
		client,
		RetryPolicy {
			max_attempts: config.max_retries,
			base_delay: config.retry_base_delay,
		},
	))
}
