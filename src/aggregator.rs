//! Concurrent fan-out over every configured source.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, error};

use crate::{
	error::UnknownServiceError,
	source::{self, StatusSource},
	status::{AggregateSnapshot, ServiceSnapshot},
	upstream,
};

#[derive(Clone)]
pub struct Aggregator {
	sources: Vec<Arc<dyn StatusSource>>,
	client: upstream::Client,
}

impl Aggregator {
	pub fn new(sources: Vec<Arc<dyn StatusSource>>, client: upstream::Client) -> Self {
		Self { sources, client }
	}

	pub fn service_names(&self) -> Vec<String> {
		self.sources
			.iter()
			.map(|source| source.name().to_owned())
			.collect()
	}

	/// Polls every source at once. The result always holds one snapshot per
	/// source, in configuration order, whatever happened upstream.
	pub async fn poll(&self, refresh_interval_seconds: u64) -> AggregateSnapshot {
		let services = join_all(self.sources.iter().map(|source| self.isolated(source))).await;
		let snapshot = AggregateSnapshot {
			services,
			generated_at: Utc::now(),
			refresh_interval_seconds,
		};
		debug!(services = snapshot.services.len(), "Poll complete");
		snapshot
	}

	/// Polls the single source called `name` (ignoring case).
	///
	/// # Errors
	///
	/// Returns `UnknownServiceError` if no such source is configured.
	pub async fn poll_one(&self, name: &str) -> Result<ServiceSnapshot, UnknownServiceError> {
		let Some(source) = self
			.sources
			.iter()
			.find(|source| source.name().eq_ignore_ascii_case(name))
		else {
			return Err(UnknownServiceError {
				requested: name.to_lowercase(),
				available: self.service_names(),
			});
		};
		Ok(self.isolated(source).await)
	}

	/// Runs one source on its own task so that even a panicking adapter only
	/// costs us that source's snapshot.
	async fn isolated(&self, source: &Arc<dyn StatusSource>) -> ServiceSnapshot {
		let task = {
			let source = source.clone();
			let client = self.client.clone();
			tokio::spawn(async move { source::retrieve(source.as_ref(), &client).await })
		};
		match task.await {
			Ok(snapshot) => snapshot,
			Err(e) => {
				error!(source = source.name(), error = %e, "Source adapter crashed");
				ServiceSnapshot::unknown(
					source.name(),
					source.url(),
					format!("Failed to retrieve status for {}", source.name()),
				)
			},
		}
	}
}
