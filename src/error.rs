use thiserror::Error;

/// Upstream could not be reached, timed out, or kept answering non-2xx.
#[derive(Debug, Error)]
pub enum FetchError {
	#[error("request to {url} failed after {attempts} attempt(s): {source}")]
	Transport {
		url: String,
		attempts: u32,
		#[source]
		source: reqwest::Error,
	},
	#[error("{url} answered with HTTP {status}")]
	Status {
		url: String,
		status: reqwest::StatusCode,
	},
}

/// Upstream answered, but not with anything we can read.
#[derive(Debug, Error)]
pub enum ParseError {
	#[error("missing field `{0}`")]
	MissingField(&'static str),
	#[error("expected a JSON payload")]
	ExpectedJson,
	#[error("expected a text payload")]
	ExpectedText,
	#[error("empty payload")]
	Empty,
}

#[derive(Debug, Error)]
#[error("service '{requested}' not found")]
pub struct UnknownServiceError {
	pub requested: String,
	pub available: Vec<String>,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
	#[error("subscriber {0} is gone")]
	Closed(uuid::Uuid),
	#[error("subscriber {0} did not drain its queue in time")]
	TimedOut(uuid::Uuid),
}

/// A whole poll went wrong, as opposed to a single source.
#[derive(Debug, Error)]
#[error("status poll aborted: {0}")]
pub struct PollError(#[from] pub tokio::task::JoinError);
