//! The normalized status model every upstream is mapped into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StatusLevel {
	Operational,
	DegradedPerformance,
	PartialOutage,
	MajorOutage,
	UnderMaintenance,
	Unknown,
}

impl StatusLevel {
	/// Looks `indicator` up in an upstream's vocabulary table, ignoring case.
	/// Anything outside the table is `Unknown`.
	pub fn from_indicator(table: &[(&str, StatusLevel)], indicator: &str) -> Self {
		table
			.iter()
			.find(|(word, _)| word.eq_ignore_ascii_case(indicator.trim()))
			.map_or(Self::Unknown, |(_, level)| *level)
	}
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Component {
	pub id: String,
	pub name: String,
	pub status: StatusLevel,
	pub description: Option<String>,
	pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ServiceSnapshot {
	pub service_name: String,
	pub overall_status: StatusLevel,
	pub components: Vec<Component>,
	pub description: Option<String>,
	pub updated_at: DateTime<Utc>,
	pub page_url: String,
}

impl ServiceSnapshot {
	/// The stand-in for a source that could not be fetched or parsed.
	pub fn unknown(service_name: &str, page_url: &str, description: String) -> Self {
		Self {
			service_name: service_name.to_owned(),
			overall_status: StatusLevel::Unknown,
			components: Vec::new(),
			description: Some(description),
			updated_at: Utc::now(),
			page_url: page_url.to_owned(),
		}
	}
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AggregateSnapshot {
	pub services: Vec<ServiceSnapshot>,
	pub generated_at: DateTime<Utc>,
	pub refresh_interval_seconds: u64,
}

/// Envelope for everything pushed to a subscriber.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushMessage {
	StatusUpdate {
		data: AggregateSnapshot,
		timestamp: DateTime<Utc>,
	},
	Error {
		message: String,
		timestamp: DateTime<Utc>,
	},
}

impl PushMessage {
	pub fn status_update(data: AggregateSnapshot) -> Self {
		let timestamp = data.generated_at;
		Self::StatusUpdate { data, timestamp }
	}

	pub fn error(message: impl Into<String>) -> Self {
		Self::Error {
			message: message.into(),
			timestamp: Utc::now(),
		}
	}
}
