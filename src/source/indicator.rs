use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{json, str_field, timestamp, vocabulary, Fetched, StatusSource};
use crate::{
	error::ParseError,
	status::{Component, ServiceSnapshot, StatusLevel},
};

/// A page exposing `status.indicator` and a flat `components` array, each
/// with its own status string.
pub struct IndicatorSource {
	name: String,
	url: String,
}

impl IndicatorSource {
	pub fn new(name: &str, url: &str) -> Self {
		Self {
			name: name.to_owned(),
			url: url.to_owned(),
		}
	}
}

impl StatusSource for IndicatorSource {
	fn name(&self) -> &str {
		&self.name
	}

	fn url(&self) -> &str {
		&self.url
	}

	fn parse(&self, fetched: Fetched, polled_at: DateTime<Utc>)
		-> Result<ServiceSnapshot, ParseError> {
		let body = json(&fetched.primary)?;
		let status = body.get("status").ok_or(ParseError::MissingField("status"))?;

		let indicator = str_field(status, "indicator").unwrap_or("unknown");
		let description = str_field(status, "description")
			.filter(|d| !d.is_empty())
			.unwrap_or("Status information retrieved");

		let components = body
			.get("components")
			.and_then(Value::as_array)
			.map(|components| components.iter().map(component).collect())
			.unwrap_or_default();

		Ok(ServiceSnapshot {
			service_name: self.name.clone(),
			overall_status: StatusLevel::from_indicator(vocabulary::STATUSPAGE, indicator),
			components,
			description: Some(description.to_owned()),
			updated_at: polled_at,
			page_url: self.url.clone(),
		})
	}
}

pub(super) fn component(value: &Value) -> Component {
	Component {
		id: str_field(value, "id").unwrap_or_default().to_owned(),
		name: str_field(value, "name").unwrap_or_default().to_owned(),
		status: StatusLevel::from_indicator(
			vocabulary::STATUSPAGE,
			str_field(value, "status").unwrap_or("unknown"),
		),
		description: str_field(value, "description").map(String::from),
		updated_at: timestamp(str_field(value, "updated_at")),
	}
}
