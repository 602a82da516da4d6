use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{json, str_field, timestamp, vocabulary, Fetched, StatusSource};
use crate::{
	error::ParseError,
	status::{Component, ServiceSnapshot, StatusLevel},
};

/// A page whose payload nests its components under `summary` and carries no
/// page-level indicator of its own.
pub struct SummarySource {
	name: String,
	url: String,
}

impl SummarySource {
	pub fn new(name: &str, url: &str) -> Self {
		Self {
			name: name.to_owned(),
			url: url.to_owned(),
		}
	}
}

impl StatusSource for SummarySource {
	fn name(&self) -> &str {
		&self.name
	}

	fn url(&self) -> &str {
		&self.url
	}

	fn parse(&self, fetched: Fetched, polled_at: DateTime<Utc>)
		-> Result<ServiceSnapshot, ParseError> {
		let body = json(&fetched.primary)?;
		let summary = body.get("summary").ok_or(ParseError::MissingField("summary"))?;

		// Component statuses deliberately do not escalate the overall status;
		// only an explicit page indicator overrides the operational default.
		let overall_status = body
			.get("status")
			.and_then(|status| str_field(status, "indicator"))
			.map_or(StatusLevel::Operational, |indicator| {
				StatusLevel::from_indicator(vocabulary::STATUSPAGE, indicator)
			});

		let components = summary
			.get("components")
			.and_then(Value::as_array)
			.map(|components| {
				components
					.iter()
					.map(|c| component(c, polled_at))
					.collect()
			})
			.unwrap_or_default();

		let title = str_field(summary, "name").unwrap_or("OpenAI");
		Ok(ServiceSnapshot {
			service_name: self.name.clone(),
			overall_status,
			components,
			description: Some(format!("{title} - status retrieved")),
			updated_at: polled_at,
			page_url: str_field(summary, "public_url").unwrap_or(&self.url).to_owned(),
		})
	}
}

fn component(value: &Value, polled_at: DateTime<Utc>) -> Component {
	let name = str_field(value, "name").unwrap_or_default();
	Component {
		id: str_field(value, "id").unwrap_or_default().to_owned(),
		name: name.to_owned(),
		status: str_field(value, "status").map_or(StatusLevel::Operational, |status| {
			StatusLevel::from_indicator(vocabulary::STATUSPAGE, status)
		}),
		description: Some(format!("Component: {name}")),
		updated_at: Some(timestamp(str_field(value, "updated_at")).unwrap_or(polled_at)),
	}
}
