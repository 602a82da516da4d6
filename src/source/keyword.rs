use chrono::{DateTime, Utc};

use super::{slug, vocabulary, Fetched, StatusSource};
use crate::{
	error::ParseError,
	status::{Component, ServiceSnapshot, StatusLevel},
	upstream::Payload,
};

/// How much text after a component's name is searched for status keywords.
const WINDOW: usize = 200;
/// Elements whose contents never render as text.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style"];

/// A page with no structured data. Each expected component is located in the
/// page text and classified by the first keyword category found near it.
/// Approximate by nature.
pub struct KeywordSource {
	name: String,
	url: String,
	title: String,
	expected_components: &'static [&'static str],
}

impl KeywordSource {
	pub fn new(
		name: &str,
		url: &str,
		title: &str,
		expected_components: &'static [&'static str],
	) -> Self {
		Self {
			name: name.to_owned(),
			url: url.to_owned(),
			title: title.to_owned(),
			expected_components,
		}
	}
}

impl StatusSource for KeywordSource {
	fn name(&self) -> &str {
		&self.name
	}

	fn url(&self) -> &str {
		&self.url
	}

	fn parse(&self, fetched: Fetched, polled_at: DateTime<Utc>)
		-> Result<ServiceSnapshot, ParseError> {
		let Payload::Text(html) = fetched.primary else {
			return Err(ParseError::ExpectedText);
		};
		let text = visible_text(&html).to_lowercase();
		if text.trim().is_empty() {
			return Err(ParseError::Empty);
		}
		let names: Vec<String> = self
			.expected_components
			.iter()
			.map(|name| name.to_lowercase())
			.collect();

		let components: Vec<Component> = self
			.expected_components
			.iter()
			.zip(&names)
			.map(|(name, lowered)| Component {
				id: slug(name),
				name: (*name).to_owned(),
				status: classify_near(&text, lowered, &names),
				description: Some(format!("{name} service status")),
				updated_at: Some(polled_at),
			})
			.collect();

		Ok(ServiceSnapshot {
			service_name: self.name.clone(),
			overall_status: escalate(&components),
			components,
			description: Some(format!("{} - status page reachable", self.title)),
			updated_at: polled_at,
			page_url: self.url.clone(),
		})
	}
}

/// Markup stripped down to its text, tags replaced by spaces. Script and
/// style bodies are dropped.
fn visible_text(html: &str) -> String {
	let mut text = String::with_capacity(html.len());
	let mut rest = html;
	while let Some(open) = rest.find('<') {
		text.push_str(&rest[..open]);
		text.push(' ');
		let tag = &rest[open + 1..];
		let Some(close) = tag.find('>') else {
			return text;
		};
		let element = tag[..close]
			.split(|c: char| c.is_whitespace() || c == '/')
			.next()
			.unwrap_or_default();
		rest = &tag[close + 1..];
		if let Some(hidden) = HIDDEN_ELEMENTS
			.iter()
			.find(|hidden| element.eq_ignore_ascii_case(hidden))
		{
			rest = skip_element(rest, hidden);
		}
	}
	text.push_str(rest);
	text
}

/// The markup after the closing tag of `element`, or nothing if it is never
/// closed.
fn skip_element<'a>(html: &'a str, element: &str) -> &'a str {
	// ASCII lowercasing keeps byte offsets intact.
	let Some(at) = html
		.to_ascii_lowercase()
		.find(&format!("</{element}"))
	else {
		return "";
	};
	html[at..].find('>').map_or("", |close| &html[at + close + 1..])
}

/// Finds `name` in `text` (its words in order, anything in between) and
/// classifies the text that follows it, up to the next mention of another
/// component. Unmatched names count as operational.
fn classify_near(text: &str, name: &str, components: &[String]) -> StatusLevel {
	let Some((_, after)) = locate(text, name) else {
		return StatusLevel::Operational;
	};
	let mut end = (after + WINDOW).min(text.len());
	while !text.is_char_boundary(end) {
		end -= 1;
	}
	let window = &text[after..end];
	let neighbour = components
		.iter()
		.filter(|other| other.as_str() != name)
		.filter_map(|other| locate(window, other).map(|(start, _)| start))
		.min()
		.unwrap_or(window.len());
	classify(&window[..neighbour])
}

/// Byte range of the first match of `name` in `text`.
fn locate(text: &str, name: &str) -> Option<(usize, usize)> {
	let mut words = name.split_whitespace();
	let first = words.next()?;
	text.match_indices(first).find_map(|(at, _)| {
		let mut cursor = at + first.len();
		words
			.clone()
			.all(|word| match text[cursor..].find(word) {
				Some(offset) => {
					cursor += offset + word.len();
					true
				},
				None => false,
			})
			.then_some((at, cursor))
	})
}

fn classify(snippet: &str) -> StatusLevel {
	vocabulary::KEYWORDS
		.iter()
		.find(|(_, keywords)| keywords.iter().any(|keyword| snippet.contains(keyword)))
		.map_or(StatusLevel::Operational, |(level, _)| *level)
}

fn escalate(components: &[Component]) -> StatusLevel {
	let is_outage = |c: &Component| {
		matches!(
			c.status,
			StatusLevel::PartialOutage | StatusLevel::MajorOutage
		)
	};
	if components.iter().any(is_outage) {
		StatusLevel::PartialOutage
	} else if components.iter().any(|c| c.status != StatusLevel::Operational) {
		StatusLevel::DegradedPerformance
	} else {
		StatusLevel::Operational
	}
}
