use std::{env, str::FromStr, time::Duration};

use color_eyre::eyre::{self, WrapErr};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushMode {
	/// Every subscriber runs its own poll loop at its own interval.
	PerSubscriber,
	/// One poll loop at the default interval, broadcast to everyone.
	Shared,
}

impl FromStr for PushMode {
	type Err = eyre::Report;

	fn from_str(s: &str) -> eyre::Result<Self> {
		match s.trim().to_ascii_lowercase().as_str() {
			"per_subscriber" | "per-subscriber" => Ok(Self::PerSubscriber),
			"shared" | "broadcast" => Ok(Self::Shared),
			other => eyre::bail!("Unknown push mode: {other}"),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshBounds {
	pub min: u64,
	pub default: u64,
	pub max: u64,
}

impl RefreshBounds {
	pub fn contains(&self, seconds: u64) -> bool {
		(self.min..=self.max).contains(&seconds)
	}
}

#[derive(Clone, Debug)]
pub struct SourceUrls {
	pub openai: String,
	pub anthropic: String,
	pub anthropic_components: Vec<String>,
	pub cursor: String,
	pub google_aistudio: String,
}

#[derive(Clone, Debug)]
pub struct Config {
	pub app_name: String,
	pub host: String,
	pub port: u16,
	pub user_agent: String,
	pub request_timeout: Duration,
	pub max_retries: u32,
	pub retry_base_delay: Duration,
	pub refresh: RefreshBounds,
	pub push_mode: PushMode,
	pub sources: SourceUrls,
}

pub fn new() -> eyre::Result<Config> {
	from_lookup(|key| env::var(key).ok())
}

/// Builds the config from any key lookup, falling back to defaults for
/// missing keys.
///
/// # Errors
///
/// Fails on values that do not parse, or on refresh bounds that do not nest.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> eyre::Result<Config> {
	let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

	let refresh = RefreshBounds {
		min: parsed(&lookup, "MIN_REFRESH_INTERVAL", 5)?,
		default: parsed(&lookup, "DEFAULT_REFRESH_INTERVAL", 30)?,
		max: parsed(&lookup, "MAX_REFRESH_INTERVAL", 300)?,
	};
	if refresh.min == 0 || !refresh.contains(refresh.default) {
		eyre::bail!(
			"Refresh interval bounds must satisfy 0 < min <= default <= max, got {refresh:?}"
		);
	}

	let anthropic_components = lookup("ANTHROPIC_COMPONENTS_URLS")
		.unwrap_or_else(|| "https://status.anthropic.com/api/v2/components.json".into())
		.split(',')
		.map(str::trim)
		.filter(|url| !url.is_empty())
		.map(String::from)
		.collect();

	Ok(Config {
		app_name: string("APP_NAME", "AI Service Status Dashboard"),
		host: string("HOST", "0.0.0.0"),
		port: parsed(&lookup, "PORT", 8000)?,
		user_agent: string("USER_AGENT", "AI-Status-Dashboard/1.0"),
		request_timeout: Duration::from_secs(parsed(&lookup, "REQUEST_TIMEOUT_SECS", 10)?),
		max_retries: parsed(&lookup, "MAX_RETRIES", 3)?,
		retry_base_delay: Duration::from_millis(parsed(&lookup, "RETRY_BASE_DELAY_MS", 1000)?),
		refresh,
		push_mode: string("PUSH_MODE", "per_subscriber").parse()?,
		sources: SourceUrls {
			openai: string(
				"OPENAI_STATUS_URL",
				"https://status.openai.com/proxy/status.openai.com",
			),
			anthropic: string(
				"ANTHROPIC_STATUS_URL",
				"https://status.anthropic.com/api/v2/status.json",
			),
			anthropic_components,
			cursor: string(
				"CURSOR_STATUS_URL",
				"https://status.cursor.com/api/v2/status.json",
			),
			google_aistudio: string(
				"GOOGLE_AISTUDIO_STATUS_URL",
				"https://aistudio.google.com/status",
			),
		},
	})
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> eyre::Result<T>
where
	T: FromStr,
	T::Err: std::error::Error + Send + Sync + 'static,
{
	match lookup(key) {
		None => Ok(default),
		Some(raw) => raw
			.trim()
			.parse()
			.wrap_err_with(|| format!("Invalid value for {key}: {raw:?}")),
	}
}
