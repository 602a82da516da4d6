use std::io::IsTerminal;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Compact lines on a terminal, flattened JSON everywhere else. `RUST_LOG`
/// picks the verbosity, `info` by default.
pub fn init() {
	use tracing_subscriber::fmt as layer_fmt;
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	let (plain_log_format, json_log_format) = if std::io::stdout().is_terminal() {
		(Some(layer_fmt::layer().compact()), None)
	} else {
		(
			None,
			Some(
				layer_fmt::layer()
					.json()
					.flatten_event(true)
					.with_current_span(true),
			),
		)
	};
	Registry::default()
		.with(filter)
		.with(plain_log_format)
		.with(json_log_format)
		.init();
}
