use std::sync::Arc;

use color_eyre::eyre;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use statuspage_aggregator::{
	aggregator::Aggregator,
	api,
	config::{self, PushMode},
	logging,
	publisher::Publisher,
	source, upstream,
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
	color_eyre::install()?;
	logging::init();

	let config = config::new()?;
	let client = upstream::new(&config)?;
	let publisher = Arc::new(Publisher::new(Aggregator::new(
		source::from_config(&config.sources),
		client,
	)));
	let shutdown = CancellationToken::new();

	if config.push_mode == PushMode::Shared {
		let publisher = publisher.clone();
		let refresh_interval = config.refresh.default;
		let shutdown = shutdown.clone();
		tokio::spawn(async move { publisher.broadcast_loop(refresh_interval, shutdown).await });
	}

	let addr = format!("{}:{}", config.host, config.port);
	let listener = tokio::net::TcpListener::bind(&addr).await?;
	info!(
		%addr,
		app_name = %config.app_name,
		sources = ?publisher.service_names(),
		push_mode = ?config.push_mode,
		"Serving status"
	);

	let state = api::AppState {
		publisher,
		config: Arc::new(config),
	};
	axum::serve(listener, api::router(state))
		.with_graceful_shutdown(shutdown_signal(shutdown))
		.await?;
	info!("Shut down cleanly");
	Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			error!(?e, "Failed to listen for Ctrl-C");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			},
			Err(e) => {
				error!(?e, "Failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			},
		}
	};
	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => {},
		() = terminate => {},
	}
	info!("Shutdown signal received");
	shutdown.cancel();
}
