//! Fixtures shared by the unit tests.

use std::time::Duration;

use axum::Router;

use crate::upstream::{self, Client};

pub const MAX_ATTEMPTS: u32 = 3;

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: Router) -> String {
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
		.await
		.expect("bind listener");
	let addr = listener.local_addr().expect("local addr");
	tokio::spawn(async move { axum::serve(listener, router).await.expect("serve fake upstream") });
	format!("http://{addr}")
}

pub fn config() -> crate::config::Config {
	let mut config = crate::config::from_lookup(|_| None).expect("default config");
	config.request_timeout = Duration::from_millis(200);
	config.max_retries = MAX_ATTEMPTS;
	config.retry_base_delay = Duration::from_millis(10);
	config
}

pub fn client() -> Client {
	upstream::new(&config()).expect("upstream client")
}
