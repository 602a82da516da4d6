use axum::{
	extract::{
		ws::{Message, WebSocket, WebSocketUpgrade},
		Query, State,
	},
	response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info_span, Instrument};

use super::{ApiError, AppState, RefreshQuery};
use crate::{config::PushMode, publisher::Subscription};

pub(super) async fn status(
	ws: WebSocketUpgrade,
	State(state): State<AppState>,
	Query(query): Query<RefreshQuery>,
) -> Result<Response, ApiError> {
	let refresh_interval = state.refresh_interval(query.refresh_interval)?;
	Ok(ws.on_upgrade(move |socket| stream_status(socket, state, refresh_interval)))
}

/// Registers the socket as a subscriber and pumps its queue into the socket
/// until either side goes away.
async fn stream_status(socket: WebSocket, state: AppState, refresh_interval: u64) {
	let Subscription {
		id,
		mut messages,
		cancel,
	} = state.publisher.subscribe().await;
	let span = info_span!("subscriber", %id);

	let publisher = state.publisher.clone();
	match state.config.push_mode {
		PushMode::PerSubscriber => {
			let cancel = cancel.clone();
			tokio::spawn(
				async move { publisher.push_loop(id, refresh_interval, cancel).await }
					.instrument(span.clone()),
			);
		},
		PushMode::Shared => {
			// Greet at the interval the broadcast loop runs at.
			let shared_interval = state.config.refresh.default;
			tokio::spawn(
				async move {
					if let Err(e) = publisher.push_once(id, shared_interval).await {
						debug!(error = %e, "Could not greet subscriber");
					}
				}
				.instrument(span.clone()),
			);
		},
	}

	let (mut sink, mut stream) = socket.split();
	let writer = async {
		while let Some(message) = messages.recv().await {
			let text = match serde_json::to_string(&message) {
				Ok(text) => text,
				Err(e) => {
					error!(error = %e, "Could not serialize push message");
					continue;
				},
			};
			if let Err(e) = sink.send(Message::Text(text)).await {
				debug!(error = %e, "Socket write failed");
				break;
			}
		}
	};
	let reader = async {
		while let Some(Ok(message)) = stream.next().await {
			if let Message::Close(_) = message {
				break;
			}
		}
	};

	async {
		tokio::select! {
			() = writer => {},
			() = reader => {},
			() = cancel.cancelled() => {},
		}
		state.publisher.unsubscribe(id).await;
	}
	.instrument(span)
	.await;
}

pub(super) async fn ping(ws: WebSocketUpgrade) -> Response {
	ws.on_upgrade(echo)
}

async fn echo(mut socket: WebSocket) {
	while let Some(Ok(message)) = socket.recv().await {
		let reply = match message {
			Message::Text(text) if text == "ping" => "pong".to_owned(),
			Message::Text(text) => format!("echo: {text}"),
			Message::Close(_) => break,
			_ => continue,
		};
		if socket.send(Message::Text(reply)).await.is_err() {
			break;
		}
	}
	debug!("Ping client disconnected");
}
