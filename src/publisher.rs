//! One-shot snapshots for request/response callers, and the push loops that
//! keep subscribers up to date.

use std::{collections::HashMap, time::Duration};

use futures::future::join_all;
use tokio::sync::{
	mpsc::{self, error::SendTimeoutError},
	RwLock,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
	aggregator::Aggregator,
	error::{DeliveryError, PollError, UnknownServiceError},
	status::{AggregateSnapshot, PushMessage, ServiceSnapshot},
};

/// Messages a subscriber may have queued before it counts as stalled.
const OUTBOX_CAPACITY: usize = 4;
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);
/// Upper bound on the pause after a failed poll.
const ERROR_RETRY_CEILING: Duration = Duration::from_secs(10);

struct Subscriber {
	outbox: mpsc::Sender<PushMessage>,
	cancel: CancellationToken,
}

/// The receiving end handed to whoever owns the subscriber's transport.
pub struct Subscription {
	pub id: Uuid,
	pub messages: mpsc::Receiver<PushMessage>,
	/// Cancelled once the subscriber is removed, for whatever reason.
	pub cancel: CancellationToken,
}

/// Active subscribers, keyed by id.
#[derive(Default)]
pub struct Subscribers {
	inner: RwLock<HashMap<Uuid, Subscriber>>,
}

impl Subscribers {
	async fn insert(&self) -> Subscription {
		let (outbox, messages) = mpsc::channel(OUTBOX_CAPACITY);
		let cancel = CancellationToken::new();
		let id = Uuid::new_v4();

		let mut subscribers = self.inner.write().await;
		subscribers.insert(
			id,
			Subscriber {
				outbox,
				cancel: cancel.clone(),
			},
		);
		info!(%id, total = subscribers.len(), "Subscriber connected");
		Subscription {
			id,
			messages,
			cancel,
		}
	}

	/// Drops the subscriber and cancels anything running on its behalf.
	/// Returns whether it was still registered.
	pub async fn remove(&self, id: Uuid) -> bool {
		let mut subscribers = self.inner.write().await;
		let Some(subscriber) = subscribers.remove(&id) else {
			return false;
		};
		subscriber.cancel.cancel();
		info!(%id, total = subscribers.len(), "Subscriber disconnected");
		true
	}

	pub async fn contains(&self, id: Uuid) -> bool {
		self.inner.read().await.contains_key(&id)
	}

	pub async fn len(&self) -> usize {
		self.inner.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.inner.read().await.is_empty()
	}

	async fn ids(&self) -> Vec<Uuid> {
		self.inner.read().await.keys().copied().collect()
	}

	async fn deliver(
		&self,
		id: Uuid,
		message: PushMessage,
		timeout: Duration,
	) -> Result<(), DeliveryError> {
		// Clone the sender so the registry is not locked while we wait.
		let outbox = self
			.inner
			.read()
			.await
			.get(&id)
			.map(|subscriber| subscriber.outbox.clone())
			.ok_or(DeliveryError::Closed(id))?;

		outbox
			.send_timeout(message, timeout)
			.await
			.map_err(|e| match e {
				SendTimeoutError::Closed(_) => DeliveryError::Closed(id),
				SendTimeoutError::Timeout(_) => DeliveryError::TimedOut(id),
			})
	}
}

/// How long to wait after a failed poll before trying again.
fn error_pause(interval: Duration) -> Duration {
	interval.min(ERROR_RETRY_CEILING)
}

pub struct Publisher {
	aggregator: Aggregator,
	subscribers: Subscribers,
	delivery_timeout: Duration,
	/// Polls left that crash before reaching the aggregator.
	#[cfg(test)]
	crashing_polls: std::sync::atomic::AtomicU32,
}

impl Publisher {
	pub fn new(aggregator: Aggregator) -> Self {
		Self {
			aggregator,
			subscribers: Subscribers::default(),
			delivery_timeout: DELIVERY_TIMEOUT,
			#[cfg(test)]
			crashing_polls: std::sync::atomic::AtomicU32::new(0),
		}
	}

	#[must_use]
	pub fn with_delivery_timeout(mut self, delivery_timeout: Duration) -> Self {
		self.delivery_timeout = delivery_timeout;
		self
	}

	pub fn subscribers(&self) -> &Subscribers {
		&self.subscribers
	}

	pub fn service_names(&self) -> Vec<String> {
		self.aggregator.service_names()
	}

	pub async fn snapshot(&self, refresh_interval: u64) -> AggregateSnapshot {
		self.aggregator.poll(refresh_interval).await
	}

	/// # Errors
	///
	/// Returns `UnknownServiceError` if `name` is not a configured source.
	pub async fn service(&self, name: &str) -> Result<ServiceSnapshot, UnknownServiceError> {
		self.aggregator.poll_one(name).await
	}

	pub async fn subscribe(&self) -> Subscription {
		self.subscribers.insert().await
	}

	pub async fn unsubscribe(&self, id: Uuid) -> bool {
		self.subscribers.remove(id).await
	}

	/// Polls on a task of its own, so a crash anywhere in the pipeline
	/// surfaces as an error instead of taking the caller down with it.
	async fn guarded_poll(&self, refresh_interval: u64) -> Result<AggregateSnapshot, PollError> {
		let aggregator = self.aggregator.clone();
		#[cfg(test)]
		let crash = {
			use std::sync::atomic::Ordering;
			self.crashing_polls
				.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
				.is_ok()
		};
		Ok(tokio::spawn(async move {
			#[cfg(test)]
			assert!(!crash, "poll crashed");
			aggregator.poll(refresh_interval).await
		})
		.await?)
	}

	async fn next_message(&self, refresh_interval: u64) -> (PushMessage, Duration) {
		let interval = Duration::from_secs(refresh_interval);
		match self.guarded_poll(refresh_interval).await {
			Ok(snapshot) => (PushMessage::status_update(snapshot), interval),
			Err(e) => {
				error!(error = %e, "Poll failed");
				(
					PushMessage::error("Failed to fetch status data"),
					error_pause(interval),
				)
			},
		}
	}

	/// Polls and delivers to one subscriber, pausing `refresh_interval`
	/// seconds between rounds, until the subscriber goes away.
	pub async fn push_loop(&self, id: Uuid, refresh_interval: u64, cancel: CancellationToken) {
		let span = info_span!("push_loop", %id, refresh_interval);
		async {
			while !cancel.is_cancelled() {
				let (message, pause) = self.next_message(refresh_interval).await;
				if let Err(e) = self
					.subscribers
					.deliver(id, message, self.delivery_timeout)
					.await
				{
					warn!(error = %e, "Delivery failed, dropping subscriber");
					self.subscribers.remove(id).await;
					break;
				}

				tokio::select! {
					() = cancel.cancelled() => break,
					() = tokio::time::sleep(pause) => {},
				}
			}
			debug!("Push loop finished");
		}
		.instrument(span)
		.await;
	}

	/// Polls once and delivers only to `id`. Used to greet subscribers that
	/// otherwise wait on the shared broadcast loop.
	///
	/// # Errors
	///
	/// Returns a `DeliveryError` and drops the subscriber if it cannot take
	/// the message.
	pub async fn push_once(&self, id: Uuid, refresh_interval: u64) -> Result<(), DeliveryError> {
		let (message, _) = self.next_message(refresh_interval).await;
		let delivered = self
			.subscribers
			.deliver(id, message, self.delivery_timeout)
			.await;
		if delivered.is_err() {
			self.subscribers.remove(id).await;
		}
		delivered
	}

	/// Delivers `message` to every current subscriber concurrently. Anyone
	/// who cannot take it is dropped; the rest are unaffected. Returns how
	/// many subscribers got it.
	pub async fn broadcast(&self, message: &PushMessage) -> usize {
		let recipients = self.subscribers.ids().await;
		let results = join_all(recipients.iter().map(|id| {
			self.subscribers
				.deliver(*id, message.clone(), self.delivery_timeout)
		}))
		.await;

		let mut delivered = 0;
		for (id, result) in recipients.into_iter().zip(results) {
			match result {
				Ok(()) => delivered += 1,
				Err(e) => {
					warn!(%id, error = %e, "Broadcast delivery failed, dropping subscriber");
					self.subscribers.remove(id).await;
				},
			}
		}
		delivered
	}

	/// One poll per round, fanned out to every subscriber.
	pub async fn broadcast_loop(&self, refresh_interval: u64, cancel: CancellationToken) {
		let span = info_span!("broadcast_loop", refresh_interval);
		async {
			while !cancel.is_cancelled() {
				let pause = if self.subscribers.is_empty().await {
					Duration::from_secs(refresh_interval)
				} else {
					let (message, pause) = self.next_message(refresh_interval).await;
					let delivered = self.broadcast(&message).await;
					debug!(delivered, "Broadcast round complete");
					pause
				};

				tokio::select! {
					() = cancel.cancelled() => break,
					() = tokio::time::sleep(pause) => {},
				}
			}
			info!("Broadcast loop finished");
		}
		.instrument(span)
		.await;
	}
}
