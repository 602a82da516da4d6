//! HTTP and WebSocket surface.

use std::sync::Arc;

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::get,
	Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
	config::Config,
	error::UnknownServiceError,
	publisher::Publisher,
	status::{AggregateSnapshot, ServiceSnapshot},
};

mod subscribe;

#[derive(Clone)]
pub struct AppState {
	pub publisher: Arc<Publisher>,
	pub config: Arc<Config>,
}

impl AppState {
	/// The requested refresh interval, or the default when none was given.
	fn refresh_interval(&self, requested: Option<u64>) -> Result<u64, ApiError> {
		let bounds = self.config.refresh;
		match requested {
			None => Ok(bounds.default),
			Some(seconds) if bounds.contains(seconds) => Ok(seconds),
			Some(seconds) => Err(ApiError::InvalidRefreshInterval {
				requested: seconds,
				min: bounds.min,
				max: bounds.max,
			}),
		}
	}
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/status", get(all_statuses))
		.route("/status/:service_name", get(one_status))
		.route("/subscribe/status", get(subscribe::status))
		.route("/subscribe/ping", get(subscribe::ping))
		.with_state(state)
}

#[derive(Deserialize, Debug)]
pub(crate) struct RefreshQuery {
	refresh_interval: Option<u64>,
}

#[derive(Debug)]
pub(crate) enum ApiError {
	UnknownService(UnknownServiceError),
	InvalidRefreshInterval { requested: u64, min: u64, max: u64 },
}

#[derive(Serialize)]
struct ErrorBody {
	detail: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	available_services: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let (status, body) = match self {
			Self::UnknownService(e) => (
				StatusCode::NOT_FOUND,
				ErrorBody {
					detail: format!(
						"Service '{}' not found. Available services: {}",
						e.requested,
						e.available.join(", ")
					),
					available_services: Some(e.available),
				},
			),
			Self::InvalidRefreshInterval {
				requested,
				min,
				max,
			} => (
				StatusCode::UNPROCESSABLE_ENTITY,
				ErrorBody {
					detail: format!(
						"refresh_interval must be between {min} and {max} seconds, got {requested}"
					),
					available_services: None,
				},
			),
		};
		(status, Json(body)).into_response()
	}
}

impl From<UnknownServiceError> for ApiError {
	fn from(e: UnknownServiceError) -> Self {
		Self::UnknownService(e)
	}
}

#[derive(Serialize)]
struct Health<'a> {
	status: &'static str,
	service: &'a str,
}

async fn health(State(state): State<AppState>) -> Response {
	Json(Health {
		status: "healthy",
		service: &state.config.app_name,
	})
	.into_response()
}

#[instrument(skip(state))]
async fn all_statuses(
	State(state): State<AppState>,
	Query(query): Query<RefreshQuery>,
) -> Result<Json<AggregateSnapshot>, ApiError> {
	let refresh_interval = state.refresh_interval(query.refresh_interval)?;
	let snapshot = state.publisher.snapshot(refresh_interval).await;
	info!(services = snapshot.services.len(), "Served aggregate status");
	Ok(Json(snapshot))
}

#[instrument(skip(state))]
async fn one_status(
	State(state): State<AppState>,
	Path(service_name): Path<String>,
) -> Result<Json<ServiceSnapshot>, ApiError> {
	Ok(Json(state.publisher.service(&service_name).await?))
}
