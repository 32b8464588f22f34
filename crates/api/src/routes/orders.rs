//! Order placement and order read endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OrderId, ProductId};
use domain::{
    OrderPlacementService, PlaceOrder, PlaceOrderLine, TransactionRecorder,
};
use serde::{Deserialize, Serialize};
use store::{OrderDetails, OrderHistoryEntry, Store, TransactionStatus};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub store: S,
    pub placement: OrderPlacementService<S>,
}

impl<S: Store + Clone> AppState<S> {
    /// Builds the state around one store; new orders get `transaction_status`.
    pub fn new(store: S, transaction_status: TransactionStatus) -> Self {
        let placement = OrderPlacementService::with_recorder(
            store.clone(),
            TransactionRecorder::new(transaction_status),
        );
        Self { store, placement }
    }
}

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub user_email: String,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: i64,
    pub quantity: i64,
}

impl From<PlaceOrderRequest> for PlaceOrder {
    fn from(req: PlaceOrderRequest) -> Self {
        let lines = req
            .items
            .into_iter()
            .map(|item| PlaceOrderLine::new(ProductId::new(item.product_id), item.quantity))
            .collect();
        PlaceOrder::new(req.user_email, lines)
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderPlacedResponse {
    pub order_id: OrderId,
}

// -- Handlers --

/// POST /orders/place: place an order atomically.
#[tracing::instrument(skip_all)]
pub async fn place<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderPlacedResponse>), ApiError> {
    let Json(req) = payload?;
    let receipt = state.placement.place_order(req.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(OrderPlacedResponse {
            order_id: receipt.order_id,
        }),
    ))
}

/// GET /orders/{id}: order header, items and payment record.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<OrderDetails>, ApiError> {
    let details = state
        .store
        .get_order(OrderId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;
    Ok(Json(details))
}

/// GET /users/{email}/history: one row per ordered item, newest order first.
#[tracing::instrument(skip(state))]
pub async fn history<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(email): Path<String>,
) -> Result<Json<Vec<OrderHistoryEntry>>, ApiError> {
    Ok(Json(state.store.order_history(&email).await?))
}
