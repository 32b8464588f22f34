//! Customer endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use store::{Customer, NewCustomer, Order, Store};

use super::orders::AppState;
use crate::error::ApiError;

/// POST /customers: register a customer. Emails are unique.
#[tracing::instrument(skip_all)]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<NewCustomer>, JsonRejection>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    let Json(req) = payload?;
    if req.name.trim().is_empty() || req.email.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "customer name and email are required".to_string(),
        ));
    }

    let customer = state.store.create_customer(req).await?;
    tracing::info!(customer_id = %customer.id, "customer created");
    Ok((StatusCode::CREATED, Json(customer)))
}

/// GET /customers
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    Ok(Json(state.store.list_customers().await?))
}

/// GET /customers/{email}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(email): Path<String>,
) -> Result<Json<Customer>, ApiError> {
    state
        .store
        .get_customer_by_email(&email)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Customer {email} not found")))
}

/// GET /customers/{email}/orders: order headers, newest first.
#[tracing::instrument(skip(state))]
pub async fn orders<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(email): Path<String>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.store.orders_by_customer_email(&email).await?))
}
