//! Product catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ProductId;
use store::{NewProduct, PopularProduct, Product, Store};

use super::orders::AppState;
use crate::error::ApiError;

/// Number of entries returned by the best-seller report.
const POPULAR_LIMIT: usize = 10;

fn validate(product: &NewProduct) -> Result<(), ApiError> {
    if product.name.trim().is_empty() {
        return Err(ApiError::BadRequest("product name is required".to_string()));
    }
    if product.price.is_negative() {
        return Err(ApiError::BadRequest("price must not be negative".to_string()));
    }
    if product.stock < 0 {
        return Err(ApiError::BadRequest("stock must not be negative".to_string()));
    }
    Ok(())
}

/// GET /products
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.store.list_products().await?))
}

/// POST /products
#[tracing::instrument(skip_all)]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let Json(req) = payload?;
    validate(&req)?;
    let product = state.store.create_product(req).await?;
    tracing::info!(product_id = %product.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /products/popular: best sellers by quantity ordered.
#[tracing::instrument(skip(state))]
pub async fn popular<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<PopularProduct>>, ApiError> {
    Ok(Json(state.store.popular_products(POPULAR_LIMIT).await?))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<Product>, ApiError> {
    state
        .store
        .get_product(ProductId::new(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Product {id} not found")))
}

/// PUT /products/{id}: replace name, price and stock.
#[tracing::instrument(skip(state, payload))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> Result<Json<Product>, ApiError> {
    let Json(req) = payload?;
    validate(&req)?;
    state
        .store
        .update_product(ProductId::new(id), req)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Product {id} not found")))
}

/// DELETE /products/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete_product(ProductId::new(id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Product {id} not found")))
    }
}
