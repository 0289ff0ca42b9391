//! Product catalog and stock endpoints.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use catalog_store::CatalogStore;
use chrono::{DateTime, Utc};
use inventory::{Actor, InventoryService, ProductDraft, ProductView};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::ApiError;

/// Header naming the acting principal for a mutation.
pub const ACTOR_HEADER: &str = "x-actor";

/// Shared application state accessible from all handlers.
pub struct AppState<S: CatalogStore> {
    pub inventory: InventoryService<S>,
    pub system_actor: Actor,
    /// Cancelled on graceful shutdown; every request works on a child of it.
    pub shutdown: CancellationToken,
}

impl<S: CatalogStore> AppState<S> {
    /// Resolves the acting principal from the request headers.
    fn actor(&self, headers: &HeaderMap) -> Actor {
        headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(Actor::new)
            .unwrap_or_else(|| self.system_actor.clone())
    }

    fn request_token(&self) -> RequestCancellation {
        RequestCancellation::new(&self.shutdown)
    }
}

/// Cancellation scoped to one request.
///
/// The token is cancelled when the server shuts down or when the handler
/// future is dropped, e.g. because the client disconnected.
struct RequestCancellation {
    token: CancellationToken,
    _guard: DropGuard,
}

impl RequestCancellation {
    fn new(parent: &CancellationToken) -> Self {
        let token = parent.child_token();
        let guard = token.clone().drop_guard();
        Self {
            token,
            _guard: guard,
        }
    }
}

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub category_id: i32,
    #[serde(default)]
    pub stock: i32,
    pub price: Decimal,
}

impl From<ProductRequest> for ProductDraft {
    fn from(req: ProductRequest) -> Self {
        ProductDraft {
            name: req.name,
            description: req.description,
            category_id: req.category_id.into(),
            stock: req.stock,
            price: req.price,
        }
    }
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub category_id: i32,
    pub category: Option<String>,
    pub stock: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub created_by: String,
    pub created_date: DateTime<Utc>,
    pub modified_by: Option<String>,
    pub modified_date: Option<DateTime<Utc>>,
}

impl From<ProductView> for ProductResponse {
    fn from(view: ProductView) -> Self {
        Self {
            id: view.id.as_i32(),
            name: view.name,
            description: view.description,
            category_id: view.category_id.as_i32(),
            category: view.category,
            stock: view.stock,
            price: view.price,
            created_by: view.created_by,
            created_date: view.created_date,
            modified_by: view.modified_by,
            modified_date: view.modified_date,
        }
    }
}

fn path_error(rejection: PathRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}

fn json_error(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}

// -- Handlers --

/// GET /api/products — list every product.
#[tracing::instrument(skip(state))]
pub async fn list<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let cancel = state.request_token();
    let products = state.inventory.list(&cancel.token).await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// GET /api/products/{id} — load a single product.
#[tracing::instrument(skip(state))]
pub async fn get<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<ProductResponse>, ApiError> {
    let Path(id) = path.map_err(path_error)?;
    let cancel = state.request_token();
    let product = state.inventory.get_by_id(id.into(), &cancel.token).await?;
    Ok(Json(product.into()))
}

/// POST /api/products — create a batch of products.
#[tracing::instrument(skip(state, headers, body))]
pub async fn create<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    body: Result<Json<Vec<ProductRequest>>, JsonRejection>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let Json(items) = body.map_err(json_error)?;
    let actor = state.actor(&headers);
    let drafts = items.into_iter().map(ProductDraft::from).collect();

    let cancel = state.request_token();
    let created = state.inventory.add(&actor, drafts, &cancel.token).await?;
    Ok(Json(created.into_iter().map(Into::into).collect()))
}

/// PUT /api/products/{id} — replace a product's fields.
#[tracing::instrument(skip(state, headers, body))]
pub async fn update<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    path: Result<Path<i32>, PathRejection>,
    body: Result<Json<ProductRequest>, JsonRejection>,
) -> Result<Json<ProductResponse>, ApiError> {
    let Path(id) = path.map_err(path_error)?;
    let Json(req) = body.map_err(json_error)?;
    let actor = state.actor(&headers);

    let cancel = state.request_token();
    let updated = state
        .inventory
        .update(&actor, id.into(), req.into(), &cancel.token)
        .await?;
    Ok(Json(updated.into()))
}

/// PUT /api/products/decrement-stock/{id}/{quantity} — take units out of stock.
#[tracing::instrument(skip(state, headers))]
pub async fn decrement_stock<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    path: Result<Path<(i32, i32)>, PathRejection>,
) -> Result<Json<ProductResponse>, ApiError> {
    let Path((id, quantity)) = path.map_err(path_error)?;
    let actor = state.actor(&headers);

    let cancel = state.request_token();
    let product = state
        .inventory
        .decrement_stock(&actor, id.into(), quantity, &cancel.token)
        .await?;
    Ok(Json(product.into()))
}

/// PUT /api/products/add-to-stock/{id}/{quantity} — put units back into stock.
#[tracing::instrument(skip(state, headers))]
pub async fn increment_stock<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    path: Result<Path<(i32, i32)>, PathRejection>,
) -> Result<Json<ProductResponse>, ApiError> {
    let Path((id, quantity)) = path.map_err(path_error)?;
    let actor = state.actor(&headers);

    let cancel = state.request_token();
    let product = state
        .inventory
        .increment_stock(&actor, id.into(), quantity, &cancel.token)
        .await?;
    Ok(Json(product.into()))
}

/// DELETE /api/products/{id} — remove a product.
#[tracing::instrument(skip(state))]
pub async fn delete<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path.map_err(path_error)?;
    let cancel = state.request_token();
    state.inventory.delete(id.into(), &cancel.token).await?;
    Ok(StatusCode::NO_CONTENT)
}
