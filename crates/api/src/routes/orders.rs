//! Order endpoints plus the store/product replication endpoints.
//!
//! Request and response bodies keep the camelCase field names of the
//! original wire contract; monetary fields are integers in minor units.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{OrderId, ProductId, StoreId};
use domain::{
    Address, Client, ClientDetails, Money, NewOrder, NewProduct, Order, OrderService, OrderStatus,
    OrderWithClient, OrderedLine, PaymentMethod, Product, Storage, Store,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Storage> {
    pub order_service: OrderService<S>,
}

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRequest {
    pub store_id: StoreId,
    pub payment_method: PaymentMethod,
    pub products: Vec<OrderedLineRequest>,
    pub client: ClientRequest,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedLineRequest {
    pub id: ProductId,
    pub ordered_quantity: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub phone_number: String,
    pub address: AddressRequest,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRequest {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub status: OrderStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProductRequest {
    pub id: ProductId,
    pub name: String,
    pub price: i64,
    pub stock: u32,
    pub image: String,
    pub store_id: StoreId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStoreRequest {
    pub id: StoreId,
}

/// The store scope callers must supply on the scoped order endpoints,
/// e.g. `?storeId=...`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreScope {
    pub store_id: StoreId,
}

impl NewOrderRequest {
    fn into_new_order(self) -> NewOrder {
        NewOrder {
            store_id: self.store_id,
            payment_method: self.payment_method,
            products: self
                .products
                .into_iter()
                .map(|line| OrderedLine {
                    id: line.id,
                    ordered_quantity: line.ordered_quantity,
                })
                .collect(),
            client: ClientDetails {
                first_name: self.client.first_name,
                last_name: self.client.last_name,
                email: self.client.email,
                phone_number: self.client.phone_number,
                address: Address {
                    street: self.client.address.street,
                    city: self.client.address.city,
                    state: self.client.address.state,
                    zip_code: self.client.address.zip_code,
                },
            },
        }
    }
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub order_date: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub total_price: i64,
    pub store_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientResponse>,
    pub products: Vec<LineItemResponse>,
    pub version: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemResponse {
    pub product_id: String,
    pub ordered_quantity: u32,
    pub unit_price: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientResponse {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub phone_number: String,
    pub address: AddressResponse,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressResponse {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub stock: u32,
    pub image: String,
    pub store_id: String,
    pub version: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreResponse {
    pub id: String,
}

impl OrderResponse {
    fn from_order(order: Order, client: Option<Client>) -> Self {
        Self {
            id: order.id.to_string(),
            order_date: order.order_date.to_rfc3339(),
            status: order.status,
            payment_method: order.payment_method,
            total_price: order.total_price.cents(),
            store_id: order.store_id.to_string(),
            client: client.map(ClientResponse::from_client),
            products: order
                .items
                .into_iter()
                .map(|item| LineItemResponse {
                    product_id: item.product_id.to_string(),
                    ordered_quantity: item.ordered_quantity,
                    unit_price: item.unit_price.cents(),
                })
                .collect(),
            version: order.version.as_i64(),
        }
    }

    fn from_record(record: OrderWithClient) -> Self {
        Self::from_order(record.order, Some(record.client))
    }
}

impl ClientResponse {
    fn from_client(client: Client) -> Self {
        Self {
            id: client.id.to_string(),
            first_name: client.first_name,
            last_name: client.last_name,
            email: client.email,
            phone_number: client.phone_number,
            address: AddressResponse {
                street: client.address.street,
                city: client.address.city,
                state: client.address.state,
                zip_code: client.address.zip_code,
            },
        }
    }
}

impl ProductResponse {
    fn from_product(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name,
            price: product.price.cents(),
            stock: product.stock,
            image: product.image,
            store_id: product.store_id.to_string(),
            version: product.version.as_i64(),
        }
    }
}

// -- Handlers --

/// POST /api/orders — create a new order.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<NewOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let record = state.order_service.create_order(req.into_new_order()).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from_record(record))))
}

/// GET /api/orders/:storeId — list a store's orders, clients attached.
#[tracing::instrument(skip(state))]
pub async fn list<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(store_id): Path<Uuid>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let records = state
        .order_service
        .get_orders(StoreId::from_uuid(store_id))
        .await?;

    Ok(Json(
        records.into_iter().map(OrderResponse::from_record).collect(),
    ))
}

/// GET /api/orders/order/:id?storeId=... — fetch one order of a store.
#[tracing::instrument(skip(state))]
pub async fn get<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
    Query(scope): Query<StoreScope>,
) -> Result<Json<OrderResponse>, ApiError> {
    let record = state
        .order_service
        .get_order(OrderId::from_uuid(id), scope.store_id)
        .await?;

    Ok(Json(OrderResponse::from_record(record)))
}

/// PUT /api/orders/:id?storeId=... — apply a status change.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
    Query(scope): Query<StoreScope>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .order_service
        .update_order(OrderId::from_uuid(id), scope.store_id, req.status)
        .await?;

    Ok(Json(OrderResponse::from_order(order, None)))
}

/// POST /api/orders/products — replicate a product record.
#[tracing::instrument(skip(state, req))]
pub async fn create_product<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<NewProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let product = state
        .order_service
        .save_product(NewProduct {
            id: req.id,
            name: req.name,
            price: Money::from_cents(req.price),
            stock: req.stock,
            image: req.image,
            store_id: req.store_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse::from_product(product)),
    ))
}

/// POST /api/orders/stores — replicate a store record.
#[tracing::instrument(skip(state, req))]
pub async fn create_store<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<NewStoreRequest>,
) -> Result<(StatusCode, Json<StoreResponse>), ApiError> {
    let Store { id } = state.order_service.save_store(req.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(StoreResponse { id: id.to_string() }),
    ))
}
