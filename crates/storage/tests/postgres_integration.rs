//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p storage --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use common::{ProductId, StoreId, Version};
use domain::{
    Address, ClientDetails, Money, NewOrder, NewProduct, OrderError, OrderService, OrderStatus,
    OrderedLine, PaymentMethod, Storage, StorageError,
};
use serial_test::serial;
use sqlx::PgPool;
use storage::PostgresStorage;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for the schema
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Apply the schema using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_order_schema.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh storage engine with its own pool and cleared tables
async fn get_test_storage() -> PostgresStorage {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query("TRUNCATE TABLE orders, clients, products, stores")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStorage::new(pool)
}

fn client_details(phone: &str) -> ClientDetails {
    ClientDetails {
        first_name: "Amine".to_string(),
        last_name: "Ben Salah".to_string(),
        email: None,
        phone_number: phone.to_string(),
        address: Address {
            street: "12 Rue de Marseille".to_string(),
            city: "Tunis".to_string(),
            state: "Tunis".to_string(),
            zip_code: "1001".to_string(),
        },
    }
}

async fn seed_store_and_product(
    service: &OrderService<PostgresStorage>,
    stock: u32,
    price_cents: i64,
) -> (StoreId, ProductId) {
    let store_id = StoreId::new();
    service.save_store(store_id).await.unwrap();

    let product_id = ProductId::new();
    service
        .save_product(NewProduct {
            id: product_id,
            name: "Widget".to_string(),
            price: Money::from_cents(price_cents),
            stock,
            image: "widget.png".to_string(),
            store_id,
        })
        .await
        .unwrap();

    (store_id, product_id)
}

fn order_for(store_id: StoreId, product_id: ProductId, quantity: u32, phone: &str) -> NewOrder {
    NewOrder {
        store_id,
        payment_method: PaymentMethod::CreditCard,
        products: vec![OrderedLine {
            id: product_id,
            ordered_quantity: quantity,
        }],
        client: client_details(phone),
    }
}

#[tokio::test]
#[serial]
async fn create_order_persists_and_decrements_stock() {
    let storage = get_test_storage().await;
    let service = OrderService::new(storage.clone());
    let (store_id, product_id) = seed_store_and_product(&service, 100, 12000).await;

    let placed = service
        .create_order(order_for(store_id, product_id, 5, "555-9000"))
        .await
        .unwrap();

    assert_eq!(placed.order.total_price.cents(), 60000);
    assert_eq!(placed.order.status, OrderStatus::Pending);

    // Reload through the store-scoped read path.
    let found = service.get_order(placed.order.id, store_id).await.unwrap();
    assert_eq!(found.order.id, placed.order.id);
    assert_eq!(found.order.items.len(), 1);
    assert_eq!(found.order.items[0].unit_price.cents(), 12000);
    assert_eq!(found.client.phone_number, "555-9000");

    let stock: i64 = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
        .bind(product_id.as_uuid())
        .fetch_one(storage.pool())
        .await
        .unwrap();
    assert_eq!(stock, 95);
}

#[tokio::test]
#[serial]
async fn failed_creation_rolls_back_every_write() {
    let storage = get_test_storage().await;
    let service = OrderService::new(storage.clone());
    let (store_id, plentiful) = seed_store_and_product(&service, 10, 1000).await;

    let depleted = ProductId::new();
    service
        .save_product(NewProduct {
            id: depleted,
            name: "Rare Widget".to_string(),
            price: Money::from_cents(2000),
            stock: 0,
            image: "rare.png".to_string(),
            store_id,
        })
        .await
        .unwrap();

    let err = service
        .create_order(NewOrder {
            store_id,
            payment_method: PaymentMethod::Cash,
            products: vec![
                OrderedLine {
                    id: plentiful,
                    ordered_quantity: 2,
                },
                OrderedLine {
                    id: depleted,
                    ordered_quantity: 1,
                },
            ],
            client: client_details("555-9001"),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InsufficientStock));

    // The first line's decrement and the client insert were rolled back.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients")
        .fetch_one(storage.pool())
        .await
        .unwrap();
    assert_eq!(count, 0);

    let stock: i64 = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
        .bind(plentiful.as_uuid())
        .fetch_one(storage.pool())
        .await
        .unwrap();
    assert_eq!(stock, 10);
}

#[tokio::test]
#[serial]
async fn clients_are_reused_across_orders() {
    let storage = get_test_storage().await;
    let service = OrderService::new(storage.clone());
    let (store_id, product_id) = seed_store_and_product(&service, 100, 1000).await;

    let first = service
        .create_order(order_for(store_id, product_id, 1, "555-9002"))
        .await
        .unwrap();
    let second = service
        .create_order(order_for(store_id, product_id, 1, "555-9002"))
        .await
        .unwrap();
    assert_eq!(first.client.id, second.client.id);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients")
        .fetch_one(storage.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
#[serial]
async fn status_updates_are_version_checked() {
    let storage = get_test_storage().await;
    let service = OrderService::new(storage.clone());
    let (store_id, product_id) = seed_store_and_product(&service, 100, 1000).await;

    let placed = service
        .create_order(order_for(store_id, product_id, 1, "555-9003"))
        .await
        .unwrap();

    let updated = service
        .update_order(placed.order.id, store_id, OrderStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Confirmed);
    assert_eq!(updated.version, Version::new(1));

    // A write carrying the stale initial version must be rejected.
    let mut stale = placed.order.clone();
    stale.status = OrderStatus::Cancelled;
    let err = storage.update_order(&stale).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::VersionConflict { entity: "order", .. }
    ));
}

#[tokio::test]
#[serial]
async fn cancelled_orders_disappear_from_the_update_path() {
    let storage = get_test_storage().await;
    let service = OrderService::new(storage.clone());
    let (store_id, product_id) = seed_store_and_product(&service, 100, 1000).await;

    let placed = service
        .create_order(order_for(store_id, product_id, 1, "555-9004"))
        .await
        .unwrap();
    let order_id = placed.order.id;
    service
        .update_order(order_id, store_id, OrderStatus::Cancelled)
        .await
        .unwrap();

    let err = service
        .update_order(order_id, store_id, OrderStatus::Confirmed)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Order Not Found in Current Store");

    // The plain read path still returns it.
    let found = service.get_order(order_id, store_id).await.unwrap();
    assert_eq!(found.order.status, OrderStatus::Cancelled);
}

#[tokio::test]
#[serial]
async fn listing_joins_client_records() {
    let storage = get_test_storage().await;
    let service = OrderService::new(storage.clone());
    let (store_id, product_id) = seed_store_and_product(&service, 100, 1000).await;

    service
        .create_order(order_for(store_id, product_id, 1, "555-9005"))
        .await
        .unwrap();
    service
        .create_order(order_for(store_id, product_id, 2, "555-9006"))
        .await
        .unwrap();

    let records = service.get_orders(store_id).await.unwrap();
    assert_eq!(records.len(), 2);
    let phones: Vec<_> = records
        .iter()
        .map(|record| record.client.phone_number.as_str())
        .collect();
    assert!(phones.contains(&"555-9005"));
    assert!(phones.contains(&"555-9006"));
}

#[tokio::test]
#[serial]
async fn duplicate_store_insert_maps_to_a_duplicate_error() {
    let storage = get_test_storage().await;
    let service = OrderService::new(storage.clone());
    let store_id = StoreId::new();
    service.save_store(store_id).await.unwrap();

    let err = service.save_store(store_id).await.unwrap_err();
    assert!(matches!(
        err,
        OrderError::Storage(StorageError::Duplicate { entity: "store", .. })
    ));
}
