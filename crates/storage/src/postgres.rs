use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ClientId, OrderId, ProductId, StoreId, Version};
use domain::{
    Address, Client, LineItem, Money, Order, OrderStatus, OrderWithClient, PaymentMethod, Product,
    Storage, StorageError, StorageResult, StorageTx, Store,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

/// PostgreSQL-backed storage engine.
///
/// Versioned writes use `UPDATE ... WHERE id = $n AND version = $m`; zero
/// affected rows means the version moved underneath the caller and the
/// write is rejected.
#[derive(Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Creates a new PostgreSQL storage engine.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        tracing::info!("running database migrations");
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

trait SqlxResultExt<T> {
    fn db(self) -> StorageResult<T>;
}

impl<T> SqlxResultExt<T> for Result<T, sqlx::Error> {
    fn db(self) -> StorageResult<T> {
        self.map_err(StorageError::backend)
    }
}

fn insert_err(entity: &'static str, id: String, e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return StorageError::Duplicate { entity, id };
    }
    StorageError::backend(e)
}

fn status_from_str(s: &str) -> StorageResult<OrderStatus> {
    match s {
        "PENDING" => Ok(OrderStatus::Pending),
        "CONFIRMED" => Ok(OrderStatus::Confirmed),
        "CANCELLED" => Ok(OrderStatus::Cancelled),
        other => Err(StorageError::Backend(
            format!("unknown order status {other:?}").into(),
        )),
    }
}

fn payment_from_str(s: &str) -> StorageResult<PaymentMethod> {
    match s {
        "CASH" => Ok(PaymentMethod::Cash),
        "CREDIT_CARD" => Ok(PaymentMethod::CreditCard),
        other => Err(StorageError::Backend(
            format!("unknown payment method {other:?}").into(),
        )),
    }
}

fn row_to_product(row: &PgRow) -> StorageResult<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id").db()?),
        name: row.try_get("name").db()?,
        price: Money::from_cents(row.try_get::<i64, _>("price_cents").db()?),
        stock: row.try_get::<i64, _>("stock").db()? as u32,
        image: row.try_get("image").db()?,
        store_id: StoreId::from_uuid(row.try_get::<Uuid, _>("store_id").db()?),
        version: Version::new(row.try_get("version").db()?),
    })
}

fn row_to_client(row: &PgRow) -> StorageResult<Client> {
    Ok(Client {
        id: ClientId::from_uuid(row.try_get::<Uuid, _>("client_id").db()?),
        first_name: row.try_get("first_name").db()?,
        last_name: row.try_get("last_name").db()?,
        email: row.try_get("email").db()?,
        phone_number: row.try_get("phone_number").db()?,
        address: Address {
            street: row.try_get("street").db()?,
            city: row.try_get("city").db()?,
            state: row.try_get("state").db()?,
            zip_code: row.try_get("zip_code").db()?,
        },
    })
}

fn row_to_order(row: &PgRow) -> StorageResult<Order> {
    let status: String = row.try_get("status").db()?;
    let payment_method: String = row.try_get("payment_method").db()?;
    let items: serde_json::Value = row.try_get("items").db()?;

    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id").db()?),
        order_date: row.try_get::<DateTime<Utc>, _>("order_date").db()?,
        status: status_from_str(&status)?,
        payment_method: payment_from_str(&payment_method)?,
        total_price: Money::from_cents(row.try_get::<i64, _>("total_price_cents").db()?),
        store_id: StoreId::from_uuid(row.try_get::<Uuid, _>("store_id").db()?),
        client_id: ClientId::from_uuid(row.try_get::<Uuid, _>("client_id").db()?),
        items: serde_json::from_value::<Vec<LineItem>>(items)?,
        version: Version::new(row.try_get("version").db()?),
    })
}

fn row_to_order_with_client(row: &PgRow) -> StorageResult<OrderWithClient> {
    Ok(OrderWithClient {
        order: row_to_order(row)?,
        client: row_to_client(row)?,
    })
}

const ORDER_WITH_CLIENT_SELECT: &str = r#"
    SELECT o.id, o.order_date, o.status, o.payment_method, o.total_price_cents,
           o.store_id, o.client_id, o.items, o.version,
           c.first_name, c.last_name, c.email, c.phone_number,
           c.street, c.city, c.state, c.zip_code
    FROM orders o
    JOIN clients c ON c.id = o.client_id
"#;

#[async_trait]
impl Storage for PostgresStorage {
    type Tx = PostgresTx;

    async fn begin(&self) -> StorageResult<PostgresTx> {
        let tx = self.pool.begin().await.db()?;
        Ok(PostgresTx { tx })
    }

    async fn find_store(&self, id: StoreId) -> StorageResult<Option<Store>> {
        let row = sqlx::query("SELECT id FROM stores WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .db()?;

        row.map(|r| {
            Ok(Store::new(StoreId::from_uuid(
                r.try_get::<Uuid, _>("id").db()?,
            )))
        })
        .transpose()
    }

    async fn list_orders_for_store(
        &self,
        store_id: StoreId,
    ) -> StorageResult<Vec<OrderWithClient>> {
        let sql = format!("{ORDER_WITH_CLIENT_SELECT} WHERE o.store_id = $1 ORDER BY o.order_date ASC");
        let rows = sqlx::query(&sql)
            .bind(store_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .db()?;

        rows.iter().map(row_to_order_with_client).collect()
    }

    async fn find_order(&self, id: OrderId) -> StorageResult<Option<OrderWithClient>> {
        let sql = format!("{ORDER_WITH_CLIENT_SELECT} WHERE o.id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .db()?;

        row.as_ref().map(row_to_order_with_client).transpose()
    }

    async fn find_updatable_order(
        &self,
        id: OrderId,
        store_id: StoreId,
    ) -> StorageResult<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, order_date, status, payment_method, total_price_cents,
                   store_id, client_id, items, version
            FROM orders
            WHERE id = $1 AND store_id = $2 AND status <> $3
            "#,
        )
        .bind(id.as_uuid())
        .bind(store_id.as_uuid())
        .bind(OrderStatus::Cancelled.as_str())
        .fetch_optional(&self.pool)
        .await
        .db()?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn update_order(&self, order: &Order) -> StorageResult<Version> {
        let result = sqlx::query(
            "UPDATE orders SET status = $1, version = version + 1 WHERE id = $2 AND version = $3",
        )
        .bind(order.status.as_str())
        .bind(order.id.as_uuid())
        .bind(order.version.as_i64())
        .execute(&self.pool)
        .await
        .db()?;

        if result.rows_affected() == 0 {
            return Err(StorageError::VersionConflict {
                entity: "order",
                id: order.id.to_string(),
            });
        }
        Ok(order.version.next())
    }

    async fn insert_store(&self, store: &Store) -> StorageResult<()> {
        sqlx::query("INSERT INTO stores (id) VALUES ($1)")
            .bind(store.id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| insert_err("store", store.id.to_string(), e))?;
        Ok(())
    }

    async fn insert_product(&self, product: &Product) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, stock, image, store_id, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(i64::from(product.stock))
        .bind(&product.image)
        .bind(product.store_id.as_uuid())
        .bind(product.version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| insert_err("product", product.id.to_string(), e))?;
        Ok(())
    }
}

/// Transaction over [`PostgresStorage`].
///
/// Wraps a database transaction; dropping it unresolved rolls back.
pub struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StorageTx for PostgresTx {
    async fn find_product(&mut self, id: ProductId) -> StorageResult<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, price_cents, stock, image, store_id, version FROM products WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .db()?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn save_product(&mut self, product: &Product) -> StorageResult<Version> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $1, price_cents = $2, stock = $3, image = $4, version = version + 1
            WHERE id = $5 AND version = $6
            "#,
        )
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(i64::from(product.stock))
        .bind(&product.image)
        .bind(product.id.as_uuid())
        .bind(product.version.as_i64())
        .execute(&mut *self.tx)
        .await
        .db()?;

        if result.rows_affected() == 0 {
            return Err(StorageError::VersionConflict {
                entity: "product",
                id: product.id.to_string(),
            });
        }
        Ok(product.version.next())
    }

    async fn find_client_by_phone(&mut self, phone: &str) -> StorageResult<Option<Client>> {
        let row = sqlx::query(
            r#"
            SELECT id AS client_id, first_name, last_name, email, phone_number,
                   street, city, state, zip_code
            FROM clients
            WHERE phone_number = $1
            "#,
        )
        .bind(phone)
        .fetch_optional(&mut *self.tx)
        .await
        .db()?;

        row.as_ref().map(row_to_client).transpose()
    }

    async fn insert_client(&mut self, client: &Client) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO clients (id, first_name, last_name, email, phone_number,
                                 street, city, state, zip_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(client.id.as_uuid())
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(&client.email)
        .bind(&client.phone_number)
        .bind(&client.address.street)
        .bind(&client.address.city)
        .bind(&client.address.state)
        .bind(&client.address.zip_code)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| insert_err("client", client.phone_number.clone(), e))?;
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> StorageResult<()> {
        let items = serde_json::to_value(&order.items)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, order_date, status, payment_method, total_price_cents,
                                store_id, client_id, items, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.order_date)
        .bind(order.status.as_str())
        .bind(order.payment_method.as_str())
        .bind(order.total_price.cents())
        .bind(order.store_id.as_uuid())
        .bind(order.client_id.as_uuid())
        .bind(items)
        .bind(order.version.as_i64())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| insert_err("order", order.id.to_string(), e))?;
        Ok(())
    }

    async fn commit(self) -> StorageResult<()> {
        self.tx.commit().await.db()
    }

    async fn rollback(self) -> StorageResult<()> {
        self.tx.rollback().await.db()
    }
}
