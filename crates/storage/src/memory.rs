use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{ClientId, OrderId, ProductId, StoreId, Version};
use domain::{
    Client, Order, OrderStatus, OrderWithClient, Product, Storage, StorageError, StorageResult,
    StorageTx, Store,
};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

#[derive(Clone, Default)]
struct Dataset {
    stores: HashMap<StoreId, Store>,
    products: HashMap<ProductId, Product>,
    clients: HashMap<ClientId, Client>,
    orders: HashMap<OrderId, Order>,
}

/// In-memory storage engine for testing and local runs.
///
/// Provides the same interface as the PostgreSQL implementation. A
/// transaction takes the single writer lock for its whole lifetime and
/// mutates a scratch copy of the dataset, so transactions are fully
/// serialized and roll back by discarding the copy.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    data: Arc<RwLock<Dataset>>,
}

impl MemoryStorage {
    /// Creates a new empty in-memory storage engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.data.read().await.orders.len()
    }

    /// Returns the number of stored clients.
    pub async fn client_count(&self) -> usize {
        self.data.read().await.clients.len()
    }

    /// Reads a product directly, outside any transaction.
    pub async fn product(&self, id: ProductId) -> Option<Product> {
        self.data.read().await.products.get(&id).cloned()
    }
}

fn attach_client(data: &Dataset, order: &Order) -> StorageResult<OrderWithClient> {
    let client = data
        .clients
        .get(&order.client_id)
        .cloned()
        .ok_or_else(|| {
            StorageError::Backend(
                format!("client {} missing for order {}", order.client_id, order.id).into(),
            )
        })?;
    Ok(OrderWithClient {
        order: order.clone(),
        client,
    })
}

#[async_trait]
impl Storage for MemoryStorage {
    type Tx = MemoryTx;

    async fn begin(&self) -> StorageResult<MemoryTx> {
        let guard = self.data.clone().write_owned().await;
        let scratch = guard.clone();
        Ok(MemoryTx { guard, scratch })
    }

    async fn find_store(&self, id: StoreId) -> StorageResult<Option<Store>> {
        Ok(self.data.read().await.stores.get(&id).copied())
    }

    async fn list_orders_for_store(
        &self,
        store_id: StoreId,
    ) -> StorageResult<Vec<OrderWithClient>> {
        let data = self.data.read().await;
        let mut records = data
            .orders
            .values()
            .filter(|order| order.store_id == store_id)
            .map(|order| attach_client(&data, order))
            .collect::<StorageResult<Vec<_>>>()?;
        records.sort_by_key(|record| record.order.order_date);
        Ok(records)
    }

    async fn find_order(&self, id: OrderId) -> StorageResult<Option<OrderWithClient>> {
        let data = self.data.read().await;
        data.orders
            .get(&id)
            .map(|order| attach_client(&data, order))
            .transpose()
    }

    async fn find_updatable_order(
        &self,
        id: OrderId,
        store_id: StoreId,
    ) -> StorageResult<Option<Order>> {
        let data = self.data.read().await;
        Ok(data
            .orders
            .get(&id)
            .filter(|order| order.store_id == store_id && order.status != OrderStatus::Cancelled)
            .cloned())
    }

    async fn update_order(&self, order: &Order) -> StorageResult<Version> {
        let mut data = self.data.write().await;
        let stored = data.orders.get_mut(&order.id).ok_or_else(|| {
            StorageError::Backend(format!("order {} vanished during update", order.id).into())
        })?;

        if stored.version != order.version {
            return Err(StorageError::VersionConflict {
                entity: "order",
                id: order.id.to_string(),
            });
        }

        *stored = order.clone();
        stored.version = order.version.next();
        Ok(stored.version)
    }

    async fn insert_store(&self, store: &Store) -> StorageResult<()> {
        let mut data = self.data.write().await;
        if data.stores.contains_key(&store.id) {
            return Err(StorageError::Duplicate {
                entity: "store",
                id: store.id.to_string(),
            });
        }
        data.stores.insert(store.id, *store);
        Ok(())
    }

    async fn insert_product(&self, product: &Product) -> StorageResult<()> {
        let mut data = self.data.write().await;
        if data.products.contains_key(&product.id) {
            return Err(StorageError::Duplicate {
                entity: "product",
                id: product.id.to_string(),
            });
        }
        data.products.insert(product.id, product.clone());
        Ok(())
    }
}

/// Transaction over [`MemoryStorage`].
///
/// Holds the writer lock until resolved; dropping it without a commit
/// discards every write.
pub struct MemoryTx {
    guard: OwnedRwLockWriteGuard<Dataset>,
    scratch: Dataset,
}

#[async_trait]
impl StorageTx for MemoryTx {
    async fn find_product(&mut self, id: ProductId) -> StorageResult<Option<Product>> {
        Ok(self.scratch.products.get(&id).cloned())
    }

    async fn save_product(&mut self, product: &Product) -> StorageResult<Version> {
        let stored = self.scratch.products.get_mut(&product.id).ok_or_else(|| {
            StorageError::Backend(format!("product {} vanished during save", product.id).into())
        })?;

        if stored.version != product.version {
            return Err(StorageError::VersionConflict {
                entity: "product",
                id: product.id.to_string(),
            });
        }

        *stored = product.clone();
        stored.version = product.version.next();
        Ok(stored.version)
    }

    async fn find_client_by_phone(&mut self, phone: &str) -> StorageResult<Option<Client>> {
        Ok(self
            .scratch
            .clients
            .values()
            .find(|client| client.phone_number == phone)
            .cloned())
    }

    async fn insert_client(&mut self, client: &Client) -> StorageResult<()> {
        let duplicate = self
            .scratch
            .clients
            .values()
            .any(|existing| existing.phone_number == client.phone_number);
        if duplicate {
            return Err(StorageError::Duplicate {
                entity: "client",
                id: client.phone_number.clone(),
            });
        }
        self.scratch.clients.insert(client.id, client.clone());
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> StorageResult<()> {
        if self.scratch.orders.contains_key(&order.id) {
            return Err(StorageError::Duplicate {
                entity: "order",
                id: order.id.to_string(),
            });
        }
        self.scratch.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn commit(self) -> StorageResult<()> {
        let Self { mut guard, scratch } = self;
        *guard = scratch;
        Ok(())
    }

    async fn rollback(self) -> StorageResult<()> {
        // Dropping the guard releases the lock; the scratch copy and every
        // write in it are discarded.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use domain::{Address, LineItem, Money, PaymentMethod};

    use super::*;

    fn test_product(store_id: StoreId, stock: u32) -> Product {
        Product {
            id: ProductId::new(),
            name: "Widget".to_string(),
            price: Money::from_cents(1000),
            stock,
            image: "widget.png".to_string(),
            store_id,
            version: Version::initial(),
        }
    }

    fn test_client(phone: &str) -> Client {
        Client {
            id: ClientId::new(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: None,
            phone_number: phone.to_string(),
            address: Address {
                street: "1 Analytical Way".to_string(),
                city: "London".to_string(),
                state: "London".to_string(),
                zip_code: "N1".to_string(),
            },
        }
    }

    fn test_order(store_id: StoreId, client_id: ClientId) -> Order {
        Order::place(
            store_id,
            client_id,
            PaymentMethod::Cash,
            vec![LineItem {
                product_id: ProductId::new(),
                ordered_quantity: 1,
                unit_price: Money::from_cents(500),
            }],
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn committed_writes_are_visible() {
        let storage = MemoryStorage::new();
        let store_id = StoreId::new();
        storage.insert_store(&Store::new(store_id)).await.unwrap();
        storage
            .insert_product(&test_product(store_id, 10))
            .await
            .unwrap();

        let client = test_client("555-0001");
        let order = test_order(store_id, client.id);
        let order_id = order.id;

        let mut tx = storage.begin().await.unwrap();
        tx.insert_client(&client).await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.commit().await.unwrap();

        let found = storage.find_order(order_id).await.unwrap().unwrap();
        assert_eq!(found.order.id, order_id);
        assert_eq!(found.client.phone_number, "555-0001");
    }

    #[tokio::test]
    async fn rolled_back_writes_are_discarded() {
        let storage = MemoryStorage::new();
        let store_id = StoreId::new();
        let product = test_product(store_id, 10);
        let product_id = product.id;
        storage.insert_product(&product).await.unwrap();

        let mut tx = storage.begin().await.unwrap();
        let mut loaded = tx.find_product(product_id).await.unwrap().unwrap();
        loaded.stock = 0;
        tx.save_product(&loaded).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(storage.product(product_id).await.unwrap().stock, 10);
    }

    #[tokio::test]
    async fn stale_product_save_is_a_version_conflict() {
        let storage = MemoryStorage::new();
        let store_id = StoreId::new();
        let product = test_product(store_id, 10);
        storage.insert_product(&product).await.unwrap();

        let mut tx = storage.begin().await.unwrap();
        tx.save_product(&product).await.unwrap();

        // Second save with the original (now stale) version.
        let result = tx.save_product(&product).await;
        assert!(matches!(
            result,
            Err(StorageError::VersionConflict { entity: "product", .. })
        ));
    }

    #[tokio::test]
    async fn stale_order_update_is_a_version_conflict() {
        let storage = MemoryStorage::new();
        let store_id = StoreId::new();
        let client = test_client("555-0002");
        let mut order = test_order(store_id, client.id);

        let mut tx = storage.begin().await.unwrap();
        tx.insert_client(&client).await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.commit().await.unwrap();

        order.status = OrderStatus::Confirmed;
        let new_version = storage.update_order(&order).await.unwrap();
        assert_eq!(new_version, Version::new(1));

        // The same stale snapshot must now be rejected.
        let result = storage.update_order(&order).await;
        assert!(matches!(
            result,
            Err(StorageError::VersionConflict { entity: "order", .. })
        ));
    }

    #[tokio::test]
    async fn duplicate_phone_number_is_rejected() {
        let storage = MemoryStorage::new();

        let mut tx = storage.begin().await.unwrap();
        tx.insert_client(&test_client("555-0003")).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = storage.begin().await.unwrap();
        let result = tx.insert_client(&test_client("555-0003")).await;
        assert!(matches!(
            result,
            Err(StorageError::Duplicate { entity: "client", .. })
        ));
    }

    #[tokio::test]
    async fn cancelled_orders_are_not_updatable() {
        let storage = MemoryStorage::new();
        let store_id = StoreId::new();
        let client = test_client("555-0004");
        let mut order = test_order(store_id, client.id);
        order.status = OrderStatus::Cancelled;
        let order_id = order.id;

        let mut tx = storage.begin().await.unwrap();
        tx.insert_client(&client).await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.commit().await.unwrap();

        assert!(
            storage
                .find_updatable_order(order_id, store_id)
                .await
                .unwrap()
                .is_none()
        );
        // The plain lookup still sees it.
        assert!(storage.find_order(order_id).await.unwrap().is_some());
    }
}
