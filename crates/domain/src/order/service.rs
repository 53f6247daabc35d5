//! The order lifecycle service.

use std::sync::Arc;

use chrono::Utc;
use common::{OrderId, StoreId};

use crate::client::Client;
use crate::error::OrderError;
use crate::product::{NewProduct, Product};
use crate::storage::{Storage, StorageTx, with_transaction};
use crate::store::Store;

use super::{
    LineItem, NewOrder, Order, OrderStatus, OrderWithClient, StatusChange,
    events::{EventPublisher, OrderCreatedEvent, TracingPublisher},
};

/// The order lifecycle manager.
///
/// Validates and fulfils new orders against store inventory, enforces the
/// order status state machine, and scopes every read to a store. All
/// multi-write operations run inside one storage transaction.
pub struct OrderService<S: Storage> {
    storage: S,
    publisher: Arc<dyn EventPublisher>,
}

impl<S: Storage> OrderService<S> {
    /// Creates a service that logs published events.
    pub fn new(storage: S) -> Self {
        Self::with_publisher(storage, Arc::new(TracingPublisher))
    }

    /// Creates a service with an explicit event publisher.
    pub fn with_publisher(storage: S, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { storage, publisher }
    }

    /// Creates an order: reserves stock line by line, snapshots prices,
    /// attaches or lazily creates the client, and persists the order.
    ///
    /// Every stock decrement, the client insert, and the order insert form
    /// one atomic unit; any validation failure rolls all of it back. The
    /// order-created event is published after commit, best effort.
    ///
    /// Returns the persisted order together with its client record.
    #[tracing::instrument(skip(self, new_order), fields(store_id = %new_order.store_id))]
    pub async fn create_order(&self, new_order: NewOrder) -> Result<OrderWithClient, OrderError> {
        let store = self
            .storage
            .find_store(new_order.store_id)
            .await?
            .ok_or(OrderError::StoreNotFound(new_order.store_id))?;

        let record = with_transaction(&self.storage, move |tx| {
            Box::pin(fulfil_order(tx, store, new_order))
        })
        .await?;

        metrics::counter!("orders_created_total").increment(1);
        self.publisher
            .order_created(OrderCreatedEvent::from_order(&record.order))
            .await;

        Ok(record)
    }

    /// Returns all orders of a store, clients attached.
    // TODO: pagination once the storefront order list needs it.
    #[tracing::instrument(skip(self))]
    pub async fn get_orders(&self, store_id: StoreId) -> Result<Vec<OrderWithClient>, OrderError> {
        self.storage
            .find_store(store_id)
            .await?
            .ok_or(OrderError::UnknownStore(store_id))?;

        Ok(self.storage.list_orders_for_store(store_id).await?)
    }

    /// Returns one order of a store.
    ///
    /// A missing order and an order of a different store produce the same
    /// not-found answer; callers cannot tell the two apart.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(
        &self,
        order_id: OrderId,
        store_id: StoreId,
    ) -> Result<OrderWithClient, OrderError> {
        self.storage
            .find_store(store_id)
            .await?
            .ok_or(OrderError::UnknownStore(store_id))?;

        match self.storage.find_order(order_id).await? {
            Some(record) if record.order.store_id == store_id => Ok(record),
            _ => Err(OrderError::OrderNotFound(order_id)),
        }
    }

    /// Applies a status change to an order of the given store.
    ///
    /// The lookup skips cancelled orders, so a cancelled order answers
    /// exactly like a missing one. A same-status request is a no-op that
    /// returns the order unchanged; applied changes are persisted with a
    /// version-checked write.
    #[tracing::instrument(skip(self))]
    pub async fn update_order(
        &self,
        order_id: OrderId,
        store_id: StoreId,
        requested: OrderStatus,
    ) -> Result<Order, OrderError> {
        let mut order = self
            .storage
            .find_updatable_order(order_id, store_id)
            .await?
            .ok_or(OrderError::OrderNotUpdatable)?;

        match order.transition_status(requested)? {
            StatusChange::Applied => {
                order.version = self.storage.update_order(&order).await?;
                metrics::counter!("order_status_updates_total").increment(1);
                Ok(order)
            }
            StatusChange::Unchanged => Ok(order),
        }
    }

    /// Stores a product record replicated from the products service.
    #[tracing::instrument(skip(self, new_product), fields(product_id = %new_product.id))]
    pub async fn save_product(&self, new_product: NewProduct) -> Result<Product, OrderError> {
        let product = Product::replicated(new_product);
        self.storage.insert_product(&product).await?;
        Ok(product)
    }

    /// Stores a store record replicated from the stores service.
    #[tracing::instrument(skip(self))]
    pub async fn save_store(&self, store_id: StoreId) -> Result<Store, OrderError> {
        let store = Store::new(store_id);
        self.storage.insert_store(&store).await?;
        Ok(store)
    }
}

/// Validates each line item in input order, decrementing stock as it goes,
/// then resolves the client and persists the new order. Runs inside one
/// transaction; the caller commits or rolls back.
async fn fulfil_order<T: StorageTx>(
    tx: &mut T,
    store: Store,
    new_order: NewOrder,
) -> Result<OrderWithClient, OrderError> {
    let mut items = Vec::with_capacity(new_order.products.len());

    for line in &new_order.products {
        let mut product = tx
            .find_product(line.id)
            .await?
            .ok_or(OrderError::ProductNotFound(line.id))?;

        if product.store_id != store.id {
            return Err(OrderError::ProductOutsideStore);
        }
        if product.stock < line.ordered_quantity {
            return Err(OrderError::InsufficientStock);
        }

        // Decrement immediately so a later line item for the same product
        // is checked against the remaining stock.
        product.stock -= line.ordered_quantity;
        product.version = tx.save_product(&product).await?;

        items.push(LineItem {
            product_id: product.id,
            ordered_quantity: line.ordered_quantity,
            unit_price: product.price,
        });
    }

    let client = match tx
        .find_client_by_phone(&new_order.client.phone_number)
        .await?
    {
        Some(existing) => existing,
        None => {
            let client = Client::from_details(new_order.client.clone());
            tx.insert_client(&client).await?;
            client
        }
    };

    let order = Order::place(
        store.id,
        client.id,
        new_order.payment_method,
        items,
        Utc::now(),
    );
    tx.insert_order(&order).await?;

    Ok(OrderWithClient { order, client })
}
