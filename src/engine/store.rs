//! Order persistence.
//!
//! [`OrderStore`] is the seam to whatever durable store backs the orders; the
//! lifecycle manager only relies on this contract. [`InMemoryOrderStore`] is
//! the implementation used by the binary and the tests.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::{
    domain::{ClientId, DriverId, NewOrder, Order, OrderHash, OrderId, OrderStatus, Rating},
    engine::errors::EngineError,
};

pub trait OrderStore: Send + Sync {
    /// Assigns id and hash and persists the order as CREATED.
    /// Fails with `DuplicateActiveOrder` if the client already has a non-terminal order.
    fn create(&self, client_id: ClientId, request: NewOrder) -> Result<Order, EngineError>;
    fn find_by_id(&self, id: OrderId) -> Result<Order, EngineError>;
    fn find_by_hash(&self, hash: &OrderHash) -> Result<Order, EngineError>;
    /// Applies the status change only if the state machine allows it.
    fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, EngineError>;
    /// CREATED -> ACTIVE, recording the driver.
    fn assign_driver(&self, id: OrderId, driver_id: DriverId) -> Result<Order, EngineError>;
    /// Only a FINISHED, not yet rated order accepts a rating.
    fn set_rating(&self, id: OrderId, rating: Rating) -> Result<Order, EngineError>;
    fn list_finished(&self, client_id: ClientId) -> Vec<Order>;
    fn active_order(&self, client_id: ClientId) -> Option<Order>;
    /// Snapshot of all orders, sorted by id.
    fn list(&self) -> Vec<Order>;
}

/// Orders keyed by id, with secondary indexes by hash and by owning client.
///
/// Lock order is always `by_client` before `orders`.
#[derive(Debug)]
pub struct InMemoryOrderStore {
    orders: DashMap<OrderId, Order>,
    by_hash: DashMap<OrderHash, OrderId>,
    by_client: DashMap<ClientId, Vec<OrderId>>,
    next_id: AtomicU64,
}

impl Default for InMemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
            by_hash: DashMap::new(),
            by_client: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn client_orders(&self, client_id: ClientId) -> Vec<Order> {
        let Some(ids) = self.by_client.get(&client_id) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| self.orders.get(id).map(|o| o.clone()))
            .collect()
    }
}

impl OrderStore for InMemoryOrderStore {
    fn create(&self, client_id: ClientId, request: NewOrder) -> Result<Order, EngineError> {
        // The index entry stays locked until the new id is pushed, which makes
        // check-then-insert atomic per client.
        let mut client_orders = self.by_client.entry(client_id).or_default();
        let has_active = client_orders
            .iter()
            .any(|id| self.orders.get(id).is_some_and(|o| o.is_active()));
        if has_active {
            return Err(EngineError::DuplicateActiveOrder(client_id));
        }

        let id = OrderId::from(self.next_id.fetch_add(1, Ordering::Relaxed));
        let order = Order {
            id,
            hash: OrderHash::generate(),
            client_id,
            driver_id: None,
            price: request.price,
            pay_with_bonuses: request.pay_with_bonuses,
            route: request.route,
            passenger: request.passenger,
            status: OrderStatus::Created,
            rating: None,
        };
        self.orders.insert(id, order.clone());
        self.by_hash.insert(order.hash.clone(), id);
        client_orders.push(id);
        Ok(order)
    }

    fn find_by_id(&self, id: OrderId) -> Result<Order, EngineError> {
        self.orders
            .get(&id)
            .map(|o| o.clone())
            .ok_or(EngineError::OrderNotFound)
    }

    fn find_by_hash(&self, hash: &OrderHash) -> Result<Order, EngineError> {
        let id = *self.by_hash.get(hash).ok_or(EngineError::OrderNotFound)?;
        self.find_by_id(id)
    }

    fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, EngineError> {
        let mut order = self.orders.get_mut(&id).ok_or(EngineError::OrderNotFound)?;
        if !order.status.can_transition_to(status) {
            return Err(EngineError::IllegalTransition {
                from: order.status,
                to: status,
            });
        }
        order.status = status;
        Ok(order.clone())
    }

    fn assign_driver(&self, id: OrderId, driver_id: DriverId) -> Result<Order, EngineError> {
        let mut order = self.orders.get_mut(&id).ok_or(EngineError::OrderNotFound)?;
        if order.status != OrderStatus::Created {
            return Err(EngineError::IllegalTransition {
                from: order.status,
                to: OrderStatus::Active,
            });
        }
        order.status = OrderStatus::Active;
        order.driver_id = Some(driver_id);
        Ok(order.clone())
    }

    fn set_rating(&self, id: OrderId, rating: Rating) -> Result<Order, EngineError> {
        let mut order = self.orders.get_mut(&id).ok_or(EngineError::OrderNotFound)?;
        if order.status != OrderStatus::Finished || order.rating.is_some() {
            return Err(EngineError::IllegalTransition {
                from: order.status,
                to: OrderStatus::Finished,
            });
        }
        order.rating = Some(rating);
        Ok(order.clone())
    }

    fn list_finished(&self, client_id: ClientId) -> Vec<Order> {
        self.client_orders(client_id)
            .into_iter()
            .filter(|o| o.status == OrderStatus::Finished)
            .collect()
    }

    fn active_order(&self, client_id: ClientId) -> Option<Order> {
        self.client_orders(client_id)
            .into_iter()
            .find(Order::is_active)
    }

    fn list(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by_key(|o| o.id);
        orders
    }
}
