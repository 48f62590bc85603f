//! Order lifecycle manager.
//!
//! Drives orders through CREATED -> ACTIVE -> {FINISHED, CANCELLED} and keeps
//! the bonus ledger in step with every transition. Each operation runs under
//! the owning client's lock: it validates first, then writes the ledger, then
//! the order store, and rolls the ledger write back if the store refuses.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::{
    domain::{
        Client, ClientId, ClientIdentity, Command, DriverId, NewOrder, Order, OrderHash, OrderId,
        OrderStatus, Rating, User,
    },
    engine::errors::EngineError,
    policy::BonusPolicy,
};
pub use ledger::Ledger;
pub use store::{InMemoryOrderStore, OrderStore};

pub mod errors;
mod ledger;
mod store;

/// What a client sees when following an order's status link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderView {
    pub order: Order,
    pub bonus_balance: Decimal,
}

pub struct LifecycleManager<S = InMemoryOrderStore> {
    ledger: Ledger,
    orders: S,
    policy: BonusPolicy,
    /// One exclusive section per client; serializes every unit of work that
    /// touches that client's balance or orders.
    client_locks: DashMap<ClientId, Arc<Mutex<()>>>,
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new(BonusPolicy::default())
    }
}

impl LifecycleManager {
    pub fn new(policy: BonusPolicy) -> Self {
        Self::with_store(InMemoryOrderStore::new(), policy)
    }
}

impl<S: OrderStore> LifecycleManager<S> {
    pub fn with_store(orders: S, policy: BonusPolicy) -> Self {
        Self {
            ledger: Ledger::new(),
            orders,
            policy,
            client_locks: DashMap::new(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn orders(&self) -> &S {
        &self.orders
    }

    /// Lock for a registered client. Unknown ids never get an entry.
    fn client_lock(&self, client_id: ClientId) -> Result<Arc<Mutex<()>>, EngineError> {
        if !self.ledger.contains(client_id) {
            return Err(EngineError::ClientNotFound(client_id));
        }
        Ok(self.client_locks.entry(client_id).or_default().clone())
    }

    pub fn register_client(&self, client: Client) -> Result<(), EngineError> {
        let client_id = client.id();
        let lock = self.client_locks.entry(client_id).or_default().clone();
        let _guard = lock.lock();
        if let Err(e) = self.ledger.register(client) {
            if !self.ledger.contains(client_id) {
                self.client_locks.remove(&client_id);
            }
            return Err(e);
        }
        info!(client = %client_id, "client registered");
        Ok(())
    }

    /// Places a new order for the caller.
    ///
    /// All field problems are reported together. If the order is paid with
    /// bonuses its price is debited in the same unit of work that persists it.
    pub fn create_order(
        &self,
        identity: ClientIdentity,
        request: NewOrder,
    ) -> Result<Order, EngineError> {
        request.validate().map_err(EngineError::Validation)?;

        let client_id = identity.client_id();
        let lock = self.client_lock(client_id)?;
        let _guard = lock.lock();

        if self.ledger.has_active_order(client_id)? || self.orders.active_order(client_id).is_some()
        {
            return Err(EngineError::DuplicateActiveOrder(client_id));
        }

        let debit = if request.pay_with_bonuses {
            request.price
        } else {
            Decimal::ZERO
        };
        self.ledger.debit(client_id, debit)?;

        let order = match self.orders.create(client_id, request) {
            Ok(order) => order,
            Err(e) => {
                self.rollback_debit(client_id, debit);
                return Err(e);
            }
        };
        self.ledger.set_active_order(client_id, true)?;

        info!(
            client = %client_id,
            order = %order.id,
            price = %order.price,
            debited = %debit,
            "order created"
        );
        Ok(order)
    }

    /// CREATED -> ACTIVE once a driver takes the trip.
    pub fn assign_driver(&self, id: OrderId, driver_id: DriverId) -> Result<Order, EngineError> {
        let client_id = self.orders.find_by_id(id)?.client_id;
        let lock = self.client_lock(client_id)?;
        let _guard = lock.lock();

        let order = self.orders.assign_driver(id, driver_id)?;
        info!(order = %id, driver = %driver_id, "driver assigned");
        Ok(order)
    }

    /// Completes the trip and credits the bonus it earned.
    pub fn finish_order(&self, id: OrderId) -> Result<Order, EngineError> {
        let client_id = self.orders.find_by_id(id)?.client_id;
        let lock = self.client_lock(client_id)?;
        let _guard = lock.lock();

        // Re-read under the lock; a concurrent cancel may have won.
        let order = self.orders.find_by_id(id)?;
        check_transition(&order, OrderStatus::Finished)?;

        let finished = self.orders.list_finished(client_id).len();
        let earned = self.policy.bonus_earned(order.price, finished)?;
        let order = self.settle(&order, OrderStatus::Finished, earned)?;

        info!(client = %client_id, order = %id, earned = %earned, "order finished");
        Ok(order)
    }

    /// Cancels the order behind a status link and applies the cancellation refund.
    pub fn cancel_order(
        &self,
        identity: ClientIdentity,
        hash: &OrderHash,
    ) -> Result<Order, EngineError> {
        let client_id = identity.client_id();
        let lock = self.client_lock(client_id)?;
        let _guard = lock.lock();

        let order = self.owned_order(identity, self.orders.find_by_hash(hash)?)?;
        check_transition(&order, OrderStatus::Cancelled)?;

        let finished = self.orders.list_finished(client_id).len();
        let refund = self.policy.cancellation_adjustment(&order, finished)?;
        let order = self.settle(&order, OrderStatus::Cancelled, refund)?;

        info!(client = %client_id, order = %order.id, refund = %refund, "order cancelled");
        Ok(order)
    }

    /// Records a 1-5 rating against a finished trip. Ratings cannot be changed.
    pub fn rate_trip(
        &self,
        identity: ClientIdentity,
        id: OrderId,
        rating: u8,
    ) -> Result<Order, EngineError> {
        let rating = Rating::try_from(rating)?;

        let client_id = identity.client_id();
        let lock = self.client_lock(client_id)?;
        let _guard = lock.lock();

        let order = self.owned_order(identity, self.orders.find_by_id(id)?)?;
        let order = self.orders.set_rating(order.id, rating)?;

        info!(client = %client_id, order = %id, rating = %rating, "trip rated");
        Ok(order)
    }

    pub fn order_status(&self, hash: &OrderHash) -> Result<OrderView, EngineError> {
        let client_id = self.orders.find_by_hash(hash)?.client_id;
        let lock = self.client_lock(client_id)?;
        let _guard = lock.lock();

        let order = self.orders.find_by_hash(hash)?;
        let bonus_balance = self.ledger.balance_of(order.client_id)?;
        Ok(OrderView {
            order,
            bonus_balance,
        })
    }

    /// Moves an order into a terminal status and credits `amount`, both or neither.
    fn settle(
        &self,
        order: &Order,
        target: OrderStatus,
        amount: Decimal,
    ) -> Result<Order, EngineError> {
        let client_id = order.client_id;
        self.ledger.credit(client_id, amount)?;

        let updated = match self.orders.update_status(order.id, target) {
            Ok(updated) => updated,
            Err(e) => {
                if let Err(rollback) = self.ledger.debit(client_id, amount) {
                    error!(
                        client = %client_id,
                        order = %order.id,
                        "failed to roll back credit: {rollback}"
                    );
                }
                return Err(e);
            }
        };
        let still_active = self.orders.active_order(client_id).is_some();
        self.ledger.set_active_order(client_id, still_active)?;
        Ok(updated)
    }

    fn rollback_debit(&self, client_id: ClientId, amount: Decimal) {
        if let Err(e) = self.ledger.credit(client_id, amount) {
            error!(client = %client_id, "failed to roll back debit: {e}");
        }
    }

    /// Orders owned by someone else are reported as missing.
    fn owned_order(&self, identity: ClientIdentity, order: Order) -> Result<Order, EngineError> {
        if order.client_id != identity.client_id() {
            debug!(order = %order.id, "order belongs to another client");
            return Err(EngineError::OrderNotFound);
        }
        Ok(order)
    }

    fn apply_command(&self, command: Command) -> Result<(), EngineError> {
        match command {
            Command::Register { client, bonus } => {
                let user = User {
                    id: client,
                    email: format!("client{client}@example.com"),
                    name: format!("client {client}"),
                };
                self.register_client(Client::new(user, "", bonus))?;
            }
            Command::Create { client, order } => {
                self.create_order(client.into(), order)?;
            }
            Command::Assign { order, driver } => {
                self.assign_driver(order, driver)?;
            }
            Command::Finish { order } => {
                self.finish_order(order)?;
            }
            Command::Cancel { client, order } => {
                let hash = self.orders.find_by_id(order)?.hash;
                self.cancel_order(client.into(), &hash)?;
            }
            Command::Rate {
                client,
                order,
                rating,
            } => {
                self.rate_trip(client.into(), order, rating)?;
            }
        }
        Ok(())
    }

    /// Applies a script of commands in order. Rejected commands are logged and skipped.
    pub fn apply_commands(&self, commands: impl Iterator<Item = Command>) {
        for command in commands {
            if let Err(e) = self.apply_command(command) {
                warn!("Error applying command: {e}");
            }
        }
    }
}

fn check_transition(order: &Order, to: OrderStatus) -> Result<(), EngineError> {
    if !order.status.can_transition_to(to) {
        return Err(EngineError::IllegalTransition {
            from: order.status,
            to,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal::dec;

    use super::*;
    use crate::domain::{OrderHash, Route};

    #[test]
    fn unknown_callers_do_not_get_a_lock_entry() {
        let manager = LifecycleManager::default();
        let hash = OrderHash::from("missing".to_string());

        for id in 100..110u64 {
            let caller = ClientIdentity::from(ClientId::from(id));
            assert_eq!(
                manager.cancel_order(caller, &hash),
                Err(EngineError::ClientNotFound(id.into()))
            );
            assert_eq!(
                manager.rate_trip(caller, OrderId::from(1), 5),
                Err(EngineError::ClientNotFound(id.into()))
            );
            let request = NewOrder::new(dec!(10), false, Route::new("a", "b"));
            assert_eq!(
                manager.create_order(caller, request),
                Err(EngineError::ClientNotFound(id.into()))
            );
        }

        assert!(manager.client_locks.is_empty());
    }

    #[test]
    fn rejected_registration_leaves_no_lock_entry() {
        let manager = LifecycleManager::default();
        let user = User {
            id: ClientId::from(1),
            email: "client1@example.com".to_string(),
            name: "Client 1".to_string(),
        };

        assert!(
            manager
                .register_client(Client::new(user, "+380501234567", dec!(-1)))
                .is_err()
        );
        assert!(manager.client_locks.is_empty());
    }
}
