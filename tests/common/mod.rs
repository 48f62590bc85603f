use ride_orders::{
    domain::{Client, ClientId, ClientIdentity, NewOrder, Order, Route, User},
    engine::{LifecycleManager, OrderStore},
};
use rust_decimal::Decimal;

pub fn client(id: u64, bonus: Decimal) -> Client {
    let user = User {
        id: ClientId::from(id),
        email: format!("client{id}@example.com"),
        name: format!("Client {id}"),
    };
    Client::new(user, "+380501234567", bonus)
}

/// Default policy, with each `(id, bonus)` registered.
pub fn manager_with(clients: &[(u64, Decimal)]) -> LifecycleManager {
    let manager = LifecycleManager::default();
    for &(id, bonus) in clients {
        manager
            .register_client(client(id, bonus))
            .expect("register client");
    }
    manager
}

pub fn identity(id: u64) -> ClientIdentity {
    ClientIdentity::from(ClientId::from(id))
}

pub fn trip(price: Decimal, pay_with_bonuses: bool) -> NewOrder {
    NewOrder::new(price, pay_with_bonuses, Route::new("Khreshchatyk 1", "Boryspil airport"))
}

/// Creates and finishes a trip, so the client counts as returning.
#[allow(dead_code)]
pub fn finished_trip(manager: &LifecycleManager, id: u64, price: Decimal) -> Order {
    let order = manager
        .create_order(identity(id), trip(price, false))
        .expect("create order");
    manager.finish_order(order.id).expect("finish order")
}

#[allow(dead_code)]
pub fn balance(manager: &LifecycleManager, id: u64) -> Decimal {
    manager
        .ledger()
        .balance_of(ClientId::from(id))
        .expect("known client")
}

/// The single-active-order rule and its cached flag, checked for one client.
#[allow(dead_code)]
pub fn assert_active_invariant(manager: &LifecycleManager, id: u64) {
    let client_id = ClientId::from(id);
    let active = manager
        .orders()
        .list()
        .into_iter()
        .filter(|o| o.client_id == client_id && o.is_active())
        .count();
    assert!(active <= 1, "client {id} has {active} active orders");
    assert_eq!(
        manager.ledger().has_active_order(client_id).expect("known client"),
        active == 1,
        "cached active flag disagrees with the order store for client {id}"
    );
}
