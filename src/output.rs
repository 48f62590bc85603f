//! Serializes ledger and order snapshots to CSV.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    domain::{ClientId, DriverId, OrderId},
    engine::{Ledger, OrderStore},
};

#[derive(Debug, Serialize)]
struct ClientCsv {
    client: ClientId,
    bonus: Decimal,
    active_order: bool,
}

#[derive(Debug, Serialize)]
struct OrderCsv<'a> {
    order: OrderId,
    hash: &'a str,
    client: ClientId,
    driver: Option<DriverId>,
    price: Decimal,
    bonuses: bool,
    status: String,
    rating: Option<u8>,
}

pub fn print_ledger(ledger: &Ledger, writer: impl std::io::Write) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for client in ledger.clients() {
        wtr.serialize(ClientCsv {
            client: client.id(),
            bonus: client.account.bonus(),
            active_order: client.account.has_active_order,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn print_orders(orders: &impl OrderStore, writer: impl std::io::Write) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for order in orders.list() {
        wtr.serialize(OrderCsv {
            order: order.id,
            hash: order.hash.as_str(),
            client: order.client_id,
            driver: order.driver_id,
            price: order.price,
            bonuses: order.pay_with_bonuses,
            status: order.status.to_string(),
            rating: order.rating.map(|r| r.value()),
        })?;
    }
    wtr.flush()?;
    Ok(())
}
