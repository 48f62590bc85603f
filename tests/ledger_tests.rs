mod common;

use common::{client, manager_with};
use ride_orders::{
    domain::{ClientId, DomainError},
    engine::{Ledger, errors::EngineError},
};
use rust_decimal::{Decimal, dec};

#[test]
fn credit_adds_to_balance() {
    let ledger = Ledger::new();
    ledger.register(client(1, dec!(20))).unwrap();

    assert_eq!(ledger.credit(1.into(), dec!(2.5)).unwrap(), dec!(22.5));
    assert_eq!(ledger.balance_of(1.into()).unwrap(), dec!(22.5));
}

#[test]
fn negative_credit_is_rejected() {
    let ledger = Ledger::new();
    ledger.register(client(1, dec!(20))).unwrap();

    assert_eq!(
        ledger.credit(1.into(), dec!(-1)),
        Err(EngineError::Domain(DomainError::InvalidAmount))
    );
    assert_eq!(ledger.balance_of(1.into()).unwrap(), dec!(20));
}

#[test]
fn debit_of_exact_balance_leaves_zero() {
    let ledger = Ledger::new();
    ledger.register(client(1, dec!(20))).unwrap();

    assert_eq!(ledger.debit(1.into(), dec!(20)).unwrap(), dec!(0));
}

#[test]
fn debit_exceeding_balance_fails_and_keeps_balance() {
    let ledger = Ledger::new();
    ledger.register(client(1, dec!(20))).unwrap();

    assert_eq!(
        ledger.debit(1.into(), dec!(20.01)),
        Err(EngineError::Domain(DomainError::InsufficientBalance))
    );
    assert_eq!(ledger.balance_of(1.into()).unwrap(), dec!(20));
}

#[test]
fn unknown_client_is_reported() {
    let ledger = Ledger::new();

    assert_eq!(
        ledger.balance_of(7.into()),
        Err(EngineError::ClientNotFound(ClientId::from(7)))
    );
    assert_eq!(
        ledger.credit(7.into(), dec!(1)),
        Err(EngineError::ClientNotFound(ClientId::from(7)))
    );
    assert_eq!(
        ledger.debit(7.into(), dec!(1)),
        Err(EngineError::ClientNotFound(ClientId::from(7)))
    );
}

#[test]
fn negative_opening_balance_is_rejected() {
    let ledger = Ledger::new();

    assert_eq!(
        ledger.register(client(1, dec!(-5))),
        Err(EngineError::Domain(DomainError::InvalidAmount))
    );
    assert!(!ledger.contains(1.into()));
}

#[test]
fn re_registering_keeps_balance_and_active_flag() {
    let manager = manager_with(&[(1, dec!(20))]);
    manager
        .create_order(common::identity(1), common::trip(dec!(10), true))
        .unwrap();

    let mut updated = client(1, dec!(500));
    updated.phone_number = "+380679999999".to_string();
    manager.register_client(updated).unwrap();

    let stored = manager.ledger().client(1.into()).unwrap();
    assert_eq!(stored.phone_number, "+380679999999");
    assert_eq!(stored.account.bonus(), dec!(10));
    assert!(stored.account.has_active_order);
}

#[test]
fn clients_snapshot_is_sorted_by_id() {
    let manager = manager_with(&[(3, dec!(0)), (1, dec!(0)), (2, dec!(0))]);

    let ids: Vec<u64> = manager
        .ledger()
        .clients()
        .iter()
        .map(|c| c.id().into())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn credit_past_the_decimal_range_fails_and_keeps_balance() {
    let ledger = Ledger::new();
    ledger.register(client(1, Decimal::MAX)).unwrap();

    assert_eq!(
        ledger.credit(1.into(), dec!(1)),
        Err(EngineError::Domain(DomainError::AmountOverflow))
    );
    assert_eq!(ledger.balance_of(1.into()).unwrap(), Decimal::MAX);
}
