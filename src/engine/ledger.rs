//! Authoritative bonus balances, one entry per client.

use dashmap::DashMap;
use rust_decimal::Decimal;

use crate::{
    domain::{Client, ClientId, DomainError},
    engine::errors::EngineError,
};

/// Every write goes through the client's map entry, so updates for one client
/// are applied one at a time while other clients proceed in parallel.
#[derive(Debug, Default)]
pub struct Ledger(DashMap<ClientId, Client>);

impl Ledger {
    pub fn new() -> Self {
        Self(DashMap::new())
    }

    /// Inserts a client, or replaces the profile of a known one while keeping
    /// its balance and active-order flag.
    pub fn register(&self, client: Client) -> Result<(), EngineError> {
        if client.account.bonus() < Decimal::ZERO {
            return Err(DomainError::InvalidAmount.into());
        }
        self.0
            .entry(client.id())
            .and_modify(|existing| {
                existing.user = client.user.clone();
                existing.phone_number = client.phone_number.clone();
            })
            .or_insert(client);
        Ok(())
    }

    pub fn contains(&self, client_id: ClientId) -> bool {
        self.0.contains_key(&client_id)
    }

    pub fn client(&self, client_id: ClientId) -> Result<Client, EngineError> {
        self.0
            .get(&client_id)
            .map(|c| c.clone())
            .ok_or(EngineError::ClientNotFound(client_id))
    }

    pub fn balance_of(&self, client_id: ClientId) -> Result<Decimal, EngineError> {
        self.0
            .get(&client_id)
            .map(|c| c.account.bonus())
            .ok_or(EngineError::ClientNotFound(client_id))
    }

    pub fn credit(&self, client_id: ClientId, amount: Decimal) -> Result<Decimal, EngineError> {
        let mut client = self
            .0
            .get_mut(&client_id)
            .ok_or(EngineError::ClientNotFound(client_id))?;
        client.account.credit(amount)?;
        Ok(client.account.bonus())
    }

    pub fn debit(&self, client_id: ClientId, amount: Decimal) -> Result<Decimal, EngineError> {
        let mut client = self
            .0
            .get_mut(&client_id)
            .ok_or(EngineError::ClientNotFound(client_id))?;
        client.account.try_debit(amount)?;
        Ok(client.account.bonus())
    }

    pub fn has_active_order(&self, client_id: ClientId) -> Result<bool, EngineError> {
        self.0
            .get(&client_id)
            .map(|c| c.account.has_active_order)
            .ok_or(EngineError::ClientNotFound(client_id))
    }

    pub fn set_active_order(&self, client_id: ClientId, active: bool) -> Result<(), EngineError> {
        let mut client = self
            .0
            .get_mut(&client_id)
            .ok_or(EngineError::ClientNotFound(client_id))?;
        client.account.has_active_order = active;
        Ok(())
    }

    /// Snapshot of all clients, sorted by id.
    pub fn clients(&self) -> Vec<Client> {
        let mut clients: Vec<Client> = self
            .0
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        clients.sort_by_key(Client::id);
        clients
    }
}
