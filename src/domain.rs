//! Core domain types: clients, bonus accounts, orders and the order state machine.

use std::fmt;

use derive_more::{Display, From, Into};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid7::uuid7;

/// Newtype wrapper for client identifiers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    From,
    Into,
    Display,
)]
pub struct ClientId(u64);

/// Newtype wrapper for order identifiers, assigned by the order store.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    From,
    Into,
    Display,
)]
pub struct OrderId(u64);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    From,
    Into,
    Display,
)]
pub struct DriverId(u64);

/// Opaque per-order token used in client-facing links instead of the numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, From, Display)]
pub struct OrderHash(String);

impl OrderHash {
    /// Hex sha256 of a fresh uuid7, so consecutive orders do not produce guessable tokens.
    pub fn generate() -> Self {
        Self(sha256::digest(uuid7().to_string()))
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The authenticated caller. Passed explicitly into every client-facing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, From)]
pub struct ClientIdentity(ClientId);

impl ClientIdentity {
    pub fn client_id(&self) -> ClientId {
        self.0
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Insufficient bonus balance")]
    InsufficientBalance,
    #[error("Amount must not be negative")]
    InvalidAmount,
    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),
    #[error("Amount is out of range")]
    AmountOverflow,
}

/// Login-level identity shared by every kind of user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: ClientId,
    pub email: String,
    pub name: String,
}

/// A client profile together with its ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub user: User,
    pub phone_number: String,
    pub account: BonusAccount,
}

impl Client {
    pub fn new(user: User, phone_number: impl Into<String>, bonus: Decimal) -> Self {
        Self {
            user,
            phone_number: phone_number.into(),
            account: BonusAccount::new(bonus),
        }
    }
    pub fn id(&self) -> ClientId {
        self.user.id
    }
}

/// Bonus balance of a single client. Invariant: `bonus >= 0`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BonusAccount {
    bonus: Decimal,
    /// Cached witness of the single-active-order rule.
    pub has_active_order: bool,
}

impl BonusAccount {
    pub fn new(bonus: Decimal) -> Self {
        Self {
            bonus,
            has_active_order: false,
        }
    }
    pub fn bonus(&self) -> Decimal {
        self.bonus
    }
    pub fn credit(&mut self, amount: Decimal) -> Result<(), DomainError> {
        if amount < Decimal::ZERO {
            return Err(DomainError::InvalidAmount);
        }
        self.bonus = self
            .bonus
            .checked_add(amount)
            .ok_or(DomainError::AmountOverflow)?;
        Ok(())
    }
    /// Fails without touching the balance if it would go negative.
    pub fn try_debit(&mut self, amount: Decimal) -> Result<(), DomainError> {
        if amount < Decimal::ZERO {
            return Err(DomainError::InvalidAmount);
        }
        if amount > self.bonus {
            return Err(DomainError::InsufficientBalance);
        }
        self.bonus = self
            .bonus
            .checked_sub(amount)
            .ok_or(DomainError::AmountOverflow)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum OrderStatus {
    #[display("CREATED")]
    Created,
    #[display("ACTIVE")]
    Active,
    #[display("FINISHED")]
    Finished,
    #[display("CANCELLED")]
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Finished | OrderStatus::Cancelled)
    }

    /// CREATED -> ACTIVE -> {FINISHED, CANCELLED}; CREATED may also end directly.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Created, Active) | (Created | Active, Finished) | (Created | Active, Cancelled)
        )
    }
}

/// Trip rating, always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub struct Rating(u8);

impl Rating {
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(DomainError::InvalidRating(value))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub origin: String,
    pub destination: String,
}

impl Route {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
        }
    }
}

/// Who rides: the ordering client, or someone they order for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Passenger {
    #[default]
    Myself,
    Other { name: String, phone_number: String },
}

/// One rejected field of an order request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every field problem found in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn fields(&self) -> Vec<&'static str> {
        self.0.iter().map(|e| e.field).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

const MAX_PHONE_LEN: usize = 13;

/// A client's request for a new trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub price: Decimal,
    pub pay_with_bonuses: bool,
    pub route: Route,
    pub passenger: Passenger,
}

impl NewOrder {
    pub fn new(price: Decimal, pay_with_bonuses: bool, route: Route) -> Self {
        Self {
            price,
            pay_with_bonuses,
            route,
            passenger: Passenger::Myself,
        }
    }

    pub fn for_passenger(mut self, passenger: Passenger) -> Self {
        self.passenger = passenger;
        self
    }

    /// Checks every field and reports all failures at once.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.price < Decimal::ZERO {
            errors.push("price", "Price must not be negative");
        }
        if self.route.origin.trim().is_empty() {
            errors.push("origin", "Origin is required");
        }
        if self.route.destination.trim().is_empty() {
            errors.push("destination", "Destination is required");
        }
        if let Passenger::Other { name, phone_number } = &self.passenger {
            if name.trim().is_empty() {
                errors.push("passenger_name", "Passenger name is required");
            }
            let phone = phone_number.trim();
            if phone.is_empty() {
                errors.push("passenger_phone", "Phone number is required");
            } else if !phone.starts_with('+') || phone.len() > MAX_PHONE_LEN {
                errors.push(
                    "passenger_phone",
                    "Invalid phone number, keep format +380xxxxxxxxx",
                );
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// A trip order. `id`, `hash`, `client_id` and `price` never change after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub hash: OrderHash,
    pub client_id: ClientId,
    pub driver_id: Option<DriverId>,
    pub price: Decimal,
    pub pay_with_bonuses: bool,
    pub route: Route,
    pub passenger: Passenger,
    pub status: OrderStatus,
    pub rating: Option<Rating>,
}

impl Order {
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Sum type over every action a command script can drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register { client: ClientId, bonus: Decimal },
    Create { client: ClientId, order: NewOrder },
    Assign { order: OrderId, driver: DriverId },
    Finish { order: OrderId },
    Cancel { client: ClientId, order: OrderId },
    Rate { client: ClientId, order: OrderId, rating: u8 },
}
