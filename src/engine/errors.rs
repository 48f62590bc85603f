use crate::domain::{ClientId, DomainError, OrderStatus, ValidationErrors};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("Client {0} already has an active order")]
    DuplicateActiveOrder(ClientId),
    #[error("Order not found")]
    OrderNotFound,
    #[error("Client {0} not found")]
    ClientNotFound(ClientId),
    #[error("Illegal transition from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },
    #[error("Invalid order: {0}")]
    Validation(ValidationErrors),
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}
