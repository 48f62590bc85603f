//! CSV command scripts.
//!
//! Parsing happens in two stages:
//! 1. Serde deserializes each CSV row into a flat `CsvCommand`.
//! 2. `TryFrom<CsvCommand>` converts it into the strongly-typed domain `Command`.
//!
//! Malformed rows or missing required fields are logged and skipped.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{ClientId, Command, DriverId, NewOrder, OrderId, Route};

#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CommandType {
    Register,
    Create,
    Assign,
    Finish,
    Cancel,
    Rate,
}

/// Flat representation of a single CSV row. Which columns are required
/// depends on the command type.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CsvCommand {
    r#type: CommandType,
    client: Option<ClientId>,
    order: Option<OrderId>,
    amount: Option<Decimal>,
    bonuses: Option<bool>,
    origin: Option<String>,
    destination: Option<String>,
    driver: Option<DriverId>,
    rating: Option<u8>,
}

/// Returns an iterator that lazily deserializes CSV rows into commands,
/// skipping any rows that fail to parse or convert.
pub fn deserialize_csv<D: std::io::Read>(
    reader: &mut csv::Reader<D>,
) -> impl Iterator<Item = Command> {
    reader
        .deserialize::<CsvCommand>()
        .filter_map(|result| match result {
            Ok(command) => Some(command),
            Err(e) => {
                warn!("Failed to parse command: {e}");
                None
            }
        })
        .filter_map(|csv_command| match Command::try_from(csv_command) {
            Ok(command) => Some(command),
            Err(e) => {
                warn!("Failed to convert CsvCommand to Command: {e}");
                None
            }
        })
}

#[derive(Debug, thiserror::Error)]
enum IntoCommandError {
    #[error("Missing `{column}` for {command:?}")]
    MissingColumn {
        column: &'static str,
        command: CommandType,
    },
}

fn required<T>(
    value: Option<T>,
    column: &'static str,
    command: CommandType,
) -> Result<T, IntoCommandError> {
    value.ok_or(IntoCommandError::MissingColumn { column, command })
}

impl TryFrom<CsvCommand> for Command {
    type Error = IntoCommandError;

    fn try_from(value: CsvCommand) -> Result<Self, Self::Error> {
        let kind = value.r#type;
        match kind {
            CommandType::Register => Ok(Command::Register {
                client: required(value.client, "client", kind)?,
                bonus: value.amount.unwrap_or_default(),
            }),
            // Blank origin/destination are kept so field validation can report them.
            CommandType::Create => Ok(Command::Create {
                client: required(value.client, "client", kind)?,
                order: NewOrder::new(
                    required(value.amount, "amount", kind)?,
                    value.bonuses.unwrap_or(false),
                    Route::new(
                        value.origin.unwrap_or_default(),
                        value.destination.unwrap_or_default(),
                    ),
                ),
            }),
            CommandType::Assign => Ok(Command::Assign {
                order: required(value.order, "order", kind)?,
                driver: required(value.driver, "driver", kind)?,
            }),
            CommandType::Finish => Ok(Command::Finish {
                order: required(value.order, "order", kind)?,
            }),
            CommandType::Cancel => Ok(Command::Cancel {
                client: required(value.client, "client", kind)?,
                order: required(value.order, "order", kind)?,
            }),
            CommandType::Rate => Ok(Command::Rate {
                client: required(value.client, "client", kind)?,
                order: required(value.order, "order", kind)?,
                rating: required(value.rating, "rating", kind)?,
            }),
        }
    }
}
