//! Turn contract: what a provider must return and what is sent to it.
//!
//! Provider output is structured data validated against a JSON Schema plus
//! three semantic rules. This module handles parsing and validation; it
//! never calls a provider.

mod request;
mod response;
mod schema;
mod validator;

pub use request::{HistoryEntry, TurnRequest, TurnSeed};
pub use response::{Confidence, ExtractedData, NextQuestion, TurnResponse, TERMINAL_SENTINEL};
pub use schema::{validate_turn_shape, SchemaError};
pub use validator::{check_question, ContractViolation, TurnValidator, ViolationKind};
