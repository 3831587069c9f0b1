//! Core domain types: identifiers, requests, commands and stages.

pub mod command;
pub mod environment;
pub mod request;
pub mod stage;
pub mod types;
