//! Core domain types and logic.

pub mod cash;
pub mod config_validation;
pub mod cost_basis;
pub mod error;
pub mod position;
pub mod price;
pub mod pricing;
pub mod service;
pub mod stock;
pub mod validation;
