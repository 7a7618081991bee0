//! Field validation for stock, position and cash input.
//!
//! Each rule is a small function returning the first problem with one field.
//! The `validate_*` entity functions run every rule and collect all failures,
//! so a client sees every bad field in one response.

use rust_decimal::Decimal;
use std::fmt;

pub const SYMBOL_MAX_LEN: usize = 5;
pub const DESC_MAX_LEN: usize = 30;
pub const PRICE_PRECISION: u32 = 2;
/// Amounts must stay below this in magnitude; money columns are NUMERIC(14, 2).
pub const MONEY_LIMIT: i64 = 1_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Not a valid symbol")]
    InvalidSymbol,

    #[error("Not a valid description")]
    InvalidDescription,

    #[error("Not a valid {} number", .field.replace('_', " "))]
    InvalidAmount { field: &'static str },

    #[error("Not a position value")]
    InvalidQuantity,
}

impl ValidationError {
    /// JSON field the error belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::InvalidSymbol => "symbol",
            ValidationError::InvalidDescription => "desc",
            ValidationError::InvalidAmount { field } => field,
            ValidationError::InvalidQuantity => "quantity",
        }
    }

    /// Stable machine-readable name, used as the `error` key of HTTP bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::InvalidSymbol => "InvalidSymbol",
            ValidationError::InvalidDescription => "InvalidDescription",
            ValidationError::InvalidAmount { .. } => "InvalidAmount",
            ValidationError::InvalidQuantity => "InvalidQuantity",
        }
    }
}

/// Non-empty list of field failures for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn contains(&self, error: &ValidationError) -> bool {
        self.0.contains(error)
    }

    /// Code of the single failure, or a generic one when several fields failed.
    pub fn code(&self) -> &'static str {
        match self.0.as_slice() {
            [single] => single.code(),
            _ => "ValidationError",
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(err: ValidationError) -> Self {
        ValidationErrors(vec![err])
    }
}

/// Uppercase and trim a symbol taken from a URL or request body.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

pub fn validate_symbol(symbol: &str) -> Result<(), ValidationError> {
    let len = symbol.chars().count();
    if len == 0 || len > SYMBOL_MAX_LEN || !symbol.chars().all(char::is_alphabetic) {
        return Err(ValidationError::InvalidSymbol);
    }
    Ok(())
}

/// Printable means visible text or the ASCII space. Controls, other
/// separators, invisible format characters, private-use code points and
/// noncharacters are not printable.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    let cp = c as u32;
    let format = matches!(
        cp,
        0x00AD
            | 0x0600..=0x0605
            | 0x061C
            | 0x06DD
            | 0x070F
            | 0x0890..=0x0891
            | 0x08E2
            | 0x180E
            | 0x200B..=0x200F
            | 0x202A..=0x202E
            | 0x2060..=0x2064
            | 0x2066..=0x206F
            | 0xFEFF
            | 0xFFF9..=0xFFFB
            | 0x110BD
            | 0x110CD
            | 0x13430..=0x1343F
            | 0x1BCA0..=0x1BCA3
            | 0x1D173..=0x1D17A
            | 0xE0001
            | 0xE0020..=0xE007F
    );
    let private_use = matches!(cp, 0xE000..=0xF8FF | 0xF0000..=0xFFFFD | 0x100000..=0x10FFFD);
    let noncharacter = matches!(cp, 0xFDD0..=0xFDEF) || cp & 0xFFFE == 0xFFFE;
    !(format || private_use || noncharacter)
}

pub fn validate_description(desc: &str) -> Result<(), ValidationError> {
    if desc.chars().count() > DESC_MAX_LEN || !desc.chars().all(is_printable) {
        return Err(ValidationError::InvalidDescription);
    }
    Ok(())
}

/// Rejects amounts carrying sub-cent precision or too large to store.
pub fn validate_money(field: &'static str, amount: Decimal) -> Result<(), ValidationError> {
    if amount.round_dp(PRICE_PRECISION) != amount || amount.abs() >= Decimal::from(MONEY_LIMIT) {
        return Err(ValidationError::InvalidAmount { field });
    }
    Ok(())
}

pub fn validate_quantity(quantity: i64) -> Result<(), ValidationError> {
    if quantity <= 0 {
        return Err(ValidationError::InvalidQuantity);
    }
    Ok(())
}

fn collect(results: impl IntoIterator<Item = Result<(), ValidationError>>) -> Vec<ValidationError> {
    results.into_iter().filter_map(Result::err).collect()
}

pub fn validate_new_stock(
    symbol: &str,
    desc: &str,
    stop_quote: Option<Decimal>,
) -> Vec<ValidationError> {
    collect([
        validate_symbol(symbol),
        validate_description(desc),
        stop_quote.map_or(Ok(()), |q| validate_money("stop_quote", q)),
    ])
}

pub fn validate_new_position(quantity: i64, unit_cost: Decimal) -> Vec<ValidationError> {
    collect([
        validate_quantity(quantity),
        validate_money("unit_cost", unit_cost),
    ])
}

pub fn validate_cash(balance: Decimal) -> Vec<ValidationError> {
    collect([validate_money("balance", balance)])
}
