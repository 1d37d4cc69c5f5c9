//! Currency type and rate conversion.
//!
//! Every stored rate expresses the value of one unit of the currency in the
//! base currency. The base currency itself is never fetched from the rate
//! source; it is pinned at rate 1.

use rust_decimal::Decimal;
use serde::Serialize;

/// Char code of the base currency all rates are expressed against.
pub const BASE_CURRENCY: &str = "RUB";

/// Display name used when the base currency is added to the system.
pub const BASE_CURRENCY_NAME: &str = "Russian ruble";

/// A currency known to the system.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Currency {
    pub char_code: String,
    pub name: String,
    pub rate: Decimal,
}

impl Currency {
    /// Convert an amount denominated in this currency into `target`,
    /// at the current stored rates.
    pub fn convert(&self, amount: Decimal, target: &Currency) -> Decimal {
        amount * self.rate / target.rate
    }

    pub fn is_base(&self) -> bool {
        self.char_code == BASE_CURRENCY
    }
}
