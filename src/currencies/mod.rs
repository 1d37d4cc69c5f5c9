//! Currency store
//!
//! Stored currencies and their exchange rates against the base currency.

mod repository;

pub use repository::CurrencyRepository;
