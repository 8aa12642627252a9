//! Service layer for the Store Greeter.
//!
//! Business logic behind the MCP tools: store resolution, weather
//! enrichment, and greeting composition.

pub mod greeting;
pub mod store;
pub mod weather;

pub use greeting::GreetingService;
pub use store::{StoreResolver, StoreSearch};
pub use weather::{WeatherEnricher, WeatherProvider};
