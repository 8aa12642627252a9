//! HTTP clients for the external collaborators.
//!
//! # Architecture
//!
//! - `supabase` - Fuzzy store search via a Supabase RPC function
//! - `openweather` - Current conditions via OpenWeatherMap

pub mod openweather;
pub mod supabase;

pub use openweather::OpenWeatherMap;
pub use supabase::SupabaseStoreSearch;

use crate::VERSION;

/// User agent string for outbound requests.
fn user_agent() -> String {
    format!("store-greeter/{} (rust)", VERSION)
}
