//! API middleware

mod api_key;

pub use api_key::{ApiKey, RequireApiKey, API_KEY_HEADER};
