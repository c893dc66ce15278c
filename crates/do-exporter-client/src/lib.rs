pub mod client;
pub mod credentials;
pub mod types;

pub use client::{AccountClient, AccountSource, DEFAULT_API_URL, DEFAULT_TIMEOUT};
pub use credentials::{StaticTokenSource, TokenSource};
pub use types::AccountSnapshot;
