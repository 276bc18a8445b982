//! HTTP request handlers.

mod health;
mod sessions;

pub use health::*;
pub use sessions::*;
