//! HTTP handlers.

mod health;
mod images;
mod router;
mod upload;

#[cfg(test)]
mod tests;

pub use images::{ImageView, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
pub use router::{create_router, AppState};
pub use upload::storage_key;
