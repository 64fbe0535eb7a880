//! imagebox image service.
//!
//! Uploads arrive as `multipart/form-data` (or the older base64 JSON shape),
//! land in object storage under `images/{id}.{ext}`, and are recorded in a
//! metadata table. Listing and lookup return the records with time-limited
//! download links. The same router serves plain HTTP and Lambda proxy events.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod lambda;
pub mod server;
pub mod storage;

#[cfg(test)]
mod testing;
