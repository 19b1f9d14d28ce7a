//! Database schema and enum types shared by every crate touching storage

mod schema;
mod status;

pub use schema::*;
pub use status::*;
