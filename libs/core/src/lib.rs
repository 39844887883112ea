//! Frame action proxy core contracts and value types.
//!
//! This crate holds everything the proxy service needs between receiving an interaction and
//! relaying the classified result: the request model, the upstream client seam, the action
//! response schemas, the response classifier and the HTML frame extractor.
pub mod classify;
pub mod error;
pub mod frame;
pub mod http;
pub mod proxy;
pub mod schema;
pub mod types;
pub mod upstream;

pub use classify::*;
pub use error::*;
pub use frame::*;
pub use http::*;
pub use proxy::*;
pub use schema::*;
pub use types::*;
pub use upstream::*;
