//! Management-API plumbing: request building, transport, auth and response classification.

pub mod auth;
pub mod connection;
pub mod request;
pub mod response;
pub mod transport;

pub use auth::{StaticToken, TokenSource};
pub use connection::Connection;
pub use request::{ApiRequest, Method, RequestBody, endpoint};
pub use response::{ApiResponse, classify};
pub use transport::{ReqwestTransport, Transport};
