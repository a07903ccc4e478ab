//! Local Agent Discovery server.
//!
//! Advertises one agent on the local network: an mDNS `_a2a._tcp`
//! announcement plus the HTTP endpoints clients fall back to.
//!
//! - `GET /.well-known/lad/agents`: discovery document
//! - `GET /.well-known/agent.json`: A2A AgentCard (JSON or signed JWS)
//! - `GET /health`

pub mod advertiser;
pub mod card;
pub mod error;
pub mod net;
pub mod routes;
pub mod server;

pub use advertiser::ServiceAdvertiser;
pub use card::CardGenerator;
pub use error::{ServerError, ServerResult};
pub use routes::{build_router, AppState};
pub use server::LadServer;
