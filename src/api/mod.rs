//! Async client for the workflow backend's REST API.
//!
//! One [`ApiClient`] serves all three resource families; the per-family
//! handles borrow it:
//!
//! ```no_run
//! # async fn demo() -> Result<(), flowstudio::error::ApiError> {
//! use flowstudio::api::ApiClient;
//!
//! let client = ApiClient::with_base_url("http://localhost:8001")?;
//! for agent in client.agents().list().await? {
//!     println!("{} {}", agent.id, agent.name);
//! }
//! # Ok(())
//! # }
//! ```

mod agents;
mod client;
mod knowledge;
mod resources;

pub use agents::*;
pub use client::ApiClient;
pub use knowledge::*;
pub use resources::*;
