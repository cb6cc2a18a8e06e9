//! HerHealth Server - HTTP API for cycle-cluster predictions
//!
//! Loads the three fitted artifacts once at startup and serves:
//!
//! - `POST /predict_cluster` - survey record to `{Predicted_Cluster, Health_Insight, AI_Insights}`
//! - `POST /chat` - `{message}` to `{response}`, or `502 {error}` when generation fails
//! - `GET /`, `GET /health`, `GET /ready`, `GET /metrics`
//!
//! Text generation is bounded by the generator timeout. On the prediction
//! path a failure degrades to a fixed fallback string.
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
