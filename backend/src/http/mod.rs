//! HTTP adapter.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  HTTP layer (axum handlers)                  │
//! │  - form page, JSON API, health, static plots │
//! └──────────────────────┬───────────────────────┘
//!                        │ spawn_blocking
//! ┌──────────────────────▼───────────────────────┐
//! │  TransitPipeline (services/)                 │
//! └──────────────────────┬───────────────────────┘
//!                        │
//! ┌──────────────────────▼───────────────────────┐
//! │  MAST / Exoplanet Archive / plot store       │
//! └──────────────────────────────────────────────┘
//! ```

pub mod dto;
pub mod error;
pub mod handlers;
pub mod page;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::{AppState, PipelineFactory, RemotePipelineFactory};
