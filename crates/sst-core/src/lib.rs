//! sst-core library.
//!
//! Storage-unit status records with forward-filled defaults, kept in a local
//! document store and reconciled with a remote snapshot.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums per layer ([`store::StoreError`],
//!   [`sync::SyncError`]), each mapping to a stable [`error::ErrorCode`].
//!   Config loading uses `anyhow::Result`.
//! - **Logging**: `tracing` macros; the binary installs the subscriber.
//! - **Time**: everything that stamps or schedules reads a [`clock::Clock`].

pub mod clock;
pub mod config;
pub mod edit;
pub mod error;
pub mod forward;
pub mod lock;
pub mod model;
pub mod report;
pub mod scheduler;
pub mod store;
pub mod sync;
pub mod view;

pub use error::ErrorCode;
pub use forward::effective_statuses;
