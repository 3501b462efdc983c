//! # Document Drifter
//!
//! Generate a README for a Git repository by showing a language model a
//! snapshot of the repository's files.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌────────────┐   ┌──────────┐
//! │  Clone   │──▶│ Snapshot │──▶│  Generate  │──▶│ History  │
//! │ (git)    │   │ (walker) │   │ (LLM HTTP) │   │ (SQLite) │
//! └──────────┘   └──────────┘   └────────────┘   └──────────┘
//!      ▲                                              │
//!      └──────── local copy removed after run ◀──────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! drifter init                                        # create history database
//! GEMINI_API_KEY=... drifter generate https://github.com/user/repo -o README.md
//! drifter history                                     # newest first
//! drifter scan ./some/checkout                        # walker only, no model
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error kinds shared by every step |
//! | [`models`] | Snapshot and history record types |
//! | [`snapshot`] | Filtered directory walker and snapshot serialization |
//! | [`clone`] | Repository acquisition into a scoped temp dir |
//! | [`prompt`] | README prompt template |
//! | [`generate`] | Generation provider abstraction |
//! | [`db`] | Database connection |
//! | [`history`] | Append-only generation history |
//! | [`pipeline`] | Run orchestration |

pub mod clone;
pub mod config;
pub mod db;
pub mod error;
pub mod generate;
pub mod history;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod snapshot;

pub use error::{Error, Result};
