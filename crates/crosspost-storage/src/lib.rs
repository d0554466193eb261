// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Crosspost.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed CRUD
//! operations for campaigns, posts, attempt history, decision requests,
//! confirmation tokens, audit trails, and system controls.

pub mod database;
pub mod migrations;
pub mod queries;

pub use database::Database;
