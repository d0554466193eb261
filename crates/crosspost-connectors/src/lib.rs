// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Publishing connectors for LinkedIn and X.
//!
//! Both platforms share one REST shape: a publish endpoint taking an
//! `Idempotency-Key` header, and a verification endpoint queryable by that
//! key. [`RestConnector`] implements
//! [`crosspost_core::PlatformConnector`] for either platform; the worker
//! builds one per platform from config plus a vault-sourced access token.

pub mod rest;

pub use rest::RestConnector;
