// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The stateless polling worker that executes due posts.

pub mod runner;

pub use runner::Runner;
