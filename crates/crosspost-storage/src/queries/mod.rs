// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on storage entities.

pub mod attempts;
pub mod audit;
pub mod campaigns;
pub mod controls;
pub mod decisions;
pub mod events;
pub mod health;
pub mod posts;
pub mod tokens;
