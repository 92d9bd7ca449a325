// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules over the conversation state database.

pub mod messages;
pub mod threads;
