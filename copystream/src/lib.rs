// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

pub mod cache;
pub mod classify;
pub mod config;
pub mod demux;
pub mod engine;
pub mod eval;
pub mod marker;
pub mod metadata;
pub mod sanitize;
pub mod session;
pub mod stream;
pub mod turn;
