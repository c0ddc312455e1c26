// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resolution tests entry point.
//!
//! This module re-exports all resolution tests as a single integration test file.

mod resolution;
