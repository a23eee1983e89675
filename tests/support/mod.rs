//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod flaky;
pub mod socket_guard;
