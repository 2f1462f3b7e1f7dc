//! Unit tests for the relay module.
//!
//! Service tests run the real hub, bus client, ingress and relay loop over
//! the in-memory adapters, injecting bus and store failures where needed.

mod adapters_tests;
