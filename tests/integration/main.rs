//! Integration tests for the freshness engine
//!
//! These tests use wiremock to stand up mock sites and drive the engine
//! through the real `reqwest` fetcher end-to-end.

mod common;
mod engine_tests;
mod sitemap_tests;
mod storage_tests;
