//! Tests for the segment engine

#[path = "../common/mod.rs"]
mod common;

mod frame_tests;
mod header_tests;
mod property_tests;
