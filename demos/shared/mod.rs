//! Helpers shared by the demo plugins

#![allow(dead_code)]

pub mod config;
pub mod tracing;
