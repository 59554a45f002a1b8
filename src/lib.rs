//! ConvertFlow - JSON/CSV Conversion Service
//!
//! This crate implements a conversion API that turns JSON arrays of objects
//! into CSV and back. Every API request passes an in-memory, per-client
//! fixed-window rate limiter before it reaches a handler.

pub mod accounts;
pub mod config;
pub mod convert;
pub mod error;
pub mod http;
pub mod ratelimit;
