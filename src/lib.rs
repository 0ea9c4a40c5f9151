//! price-watch - tracks product prices for many subscribers.
//!
//! This crate provides:
//! - Canonicalization of product links into a stable identity
//! - A persistent watchlist keyed by canonical link
//! - Periodic concurrent rescans with one notification per subscriber on
//!   every price change

pub mod app;
pub mod config;
pub mod error;
pub mod link;
pub mod logging;
pub mod model;
pub mod repository;
pub mod service;
pub mod source;
pub mod subscriber;
pub mod task;
