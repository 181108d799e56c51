//! Tableside - Subscription lifecycle engine for a multi-tenant restaurant
//! ordering platform.
//!
//! Each restaurant (tenant) gets a free trial, buys 30-day paid plans
//! through Razorpay, and verifies its owner email with one-time codes. A
//! background scheduler expires trials and lapsed plans, purges accounts
//! that never paid, trims old operational data, and mails daily reports.

pub mod adapters;
pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod ports;
