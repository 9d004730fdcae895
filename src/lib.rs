//! Task comment microservice.
//!
//! Comments live in a relational store and are mirrored into a per-task
//! cache bucket. [`service::CommentService`] keeps the two in step: store
//! first on every write, cache first on every read.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod db;
pub mod dialog;
pub mod error;
pub mod guard;
pub mod models;
pub mod service;
