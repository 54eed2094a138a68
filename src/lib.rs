//! Veche Governance - decision engine for party discussions
//!
//! This crate turns a discussion into a binding decision: members vote,
//! the discussion is resolved by simple majority, and the organizational
//! changes queued on it (pending actions) are applied once it passes.
//! Voting sessions batch discussions and move them through their phases
//! on database notifications.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
