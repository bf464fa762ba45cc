//! # thesia-core
//!
//! Core types for the Thesia thesis-lifecycle system.
//!
//! This crate provides the foundational types shared across all Thesia crates:
//! - Entity structs for all domain objects (topics, theses, invitations, history)
//! - Status enums with state machine transitions
//! - Actor identity for authenticated callers
//! - The pure access policy (role/ownership → allowed operations)
//! - ID prefix constants
//! - Cross-cutting error types

pub mod actor;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod ids;
pub mod policy;
