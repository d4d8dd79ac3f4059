//! `flowplan-core`: shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model and the entity marker trait.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    AdjustmentId, AduCalculationId, BufferHistoryId, BufferId, BufferProfileId, OrganizationId,
    ProductId, SupplierId, UserId,
};
