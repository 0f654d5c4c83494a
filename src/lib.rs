//! CSN Link: Reflection over Linked CDS Models
//!
//! Binds Core Schema Notation documents to a small set of reflection roots (entity, event, type,
//! struct, array, association, composition, service) so that every definition can be inspected
//! through one uniform, extensible surface.
//!
//! - [`linked`] turns a [`csn::CsnDocument`] into a [`LinkedModel`] of lazily resolved classes.
//! - [`capability`] composes capability sets onto roots, classes or instances via [`extend`].
//! - [`lazy`] provides the lazy facades ([`lazify`], [`lazified`]) the model is built on.
//! - [`builtin`] exposes the shared roots and `cds.*` type classes.

pub mod builtin;
pub mod capability;
pub mod config;
pub mod csn;
pub mod error;
pub mod lazy;
pub mod linked;
pub mod logging;

pub use builtin::{builtin, Root};
pub use capability::{extend, CapabilitySet, Reflect};
pub use error::{LinkError, ReflectError};
pub use lazy::{lazified, lazify, lazy};
pub use linked::{LinkedClass, LinkedModel};
