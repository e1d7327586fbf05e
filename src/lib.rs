//! Client-side synchronization engine for the Lorebase knowledge base.
//!
//! The engine keeps a locally stored view of the user's resources in step
//! with a REST backend that offers no push channel:
//!
//! - [`MutationCoordinator`] applies local writes optimistically, then
//!   reconciles server-authoritative fields or rolls the write back.
//! - [`ChangeDetectionPoller`] compares per-collection snapshots to infer
//!   remote inserts, updates and deletes, and fans events out to
//!   subscribers.
//! - [`DiffEngine`] scores content changes and suppresses diffs that are
//!   too large or too noisy to present.
//! - [`OperationDeduplicator`] collapses concurrent identical operations
//!   onto a single in-flight call.
//!
//! [`SyncEngine`] wires the four together over an injected backend and
//! credential provider.

pub mod application;
pub mod domain;
mod engine;
pub mod infrastructure;
pub mod shared;

pub use application::ports::{
    ChangeProbe, ContentCache, CredentialProvider, LocalStore, ResourceBackend,
};
pub use application::services::{
    ChangeDetectionPoller, ChangeSubscription, DiffEngine, MutationCoordinator, MutationError,
    MutationOutcome, OperationDeduplicator, PollerStatus, RemovalOutcome,
};
pub use domain::entities::{
    Change, ChangeEvent, ChangedSpan, CollectionCursor, DiffRecord, OptimisticPatch, Resource,
    SizeClass, SpanKind,
};
pub use domain::value_objects::{CollectionName, Fingerprint, OwnerId, ResourceId};
pub use engine::SyncEngine;
pub use shared::config::EngineConfig;
pub use shared::error::{Result, SyncError};
