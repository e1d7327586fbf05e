mod change_poller;
mod deduplicator;
mod diff_engine;
mod mutation_coordinator;

pub use change_poller::{ChangeDetectionPoller, ChangeSubscription, PollerStatus};
pub use deduplicator::OperationDeduplicator;
pub use diff_engine::DiffEngine;
pub use mutation_coordinator::{
    MutationCoordinator, MutationError, MutationOutcome, RemovalOutcome,
};
