mod change_event;
mod cursor;
mod diff_record;
mod optimistic_patch;
mod resource;

pub use change_event::{Change, ChangeEvent};
pub use cursor::CollectionCursor;
pub use diff_record::{ChangedSpan, DiffRecord, SizeClass, SpanKind};
pub use optimistic_patch::OptimisticPatch;
pub use resource::Resource;
