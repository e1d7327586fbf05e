mod collection;
mod fingerprint;
mod owner_id;
mod resource_id;

pub use collection::CollectionName;
pub use fingerprint::Fingerprint;
pub use owner_id::OwnerId;
pub use resource_id::ResourceId;
