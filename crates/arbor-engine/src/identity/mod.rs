//! Object identity.
//!
//! Every engine object (scene nodes, components, registered resources) carries
//! an `ObjectId` issued by an `IdentityRegistry`. Ids are never reused within a
//! registry; lookups by id are weak and fail once the object is retired or
//! dropped.

mod registry;

pub use registry::{IdentityRegistry, ObjectId, ObjectRef};
