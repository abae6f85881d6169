// -----------------------------------------------------------------------------
// Modules

mod allocator;
mod error;
mod ident;

// -----------------------------------------------------------------------------
// Exports

pub use allocator::Entities;
pub use error::{DespawnError, EmplaceError, EraseError};
pub use ident::{Entity, EntityGeneration, EntityId};
