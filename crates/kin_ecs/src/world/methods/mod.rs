// -----------------------------------------------------------------------------
// Modules

mod despawn;
mod emplace;
mod erase;
mod fetch;
mod spawn;

// -----------------------------------------------------------------------------
// Exports

pub(crate) use erase::remove_in;
