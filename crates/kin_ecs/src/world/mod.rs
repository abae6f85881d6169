// -----------------------------------------------------------------------------
// Modules

mod impls;
mod methods;

// -----------------------------------------------------------------------------
// Exports

pub use impls::World;

pub(crate) use methods::remove_in;
