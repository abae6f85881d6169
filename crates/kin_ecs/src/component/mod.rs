//! Core component trait definition.

// -----------------------------------------------------------------------------
// Component

/// The base marker for all component types.
///
/// # Safety
///
/// Implementors promise that the type is an ordinary owned value: storages
/// construct it in place, hand out references to it, and drop it in place.
/// A type whose validity depends on its own address must not implement this.
pub unsafe trait Component: Sized + Send + Sync + 'static {}
