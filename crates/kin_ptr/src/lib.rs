//! Pointer vocabulary for the component runtime.
//!
//! Two concerns live here:
//!
//! - **Crossing the type-erased storage boundary.** [`Ptr`] and [`PtrMut`]
//!   are `&T` and `&mut T` with the `T` erased: the registry side shuttles
//!   component values it cannot name, the typed side reattaches the type.
//!   Lifetimes survive the erasure, so the borrow checker still polices
//!   *when* access happens; *what* is accessed moves into narrow `unsafe`
//!   contracts plus debug-mode alignment probes.
//! - **Packing state into spare pointer bits.** [`TaggedPtr`] is a
//!   pointer-sized word whose two low bits carry flags, available because
//!   every participating pointee is at least 4-byte aligned.
#![expect(unsafe_code, reason = "raw pointer wrappers are the point of this crate")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// Modules

mod tagged;
mod type_erased;

// -----------------------------------------------------------------------------
// Top-level exports

pub use tagged::{TAG_BITS, TaggedPtr};
pub use type_erased::{Ptr, PtrMut};
