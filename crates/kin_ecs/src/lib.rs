//! Subtype polymorphism over components.
//!
//! A component type declared through [`inherit!`] may name any number of
//! polymorphic ancestors. Emplacing a value of the type installs
//! back-references into every ancestor's storage, so a query for an ancestor
//! type yields every descendant component attached to the entity; erasing the
//! value (or destroying the entity) removes them again. The per-type storage
//! cell packs the four possible states into the component buffer plus one
//! tagged pointer word, and small reference lists are carved out of a slab
//! pool owned by the [`World`](world::World).
#![expect(unsafe_code, reason = "in-place storage requires raw pointer work")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// no_std support

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

pub mod utils;

pub mod component;
pub mod entity;
pub mod hierarchy;

pub mod poly;

pub mod world;
