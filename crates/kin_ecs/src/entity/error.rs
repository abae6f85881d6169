use thiserror::Error;

use crate::entity::Entity;

// -----------------------------------------------------------------------------
// Errors

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum EmplaceError {
    #[error("Entity {0} is not alive during component emplace")]
    NotAlive(Entity),

    #[error("Entity {0} already holds a value of this component type")]
    AlreadyPresent(Entity),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum EraseError {
    #[error("Entity {0} holds no value of this component type")]
    NotPresent(Entity),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DespawnError {
    #[error("Entity {0} is not alive during despawn")]
    NotAlive(Entity),
}

macro_rules! impl_handle {
    ($name:ident) => {
        impl $name {
            #[cold]
            #[inline(never)]
            pub fn handle_error(&self) -> ! {
                panic!("{self}");
            }
        }
    };
}

impl_handle!(EmplaceError);
impl_handle!(EraseError);
impl_handle!(DespawnError);
