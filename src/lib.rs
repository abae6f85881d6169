#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

pub use kin_ecs as ecs;
pub use kin_ptr as ptr;
pub use kin_utils as utils;
