//! IO modules - side effects (network, filesystem)

pub mod copy;
pub mod download;
