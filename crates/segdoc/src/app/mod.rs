//! Application layer: the split/combine primitives and the batch driver around them.

pub mod batch;
pub mod combine;
pub mod scan;
pub mod split;
