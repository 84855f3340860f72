//! Engine-agnostic texture generation: buffers, noise synthesis, normal
//! maps and the progressive refinement pipeline that ties them together.

pub mod atmosphere;
pub mod buffer;
pub mod coordinator;
pub mod disposal;
pub mod error;
pub mod gradient;
pub mod layers;
pub mod normal;
pub mod seed;
pub mod synth;
pub mod worker;
