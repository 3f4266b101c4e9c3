//! Erasure extension of data squares.
//!
//! Exposes the encoder interface, the Reed-Solomon default encoder, and the
//! original/extended square types.

pub mod encoder;
pub mod square;

pub use encoder::{ErasureEncoder, FecError, ReedSolomonEncoder, MAX_EXTENDED_WIDTH};
pub use square::{ExtendedSquare, OriginalSquare};
