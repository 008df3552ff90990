//! Streaming Message Assembly
//!
//! Reconstructs an assistant reply incrementally from an ordered sequence
//! of text fragments, exposing partial and final states to observers and
//! stopping cleanly when the consuming view disappears.

mod assembler;

pub use assembler::{word_fragments, Fragment, MessageAssembler, StreamHandle, StreamPhase};
