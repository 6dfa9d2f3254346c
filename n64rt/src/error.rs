use thiserror::Error;

/// Errors the boot path can recover from.
///
/// Everything else (unknown interrupt causes) halts; see [`crate::cop0::halt`].
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// The PI finished a transfer with its error bit set.
    #[error("PI DMA reported an I/O error")]
    PiIo,
    /// The loader handed over a TV type we have no timing profile for.
    #[error("unknown TV type {0} in boot handoff")]
    UnknownTvType(u32),
}
