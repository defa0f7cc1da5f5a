use thiserror::Error;

#[derive(Error, Debug)]
pub enum TracemarkError {
    #[error("Format error: {0}")]
    Format(String),

    #[error("Signature mismatch: {0}")]
    SignatureMismatch(String),

    #[error("Key error: {0}")]
    Key(String),

    #[error("Capacity exceeded: message needs {required_bits} bits, carrier holds {available_bits}")]
    CapacityExceeded {
        required_bits: usize,
        available_bits: usize,
    },

    #[error("Native bit-plane embedding is unavailable in this build")]
    NativeUnavailable,

    #[error("Image too large: {width}x{height} exceeds the {max}px ceiling")]
    ImageTooLarge { width: u32, height: u32, max: u32 },

    #[error("Image codec error: {0}")]
    ImageCodec(String),

    #[error("No insertion point found for {format} carrier")]
    InsertionPointNotFound { format: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    TaskJoin(String),
}

pub type Result<T> = std::result::Result<T, TracemarkError>;
