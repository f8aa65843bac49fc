use thiserror::Error;

/// Failures raised by the container codec, the record tree and the entity
/// layers.
///
/// Container- and tree-level variants abort the current load or save
/// outright; nothing partial is handed to the entity model. Mutation-level
/// oddities (replica mismatches, count drift, a full inventory) are not
/// errors at all: they are [`crate::session::Anomaly`] values reported
/// through the observer/log channel while the session keeps going.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A fixed header constant did not match; the file is rejected before
    /// any payload work.
    #[error("bad save header: {field} is {found}, expected {expected}")]
    Format {
        field: &'static str,
        expected: u32,
        found: u32,
    },

    /// The checksum stored in the header disagrees with the compressed
    /// payload actually present.
    #[error("checksum mismatch: header has {stored:#010x}, payload hashes to {computed:#010x}")]
    Integrity { stored: u32, computed: u32 },

    /// Inflate failure, truncated block, or a payload the record tree
    /// parser cannot make sense of.
    #[error("cannot decode payload: {0}")]
    Decode(String),

    /// A node the fixed schema guarantees was not found.
    #[error("schema node missing: {path}")]
    Schema { path: String },

    /// Unknown person or slot key supplied by the caller.
    #[error("unknown key: {0}")]
    Lookup(String),

    /// The masked tier id of a weapon/armor flag is not in the fixed table.
    #[error("unknown tier id {masked} in flag {raw:#010x}")]
    UnknownTier { raw: u32, masked: u32 },

    /// Flag codec misuse, or an edit that the target person cannot carry.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The encoded block would not fit the fixed container size.
    #[error("encoded block needs {needed} bytes, container holds {max}")]
    Capacity { needed: usize, max: usize },

    /// A value outside the range a setter is willing to write.
    #[error("invalid value: {0}")]
    Value(String),
}

pub type Result<T> = std::result::Result<T, SaveError>;
