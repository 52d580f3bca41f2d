use thiserror::Error;

/// errno values the C interface reports for each failure class.
pub const EINVAL: i32 = 22;
pub const ERANGE: i32 = 34;
pub const ENOMEM: i32 = 12;
pub const EIO: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CryptError {
    #[error("Invalid setting or argument")]
    Invalid,

    #[error("Output or scratch buffer too small")]
    Range,

    #[error("Memory allocation failed")]
    NoMemory,

    #[error("Operating system random source unavailable")]
    NoEntropy,
}

impl CryptError {
    /// Numeric errno-equivalent, for callers bridging to C conventions.
    pub fn errno(self) -> i32 {
        match self {
            CryptError::Invalid => EINVAL,
            CryptError::Range => ERANGE,
            CryptError::NoMemory => ENOMEM,
            CryptError::NoEntropy => EIO,
        }
    }
}

pub type Result<T> = std::result::Result<T, CryptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_mapping() {
        assert_eq!(CryptError::Invalid.errno(), EINVAL);
        assert_eq!(CryptError::Range.errno(), ERANGE);
        assert_eq!(CryptError::NoMemory.errno(), ENOMEM);
        assert_eq!(CryptError::NoEntropy.errno(), EIO);
    }

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(CryptError::Range.to_string(), "Output or scratch buffer too small");
    }
}
