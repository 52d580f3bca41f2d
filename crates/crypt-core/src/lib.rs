//! crypt-core: one-way passphrase hashing with crypt(3) setting strings
//!
//! # Design principles
//! - A setting string selects the method by prefix; hashes are settings
//!   with the digest appended, so a stored hash verifies by re-hashing.
//! - Every failure leaves a `*`-prefixed token in the output that never
//!   equals the setting it came from.
//! - Method working memory comes from a fixed scratch area that is wiped
//!   after every call.
//!
//! # Module layout
//! - `api`        entry points: crypt*, crypt_gensalt*, crypt_checksalt
//! - `registry`   ordered prefix table and the `HashMethod` trait
//! - `methods`    the hash schemes themselves
//! - `des`        DES key schedule and block cipher
//! - `obsolete`   setkey / encrypt
//! - `scratch`    output and scratch views handed to methods
//! - `failure`    failure tokens
//! - `random`     OS randomness for setting generation
//! - `b64`        crypt-style base64 alphabets
//! - `error`      unified error type

pub mod api;
pub mod b64;
pub mod des;
pub mod error;
pub mod failure;
pub mod methods;
pub mod obsolete;
pub mod random;
pub mod registry;
pub mod scratch;

pub use api::{
    crypt, crypt_checksalt, crypt_gensalt, crypt_gensalt_ra, crypt_gensalt_rn, crypt_preferred_method, crypt_r,
    crypt_ra, crypt_rn, CryptData, SaltCheck, ALG_SPECIFIC_SIZE, CRYPT_DATA_SIZE, CRYPT_GENSALT_OUTPUT_SIZE,
    CRYPT_MAX_PASSPHRASE_SIZE, CRYPT_OUTPUT_SIZE,
};
pub use error::CryptError;
pub use failure::is_failure_token;
pub use obsolete::{encrypt, encrypt_r, setkey, setkey_r};
pub use registry::{methods, HashMethod};
