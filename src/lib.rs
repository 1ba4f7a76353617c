#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # arc-cmac
//!
//! CMAC (Cipher-based Message Authentication Code) over 128-bit block
//! ciphers, per RFC 4493 (AES-CMAC) and NIST SP 800-38B, with RFC 4494
//! truncated tags and RFC 4615 arbitrary-length keys.
//!
//! ## What you get
//!
//! - **cmac::Cmac**: a streaming instance. Set a key once, `update` in
//!   arbitrary chunks, `digest` repeatedly; each digest resets the message
//!   state and keeps the key.
//! - **cmac**: one-shot helpers (`cmac`, `cmac_truncated`) and constant-time
//!   verification (`verify_cmac`).
//! - **cipher::CipherKind**: typed selection of the supported cipher
//!   families (AES, ARIA, and Camellia, all with 128-bit blocks and
//!   128-bit keys), parseable from their names.
//!
//! Keys of any length are accepted: non-16-byte keys are normalized through
//! AES-CMAC under the all-zero key (RFC 4615) before subkey derivation.
//!
//! ## Example
//!
//! ```
//! use arc_cmac::{cmac, verify_cmac, CipherKind, Cmac};
//!
//! // One-shot: any key length is accepted.
//! let tag = cmac(CipherKind::Aes, b"my signing key", b"attached message");
//! assert!(verify_cmac(CipherKind::Aes, b"my signing key", b"attached message", &tag));
//!
//! // Streaming, truncated to a 96-bit tag.
//! let mut mac = Cmac::with_key(CipherKind::Aes, b"my signing key");
//! mac.update(b"attached ")?.update(b"message")?;
//! assert_eq!(mac.digest_truncated(12)?, tag[..12].to_vec());
//! # Ok::<(), arc_cmac::CmacError>(())
//! ```
//!
//! ## Security notes
//!
//! - Tag comparison in `verify_cmac` is constant-time (`subtle`).
//! - Subkeys, chaining state, and buffered message bytes are zeroized on
//!   drop and on re-key; the cipher crates scrub their own expanded key
//!   schedules (their `zeroize` features are enabled).
//! - An instance is not meant for concurrent use: mutating methods take
//!   `&mut self`, and sharing one across threads needs an external lock
//!   around the whole update-then-digest sequence.

pub mod cipher;
pub mod cmac;
pub mod error;
mod subkeys;

pub use cipher::{Block, CipherKind, BLOCK_LEN};
pub use cmac::{cmac, cmac_truncated, verify_cmac, Cmac};
pub use error::{CmacError, Result};
