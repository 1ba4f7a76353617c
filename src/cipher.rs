#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Cipher family selection and single-block encryption dispatch.
//!
//! CMAC is generic over any cipher with a 128-bit block. The families wired
//! in here are the 128-bit-key variants of AES (FIPS 197), ARIA (RFC 5794),
//! and Camellia (RFC 3713); each is driven one block at a time in ECB
//! fashion, with all chaining done by the caller.

use std::fmt;
use std::str::FromStr;

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;
use aria::Aria128;
use camellia::Camellia128;

use crate::error::CmacError;

/// Width in bytes of the cipher block, and therefore of the untruncated MAC.
pub const BLOCK_LEN: usize = 16;

/// A single cipher block; also the full-length MAC value.
pub type Block = [u8; BLOCK_LEN];

/// Supported 128-bit-block cipher families.
///
/// Parsing is case-insensitive: `"AES"`, `"aes"`, and `"Aes"` all select
/// [`CipherKind::Aes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherKind {
    /// AES-128 (FIPS 197).
    Aes,
    /// ARIA-128 (RFC 5794).
    Aria,
    /// Camellia-128 (RFC 3713).
    Camellia,
}

impl CipherKind {
    /// Every supported family, in canonical order.
    pub const ALL: [CipherKind; 3] = [CipherKind::Aes, CipherKind::Aria, CipherKind::Camellia];

    /// Canonical (uppercase) name of the family.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            CipherKind::Aes => "AES",
            CipherKind::Aria => "ARIA",
            CipherKind::Camellia => "CAMELLIA",
        }
    }

    /// Names of every supported family, as accepted by [`CipherKind::from_str`].
    #[must_use]
    pub const fn names() -> [&'static str; 3] {
        [
            CipherKind::Aes.as_str(),
            CipherKind::Aria.as_str(),
            CipherKind::Camellia.as_str(),
        ]
    }
}

impl fmt::Display for CipherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CipherKind {
    type Err = CmacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CipherKind::ALL
            .into_iter()
            .find(|kind| s.eq_ignore_ascii_case(kind.as_str()))
            .ok_or_else(|| CmacError::UnsupportedCipher { name: s.to_owned() })
    }
}

/// A cipher instance keyed for single-block ECB encryption.
#[derive(Clone)]
pub(crate) enum BlockCipher {
    Aes(Aes128),
    Aria(Aria128),
    Camellia(Camellia128),
}

impl BlockCipher {
    /// Key a cipher of the given family.
    pub(crate) fn new(kind: CipherKind, key: &Block) -> Self {
        match kind {
            CipherKind::Aes => BlockCipher::Aes(Aes128::new(key.into())),
            CipherKind::Aria => BlockCipher::Aria(Aria128::new(key.into())),
            CipherKind::Camellia => BlockCipher::Camellia(Camellia128::new(key.into())),
        }
    }

    /// Encrypt one block in place.
    pub(crate) fn encrypt_block(&self, block: &mut Block) {
        match self {
            BlockCipher::Aes(c) => c.encrypt_block(block.into()),
            BlockCipher::Aria(c) => c.encrypt_block(block.into()),
            BlockCipher::Camellia(c) => c.encrypt_block(block.into()),
        }
    }
}
