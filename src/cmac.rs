#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
// JUSTIFICATION: CMAC block accounting.
// - Fixed 16-byte block arithmetic; the fill counter never exceeds BLOCK_LEN
// - Chunk offsets are bounded by the input length
#![allow(clippy::arithmetic_side_effects)]

//! CMAC (Cipher-based Message Authentication Code)
//!
//! Streaming CMAC as specified in RFC 4493 (AES-CMAC) and NIST SP 800-38B,
//! with RFC 4494 tag truncation and RFC 4615 arbitrary-length keys.
//!
//! Messages are absorbed incrementally: complete 16-byte blocks are chained
//! through the cipher as they fill, and the last block (complete or partial)
//! stays buffered until [`Cmac::digest`] decides between the K1 and K2
//! subkey paths. A finished digest resets the message state but keeps the
//! key, so one keyed instance can authenticate a sequence of messages.

use std::fmt;

use tracing::instrument;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cipher::{Block, BlockCipher, CipherKind, BLOCK_LEN};
use crate::error::{CmacError, Result};
use crate::subkeys::{xor_block, Subkeys};

/// Message state for a keyed instance: the chained cipher, the derived
/// subkeys, and the pending (not yet chained) tail of the message.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct KeyedState {
    // The cipher crates scrub their own key schedules on drop.
    #[zeroize(skip)]
    cipher: BlockCipher,
    subkeys: Subkeys,
    /// Running CBC value; all zeros between messages.
    chain: Block,
    /// Pending message tail, `buf[..buf_len]` valid.
    buf: Block,
    buf_len: usize,
}

impl KeyedState {
    fn new(kind: CipherKind, key: &[u8]) -> Self {
        let mut k0 = normalize_key(key);
        let state = KeyedState::with_k0(kind, &k0);
        k0.zeroize();
        state
    }

    fn with_k0(kind: CipherKind, k0: &Block) -> Self {
        let cipher = BlockCipher::new(kind, k0);
        let subkeys = Subkeys::derive(&cipher);
        KeyedState {
            cipher,
            subkeys,
            chain: [0u8; BLOCK_LEN],
            buf: [0u8; BLOCK_LEN],
            buf_len: 0,
        }
    }

    /// Feed one complete block through the CBC chain.
    fn chain_block(&mut self, block: &Block) {
        let mut c = *block;
        xor_block(&mut c, &self.chain);
        self.cipher.encrypt_block(&mut c);
        self.chain = c;
    }

    /// Absorb message bytes, chaining every block that provably has more
    /// message after it. A block that could still turn out to be the last
    /// one stays buffered; `finalize` decides between the K1 (complete)
    /// and K2 (padded) paths.
    fn absorb(&mut self, mut data: &[u8]) {
        if self.buf_len > 0 {
            let room = BLOCK_LEN - self.buf_len;
            if data.len() <= room {
                self.buf[self.buf_len..self.buf_len + data.len()].copy_from_slice(data);
                self.buf_len += data.len();
                return;
            }
            let (fill, rest) = data.split_at(room);
            self.buf[self.buf_len..].copy_from_slice(fill);
            data = rest;
            let block = self.buf;
            self.chain_block(&block);
            self.buf_len = 0;
        }

        while data.len() > BLOCK_LEN {
            let (head, rest) = data.split_at(BLOCK_LEN);
            let mut block = [0u8; BLOCK_LEN];
            block.copy_from_slice(head);
            self.chain_block(&block);
            data = rest;
        }

        self.buf[..data.len()].copy_from_slice(data);
        self.buf_len = data.len();
    }

    /// Close out the current message and return the full 16-byte MAC,
    /// leaving the state ready for the next message under the same key.
    ///
    /// RFC 4493 Section 2.4: a complete final block is masked with K1; a
    /// partial (or empty) one is padded with `0x80 00..00` and masked with
    /// K2. Either way the masked block goes through one last chained
    /// encryption.
    fn finalize(&mut self) -> Block {
        let n = self.buf_len;
        let mut block = [0u8; BLOCK_LEN];
        block[..n].copy_from_slice(&self.buf[..n]);

        if n == BLOCK_LEN {
            xor_block(&mut block, &self.subkeys.k1);
        } else {
            if let Some(pad) = block.get_mut(n) {
                *pad = 0x80;
            }
            xor_block(&mut block, &self.subkeys.k2);
        }

        xor_block(&mut block, &self.chain);
        self.cipher.encrypt_block(&mut block);

        self.chain = [0u8; BLOCK_LEN];
        self.buf.zeroize();
        self.buf_len = 0;

        block
    }
}

/// Map an arbitrary-length key to the 128-bit key the cipher needs
/// (RFC 4615). A 16-byte key is used as given; any other length is run
/// through AES-CMAC under the all-zero key and the resulting MAC becomes
/// the key. Normalization always uses AES, whatever family the instance
/// drives, matching the AES-CMAC-PRF-128 definition.
fn normalize_key(key: &[u8]) -> Block {
    if let Ok(k0) = Block::try_from(key) {
        return k0;
    }

    let mut prf = KeyedState::with_k0(CipherKind::Aes, &[0u8; BLOCK_LEN]);
    prf.absorb(key);
    prf.finalize()
}

/// Streaming CMAC instance.
///
/// An instance is bound to one cipher family for its whole life and is
/// either unkeyed (fresh from [`Cmac::new`]) or keyed. Keying happens at
/// most once per message sequence: [`Cmac::digest`] resets the message
/// state but keeps the derived subkeys, so re-keying is only needed to
/// change the key itself.
///
/// Mutating methods take `&mut self`; a shared instance needs external
/// synchronization around the whole update-then-digest sequence.
///
/// # Example
/// ```
/// use arc_cmac::{CipherKind, Cmac};
///
/// let mut mac = Cmac::with_key(CipherKind::Aes, b"key of any length");
/// mac.update(b"hello ")?.update(b"world")?;
/// let tag = mac.digest()?;
/// assert_eq!(tag.len(), 16);
/// # Ok::<(), arc_cmac::CmacError>(())
/// ```
#[derive(Clone)]
pub struct Cmac {
    kind: CipherKind,
    state: Option<KeyedState>,
}

impl Cmac {
    /// Create an unkeyed instance for the given cipher family.
    ///
    /// [`Cmac::update`] and [`Cmac::digest`] fail with
    /// [`CmacError::NoKeySet`] until [`Cmac::set_key`] is called.
    #[must_use]
    pub fn new(kind: CipherKind) -> Self {
        Cmac { kind, state: None }
    }

    /// Create a keyed instance in one step.
    #[must_use]
    pub fn with_key(kind: CipherKind, key: &[u8]) -> Self {
        let mut cmac = Cmac::new(kind);
        cmac.set_key(key);
        cmac
    }

    /// Install a key, deriving fresh subkeys and discarding any buffered
    /// message bytes.
    ///
    /// Keys of any length are accepted, including empty: a 16-byte key is
    /// used directly, every other length is normalized first (RFC 4615).
    #[instrument(level = "debug", skip(self, key), fields(cipher = %self.kind, key_len = key.len()))]
    pub fn set_key(&mut self, key: &[u8]) {
        self.state = Some(KeyedState::new(self.kind, key));
    }

    /// Absorb message bytes, returning `self` so calls can be chained.
    ///
    /// Arbitrary chunkings of a message are equivalent: any sequence of
    /// `update` calls produces the same digest as a single call with the
    /// concatenated bytes.
    ///
    /// # Errors
    /// Returns [`CmacError::NoKeySet`] if no key has been installed.
    pub fn update(&mut self, data: &[u8]) -> Result<&mut Self> {
        let state = self.state.as_mut().ok_or(CmacError::NoKeySet)?;
        state.absorb(data);
        Ok(self)
    }

    /// Compute the full 16-byte MAC over everything absorbed since the key
    /// was set or the previous digest.
    ///
    /// The instance stays keyed: the message buffer and chaining state are
    /// reset, so the next `update` starts a fresh message under the same
    /// key.
    ///
    /// # Errors
    /// Returns [`CmacError::NoKeySet`] if no key has been installed.
    pub fn digest(&mut self) -> Result<Block> {
        let state = self.state.as_mut().ok_or(CmacError::NoKeySet)?;
        Ok(state.finalize())
    }

    /// Compute the MAC truncated to its first `length` bytes (RFC 4494).
    ///
    /// Resets the message state exactly like [`Cmac::digest`]. A rejected
    /// `length` leaves the accumulated message untouched.
    ///
    /// # Errors
    /// Returns [`CmacError::NoKeySet`] if no key has been installed, or
    /// [`CmacError::InvalidLength`] if `length` is outside `1..=16`.
    pub fn digest_truncated(&mut self, length: usize) -> Result<Vec<u8>> {
        let state = self.state.as_mut().ok_or(CmacError::NoKeySet)?;
        if length == 0 || length > BLOCK_LEN {
            return Err(CmacError::InvalidLength { actual: length });
        }

        let mac = state.finalize();
        Ok(mac[..length].to_vec())
    }

    /// Cipher family this instance drives.
    #[must_use]
    pub const fn cipher(&self) -> CipherKind {
        self.kind
    }

    /// Block size in bytes of the underlying cipher.
    #[must_use]
    pub const fn block_length(&self) -> usize {
        BLOCK_LEN
    }

    /// Maximum digest length in bytes.
    #[must_use]
    pub const fn digest_max_length(&self) -> usize {
        BLOCK_LEN
    }

    /// Human-readable algorithm name, e.g. `"CMAC with AES"`.
    #[must_use]
    pub fn name(&self) -> String {
        format!("CMAC with {}", self.kind)
    }
}

impl fmt::Debug for Cmac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cmac")
            .field("cipher", &self.kind)
            .field("keyed", &self.state.is_some())
            .finish()
    }
}

/// Compute a CMAC in one call.
///
/// Equivalent to keying a fresh instance, absorbing `data`, and taking the
/// full digest. The key may have any length (RFC 4615).
///
/// # Example
/// ```
/// use arc_cmac::{cmac, CipherKind};
///
/// let tag = cmac(CipherKind::Aes, b"key of any length", b"message");
/// assert_eq!(tag.len(), 16);
/// ```
#[must_use]
#[instrument(level = "debug", skip(key, data), fields(key_len = key.len(), data_len = data.len()))]
pub fn cmac(kind: CipherKind, key: &[u8], data: &[u8]) -> Block {
    let mut state = KeyedState::new(kind, key);
    state.absorb(data);
    state.finalize()
}

/// Compute a CMAC truncated to its first `length` bytes, in one call.
///
/// # Errors
/// Returns [`CmacError::InvalidLength`] if `length` is outside `1..=16`.
#[instrument(level = "debug", skip(key, data), fields(key_len = key.len(), data_len = data.len()))]
pub fn cmac_truncated(
    kind: CipherKind,
    key: &[u8],
    data: &[u8],
    length: usize,
) -> Result<Vec<u8>> {
    if length == 0 || length > BLOCK_LEN {
        return Err(CmacError::InvalidLength { actual: length });
    }

    let mac = cmac(kind, key, data);
    Ok(mac[..length].to_vec())
}

/// Verify a (possibly truncated) CMAC tag in constant time.
///
/// Recomputes the MAC over `data` and compares the leading `tag.len()`
/// bytes against `tag` with a constant-time comparison. Tags outside 1 to
/// 16 bytes never verify.
///
/// # Example
/// ```
/// use arc_cmac::{cmac, verify_cmac, CipherKind};
///
/// let tag = cmac(CipherKind::Camellia, b"key", b"message");
/// assert!(verify_cmac(CipherKind::Camellia, b"key", b"message", &tag));
/// assert!(!verify_cmac(CipherKind::Camellia, b"key", b"tampered", &tag));
/// ```
#[must_use]
pub fn verify_cmac(kind: CipherKind, key: &[u8], data: &[u8], tag: &[u8]) -> bool {
    use subtle::ConstantTimeEq;

    if tag.is_empty() || tag.len() > BLOCK_LEN {
        return false;
    }

    let expected = cmac(kind, key, data);
    expected[..tag.len()].ct_eq(tag).into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests use unwrap for simplicity
mod tests {
    use hex_literal::hex;

    use super::*;

    const KEY: [u8; 16] = hex!("2b7e151628aed2a6abf7158809cf4f3c");
    const MSG: [u8; 64] = hex!(
        "6bc1bee22e409f96e93d7e117393172a"
        "ae2d8a571e03ac9c9eb76fac45af8e51"
        "30c81c46a35ce411e5fbc1191a0a52ef"
        "f69f2445df4f9b17ad2b417be66c3710"
    );

    // RFC 4493 Section 4, Examples 1-4
    #[test]
    fn test_rfc4493_example_vectors() {
        assert_eq!(
            cmac(CipherKind::Aes, &KEY, b""),
            hex!("bb1d6929e95937287fa37d129b756746")
        );
        assert_eq!(
            cmac(CipherKind::Aes, &KEY, &MSG[..16]),
            hex!("070a16b46b4d4144f79bdd9dd04a287c")
        );
        assert_eq!(
            cmac(CipherKind::Aes, &KEY, &MSG[..40]),
            hex!("dfa66747de9ae63030ca32611497c827")
        );
        assert_eq!(
            cmac(CipherKind::Aes, &KEY, &MSG),
            hex!("51f0bebf7e3b9d92fc49741779363cfe")
        );
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let mut mac = Cmac::with_key(CipherKind::Aes, &KEY);
        mac.update(&MSG[..10])
            .unwrap()
            .update(&MSG[10..16])
            .unwrap()
            .update(&MSG[16..16])
            .unwrap()
            .update(&MSG[16..47])
            .unwrap()
            .update(&MSG[47..])
            .unwrap();

        assert_eq!(mac.digest().unwrap(), cmac(CipherKind::Aes, &KEY, &MSG));
    }

    #[test]
    fn test_pending_block_is_not_flushed_early() {
        let mut mac = Cmac::with_key(CipherKind::Aes, &KEY);

        // Exactly one block stays buffered: it might be the final block.
        mac.update(&MSG[..16]).unwrap();
        assert_eq!(mac.state.as_ref().unwrap().buf_len, 16);

        // One more byte proves it was not final and flushes it.
        mac.update(&MSG[16..17]).unwrap();
        assert_eq!(mac.state.as_ref().unwrap().buf_len, 1);

        // A block-aligned bulk write again leaves a full block pending.
        let mut mac = Cmac::with_key(CipherKind::Aes, &KEY);
        mac.update(&MSG[..32]).unwrap();
        assert_eq!(mac.state.as_ref().unwrap().buf_len, 16);
    }

    #[test]
    fn test_digest_leaves_the_instance_keyed() {
        let mut mac = Cmac::with_key(CipherKind::Aes, &KEY);
        mac.update(b"first message").unwrap();
        let first = mac.digest().unwrap();
        assert_eq!(first, cmac(CipherKind::Aes, &KEY, b"first message"));

        // Nothing buffered now, so the next digest covers the empty message.
        assert_eq!(mac.digest().unwrap(), cmac(CipherKind::Aes, &KEY, b""));

        mac.update(b"second message").unwrap();
        assert_eq!(
            mac.digest().unwrap(),
            cmac(CipherKind::Aes, &KEY, b"second message")
        );
    }

    #[test]
    fn test_update_and_digest_require_a_key() {
        let mut mac = Cmac::new(CipherKind::Aes);
        assert_eq!(mac.update(b"data").unwrap_err(), CmacError::NoKeySet);
        assert_eq!(mac.digest().unwrap_err(), CmacError::NoKeySet);
        assert_eq!(mac.digest_truncated(8).unwrap_err(), CmacError::NoKeySet);
        // The missing key is reported even when the length is also bad.
        assert_eq!(mac.digest_truncated(0).unwrap_err(), CmacError::NoKeySet);
    }

    #[test]
    fn test_invalid_lengths_are_rejected_without_touching_state() {
        let mut mac = Cmac::with_key(CipherKind::Aes, &KEY);
        mac.update(&MSG[..16]).unwrap();

        assert_eq!(
            mac.digest_truncated(0).unwrap_err(),
            CmacError::InvalidLength { actual: 0 }
        );
        assert_eq!(
            mac.digest_truncated(17).unwrap_err(),
            CmacError::InvalidLength { actual: 17 }
        );

        // The failed calls left the buffered message intact.
        assert_eq!(
            mac.digest().unwrap(),
            hex!("070a16b46b4d4144f79bdd9dd04a287c")
        );
    }

    #[test]
    fn test_truncated_digest_is_a_prefix_of_the_full_digest() {
        let full = cmac(CipherKind::Aes, &KEY, &MSG);
        for length in 1..=BLOCK_LEN {
            let truncated = cmac_truncated(CipherKind::Aes, &KEY, &MSG, length).unwrap();
            assert_eq!(truncated, full[..length].to_vec());
        }
    }

    #[test]
    fn test_normalization_matches_explicit_zero_key_cmac() {
        let long_key = b"a key much longer than sixteen bytes";
        let k0 = cmac(CipherKind::Aes, &[0u8; BLOCK_LEN], long_key);

        assert_eq!(
            cmac(CipherKind::Aes, long_key, &MSG),
            cmac(CipherKind::Aes, &k0, &MSG)
        );
    }

    #[test]
    fn test_normalization_uses_aes_for_every_family() {
        let short_key = b"short";
        let k0 = cmac(CipherKind::Aes, &[0u8; BLOCK_LEN], short_key);

        for kind in CipherKind::ALL {
            assert_eq!(cmac(kind, short_key, b"msg"), cmac(kind, &k0, b"msg"));
        }
    }

    #[test]
    fn test_empty_key_is_normalized_like_any_other() {
        let k0 = cmac(CipherKind::Aes, &[0u8; BLOCK_LEN], b"");
        assert_eq!(cmac(CipherKind::Aes, b"", &MSG), cmac(CipherKind::Aes, &k0, &MSG));

        let mut mac = Cmac::new(CipherKind::Aes);
        mac.set_key(b"");
        assert_eq!(mac.digest().unwrap(), cmac(CipherKind::Aes, b"", b""));
    }

    #[test]
    fn test_rekeying_discards_buffered_message_bytes() {
        let mut mac = Cmac::with_key(CipherKind::Aes, &KEY);
        mac.update(b"doomed bytes").unwrap();
        mac.set_key(&KEY);
        assert_eq!(mac.digest().unwrap(), cmac(CipherKind::Aes, &KEY, b""));
    }

    #[test]
    fn test_partial_and_complete_final_blocks_diverge() {
        // 15, 16, and 17 byte messages exercise the padded, complete, and
        // chained-then-padded final block paths.
        let tags: Vec<Block> = [15, 16, 17]
            .iter()
            .map(|&len| cmac(CipherKind::Aes, &KEY, &MSG[..len]))
            .collect();

        assert_ne!(tags[0], tags[1]);
        assert_ne!(tags[1], tags[2]);

        for (i, &len) in [15usize, 16, 17].iter().enumerate() {
            let mut mac = Cmac::with_key(CipherKind::Aes, &KEY);
            mac.update(&MSG[..len]).unwrap();
            assert_eq!(mac.digest().unwrap(), tags[i]);
        }
    }

    #[test]
    fn test_cloned_instances_continue_independently() {
        let expected = cmac(CipherKind::Aes, &KEY, &MSG);

        let mut original = Cmac::with_key(CipherKind::Aes, &KEY);
        original.update(&MSG[..20]).unwrap();
        let mut fork = original.clone();

        original.update(&MSG[20..]).unwrap();
        fork.update(&MSG[20..]).unwrap();

        assert_eq!(original.digest().unwrap(), expected);
        assert_eq!(fork.digest().unwrap(), expected);
    }

    #[test]
    fn test_families_produce_distinct_tags() {
        let aes = cmac(CipherKind::Aes, &KEY, &MSG);
        let aria = cmac(CipherKind::Aria, &KEY, &MSG);
        let camellia = cmac(CipherKind::Camellia, &KEY, &MSG);

        assert_ne!(aes, aria);
        assert_ne!(aria, camellia);
        assert_ne!(aes, camellia);
    }

    #[test]
    fn test_verify_accepts_truncated_tags_and_rejects_bad_ones() {
        let full = cmac(CipherKind::Aes, &KEY, &MSG);

        assert!(verify_cmac(CipherKind::Aes, &KEY, &MSG, &full));
        assert!(verify_cmac(CipherKind::Aes, &KEY, &MSG, &full[..12]));
        assert!(verify_cmac(CipherKind::Aes, &KEY, &MSG, &full[..1]));

        let mut tampered = full;
        tampered[0] ^= 0x01;
        assert!(!verify_cmac(CipherKind::Aes, &KEY, &MSG, &tampered));

        assert!(!verify_cmac(CipherKind::Aes, &KEY, &MSG, b""));
        assert!(!verify_cmac(CipherKind::Aes, &KEY, &MSG, &[0u8; 17]));
        assert!(!verify_cmac(CipherKind::Aes, &KEY, b"other data", &full));
    }

    #[test]
    fn test_accessors_report_the_fixed_geometry() {
        let mac = Cmac::new(CipherKind::Aria);
        assert_eq!(mac.cipher(), CipherKind::Aria);
        assert_eq!(mac.block_length(), 16);
        assert_eq!(mac.digest_max_length(), 16);
        assert_eq!(mac.name(), "CMAC with ARIA");

        let debug = format!("{:?}", Cmac::with_key(CipherKind::Aes, &KEY));
        assert!(debug.contains("keyed: true"));
        assert!(!debug.contains("2b7e1516"));
    }
}
