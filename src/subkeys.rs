#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
// JUSTIFICATION: GF(2^128) doubling arithmetic.
// - Bitwise shifts on u8 by a constant amount cannot overflow
// - Carry values are always 0 or 1
#![allow(clippy::arithmetic_side_effects)]

//! CMAC subkey derivation (RFC 4493 Section 2.3, NIST SP 800-38B Section 6.1).
//!
//! Both subkeys come from a single encryption of the all-zero block followed
//! by doubling in GF(2^128): a left shift by one bit with a conditional XOR
//! of the reduction constant.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cipher::{Block, BlockCipher, BLOCK_LEN};

/// Reduction constant for doubling in GF(2^128), from the field polynomial
/// x^128 + x^7 + x^2 + x + 1.
const RB: Block = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x87,
];

/// XOR `b` into `a` in place.
#[inline(always)]
pub(crate) fn xor_block(a: &mut Block, b: &Block) {
    for (a_byte, b_byte) in a.iter_mut().zip(b.iter()) {
        *a_byte ^= b_byte;
    }
}

/// Left shift a 128-bit block by 1 bit.
///
/// Returns the shifted block and the MSB that was shifted out (0 or 1).
#[inline(always)]
fn left_shift_block(block: &Block) -> (Block, u8) {
    let mut result = [0u8; BLOCK_LEN];
    let mut carry = 0u8;

    // Carry propagates from the least significant byte upward.
    for (i, &byte) in block.iter().enumerate().rev() {
        if let Some(r) = result.get_mut(i) {
            *r = (byte << 1) | carry;
        }
        carry = (byte >> 7) & 1;
    }

    (result, carry)
}

/// Multiply a block by x in GF(2^128).
fn double_block(block: &Block) -> Block {
    let (mut doubled, msb) = left_shift_block(block);
    if msb == 1 {
        xor_block(&mut doubled, &RB);
    }
    doubled
}

/// Subkeys K1 (complete final block) and K2 (padded final block).
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct Subkeys {
    pub(crate) k1: Block,
    pub(crate) k2: Block,
}

impl Subkeys {
    /// Derive both subkeys from an already-keyed cipher.
    ///
    /// RFC 4493 Section 2.3: `L = E_K(0^128)`, `K1 = double(L)`,
    /// `K2 = double(K1)`.
    pub(crate) fn derive(cipher: &BlockCipher) -> Self {
        let mut l = [0u8; BLOCK_LEN];
        cipher.encrypt_block(&mut l);

        let k1 = double_block(&l);
        let k2 = double_block(&k1);
        l.zeroize();

        Subkeys { k1, k2 }
    }
}
