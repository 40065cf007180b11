use std::sync::OnceLock;

use num_bigint::BigUint;
use sha3::{Digest, Keccak256};

use crate::error::{GrantsError, Result};
use crate::types::{Address, CompressedPublicKey, DecompressedPublicKey, ADDRESS_LEN};

/// secp256k1 field prime `p = 2^256 - 2^32 - 977`.
const FIELD_PRIME_BE: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe, 0xff, 0xff, 0xfc, 0x2f,
];

/// Curve equation constant: `y^2 = x^3 + 7`.
const CURVE_B: u32 = 7;

struct Field {
    p: BigUint,
    b: BigUint,
    three: BigUint,
    /// `(p + 1) / 4`; square root exponent, valid because `p ≡ 3 (mod 4)`
    sqrt_exp: BigUint,
}

fn field() -> &'static Field {
    static FIELD: OnceLock<Field> = OnceLock::new();
    FIELD.get_or_init(|| {
        let p = BigUint::from_bytes_be(&FIELD_PRIME_BE);
        let sqrt_exp = (&p + 1u32) >> 2usize;
        Field {
            p,
            b: BigUint::from(CURVE_B),
            three: BigUint::from(3u32),
            sqrt_exp,
        }
    })
}

/// Left-pad a field element into a 32-byte big-endian buffer.
fn to_be32(value: &BigUint) -> [u8; 32] {
    let bytes = value.to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

// ---------------------------------------------------------------------------
// Decompression
// ---------------------------------------------------------------------------

/// Decompress raw key bytes into the 64-byte `x ‖ y` form.
///
/// Fails with `InvalidPublicKeyLength` unless the input is exactly 33 bytes
/// (so an already-decompressed 64-byte key is rejected) and with
/// `InvalidPublicKeyPrefix` unless the first byte is 0x02 or 0x03.
pub fn decompress(key: &[u8]) -> Result<DecompressedPublicKey> {
    decompress_key(&CompressedPublicKey::from_slice(key)?)
}

/// Recover y from x: `y = (x^3 + 7)^((p+1)/4) mod p`, then pick `y` or
/// `p - y` so the parity matches the prefix (0x02 even, 0x03 odd).
///
/// Only length and prefix are checked. An x with no matching point still
/// yields a 64-byte value; use [`check_on_curve`] to reject such keys.
pub fn decompress_key(key: &CompressedPublicKey) -> Result<DecompressedPublicKey> {
    let f = field();
    let x = BigUint::from_bytes_be(key.x_bytes());
    let (_, mut y) = candidate_y(f, &x);
    if y.bit(0) != key.wants_odd_y() {
        y = &f.p - &y;
    }

    let mut x_out = [0u8; 32];
    x_out.copy_from_slice(key.x_bytes());
    Ok(DecompressedPublicKey::from_coordinates(x_out, to_be32(&y)))
}

/// `(x^3 + 7 mod p, candidate root)` with `x` reduced mod p.
fn candidate_y(f: &Field, x: &BigUint) -> (BigUint, BigUint) {
    let rhs = (x.modpow(&f.three, &f.p) + &f.b) % &f.p;
    let y = rhs.modpow(&f.sqrt_exp, &f.p);
    (rhs, y)
}

/// Fails with `InvalidCurvePoint` when `x >= p` or `x^3 + 7` has no square
/// root mod p, i.e. the key names no secp256k1 point.
pub fn check_on_curve(key: &CompressedPublicKey) -> Result<()> {
    let f = field();
    let x = BigUint::from_bytes_be(key.x_bytes());
    if x >= f.p {
        return Err(GrantsError::InvalidCurvePoint);
    }
    let (rhs, y) = candidate_y(f, &x);
    if (&y * &y) % &f.p != rhs {
        return Err(GrantsError::InvalidCurvePoint);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Address derivation
// ---------------------------------------------------------------------------

/// Low 20 bytes of `keccak256(x ‖ y)`.
pub fn address_from_decompressed(key: &DecompressedPublicKey) -> Address {
    let hash = Keccak256::digest(key.as_bytes());
    let mut out = [0u8; ADDRESS_LEN];
    out.copy_from_slice(&hash[hash.len() - ADDRESS_LEN..]);
    Address(out)
}

pub fn address_from_key(key: &CompressedPublicKey) -> Result<Address> {
    Ok(address_from_decompressed(&decompress_key(key)?))
}

/// Derive the payable address of raw compressed key bytes. Same failure
/// modes as [`decompress`].
pub fn address_from_public_key(key: &[u8]) -> Result<Address> {
    Ok(address_from_decompressed(&decompress(key)?))
}
