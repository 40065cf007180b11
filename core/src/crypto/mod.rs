//! Public-key arithmetic: secp256k1 point decompression and the
//! Keccak-256 address derivation built on it.

pub mod keys;

pub use keys::{
    address_from_decompressed, address_from_key, address_from_public_key, check_on_curve,
    decompress, decompress_key,
};
