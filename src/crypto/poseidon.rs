use alloy_primitives::{B256, U256};
use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use light_poseidon::{Poseidon, PoseidonHasher};
use sha2::{Digest, Sha256};

/// Convert B256 to BN254 field element, reducing mod the field order.
fn b256_to_fr(value: B256) -> Fr {
    Fr::from_be_bytes_mod_order(value.as_ref())
}

/// Convert BN254 field element to B256.
fn fr_to_b256(value: Fr) -> B256 {
    let big_int = value.into_bigint();
    let bytes = big_int.to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    B256::from(out)
}

/// Encode a u64 as a big-endian B256 (always below the field modulus).
pub fn u64_to_b256(value: u64) -> B256 {
    B256::from(U256::from(value))
}

/// Poseidon hash with 1 input (for product identity derivation).
pub fn poseidon1(a: B256) -> B256 {
    let mut hasher = Poseidon::<Fr>::new_circom(1).expect("Failed to create Poseidon hasher");
    let result = hasher
        .hash(&[b256_to_fr(a)])
        .expect("Failed to compute Poseidon hash");
    fr_to_b256(result)
}

/// Poseidon hash with 2 inputs (for Merkle tree nodes and price leaves).
pub fn poseidon2(a: B256, b: B256) -> B256 {
    let mut hasher = Poseidon::<Fr>::new_circom(2).expect("Failed to create Poseidon hasher");
    let inputs = [b256_to_fr(a), b256_to_fr(b)];
    let result = hasher
        .hash(&inputs)
        .expect("Failed to compute Poseidon hash");
    fr_to_b256(result)
}

/// Poseidon hash with 6 inputs (for the purchase commitment).
pub fn poseidon6(a: B256, b: B256, c: B256, d: B256, e: B256, f: B256) -> B256 {
    let mut hasher = Poseidon::<Fr>::new_circom(6).expect("Failed to create Poseidon hasher");
    let inputs = [
        b256_to_fr(a),
        b256_to_fr(b),
        b256_to_fr(c),
        b256_to_fr(d),
        b256_to_fr(e),
        b256_to_fr(f),
    ];
    let result = hasher
        .hash(&inputs)
        .expect("Failed to compute Poseidon hash");
    fr_to_b256(result)
}

/// Derive a product's field identity from its catalog id.
///
/// `product_hash = poseidon1(sha256(id) mod p)` — the SHA-256 digest is
/// reduced into the field before hashing, so any id length is safe.
pub fn product_hash(id: &str) -> B256 {
    let digest = Sha256::digest(id.as_bytes());
    let reduced = Fr::from_be_bytes_mod_order(&digest);
    poseidon1(fr_to_b256(reduced))
}

/// Derive the price-dependent Merkle leaf for a product.
///
/// `leaf_hash = poseidon2(product_hash, price)`
pub fn leaf_hash(product_hash: B256, price: u64) -> B256 {
    poseidon2(product_hash, u64_to_b256(price))
}
