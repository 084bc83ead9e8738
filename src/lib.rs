#![deny(clippy::pedantic)]
#![deny(warnings)]
#![deny(missing_docs)]
#![doc = include_str!("../README.md")]


use core::fmt;

// Functionality map
//
// Modular word arithmetic, stripe operations, scratch pool   --> helpers.rs
// RNG adapter, seeded SHAKE-256 PRNG, PRNG factory           --> rng.rs
// Negacyclic NTT tables and transforms                       --> ntt.rs
// Ternary / Gaussian / binomial / uniform samplers           --> sampling.rs
// Moduli, encryption parameters, context                     --> params.rs
// RNS ciphertext container, key wrappers, seed records       --> ciphertext.rs
// Zero-encryptors, seed expansion, decryption-to-noise       --> rlwe.rs
// Secret/public key generation                               --> keys.rs

mod ciphertext;
mod helpers;
mod keys;
mod ntt;
mod params;
mod rlwe;
mod rng;
mod sampling;

pub use crate::ciphertext::{Ciphertext, PublicKey, SecretKey};
pub use crate::keys::{generate_public_key, generate_secret_key};
pub use crate::params::{Context, ContextData, EncryptionParameters, Modulus, ParmsId};
pub use crate::rlwe::{decrypt_zero, encrypt_zero_asymmetric, encrypt_zero_symmetric, expand_seed};
pub use crate::rng::{random_u32, random_u64, Seed, ShakePrng, ShakePrngFactory, SEED_BYTE_COUNT};
pub use crate::sampling::{
    sample_poly_cbd, sample_poly_normal, sample_poly_ternary, sample_poly_uniform,
};

/// Default standard deviation of the error distribution.
pub const NOISE_STANDARD_DEVIATION: f64 = 3.2;

/// Default width multiplier: errors are clipped to this many standard deviations.
pub const NOISE_DISTRIBUTION_WIDTH_MULTIPLIER: f64 = 6.0;

/// Default hard bound of the error distribution.
pub const NOISE_MAX_DEVIATION: f64 = NOISE_STANDARD_DEVIATION * NOISE_DISTRIBUTION_WIDTH_MULTIPLIER;

/// First word of a seed-compressed `c_1`. Cannot collide with a polynomial
/// coefficient because every supported modulus is below 2^62.
pub const SEED_SENTINEL: u64 = 0xFFFF_FFFF_FFFF_FFFF;


/// Everything that can go wrong inside this crate.
///
/// All operations propagate errors to the caller; nothing is recovered
/// internally. On failure any output the caller supplied is memory-safe but
/// otherwise unspecified and must be discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// An argument does not match the encryption parameters, or the parameter
    /// structure itself is malformed.
    InvalidArgument(&'static str),
    /// A sampler was invoked with parameters outside its supported range.
    UnsupportedParameter(&'static str),
    /// The underlying entropy source failed.
    RngFailure,
    /// A scratch or destination buffer could not be allocated.
    AllocationFailure,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Error::UnsupportedParameter(msg) => write!(f, "unsupported parameter: {msg}"),
            Error::RngFailure => write!(f, "random number generator failure"),
            Error::AllocationFailure => write!(f, "allocation failure"),
        }
    }
}

impl std::error::Error for Error {}
