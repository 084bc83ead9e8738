use crate::helpers::{barrett_reduce_64, ensure};
use crate::params::{EncryptionParameters, Modulus};
use crate::rng::{random_u32, random_u64};
use crate::Error;
use rand_core::RngCore;
use rand_distr::{Distribution, Normal};


/// Write a small signed value into every RNS stripe of one coefficient slot,
/// lifting negatives by the stripe modulus.
#[allow(clippy::cast_sign_loss)]
fn store_signed(
    destination: &mut [u64], coeff_count: usize, coeff_modulus: &[Modulus], index: usize,
    value: i64,
) {
    for (j, modulus) in coeff_modulus.iter().enumerate() {
        destination[j * coeff_count + index] = if value < 0 {
            modulus.value() - value.unsigned_abs()
        } else {
            value as u64
        };
    }
}


/// Fill `destination` with a polynomial drawn uniformly from the ternary
/// set `{-1, 0, 1}`, in coefficient form under the RNS layout.
///
/// # Errors
/// Returns `Error::RngFailure` if the generator fails.
pub fn sample_poly_ternary(
    rng: &mut impl RngCore, parms: &EncryptionParameters, destination: &mut [u64],
) -> Result<(), Error> {
    let coeff_count = parms.poly_modulus_degree();
    let coeff_modulus = parms.coeff_modulus();
    debug_assert_eq!(destination.len(), coeff_count * coeff_modulus.len());

    for i in 0..coeff_count {
        // 2^32 ≡ 1 (mod 3): rejecting the single top value leaves an exact
        // multiple of 3, so the residue below is bias-free.
        let r = loop {
            let x = random_u32(rng)?;
            if x != u32::MAX {
                break x % 3;
            }
        };
        for (j, modulus) in coeff_modulus.iter().enumerate() {
            destination[j * coeff_count + i] = match r {
                0 => modulus.value() - 1,
                1 => 0,
                _ => 1,
            };
        }
    }
    Ok(())
}


/// Fill `destination` with a polynomial whose coefficients are drawn from a
/// normal distribution with the parameter set's standard deviation, clipped
/// to its max deviation, truncated toward zero, in coefficient form under
/// the RNS layout.
///
/// A max deviation of (effectively) zero short-circuits to the zero
/// polynomial.
///
/// # Errors
/// Returns `Error::InvalidArgument` if the standard deviation cannot
/// parameterize a normal distribution.
#[allow(clippy::cast_possible_truncation)]
pub fn sample_poly_normal(
    rng: &mut impl RngCore, parms: &EncryptionParameters, destination: &mut [u64],
) -> Result<(), Error> {
    let coeff_count = parms.poly_modulus_degree();
    let coeff_modulus = parms.coeff_modulus();
    debug_assert_eq!(destination.len(), coeff_count * coeff_modulus.len());

    let max_deviation = parms.noise_max_deviation();
    if max_deviation < f64::EPSILON {
        destination.fill(0);
        return Ok(());
    }
    let normal = Normal::new(0.0, parms.noise_standard_deviation())
        .map_err(|_| Error::InvalidArgument("noise standard deviation is out of range"))?;

    for i in 0..coeff_count {
        let noise = loop {
            let candidate: f64 = normal.sample(rng);
            if candidate.abs() <= max_deviation {
                break candidate;
            }
        };
        store_signed(destination, coeff_count, coeff_modulus, i, noise as i64);
    }
    Ok(())
}


/// Fill `destination` with a polynomial drawn from a centered binomial
/// distribution approximating a Gaussian of standard deviation 3.2, in
/// coefficient form under the RNS layout.
///
/// Each coefficient consumes 6 random bytes; masking the third and sixth
/// byte to 5 bits caps each side's popcount at 21, so the support is
/// exactly `[-21, 21]`.
///
/// # Errors
/// Returns `Error::UnsupportedParameter`, before touching `destination`, if
/// the parameter set's standard deviation is not 3.2; `Error::RngFailure` if
/// the generator fails.
pub fn sample_poly_cbd(
    rng: &mut impl RngCore, parms: &EncryptionParameters, destination: &mut [u64],
) -> Result<(), Error> {
    ensure!(
        (parms.noise_standard_deviation() - 3.2).abs() < f64::EPSILON,
        Error::UnsupportedParameter("centered binomial sampling requires standard deviation 3.2")
    );
    let coeff_count = parms.poly_modulus_degree();
    let coeff_modulus = parms.coeff_modulus();
    debug_assert_eq!(destination.len(), coeff_count * coeff_modulus.len());

    for i in 0..coeff_count {
        let mut x = [0u8; 6];
        rng.try_fill_bytes(&mut x).map_err(|_| Error::RngFailure)?;
        x[2] &= 0x1F;
        x[5] &= 0x1F;
        let ones = count_ones(x[0]) + count_ones(x[1]) + count_ones(x[2]);
        let neg_ones = count_ones(x[3]) + count_ones(x[4]) + count_ones(x[5]);
        let noise = i64::from(ones) - i64::from(neg_ones);
        store_signed(destination, coeff_count, coeff_modulus, i, noise);
    }
    Ok(())
}


// Count u8 ones in constant time
fn count_ones(x: u8) -> u32 {
    let x = u32::from(x);
    let x = (x & 0x55) + ((x >> 1) & 0x55);
    let x = (x & 0x33) + ((x >> 2) & 0x33);
    (x & 0x0F) + ((x >> 4) & 0x0F)
}


/// Fill `destination` with a polynomial drawn uniformly from
/// `Z_{q_0} × … × Z_{q_{L-1}}`, in coefficient form under the RNS layout.
///
/// Stripe `j` rejects 64-bit draws at or above the largest multiple of
/// `q_j`, `2^64 - (2^64 mod q_j)`, then Barrett-reduces the accepted draw;
/// the rejection region is exactly the biased tail, so the residues are
/// uniform.
///
/// # Errors
/// Returns `Error::RngFailure` if the generator fails.
pub fn sample_poly_uniform(
    rng: &mut impl RngCore, parms: &EncryptionParameters, destination: &mut [u64],
) -> Result<(), Error> {
    let coeff_count = parms.poly_modulus_degree();
    let coeff_modulus = parms.coeff_modulus();
    debug_assert_eq!(destination.len(), coeff_count * coeff_modulus.len());

    for (j, modulus) in coeff_modulus.iter().enumerate() {
        // u64::MAX - (u64::MAX mod q) == 2^64 - (2^64 mod q) for odd q
        let max_multiple = u64::MAX - barrett_reduce_64(u64::MAX, modulus);
        for dest in &mut destination[j * coeff_count..(j + 1) * coeff_count] {
            let r = loop {
                let r = random_u64(rng)?;
                if r < max_multiple {
                    break r;
                }
            };
            *dest = barrett_reduce_64(r, modulus);
        }
    }
    Ok(())
}
