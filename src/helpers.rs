use crate::params::Modulus;
use crate::Error;
use subtle::{Choice, ConditionallySelectable};
use zeroize::Zeroizing;


/// If the condition is not met, return the given error. Borrowed from the `anyhow` crate.
macro_rules! ensure {
    ($cond:expr, $err:expr $(,)?) => {
        if !$cond {
            return Err($err);
        }
    };
}

pub(crate) use ensure; // make available throughout crate


/// High 64 bits of the 128-bit product of two words.
#[allow(clippy::cast_possible_truncation)]
#[inline]
pub(crate) fn mul_hi(a: u64, b: u64) -> u64 {
    ((u128::from(a) * u128::from(b)) >> 64) as u64
}


/// `a + b mod q` for canonical operands. The sum never overflows because
/// both operands are below 2^61.
#[inline]
pub(crate) fn add_mod(a: u64, b: u64, modulus: &Modulus) -> u64 {
    let sum = a + b;
    let (trial, borrow) = sum.overflowing_sub(modulus.value());
    u64::conditional_select(&trial, &sum, Choice::from(u8::from(borrow)))
}


/// `a - b mod q` for canonical operands.
#[inline]
pub(crate) fn sub_mod(a: u64, b: u64, modulus: &Modulus) -> u64 {
    let (diff, borrow) = a.overflowing_sub(b);
    let trial = diff.wrapping_add(modulus.value());
    u64::conditional_select(&diff, &trial, Choice::from(u8::from(borrow)))
}


/// `-a mod q` for a canonical operand.
#[inline]
pub(crate) fn negate_mod(operand: u64, modulus: &Modulus) -> u64 {
    let negated = modulus.value() - operand;
    u64::conditional_select(&0, &negated, Choice::from(u8::from(operand != 0)))
}


/// Barrett reduction of a full 64-bit word to `[0, q)`.
///
/// Uses the high limb of the precomputed `floor(2^128 / q)`, which equals
/// `floor(2^64 / q)`; the estimated quotient is off by at most one, so a
/// single conditional correction suffices.
#[inline]
pub(crate) fn barrett_reduce_64(input: u64, modulus: &Modulus) -> u64 {
    let quotient = mul_hi(input, modulus.const_ratio()[1]);
    let r = input.wrapping_sub(quotient.wrapping_mul(modulus.value()));
    let (trial, borrow) = r.overflowing_sub(modulus.value());
    u64::conditional_select(&trial, &r, Choice::from(u8::from(borrow)))
}


/// Barrett reduction of a 128-bit value to `[0, q)`.
///
/// Two rounds of limb products against the precomputed `floor(2^128 / q)`
/// recover the low word of the quotient; only the low word of the remainder
/// is needed since the result is below `2q`.
#[allow(clippy::cast_possible_truncation, clippy::similar_names)]
#[inline]
pub(crate) fn barrett_reduce_128(input: u128, modulus: &Modulus) -> u64 {
    let (lo, hi) = (input as u64, (input >> 64) as u64);
    let [ratio0, ratio1] = modulus.const_ratio();

    // Round 1
    let carry = mul_hi(lo, ratio0);
    let prod = u128::from(lo) * u128::from(ratio1);
    let (tmp1, over) = (prod as u64).overflowing_add(carry);
    let tmp3 = ((prod >> 64) as u64).wrapping_add(u64::from(over));

    // Round 2
    let prod = u128::from(hi) * u128::from(ratio0);
    let over = tmp1.overflowing_add(prod as u64).1;
    let carry = ((prod >> 64) as u64).wrapping_add(u64::from(over));

    // Low word of the quotient estimate, then the remainder
    let quotient = hi.wrapping_mul(ratio1).wrapping_add(tmp3).wrapping_add(carry);
    let r = lo.wrapping_sub(quotient.wrapping_mul(modulus.value()));
    let (trial, borrow) = r.overflowing_sub(modulus.value());
    u64::conditional_select(&trial, &r, Choice::from(u8::from(borrow)))
}


/// `a * b mod q` for canonical operands.
#[inline]
pub(crate) fn mul_mod(a: u64, b: u64, modulus: &Modulus) -> u64 {
    barrett_reduce_128(u128::from(a) * u128::from(b), modulus)
}


/// `base ^ exponent mod q` by square-and-multiply.
pub(crate) fn pow_mod(base: u64, mut exponent: u64, modulus: &Modulus) -> u64 {
    let mut base = barrett_reduce_64(base, modulus);
    let mut result = 1u64;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = mul_mod(result, base, modulus);
        }
        base = mul_mod(base, base, modulus);
        exponent >>= 1;
    }
    result
}


/// Pointwise product of two NTT-form stripes: `result[i] = a[i] * b[i] mod q`.
pub(crate) fn dyadic_product_coeffmod(
    operand1: &[u64], operand2: &[u64], modulus: &Modulus, result: &mut [u64],
) {
    debug_assert_eq!(operand1.len(), operand2.len());
    debug_assert_eq!(operand1.len(), result.len());
    for ((r, x), y) in result.iter_mut().zip(operand1).zip(operand2) {
        *r = mul_mod(*x, *y, modulus);
    }
}


/// In-place pointwise product: `result[i] *= operand[i] mod q`.
pub(crate) fn dyadic_product_assign(result: &mut [u64], operand: &[u64], modulus: &Modulus) {
    debug_assert_eq!(result.len(), operand.len());
    for (r, x) in result.iter_mut().zip(operand) {
        *r = mul_mod(*r, *x, modulus);
    }
}


/// In-place pointwise sum: `result[i] += operand[i] mod q`. Valid in either
/// representation.
pub(crate) fn add_poly_coeffmod(result: &mut [u64], operand: &[u64], modulus: &Modulus) {
    debug_assert_eq!(result.len(), operand.len());
    for (r, x) in result.iter_mut().zip(operand) {
        *r = add_mod(*r, *x, modulus);
    }
}


/// In-place pointwise negation: `result[i] = -result[i] mod q`. Valid in
/// either representation.
pub(crate) fn negate_poly_coeffmod(result: &mut [u64], modulus: &Modulus) {
    result.iter_mut().for_each(|r| *r = negate_mod(*r, modulus));
}


/// Zero-initialized `L * N` scratch polynomial, wiped on drop. Allocation
/// failure surfaces as an error instead of aborting.
pub(crate) fn allocate_poly(
    coeff_modulus_size: usize, coeff_count: usize,
) -> Result<Zeroizing<Vec<u64>>, Error> {
    let total = coeff_modulus_size.checked_mul(coeff_count).ok_or(Error::AllocationFailure)?;
    let mut data = Vec::new();
    data.try_reserve_exact(total).map_err(|_| Error::AllocationFailure)?;
    data.resize(total, 0);
    Ok(Zeroizing::new(data))
}


#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::{RngCore, SeedableRng};

    fn moduli() -> Vec<Modulus> {
        [3u64, 17, 97, 12289, 65_537, 0x7e0_0001, (1 << 61) - 1]
            .iter()
            .map(|q| Modulus::new(*q).unwrap())
            .collect()
    }

    #[test]
    fn word_arithmetic_matches_wide_reference() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(42);
        for modulus in moduli() {
            let q = modulus.value();
            for _ in 0..200 {
                let a = rng.next_u64() % q;
                let b = rng.next_u64() % q;
                assert_eq!(add_mod(a, b, &modulus), (a + b) % q);
                assert_eq!(sub_mod(a, b, &modulus), (a + q - b) % q);
                assert_eq!(negate_mod(a, &modulus), (q - a) % q);
                let wide = u128::from(a) * u128::from(b);
                assert_eq!(u128::from(mul_mod(a, b, &modulus)), wide % u128::from(q));
            }
        }
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn barrett_reduces_full_range() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(7);
        for modulus in moduli() {
            let q = modulus.value();
            assert_eq!(barrett_reduce_64(u64::MAX, &modulus), u64::MAX % q);
            assert_eq!(barrett_reduce_128(u128::MAX, &modulus), (u128::MAX % u128::from(q)) as u64);
            for _ in 0..200 {
                let x = rng.next_u64();
                assert_eq!(barrett_reduce_64(x, &modulus), x % q);
                let wide = u128::from(rng.next_u64()) << 64 | u128::from(rng.next_u64());
                assert_eq!(u128::from(barrett_reduce_128(wide, &modulus)), wide % u128::from(q));
            }
        }
    }

    #[test]
    fn pow_mod_satisfies_fermat() {
        for modulus in moduli() {
            let q = modulus.value();
            for base in [2u64, 3, 5, q - 1] {
                assert_eq!(pow_mod(base, q - 1, &modulus), 1, "q = {q}");
            }
        }
    }
}
