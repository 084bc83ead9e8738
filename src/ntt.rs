use crate::helpers::{add_mod, ensure, mul_mod, pow_mod, sub_mod};
use crate::params::Modulus;
use crate::Error;


/// Precomputed tables for the length-`N` negacyclic NTT modulo one `q_j`.
///
/// Power tables are stored in bit-reversed order: entry `i` holds
/// `psi^bitrev(i)` where `psi` is a primitive `2N`-th root of unity, so the
/// butterfly loops can walk them by block index.
pub(crate) struct NttTables {
    coeff_count: usize,
    modulus: Modulus,
    root_powers: Vec<u64>,
    inv_root_powers: Vec<u64>,
    inv_degree: u64,
}

impl NttTables {
    /// Build tables for degree `2^coeff_count_power` modulo `modulus`.
    pub(crate) fn new(coeff_count_power: u32, modulus: &Modulus) -> Result<Self, Error> {
        let coeff_count = 1usize << coeff_count_power;
        let degree = coeff_count as u64;
        let q = modulus.value();
        ensure!(
            (q - 1) % (2 * degree) == 0,
            Error::InvalidArgument("coeff modulus is not congruent to 1 modulo 2N")
        );

        let root = find_primitive_root(degree, modulus)?;
        let inv_root = pow_mod(root, q - 2, modulus);
        let inv_degree = pow_mod(degree, q - 2, modulus);

        let mut root_powers = vec![0u64; coeff_count];
        let mut inv_root_powers = vec![0u64; coeff_count];
        let mut power = 1u64;
        let mut inv_power = 1u64;
        for i in 0..coeff_count {
            let rev = reverse_bits(i, coeff_count_power);
            root_powers[rev] = power;
            inv_root_powers[rev] = inv_power;
            power = mul_mod(power, root, modulus);
            inv_power = mul_mod(inv_power, inv_root, modulus);
        }

        Ok(Self { coeff_count, modulus: *modulus, root_powers, inv_root_powers, inv_degree })
    }

    /// In-place forward transform of one stripe: coefficient form in,
    /// NTT form out.
    #[allow(clippy::many_single_char_names)]
    pub(crate) fn forward(&self, operand: &mut [u64]) {
        debug_assert_eq!(operand.len(), self.coeff_count);
        let modulus = &self.modulus;
        let n = self.coeff_count;
        let mut t = n;
        let mut m = 1;
        while m < n {
            t >>= 1;
            for i in 0..m {
                let j1 = 2 * i * t;
                let s = self.root_powers[m + i];
                for j in j1..j1 + t {
                    let u = operand[j];
                    let v = mul_mod(operand[j + t], s, modulus);
                    operand[j] = add_mod(u, v, modulus);
                    operand[j + t] = sub_mod(u, v, modulus);
                }
            }
            m <<= 1;
        }
    }

    /// In-place inverse transform of one stripe: NTT form in, coefficient
    /// form out.
    #[allow(clippy::many_single_char_names)]
    pub(crate) fn inverse(&self, operand: &mut [u64]) {
        debug_assert_eq!(operand.len(), self.coeff_count);
        let modulus = &self.modulus;
        let n = self.coeff_count;
        let mut t = 1;
        let mut m = n;
        while m > 1 {
            let h = m >> 1;
            let mut j1 = 0;
            for i in 0..h {
                let s = self.inv_root_powers[h + i];
                for j in j1..j1 + t {
                    let u = operand[j];
                    let v = operand[j + t];
                    operand[j] = add_mod(u, v, modulus);
                    operand[j + t] = mul_mod(sub_mod(u, v, modulus), s, modulus);
                }
                j1 += 2 * t;
            }
            t <<= 1;
            m = h;
        }
        operand.iter_mut().for_each(|x| *x = mul_mod(*x, self.inv_degree, modulus));
    }
}


/// Smallest-base primitive `2N`-th root of unity modulo `q`: a candidate `g`
/// works iff `g^((q-1)/2N)` raised to the `N` gives `-1`.
fn find_primitive_root(degree: u64, modulus: &Modulus) -> Result<u64, Error> {
    let q = modulus.value();
    let exponent = (q - 1) / (2 * degree);
    for candidate in 2..q {
        let root = pow_mod(candidate, exponent, modulus);
        if pow_mod(root, degree, modulus) == q - 1 {
            return Ok(root);
        }
    }
    Err(Error::InvalidArgument("no primitive 2N-th root of unity modulo the coeff modulus"))
}


/// Reverse the low `bits` bits of `index`.
fn reverse_bits(index: usize, bits: u32) -> usize {
    index.reverse_bits() >> (usize::BITS - bits)
}
