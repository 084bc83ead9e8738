use crate::ciphertext::{Ciphertext, PublicKey, SecretKey};
use crate::helpers::{
    add_poly_coeffmod, allocate_poly, dyadic_product_assign, dyadic_product_coeffmod, ensure,
    negate_poly_coeffmod,
};
use crate::params::{Context, EncryptionParameters, ParmsId};
use crate::rng::{Seed, ShakePrng, SEED_WORD_COUNT};
use crate::sampling::{sample_poly_ternary, sample_poly_uniform};
use crate::Error;
use rand_core::RngCore;


/// Error distribution selected at build time: clipped Gaussian with the
/// `gaussian-noise` feature, centered binomial otherwise.
fn sample_error(
    rng: &mut impl RngCore, parms: &EncryptionParameters, destination: &mut [u64],
) -> Result<(), Error> {
    if cfg!(feature = "gaussian-noise") {
        crate::sampling::sample_poly_normal(rng, parms, destination)
    } else {
        crate::sampling::sample_poly_cbd(rng, parms, destination)
    }
}


/// Fresh encryption of zero under a public key.
///
/// Produces `(c_0, …, c_{k-1})` with `c_t = pk_t · u + e_t`, where `u` is
/// uniform ternary and each `e_t` is drawn from the error distribution. A
/// single generator spawned from the parameter factory drives `u` and every
/// `e_t`. The result is emitted in the representation `is_ntt_form` asks
/// for, with scale 1.0.
///
/// # Errors
/// Returns `Error::InvalidArgument` if `parms_id` does not belong to the
/// context (or, in debug builds, if the key does not match it),
/// `Error::RngFailure` if a generator cannot be spawned or fails, and
/// `Error::AllocationFailure` if buffers cannot be allocated.
pub fn encrypt_zero_asymmetric(
    public_key: &PublicKey, context: &Context, parms_id: &ParmsId, is_ntt_form: bool,
) -> Result<Ciphertext, Error> {
    let context_data = context
        .get_context_data(parms_id)
        .ok_or(Error::InvalidArgument("parms_id is not valid for the encryption context"))?;
    let parms = context_data.parms();
    let coeff_modulus = parms.coeff_modulus();
    let coeff_count = parms.poly_modulus_degree();
    let ntt_tables = context_data.ntt_tables();
    let size = public_key.data().size();
    let stripe = |j: usize| j * coeff_count..(j + 1) * coeff_count;

    #[cfg(debug_assertions)]
    {
        ensure!(
            public_key.parms_id() == *parms_id && size >= 2,
            Error::InvalidArgument("public key is not valid for the encryption parameters")
        );
        ensure!(
            public_key.data().is_ntt_form(),
            Error::InvalidArgument("public key is not in NTT form")
        );
    }

    let mut destination = Ciphertext::new();
    destination.resize(context, parms_id, size)?;
    destination.set_is_ntt_form(is_ntt_form);

    let mut rng = parms.random_generator().create()?;

    // u <- R_3, transformed for the pointwise products against the key
    let mut u = allocate_poly(coeff_modulus.len(), coeff_count)?;
    sample_poly_ternary(&mut rng, parms, &mut u)?;
    for (j, tables) in ntt_tables.iter().enumerate() {
        tables.forward(&mut u[stripe(j)]);
    }

    // c_t = pk_t ⊙ u
    for t in 0..size {
        let pk_t = public_key.data().poly(t);
        let ct_t = destination.poly_mut(t);
        for (j, modulus) in coeff_modulus.iter().enumerate() {
            dyadic_product_coeffmod(&u[stripe(j)], &pk_t[stripe(j)], modulus, &mut ct_t[stripe(j)]);
            if !is_ntt_form {
                ntt_tables[j].inverse(&mut ct_t[stripe(j)]);
            }
        }
    }

    // c_t += e_t, reusing u's buffer now that u is consumed
    for t in 0..size {
        sample_error(&mut rng, parms, &mut u)?;
        let ct_t = destination.poly_mut(t);
        for (j, modulus) in coeff_modulus.iter().enumerate() {
            if is_ntt_form {
                ntt_tables[j].forward(&mut u[stripe(j)]);
            }
            add_poly_coeffmod(&mut ct_t[stripe(j)], &u[stripe(j)], modulus);
        }
    }

    Ok(destination)
}


/// Fresh encryption of zero under a secret key.
///
/// Produces `(c_0, c_1) = (-(a·s + e), a)` with `a` uniform over the ring
/// and `e` from the error distribution. Two generators are involved: the
/// private bootstrap generator (from the parameter factory) supplies the
/// error and a fresh public seed, and a public generator keyed by that seed
/// supplies `a`. With `save_seed`, `c_1` is replaced by a seed record from
/// which `a` can be regenerated via [`expand_seed`]; the request is silently
/// dropped when the polynomial is too small to hold the record.
///
/// # Errors
/// Returns `Error::InvalidArgument` if `parms_id` does not belong to the
/// context (or, in debug builds, if the key does not match it),
/// `Error::RngFailure` if a generator cannot be spawned or fails, and
/// `Error::AllocationFailure` if buffers cannot be allocated.
pub fn encrypt_zero_symmetric(
    secret_key: &SecretKey, context: &Context, parms_id: &ParmsId, is_ntt_form: bool,
    save_seed: bool,
) -> Result<Ciphertext, Error> {
    let context_data = context
        .get_context_data(parms_id)
        .ok_or(Error::InvalidArgument("parms_id is not valid for the encryption context"))?;
    let parms = context_data.parms();
    let coeff_modulus = parms.coeff_modulus();
    let coeff_count = parms.poly_modulus_degree();
    let ntt_tables = context_data.ntt_tables();
    let stripe = |j: usize| j * coeff_count..(j + 1) * coeff_count;

    #[cfg(debug_assertions)]
    {
        ensure!(
            secret_key.parms_id() == *parms_id
                && secret_key.data().len() == coeff_count * coeff_modulus.len(),
            Error::InvalidArgument("secret key is not valid for the encryption parameters")
        );
    }

    // A polynomial too small to carry sentinel plus seed falls back to a
    // full c_1.
    let save_seed = save_seed && coeff_modulus.len() * coeff_count > SEED_WORD_COUNT;

    let mut destination = Ciphertext::new();
    destination.resize(context, parms_id, 2)?;
    destination.set_is_ntt_form(is_ntt_form);

    // The bootstrap generator is private; everything derived from the public
    // seed may appear in serialized output.
    let mut bootstrap_rng = parms.random_generator().create()?;
    let public_seed = Seed::random(&mut bootstrap_rng)?;
    let mut ciphertext_rng = ShakePrng::from_seed(&public_seed);

    let (c0, c1) = destination.poly_pair_mut();

    // a: the sampler writes coefficient-layout words whose NTT-domain
    // reading is the uniform ring element.
    sample_poly_uniform(&mut ciphertext_rng, parms, c1)?;
    if !is_ntt_form && save_seed {
        // Pin down the NTT-domain value that the stored seed regenerates
        for (j, tables) in ntt_tables.iter().enumerate() {
            tables.forward(&mut c1[stripe(j)]);
        }
    }

    let mut e = allocate_poly(coeff_modulus.len(), coeff_count)?;
    sample_error(&mut bootstrap_rng, parms, &mut e)?;

    // c_0 = -(a ⊙ s + e)
    for (j, modulus) in coeff_modulus.iter().enumerate() {
        dyadic_product_coeffmod(
            &secret_key.data()[stripe(j)],
            &c1[stripe(j)],
            modulus,
            &mut c0[stripe(j)],
        );
        if is_ntt_form {
            ntt_tables[j].forward(&mut e[stripe(j)]);
        } else {
            ntt_tables[j].inverse(&mut c0[stripe(j)]);
        }
        add_poly_coeffmod(&mut c0[stripe(j)], &e[stripe(j)], modulus);
        negate_poly_coeffmod(&mut c0[stripe(j)], modulus);
    }

    if !is_ntt_form && !save_seed {
        for (j, tables) in ntt_tables.iter().enumerate() {
            tables.inverse(&mut c1[stripe(j)]);
        }
    }

    if save_seed {
        destination.write_seed_record(&public_seed);
    }
    Ok(destination)
}


/// Replace the seed record in a seed-compressed ciphertext with the full
/// `c_1` polynomial it stands for.
///
/// In NTT form the regenerated words are the NTT-domain value directly; in
/// coefficient form they are the coefficient-domain value, because the
/// encryptor's forward transform and the loader's inverse cancel out.
///
/// # Errors
/// Returns `Error::InvalidArgument` if the ciphertext carries no seed record
/// or does not belong to the context.
pub fn expand_seed(ciphertext: &mut Ciphertext, context: &Context) -> Result<(), Error> {
    let seed = ciphertext
        .read_seed_record()
        .ok_or(Error::InvalidArgument("ciphertext does not carry a seed record"))?;
    let context_data = context
        .get_context_data(&ciphertext.parms_id())
        .ok_or(Error::InvalidArgument("ciphertext parameters are not valid for this context"))?;
    let mut rng = ShakePrng::from_seed(&seed);
    sample_poly_uniform(&mut rng, context_data.parms(), ciphertext.poly_mut(1))
}


/// Companion to the zero-encryptors: evaluates `Σ_t c_t · s^t` and returns
/// the underlying noise polynomial in coefficient form. For a well-formed
/// encryption of zero its centered coefficients are small.
///
/// # Errors
/// Returns `Error::InvalidArgument` for a seeded or malformed ciphertext, a
/// mismatched key, or a foreign context, and `Error::AllocationFailure` if
/// scratch cannot be allocated.
pub fn decrypt_zero(
    secret_key: &SecretKey, ciphertext: &Ciphertext, context: &Context,
) -> Result<Vec<u64>, Error> {
    ensure!(
        !ciphertext.is_seeded(),
        Error::InvalidArgument("seeded ciphertext must be expanded before decryption")
    );
    ensure!(ciphertext.size() >= 2, Error::InvalidArgument("ciphertext is malformed"));
    ensure!(
        secret_key.parms_id() == ciphertext.parms_id(),
        Error::InvalidArgument("secret key does not match the ciphertext")
    );
    let context_data = context
        .get_context_data(&ciphertext.parms_id())
        .ok_or(Error::InvalidArgument("ciphertext parameters are not valid for this context"))?;
    let parms = context_data.parms();
    let coeff_modulus = parms.coeff_modulus();
    let coeff_count = parms.poly_modulus_degree();
    let ntt_tables = context_data.ntt_tables();
    let stripe = |j: usize| j * coeff_count..(j + 1) * coeff_count;

    let mut noise = allocate_poly(coeff_modulus.len(), coeff_count)?;
    let mut scratch = allocate_poly(coeff_modulus.len(), coeff_count)?;
    let mut key_power = allocate_poly(coeff_modulus.len(), coeff_count)?;
    key_power.copy_from_slice(secret_key.data());

    noise.copy_from_slice(ciphertext.poly(0));
    if !ciphertext.is_ntt_form() {
        for (j, tables) in ntt_tables.iter().enumerate() {
            tables.forward(&mut noise[stripe(j)]);
        }
    }

    for t in 1..ciphertext.size() {
        scratch.copy_from_slice(ciphertext.poly(t));
        for (j, modulus) in coeff_modulus.iter().enumerate() {
            if !ciphertext.is_ntt_form() {
                ntt_tables[j].forward(&mut scratch[stripe(j)]);
            }
            dyadic_product_assign(&mut scratch[stripe(j)], &key_power[stripe(j)], modulus);
            add_poly_coeffmod(&mut noise[stripe(j)], &scratch[stripe(j)], modulus);
        }
        if t + 1 < ciphertext.size() {
            for (j, modulus) in coeff_modulus.iter().enumerate() {
                dyadic_product_assign(&mut key_power[stripe(j)], &secret_key.data()[stripe(j)], modulus);
            }
        }
    }

    for (j, tables) in ntt_tables.iter().enumerate() {
        tables.inverse(&mut noise[stripe(j)]);
    }
    Ok(noise.to_vec())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_secret_key;
    use crate::rng::ShakePrngFactory;
    use crate::SEED_BYTE_COUNT;

    fn seeded_context(degree: usize, moduli: &[u64], seed_byte: u8) -> Context {
        let mut parms = EncryptionParameters::new(degree, moduli).unwrap();
        parms.set_random_generator(ShakePrngFactory::with_seed(Seed::from(
            [seed_byte; SEED_BYTE_COUNT],
        )));
        Context::new(parms).unwrap()
    }

    #[test]
    fn symmetric_noise_is_just_the_error() {
        let context = seeded_context(32, &[12289], 1);
        let secret_key = generate_secret_key(&context).unwrap();
        for is_ntt_form in [true, false] {
            let ciphertext =
                encrypt_zero_symmetric(&secret_key, &context, &context.parms_id(), is_ntt_form, false)
                    .unwrap();
            let noise = decrypt_zero(&secret_key, &ciphertext, &context).unwrap();
            for &value in &noise {
                let centered =
                    if value > 12289 / 2 { i64::try_from(value).unwrap() - 12289 } else { i64::try_from(value).unwrap() };
                assert!(centered.abs() <= 21, "error coefficient out of range: {centered}");
            }
        }
    }

    #[test]
    fn seed_demotion_on_tiny_polynomials() {
        // 8 words per polynomial cannot hold sentinel + 8 seed words
        let context = seeded_context(8, &[97], 2);
        let secret_key = generate_secret_key(&context).unwrap();
        let ciphertext =
            encrypt_zero_symmetric(&secret_key, &context, &context.parms_id(), true, true).unwrap();
        assert!(!ciphertext.is_seeded());
        assert!(expand_seed(&mut ciphertext.clone(), &context).is_err());
        assert!(decrypt_zero(&secret_key, &ciphertext, &context).is_ok());
    }

    #[test]
    fn foreign_parms_id_is_rejected() {
        let context = seeded_context(32, &[12289], 3);
        let secret_key = generate_secret_key(&context).unwrap();
        let foreign = EncryptionParameters::new(64, &[12289]).unwrap();
        let result =
            encrypt_zero_symmetric(&secret_key, &context, &foreign.parms_id(), true, false);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
