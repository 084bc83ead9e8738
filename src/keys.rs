use crate::ciphertext::{PublicKey, SecretKey};
use crate::params::Context;
use crate::rlwe::encrypt_zero_symmetric;
use crate::sampling::sample_poly_ternary;
use crate::Error;


/// Generate a fresh secret key: a uniform ternary polynomial, stored in NTT
/// form, drawn from the parameter factory's generator.
///
/// # Errors
/// Returns `Error::RngFailure` if a generator cannot be spawned or fails,
/// and `Error::AllocationFailure` if the key buffer cannot be allocated.
pub fn generate_secret_key(context: &Context) -> Result<SecretKey, Error> {
    let parms_id = context.parms_id();
    let context_data = context
        .get_context_data(&parms_id)
        .ok_or(Error::InvalidArgument("context carries no parameter data"))?;
    let parms = context_data.parms();
    let coeff_count = parms.poly_modulus_degree();
    let coeff_modulus_size = parms.coeff_modulus().len();

    let mut rng = parms.random_generator().create()?;
    let mut data = Vec::new();
    data.try_reserve_exact(coeff_modulus_size * coeff_count)
        .map_err(|_| Error::AllocationFailure)?;
    data.resize(coeff_modulus_size * coeff_count, 0);
    sample_poly_ternary(&mut rng, parms, &mut data)?;
    for (j, tables) in context_data.ntt_tables().iter().enumerate() {
        tables.forward(&mut data[j * coeff_count..(j + 1) * coeff_count]);
    }
    Ok(SecretKey::new(parms_id, data))
}


/// Derive the public key belonging to a secret key: an NTT-form symmetric
/// encryption of zero, of size 2.
///
/// # Errors
/// Propagates the errors of [`encrypt_zero_symmetric`].
pub fn generate_public_key(secret_key: &SecretKey, context: &Context) -> Result<PublicKey, Error> {
    let ciphertext =
        encrypt_zero_symmetric(secret_key, context, &secret_key.parms_id(), true, false)?;
    Ok(PublicKey::new(ciphertext))
}
