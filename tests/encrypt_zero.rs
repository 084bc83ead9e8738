use rlwe_core::{
    decrypt_zero, encrypt_zero_asymmetric, encrypt_zero_symmetric, expand_seed,
    generate_public_key, generate_secret_key, Context, EncryptionParameters, Error, Seed,
    ShakePrngFactory, SEED_BYTE_COUNT, SEED_SENTINEL,
};

const Q27: u64 = 0x7e0_0001; // 132120577, congruent to 1 mod 2^21
const Q17: u64 = 65537; // congruent to 1 mod 2^16

fn seeded_context(degree: usize, moduli: &[u64], seed_byte: u8) -> Context {
    let mut parms = EncryptionParameters::new(degree, moduli).unwrap();
    parms.set_random_generator(ShakePrngFactory::with_seed(Seed::from(
        [seed_byte; SEED_BYTE_COUNT],
    )));
    Context::new(parms).unwrap()
}

fn centered(value: u64, q: u64) -> i64 {
    if value > q / 2 {
        i64::try_from(value).unwrap() - i64::try_from(q).unwrap()
    } else {
        i64::try_from(value).unwrap()
    }
}

fn modpow(mut base: u128, mut exp: u128, modulus: u128) -> u128 {
    let mut result = 1u128;
    base %= modulus;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result * base % modulus;
        }
        base = base * base % modulus;
        exp >>= 1;
    }
    result
}

/// Compose two residues into a centered representative modulo `q0 * q1`.
fn crt_centered(r0: u64, r1: u64, q0: u64, q1: u64) -> i128 {
    let (q0, q1) = (u128::from(q0), u128::from(q1));
    let inv_q0 = modpow(q0, q1 - 2, q1);
    let diff = (u128::from(r1) + q1 - u128::from(r0) % q1) % q1;
    let value = u128::from(r0) + q0 * (diff * inv_q0 % q1);
    let product = q0 * q1;
    if value > product / 2 {
        i128::try_from(value).unwrap() - i128::try_from(product).unwrap()
    } else {
        i128::try_from(value).unwrap()
    }
}

#[test]
fn asymmetric_decrypts_to_zero_single_modulus() {
    let context = seeded_context(1024, &[Q27], 0x01);
    let secret_key = generate_secret_key(&context).unwrap();
    let public_key = generate_public_key(&secret_key, &context).unwrap();

    for is_ntt_form in [true, false] {
        let ciphertext =
            encrypt_zero_asymmetric(&public_key, &context, &context.parms_id(), is_ntt_form)
                .unwrap();
        assert_eq!(ciphertext.size(), 2);
        let noise = decrypt_zero(&secret_key, &ciphertext, &context).unwrap();
        for &value in &noise {
            // |u * e_pk + e_0 + e_1 * s| is far below q/2 for these parameters
            assert!(centered(value, Q27).abs() < 1 << 20, "noise too large: {value}");
        }
    }
}

#[test]
fn symmetric_decrypts_to_zero_single_modulus() {
    let context = seeded_context(1024, &[Q27], 0x02);
    let secret_key = generate_secret_key(&context).unwrap();

    for is_ntt_form in [true, false] {
        let ciphertext =
            encrypt_zero_symmetric(&secret_key, &context, &context.parms_id(), is_ntt_form, false)
                .unwrap();
        let noise = decrypt_zero(&secret_key, &ciphertext, &context).unwrap();
        for &value in &noise {
            // the decryption identity leaves exactly -e
            assert!(centered(value, Q27).abs() <= 21, "noise too large: {value}");
        }
    }
}

#[test]
fn symmetric_seed_round_trip() {
    let context = seeded_context(1024, &[Q27], 0x03);
    let secret_key = generate_secret_key(&context).unwrap();

    let mut seeded =
        encrypt_zero_symmetric(&secret_key, &context, &context.parms_id(), true, true).unwrap();
    assert!(seeded.is_seeded());
    assert_eq!(seeded.poly(1)[0], SEED_SENTINEL);

    // Unusable until the seed record is expanded back into a polynomial
    assert!(matches!(
        decrypt_zero(&secret_key, &seeded, &context),
        Err(Error::InvalidArgument(_))
    ));

    expand_seed(&mut seeded, &context).unwrap();
    assert!(!seeded.is_seeded());
    let noise = decrypt_zero(&secret_key, &seeded, &context).unwrap();
    for &value in &noise {
        assert!(centered(value, Q27).abs() <= 21);
    }

    // With the same factory seed, the non-compressed path produces the
    // identical ciphertext: same bootstrap stream, same public seed, same a.
    let twin_context = seeded_context(1024, &[Q27], 0x03);
    let twin_key = generate_secret_key(&twin_context).unwrap();
    let plain =
        encrypt_zero_symmetric(&twin_key, &twin_context, &twin_context.parms_id(), true, false)
            .unwrap();
    assert_eq!(seeded.data(), plain.data());
}

#[test]
fn seed_round_trip_in_coefficient_form() {
    let context = seeded_context(1024, &[Q27], 0x04);
    let secret_key = generate_secret_key(&context).unwrap();

    let mut seeded =
        encrypt_zero_symmetric(&secret_key, &context, &context.parms_id(), false, true).unwrap();
    assert!(!seeded.is_ntt_form());
    assert!(seeded.is_seeded());

    expand_seed(&mut seeded, &context).unwrap();
    let noise = decrypt_zero(&secret_key, &seeded, &context).unwrap();
    for &value in &noise {
        assert!(centered(value, Q27).abs() <= 21, "noise too large: {value}");
    }
}

#[test]
fn symmetric_two_modulus_coefficient_form() {
    let context = seeded_context(2048, &[Q27, Q17], 0x05);
    let secret_key = generate_secret_key(&context).unwrap();

    let ciphertext =
        encrypt_zero_symmetric(&secret_key, &context, &context.parms_id(), false, false).unwrap();
    assert!(!ciphertext.is_ntt_form());
    assert!(!ciphertext.is_seeded());

    // -e is small in every stripe independently
    let noise = decrypt_zero(&secret_key, &ciphertext, &context).unwrap();
    for (j, &q) in [Q27, Q17].iter().enumerate() {
        for &value in &noise[j * 2048..(j + 1) * 2048] {
            assert!(centered(value, q).abs() <= 21, "stripe {j} noise too large: {value}");
        }
    }
}

#[test]
fn asymmetric_decrypts_two_modulus_crt() {
    let context = seeded_context(2048, &[Q27, Q17], 0x06);
    let secret_key = generate_secret_key(&context).unwrap();
    let public_key = generate_public_key(&secret_key, &context).unwrap();

    let ciphertext =
        encrypt_zero_asymmetric(&public_key, &context, &context.parms_id(), false).unwrap();
    let noise = decrypt_zero(&secret_key, &ciphertext, &context).unwrap();
    for i in 0..2048 {
        let value = crt_centered(noise[i], noise[2048 + i], Q27, Q17);
        assert!(value.abs() < 1 << 20, "noise too large: {value}");
    }
}

#[test]
fn representation_and_scale_flags() {
    let context = seeded_context(1024, &[Q27], 0x07);
    let secret_key = generate_secret_key(&context).unwrap();
    let public_key = generate_public_key(&secret_key, &context).unwrap();

    for is_ntt_form in [true, false] {
        for save_seed in [true, false] {
            let ciphertext = encrypt_zero_symmetric(
                &secret_key,
                &context,
                &context.parms_id(),
                is_ntt_form,
                save_seed,
            )
            .unwrap();
            assert_eq!(ciphertext.is_ntt_form(), is_ntt_form);
            assert_eq!(ciphertext.is_seeded(), save_seed);
            assert_eq!(ciphertext.size(), 2);
            assert!((ciphertext.scale() - 1.0).abs() < f64::EPSILON);
            assert_eq!(ciphertext.parms_id(), context.parms_id());
        }

        let ciphertext =
            encrypt_zero_asymmetric(&public_key, &context, &context.parms_id(), is_ntt_form)
                .unwrap();
        assert_eq!(ciphertext.is_ntt_form(), is_ntt_form);
        assert!(!ciphertext.is_seeded());
        assert!((ciphertext.scale() - 1.0).abs() < f64::EPSILON);
    }
}

#[test]
fn deterministic_under_seeded_factory() {
    for run in 0..2 {
        let context_a = seeded_context(1024, &[Q27], 0x08);
        let context_b = seeded_context(1024, &[Q27], 0x08);
        let key_a = generate_secret_key(&context_a).unwrap();
        let key_b = generate_secret_key(&context_b).unwrap();
        assert_eq!(key_a.data(), key_b.data());

        let is_ntt_form = run == 0;
        let sym_a =
            encrypt_zero_symmetric(&key_a, &context_a, &context_a.parms_id(), is_ntt_form, false)
                .unwrap();
        let sym_b =
            encrypt_zero_symmetric(&key_b, &context_b, &context_b.parms_id(), is_ntt_form, false)
                .unwrap();
        assert_eq!(sym_a.data(), sym_b.data());

        let pk_a = generate_public_key(&key_a, &context_a).unwrap();
        let pk_b = generate_public_key(&key_b, &context_b).unwrap();
        let asym_a =
            encrypt_zero_asymmetric(&pk_a, &context_a, &context_a.parms_id(), is_ntt_form).unwrap();
        let asym_b =
            encrypt_zero_asymmetric(&pk_b, &context_b, &context_b.parms_id(), is_ntt_form).unwrap();
        assert_eq!(asym_a.data(), asym_b.data());
    }
}
