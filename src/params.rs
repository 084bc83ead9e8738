use crate::helpers::ensure;
use crate::ntt::NttTables;
use crate::rng::ShakePrngFactory;
use crate::Error;
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;


/// A word-sized odd coefficient modulus with its precomputed Barrett constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Modulus {
    value: u64,
    const_ratio: [u64; 2],
    bit_count: u32,
}

impl Modulus {
    /// Wrap a coefficient modulus value.
    ///
    /// The value must be odd, at least 2, and at most 61 bits. The bit bound
    /// is what keeps every canonical coefficient clear of the seed-record
    /// sentinel word.
    ///
    /// # Errors
    /// Returns `Error::InvalidArgument` if the value is out of range or even.
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(value: u64) -> Result<Self, Error> {
        ensure!(value >= 2, Error::InvalidArgument("coeff modulus must be at least 2"));
        ensure!(value & 1 == 1, Error::InvalidArgument("coeff modulus must be odd"));
        let bit_count = 64 - value.leading_zeros();
        ensure!(bit_count <= 61, Error::InvalidArgument("coeff modulus must be at most 61 bits"));

        // floor(2^128 / value), exact because an odd value never divides 2^128
        let ratio = u128::MAX / u128::from(value);
        Ok(Self { value, const_ratio: [ratio as u64, (ratio >> 64) as u64], bit_count })
    }

    /// The modulus value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Number of significant bits in the modulus value.
    #[must_use]
    pub fn bit_count(&self) -> u32 {
        self.bit_count
    }

    /// Low and high limbs of `floor(2^128 / value)`.
    pub(crate) fn const_ratio(&self) -> [u64; 2] {
        self.const_ratio
    }
}


/// Identity of a parameter set: a 256-bit digest of the degree and the
/// coefficient moduli. Ciphertexts and keys carry it so mismatched uses are
/// caught cheaply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ParmsId([u64; 4]);

fn compute_parms_id(poly_modulus_degree: usize, coeff_modulus: &[Modulus]) -> ParmsId {
    let mut hasher = Shake256::default();
    hasher.update(&(poly_modulus_degree as u64).to_le_bytes());
    for modulus in coeff_modulus {
        hasher.update(&modulus.value().to_le_bytes());
    }
    let mut reader = hasher.finalize_xof();
    let mut digest = [0u8; 32];
    reader.read(&mut digest);
    ParmsId(core::array::from_fn(|i| {
        u64::from_le_bytes(digest[8 * i..8 * (i + 1)].try_into().expect("8-byte chunk"))
    }))
}


/// Encryption parameters: polynomial degree, RNS coefficient moduli, error
/// distribution bounds, and the PRNG factory encryption operations draw from.
///
/// The noise parameters default to the crate constants and are deliberately
/// part of this descriptor rather than process-wide globals.
#[derive(Clone, Debug)]
pub struct EncryptionParameters {
    poly_modulus_degree: usize,
    coeff_modulus: Vec<Modulus>,
    noise_standard_deviation: f64,
    noise_max_deviation: f64,
    random_generator: ShakePrngFactory,
    parms_id: ParmsId,
}

impl EncryptionParameters {
    /// Assemble a parameter set from a power-of-two degree and a sequence of
    /// distinct coefficient moduli.
    ///
    /// # Errors
    /// Returns `Error::InvalidArgument` if the degree is not a power of two
    /// of at least 2, or if the moduli are empty, repeated, or out of range.
    pub fn new(poly_modulus_degree: usize, coeff_modulus: &[u64]) -> Result<Self, Error> {
        ensure!(
            poly_modulus_degree >= 2 && poly_modulus_degree.is_power_of_two(),
            Error::InvalidArgument("poly modulus degree must be a power of two, at least 2")
        );
        ensure!(
            !coeff_modulus.is_empty(),
            Error::InvalidArgument("coeff modulus must not be empty")
        );
        let coeff_modulus =
            coeff_modulus.iter().map(|&q| Modulus::new(q)).collect::<Result<Vec<_>, _>>()?;
        for (i, modulus) in coeff_modulus.iter().enumerate() {
            ensure!(
                !coeff_modulus[..i].iter().any(|other| other.value() == modulus.value()),
                Error::InvalidArgument("coeff modulus primes must be pairwise distinct")
            );
        }

        let parms_id = compute_parms_id(poly_modulus_degree, &coeff_modulus);
        Ok(Self {
            poly_modulus_degree,
            coeff_modulus,
            noise_standard_deviation: crate::NOISE_STANDARD_DEVIATION,
            noise_max_deviation: crate::NOISE_MAX_DEVIATION,
            random_generator: ShakePrngFactory::default(),
            parms_id,
        })
    }

    /// Polynomial modulus degree `N`.
    #[must_use]
    pub fn poly_modulus_degree(&self) -> usize {
        self.poly_modulus_degree
    }

    /// The RNS coefficient moduli `q_0, …, q_{L-1}`.
    #[must_use]
    pub fn coeff_modulus(&self) -> &[Modulus] {
        &self.coeff_modulus
    }

    /// Standard deviation of the error distribution.
    #[must_use]
    pub fn noise_standard_deviation(&self) -> f64 {
        self.noise_standard_deviation
    }

    /// Hard clipping bound of the error distribution.
    #[must_use]
    pub fn noise_max_deviation(&self) -> f64 {
        self.noise_max_deviation
    }

    /// Override the error distribution bounds.
    ///
    /// # Errors
    /// Returns `Error::InvalidArgument` unless `0 < standard_deviation` and
    /// `0 <= max_deviation`, both finite.
    pub fn set_noise_parameters(
        &mut self, standard_deviation: f64, max_deviation: f64,
    ) -> Result<(), Error> {
        ensure!(
            standard_deviation.is_finite() && standard_deviation > 0.0,
            Error::InvalidArgument("noise standard deviation must be positive and finite")
        );
        ensure!(
            max_deviation.is_finite() && max_deviation >= 0.0,
            Error::InvalidArgument("noise max deviation must be non-negative and finite")
        );
        self.noise_standard_deviation = standard_deviation;
        self.noise_max_deviation = max_deviation;
        Ok(())
    }

    /// The PRNG factory used to spawn fresh generators.
    #[must_use]
    pub fn random_generator(&self) -> &ShakePrngFactory {
        &self.random_generator
    }

    /// Replace the PRNG factory, e.g. with a seeded one for reproducible runs.
    pub fn set_random_generator(&mut self, factory: ShakePrngFactory) {
        self.random_generator = factory;
    }

    /// Identity of this parameter set. Independent of the noise bounds and
    /// the PRNG factory.
    #[must_use]
    pub fn parms_id(&self) -> ParmsId {
        self.parms_id
    }
}


/// A validated parameter set together with its precomputed NTT tables.
pub struct ContextData {
    parms: EncryptionParameters,
    ntt_tables: Vec<NttTables>,
}

impl ContextData {
    /// The encryption parameters this data was derived from.
    #[must_use]
    pub fn parms(&self) -> &EncryptionParameters {
        &self.parms
    }

    /// One table per RNS component, in stripe order.
    pub(crate) fn ntt_tables(&self) -> &[NttTables] {
        &self.ntt_tables
    }
}


/// Owns the validated parameter chain and the per-modulus NTT machinery.
pub struct Context {
    data: ContextData,
}

impl Context {
    /// Validate parameters and precompute NTT tables for every modulus.
    ///
    /// # Errors
    /// Returns `Error::InvalidArgument` if any modulus is not NTT-compatible
    /// with the degree (`q_j ≢ 1 mod 2N`).
    pub fn new(parms: EncryptionParameters) -> Result<Self, Error> {
        let coeff_count_power = parms.poly_modulus_degree().trailing_zeros();
        let ntt_tables = parms
            .coeff_modulus()
            .iter()
            .map(|modulus| NttTables::new(coeff_count_power, modulus))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { data: ContextData { parms, ntt_tables } })
    }

    /// Identity of the parameter set this context was built from.
    #[must_use]
    pub fn parms_id(&self) -> ParmsId {
        self.data.parms.parms_id()
    }

    /// Look up the data for a parameter identity, if it belongs to this
    /// context.
    #[must_use]
    pub fn get_context_data(&self, parms_id: &ParmsId) -> Option<&ContextData> {
        (self.data.parms.parms_id() == *parms_id).then_some(&self.data)
    }
}
