use crate::helpers::ensure;
use crate::params::{Context, ParmsId};
use crate::rng::{Seed, SEED_WORD_COUNT};
use crate::{Error, SEED_SENTINEL};
use zeroize::{Zeroize, ZeroizeOnDrop};


/// An RNS ciphertext: `size` polynomials of `L * N` words each, stored
/// contiguously, tagged with the parameter identity and the representation
/// the polynomials are in.
///
/// A freshly resized ciphertext has `scale` 1.0; rescaling schemes adjust it
/// elsewhere. When the second polynomial has been replaced by a seed record
/// ([`Ciphertext::is_seeded`]), it must be expanded before any arithmetic.
#[derive(Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct Ciphertext {
    parms_id: ParmsId,
    is_ntt_form: bool,
    size: usize,
    poly_modulus_degree: usize,
    coeff_modulus_size: usize,
    scale: f64,
    data: Vec<u64>,
}

impl Ciphertext {
    /// An empty ciphertext, not yet associated with any parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parms_id: ParmsId::default(),
            is_ntt_form: false,
            size: 0,
            poly_modulus_degree: 0,
            coeff_modulus_size: 0,
            scale: 1.0,
            data: Vec::new(),
        }
    }

    /// Shape this ciphertext for `size` polynomials under the given
    /// parameters, zero-filled, with scale 1.0.
    ///
    /// # Errors
    /// Returns `Error::InvalidArgument` if the identity does not belong to
    /// the context or `size < 2`, and `Error::AllocationFailure` if the
    /// buffer cannot be allocated.
    pub fn resize(&mut self, context: &Context, parms_id: &ParmsId, size: usize) -> Result<(), Error> {
        let context_data = context
            .get_context_data(parms_id)
            .ok_or(Error::InvalidArgument("parms_id is not valid for the given context"))?;
        ensure!(size >= 2, Error::InvalidArgument("ciphertext size must be at least 2"));

        let parms = context_data.parms();
        let poly_modulus_degree = parms.poly_modulus_degree();
        let coeff_modulus_size = parms.coeff_modulus().len();
        let total = size
            .checked_mul(poly_modulus_degree)
            .and_then(|x| x.checked_mul(coeff_modulus_size))
            .ok_or(Error::AllocationFailure)?;

        self.data.clear();
        self.data.try_reserve_exact(total).map_err(|_| Error::AllocationFailure)?;
        self.data.resize(total, 0);
        self.parms_id = *parms_id;
        self.size = size;
        self.poly_modulus_degree = poly_modulus_degree;
        self.coeff_modulus_size = coeff_modulus_size;
        self.scale = 1.0;
        Ok(())
    }

    /// Number of polynomials.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Polynomial modulus degree `N` of the associated parameters.
    #[must_use]
    pub fn poly_modulus_degree(&self) -> usize {
        self.poly_modulus_degree
    }

    /// Number of RNS components `L` of the associated parameters.
    #[must_use]
    pub fn coeff_modulus_size(&self) -> usize {
        self.coeff_modulus_size
    }

    /// Identity of the associated parameter set.
    #[must_use]
    pub fn parms_id(&self) -> ParmsId {
        self.parms_id
    }

    /// Whether the polynomials are in NTT representation.
    #[must_use]
    pub fn is_ntt_form(&self) -> bool {
        self.is_ntt_form
    }

    pub(crate) fn set_is_ntt_form(&mut self, is_ntt_form: bool) {
        self.is_ntt_form = is_ntt_form;
    }

    /// Scaling factor; this crate always emits 1.0.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// The whole backing buffer, polynomial-major then stripe-major.
    #[must_use]
    pub fn data(&self) -> &[u64] {
        &self.data
    }

    /// One polynomial as `L` stripes of `N` words.
    ///
    /// # Panics
    /// Panics if `index >= self.size()`.
    #[must_use]
    pub fn poly(&self, index: usize) -> &[u64] {
        let len = self.poly_modulus_degree * self.coeff_modulus_size;
        &self.data[index * len..(index + 1) * len]
    }

    /// Mutable access to one polynomial.
    ///
    /// # Panics
    /// Panics if `index >= self.size()`.
    pub fn poly_mut(&mut self, index: usize) -> &mut [u64] {
        let len = self.poly_modulus_degree * self.coeff_modulus_size;
        &mut self.data[index * len..(index + 1) * len]
    }

    /// The first two polynomials, borrowed disjointly.
    pub(crate) fn poly_pair_mut(&mut self) -> (&mut [u64], &mut [u64]) {
        let len = self.poly_modulus_degree * self.coeff_modulus_size;
        let (head, tail) = self.data.split_at_mut(len);
        (head, &mut tail[..len])
    }

    /// Whether the second polynomial is a seed record rather than polynomial
    /// data. Detected by the sentinel word, which no canonical coefficient
    /// can equal.
    #[must_use]
    pub fn is_seeded(&self) -> bool {
        let len = self.poly_modulus_degree * self.coeff_modulus_size;
        self.size >= 2 && len > SEED_WORD_COUNT && self.data[len] == SEED_SENTINEL
    }

    /// Overwrite the second polynomial with a seed record: the sentinel word
    /// followed by the seed packed as little-endian words. Remaining words
    /// are left as they are; readers ignore them.
    pub(crate) fn write_seed_record(&mut self, seed: &Seed) {
        let (_, c1) = self.poly_pair_mut();
        debug_assert!(c1.len() > SEED_WORD_COUNT);
        c1[0] = SEED_SENTINEL;
        c1[1..=SEED_WORD_COUNT].copy_from_slice(&seed.words());
    }

    /// Recover the seed from a seed record, if one is present.
    pub(crate) fn read_seed_record(&self) -> Option<Seed> {
        if !self.is_seeded() {
            return None;
        }
        let len = self.poly_modulus_degree * self.coeff_modulus_size;
        Some(Seed::from_words(&self.data[len + 1..=len + SEED_WORD_COUNT]))
    }
}

impl Default for Ciphertext {
    fn default() -> Self {
        Self::new()
    }
}


/// A public key: a ciphertext-shaped encryption of zero, always in NTT form.
#[derive(Clone)]
pub struct PublicKey {
    data: Ciphertext,
}

impl PublicKey {
    pub(crate) fn new(data: Ciphertext) -> Self {
        Self { data }
    }

    /// The underlying ciphertext.
    #[must_use]
    pub fn data(&self) -> &Ciphertext {
        &self.data
    }

    /// Identity of the parameter set this key was generated under.
    #[must_use]
    pub fn parms_id(&self) -> ParmsId {
        self.data.parms_id()
    }
}


/// A secret key: a single `L * N` polynomial, always in NTT form, wiped on
/// drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    #[zeroize(skip)]
    parms_id: ParmsId,
    data: Vec<u64>,
}

impl SecretKey {
    pub(crate) fn new(parms_id: ParmsId, data: Vec<u64>) -> Self {
        Self { parms_id, data }
    }

    /// The key polynomial as `L` stripes of `N` words, NTT form.
    #[must_use]
    pub fn data(&self) -> &[u64] {
        &self.data
    }

    /// Identity of the parameter set this key was generated under.
    #[must_use]
    pub fn parms_id(&self) -> ParmsId {
        self.parms_id
    }
}
