use rand::{Rng, RngCore};
use rand_distr::StandardNormal;

/// Source of every random decision taken during reproduction.
///
/// The order in which draws are requested is part of the algorithm:
/// replaying the same sequence of values reproduces the same offspring,
/// species assignments and operator choices.
pub trait Draws {
    /// Returns a uniformly distributed value in `[0, 1)`.
    fn uniform(&mut self) -> f64;

    /// Returns a standard normally distributed value.
    fn std_gaussian(&mut self) -> f64;

    /// Returns a uniformly distributed index in `[0, len)`.
    /// `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize {
        ((self.uniform() * len as f64) as usize).min(len.saturating_sub(1))
    }

    /// Generator handed to genome operations.
    fn rng(&mut self) -> &mut dyn RngCore;
}

/// Wrapper around any `Rng`, needed for dependency
/// inversion (generic `Rng` methods can't be called
/// through a vtable, so genome operations receive
/// a `dyn RngCore` instead).
///
/// # Examples
/// ```
/// use oxineat_species::{Draws, RngDraws};
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let mut a = RngDraws::new(StdRng::seed_from_u64(7));
/// let mut b = RngDraws::new(StdRng::seed_from_u64(7));
///
/// assert_eq!(a.uniform(), b.uniform());
/// assert_eq!(a.index(10), b.index(10));
/// assert_eq!(a.std_gaussian(), b.std_gaussian());
/// ```
#[derive(Clone, Debug)]
pub struct RngDraws<R>(R);

impl<R: Rng> RngDraws<R> {
    pub fn new(rng: R) -> RngDraws<R> {
        RngDraws(rng)
    }

    /// Returns the wrapped generator.
    pub fn into_inner(self) -> R {
        self.0
    }
}

impl<R: Rng> Draws for RngDraws<R> {
    fn uniform(&mut self) -> f64 {
        self.0.gen::<f64>()
    }

    fn std_gaussian(&mut self) -> f64 {
        self.0.sample(StandardNormal)
    }

    fn index(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len.max(1))
    }

    fn rng(&mut self) -> &mut dyn RngCore {
        &mut self.0
    }
}
