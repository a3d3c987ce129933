//! Gene vector operations used by agents and the evolver.
//!
//! - **Initialization**: [`random_gene`] samples one gene uniformly from `[-1, 1]`
//! - **Mutation**: [`mutate`] applies independent per-gene uniform perturbations
//!
//! Neither operation clamps. Genes may drift outside `[-1, 1]` over many
//! generations; the `tanh` hidden layers keep activations bounded regardless.

use rand::Rng;
use rand_distr::Uniform;

/// Lower bound of freshly sampled genes.
pub const INIT_MIN: f32 = -1.0;
/// Upper bound of freshly sampled genes.
pub const INIT_MAX: f32 = 1.0;

/// Samples one gene uniformly from `[INIT_MIN, INIT_MAX]`.
pub fn random_gene<R>(rng: &mut R) -> f32
where
    R: Rng + ?Sized,
{
    rng.random_range(INIT_MIN..=INIT_MAX)
}

/// Perturbs genes in place.
///
/// Each gene independently, with probability `rate`, receives an offset drawn
/// uniformly from `[-strength, strength]`; otherwise it is left untouched.
/// The number of mutated genes is therefore binomial, not fixed.
///
/// # Panics
///
/// Panics if `rate` is outside `[0, 1]` or `strength` is not a positive
/// finite number.
pub fn mutate<R>(genes: &mut [f32], rate: f32, strength: f32, rng: &mut R)
where
    R: Rng + ?Sized,
{
    assert!(
        (0.0..=1.0).contains(&rate),
        "mutation rate must be within [0, 1], got {rate}"
    );
    assert!(
        strength > 0.0 && strength.is_finite(),
        "mutation strength must be positive and finite, got {strength}"
    );
    let perturbation = Uniform::new_inclusive(-strength, strength)
        .expect("mutation strength is positive and finite");
    for gene in genes {
        if rng.random_bool(rate.into()) {
            *gene += rng.sample(perturbation);
        }
    }
}
