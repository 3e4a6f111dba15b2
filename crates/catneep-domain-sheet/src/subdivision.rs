//! Fixed-point beat arithmetic.
//!
//! Note timing lives in integer substeps so long timelines never accumulate
//! floating point drift; beats only appear at the boundary.

use catneep_ports::types::Substep;

/// Substeps in one beat.
pub const SUBSTEPS_PER_BEAT: Substep = 16;

/// Length of one substep, in beats.
pub const SUBSTEP_SIZE: f64 = 1.0 / SUBSTEPS_PER_BEAT as f64;

/// Beat divisors a fraction may use, coarsest first.
pub const VALID_DIVISORS: [Substep; 5] = [1, 2, 4, 8, 16];

pub fn divisors() -> &'static [Substep] {
    &VALID_DIVISORS
}

pub fn divisor_is_valid(divisor: Substep) -> bool {
    VALID_DIVISORS.contains(&divisor)
}

/// Substeps in `1/divisor` of a beat, or 0 when the divisor is not valid.
pub fn substeps_for(divisor: Substep) -> Substep {
    if divisor_is_valid(divisor) {
        SUBSTEPS_PER_BEAT / divisor
    } else {
        0
    }
}

/// Substeps in `dividend/divisor` beats, e.g. `5/2` -> 40. Invalid divisors yield 0.
pub fn substeps_for_fraction(dividend: Substep, divisor: Substep) -> Substep {
    substeps_for(divisor) * dividend
}

/// Smallest beat fraction equal to `substeps`.
///
/// Divisors are tried coarsest first, so 24 becomes `(3, 2)` and 32 becomes
/// `(2, 1)`. Returns `(0, 0)` when nothing divides exactly.
pub fn fraction_from_substeps(substeps: Substep) -> (Substep, Substep) {
    for &divisor in &VALID_DIVISORS {
        let division = SUBSTEPS_PER_BEAT / divisor;
        if substeps % division == 0 {
            return (substeps / division, divisor);
        }
    }
    (0, 0)
}

pub fn beats_from_substeps(substeps: Substep) -> f64 {
    substeps as f64 * SUBSTEP_SIZE
}

/// Substep containing `beat`, rounding toward negative infinity.
pub fn substep_at_beat(beat: f64) -> Substep {
    (beat * SUBSTEPS_PER_BEAT as f64).floor() as Substep
}
