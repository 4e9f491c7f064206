pub type Token = u32;
pub type Link = u32;

pub const NULL_LINK: Link = Link::MAX;

/// Id reserved for the empty word every target token may align to.
pub const NULL_TOKEN: Token = 0;
pub const NULL_WORD: &str = "<eps>";
pub const SEPARATOR: &str = "|||";

/// Probability returned for (source, target) pairs the table never saw.
pub const PROB_FLOOR: f64 = 1e-9;

pub const TENSION_STEPS: usize = 8;
pub const TENSION_LEARNING_RATE: f64 = 20.0;
pub const MIN_TENSION: f64 = 0.1;
pub const MAX_TENSION: f64 = 14.0;

/// Shape of a sentence pair, as seen from the conditioning direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LengthPair {
    pub target: usize,
    pub source: usize,
}

impl LengthPair {
    #[inline]
    pub fn new(target: usize, source: usize) -> Self {
        LengthPair { target, source }
    }
}

#[inline]
pub fn clamp_tension(t: f64) -> f64 {
    if t <= MIN_TENSION {
        MIN_TENSION
    } else if t > MAX_TENSION {
        MAX_TENSION
    } else {
        t
    }
}
