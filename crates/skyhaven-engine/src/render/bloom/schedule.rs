//! Ping-pong bookkeeping for the separable blur.
//!
//! The GPU blur and the CPU reference both walk the same `BlurSchedule`, so
//! which buffer holds the final result is decided in exactly one place.

/// Axis of a one-dimensional blur step.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BlurDirection {
    Horizontal,
    Vertical,
}

impl BlurDirection {
    /// Unit texel step along this axis.
    pub fn step(self) -> [f32; 2] {
        match self {
            BlurDirection::Horizontal => [1.0, 0.0],
            BlurDirection::Vertical => [0.0, 1.0],
        }
    }
}

/// Image a blur step (or the composite) samples from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BlurSource {
    /// Attachment 1 of the HDR scene target.
    BrightPass,
    /// Ping-pong target 0 or 1.
    PingPong(usize),
}

/// One iteration of the blur.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BlurStep {
    pub iteration: u32,
    pub direction: BlurDirection,
    pub source: BlurSource,
    /// Ping-pong index written by this step.
    pub destination: usize,
}

/// Fixed-length sequence of alternating blur steps.
///
/// `horizontal` starts `true`; step `k` writes ping-pong index
/// `horizontal as usize`, reads the bright-pass buffer on the first step and
/// the other ping-pong target afterwards, then flips the flag.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BlurSchedule {
    iterations: u32,
}

impl BlurSchedule {
    pub const fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    pub const fn iterations(self) -> u32 {
        self.iterations
    }

    /// Buffer holding the finished blur.
    ///
    /// Ping-pong index `iterations mod 2`; with zero iterations nothing was
    /// written and the composite reads the bright-pass buffer directly.
    pub const fn final_source(self) -> BlurSource {
        if self.iterations == 0 {
            BlurSource::BrightPass
        } else {
            BlurSource::PingPong((self.iterations % 2) as usize)
        }
    }

    pub fn steps(self) -> BlurSteps {
        BlurSteps {
            remaining: self.iterations,
            iteration: 0,
            horizontal: true,
        }
    }
}

/// Iterator over the steps of a [`BlurSchedule`].
#[derive(Debug, Clone)]
pub struct BlurSteps {
    remaining: u32,
    iteration: u32,
    horizontal: bool,
}

impl Iterator for BlurSteps {
    type Item = BlurStep;

    fn next(&mut self) -> Option<BlurStep> {
        if self.remaining == 0 {
            return None;
        }

        let destination = usize::from(self.horizontal);
        let source = if self.iteration == 0 {
            BlurSource::BrightPass
        } else {
            BlurSource::PingPong(1 - destination)
        };
        let direction = if self.horizontal {
            BlurDirection::Horizontal
        } else {
            BlurDirection::Vertical
        };

        let step = BlurStep {
            iteration: self.iteration,
            direction,
            source,
            destination,
        };

        self.horizontal = !self.horizontal;
        self.iteration += 1;
        self.remaining -= 1;

        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for BlurSteps {}
