//! Complex sample type and sample buffer management

use crate::{CoreError, Result};
use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Neg, Sub};

/// Generic sample buffer for audio data
#[derive(Debug, Clone)]
pub struct SampleBuffer<T> {
    data: Vec<T>,
    sample_rate: f64,
}

impl<T> SampleBuffer<T>
where
    T: Clone + Default,
{
    /// Create a new sample buffer with specified capacity and sample rate
    pub fn new(capacity: usize, sample_rate: f64) -> Result<Self> {
        if sample_rate <= 0.0 {
            return Err(CoreError::InvalidSampleRate { rate: sample_rate });
        }

        Ok(Self {
            data: vec![T::default(); capacity],
            sample_rate,
        })
    }

    /// Create a buffer from existing data
    pub fn from_data(data: Vec<T>, sample_rate: f64) -> Result<Self> {
        if sample_rate <= 0.0 {
            return Err(CoreError::InvalidSampleRate { rate: sample_rate });
        }

        Ok(Self { data, sample_rate })
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Get the number of samples
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Get a mutable reference to the underlying data
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Shift the buffer left by `n` samples, discarding the oldest `n`
    /// entries, and write `fresh` into the newly vacated tail.
    ///
    /// Invariant: after the call the newest `fresh.len()` samples occupy the
    /// tail of the buffer. `fresh.len()` must equal `n`.
    pub fn slide(&mut self, n: usize, fresh: &[T]) -> Result<()> {
        if fresh.len() != n {
            return Err(CoreError::BufferSizeMismatch {
                expected: n,
                actual: fresh.len(),
            });
        }
        if n > self.data.len() {
            return Err(CoreError::BufferSizeMismatch {
                expected: self.data.len(),
                actual: n,
            });
        }
        self.data.copy_within(n.., 0);
        let tail_start = self.data.len() - n;
        self.data[tail_start..].clone_from_slice(fresh);
        Ok(())
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Resize the buffer
    pub fn resize(&mut self, new_len: usize) {
        self.data.resize(new_len, T::default());
    }
}

impl<T> Index<usize> for SampleBuffer<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.data[index]
    }
}

impl<T> IndexMut<usize> for SampleBuffer<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.data[index]
    }
}

/// Complex number representation for IQ data
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Complex {
    pub real: f64,
    pub imag: f64,
}

impl Complex {
    pub const ZERO: Complex = Complex {
        real: 0.0,
        imag: 0.0,
    };

    pub fn new(real: f64, imag: f64) -> Self {
        Self { real, imag }
    }

    /// Complex exponential scaled by `magnitude`: `magnitude * exp(j*theta)`
    pub fn from_polar(magnitude: f64, theta: f64) -> Self {
        Self::new(magnitude * theta.cos(), magnitude * theta.sin())
    }

    pub fn magnitude(&self) -> f64 {
        (self.real * self.real + self.imag * self.imag).sqrt()
    }

    pub fn norm(&self) -> f64 {
        self.magnitude()
    }

    pub fn norm_sqr(&self) -> f64 {
        self.real * self.real + self.imag * self.imag
    }

    pub fn phase(&self) -> f64 {
        self.imag.atan2(self.real)
    }

    pub fn conj(&self) -> Self {
        Self::new(self.real, -self.imag)
    }
}

impl Add for Complex {
    type Output = Complex;

    fn add(self, rhs: Complex) -> Complex {
        Complex::new(self.real + rhs.real, self.imag + rhs.imag)
    }
}

impl AddAssign for Complex {
    fn add_assign(&mut self, rhs: Complex) {
        self.real += rhs.real;
        self.imag += rhs.imag;
    }
}

impl Sub for Complex {
    type Output = Complex;

    fn sub(self, rhs: Complex) -> Complex {
        Complex::new(self.real - rhs.real, self.imag - rhs.imag)
    }
}

impl Neg for Complex {
    type Output = Complex;

    fn neg(self) -> Complex {
        Complex::new(-self.real, -self.imag)
    }
}

impl Mul for Complex {
    type Output = Complex;

    fn mul(self, rhs: Complex) -> Complex {
        Complex::new(
            self.real * rhs.real - self.imag * rhs.imag,
            self.real * rhs.imag + self.imag * rhs.real,
        )
    }
}

impl Mul<f64> for Complex {
    type Output = Complex;

    fn mul(self, rhs: f64) -> Self::Output {
        Complex::new(self.real * rhs, self.imag * rhs)
    }
}

impl Div<f64> for Complex {
    type Output = Complex;

    fn div(self, rhs: f64) -> Complex {
        Complex::new(self.real / rhs, self.imag / rhs)
    }
}

impl Div for Complex {
    type Output = Complex;

    /// Complex division `self / rhs`
    fn div(self, rhs: Complex) -> Complex {
        let denom = rhs.norm_sqr();
        (self * rhs.conj()) / denom
    }
}

/// Type alias for complex sample buffers (IQ data)
pub type ComplexBuffer = SampleBuffer<Complex>;

/// Type alias for real sample buffers (audio data)
pub type AudioBuffer = SampleBuffer<f64>;
