pub use std::ops::{Deref, DerefMut};

/// Slice access to a fixed-length sample buffer, sized once when the processing
/// context is built. The type must hold its samples in a `buffer` field.
macro_rules! deref_buffer {
    ($t:ty, $s:ty) => {
        impl Deref for $t {
            type Target = [$s];

            fn deref(&self) -> &Self::Target {
                &self.buffer
            }
        }

        impl DerefMut for $t {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.buffer
            }
        }
    };
}

pub(crate) use deref_buffer;

/// Root mean square of `x`. An empty slice has RMS 0.
pub fn rms<T: Copy + Into<f64>>(x: &[T]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let squared: f64 = x.iter().map(|&v| v.into() * v.into()).sum();
    (squared / x.len() as f64).sqrt()
}
