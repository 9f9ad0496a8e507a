pub mod price;

pub use price::{detect, validate, ChangeDetector, MIN_DELTA};
