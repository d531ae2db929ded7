mod classifier;

pub use classifier::{Resolution, ResponseClassifier};
