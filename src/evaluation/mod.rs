mod evaluator;

pub use evaluator::{Evaluate, Evaluator, Metrics};
