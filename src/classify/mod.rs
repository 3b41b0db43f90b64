mod classifier;
mod dispatcher;

pub use classifier::{Classification, Classifier, StaticClassifier};
pub use dispatcher::{ClassificationDispatcher, ClassificationOutcome, DispatcherStats};
