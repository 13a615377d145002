/// Feature construction for the flood risk classifier.
///
/// Turns raw hourly series into the four-feature vectors the classifier
/// consumes, and labels historical rows for training.
///
/// Submodules:
/// - `features`: pressure trend, feature vectors, sample selection.
/// - `labeling`: rule-based training labels for historical rows.

pub mod features;
pub mod labeling;
