pub mod decode;
pub mod extract;
pub mod spectrum;

pub use decode::{load_audio, AudioData};
pub use extract::{extract_features, ExtractionConfig};
