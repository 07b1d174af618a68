pub mod blink;
pub mod ear;
pub mod landmarks;
pub mod source;

pub use blink::BlinkDetector;
pub use landmarks::{LandmarkFrame, Point};
pub use source::{JsonLinesInput, JsonLinesSource, LandmarkSource, SimulatedSource};
