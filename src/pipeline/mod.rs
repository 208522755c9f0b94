//! Internal pipeline stages.
//!
//! Each stage is a small module with a single responsibility, run strictly in
//! sequence by [`crate::extract`]:
//!
//! 1. [`load`] — validate the input path and decode the image
//! 2. [`encode`] — bitmap → base64 PNG [`edgequake_llm::ImageData`]
//! 3. [`vision`] — one call to the vision model
//! 4. [`normalize`] — fence-strip and parse the model's reply as JSON

pub mod encode;
pub mod load;
pub mod normalize;
pub mod vision;
