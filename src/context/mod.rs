pub mod locks;
pub mod summarizer;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;

pub use summarizer::Summarizer;
pub use window::{Compaction, WindowManager, WindowSettings};
