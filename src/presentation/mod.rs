pub mod prompt;
pub mod render;

pub use prompt::Prompt;
