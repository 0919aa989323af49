pub mod rotation;
pub mod source;

pub use rotation::{decide, Resume, ResumeReason};
pub use source::{Line, LineSource};
