//! Small building blocks shared by the client and configuration layers.
//!
//! # Responsibilities
//! - Accumulate placeholder tokens while scanning URL templates (stack.rs)
//! - Expand `{name}` placeholders in URL templates (template.rs)
//! - Close writers without propagating close failures (close.rs)

pub mod close;
pub mod stack;
pub mod template;

pub use close::close_quietly;
pub use stack::ByteStack;
pub use template::expand;
