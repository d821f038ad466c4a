//! Testing utilities and harness for memolist

pub mod channel;
pub mod compute;
pub mod fixtures;
pub mod renderer;

pub use channel::*;
pub use compute::*;
pub use fixtures::*;
pub use renderer::*;
