pub mod memory;

pub use memory::{LoadPanicked, MemoryCache};
