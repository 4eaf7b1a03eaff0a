//! Job store implementations.

pub mod job;
pub mod memory;

pub use job::PgJobRepository;
pub use memory::MemoryJobRepository;
