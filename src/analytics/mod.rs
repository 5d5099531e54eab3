pub mod aggregate;
pub mod events;
pub mod ingest;
pub mod report;

pub use aggregate::*;
pub use events::*;
pub use ingest::*;
pub use report::*;
