pub mod aggregate;
pub mod boundary;
pub mod fetch;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod records;
pub mod region;
pub mod usage;
