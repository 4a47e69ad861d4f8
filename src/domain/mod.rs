pub mod blob;
pub mod claim;
pub mod commitment;
pub mod merkle;
pub mod product;
pub mod snapshot;
pub mod tier;
pub mod witness;
