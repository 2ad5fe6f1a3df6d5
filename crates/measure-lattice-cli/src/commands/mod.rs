pub mod filtration;
pub mod lattice;
pub mod partition;
