pub mod axis;
pub mod grid;
pub mod random_variable;
pub mod session;
pub mod sigma;
