pub mod model;
pub mod params;
pub mod paths;
pub mod pricer;
pub mod risk_neutral;
pub mod tree;
