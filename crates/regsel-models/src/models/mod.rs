pub mod decision_tree;
pub mod gbdt;
pub mod linear;
pub mod params;

pub mod factory;
pub mod regressor_trait;

pub use decision_tree::DecisionTreeRegressor;
pub use gbdt::GradientBoostingRegressor;
pub use linear::LinearRegression;
pub use params::{ParamGrid, ParamSet, ParamValue};
pub use regressor_trait::Regressor;
