use std::sync::Arc;

use promptlab_core::estimators_api::Estimator;

pub mod ate;
pub mod ols;

pub use ate::NaiveAte;
pub use ols::FixedEffectsOls;

pub fn default_estimators() -> Vec<Arc<dyn Estimator>> {
    vec![Arc::new(ols::FixedEffectsOls), Arc::new(ate::NaiveAte::default())]
}

/// Same as [`default_estimators`] but with treatment effects for all four factors.
pub fn extended_estimators() -> Vec<Arc<dyn Estimator>> {
    vec![Arc::new(ols::FixedEffectsOls), Arc::new(ate::NaiveAte::all_factors())]
}
