pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod docs;
pub mod efficiency;
pub mod errors;
pub mod estimators_api;
pub mod fingerprint;
pub mod model;
pub mod report;
