pub mod tesla_model;

pub use tesla_model::TeslaModel;
