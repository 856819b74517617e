//! Service layer

pub mod source_service;

pub use source_service::RandomnessSourceService;
