//! # breedmix model-component validation
//!
//! Validation and normalization of mixed-model component specifications
//! for quantitative genetics. Each top-level validator takes a raw,
//! partially-specified component, the fitting response, and the dataset,
//! and returns an immutable [`ComponentDescriptor`] with every parameter
//! validated and missing initial variances completed through an injected
//! [`VarianceStrategy`]. All failures are fatal validation errors; no
//! partially-defaulted descriptor is ever returned.

#![deny(dead_code)]
#![deny(unused_imports)]

pub mod coordinates;
mod data;
pub mod descriptor;
pub mod error;
pub mod generic;
pub mod genetic;
pub mod grid;
pub mod pedigree;
pub mod spatial;
pub mod types;
pub mod variance;

pub use descriptor::{ComponentDescriptor, DescriptorBuilder};
pub use error::{SpecError, VarianceDefect};
pub use generic::{GenericSet, GenericSpec, validate_generic, validate_generic_set};
pub use genetic::{GeneticModel, GeneticSpec, validate_genetic};
pub use pedigree::Pedigree;
pub use spatial::{SpatialModel, SpatialSpec, validate_spatial};
pub use types::{CoordinateTable, Factor, ParamValue, SpecValue};
pub use variance::{EmpiricalVariance, VarianceStrategy, validate_variance};
