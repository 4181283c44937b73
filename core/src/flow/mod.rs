// core/src/flow/mod.rs

//! Named-step workflow pipelines.
//!
//! A `Pipeline<TData, Err>` runs an ordered list of steps against a shared
//! `ContextData<TData>`. Each step may carry `on` and `after` handlers; any
//! handler can stop the run early or fail it with the pipeline's error type.
//! `Flows<Err>` is a registry keyed by the context type, so callers only need
//! to build a context and hand it over.

pub mod context_data;
pub mod control;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use context_data::ContextData;
pub use control::{PipelineControl, PipelineResult};
pub use error::FlowError;
pub use pipeline::{Handler, Pipeline, StepDef};
pub use registry::Flows;
