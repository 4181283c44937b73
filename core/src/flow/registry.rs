// core/src/flow/registry.rs

//! `Flows<E>`: pipelines keyed by the `TypeId` of their context data.

use super::context_data::ContextData;
use super::control::PipelineResult;
use super::error::FlowError;
use super::pipeline::Pipeline;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, Level};

#[async_trait]
trait ErasedPipeline<E>: Send + Sync {
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, E>;
}

struct PipelineWrapper<TData, HandlerErr>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipeline: Pipeline<TData, HandlerErr>,
}

#[async_trait]
impl<TData, HandlerErr, E> ErasedPipeline<E> for PipelineWrapper<TData, HandlerErr>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  E: From<HandlerErr> + From<FlowError> + Send + 'static,
{
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, E> {
    let ctx_data = ctx_obj
      .downcast::<ContextData<TData>>()
      .map_err(|_| {
        E::from(FlowError::TypeMismatch {
          expected_type: std::any::type_name::<ContextData<TData>>(),
        })
      })?;
    self.pipeline.run(*ctx_data).await.map_err(E::from)
  }
}

/// Registry of pipelines. `E` is the error type `run` hands back to callers.
pub struct Flows<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  registry: RwLock<HashMap<TypeId, Arc<dyn ErasedPipeline<E>>>>,
  _phantom: PhantomData<E>,
}

impl<E> Flows<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      registry: RwLock::new(HashMap::new()),
      _phantom: PhantomData,
    }
  }

  /// Registers `pipeline` for contexts of type `TData`, replacing any earlier one.
  pub fn register<TData, HandlerErr>(&self, pipeline: Pipeline<TData, HandlerErr>)
  where
    TData: 'static + Send + Sync,
    HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    E: From<HandlerErr>,
  {
    event!(Level::DEBUG, context_type = %std::any::type_name::<TData>(), "Registering pipeline.");
    self
      .registry
      .write()
      .insert(TypeId::of::<TData>(), Arc::new(PipelineWrapper { pipeline }));
  }

  pub fn is_registered<TData: 'static>(&self) -> bool {
    self.registry.read().contains_key(&TypeId::of::<TData>())
  }

  /// Runs the pipeline registered for `TData`.
  pub async fn run<TData>(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, E>
  where
    TData: 'static + Send + Sync,
  {
    let runner = self
      .registry
      .read()
      .get(&TypeId::of::<TData>())
      .cloned()
      .ok_or_else(|| {
        let context_type = std::any::type_name::<TData>();
        event!(Level::ERROR, context_type, "No pipeline registered.");
        E::from(FlowError::NotRegistered { context_type })
      })?;

    runner.run_erased(Box::new(ctx_data)).await
  }
}

impl<E> Default for Flows<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}
