//! Ordered interceptor chain.
//!
//! Each stage receives the request and a [`Next`] handle for the rest of the
//! chain. Stages run outbound in registration order; their post-processing of
//! the result therefore runs inbound in reverse order. The last link is a
//! [`Transport`], which performs the actual I/O.
//!
//! ```text
//! send(req) -> stage[0] -> stage[1] -> ... -> transport
//!                  ^           ^                  |
//!                  +-----------+------ result ----+
//! ```

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::envelope::{HttpRequest, HttpResponse};
use crate::error::PipelineError;

pub type PipelineResult = Result<HttpResponse, PipelineError>;

/// One link of the chain. Implementations must call `next.run` exactly once
/// unless they answer the request themselves.
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &'static str;

    fn intercept<'a>(&'a self, request: HttpRequest, next: Next<'a>)
    -> BoxFuture<'a, PipelineResult>;
}

/// Performs the request once it has passed every interceptor.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, PipelineResult>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, PipelineResult> {
        (**self).send(request)
    }
}

/// The remainder of the chain after the current stage.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn Interceptor>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    pub fn run(self, request: HttpRequest) -> BoxFuture<'a, PipelineResult> {
        match self.stages.split_first() {
            Some((stage, rest)) => stage.intercept(
                request,
                Next {
                    stages: rest,
                    transport: self.transport,
                },
            ),
            None => self.transport.send(request),
        }
    }
}

/// An immutable, cheaply cloneable interceptor chain bound to a transport.
#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Interceptor>>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub async fn send(&self, request: HttpRequest) -> PipelineResult {
        let next = Next {
            stages: &self.stages,
            transport: self.transport.as_ref(),
        };
        next.run(request).await
    }

    /// Stage names in outbound order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<Arc<dyn Interceptor>>,
}

impl PipelineBuilder {
    /// Append a stage. Stages run outbound in the order they are added.
    pub fn with(mut self, stage: impl Interceptor + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn build(self, transport: impl Transport + 'static) -> Pipeline {
        Pipeline {
            stages: self.stages,
            transport: Arc::new(transport),
        }
    }
}
