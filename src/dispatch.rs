//! Dispatch engine.
//!
//! Feeds a [`SyntheticRequest`] through the host application's own kernel
//! and always comes back with a response: errors and panics raised while the
//! request is handled go through the host exception handler, the same way a
//! real request would.

use crate::config::UserRetriever;
use crate::synth::SyntheticRequest;
use armature_core::logging::{debug, error, warn};
use armature_core::{Application, Cookie, Error, HeaderMap, HttpRequest, HttpResponse, Principal};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// What came back from a simulated call.
#[derive(Debug, Clone)]
pub struct SimulatedResponse {
    pub status_code: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    pub raw_body: Vec<u8>,
    pub content_type: Option<String>,
}

impl SimulatedResponse {
    pub fn from_response(response: &HttpResponse) -> Self {
        Self {
            status_code: response.status,
            status_text: response.status_text(),
            headers: response.headers.clone(),
            raw_body: response.body.clone(),
            content_type: response.content_type().cloned(),
        }
    }

    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.raw_body).into_owned()
    }

    /// Cookies set through `Set-Cookie` headers.
    pub fn cookies(&self) -> Vec<Cookie> {
        self.headers
            .get_all("set-cookie")
            .into_iter()
            .filter_map(|value| Cookie::parse(value))
            .collect()
    }
}

impl From<HttpResponse> for SimulatedResponse {
    fn from(response: HttpResponse) -> Self {
        Self::from_response(&response)
    }
}

pub struct DispatchEngine {
    app: Application,
    guard: String,
    user_retriever: Option<Arc<dyn UserRetriever>>,
}

impl DispatchEngine {
    pub fn new(app: Application, guard: impl Into<String>) -> Self {
        Self {
            app,
            guard: guard.into(),
            user_retriever: None,
        }
    }

    pub fn with_user_retriever(mut self, retriever: Option<Arc<dyn UserRetriever>>) -> Self {
        self.user_retriever = retriever;
        self
    }

    /// Look up the user to act as. Failures are logged, never raised.
    pub async fn resolve_principal(&self, id: &str) -> Option<Principal> {
        let lookup = async {
            match &self.user_retriever {
                Some(retriever) => Ok(retriever.retrieve(id).await),
                None => self.app.auth.retrieve(&self.guard, id).await,
            }
        };

        match AssertUnwindSafe(lookup).catch_unwind().await {
            Ok(Ok(Some(principal))) => Some(principal),
            Ok(Ok(None)) => {
                warn!(user = id, guard = %self.guard, "Impersonated user not found");
                None
            }
            Ok(Err(err)) => {
                warn!(user = id, guard = %self.guard, error = %err, "Failed to resolve impersonated user");
                None
            }
            Err(payload) => {
                warn!(user = id, panic = %panic_message(payload.as_ref()), "User lookup panicked");
                None
            }
        }
    }

    /// Run the request through the kernel, then terminate it.
    pub async fn dispatch(&self, request: SyntheticRequest, impersonate: Option<&str>) -> SimulatedResponse {
        let mut request = request.into_http_request();
        if let Some(id) = impersonate {
            request.principal = self.resolve_principal(id).await;
        }

        debug!(
            method = %request.method,
            path = %request.path,
            acting_as = request.principal.as_ref().map(|p| p.id.as_str()),
            "Dispatching simulated request"
        );

        let kernel = self.app.kernel.clone();
        let outcome = AssertUnwindSafe(kernel.handle(request.clone()))
            .catch_unwind()
            .await;

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => self.render(&request, &err),
            Err(payload) => {
                let err = Error::Panic(panic_message(payload.as_ref()));
                self.render(&request, &err)
            }
        };

        let terminated = AssertUnwindSafe(kernel.terminate(&request, &response))
            .catch_unwind()
            .await;
        if let Err(payload) = terminated {
            error!(panic = %panic_message(payload.as_ref()), "Kernel terminate panicked");
        }

        debug!(status = response.status, "Simulated request finished");
        SimulatedResponse::from_response(&response)
    }

    fn render(&self, request: &HttpRequest, err: &Error) -> HttpResponse {
        let exceptions = self.app.exceptions.clone();
        let rendered = panic::catch_unwind(AssertUnwindSafe(|| {
            exceptions.report(err);
            exceptions.render(request, err)
        }));

        rendered.unwrap_or_else(|payload| {
            error!(panic = %panic_message(payload.as_ref()), error = %err, "Exception handler panicked");
            HttpResponse::internal_server_error()
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
