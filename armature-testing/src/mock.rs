// Mock collaborators for testing

use armature_core::{
    Error, HttpKernel, HttpRequest, HttpResponse, Principal, TerminableMiddleware, UserProvider,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// User provider that records every lookup.
///
/// Unknown ids resolve to `None`; ids registered with
/// [`failing_on`](Self::failing_on) make the lookup itself fail.
#[derive(Clone, Default)]
pub struct MockUserProvider {
    users: Arc<Mutex<HashMap<String, Principal>>>,
    failures: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockUserProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: Principal) -> Self {
        self.users.lock().insert(user.id.clone(), user);
        self
    }

    pub fn failing_on(self, id: &str) -> Self {
        self.failures.lock().push(id.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn was_called_with(&self, id: &str) -> bool {
        self.calls.lock().iter().any(|c| c == id)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl UserProvider for MockUserProvider {
    async fn retrieve_by_id(&self, id: &str) -> Result<Option<Principal>, Error> {
        self.calls.lock().push(id.to_string());
        if self.failures.lock().iter().any(|f| f == id) {
            return Err(Error::ServiceUnavailable(format!("user store unavailable for {}", id)));
        }
        Ok(self.users.lock().get(id).cloned())
    }
}

/// Terminable middleware that remembers every terminated request.
#[derive(Default)]
pub struct RecordingTerminator {
    seen: Mutex<Vec<(String, u16)>>,
}

impl RecordingTerminator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.seen.lock().len()
    }

    /// `(path, status)` pairs in termination order.
    pub fn seen(&self) -> Vec<(String, u16)> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl TerminableMiddleware for RecordingTerminator {
    async fn terminate(&self, req: &HttpRequest, res: &HttpResponse) {
        self.seen.lock().push((req.path.clone(), res.status));
    }
}

/// How a [`FaultyKernel`] misbehaves.
#[derive(Debug, Clone)]
pub enum Fault {
    /// `handle` returns this error message as an internal error.
    Error(String),
    /// `handle` panics with this message.
    Panic(String),
    /// `handle` succeeds but `terminate` panics.
    PanicOnTerminate(String),
}

/// Kernel that fails on purpose, counting how often each phase ran.
pub struct FaultyKernel {
    fault: Fault,
    handled: AtomicUsize,
    terminated: AtomicUsize,
}

impl FaultyKernel {
    pub fn new(fault: Fault) -> Arc<Self> {
        Arc::new(Self {
            fault,
            handled: AtomicUsize::new(0),
            terminated: AtomicUsize::new(0),
        })
    }

    pub fn handled(&self) -> usize {
        self.handled.load(Ordering::SeqCst)
    }

    pub fn terminated(&self) -> usize {
        self.terminated.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpKernel for FaultyKernel {
    async fn handle(&self, _request: HttpRequest) -> Result<HttpResponse, Error> {
        self.handled.fetch_add(1, Ordering::SeqCst);
        match &self.fault {
            Fault::Error(message) => Err(Error::Internal(message.clone())),
            Fault::Panic(message) => panic!("{}", message),
            Fault::PanicOnTerminate(_) => Ok(HttpResponse::text("handled")),
        }
    }

    async fn terminate(&self, _request: &HttpRequest, _response: &HttpResponse) {
        self.terminated.fetch_add(1, Ordering::SeqCst);
        if let Fault::PanicOnTerminate(message) = &self.fault {
            panic!("{}", message);
        }
    }
}
