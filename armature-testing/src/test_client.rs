// Test HTTP Client

use armature_core::{Application, Error, HttpMethod, HttpRequest, HttpResponse, Principal};

/// Sends requests through an application's kernel, in process.
pub struct TestClient {
    app: Application,
}

impl TestClient {
    pub fn new(app: Application) -> Self {
        Self { app }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(TestRequestBuilder::new(HttpMethod::GET, path).build()).await
    }

    pub async fn post(&self, path: &str, body: Vec<u8>) -> TestResponse {
        self.send(TestRequestBuilder::new(HttpMethod::POST, path).body(body).build())
            .await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.send(TestRequestBuilder::new(HttpMethod::DELETE, path).build())
            .await
    }

    /// Handle the request, then run the kernel's terminate phase.
    pub async fn send(&self, request: HttpRequest) -> TestResponse {
        let kernel = self.app.kernel();
        match kernel.handle(request.clone()).await {
            Ok(response) => {
                kernel.terminate(&request, &response).await;
                TestResponse::Success(response)
            }
            Err(error) => TestResponse::Error(error),
        }
    }

    /// Like [`send`](Self::send), but errors are rendered by the exception handler.
    pub async fn send_rendered(&self, request: HttpRequest) -> HttpResponse {
        let kernel = self.app.kernel();
        let response = match kernel.handle(request.clone()).await {
            Ok(response) => response,
            Err(error) => self.app.exceptions().render(&request, &error),
        };
        kernel.terminate(&request, &response).await;
        response
    }
}

/// Builder for test requests
pub struct TestRequestBuilder {
    method: HttpMethod,
    path: String,
    request: HttpRequest,
    query: Vec<(String, String)>,
}

impl TestRequestBuilder {
    pub fn new(method: HttpMethod, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            request: HttpRequest::new(method.as_str().to_string(), path.to_string()),
            query: Vec::new(),
        }
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.request.headers.append(key, value);
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.request.body = body;
        self
    }

    pub fn json<T: serde::Serialize>(mut self, data: &T) -> Result<Self, Error> {
        self.request.body =
            serde_json::to_vec(data).map_err(|e| Error::Serialization(e.to_string()))?;
        self.request.headers.insert("Content-Type", "application/json");
        Ok(self)
    }

    pub fn form(mut self, key: &str, value: &str) -> Self {
        self.request.form.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn host(mut self, host: &str) -> Self {
        self.request.host = Some(host.to_string());
        self
    }

    pub fn acting_as(mut self, user: Principal) -> Self {
        self.request.principal = Some(user);
        self
    }

    pub fn build(self) -> HttpRequest {
        let mut request = self.request;
        if !self.query.is_empty() {
            let pairs: Vec<String> = self
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            let separator = if self.path.contains('?') { '&' } else { '?' };
            request.path = format!("{}{}{}", self.path, separator, pairs.join("&"));
        }
        request.method = self.method.as_str().to_string();
        request
    }
}

/// Response from a test request
#[derive(Debug)]
pub enum TestResponse {
    Success(HttpResponse),
    Error(Error),
}

impl TestResponse {
    pub fn assert_success(&self) -> &HttpResponse {
        match self {
            TestResponse::Success(response) => response,
            TestResponse::Error(error) => {
                panic!("Expected success response, got error: {:?}", error)
            }
        }
    }

    pub fn assert_error(&self) -> &Error {
        match self {
            TestResponse::Error(error) => error,
            TestResponse::Success(_) => {
                panic!("Expected error response, got success")
            }
        }
    }

    /// Status code; errors report the status they map to.
    pub fn status(&self) -> u16 {
        match self {
            TestResponse::Success(response) => response.status,
            TestResponse::Error(error) => error.status_code(),
        }
    }

    pub fn body_string(&self) -> Option<String> {
        match self {
            TestResponse::Success(response) => String::from_utf8(response.body.clone()).ok(),
            TestResponse::Error(_) => None,
        }
    }

    pub fn body_json<T: serde::de::DeserializeOwned>(&self) -> Result<T, String> {
        match self {
            TestResponse::Success(response) => serde_json::from_slice(&response.body)
                .map_err(|e| format!("Deserialization error: {}", e)),
            TestResponse::Error(error) => Err(format!("{:?}", error)),
        }
    }

    pub fn header(&self, key: &str) -> Option<&String> {
        match self {
            TestResponse::Success(response) => response.headers.get(key),
            TestResponse::Error(_) => None,
        }
    }
}
