// Test assertions for HTTP responses

use crate::TestResponse;

pub fn assert_status(response: &TestResponse, expected: u16) {
    let actual = response.status();
    assert_eq!(
        actual, expected,
        "Expected status {}, got {}",
        expected, actual
    );
}

/// Assert that the body deserializes to `expected`.
pub fn assert_json<T>(response: &TestResponse, expected: &T)
where
    T: serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
{
    let actual: T = response
        .body_json()
        .unwrap_or_else(|e| panic!("Failed to deserialize response body: {}", e));
    assert_eq!(actual, *expected, "JSON bodies do not match");
}

pub fn assert_header(response: &TestResponse, key: &str, expected: &str) {
    let actual = response.header(key).map(|s| s.as_str());
    assert_eq!(
        actual,
        Some(expected),
        "Expected header '{}' to be '{}', got {:?}",
        key,
        expected,
        actual
    );
}

pub fn assert_body_contains(response: &TestResponse, expected: &str) {
    let body = response.body_string().unwrap_or_default();
    assert!(
        body.contains(expected),
        "Expected body to contain '{}', but it didn't. Body: {}",
        expected,
        body
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use armature_core::{Error, HttpResponse};

    #[test]
    fn test_success_assertions() {
        let response = TestResponse::Success(
            HttpResponse::ok()
                .with_header("Content-Type", "application/json")
                .with_body(b"{\"status\":\"ok\"}".to_vec()),
        );

        assert_status(&response, 200);
        assert_header(&response, "content-type", "application/json");
        assert_json(&response, &serde_json::json!({"status": "ok"}));
        assert_body_contains(&response, "ok");
    }

    #[test]
    fn test_error_status() {
        let response = TestResponse::Error(Error::NotFound("gone".into()));
        assert_status(&response, 404);
    }

    #[test]
    #[should_panic(expected = "Expected status 201")]
    fn test_status_mismatch_panics() {
        assert_status(&TestResponse::Success(HttpResponse::ok()), 201);
    }
}
