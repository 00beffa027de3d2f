/*
[INPUT]:  Prompts and task identifiers
[OUTPUT]: Server-canonical Task records
[POS]:    HTTP layer - task submission and history endpoints
[UPDATE]: When task endpoints or the read-path degradation policy change
*/

use reqwest::{Method, StatusCode};
use tracing::{debug, info, warn};

use crate::http::{NextgenClient, NextgenError, Result};
use crate::types::{CreateTaskRequest, Task};

impl NextgenClient {
    /// Submit a generation task
    ///
    /// POST /tasks
    ///
    /// The returned task carries the server-assigned id and is the
    /// authoritative record; callers should not build their own.
    pub async fn submit_task(&self, prompt: &str, negative_prompt: Option<&str>) -> Result<Task> {
        let request = CreateTaskRequest::new(prompt, negative_prompt.map(str::to_string));
        self.submit_task_with(request).await
    }

    /// Submit a generation task with explicit generation parameters
    ///
    /// POST /tasks
    pub async fn submit_task_with(&self, request: CreateTaskRequest) -> Result<Task> {
        if request.prompt.trim().is_empty() {
            return Err(NextgenError::EmptyPrompt);
        }

        let builder = self.request(Method::POST, "tasks")?.json(&request);
        let task: Task = self.send_json(builder).await.inspect_err(|err| {
            warn!(error = %err, "task submission failed");
        })?;

        info!(task_id = %task.id, status = %task.status, "task submitted");
        Ok(task)
    }

    /// List every task the service knows about, newest first
    ///
    /// GET /tasks
    pub async fn try_fetch_history(&self) -> Result<Vec<Task>> {
        let builder = self.request(Method::GET, "tasks")?;
        self.send_json(builder).await
    }

    /// Like [`NextgenClient::try_fetch_history`], but any failure degrades to
    /// an empty list. An empty result therefore does not prove the service
    /// has no tasks.
    pub async fn fetch_history(&self) -> Vec<Task> {
        match self.try_fetch_history().await {
            Ok(tasks) => {
                debug!(count = tasks.len(), "fetched task history");
                tasks
            }
            Err(err) => {
                warn!(error = %err, "history fetch failed; returning empty list");
                Vec::new()
            }
        }
    }

    /// Fetch a single task
    ///
    /// GET /tasks/{id}
    pub async fn fetch_task(&self, id: &str) -> Result<Option<Task>> {
        let endpoint = format!("tasks/{id}");
        let builder = self.request(Method::GET, &endpoint)?;
        match self.send_json(builder).await {
            Ok(task) => Ok(Some(task)),
            Err(NextgenError::Server { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::http::{ClientConfig, FailureKind, NextgenClient, NextgenError};
    use std::time::Duration;
    use crate::types::{CreateTaskRequest, TaskStatus};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn task_json(id: &str, status: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "prompt": "a cat",
            "negative_prompt": null,
            "created_at": "2024-01-01T00:00:00Z",
            "status": status,
            "imageUrl": null,
        })
    }

    #[tokio::test]
    async fn test_submit_task() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tasks"))
            .and(body_json(serde_json::json!({
                "prompt": "a cat",
                "negative_prompt": null,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(task_json("42", "submitted")))
            .expect(1)
            .mount(&server)
            .await;

        let client = NextgenClient::new(&server.uri()).expect("client init");
        let task = client.submit_task("a cat", None).await.expect("submit_task failed");

        assert_eq!(task.id, "42");
        assert_eq!(task.status, TaskStatus::Submitted);
    }

    #[tokio::test]
    async fn test_submit_task_with_parameters() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tasks"))
            .and(body_json(serde_json::json!({
                "prompt": "a cat",
                "negative_prompt": "dogs",
                "steps": 25,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(task_json("43", "submitted")))
            .expect(1)
            .mount(&server)
            .await;

        let client = NextgenClient::new(&server.uri()).expect("client init");
        let request = CreateTaskRequest::new("a cat", Some("dogs".to_string())).steps(25);
        let task = client.submit_task_with(request).await.expect("submit failed");
        assert_eq!(task.id, "43");
    }

    #[tokio::test]
    async fn test_submit_task_rejects_blank_prompt_without_request() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = NextgenClient::new(&server.uri()).expect("client init");
        for prompt in ["", "   ", "\n\t"] {
            let err = client.submit_task(prompt, None).await.unwrap_err();
            assert!(matches!(err, NextgenError::EmptyPrompt));
        }
    }

    #[tokio::test]
    async fn test_submit_task_server_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tasks"))
            .respond_with(
                ResponseTemplate::new(500).set_body_string("Failed to save task: disk full"),
            )
            .mount(&server)
            .await;

        let client = NextgenClient::new(&server.uri()).expect("client init");
        let err = client.submit_task("a cat", None).await.unwrap_err();

        match &err {
            NextgenError::Server { status, body } => {
                assert_eq!(*status, 500);
                assert!(body.contains("disk full"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.failure_kind(), Some(FailureKind::BadResponse(500)));
    }

    #[tokio::test]
    async fn test_submit_task_malformed_payload() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "prompt": "a cat",
                "status": "submitted",
            })))
            .mount(&server)
            .await;

        let client = NextgenClient::new(&server.uri()).expect("client init");
        let err = client.submit_task("a cat", None).await.unwrap_err();
        assert!(matches!(err, NextgenError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_fetch_history_degrades_to_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = NextgenClient::new(&server.uri()).expect("client init");
        assert!(client.fetch_history().await.is_empty());
        assert!(matches!(
            client.try_fetch_history().await,
            Err(NextgenError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_task_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/tasks/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "detail": "Task not found",
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tasks/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(task_json("1", "processing")))
            .mount(&server)
            .await;

        let client = NextgenClient::new(&server.uri()).expect("client init");
        assert!(client.fetch_task("missing").await.expect("fetch").is_none());

        let task = client.fetch_task("1").await.expect("fetch").expect("present");
        assert_eq!(task.status, TaskStatus::Processing);
    }

    #[tokio::test]
    async fn test_submit_task_slow_reply_is_receive_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tasks"))
            .and(body_json(serde_json::json!({
                "prompt": "a cat",
                "negative_prompt": null,
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(task_json("42", "submitted"))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let config = ClientConfig {
            timeout: Duration::from_millis(200),
            ..ClientConfig::default()
        };
        let client = NextgenClient::with_config(config, &server.uri()).expect("client init");
        let err = client.submit_task("a cat", None).await.unwrap_err();

        // The body reached the server; only the reply was late.
        assert_eq!(server.received_requests().await.map(|r| r.len()), Some(1));
        assert_eq!(err.failure_kind(), Some(FailureKind::ReceiveTimeout));
        assert_eq!(err.user_message(), "Waiting for the server response timed out");
    }
}
