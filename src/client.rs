//! HTTP client for the Pingdom REST API.

use crate::config::Credentials;
use crate::error::{Error, ParseError, ValidationError};
use crate::limits::{RateLimitTracker, RateLimits, LONG_LIMIT_HEADER, SHORT_LIMIT_HEADER};
use crate::params::Params;
use crate::resources::{
    parse_resources, Check, CheckResult, Contact, Probe, Resource, Summary,
};
use crate::transport::{ApiRequest, ApiResponse, Method, ReqwestTransport, Transport};
use base64::Engine;
use log::{debug, warn};
use serde_json::Value;
use url::Url;

/// Root of the Pingdom REST API.
pub const API_BASE: &str = "https://api.pingdom.com/api/2.0/";

/// Pingdom API client.
///
/// Owns the transport configuration and the latest rate-limit snapshot.
/// Operations issue one awaited HTTP call each; nothing is cached, every
/// read re-fetches.
pub struct Client {
    credentials: Credentials,
    base_url: Url,
    user_agent: String,
    transport: Box<dyn Transport>,
    limits: RateLimitTracker,
}

impl Client {
    /// Create a client for the production API.
    ///
    /// Fails with a configuration error when the application key is empty;
    /// no request is attempted.
    pub fn new(credentials: Credentials) -> Result<Self, Error> {
        credentials.validate()?;
        Ok(Self {
            credentials,
            base_url: Url::parse(API_BASE).expect("api base url"),
            user_agent: format!("pingdom_lib/{}", crate::VERSION),
            transport: Box::new(ReqwestTransport::new()),
            limits: RateLimitTracker::default(),
        })
    }

    /// Replace the HTTP transport (tests, alternate HTTP stacks).
    pub fn with_transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Point the client at a different API root. The URL should end with a
    /// trailing slash so relative paths resolve under it.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Latest rate-limit snapshot, empty before the first request.
    pub fn rate_limits(&self) -> RateLimits {
        self.limits.snapshot()
    }

    /// GET `path` with query-normalized parameters.
    pub async fn get(&self, path: &str, params: &Params) -> Result<ApiResponse, Error> {
        let mut url = self.endpoint(path);
        let pairs = params.encode();
        if !pairs.is_empty() {
            url.set_query(Some(&form_encode(&pairs)));
        }
        self.dispatch(ApiRequest {
            method: Method::Get,
            url,
            headers: self.headers(),
            body: None,
        })
        .await
    }

    /// PUT `path` with parameters as a form body (no query normalization).
    pub async fn put(&self, path: &str, params: &Params) -> Result<ApiResponse, Error> {
        self.send_form(Method::Put, path, params).await
    }

    /// POST `path` with parameters as a form body (no query normalization).
    pub async fn post(&self, path: &str, params: &Params) -> Result<ApiResponse, Error> {
        self.send_form(Method::Post, path, params).await
    }

    /// GET `single`: run a one-off connectivity test and return its result.
    pub async fn test(&self, options: Params) -> Result<CheckResult, Error> {
        let response = self.get("single", &options).await?;
        first_resource(&response.body)
    }

    /// Create a check and return it, re-fetched by its new id.
    ///
    /// `name`, `kind` and `host` are mandatory and override any same-named
    /// options. A non-success response yields `Ok(None)` rather than an
    /// error; callers that care can inspect [`Client::rate_limits`] or retry
    /// on their own terms.
    pub async fn create_check(
        &self,
        name: &str,
        kind: &str,
        host: &str,
        options: Params,
    ) -> Result<Option<Check>, Error> {
        if name.is_empty() || kind.is_empty() || host.is_empty() {
            return Err(ValidationError::new(format!(
                "name, type and host are mandatory [{}] [{}] [{}]",
                name, kind, host
            ))
            .into());
        }
        let params = options.add("name", name).add("type", kind).add("host", host);
        let response = self.post("checks", &params).await?;
        if !response.is_success() {
            return Ok(None);
        }
        let id = response
            .body
            .get("check")
            .and_then(|check| check.get("id"))
            .and_then(Value::as_u64)
            .ok_or_else(|| ParseError::new("create response has no check id"))?;
        self.check(id).await.map(Some)
    }

    /// List checks.
    pub async fn checks(&self, options: Params) -> Result<Vec<Check>, Error> {
        let response = self.get("checks", &options).await?;
        Ok(parse_resources(&response.body)?)
    }

    /// Fetch one check with its type-specific settings.
    pub async fn check(&self, id: u64) -> Result<Check, Error> {
        let response = self.get(&format!("checks/{}", id), &Params::new()).await?;
        first_resource(&response.body)
    }

    /// PUT new settings for an existing check. Returns the raw response;
    /// the server does not echo the updated check back.
    pub async fn update_check(&self, check: &Check, params: Params) -> Result<ApiResponse, Error> {
        self.put(&format!("checks/{}", check.id), &params).await
    }

    /// Raw results for a check, newest first. Analysis is included unless
    /// the caller overrides `includeanalysis`.
    pub async fn results(&self, id: u64, options: Params) -> Result<Vec<CheckResult>, Error> {
        let options = options.with_defaults(Params::new().add("includeanalysis", true));
        let response = self.get(&format!("results/{}", id), &options).await?;
        Ok(parse_resources(&response.body)?)
    }

    /// List monitoring probes.
    pub async fn probes(&self, options: Params) -> Result<Vec<Probe>, Error> {
        let response = self.get("probes", &options).await?;
        Ok(parse_resources(&response.body)?)
    }

    /// List notification contacts.
    pub async fn contacts(&self, options: Params) -> Result<Vec<Contact>, Error> {
        let response = self.get("contacts", &options).await?;
        Ok(parse_resources(&response.body)?)
    }

    /// Lazy summary handle for a check; no request until fetched.
    pub fn summary(&self, id: u64) -> Summary<'_> {
        Summary::new(self, id)
    }

    fn endpoint(&self, path: &str) -> Url {
        self.base_url.join(path).expect("endpoint url")
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            ("App-Key".to_string(), self.credentials.key.clone()),
            ("Accept".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), self.user_agent.clone()),
        ];
        if let Some(email) = &self.credentials.account_email {
            headers.push(("Account-Email".to_string(), email.clone()));
        }
        if let Some(username) = &self.credentials.username {
            let password = self.credentials.password.as_deref().unwrap_or("");
            let token = base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", username, password));
            headers.push(("Authorization".to_string(), format!("Basic {}", token)));
        }
        headers
    }

    async fn send_form(
        &self,
        method: Method,
        path: &str,
        params: &Params,
    ) -> Result<ApiResponse, Error> {
        let body = form_encode(&params.form_pairs());
        self.dispatch(ApiRequest {
            method,
            url: self.endpoint(path),
            headers: self.headers(),
            body: Some(body),
        })
        .await
    }

    /// Single choke point for all calls: every completed response, success
    /// or not, feeds the rate-limit tracker before the caller sees it.
    async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        debug!("{} {}", request.method.as_str(), request.url);
        let response = self.transport.execute(request).await?;
        self.limits.update(
            response.header(SHORT_LIMIT_HEADER),
            response.header(LONG_LIMIT_HEADER),
        );
        if !response.is_success() {
            warn!("pingdom api returned status {}", response.status);
        }
        Ok(response)
    }
}

fn form_encode(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(name, value)| {
            format!(
                "{}={}",
                urlencoding::encode(name),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn first_resource<R: Resource>(body: &Value) -> Result<R, Error> {
    parse_resources::<R>(body)?
        .into_iter()
        .next()
        .ok_or_else(|| ParseError::new(format!("empty '{}' payload", R::SINGULAR)).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    /// Scripted transport double: hands out queued responses and records
    /// every request it sees.
    #[derive(Default)]
    struct MockTransport {
        responses: Mutex<VecDeque<ApiResponse>>,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl MockTransport {
        fn queue(&self, response: ApiResponse) {
            self.responses.lock().unwrap().push_back(response);
        }

        fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for Arc<MockTransport> {
        async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| TransportError::new("mock transport exhausted"))
        }
    }

    fn response(status: u16, body: Value) -> ApiResponse {
        let mut headers = HashMap::new();
        headers.insert(
            SHORT_LIMIT_HEADER.to_string(),
            "Remaining: 394 Time until reset: 3589".to_string(),
        );
        headers.insert(
            LONG_LIMIT_HEADER.to_string(),
            "Remaining: 43196 Time until reset: 2591989".to_string(),
        );
        ApiResponse {
            status,
            headers,
            body,
        }
    }

    fn client_with(mock: &Arc<MockTransport>) -> Client {
        Client::new(Credentials::new("test-key"))
            .unwrap()
            .with_transport(Box::new(Arc::clone(mock)))
    }

    fn request_header<'a>(request: &'a ApiRequest, name: &str) -> Option<&'a str> {
        request
            .headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn empty_application_key_is_rejected_at_construction() {
        assert!(matches!(
            Client::new(Credentials::new("")),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn create_check_rejects_empty_mandatory_arguments() {
        let mock = Arc::new(MockTransport::default());
        let client = client_with(&mock);

        let err = client
            .create_check("", "http", "example.com", Params::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = client
            .create_check("my check", "http", "", Params::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        assert_eq!(mock.request_count(), 0, "no request may be issued");
    }

    #[tokio::test]
    async fn create_check_returns_none_on_server_error() {
        let mock = Arc::new(MockTransport::default());
        mock.queue(response(500, json!({"error": {"statuscode": 500}})));
        let client = client_with(&mock);

        let created = client
            .create_check("my check", "http", "example.com", Params::new())
            .await
            .unwrap();
        assert!(created.is_none());
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn create_check_refetches_the_created_check() {
        let mock = Arc::new(MockTransport::default());
        mock.queue(response(
            200,
            json!({"check": {"id": 85975, "name": "my check"}}),
        ));
        mock.queue(response(
            200,
            json!({"check": {
                "id": 85975, "name": "my check", "hostname": "example.com",
                "type": {"http": {"url": "/"}}, "status": "unconfirmed",
            }}),
        ));
        let client = client_with(&mock);

        let created = client
            .create_check(
                "my check",
                "http",
                "example.com",
                Params::new().add("resolution", 5i64),
            )
            .await
            .unwrap()
            .expect("check should be created");
        assert_eq!(created.id, 85975);
        assert_eq!(created.kind.name(), Some("http"));

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, Method::Post);
        assert!(requests[0].url.path().ends_with("/checks"));
        let body = requests[0].body.as_deref().unwrap();
        assert!(body.contains("name=my%20check"));
        assert!(body.contains("type=http"));
        assert!(body.contains("host=example.com"));
        assert!(body.contains("resolution=5"));
        assert_eq!(requests[1].method, Method::Get);
        assert!(requests[1].url.path().ends_with("/checks/85975"));
    }

    #[tokio::test]
    async fn mandatory_create_arguments_override_options() {
        let mock = Arc::new(MockTransport::default());
        mock.queue(response(500, json!({})));
        let client = client_with(&mock);

        client
            .create_check(
                "real name",
                "http",
                "example.com",
                Params::new().add("name", "stale name"),
            )
            .await
            .unwrap();
        let body = mock.requests()[0].body.clone().unwrap();
        assert!(body.contains("name=real%20name"));
        assert!(!body.contains("stale"));
    }

    #[tokio::test]
    async fn checks_parses_the_list_in_order() {
        let mock = Arc::new(MockTransport::default());
        mock.queue(response(
            200,
            json!({"checks": [
                {"id": 1, "name": "a", "type": "http", "status": "up"},
                {"id": 2, "name": "b", "type": "ping", "status": "down"},
            ]}),
        ));
        let client = client_with(&mock);

        let checks = client.checks(Params::new()).await.unwrap();
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].id, 1);
        assert_eq!(checks[1].status.as_deref(), Some("down"));
        assert_eq!(mock.requests()[0].url.query(), None);
    }

    #[tokio::test]
    async fn check_fetches_a_single_entity() {
        let mock = Arc::new(MockTransport::default());
        mock.queue(response(
            200,
            json!({"check": {"id": 9, "name": "web", "type": {"http": {}}}}),
        ));
        let client = client_with(&mock);

        let check = client.check(9).await.unwrap();
        assert_eq!(check.id, 9);
        assert!(mock.requests()[0].url.path().ends_with("/checks/9"));
    }

    #[tokio::test]
    async fn update_check_puts_params_and_returns_the_raw_response() {
        let mock = Arc::new(MockTransport::default());
        mock.queue(response(
            200,
            json!({"check": {"id": 9, "name": "web", "type": "http"}}),
        ));
        mock.queue(response(200, json!({"message": "Modification of check was successful!"})));
        let client = client_with(&mock);

        let check = client.check(9).await.unwrap();
        let response = client
            .update_check(&check, Params::new().add("paused", true))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body["message"], json!("Modification of check was successful!"));

        let put = &mock.requests()[1];
        assert_eq!(put.method, Method::Put);
        assert!(put.url.path().ends_with("/checks/9"));
        assert_eq!(put.body.as_deref(), Some("paused=true"));
    }

    #[tokio::test]
    async fn results_defaults_include_analysis() {
        let mock = Arc::new(MockTransport::default());
        mock.queue(response(
            200,
            json!({"results": [
                {"time": 1, "status": "up", "responsetime": 211, "probeid": 33},
            ]}),
        ));
        let client = client_with(&mock);

        let results = client.results(9, Params::new()).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].response_time, Some(211));

        let url = &mock.requests()[0].url;
        assert!(url.path().ends_with("/results/9"));
        assert_eq!(url.query(), Some("includeanalysis=true"));
    }

    #[tokio::test]
    async fn results_respects_a_caller_override() {
        let mock = Arc::new(MockTransport::default());
        mock.queue(response(200, json!({"results": []})));
        let client = client_with(&mock);

        client
            .results(9, Params::new().add("includeanalysis", false))
            .await
            .unwrap();
        assert_eq!(
            mock.requests()[0].url.query(),
            Some("includeanalysis=false")
        );
    }

    #[tokio::test]
    async fn test_operation_parses_a_single_result() {
        let mock = Arc::new(MockTransport::default());
        mock.queue(response(
            200,
            json!({"result": {"time": 1, "status": "up", "responsetime": 90, "probeid": 12}}),
        ));
        let client = client_with(&mock);

        let result = client.test(Params::new().add("host", "example.com")).await.unwrap();
        assert_eq!(result.status.as_deref(), Some("up"));
        assert!(mock.requests()[0].url.path().ends_with("/single"));
    }

    #[tokio::test]
    async fn probes_and_contacts_parse_their_lists() {
        let mock = Arc::new(MockTransport::default());
        mock.queue(response(
            200,
            json!({"probes": [
                {"id": 33, "name": "Stockholm", "country": "Sweden", "active": true},
            ]}),
        ));
        mock.queue(response(
            200,
            json!({"contacts": [
                {"id": 5, "name": "On-call", "email": "oncall@example.com"},
            ]}),
        ));
        let client = client_with(&mock);

        let probes = client.probes(Params::new()).await.unwrap();
        assert_eq!(probes[0].name, "Stockholm");
        let contacts = client.contacts(Params::new()).await.unwrap();
        assert_eq!(contacts[0].email.as_deref(), Some("oncall@example.com"));
    }

    #[tokio::test]
    async fn rate_limits_update_after_every_response_even_non_2xx() {
        let mock = Arc::new(MockTransport::default());
        mock.queue(response(
            200,
            json!({"check": {"id": 9, "name": "web", "type": "http"}}),
        ));
        let mut throttled = response(503, json!({"error": {"statuscode": 503}}));
        throttled.headers.insert(
            SHORT_LIMIT_HEADER.to_string(),
            "Remaining: 0 Time until reset: 120".to_string(),
        );
        mock.queue(throttled);
        let client = client_with(&mock);
        assert_eq!(client.rate_limits(), RateLimits::default());

        let check = client.check(9).await.unwrap();
        assert_eq!(client.rate_limits().short.unwrap().remaining, 394);

        let response = client.update_check(&check, Params::new()).await.unwrap();
        assert_eq!(response.status, 503);
        assert_eq!(client.rate_limits().short.unwrap().remaining, 0);
        assert_eq!(client.rate_limits().long.unwrap().remaining, 43196);
    }

    #[tokio::test]
    async fn summary_handle_is_lazy_until_fetched() {
        let mock = Arc::new(MockTransport::default());
        mock.queue(response(
            200,
            json!({"summary": {
                "responsetime": {"avgresponse": 190},
                "status": {"totalup": 86000, "totaldown": 400, "totalunknown": 0},
            }}),
        ));
        let client = client_with(&mock);

        let summary = client.summary(9);
        assert_eq!(summary.check_id(), 9);
        assert_eq!(mock.request_count(), 0, "constructing the handle is free");

        let average = summary.fetch(Params::new()).await.unwrap();
        assert_eq!(average.status.unwrap().total_down, Some(400));
        assert_eq!(mock.request_count(), 1);
        assert!(mock.requests()[0].url.path().ends_with("/summary.average/9"));
    }

    #[tokio::test]
    async fn auth_headers_are_attached_to_every_request() {
        let mock = Arc::new(MockTransport::default());
        mock.queue(response(200, json!({"checks": []})));
        let client = Client::new(
            Credentials::new("test-key")
                .with_basic_auth("user", "secret")
                .with_account_email("ops@example.com"),
        )
        .unwrap()
        .with_transport(Box::new(Arc::clone(&mock)));

        client.checks(Params::new()).await.unwrap();
        let request = &mock.requests()[0];
        assert_eq!(request_header(request, "App-Key"), Some("test-key"));
        assert_eq!(
            request_header(request, "Account-Email"),
            Some("ops@example.com")
        );
        let expected = format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode("user:secret")
        );
        assert_eq!(
            request_header(request, "Authorization"),
            Some(expected.as_str())
        );
        assert!(request_header(request, "User-Agent")
            .unwrap()
            .starts_with("pingdom_lib/"));
    }

    #[tokio::test]
    async fn get_time_params_are_epoch_encoded() {
        use chrono::TimeZone;
        let mock = Arc::new(MockTransport::default());
        mock.queue(response(200, json!({"results": []})));
        let client = client_with(&mock);

        let from = chrono::Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        client
            .results(9, Params::new().add("from", from).add("probes", vec![1u64, 2]))
            .await
            .unwrap();
        let query = mock.requests()[0].url.query().unwrap().to_string();
        assert!(query.contains("from=1700000000"));
        assert!(query.contains("probes=1%2C2"));
    }

    #[tokio::test]
    async fn transport_failures_surface_as_transport_errors() {
        // An empty queue doubles as a refused connection.
        let mock = Arc::new(MockTransport::default());
        let client = client_with(&mock);
        let err = client.checks(Params::new()).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
