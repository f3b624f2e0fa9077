//! Typed Pingdom resources and response parsing.
//!
//! Response bodies wrap their payload in a resource-named key: a single
//! object under the singular key (`{"check": {...}}`) or an array under the
//! plural key (`{"checks": [...]}`). [`parse_resources`] handles both
//! shapes for any [`Resource`].
//!
//! The API returns type-specific extra attributes alongside the documented
//! ones, so every entity keeps unrecognized fields in an `extra` bag
//! instead of discarding them.

use crate::client::Client;
use crate::error::{Error, ParseError};
use crate::params::Params;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

/// A resource that can be parsed out of a response body.
pub trait Resource: DeserializeOwned {
    const SINGULAR: &'static str;
    const PLURAL: &'static str;
}

/// Parse the entities under a body's resource key, in response order.
///
/// Fails with [`ParseError`] when neither key is present or the value under
/// it is neither an object nor an array.
pub fn parse_resources<R: Resource>(body: &Value) -> Result<Vec<R>, ParseError> {
    let (key, node) = match (body.get(R::SINGULAR), body.get(R::PLURAL)) {
        (Some(node), _) => (R::SINGULAR, node),
        (None, Some(node)) => (R::PLURAL, node),
        (None, None) => {
            return Err(ParseError::new(format!(
                "response has no '{}' or '{}' key",
                R::SINGULAR,
                R::PLURAL
            )))
        }
    };
    match node {
        Value::Object(_) => Ok(vec![decode(key, node)?]),
        Value::Array(items) => items.iter().map(|item| decode(key, item)).collect(),
        _ => Err(ParseError::new(format!(
            "'{}' is neither an object nor an array",
            key
        ))),
    }
}

fn decode<R: DeserializeOwned>(key: &str, node: &Value) -> Result<R, ParseError> {
    serde_json::from_value(node.clone())
        .map_err(|e| ParseError::new(format!("malformed '{}' entry: {}", key, e)))
}

/// The `type` field of a check: a bare name in list responses, an object
/// keyed by the type name (holding type-specific settings) in detailed
/// responses.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CheckType {
    Name(String),
    Detailed(Map<String, Value>),
}

impl CheckType {
    /// The type name (`http`, `tcp`, `ping`, ...), whichever shape it came
    /// in.
    pub fn name(&self) -> Option<&str> {
        match self {
            CheckType::Name(name) => Some(name),
            CheckType::Detailed(map) => map.keys().next().map(String::as_str),
        }
    }
}

/// A monitored endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Check {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CheckType,
    pub hostname: Option<String>,
    pub status: Option<String>,
    pub resolution: Option<u64>,
    pub created: Option<i64>,
    #[serde(rename = "lasterrortime")]
    pub last_error_time: Option<i64>,
    #[serde(rename = "lasttesttime")]
    pub last_test_time: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Check {
    const SINGULAR: &'static str = "check";
    const PLURAL: &'static str = "checks";
}

/// One monitoring execution outcome for a check. Read-only.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckResult {
    pub time: Option<i64>,
    pub status: Option<String>,
    #[serde(rename = "responsetime")]
    pub response_time: Option<u64>,
    #[serde(rename = "probeid")]
    pub probe_id: Option<u64>,
    #[serde(rename = "statusdesc")]
    pub status_desc: Option<String>,
    #[serde(rename = "statusdesclong")]
    pub status_desc_long: Option<String>,
    /// Present when the request asked for analysis to be included.
    pub analysis: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for CheckResult {
    const SINGULAR: &'static str = "result";
    const PLURAL: &'static str = "results";
}

/// A geographic monitoring agent. Read-only.
#[derive(Debug, Clone, Deserialize)]
pub struct Probe {
    pub id: u64,
    pub name: String,
    pub country: Option<String>,
    #[serde(rename = "countryiso")]
    pub country_iso: Option<String>,
    pub city: Option<String>,
    pub hostname: Option<String>,
    pub ip: Option<String>,
    pub active: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Probe {
    const SINGULAR: &'static str = "probe";
    const PLURAL: &'static str = "probes";
}

/// A notification recipient. Read-only.
#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub id: u64,
    pub name: String,
    pub email: Option<String>,
    pub cellphone: Option<String>,
    pub paused: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Contact {
    const SINGULAR: &'static str = "contact";
    const PLURAL: &'static str = "contacts";
}

/// Aggregate rollup payload from `summary.average/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryAverage {
    #[serde(rename = "responsetime")]
    pub response_time: Option<ResponseTimeSummary>,
    pub status: Option<StatusSummary>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for SummaryAverage {
    const SINGULAR: &'static str = "summary";
    const PLURAL: &'static str = "summaries";
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseTimeSummary {
    /// Scalar average, or an array of per-probe splits when the request
    /// asked for one.
    #[serde(rename = "avgresponse")]
    pub avg_response: Option<Value>,
    pub from: Option<i64>,
    pub to: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusSummary {
    #[serde(rename = "totalup")]
    pub total_up: Option<i64>,
    #[serde(rename = "totaldown")]
    pub total_down: Option<i64>,
    #[serde(rename = "totalunknown")]
    pub total_unknown: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Lazy rollup handle for one check.
///
/// Constructing it performs no request; callers invoke [`Summary::fetch`]
/// (or [`Summary::outage`]) when they actually want the data.
pub struct Summary<'a> {
    client: &'a Client,
    check_id: u64,
}

impl<'a> Summary<'a> {
    pub(crate) fn new(client: &'a Client, check_id: u64) -> Self {
        Self { client, check_id }
    }

    pub fn check_id(&self) -> u64 {
        self.check_id
    }

    /// GET `summary.average/{id}` and parse the rollup.
    pub async fn fetch(&self, options: Params) -> Result<SummaryAverage, Error> {
        let response = self
            .client
            .get(&format!("summary.average/{}", self.check_id), &options)
            .await?;
        parse_resources::<SummaryAverage>(&response.body)?
            .into_iter()
            .next()
            .ok_or_else(|| ParseError::new("empty summary payload").into())
    }

    /// GET `summary.outage/{id}` and return the raw `summary` payload (a
    /// list of up/down/unknown states over the requested window).
    pub async fn outage(&self, options: Params) -> Result<Value, Error> {
        let response = self
            .client
            .get(&format!("summary.outage/{}", self.check_id), &options)
            .await?;
        response
            .body
            .get("summary")
            .cloned()
            .ok_or_else(|| ParseError::new("response has no 'summary' key").into())
    }
}
