use crate::config::Endpoint;
use crate::error::{Error, GENERIC_FAILURE};

use crossbeam_channel::{bounded, Receiver};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client as AsyncClient;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A reference to a source document backing an answer
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Citation {
    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub page: Option<u64>,
}

impl Citation {
    pub fn source_label(&self) -> &str {
        self.source.as_deref().unwrap_or("unknown")
    }
}

impl std::fmt::Display for Citation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let page = self
            .page
            .map(|p| format!("(p.{p})"))
            .unwrap_or_default();

        write!(f, "{} {}", self.source_label(), page)
    }
}

/// The successful half of a query result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Answer {
    pub answer: String,
    pub citations: Vec<Citation>,
}

/// Body returned by the query service on success
#[derive(Deserialize, Debug)]
struct QueryResponse {
    answer: Option<String>,
    sources: Option<Vec<Citation>>,
}

impl From<QueryResponse> for Answer {
    fn from(value: QueryResponse) -> Self {
        Self {
            answer: value.answer.unwrap_or_default(),
            citations: value.sources.unwrap_or_default(),
        }
    }
}

/// Pull a human readable message out of an error body, if it has one
fn failure_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;

    ["error", "detail"]
        .into_iter()
        .filter_map(|key| value.get(key).and_then(Value::as_str))
        .find(|msg| !msg.is_empty())
        .map(str::to_owned)
}

/// Anything that can run a query in the background and hand back its single result
pub trait Dispatcher {
    fn dispatch(&self, question: String) -> Receiver<crate::Result<Answer>>;
}

#[derive(Debug, Clone)]
pub struct QueryClient {
    client: AsyncClient,
    endpoint: Endpoint,
}

fn build_client() -> crate::Result<AsyncClient> {
    let headers: HeaderMap = [(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    )]
    .into_iter()
    .collect();

    // every dispatch runs on its own short-lived runtime, so pooled connections can't be reused
    AsyncClient::builder()
        .default_headers(headers)
        .pool_max_idle_per_host(0)
        .build()
        .map_err(|e| e.into())
}

impl QueryClient {
    pub fn new(endpoint: Endpoint) -> crate::Result<Self> {
        tracing::info!(api_base = %endpoint, "resolved query endpoint");

        Ok(Self {
            client: build_client()?,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Send one question to the service and wait for the answer.
    /// The caller is responsible for rejecting blank questions.
    pub async fn submit_query(&self, question: &str) -> crate::Result<Answer> {
        let url = self.endpoint.query_url();

        let response = self
            .client
            .post(&url)
            .json(&json!({ "question": question }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(%url, error = %e, "query transport failure");
                Error::ConnectionError { base_err: e }
            })?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = failure_message(&body).unwrap_or_else(|| GENERIC_FAILURE.to_string());
            tracing::warn!(%status, %message, "query returned an error response");

            return Err(Error::HttpError { status, message });
        }

        match serde_json::from_slice::<QueryResponse>(&body) {
            Ok(parsed) => {
                let answer = Answer::from(parsed);
                tracing::debug!(
                    %status,
                    answer_len = answer.answer.len(),
                    citations = answer.citations.len(),
                    "query ok"
                );

                Ok(answer)
            }

            Err(e) => {
                tracing::warn!(%status, error = %e, "query response could not be parsed");
                Err(Error::InvalidResponse { status })
            }
        }
    }
}

impl Dispatcher for QueryClient {
    /// Run the query on a new thread. The result is dropped if the receiver is already gone.
    fn dispatch(&self, question: String) -> Receiver<crate::Result<Answer>> {
        let (tx, rx) = bounded(1);
        let query_client = self.clone();

        std::thread::spawn(move || {
            let result = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt.block_on(query_client.submit_query(&question)),
                Err(e) => Err(e.into()),
            };

            if tx.send(result).is_err() {
                tracing::debug!("query resolved after its screen closed, discarding");
            }
        });

        rx
    }
}
