use async_trait::async_trait;
use log::debug;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    config::Config,
    models::{Catch, CatchDraft},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid backend URL {url:?}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Could not fetch catches")]
    Fetch(#[source] reqwest::Error),

    #[error("Could not reach the backend")]
    Transport(#[source] reqwest::Error),

    #[error("Backend rejected the request: {reason}")]
    Validation { reason: String },

    #[error("Catch {id} not found for this user")]
    NotFound { id: i64 },
}

/// The record-store collaborator. Every call is implicitly scoped to the
/// configured user; implementations never touch local state.
#[async_trait]
pub trait CatchesApi {
    /// Current records for the scoped user.
    async fn catches(&self) -> Result<Vec<Catch>, Error>;

    /// Submit a new catch. The backend assigns the id.
    async fn log_catch(&self, draft: &CatchDraft) -> Result<(), Error>;

    /// Replace the fields of an existing catch.
    async fn edit_catch(&self, id: i64, draft: &CatchDraft) -> Result<(), Error>;

    /// Remove a catch owned by the scoped user.
    async fn delete_catch(&self, id: i64) -> Result<(), Error>;

    /// Probe whether the backend is awake.
    async fn ping(&self) -> Result<bool, Error>;
}

/// REST client for the castiq backend.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base: String,
    user_id: String,
}

impl HttpApi {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let base = Url::parse(&config.backend_url).map_err(|source| Error::InvalidUrl {
            url: config.backend_url.clone(),
            source,
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            base: base.as_str().trim_end_matches('/').to_string(),
            user_id: config.user_id.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CatchesResponse {
    #[serde(default)]
    data: Vec<Catch>,
}

#[derive(Debug, Deserialize)]
struct KeepaliveResponse {
    #[serde(default)]
    ok: bool,
}

#[derive(Debug, Deserialize)]
struct MutationResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl MutationResponse {
    fn reason(self) -> String {
        self.message
            .or(self.detail)
            .unwrap_or_else(|| "backend reported failure".to_string())
    }
}

#[derive(Debug, Serialize)]
struct DraftPayload<'a> {
    user_id: &'a str,
    #[serde(flatten)]
    draft: &'a CatchDraft,
}

/// Map a mutation response to the error taxonomy. `id` is the record the
/// caller addressed, if any; a backend-side "not found or unauthorized"
/// answer becomes [`Error::NotFound`] only when there is one.
async fn mutation_result(response: reqwest::Response, id: Option<i64>) -> Result<(), Error> {
    let status = response.status();
    if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
        return Err(Error::Validation {
            reason: response.text().await.unwrap_or_default(),
        });
    }
    if status == StatusCode::NOT_FOUND {
        if let Some(id) = id {
            return Err(Error::NotFound { id });
        }
    }

    let response = response.error_for_status().map_err(Error::Transport)?;
    let body: MutationResponse = response.json().await.map_err(Error::Transport)?;
    if body.success {
        return Ok(());
    }

    match id {
        Some(id) => Err(Error::NotFound { id }),
        None => Err(Error::Validation {
            reason: body.reason(),
        }),
    }
}

#[async_trait]
impl CatchesApi for HttpApi {
    async fn catches(&self) -> Result<Vec<Catch>, Error> {
        debug!("fetching catches for user {}", self.user_id);

        let response = self
            .client
            .get(format!("{}/catches", self.base))
            .query(&[("user_id", self.user_id.as_str())])
            .send()
            .await
            .map_err(Error::Fetch)?
            .error_for_status()
            .map_err(Error::Fetch)?;

        let body: CatchesResponse = response.json().await.map_err(Error::Fetch)?;

        debug!("backend returned {} catches", body.data.len());
        Ok(body.data)
    }

    async fn log_catch(&self, draft: &CatchDraft) -> Result<(), Error> {
        debug!("logging catch for user {}", self.user_id);

        let response = self
            .client
            .post(format!("{}/log-catch", self.base))
            .json(&DraftPayload {
                user_id: &self.user_id,
                draft,
            })
            .send()
            .await
            .map_err(Error::Transport)?;

        mutation_result(response, None).await
    }

    async fn edit_catch(&self, id: i64, draft: &CatchDraft) -> Result<(), Error> {
        debug!("editing catch {id} for user {}", self.user_id);

        let response = self
            .client
            .put(format!("{}/edit-catch/{id}", self.base))
            .json(&DraftPayload {
                user_id: &self.user_id,
                draft,
            })
            .send()
            .await
            .map_err(Error::Transport)?;

        mutation_result(response, Some(id)).await
    }

    async fn delete_catch(&self, id: i64) -> Result<(), Error> {
        debug!("deleting catch {id} for user {}", self.user_id);

        let response = self
            .client
            .delete(format!("{}/delete-catch/{id}", self.base))
            .query(&[("user_id", self.user_id.as_str())])
            .send()
            .await
            .map_err(Error::Transport)?;

        mutation_result(response, Some(id)).await
    }

    async fn ping(&self) -> Result<bool, Error> {
        let response = self
            .client
            .get(format!("{}/keepalive", self.base))
            .send()
            .await
            .map_err(Error::Transport)?;

        let body: KeepaliveResponse = response.json().await.map_err(Error::Transport)?;
        Ok(body.ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> Config {
        Config {
            backend_url: url.to_string(),
            user_id: "tester".to_string(),
        }
    }

    #[test]
    fn base_url_loses_its_trailing_slash() {
        let api = HttpApi::new(&config("https://example.com/")).unwrap();

        assert_eq!(api.base, "https://example.com");
    }

    #[test]
    fn rejects_garbage_urls() {
        let result = HttpApi::new(&config("not a url"));

        assert!(matches!(result, Err(Error::InvalidUrl { .. })));
    }

    #[test]
    fn draft_payload_carries_the_user_id() {
        let draft = CatchDraft {
            species: Some("Bass".to_string()),
            ..CatchDraft::default()
        };
        let payload = serde_json::to_value(DraftPayload {
            user_id: "tester",
            draft: &draft,
        })
        .unwrap();

        assert_eq!(payload["user_id"], "tester");
        assert_eq!(payload["species"], "Bass");
        assert_eq!(payload["weight_lbs"], serde_json::Value::Null);
    }
}
