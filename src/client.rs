use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::debounce::Debouncer;
use crate::models::Document;
use crate::server::{Ack, ErrorBody};
use crate::session::Session;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Status { status: StatusCode, message: String },
}

/// Thin client for the whole-document task endpoints.
#[derive(Debug, Clone)]
pub struct TaskApi {
    client: Client,
    base_url: String,
}

impl TaskApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn tasks_url(&self) -> String {
        format!("{}/tasks", self.base_url)
    }

    pub async fn fetch(&self) -> Result<Document, ClientError> {
        let res = self.client.get(self.tasks_url()).send().await?;
        if !res.status().is_success() {
            return Err(status_error(res).await);
        }
        Ok(res.json::<Document>().await?)
    }

    pub async fn replace(&self, document: &Document) -> Result<String, ClientError> {
        let res = self
            .client
            .put(self.tasks_url())
            .json(document)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(status_error(res).await);
        }
        Ok(res.json::<Ack>().await?.message)
    }

    /// Fresh session from the server's current document.
    pub async fn load_session(&self) -> Result<Session, ClientError> {
        Ok(Session::new(self.fetch().await?))
    }
}

async fn status_error(res: reqwest::Response) -> ClientError {
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    ClientError::Status { status, message }
}

pub type SharedSession = Arc<Mutex<Session>>;

/// Pushes the shared session back to the server once edits go quiet.
#[derive(Debug)]
pub struct Autosave {
    debouncer: Debouncer,
}

impl Autosave {
    pub fn spawn(api: TaskApi, session: SharedSession, delay: Duration) -> Self {
        let debouncer = Debouncer::spawn(delay, move || {
            let api = api.clone();
            let document = {
                let guard = session.lock().expect("session poisoned");
                guard.to_document(chrono::Utc::now().timestamp_millis())
            };
            async move {
                match api.replace(&document).await {
                    Ok(message) => log::debug!("autosave: {message}"),
                    Err(error) => log::error!("autosave failed: {error}"),
                }
            }
        });
        Self { debouncer }
    }

    /// Call after every edit to the shared session.
    pub fn edited(&self) {
        self.debouncer.touch();
    }

    pub fn save_now(&self) {
        self.debouncer.flush();
    }

    pub fn discard_pending(&self) {
        self.debouncer.cancel();
    }

    /// Saves any pending edits and waits for the save to finish.
    pub async fn close(self) {
        self.debouncer.flush();
        self.debouncer.shutdown().await;
    }
}
