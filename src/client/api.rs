use std::sync::Arc;
use std::time::Duration;

use futures::{stream::BoxStream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::models::{Expense, PublicUser, ReviewEvent};

use super::{
    nav::nav_items,
    sse::SseDecoder,
    watcher::StatusWatcher,
    NavItem, Notification,
};

/// How often the dashboard refreshes its expense list.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Unreadable event: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Not logged in")]
    NotLoggedIn,
}

/// Review events pushed by the server, in arrival order.
pub type ReviewEvents = BoxStream<'static, Result<ReviewEvent, ClientError>>;

#[derive(Debug, Clone)]
pub struct Session {
    pub user: PublicUser,
    pub token: String,
}

impl Session {
    pub fn nav(&self) -> Vec<NavItem> {
        nav_items(self.user.role)
    }
}

#[derive(Deserialize)]
struct LoginBody {
    user: PublicUser,
    token: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Option<Session>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<&Session, ClientError> {
        let response = self
            .http
            .post(format!("{}/api/auth/login", self.base_url))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let body: LoginBody = Self::decode(response).await?;
        Ok(&*self.session.insert(Session {
            user: body.user,
            token: body.token,
        }))
    }

    pub fn logout(&mut self) {
        self.session = None;
    }

    pub async fn expenses(&self) -> Result<Vec<Expense>, ClientError> {
        let session = self.session.as_ref().ok_or(ClientError::NotLoggedIn)?;

        let response = self
            .http
            .get(format!("{}/api/expenses", self.base_url))
            .bearer_auth(&session.token)
            .send()
            .await?;

        Self::decode(response).await
    }

    /// Subscribes to review events. With `after`, the server first replays
    /// every event recorded after that id.
    pub async fn review_events(&self, after: Option<i64>) -> Result<ReviewEvents, ClientError> {
        let session = self.session.as_ref().ok_or(ClientError::NotLoggedIn)?;

        let mut request = self
            .http
            .get(format!("{}/api/expenses/events", self.base_url))
            .bearer_auth(&session.token);
        if let Some(id) = after {
            request = request.header("Last-Event-ID", id.to_string());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let mut decoder = SseDecoder::new();
        let events = response
            .bytes_stream()
            .map(move |chunk| -> Vec<Result<ReviewEvent, ClientError>> {
                match chunk {
                    Ok(bytes) => decoder
                        .push(&bytes)
                        .into_iter()
                        .filter(|frame| frame.event.as_deref() == Some("review"))
                        .map(|frame| serde_json::from_str(&frame.data).map_err(ClientError::from))
                        .collect(),
                    Err(e) => vec![Err(e.into())],
                }
            })
            .flat_map(futures::stream::iter);

        Ok(events.boxed())
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        if response.status().is_success() {
            return Ok(response.json().await?);
        }
        Err(Self::error_from(response).await)
    }

    async fn error_from(response: reqwest::Response) -> ClientError {
        let status = response.status();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status.to_string(),
        };
        ClientError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

/// Keeps the dashboard current: refreshes the expense list on a fixed interval
/// and, between refreshes, applies pushed review events. Both feed one
/// `StatusWatcher`, so a decision is reported once for every listed expense
/// whichever path sees it first. A failed refresh is reported and the next tick
/// tries again; a dropped event subscription is resumed on the next tick from
/// the last event id seen. Dropping the poller stops it.
pub struct DashboardPoller {
    handle: JoinHandle<()>,
}

impl DashboardPoller {
    pub fn start(
        client: Arc<ApiClient>,
        period: Duration,
        notifications: mpsc::UnboundedSender<Notification>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut watcher = StatusWatcher::new();
            let mut ticker = tokio::time::interval(period);
            let mut events: Option<ReviewEvents> = None;

            loop {
                let outgoing = tokio::select! {
                    _ = ticker.tick() => {
                        let outgoing = match client.expenses().await {
                            Ok(expenses) => watcher.reconcile(&expenses),
                            Err(e) => {
                                log::warn!("Dashboard refresh failed: {}", e);
                                vec![Notification::RefreshFailed(e.to_string())]
                            }
                        };
                        if events.is_none() && client.session().is_some() {
                            let after = Some(watcher.last_event_id()).filter(|id| *id > 0);
                            match client.review_events(after).await {
                                Ok(stream) => events = Some(stream),
                                Err(e) => log::warn!("Review event subscription failed: {}", e),
                            }
                        }
                        outgoing
                    }
                    event = next_event(&mut events) => match event {
                        Some(Ok(event)) => watcher.apply_event(&event).into_iter().collect(),
                        Some(Err(e)) => {
                            log::warn!("Review event stream failed: {}", e);
                            events = None;
                            Vec::new()
                        }
                        None => {
                            events = None;
                            Vec::new()
                        }
                    },
                };

                for notification in outgoing {
                    if notifications.send(notification).is_err() {
                        return;
                    }
                }
            }
        });

        Self { handle }
    }
}

/// Next pushed event, or never when there is no subscription.
async fn next_event(events: &mut Option<ReviewEvents>) -> Option<Result<ReviewEvent, ClientError>> {
    match events {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

impl Drop for DashboardPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
