//! HTTP client for the presence and account services

use async_trait::async_trait;
use rejoin_api::{Observation, PresenceType};
use rejoin_host_api::{PresenceError, PresenceProvider, PresenceResult};
use rejoin_util::{AccountId, LocationId, SessionHandle};
use reqwest::Client;
use reqwest::header::{ACCEPT, COOKIE, USER_AGENT};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, trace};

/// Cookie name used when a session is configured as a bare token
const SESSION_COOKIE: &str = ".ROBLOSECURITY";

/// Presence service client.
///
/// One request per call, no retries. The request timeout is enforced by
/// the HTTP client; callers may add their own outer bound.
#[derive(Debug, Clone)]
pub struct HttpPresenceClient {
    client: Client,
    presence_url: String,
    account_url: String,
    user_agent: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PresenceResponse {
    #[serde(default)]
    user_presences: Vec<UserPresence>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserPresence {
    user_id: Option<u64>,
    user_presence_type: Option<i64>,
    #[serde(default)]
    root_place_id: Value,
}

impl UserPresence {
    fn into_observation(self) -> Observation {
        Observation {
            presence_type: self.user_presence_type.map(PresenceType::from_code),
            location: location_from_value(&self.root_place_id),
            raw_code: self.user_presence_type,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthenticatedUser {
    id: u64,
    #[serde(default)]
    name: String,
}

impl HttpPresenceClient {
    pub fn new(
        presence_url: impl Into<String>,
        account_url: impl Into<String>,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> PresenceResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| PresenceError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            presence_url: presence_url.into(),
            account_url: account_url.into(),
            user_agent: user_agent.into(),
        })
    }

    /// Resolve the account id and name the session belongs to
    pub async fn resolve_account(
        &self,
        session: &SessionHandle,
    ) -> PresenceResult<(AccountId, String)> {
        let resp = self
            .client
            .get(&self.account_url)
            .header(COOKIE, cookie_header(session))
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PresenceError::Status(status.as_u16()));
        }

        let body = resp.text().await.map_err(map_reqwest_error)?;
        let user: AuthenticatedUser =
            serde_json::from_str(&body).map_err(|e| PresenceError::Malformed(e.to_string()))?;

        debug!(account = user.id, "Resolved session account");
        Ok((AccountId::new(user.id), user.name))
    }

    async fn post_presence(&self, session: &SessionHandle, ids: &[u64]) -> PresenceResult<String> {
        let resp = self
            .client
            .post(&self.presence_url)
            .header(COOKIE, cookie_header(session))
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .json(&json!({ "userIds": ids }))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PresenceError::Status(status.as_u16()));
        }

        resp.text().await.map_err(map_reqwest_error)
    }
}

#[async_trait]
impl PresenceProvider for HttpPresenceClient {
    async fn fetch(
        &self,
        session: &SessionHandle,
        account: AccountId,
    ) -> PresenceResult<Observation> {
        let body = self.post_presence(session, &[account.get()]).await?;
        let observation = parse_presence_body(&body, account)?;
        trace!(account = %account, presence = ?observation.presence_type, "Presence fetched");
        Ok(observation)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> PresenceError {
    if e.is_timeout() {
        PresenceError::Timeout
    } else {
        PresenceError::Transport(e.to_string())
    }
}

/// Cookie header value for a session.
///
/// A session containing `=` is treated as a full cookie string.
pub fn cookie_header(session: &SessionHandle) -> String {
    let value = session.expose();
    if value.contains('=') {
        value.to_string()
    } else {
        format!("{}={}", SESSION_COOKIE, value)
    }
}

fn location_from_value(value: &Value) -> Option<LocationId> {
    match value {
        Value::Number(n) => Some(LocationId::new(n.to_string())),
        Value::String(s) if !s.is_empty() => Some(LocationId::new(s.clone())),
        _ => None,
    }
}

/// Parse a presence response for one account.
///
/// Uses the entry matching `account`. An entry without a user id is
/// accepted as a fallback; entries for other accounts never are.
pub fn parse_presence_body(body: &str, account: AccountId) -> PresenceResult<Observation> {
    let resp: PresenceResponse =
        serde_json::from_str(body).map_err(|e| PresenceError::Malformed(e.to_string()))?;

    let mut entries = resp.user_presences;
    let index = entries
        .iter()
        .position(|p| p.user_id == Some(account.get()))
        .or_else(|| entries.iter().position(|p| p.user_id.is_none()))
        .ok_or(PresenceError::MissingAccount(account))?;

    Ok(entries.swap_remove(index).into_observation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::io::Write;

    #[test]
    fn parse_in_game() {
        let body = r#"{"userPresences":[{"userPresenceType":2,"lastLocation":"Blox Fruits",
            "placeId":4442272183,"rootPlaceId":2753915549,"gameId":"abc","universeId":994732206,
            "userId":42,"lastOnline":"2025-01-01T00:00:00Z"}]}"#;

        let obs = parse_presence_body(body, AccountId::new(42)).unwrap();
        assert_eq!(obs.presence_type, Some(PresenceType::InApp));
        assert_eq!(obs.location, Some(LocationId::new("2753915549")));
        assert_eq!(obs.raw_code, Some(2));
    }

    #[test]
    fn parse_offline_with_null_place() {
        let body = r#"{"userPresences":[{"userPresenceType":0,"rootPlaceId":null,"userId":42}]}"#;

        let obs = parse_presence_body(body, AccountId::new(42)).unwrap();
        assert_eq!(obs.presence_type, Some(PresenceType::Offline));
        assert_eq!(obs.location, None);
    }

    #[test]
    fn missing_presence_type_is_none() {
        let body = r#"{"userPresences":[{"userId":42}]}"#;

        let obs = parse_presence_body(body, AccountId::new(42)).unwrap();
        assert_eq!(obs.presence_type, None);
    }

    #[test]
    fn empty_presence_list_is_missing_account() {
        let body = r#"{"userPresences":[]}"#;
        let result = parse_presence_body(body, AccountId::new(42));
        assert!(matches!(result, Err(PresenceError::MissingAccount(_))));
    }

    #[test]
    fn malformed_body() {
        let result = parse_presence_body("<html>rate limited</html>", AccountId::new(1));
        assert!(matches!(result, Err(PresenceError::Malformed(_))));
    }

    #[test]
    fn matching_entry_is_preferred() {
        let body = r#"{"userPresences":[
            {"userId":1,"userPresenceType":0},
            {"userId":2,"userPresenceType":2,"rootPlaceId":"99"}]}"#;

        let obs = parse_presence_body(body, AccountId::new(2)).unwrap();
        assert_eq!(obs.location, Some(LocationId::new("99")));
    }

    #[test]
    fn other_accounts_are_not_used() {
        let body = r#"{"userPresences":[{"userId":7,"userPresenceType":2,"rootPlaceId":1}]}"#;
        let result = parse_presence_body(body, AccountId::new(42));
        assert!(matches!(result, Err(PresenceError::MissingAccount(a)) if a == AccountId::new(42)));
    }

    #[test]
    fn entry_without_user_id_is_fallback() {
        let body = r#"{"userPresences":[
            {"userId":7,"userPresenceType":0},
            {"userPresenceType":2,"rootPlaceId":5}]}"#;

        let obs = parse_presence_body(body, AccountId::new(42)).unwrap();
        assert_eq!(obs.location, Some(LocationId::new("5")));
    }

    #[test]
    fn cookie_header_forms() {
        assert_eq!(
            cookie_header(&SessionHandle::new("_|WARNING|_abc")),
            ".ROBLOSECURITY=_|WARNING|_abc"
        );
        assert_eq!(
            cookie_header(&SessionHandle::new(".ROBLOSECURITY=abc; other=1")),
            ".ROBLOSECURITY=abc; other=1"
        );
    }

    #[test]
    fn client_builds() {
        let client = HttpPresenceClient::new(
            "https://presence.example.com/v1/presence/users",
            "https://users.example.com/v1/users/authenticated",
            "test-agent",
            Duration::from_secs(10),
        );
        assert!(client.is_ok());
    }

    fn client_for(server: &mockito::Server, timeout: Duration) -> HttpPresenceClient {
        HttpPresenceClient::new(
            format!("{}/v1/presence/users", server.url()),
            format!("{}/v1/users/authenticated", server.url()),
            "test-agent",
            timeout,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn fetch_sends_session_and_account() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/presence/users")
            .match_header("cookie", ".ROBLOSECURITY=abc")
            .match_header("user-agent", "test-agent")
            .match_body(Matcher::Json(json!({ "userIds": [42] })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"userPresences":[{"userId":42,"userPresenceType":2,"rootPlaceId":2753915549}]}"#)
            .create_async()
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let obs = client
            .fetch(&SessionHandle::new("abc"), AccountId::new(42))
            .await
            .unwrap();

        assert_eq!(obs.presence_type, Some(PresenceType::InApp));
        assert_eq!(obs.location, Some(LocationId::new("2753915549")));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_server_error_is_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/presence/users")
            .with_status(500)
            .create_async()
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let result = client.fetch(&SessionHandle::new("abc"), AccountId::new(42)).await;
        assert!(matches!(result, Err(PresenceError::Status(500))));
    }

    #[tokio::test]
    async fn fetch_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/presence/users")
            .with_status(200)
            .with_body("<html>Too many requests</html>")
            .create_async()
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let result = client.fetch(&SessionHandle::new("abc"), AccountId::new(42)).await;
        assert!(matches!(result, Err(PresenceError::Malformed(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn slow_response_is_timeout() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/presence/users")
            .with_status(200)
            .with_chunked_body(|w| {
                std::thread::sleep(Duration::from_secs(2));
                w.write_all(br#"{"userPresences":[]}"#)
            })
            .create_async()
            .await;

        let client = client_for(&server, Duration::from_millis(200));
        let result = client.fetch(&SessionHandle::new("abc"), AccountId::new(42)).await;
        assert!(matches!(result, Err(PresenceError::Timeout)), "{:?}", result);
    }

    #[tokio::test]
    async fn resolve_account_reads_id_and_name() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/users/authenticated")
            .match_header("cookie", ".ROBLOSECURITY=abc")
            .with_status(200)
            .with_body(r#"{"id":42,"name":"playerone","displayName":"Player One"}"#)
            .create_async()
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let (account, name) = client.resolve_account(&SessionHandle::new("abc")).await.unwrap();

        assert_eq!(account, AccountId::new(42));
        assert_eq!(name, "playerone");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn resolve_account_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/users/authenticated")
            .with_status(401)
            .create_async()
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let result = client.resolve_account(&SessionHandle::new("expired")).await;
        assert!(matches!(result, Err(PresenceError::Status(401))));
    }
}
