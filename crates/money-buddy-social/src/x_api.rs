// X API v2 backend for `SocialClient`.
//
// The account secret is a user-context OAuth2 access token. `login` proves
// the token belongs to the configured account by calling `/users/me` and
// remembers the numeric user id that the like/retweet endpoints need.

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::debug;

use crate::client::{RawProfile, RawTweet, SocialClient, TweetStream};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Page size bounds accepted by `/tweets/search/recent`.
const SEARCH_PAGE_MIN: usize = 10;
const SEARCH_PAGE_MAX: usize = 100;

/// Longest handle X allows.
const HANDLE_MAX_LEN: usize = 15;

// ---------------------------------------------------------------------------
// XApiClient
// ---------------------------------------------------------------------------

pub struct XApiClient {
    http: reqwest::Client,
    api_base: String,
    auth: Option<Auth>,
}

struct Auth {
    token: String,
    user_id: String,
}

/// One page of search results plus the cursor for the next page.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct SearchPage {
    pub tweets: Vec<RawTweet>,
    pub next_token: Option<String>,
}

impl XApiClient {
    pub fn new(http: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            auth: None,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    fn auth(&self) -> anyhow::Result<&Auth> {
        self.auth.as_ref().ok_or_else(|| anyhow!("not logged in"))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> anyhow::Result<Value> {
        let response = request.send().await.context("X API request failed")?;
        let status = response.status();
        let body = response.text().await.context("failed to read X API response")?;
        if !status.is_success() {
            bail!("X API returned status {status}: {}", summarize_error(&body));
        }
        serde_json::from_str(&body).context("X API returned invalid JSON")
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> anyhow::Result<Value> {
        let auth = self.auth()?;
        let request = self
            .http
            .get(self.url(path))
            .bearer_auth(&auth.token)
            .query(query);
        self.send(request).await
    }

    async fn post(&self, path: &str, body: Value) -> anyhow::Result<Value> {
        let auth = self.auth()?;
        let request = self
            .http
            .post(self.url(path))
            .bearer_auth(&auth.token)
            .json(&body);
        self.send(request).await
    }

    async fn fetch_search_page(
        &self,
        query: &str,
        max_tweets: usize,
        next_token: Option<&str>,
    ) -> anyhow::Result<SearchPage> {
        let page_size = max_tweets.clamp(SEARCH_PAGE_MIN, SEARCH_PAGE_MAX);
        let mut params = vec![
            ("query", query.to_string()),
            ("max_results", page_size.to_string()),
            ("tweet.fields", "created_at,author_id".to_string()),
            ("expansions", "author_id".to_string()),
            ("user.fields", "username".to_string()),
        ];
        if let Some(token) = next_token {
            params.push(("next_token", token.to_string()));
        }
        let body = self.get("/tweets/search/recent", &params).await?;
        Ok(parse_search_page(&body))
    }
}

#[async_trait]
impl SocialClient for XApiClient {
    async fn login(&mut self, username: &str, password: &str) -> anyhow::Result<()> {
        let response = self
            .http
            .get(self.url("/users/me"))
            .bearer_auth(password);
        let body = self.send(response).await?;
        let (user_id, handle) = parse_me(&body)?;
        if !handle.eq_ignore_ascii_case(username.trim_start_matches('@')) {
            bail!("token belongs to @{handle}, not the configured account @{username}");
        }
        debug!(user_id = %user_id, "X API token verified");
        self.auth = Some(Auth {
            token: password.to_string(),
            user_id,
        });
        Ok(())
    }

    async fn get_profile(&self, username: &str) -> anyhow::Result<RawProfile> {
        let username = checked_handle(username)?;
        let body = self
            .get(
                &format!("/users/by/username/{username}"),
                &[("user.fields", "public_metrics".to_string())],
            )
            .await?;
        Ok(parse_profile(&body))
    }

    async fn send_tweet(&self, text: &str) -> anyhow::Result<String> {
        let body = self.post("/tweets", json!({ "text": text })).await?;
        body.pointer("/data/id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("X API response missing tweet id"))
    }

    async fn like_tweet(&self, tweet_id: &str) -> anyhow::Result<()> {
        let user_id = self.auth()?.user_id.clone();
        let body = self
            .post(&format!("/users/{user_id}/likes"), json!({ "tweet_id": tweet_id }))
            .await?;
        expect_flag(&body, "liked")
    }

    async fn retweet(&self, tweet_id: &str) -> anyhow::Result<()> {
        let user_id = self.auth()?.user_id.clone();
        let body = self
            .post(&format!("/users/{user_id}/retweets"), json!({ "tweet_id": tweet_id }))
            .await?;
        expect_flag(&body, "retweeted")
    }

    fn search_tweets<'a>(&'a self, query: &'a str, max_tweets: usize) -> TweetStream<'a> {
        // State: None once exhausted, Some(cursor) while pages remain.
        let pages = stream::unfold(Some(None::<String>), move |cursor| async move {
            let cursor = cursor?;
            match self.fetch_search_page(query, max_tweets, cursor.as_deref()).await {
                Ok(page) => {
                    let next = page.next_token.filter(|_| !page.tweets.is_empty());
                    let items: Vec<anyhow::Result<RawTweet>> =
                        page.tweets.into_iter().map(Ok).collect();
                    Some((items, next.map(Some)))
                }
                Err(e) => Some((vec![Err(e)], None)),
            }
        });
        pages.flat_map(stream::iter).boxed()
    }
}

// ---------------------------------------------------------------------------
// Response parsing helpers
// ---------------------------------------------------------------------------

/// `(id, username)` from `/users/me`.
pub(crate) fn parse_me(body: &Value) -> anyhow::Result<(String, String)> {
    let data = body.get("data").ok_or_else(|| anyhow!("X API response missing user data"))?;
    let id = data.get("id").and_then(Value::as_str);
    let username = data.get("username").and_then(Value::as_str);
    match (id, username) {
        (Some(id), Some(username)) => Ok((id.to_string(), username.to_string())),
        _ => bail!("X API response missing user id or username"),
    }
}

pub(crate) fn parse_profile(body: &Value) -> RawProfile {
    let data = body.get("data");
    let metrics = data.and_then(|d| d.get("public_metrics"));
    RawProfile {
        name: data
            .and_then(|d| d.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        followers_count: metrics
            .and_then(|m| m.get("followers_count"))
            .and_then(Value::as_u64),
        statuses_count: metrics
            .and_then(|m| m.get("tweet_count"))
            .and_then(Value::as_u64),
    }
}

/// Tweets from a search page, with author usernames joined from `includes.users`.
pub(crate) fn parse_search_page(body: &Value) -> SearchPage {
    let users: HashMap<&str, &str> = body
        .pointer("/includes/users")
        .and_then(Value::as_array)
        .map(|users| {
            users
                .iter()
                .filter_map(|u| Some((u.get("id")?.as_str()?, u.get("username")?.as_str()?)))
                .collect()
        })
        .unwrap_or_default();

    let tweets = body
        .get("data")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|t| RawTweet {
                    id: t.get("id").and_then(Value::as_str).map(str::to_string),
                    text: t.get("text").and_then(Value::as_str).map(str::to_string),
                    username: t
                        .get("author_id")
                        .and_then(Value::as_str)
                        .and_then(|author| users.get(author))
                        .map(|u| u.to_string()),
                    timestamp: t
                        .get("created_at")
                        .and_then(Value::as_str)
                        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                        .map(|dt| dt.timestamp()),
                })
                .collect()
        })
        .unwrap_or_default();

    let next_token = body
        .pointer("/meta/next_token")
        .and_then(Value::as_str)
        .map(str::to_string);

    SearchPage { tweets, next_token }
}

/// A handle goes into the URL path, so only the characters X permits in
/// handles are accepted.
pub(crate) fn checked_handle(username: &str) -> anyhow::Result<&str> {
    let valid = !username.is_empty()
        && username.len() <= HANDLE_MAX_LEN
        && username.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if !valid {
        bail!("invalid username '{username}'");
    }
    Ok(username)
}

fn expect_flag(body: &Value, flag: &str) -> anyhow::Result<()> {
    match body.pointer(&format!("/data/{flag}")).and_then(Value::as_bool) {
        Some(true) => Ok(()),
        Some(false) => bail!("X API reported {flag}=false"),
        None => bail!("X API response missing `{flag}` flag"),
    }
}

/// Prefer the API's own `detail`/`title` over echoing a whole error body.
fn summarize_error(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| v.get("detail").or_else(|| v.get("title")))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.chars().take(200).collect())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
