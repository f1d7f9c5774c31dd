// Credentials-bound entry point: acquire a fresh session, run one action.
//
// No session is kept between calls, so every action pays the full
// login-plus-retry cost. Session errors become failed outcomes like any
// other action error.

use std::future::Future;
use std::sync::Arc;

use tracing::error;

use money_buddy_core::config::Config;
use money_buddy_core::outcome::Outcome;

use crate::actions::{self, Confirmation, PostReceipt, ProfileReceipt, SearchResults};
use crate::client::SocialClient;
use crate::session::{acquire_session, Credentials, LoginPolicy, Session};
use crate::x_api::XApiClient;

/// Builds a new, not-yet-logged-in client for each acquisition.
pub type ClientFactory = Arc<dyn Fn() -> Box<dyn SocialClient> + Send + Sync>;

pub type DynSession = Session<Box<dyn SocialClient>>;

#[derive(Clone)]
pub struct TwitterService {
    credentials: Credentials,
    policy: LoginPolicy,
    search_limit: usize,
    factory: ClientFactory,
}

impl TwitterService {
    pub fn new(
        credentials: Credentials,
        policy: LoginPolicy,
        search_limit: usize,
        factory: ClientFactory,
    ) -> Self {
        Self {
            credentials,
            policy,
            search_limit,
            factory,
        }
    }

    /// Service backed by the X API, with credentials and retry policy from config.
    pub fn from_config(config: &Config) -> Self {
        let http = reqwest::Client::new();
        let api_base = config.twitter.api_base.clone();
        let factory: ClientFactory = Arc::new(move || {
            Box::new(XApiClient::new(http.clone(), api_base.clone())) as Box<dyn SocialClient>
        });
        Self::new(
            Credentials::from_config(&config.credentials),
            LoginPolicy::from_config(&config.twitter),
            config.twitter.search_limit,
            factory,
        )
    }

    pub fn search_limit(&self) -> usize {
        self.search_limit
    }

    async fn with_session<T, F, Fut>(&self, action: &str, run: F) -> Outcome<T>
    where
        F: FnOnce(DynSession) -> Fut,
        Fut: Future<Output = Outcome<T>>,
    {
        let factory = self.factory.clone();
        match acquire_session(&self.credentials, &self.policy, move || factory()).await {
            Ok(session) => run(session).await,
            Err(e) => {
                error!(action, "Error initializing Twitter session: {e}");
                Outcome::failure(e.to_string())
            }
        }
    }

    pub async fn post_tweet(&self, text: &str) -> Outcome<PostReceipt> {
        self.with_session("post", |s| async move { actions::post(&s, text).await })
            .await
    }

    pub async fn like_tweet(&self, tweet_id: &str) -> Outcome<Confirmation> {
        self.with_session("like", |s| async move { actions::like(&s, tweet_id).await })
            .await
    }

    pub async fn retweet(&self, tweet_id: &str) -> Outcome<Confirmation> {
        self.with_session("retweet", |s| async move { actions::retweet(&s, tweet_id).await })
            .await
    }

    /// Search with the configured result limit.
    pub async fn search_tweets(&self, query: &str) -> Outcome<SearchResults> {
        let limit = self.search_limit;
        self.with_session("search", |s| async move { actions::search(&s, query, limit).await })
            .await
    }

    pub async fn get_user(&self, username: &str) -> Outcome<ProfileReceipt> {
        self.with_session("get_user", |s| async move { actions::get_user(&s, username).await })
            .await
    }
}
