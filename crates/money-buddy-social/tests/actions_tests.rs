// Integration tests for the Twitter action wrappers, the per-call service and
// the agent tools, driven through a scripted in-memory client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream;
use futures_util::StreamExt;
use serde_json::json;

use money_buddy_core::tool::Tool;
use money_buddy_social::actions;
use money_buddy_social::client::{RawProfile, RawTweet, SocialClient, TweetStream};
use money_buddy_social::service::{ClientFactory, TwitterService};
use money_buddy_social::session::{acquire_session, Credentials, LoginPolicy, Session};
use money_buddy_social::tools::{
    twitter_tools, TwitterGetUserTool, TwitterPostTool, TwitterSearchTool,
};

// ===========================================================================
// Test helpers
// ===========================================================================

/// Scripted client. Search yields `feed` in order, then ends; `fail_with`
/// makes every action method fail with that message.
#[derive(Clone, Default)]
struct ScriptedClient {
    feed: Vec<RawTweet>,
    profile: RawProfile,
    fail_with: Option<String>,
    fail_login: bool,
    pulled: Arc<AtomicUsize>,
    sent: Arc<Mutex<Vec<String>>>,
    logins: Arc<AtomicUsize>,
}

impl ScriptedClient {
    fn check(&self) -> anyhow::Result<()> {
        match &self.fail_with {
            Some(msg) => anyhow::bail!("{msg}"),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SocialClient for ScriptedClient {
    async fn login(&mut self, _username: &str, _password: &str) -> anyhow::Result<()> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        if self.fail_login {
            anyhow::bail!("suspicious login blocked");
        }
        Ok(())
    }

    async fn get_profile(&self, _username: &str) -> anyhow::Result<RawProfile> {
        self.check()?;
        Ok(self.profile.clone())
    }

    async fn send_tweet(&self, text: &str) -> anyhow::Result<String> {
        self.check()?;
        self.sent.lock().unwrap().push(text.to_string());
        Ok("1790000000000000001".to_string())
    }

    async fn like_tweet(&self, _tweet_id: &str) -> anyhow::Result<()> {
        self.check()
    }

    async fn retweet(&self, _tweet_id: &str) -> anyhow::Result<()> {
        self.check()
    }

    fn search_tweets<'a>(&'a self, _query: &'a str, _max: usize) -> TweetStream<'a> {
        if let Some(msg) = &self.fail_with {
            let err = anyhow::anyhow!("{msg}");
            return Box::pin(stream::iter(vec![Err(err)]));
        }
        let pulled = self.pulled.clone();
        Box::pin(stream::iter(self.feed.clone()).map(move |t| {
            pulled.fetch_add(1, Ordering::SeqCst);
            Ok(t)
        }))
    }
}

fn instant_policy() -> LoginPolicy {
    LoginPolicy {
        initial_delay: Duration::ZERO,
        retry_delay: Duration::ZERO,
        ..LoginPolicy::default()
    }
}

async fn session_for(client: ScriptedClient) -> Session<ScriptedClient> {
    acquire_session(&Credentials::new("moneybuddy", "token"), &instant_policy(), move || client)
        .await
        .expect("scripted login succeeds")
}

fn tweet(n: usize) -> RawTweet {
    RawTweet {
        id: Some(n.to_string()),
        text: Some(format!("aptos post {n}")),
        username: Some(format!("user{n}")),
        timestamp: Some(1_700_000_000 + n as i64),
    }
}

fn service_for(client: ScriptedClient, credentials: Credentials) -> Arc<TwitterService> {
    let factory: ClientFactory =
        Arc::new(move || Box::new(client.clone()) as Box<dyn SocialClient>);
    Arc::new(TwitterService::new(credentials, instant_policy(), 10, factory))
}

// ===========================================================================
// Action wrappers
// ===========================================================================

#[tokio::test]
async fn post_returns_text_in_result() {
    let client = ScriptedClient::default();
    let sent = client.sent.clone();
    let session = session_for(client).await;

    let outcome = actions::post(&session, "hello world").await;

    assert!(outcome.success);
    let receipt = outcome.data().unwrap();
    assert_eq!(receipt.result.text, "hello world");
    assert_eq!(receipt.result.id, "1790000000000000001");
    assert_eq!(receipt.message, "Tweet posted successfully");
    assert_eq!(*sent.lock().unwrap(), vec!["hello world".to_string()]);

    let wire = serde_json::to_value(&outcome).unwrap();
    assert_eq!(wire["success"], json!(true));
    assert_eq!(wire["result"]["text"], json!("hello world"));
}

#[tokio::test]
async fn search_stops_at_limit() {
    let client = ScriptedClient {
        feed: (1..=12).map(tweet).collect(),
        ..Default::default()
    };
    let pulled = client.pulled.clone();
    let session = session_for(client).await;

    let outcome = actions::search(&session, "aptos", 10).await;

    assert!(outcome.success);
    let posts = &outcome.data().unwrap().posts;
    assert_eq!(posts.len(), 10);
    assert!(posts
        .iter()
        .all(|p| !p.text.is_empty() && !p.username.is_empty() && p.timestamp > 0));
    assert_eq!(posts[0].username, "user1");
    assert_eq!(pulled.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn search_skips_posts_missing_timestamp() {
    let mut feed: Vec<RawTweet> = (1..=5).map(tweet).collect();
    feed[1].timestamp = None;
    feed[3].timestamp = None;
    let session = session_for(ScriptedClient {
        feed,
        ..Default::default()
    })
    .await;

    let outcome = actions::search(&session, "aptos", 10).await;

    let posts = &outcome.data().unwrap().posts;
    let names: Vec<&str> = posts.iter().map(|p| p.username.as_str()).collect();
    assert_eq!(names, vec!["user1", "user3", "user5"]);
}

#[tokio::test]
async fn search_treats_empty_text_as_missing() {
    let mut feed: Vec<RawTweet> = (1..=3).map(tweet).collect();
    feed[0].text = Some(String::new());
    let session = session_for(ScriptedClient {
        feed,
        ..Default::default()
    })
    .await;

    let outcome = actions::search(&session, "aptos", 10).await;
    assert_eq!(outcome.data().unwrap().posts.len(), 2);
}

#[tokio::test]
async fn search_with_zero_limit_reads_nothing() {
    let client = ScriptedClient {
        feed: (1..=3).map(tweet).collect(),
        ..Default::default()
    };
    let pulled = client.pulled.clone();
    let session = session_for(client).await;

    let outcome = actions::search(&session, "aptos", 0).await;

    assert!(outcome.success);
    assert!(outcome.data().unwrap().posts.is_empty());
    assert_eq!(pulled.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn search_stream_error_becomes_failure() {
    let session = session_for(ScriptedClient {
        fail_with: Some("rate limited".into()),
        ..Default::default()
    })
    .await;

    let outcome = actions::search(&session, "aptos", 10).await;
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("rate limited"));
}

#[tokio::test]
async fn profile_missing_followers_is_invalid() {
    let session = session_for(ScriptedClient {
        profile: RawProfile {
            name: Some("Aptos".into()),
            followers_count: None,
            statuses_count: Some(10),
        },
        ..Default::default()
    })
    .await;

    let outcome = actions::get_user(&session, "aptos").await;

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Invalid profile data received"));
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        json!({ "success": false, "error": "Invalid profile data received" })
    );
}

#[tokio::test]
async fn profile_with_all_fields_succeeds() {
    let session = session_for(ScriptedClient {
        profile: RawProfile {
            name: Some("Aptos".into()),
            followers_count: Some(1200),
            statuses_count: Some(340),
        },
        ..Default::default()
    })
    .await;

    let outcome = actions::get_user(&session, "aptos").await;
    let profile = &outcome.data().unwrap().profile;
    assert_eq!(profile.name, "Aptos");
    assert_eq!(profile.followers, 1200);
    assert_eq!(profile.posts, 340);
}

#[tokio::test]
async fn like_and_retweet_report_failures_as_outcomes() {
    let session = session_for(ScriptedClient {
        fail_with: Some("tweet not found".into()),
        ..Default::default()
    })
    .await;

    let liked = actions::like(&session, "1").await;
    let shared = actions::retweet(&session, "1").await;
    assert_eq!(liked.error.as_deref(), Some("tweet not found"));
    assert_eq!(shared.error.as_deref(), Some("tweet not found"));

    let ok_session = session_for(ScriptedClient::default()).await;
    assert_eq!(
        actions::like(&ok_session, "1").await.data().unwrap().message,
        "Tweet liked successfully"
    );
    assert_eq!(
        actions::retweet(&ok_session, "1").await.data().unwrap().message,
        "Tweet retweeted successfully"
    );
}

// ===========================================================================
// Service: one login per action
// ===========================================================================

#[tokio::test]
async fn service_logs_in_for_every_action() {
    let client = ScriptedClient::default();
    let logins = client.logins.clone();
    let service = service_for(client, Credentials::new("moneybuddy", "token"));

    assert!(service.post_tweet("one").await.success);
    assert!(service.like_tweet("1").await.success);
    assert_eq!(logins.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn service_without_credentials_fails_structurally() {
    let client = ScriptedClient::default();
    let logins = client.logins.clone();
    let service = service_for(client, Credentials::default());

    let outcome = service.post_tweet("hello").await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.error.as_deref(),
        Some("Twitter credentials not found in runtime config")
    );
    assert_eq!(logins.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn service_login_exhaustion_is_reported() {
    let client = ScriptedClient {
        fail_login: true,
        ..Default::default()
    };
    let logins = client.logins.clone();
    let service = service_for(client, Credentials::new("moneybuddy", "token"));

    let outcome = service.retweet("1").await;

    assert!(!outcome.success);
    assert!(outcome.error_message().contains("suspicious login blocked"));
    assert_eq!(logins.load(Ordering::SeqCst), 3);
}

// ===========================================================================
// Tools
// ===========================================================================

#[tokio::test]
async fn post_tool_reports_success_and_failure() {
    let ok = TwitterPostTool::new(service_for(
        ScriptedClient::default(),
        Credentials::new("moneybuddy", "token"),
    ));
    assert_eq!(ok.call("gm").await, "Successfully posted tweet: \"gm\"");

    let missing =
        TwitterPostTool::new(service_for(ScriptedClient::default(), Credentials::default()));
    assert_eq!(
        missing.call("gm").await,
        "Failed to post tweet: Twitter credentials not found in runtime config"
    );
}

#[tokio::test]
async fn search_tool_formats_results() {
    let tool = TwitterSearchTool::new(service_for(
        ScriptedClient {
            feed: (1..=2).map(tweet).collect(),
            ..Default::default()
        },
        Credentials::new("moneybuddy", "token"),
    ));

    assert_eq!(
        tool.call("aptos").await,
        "Search results for \"aptos\":\n- aptos post 1 (by @user1)\n- aptos post 2 (by @user2)"
    );
}

#[tokio::test]
async fn search_tool_without_hits_says_so() {
    let tool = TwitterSearchTool::new(service_for(
        ScriptedClient::default(),
        Credentials::new("moneybuddy", "token"),
    ));
    assert_eq!(tool.call("nothing").await, "Failed to search tweets: No results found");
}

#[tokio::test]
async fn get_user_tool_strips_at_sign() {
    let tool = TwitterGetUserTool::new(service_for(
        ScriptedClient {
            profile: RawProfile {
                name: Some("Aptos Labs".into()),
                followers_count: Some(10),
                statuses_count: Some(20),
            },
            ..Default::default()
        },
        Credentials::new("moneybuddy", "token"),
    ));

    assert_eq!(
        tool.call("@aptoslabs").await,
        "Profile for aptoslabs:\nName: Aptos Labs\nFollowers: 10\nTotal Posts: 20"
    );
}

#[test]
fn all_twitter_tools_have_distinct_names() {
    let service = service_for(ScriptedClient::default(), Credentials::default());
    let mut names: Vec<&str> = twitter_tools(service).iter().map(|t| t.name()).collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec![
            "twitter_get_user",
            "twitter_like",
            "twitter_post",
            "twitter_retweet",
            "twitter_search"
        ]
    );
}
