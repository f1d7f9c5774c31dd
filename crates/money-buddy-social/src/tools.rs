// Agent tools for X/Twitter. Each takes one string and answers with one
// string the model can read back to the user.

use std::sync::Arc;

use async_trait::async_trait;

use money_buddy_core::tool::Tool;

use crate::service::TwitterService;

/// All Twitter tools sharing one service.
pub fn twitter_tools(service: Arc<TwitterService>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(TwitterPostTool::new(service.clone())),
        Arc::new(TwitterLikeTool::new(service.clone())),
        Arc::new(TwitterRetweetTool::new(service.clone())),
        Arc::new(TwitterSearchTool::new(service.clone())),
        Arc::new(TwitterGetUserTool::new(service)),
    ]
}

// ---------------------------------------------------------------------------
// twitter_post
// ---------------------------------------------------------------------------

pub struct TwitterPostTool {
    service: Arc<TwitterService>,
}

impl TwitterPostTool {
    pub fn new(service: Arc<TwitterService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for TwitterPostTool {
    fn name(&self) -> &'static str {
        "twitter_post"
    }

    fn description(&self) -> &'static str {
        "Post a new tweet to Twitter.\n\
         Input is the exact text to tweet (280 characters max). Mentions (@username), \
         hashtags, $APT-style cashtags, URLs and emojis are allowed.\n\
         Example: \"Just launched a new Emojicoin market on Aptos! 🚀 #Emojicoin\""
    }

    async fn call(&self, input: &str) -> String {
        let outcome = self.service.post_tweet(input).await;
        if outcome.is_success() {
            format!("Successfully posted tweet: \"{input}\"")
        } else {
            format!("Failed to post tweet: {}", outcome.error_message())
        }
    }
}

// ---------------------------------------------------------------------------
// twitter_like
// ---------------------------------------------------------------------------

pub struct TwitterLikeTool {
    service: Arc<TwitterService>,
}

impl TwitterLikeTool {
    pub fn new(service: Arc<TwitterService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for TwitterLikeTool {
    fn name(&self) -> &'static str {
        "twitter_like"
    }

    fn description(&self) -> &'static str {
        "Like a tweet on Twitter.\n\
         Input is the tweet ID. In \"https://twitter.com/user/status/1234567890\" the ID is \
         \"1234567890\". The tweet must be public and still available."
    }

    async fn call(&self, input: &str) -> String {
        let tweet_id = input.trim();
        let outcome = self.service.like_tweet(tweet_id).await;
        if outcome.is_success() {
            format!("Successfully liked tweet with ID: {tweet_id}")
        } else {
            format!("Failed to like tweet: {}", outcome.error_message())
        }
    }
}

// ---------------------------------------------------------------------------
// twitter_retweet
// ---------------------------------------------------------------------------

pub struct TwitterRetweetTool {
    service: Arc<TwitterService>,
}

impl TwitterRetweetTool {
    pub fn new(service: Arc<TwitterService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for TwitterRetweetTool {
    fn name(&self) -> &'static str {
        "twitter_retweet"
    }

    fn description(&self) -> &'static str {
        "Retweet (share) a tweet to your followers.\n\
         Input is the tweet ID, taken from a tweet URL or from twitter_search results. \
         The tweet must be public and not already retweeted by this account."
    }

    async fn call(&self, input: &str) -> String {
        let tweet_id = input.trim();
        let outcome = self.service.retweet(tweet_id).await;
        if outcome.is_success() {
            format!("Successfully retweeted tweet with ID: {tweet_id}")
        } else {
            format!("Failed to retweet: {}", outcome.error_message())
        }
    }
}

// ---------------------------------------------------------------------------
// twitter_search
// ---------------------------------------------------------------------------

pub struct TwitterSearchTool {
    service: Arc<TwitterService>,
}

impl TwitterSearchTool {
    pub fn new(service: Arc<TwitterService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for TwitterSearchTool {
    fn name(&self) -> &'static str {
        "twitter_search"
    }

    fn description(&self) -> &'static str {
        "Search recent tweets. Returns up to 10 of the most recent matches with their \
         text and author.\n\
         Supports keywords (\"aptos blockchain\"), hashtags (\"#AptosNFT\"), authors \
         (\"from:aptoslabs\"), mentions (\"@aptoslabs\"), OR, and exclusions (\"aptos -nft\")."
    }

    async fn call(&self, input: &str) -> String {
        let outcome = self.service.search_tweets(input).await;
        match outcome.data() {
            Some(results) if outcome.is_success() && !results.posts.is_empty() => {
                let lines: Vec<String> = results
                    .posts
                    .iter()
                    .map(|p| format!("- {} (by @{})", p.text, p.username))
                    .collect();
                format!("Search results for \"{input}\":\n{}", lines.join("\n"))
            }
            _ => {
                let reason = outcome.error.as_deref().unwrap_or("No results found");
                format!("Failed to search tweets: {reason}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// twitter_get_user
// ---------------------------------------------------------------------------

pub struct TwitterGetUserTool {
    service: Arc<TwitterService>,
}

impl TwitterGetUserTool {
    pub fn new(service: Arc<TwitterService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for TwitterGetUserTool {
    fn name(&self) -> &'static str {
        "twitter_get_user"
    }

    fn description(&self) -> &'static str {
        "Get a Twitter user's profile: display name, follower count and total posts.\n\
         Input is the username without the '@' and without a URL, e.g. \"aptoslabs\". \
         Only public profiles can be read."
    }

    async fn call(&self, input: &str) -> String {
        let username = input.trim();
        let username = username.strip_prefix('@').unwrap_or(username);
        let outcome = self.service.get_user(username).await;
        match outcome.data() {
            Some(receipt) => {
                let p = &receipt.profile;
                format!(
                    "Profile for {username}:\nName: {}\nFollowers: {}\nTotal Posts: {}",
                    p.name, p.followers, p.posts
                )
            }
            None => format!("Failed to get user profile: {}", outcome.error_message()),
        }
    }
}
