// HTTP API tests: the router is served on an ephemeral port with scripted
// model and chain collaborators, and driven with reqwest.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use money_buddy_app::runtime::AppState;
use money_buddy_app::server;
use money_buddy_chain::{
    AccountAddress, ChainClient, ChainError, ChainSettings, CommittedTransaction, EntryFunction,
    LocalAccount,
};
use money_buddy_core::tool::ToolSpec;
use money_buddy_llm::{
    AssistantTurn, ChatModel, ContentBlock, LlmClient, Message, StopReason, Usage,
};
use money_buddy_social::client::SocialClient;
use money_buddy_social::service::{ClientFactory, TwitterService};
use money_buddy_social::session::{Credentials, LoginPolicy};
use money_buddy_social::x_api::XApiClient;

const KEY: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

// ===========================================================================
// Test helpers
// ===========================================================================

#[derive(Default)]
struct ScriptedModel {
    turns: Mutex<VecDeque<AssistantTurn>>,
    systems: Mutex<Vec<String>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        _tools: &[ToolSpec],
        _max_tokens: u32,
    ) -> anyhow::Result<AssistantTurn> {
        self.systems.lock().unwrap().push(system.to_string());
        self.requests.lock().unwrap().push(messages.to_vec());
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted turn"))
    }
}

struct StubChain;

#[async_trait]
impl ChainClient for StubChain {
    async fn submit(
        &self,
        _signer: &LocalAccount,
        _call: &EntryFunction,
    ) -> Result<String, ChainError> {
        Ok("0xfeed".to_string())
    }

    async fn wait_for_transaction(&self, hash: &str) -> Result<CommittedTransaction, ChainError> {
        Ok(CommittedTransaction {
            hash: hash.to_string(),
            version: Some(7),
            success: true,
            vm_status: "Executed successfully".to_string(),
        })
    }

    async fn view(&self, _call: &EntryFunction) -> Result<Vec<Value>, ChainError> {
        Ok(vec![json!("250")])
    }
}

fn text_turn(text: &str) -> AssistantTurn {
    AssistantTurn {
        content: vec![ContentBlock::Text { text: text.into() }],
        stop_reason: StopReason::EndTurn,
        usage: Usage::default(),
    }
}

fn tool_turn(name: &str, input: &str) -> AssistantTurn {
    AssistantTurn {
        content: vec![ContentBlock::ToolUse {
            id: "toolu_1".into(),
            name: name.into(),
            input: json!({ "input": input }),
        }],
        stop_reason: StopReason::ToolUse,
        usage: Usage::default(),
    }
}

fn state_with(model: Arc<dyn ChatModel>) -> AppState {
    // No credentials, so Twitter tools fail before any client is used.
    let factory: ClientFactory = Arc::new(|| {
        let client = XApiClient::new(reqwest::Client::new(), "http://127.0.0.1:9");
        Box::new(client) as Box<dyn SocialClient>
    });
    let twitter = TwitterService::new(Credentials::default(), LoginPolicy::default(), 10, factory);
    let settings = ChainSettings {
        emojicoin_module: AccountAddress::from_hex("0xface").unwrap(),
        integrator: AccountAddress::from_hex("0xbeef").unwrap(),
        swap_router: AccountAddress::from_hex("0x190d").unwrap(),
        staking_pool: None,
    };
    AppState::new(model, Arc::new(StubChain), settings, Arc::new(twitter))
}

async fn spawn(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, server::router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

async fn post(base: &str, path: &str, body: Value) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("{base}{path}"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

fn scripted(turns: Vec<AssistantTurn>) -> Arc<ScriptedModel> {
    Arc::new(ScriptedModel {
        turns: Mutex::new(turns.into()),
        ..Default::default()
    })
}

// ===========================================================================
// /health
// ===========================================================================

#[tokio::test]
async fn health_is_ok() {
    let base = spawn(state_with(scripted(vec![]))).await;
    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "status": "ok" }));
}

// ===========================================================================
// /api/agent
// ===========================================================================

#[tokio::test]
async fn agent_requires_message_and_key() {
    let base = spawn(state_with(scripted(vec![]))).await;

    let (status, body) = post(&base, "/api/agent", json!({ "privateKey": KEY })).await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({ "error": "Message is required" }));

    let request = json!({ "message": "hi", "privateKey": "" });
    let (status, body) = post(&base, "/api/agent", request).await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({ "error": "Private key is required" }));
}

#[tokio::test]
async fn agent_answers_with_model_text() {
    let model = scripted(vec![text_turn("Hello from Money Buddy!")]);
    let base = spawn(state_with(model.clone())).await;

    let (status, body) = post(
        &base,
        "/api/agent",
        json!({ "message": "hi", "walletAddress": "0xabc", "privateKey": KEY }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body, json!({ "response": "Hello from Money Buddy!" }));
    let systems = model.systems.lock().unwrap();
    assert!(systems[0].ends_with("The user's wallet address is: 0xabc"));
}

#[tokio::test]
async fn agent_wallet_defaults_to_derived_address() {
    let model = scripted(vec![text_turn("ok")]);
    let base = spawn(state_with(model.clone())).await;

    let request = json!({ "message": "hi", "privateKey": KEY });
    let (status, _) = post(&base, "/api/agent", request).await;

    assert_eq!(status, 200);
    let derived = LocalAccount::from_private_key(KEY).unwrap().address().to_hex();
    assert!(model.systems.lock().unwrap()[0].ends_with(&derived));
}

#[tokio::test]
async fn agent_runs_chain_tool() {
    let model = scripted(vec![
        tool_turn("aptos_get_balance", ""),
        text_turn("You have 250 octas."),
    ]);
    let base = spawn(state_with(model.clone())).await;

    let request = json!({ "message": "balance?", "privateKey": KEY });
    let (status, body) = post(&base, "/api/agent", request).await;

    assert_eq!(status, 200);
    assert_eq!(body["response"], "You have 250 octas.");
    let requests = model.requests.lock().unwrap();
    assert_eq!(
        requests[1][2].content,
        vec![ContentBlock::ToolResult {
            tool_use_id: "toolu_1".into(),
            content: "Balances:\n- 0x1::aptos_coin::AptosCoin: 250".into(),
        }]
    );
}

#[tokio::test]
async fn agent_twitter_tool_without_credentials_reports_failure() {
    let model = scripted(vec![
        tool_turn("twitter_post", "gm"),
        text_turn("Twitter is not set up."),
    ]);
    let base = spawn(state_with(model.clone())).await;

    let request = json!({ "message": "tweet gm", "privateKey": KEY });
    let (status, _) = post(&base, "/api/agent", request).await;

    assert_eq!(status, 200);
    let requests = model.requests.lock().unwrap();
    assert_eq!(
        requests[1][2].content,
        vec![ContentBlock::ToolResult {
            tool_use_id: "toolu_1".into(),
            content: "Failed to post tweet: Twitter credentials not found in runtime config".into(),
        }]
    );
}

#[tokio::test]
async fn agent_failures_are_500() {
    let base = spawn(state_with(Arc::new(LlmClient::Disabled))).await;

    let request = json!({ "message": "hi", "privateKey": KEY });
    let (status, body) = post(&base, "/api/agent", request).await;
    assert_eq!(status, 500);
    assert_eq!(body, json!({ "error": "Error processing request: LLM not configured" }));

    let request = json!({ "message": "hi", "privateKey": "0x12" });
    let (status, body) = post(&base, "/api/agent", request).await;
    assert_eq!(status, 500);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Error processing request: invalid private key"));
}

// ===========================================================================
// /api/autonomous
// ===========================================================================

#[tokio::test]
async fn autonomous_validation() {
    let base = spawn(state_with(scripted(vec![]))).await;

    let cases = [
        (json!({ "operation": "analyzePortfolio" }), "Private key is required"),
        (json!({ "privateKey": KEY }), "Operation type is required"),
        (
            json!({ "privateKey": KEY, "operation": "analyzePortfolio" }),
            "Wallet address is required",
        ),
        (
            json!({ "privateKey": KEY, "operation": "executeTradingStrategy" }),
            "Trading strategy is required",
        ),
        (json!({ "privateKey": KEY, "operation": "mine" }), "Invalid operation type"),
    ];
    for (request, message) in cases {
        let (status, body) = post(&base, "/api/autonomous", request).await;
        assert_eq!(status, 400, "{message}");
        assert_eq!(body, json!({ "error": message }));
    }
}

#[tokio::test]
async fn autonomous_analyze_portfolio() {
    let base = spawn(state_with(scripted(vec![]))).await;

    let (status, body) = post(
        &base,
        "/api/autonomous",
        json!({
            "operation": "analyzePortfolio",
            "privateKey": KEY,
            "walletAddress": "0xabc",
            "preferences": {
                "portfolioStrategy": {
                    "targetAllocations": { "APT": 50 },
                    "rebalanceThreshold": 5,
                    "riskTolerance": "high"
                },
                "notificationSettings": { "notifyOnRebalance": true }
            }
        }),
    )
    .await;

    assert_eq!(status, 200);
    let result = &body["result"];
    assert_eq!(result["totalValue"], 160.0);
    assert_eq!(result["currentAllocation"]["USDC"], 62.5);
    assert_eq!(
        result["recommendedActions"],
        json!(["Buy more APT to reach target allocation of 50%"])
    );
}

#[tokio::test]
async fn autonomous_yield_and_trading() {
    let base = spawn(state_with(scripted(vec![]))).await;

    let (status, body) = post(
        &base,
        "/api/autonomous",
        json!({ "operation": "findYieldOpportunities", "privateKey": KEY }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["result"]["opportunities"].as_array().unwrap().len(), 5);

    let (status, body) = post(
        &base,
        "/api/autonomous",
        json!({
            "operation": "executeTradingStrategy",
            "privateKey": KEY,
            "strategy": {
                "tradingType": "dca",
                "targetToken": "USDC",
                "sourceToken": "APT",
                "amount": 2,
                "frequency": "weekly"
            }
        }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(
        body["result"],
        json!({
            "success": true,
            "message": "Executed DCA: Bought 2 USDC with APT",
            "simulated": true
        })
    );
}

#[tokio::test]
async fn autonomous_bad_key_is_500() {
    let base = spawn(state_with(scripted(vec![]))).await;
    let (status, body) = post(
        &base,
        "/api/autonomous",
        json!({ "operation": "findYieldOpportunities", "privateKey": "nope" }),
    )
    .await;
    assert_eq!(status, 500);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Error processing operation: invalid private key"));
}
