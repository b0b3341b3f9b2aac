//! Bridge harness: lifecycle, credentials, wizard and poller against a mocked
//! trading bridge

use std::sync::Arc;
use std::time::Duration;

use bot_console::credentials::SecretInput;
use bot_console::{
    ApiCredentialInput, AuthError, BotConfigDraft, BotError, BotLifecycleClient, BotPoller,
    BotRoster, BotStatus, BotWizard, BridgeClient, Chain, Confirmation, CredentialError,
    CredentialProvisioner, DestructiveAction, FilterMode, HealthClass, Session, StrategyKind,
    SubmitError, WizardStep,
};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_partial_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

fn bridge_at(uri: &str, session: Session) -> Arc<BridgeClient> {
    Arc::new(BridgeClient::new(uri, session, Duration::from_secs(5)).unwrap())
}

fn bridge(server: &MockServer) -> Arc<BridgeClient> {
    bridge_at(&server.uri(), Session::new().with_bearer_token("test-token"))
}

fn solana_key() -> String {
    bs58::encode([7u8; 64]).into_string()
}

fn bots_json() -> serde_json::Value {
    json!([
        {"id": "1", "name": "sharp-vol", "account": "client_sharp", "status": "running"},
        {"id": "2", "name": "other-vol", "account": "client_other", "status": "running"},
        {"id": 3, "name": "sharp-spread", "account": "client_sharp", "status": "stopped",
         "healthStatus": "stale"}
    ])
}

/// Wizard walked to Review for a Jupiter volume bot
fn jupiter_wizard() -> BotWizard {
    let mut wizard = BotWizard::new();
    wizard.draft_mut().set_strategy(StrategyKind::Volume).unwrap();
    wizard.advance().unwrap();
    wizard.draft_mut().set_exchange("jupiter").unwrap();
    wizard.advance().unwrap();
    wizard.draft_mut().set_private_key(solana_key()).unwrap();
    wizard.advance().unwrap();
    wizard.draft_mut().set_token_address(USDC_MINT).unwrap();
    wizard.advance().unwrap();
    assert_eq!(wizard.step(), WizardStep::Review);
    wizard
}

/// Answers GETs with a stored key, hangs up on anything else
async fn flaky_bridge() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                if buf[..n].starts_with(b"GET ") {
                    let body = r#"{"has_key":true,"last_rotated_at":"2026-01-01T00:00:00Z"}"#;
                    let resp = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(resp.as_bytes()).await;
                }
            });
        }
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_list_falls_back_to_local_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bots"))
        .and(query_param("account", "client_sharp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bots_json()))
        .expect(1)
        .mount(&server)
        .await;

    let lifecycle = BotLifecycleClient::new(bridge(&server));
    let listing = assert_ok!(lifecycle.list(Some("client_sharp")).await);

    assert_eq!(listing.filter_mode, FilterMode::ClientFallback);
    assert!(listing.is_degraded());
    let ids: Vec<&str> = listing.bots.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);
}

#[tokio::test]
async fn test_list_accepts_wrapped_body_and_server_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bots"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bots": [{"id": "1", "name": "a", "account": "client_sharp", "status": "running"}]
        })))
        .mount(&server)
        .await;

    let lifecycle = BotLifecycleClient::new(bridge(&server));
    let listing = assert_ok!(lifecycle.list(Some("client_sharp")).await);
    assert_eq!(listing.filter_mode, FilterMode::Server);
    assert_eq!(listing.bots.len(), 1);

    let unfiltered = assert_ok!(lifecycle.list(None).await);
    assert_eq!(unfiltered.filter_mode, FilterMode::Unfiltered);
}

#[tokio::test]
async fn test_missing_identity_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let lifecycle = BotLifecycleClient::new(bridge_at(&server.uri(), Session::new()));
    let err = assert_err!(lifecycle.list(None).await);
    assert_eq!(err, BotError::Auth(AuthError::MissingCredentials));
}

#[tokio::test]
async fn test_rotate_network_failure_keeps_status_and_clears_input() {
    let uri = flaky_bridge().await;
    let provisioner = CredentialProvisioner::new(bridge_at(
        &uri,
        Session::new().with_wallet_address("Wallet111"),
    ));

    assert!(assert_ok!(provisioner.has_credential("client_sharp").await));
    let before = provisioner.status("client_sharp").await;
    assert!(before.is_some_and(|s| s.has_key));

    let mut input = SecretInput::new(solana_key());
    let err = assert_err!(provisioner.rotate("client_sharp", Chain::Solana, &mut input).await);
    assert!(matches!(err, CredentialError::NetworkError(_)), "got {:?}", err);
    assert!(input.is_empty());
    assert_eq!(provisioner.status("client_sharp").await, before);
}

#[tokio::test]
async fn test_rotate_rejects_bad_key_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provisioner = CredentialProvisioner::new(bridge(&server));
    let mut input = SecretInput::new("not-a-key");
    let err = assert_err!(provisioner.rotate("c1", Chain::Evm, &mut input).await);
    assert!(matches!(err, CredentialError::InvalidFormat(_)));
    assert!(input.is_empty());
}

#[tokio::test]
async fn test_revoke_and_delete_need_matching_confirmation() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/clients/c1/revoke-key"))
        .and(header_exists("X-Request-Id"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/bots/b1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = bridge(&server);
    let provisioner = CredentialProvisioner::new(client.clone());
    let lifecycle = BotLifecycleClient::new(client);

    let wrong = Confirmation::acknowledge(DestructiveAction::RevokeKey, "c2");
    assert_eq!(
        provisioner.revoke("c1", &wrong).await,
        Err(CredentialError::Unconfirmed("c1".to_string()))
    );
    assert_ok!(
        provisioner
            .revoke("c1", &Confirmation::acknowledge(DestructiveAction::RevokeKey, "c1"))
            .await
    );
    assert_eq!(provisioner.status("c1").await.map(|s| s.has_key), Some(false));

    let revoke_ack = Confirmation::acknowledge(DestructiveAction::RevokeKey, "b1");
    assert_eq!(
        lifecycle.delete("b1", &revoke_ack).await,
        Err(BotError::Unconfirmed("b1".to_string()))
    );
    assert_ok!(
        lifecycle
            .delete("b1", &Confirmation::acknowledge(DestructiveAction::DeleteBot, "b1"))
            .await
    );
}

#[tokio::test]
async fn test_lifecycle_actions_and_error_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bots/b1/start"))
        .and(header_exists("X-Request-Id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "starting"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bots/missing/stop"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Bot not found"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bots/b1/force-health-check"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "checker offline"})))
        .mount(&server)
        .await;

    let lifecycle = BotLifecycleClient::new(bridge(&server));
    assert_ok!(lifecycle.start("b1").await);
    assert_eq!(lifecycle.stop("missing").await, Err(BotError::NotFound));
    assert_eq!(
        lifecycle.force_health_check("b1").await,
        Err(BotError::RemoteRejected("checker offline".to_string()))
    );
}

#[tokio::test]
async fn test_confirm_provisions_key_then_creates_bot() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/clients/client_sharp/trading-key"))
        .and(body_partial_json(json!({"chain": "solana"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "stored"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/clients/client_sharp/setup-bot"))
        .and(body_partial_json(json!({
            "bot_type": "volume",
            "connector": "jupiter",
            "base_mint": USDC_MINT,
            "config": {"interval_min_seconds": 900, "slippage_bps": 50}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bot": {"id": "bot-1", "name": "volume-jupiter-EPjFWd", "account": "client_sharp",
                    "status": "stopped"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = bridge(&server);
    let provisioner = CredentialProvisioner::new(client.clone());
    let lifecycle = BotLifecycleClient::new(client);

    let mut wizard = jupiter_wizard();
    let bot = assert_ok!(wizard.confirm("client_sharp", &provisioner, &lifecycle).await);
    assert_eq!(bot.id, "bot-1");
    assert_eq!(wizard.step(), WizardStep::SelectType);
    assert!(wizard.draft().strategy().is_none());
    assert_eq!(provisioner.status("client_sharp").await.map(|s| s.has_key), Some(true));

    // The bot body never carries the key
    let requests = server.received_requests().await.unwrap();
    let setup = requests
        .iter()
        .find(|r| r.url.path().ends_with("/setup-bot"))
        .unwrap();
    let body = String::from_utf8_lossy(&setup.body);
    assert!(!body.contains(&solana_key()));
    assert!(!body.contains("private_key"));
}

#[tokio::test]
async fn test_confirm_reports_orphaned_credential_and_retries_bot_only() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/clients/client_sharp/trading-key"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/clients/client_sharp/setup-bot"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"detail": "Bot name already exists"})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/clients/client_sharp/setup-bot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42, "name": "renamed", "account": "client_sharp", "status": "stopped"
        })))
        .mount(&server)
        .await;

    let client = bridge(&server);
    let provisioner = CredentialProvisioner::new(client.clone());
    let lifecycle = BotLifecycleClient::new(client);

    let mut wizard = jupiter_wizard();
    match wizard.confirm("client_sharp", &provisioner, &lifecycle).await {
        Err(SubmitError::BotCreation {
            error,
            orphaned_credential,
        }) => {
            assert_eq!(error, BotError::DuplicateName);
            assert!(orphaned_credential);
        }
        other => panic!("expected bot creation failure, got {:?}", other),
    }
    assert_eq!(wizard.step(), WizardStep::Review);
    assert!(wizard.credentials_provisioned());

    wizard.draft_mut().set_name("renamed");
    let bot = assert_ok!(wizard.confirm("client_sharp", &provisioner, &lifecycle).await);
    assert_eq!(bot.id, "42");
}

#[tokio::test]
async fn test_credential_failure_returns_to_credentials_step() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/exchanges/credentials"))
        .and(body_partial_json(json!({"exchange": "bitmart", "account": "client_sharp"})))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Invalid API key"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/clients/client_sharp/setup-bot"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = bridge(&server);
    let provisioner = CredentialProvisioner::new(client.clone());
    let lifecycle = BotLifecycleClient::new(client);

    let mut wizard = BotWizard::new();
    wizard.draft_mut().set_strategy(StrategyKind::Volume).unwrap();
    wizard.advance().unwrap();
    wizard.draft_mut().set_exchange("bitmart").unwrap();
    wizard.advance().unwrap();
    wizard
        .draft_mut()
        .set_api_credentials(ApiCredentialInput::new("key", "secret").with_memo("memo"))
        .unwrap();
    wizard.advance().unwrap();
    wizard.draft_mut().set_pair("SOL", "USDT").unwrap();
    wizard.advance().unwrap();

    match wizard.confirm("client_sharp", &provisioner, &lifecycle).await {
        Err(SubmitError::Credential(CredentialError::RemoteRejected(detail))) => {
            assert_eq!(detail, "Invalid API key");
        }
        other => panic!("expected credential rejection, got {:?}", other),
    }
    assert_eq!(wizard.step(), WizardStep::EnterCredentials);
    assert!(wizard.draft().credentials().is_none());
    assert!(!wizard.can_proceed());
    // Market and parameters survive
    assert!(wizard.draft().pair().is_some());
}

#[tokio::test]
async fn test_poller_keeps_last_listing_on_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bots_json()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bots"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let lifecycle = Arc::new(BotLifecycleClient::new(bridge(&server)));
    let poller = BotPoller::spawn(lifecycle, None, Duration::from_millis(50));
    assert!(poller.is_running());
    let mut rx = poller.subscribe();

    let snapshot = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            rx.changed().await.unwrap();
            let snap = rx.borrow_and_update().clone();
            if snap.last_error.is_some() {
                return snap;
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(snapshot.last_error.as_deref(), Some("Bridge rejected request: maintenance"));
    let listing = snapshot.listing.as_ref().unwrap();
    assert_eq!(listing.bots.len(), 3);
    assert_eq!(snapshot.summary().needs_attention, 1);

    poller.shutdown().await;
}

#[tokio::test]
async fn test_poller_stops_on_drop() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let lifecycle = Arc::new(BotLifecycleClient::new(bridge(&server)));
    let poller = BotPoller::spawn(lifecycle, None, Duration::from_millis(20));
    let mut rx = poller.subscribe();
    drop(poller);

    // The sender goes away once the task has exited
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while rx.changed().await.is_ok() {}
    })
    .await;
    assert!(closed.is_ok());
}

#[tokio::test]
async fn test_attach_exchange_credentials_uses_query_and_clears_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bots/b1/add-exchange-credentials"))
        .and(query_param("api_key", "key-1"))
        .and(query_param("api_secret", "secret-1"))
        .and(query_param("passphrase", "pass-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let provisioner = CredentialProvisioner::new(bridge(&server));
    let mut input = ApiCredentialInput::new("key-1", "secret-1").with_passphrase("pass-1");
    assert_ok!(provisioner.attach_exchange_credentials("b1", &mut input).await);
    assert!(input.is_empty());
}

#[tokio::test]
async fn test_list_survives_null_status_and_unreadable_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "1", "name": "sharp-vol", "account": "client_sharp", "status": null},
            {"name": "no-id", "account": "client_sharp", "status": "running"},
            {"id": "3", "name": "sharp-spread", "account": "client_sharp",
             "client_id": "client_sharp", "status": "running"}
        ])))
        .mount(&server)
        .await;

    let lifecycle = BotLifecycleClient::new(bridge(&server));
    let listing = assert_ok!(lifecycle.list(Some("client_sharp")).await);

    assert_eq!(listing.filter_mode, FilterMode::Server);
    let ids: Vec<&str> = listing.bots.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);
    assert_eq!(listing.bots[0].status, BotStatus::Unknown);
    assert_eq!(listing.bots[0].classify(), HealthClass::Unknown);
}

#[tokio::test]
async fn test_create_accepts_id_only_acknowledgement() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/clients/client_sharp/setup-bot"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "bot_id": "b-9"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let wizard = jupiter_wizard();
    let payload = wizard.draft().to_wire_payload().unwrap();
    let lifecycle = BotLifecycleClient::new(bridge(&server));

    let bot = assert_ok!(lifecycle.create("client_sharp", &payload).await);
    assert_eq!(bot.id, "b-9");
    assert_eq!(bot.name, payload.name);
    assert!(bot.belongs_to("client_sharp"));
    assert_eq!(bot.strategy_type.as_deref(), Some("volume"));
    assert_eq!(bot.exchange_id.as_deref(), Some("jupiter"));
    assert_eq!(bot.status, BotStatus::Unknown);
}

#[tokio::test]
async fn test_unreadable_create_response_is_not_an_orphaned_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/clients/client_sharp/trading-key"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/clients/client_sharp/setup-bot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = bridge(&server);
    let provisioner = CredentialProvisioner::new(client.clone());
    let lifecycle = BotLifecycleClient::new(client);

    let mut wizard = jupiter_wizard();
    match wizard.confirm("client_sharp", &provisioner, &lifecycle).await {
        Err(SubmitError::BotCreation {
            error,
            orphaned_credential,
        }) => {
            assert!(matches!(error, BotError::UnexpectedResponse(_)));
            assert!(error.may_have_applied());
            assert!(!orphaned_credential);
        }
        other => panic!("expected bot creation failure, got {:?}", other),
    }
    assert_eq!(wizard.step(), WizardStep::Review);
    assert!(wizard.credentials_provisioned());
}

#[tokio::test]
async fn test_update_sends_name_and_config_and_merges_into_roster() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bots_json()))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/bots/1"))
        .and(body_partial_json(json!({
            "name": "sharp-vol-2",
            "config": {
                "interval_min_seconds": 900,
                "interval_max_seconds": 2700,
                "slippage_bps": 50
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bot": {"id": "1", "name": "sharp-vol-2", "status": "running"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/bots/2"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"detail": "interval too short"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let lifecycle = BotLifecycleClient::new(bridge(&server));
    let mut roster = BotRoster::new();
    roster.reconcile(assert_ok!(lifecycle.list(None).await));

    let mut draft = BotConfigDraft::new();
    draft.set_strategy(StrategyKind::Volume).unwrap();
    draft.set_exchange("jupiter").unwrap();
    draft.set_token_address(USDC_MINT).unwrap();
    draft.set_name("sharp-vol-2");
    for (key, value) in [
        ("dailyVolumeUsd", "5000"),
        ("minTradeUsd", "10"),
        ("maxTradeUsd", "25"),
        ("intervalMin", "15"),
        ("intervalMax", "45"),
        ("slippageBps", "50"),
    ] {
        draft.set_field(key, value).unwrap();
    }
    let payload = draft.to_update_payload().unwrap();

    let updated = lifecycle.update("1", &payload).await;
    assert!(updated.is_ok());
    roster.apply_update(&updated);
    let bot = roster.get("1").unwrap();
    assert_eq!(bot.name, "sharp-vol-2");
    assert!(bot.belongs_to("client_sharp"));
    assert_eq!(bot.config.as_ref().unwrap()["interval_min_seconds"], 900);
    assert!(roster.last_error().is_none());

    let before = roster.bots().to_vec();
    let rejected = lifecycle.update("2", &payload).await;
    assert_eq!(
        rejected,
        Err(BotError::RemoteRejected("interval too short".to_string()))
    );
    roster.apply_update(&rejected);
    assert_eq!(roster.bots(), before.as_slice());
    assert_eq!(
        roster.last_error(),
        Some("Bridge rejected request: interval too short")
    );
}
