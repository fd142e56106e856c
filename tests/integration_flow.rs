//! End-to-end flow tests against a mock backend: staging, one-time-code
//! dispatch and validation, and session lifecycle.

use anyhow::{Result, anyhow};
use mintfiat::gateway::{Currency, Gateway};
use mintfiat::session::SessionStore;
use mintfiat::stepup::{FlowError, StepUpFlow, StepUpState};
use secrecy::SecretString;
use serde_json::json;
use std::net::TcpListener;
use std::sync::Arc;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn store_for(server: &MockServer) -> Result<(Arc<Gateway>, SessionStore)> {
    let gateway = Arc::new(Gateway::new(&server.uri()).map_err(|err| anyhow!(err.to_string()))?);
    let store = SessionStore::new(Arc::clone(&gateway));
    Ok((gateway, store))
}

fn me_body(usd: f64) -> serde_json::Value {
    json!({
        "userId": "u-1",
        "email": "alice@example.com",
        "emailVerified": true,
        "balances": {"USD": usd, "EUR": 0.0, "GBP": 0.0}
    })
}

/// Transfer scenario: a 50 USD transfer against a 30 USD cached
/// balance is rejected locally with no dispatch; a 20 USD transfer dispatches,
/// the code finalizes it, and the session is refreshed exactly once.
#[tokio::test]
async fn transfer_scenario_end_to_end() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    // Initial rehydration plus exactly one refresh after finalization.
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(me_body(30.0)))
        .expect(2)
        .mount(&server)
        .await;

    // Only the valid 20 USD staging may reach the backend.
    Mock::given(method("POST"))
        .and(path("/users/assets/send/fiat"))
        .and(body_json(json!({
            "receiverId": "acct-9",
            "currency": "USD",
            "amount": 20.0
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accepted": true,
            "dispatchStatus": "sent"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/verify-otp/transaction"))
        .and(body_json(json!({
            "email": "alice@example.com",
            "otp": "123456"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (gateway, store) = store_for(&server)?;
    let session = store
        .check_auth()
        .await
        .ok_or_else(|| anyhow!("expected session"))?;
    assert_eq!(session.balances.get(Currency::Usd), 30.0);

    // 50 USD against a 30 USD balance: rejected locally, nothing dispatched.
    let rejected = StepUpFlow::stage_transfer(&session, "acct-9", Currency::Usd, 50.0);
    match rejected {
        Err(FlowError::Validation(message)) => {
            assert_eq!(message, "Quantity exceeds available balance");
        }
        other => panic!("expected local rejection, got {other:?}"),
    }

    // 20 USD within balance: dispatch, enter the code, finalize.
    let mut flow = StepUpFlow::stage_transfer(&session, "acct-9", Currency::Usd, 20.0)
        .map_err(|err| anyhow!(err.to_string()))?;
    flow.dispatch(&gateway)
        .await
        .map_err(|err| anyhow!(err.to_string()))?;
    assert_eq!(flow.state(), StepUpState::AwaitingCode);

    for digit in "123456".chars() {
        flow.enter_digit(digit);
    }
    flow.submit_code(&gateway, &store)
        .await
        .map_err(|err| anyhow!(err.to_string()))?;
    assert_eq!(flow.state(), StepUpState::Completed);
    assert!(store.is_authenticated().await);

    // Mock expectations verify the refresh count on drop.
    Ok(())
}

/// Registration: signup dispatches the code, a valid code verifies the email
/// and completes registration with password and referral id.
#[tokio::test]
async fn registration_end_to_end() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/signup"))
        .and(body_json(json!({"email": "bob@example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accepted": true,
            "dispatchStatus": "sent"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/verify-otp/verify-email"))
        .and(body_json(json!({
            "email": "bob@example.com",
            "otp": "654321"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/complete-registration"))
        .and(body_json(json!({
            "email": "bob@example.com",
            "password": "Abcdefghi1",
            "referralId": "ref-1"
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let (gateway, store) = store_for(&server)?;
    let password = SecretString::from("Abcdefghi1".to_string());
    let confirm = SecretString::from("Abcdefghi1".to_string());
    let mut flow = StepUpFlow::stage_registration(
        " Bob@Example.COM ",
        password,
        &confirm,
        Some("ref-1".to_string()),
    )
    .map_err(|err| anyhow!(err.to_string()))?;

    flow.dispatch(&gateway)
        .await
        .map_err(|err| anyhow!(err.to_string()))?;
    for digit in "654321".chars() {
        flow.enter_digit(digit);
    }
    flow.submit_code(&gateway, &store)
        .await
        .map_err(|err| anyhow!(err.to_string()))?;
    assert_eq!(flow.state(), StepUpState::Completed);
    Ok(())
}

/// Password change: a rejected old password surfaces the backend message and
/// keeps the staged payload; resubmission then succeeds.
#[tokio::test]
async fn password_change_dispatch_retry() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(me_body(0.0)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/update-password"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Old password is incorrect"})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/update-password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accepted": true,
            "dispatchStatus": "sent"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/verify-otp/transaction"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let (gateway, store) = store_for(&server)?;
    let session = store
        .check_auth()
        .await
        .ok_or_else(|| anyhow!("expected session"))?;

    let mut flow = StepUpFlow::stage_password_change(
        &session,
        SecretString::from("WrongOld12".to_string()),
        SecretString::from("Abcdefghi1".to_string()),
        &SecretString::from("Abcdefghi1".to_string()),
    )
    .map_err(|err| anyhow!(err.to_string()))?;

    let err = flow
        .dispatch(&gateway)
        .await
        .err()
        .ok_or_else(|| anyhow!("expected rejection"))?;
    assert!(matches!(err, FlowError::Gateway(_)));
    assert_eq!(flow.state(), StepUpState::Failed);
    assert_eq!(flow.last_error(), Some("Old password is incorrect"));

    flow.dispatch(&gateway)
        .await
        .map_err(|err| anyhow!(err.to_string()))?;
    for digit in "123456".chars() {
        flow.enter_digit(digit);
    }
    flow.submit_code(&gateway, &store)
        .await
        .map_err(|err| anyhow!(err.to_string()))?;
    assert_eq!(flow.state(), StepUpState::Completed);
    Ok(())
}

/// Logout is fail-open and idempotent: local state clears regardless of the
/// gateway response.
#[tokio::test]
async fn logout_is_fail_open_and_idempotent() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(me_body(30.0)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (_gateway, store) = store_for(&server)?;
    store.check_auth().await;
    assert!(store.is_authenticated().await);

    store.logout().await;
    assert!(!store.is_authenticated().await);
    store.logout().await;
    assert!(!store.is_authenticated().await);
    Ok(())
}
