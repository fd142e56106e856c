//! Interactive execution of CLI actions. The session cookie lives in the
//! process-local cookie store, so every command authenticates within its own
//! invocation; one-time codes are read from stdin when a flow reaches the
//! code-entry stage.

use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::gateway::{Currency, Gateway};
use crate::session::{Session, SessionStore};
use crate::stepup::{StepUpFlow, StepUpState};
use anyhow::{Context, Result, anyhow};
use secrecy::SecretString;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Instant;

// This is the single dispatch point for all CLI actions.
/// Execute the provided action.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(globals: &GlobalArgs, action: Action) -> Result<()> {
    let gateway = Arc::new(Gateway::new(&globals.api_url).map_err(|err| anyhow!("{err}"))?);
    let store = SessionStore::new(Arc::clone(&gateway));

    match action {
        Action::Signup { email, referral } => signup(&gateway, &store, &email, referral).await,
        Action::Login { email } => {
            let session = login(&store, &email).await?;
            print_session(&session);
            Ok(())
        }
        Action::Send {
            email,
            recipient,
            currency,
            amount,
        } => send(&gateway, &store, &email, &recipient, currency, amount).await,
        Action::ChangePassword { email } => change_password(&gateway, &store, &email).await,
    }
}

async fn login(store: &SessionStore, email: &str) -> Result<Session> {
    let password = SecretString::from(prompt("Password: ")?);
    store
        .login(email, &password)
        .await
        .map_err(|err| anyhow!(err.user_message()))
}

async fn signup(
    gateway: &Gateway,
    store: &SessionStore,
    email: &str,
    referral: Option<String>,
) -> Result<()> {
    let password = SecretString::from(prompt("Choose a password: ")?);
    let confirm = SecretString::from(prompt("Confirm password: ")?);
    let mut flow = StepUpFlow::stage_registration(email, password, &confirm, referral)
        .map_err(|err| anyhow!("{err}"))?;
    flow.dispatch(gateway)
        .await
        .map_err(|err| anyhow!("{err}"))?;

    if code_loop(&mut flow, gateway, store).await? {
        println!("Registration complete. You can now sign in.");
    }
    Ok(())
}

async fn send(
    gateway: &Gateway,
    store: &SessionStore,
    email: &str,
    recipient: &str,
    currency: Currency,
    amount: f64,
) -> Result<()> {
    let session = login(store, email).await?;
    let mut flow = StepUpFlow::stage_transfer(&session, recipient, currency, amount)
        .map_err(|err| anyhow!("{err}"))?;
    flow.dispatch(gateway)
        .await
        .map_err(|err| anyhow!("{err}"))?;

    if code_loop(&mut flow, gateway, store).await? {
        println!(
            "Transfer complete. {} balance: {:.2}",
            currency,
            store.cached_balance(currency).await
        );
    }
    store.logout().await;
    Ok(())
}

async fn change_password(gateway: &Gateway, store: &SessionStore, email: &str) -> Result<()> {
    let session = login(store, email).await?;
    let old_password = SecretString::from(prompt("Current password: ")?);
    let new_password = SecretString::from(prompt("New password: ")?);
    let confirm = SecretString::from(prompt("Confirm new password: ")?);
    let mut flow = StepUpFlow::stage_password_change(&session, old_password, new_password, &confirm)
        .map_err(|err| anyhow!("{err}"))?;
    flow.dispatch(gateway)
        .await
        .map_err(|err| anyhow!("{err}"))?;

    if code_loop(&mut flow, gateway, store).await? {
        println!("Password updated.");
    }
    store.logout().await;
    Ok(())
}

/// Drive the code-entry stage until the flow completes or is dismissed.
/// Returns whether the staged action was finalized.
async fn code_loop(
    flow: &mut StepUpFlow,
    gateway: &Gateway,
    store: &SessionStore,
) -> Result<bool> {
    loop {
        match flow.state() {
            StepUpState::Completed => return Ok(true),
            StepUpState::Cancelled => {
                println!("Cancelled.");
                return Ok(false);
            }
            StepUpState::Expired => {
                let again = prompt("Code expired. Request a new one? [y/N]: ")?;
                if again.eq_ignore_ascii_case("y") {
                    if let Err(err) = flow.resend(gateway).await {
                        eprintln!("{err}");
                    }
                } else {
                    flow.cancel();
                }
            }
            StepUpState::AwaitingCode => {
                if let Some(remaining) = flow.remaining_validity(Instant::now()) {
                    println!(
                        "A 6-digit code was sent to your email (valid for {} more minutes).",
                        remaining.as_secs() / 60
                    );
                }
                let line = prompt("Code [r to resend, empty to cancel]: ")?;
                if line.is_empty() {
                    flow.cancel();
                    continue;
                }
                if line.eq_ignore_ascii_case("r") {
                    if let Err(err) = flow.resend(gateway).await {
                        eprintln!("{err}");
                    }
                    continue;
                }
                flow.clear_code();
                for ch in line.chars() {
                    flow.enter_digit(ch);
                }
                if let Err(err) = flow.submit_code(gateway, store).await {
                    eprintln!("{err}");
                }
            }
            StepUpState::AwaitingDispatch | StepUpState::Failed | StepUpState::Validating => {
                return Err(anyhow!("verification flow stalled"));
            }
        }
    }
}

fn print_session(session: &Session) {
    println!("Signed in as {} ({})", session.email, session.user_id);
    println!(
        "Email verified: {}",
        if session.email_verified { "yes" } else { "no" }
    );
    println!("Balances:");
    for currency in [Currency::Usd, Currency::Eur, Currency::Gbp] {
        println!("  {currency}: {:.2}", session.balances.get(currency));
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush().context("failed to flush stdout")?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read input")?;
    Ok(line.trim().to_string())
}
