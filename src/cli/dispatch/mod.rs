use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::gateway::Currency;
use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;

fn required_string(matches: &ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .map(|s: &String| s.to_string())
        .ok_or_else(|| anyhow!("missing required argument: {name}"))
}

/// Map parsed arguments to globals and an action.
///
/// # Errors
/// Returns an error when a required argument is missing or malformed.
pub fn handler(matches: &ArgMatches) -> Result<(GlobalArgs, Action)> {
    let globals = GlobalArgs::new(required_string(matches, "api-url")?);

    let action = match matches.subcommand() {
        Some(("signup", sub)) => Action::Signup {
            email: required_string(sub, "email")?,
            referral: sub
                .get_one::<String>("referral")
                .map(|s: &String| s.to_string()),
        },
        Some(("login", sub)) => Action::Login {
            email: required_string(sub, "email")?,
        },
        Some(("send", sub)) => Action::Send {
            email: required_string(sub, "email")?,
            recipient: required_string(sub, "recipient")?,
            currency: required_string(sub, "currency")?
                .parse::<Currency>()
                .map_err(|err| anyhow!(err))?,
            amount: sub
                .get_one::<f64>("amount")
                .copied()
                .context("missing required argument: amount")?,
        },
        Some(("change-password", sub)) => Action::ChangePassword {
            email: required_string(sub, "email")?,
        },
        _ => return Err(anyhow!("missing subcommand")),
    };

    Ok((globals, action))
}
