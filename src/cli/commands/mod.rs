use clap::{
    Arg, ColorChoice, Command,
    builder::{
        ValueParser,
        styling::{AnsiColor, Effects, Styles},
    },
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("mintfiat")
        .about("MintFiat trading platform client")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("api-url")
                .short('a')
                .long("api-url")
                .help("MintFiat API base URL")
                .default_value("https://api.mintfiat.dev")
                .env("MINTFIAT_API_URL")
                .global(true),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("MINTFIAT_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .subcommand(
            Command::new("signup")
                .about("Register a new account (email verification via one-time code)")
                .arg(Arg::new("email").help("Email to register").required(true))
                .arg(
                    Arg::new("referral")
                        .long("referral")
                        .help("Optional referral id"),
                ),
        )
        .subcommand(
            Command::new("login")
                .about("Sign in and show the session profile and balances")
                .arg(Arg::new("email").help("Account email").required(true)),
        )
        .subcommand(
            Command::new("send")
                .about("Send fiat funds to another account (requires a one-time code)")
                .arg(Arg::new("email").help("Account email").required(true))
                .arg(
                    Arg::new("recipient")
                        .help("Receiver account id")
                        .required(true),
                )
                .arg(
                    Arg::new("currency")
                        .help("Currency to send")
                        .required(true)
                        .value_parser(["USD", "EUR", "GBP", "usd", "eur", "gbp"]),
                )
                .arg(
                    Arg::new("amount")
                        .help("Amount to send")
                        .required(true)
                        .value_parser(clap::value_parser!(f64)),
                ),
        )
        .subcommand(
            Command::new("change-password")
                .about("Change the account password (requires a one-time code)")
                .arg(Arg::new("email").help("Account email").required(true)),
        )
}
