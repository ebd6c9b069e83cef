use std::env;

const HELP: &str = include_str!("./cli-help.txt");

/// The environment variables the server reads. Values of `secret` variables are never echoed.
const CONFIG_VARS: [(&str, bool); 15] = [
    ("RUST_LOG", false),
    ("SM_HOST", false),
    ("SM_PORT", false),
    ("SM_DATABASE_URL", false),
    ("SM_DB_MAX_CONNECTIONS", false),
    ("SM_RECONCILE_INTERVAL_MS", false),
    ("SM_TOKENS_PER_MAJOR_UNIT", false),
    ("SM_PAYMENT_CURRENCY", false),
    ("SM_PAYMENT_DESCRIPTION", false),
    ("SM_GATEWAY_URL", false),
    ("SM_GATEWAY_ACCOUNT_ID", false),
    ("SM_GATEWAY_SECRET_KEY", true),
    ("SM_GATEWAY_TEST_MODE", false),
    ("SM_STORAGE_PUBLIC_URL", false),
    ("SM_STORAGE_BUCKET", false),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliCommand {
    Run,
    Version,
    Help,
}

impl CliCommand {
    /// Everything after the program name. The server is configured from the environment, so any argument other than
    /// a version flag asks for help.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Self {
        let mut args = args.into_iter();
        match (args.next().as_deref(), args.next()) {
            (None, _) => CliCommand::Run,
            (Some("-V" | "--version"), None) => CliCommand::Version,
            _ => CliCommand::Help,
        }
    }
}

/// Handles the command line. Returns `true` if the server should not start.
pub fn handle_command_line_args() -> bool {
    match CliCommand::from_args(env::args().skip(1)) {
        CliCommand::Run => false,
        CliCommand::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            true
        },
        CliCommand::Help => {
            println!("\n{HELP}\n");
            println!("Current configuration:");
            for (name, shown) in config_report(|name| env::var(name).ok()) {
                println!("  {name:<26} {shown}");
            }
            true
        },
    }
}

/// Pairs every configuration variable with the text to display for it.
fn config_report<F: Fn(&str) -> Option<String>>(lookup: F) -> Vec<(&'static str, String)> {
    CONFIG_VARS
        .iter()
        .map(|&(name, secret)| {
            let shown = match (lookup(name), secret) {
                (None, _) => "(not set)".to_string(),
                (Some(_), true) => "(set, hidden)".to_string(),
                (Some(value), false) => value,
            };
            (name, shown)
        })
        .collect()
}
