use std::{env, fmt::Display, str::FromStr};

use log::*;

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let Some(value) = value else {
        return default;
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Reads and parses the environment variable `name`. If it is missing or cannot be parsed, the reason is logged and
/// `default` is returned instead.
pub fn env_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ Invalid configuration value for {name} ({s}). {e}. Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            info!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
    }
}
