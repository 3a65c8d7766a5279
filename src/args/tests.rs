use super::*;
use super::parsers::parse_duration_arg;
use crate::error::{AppError, AppResult};
use clap::Parser;
use std::time::Duration;

fn parse_test_args<I, T>(args: I) -> AppResult<ServerArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    ServerArgs::try_parse_from(args).map_err(AppError::from)
}

#[test]
fn parse_header_valid() -> AppResult<()> {
    let (key, value) = parse_header("Content-Type: application/json")?;
    if key != "Content-Type" {
        return Err(AppError::validation(format!("Unexpected key: {}", key)));
    }
    if value != "application/json" {
        return Err(AppError::validation(format!("Unexpected value: {}", value)));
    }
    Ok(())
}

#[test]
fn parse_header_keeps_colons_in_value() -> AppResult<()> {
    let (key, value) = parse_header("X-Forwarded-For:10.0.0.1:8080")?;
    if key != "X-Forwarded-For" || value != "10.0.0.1:8080" {
        return Err(AppError::validation(format!(
            "Unexpected header: {}={}",
            key, value
        )));
    }
    Ok(())
}

#[test]
fn parse_header_invalid() -> AppResult<()> {
    if parse_header("MissingDelimiter").is_ok() {
        return Err(AppError::validation("Expected Err for invalid header"));
    }
    if parse_header(": value-only").is_ok() {
        return Err(AppError::validation("Expected Err for empty header name"));
    }
    Ok(())
}

#[test]
fn parse_duration_units() -> AppResult<()> {
    let cases = [
        ("250ms", Duration::from_millis(250)),
        ("7", Duration::from_secs(7)),
        ("3s", Duration::from_secs(3)),
        ("2m", Duration::from_secs(120)),
        ("1h", Duration::from_secs(3600)),
    ];
    for (input, expected) in cases {
        let parsed = parse_duration_arg(input)?;
        if parsed != expected {
            return Err(AppError::validation(format!(
                "Unexpected duration for {}: {:?}",
                input, parsed
            )));
        }
    }
    Ok(())
}

#[test]
fn parse_duration_rejects_zero_and_unknown_unit() -> AppResult<()> {
    if parse_duration_arg("0s").is_ok() {
        return Err(AppError::validation("Expected zero duration to fail"));
    }
    if parse_duration_arg("5d").is_ok() {
        return Err(AppError::validation("Expected unknown unit to fail"));
    }
    if parse_duration_arg("").is_ok() {
        return Err(AppError::validation("Expected empty duration to fail"));
    }
    Ok(())
}

#[test]
fn defaults_are_applied() -> AppResult<()> {
    let args = parse_test_args(["meteor"])?;
    if args.listen != "127.0.0.1:8080" {
        return Err(AppError::validation(format!(
            "Unexpected listen: {}",
            args.listen
        )));
    }
    if !args.slaves.is_empty() {
        return Err(AppError::validation("Expected no slaves by default"));
    }
    if args.sharding != ShardingPolicy::Replicate {
        return Err(AppError::validation("Expected replicate sharding"));
    }
    if args.stats_interval_ms.get() != 1000 {
        return Err(AppError::validation("Unexpected stats interval"));
    }
    if args.request_timeout != Duration::from_secs(10) {
        return Err(AppError::validation("Unexpected request timeout"));
    }
    Ok(())
}

#[test]
fn slaves_are_repeatable_and_comma_separated() -> AppResult<()> {
    let args = parse_test_args([
        "meteor",
        "--slave",
        "10.0.0.1:8080",
        "--slave",
        "10.0.0.2:8080,10.0.0.3:8080",
        "--sharding",
        "DIVIDE",
    ])?;
    if args.slaves != ["10.0.0.1:8080", "10.0.0.2:8080", "10.0.0.3:8080"] {
        return Err(AppError::validation(format!(
            "Unexpected slaves: {:?}",
            args.slaves
        )));
    }
    if args.sharding != ShardingPolicy::Divide {
        return Err(AppError::validation("Expected divide sharding"));
    }
    Ok(())
}

#[test]
fn stats_interval_must_be_positive() -> AppResult<()> {
    if parse_test_args(["meteor", "--stats-interval-ms", "0"]).is_ok() {
        return Err(AppError::validation("Expected zero interval to fail"));
    }
    Ok(())
}

#[test]
fn sharding_policy_from_str() -> AppResult<()> {
    let policy: ShardingPolicy = " Divide ".parse()?;
    if policy != ShardingPolicy::Divide {
        return Err(AppError::validation("Expected divide"));
    }
    if "halve".parse::<ShardingPolicy>().is_ok() {
        return Err(AppError::validation("Expected unknown policy to fail"));
    }
    Ok(())
}
