// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Fixed Yield CLI
//!
//! Entry point for the `fixed-yield` binary. Parses CLI arguments,
//! initializes logging, loads the state file, runs one vault operation, and
//! saves the result.
//!
//! A typical session:
//!
//! ```text
//! fixed-yield init
//! fixed-yield faucet -u alice 1000
//! fixed-yield approve -u alice 200
//! fixed-yield deposit -u alice 200
//! fixed-yield pending -u alice --advance-days 60
//! fixed-yield claim -u alice
//! ```

mod cli;
mod logging;
mod metrics;
mod state;

use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use clap::Parser;

use fixed_yield_contracts::vault::VaultConfig;
use fixed_yield_protocol::accrual::{interest, Amount, Timestamp};
use fixed_yield_protocol::config::days;
use fixed_yield_protocol::units::{format_rate_bps, format_units, parse_units};

use cli::{ClockArgs, Commands, FixedYieldCli};
use metrics::VaultMetrics;
use state::Deployment;

fn main() -> Result<()> {
    let cli = FixedYieldCli::parse();
    logging::init_logging(&cli.log_level, cli.log_format.into());

    let path = cli.state.as_path();
    match cli.command {
        Commands::Init(args) => init_vault(path, &cli.clock, args),
        Commands::Quote(args) => quote(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
        command => {
            let mut deployment = Deployment::load(path)?;
            let now = resolve_now(&cli.clock, &mut deployment)?;
            run_command(&deployment, command, now)?;
            deployment.save(path)
        }
    }
}

/// Deploys a fresh vault and writes the state file.
fn init_vault(path: &std::path::Path, clock: &ClockArgs, args: cli::InitArgs) -> Result<()> {
    if path.exists() && !args.force {
        bail!("{} already exists (pass --force to overwrite)", path.display());
    }

    let mut config = VaultConfig::new(args.kind.into(), args.admin).with_rate(args.rate_bps);
    config.asset_decimals = args.decimals;
    if let Some(symbol) = args.symbol {
        config.asset_symbol = symbol;
    }

    let genesis = match clock.at {
        Some(at) => at,
        None => wall_clock()?,
    };
    let mut deployment = Deployment::deploy(config, genesis, !args.no_minter)?;
    deployment.clock_offset_secs = days(clock.advance_days);
    deployment.save(path)?;

    let vault = &deployment.vault;
    tracing::info!(path = %path.display(), vault = %vault.address(), "vault initialized");

    println!("Vault deployed.");
    println!("  State file : {}", path.display());
    println!("  Vault      : {} ({})", vault.address(), vault.kind());
    println!("  Admin      : {}", vault.config().admin);
    println!("  Underlying : {}", deployment.underlying.symbol());
    println!(
        "  Reward     : {} ({})",
        deployment.reward.name(),
        deployment.reward.symbol()
    );
    println!("  Rate       : {}", format_rate_bps(vault.annual_rate_bps()));
    println!("  Genesis    : {}", describe_time(genesis));
    println!(
        "  Minter     : {}",
        if deployment.reward.is_minter(vault.address()) {
            "authorized"
        } else {
            "NOT authorized (run `fixed-yield set-minter`)"
        }
    );
    Ok(())
}

/// Runs one state-changing or read-only command against a loaded deployment.
fn run_command(deployment: &Deployment, command: Commands, now: Timestamp) -> Result<()> {
    let vault = &deployment.vault;
    let underlying = &deployment.underlying;
    let reward = &deployment.reward;
    let decimals = underlying.decimals();
    let parse = |s: &str| -> Result<Amount> {
        parse_units(s, decimals).with_context(|| format!("invalid amount '{s}'"))
    };

    match command {
        Commands::Faucet(args) => {
            let amount = parse(&args.amount)?;
            underlying.mint(&args.user.user, amount)?;
            println!(
                "Minted {} {} to {}",
                format_units(amount, decimals),
                underlying.symbol(),
                args.user.user
            );
        }
        Commands::Approve(args) => {
            let amount = parse(&args.amount)?;
            underlying.approve(&args.user.user, vault.address(), amount);
            println!(
                "{} approved {} {} for {}",
                args.user.user,
                format_units(amount, decimals),
                underlying.symbol(),
                vault.address()
            );
        }
        Commands::Deposit(args) => {
            let amount = parse(&args.amount)?;
            vault.deposit(&args.user.user, amount, now)?;
            println!(
                "Deposited {} {} for {}",
                format_units(amount, decimals),
                underlying.symbol(),
                args.user.user
            );
        }
        Commands::Withdraw(args) => {
            let amount = parse(&args.amount)?;
            vault.withdraw(&args.user.user, amount, now)?;
            println!(
                "Withdrawn {} {} to {}",
                format_units(amount, decimals),
                underlying.symbol(),
                args.user.user
            );
        }
        Commands::Redeem(args) => {
            let amount = vault.redeem(&args.user, now)?;
            println!(
                "Redeemed {} {} to {}",
                format_units(amount, decimals),
                underlying.symbol(),
                args.user
            );
        }
        Commands::Claim(args) => {
            let amount = vault.claim(&args.user, now)?;
            println!(
                "Claimed {} {} for {}",
                format_units(amount, reward.decimals()),
                reward.symbol(),
                args.user
            );
        }
        Commands::SetRate(args) => {
            let caller = args.caller.unwrap_or_else(|| vault.config().admin.clone());
            let previous = vault.annual_rate_bps();
            vault.set_annual_rate_bps(&caller, args.rate_bps, now)?;
            println!(
                "Annual rate {} -> {} from {}",
                format_rate_bps(previous),
                format_rate_bps(args.rate_bps),
                describe_time(now)
            );
        }
        Commands::SetMinter(args) => {
            let caller = args.caller.unwrap_or_else(|| reward.owner().to_string());
            let minter = args.minter.unwrap_or_else(|| vault.address().to_string());
            reward.set_minter(&caller, &minter, !args.revoke)?;
            println!(
                "{} {} as {} minter",
                if args.revoke { "Revoked" } else { "Authorized" },
                minter,
                reward.symbol()
            );
        }
        Commands::Pending(args) => {
            let pending = vault.pending_reward(&args.user, now)?;
            println!("User       : {}", args.user);
            println!(
                "Principal  : {} {}",
                format_units(vault.principal_of(&args.user), decimals),
                underlying.symbol()
            );
            println!("Pending    : {} {}", format_units(pending, reward.decimals()), reward.symbol());
            println!(
                "Claimed    : {} {}",
                format_units(reward.balance_of(&args.user), reward.decimals()),
                reward.symbol()
            );
            println!("As of      : {}", describe_time(now));
        }
        Commands::Status(args) => {
            if args.metrics {
                let metrics = VaultMetrics::new()?;
                metrics.observe(deployment)?;
                print!("{}", metrics.encode()?);
            } else {
                print_status(deployment, now)?;
            }
        }
        other @ (Commands::Init(_) | Commands::Quote(_) | Commands::Version) => {
            bail!("{other:?} does not run against a loaded state file")
        }
    }
    Ok(())
}

/// Human-readable vault summary.
fn print_status(deployment: &Deployment, now: Timestamp) -> Result<()> {
    let vault = &deployment.vault;
    let ledger = vault.ledger();
    let decimals = deployment.underlying.decimals();
    let reward = &deployment.reward;

    println!("Vault        : {} ({})", vault.address(), vault.kind());
    println!("Admin        : {}", vault.config().admin);
    println!("Annual rate  : {}", format_rate_bps(vault.annual_rate_bps()));
    println!(
        "Total assets : {} {}",
        format_units(vault.total_assets()?, decimals),
        deployment.underlying.symbol()
    );
    println!("Accounts     : {}", ledger.accounts_len());
    println!(
        "Unclaimed    : {} {} (settled)",
        format_units(ledger.total_unclaimed()?, reward.decimals()),
        reward.symbol()
    );
    println!(
        "Reward supply: {} {}",
        format_units(reward.total_supply(), reward.decimals()),
        reward.symbol()
    );
    println!(
        "Minter       : {}",
        if reward.is_minter(vault.address()) { "authorized" } else { "not authorized" }
    );
    println!("Rate epochs  :");
    for epoch in ledger.epochs() {
        println!(
            "  {}  {}",
            describe_time(epoch.start_time),
            format_rate_bps(epoch.annual_rate_bps)
        );
    }
    println!("Clock        : {}", describe_time(now));
    Ok(())
}

/// Prints simple interest for a principal, rate, and period.
fn quote(args: cli::QuoteArgs) -> Result<()> {
    let principal = parse_units(&args.principal, args.decimals)
        .with_context(|| format!("invalid principal '{}'", args.principal))?;
    let earned = interest(principal, args.rate_bps, days(args.days))?;
    println!(
        "{} at {} for {} days earns {}",
        format_units(principal, args.decimals),
        format_rate_bps(args.rate_bps),
        args.days,
        format_units(earned, args.decimals)
    );
    Ok(())
}

/// The timestamp this invocation runs at.
///
/// `--at` wins outright and leaves the saved offset alone. Otherwise it is
/// the wall clock plus the saved offset, and `--advance-days` grows that
/// offset for good, the way a local chain's time only ever moves forward.
fn resolve_now(clock: &ClockArgs, deployment: &mut Deployment) -> Result<Timestamp> {
    if let Some(at) = clock.at {
        if clock.advance_days > 0 {
            tracing::warn!(at, advance_days = clock.advance_days, "--advance-days ignored with --at");
        }
        return Ok(at);
    }
    deployment.clock_offset_secs = deployment
        .clock_offset_secs
        .checked_add(days(clock.advance_days))
        .context("clock offset overflow")?;
    wall_clock()?
        .checked_add(deployment.clock_offset_secs)
        .context("clock overflow")
}

fn wall_clock() -> Result<Timestamp> {
    Timestamp::try_from(Utc::now().timestamp()).context("system clock is before 1970")
}

fn describe_time(ts: Timestamp) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Prints version information to stdout.
fn print_version() {
    println!("fixed-yield {}", env!("CARGO_PKG_VERSION"));
    println!("rustc       {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
