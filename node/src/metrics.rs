//! # Prometheus Metrics
//!
//! Gauges describing a vault at one instant: how many depositors, how much
//! principal, how much reward realized and minted, what rate is in force.
//! `fixed-yield status --metrics` renders them in the text exposition format
//! for a node-exporter textfile collector.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] with a
//! `fixed_yield` prefix so they do not collide with the default registry.
//!
//! Amounts are exported in whole tokens as floats. The exact base-unit
//! values stay in the state file; this is for dashboards.

use prometheus::{Encoder, Gauge, IntGauge, Registry, TextEncoder};

use fixed_yield_protocol::accrual::Amount;

use crate::state::Deployment;

/// Holds all Prometheus metric handles for a vault.
#[derive(Clone)]
pub struct VaultMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Accounts the ledger is tracking.
    pub accounts: IntGauge,
    /// Retained rate epochs.
    pub rate_epochs: IntGauge,
    /// Annual rate currently in force, in basis points.
    pub annual_rate_bps: IntGauge,
    /// Sum of all principal, in underlying tokens.
    pub total_principal: Gauge,
    /// Realized but unclaimed interest, in reward tokens.
    pub total_unclaimed: Gauge,
    /// Reward tokens minted so far.
    pub reward_supply: Gauge,
}

impl VaultMetrics {
    /// Creates and registers all metrics.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("fixed_yield".into()), None)?;

        let accounts = IntGauge::new("accounts", "Number of accounts tracked by the vault ledger")?;
        registry.register(Box::new(accounts.clone()))?;

        let rate_epochs = IntGauge::new("rate_epochs", "Number of retained rate epochs")?;
        registry.register(Box::new(rate_epochs.clone()))?;

        let annual_rate_bps = IntGauge::new("annual_rate_bps", "Annual rate in force, in basis points")?;
        registry.register(Box::new(annual_rate_bps.clone()))?;

        let total_principal = Gauge::new("total_principal_tokens", "Total principal held by the vault")?;
        registry.register(Box::new(total_principal.clone()))?;

        let total_unclaimed = Gauge::new(
            "total_unclaimed_tokens",
            "Realized interest not yet claimed (excludes unsettled time)",
        )?;
        registry.register(Box::new(total_unclaimed.clone()))?;

        let reward_supply = Gauge::new("reward_supply_tokens", "Total reward tokens minted")?;
        registry.register(Box::new(reward_supply.clone()))?;

        Ok(Self {
            registry,
            accounts,
            rate_epochs,
            annual_rate_bps,
            total_principal,
            total_unclaimed,
            reward_supply,
        })
    }

    /// Sets every gauge from the deployment's current state.
    pub fn observe(&self, deployment: &Deployment) -> anyhow::Result<()> {
        let vault = &deployment.vault;
        let ledger = vault.ledger();
        let decimals = vault.config().asset_decimals;

        self.accounts.set(ledger.accounts_len() as i64);
        self.rate_epochs.set(ledger.epochs().len() as i64);
        self.annual_rate_bps.set(i64::from(vault.annual_rate_bps()));
        self.total_principal.set(to_tokens(vault.total_assets()?, decimals));
        self.total_unclaimed
            .set(to_tokens(ledger.total_unclaimed()?, deployment.reward.decimals()));
        self.reward_supply
            .set(to_tokens(deployment.reward.total_supply(), deployment.reward.decimals()));
        Ok(())
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Lossy conversion of base units to whole tokens, for display only.
fn to_tokens(amount: Amount, decimals: u8) -> f64 {
    amount as f64 / 10f64.powi(i32::from(decimals))
}
