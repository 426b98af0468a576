//! # Vault State File
//!
//! The CLI is stateless between invocations; everything it knows lives in
//! one JSON file: the reward token, the underlying asset book, the vault
//! snapshot, and the simulated clock offset.
//!
//! Writes go to a sibling temp file first and are renamed into place, so an
//! interrupted command never leaves a half-written state file behind.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use fixed_yield_contracts::asset::AssetBook;
use fixed_yield_contracts::custody::{AssetCustody, NativeCustody, TokenCustody};
use fixed_yield_contracts::reward_token::RewardToken;
use fixed_yield_contracts::vault::{VaultConfig, VaultController, VaultKind, VaultSnapshot};
use fixed_yield_protocol::accrual::Timestamp;

/// Current state file layout version.
pub const STATE_VERSION: u32 = 1;

/// The vault type the CLI works with: custody picked at runtime by kind.
pub type Vault = VaultController<Arc<dyn AssetCustody>, Arc<RewardToken>>;

/// On-disk layout.
#[derive(Deserialize)]
struct StateFile {
    version: u32,
    clock_offset_secs: u64,
    reward: RewardToken,
    underlying: AssetBook,
    vault: VaultSnapshot,
}

/// Borrowed view of [`StateFile`] for writing.
#[derive(Serialize)]
struct StateFileRef<'a> {
    version: u32,
    clock_offset_secs: u64,
    reward: &'a RewardToken,
    underlying: &'a AssetBook,
    vault: VaultSnapshot,
}

/// Everything one state file holds, wired together and ready to use.
pub struct Deployment {
    /// The reward token. The vault mints through the same handle.
    pub reward: Arc<RewardToken>,
    /// The underlying asset (ERC20 balances or native coin balances).
    pub underlying: Arc<AssetBook>,
    /// The vault.
    pub vault: Vault,
    /// Seconds added to the wall clock by earlier `--advance-days` runs.
    pub clock_offset_secs: u64,
}

impl Deployment {
    /// Deploys a fresh reward token, asset book, and vault at `genesis`.
    ///
    /// The vault admin also owns the reward token. With `authorize_minter`
    /// the vault is put on the minter list straight away.
    pub fn deploy(config: VaultConfig, genesis: Timestamp, authorize_minter: bool) -> Result<Self> {
        let reward = Arc::new(RewardToken::with_defaults(config.admin.clone()));
        let underlying = Arc::new(AssetBook::new(config.asset_symbol.clone(), config.asset_decimals));
        let admin = config.admin.clone();
        let custody = custody_for(config.kind, Arc::clone(&underlying));
        let vault = VaultController::new(config, genesis, custody, Arc::clone(&reward));

        if authorize_minter {
            reward
                .set_minter(&admin, vault.address(), true)
                .context("failed to authorize vault as reward minter")?;
        }

        Ok(Self {
            reward,
            underlying,
            vault,
            clock_offset_secs: 0,
        })
    }

    /// Reads and rewires a deployment from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| {
            format!(
                "failed to read state file {} (run `fixed-yield init` first)",
                path.display()
            )
        })?;
        let file: StateFile =
            serde_json::from_str(&raw).with_context(|| format!("failed to parse state file {}", path.display()))?;
        if file.version != STATE_VERSION {
            bail!(
                "state file {} has version {}, expected {}",
                path.display(),
                file.version,
                STATE_VERSION
            );
        }

        let reward = Arc::new(file.reward);
        let underlying = Arc::new(file.underlying);
        let custody = custody_for(file.vault.config.kind, Arc::clone(&underlying));
        let vault = VaultController::restore(file.vault, custody, Arc::clone(&reward))
            .with_context(|| format!("invalid vault state in {}", path.display()))?;

        tracing::debug!(path = %path.display(), vault = %vault.address(), "state loaded");
        Ok(Self {
            reward,
            underlying,
            vault,
            clock_offset_secs: file.clock_offset_secs,
        })
    }

    /// Writes the deployment to `path` atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = StateFileRef {
            version: STATE_VERSION,
            clock_offset_secs: self.clock_offset_secs,
            reward: &self.reward,
            underlying: &self.underlying,
            vault: self.vault.snapshot(),
        };
        let json = serde_json::to_string_pretty(&file).context("failed to serialize state")?;

        let tmp = temp_path(path);
        fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("failed to move {} into place", tmp.display()))?;
        tracing::debug!(path = %path.display(), "state saved");
        Ok(())
    }
}

/// Picks the custody adapter for a vault kind.
fn custody_for(kind: VaultKind, book: Arc<AssetBook>) -> Arc<dyn AssetCustody> {
    match kind {
        VaultKind::Erc4626 => Arc::new(TokenCustody::new(book)),
        VaultKind::Native => Arc::new(NativeCustody::new(book)),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
