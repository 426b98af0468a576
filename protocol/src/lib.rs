// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Fixed Yield — Core Library
//!
//! The accounting engine behind fixed-rate yield vaults: depositors park an
//! asset, and while it sits there it earns a second asset at a fixed annual
//! rate that an administrator may change over time.
//!
//! ## Architecture
//!
//! - **accrual** — The ledger. Per-account checkpoints, the rate epoch log,
//!   linear interest, settlement. Pure and deterministic; no I/O.
//! - **units** — Decimal string <-> base unit conversion for humans.
//! - **config** — Protocol constants.
//!
//! Custody of the underlying asset and minting of the reward asset are not
//! here; they live with the vaults in `fixed-yield-contracts`.
//!
//! ## Design Philosophy
//!
//! 1. Correctness over performance (settlement is still logarithmic).
//! 2. No floating point anywhere near money.
//! 3. If it touches money, it has tests. Plural.

pub mod accrual;
pub mod config;
pub mod units;
