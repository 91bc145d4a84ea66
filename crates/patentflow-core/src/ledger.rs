//! Credit ledger: balance reads and atomic deduct-with-audit-log.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// One append-only audit entry recorded alongside every deduction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub amount: i64,
    pub reason: String,
    pub job_reference: String,
    pub timestamp: DateTime<Utc>,
}

/// A deduction request. The idempotency key makes a retried deduction safe
/// to repeat: replaying a key returns the original receipt without a second
/// charge.
#[derive(Debug, Clone)]
pub struct DeductRequest {
    pub account: String,
    pub amount: i64,
    pub reason: String,
    pub job_reference: String,
    pub idempotency_key: String,
}

/// Receipt returned by a successful (or replayed) deduction.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Receipt {
    pub new_balance: i64,
}

/// Balance read plus atomic deduct-with-log. The balance check, decrement
/// and audit append happen as one unit: either all three or none.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    async fn balance(&self, account: &str) -> Result<i64, PipelineError>;

    async fn deduct(&self, req: DeductRequest) -> Result<Receipt, PipelineError>;
}

// ── In-memory reference implementation ───────────────────────────────────

#[derive(Debug, Default)]
struct AccountState {
    balance: i64,
    entries: Vec<LedgerEntry>,
    /// idempotency key → balance after that deduction was first applied.
    applied: HashMap<String, i64>,
}

/// Mutex-guarded in-memory ledger. The lock held across check + decrement +
/// append is what makes the deduction atomic.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    accounts: Mutex<HashMap<String, AccountState>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account with an opening balance (test and bootstrap helper).
    pub fn credit(&self, account: &str, amount: i64) {
        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        accounts.entry(account.to_string()).or_default().balance += amount;
    }

    /// Snapshot of an account's audit log.
    pub fn entries(&self, account: &str) -> Vec<LedgerEntry> {
        let accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        accounts
            .get(account)
            .map(|a| a.entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CreditLedger for MemoryLedger {
    async fn balance(&self, account: &str) -> Result<i64, PipelineError> {
        let accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        Ok(accounts.get(account).map(|a| a.balance).unwrap_or(0))
    }

    async fn deduct(&self, req: DeductRequest) -> Result<Receipt, PipelineError> {
        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        let state = accounts.entry(req.account.clone()).or_default();

        if let Some(&new_balance) = state.applied.get(&req.idempotency_key) {
            tracing::info!(
                account = %req.account,
                key = %req.idempotency_key,
                "deduction replayed, returning original receipt"
            );
            return Ok(Receipt { new_balance });
        }

        if req.amount > state.balance {
            return Err(PipelineError::InsufficientCredits {
                required: req.amount,
                available: state.balance,
            });
        }

        state.balance -= req.amount;
        state.entries.push(LedgerEntry {
            amount: req.amount,
            reason: req.reason,
            job_reference: req.job_reference,
            timestamp: Utc::now(),
        });
        state
            .applied
            .insert(req.idempotency_key, state.balance);

        Ok(Receipt {
            new_balance: state.balance,
        })
    }
}
