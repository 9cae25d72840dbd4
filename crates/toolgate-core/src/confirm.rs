//! Single-use confirmation tokens for irreversible tools.
//!
//! The ledger is the only place tokens are issued and consumed. Consumption
//! happens under one mutex, so under concurrent presentation of the same
//! token exactly one caller observes success.
//!
//! The first presentation of a live token by its own principal burns it,
//! whatever the outcome: a mismatched tool or argument hash, or an expired
//! token, still invalidates it.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use toolgate_contracts::{
    confirm::{ConfirmationToken, TokenId},
    error::{GateError, GateResult},
    principal::PrincipalId,
};

struct TokenState {
    token: ConfirmationToken,
    consumed: bool,
}

/// Issues and consumes confirmation tokens.
pub struct ConfirmationLedger {
    ttl: Duration,
    tokens: Mutex<HashMap<TokenId, TokenState>>,
}

impl ConfirmationLedger {
    /// Tokens expire `ttl` after issuance.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token bound to `principal`, `tool_name`, and `args_hash`.
    pub fn issue(
        &self,
        principal: &PrincipalId,
        tool_name: &str,
        args_hash: &str,
        now: DateTime<Utc>,
    ) -> GateResult<ConfirmationToken> {
        let token = ConfirmationToken {
            token_id: TokenId::new(),
            principal: principal.clone(),
            tool_name: tool_name.to_string(),
            args_hash: args_hash.to_string(),
            issued_at: now,
            expires_at: now + self.ttl,
        };

        let mut tokens = self.lock()?;
        // Entries stay one extra TTL past expiry so late presentations are
        // still recognised as expired rather than unknown.
        let horizon = now - self.ttl;
        tokens.retain(|_, state| state.token.expires_at > horizon);
        tokens.insert(
            token.token_id,
            TokenState {
                token: token.clone(),
                consumed: false,
            },
        );

        info!(
            principal = %principal,
            tool = %tool_name,
            token = %token.token_id,
            expires_at = %token.expires_at,
            "confirmation token issued"
        );
        Ok(token)
    }

    /// Consume `token_id` for a call to `tool_name` with `args_hash`.
    ///
    /// - unknown, already consumed, or bound to another call → `ConfirmationInvalid`
    /// - expired → `ConfirmationRequired` (ask the user again)
    pub fn consume(
        &self,
        token_id: TokenId,
        principal: &PrincipalId,
        tool_name: &str,
        args_hash: &str,
        now: DateTime<Utc>,
    ) -> GateResult<()> {
        let mut tokens = self.lock()?;

        let Some(state) = tokens.get_mut(&token_id) else {
            warn!(token = %token_id, "unknown confirmation token presented");
            return Err(GateError::ConfirmationInvalid {
                reason: format!("token {token_id} is unknown"),
            });
        };

        if state.consumed {
            warn!(token = %token_id, principal = %principal, "consumed confirmation token reused");
            return Err(GateError::ConfirmationInvalid {
                reason: format!("token {token_id} has already been used"),
            });
        }

        // Another principal cannot burn someone else's token.
        if state.token.principal != *principal {
            warn!(
                token = %token_id,
                principal = %principal,
                "confirmation token presented by a different principal"
            );
            return Err(GateError::ConfirmationInvalid {
                reason: format!("token {token_id} was not issued to '{principal}'"),
            });
        }

        state.consumed = true;

        if state.token.is_expired(now) {
            debug!(token = %token_id, expired_at = %state.token.expires_at, "expired token burned");
            return Err(GateError::ConfirmationRequired {
                tool: tool_name.to_string(),
                reason: format!("token {token_id} expired at {}", state.token.expires_at),
            });
        }

        if state.token.tool_name != tool_name {
            return Err(GateError::ConfirmationInvalid {
                reason: format!(
                    "token {token_id} was issued for '{}', not '{tool_name}'",
                    state.token.tool_name
                ),
            });
        }

        if state.token.args_hash != args_hash {
            return Err(GateError::ConfirmationInvalid {
                reason: format!("token {token_id} was issued for different arguments"),
            });
        }

        debug!(token = %token_id, tool = %tool_name, "confirmation token consumed");
        Ok(())
    }

    /// Number of tokens currently tracked, consumed or not.
    pub fn tracked(&self) -> usize {
        self.tokens.lock().map(|t| t.len()).unwrap_or(0)
    }

    fn lock(&self) -> GateResult<std::sync::MutexGuard<'_, HashMap<TokenId, TokenState>>> {
        self.tokens.lock().map_err(|e| GateError::StorageError {
            reason: format!("confirmation ledger lock poisoned: {e}"),
        })
    }
}
