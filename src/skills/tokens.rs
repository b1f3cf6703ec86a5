/// Token ledger implementation - tiers, substitution, formatting and parsing
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::ProgressionError;

/// Ordered token tiers. A token of one tier can pay for any requirement of the
/// same or a lower tier, never a higher one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenTier {
    Basic,
    Advanced,
    Master,
}

/// Per-tier token amounts (refund maps, debit breakdowns).
pub type TierAmounts = BTreeMap<TokenTier, u64>;

impl TokenTier {
    /// All tiers, lowest first.
    pub const ALL: [TokenTier; 3] = [TokenTier::Basic, TokenTier::Advanced, TokenTier::Master];

    pub fn level(self) -> u8 {
        match self {
            TokenTier::Basic => 1,
            TokenTier::Advanced => 2,
            TokenTier::Master => 3,
        }
    }

    /// Whether a token of this tier may pay a cost that requires `required`.
    pub fn satisfies(self, required: TokenTier) -> bool {
        self.level() >= required.level()
    }

    pub fn name(self) -> &'static str {
        match self {
            TokenTier::Basic => "basic",
            TokenTier::Advanced => "advanced",
            TokenTier::Master => "master",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            TokenTier::Basic => "B",
            TokenTier::Advanced => "A",
            TokenTier::Master => "M",
        }
    }

    /// Tiers whose tokens may pay for a `self` requirement, lowest first.
    pub fn eligible(self) -> impl Iterator<Item = TokenTier> {
        TokenTier::ALL
            .into_iter()
            .filter(move |tier| tier.satisfies(self))
    }

    /// A map holding an explicit zero for every tier.
    pub fn zeroed() -> TierAmounts {
        TokenTier::ALL.into_iter().map(|tier| (tier, 0)).collect()
    }
}

impl fmt::Display for TokenTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TokenTier {
    type Err = String;

    /// Accepts full names or single-letter symbols, case-insensitive.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let search = input.trim().to_ascii_lowercase();
        TokenTier::ALL
            .into_iter()
            .find(|tier| tier.name() == search || tier.symbol().to_ascii_lowercase() == search)
            .ok_or_else(|| format!("Unknown token tier: '{}'", input.trim()))
    }
}

/// Per-character, per-skill token wallet. Zero balances are not stored so two
/// ledgers with the same balances always compare (and serialize) equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenLedger {
    balances: BTreeMap<TokenTier, u64>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from `(tier, amount)` pairs; repeated tiers accumulate.
    pub fn with_balances<I>(balances: I) -> Self
    where
        I: IntoIterator<Item = (TokenTier, u64)>,
    {
        let mut ledger = Self::new();
        for (tier, amount) in balances {
            ledger.credit(tier, amount);
        }
        ledger
    }

    pub fn balance(&self, tier: TokenTier) -> u64 {
        self.balances.get(&tier).copied().unwrap_or(0)
    }

    /// Balances for every tier, lowest first, zeros included.
    pub fn balances(&self) -> TierAmounts {
        TokenTier::ALL
            .into_iter()
            .map(|tier| (tier, self.balance(tier)))
            .collect()
    }

    /// Sum across all tiers.
    pub fn total(&self) -> u64 {
        self.balances
            .values()
            .fold(0u64, |acc, amount| acc.saturating_add(*amount))
    }

    /// Sum of the tiers that may pay for a `min_tier` requirement.
    pub fn eligible_total(&self, min_tier: TokenTier) -> u64 {
        min_tier
            .eligible()
            .fold(0u64, |acc, tier| acc.saturating_add(self.balance(tier)))
    }

    pub fn credit(&mut self, tier: TokenTier, amount: u64) {
        if amount == 0 {
            return;
        }
        let entry = self.balances.entry(tier).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Credit every tier of `amounts`.
    pub fn credit_all(&mut self, amounts: &TierAmounts) {
        for (tier, amount) in amounts {
            self.credit(*tier, *amount);
        }
    }

    pub fn can_afford(&self, min_tier: TokenTier, amount: u64) -> bool {
        self.eligible_total(min_tier) >= amount
    }

    /// Spend `amount` using only tiers at or above `min_tier`, draining the
    /// lowest eligible tier first. On failure nothing is spent. Returns what was
    /// taken from each tier.
    pub fn debit(
        &mut self,
        min_tier: TokenTier,
        amount: u64,
    ) -> Result<TierAmounts, ProgressionError> {
        let available = self.eligible_total(min_tier);
        if available < amount {
            return Err(ProgressionError::InsufficientTokens {
                tier: min_tier,
                required: amount,
                available,
            });
        }

        let mut remaining = amount;
        let mut spent = TierAmounts::new();
        for tier in min_tier.eligible() {
            if remaining == 0 {
                break;
            }
            let balance = self.balance(tier);
            let take = balance.min(remaining);
            if take == 0 {
                continue;
            }
            self.set_balance(tier, balance - take);
            spent.insert(tier, take);
            remaining -= take;
        }
        Ok(spent)
    }

    fn set_balance(&mut self, tier: TokenTier, amount: u64) {
        if amount == 0 {
            self.balances.remove(&tier);
        } else {
            self.balances.insert(tier, amount);
        }
    }
}

// ============================================================================
// Display Formatting (compact, fits a chat line)
// ============================================================================

/// Format per-tier amounts as e.g. "12B 3A 0M", lowest tier first.
pub fn format_tier_amounts(amounts: &TierAmounts) -> String {
    TokenTier::ALL
        .iter()
        .map(|tier| {
            format!(
                "{}{}",
                amounts.get(tier).copied().unwrap_or(0),
                tier.symbol()
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format a ledger's balances, e.g. "12B 3A 0M".
pub fn format_ledger(ledger: &TokenLedger) -> String {
    format_tier_amounts(&ledger.balances())
}
