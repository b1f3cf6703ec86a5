/// Tests for the tiered token ledger and tier substitution
use skilltree::skills::{ProgressionError, TokenLedger, TokenTier};

#[test]
fn test_can_afford_is_monotonic() {
    let ledger = TokenLedger::with_balances([
        (TokenTier::Basic, 4),
        (TokenTier::Advanced, 3),
        (TokenTier::Master, 1),
    ]);
    for tier in TokenTier::ALL {
        let limit = ledger.eligible_total(tier);
        assert!(ledger.can_afford(tier, limit));
        assert!(!ledger.can_afford(tier, limit + 1));
        for smaller in 0..=limit {
            assert!(
                ledger.can_afford(tier, smaller),
                "{} should cover {} at tier {}",
                limit,
                smaller,
                tier
            );
        }
    }
}

#[test]
fn test_basic_never_substitutes_up() {
    for amount in [1u64, 10, 1_000, u64::MAX] {
        let mut ledger = TokenLedger::with_balances([(TokenTier::Basic, amount)]);
        let before = ledger.clone();
        assert!(!ledger.can_afford(TokenTier::Advanced, 1));
        assert!(matches!(
            ledger.debit(TokenTier::Advanced, 1),
            Err(ProgressionError::InsufficientTokens { available: 0, .. })
        ));
        assert!(!ledger.can_afford(TokenTier::Master, 1));
        assert_eq!(ledger, before);
    }
}

#[test]
fn test_higher_tiers_cover_lower_requirements() {
    let ledger = TokenLedger::with_balances([(TokenTier::Master, 3)]);
    assert!(ledger.can_afford(TokenTier::Basic, 3));
    assert!(ledger.can_afford(TokenTier::Advanced, 3));
    assert!(ledger.can_afford(TokenTier::Master, 3));
}

#[test]
fn test_debit_conserves_total() {
    let cases = [
        (TokenTier::Basic, 1u64),
        (TokenTier::Basic, 7),
        (TokenTier::Advanced, 5),
        (TokenTier::Master, 2),
        (TokenTier::Advanced, 0),
    ];
    for (tier, cost) in cases {
        let mut ledger = TokenLedger::with_balances([
            (TokenTier::Basic, 4),
            (TokenTier::Advanced, 3),
            (TokenTier::Master, 2),
        ]);
        let before = ledger.total();
        let spent = ledger.debit(tier, cost).expect("affordable");
        assert_eq!(ledger.total(), before - cost);
        assert_eq!(spent.values().sum::<u64>(), cost);
        assert!(spent.keys().all(|t| t.satisfies(tier)));
    }
}

#[test]
fn test_debit_keeps_scarce_tiers() {
    let mut ledger = TokenLedger::with_balances([
        (TokenTier::Basic, 5),
        (TokenTier::Advanced, 5),
        (TokenTier::Master, 5),
    ]);
    ledger.debit(TokenTier::Basic, 7).unwrap();
    assert_eq!(ledger.balance(TokenTier::Basic), 0);
    assert_eq!(ledger.balance(TokenTier::Advanced), 3);
    assert_eq!(ledger.balance(TokenTier::Master), 5);
}

#[test]
fn test_credit_saturates() {
    let mut ledger = TokenLedger::with_balances([(TokenTier::Master, u64::MAX - 1)]);
    ledger.credit(TokenTier::Master, 10);
    assert_eq!(ledger.balance(TokenTier::Master), u64::MAX);
}

#[test]
fn test_ledger_serializes_as_tier_map() {
    let ledger = TokenLedger::with_balances([(TokenTier::Basic, 10), (TokenTier::Advanced, 2)]);
    let json = serde_json::to_string(&ledger).unwrap();
    assert_eq!(json, r#"{"basic":10,"advanced":2}"#);
    let back: TokenLedger = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ledger);
}
