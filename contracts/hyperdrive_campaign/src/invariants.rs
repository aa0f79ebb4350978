use crate::{Campaign, ContributionRecord, Phase};

/// Raised total equals the sum of every contribution record.
pub fn assert_raised_matches_records(campaign: &Campaign, records: &[ContributionRecord]) {
    let sum: i128 = records.iter().map(|r| r.amount).sum();
    assert_eq!(
        sum, campaign.raised,
        "raised total {} does not match sum of records {}",
        campaign.raised, sum
    );
}

/// The contract holds everything it took in minus everything it paid out.
pub fn assert_solvent(custody_balance: i128, campaign: &Campaign, paid_out: i128) {
    assert_eq!(
        custody_balance,
        campaign.raised + campaign.deposit - paid_out,
        "custody {} != raised {} + deposit {} - paid out {}",
        custody_balance,
        campaign.raised,
        campaign.deposit,
        paid_out
    );
}

/// Only `Funding -> Succeeded | Failed` or staying put are valid.
pub fn assert_valid_phase_transition(from: Phase, to: Phase) {
    let valid = from == to
        || matches!(
            (from, to),
            (Phase::Funding, Phase::Succeeded) | (Phase::Funding, Phase::Failed)
        );
    assert!(valid, "invalid phase transition from {:?} to {:?}", from, to);
}

/// Configuration written by `init` never changes.
pub fn assert_immutable_fields(opened: &Campaign, current: &Campaign) {
    assert_eq!(opened.creator, current.creator, "creator changed");
    assert_eq!(opened.admin, current.admin, "admin changed");
    assert_eq!(opened.currency, current.currency, "currency changed");
    assert_eq!(opened.reward_token, current.reward_token, "reward token changed");
    assert_eq!(opened.goal, current.goal, "goal changed");
    assert_eq!(opened.token_rate, current.token_rate, "token rate changed");
    assert_eq!(opened.deposit, current.deposit, "deposit changed");
    assert_eq!(opened.deadline, current.deadline, "deadline changed");
}

/// Claim and refund flags agree with the phase, and never both.
pub fn assert_record_consistent(campaign: &Campaign, record: &ContributionRecord) {
    assert!(record.amount >= 0, "negative contribution {}", record.amount);
    assert!(
        !(record.tokens_claimed && record.refunded),
        "record both claimed and refunded"
    );
    if record.tokens_claimed {
        assert_eq!(campaign.phase, Phase::Succeeded, "tokens claimed outside success");
    }
    if record.refunded {
        assert_eq!(campaign.phase, Phase::Failed, "refund outside failure");
    }
}

/// One-time settlement flags only appear in the phase that allows them.
pub fn assert_settlement_flags(campaign: &Campaign) {
    if campaign.fee_withdrawn || campaign.surplus_withdrawn {
        assert_eq!(campaign.phase, Phase::Succeeded, "withdrawal outside success");
    }
    if campaign.deposit_returned {
        assert!(campaign.phase.is_resolved(), "deposit settled while funding");
    }
}

pub fn assert_all_campaign_invariants(campaign: &Campaign) {
    assert!(campaign.goal > 0, "non-positive goal {}", campaign.goal);
    assert!(campaign.raised >= 0, "negative raised {}", campaign.raised);
    assert_eq!(
        campaign.deadline,
        campaign.created_at + crate::math::FUNDING_WINDOW_SECS,
        "deadline is not 60 days after creation"
    );
    assert!(
        crate::math::pool_covers(campaign.raised, campaign.token_rate, campaign.token_pool),
        "reward pool {} cannot back raised {}",
        campaign.token_pool,
        campaign.raised
    );
    assert_settlement_flags(campaign);
}
