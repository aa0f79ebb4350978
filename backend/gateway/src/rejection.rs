//! Decoding of campaign contract errors out of RPC diagnostics.
//!
//! A failed invocation surfaces as text containing `Error(Contract, #N)`,
//! where `N` is the contract's error code. The table below mirrors the
//! `Error` enum of the campaign contract; codes must stay in sync with it.

use serde::Serialize;

/// A contract error, named and classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub code: u32,
    pub name: &'static str,
    pub kind: &'static str,
}

const PRECONDITION: &str = "precondition_violation";
const MISMATCH: &str = "amount_mismatch";
const DUPLICATE: &str = "duplicate_action";
const NOT_FOUND: &str = "not_found";
const INTERNAL: &str = "internal";

const ERRORS: [(u32, &str, &str); 22] = [
    (1, "AlreadyInitialized", PRECONDITION),
    (2, "NotInitialized", PRECONDITION),
    (3, "InvalidGoal", PRECONDITION),
    (4, "InvalidTokenRate", PRECONDITION),
    (5, "InvalidTokenPool", PRECONDITION),
    (6, "NonPositiveAmount", PRECONDITION),
    (7, "DeadlinePassed", PRECONDITION),
    (8, "AmountMismatch", MISMATCH),
    (9, "StillFunding", PRECONDITION),
    (10, "GoalNotReached", PRECONDITION),
    (11, "GoalReached", PRECONDITION),
    (12, "NotCreator", PRECONDITION),
    (13, "AlreadyClaimed", DUPLICATE),
    (14, "AlreadyRefunded", DUPLICATE),
    (15, "AlreadyWithdrawn", DUPLICATE),
    (16, "DepositAlreadyReturned", DUPLICATE),
    (17, "SurplusAlreadyWithdrawn", DUPLICATE),
    (18, "NoContribution", NOT_FOUND),
    (19, "NoSurplus", PRECONDITION),
    (20, "InsufficientTokenPool", PRECONDITION),
    (21, "Overflow", INTERNAL),
    (22, "InvariantViolation", INTERNAL),
];

/// Look up a contract error code.
pub fn describe(code: u32) -> Rejection {
    ERRORS
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|&(code, name, kind)| Rejection { code, name, kind })
        .unwrap_or(Rejection {
            code,
            name: "Unknown",
            kind: "unknown",
        })
}

/// Find the first `Error(Contract, #N)` in `text`.
pub fn parse(text: &str) -> Option<Rejection> {
    const MARKER: &str = "Error(Contract, #";
    let start = text.find(MARKER)? + MARKER.len();
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok().map(describe)
}
