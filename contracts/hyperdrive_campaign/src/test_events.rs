use soroban_sdk::{
    symbol_short,
    testutils::{Address as _, Events},
    vec, Address, Env, IntoVal, Symbol, TryIntoVal, Val,
};

use crate::events::{
    CampaignOpened, Contributed, DepositReturned, DepositSplit, FundsWithdrawn, PhaseResolved,
    Refunded, SurplusWithdrawn, TokensClaimed,
};
use crate::test::{Fixture, RATE};
use crate::Phase;

/// Data of the campaign's single-topic events named `name`, oldest first.
fn data_of(env: &Env, contract: &Address, name: Symbol) -> std::vec::Vec<Val> {
    let topics = vec![env, name.into_val(env)];
    env.events()
        .all()
        .iter()
        .filter(|(from, t, _)| from == contract && *t == topics)
        .map(|(_, _, data)| data)
        .collect()
}

#[test]
fn test_opened_event() {
    let f = Fixture::new(1_000);

    let last_event = f.env.events().all().last().expect("No events found");
    assert_eq!(last_event.0, f.client.address);
    assert_eq!(last_event.1, vec![&f.env, symbol_short!("opened").into_val(&f.env)]);

    let data: CampaignOpened = last_event.2.try_into_val(&f.env).unwrap();
    assert_eq!(
        data,
        CampaignOpened {
            creator: f.creator.clone(),
            admin: f.admin.clone(),
            goal: 1_000,
            token_rate: RATE,
            deposit: 20,
            deadline: f.opened.deadline,
        }
    );
}

#[test]
fn test_contributed_event() {
    let f = Fixture::new(1_000);
    let a = f.contributor(500);
    f.client.contribute(&a, &200);
    f.client.contribute(&a, &50);

    let last_event = f.env.events().all().last().expect("No events found");
    assert_eq!(last_event.0, f.client.address);
    assert_eq!(
        last_event.1,
        vec![
            &f.env,
            symbol_short!("contrib").into_val(&f.env),
            a.into_val(&f.env),
        ]
    );

    let data: Contributed = last_event.2.try_into_val(&f.env).unwrap();
    assert_eq!(
        data,
        Contributed {
            contributor: a.clone(),
            amount: 50,
            raised: 250,
        }
    );
}

#[test]
fn test_first_withdrawal_announces_success() {
    let f = Fixture::new(100);
    let a = f.contributor(120);
    f.client.contribute(&a, &120);
    f.pass_deadline();
    f.client.withdraw_funds(&f.creator);

    let resolved = data_of(&f.env, &f.client.address, symbol_short!("resolved"));
    assert_eq!(resolved.len(), 1);
    let data: PhaseResolved = resolved[0].try_into_val(&f.env).unwrap();
    assert_eq!(
        data,
        PhaseResolved {
            phase: Phase::Succeeded,
            raised: 120,
            goal: 100,
        }
    );

    let last_event = f.env.events().all().last().expect("No events found");
    assert_eq!(last_event.1, vec![&f.env, symbol_short!("withdrawn").into_val(&f.env)]);
    let data: FundsWithdrawn = last_event.2.try_into_val(&f.env).unwrap();
    assert_eq!(
        data,
        FundsWithdrawn {
            creator: f.creator.clone(),
            creator_amount: 98,
            fee: 2,
        }
    );
}

#[test]
fn test_resolution_is_announced_once() {
    let f = Fixture::new(100);
    f.pass_deadline();

    f.client.finalize();
    assert_eq!(data_of(&f.env, &f.client.address, symbol_short!("resolved")).len(), 1);

    f.client.finalize();
    assert!(data_of(&f.env, &f.client.address, symbol_short!("resolved")).len() <= 1);
}

#[test]
fn test_claim_and_surplus_events() {
    let f = Fixture::new(100);
    let a = f.contributor(130);
    f.client.contribute(&a, &130);
    f.pass_deadline();

    f.client.claim_tokens(&a);
    let last_event = f.env.events().all().last().expect("No events found");
    assert_eq!(
        last_event.1,
        vec![
            &f.env,
            symbol_short!("claimed").into_val(&f.env),
            a.into_val(&f.env),
        ]
    );
    let data: TokensClaimed = last_event.2.try_into_val(&f.env).unwrap();
    assert_eq!(data.tokens, 130 * RATE);

    f.client.withdraw_surplus(&f.creator);
    let surplus = data_of(&f.env, &f.client.address, symbol_short!("surplus"));
    let data: SurplusWithdrawn = surplus[0].try_into_val(&f.env).unwrap();
    assert_eq!(data.amount, 30);

    f.client.return_deposit(&a);
    let returned = data_of(&f.env, &f.client.address, symbol_short!("dep_ret"));
    let data: DepositReturned = returned[0].try_into_val(&f.env).unwrap();
    assert_eq!(
        data,
        DepositReturned {
            creator: f.creator.clone(),
            amount: 2,
            tokens_returned: 2_000 - 130 * RATE,
        }
    );
}

#[test]
fn test_refund_and_deposit_split_events() {
    let f = Fixture::new(1_000);
    let a = f.contributor(300);
    f.client.contribute(&a, &300);
    f.pass_deadline();

    f.client.refund(&a);
    let resolved = data_of(&f.env, &f.client.address, symbol_short!("resolved"));
    let data: PhaseResolved = resolved[0].try_into_val(&f.env).unwrap();
    assert_eq!(data.phase, Phase::Failed);

    let last_event = f.env.events().all().last().expect("No events found");
    assert_eq!(
        last_event.1,
        vec![
            &f.env,
            symbol_short!("refunded").into_val(&f.env),
            a.into_val(&f.env),
        ]
    );
    let data: Refunded = last_event.2.try_into_val(&f.env).unwrap();
    assert_eq!(
        data,
        Refunded {
            contributor: a.clone(),
            amount: 300,
        }
    );

    let stranger = Address::generate(&f.env);
    f.client.reclaim_deposit_on_failure(&stranger);
    let last_event = f.env.events().all().last().expect("No events found");
    assert_eq!(last_event.1, vec![&f.env, symbol_short!("dep_split").into_val(&f.env)]);
    let data: DepositSplit = last_event.2.try_into_val(&f.env).unwrap();
    assert_eq!(
        data,
        DepositSplit {
            admin_share: 10,
            creator_share: 10,
            tokens_returned: f.opened.token_pool,
        }
    );
}
