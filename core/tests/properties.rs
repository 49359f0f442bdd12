use std::collections::BTreeMap;

use htlc_escrow_core::{
    make_hash, AssetId, CreateEscrow, EscrowConfig, EscrowContract, EscrowError, Identity,
    ManualClock, Memo, Payout, Transfer,
};
use proptest::prelude::*;

const T0: u64 = 1_000_000;
const APP: Identity = Identity([0xAA; 32]);
const CREATOR: Identity = Identity([0xC0; 32]);
const TOKEN: AssetId = AssetId(77);
const FEE: u64 = 109_300;
const RESERVE: u64 = 185_300;

fn party(n: u8) -> Identity {
    Identity([n + 1; 32])
}

fn deploy() -> (EscrowContract<ManualClock>, ManualClock) {
    let clock = ManualClock::new(T0);
    let mut contract = EscrowContract::new(EscrowConfig::new(APP, CREATOR), clock.clone());
    contract
        .admit_asset(CREATOR, &Transfer::payment(CREATOR, APP, FEE), AssetId::NATIVE)
        .unwrap();
    contract
        .admit_asset(CREATOR, &Transfer::payment(CREATOR, APP, FEE), TOKEN)
        .unwrap();
    (contract, clock)
}

#[derive(Debug, Clone)]
enum Op {
    Create {
        secret: u8,
        depositor: u8,
        token: bool,
        amount: u64,
        delay: u64,
        recipient: Option<u8>,
    },
    Withdraw {
        secret: u8,
        caller: u8,
        correct: bool,
    },
    Cancel {
        secret: u8,
        caller: u8,
    },
    Accrue {
        token: bool,
        amount: u64,
    },
    AdminWithdraw {
        token: bool,
        amount: Option<u64>,
    },
    Tick(u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (
            0u8..6,
            0u8..4,
            any::<bool>(),
            1u64..10_000_000,
            0u64..200,
            proptest::option::of(0u8..4)
        )
            .prop_map(|(secret, depositor, token, amount, delay, recipient)| {
                Op::Create {
                    secret,
                    depositor,
                    token,
                    amount,
                    delay,
                    recipient,
                }
            }),
        (0u8..6, 0u8..4, any::<bool>()).prop_map(|(secret, caller, correct)| Op::Withdraw {
            secret,
            caller,
            correct
        }),
        (0u8..6, 0u8..4).prop_map(|(secret, caller)| Op::Cancel { secret, caller }),
        (any::<bool>(), 0u64..1_000_000).prop_map(|(token, amount)| Op::Accrue { token, amount }),
        (any::<bool>(), proptest::option::of(1u64..2_000_000))
            .prop_map(|(token, amount)| Op::AdminWithdraw { token, amount }),
        (0u64..100).prop_map(Op::Tick),
    ]
}

fn secret(n: u8) -> Vec<u8> {
    vec![b's', n]
}

fn create_request(
    secret_id: u8,
    depositor: Identity,
    token: bool,
    amount: u64,
    delay: u64,
    recipient: Option<u8>,
) -> CreateEscrow {
    let deposit = if token {
        Transfer::token(depositor, APP, TOKEN, amount)
    } else {
        Transfer::payment(depositor, APP, amount)
    };
    CreateEscrow {
        deposit,
        reserve: Transfer::payment(depositor, APP, RESERVE),
        rescue_delay: delay,
        secret_hash: make_hash(&secret(secret_id)),
        recipient: recipient.map(party),
        destination_setter: None,
        memo: Memo::EMPTY,
    }
}

fn asset(token: bool) -> AssetId {
    if token {
        TOKEN
    } else {
        AssetId::NATIVE
    }
}

/// Cancels every open escrow on a copy of `contract` at the end of time.
fn all_escrows_settle(contract: &EscrowContract<ManualClock>, clock: &ManualClock) -> bool {
    let now = contract.latest_timestamp();
    let mut copy = contract.clone();
    clock.set(u64::MAX);
    let hashes: Vec<_> = copy.state().escrows.iter().map(|r| r.secret_hash).collect();
    let settled = hashes
        .into_iter()
        .all(|hash| copy.cancel(CREATOR, hash).is_ok());
    clock.set(now);
    settled && copy.state().escrows.is_empty()
}

fn add_payouts(paid: &mut BTreeMap<AssetId, u64>, payouts: &[Payout]) {
    for p in payouts {
        *paid.entry(p.asset).or_default() += p.amount;
    }
}

proptest! {
    /// Funds received always equal funds paid out plus funds still held, the
    /// ledger never claims more than the account holds, and every open escrow
    /// can still be paid out in full.
    #[test]
    fn value_is_conserved(ops in proptest::collection::vec(op(), 1..60)) {
        let (mut contract, clock) = deploy();
        let mut received: BTreeMap<AssetId, u64> = BTreeMap::new();
        let mut paid: BTreeMap<AssetId, u64> = BTreeMap::new();
        received.insert(AssetId::NATIVE, 2 * FEE);

        for op in ops {
            match op {
                Op::Create { secret: s, depositor, token, amount, delay, recipient } => {
                    let from = party(depositor);
                    let req = create_request(s, from, token, amount, delay, recipient);
                    if contract.create(party(depositor), req).is_ok() {
                        *received.entry(asset(token)).or_default() += amount;
                        *received.entry(AssetId::NATIVE).or_default() += RESERVE;
                    }
                }
                Op::Withdraw { secret: s, caller, correct } => {
                    let preimage = if correct { secret(s) } else { secret(s + 100) };
                    let hash = make_hash(&secret(s));
                    if let Ok(payouts) = contract.withdraw(party(caller), hash, &preimage) {
                        add_payouts(&mut paid, &payouts);
                    }
                }
                Op::Cancel { secret: s, caller } => {
                    if let Ok(payouts) = contract.cancel(party(caller), make_hash(&secret(s))) {
                        add_payouts(&mut paid, &payouts);
                    }
                }
                Op::Accrue { token, amount } => {
                    if contract.accrue(asset(token), amount).is_ok() {
                        *received.entry(asset(token)).or_default() += amount;
                    }
                }
                Op::AdminWithdraw { token, amount } => {
                    if let Ok(payout) = contract.admin_withdraw(CREATOR, asset(token), amount) {
                        prop_assert_eq!(payout.to, CREATOR);
                        add_payouts(&mut paid, &[payout]);
                    }
                }
                Op::Tick(secs) => clock.advance(secs),
            }

            let state = contract.state();
            for asset in [AssetId::NATIVE, TOKEN] {
                let escrowed: u64 = state
                    .escrows
                    .iter()
                    .map(|r| {
                        let mut sum = 0;
                        if r.asset_id == asset {
                            sum += r.amount;
                        }
                        if asset.is_native() {
                            sum += r.reserve_amount;
                        }
                        sum
                    })
                    .sum();
                prop_assert_eq!(state.deposits.get(asset), Ok(escrowed));

                let balance = state.account.balance(asset);
                let inflow = received.get(&asset).copied().unwrap_or_default();
                let outflow = paid.get(&asset).copied().unwrap_or_default();
                prop_assert_eq!(inflow - outflow, balance);
                prop_assert!(escrowed <= balance);
                prop_assert!(contract.withdrawable_excess(asset).is_ok());
            }
            prop_assert!(
                state.account.balance(AssetId::NATIVE) >= contract.min_balance().unwrap()
            );
            prop_assert!(all_escrows_settle(&contract, &clock));
        }
    }

    /// A secret hash maps to at most one open escrow, and a closed one cannot
    /// be settled again.
    #[test]
    fn escrow_settles_once(amount in 1u64..1_000_000, delay in 0u64..100, late in any::<bool>()) {
        let (mut contract, clock) = deploy();
        let hash = make_hash(b"once");
        let req = create_request(0, party(0), false, amount, delay, None);
        let req = CreateEscrow { secret_hash: hash, ..req };

        contract.create(party(0), req.clone()).unwrap();
        prop_assert_eq!(
            contract.create(party(0), req),
            Err(EscrowError::DuplicateEscrow(hash))
        );

        if late {
            clock.advance(delay);
            prop_assert!(contract.cancel(party(1), hash).is_ok());
        } else if delay > 0 {
            prop_assert!(contract.withdraw(party(1), hash, b"once").is_ok());
        } else {
            prop_assert!(contract.cancel(party(1), hash).is_ok());
        }
        prop_assert_eq!(contract.cancel(party(1), hash), Err(EscrowError::NotFound(hash)));
        prop_assert_eq!(
            contract.withdraw(party(1), hash, b"once"),
            Err(EscrowError::NotFound(hash))
        );
    }

    /// Exactly one of withdraw and cancel is available at any instant.
    #[test]
    fn deadline_partitions_time(delay in 0u64..1_000, elapsed in 0u64..2_000) {
        let (mut contract, clock) = deploy();
        let hash = make_hash(b"deadline");
        let req = CreateEscrow {
            secret_hash: hash,
            ..create_request(0, party(0), false, 1_000, delay, None)
        };
        contract.create(party(0), req).unwrap();
        clock.advance(elapsed);

        let mut withdrawing = contract.clone();
        let withdrawn = withdrawing.withdraw(party(2), hash, b"deadline").is_ok();
        let cancelled = contract.cancel(party(2), hash).is_ok();
        prop_assert!(withdrawn != cancelled);
        prop_assert_eq!(withdrawn, elapsed < delay);
    }

    /// Only the exact preimage opens the escrow.
    #[test]
    fn only_preimage_withdraws(preimage in proptest::collection::vec(any::<u8>(), 0..64),
                               guess in proptest::collection::vec(any::<u8>(), 0..64)) {
        let (mut contract, _) = deploy();
        let hash = make_hash(&preimage);
        let req = CreateEscrow {
            secret_hash: hash,
            ..create_request(0, party(0), false, 1_000, 60, None)
        };
        contract.create(party(0), req).unwrap();

        let result = contract.withdraw(party(1), hash, &guess);
        if guess == preimage {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result, Err(EscrowError::SecretMismatch));
            prop_assert!(contract.get_escrow(&hash).is_ok());
        }
    }
}
