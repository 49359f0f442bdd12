//! The HTLC escrow contract: create / withdraw / cancel transitions, asset
//! admission, administration of excess funds and key registration.
//!
//! Every mutating method checks and stages all of its effects first and only
//! then commits them, so a returned error always means no state changed.

#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::account::ContractAccount;
use crate::asset::{AssetId, Payout, Transfer, TransferKind};
use crate::clock::{Clock, SystemClock};
use crate::escrow::{EscrowRecord, Memo, MEMO_LEN};
use crate::hash::{self, SecretHash};
use crate::identity::Identity;
use crate::keyreg::{KeyRegistration, KeyRegistrationReceipt};
use crate::ledger::DepositLedger;
use crate::store::EscrowStore;
use crate::{EscrowConfig, EscrowError, Result};

/// Request to open an escrow.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateEscrow {
    /// Payment or token transfer funding the escrow.
    pub deposit: Transfer,
    /// Native payment covering the storage reserve of the record.
    /// Must equal [`EscrowContract::quote_reserve_amount`].
    pub reserve: Transfer,
    /// Seconds from now until the escrow can only be cancelled.
    pub rescue_delay: u64,
    pub secret_hash: SecretHash,
    /// If set, the secret releases funds to this identity only.
    #[cfg_attr(feature = "json", serde(default))]
    pub recipient: Option<Identity>,
    /// If set, this identity may re-target the escrow with
    /// [`EscrowContract::set_recipient`] until the rescue time.
    #[cfg_attr(feature = "json", serde(default))]
    pub destination_setter: Option<Identity>,
    #[cfg_attr(feature = "json", serde(default))]
    pub memo: Memo,
}

/// Everything the contract persists.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractState {
    pub escrows: EscrowStore,
    pub deposits: DepositLedger,
    pub account: ContractAccount,
    /// Participation keys currently registered for the contract account.
    #[cfg_attr(feature = "json", serde(default))]
    pub participation: Option<KeyRegistration>,
}

/// Hash-time-locked escrow contract.
#[derive(Debug, Clone)]
pub struct EscrowContract<C = SystemClock> {
    config: EscrowConfig,
    state: ContractState,
    clock: C,
}

impl<C: Clock> EscrowContract<C> {
    /// A freshly deployed contract. Must be bootstrapped with
    /// `admit_asset(.., AssetId::NATIVE)` before escrows can be created.
    pub fn new(config: EscrowConfig, clock: C) -> Self {
        Self::with_state(config, ContractState::default(), clock)
    }

    /// Resumes a contract from persisted state.
    pub fn with_state(config: EscrowConfig, state: ContractState, clock: C) -> Self {
        Self {
            config,
            state,
            clock,
        }
    }

    pub fn config(&self) -> &EscrowConfig {
        &self.config
    }

    pub fn state(&self) -> &ContractState {
        &self.state
    }

    pub fn into_state(self) -> ContractState {
        self.state
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Opens an escrow keyed by `request.secret_hash`, funded by `sender`.
    #[instrument(skip_all, fields(sender = %sender, secret_hash = %request.secret_hash))]
    pub fn create(&mut self, sender: Identity, request: CreateEscrow) -> Result<()> {
        let CreateEscrow {
            deposit,
            reserve,
            rescue_delay,
            secret_hash,
            recipient,
            destination_setter,
            memo,
        } = request;

        if secret_hash.is_zero() {
            return Err(EscrowError::InvalidSecretHash);
        }
        self.check_reserve_transfer(&reserve)?;
        if self.state.escrows.exists(&secret_hash) {
            return Err(EscrowError::DuplicateEscrow(secret_hash));
        }
        let (asset_id, amount) = self.accept_deposit(sender, &deposit)?;
        if recipient.is_some_and(|r| r.is_zero()) {
            return Err(EscrowError::InvalidRecipient);
        }
        if destination_setter.is_some_and(|d| d.is_zero()) {
            return Err(EscrowError::InvalidDestinationSetter);
        }
        for asset in [asset_id, AssetId::NATIVE] {
            if !self.state.deposits.contains(asset) {
                return Err(EscrowError::AssetNotAdmitted(asset));
            }
        }

        let created_time = self.clock.now();
        let rescue_time = created_time
            .checked_add(rescue_delay)
            .ok_or(EscrowError::Overflow("rescue time"))?;
        let record = EscrowRecord {
            created_time,
            rescue_time,
            asset_id,
            amount,
            reserve_amount: reserve.amount,
            depositor: sender,
            recipient,
            destination_setter,
            secret_hash,
            memo,
        };

        // principal under its own asset, reserve always under the native entry
        let mut batch = self.state.deposits.batch();
        batch.credit(asset_id, amount)?;
        batch.credit(AssetId::NATIVE, reserve.amount)?;
        let ledger_update = batch.finish();

        let account_update = self
            .state
            .account
            .stage(&[(asset_id, amount), (AssetId::NATIVE, reserve.amount)], &[])?;

        let expected = self.reserve_for(&record)?;
        if expected != reserve.amount {
            return Err(EscrowError::ReserveMismatch {
                expected,
                actual: reserve.amount,
            });
        }

        self.state.escrows.put(record)?;
        self.state.deposits.apply(ledger_update);
        self.state.account.apply(account_update);

        info!(
            asset = %asset_id,
            amount,
            reserve = reserve.amount,
            rescue_time,
            "escrow created"
        );
        Ok(())
    }

    /// Releases the escrow to whoever knows the secret, before the rescue time.
    ///
    /// The principal goes to the recipient if one was set, otherwise to
    /// `sender`. The reserve always returns to the depositor.
    #[instrument(skip_all, fields(sender = %sender, secret_hash = %secret_hash))]
    pub fn withdraw(
        &mut self,
        sender: Identity,
        secret_hash: SecretHash,
        secret: &[u8],
    ) -> Result<Vec<Payout>> {
        let record = self.state.escrows.get(&secret_hash)?;
        secret_hash.verify(secret)?;

        let now = self.clock.now();
        if now >= record.rescue_time {
            return Err(EscrowError::Expired {
                rescue_time: record.rescue_time,
            });
        }

        let target = record.payout_target(sender);
        let payouts = settlement_payouts(record, target)?;
        self.settle(&secret_hash, payouts)
    }

    /// Returns the escrow to its depositor once the rescue time is reached.
    /// Anyone may call it.
    #[instrument(skip_all, fields(sender = %sender, secret_hash = %secret_hash))]
    pub fn cancel(&mut self, sender: Identity, secret_hash: SecretHash) -> Result<Vec<Payout>> {
        let record = self.state.escrows.get(&secret_hash)?;

        let now = self.clock.now();
        if now < record.rescue_time {
            return Err(EscrowError::NotYetExpired {
                rescue_time: record.rescue_time,
            });
        }

        let payouts = settlement_payouts(record, record.depositor)?;
        self.settle(&secret_hash, payouts)
    }

    /// Points an open escrow at a new recipient. Only the destination setter
    /// named at creation may do so, and only before the rescue time.
    #[instrument(skip_all, fields(sender = %sender, secret_hash = %secret_hash))]
    pub fn set_recipient(
        &mut self,
        sender: Identity,
        secret_hash: SecretHash,
        recipient: Identity,
    ) -> Result<()> {
        let record = self.state.escrows.get(&secret_hash)?;
        if record.destination_setter != Some(sender) {
            return Err(EscrowError::NotDestinationSetter(secret_hash));
        }
        let now = self.clock.now();
        if now >= record.rescue_time {
            return Err(EscrowError::Expired {
                rescue_time: record.rescue_time,
            });
        }
        if recipient.is_zero() {
            return Err(EscrowError::InvalidRecipient);
        }

        let updated = EscrowRecord {
            recipient: Some(recipient),
            ..record.clone()
        };
        self.state.escrows.replace(updated)?;

        info!(recipient = %recipient, "escrow recipient changed");
        Ok(())
    }

    /// Registers the contract as a holder of `asset` and opens its deposit
    /// entry. For the native asset this bootstraps the contract's own
    /// minimum balance.
    #[instrument(skip_all, fields(sender = %sender, asset = %asset))]
    pub fn admit_asset(
        &mut self,
        sender: Identity,
        reserve: &Transfer,
        asset: AssetId,
    ) -> Result<()> {
        self.check_reserve_transfer(reserve)?;
        if self.state.deposits.contains(asset)
            || (!asset.is_native() && self.state.account.holds(asset))
        {
            return Err(EscrowError::DuplicateAdmission(asset));
        }
        let expected = self.config.costs.admission_fee(asset)?;
        if reserve.amount != expected {
            return Err(EscrowError::AdmissionFeeMismatch {
                asset,
                expected,
                actual: reserve.amount,
            });
        }
        let account_update = self
            .state
            .account
            .stage(&[(AssetId::NATIVE, reserve.amount)], &[])?;

        self.state.deposits.initialize(asset)?;
        self.state.account.opt_in(asset);
        self.state.account.apply(account_update);

        info!(fee = reserve.amount, "asset admitted");
        Ok(())
    }

    /// Balance of `asset` held by the contract that no open escrow or
    /// required reserve accounts for.
    pub fn withdrawable_excess(&self, asset: AssetId) -> Result<u64> {
        if !self.state.deposits.contains(asset) {
            return Err(EscrowError::AssetNotAdmitted(asset));
        }
        let floor = if asset.is_native() {
            self.reserve_floor()?
        } else {
            0
        };
        let balance = self.state.account.balance(asset);
        Ok(self.state.deposits.excess(asset, balance, floor)?)
    }

    /// Pays `amount` of excess `asset` (all of it when `None`) to the creator.
    #[instrument(skip_all, fields(sender = %sender, asset = %asset))]
    pub fn admin_withdraw(
        &mut self,
        sender: Identity,
        asset: AssetId,
        amount: Option<u64>,
    ) -> Result<Payout> {
        if sender != self.config.creator {
            return Err(EscrowError::Unauthorized("withdraw excess funds"));
        }
        let available = self.withdrawable_excess(asset)?;
        let requested = amount.unwrap_or(available);
        if requested == 0 {
            return Err(EscrowError::NonPositiveAmount);
        }
        if requested > available {
            return Err(EscrowError::ExcessExceeded {
                requested,
                available,
            });
        }

        let payout = Payout::token(self.config.creator, asset, requested);
        let update = self.state.account.stage(&[], &[payout])?;
        self.state.account.apply(update);

        info!(amount = requested, "excess withdrawn");
        Ok(payout)
    }

    /// Credits value that reached the contract outside any escrow, such as
    /// consensus rewards or stray payments.
    pub fn accrue(&mut self, asset: AssetId, amount: u64) -> Result<()> {
        if !self.state.account.holds(asset) {
            return Err(EscrowError::AssetNotAdmitted(asset));
        }
        self.state.account.receive(asset, amount)?;
        debug!(%asset, amount, "unattributed funds received");
        Ok(())
    }

    /// Brings the contract account online with `registration`. The fee is
    /// paid out of native excess only.
    #[instrument(skip_all, fields(sender = %sender))]
    pub fn register_online(
        &mut self,
        sender: Identity,
        registration: KeyRegistration,
    ) -> Result<KeyRegistrationReceipt> {
        if sender != self.config.creator {
            return Err(EscrowError::Unauthorized("register participation keys"));
        }
        registration.validate()?;

        let available = self.withdrawable_excess(AssetId::NATIVE)?;
        if registration.fee > available {
            return Err(EscrowError::ExcessExceeded {
                requested: registration.fee,
                available,
            });
        }
        // the fee leaves the account but is not a payout to any party
        let fee = Payout::native(self.config.app_address, registration.fee);
        let update = self.state.account.stage(&[], &[fee])?;

        let txn_id = registration
            .txn_id()
            .map_err(|e| EscrowError::Codec(e.to_string()))?;
        let receipt = KeyRegistrationReceipt {
            txn_id,
            fee: registration.fee,
        };
        self.state.account.apply(update);
        self.state.participation = Some(registration);

        info!(txn_id = %hex::encode(receipt.txn_id), "participation keys registered");
        Ok(receipt)
    }

    pub fn participation(&self) -> Option<&KeyRegistration> {
        self.state.participation.as_ref()
    }

    /// The open escrow for `secret_hash`.
    pub fn get_escrow(&self, secret_hash: &SecretHash) -> Result<&EscrowRecord> {
        self.state.escrows.get(secret_hash)
    }

    /// Digest to supply to `create` for `secret`.
    pub fn make_hash(&self, secret: &[u8]) -> SecretHash {
        hash::make_hash(secret)
    }

    /// Current ledger time.
    pub fn latest_timestamp(&self) -> u64 {
        self.clock.now()
    }

    /// Reserve deposit the next `create` call requires, found by simulating
    /// the insertion of a maximal-size record.
    pub fn quote_reserve_amount(&self) -> Result<u64> {
        let now = self.clock.now();
        let sample = EscrowRecord {
            created_time: now,
            rescue_time: now,
            asset_id: AssetId(u64::MAX),
            amount: u64::MAX,
            reserve_amount: u64::MAX,
            depositor: Identity([u8::MAX; 32]),
            recipient: Some(Identity([u8::MAX; 32])),
            destination_setter: Some(Identity([u8::MAX; 32])),
            secret_hash: SecretHash::ZERO,
            memo: Memo([u8::MAX; MEMO_LEN]),
        };
        self.reserve_for(&sample)
    }

    /// Current minimum-balance requirement of the contract account.
    pub fn min_balance(&self) -> Result<u64> {
        let footprint = self
            .state
            .escrows
            .footprint()
            .checked_add(self.state.deposits.footprint())?;
        self.config
            .costs
            .min_balance(self.state.account.holding_count(), footprint)
    }

    /// Part of the native minimum balance not covered by escrow reserves:
    /// account base, token holdings and deposit entries. Record reserves are
    /// already counted in the native deposit entry.
    pub fn reserve_floor(&self) -> Result<u64> {
        self.config.costs.min_balance(
            self.state.account.holding_count(),
            self.state.deposits.footprint(),
        )
    }

    /// Increase of the minimum balance caused by storing `record`.
    fn reserve_for(&self, record: &EscrowRecord) -> Result<u64> {
        let before = self.min_balance()?;
        let footprint = self
            .state
            .escrows
            .footprint()
            .checked_add(self.state.deposits.footprint())?
            .checked_add(EscrowStore::record_footprint(record)?)?;
        let after = self
            .config
            .costs
            .min_balance(self.state.account.holding_count(), footprint)?;
        after
            .checked_sub(before)
            .ok_or(EscrowError::Overflow("reserve quote"))
    }

    fn check_reserve_transfer(&self, reserve: &Transfer) -> Result<()> {
        if reserve.receiver != self.config.app_address {
            return Err(EscrowError::InvalidReceiver);
        }
        if reserve.kind != TransferKind::Payment {
            return Err(EscrowError::UnsupportedTransferKind(
                reserve.kind.as_ref().to_string(),
            ));
        }
        Ok(())
    }

    /// Validates the funding transfer and returns the escrowed asset and amount.
    fn accept_deposit(&self, sender: Identity, deposit: &Transfer) -> Result<(AssetId, u64)> {
        let asset = match deposit.kind {
            TransferKind::Payment => {
                if deposit.sender != sender {
                    return Err(EscrowError::SenderMismatch);
                }
                AssetId::NATIVE
            }
            TransferKind::TokenTransfer => match deposit.token_id {
                Some(token) if !token.is_native() => token,
                _ => {
                    return Err(EscrowError::UnsupportedTransferKind(
                        "token transfer without a token id".to_string(),
                    ))
                }
            },
            kind => {
                return Err(EscrowError::UnsupportedTransferKind(
                    kind.as_ref().to_string(),
                ))
            }
        };
        if deposit.receiver != self.config.app_address {
            return Err(EscrowError::InvalidReceiver);
        }
        if deposit.amount == 0 {
            return Err(EscrowError::NonPositiveAmount);
        }
        Ok((asset, deposit.amount))
    }

    /// Closes the escrow for `secret_hash` and issues `payouts`, debiting the
    /// ledger entries they draw from.
    fn settle(&mut self, secret_hash: &SecretHash, payouts: Vec<Payout>) -> Result<Vec<Payout>> {
        let mut batch = self.state.deposits.batch();
        for payout in &payouts {
            batch.debit(payout.asset, payout.amount)?;
        }
        let ledger_update = batch.finish();
        let account_update = self.state.account.stage(&[], &payouts)?;

        // the record goes first: once it is gone the escrow is closed
        self.state.escrows.delete(secret_hash)?;
        self.state.deposits.apply(ledger_update);
        self.state.account.apply(account_update);

        for payout in &payouts {
            info!(to = %payout.to, asset = %payout.asset, amount = payout.amount, "payout");
        }
        Ok(payouts)
    }
}

/// Payouts closing `record` with the principal going to `target`.
///
/// A native escrow paid back to its own depositor is a single combined
/// transfer; otherwise the reserve is returned to the depositor separately.
fn settlement_payouts(record: &EscrowRecord, target: Identity) -> Result<Vec<Payout>> {
    let payouts = if record.asset_id.is_native() && target == record.depositor {
        let total = record
            .amount
            .checked_add(record.reserve_amount)
            .ok_or(EscrowError::Overflow("settlement amount"))?;
        vec![Payout::native(target, total)]
    } else {
        vec![
            Payout::token(target, record.asset_id, record.amount),
            Payout::native(record.depositor, record.reserve_amount),
        ]
    };
    Ok(payouts.into_iter().filter(|p| p.amount > 0).collect())
}
