use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::account::Account;
use crate::config::Config;
use crate::config::ConfigError;
use crate::credential::Pin;
use crate::credential::PinHash;
use crate::error::LedgerError;
use crate::error::ValidationError;
use crate::security_log::SecurityEvent;
use crate::security_log::SecurityEventLog;
use crate::session::Admission;
use crate::session::FailureOutcome;
use crate::session::SessionGuard;
use crate::store::AccountStore;
use crate::transaction::Transaction;
use crate::transaction_log::TransactionLog;

pub struct AtmEngine<S: AccountStore> {
    store: S,
    guard: SessionGuard,
    transactions: TransactionLog,
    security: SecurityEventLog,
    interest_rate: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    pub checking: Decimal,
    pub savings: Decimal,
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "checking: {:.2}", self.checking)?;
        write!(f, "savings: {:.2}", self.savings)
    }
}

impl<S: AccountStore> AtmEngine<S> {
    pub fn new(store: S, config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let guard = SessionGuard::new(config.max_failed_attempts, config.lockout_window_secs)
            .ok_or(ConfigError::LockoutWindowOutOfRange(config.lockout_window_secs))?;
        Ok(AtmEngine {
            store,
            guard,
            transactions: TransactionLog::new(&config.transaction_log_path),
            security: SecurityEventLog::new(&config.security_log_path),
            interest_rate: config.interest_rate,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    #[inline]
    fn audit(&self, event: SecurityEvent) {
        if let Err(e) = self.security.append(&event, Utc::now()) {
            warn!(error = %e, path = %self.security.path().display(), "security log unavailable");
        }
    }

    #[inline]
    fn record(&self, transaction: Transaction) {
        if let Err(e) = self.transactions.append(&transaction) {
            warn!(error = %e, path = %self.transactions.path().display(), "transaction log unavailable");
        }
    }

    // A failed write leaves `account` untouched.
    #[inline]
    fn commit(&mut self, account: &mut Account, updated: Account) -> Result<(), LedgerError> {
        self.store.update(&updated)?;
        *account = updated;
        Ok(())
    }

    pub fn create_account(&mut self, account_number: &str, pin: &Pin) -> Result<Account, LedgerError> {
        let account = Account::new(account_number, PinHash::new(pin))?;
        self.store.create(&account)?;
        info!(account = %account.account_number, "account created");
        self.audit(SecurityEvent::AccountCreated {
            account: account.account_number.clone(),
        });
        Ok(account)
    }

    pub fn login(&mut self, account_number: &str, pin: &str) -> Result<Account, LedgerError> {
        self.login_at(account_number, pin, Utc::now())
    }

    pub fn login_at(
        &mut self,
        account_number: &str,
        pin: &str,
        now: DateTime<Utc>,
    ) -> Result<Account, LedgerError> {
        if !self.store.is_initialized() {
            return Err(LedgerError::NoAccounts);
        }
        let Some(mut account) = self.store.find(account_number)? else {
            info!(account = %account_number, "login for unknown account");
            return Err(LedgerError::InvalidCredentials);
        };

        match self.guard.admit(&mut account, now) {
            Admission::Refuse { retry_after_secs } => {
                warn!(account = %account_number, retry_after_secs, "login refused, account locked");
                self.audit(SecurityEvent::LockedLoginRefused {
                    account: account.account_number.clone(),
                });
                return Err(LedgerError::AccountLocked {
                    account: account.account_number,
                    retry_after_secs,
                });
            }
            Admission::AdmitAfterExpiry => {
                info!(account = %account_number, "lockout expired");
                self.audit(SecurityEvent::LockoutExpired {
                    account: account.account_number.clone(),
                });
            }
            Admission::Admit => {}
        }

        if account.pin.verify(pin) {
            self.guard.record_success(&mut account, now);
            self.store.update(&account)?;
            info!(account = %account_number, "login succeeded");
            self.audit(SecurityEvent::LoginSucceeded {
                account: account.account_number.clone(),
            });
            return Ok(account);
        }

        let outcome = self.guard.record_failure(&mut account, now);
        self.store.update(&account)?;
        match outcome {
            FailureOutcome::Counted { attempts_left } => {
                warn!(account = %account_number, attempts_left, "login failed");
                self.audit(SecurityEvent::LoginFailed {
                    account: account.account_number,
                    attempts_left,
                });
                Err(LedgerError::InvalidCredentials)
            }
            FailureOutcome::Locked { until } => {
                warn!(account = %account_number, %until, "account locked");
                self.audit(SecurityEvent::AccountLocked {
                    account: account.account_number.clone(),
                    attempts: account.failed_login_attempts,
                });
                Err(LedgerError::AccountLocked {
                    account: account.account_number,
                    retry_after_secs: (until - now).num_seconds() + 1,
                })
            }
        }
    }

    pub fn balance(&self, account: &Account) -> Balance {
        Balance {
            checking: account.checking_balance,
            savings: account.savings_balance,
        }
    }

    pub fn deposit(&mut self, account: &mut Account, amount: Decimal) -> Result<Decimal, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount.into());
        }
        let mut updated = account.clone();
        updated.checking_balance = account
            .checking_balance
            .checked_add(amount)
            .ok_or(ValidationError::AmountOverflow)?;
        self.commit(account, updated)?;

        info!(account = %account.account_number, %amount, "deposit");
        self.record(Transaction::deposit(amount, Utc::now()));
        Ok(account.checking_balance)
    }

    pub fn withdraw(&mut self, account: &mut Account, amount: Decimal) -> Result<Decimal, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount.into());
        }
        if amount > account.checking_balance {
            return Err(ValidationError::InsufficientFunds.into());
        }
        let mut updated = account.clone();
        updated.checking_balance = account
            .checking_balance
            .checked_sub(amount)
            .ok_or(ValidationError::AmountOverflow)?;
        self.commit(account, updated)?;

        info!(account = %account.account_number, %amount, "withdrawal");
        self.record(Transaction::withdrawal(amount, Utc::now()));
        Ok(account.checking_balance)
    }

    /// No once-per-period guard, and the product is kept unrounded.
    pub fn apply_interest(&mut self, account: &mut Account) -> Result<Decimal, LedgerError> {
        let mut updated = account.clone();
        updated.checking_balance = Decimal::ONE
            .checked_add(self.interest_rate)
            .and_then(|factor| account.checking_balance.checked_mul(factor))
            .ok_or(ValidationError::AmountOverflow)?;
        self.commit(account, updated)?;

        info!(account = %account.account_number, balance = %account.checking_balance, "interest applied");
        Ok(account.checking_balance)
    }

    /// A mismatch is audited as a rejected PIN change.
    pub fn check_current_pin(
        &self,
        account: &Account,
        current_pin: &str,
    ) -> Result<(), LedgerError> {
        if account.pin.verify(current_pin) {
            return Ok(());
        }
        warn!(account = %account.account_number, "PIN change rejected");
        self.audit(SecurityEvent::PinChangeRejected {
            account: account.account_number.clone(),
        });
        Err(ValidationError::PinMismatch.into())
    }

    pub fn change_pin(
        &mut self,
        account: &mut Account,
        current_pin: &str,
        new_pin: &Pin,
    ) -> Result<(), LedgerError> {
        self.check_current_pin(account, current_pin)?;
        let mut updated = account.clone();
        updated.pin = PinHash::new(new_pin);
        self.commit(account, updated)?;

        info!(account = %account.account_number, "PIN changed");
        self.audit(SecurityEvent::PinChanged {
            account: account.account_number.clone(),
        });
        Ok(())
    }

    pub fn delete_account(&mut self, account: Account) -> Result<(), LedgerError> {
        self.store.delete(&account.account_number)?;
        info!(account = %account.account_number, "account deleted");
        self.audit(SecurityEvent::AccountDeleted {
            account: account.account_number,
        });
        Ok(())
    }

    pub fn logout(&mut self, account: &Account) -> Result<(), LedgerError> {
        self.store.update(account)?;
        info!(account = %account.account_number, "logged out");
        Ok(())
    }
}
