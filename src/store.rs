use crate::account::Account;
use crate::account::validate_account_number;
use crate::error::LedgerError;

pub trait AccountStore {
    /// A missing table reads as empty, but login reports it separately.
    fn is_initialized(&self) -> bool;

    fn find(&self, account_number: &str) -> Result<Option<Account>, LedgerError>;

    fn accounts(&self) -> Result<Vec<Account>, LedgerError>;

    /// Appends a record without checking for duplicates.
    fn append(&mut self, account: &Account) -> Result<(), LedgerError>;

    fn update(&mut self, account: &Account) -> Result<(), LedgerError>;

    fn delete(&mut self, account_number: &str) -> Result<(), LedgerError>;

    fn exists(&self, account_number: &str) -> Result<bool, LedgerError> {
        Ok(self.find(account_number)?.is_some())
    }

    fn create(&mut self, account: &Account) -> Result<(), LedgerError> {
        validate_account_number(&account.account_number)?;
        if self.exists(&account.account_number)? {
            return Err(LedgerError::DuplicateKey(account.account_number.clone()));
        }
        self.append(account)
    }

    fn find_for_auth(&self, account_number: &str, pin: &str) -> Result<Account, LedgerError> {
        self.find(account_number)?
            .filter(|account| account.pin.verify(pin))
            .ok_or_else(|| LedgerError::AccountNotFound(account_number.to_owned()))
    }

    /// Unknown keys are left alone and yield `None`.
    fn record_failed_attempt(
        &mut self,
        account_number: &str,
    ) -> Result<Option<Account>, LedgerError> {
        let Some(mut account) = self.find(account_number)? else {
            return Ok(None);
        };
        account.failed_login_attempts = account.failed_login_attempts.saturating_add(1);
        self.update(&account)?;
        Ok(Some(account))
    }
}

#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: Vec<Account>,
    initialized: bool,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, account_number: &str) -> Option<usize> {
        self.accounts
            .iter()
            .position(|a| a.account_number == account_number)
    }
}

impl AccountStore for MemoryAccountStore {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn find(&self, account_number: &str) -> Result<Option<Account>, LedgerError> {
        Ok(self.position(account_number).map(|i| self.accounts[i].clone()))
    }

    fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        Ok(self.accounts.clone())
    }

    fn append(&mut self, account: &Account) -> Result<(), LedgerError> {
        validate_account_number(&account.account_number)?;
        self.initialized = true;
        self.accounts.push(account.clone());
        Ok(())
    }

    fn update(&mut self, account: &Account) -> Result<(), LedgerError> {
        validate_account_number(&account.account_number)?;
        let index = self
            .position(&account.account_number)
            .ok_or_else(|| LedgerError::AccountNotFound(account.account_number.clone()))?;
        self.accounts[index] = account.clone();
        Ok(())
    }

    fn delete(&mut self, account_number: &str) -> Result<(), LedgerError> {
        let index = self
            .position(account_number)
            .ok_or_else(|| LedgerError::AccountNotFound(account_number.to_owned()))?;
        self.accounts.remove(index);
        Ok(())
    }
}
