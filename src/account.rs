use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::credential::DIGEST_LEN;
use crate::credential::PinHash;
use crate::credential::SALT_LEN;
use crate::error::ValidationError;

pub const ACCOUNT_NUMBER_MAX_LEN: usize = 19;

const NUMBER_FIELD: usize = ACCOUNT_NUMBER_MAX_LEN + 1;
const DECIMAL_FIELD: usize = 16;

const SALT_OFFSET: usize = NUMBER_FIELD;
const DIGEST_OFFSET: usize = SALT_OFFSET + SALT_LEN;
const CHECKING_OFFSET: usize = DIGEST_OFFSET + DIGEST_LEN;
const SAVINGS_OFFSET: usize = CHECKING_OFFSET + DECIMAL_FIELD;
const ATTEMPTS_OFFSET: usize = SAVINGS_OFFSET + DECIMAL_FIELD;
const LAST_LOGIN_OFFSET: usize = ATTEMPTS_OFFSET + 4;

pub const RECORD_SIZE: usize = LAST_LOGIN_OFFSET + 8;

pub type Record = [u8; RECORD_SIZE];

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub account_number: String,
    pub pin: PinHash,
    pub checking_balance: Decimal,
    pub savings_balance: Decimal,
    pub failed_login_attempts: u32,
    pub last_login_time: DateTime<Utc>,
}

impl Account {
    pub fn new(account_number: &str, pin: PinHash) -> Result<Self, ValidationError> {
        validate_account_number(account_number)?;
        Ok(Account {
            account_number: account_number.to_owned(),
            pin,
            checking_balance: Decimal::ZERO,
            savings_balance: Decimal::ZERO,
            failed_login_attempts: 0,
            last_login_time: DateTime::<Utc>::UNIX_EPOCH,
        })
    }

    /// Fails rather than truncating a key that does not fit its field.
    pub fn to_record(&self) -> Result<Record, ValidationError> {
        validate_account_number(&self.account_number)?;
        let mut record = [0u8; RECORD_SIZE];
        let number = self.account_number.as_bytes();
        record[..number.len()].copy_from_slice(number);
        record[SALT_OFFSET..DIGEST_OFFSET].copy_from_slice(self.pin.salt());
        record[DIGEST_OFFSET..CHECKING_OFFSET].copy_from_slice(self.pin.digest());
        record[CHECKING_OFFSET..SAVINGS_OFFSET].copy_from_slice(&self.checking_balance.serialize());
        record[SAVINGS_OFFSET..ATTEMPTS_OFFSET].copy_from_slice(&self.savings_balance.serialize());
        record[ATTEMPTS_OFFSET..LAST_LOGIN_OFFSET]
            .copy_from_slice(&self.failed_login_attempts.to_le_bytes());
        record[LAST_LOGIN_OFFSET..].copy_from_slice(&self.last_login_time.timestamp().to_le_bytes());
        Ok(record)
    }

    pub fn from_record(record: &Record) -> Option<Self> {
        let account_number = record_key(record)?;
        validate_account_number(account_number).ok()?;

        let pin = PinHash::from_parts(
            field(record, SALT_OFFSET)?,
            field(record, DIGEST_OFFSET)?,
        );
        let checking_balance = Decimal::deserialize(field(record, CHECKING_OFFSET)?);
        let savings_balance = Decimal::deserialize(field(record, SAVINGS_OFFSET)?);
        let failed_login_attempts = u32::from_le_bytes(field(record, ATTEMPTS_OFFSET)?);
        let last_login_time =
            DateTime::from_timestamp(i64::from_le_bytes(field(record, LAST_LOGIN_OFFSET)?), 0)?;

        Some(Account {
            account_number: account_number.to_owned(),
            pin,
            checking_balance,
            savings_balance,
            failed_login_attempts,
            last_login_time,
        })
    }
}

pub fn record_key(record: &Record) -> Option<&str> {
    let raw = &record[..NUMBER_FIELD];
    let end = raw.iter().position(|&b| b == 0)?;
    std::str::from_utf8(&raw[..end]).ok()
}

pub fn validate_account_number(account_number: &str) -> Result<(), ValidationError> {
    let valid = !account_number.is_empty()
        && account_number.len() <= ACCOUNT_NUMBER_MAX_LEN
        && account_number.bytes().all(|b| b.is_ascii_graphic());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidAccountNumber(
            account_number.to_owned(),
        ))
    }
}

#[inline]
fn field<const N: usize>(record: &Record, offset: usize) -> Option<[u8; N]> {
    record.get(offset..offset + N)?.try_into().ok()
}
