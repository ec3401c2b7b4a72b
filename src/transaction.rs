use std::fmt;

use chrono::{DateTime, Local, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub tx_type: TransactionType,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn deposit(amount: Decimal, timestamp: DateTime<Utc>) -> Self {
        Transaction {
            tx_type: TransactionType::Deposit,
            amount,
            timestamp,
        }
    }

    pub fn withdrawal(amount: Decimal, timestamp: DateTime<Utc>) -> Self {
        Transaction {
            tx_type: TransactionType::Withdrawal,
            amount,
            timestamp,
        }
    }
}

/// One audit line: `<type> <amount> <ctime-style local time>`.
impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {:.2} {}",
            self.tx_type,
            self.amount,
            self.timestamp.with_timezone(&Local).format("%a %b %e %H:%M:%S %Y")
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    Deposit,
    Withdrawal,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransactionType::Deposit => f.write_str("Deposit"),
            TransactionType::Withdrawal => f.write_str("Withdrawal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    #[test]
    fn test_transaction_line() {
        let timestamp = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let line = Transaction::deposit(dec!(50), timestamp).to_string();

        let expected_time = timestamp
            .with_timezone(&Local)
            .format("%a %b %e %H:%M:%S %Y")
            .to_string();
        assert_eq!(line, format!("Deposit 50.00 {}", expected_time));
    }

    #[test]
    fn test_amount_has_two_decimals() {
        let timestamp = DateTime::from_timestamp(0, 0).unwrap();
        let line = Transaction::withdrawal(dec!(12.5), timestamp).to_string();
        assert!(line.starts_with("Withdrawal 12.50 "));
    }
}
