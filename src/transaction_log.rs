use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::transaction::Transaction;

#[derive(Debug, Clone)]
pub struct TransactionLog {
    path: PathBuf,
}

impl TransactionLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        TransactionLog {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, transaction: &Transaction) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::dec;

    #[test]
    fn test_append_one_line_per_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let log = TransactionLog::new(dir.path().join("transactions.log"));

        log.append(&Transaction::deposit(dec!(100), Utc::now())).unwrap();
        log.append(&Transaction::withdrawal(dec!(0.5), Utc::now())).unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Deposit 100.00 "));
        assert!(lines[1].starts_with("Withdrawal 0.50 "));
    }

    #[test]
    fn test_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let log = TransactionLog::new(dir.path().join("missing").join("transactions.log"));
        assert!(log.append(&Transaction::deposit(dec!(1), Utc::now())).is_err());
    }
}
