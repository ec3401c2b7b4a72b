use std::io::BufRead;
use std::io::Write;
use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::error;

use crate::account::Account;
use crate::atm_engine::AtmEngine;
use crate::credential::Pin;
use crate::error::LedgerError;
use crate::error::ValidationError;
use crate::store::AccountStore;

// PINs are read as plain lines; masking is left to the terminal.
pub struct Console<'e, S: AccountStore, R, W> {
    engine: &'e mut AtmEngine<S>,
    input: R,
    output: W,
}

enum SessionEnd {
    LoggedOut,
    Deleted,
    InputClosed,
}

impl<'e, S, R, W> Console<'e, S, R, W>
where
    S: AccountStore,
    R: BufRead,
    W: Write,
{
    pub fn new(engine: &'e mut AtmEngine<S>, input: R, output: W) -> Self {
        Console {
            engine,
            input,
            output,
        }
    }

    /// Only corruption of the store is treated as fatal.
    pub fn run(&mut self) -> Result<(), LedgerError> {
        loop {
            writeln!(self.output, "\n------ ATM System ------")?;
            writeln!(self.output, "1. Create Account")?;
            writeln!(self.output, "2. Login")?;
            writeln!(self.output, "3. Exit")?;
            let Some(choice) = self.prompt("Enter your choice: ")? else {
                return Ok(());
            };
            let outcome = match choice.as_str() {
                "1" => self.create_account(),
                "2" => self.login(),
                "3" => {
                    writeln!(self.output, "Exiting... Thank you!")?;
                    return Ok(());
                }
                _ => {
                    writeln!(self.output, "Invalid choice! Try again.")?;
                    Ok(true)
                }
            };
            match outcome {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                Err(e) => self.report(e)?,
            }
        }
    }

    fn report(&mut self, e: LedgerError) -> Result<(), LedgerError> {
        match e {
            LedgerError::CorruptStore { .. } | LedgerError::CorruptRecord { .. } => {
                error!(error = %e, "account store is unusable");
                Err(e)
            }
            e => {
                writeln!(self.output, "{}", e)?;
                Ok(())
            }
        }
    }

    fn prompt(&mut self, message: &str) -> Result<Option<String>, LedgerError> {
        write!(self.output, "{}", message)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn prompt_new_pin(&mut self, message: &str) -> Result<Option<Pin>, LedgerError> {
        loop {
            let Some(raw) = self.prompt(message)? else {
                return Ok(None);
            };
            match Pin::parse(&raw) {
                Ok(pin) => return Ok(Some(pin)),
                Err(_) => writeln!(self.output, "Invalid PIN! Please enter exactly 4 digits.")?,
            }
        }
    }

    fn prompt_amount(&mut self, message: &str) -> Result<Option<Option<Decimal>>, LedgerError> {
        Ok(self
            .prompt(message)?
            .map(|raw| Decimal::from_str(&raw).ok()))
    }

    // Ok(false) means input ended.
    fn create_account(&mut self) -> Result<bool, LedgerError> {
        let Some(number) = self.prompt("Enter Account Number: ")? else {
            return Ok(false);
        };
        if self.engine.store().exists(&number)? {
            writeln!(self.output, "Account number already exists! Try a different one.")?;
            return Ok(true);
        }
        let Some(pin) = self.prompt_new_pin("Set a 4-digit PIN: ")? else {
            return Ok(false);
        };
        self.engine.create_account(&number, &pin)?;
        writeln!(self.output, "Account created successfully!")?;
        Ok(true)
    }

    fn login(&mut self) -> Result<bool, LedgerError> {
        let Some(number) = self.prompt("Enter Account Number: ")? else {
            return Ok(false);
        };
        let Some(pin) = self.prompt("Enter PIN: ")? else {
            return Ok(false);
        };
        let account = self.engine.login(&number, &pin)?;
        writeln!(self.output, "Login successful!")?;
        match self.session(account)? {
            SessionEnd::InputClosed => Ok(false),
            SessionEnd::LoggedOut | SessionEnd::Deleted => Ok(true),
        }
    }

    fn session(&mut self, mut account: Account) -> Result<SessionEnd, LedgerError> {
        loop {
            writeln!(self.output, "\n------ ATM Menu ------")?;
            writeln!(self.output, "1. Deposit Money")?;
            writeln!(self.output, "2. Withdraw Money")?;
            writeln!(self.output, "3. Check Balance")?;
            writeln!(self.output, "4. Change PIN")?;
            writeln!(self.output, "5. Apply Interest")?;
            writeln!(self.output, "6. Delete Account")?;
            writeln!(self.output, "7. Logout")?;
            let Some(choice) = self.prompt("Enter your choice: ")? else {
                self.engine.logout(&account)?;
                return Ok(SessionEnd::InputClosed);
            };
            let result = match choice.as_str() {
                "1" => self.deposit(&mut account),
                "2" => self.withdraw(&mut account),
                "3" => {
                    let balance = self.engine.balance(&account);
                    writeln!(self.output, "Checking balance: ${:.2}", balance.checking)?;
                    writeln!(self.output, "Savings balance: ${:.2}", balance.savings)?;
                    Ok(true)
                }
                "4" => self.change_pin(&mut account),
                "5" => self.apply_interest(&mut account),
                "6" => {
                    self.engine.delete_account(account)?;
                    writeln!(self.output, "Account deleted successfully.")?;
                    return Ok(SessionEnd::Deleted);
                }
                "7" => {
                    self.engine.logout(&account)?;
                    writeln!(self.output, "Logging out...")?;
                    return Ok(SessionEnd::LoggedOut);
                }
                _ => {
                    writeln!(self.output, "Invalid choice! Try again.")?;
                    Ok(true)
                }
            };
            match result {
                Ok(true) => {}
                Ok(false) => {
                    self.engine.logout(&account)?;
                    return Ok(SessionEnd::InputClosed);
                }
                Err(e) => self.report(e)?,
            }
        }
    }

    fn deposit(&mut self, account: &mut Account) -> Result<bool, LedgerError> {
        let Some(amount) = self.prompt_amount("Enter amount to deposit: ")? else {
            return Ok(false);
        };
        let Some(amount) = amount else {
            writeln!(self.output, "Invalid amount!")?;
            return Ok(true);
        };
        let balance = self.engine.deposit(account, amount)?;
        writeln!(self.output, "Deposit successful! New checking balance: ${:.2}", balance)?;
        Ok(true)
    }

    fn withdraw(&mut self, account: &mut Account) -> Result<bool, LedgerError> {
        let Some(amount) = self.prompt_amount("Enter amount to withdraw: ")? else {
            return Ok(false);
        };
        let Some(amount) = amount else {
            writeln!(self.output, "Invalid amount!")?;
            return Ok(true);
        };
        let balance = self.engine.withdraw(account, amount)?;
        writeln!(self.output, "Withdrawal successful! New checking balance: ${:.2}", balance)?;
        Ok(true)
    }

    fn apply_interest(&mut self, account: &mut Account) -> Result<bool, LedgerError> {
        let balance = self.engine.apply_interest(account)?;
        writeln!(self.output, "Interest applied! New checking balance: ${:.2}", balance)?;
        Ok(true)
    }

    fn change_pin(&mut self, account: &mut Account) -> Result<bool, LedgerError> {
        let Some(current) = self.prompt("Enter current PIN: ")? else {
            return Ok(false);
        };
        match self.engine.check_current_pin(account, &current) {
            Ok(()) => {}
            Err(LedgerError::Validation(ValidationError::PinMismatch)) => {
                writeln!(self.output, "Incorrect current PIN!")?;
                return Ok(true);
            }
            Err(e) => return Err(e),
        }
        let Some(new_pin) = self.prompt_new_pin("Enter new PIN: ")? else {
            return Ok(false);
        };
        self.engine.change_pin(account, &current, &new_pin)?;
        writeln!(self.output, "PIN changed successfully!")?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::MemoryAccountStore;
    use rust_decimal::dec;
    use tempfile::TempDir;

    fn engine(dir: &TempDir) -> AtmEngine<MemoryAccountStore> {
        AtmEngine::new(MemoryAccountStore::new(), &Config::default().in_dir(dir.path())).unwrap()
    }

    fn run_script(engine: &mut AtmEngine<MemoryAccountStore>, script: &str) -> String {
        let mut output = Vec::new();
        Console::new(engine, script.as_bytes(), &mut output)
            .run()
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_full_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(&dir);

        let script = "1\n1001\n12\n1234\n\
                      2\n1001\n1234\n\
                      1\n100\n\
                      2\n500\n\
                      2\n40\n\
                      5\n\
                      3\n\
                      7\n\
                      3\n";
        let output = run_script(&mut engine, script);

        assert!(output.contains("Invalid PIN! Please enter exactly 4 digits."));
        assert!(output.contains("Account created successfully!"));
        assert!(output.contains("Login successful!"));
        assert!(output.contains("Deposit successful! New checking balance: $100.00"));
        assert!(output.contains("Insufficient funds for withdrawal"));
        assert!(output.contains("Withdrawal successful! New checking balance: $60.00"));
        assert!(output.contains("Interest applied! New checking balance: $61.20"));
        assert!(output.contains("Checking balance: $61.20"));
        assert!(output.contains("Logging out..."));
        assert!(output.ends_with("Exiting... Thank you!\n"));

        let stored = engine.store().find("1001").unwrap().unwrap();
        assert_eq!(stored.checking_balance, dec!(61.20));
    }

    #[test]
    fn test_login_errors_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(&dir);

        let output = run_script(&mut engine, "2\n1001\n1234\n3\n");
        assert!(output.contains("No accounts found"));

        let output = run_script(
            &mut engine,
            "1\n1001\n1234\n1\n1001\n2\n1001\n0000\n2\n1001\n0000\n2\n1001\n0000\n2\n1001\n1234\n",
        );
        assert!(output.contains("Account number already exists!"));
        assert!(output.contains("Invalid account number or PIN"));
        assert!(output.contains("Account is locked: 1001"));
        assert!(!output.contains("Login successful!"));
    }

    #[test]
    fn test_change_pin_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(&dir);

        let script = "1\n1001\n1234\n\
                      2\n1001\n1234\n\
                      4\n9999\n\
                      4\n1234\nabcd\n4321\n\
                      7\n\
                      2\n1001\n4321\n\
                      6\n\
                      3\n";
        let output = run_script(&mut engine, script);

        assert!(output.contains("Incorrect current PIN!"));
        assert!(output.contains("PIN changed successfully!"));
        assert!(output.contains("Account deleted successfully."));
        assert!(!engine.store().exists("1001").unwrap());
    }

    #[test]
    fn test_wrong_current_pin_is_audited() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(&dir);

        let script = "1\n1001\n1234\n\
                      2\n1001\n1234\n\
                      4\n9999\n\
                      7\n\
                      3\n";
        let output = run_script(&mut engine, script);
        assert!(output.contains("Incorrect current PIN!"));

        let log = std::fs::read_to_string(dir.path().join("security.log")).unwrap();
        assert!(log.contains("PIN change rejected for account 1001"));
        assert!(!log.contains("PIN changed for account 1001"));
    }

    #[test]
    fn test_input_end_logs_out() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(&dir);

        run_script(&mut engine, "1\n1001\n1234\n2\n1001\n1234\n1\n10\n");
        let stored = engine.store().find("1001").unwrap().unwrap();
        assert_eq!(stored.checking_balance, dec!(10));
    }
}
