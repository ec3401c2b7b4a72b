use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use fs2::FileExt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityEvent {
    AccountCreated { account: String },
    LoginSucceeded { account: String },
    LoginFailed { account: String, attempts_left: u32 },
    AccountLocked { account: String, attempts: u32 },
    LockedLoginRefused { account: String },
    LockoutExpired { account: String },
    PinChanged { account: String },
    PinChangeRejected { account: String },
    AccountDeleted { account: String },
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SecurityEvent::AccountCreated { account } => {
                write!(f, "Account {} created", account)
            }
            SecurityEvent::LoginSucceeded { account } => {
                write!(f, "Successful login for account {}", account)
            }
            SecurityEvent::LoginFailed {
                account,
                attempts_left,
            } => write!(
                f,
                "Failed login for account {} ({} attempts left)",
                account, attempts_left
            ),
            SecurityEvent::AccountLocked { account, attempts } => write!(
                f,
                "Account {} locked after {} failed login attempts",
                account, attempts
            ),
            SecurityEvent::LockedLoginRefused { account } => {
                write!(f, "Login refused for locked account {}", account)
            }
            SecurityEvent::LockoutExpired { account } => {
                write!(f, "Lockout expired for account {}", account)
            }
            SecurityEvent::PinChanged { account } => {
                write!(f, "PIN changed for account {}", account)
            }
            SecurityEvent::PinChangeRejected { account } => {
                write!(f, "PIN change rejected for account {}", account)
            }
            SecurityEvent::AccountDeleted { account } => {
                write!(f, "Account {} deleted", account)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecurityEventLog {
    path: PathBuf,
}

impl SecurityEventLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        SecurityEventLog {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, event: &SecurityEvent, at: DateTime<Utc>) -> std::io::Result<()> {
        let line = format!(
            "{} - {}\n",
            at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            event
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        FileExt::lock_exclusive(&file)?;
        let written = file.write_all(line.as_bytes()).and_then(|()| file.flush());
        let unlocked = FileExt::unlock(&file);
        written.and(unlocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_line_format() {
        let dir = tempfile::tempdir().unwrap();
        let log = SecurityEventLog::new(dir.path().join("security.log"));
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        log.append(
            &SecurityEvent::AccountLocked {
                account: "1001".to_string(),
                attempts: 3,
            },
            at,
        )
        .unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let expected = format!(
            "{} - Account 1001 locked after 3 failed login attempts\n",
            at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        );
        assert_eq!(contents, expected);
    }

    #[test]
    fn test_concurrent_appends_keep_lines_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("security.log");

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let log = SecurityEventLog::new(&path);
                thread::spawn(move || {
                    for _ in 0..25 {
                        log.append(
                            &SecurityEvent::LoginSucceeded {
                                account: format!("ACC{}", n),
                            },
                            Utc::now(),
                        )
                        .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 200);
        for line in lines {
            assert!(line.contains(" - Successful login for account ACC"), "{line}");
        }
    }
}
