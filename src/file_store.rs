use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::account::Account;
use crate::account::RECORD_SIZE;
use crate::account::Record;
use crate::account::record_key;
use crate::error::LedgerError;
use crate::store::AccountStore;

// Records are concatenated in creation order. Nothing locks the file
// between processes, so two writers can still corrupt it.
#[derive(Debug, Clone)]
pub struct FileAccountStore {
    path: PathBuf,
}

impl FileAccountStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileAccountStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// `None` when the file does not exist yet.
    fn open_checked(&self, write: bool) -> Result<Option<File>, LedgerError> {
        let file = match OpenOptions::new().read(true).write(write).open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata()?.len();
        if size % RECORD_SIZE as u64 != 0 {
            return Err(LedgerError::CorruptStore { size });
        }
        Ok(Some(file))
    }

    fn scan<T>(
        &self,
        reader: impl Read,
        mut visit: impl FnMut(usize, &Record) -> Result<Option<T>, LedgerError>,
    ) -> Result<Option<(usize, T)>, LedgerError> {
        let mut reader = BufReader::new(reader);
        let mut record = [0u8; RECORD_SIZE];
        let mut index = 0;
        loop {
            match reader.read_exact(&mut record) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
                Err(e) => return Err(e.into()),
            }
            if let Some(found) = visit(index, &record)? {
                return Ok(Some((index, found)));
            }
            index += 1;
        }
    }

    fn compact_into(&self, file: &File, temp_path: &Path, skip: &str) -> Result<(), LedgerError> {
        let mut writer = BufWriter::new(File::create(temp_path)?);
        let mut reader = file;
        reader.seek(SeekFrom::Start(0))?;
        self.scan::<()>(reader, |index, record| {
            if key_of(index, record)? != skip {
                writer.write_all(record)?;
            }
            Ok(None)
        })?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    fn locate(&self, file: &File, account_number: &str) -> Result<Option<usize>, LedgerError> {
        let found = self.scan(file, |index, record| {
            Ok((key_of(index, record)? == account_number).then_some(()))
        })?;
        Ok(found.map(|(index, ())| index))
    }
}

impl AccountStore for FileAccountStore {
    fn is_initialized(&self) -> bool {
        self.path.exists()
    }

    fn find(&self, account_number: &str) -> Result<Option<Account>, LedgerError> {
        let Some(file) = self.open_checked(false)? else {
            return Ok(None);
        };
        let found = self.scan(&file, |index, record| {
            if key_of(index, record)? != account_number {
                return Ok(None);
            }
            decode(index, record).map(Some)
        })?;
        Ok(found.map(|(_, account)| account))
    }

    fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        let Some(file) = self.open_checked(false)? else {
            return Ok(Vec::new());
        };
        let mut accounts = Vec::new();
        self.scan::<()>(&file, |index, record| {
            accounts.push(decode(index, record)?);
            Ok(None)
        })?;
        Ok(accounts)
    }

    fn append(&mut self, account: &Account) -> Result<(), LedgerError> {
        let record = account.to_record()?;
        // Refuse to grow a misaligned file.
        self.open_checked(false)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&record)?;
        file.sync_data()?;
        debug!(account = %account.account_number, path = %self.path.display(), "record appended");
        Ok(())
    }

    fn update(&mut self, account: &Account) -> Result<(), LedgerError> {
        let record = account.to_record()?;
        let not_found = || LedgerError::AccountNotFound(account.account_number.clone());
        let mut file = self.open_checked(true)?.ok_or_else(not_found)?;
        let index = self
            .locate(&file, &account.account_number)?
            .ok_or_else(not_found)?;

        file.seek(SeekFrom::Start((index * RECORD_SIZE) as u64))?;
        file.write_all(&record)?;
        file.sync_data()?;
        debug!(account = %account.account_number, index, "record rewritten");
        Ok(())
    }

    fn delete(&mut self, account_number: &str) -> Result<(), LedgerError> {
        let not_found = || LedgerError::AccountNotFound(account_number.to_owned());
        let file = self.open_checked(false)?.ok_or_else(not_found)?;
        self.locate(&file, account_number)?.ok_or_else(not_found)?;

        let temp_path = self.temp_path();
        let replaced = self
            .compact_into(&file, &temp_path, account_number)
            .and_then(|()| {
                drop(file);
                fs::rename(&temp_path, &self.path)?;
                Ok(())
            });
        if let Err(e) = replaced {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                debug!(error = %cleanup, path = %temp_path.display(), "temp store not removed");
            }
            return Err(e);
        }
        sync_parent_dir(&self.path)?;
        debug!(account = %account_number, path = %self.path.display(), "store compacted");
        Ok(())
    }
}

fn key_of(index: usize, record: &Record) -> Result<&str, LedgerError> {
    record_key(record).ok_or(LedgerError::CorruptRecord { index })
}

fn decode(index: usize, record: &Record) -> Result<Account, LedgerError> {
    Account::from_record(record).ok_or(LedgerError::CorruptRecord { index })
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => File::open(dir)?.sync_all(),
        _ => File::open(".")?.sync_all(),
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
