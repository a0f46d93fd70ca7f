//! Append-only JSON-lines ledger.
//!
//! Each accepted intent becomes one line in the log file and is durable
//! (`fsync`ed) before its handle is returned, so every recorded entry is
//! immediately `Confirmed`. The idempotency index is rebuilt from the file
//! on open; recorded lines are never rewritten.
//!
//! A failed append is rolled back to the previous file length. If the
//! process dies mid-append instead, the final line has no newline; `open`
//! drops it, since its submitter never received a handle.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use ccv_core::{IdempotencyKey, Timestamp};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::adapter::LedgerAdapter;
use crate::error::LedgerError;
use crate::types::{SignedIntent, TransactionHandle, TransactionStatus};

#[derive(Debug, Serialize, Deserialize)]
struct LogLine {
    seq: u64,
    handle: TransactionHandle,
    recorded_at: Timestamp,
    entry: SignedIntent,
}

#[derive(Debug)]
struct LogState {
    file: File,
    by_key: HashMap<IdempotencyKey, TransactionHandle>,
    handles: HashMap<TransactionHandle, u64>,
    seq: u64,
}

/// Ledger adapter backed by an append-only file.
#[derive(Debug)]
pub struct AppendOnlyLogAdapter {
    path: PathBuf,
    state: Mutex<LogState>,
}

impl AppendOnlyLogAdapter {
    /// Open the log at `path`, creating it if absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source| LedgerError::Io {
            path: path.display().to_string(),
            source,
        };

        let mut by_key = HashMap::new();
        let mut handles = HashMap::new();
        let mut seq = 0;
        let mut complete_len = 0u64;
        let mut torn_line = None;
        if path.exists() {
            let mut reader = BufReader::new(File::open(&path).map_err(io_err)?);
            let mut line = Vec::new();
            let mut n = 0;
            loop {
                line.clear();
                let read = reader.read_until(b'\n', &mut line).map_err(io_err)?;
                if read == 0 {
                    break;
                }
                n += 1;
                if line.last() != Some(&b'\n') {
                    torn_line = Some(n);
                    break;
                }
                complete_len += read as u64;
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                let parsed: LogLine =
                    serde_json::from_slice(&line).map_err(|e| LedgerError::Corrupt {
                        path: path.display().to_string(),
                        line: n,
                        reason: e.to_string(),
                    })?;
                seq = seq.max(parsed.seq);
                by_key.insert(parsed.entry.intent.idempotency_key.clone(), parsed.handle.clone());
                handles.insert(parsed.handle, parsed.seq);
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;
        if let Some(line) = torn_line {
            file.set_len(complete_len).map_err(io_err)?;
            file.sync_data().map_err(io_err)?;
            tracing::warn!(
                path = %path.display(),
                line,
                kept_bytes = complete_len,
                "dropped unterminated final ledger line"
            );
        }
        tracing::info!(path = %path.display(), entries = handles.len(), "ledger log opened");
        Ok(Self {
            state: Mutex::new(LogState {
                file,
                by_key,
                handles,
                seq,
            }),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entry_count(&self) -> usize {
        self.state.lock().handles.len()
    }

    fn io_err(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl LedgerAdapter for AppendOnlyLogAdapter {
    fn submit_transaction(&self, intent: &SignedIntent) -> Result<TransactionHandle, LedgerError> {
        intent.verify()?;
        let mut state = self.state.lock();
        if let Some(existing) = state.by_key.get(intent.idempotency_key()) {
            return Ok(existing.clone());
        }

        let seq = state.seq + 1;
        let line = LogLine {
            seq,
            handle: TransactionHandle::new(format!("log-{seq:08}")),
            recorded_at: Timestamp::now(),
            entry: intent.clone(),
        };
        let mut bytes = serde_json::to_vec(&line).map_err(|e| LedgerError::Rejected {
            adapter: self.adapter_name().to_string(),
            reason: format!("intent not serializable: {e}"),
        })?;
        bytes.push(b'\n');
        let committed_len = state.file.metadata().map_err(|e| self.io_err(e))?.len();
        let appended = state
            .file
            .write_all(&bytes)
            .and_then(|()| state.file.sync_data());
        if let Err(e) = appended {
            if let Err(rollback) = state.file.set_len(committed_len) {
                tracing::error!(
                    path = %self.path.display(),
                    error = %rollback,
                    "could not roll back partial ledger append"
                );
            }
            return Err(self.io_err(e));
        }

        state.seq = seq;
        state
            .by_key
            .insert(intent.idempotency_key().clone(), line.handle.clone());
        state.handles.insert(line.handle.clone(), seq);
        Ok(line.handle)
    }

    fn get_transaction_status(
        &self,
        handle: &TransactionHandle,
    ) -> Result<TransactionStatus, LedgerError> {
        if self.state.lock().handles.contains_key(handle) {
            Ok(TransactionStatus::Confirmed)
        } else {
            Err(LedgerError::NotFound {
                handle: handle.clone(),
            })
        }
    }

    fn adapter_name(&self) -> &str {
        "AppendOnlyLogAdapter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LedgerAction, TransactionIntent};
    use ccv_crypto::Ed25519KeyPair;
    use serde_json::json;

    fn signed(round: u32) -> SignedIntent {
        let at = Timestamp::from_epoch_secs(1_767_225_600).unwrap();
        TransactionIntent::new(LedgerAction::CompleteRound, json!({"round": round}), at)
            .unwrap()
            .sign(&Ed25519KeyPair::from_seed(&[3u8; 32]))
            .unwrap()
    }

    #[test]
    fn entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");

        let log = AppendOnlyLogAdapter::open(&path).unwrap();
        let first = log.submit_transaction(&signed(0)).unwrap();
        let second = log.submit_transaction(&signed(1)).unwrap();
        assert_eq!(first.as_str(), "log-00000001");
        assert_eq!(second.as_str(), "log-00000002");
        drop(log);

        let reopened = AppendOnlyLogAdapter::open(&path).unwrap();
        assert_eq!(reopened.entry_count(), 2);
        assert_eq!(reopened.submit_transaction(&signed(0)).unwrap(), first);
        assert_eq!(
            reopened.get_transaction_status(&second).unwrap(),
            TransactionStatus::Confirmed
        );
        let third = reopened.submit_transaction(&signed(2)).unwrap();
        assert_eq!(third.as_str(), "log-00000003");
    }

    #[test]
    fn corrupt_line_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        std::fs::write(&path, "not json\n").unwrap();
        let err = AppendOnlyLogAdapter::open(&path).unwrap_err();
        assert!(matches!(err, LedgerError::Corrupt { line: 1, .. }));
    }

    #[test]
    fn unterminated_final_line_is_dropped_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let log = AppendOnlyLogAdapter::open(&path).unwrap();
        log.submit_transaction(&signed(0)).unwrap();
        log.submit_transaction(&signed(1)).unwrap();
        drop(log);
        let intact = std::fs::read(&path).unwrap();

        // A crash partway through the third append.
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(br#"{"seq":3,"handle":"log-0000"#).unwrap();
        drop(file);

        let reopened = AppendOnlyLogAdapter::open(&path).unwrap();
        assert_eq!(reopened.entry_count(), 2);
        assert_eq!(std::fs::read(&path).unwrap(), intact);
        let third = reopened.submit_transaction(&signed(2)).unwrap();
        assert_eq!(third.as_str(), "log-00000003");
        drop(reopened);

        let again = AppendOnlyLogAdapter::open(&path).unwrap();
        assert_eq!(again.entry_count(), 3);
    }

    #[test]
    fn corrupt_terminated_line_is_still_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let log = AppendOnlyLogAdapter::open(&path).unwrap();
        log.submit_transaction(&signed(0)).unwrap();
        drop(log);
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"seq\":2\n").unwrap();
        drop(file);

        let err = AppendOnlyLogAdapter::open(&path).unwrap_err();
        assert!(matches!(err, LedgerError::Corrupt { line: 2, .. }));
    }

    #[test]
    fn unknown_handle_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let log = AppendOnlyLogAdapter::open(dir.path().join("ledger.jsonl")).unwrap();
        assert!(matches!(
            log.get_transaction_status(&TransactionHandle::new("log-00000009")),
            Err(LedgerError::NotFound { .. })
        ));
    }
}
