//! Per-invocation state shared by command handlers.

use anyhow::Result;
use chrono::NaiveDate;
use sst_core::ErrorCode;
use sst_core::config::{
    self, Config, EnvOverrides, RemoteTarget, STORE_FILE, SYNC_LOCK_FILE,
};
use sst_core::lock::SyncGate;
use sst_core::model::Unit;
use sst_core::model::range::units_from_ranges;
use sst_core::store::{LocalStore, SqliteStore};
use std::path::{Path, PathBuf};

use crate::output::{CliError, OutputMode, fail};

/// Resolved data directory, config, selected date, and output mode.
#[derive(Debug, Clone)]
pub struct CmdContext {
    pub data_dir: PathBuf,
    pub config: Config,
    pub date: NaiveDate,
    pub output: OutputMode,
}

impl CmdContext {
    /// Resolve the data directory and load its config with environment
    /// overrides applied.
    ///
    /// # Errors
    ///
    /// Returns a reported error when no data directory can be found or the
    /// config file is unreadable.
    pub fn resolve(
        data_dir_flag: Option<&Path>,
        date: NaiveDate,
        output: OutputMode,
    ) -> Result<Self> {
        let env = EnvOverrides::from_env();
        let data_dir = config::resolve_data_dir(data_dir_flag, &env)
            .map_err(|err| fail(output, CliError::new(format!("{err:#}"))))?;
        let config = config::resolve_config(&data_dir, &env).map_err(|err| {
            fail(
                output,
                CliError::coded(ErrorCode::ConfigParseError, format!("{err:#}")),
            )
        })?;
        tracing::debug!(data_dir = %data_dir.display(), %date, "resolved context");
        Ok(Self {
            data_dir,
            config,
            date,
            output,
        })
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE)
    }

    pub fn is_initialized(&self) -> bool {
        self.store_path().exists()
    }

    /// Open the store of an initialized data directory.
    ///
    /// # Errors
    ///
    /// Reports `NotInitialized` when `sst init` has not run here, or the
    /// store error when SQLite cannot open the file.
    pub fn open_store(&self) -> Result<LocalStore<SqliteStore>> {
        if !self.is_initialized() {
            return Err(self.fail(CliError::coded(
                ErrorCode::NotInitialized,
                format!("no sst store in {}", self.data_dir.display()),
            )));
        }
        self.create_store()
    }

    /// Open the store, creating the database file when missing.
    ///
    /// # Errors
    ///
    /// Reports the store error when SQLite cannot open or migrate the file.
    pub fn create_store(&self) -> Result<LocalStore<SqliteStore>> {
        SqliteStore::open(&self.store_path())
            .map(LocalStore::new)
            .map_err(|err| self.fail(CliError::from(&err)))
    }

    /// Reject units outside the configured ranges.
    ///
    /// # Errors
    ///
    /// Reports `UnitNotFound`, or the store error when ranges cannot be read.
    pub fn require_unit(&self, store: &LocalStore<SqliteStore>, unit: Unit) -> Result<()> {
        let ranges = store.ranges().map_err(|err| self.fail(CliError::from(&err)))?;
        if units_from_ranges(&ranges).contains(&unit) {
            Ok(())
        } else {
            Err(self.fail(CliError::coded(
                ErrorCode::UnitNotFound,
                format!("unit {unit} is not in any configured range"),
            )))
        }
    }

    /// The configured remote.
    ///
    /// # Errors
    ///
    /// Reports `SyncNotConfigured` when no endpoint is set.
    pub fn remote(&self) -> Result<RemoteTarget> {
        self.config.sync.remote().ok_or_else(|| {
            self.fail(CliError::coded(
                ErrorCode::SyncNotConfigured,
                "no sync endpoint configured",
            ))
        })
    }

    /// Gate shared by every `sst` process using this data directory.
    pub fn sync_gate(&self) -> SyncGate {
        SyncGate::with_lock_file(self.data_dir.join(SYNC_LOCK_FILE))
    }

    pub fn fail(&self, error: CliError) -> anyhow::Error {
        fail(self.output, error)
    }
}
