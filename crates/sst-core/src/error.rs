use std::fmt;

/// Machine-readable error codes for scripts and operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    SyncNotConfigured,
    UnitNotFound,
    InvalidStatus,
    InvalidDate,
    StoreUnavailable,
    CorruptDocument,
    TransportFailed,
    MalformedRemoteSnapshot,
    UnsupportedSnapshotVersion,
    SnapshotEncodeFailed,
    SyncBusy,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::SyncNotConfigured => "E1003",
            Self::UnitNotFound => "E2001",
            Self::InvalidStatus => "E2002",
            Self::InvalidDate => "E2003",
            Self::StoreUnavailable => "E3001",
            Self::CorruptDocument => "E3002",
            Self::TransportFailed => "E4001",
            Self::MalformedRemoteSnapshot => "E4002",
            Self::UnsupportedSnapshotVersion => "E4003",
            Self::SnapshotEncodeFailed => "E4004",
            Self::SyncBusy => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Data directory not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::SyncNotConfigured => "Sync endpoint not configured",
            Self::UnitNotFound => "Unit not in configured ranges",
            Self::InvalidStatus => "Invalid status value",
            Self::InvalidDate => "Invalid calendar date",
            Self::StoreUnavailable => "Local store unavailable",
            Self::CorruptDocument => "Corrupt local document",
            Self::TransportFailed => "Remote request failed",
            Self::MalformedRemoteSnapshot => "Malformed remote snapshot",
            Self::UnsupportedSnapshotVersion => "Unsupported remote snapshot version",
            Self::SnapshotEncodeFailed => "Snapshot encoding failed",
            Self::SyncBusy => "Sync already in progress",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `sst init` to create the data directory."),
            Self::ConfigParseError => Some("Fix syntax in config.toml and retry."),
            Self::SyncNotConfigured => {
                Some("Set sync.endpoint and sync.api_key in config.toml, or SST_ENDPOINT/SST_API_KEY.")
            }
            Self::UnitNotFound => Some("Check `sst ranges list` or add a range covering the unit."),
            Self::InvalidStatus => Some("Use one of: locked, vacant, overlocked, issue."),
            Self::InvalidDate => Some("Use an ISO date such as 2024-01-10."),
            Self::StoreUnavailable => Some("Check disk space and permissions on the data directory."),
            Self::CorruptDocument => {
                Some("Pull a fresh copy with `sst sync`, or wipe local data with `sst reset`.")
            }
            Self::TransportFailed => Some("Check connectivity and credentials, then run `sst sync` again."),
            Self::MalformedRemoteSnapshot => {
                Some("The remote holds data this client cannot read; local state was left untouched.")
            }
            Self::UnsupportedSnapshotVersion => Some("Upgrade sst on this device."),
            Self::SnapshotEncodeFailed | Self::InternalUnexpected => {
                Some("Retry once. If persistent, report a bug with logs.")
            }
            Self::SyncBusy => Some("Another sync is running; it will carry these changes."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::NotInitialized,
            ErrorCode::ConfigParseError,
            ErrorCode::SyncNotConfigured,
            ErrorCode::UnitNotFound,
            ErrorCode::InvalidStatus,
            ErrorCode::InvalidDate,
            ErrorCode::StoreUnavailable,
            ErrorCode::CorruptDocument,
            ErrorCode::TransportFailed,
            ErrorCode::MalformedRemoteSnapshot,
            ErrorCode::UnsupportedSnapshotVersion,
            ErrorCode::SnapshotEncodeFailed,
            ErrorCode::SyncBusy,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::MalformedRemoteSnapshot.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }
}
