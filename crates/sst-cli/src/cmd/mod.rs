pub mod completions;
pub mod edit;
pub mod forward;
pub mod history;
pub mod init;
pub mod meta;
pub mod ranges;
pub mod report;
pub mod reset;
pub mod show;
pub mod sync;
pub mod units;
pub mod watch;

use chrono::NaiveDate;
use sst_core::ErrorCode;
use sst_core::model::StatusKind;

fn invalid(code: ErrorCode, raw: &str) -> String {
    match code.hint() {
        Some(hint) => format!("{} '{raw}' [{code}]. {hint}", code.message()),
        None => format!("{} '{raw}' [{code}]", code.message()),
    }
}

/// Clap value parser for ISO calendar dates.
pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| invalid(ErrorCode::InvalidDate, raw))
}

/// Clap value parser for status names (`locked`, `o`, `Issue`, ...).
pub fn parse_status(raw: &str) -> Result<StatusKind, String> {
    raw.parse().map_err(|_| invalid(ErrorCode::InvalidStatus, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_must_be_iso() {
        assert_eq!(
            parse_date("2024-01-10"),
            Ok(NaiveDate::from_ymd_opt(2024, 1, 10).expect("valid"))
        );
        let err = parse_date("10/01/2024").expect_err("not iso");
        assert!(err.contains("E2003"), "{err}");
        assert!(parse_date("2024-02-30").is_err());
    }

    #[test]
    fn statuses_accept_names_and_letters() {
        assert_eq!(parse_status("Overlocked"), Ok(StatusKind::Overlocked));
        assert_eq!(parse_status("i"), Ok(StatusKind::Issue));
        assert!(parse_status("paid").expect_err("unknown").contains("E2002"));
    }
}
