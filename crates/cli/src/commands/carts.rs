//! Cart maintenance commands.

use chrono::{DateTime, Duration, Utc};
use enf_storefront::db::CartRepository;

use super::{CommandError, connect};

/// The moment `older_than_days` days before `now`.
fn cutoff(now: DateTime<Utc>, older_than_days: u32) -> Result<DateTime<Utc>, CommandError> {
    Duration::try_days(i64::from(older_than_days))
        .and_then(|age| now.checked_sub_signed(age))
        .ok_or_else(|| {
            CommandError::InvalidArgument(format!(
                "--older-than-days {older_than_days} reaches before the earliest representable date"
            ))
        })
}

/// Delete carts not modified within the last `older_than_days` days.
///
/// # Errors
///
/// Returns an error if the age is out of range or the database operation
/// fails.
pub async fn purge(older_than_days: u32) -> Result<(), CommandError> {
    let cutoff = cutoff(Utc::now(), older_than_days)?;
    let pool = connect().await?;

    let deleted = CartRepository::new(&pool).delete_stale(cutoff).await?;

    tracing::info!(deleted, %cutoff, "Stale carts purged");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_cutoff_counts_back_whole_days() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        let expected = Utc.with_ymd_and_hms(2026, 9, 16, 12, 0, 0).unwrap();
        assert_eq!(cutoff(now, 30).unwrap(), expected);
        assert_eq!(cutoff(now, 0).unwrap(), now);
    }

    #[test]
    fn test_cutoff_out_of_range_is_an_error() {
        let err = cutoff(Utc::now(), 4_000_000_000).unwrap_err();
        assert!(matches!(err, CommandError::InvalidArgument(_)));
    }
}
