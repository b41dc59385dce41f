//! Folio allocation.
//!
//! Folios are `{prefix}-{number}` with the number zero-padded and
//! strictly increasing across the whole population. The store owns the
//! atomic increment; this module only formats, and degrades to a
//! timestamp-derived folio when the store cannot allocate, so intake
//! keeps moving during a storage incident.

use remit_storage::DepositStore;

/// Next folio for `prefix`, e.g. `NC-000042`.
pub async fn next_identifier<S: DepositStore>(store: &S, prefix: &str, width: usize) -> String {
    match store.next_sequence_value(prefix).await {
        Ok(n) => format!("{}-{:0width$}", prefix, n, width = width),
        Err(err) => {
            tracing::warn!(
                prefix,
                error = %err,
                "sequence allocation failed, falling back to timestamp folio"
            );
            let ts = time::OffsetDateTime::now_utc().unix_timestamp();
            format!("{}-T{}", prefix, ts)
        }
    }
}

/// RFC 3339 UTC timestamp at second precision.
pub(crate) fn now_iso8601() -> String {
    let now = time::OffsetDateTime::now_utc();
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}
