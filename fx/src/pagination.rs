//! Flattening and pagination of historical rate series.

use exrate_common::{parse_iso_date, FlattenedRateEntry, HistoryResult, PaginatedHistory};

use crate::error::{FxError, FxResult};

/// Page selection for history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Page number (1-indexed).
    pub page: u32,
    /// Rows per page.
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Reject a zero page or page size.
    pub fn validate(&self) -> FxResult<()> {
        if self.page == 0 {
            return Err(FxError::InvalidRequest("page must be at least 1".to_string()));
        }
        if self.page_size == 0 {
            return Err(FxError::InvalidRequest(
                "page size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Index of the first row on this page.
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize).saturating_mul(self.page_size as usize)
    }
}

/// Flatten a history into one row per (date, currency), sorted by date.
///
/// The sort is stable, so rows sharing a date keep the order of the
/// date's rate table. A malformed date key is reported against
/// `source_name`, the source the history came from.
pub fn flatten(source_name: &str, history: &HistoryResult) -> FxResult<Vec<FlattenedRateEntry>> {
    let mut rows = Vec::with_capacity(history.record_count());

    for (key, table) in &history.rates {
        let date = parse_iso_date(key).ok_or_else(|| {
            FxError::permanent(source_name, format!("invalid date key '{key}' in history"))
        })?;

        rows.extend(table.iter().map(|(currency, rate)| FlattenedRateEntry {
            date,
            currency: currency.clone(),
            rate: *rate,
        }));
    }

    rows.sort_by_key(|row| row.date);
    Ok(rows)
}

/// Select one page of the flattened history.
///
/// A page past the end yields no rows. `page` and `page_size` are echoed
/// back unchanged.
pub fn paginate(
    source_name: &str,
    history: &HistoryResult,
    request: PageRequest,
) -> FxResult<PaginatedHistory> {
    request.validate()?;

    let rows = flatten(source_name, history)?;
    let total_records = rows.len();

    let rows = rows
        .into_iter()
        .skip(request.offset())
        .take(request.page_size as usize)
        .collect();

    Ok(PaginatedHistory {
        base_currency: history.base.clone(),
        page: request.page,
        page_size: request.page_size,
        total_records,
        rows,
    })
}
