//! Built-in live queries
//!
//! Plain functions over a [`ReadScope`]; pass them (or the closures the
//! parameterised builders return) to [`LiveQueries::subscribe`](super::LiveQueries::subscribe).

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use shared::models::{CatalogItem, PROFILE_KEY, Profile, Quote, QuoteStatus};
use shared::util::display_date;

use crate::store::{ReadScope, StorageResult};

/// Pending quotes older than this many days count as overdue
pub const STALE_AFTER_DAYS: i64 = 7;

/// All quotes, newest first (ties broken by folio, highest first)
pub fn all_quotes_newest_first(scope: &ReadScope) -> StorageResult<Vec<Quote>> {
    let mut quotes = scope.scan_all::<Quote>()?;
    sort_newest_first(&mut quotes);
    Ok(quotes)
}

/// Catalog ordered by category, then description
pub fn catalog_items(scope: &ReadScope) -> StorageResult<Vec<CatalogItem>> {
    let mut items = scope.scan_all::<CatalogItem>()?;
    items.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then_with(|| a.description.cmp(&b.description))
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(items)
}

/// Stored profile, or the defaults when none exists yet
pub fn profile_or_default(scope: &ReadScope) -> StorageResult<Profile> {
    Ok(scope.get::<Profile>(PROFILE_KEY)?.unwrap_or_default())
}

/// Unique client names seen on past quotes, sorted
pub fn client_suggestions(scope: &ReadScope) -> StorageResult<Vec<String>> {
    let names: BTreeSet<String> = scope
        .scan_all::<Quote>()?
        .into_iter()
        .map(|q| q.client_name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    Ok(names.into_iter().collect())
}

/// Quotes whose client, folio or display date contains `term`
/// (case-insensitive), newest first. A blank term matches everything.
pub fn search_quotes(term: impl Into<String>) -> impl Fn(&ReadScope) -> StorageResult<Vec<Quote>> + Send + Sync + 'static {
    let term = term.into().trim().to_lowercase();
    move |scope| {
        let mut quotes: Vec<Quote> = scope
            .scan_all::<Quote>()?
            .into_iter()
            .filter(|q| quote_matches(q, &term))
            .collect();
        sort_newest_first(&mut quotes);
        Ok(quotes)
    }
}

pub fn quotes_by_status(status: QuoteStatus) -> impl Fn(&ReadScope) -> StorageResult<Vec<Quote>> + Send + Sync + 'static {
    move |scope| {
        let mut quotes: Vec<Quote> = scope
            .scan_all::<Quote>()?
            .into_iter()
            .filter(|q| q.status == status)
            .collect();
        sort_newest_first(&mut quotes);
        Ok(quotes)
    }
}

/// Pending quotes at least [`STALE_AFTER_DAYS`] old relative to `now`,
/// oldest first
pub fn stale_pending_quotes(now: DateTime<Utc>) -> impl Fn(&ReadScope) -> StorageResult<Vec<Quote>> + Send + Sync + 'static {
    move |scope| {
        let mut quotes: Vec<Quote> = scope
            .scan_all::<Quote>()?
            .into_iter()
            .filter(|q| q.status == QuoteStatus::Pending && age_in_days(q.date, now) >= STALE_AFTER_DAYS)
            .collect();
        quotes.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.folio.cmp(&b.folio)));
        Ok(quotes)
    }
}

/// Paid total for one calendar month (`YYYY-MM`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyRevenue {
    pub month: String,
    pub total: Decimal,
}

/// Paid revenue for the `months` calendar months ending with the month of
/// `now`, oldest first. Months without paid quotes report zero.
pub fn paid_revenue_by_month(
    now: DateTime<Utc>,
    months: u32,
) -> impl Fn(&ReadScope) -> StorageResult<Vec<MonthlyRevenue>> + Send + Sync + 'static {
    let current = now.year() * 12 + now.month0() as i32;
    move |scope| {
        let quotes = scope.scan_all::<Quote>()?;
        let revenue = (0..months as i32)
            .rev()
            .map(|back| {
                let index = current - back;
                let (year, month) = (index.div_euclid(12), index.rem_euclid(12) as u32 + 1);
                let total = quotes
                    .iter()
                    .filter(|q| {
                        q.status == QuoteStatus::Paid && q.date.year() == year && q.date.month() == month
                    })
                    .fold(Decimal::ZERO, |acc, q| acc.saturating_add(q.total));
                MonthlyRevenue {
                    month: format!("{year:04}-{month:02}"),
                    total,
                }
            })
            .collect();
        Ok(revenue)
    }
}

fn sort_newest_first(quotes: &mut [Quote]) {
    quotes.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.folio.cmp(&a.folio)));
}

fn quote_matches(quote: &Quote, term: &str) -> bool {
    term.is_empty()
        || quote.client_name.to_lowercase().contains(term)
        || quote.folio.contains(term)
        || display_date(&quote.date).to_lowercase().contains(term)
}

/// Whole days between `date` and `now`, rounded up
fn age_in_days(date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    let elapsed = (now - date).num_milliseconds().abs();
    (elapsed + DAY_MS - 1) / DAY_MS
}
