//! Quote lifecycle: drafts, saves, duplicates, status and deletion

use chrono::Utc;
use rust_decimal::Decimal;
use shared::models::catalog::DEFAULT_UNIT;
use shared::models::{CatalogItem, Quote, QuoteItem, QuoteStatus, RawNumber, Template};
use shared::util::generate_id;
use tracing::{info, warn};

use super::folio::FolioSequencer;
use super::money::{calculate_item_totals, normalize_total};
use crate::audit_log;
use crate::common::{AppError, AppResult};
use crate::live::queries;
use crate::store::{Storage, TableName};
use crate::utils::validation::{
    MAX_DESCRIPTION_LEN, MAX_NAME_LEN, validate_optional_text, validate_phone, validate_required_text,
};

const COPY_SUFFIX: &str = " (Copy)";

/// Outcome of [`QuoteService::save`]
#[derive(Debug, Clone, PartialEq)]
pub struct SavedQuote {
    pub quote: Quote,
    /// `true` when this save inserted the quote and consumed a folio
    pub created: bool,
}

/// Owns the quote table and the folio sequencer
pub struct QuoteService {
    storage: Storage,
    sequencer: FolioSequencer,
}

impl QuoteService {
    pub fn new(storage: Storage) -> Self {
        let sequencer = FolioSequencer::new(storage.clone());
        Self { storage, sequencer }
    }

    pub fn sequencer(&self) -> &FolioSequencer {
        &self.sequencer
    }

    /// Unsaved quote with a reserved folio and one blank item
    pub fn new_draft(&self) -> AppResult<Quote> {
        Ok(Quote {
            id: generate_id(),
            folio: self.sequencer.reserve_next_folio()?,
            date: Utc::now(),
            title: None,
            client_name: String::new(),
            client_phone: String::new(),
            items: vec![QuoteItem::blank(generate_id())],
            status: QuoteStatus::Pending,
            discount_rate: Decimal::ZERO,
            tax_rate: Decimal::ZERO,
            total: Decimal::ZERO,
            signature: None,
        })
    }

    /// Validate, recompute the total and persist.
    ///
    /// A quote whose id is not stored yet consumes its reserved folio in
    /// the same transaction as the insert. An existing quote keeps its
    /// stored folio and never touches the counter. A sequencing conflict
    /// is retried once against a freshly reserved folio.
    pub async fn save(&self, draft: Quote) -> AppResult<SavedQuote> {
        validate_quote(&draft)?;
        let mut quote = prepare_for_save(draft);

        let _guard = self.sequencer.lock().await;
        let created = match self.persist(&mut quote) {
            Err(AppError::SequencingConflict { reserved, current }) => {
                warn!(quote_id = %quote.id, %reserved, %current, "Reserved folio is stale, retrying with a fresh one");
                quote.folio = self.sequencer.reserve_next_folio()?;
                self.persist(&mut quote)?
            }
            other => other?,
        };

        if created {
            info!(quote_id = %quote.id, folio = %quote.folio, total = %quote.total, "Quote created");
            audit_log!(action = "quote.create", quote_id = %quote.id, folio = %quote.folio);
        } else {
            info!(quote_id = %quote.id, folio = %quote.folio, total = %quote.total, "Quote updated");
        }
        Ok(SavedQuote { quote, created })
    }

    fn persist(&self, quote: &mut Quote) -> AppResult<bool> {
        self.storage
            .transaction(&[TableName::Profile, TableName::Quotes], |scope| {
                match scope.get::<Quote>(&quote.id)? {
                    Some(existing) => {
                        quote.folio = existing.folio;
                        scope.put(&*quote)?;
                        Ok(false)
                    }
                    None => {
                        quote.folio = FolioSequencer::commit_in(scope, &quote.folio)?;
                        scope.put(&*quote)?;
                        Ok(true)
                    }
                }
            })
            .map_err(AppError::logged)
    }

    pub fn get(&self, id: &str) -> AppResult<Quote> {
        self.storage
            .get::<Quote>(id)?
            .ok_or_else(|| AppError::not_found(format!("Quote {id}")))
    }

    /// All quotes, newest first
    pub fn list(&self) -> AppResult<Vec<Quote>> {
        Ok(self.storage.read(queries::all_quotes_newest_first)?.value)
    }

    /// Unsaved copy of a stored quote: new id, newly reserved folio, today's
    /// date, pending, items with fresh ids
    pub fn duplicate(&self, id: &str) -> AppResult<Quote> {
        let source = self.get(id)?;
        let title = source
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(|t| format!("{t}{COPY_SUFFIX}"));

        Ok(Quote {
            id: generate_id(),
            folio: self.sequencer.reserve_next_folio()?,
            date: Utc::now(),
            title,
            client_name: format!("{}{COPY_SUFFIX}", source.client_name),
            status: QuoteStatus::Pending,
            items: source
                .items
                .into_iter()
                .map(|item| QuoteItem {
                    id: generate_id(),
                    ..item
                })
                .collect(),
            ..source
        })
    }

    pub fn set_status(&self, id: &str, status: QuoteStatus) -> AppResult<Quote> {
        self.storage.transaction(&[TableName::Quotes], |scope| {
            let mut quote = scope
                .get::<Quote>(id)?
                .ok_or_else(|| AppError::not_found(format!("Quote {id}")))?;
            quote.status = status;
            scope.put(&quote)?;
            info!(quote_id = %id, folio = %quote.folio, status = status.label(), "Quote status changed");
            Ok(quote)
        })
    }

    /// Pending ↔ paid
    pub fn toggle_status(&self, id: &str) -> AppResult<Quote> {
        let current = self.get(id)?;
        self.set_status(id, current.status.toggled())
    }

    /// Remove a quote. The folio counter is left alone, so folios may show
    /// gaps. Returns whether the quote existed.
    pub fn delete(&self, id: &str) -> AppResult<bool> {
        let existed = self.storage.delete::<Quote>(id)?;
        if existed {
            info!(quote_id = %id, "Quote deleted");
            audit_log!(action = "quote.delete", quote_id = %id);
        }
        Ok(existed)
    }

    // ========== Draft editing ==========

    /// Append one unit of a catalog entry
    pub fn add_catalog_item(draft: &mut Quote, item: &CatalogItem) {
        let unit = if item.unit.trim().is_empty() {
            DEFAULT_UNIT.to_string()
        } else {
            item.unit.clone()
        };
        draft.items.push(QuoteItem {
            id: generate_id(),
            quantity: RawNumber::from(1),
            unit,
            description: item.description.clone(),
            unit_price: RawNumber::from(item.price),
        });
    }

    /// Append a blank row
    pub fn add_blank_item(draft: &mut Quote) {
        draft.items.push(QuoteItem::blank(generate_id()));
    }

    /// Replace the draft's items with the template's
    pub fn apply_template(draft: &mut Quote, template: &Template) {
        draft.items = template
            .items
            .iter()
            .map(|t| QuoteItem {
                id: generate_id(),
                quantity: RawNumber::from(t.qty),
                unit: DEFAULT_UNIT.to_string(),
                description: t.description.clone(),
                unit_price: RawNumber::from(t.price),
            })
            .collect();
    }

    /// Remove one row; a quote always keeps at least one
    pub fn remove_item(draft: &mut Quote, item_id: &str) -> AppResult<()> {
        let Some(index) = draft.items.iter().position(|i| i.id == item_id) else {
            return Err(AppError::not_found(format!("Quote item {item_id}")));
        };
        if draft.items.len() <= 1 {
            return Err(AppError::validation("items", "a quote must keep at least one item"));
        }
        draft.items.remove(index);
        Ok(())
    }
}

/// Checks that run before anything is written
pub fn validate_quote(quote: &Quote) -> AppResult<()> {
    validate_required_text(&quote.client_name, "client", MAX_NAME_LEN)?;
    validate_phone(&quote.client_phone, "phone")?;
    validate_optional_text(&quote.title, "title", MAX_DESCRIPTION_LEN)?;
    for item in &quote.items {
        if item.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(AppError::validation(
                "items",
                format!("description is too long (max {MAX_DESCRIPTION_LEN})"),
            ));
        }
    }
    Ok(())
}

/// Trimmed names, rates clamped to ≥ 0 and a recomputed total
pub fn prepare_for_save(mut quote: Quote) -> Quote {
    quote.client_name = quote.client_name.trim().to_string();
    quote.client_phone = quote.client_phone.trim().to_string();
    quote.discount_rate = quote.discount_rate.max(Decimal::ZERO);
    quote.tax_rate = quote.tax_rate.max(Decimal::ZERO);
    quote.total = recompute_total(&quote);
    quote
}

/// Stored total for the quote's current items and rates
pub fn recompute_total(quote: &Quote) -> Decimal {
    let totals = calculate_item_totals(&quote.items, quote.discount_rate, quote.tax_rate);
    normalize_total(totals.total)
}
