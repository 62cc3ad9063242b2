//! Money calculation using rust_decimal for precision
//!
//! Totals keep full precision. Rounding happens only in the display helpers
//! at the bottom of this module, never in what gets stored.

use rust_decimal::prelude::*;
use shared::models::{QuoteItem, RawNumber};

/// Rounding for presentation (2 decimal places, half away from zero)
const DECIMAL_PLACES: u32 = 2;

/// One priced line, already converted from raw editor input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineAmount {
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl LineAmount {
    pub fn new(quantity: Decimal, unit_price: Decimal) -> Self {
        Self { quantity, unit_price }
    }

    /// Convert the tolerant editor values; blank or non-numeric becomes 0
    pub fn from_raw(quantity: &RawNumber, unit_price: &RawNumber) -> Self {
        Self::new(quantity.to_decimal(), unit_price.to_decimal())
    }

    pub fn amount(&self) -> Decimal {
        self.quantity.saturating_mul(self.unit_price)
    }
}

impl From<&QuoteItem> for LineAmount {
    fn from(item: &QuoteItem) -> Self {
        Self::from_raw(&item.quantity, &item.unit_price)
    }
}

/// Breakdown of a quote's money
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteTotals {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub net_after_discount: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

/// Subtotal, discount, tax and total for a list of lines.
///
/// Rates are percentages. Negative and zero inputs compute through
/// unchanged; overflow saturates instead of panicking.
pub fn calculate_totals(lines: &[LineAmount], discount_rate: Decimal, tax_rate: Decimal) -> QuoteTotals {
    let subtotal = lines
        .iter()
        .fold(Decimal::ZERO, |acc, line| acc.saturating_add(line.amount()));

    let discount_amount = percent_of(subtotal, discount_rate);
    let net_after_discount = subtotal.saturating_sub(discount_amount);
    let tax_amount = percent_of(net_after_discount, tax_rate);
    let total = net_after_discount.saturating_add(tax_amount);

    QuoteTotals {
        subtotal,
        discount_amount,
        net_after_discount,
        tax_amount,
        total,
    }
}

/// Totals straight from stored quote items
pub fn calculate_item_totals(items: &[QuoteItem], discount_rate: Decimal, tax_rate: Decimal) -> QuoteTotals {
    let lines: Vec<LineAmount> = items.iter().map(LineAmount::from).collect();
    calculate_totals(&lines, discount_rate, tax_rate)
}

/// `value * rate / 100`
///
/// Multiplies first so exact inputs stay exact; falls back to dividing
/// first when the product would overflow.
fn percent_of(value: Decimal, rate: Decimal) -> Decimal {
    if rate.is_zero() || value.is_zero() {
        return Decimal::ZERO;
    }
    match value.checked_mul(rate) {
        Some(product) => product / Decimal::ONE_HUNDRED,
        None => value.saturating_mul(rate / Decimal::ONE_HUNDRED),
    }
}

/// Value stored as `Quote::total`: full precision, trailing zeros stripped
pub fn normalize_total(value: Decimal) -> Decimal {
    value.normalize()
}

/// Round for presentation only
pub fn round_for_display(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// `$1,234.50`; negatives as `-$5.00`
pub fn format_money(value: Decimal) -> String {
    let rounded = round_for_display(value);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}.{}", if negative { "-" } else { "" }, grouped, frac_part)
}

/// Percentage label for documents: `16%`, `7.5%`
pub fn format_rate(rate: Decimal) -> String {
    format!("{}%", rate.normalize())
}

/// Suggested sale price from costs plus a margin, rounded up to a whole unit
pub fn suggest_price(materials: Decimal, labor: Decimal, other: Decimal, margin_rate: Decimal) -> Decimal {
    let cost = materials.saturating_add(labor).saturating_add(other);
    let with_margin = cost.saturating_add(percent_of(cost, margin_rate));
    with_margin.ceil()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(qty: &str, price: &str) -> LineAmount {
        LineAmount::new(dec(qty), dec(price))
    }

    #[test]
    fn test_scenario_discount_then_tax() {
        let totals = calculate_totals(&[line("2", "100")], dec("10"), dec("16"));
        assert_eq!(totals.subtotal, dec("200"));
        assert_eq!(totals.discount_amount, dec("20"));
        assert_eq!(totals.net_after_discount, dec("180"));
        assert_eq!(totals.tax_amount, dec("28.8"));
        assert_eq!(totals.total, dec("208.8"));
    }

    #[test]
    fn test_empty_list_is_zero() {
        let totals = calculate_totals(&[], dec("10"), dec("16"));
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_non_numeric_input_counts_as_zero() {
        let item = QuoteItem {
            id: "x".to_string(),
            quantity: RawNumber::from("abc"),
            unit: "pza".to_string(),
            description: String::new(),
            unit_price: RawNumber::from("150"),
        };
        let priced = QuoteItem {
            id: "y".to_string(),
            quantity: RawNumber::from(" 3 "),
            unit: "pza".to_string(),
            description: String::new(),
            unit_price: RawNumber::from(10),
        };
        let totals = calculate_item_totals(&[item, priced], Decimal::ZERO, Decimal::ZERO);
        assert_eq!(totals.total, dec("30"));
    }

    #[test]
    fn test_negative_inputs_compute_through() {
        let totals = calculate_totals(&[line("-1", "50"), line("2", "0")], Decimal::ZERO, dec("10"));
        assert_eq!(totals.total, dec("-55"));
    }

    #[test]
    fn test_precision_kept_until_display() {
        let totals = calculate_totals(&[line("3", "0.335")], Decimal::ZERO, dec("16"));
        assert_eq!(totals.total, dec("1.16580"));
        assert_eq!(normalize_total(totals.total).to_string(), "1.1658");
        assert_eq!(round_for_display(totals.total), dec("1.17"));
    }

    #[test]
    fn test_overflow_saturates() {
        let totals = calculate_totals(&[line("79228162514264337593543950335", "10")], dec("10"), dec("16"));
        assert_eq!(totals.subtotal, Decimal::MAX);
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(dec("1234.5")), "$1,234.50");
        assert_eq!(format_money(dec("208.8")), "$208.80");
        assert_eq!(format_money(dec("0")), "$0.00");
        assert_eq!(format_money(dec("-5")), "-$5.00");
        assert_eq!(format_money(dec("-0.001")), "$0.00");
        assert_eq!(format_money(dec("1000000")), "$1,000,000.00");
        assert_eq!(format_money(dec("2.675")), "$2.68");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(dec("16.00")), "16%");
        assert_eq!(format_rate(dec("7.5")), "7.5%");
    }

    #[test]
    fn test_suggest_price_rounds_up() {
        assert_eq!(suggest_price(dec("100"), dec("50.5"), dec("0"), dec("30")), dec("196"));
        assert_eq!(suggest_price(dec("100"), dec("0"), dec("0"), dec("0")), dec("100"));
    }

    fn arb_line() -> impl Strategy<Value = LineAmount> {
        (0i64..10_000, 0i64..1_000_000).prop_map(|(q, p)| {
            LineAmount::new(Decimal::new(q, 2), Decimal::new(p, 2))
        })
    }

    proptest! {
        #[test]
        fn zero_rates_are_identity(lines in prop::collection::vec(arb_line(), 0..40)) {
            let totals = calculate_totals(&lines, Decimal::ZERO, Decimal::ZERO);
            prop_assert_eq!(totals.total, totals.subtotal);
        }

        #[test]
        fn total_ignores_item_order(
            lines in prop::collection::vec(arb_line(), 0..40),
            discount in 0i64..10_000,
            tax in 0i64..10_000,
        ) {
            let discount = Decimal::new(discount, 2);
            let tax = Decimal::new(tax, 2);
            let mut reversed = lines.clone();
            reversed.reverse();
            prop_assert_eq!(
                calculate_totals(&lines, discount, tax).total,
                calculate_totals(&reversed, discount, tax).total
            );
        }

        #[test]
        fn recomputation_is_bit_identical(
            lines in prop::collection::vec(arb_line(), 0..40),
            discount in 0i64..10_000,
            tax in 0i64..10_000,
        ) {
            let discount = Decimal::new(discount, 2);
            let tax = Decimal::new(tax, 2);
            let first = normalize_total(calculate_totals(&lines, discount, tax).total);
            let second = normalize_total(calculate_totals(&lines, discount, tax).total);
            prop_assert_eq!(first.serialize(), second.serialize());
        }
    }
}
