//! Built-in service templates
//!
//! Named bundles of line items a user can drop into a quote in one step.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateItem {
    pub qty: Decimal,
    #[serde(rename = "desc")]
    pub description: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub category: String,
    pub name: String,
    pub items: Vec<TemplateItem>,
}

impl Template {
    /// Case-insensitive match on name or category
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.name.to_lowercase().contains(&term)
            || self.category.to_lowercase().contains(&term)
    }
}

fn template(id: &str, category: &str, name: &str, items: &[(i64, &str, i64)]) -> Template {
    Template {
        id: id.to_string(),
        category: category.to_string(),
        name: name.to_string(),
        items: items
            .iter()
            .map(|(qty, desc, price)| TemplateItem {
                qty: Decimal::from(*qty),
                description: desc.to_string(),
                price: Decimal::from(*price),
            })
            .collect(),
    }
}

pub fn builtin_templates() -> Vec<Template> {
    vec![
        template(
            "plb_1",
            "Plumbing",
            "Full bathroom installation",
            &[
                (1, "Toilet installation with wax ring", 650),
                (1, "Sink and faucet installation", 550),
                (1, "Drain connections and testing", 300),
                (1, "Supplies (sealant, tape, hoses)", 450),
            ],
        ),
        template(
            "plb_2",
            "Plumbing",
            "Water leak repair",
            &[
                (1, "Leak detection and wall opening", 400),
                (1, "Damaged pipe repair", 350),
                (1, "Basic wall patching", 300),
                (1, "Materials (pipe, couplings, cement)", 250),
            ],
        ),
        template(
            "plb_3",
            "Plumbing",
            "Drain unclogging",
            &[
                (1, "Pipe snaking (up to 10 m)", 800),
                (1, "Access point cleaning", 300),
                (1, "Descaling chemicals", 250),
            ],
        ),
        template(
            "ele_1",
            "Electrical",
            "Room wiring",
            &[
                (3, "Wall channeling for drops", 450),
                (3, "Boxes and conduit", 300),
                (1, "Wiring (line, neutral, ground)", 800),
                (3, "Outlet and switch installation", 250),
            ],
        ),
        template(
            "ele_2",
            "Electrical",
            "Breaker panel replacement",
            &[
                (1, "Old panel removal", 300),
                (1, "New panel installation", 600),
                (4, "Breaker connection", 400),
                (1, "Circuit labeling", 200),
            ],
        ),
        template(
            "ele_3",
            "Electrical",
            "Ceiling fan installation",
            &[
                (1, "Fan assembly", 250),
                (1, "Ceiling anchoring", 300),
                (1, "Wiring and balancing", 250),
            ],
        ),
        template(
            "mas_1",
            "Masonry",
            "Block wall (m2)",
            &[
                (1, "Block laying", 280),
                (1, "Mortar and materials", 220),
            ],
        ),
        template(
            "mas_2",
            "Masonry",
            "Ceramic floor laying",
            &[
                (1, "Floor leveling", 150),
                (1, "Tile laying (m2)", 180),
                (1, "Grout and adhesive", 90),
            ],
        ),
    ]
}
