//! Business Profile Model

use serde::{Deserialize, Serialize};

/// Fixed key of the singleton profile record
pub const PROFILE_KEY: &str = "main";

/// Business profile (letterhead, branding, terms and the folio counter)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default = "default_profile_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slogan: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub city: Option<String>,
    /// Brand color as `#rrggbb`
    #[serde(default = "default_color")]
    pub color: String,
    /// Logo reference (data URL or file path)
    #[serde(default)]
    pub logo: Option<String>,
    /// Next folio number to hand out; only the sequencer increments it
    #[serde(default = "default_next_folio")]
    pub next_folio: u64,
    #[serde(default)]
    pub terms: String,
}

fn default_profile_id() -> String {
    PROFILE_KEY.to_string()
}

fn default_color() -> String {
    "#1e293b".to_string()
}

fn default_next_folio() -> u64 {
    1
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            id: default_profile_id(),
            name: "My Business".to_string(),
            slogan: "General Services".to_string(),
            phone: String::new(),
            city: None,
            color: default_color(),
            logo: None,
            next_folio: default_next_folio(),
            terms: String::new(),
        }
    }
}

/// Update profile payload
///
/// `next_folio` is absent: settings edits never move the
/// counter.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub slogan: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub color: Option<String>,
    pub logo: Option<String>,
    pub terms: Option<String>,
}

impl Profile {
    /// Apply a partial update. Empty `city`/`logo` strings clear the field.
    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(slogan) = update.slogan {
            self.slogan = slogan;
        }
        if let Some(phone) = update.phone {
            self.phone = phone;
        }
        if let Some(city) = update.city {
            self.city = (!city.trim().is_empty()).then_some(city);
        }
        if let Some(color) = update.color {
            self.color = color;
        }
        if let Some(logo) = update.logo {
            self.logo = (!logo.trim().is_empty()).then_some(logo);
        }
        if let Some(terms) = update.terms {
            self.terms = terms;
        }
    }
}
