/// Opaque record id (UUID v4, simple form).
///
/// Ids are generated once per record and never reinterpreted, so the only
/// requirement is uniqueness on a single device.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Short human date used in listings and documents, e.g. `5 Mar 2025`
pub fn display_date(date: &chrono::DateTime<chrono::Utc>) -> String {
    date.format("%-d %b %Y").to_string()
}
