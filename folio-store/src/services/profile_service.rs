//! Profile Service - the business profile singleton and first-start seeding

use shared::models::{CatalogItem, PROFILE_KEY, Profile, ProfileUpdate};
use tracing::info;

use crate::common::{AppError, AppResult};
use crate::store::{Storage, TableName};
use crate::utils::validation::{
    MAX_DESCRIPTION_LEN, MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, MAX_TERMS_LEN, validate_hex_color, validate_optional_text,
};

#[derive(Clone)]
pub struct ProfileService {
    storage: Storage,
}

impl ProfileService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Stored profile, or the defaults when none exists
    pub fn get(&self) -> AppResult<Profile> {
        Ok(self.storage.get::<Profile>(PROFILE_KEY)?.unwrap_or_default())
    }

    /// Recreate the profile with defaults if it is missing
    pub fn ensure(&self) -> AppResult<Profile> {
        self.storage.transaction(&[TableName::Profile], |scope| {
            if let Some(profile) = scope.get::<Profile>(PROFILE_KEY)? {
                return Ok(profile);
            }
            let profile = Profile::default();
            scope.put(&profile)?;
            info!("Profile recreated with defaults");
            Ok(profile)
        })
    }

    /// Apply a settings edit. The folio counter is not editable here.
    pub fn update(&self, update: ProfileUpdate) -> AppResult<Profile> {
        validate_update(&update)?;
        self.storage.transaction(&[TableName::Profile], |scope| {
            let mut profile = scope.get::<Profile>(PROFILE_KEY)?.unwrap_or_default();
            profile.apply(update);
            scope.put(&profile)?;
            info!(name = %profile.name, "Profile updated");
            Ok(profile)
        })
    }

    /// Seed the default profile and catalog into an empty store.
    ///
    /// Returns `true` if anything was written. A store that already has a
    /// profile or any catalog entry is left alone.
    pub fn seed_if_empty(&self) -> AppResult<bool> {
        self.storage
            .transaction(&[TableName::Profile, TableName::Catalog], |scope| {
                let has_profile = scope.contains::<Profile>(PROFILE_KEY)?;
                let has_catalog = !scope.scan_all::<CatalogItem>()?.is_empty();
                if has_profile || has_catalog {
                    return Ok::<_, AppError>(false);
                }

                scope.put(&Profile::default())?;
                for item in CatalogItem::defaults() {
                    scope.put(&item)?;
                }
                Ok(true)
            })
            .inspect(|seeded| {
                if *seeded {
                    info!("Empty store seeded with default profile and catalog");
                }
            })
    }
}

fn validate_update(update: &ProfileUpdate) -> AppResult<()> {
    if let Some(name) = &update.name
        && name.trim().is_empty()
    {
        return Err(AppError::validation("name", "must not be empty"));
    }
    validate_optional_text(&update.name, "name", MAX_NAME_LEN)?;
    validate_optional_text(&update.slogan, "slogan", MAX_DESCRIPTION_LEN)?;
    validate_optional_text(&update.phone, "phone", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&update.city, "city", MAX_NAME_LEN)?;
    validate_optional_text(&update.terms, "terms", MAX_TERMS_LEN)?;
    if let Some(color) = &update.color {
        validate_hex_color(color, "color")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> (Storage, ProfileService) {
        let storage = Storage::open_in_memory().unwrap();
        (storage.clone(), ProfileService::new(storage))
    }

    #[test]
    fn test_get_defaults_without_writing() {
        let (storage, service) = service();
        assert_eq!(service.get().unwrap(), Profile::default());
        assert!(storage.get::<Profile>(PROFILE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_ensure_recreates_missing_profile() {
        let (storage, service) = service();
        service.ensure().unwrap();
        assert!(storage.get::<Profile>(PROFILE_KEY).unwrap().is_some());

        let updated = service
            .update(ProfileUpdate {
                name: Some("Plomeria Lopez".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(service.ensure().unwrap(), updated);
    }

    #[test]
    fn test_update_keeps_folio_counter() {
        let (storage, service) = service();
        storage
            .put(&Profile {
                next_folio: 12,
                ..Profile::default()
            })
            .unwrap();
        let profile = service
            .update(ProfileUpdate {
                color: Some("#0f766e".to_string()),
                terms: Some("50% upfront".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(profile.next_folio, 12);
        assert_eq!(profile.color, "#0f766e");
        assert_eq!(profile.terms, "50% upfront");
    }

    #[test]
    fn test_update_rejects_bad_color_and_blank_name() {
        let (storage, service) = service();
        let bad_color = service.update(ProfileUpdate {
            color: Some("teal".to_string()),
            ..Default::default()
        });
        assert!(matches!(bad_color, Err(AppError::Validation { .. })));

        let blank_name = service.update(ProfileUpdate {
            name: Some("  ".to_string()),
            ..Default::default()
        });
        assert!(blank_name.is_err());
        assert!(storage.get::<Profile>(PROFILE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_seed_only_once() {
        let (storage, service) = service();
        assert!(service.seed_if_empty().unwrap());
        assert_eq!(storage.scan_all::<CatalogItem>().unwrap().len(), 2);
        assert!(!service.seed_if_empty().unwrap());
        assert_eq!(storage.scan_all::<CatalogItem>().unwrap().len(), 2);
    }
}
