use std::sync::mpsc::Receiver;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::foundation::error::{BrandframeError, BrandframeResult};
use crate::settings::auth::CredentialVerifier;
use crate::settings::model::{
    DEPARTMENTS_KEY, Department, DepartmentPatch, FONTS_KEY, FontCatalogEntry,
};
use crate::settings::store::{SettingsChange, SettingsStore};

/// Typed, credential-gated access to the shared department list and font catalog.
///
/// Reads are open. Every write checks the credential first; a rejected write leaves the store
/// untouched. Read-modify-write edits through one service are serialized, so concurrent callers
/// never overwrite each other's changes.
pub struct SettingsService<S, V> {
    store: S,
    verifier: V,
    write_lock: Mutex<()>,
}

impl<S: SettingsStore, V: CredentialVerifier> SettingsService<S, V> {
    pub fn new(store: S, verifier: V) -> Self {
        Self {
            store,
            verifier,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn subscribe(&self) -> Receiver<SettingsChange> {
        self.store.subscribe()
    }

    pub fn departments(&self) -> BrandframeResult<Vec<Department>> {
        self.read_list(DEPARTMENTS_KEY)
    }

    pub fn fonts(&self) -> BrandframeResult<Vec<FontCatalogEntry>> {
        self.read_list(FONTS_KEY)
    }

    pub fn get_department(&self, id: &str) -> BrandframeResult<Option<Department>> {
        Ok(self.departments()?.into_iter().find(|d| d.id == id))
    }

    /// Replace a whole key. Known keys must hold a well-formed list.
    #[tracing::instrument(level = "debug", skip(self, value, credential))]
    pub fn update_settings(&self, key: &str, value: Value, credential: &str) -> BrandframeResult<()> {
        self.authorize(credential)?;
        let _guard = self.lock_writes();
        match key {
            DEPARTMENTS_KEY => check_shape::<Vec<Department>>(key, &value)?,
            FONTS_KEY => check_shape::<Vec<FontCatalogEntry>>(key, &value)?,
            _ => {}
        }
        self.store.put(key, value)
    }

    pub fn add_department(
        &self,
        name: &str,
        template_url: &str,
        credential: &str,
    ) -> BrandframeResult<Department> {
        self.authorize(credential)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(BrandframeError::validation("department name must not be empty"));
        }
        let dept = Department::new(name, template_url.trim());
        let _guard = self.lock_writes();
        let mut list = self.departments()?;
        if list.iter().any(|d| d.id == dept.id) {
            return Err(BrandframeError::validation(format!(
                "department '{}' already exists",
                dept.id
            )));
        }
        list.push(dept.clone());
        self.write_list(DEPARTMENTS_KEY, &list)?;
        tracing::info!(id = %dept.id, "department added");
        Ok(dept)
    }

    /// Returns whether a department was removed.
    pub fn delete_department(&self, id: &str, credential: &str) -> BrandframeResult<bool> {
        self.authorize(credential)?;
        let _guard = self.lock_writes();
        let mut list = self.departments()?;
        let before = list.len();
        list.retain(|d| d.id != id);
        if list.len() == before {
            return Ok(false);
        }
        self.write_list(DEPARTMENTS_KEY, &list)?;
        tracing::info!(id, "department deleted");
        Ok(true)
    }

    /// Returns whether a department matched `id`.
    pub fn update_department(
        &self,
        id: &str,
        patch: &DepartmentPatch,
        credential: &str,
    ) -> BrandframeResult<bool> {
        self.authorize(credential)?;
        let _guard = self.lock_writes();
        let mut list = self.departments()?;
        let Some(dept) = list.iter_mut().find(|d| d.id == id) else {
            return Ok(false);
        };
        patch.apply(dept);
        self.write_list(DEPARTMENTS_KEY, &list)?;
        tracing::info!(id, "department updated");
        Ok(true)
    }

    /// Add a catalog font backed by `data` (a path, `http(s)://` URL, or `data:` URL).
    pub fn add_font(&self, name: &str, data: &str, credential: &str) -> BrandframeResult<FontCatalogEntry> {
        self.push_font(
            FontCatalogEntry {
                name: name.trim().to_owned(),
                data: Some(data.trim().to_owned()),
                is_default: false,
            },
            credential,
        )
    }

    /// Add a catalog name served by the default face.
    pub fn add_default_font(&self, name: &str, credential: &str) -> BrandframeResult<FontCatalogEntry> {
        self.push_font(
            FontCatalogEntry {
                name: name.trim().to_owned(),
                data: None,
                is_default: true,
            },
            credential,
        )
    }

    /// Returns whether a font was removed.
    pub fn delete_font(&self, name: &str, credential: &str) -> BrandframeResult<bool> {
        self.authorize(credential)?;
        let _guard = self.lock_writes();
        let mut list = self.fonts()?;
        let before = list.len();
        list.retain(|f| f.name != name);
        if list.len() == before {
            return Ok(false);
        }
        self.write_list(FONTS_KEY, &list)?;
        tracing::info!(name, "font deleted");
        Ok(true)
    }

    fn push_font(&self, entry: FontCatalogEntry, credential: &str) -> BrandframeResult<FontCatalogEntry> {
        self.authorize(credential)?;
        if entry.name.is_empty() {
            return Err(BrandframeError::validation("font name must not be empty"));
        }
        let _guard = self.lock_writes();
        let mut list = self.fonts()?;
        if list.iter().any(|f| f.name == entry.name) {
            return Err(BrandframeError::validation(format!(
                "font '{}' already exists",
                entry.name
            )));
        }
        list.push(entry.clone());
        self.write_list(FONTS_KEY, &list)?;
        tracing::info!(name = %entry.name, default = entry.is_default, "font added");
        Ok(entry)
    }

    fn authorize(&self, credential: &str) -> BrandframeResult<()> {
        if self.verifier.verify(credential) {
            Ok(())
        } else {
            tracing::warn!("settings write rejected: wrong password");
            Err(BrandframeError::authorization("wrong password"))
        }
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_list<T: DeserializeOwned>(&self, key: &str) -> BrandframeResult<Vec<T>> {
        match self.store.get(key)? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(v) => serde_json::from_value(v)
                .map_err(|e| BrandframeError::serde(format!("settings key '{key}': {e}"))),
        }
    }

    fn write_list<T: Serialize>(&self, key: &str, list: &[T]) -> BrandframeResult<()> {
        self.store.put(key, serde_json::to_value(list)?)
    }
}

fn check_shape<T: DeserializeOwned>(key: &str, value: &Value) -> BrandframeResult<()> {
    T::deserialize(value)
        .map(|_| ())
        .map_err(|e| BrandframeError::validation(format!("invalid value for '{key}': {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/settings/service.rs"]
mod tests;
