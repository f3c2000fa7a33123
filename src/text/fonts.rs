use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parley::fontique::FontInfoOverride;

use crate::assets::pending::{Pending, Readiness};
use crate::assets::source::AssetSource;
use crate::foundation::error::{BrandframeError, BrandframeResult};

/// Well-known locations probed when no default font is configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

enum FamilyState {
    /// Bytes in flight, with the catalog name the face will be registered under.
    Loading(String, Pending<Vec<u8>>),
    /// Parley family name the catalog name resolves to.
    Installed(String),
    Failed,
}

/// Catalog font name -> concrete face registry backed by a Parley font collection.
///
/// Families installed asynchronously resolve to the default face until their bytes arrive.
pub struct FontBook {
    font_ctx: parley::FontContext,
    default_family: Option<String>,
    families: HashMap<String, FamilyState>,
    cpu_fonts: HashMap<(u64, u32), vello_cpu::peniko::FontData>,
}

impl Default for FontBook {
    fn default() -> Self {
        Self::new()
    }
}

impl FontBook {
    /// An empty book with no default face.
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            default_family: None,
            families: HashMap::new(),
            cpu_fonts: HashMap::new(),
        }
    }

    /// A book whose default face comes from `path`, or the first system font found.
    pub fn with_default_font(path: Option<&Path>) -> Self {
        let mut book = Self::new();
        let candidates: Vec<PathBuf> = match path {
            Some(p) => vec![p.to_path_buf()],
            None => SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from).collect(),
        };
        for p in candidates {
            let Ok(bytes) = std::fs::read(&p) else {
                continue;
            };
            match book.set_default_font(bytes) {
                Ok(family) => {
                    tracing::debug!(path = %p.display(), family = %family, "default font installed");
                    return book;
                }
                Err(e) => tracing::warn!(path = %p.display(), error = %e, "unusable default font"),
            }
        }
        tracing::warn!("no default font available; text will not be drawn");
        book
    }

    /// Register `bytes` and make them the fallback face.
    pub fn set_default_font(&mut self, bytes: Vec<u8>) -> BrandframeResult<String> {
        let family = self.register_bytes(bytes, None)?;
        self.default_family = Some(family.clone());
        Ok(family)
    }

    pub fn has_default(&self) -> bool {
        self.default_family.is_some()
    }

    pub fn default_family(&self) -> Option<&str> {
        self.default_family.as_deref()
    }

    /// Install a catalog family from font bytes immediately.
    ///
    /// The face is registered under the catalog name, so two catalog entries never collapse onto
    /// one family even when their files share an internal family name.
    pub fn install(&mut self, name: &str, bytes: Vec<u8>) -> BrandframeResult<()> {
        let family = self.register_bytes(bytes, Some(name))?;
        self.families
            .insert(catalog_key(name), FamilyState::Installed(family));
        Ok(())
    }

    /// Install a catalog family whose bytes are still loading.
    pub fn install_pending(&mut self, name: &str, bytes: Pending<Vec<u8>>) {
        self.families
            .insert(
                catalog_key(name),
                FamilyState::Loading(name.trim().to_owned(), bytes),
            );
    }

    /// Map a catalog name onto the default face (catalog entries without their own file).
    pub fn alias_default(&mut self, name: &str) {
        if let Some(d) = self.default_family.clone() {
            self.families
                .insert(catalog_key(name), FamilyState::Installed(d));
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.families.remove(&catalog_key(name));
    }

    /// Install `name` from a catalog `data` reference: a `data:` URL, an `http(s)://` URL, or a
    /// path relative to `base_dir`.
    pub fn install_reference(&mut self, name: &str, data: &str, base_dir: &Path) {
        match AssetSource::parse(data, base_dir) {
            Ok(source) => self.install_source(name, source),
            Err(e) => {
                tracing::warn!(family = name, error = %e, "unusable font reference; falling back");
                self.families.insert(catalog_key(name), FamilyState::Failed);
            }
        }
    }

    fn install_source(&mut self, name: &str, source: AssetSource) {
        let source = match source {
            AssetSource::Inline(bytes) => {
                if let Err(e) = self.install(name, bytes) {
                    tracing::warn!(family = name, error = %e, "font bytes unusable; falling back");
                    self.families.insert(catalog_key(name), FamilyState::Failed);
                }
                return;
            }
            other => other,
        };
        let pending = Pending::spawn("font", move || {
            let origin = source.describe();
            source
                .read()
                .map_err(|e| BrandframeError::resource_load(format!("font '{origin}': {e}")))
        });
        self.install_pending(name, pending);
    }

    /// Whether `name` is known but its bytes have not arrived yet.
    pub fn is_loading(&mut self, name: &str) -> bool {
        self.promote(name);
        matches!(
            self.families.get(&catalog_key(name)),
            Some(FamilyState::Loading(..))
        )
    }

    /// Concrete Parley family for `name`, falling back to the default face.
    pub fn resolve(&mut self, name: &str) -> Option<String> {
        self.promote(name);
        match self.families.get(&catalog_key(name)) {
            Some(FamilyState::Installed(f)) => Some(f.clone()),
            _ => {
                tracing::trace!(family = name, "font family unresolved; using default face");
                self.default_family.clone()
            }
        }
    }

    /// Move a settled pending family into its final state.
    fn promote(&mut self, name: &str) {
        let key = catalog_key(name);
        let Some(FamilyState::Loading(catalog_name, p)) = self.families.get(&key) else {
            return;
        };
        let next = match p.poll() {
            Readiness::Loading => return,
            Readiness::Failed(msg) => {
                tracing::warn!(family = name, error = %msg, "font failed to load; falling back");
                FamilyState::Failed
            }
            Readiness::Ready => {
                let Some(bytes) = p.get() else {
                    return;
                };
                let catalog_name = catalog_name.clone();
                match self.register_bytes(bytes.as_ref().clone(), Some(&catalog_name)) {
                    Ok(f) => {
                        tracing::info!(family = name, resolved = %f, "font installed");
                        FamilyState::Installed(f)
                    }
                    Err(e) => {
                        tracing::warn!(family = name, error = %e, "font bytes unusable; falling back");
                        FamilyState::Failed
                    }
                }
            }
        };
        self.families.insert(key, next);
    }

    /// Register `bytes` with Parley. With `family`, the face is renamed to that catalog name;
    /// otherwise it keeps the family name stored in the font.
    fn register_bytes(&mut self, bytes: Vec<u8>, family: Option<&str>) -> BrandframeResult<String> {
        let family = family.map(str::trim).filter(|f| !f.is_empty());
        let info = family.map(|f| FontInfoOverride {
            family_name: Some(f),
            ..Default::default()
        });
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes), info);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            BrandframeError::resource_load("no font families registered from font bytes")
        })?;
        let name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| BrandframeError::resource_load("registered font family has no name"))?
            .to_string();
        Ok(name)
    }

    pub(crate) fn font_ctx_mut(&mut self) -> &mut parley::FontContext {
        &mut self.font_ctx
    }

    /// Renderer-side handle for the face a shaped run was laid out with.
    pub(crate) fn cpu_font(&mut self, font: &parley::FontData) -> vello_cpu::peniko::FontData {
        let key = (font.data.id(), font.index);
        self.cpu_fonts
            .entry(key)
            .or_insert_with(|| {
                let bytes = vello_cpu::peniko::Blob::from(font.data.data().to_vec());
                vello_cpu::peniko::FontData::new(bytes, font.index)
            })
            .clone()
    }
}

fn catalog_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
#[path = "../../tests/unit/text/fonts.rs"]
mod tests;
