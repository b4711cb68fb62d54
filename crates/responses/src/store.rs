//! Loads template sets from a resource directory.
//!
//! Layout: `<resource_dir>/<id>.json` holds the default set; `<resource_dir>/<id>.<locale>.json`
//! optionally overrides individual templates for one locale. Loaded sets are cached per
//! `(id, locale)`; the cache only saves re-reading files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dbot_core::{DbotError, Result};
use tracing::{debug, info, instrument};

use crate::template::TemplateSet;

/// `(template set id, locale)`.
type CacheKey = (String, Option<String>);

pub struct TemplateStore {
    resource_dir: PathBuf,
    cache: Mutex<HashMap<CacheKey, Arc<TemplateSet>>>,
}

impl TemplateStore {
    pub fn new(resource_dir: impl Into<PathBuf>) -> Self {
        Self {
            resource_dir: resource_dir.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn resource_dir(&self) -> &Path {
        &self.resource_dir
    }

    /// Default (non-localized) set `template_set_id`.
    pub fn load(&self, template_set_id: &str) -> Result<Arc<TemplateSet>> {
        self.load_localized(template_set_id, None)
    }

    /// Set `template_set_id` for `locale`: the default file overlaid with the locale file when
    /// one exists. A missing default file is a config error.
    #[instrument(skip(self))]
    pub fn load_localized(
        &self,
        template_set_id: &str,
        locale: Option<&str>,
    ) -> Result<Arc<TemplateSet>> {
        let cache_key: CacheKey = (template_set_id.to_string(), locale.map(str::to_string));
        if let Some(set) = self.cached(&cache_key) {
            debug!(id = %template_set_id, locale = ?locale, "step: template set cache hit");
            return Ok(set);
        }

        let base = self.read_set(template_set_id, &self.path_for(template_set_id, None))?;
        let set = match locale {
            Some(locale) => {
                let path = self.path_for(template_set_id, Some(locale));
                if path.is_file() {
                    let localized_id = format!("{}.{}", template_set_id, locale);
                    let overlay = self.read_set(&localized_id, &path)?;
                    base.overlaid(localized_id, overlay)
                } else {
                    debug!(locale = %locale, "step: no localized templates, using default");
                    base
                }
            }
            None => base,
        };

        info!(
            id = %template_set_id,
            locale = ?locale,
            templates = set.len(),
            "step: template set loaded"
        );
        let set = Arc::new(set);
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(cache_key, set.clone());
        Ok(set)
    }

    fn cached(&self, key: &CacheKey) -> Option<Arc<TemplateSet>> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    fn path_for(&self, template_set_id: &str, locale: Option<&str>) -> PathBuf {
        let file = match locale {
            Some(locale) => format!("{}.{}.json", template_set_id, locale),
            None => format!("{}.json", template_set_id),
        };
        self.resource_dir.join(file)
    }

    fn read_set(&self, id: &str, path: &Path) -> Result<TemplateSet> {
        let json = fs::read_to_string(path).map_err(|e| {
            DbotError::Config(format!(
                "cannot read template set '{}' at {}: {}",
                id,
                path.display(),
                e
            ))
        })?;
        TemplateSet::from_json(id, &json)
    }
}
