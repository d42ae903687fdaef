use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, instrument};

use super::{ContentItem, ContentMap, Language};

/// Supplier of active content entries, ordered by `(section, key)`.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn active_items(&self) -> Result<Vec<ContentItem>>;
}

#[derive(Debug)]
struct Snapshot {
    language: Language,
    map: Arc<ContentMap>,
    loaded: bool,
}

/// Holds the resolved map for one language and rebuilds it on demand.
///
/// Readers always see a complete map: a refresh builds the replacement off to
/// the side and swaps the `Arc` in one write. A failed refresh keeps the
/// previous map.
pub struct ContentResolver {
    source: Arc<dyn ContentSource>,
    snapshot: RwLock<Snapshot>,
    // Serializes rebuilds so a map never lands under the wrong language.
    rebuild: Mutex<()>,
}

impl ContentResolver {
    #[must_use]
    pub fn new(source: Arc<dyn ContentSource>, language: Language) -> Self {
        Self {
            source,
            snapshot: RwLock::new(Snapshot {
                language,
                map: Arc::new(ContentMap::default()),
                loaded: false,
            }),
            rebuild: Mutex::new(()),
        }
    }

    /// Create and load in one step.
    ///
    /// # Errors
    /// Returns an error if the source cannot be read.
    pub async fn load(source: Arc<dyn ContentSource>, language: Language) -> Result<Self> {
        let resolver = Self::new(source, language);
        resolver.refresh().await?;
        Ok(resolver)
    }

    pub async fn language(&self) -> Language {
        self.snapshot.read().await.language
    }

    pub async fn is_loaded(&self) -> bool {
        self.snapshot.read().await.loaded
    }

    /// Current map. Empty until the first successful load.
    pub async fn snapshot(&self) -> Arc<ContentMap> {
        Arc::clone(&self.snapshot.read().await.map)
    }

    pub async fn get_content(&self, section: &str, key: &str, fallback: &str) -> String {
        self.snapshot().await.get_content(section, key, fallback)
    }

    /// Re-read the source and rebuild the map for the current language.
    ///
    /// # Errors
    /// Returns an error if the source cannot be read; the previous map stays.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Arc<ContentMap>> {
        let _guard = self.rebuild.lock().await;
        let language = self.snapshot.read().await.language;
        self.rebuild_for(language).await
    }

    /// Switch language, rebuilding only when it actually changes.
    ///
    /// # Errors
    /// Returns an error if the source cannot be read. The language is not
    /// switched in that case.
    #[instrument(skip(self))]
    pub async fn set_language(&self, language: Language) -> Result<Arc<ContentMap>> {
        let _guard = self.rebuild.lock().await;
        {
            let snapshot = self.snapshot.read().await;
            if snapshot.language == language && snapshot.loaded {
                debug!("language unchanged, keeping current map");
                return Ok(Arc::clone(&snapshot.map));
            }
        }
        self.rebuild_for(language).await
    }

    async fn rebuild_for(&self, language: Language) -> Result<Arc<ContentMap>> {
        let items = self.source.active_items().await?;
        let map = Arc::new(ContentMap::build(&items, language));
        let mut snapshot = self.snapshot.write().await;
        snapshot.language = language;
        snapshot.map = Arc::clone(&map);
        snapshot.loaded = true;
        debug!(%language, items = items.len(), "content map rebuilt");
        Ok(map)
    }
}

/// One resolver per supported language over a shared source.
pub struct ContentCatalog {
    resolvers: Vec<ContentResolver>,
}

impl ContentCatalog {
    #[must_use]
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        let resolvers = Language::ALL
            .iter()
            .map(|language| ContentResolver::new(Arc::clone(&source), *language))
            .collect();
        Self { resolvers }
    }

    // Resolvers are stored in `Language::ALL` order and never switch language.
    fn resolver(&self, language: Language) -> Option<&ContentResolver> {
        Language::ALL
            .iter()
            .position(|candidate| *candidate == language)
            .and_then(|index| self.resolvers.get(index))
    }

    /// Map for `language`, loading it on first use.
    ///
    /// # Errors
    /// Returns an error if the first load fails.
    pub async fn try_map(&self, language: Language) -> Result<Arc<ContentMap>> {
        let Some(resolver) = self.resolver(language) else {
            return Ok(Arc::new(ContentMap::default()));
        };
        if resolver.is_loaded().await {
            Ok(resolver.snapshot().await)
        } else {
            resolver.set_language(language).await
        }
    }

    /// Like [`Self::try_map`] but never fails: a load error is logged and the
    /// current map is returned, empty before the first successful load, so
    /// lookups fall back to their defaults. The next call retries the load.
    pub async fn map(&self, language: Language) -> Arc<ContentMap> {
        match self.try_map(language).await {
            Ok(map) => map,
            Err(err) => {
                error!(%language, "Failed to load website content: {err:#}");
                match self.resolver(language) {
                    Some(resolver) => resolver.snapshot().await,
                    None => Arc::new(ContentMap::default()),
                }
            }
        }
    }

    /// Rebuild every language that has been loaded so far.
    ///
    /// # Errors
    /// Returns the first refresh error; remaining languages are still attempted.
    pub async fn refresh_all(&self) -> Result<()> {
        let mut first_error = None;
        for resolver in &self.resolvers {
            if !resolver.is_loaded().await {
                continue;
            }
            if let Err(err) = resolver.refresh().await {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
