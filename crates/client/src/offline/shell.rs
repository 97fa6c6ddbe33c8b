//! The shell asset list bound to one cache generation name.

use reqwest::Url;
use top10_core::{AppConfig, Error, RequestKey};

use crate::fetch::{canonicalize, resolve};

/// Ordered shell assets resolved to absolute URLs, plus the generation they
/// belong to.
#[derive(Debug, Clone)]
pub struct ShellManifest {
    cache_name: String,
    site_root: Url,
    assets: Vec<Url>,
}

impl ShellManifest {
    /// Resolve `assets` (paths relative to `base_path`) against `origin`.
    pub fn new(
        cache_name: impl Into<String>, origin: &str, base_path: &str, assets: &[impl AsRef<str>],
    ) -> Result<Self, Error> {
        let origin = canonicalize(origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let base_path = base_path.trim_end_matches('/');

        let site_root = resolve(&origin, &format!("{base_path}/")).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let assets = assets
            .iter()
            .map(|asset| {
                let path = format!("{base_path}{}", asset.as_ref());
                resolve(&origin, &path).map_err(|e| Error::InvalidUrl(format!("{}: {e}", asset.as_ref())))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { cache_name: cache_name.into(), site_root, assets })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        Self::new(&config.cache_name, &config.origin, &config.base_path, &config.shell_assets)
    }

    /// Name of the generation this shell installs into.
    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    /// Directory the site is served from, with a trailing slash.
    pub fn site_root(&self) -> &Url {
        &self.site_root
    }

    pub fn assets(&self) -> &[Url] {
        &self.assets
    }

    /// GET keys for every asset, in declaration order.
    pub fn asset_keys(&self) -> Vec<RequestKey> {
        self.assets.iter().map(|url| RequestKey::get(url.as_str())).collect()
    }

    /// Resolve a page request to its canonical URL.
    ///
    /// Absolute URLs are canonicalized as-is; anything else is resolved
    /// against the site root, the way a page resolves its own links.
    pub fn resolve_request(&self, input: &str) -> Result<Url, Error> {
        let result = if input.contains("://") { canonicalize(input) } else { resolve(&self.site_root, input) };
        result.map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))
    }
}
