//! Region profile resolution
//!
//! Service clients are built for a (service, region) pair. The endpoint
//! comes from an optional operator override file, loaded exactly once per
//! process, with the vendor's conventional per-region endpoints as the
//! fallback. Endpoint lookup is a pure map read; no I/O happens after the
//! first resolve.
//!
//! Override file search order:
//! 1. `STRATO_REGIONS_FILE` environment variable
//! 2. `~/.strato/regions.yaml`
//!
//! A missing file means "no overrides". A file that exists but cannot be
//! read or parsed is a fatal configuration error: the failure is cached
//! and returned to every caller until the process restarts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use serde::Deserialize;

use crate::error::RegionError;

const REGIONS_FILE_ENV: &str = "STRATO_REGIONS_FILE";
const REGIONS_DIR: &str = ".strato";
const REGIONS_FILE: &str = "regions.yaml";

const DEFAULT_ENDPOINT_DOMAIN: &str = "stratocloud.com";

/// Regions with conventional default endpoints. Anything else must come
/// from the override file.
const KNOWN_REGIONS: &[&str] = &[
    "ap-east-1",
    "ap-south-1",
    "ap-southeast-2",
    "eu-central-1",
    "eu-west-1",
    "na-east-1",
    "na-west-2",
    "sa-east-1",
];

static SHARED_INDEX: OnceLock<Result<Arc<RegionIndex>, RegionError>> = OnceLock::new();

/// One entry of the override file. Entries missing either field are
/// silently skipped during load.
#[derive(Debug, Clone, Deserialize)]
struct OverrideEntry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    endpoint: String,
}

/// Immutable endpoint overrides keyed by `UPPERCASE(service) + region`.
#[derive(Debug, Clone, Default)]
pub struct RegionIndex {
    entries: HashMap<String, String>,
}

impl RegionIndex {
    /// Load an override file.
    ///
    /// A missing file yields an empty index. A file that exists but cannot
    /// be read, or does not match the `{service: [{id, endpoint}, ...]}`
    /// shape, is a [`RegionError`].
    pub fn load(path: &Path) -> Result<Self, RegionError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no region override file");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|e| RegionError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let index = Self::parse(&raw).map_err(|e| RegionError::Invalid {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        tracing::debug!(
            path = %path.display(),
            entries = index.len(),
            "loaded region overrides"
        );
        Ok(index)
    }

    fn parse(raw: &str) -> Result<Self, serde_yaml::Error> {
        let doc: HashMap<String, Vec<OverrideEntry>> = serde_yaml::from_str(raw)?;

        let mut entries = HashMap::new();
        for (service, list) in doc {
            for entry in list {
                if entry.id.is_empty() || entry.endpoint.is_empty() {
                    continue;
                }
                entries.insert(profile_key(&service, &entry.id), entry.endpoint);
            }
        }
        Ok(Self { entries })
    }

    /// The process-wide index, populated on first use.
    ///
    /// Exactly one load runs per process, even under concurrent first
    /// access; every caller observes the fully populated result. A load
    /// failure is cached and returned to every caller.
    pub fn shared() -> Result<Arc<RegionIndex>, RegionError> {
        SHARED_INDEX
            .get_or_init(|| {
                let index = match default_path() {
                    Some(path) => Self::load(&path)?,
                    None => Self::default(),
                };
                Ok(Arc::new(index))
            })
            .clone()
    }

    pub fn endpoint_of(&self, service: &str, region: &str) -> Option<&str> {
        self.entries
            .get(&profile_key(service, region))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-service endpoint resolver.
///
/// Holds the shared (or an injected) index; [`RegionResolver::resolve`] is
/// a pure read.
#[derive(Debug, Clone)]
pub struct RegionResolver {
    service: String,
    index: Arc<RegionIndex>,
}

impl RegionResolver {
    /// Resolver backed by the process-wide override index.
    pub fn new(service: impl Into<String>) -> Result<Self, RegionError> {
        Ok(Self {
            service: service.into(),
            index: RegionIndex::shared()?,
        })
    }

    /// Resolver over an explicit index (tests, dependency injection).
    pub fn with_index(service: impl Into<String>, index: Arc<RegionIndex>) -> Self {
        Self {
            service: service.into(),
            index,
        }
    }

    /// Endpoint for `region`, or `None` when neither the override file nor
    /// the built-in defaults know it.
    pub fn resolve(&self, region: &str) -> Option<String> {
        if let Some(endpoint) = self.index.endpoint_of(&self.service, region) {
            return Some(endpoint.to_string());
        }
        default_endpoint(&self.service, region)
    }
}

fn profile_key(service: &str, region: &str) -> String {
    format!("{}{}", service.to_uppercase(), region)
}

fn default_endpoint(service: &str, region: &str) -> Option<String> {
    if !KNOWN_REGIONS.contains(&region) {
        return None;
    }
    Some(format!(
        "https://{}.{}.{}",
        service.to_lowercase(),
        region,
        DEFAULT_ENDPOINT_DOMAIN
    ))
}

fn default_path() -> Option<PathBuf> {
    match std::env::var(REGIONS_FILE_ENV) {
        Ok(path) if !path.is_empty() => return Some(PathBuf::from(path)),
        _ => {}
    }
    dirs::home_dir().map(|home| home.join(REGIONS_DIR).join(REGIONS_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const OVERRIDES: &str = r#"
sfs:
  - id: ap-east-1
    endpoint: https://sfs.internal.example.com
  - id: eu-west-1
    endpoint: ""
waf:
  - id: ""
    endpoint: https://waf.internal.example.com
  - id: na-east-1
    endpoint: https://waf-na.internal.example.com
"#;

    #[test]
    fn load_keeps_complete_entries_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.yaml");
        fs::write(&path, OVERRIDES).unwrap();

        let index = RegionIndex::load(&path).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.endpoint_of("sfs", "ap-east-1"),
            Some("https://sfs.internal.example.com")
        );
        assert_eq!(
            index.endpoint_of("waf", "na-east-1"),
            Some("https://waf-na.internal.example.com")
        );
        // Entries with an empty id or endpoint are skipped.
        assert_eq!(index.endpoint_of("sfs", "eu-west-1"), None);
    }

    #[test]
    fn lookup_is_case_insensitive_in_the_service_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.yaml");
        fs::write(&path, OVERRIDES).unwrap();

        let index = RegionIndex::load(&path).unwrap();
        assert_eq!(
            index.endpoint_of("SFS", "ap-east-1"),
            index.endpoint_of("sfs", "ap-east-1")
        );
    }

    #[test]
    fn missing_file_is_an_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let index = RegionIndex::load(&dir.path().join("nope.yaml")).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.endpoint_of("sfs", "ap-east-1"), None);
    }

    #[test]
    fn malformed_file_is_a_fatal_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.yaml");
        fs::write(&path, "sfs: just-a-string\n").unwrap();

        let err = RegionIndex::load(&path).unwrap_err();
        assert!(matches!(err, RegionError::Invalid { .. }), "got {err:?}");
    }

    #[test]
    fn resolver_falls_back_to_default_endpoints() {
        let resolver = RegionResolver::with_index("sfs", Arc::new(RegionIndex::default()));
        assert_eq!(
            resolver.resolve("ap-east-1").as_deref(),
            Some("https://sfs.ap-east-1.stratocloud.com")
        );
        assert_eq!(resolver.resolve("atlantis-1"), None);
    }

    #[test]
    fn override_wins_over_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.yaml");
        fs::write(&path, OVERRIDES).unwrap();

        let index = Arc::new(RegionIndex::load(&path).unwrap());
        let resolver = RegionResolver::with_index("sfs", index);
        assert_eq!(
            resolver.resolve("ap-east-1").as_deref(),
            Some("https://sfs.internal.example.com")
        );
    }

    #[test]
    fn concurrent_first_access_loads_once() {
        static ONCE: OnceLock<Result<Arc<RegionIndex>, RegionError>> = OnceLock::new();
        static LOADS: AtomicUsize = AtomicUsize::new(0);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.yaml");
        fs::write(&path, OVERRIDES).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || {
                    ONCE.get_or_init(|| {
                        LOADS.fetch_add(1, Ordering::SeqCst);
                        RegionIndex::load(&path).map(Arc::new)
                    })
                    .clone()
                    .unwrap()
                })
            })
            .collect();

        let indexes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(LOADS.load(Ordering::SeqCst), 1);
        for index in &indexes {
            assert!(Arc::ptr_eq(index, &indexes[0]));
            assert_eq!(index.len(), 2);
        }
    }

    #[test]
    #[serial]
    fn env_var_takes_precedence_over_home_dir() {
        temp_env::with_var(REGIONS_FILE_ENV, Some("/tmp/custom-regions.yaml"), || {
            assert_eq!(
                default_path(),
                Some(PathBuf::from("/tmp/custom-regions.yaml"))
            );
        });
        temp_env::with_var_unset(REGIONS_FILE_ENV, || {
            let path = default_path().unwrap();
            assert!(path.ends_with(".strato/regions.yaml"));
        });
    }

    #[test]
    fn shared_index_returns_the_same_instance() {
        let first = RegionIndex::shared().unwrap();
        let second = RegionIndex::shared().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
