use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use failure::ResultExt;

use super::error::ErrorKind;
use super::Result;

/// Default, stock search path for the local fallback registry.
///
/// Tried in order; the first directory that contains a matching document
/// wins. `~` is expanded against the current user's home directory.
fn default_search_path() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(".")];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".pettingzoo"));
    }
    paths.push(PathBuf::from("/etc/pettingzoo"));
    paths
}

/// Read-only YAML document store used by `Discovery` when no zookeeper
/// provider is available for a service.
///
/// Lookups are memoized per `(default, override_key)` pair so repeated
/// `loadConfig` calls against an empty zookeeper registry do not re-read the
/// filesystem every time.
pub struct LocalStore {
    search_path: Vec<PathBuf>,
    cache: Mutex<HashMap<(String, Option<String>), Option<serde_yaml::Value>>>,
}

impl LocalStore {
    /// Construct a store with the stock search path (`.`, `~/.pettingzoo`,
    /// `/etc/pettingzoo`) plus any configured extra directories, searched
    /// first.
    pub fn new(extra_search_path: Vec<String>) -> LocalStore {
        let mut search_path: Vec<PathBuf> = extra_search_path.into_iter().map(PathBuf::from).collect();
        search_path.extend(default_search_path());
        LocalStore {
            search_path,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Look up `key`, trying `override_key` (if given) before `key` itself.
    ///
    /// Documents are located as `<search path entry>/<key>` or
    /// `<search path entry>/<key>.yml`, whichever is found first.
    pub fn lookup(&self, key: &str, override_key: Option<&str>) -> Result<Option<serde_yaml::Value>> {
        let cache_key = (key.to_string(), override_key.map(str::to_string));
        let mut cache = self.cache.lock().expect("LocalStore cache lock poisoned");
        if let Some(cached) = cache.get(&cache_key) {
            return Ok(cached.clone());
        }

        let lookup_key = override_key.unwrap_or(key);
        let document = self.read_from_search_path(lookup_key)?;
        cache.insert(cache_key, document.clone());
        Ok(document)
    }

    fn read_from_search_path(&self, key: &str) -> Result<Option<serde_yaml::Value>> {
        for dir in &self.search_path {
            for candidate in &[dir.join(key), dir.join(format!("{}.yml", key))] {
                if let Some(document) = self.read_document(candidate)? {
                    return Ok(Some(document));
                }
            }
        }
        Ok(None)
    }

    fn read_document(&self, path: &Path) -> Result<Option<serde_yaml::Value>> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let document = serde_yaml::from_str(&content)
                    .with_context(|_| ErrorKind::Decode("local store document"))?;
                Ok(Some(document))
            }
            Err(ref error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error).with_context(|_| {
                ErrorKind::LocalStore(path.to_string_lossy().into_owned())
            })?,
        }
    }
}

impl Default for LocalStore {
    fn default() -> LocalStore {
        LocalStore::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::LocalStore;
    use std::fs;
    use std::io::Write;

    #[test]
    fn finds_document_in_search_path() {
        let dir = std::env::temp_dir().join("coordinator-local-store-test-a");
        fs::create_dir_all(&dir).unwrap();
        let mut file = fs::File::create(dir.join("mysql-reports.yml")).unwrap();
        writeln!(file, "host: 10.0.0.1").unwrap();

        let store = LocalStore::new(vec![dir.to_string_lossy().into_owned()]);
        let document = store.lookup("mysql-reports", None).unwrap().unwrap();
        assert_eq!(document["host"].as_str(), Some("10.0.0.1"));
    }

    #[test]
    fn missing_document_returns_none() {
        let store = LocalStore::new(vec!["/definitely/not/a/real/path".into()]);
        assert!(store.lookup("whatever", None).unwrap().is_none());
    }

    #[test]
    fn override_key_takes_precedence() {
        let dir = std::env::temp_dir().join("coordinator-local-store-test-b");
        fs::create_dir_all(&dir).unwrap();
        let mut file = fs::File::create(dir.join("special.yml")).unwrap();
        writeln!(file, "host: 10.0.0.9").unwrap();

        let store = LocalStore::new(vec![dir.to_string_lossy().into_owned()]);
        let document = store.lookup("unused", Some("special")).unwrap().unwrap();
        assert_eq!(document["host"].as_str(), Some("10.0.0.9"));
    }
}
