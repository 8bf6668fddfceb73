use rand::thread_rng;
use rand::Rng;

use super::backend::DiscoveryBehaviour;
use super::backend::DiscoveryCallback;
use super::backend::Record;
use super::error::ErrorKind;
use super::Result;


/// Validate that `record.header.service_class` equals `class`.
///
/// Grounded in the header-based validation the source's canonical
/// `validate_config` performs before a record is cached or written.
pub fn validate_record(record: &Record, class: &str) -> Result<()> {
    let declared = record
        .get("header")
        .and_then(|header| header.get("service_class"))
        .and_then(|value| value.as_str());
    match declared {
        Some(declared) if declared == class => Ok(()),
        Some(declared) => Err(ErrorKind::DiscoveryValidation(format!(
            "header.service_class '{}' does not match requested class '{}'",
            declared, class
        ))
        .into()),
        None => Err(ErrorKind::DiscoveryValidation(
            "record is missing header.service_class".into(),
        )
        .into()),
    }
}

/// Stamp `header.metadata.service_name` and `header.metadata.key` on `record`.
pub fn stamp_metadata(record: &mut Record, service_name: &str, key: Option<&str>) {
    let mapping = record
        .as_mapping_mut()
        .expect("discovery record must be a YAML mapping");
    let header_key = Record::String("header".into());
    if mapping.get(&header_key).and_then(Record::as_mapping).is_none() {
        mapping.insert(header_key.clone(), Record::Mapping(Default::default()));
    }
    let header = mapping
        .get_mut(&header_key)
        .and_then(Record::as_mapping_mut)
        .expect("discovery record header must be a YAML mapping");

    let metadata_key = Record::String("metadata".into());
    if header.get(&metadata_key).and_then(Record::as_mapping).is_none() {
        header.insert(metadata_key.clone(), Record::Mapping(Default::default()));
    }
    let metadata = header
        .get_mut(&metadata_key)
        .and_then(Record::as_mapping_mut)
        .expect("discovery record header.metadata must be a YAML mapping");

    metadata.insert(
        Record::String("service_name".into()),
        Record::String(service_name.into()),
    );
    if let Some(key) = key {
        metadata.insert(Record::String("key".into()), Record::String(key.into()));
    }
}

/// Split a `class/name[.ext]` path into its `(class, name)` components.
pub fn parse_config_path(path: &str) -> Result<(String, String)> {
    let path = path.trim_start_matches('/');
    let (class, name) = path
        .rsplit_once('/')
        .ok_or_else(|| ErrorKind::DiscoveryValidation(format!("invalid discovery path '{}'", path)))?;
    let name = name
        .rsplit_once('.')
        .map(|(stem, _ext)| stem)
        .unwrap_or(name);
    Ok((class.to_string(), name.to_string()))
}

/// Choose one record uniformly at random from `records`.
pub fn choose_one(records: &[Record]) -> Option<Record> {
    if records.is_empty() {
        return None;
    }
    let index = thread_rng().gen_range(0, records.len());
    Some(records[index].clone())
}


/// Single-result discovery view: `load_config` returns (at most) one record,
/// chosen uniformly at random among live providers on each call.
pub struct Discovery(Box<dyn DiscoveryBehaviour>);

impl Discovery {
    pub(crate) fn new(inner: Box<dyn DiscoveryBehaviour>) -> Self {
        Discovery(inner)
    }

    /// Load one provider record for `class/name`, selected at random.
    pub fn load_config(
        &self,
        class: &str,
        name: &str,
        callback: Option<DiscoveryCallback>,
    ) -> Result<Option<Record>> {
        let records = self.0.load_config(class, name, callback)?;
        Ok(choose_one(&records))
    }

    /// Load one provider record for a `class/name[.ext]` path.
    pub fn load_config_via_path(
        &self,
        path: &str,
        callback: Option<DiscoveryCallback>,
    ) -> Result<Option<Record>> {
        let (class, name) = parse_config_path(path)?;
        self.load_config(&class, &name, callback)
    }

    pub fn get_service_classes(&self) -> Result<Vec<String>> {
        self.0.get_service_classes()
    }

    pub fn get_service_names(&self, class: &str) -> Result<Vec<String>> {
        self.0.get_service_names(class)
    }

    pub fn count_nodes(&self, class: &str, name: &str) -> Result<usize> {
        self.0.count_nodes(class, name)
    }

    pub fn write_distributed_config(
        &self,
        class: &str,
        name: &str,
        record: Record,
        key: Option<String>,
        interface: &str,
        ephemeral: bool,
    ) -> Result<String> {
        self.0
            .write_distributed_config(class, name, record, key, interface, ephemeral)
    }

    pub fn remove_stale_config(&self, class: &str, name: &str, key: &str) -> Result<()> {
        self.0.remove_stale_config(class, name, key)
    }
}


/// All-results discovery view: `load_config` returns every live provider.
pub struct DiscoveryMulti(Box<dyn DiscoveryBehaviour>);

impl DiscoveryMulti {
    pub(crate) fn new(inner: Box<dyn DiscoveryBehaviour>) -> Self {
        DiscoveryMulti(inner)
    }

    /// Load every provider record for `class/name`.
    pub fn load_config(
        &self,
        class: &str,
        name: &str,
        callback: Option<DiscoveryCallback>,
    ) -> Result<Vec<Record>> {
        self.0.load_config(class, name, callback)
    }

    /// Load every provider record for a `class/name[.ext]` path.
    pub fn load_config_via_path(
        &self,
        path: &str,
        callback: Option<DiscoveryCallback>,
    ) -> Result<Vec<Record>> {
        let (class, name) = parse_config_path(path)?;
        self.load_config(&class, &name, callback)
    }

    pub fn get_service_classes(&self) -> Result<Vec<String>> {
        self.0.get_service_classes()
    }

    pub fn get_service_names(&self, class: &str) -> Result<Vec<String>> {
        self.0.get_service_names(class)
    }

    pub fn count_nodes(&self, class: &str, name: &str) -> Result<usize> {
        self.0.count_nodes(class, name)
    }

    pub fn write_distributed_config(
        &self,
        class: &str,
        name: &str,
        record: Record,
        key: Option<String>,
        interface: &str,
        ephemeral: bool,
    ) -> Result<String> {
        self.0
            .write_distributed_config(class, name, record, key, interface, ephemeral)
    }

    pub fn remove_stale_config(&self, class: &str, name: &str, key: &str) -> Result<()> {
        self.0.remove_stale_config(class, name, key)
    }
}


#[cfg(test)]
mod tests {
    use super::parse_config_path;
    use super::stamp_metadata;
    use super::validate_record;
    use serde_yaml::Value;

    #[test]
    fn parses_plain_path() {
        let (class, name) = parse_config_path("mysql/reports").unwrap();
        assert_eq!(class, "mysql");
        assert_eq!(name, "reports");
    }

    #[test]
    fn parses_path_with_extension() {
        let (class, name) = parse_config_path("mysql/reports.yaml").unwrap();
        assert_eq!(class, "mysql");
        assert_eq!(name, "reports");
    }

    #[test]
    fn parses_nested_class() {
        let (class, name) = parse_config_path("datastore/mysql/reports").unwrap();
        assert_eq!(class, "datastore/mysql");
        assert_eq!(name, "reports");
    }

    #[test]
    fn rejects_path_without_slash() {
        assert!(parse_config_path("reports").is_err());
    }

    #[test]
    fn validates_matching_class() {
        let record: Value = serde_yaml::from_str("header:\n  service_class: mysql\n").unwrap();
        assert!(validate_record(&record, "mysql").is_ok());
    }

    #[test]
    fn rejects_mismatched_class() {
        let record: Value = serde_yaml::from_str("header:\n  service_class: mysql\n").unwrap();
        assert!(validate_record(&record, "postgres").is_err());
    }

    #[test]
    fn rejects_missing_header() {
        let record: Value = serde_yaml::from_str("host: 10.0.0.1\n").unwrap();
        assert!(validate_record(&record, "mysql").is_err());
    }

    #[test]
    fn stamps_service_name_and_key() {
        let mut record: Value =
            serde_yaml::from_str("header:\n  service_class: mysql\nhost: 10.0.0.1\n").unwrap();
        stamp_metadata(&mut record, "reports", Some("10.0.0.1"));
        let metadata = &record["header"]["metadata"];
        assert_eq!(metadata["service_name"].as_str(), Some("reports"));
        assert_eq!(metadata["key"].as_str(), Some("10.0.0.1"));
    }
}
