use std::path::{Path, PathBuf};

use saphyr::{LoadableYamlNode, Yaml};
use snafu::prelude::*;
use tracing::debug;

use crate::config::fields::{self, Mapping, field};
use crate::entries::{Directory, File, Link};

/// The declared filesystem entries, each section in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Storage {
    pub directories: Vec<Directory>,
    pub files: Vec<File>,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisioningConfig {
    pub storage: Storage,
}

impl ProvisioningConfig {
    pub async fn read(path: &Path) -> Result<Self, ConfigCreationError> {
        debug!(path = %path.display(), "reading config file");
        let bytes = compio::fs::read(path).await.context(ReadSnafu {
            file_path: path.to_path_buf(),
        })?;
        debug!("Successfully read config file: {} bytes", bytes.len());

        let contents = String::from_utf8(bytes).context(EncodingSnafu {
            file_path: path.to_path_buf(),
        })?;
        contents.as_str().try_into()
    }

    fn parse_storage(top_level: &Mapping) -> Result<Storage, ConfigCreationError> {
        let Some(storage) = field(top_level, "storage") else {
            return Ok(Storage::default());
        };
        let storage = storage
            .as_mapping()
            .ok_or(ConfigCreationError::StorageNotMap)?;

        Ok(Storage {
            directories: Self::parse_section(storage, "directories", |map, entry| {
                Ok(Directory {
                    node: fields::node(map, entry)?,
                    mode: fields::mode_field(map, entry)?,
                })
            })?,
            files: Self::parse_section(storage, "files", Self::parse_file)?,
            links: Self::parse_section(storage, "links", |map, entry| {
                let target = fields::string_field(map, "target", entry)?.context(
                    MissingFieldSnafu {
                        entry,
                        field: "target",
                    },
                )?;
                Ok(Link {
                    node: fields::node(map, entry)?,
                    target: PathBuf::from(target),
                    hard: fields::bool_field(map, "hard", entry)?,
                })
            })?,
        })
    }

    fn parse_file(map: &Mapping, entry: &str) -> Result<File, ConfigCreationError> {
        let contents = match field(map, "contents") {
            Some(contents) => fields::resource(contents, &format!("{entry}.contents"))?,
            None => Default::default(),
        };

        let append = match field(map, "append") {
            None => Vec::new(),
            Some(Yaml::Sequence(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| fields::resource(item, &format!("{entry}.append[{index}]")))
                .collect::<Result<_, _>>()?,
            Some(_) => {
                return SectionNotSequenceSnafu {
                    section: format!("{entry}.append"),
                }
                .fail();
            }
        };

        Ok(File {
            node: fields::node(map, entry)?,
            contents,
            append,
            mode: fields::mode_field(map, entry)?,
        })
    }

    /// Parses each mapping of a sequence section, naming entries `section[i]`
    /// in errors.
    fn parse_section<T>(
        storage: &Mapping,
        section: &'static str,
        parse: impl Fn(&Mapping, &str) -> Result<T, ConfigCreationError>,
    ) -> Result<Vec<T>, ConfigCreationError> {
        let Some(items) = field(storage, section) else {
            return Ok(Vec::new());
        };
        let items = items
            .as_sequence()
            .context(SectionNotSequenceSnafu { section })?;

        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let entry = format!("{section}[{index}]");
                let map = item
                    .as_mapping()
                    .context(EntryNotMapSnafu { entry: entry.as_str() })?;
                parse(map, &entry)
            })
            .collect()
    }
}

impl TryFrom<&str> for ProvisioningConfig {
    type Error = ConfigCreationError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents)
            .map_err(|e| ConfigCreationError::ParseError { source: e })?;
        let document = documents
            .first()
            .ok_or(ConfigCreationError::MalformedConfig)?;

        let top_level = document
            .as_mapping()
            .ok_or(ConfigCreationError::TopLevelNotMap)?;

        let storage = Self::parse_storage(top_level)?;
        debug!(
            directories = storage.directories.len(),
            files = storage.files.len(),
            links = storage.links.len(),
            "parsed storage section"
        );

        Ok(ProvisioningConfig { storage })
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigCreationError {
    #[snafu(display("Failed to read the config file: {}", file_path.display()))]
    ReadError {
        file_path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Config file {} is not valid UTF-8", file_path.display()))]
    EncodingError {
        file_path: PathBuf,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Improperly formatted config file"))]
    MalformedConfig,
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Storage section should be a map"))]
    StorageNotMap,
    #[snafu(display("'{}' should be a sequence", section))]
    SectionNotSequence { section: String },
    #[snafu(display("Entry {} should be a map", entry))]
    EntryNotMap { entry: String },
    #[snafu(display("Entry {} is missing '{}'", entry, field))]
    MissingField { entry: String, field: &'static str },
    #[snafu(display("Entry {} has invalid '{}': expected {}", entry, field, expected))]
    InvalidField {
        entry: String,
        field: &'static str,
        expected: &'static str,
    },
    #[snafu(display("Entry {} has relative path '{}'; paths must be absolute", entry, path))]
    RelativePath { entry: String, path: String },
}
