use std::io::Read;
use std::path::PathBuf;

use flate2::read::GzDecoder;
use sha2::{Digest, Sha256, Sha512};
use snafu::{ResultExt, ensure};

use crate::entries::Resource;
use crate::fetch::fetcher::{
    DecompressSnafu, FetchError, HashMismatchSnafu, MalformedHashSnafu,
    UnsupportedCompressionSnafu, UnsupportedHashSnafu,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

impl Compression {
    pub fn parse(compression: Option<&str>) -> Result<Self, FetchError> {
        match compression {
            None | Some("") => Ok(Compression::None),
            Some("gzip") => Ok(Compression::Gzip),
            Some(other) => UnsupportedCompressionSnafu { compression: other }.fail(),
        }
    }

    pub fn decompress(self, data: Vec<u8>) -> Result<Vec<u8>, FetchError> {
        match self {
            Compression::None => Ok(data),
            Compression::Gzip => {
                let mut decoded = Vec::new();
                GzDecoder::new(data.as_slice())
                    .read_to_end(&mut decoded)
                    .context(DecompressSnafu)?;
                Ok(decoded)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashFunction {
    Sha256,
    Sha512,
}

/// An expected digest of the decoded content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub function: HashFunction,
    pub digest: Vec<u8>,
}

impl Verification {
    /// Parses `<function>-<hex digest>`, e.g. `sha512-cf83e1...`.
    pub fn parse(hash: &str) -> Result<Self, FetchError> {
        let Some((function, digest)) = hash.split_once('-') else {
            return MalformedHashSnafu { hash }.fail();
        };
        let (function, expected_len) = match function {
            "sha256" => (HashFunction::Sha256, 32),
            "sha512" => (HashFunction::Sha512, 64),
            other => return UnsupportedHashSnafu { function: other }.fail(),
        };
        let digest = hex::decode(digest).ok().filter(|d| d.len() == expected_len);
        let Some(digest) = digest else {
            return MalformedHashSnafu { hash }.fail();
        };

        Ok(Self { function, digest })
    }

    pub fn verify(&self, data: &[u8]) -> Result<(), FetchError> {
        let actual = match self.function {
            HashFunction::Sha256 => Sha256::digest(data).to_vec(),
            HashFunction::Sha512 => Sha512::digest(data).to_vec(),
        };
        ensure!(
            actual == self.digest,
            HashMismatchSnafu {
                expected: hex::encode(&self.digest),
                actual: hex::encode(&actual),
            }
        );
        Ok(())
    }
}

/// One write or append needed to materialize a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOperation {
    pub target: PathBuf,
    /// Empty means empty content.
    pub source: String,
    pub compression: Compression,
    pub verification: Option<Verification>,
    pub append: bool,
}

impl FetchOperation {
    pub fn from_resource(
        target: PathBuf,
        resource: &Resource,
        append: bool,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            target,
            source: resource.source.clone().unwrap_or_default(),
            compression: Compression::parse(resource.compression.as_deref())?,
            verification: resource
                .verification
                .as_deref()
                .map(Verification::parse)
                .transpose()?,
            append,
        })
    }
}
