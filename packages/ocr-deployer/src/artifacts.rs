//! Compiled contract artifacts
//!
//! Deployment needs creation bytecode, which this crate does not compile. It is
//! read from build output: Foundry JSON (`{"bytecode": {"object": "0x.."}}`),
//! Hardhat JSON (`{"bytecode": "0x.."}`) or a raw hex `.bin` file, one file per
//! contract named after [`ContractKind::artifact_name`].

use alloy::primitives::Bytes;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{DeployError, Result};

/// Every contract this crate knows how to deploy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKind {
    /// ERC-677 fee token
    Token,
    FluxAggregator,
    OffchainAggregator,
    Storage,
    Vrf,
}

impl ContractKind {
    pub const ALL: [ContractKind; 5] = [
        ContractKind::Token,
        ContractKind::FluxAggregator,
        ContractKind::OffchainAggregator,
        ContractKind::Storage,
        ContractKind::Vrf,
    ];

    /// File stem of the compiled artifact
    pub fn artifact_name(&self) -> &'static str {
        match self {
            ContractKind::Token => "LinkToken",
            ContractKind::FluxAggregator => "FluxAggregator",
            ContractKind::OffchainAggregator => "OffchainAggregator",
            ContractKind::Storage => "Store",
            ContractKind::Vrf => "VRF",
        }
    }

    /// Human readable name for logs
    pub fn label(&self) -> &'static str {
        match self {
            ContractKind::Token => "Fee Token",
            ContractKind::FluxAggregator => "Flux Aggregator",
            ContractKind::OffchainAggregator => "OffChain Aggregator",
            ContractKind::Storage => "Storage",
            ContractKind::Vrf => "VRF",
        }
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for ContractKind {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "token" | "linktoken" => Ok(ContractKind::Token),
            "flux" | "fluxaggregator" => Ok(ContractKind::FluxAggregator),
            "ocr" | "offchainaggregator" => Ok(ContractKind::OffchainAggregator),
            "storage" | "store" => Ok(ContractKind::Storage),
            "vrf" => Ok(ContractKind::Vrf),
            other => Err(DeployError::Config(format!("unknown contract kind: {}", other))),
        }
    }
}

// ============================================================================
// Artifact File Formats
// ============================================================================

#[derive(Debug, Deserialize)]
struct ArtifactFile {
    bytecode: BytecodeField,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BytecodeField {
    /// Hardhat: plain hex string
    Hex(String),
    /// Foundry: `{ "object": "0x..", "sourceMap": .., "linkReferences": .. }`
    Object { object: String },
}

impl BytecodeField {
    fn hex(&self) -> &str {
        match self {
            BytecodeField::Hex(s) => s,
            BytecodeField::Object { object } => object,
        }
    }
}

fn decode_hex(raw: &str, path: &Path) -> Result<Bytes> {
    let trimmed = raw.trim();
    let cleaned = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if cleaned.is_empty() {
        return Err(DeployError::Artifact {
            path: path.to_path_buf(),
            reason: "bytecode is empty".to_string(),
        });
    }
    // Unlinked libraries show up as `__$...$__` placeholders
    if cleaned.contains("__") {
        return Err(DeployError::Artifact {
            path: path.to_path_buf(),
            reason: "bytecode has unlinked library references".to_string(),
        });
    }
    hex::decode(cleaned)
        .map(Bytes::from)
        .map_err(|e| DeployError::Artifact {
            path: path.to_path_buf(),
            reason: format!("invalid hex: {}", e),
        })
}

// ============================================================================
// Artifact Store
// ============================================================================

/// Creation bytecode per contract kind
#[derive(Debug, Clone, Default)]
pub struct ContractArtifacts {
    bytecode: HashMap<ContractKind, Bytes>,
    source: Option<PathBuf>,
}

impl ContractArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every artifact present in `dir`. Missing files are skipped; a
    /// kind without bytecode only fails when it is deployed.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(DeployError::Artifact {
                path: dir.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        let mut artifacts = Self {
            bytecode: HashMap::new(),
            source: Some(dir.to_path_buf()),
        };

        for kind in ContractKind::ALL {
            let json = dir.join(format!("{}.json", kind.artifact_name()));
            let bin = dir.join(format!("{}.bin", kind.artifact_name()));

            let code = if json.is_file() {
                Some(Self::read_json(&json)?)
            } else if bin.is_file() {
                Some(Self::read_bin(&bin)?)
            } else {
                None
            };

            match code {
                Some(code) => {
                    debug!(contract = %kind, bytes = code.len(), "Loaded contract artifact");
                    artifacts.bytecode.insert(kind, code);
                }
                None => debug!(contract = %kind, dir = %dir.display(), "No artifact found"),
            }
        }

        info!(
            dir = %dir.display(),
            loaded = artifacts.bytecode.len(),
            "Contract artifacts loaded"
        );
        Ok(artifacts)
    }

    fn read_json(path: &Path) -> Result<Bytes> {
        let content = std::fs::read_to_string(path).map_err(|e| DeployError::Artifact {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let artifact: ArtifactFile =
            serde_json::from_str(&content).map_err(|e| DeployError::Artifact {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        decode_hex(artifact.bytecode.hex(), path)
    }

    fn read_bin(path: &Path) -> Result<Bytes> {
        let content = std::fs::read_to_string(path).map_err(|e| DeployError::Artifact {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        decode_hex(&content, path)
    }

    /// Register bytecode for a kind, replacing any loaded artifact
    pub fn with_bytecode(mut self, kind: ContractKind, code: impl Into<Bytes>) -> Self {
        self.bytecode.insert(kind, code.into());
        self
    }

    pub fn bytecode(&self, kind: ContractKind) -> Result<&Bytes> {
        self.bytecode
            .get(&kind)
            .ok_or(DeployError::MissingArtifact(kind))
    }

    pub fn contains(&self, kind: ContractKind) -> bool {
        self.bytecode.contains_key(&kind)
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Creation code followed by ABI-encoded constructor arguments
    pub fn init_code(&self, kind: ContractKind, constructor_args: &[u8]) -> Result<Bytes> {
        let code = self.bytecode(kind)?;
        let mut init = Vec::with_capacity(code.len() + constructor_args.len());
        init.extend_from_slice(code);
        init.extend_from_slice(constructor_args);
        Ok(Bytes::from(init))
    }
}
