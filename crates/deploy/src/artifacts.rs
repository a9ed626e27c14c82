//! Hardhat compilation artifacts: creation bytecode and verification metadata.

use std::path::{Path, PathBuf};

use alloy_core::primitives::Bytes;
use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;

/// Default location of the compilation output.
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContractArtifact {
    contract_name: String,
    source_name: String,
    bytecode: Bytes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugArtifact {
    build_info: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildInfo {
    solc_long_version: String,
    input: Value,
}

/// Everything an explorer needs to verify a contract's source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMetadata {
    /// Fully-qualified name, e.g. `contracts/SkillToken.sol:SkillToken`.
    pub contract_name: String,
    /// Compiler version as explorers expect it, e.g. `v0.8.20+commit.a1b79de6`.
    pub compiler_version: String,
    /// Solidity standard-JSON compiler input.
    pub standard_json_input: String,
}

/// Read-only view over a Hardhat `artifacts/` directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creation bytecode of `contract`.
    pub fn bytecode(&self, contract: &str) -> anyhow::Result<Bytes> {
        let artifact = self.load_artifact(contract)?;
        if artifact.bytecode.is_empty() {
            anyhow::bail!(
                "Artifact for {} has no bytecode (abstract contract or interface?)",
                contract
            );
        }
        Ok(artifact.bytecode)
    }

    /// Verification metadata of `contract`, read through its debug file and build info.
    pub fn source(&self, contract: &str) -> anyhow::Result<SourceMetadata> {
        let artifact_path = self.artifact_path(contract)?;
        let artifact = read_json::<ContractArtifact>(&artifact_path)?;

        let debug_path = artifact_path.with_file_name(format!("{}.dbg.json", contract));
        let debug = read_json::<DebugArtifact>(&debug_path)?;

        let artifact_dir = artifact_path
            .parent()
            .context("Artifact path has no parent directory")?;
        let build_info = read_json::<BuildInfo>(&artifact_dir.join(&debug.build_info))?;

        let standard_json_input = serde_json::to_string(&build_info.input)
            .context("Failed to serialize standard JSON input")?;

        Ok(SourceMetadata {
            contract_name: format!("{}:{}", artifact.source_name, artifact.contract_name),
            compiler_version: format!("v{}", build_info.solc_long_version),
            standard_json_input,
        })
    }

    fn load_artifact(&self, contract: &str) -> anyhow::Result<ContractArtifact> {
        read_json(&self.artifact_path(contract)?)
    }

    /// Locate `<Name>.sol/<Name>.json`, preferring the conventional `contracts/` location.
    fn artifact_path(&self, contract: &str) -> anyhow::Result<PathBuf> {
        let file_name = format!("{}.json", contract);
        let direct = self
            .root
            .join("contracts")
            .join(format!("{}.sol", contract))
            .join(&file_name);
        if direct.is_file() {
            return Ok(direct);
        }

        find_file(&self.root, &file_name)?.with_context(|| {
            format!(
                "No artifact found for {} under {}",
                contract,
                self.root.display()
            )
        })
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Depth-first search for `file_name`, skipping `build-info`.
fn find_file(dir: &Path, file_name: &str) -> anyhow::Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            if path.file_name().is_some_and(|name| name == "build-info") {
                continue;
            }
            if let Some(found) = find_file(&path, file_name)? {
                return Ok(Some(found));
            }
        } else if path.file_name().is_some_and(|name| name == file_name) {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempdir::TempDir;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn hardhat_layout() -> TempDir {
        let dir = TempDir::new("skillchain-artifacts").unwrap();
        let root = dir.path();

        write(
            &root.join("contracts/SkillToken.sol/SkillToken.json"),
            r#"{"contractName":"SkillToken","sourceName":"contracts/SkillToken.sol","bytecode":"0x6080604052"}"#,
        );
        write(
            &root.join("contracts/SkillToken.sol/SkillToken.dbg.json"),
            r#"{"_format":"hh-sol-dbg-1","buildInfo":"../../build-info/abc123.json"}"#,
        );
        write(
            &root.join("build-info/abc123.json"),
            r#"{"solcLongVersion":"0.8.20+commit.a1b79de6","input":{"language":"Solidity","sources":{}}}"#,
        );
        write(
            &root.join("contracts/interfaces/IEscrow.sol/IEscrow.json"),
            r#"{"contractName":"IEscrow","sourceName":"contracts/interfaces/IEscrow.sol","bytecode":"0x"}"#,
        );
        dir
    }

    #[test]
    fn test_bytecode() {
        let dir = hardhat_layout();
        let store = ArtifactStore::new(dir.path());

        let bytecode = store.bytecode("SkillToken").unwrap();
        assert_eq!(bytecode.as_ref(), &[0x60, 0x80, 0x60, 0x40, 0x52]);
    }

    #[test]
    fn test_empty_bytecode_rejected() {
        let dir = hardhat_layout();
        let store = ArtifactStore::new(dir.path());

        let err = store.bytecode("IEscrow").unwrap_err();
        assert!(err.to_string().contains("no bytecode"));
    }

    #[test]
    fn test_missing_artifact() {
        let dir = hardhat_layout();
        let store = ArtifactStore::new(dir.path());
        assert!(store.bytecode("ProjectEscrow").is_err());
    }

    #[test]
    fn test_source_metadata() {
        let dir = hardhat_layout();
        let store = ArtifactStore::new(dir.path());

        let source = store.source("SkillToken").unwrap();
        assert_eq!(source.contract_name, "contracts/SkillToken.sol:SkillToken");
        assert_eq!(source.compiler_version, "v0.8.20+commit.a1b79de6");
        assert!(source.standard_json_input.contains("\"language\":\"Solidity\""));
    }
}
