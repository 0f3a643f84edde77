//! Compiled covenant artifacts
//!
//! The artifact is produced by an external compiler; the agent only needs
//! to know it exists and is well-formed before it arms the cycle timer.
//! A missing or malformed artifact is startup-fatal by design: an agent
//! must refuse to run against a contract it cannot describe.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("artifact not found at {path}; run compile first")]
    Missing { path: PathBuf },

    #[error("artifact at {path} is unreadable: {message}")]
    Unreadable { path: PathBuf, message: String },

    #[error("artifact at {path} is malformed: {message}")]
    Malformed { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiInput {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiFunction {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<AbiInput>,
}

/// A compiled covenant: name, constructor inputs, callable functions, and
/// bytecode. Mirrors the compiler's JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    pub contract_name: String,
    #[serde(default)]
    pub constructor_inputs: Vec<AbiInput>,
    #[serde(default)]
    pub abi: Vec<AbiFunction>,
    pub bytecode: String,
}

impl ContractArtifact {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ArtifactError::Missing {
                path: path.to_path_buf(),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ArtifactError::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| ArtifactError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Whether the covenant exposes a function by this name.
    pub fn has_function(&self, name: &str) -> bool {
        self.abi.iter().any(|f| f.name == name)
    }
}
