//! Pipeline metadata.
//!
//! Pipeline images carry their metadata as a MessagePack map inside an
//! `AMDGPU` note. This module defines the typed view of that map and the
//! `MetadataDecoder` seam used to turn note payloads into it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::MetadataError;

// AMDGPU note values not mapped by object crate
pub const AMDGPU_NOTE_NAME: &[u8] = b"AMDGPU";
pub const NT_AMDGPU_METADATA: u32 = 32;

/// Oldest and newest metadata major versions understood by [`MsgPackDecoder`].
pub const MIN_MAJOR_VERSION: u32 = 2;
pub const MAX_MAJOR_VERSION: u32 = 3;

/// Turns a metadata note payload into a typed value.
pub trait MetadataDecoder {
    type Output;

    fn decode(&self, payload: &[u8]) -> Result<Self::Output, MetadataError>;
}

/// Decodes PAL code object metadata from MessagePack.
#[derive(Debug, Default, Clone, Copy)]
pub struct MsgPackDecoder;

impl MetadataDecoder for MsgPackDecoder {
    type Output = CodeObjectMetadata;

    fn decode(&self, payload: &[u8]) -> Result<CodeObjectMetadata, MetadataError> {
        let header: VersionHeader = rmp_serde::from_slice(payload).map_err(classify)?;
        let version = header.version.ok_or(MetadataError::MissingVersion)?;
        if !(MIN_MAJOR_VERSION..=MAX_MAJOR_VERSION).contains(&version.major) {
            return Err(MetadataError::UnsupportedVersion {
                major: version.major,
                minor: version.minor,
            });
        }
        rmp_serde::from_slice(payload).map_err(classify)
    }
}

fn classify(err: rmp_serde::decode::Error) -> MetadataError {
    use rmp_serde::decode::Error;
    match &err {
        Error::InvalidMarkerRead(io) | Error::InvalidDataRead(io)
            if io.kind() == std::io::ErrorKind::UnexpectedEof =>
        {
            MetadataError::Truncated
        }
        _ => MetadataError::Schema(err.to_string()),
    }
}

#[derive(Deserialize)]
struct VersionHeader {
    #[serde(rename = "amdpal.version", default)]
    version: Option<MetadataVersion>,
}

/// Metadata version, encoded as `[major, minor]`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct MetadataVersion {
    pub major: u32,
    pub minor: u32,
}

impl From<[u32; 2]> for MetadataVersion {
    fn from([major, minor]: [u32; 2]) -> Self {
        Self { major, minor }
    }
}

impl From<MetadataVersion> for [u32; 2] {
    fn from(version: MetadataVersion) -> Self {
        [version.major, version.minor]
    }
}

/// Top level of the code object metadata map.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeObjectMetadata {
    #[serde(rename = "amdpal.version")]
    pub version: MetadataVersion,
    #[serde(rename = "amdpal.pipelines", default)]
    pub pipelines: Vec<PipelineMetadata>,
}

impl CodeObjectMetadata {
    /// The first pipeline, which is the only one in single-pipeline images.
    pub fn pipeline(&self) -> Option<&PipelineMetadata> {
        self.pipelines.first()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    #[serde(rename = ".name", default)]
    pub name: String,
    #[serde(rename = ".type", default, skip_serializing_if = "Option::is_none")]
    pub pipeline_type: Option<String>,
    #[serde(rename = ".api", default, skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    #[serde(rename = ".internal_pipeline_hash", default, skip_serializing_if = "Option::is_none")]
    pub internal_pipeline_hash: Option<[u64; 2]>,
    #[serde(rename = ".shaders", default)]
    pub shaders: BTreeMap<String, ShaderMetadata>,
    /// Keyed by [`HardwareStage::metadata_key`](crate::symbol::HardwareStage::metadata_key).
    #[serde(rename = ".hardware_stages", default)]
    pub hardware_stages: BTreeMap<String, HardwareStageMetadata>,
    /// Register offset to value.
    #[serde(rename = ".registers", default)]
    pub registers: BTreeMap<u32, u32>,
    #[serde(rename = ".user_data_limit", default, skip_serializing_if = "Option::is_none")]
    pub user_data_limit: Option<u32>,
    #[serde(rename = ".spill_threshold", default, skip_serializing_if = "Option::is_none")]
    pub spill_threshold: Option<u32>,
}

impl PipelineMetadata {
    pub fn hardware_stage(&self, stage: crate::symbol::HardwareStage) -> Option<&HardwareStageMetadata> {
        self.hardware_stages.get(stage.metadata_key())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderMetadata {
    #[serde(rename = ".api_shader_hash", default, skip_serializing_if = "Option::is_none")]
    pub api_shader_hash: Option<[u64; 2]>,
    #[serde(rename = ".hardware_mapping", default)]
    pub hardware_mapping: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareStageMetadata {
    #[serde(rename = ".entry_point", default, skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,
    #[serde(rename = ".scratch_memory_size", default, skip_serializing_if = "Option::is_none")]
    pub scratch_memory_size: Option<u32>,
    #[serde(rename = ".lds_size", default, skip_serializing_if = "Option::is_none")]
    pub lds_size: Option<u32>,
    #[serde(rename = ".vgpr_count", default, skip_serializing_if = "Option::is_none")]
    pub vgpr_count: Option<u32>,
    #[serde(rename = ".sgpr_count", default, skip_serializing_if = "Option::is_none")]
    pub sgpr_count: Option<u32>,
    #[serde(rename = ".vgpr_limit", default, skip_serializing_if = "Option::is_none")]
    pub vgpr_limit: Option<u32>,
    #[serde(rename = ".sgpr_limit", default, skip_serializing_if = "Option::is_none")]
    pub sgpr_limit: Option<u32>,
    #[serde(rename = ".threadgroup_dimensions", default, skip_serializing_if = "Option::is_none")]
    pub threadgroup_dimensions: Option<[u32; 3]>,
    #[serde(rename = ".wavefront_size", default, skip_serializing_if = "Option::is_none")]
    pub wavefront_size: Option<u32>,
    #[serde(rename = ".user_sgprs", default, skip_serializing_if = "Option::is_none")]
    pub user_sgprs: Option<u32>,
    #[serde(rename = ".uses_uavs", default, skip_serializing_if = "Option::is_none")]
    pub uses_uavs: Option<bool>,
}
