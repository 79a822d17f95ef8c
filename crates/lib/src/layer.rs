//! Layer metadata files.
//!
//! Each layer `<output>/<name>` may be described by `<output>/<name>.toml`.
//! Two incompatible shapes exist:
//!
//! ```toml
//! # flat (API < 0.6)
//! build = true
//! launch = false
//! cache = true
//! [metadata]
//! version = "14"
//! ```
//!
//! ```toml
//! # nested (API >= 0.6)
//! [types]
//! build = true
//! cache = true
//! [metadata]
//! version = "14"
//! ```

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::api::LayerSchema;
use crate::error::BuildError;
use crate::util::files::write_toml;

/// Advisory emitted when a flat-schema file carries a `[types]` table.
pub const TYPES_TABLE_IGNORED: &str = "Warning: types table isn't supported in this module API version. The launch, build and cache flags should be in the top level. Ignoring the values in the types table.";

const FLAG_KEYS: [&str; 3] = ["build", "launch", "cache"];

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayerMetadata {
  #[serde(default)]
  pub build: bool,
  #[serde(default)]
  pub launch: bool,
  #[serde(default)]
  pub cache: bool,
  /// Opaque payload; any TOML value is accepted.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metadata: Option<toml::Value>,
}

impl LayerMetadata {
  /// A layer used by neither build, launch nor cache.
  pub fn is_inert(&self) -> bool {
    !self.build && !self.launch && !self.cache
  }

  /// The metadata payload, unless it is absent or an empty table, array or
  /// string.
  pub fn payload(&self) -> Option<&toml::Value> {
    self.metadata.as_ref().filter(|value| match value {
      toml::Value::Table(table) => !table.is_empty(),
      toml::Value::Array(items) => !items.is_empty(),
      toml::Value::String(text) => !text.is_empty(),
      _ => true,
    })
  }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LayerTypes {
  #[serde(default)]
  build: bool,
  #[serde(default)]
  launch: bool,
  #[serde(default)]
  cache: bool,
}

// Metadata comes first so a scalar payload is written before `[types]`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct NestedLayerFile {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  metadata: Option<toml::Value>,
  #[serde(default)]
  types: LayerTypes,
}

/// Result of decoding a layer metadata file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedLayer {
  pub layer: LayerMetadata,
  /// Non-fatal migration advisory for the caller to log.
  pub advisory: Option<String>,
}

/// Decode `path` with the given schema. A missing file decodes to an empty
/// record.
pub fn decode_layer_metadata(path: &Path, schema: LayerSchema) -> Result<DecodedLayer, BuildError> {
  let content = match fs::read_to_string(path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(DecodedLayer::default()),
    Err(e) => return Err(BuildError::io("read", path, e)),
  };
  let decode_err = |source| BuildError::Decode {
    path: path.to_path_buf(),
    source,
  };
  let table: toml::Table = toml::from_str(&content).map_err(decode_err)?;

  match schema {
    LayerSchema::Flat => {
      let layer: LayerMetadata = toml::from_str(&content).map_err(decode_err)?;
      let advisory = table.contains_key("types").then(|| TYPES_TABLE_IGNORED.to_string());
      Ok(DecodedLayer { layer, advisory })
    }
    LayerSchema::Nested => {
      if FLAG_KEYS.iter().any(|key| table.contains_key(*key)) {
        return Err(BuildError::SchemaViolation {
          path: path.to_path_buf(),
        });
      }
      let file: NestedLayerFile = toml::from_str(&content).map_err(decode_err)?;
      Ok(DecodedLayer {
        layer: LayerMetadata {
          build: file.types.build,
          launch: file.types.launch,
          cache: file.types.cache,
          metadata: file.metadata,
        },
        advisory: None,
      })
    }
  }
}

/// Encode `layer` to `path` in the given schema.
pub fn encode_layer_metadata(path: &Path, layer: &LayerMetadata, schema: LayerSchema) -> Result<(), BuildError> {
  match schema {
    LayerSchema::Flat => write_toml(path, layer),
    LayerSchema::Nested => write_toml(
      path,
      &NestedLayerFile {
        metadata: layer.metadata.clone(),
        types: LayerTypes {
          build: layer.build,
          launch: layer.launch,
          cache: layer.cache,
        },
      },
    ),
  }
}
