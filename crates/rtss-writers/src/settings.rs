// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Writer configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Options shared by all program writers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterSettings {
    /// `#version` emitted by the desktop GLSL writer.
    pub glsl_version: u32,
    /// `#version` emitted by the GLSL ES writer.
    pub glsles_version: u32,
    /// Directories searched for shader library files.
    pub library_paths: Vec<PathBuf>,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            glsl_version: 150,
            glsles_version: 100,
            library_paths: Vec::new(),
        }
    }
}

impl WriterSettings {
    /// Whether GLSL `version` declares stage variables with `in`/`out`
    /// instead of `attribute`/`varying`.
    pub fn uses_in_out(version: u32, es: bool) -> bool {
        if es {
            version >= 300
        } else {
            version >= 130
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = WriterSettings::default();
        assert_eq!(settings.glsl_version, 150);
        assert_eq!(settings.glsles_version, 100);
        assert!(settings.library_paths.is_empty());
    }

    #[test]
    fn test_in_out_threshold() {
        assert!(!WriterSettings::uses_in_out(120, false));
        assert!(WriterSettings::uses_in_out(130, false));
        assert!(!WriterSettings::uses_in_out(100, true));
        assert!(WriterSettings::uses_in_out(300, true));
    }
}
