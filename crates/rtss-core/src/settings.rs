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

//! Tunables of the varying compaction pass.

use serde::{Deserialize, Serialize};

/// How aggressively the processor packs vertex outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompactPolicy {
    /// Leave the outputs alone as long as they fit the hardware slots,
    /// otherwise pack them like `Medium`.
    Low,
    /// Use the predefined combinations, then split free combinations when
    /// they fit; split parameters only as a last resort.
    Medium,
    /// Use the predefined combinations, then pack the leftovers, splitting
    /// parameters across registers.
    #[default]
    High,
}

/// Settings of the [`ProgramProcessor`](crate::processor::ProgramProcessor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorSettings {
    /// Number of texture coordinate registers the hardware provides.
    pub max_texcoord_slots: usize,
    /// Packing policy.
    pub compact_policy: CompactPolicy,
}

impl ProcessorSettings {
    /// Number of floats that fit in the texture coordinate registers.
    pub fn max_texcoord_floats(&self) -> usize {
        self.max_texcoord_slots * 4
    }
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            max_texcoord_slots: 8,
            compact_policy: CompactPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ProcessorSettings::default();
        assert_eq!(settings.max_texcoord_slots, 8);
        assert_eq!(settings.max_texcoord_floats(), 32);
        assert_eq!(settings.compact_policy, CompactPolicy::High);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let settings: ProcessorSettings = ron::de::from_str("(compact_policy: Low)").unwrap();
        assert_eq!(settings.max_texcoord_slots, 8);
        assert_eq!(settings.compact_policy, CompactPolicy::Low);
    }
}
