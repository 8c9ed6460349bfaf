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

//! Uniform specific state: auto constant metadata and the GPU binding.

use super::{AutoConstant, Parameter};
use crate::gpu_params::{GpuParameterValue, SharedGpuParameters};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// Location of a uniform inside an external GPU parameter buffer.
#[derive(Clone)]
pub struct UniformBinding {
    params: SharedGpuParameters,
    physical_index: usize,
    element_size: usize,
}

impl UniformBinding {
    /// Offset of the uniform in the buffer it lives in.
    pub fn physical_index(&self) -> usize {
        self.physical_index
    }

    /// Number of 32-bit values per element.
    pub fn element_size(&self) -> usize {
        self.element_size
    }
}

impl fmt::Debug for UniformBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniformBinding")
            .field("physical_index", &self.physical_index)
            .field("element_size", &self.element_size)
            .finish_non_exhaustive()
    }
}

/// State carried by uniform parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UniformData {
    auto_constant: Option<AutoConstant>,
    #[serde(skip)]
    binding: Option<UniformBinding>,
}

impl UniformData {
    pub(crate) fn new(auto_constant: Option<AutoConstant>) -> Self {
        Self {
            auto_constant,
            binding: None,
        }
    }

    /// The auto constant backing this uniform, if any.
    pub fn auto_constant(&self) -> Option<&AutoConstant> {
        self.auto_constant.as_ref()
    }

    /// The GPU binding, once established.
    pub fn binding(&self) -> Option<&UniformBinding> {
        self.binding.as_ref()
    }
}

impl Parameter {
    /// The auto constant of a uniform parameter.
    pub fn auto_constant(&self) -> Option<&AutoConstant> {
        self.uniform_data().and_then(UniformData::auto_constant)
    }

    /// `true` for uniforms the engine fills automatically.
    pub fn is_auto_constant(&self) -> bool {
        self.auto_constant().is_some()
    }

    /// `true` once [`Parameter::bind`] found this uniform in a GPU buffer.
    pub fn is_bound(&self) -> bool {
        self.uniform_data()
            .is_some_and(|data| data.binding.is_some())
    }

    /// Looks the uniform up by name in `params` and remembers its location.
    ///
    /// Binding happens once: a bound uniform keeps its first location.
    /// Returns `false` for non uniforms and for names `params` does not know.
    pub fn bind(&mut self, params: &SharedGpuParameters) -> bool {
        let name = self.name().to_string();
        let Some(data) = self.uniform_data_mut() else {
            return false;
        };
        if data.binding.is_some() {
            return true;
        }

        let definition = match params.read() {
            Ok(guard) => guard.find_named_constant(&name),
            Err(_) => {
                log::warn!("Uniform '{}': GPU parameters lock poisoned", name);
                return false;
            }
        };
        match definition {
            Some(def) => {
                data.binding = Some(UniformBinding {
                    params: Arc::clone(params),
                    physical_index: def.physical_index,
                    element_size: def.element_size,
                });
                true
            }
            None => {
                log::debug!("Uniform '{}' not present in GPU program, left unbound", name);
                false
            }
        }
    }

    /// Pushes a value to the bound GPU location. Unbound uniforms ignore the call.
    pub fn set_gpu_parameter<V: GpuParameterValue>(&self, value: V) {
        let Some(binding) = self.uniform_data().and_then(UniformData::binding) else {
            return;
        };
        match binding.params.write() {
            Ok(mut guard) => value.write_to(&mut *guard, binding.physical_index),
            Err(_) => log::warn!("Uniform '{}': GPU parameters lock poisoned", self.name()),
        }
    }
}
