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

//! The narrow interface to compiled GPU program parameters.
//!
//! Uniforms are bound against a [`GpuProgramParameters`] implementation by
//! name once the target program has been compiled. [`GpuParameterBuffer`] is a
//! plain in-memory implementation used by tools and tests.

use crate::parameter::{AutoConstant, GpuConstantType, Variability};
use ahash::AHashMap;
use std::sync::{Arc, RwLock};

/// Where and how a named constant is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuConstantDefinition {
    /// Data type of the constant.
    pub constant_type: GpuConstantType,
    /// Offset in the float buffer, or the int buffer for integer and sampler types.
    pub physical_index: usize,
    /// Number of 32-bit values per element.
    pub element_size: usize,
    /// Number of elements.
    pub array_size: usize,
    /// Accumulated variability.
    pub variability: Variability,
}

/// Parameters of a compiled GPU program.
pub trait GpuProgramParameters: Send + Sync {
    /// Finds a constant by name.
    fn find_named_constant(&self, name: &str) -> Option<GpuConstantDefinition>;

    /// Writes floats starting at `physical_index`.
    fn write_floats(&mut self, physical_index: usize, values: &[f32]);

    /// Writes integers starting at `physical_index`.
    fn write_ints(&mut self, physical_index: usize, values: &[i32]);

    /// Registers the named constant as engine driven.
    fn set_named_auto_constant(&mut self, name: &str, auto_constant: AutoConstant);

    /// ORs variability bits into the named constant.
    fn add_variability(&mut self, name: &str, variability: Variability);
}

/// GPU parameters shared between the program that declared them and the
/// uniforms bound to them.
pub type SharedGpuParameters = Arc<RwLock<dyn GpuProgramParameters>>;

/// A value [`Parameter::set_gpu_parameter`](crate::parameter::Parameter::set_gpu_parameter)
/// can push.
pub trait GpuParameterValue {
    /// Writes the value at `physical_index`.
    fn write_to(&self, target: &mut dyn GpuProgramParameters, physical_index: usize);
}

impl GpuParameterValue for f32 {
    fn write_to(&self, target: &mut dyn GpuProgramParameters, physical_index: usize) {
        target.write_floats(physical_index, std::slice::from_ref(self));
    }
}

impl<const N: usize> GpuParameterValue for [f32; N] {
    fn write_to(&self, target: &mut dyn GpuProgramParameters, physical_index: usize) {
        target.write_floats(physical_index, self);
    }
}

impl GpuParameterValue for [[f32; 4]; 4] {
    fn write_to(&self, target: &mut dyn GpuProgramParameters, physical_index: usize) {
        target.write_floats(physical_index, self.as_flattened());
    }
}

impl GpuParameterValue for &[f32] {
    fn write_to(&self, target: &mut dyn GpuProgramParameters, physical_index: usize) {
        target.write_floats(physical_index, self);
    }
}

impl GpuParameterValue for i32 {
    fn write_to(&self, target: &mut dyn GpuProgramParameters, physical_index: usize) {
        target.write_ints(physical_index, std::slice::from_ref(self));
    }
}

/// In-memory GPU parameters.
#[derive(Debug, Default)]
pub struct GpuParameterBuffer {
    definitions: AHashMap<String, GpuConstantDefinition>,
    floats: Vec<f32>,
    ints: Vec<i32>,
    auto_constants: Vec<(String, AutoConstant)>,
}

impl GpuParameterBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a named constant and allocates its storage.
    ///
    /// Integer and sampler constants live in the int buffer, everything else
    /// in the float buffer. Returns the physical index.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        constant_type: GpuConstantType,
        array_size: usize,
    ) -> usize {
        let element_size = constant_type.element_size();
        let array_size = array_size.max(1);
        let storage = element_size * array_size;
        let physical_index = if constant_type.is_int() || constant_type.is_sampler() {
            let index = self.ints.len();
            self.ints.resize(index + storage, 0);
            index
        } else {
            let index = self.floats.len();
            self.floats.resize(index + storage, 0.0);
            index
        };
        self.definitions.insert(
            name.into(),
            GpuConstantDefinition {
                constant_type,
                physical_index,
                element_size,
                array_size,
                variability: Variability::NONE,
            },
        );
        physical_index
    }

    /// Wraps the buffer for sharing with uniforms.
    pub fn into_shared(self) -> SharedGpuParameters {
        Arc::new(RwLock::new(self))
    }

    /// The float buffer.
    pub fn floats(&self) -> &[f32] {
        &self.floats
    }

    /// The int buffer.
    pub fn ints(&self) -> &[i32] {
        &self.ints
    }

    /// Auto constants registered so far, in registration order.
    pub fn auto_constants(&self) -> &[(String, AutoConstant)] {
        &self.auto_constants
    }

    /// The definition of a named constant.
    pub fn definition(&self, name: &str) -> Option<&GpuConstantDefinition> {
        self.definitions.get(name)
    }
}

impl GpuProgramParameters for GpuParameterBuffer {
    fn find_named_constant(&self, name: &str) -> Option<GpuConstantDefinition> {
        self.definitions.get(name).copied()
    }

    fn write_floats(&mut self, physical_index: usize, values: &[f32]) {
        let end = (physical_index + values.len()).min(self.floats.len());
        if physical_index >= end {
            log::warn!("Float write at {} outside the buffer", physical_index);
            return;
        }
        self.floats[physical_index..end].copy_from_slice(&values[..end - physical_index]);
    }

    fn write_ints(&mut self, physical_index: usize, values: &[i32]) {
        let end = (physical_index + values.len()).min(self.ints.len());
        if physical_index >= end {
            log::warn!("Int write at {} outside the buffer", physical_index);
            return;
        }
        self.ints[physical_index..end].copy_from_slice(&values[..end - physical_index]);
    }

    fn set_named_auto_constant(&mut self, name: &str, auto_constant: AutoConstant) {
        if let Some(entry) = self.auto_constants.iter_mut().find(|(n, _)| n == name) {
            entry.1 = auto_constant;
        } else {
            self.auto_constants.push((name.to_string(), auto_constant));
        }
    }

    fn add_variability(&mut self, name: &str, variability: Variability) {
        if let Some(def) = self.definitions.get_mut(name) {
            def.variability |= variability;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::{AutoConstantType, Parameter};

    fn buffer() -> Arc<RwLock<GpuParameterBuffer>> {
        let mut buffer = GpuParameterBuffer::new();
        buffer.declare("tint", GpuConstantType::Float4, 1);
        buffer.declare("worldViewProj", GpuConstantType::Matrix4x4, 1);
        buffer.declare("lightCount", GpuConstantType::Int1, 1);
        Arc::new(RwLock::new(buffer))
    }

    fn shared_buffer() -> SharedGpuParameters {
        buffer()
    }

    #[test]
    fn test_declare_allocates_separate_storage() {
        let mut buffer = GpuParameterBuffer::new();
        assert_eq!(buffer.declare("a", GpuConstantType::Float3, 1), 0);
        assert_eq!(buffer.declare("b", GpuConstantType::Matrix4x4, 2), 3);
        assert_eq!(buffer.declare("s", GpuConstantType::Sampler2D, 1), 0);
        assert_eq!(buffer.floats().len(), 3 + 32);
        assert_eq!(buffer.ints().len(), 1);
    }

    #[test]
    fn test_bound_uniform_pushes_values() {
        let concrete = buffer();
        let params: SharedGpuParameters = concrete.clone();

        let mut tint = Parameter::new_uniform(
            GpuConstantType::Float4,
            "tint",
            0,
            Variability::GLOBAL,
            None,
        );
        assert!(tint.bind(&params));
        tint.set_gpu_parameter([0.25f32, 0.5, 0.75, 1.0]);

        let mut matrix = Parameter::new_uniform(
            GpuConstantType::Matrix4x4,
            "worldViewProj",
            0,
            Variability::PER_OBJECT,
            None,
        );
        assert!(matrix.bind(&params));
        let mut identity = [[0.0f32; 4]; 4];
        for (i, row) in identity.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        matrix.set_gpu_parameter(identity);

        let mut count = Parameter::new_uniform(
            GpuConstantType::Int1,
            "lightCount",
            0,
            Variability::LIGHTS,
            None,
        );
        assert!(count.bind(&params));
        count.set_gpu_parameter(3i32);

        let guard = concrete.read().unwrap();
        assert_eq!(&guard.floats()[0..4], &[0.25, 0.5, 0.75, 1.0]);
        assert_eq!(guard.floats()[4], 1.0);
        assert_eq!(guard.floats()[9], 1.0);
        assert_eq!(guard.floats()[5], 0.0);
        assert_eq!(guard.ints(), &[3]);
    }

    #[test]
    fn test_unbound_uniform_ignores_pushes() {
        let params = shared_buffer();
        let mut missing = Parameter::new_uniform(
            GpuConstantType::Float1,
            "doesNotExist",
            0,
            Variability::GLOBAL,
            None,
        );
        assert!(!missing.bind(&params));
        assert!(!missing.is_bound());
        missing.set_gpu_parameter(1.0f32);
    }

    #[test]
    fn test_regular_parameters_never_bind() {
        let params = shared_buffer();
        let mut param = Parameter::new_constant(crate::parameter::ConstValue::Float(1.0));
        assert!(!param.bind(&params));
    }

    #[test]
    fn test_buffer_records_auto_constants_and_variability() {
        let mut buffer = GpuParameterBuffer::new();
        buffer.declare("tint", GpuConstantType::Float4, 1);
        buffer.add_variability("tint", Variability::PER_OBJECT);
        buffer.add_variability("tint", Variability::LIGHTS);
        buffer.set_named_auto_constant(
            "worldviewproj_matrix",
            AutoConstant::int(AutoConstantType::WorldviewprojMatrix, 0),
        );
        let def = buffer.definition("tint").unwrap();
        assert!(def.variability.contains(Variability::PER_OBJECT | Variability::LIGHTS));
        assert_eq!(buffer.auto_constants().len(), 1);
    }
}
