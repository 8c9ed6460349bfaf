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

//! Typed descriptors for every value a shader program reads or writes.
//!
//! A [`Parameter`] describes a stage input, a stage output, a function local,
//! a uniform or an inline literal. Parameters are owned by the
//! [`ParameterPool`] of the function that declares them and referenced
//! everywhere else through a [`ParameterId`].

mod auto_constant;
mod factory;
mod uniform;

pub use self::auto_constant::*;
pub use self::factory::*;
pub use self::uniform::*;

use serde::{Deserialize, Serialize};
use std::ops::{BitOr, BitOrAssign, Index, IndexMut};

/// The data type of a shader constant or varying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GpuConstantType {
    /// A single float.
    Float1,
    /// A two component float vector.
    Float2,
    /// A three component float vector.
    Float3,
    /// A four component float vector.
    Float4,
    /// A single integer.
    Int1,
    /// A two component integer vector.
    Int2,
    /// A three component integer vector.
    Int3,
    /// A four component integer vector.
    Int4,
    /// A 2x2 float matrix.
    Matrix2x2,
    /// A 2x3 float matrix.
    Matrix2x3,
    /// A 2x4 float matrix.
    Matrix2x4,
    /// A 3x2 float matrix.
    Matrix3x2,
    /// A 3x3 float matrix.
    Matrix3x3,
    /// A 3x4 float matrix.
    Matrix3x4,
    /// A 4x2 float matrix.
    Matrix4x2,
    /// A 4x3 float matrix.
    Matrix4x3,
    /// A 4x4 float matrix.
    Matrix4x4,
    /// A one dimensional texture sampler.
    Sampler1D,
    /// A two dimensional texture sampler.
    Sampler2D,
    /// A three dimensional texture sampler.
    Sampler3D,
    /// A cube map sampler.
    SamplerCube,
    /// A one dimensional depth comparison sampler.
    Sampler1DShadow,
    /// A two dimensional depth comparison sampler.
    Sampler2DShadow,
    /// The type has not been determined.
    #[default]
    Unknown,
}

impl GpuConstantType {
    /// Returns the float vector type with `count` components (1 to 4).
    pub fn float_vector(count: usize) -> Option<Self> {
        match count {
            1 => Some(Self::Float1),
            2 => Some(Self::Float2),
            3 => Some(Self::Float3),
            4 => Some(Self::Float4),
            _ => None,
        }
    }

    /// Number of components of a float vector type, `None` for anything else.
    pub fn float_count(self) -> Option<usize> {
        match self {
            Self::Float1 => Some(1),
            Self::Float2 => Some(2),
            Self::Float3 => Some(3),
            Self::Float4 => Some(4),
            _ => None,
        }
    }

    /// Number of components addressed by a swizzle: 1 to 4 for vectors,
    /// 4 for everything else.
    pub fn component_count(self) -> usize {
        match self {
            Self::Float1 | Self::Int1 => 1,
            Self::Float2 | Self::Int2 => 2,
            Self::Float3 | Self::Int3 => 3,
            _ => 4,
        }
    }

    /// Number of 32-bit values one element of this type occupies in a
    /// constant buffer.
    pub fn element_size(self) -> usize {
        match self {
            Self::Float1 | Self::Int1 => 1,
            Self::Float2 | Self::Int2 => 2,
            Self::Float3 | Self::Int3 => 3,
            Self::Float4 | Self::Int4 | Self::Matrix2x2 => 4,
            Self::Matrix2x3 | Self::Matrix3x2 => 6,
            Self::Matrix2x4 | Self::Matrix4x2 => 8,
            Self::Matrix3x3 => 9,
            Self::Matrix3x4 | Self::Matrix4x3 => 12,
            Self::Matrix4x4 => 16,
            Self::Sampler1D
            | Self::Sampler2D
            | Self::Sampler3D
            | Self::SamplerCube
            | Self::Sampler1DShadow
            | Self::Sampler2DShadow => 1,
            Self::Unknown => 0,
        }
    }

    /// `true` for float scalars, vectors and matrices.
    pub fn is_float(self) -> bool {
        self.float_count().is_some() || self.is_matrix()
    }

    /// `true` for integer scalars and vectors.
    pub fn is_int(self) -> bool {
        matches!(self, Self::Int1 | Self::Int2 | Self::Int3 | Self::Int4)
    }

    /// `true` for float and integer scalars and vectors, the types a swizzle applies to.
    pub fn is_vector(self) -> bool {
        self.float_count().is_some() || self.is_int()
    }

    /// `true` for the matrix types.
    pub fn is_matrix(self) -> bool {
        matches!(
            self,
            Self::Matrix2x2
                | Self::Matrix2x3
                | Self::Matrix2x4
                | Self::Matrix3x2
                | Self::Matrix3x3
                | Self::Matrix3x4
                | Self::Matrix4x2
                | Self::Matrix4x3
                | Self::Matrix4x4
        )
    }

    /// `true` for the texture sampler types.
    pub fn is_sampler(self) -> bool {
        matches!(
            self,
            Self::Sampler1D
                | Self::Sampler2D
                | Self::Sampler3D
                | Self::SamplerCube
                | Self::Sampler1DShadow
                | Self::Sampler2DShadow
        )
    }
}

/// The binding semantic of a stage input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Semantic {
    /// Unknown or user defined semantic.
    #[default]
    Unknown,
    /// Vertex or fragment position.
    Position,
    /// Skinning blend weights.
    BlendWeights,
    /// Skinning blend indices.
    BlendIndices,
    /// Surface normal.
    Normal,
    /// Vertex colour.
    Color,
    /// Texture coordinates, also used for generic interpolated values.
    TextureCoordinates,
    /// Surface binormal.
    Binormal,
    /// Surface tangent.
    Tangent,
    /// Fragment facing flag.
    FrontFacing,
}

/// Fine grained description of what a parameter holds.
///
/// Lookups by content take precedence over lookups by semantic, so two
/// sub-render states asking for the world space normal share one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Content {
    /// No particular content.
    #[default]
    Unknown,
    /// Position in object space.
    PositionObjectSpace,
    /// Position in world space.
    PositionWorldSpace,
    /// Position in view space.
    PositionViewSpace,
    /// Position in projective space.
    PositionProjectiveSpace,
    /// Position in the space of the given light.
    PositionLightSpace(u8),
    /// Normal in object space.
    NormalObjectSpace,
    /// Normal in world space.
    NormalWorldSpace,
    /// Normal in view space.
    NormalViewSpace,
    /// Normal in tangent space.
    NormalTangentSpace,
    /// Tangent in object space.
    TangentObjectSpace,
    /// Binormal in object space.
    BinormalObjectSpace,
    /// Skinning blend weights.
    BlendWeights,
    /// Skinning blend indices.
    BlendIndices,
    /// Eye direction in object space.
    EyeDirectionObjectSpace,
    /// Eye direction in world space.
    EyeDirectionWorldSpace,
    /// Eye direction in view space.
    EyeDirectionViewSpace,
    /// Eye direction in tangent space.
    EyeDirectionTangentSpace,
    /// Direction towards the given light in object space.
    LightDirectionObjectSpace(u8),
    /// Direction towards the given light in world space.
    LightDirectionWorldSpace(u8),
    /// Direction towards the given light in view space.
    LightDirectionViewSpace(u8),
    /// Direction towards the given light in tangent space.
    LightDirectionTangentSpace(u8),
    /// Position of the given light in object space.
    LightPositionObjectSpace(u8),
    /// Position of the given light in world space.
    LightPositionWorldSpace(u8),
    /// Position of the given light in view space.
    LightPositionViewSpace(u8),
    /// Position of the given light in tangent space.
    LightPositionTangentSpace(u8),
    /// Depth in object space.
    DepthObjectSpace,
    /// Depth in world space.
    DepthWorldSpace,
    /// Depth in view space.
    DepthViewSpace,
    /// Depth in projective space.
    DepthProjectiveSpace,
    /// Diffuse colour.
    ColorDiffuse,
    /// Specular colour.
    ColorSpecular,
    /// Texture coordinate set N.
    TextureCoordinate(u8),
    /// Fragment facing flag.
    FrontFacing,
    /// Application defined content.
    Custom(u16),
}

/// Bitmask describing how often a uniform changes.
///
/// Follows the hand-written flag style used for shader stages: plain
/// constants plus set operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variability {
    bits: u16,
}

impl Variability {
    /// No variability information.
    pub const NONE: Self = Self { bits: 0 };
    /// Changes at most once per frame.
    pub const GLOBAL: Self = Self { bits: 1 << 0 };
    /// Changes per renderable object.
    pub const PER_OBJECT: Self = Self { bits: 1 << 1 };
    /// Changes with the active light list.
    pub const LIGHTS: Self = Self { bits: 1 << 2 };
    /// Changes on every pass iteration.
    pub const PASS_ITERATION_NUMBER: Self = Self { bits: 1 << 3 };
    /// Every variability bit.
    pub const ALL: Self = Self { bits: 0xFFFF };

    /// Builds a mask from raw bits.
    pub const fn from_bits(bits: u16) -> Self {
        Self { bits }
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u16 {
        self.bits
    }

    /// Returns `true` if no bit is set.
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Returns the union of both masks.
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Returns `true` if every bit of `other` is set in `self`.
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }
}

impl Default for Variability {
    fn default() -> Self {
        Self::GLOBAL
    }
}

impl BitOr for Variability {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl BitOrAssign for Variability {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// An immutable literal emitted inline in the target's constructor syntax.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConstValue {
    /// A float literal.
    Float(f32),
    /// A two component vector literal.
    Vec2([f32; 2]),
    /// A three component vector literal.
    Vec3([f32; 3]),
    /// A four component vector literal.
    Vec4([f32; 4]),
}

impl ConstValue {
    /// The data type of the literal.
    pub fn constant_type(&self) -> GpuConstantType {
        match self {
            Self::Float(_) => GpuConstantType::Float1,
            Self::Vec2(_) => GpuConstantType::Float2,
            Self::Vec3(_) => GpuConstantType::Float3,
            Self::Vec4(_) => GpuConstantType::Float4,
        }
    }

    /// The literal components in order.
    pub fn components(&self) -> &[f32] {
        match self {
            Self::Float(v) => std::slice::from_ref(v),
            Self::Vec2(v) => v,
            Self::Vec3(v) => v,
            Self::Vec4(v) => v,
        }
    }

    /// Bitwise equality, so `-0.0` and `0.0` stay distinct literals and NaN
    /// literals can be shared.
    pub fn same_literal(&self, other: &Self) -> bool {
        self.constant_type() == other.constant_type()
            && self
                .components()
                .iter()
                .zip(other.components())
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }

    /// Target neutral spelling, used as the parameter name.
    pub fn neutral_text(&self) -> String {
        let components = self
            .components()
            .iter()
            .map(|c| format!("{c:?}"))
            .collect::<Vec<_>>()
            .join(", ");
        match self {
            Self::Float(_) => components,
            _ => format!("float{}({})", self.components().len(), components),
        }
    }
}

/// What kind of value a [`Parameter`] describes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum ParameterKind {
    /// A stage input, stage output or function local.
    #[default]
    Regular,
    /// A program wide uniform.
    Uniform(UniformData),
    /// An inline literal.
    Constant(ConstValue),
}

/// One shader visible value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    name: String,
    constant_type: GpuConstantType,
    semantic: Semantic,
    index: u32,
    content: Content,
    array_size: Option<usize>,
    variability: Variability,
    used: bool,
    high_precision: bool,
    struct_name: Option<String>,
    kind: ParameterKind,
}

impl Parameter {
    /// Creates a regular parameter.
    pub fn new(
        constant_type: GpuConstantType,
        name: impl Into<String>,
        semantic: Semantic,
        index: u32,
        content: Content,
    ) -> Self {
        Self {
            name: name.into(),
            constant_type,
            semantic,
            index,
            content,
            array_size: None,
            variability: Variability::NONE,
            used: false,
            high_precision: false,
            struct_name: None,
            kind: ParameterKind::Regular,
        }
    }

    /// Creates a uniform, optionally backed by an auto constant.
    pub fn new_uniform(
        constant_type: GpuConstantType,
        name: impl Into<String>,
        index: u32,
        variability: Variability,
        auto_constant: Option<AutoConstant>,
    ) -> Self {
        let mut param = Self::new(
            constant_type,
            name,
            Semantic::Unknown,
            index,
            Content::Unknown,
        );
        param.variability = variability;
        param.kind = ParameterKind::Uniform(UniformData::new(auto_constant));
        param
    }

    /// Creates an inline literal.
    pub fn new_constant(value: ConstValue) -> Self {
        let mut param = Self::new(
            value.constant_type(),
            value.neutral_text(),
            Semantic::Unknown,
            0,
            Content::Unknown,
        );
        param.kind = ParameterKind::Constant(value);
        param
    }

    /// Sets a fixed array size.
    #[must_use]
    pub fn with_array_size(mut self, size: usize) -> Self {
        self.array_size = Some(size);
        self
    }

    /// The identifier emitted in source code.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the parameter.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The data type.
    pub fn constant_type(&self) -> GpuConstantType {
        self.constant_type
    }

    /// The binding semantic.
    pub fn semantic(&self) -> Semantic {
        self.semantic
    }

    /// The semantic index.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: u32) {
        self.index = index;
    }

    /// The content tag.
    pub fn content(&self) -> Content {
        self.content
    }

    /// The fixed array size, if any.
    pub fn array_size(&self) -> Option<usize> {
        self.array_size
    }

    /// `true` if the parameter is declared as an array.
    pub fn is_array(&self) -> bool {
        self.array_size.is_some()
    }

    /// How often a uniform changes.
    pub fn variability(&self) -> Variability {
        self.variability
    }

    /// Adds variability bits.
    pub fn add_variability(&mut self, variability: Variability) {
        self.variability |= variability;
    }

    /// Whether the parameter was referenced by generated code.
    pub fn is_used(&self) -> bool {
        self.used
    }

    /// Marks the parameter as referenced.
    pub fn set_used(&mut self, used: bool) {
        self.used = used;
    }

    /// Whether the parameter requires high precision in targets that have
    /// precision qualifiers.
    pub fn is_high_precision(&self) -> bool {
        self.high_precision
    }

    /// Requests high precision.
    pub fn set_high_precision(&mut self, high_precision: bool) {
        self.high_precision = high_precision;
    }

    /// The struct type name for parameters of user defined struct type.
    pub fn struct_name(&self) -> Option<&str> {
        self.struct_name.as_deref()
    }

    /// Sets the struct type name.
    pub fn set_struct_name(&mut self, struct_name: Option<String>) {
        self.struct_name = struct_name;
    }

    /// The parameter kind.
    pub fn kind(&self) -> &ParameterKind {
        &self.kind
    }

    /// `true` for uniforms.
    pub fn is_uniform(&self) -> bool {
        matches!(self.kind, ParameterKind::Uniform(_))
    }

    /// `true` for inline literals.
    pub fn is_constant(&self) -> bool {
        matches!(self.kind, ParameterKind::Constant(_))
    }

    /// The literal value of a constant parameter.
    pub fn const_value(&self) -> Option<&ConstValue> {
        match &self.kind {
            ParameterKind::Constant(value) => Some(value),
            _ => None,
        }
    }

    /// `true` for float scalars, vectors and matrices.
    pub fn is_float(&self) -> bool {
        self.constant_type.is_float()
    }

    /// `true` for samplers.
    pub fn is_sampler(&self) -> bool {
        self.constant_type.is_sampler()
    }

    pub(crate) fn uniform_data(&self) -> Option<&UniformData> {
        match &self.kind {
            ParameterKind::Uniform(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn uniform_data_mut(&mut self) -> Option<&mut UniformData> {
        match &mut self.kind {
            ParameterKind::Uniform(data) => Some(data),
            _ => None,
        }
    }
}

/// Handle of a [`Parameter`] inside a [`ParameterPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParameterId(pub usize);

/// Arena owning every parameter of one function.
///
/// Slots are never reused, so a handle stays valid for the life of the pool
/// even after the parameter is removed from its list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterPool {
    parameters: Vec<Parameter>,
}

impl ParameterPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves a parameter into the pool and returns its handle.
    pub fn insert(&mut self, parameter: Parameter) -> ParameterId {
        self.parameters.push(parameter);
        ParameterId(self.parameters.len() - 1)
    }

    /// Looks up a parameter.
    pub fn get(&self, id: ParameterId) -> Option<&Parameter> {
        self.parameters.get(id.0)
    }

    /// Looks up a parameter for modification.
    pub fn get_mut(&mut self, id: ParameterId) -> Option<&mut Parameter> {
        self.parameters.get_mut(id.0)
    }

    /// `true` if the handle belongs to this pool.
    pub fn contains(&self, id: ParameterId) -> bool {
        id.0 < self.parameters.len()
    }

    /// Number of allocated slots.
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// `true` if nothing was allocated.
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Iterates over every slot with its handle.
    pub fn iter(&self) -> impl Iterator<Item = (ParameterId, &Parameter)> {
        self.parameters
            .iter()
            .enumerate()
            .map(|(i, p)| (ParameterId(i), p))
    }
}

impl Index<ParameterId> for ParameterPool {
    type Output = Parameter;

    fn index(&self, id: ParameterId) -> &Self::Output {
        &self.parameters[id.0]
    }
}

impl IndexMut<ParameterId> for ParameterPool {
    fn index_mut(&mut self, id: ParameterId) -> &mut Self::Output {
        &mut self.parameters[id.0]
    }
}
