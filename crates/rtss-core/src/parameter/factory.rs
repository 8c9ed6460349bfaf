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

//! Constructors for parameters with conventional names.
//!
//! Names follow a fixed scheme (`iPos_0`, `oTexcoord2_1`, `gSampler2D_0`) so
//! generated sources stay readable and the writers can recognise stage
//! inputs and outputs by their prefix.

use super::{
    AutoConstant, ConstValue, Content, GpuConstantType, Parameter, Semantic, Variability,
};

/// Namespace for the parameter constructors.
pub struct ParameterFactory;

impl ParameterFactory {
    /// Object space position input.
    pub fn in_position(index: u32) -> Parameter {
        Parameter::new(
            GpuConstantType::Float4,
            format!("iPos_{index}"),
            Semantic::Position,
            index,
            Content::PositionObjectSpace,
        )
    }

    /// Projective space position output.
    pub fn out_position(index: u32) -> Parameter {
        Parameter::new(
            GpuConstantType::Float4,
            format!("oPos_{index}"),
            Semantic::Position,
            index,
            Content::PositionProjectiveSpace,
        )
    }

    /// Object space normal input.
    pub fn in_normal(index: u32) -> Parameter {
        Parameter::new(
            GpuConstantType::Float3,
            format!("iNormal_{index}"),
            Semantic::Normal,
            index,
            Content::NormalObjectSpace,
        )
    }

    /// Normal output.
    pub fn out_normal(index: u32) -> Parameter {
        Parameter::new(
            GpuConstantType::Float3,
            format!("oNormal_{index}"),
            Semantic::Normal,
            index,
            Content::NormalObjectSpace,
        )
    }

    /// Object space binormal input.
    pub fn in_binormal(index: u32) -> Parameter {
        Parameter::new(
            GpuConstantType::Float3,
            format!("iBiNormal_{index}"),
            Semantic::Binormal,
            index,
            Content::BinormalObjectSpace,
        )
    }

    /// Binormal output.
    pub fn out_binormal(index: u32) -> Parameter {
        Parameter::new(
            GpuConstantType::Float3,
            format!("oBiNormal_{index}"),
            Semantic::Binormal,
            index,
            Content::BinormalObjectSpace,
        )
    }

    /// Object space tangent input.
    pub fn in_tangent(index: u32) -> Parameter {
        Parameter::new(
            GpuConstantType::Float3,
            format!("iTangent_{index}"),
            Semantic::Tangent,
            index,
            Content::TangentObjectSpace,
        )
    }

    /// Tangent output.
    pub fn out_tangent(index: u32) -> Parameter {
        Parameter::new(
            GpuConstantType::Float3,
            format!("oTangent_{index}"),
            Semantic::Tangent,
            index,
            Content::TangentObjectSpace,
        )
    }

    /// Colour input: diffuse for index 0, specular otherwise.
    pub fn in_color(index: u32) -> Parameter {
        Parameter::new(
            GpuConstantType::Float4,
            format!("iColor_{index}"),
            Semantic::Color,
            index,
            Self::color_content(index),
        )
    }

    /// Colour output: diffuse for index 0, specular otherwise.
    pub fn out_color(index: u32) -> Parameter {
        Parameter::new(
            GpuConstantType::Float4,
            format!("oColor_{index}"),
            Semantic::Color,
            index,
            Self::color_content(index),
        )
    }

    fn color_content(index: u32) -> Content {
        if index == 0 {
            Content::ColorDiffuse
        } else {
            Content::ColorSpecular
        }
    }

    /// Texture coordinate input. Only float1 to float4 are valid texture
    /// coordinate types.
    pub fn in_texcoord(constant_type: GpuConstantType, index: u32, content: Content) -> Option<Parameter> {
        let count = constant_type.float_count()?;
        Some(Parameter::new(
            constant_type,
            format!("iTexcoord{count}_{index}"),
            Semantic::TextureCoordinates,
            index,
            content,
        ))
    }

    /// Texture coordinate output. Only float1 to float4 are valid texture
    /// coordinate types.
    pub fn out_texcoord(constant_type: GpuConstantType, index: u32, content: Content) -> Option<Parameter> {
        let count = constant_type.float_count()?;
        Some(Parameter::new(
            constant_type,
            format!("oTexcoord{count}_{index}"),
            Semantic::TextureCoordinates,
            index,
            content,
        ))
    }

    /// Skinning weights input.
    pub fn in_blend_weights(index: u32) -> Parameter {
        Parameter::new(
            GpuConstantType::Float4,
            format!("iBlendWeights_{index}"),
            Semantic::BlendWeights,
            index,
            Content::BlendWeights,
        )
    }

    /// Skinning indices input.
    pub fn in_blend_indices(index: u32) -> Parameter {
        Parameter::new(
            GpuConstantType::Float4,
            format!("iBlendIndices_{index}"),
            Semantic::BlendIndices,
            index,
            Content::BlendIndices,
        )
    }

    /// Fragment facing input.
    pub fn in_front_facing(index: u32) -> Parameter {
        Parameter::new(
            GpuConstantType::Float1,
            format!("iFrontFacing_{index}"),
            Semantic::FrontFacing,
            index,
            Content::FrontFacing,
        )
    }

    /// Stage input for `semantic`, with `content` and `constant_type`
    /// overriding the factory defaults where they are known.
    ///
    /// Returns `None` for semantics that cannot be created implicitly.
    pub fn create_in(
        semantic: Semantic,
        index: u32,
        content: Content,
        constant_type: GpuConstantType,
    ) -> Option<Parameter> {
        let param = match semantic {
            Semantic::Position => Self::in_position(index),
            Semantic::Normal => Self::in_normal(index),
            Semantic::Binormal => Self::in_binormal(index),
            Semantic::Tangent => Self::in_tangent(index),
            Semantic::Color => Self::in_color(index),
            Semantic::BlendWeights => Self::in_blend_weights(index),
            Semantic::BlendIndices => Self::in_blend_indices(index),
            Semantic::FrontFacing => Self::in_front_facing(index),
            Semantic::TextureCoordinates => {
                return Self::in_texcoord(constant_type, index, content);
            }
            Semantic::Unknown => return None,
        };
        Some(Self::override_defaults(param, content, constant_type))
    }

    /// Stage output for `semantic`, see [`ParameterFactory::create_in`].
    pub fn create_out(
        semantic: Semantic,
        index: u32,
        content: Content,
        constant_type: GpuConstantType,
    ) -> Option<Parameter> {
        let param = match semantic {
            Semantic::Position => Self::out_position(index),
            Semantic::Normal => Self::out_normal(index),
            Semantic::Binormal => Self::out_binormal(index),
            Semantic::Tangent => Self::out_tangent(index),
            Semantic::Color => Self::out_color(index),
            Semantic::TextureCoordinates => {
                return Self::out_texcoord(constant_type, index, content);
            }
            Semantic::BlendWeights
            | Semantic::BlendIndices
            | Semantic::FrontFacing
            | Semantic::Unknown => return None,
        };
        Some(Self::override_defaults(param, content, constant_type))
    }

    fn override_defaults(mut param: Parameter, content: Content, constant_type: GpuConstantType) -> Parameter {
        if content != Content::Unknown {
            param.content = content;
        }
        if constant_type != GpuConstantType::Unknown {
            param.constant_type = constant_type;
        }
        param
    }

    /// Texture sampler uniform. Returns `None` for non sampler types.
    pub fn sampler(constant_type: GpuConstantType, index: u32) -> Option<Parameter> {
        let prefix = match constant_type {
            GpuConstantType::Sampler1D => "gSampler1D_",
            GpuConstantType::Sampler2D => "gSampler2D_",
            GpuConstantType::Sampler3D => "gSampler3D_",
            GpuConstantType::SamplerCube => "gSamplerCUBE_",
            GpuConstantType::Sampler1DShadow => "gSampler1DShadow_",
            GpuConstantType::Sampler2DShadow => "gSampler2DShadow_",
            _ => return None,
        };
        Some(Parameter::new_uniform(
            constant_type,
            format!("{prefix}{index}"),
            index,
            Variability::GLOBAL,
            None,
        ))
    }

    /// Explicit uniform named `suggested_name` followed by `index`.
    pub fn uniform(
        constant_type: GpuConstantType,
        index: u32,
        variability: Variability,
        suggested_name: &str,
        size: Option<usize>,
    ) -> Parameter {
        let param = Parameter::new_uniform(
            constant_type,
            format!("{suggested_name}{index}"),
            index,
            variability,
            None,
        );
        match size {
            Some(size) => param.with_array_size(size),
            None => param,
        }
    }

    /// Auto constant uniform, named and typed from the auto constant table.
    pub fn auto_uniform(auto_constant: AutoConstant, size: Option<usize>) -> Parameter {
        let param = Parameter::new_uniform(
            auto_constant.auto_type.constant_type(),
            auto_constant.uniform_name(),
            0,
            Variability::GLOBAL,
            Some(auto_constant),
        );
        match size {
            Some(size) => param.with_array_size(size),
            None => param,
        }
    }

    /// Inline literal.
    pub fn constant(value: ConstValue) -> Parameter {
        Parameter::new_constant(value)
    }
}
