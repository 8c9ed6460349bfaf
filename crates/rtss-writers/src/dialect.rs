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

//! Type names and builtin spelling of each target language.
//!
//! Atoms use the HLSL names for builtins (`mul`, `lerp`, `saturate`, ...);
//! the GLSL dialect translates them.

use rtss_core::{atom::SourceDialect, parameter::GpuConstantType};

/// GLSL and GLSL ES.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlslDialect {
    version: u32,
    es: bool,
}

impl GlslDialect {
    /// Desktop GLSL of the given `#version`.
    pub fn desktop(version: u32) -> Self {
        Self { version, es: false }
    }

    /// GLSL ES of the given `#version`.
    pub fn es(version: u32) -> Self {
        Self { version, es: true }
    }

    /// The `#version` number.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Whether this is the embedded profile.
    pub fn is_es(&self) -> bool {
        self.es
    }

    /// GLSL ES 1.00 only knows square matrices and 2D/cube samplers.
    fn is_legacy_es(&self) -> bool {
        self.es && self.version < 300
    }

    /// Whether `texture()` replaces the per-sampler lookup functions.
    fn has_generic_texture(&self) -> bool {
        if self.es {
            self.version >= 300
        } else {
            self.version >= 130
        }
    }
}

impl SourceDialect for GlslDialect {
    fn language(&self) -> &str {
        if self.es {
            "glsles"
        } else {
            "glsl"
        }
    }

    fn type_name(&self, constant_type: GpuConstantType) -> Option<&'static str> {
        use GpuConstantType::*;
        let name = match constant_type {
            Float1 => "float",
            Float2 => "vec2",
            Float3 => "vec3",
            Float4 => "vec4",
            Int1 => "int",
            Int2 => "ivec2",
            Int3 => "ivec3",
            Int4 => "ivec4",
            Matrix2x2 => "mat2",
            Matrix3x3 => "mat3",
            Matrix4x4 => "mat4",
            Sampler2D => "sampler2D",
            SamplerCube => "samplerCube",
            _ if self.is_legacy_es() => return None,
            Matrix2x3 => "mat2x3",
            Matrix2x4 => "mat2x4",
            Matrix3x2 => "mat3x2",
            Matrix3x4 => "mat3x4",
            Matrix4x2 => "mat4x2",
            Matrix4x3 => "mat4x3",
            Sampler3D => "sampler3D",
            Sampler2DShadow => "sampler2DShadow",
            Sampler1D if !self.es => "sampler1D",
            Sampler1DShadow if !self.es => "sampler1DShadow",
            _ => return None,
        };
        Some(name)
    }

    fn texture_sample_function(&self, sampler: GpuConstantType) -> &'static str {
        if self.has_generic_texture() {
            return "texture";
        }
        match sampler {
            GpuConstantType::Sampler1D => "texture1D",
            GpuConstantType::Sampler3D => "texture3D",
            GpuConstantType::SamplerCube => "textureCube",
            GpuConstantType::Sampler1DShadow => "shadow1D",
            GpuConstantType::Sampler2DShadow => "shadow2D",
            _ => "texture2D",
        }
    }

    fn builtin_call(&self, name: &str, args: &[String]) -> String {
        match (name, args) {
            ("mul", [a, b]) => format!("{a} * {b}"),
            ("saturate", [x]) => format!("clamp({x}, 0.0, 1.0)"),
            _ => {
                let name = match name {
                    "lerp" => "mix",
                    "frac" => "fract",
                    "rsqrt" => "inversesqrt",
                    "ddx" => "dFdx",
                    "ddy" => "dFdy",
                    "fmod" => "mod",
                    other => other,
                };
                format!("{}({})", name, args.join(", "))
            }
        }
    }
}

/// HLSL and Cg share type names and builtins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HlslDialect {
    cg: bool,
}

impl HlslDialect {
    /// HLSL.
    pub fn hlsl() -> Self {
        Self { cg: false }
    }

    /// Cg.
    pub fn cg() -> Self {
        Self { cg: true }
    }
}

impl Default for HlslDialect {
    fn default() -> Self {
        Self::hlsl()
    }
}

impl SourceDialect for HlslDialect {
    fn language(&self) -> &str {
        if self.cg {
            "cg"
        } else {
            "hlsl"
        }
    }

    fn type_name(&self, constant_type: GpuConstantType) -> Option<&'static str> {
        use GpuConstantType::*;
        let name = match constant_type {
            Float1 => "float",
            Float2 => "float2",
            Float3 => "float3",
            Float4 => "float4",
            Int1 => "int",
            Int2 => "int2",
            Int3 => "int3",
            Int4 => "int4",
            Matrix2x2 => "float2x2",
            Matrix2x3 => "float2x3",
            Matrix2x4 => "float2x4",
            Matrix3x2 => "float3x2",
            Matrix3x3 => "float3x3",
            Matrix3x4 => "float3x4",
            Matrix4x2 => "float4x2",
            Matrix4x3 => "float4x3",
            Matrix4x4 => "float4x4",
            Sampler1D | Sampler1DShadow => "sampler1D",
            Sampler2D | Sampler2DShadow => "sampler2D",
            Sampler3D => "sampler3D",
            SamplerCube => "samplerCUBE",
            Unknown => return None,
        };
        Some(name)
    }

    fn texture_sample_function(&self, sampler: GpuConstantType) -> &'static str {
        match sampler {
            GpuConstantType::Sampler1D | GpuConstantType::Sampler1DShadow => "tex1D",
            GpuConstantType::Sampler3D => "tex3D",
            GpuConstantType::SamplerCube => "texCUBE",
            GpuConstantType::Sampler2DShadow if self.cg => "shadow2D",
            _ => "tex2D",
        }
    }
}
