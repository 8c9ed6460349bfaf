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

//! Engine provided uniform values and the table describing them.

use super::GpuConstantType;
use serde::{Deserialize, Serialize};

/// A uniform value the engine updates automatically.
///
/// Every variant maps to a conventional uniform name and data type, see
/// [`AutoConstantType::name`] and [`AutoConstantType::constant_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum AutoConstantType {
    WorldMatrix,
    InverseWorldMatrix,
    TransposeWorldMatrix,
    InverseTransposeWorldMatrix,
    WorldMatrixArray3x4,
    WorldMatrixArray,
    ViewMatrix,
    InverseViewMatrix,
    TransposeViewMatrix,
    InverseTransposeViewMatrix,
    ProjectionMatrix,
    InverseProjectionMatrix,
    TransposeProjectionMatrix,
    InverseTransposeProjectionMatrix,
    ViewprojMatrix,
    InverseViewprojMatrix,
    TransposeViewprojMatrix,
    InverseTransposeViewprojMatrix,
    WorldviewMatrix,
    InverseWorldviewMatrix,
    TransposeWorldviewMatrix,
    InverseTransposeWorldviewMatrix,
    WorldviewprojMatrix,
    InverseWorldviewprojMatrix,
    TransposeWorldviewprojMatrix,
    InverseTransposeWorldviewprojMatrix,
    RenderTargetFlipping,
    FogColour,
    FogParams,
    SurfaceAmbientColour,
    SurfaceDiffuseColour,
    SurfaceSpecularColour,
    SurfaceEmissiveColour,
    SurfaceShininess,
    LightCount,
    AmbientLightColour,
    LightDiffuseColour,
    LightSpecularColour,
    LightAttenuation,
    SpotlightParams,
    LightPosition,
    LightPositionObjectSpace,
    LightPositionViewSpace,
    LightDirection,
    LightDirectionObjectSpace,
    LightDirectionViewSpace,
    LightDistanceObjectSpace,
    LightPowerScale,
    LightDiffuseColourPowerScaled,
    LightSpecularColourPowerScaled,
    LightDiffuseColourArray,
    LightSpecularColourArray,
    LightDiffuseColourPowerScaledArray,
    LightSpecularColourPowerScaledArray,
    LightAttenuationArray,
    LightPositionArray,
    LightPositionObjectSpaceArray,
    LightPositionViewSpaceArray,
    LightDirectionArray,
    LightDirectionObjectSpaceArray,
    LightDirectionViewSpaceArray,
    LightDistanceObjectSpaceArray,
    LightPowerScaleArray,
    SpotlightParamsArray,
    DerivedAmbientLightColour,
    DerivedSceneColour,
    DerivedLightDiffuseColour,
    DerivedLightSpecularColour,
    DerivedLightDiffuseColourArray,
    DerivedLightSpecularColourArray,
    LightNumber,
    LightCastsShadows,
    ShadowExtrusionDistance,
    CameraPosition,
    CameraPositionObjectSpace,
    TextureViewprojMatrix,
    TextureViewprojMatrixArray,
    TextureWorldviewprojMatrix,
    TextureWorldviewprojMatrixArray,
    SpotlightViewprojMatrix,
    SpotlightWorldviewprojMatrix,
    Custom,
    Time,
    Time0X,
    Costime0X,
    Sintime0X,
    Tantime0X,
    Time0XPacked,
    Time01,
    Costime01,
    Sintime01,
    Tantime01,
    Time01Packed,
    Time02Pi,
    Costime02Pi,
    Sintime02Pi,
    Tantime02Pi,
    Time02PiPacked,
    FrameTime,
    Fps,
    ViewportWidth,
    ViewportHeight,
    InverseViewportWidth,
    InverseViewportHeight,
    ViewportSize,
    ViewDirection,
    ViewSideVector,
    ViewUpVector,
    Fov,
    NearClipDistance,
    FarClipDistance,
    PassNumber,
    PassIterationNumber,
    AnimationParametric,
    TexelOffsets,
    SceneDepthRange,
    ShadowSceneDepthRange,
    ShadowColour,
    TextureSize,
    InverseTextureSize,
    PackedTextureSize,
    TextureMatrix,
    LodCameraPosition,
    LodCameraPositionObjectSpace,
}

impl AutoConstantType {
    /// Conventional uniform name, without the seed suffix.
    pub fn name(self) -> &'static str {
        match self {
            Self::WorldMatrix => "world_matrix",
            Self::InverseWorldMatrix => "inverse_world_matrix",
            Self::TransposeWorldMatrix => "transpose_world_matrix",
            Self::InverseTransposeWorldMatrix => "inverse_transpose_world_matrix",
            Self::WorldMatrixArray3x4 => "world_matrix_array_3x4",
            Self::WorldMatrixArray => "world_matrix_array",
            Self::ViewMatrix => "view_matrix",
            Self::InverseViewMatrix => "inverse_view_matrix",
            Self::TransposeViewMatrix => "transpose_view_matrix",
            Self::InverseTransposeViewMatrix => "inverse_transpose_view_matrix",
            Self::ProjectionMatrix => "projection_matrix",
            Self::InverseProjectionMatrix => "inverse_projection_matrix",
            Self::TransposeProjectionMatrix => "transpose_projection_matrix",
            Self::InverseTransposeProjectionMatrix => "inverse_transpose_projection_matrix",
            Self::ViewprojMatrix => "viewproj_matrix",
            Self::InverseViewprojMatrix => "inverse_viewproj_matrix",
            Self::TransposeViewprojMatrix => "transpose_viewproj_matrix",
            Self::InverseTransposeViewprojMatrix => "inverse_transpose_viewproj_matrix",
            Self::WorldviewMatrix => "worldview_matrix",
            Self::InverseWorldviewMatrix => "inverse_worldview_matrix",
            Self::TransposeWorldviewMatrix => "transpose_worldview_matrix",
            Self::InverseTransposeWorldviewMatrix => "inverse_transpose_worldview_matrix",
            Self::WorldviewprojMatrix => "worldviewproj_matrix",
            Self::InverseWorldviewprojMatrix => "inverse_worldviewproj_matrix",
            Self::TransposeWorldviewprojMatrix => "transpose_worldviewproj_matrix",
            Self::InverseTransposeWorldviewprojMatrix => "inverse_transpose_worldviewproj_matrix",
            Self::RenderTargetFlipping => "render_target_flipping",
            Self::FogColour => "fog_colour",
            Self::FogParams => "fog_params",
            Self::SurfaceAmbientColour => "surface_ambient_colour",
            Self::SurfaceDiffuseColour => "surface_diffuse_colour",
            Self::SurfaceSpecularColour => "surface_specular_colour",
            Self::SurfaceEmissiveColour => "surface_emissive_colour",
            Self::SurfaceShininess => "surface_shininess",
            Self::LightCount => "light_count",
            Self::AmbientLightColour => "ambient_light_colour",
            Self::LightDiffuseColour => "light_diffuse_colour",
            Self::LightSpecularColour => "light_specular_colour",
            Self::LightAttenuation => "light_attenuation",
            Self::SpotlightParams => "spotlight_params",
            Self::LightPosition => "light_position",
            Self::LightPositionObjectSpace => "light_position_object_space",
            Self::LightPositionViewSpace => "light_position_view_space",
            Self::LightDirection => "light_direction",
            Self::LightDirectionObjectSpace => "light_direction_object_space",
            Self::LightDirectionViewSpace => "light_direction_view_space",
            Self::LightDistanceObjectSpace => "light_distance_object_space",
            Self::LightPowerScale => "light_power",
            Self::LightDiffuseColourPowerScaled => "light_diffuse_colour_power_scaled",
            Self::LightSpecularColourPowerScaled => "light_specular_colour_power_scaled",
            Self::LightDiffuseColourArray => "light_diffuse_colour_array",
            Self::LightSpecularColourArray => "light_specular_colour_array",
            Self::LightDiffuseColourPowerScaledArray => "light_diffuse_colour_power_scaled_array",
            Self::LightSpecularColourPowerScaledArray => "light_specular_colour_power_scaled_array",
            Self::LightAttenuationArray => "light_attenuation_array",
            Self::LightPositionArray => "light_position_array",
            Self::LightPositionObjectSpaceArray => "light_position_object_space_array",
            Self::LightPositionViewSpaceArray => "light_position_view_space_array",
            Self::LightDirectionArray => "light_direction_array",
            Self::LightDirectionObjectSpaceArray => "light_direction_object_space_array",
            Self::LightDirectionViewSpaceArray => "light_direction_view_space_array",
            Self::LightDistanceObjectSpaceArray => "light_distance_object_space_array",
            Self::LightPowerScaleArray => "light_power_array",
            Self::SpotlightParamsArray => "spotlight_params_array",
            Self::DerivedAmbientLightColour => "derived_ambient_light_colour",
            Self::DerivedSceneColour => "derived_scene_colour",
            Self::DerivedLightDiffuseColour => "derived_light_diffuse_colour",
            Self::DerivedLightSpecularColour => "derived_light_specular_colour",
            Self::DerivedLightDiffuseColourArray => "derived_light_diffuse_colour_array",
            Self::DerivedLightSpecularColourArray => "derived_light_specular_colour_array",
            Self::LightNumber => "light_number",
            Self::LightCastsShadows => "light_casts_shadows",
            Self::ShadowExtrusionDistance => "shadow_extrusion_distance",
            Self::CameraPosition => "camera_position",
            Self::CameraPositionObjectSpace => "camera_position_object_space",
            Self::TextureViewprojMatrix => "texture_viewproj_matrix",
            Self::TextureViewprojMatrixArray => "texture_viewproj_matrix_array",
            Self::TextureWorldviewprojMatrix => "texture_worldviewproj_matrix",
            Self::TextureWorldviewprojMatrixArray => "texture_worldviewproj_matrix_array",
            Self::SpotlightViewprojMatrix => "spotlight_viewproj_matrix",
            Self::SpotlightWorldviewprojMatrix => "spotlight_worldviewproj_matrix",
            Self::Custom => "custom",
            Self::Time => "time",
            Self::Time0X => "time_0_x",
            Self::Costime0X => "costime_0_x",
            Self::Sintime0X => "sintime_0_x",
            Self::Tantime0X => "tantime_0_x",
            Self::Time0XPacked => "time_0_x_packed",
            Self::Time01 => "time_0_1",
            Self::Costime01 => "costime_0_1",
            Self::Sintime01 => "sintime_0_1",
            Self::Tantime01 => "tantime_0_1",
            Self::Time01Packed => "time_0_1_packed",
            Self::Time02Pi => "time_0_2pi",
            Self::Costime02Pi => "costime_0_2pi",
            Self::Sintime02Pi => "sintime_0_2pi",
            Self::Tantime02Pi => "tantime_0_2pi",
            Self::Time02PiPacked => "time_0_2pi_packed",
            Self::FrameTime => "frame_time",
            Self::Fps => "fps",
            Self::ViewportWidth => "viewport_width",
            Self::ViewportHeight => "viewport_height",
            Self::InverseViewportWidth => "inverse_viewport_width",
            Self::InverseViewportHeight => "inverse_viewport_height",
            Self::ViewportSize => "viewport_size",
            Self::ViewDirection => "view_direction",
            Self::ViewSideVector => "view_side_vector",
            Self::ViewUpVector => "view_up_vector",
            Self::Fov => "fov",
            Self::NearClipDistance => "near_clip_distance",
            Self::FarClipDistance => "far_clip_distance",
            Self::PassNumber => "pass_number",
            Self::PassIterationNumber => "pass_iteration_number",
            Self::AnimationParametric => "animation_parametric",
            Self::TexelOffsets => "texel_offsets",
            Self::SceneDepthRange => "scene_depth_range",
            Self::ShadowSceneDepthRange => "shadow_scene_depth_range",
            Self::ShadowColour => "shadow_colour",
            Self::TextureSize => "texture_size",
            Self::InverseTextureSize => "inverse_texture_size",
            Self::PackedTextureSize => "packed_texture_size",
            Self::TextureMatrix => "texture_matrix",
            Self::LodCameraPosition => "lod_camera_position",
            Self::LodCameraPositionObjectSpace => "lod_camera_position_object_space",
        }
    }

    /// Data type of the uniform.
    pub fn constant_type(self) -> GpuConstantType {
        match self {
            Self::WorldMatrix
            | Self::InverseWorldMatrix
            | Self::TransposeWorldMatrix
            | Self::InverseTransposeWorldMatrix
            | Self::WorldMatrixArray
            | Self::ViewMatrix
            | Self::InverseViewMatrix
            | Self::TransposeViewMatrix
            | Self::InverseTransposeViewMatrix
            | Self::ProjectionMatrix
            | Self::InverseProjectionMatrix
            | Self::TransposeProjectionMatrix
            | Self::InverseTransposeProjectionMatrix
            | Self::ViewprojMatrix
            | Self::InverseViewprojMatrix
            | Self::TransposeViewprojMatrix
            | Self::InverseTransposeViewprojMatrix
            | Self::WorldviewMatrix
            | Self::InverseWorldviewMatrix
            | Self::TransposeWorldviewMatrix
            | Self::InverseTransposeWorldviewMatrix
            | Self::WorldviewprojMatrix
            | Self::InverseWorldviewprojMatrix
            | Self::TransposeWorldviewprojMatrix
            | Self::InverseTransposeWorldviewprojMatrix
            | Self::TextureViewprojMatrix
            | Self::TextureViewprojMatrixArray
            | Self::TextureWorldviewprojMatrix
            | Self::TextureWorldviewprojMatrixArray
            | Self::SpotlightViewprojMatrix
            | Self::SpotlightWorldviewprojMatrix
            | Self::TextureMatrix => GpuConstantType::Matrix4x4,
            Self::WorldMatrixArray3x4 => GpuConstantType::Matrix3x4,
            Self::RenderTargetFlipping
            | Self::SurfaceShininess
            | Self::LightCount
            | Self::LightDistanceObjectSpace
            | Self::LightPowerScale
            | Self::LightDistanceObjectSpaceArray
            | Self::LightPowerScaleArray
            | Self::LightNumber
            | Self::LightCastsShadows
            | Self::ShadowExtrusionDistance
            | Self::Time
            | Self::Time0X
            | Self::Costime0X
            | Self::Sintime0X
            | Self::Tantime0X
            | Self::Time01
            | Self::Costime01
            | Self::Sintime01
            | Self::Tantime01
            | Self::Time02Pi
            | Self::Costime02Pi
            | Self::Sintime02Pi
            | Self::Tantime02Pi
            | Self::FrameTime
            | Self::Fps
            | Self::ViewportWidth
            | Self::ViewportHeight
            | Self::InverseViewportWidth
            | Self::InverseViewportHeight
            | Self::Fov
            | Self::NearClipDistance
            | Self::FarClipDistance
            | Self::PassNumber
            | Self::PassIterationNumber => GpuConstantType::Float1,
            Self::FogColour
            | Self::FogParams
            | Self::SurfaceAmbientColour
            | Self::SurfaceDiffuseColour
            | Self::SurfaceSpecularColour
            | Self::SurfaceEmissiveColour
            | Self::AmbientLightColour
            | Self::LightDiffuseColour
            | Self::LightSpecularColour
            | Self::LightAttenuation
            | Self::SpotlightParams
            | Self::LightPosition
            | Self::LightPositionObjectSpace
            | Self::LightPositionViewSpace
            | Self::LightDirection
            | Self::LightDirectionObjectSpace
            | Self::LightDirectionViewSpace
            | Self::LightDiffuseColourPowerScaled
            | Self::LightSpecularColourPowerScaled
            | Self::LightDiffuseColourArray
            | Self::LightSpecularColourArray
            | Self::LightDiffuseColourPowerScaledArray
            | Self::LightSpecularColourPowerScaledArray
            | Self::LightAttenuationArray
            | Self::LightPositionArray
            | Self::LightPositionObjectSpaceArray
            | Self::LightPositionViewSpaceArray
            | Self::LightDirectionArray
            | Self::LightDirectionObjectSpaceArray
            | Self::LightDirectionViewSpaceArray
            | Self::SpotlightParamsArray
            | Self::DerivedAmbientLightColour
            | Self::DerivedSceneColour
            | Self::DerivedLightDiffuseColour
            | Self::DerivedLightSpecularColour
            | Self::DerivedLightDiffuseColourArray
            | Self::DerivedLightSpecularColourArray
            | Self::Custom
            | Self::Time0XPacked
            | Self::Time01Packed
            | Self::Time02PiPacked
            | Self::ViewportSize
            | Self::AnimationParametric
            | Self::TexelOffsets
            | Self::SceneDepthRange
            | Self::ShadowSceneDepthRange
            | Self::ShadowColour
            | Self::TextureSize
            | Self::InverseTextureSize
            | Self::PackedTextureSize => GpuConstantType::Float4,
            Self::CameraPosition
            | Self::CameraPositionObjectSpace
            | Self::ViewDirection
            | Self::ViewSideVector
            | Self::ViewUpVector
            | Self::LodCameraPosition
            | Self::LodCameraPositionObjectSpace => GpuConstantType::Float3,
        }
    }
}

/// Seed passed along with an auto constant: a light index, a texture unit or
/// a custom scalar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AutoConstantData {
    /// A floating point seed.
    Real(f32),
    /// An integer seed.
    Int(usize),
}

impl AutoConstantData {
    /// `true` when the seed is zero and therefore not part of the name.
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Real(value) => *value == 0.0,
            Self::Int(value) => *value == 0,
        }
    }

    /// Whether both seeds address the same auto constant.
    pub fn same_seed(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Real(a), Self::Real(b)) => a.to_bits() == b.to_bits(),
            (Self::Int(a), Self::Int(b)) => a == b,
            _ => false,
        }
    }
}

/// An auto constant request: which value and with which seed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoConstant {
    /// The engine value to bind.
    pub auto_type: AutoConstantType,
    /// Seed of the value.
    pub data: AutoConstantData,
}

impl AutoConstant {
    /// Creates an auto constant with a floating point seed.
    pub fn real(auto_type: AutoConstantType, data: f32) -> Self {
        Self {
            auto_type,
            data: AutoConstantData::Real(data),
        }
    }

    /// Creates an auto constant with an integer seed.
    pub fn int(auto_type: AutoConstantType, data: usize) -> Self {
        Self {
            auto_type,
            data: AutoConstantData::Int(data),
        }
    }

    /// Uniform name for this request: the table name, suffixed with the seed
    /// when it is not zero.
    pub fn uniform_name(&self) -> String {
        let base = self.auto_type.name();
        match self.data {
            _ if self.data.is_zero() => base.to_string(),
            AutoConstantData::Real(value) => format!("{base}{value}"),
            AutoConstantData::Int(value) => format!("{base}{value}"),
        }
    }

    /// `true` when both requests resolve to the same uniform.
    pub fn matches(&self, other: &Self) -> bool {
        self.auto_type == other.auto_type && self.data.same_seed(&other.data)
    }
}
