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

//! Programs: one compilation unit per pipeline stage.

use crate::{
    error::IrError,
    function::{Function, FunctionKind},
    parameter::{
        AutoConstant, AutoConstantType, GpuConstantType, Parameter, ParameterFactory,
        ParameterId, Variability,
    },
};
use serde::{Deserialize, Serialize};

/// Pipeline stage of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgramType {
    /// Vertex program.
    Vertex,
    /// Fragment program.
    Fragment,
    /// Geometry program.
    Geometry,
}

impl ProgramType {
    /// Human readable stage name.
    pub fn description(self) -> &'static str {
        match self {
            Self::Vertex => "Vertex Program",
            Self::Fragment => "Fragment Program",
            Self::Geometry => "Geometry Program",
        }
    }

    fn entry_kind(self) -> FunctionKind {
        match self {
            Self::Vertex => FunctionKind::VertexMain,
            Self::Fragment => FunctionKind::PixelMain,
            Self::Geometry => FunctionKind::GeometryMain,
        }
    }
}

/// One shader program: an entry function plus program wide state.
///
/// Uniforms are allocated in the entry function's pool so atoms can
/// reference them like any other parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    program_type: ProgramType,
    entry_point: Function,
    uniforms: Vec<ParameterId>,
    dependencies: Vec<String>,
    preprocessor_defines: String,
    skeletal_animation: bool,
    column_major_matrices: bool,
}

impl Program {
    /// Creates an empty program with a `main` entry point.
    pub fn new(program_type: ProgramType) -> Self {
        Self {
            program_type,
            entry_point: Function::new(
                "main",
                format!("{} Entry point", program_type.description()),
                program_type.entry_kind(),
            ),
            uniforms: Vec::new(),
            dependencies: Vec::new(),
            preprocessor_defines: String::new(),
            skeletal_animation: false,
            column_major_matrices: true,
        }
    }

    /// The pipeline stage.
    pub fn program_type(&self) -> ProgramType {
        self.program_type
    }

    /// The entry function.
    pub fn entry_point(&self) -> &Function {
        &self.entry_point
    }

    /// The entry function, for adding parameters and atoms.
    pub fn entry_point_mut(&mut self) -> &mut Function {
        &mut self.entry_point
    }

    /// Uniforms in declaration order.
    pub fn parameters(&self) -> &[ParameterId] {
        &self.uniforms
    }

    /// Looks up a parameter of the entry pool.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this program.
    pub fn parameter(&self, id: ParameterId) -> &Parameter {
        self.entry_point.parameter(id)
    }

    /// Looks up a parameter of the entry pool for modification.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this program.
    pub fn parameter_mut(&mut self, id: ParameterId) -> &mut Parameter {
        self.entry_point.parameter_mut(id)
    }

    // --- Uniform resolution ---

    /// Finds or creates an explicit uniform.
    ///
    /// With `index` of `None` the index is the number of explicit uniforms of
    /// that type already declared. The created name is `suggested_name`
    /// followed by the index; samplers without a suggested name use the
    /// sampler naming scheme.
    pub fn resolve_parameter(
        &mut self,
        constant_type: GpuConstantType,
        index: Option<u32>,
        variability: Variability,
        suggested_name: &str,
        size: Option<usize>,
    ) -> Option<ParameterId> {
        let index = match index {
            Some(index) => {
                if let Some(id) = self.get_parameter_by_type(constant_type, index) {
                    return Some(id);
                }
                index
            }
            None => self
                .explicit_uniforms()
                .filter(|p| p.constant_type() == constant_type)
                .count() as u32,
        };

        let param = if suggested_name.is_empty() && constant_type.is_sampler() {
            ParameterFactory::sampler(constant_type, index)?
        } else {
            ParameterFactory::uniform(constant_type, index, variability, suggested_name, size)
        };
        self.insert_uniform(param)
    }

    /// Finds an explicit uniform by name or creates it. A uniform of that name
    /// with another type is a failure.
    pub fn resolve_named_parameter(
        &mut self,
        name: &str,
        constant_type: GpuConstantType,
        variability: Variability,
        size: Option<usize>,
    ) -> Option<ParameterId> {
        if let Some(id) = self.get_parameter_by_name(name) {
            let existing = self.parameter(id);
            if existing.constant_type() == constant_type {
                return Some(id);
            }
            log::warn!(
                "Uniform '{}' already declared as {:?}, requested {:?}",
                name,
                existing.constant_type(),
                constant_type
            );
            return None;
        }

        let index = self
            .explicit_uniforms()
            .filter(|p| p.constant_type() == constant_type)
            .count() as u32;
        let mut param = Parameter::new_uniform(constant_type, name, index, variability, None);
        if let Some(size) = size {
            param = param.with_array_size(size);
        }
        self.insert_uniform(param)
    }

    /// Finds or creates an auto constant uniform with a float seed.
    pub fn resolve_auto_parameter_real(
        &mut self,
        auto_type: AutoConstantType,
        data: f32,
        size: Option<usize>,
    ) -> Option<ParameterId> {
        self.resolve_auto_parameter(AutoConstant::real(auto_type, data), size)
    }

    /// Finds or creates an auto constant uniform with an integer seed.
    pub fn resolve_auto_parameter_int(
        &mut self,
        auto_type: AutoConstantType,
        data: usize,
        size: Option<usize>,
    ) -> Option<ParameterId> {
        self.resolve_auto_parameter(AutoConstant::int(auto_type, data), size)
    }

    fn resolve_auto_parameter(&mut self, auto_constant: AutoConstant, size: Option<usize>) -> Option<ParameterId> {
        let existing = self.uniforms.iter().copied().find(|id| {
            self.parameter(*id)
                .auto_constant()
                .is_some_and(|a| a.matches(&auto_constant))
        });
        if existing.is_some() {
            return existing;
        }
        self.insert_uniform(ParameterFactory::auto_uniform(auto_constant, size))
    }

    fn insert_uniform(&mut self, param: Parameter) -> Option<ParameterId> {
        match self.add_parameter(param) {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!("Program: cannot declare uniform: {}", e);
                None
            }
        }
    }

    fn explicit_uniforms(&self) -> impl Iterator<Item = &Parameter> {
        self.uniforms
            .iter()
            .map(|id| self.parameter(*id))
            .filter(|p| !p.is_auto_constant())
    }

    // --- Uniform lookup ---

    /// Uniform with the given name.
    pub fn get_parameter_by_name(&self, name: &str) -> Option<ParameterId> {
        self.uniforms
            .iter()
            .copied()
            .find(|id| self.parameter(*id).name() == name)
    }

    /// First uniform bound to `auto_type`, whatever its seed.
    pub fn get_parameter_by_auto_type(&self, auto_type: AutoConstantType) -> Option<ParameterId> {
        self.uniforms.iter().copied().find(|id| {
            self.parameter(*id)
                .auto_constant()
                .is_some_and(|a| a.auto_type == auto_type)
        })
    }

    /// Explicit uniform with the given type and index.
    pub fn get_parameter_by_type(&self, constant_type: GpuConstantType, index: u32) -> Option<ParameterId> {
        self.uniforms.iter().copied().find(|id| {
            let p = self.parameter(*id);
            !p.is_auto_constant() && p.constant_type() == constant_type && p.index() == index
        })
    }

    /// Declares a uniform. Names must be unique.
    pub fn add_parameter(&mut self, param: Parameter) -> Result<ParameterId, IrError> {
        if self.get_parameter_by_name(param.name()).is_some() {
            return Err(IrError::DuplicateName(param.name().to_string()));
        }
        let id = self.entry_point.allocate(param);
        self.uniforms.push(id);
        Ok(id)
    }

    /// Removes a uniform from the table. The pool slot stays valid.
    pub fn remove_parameter(&mut self, id: ParameterId) -> bool {
        match self.uniforms.iter().position(|existing| *existing == id) {
            Some(position) => {
                self.uniforms.remove(position);
                true
            }
            None => false,
        }
    }

    // --- Program wide state ---

    /// Adds a library dependency. Exact duplicates are ignored.
    pub fn add_dependency(&mut self, library: impl Into<String>) {
        let library = library.into();
        if !self.dependencies.contains(&library) {
            self.dependencies.push(library);
        }
    }

    /// Library dependencies in insertion order.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Number of library dependencies.
    pub fn dependency_count(&self) -> usize {
        self.dependencies.len()
    }

    /// Preprocessor defines, `NAME` or `NAME=VALUE` separated by `,` or `;`.
    pub fn preprocessor_defines(&self) -> &str {
        &self.preprocessor_defines
    }

    /// Replaces the preprocessor defines.
    pub fn set_preprocessor_defines(&mut self, defines: impl Into<String>) {
        self.preprocessor_defines = defines.into();
    }

    /// Parsed preprocessor defines as `(name, value)` pairs.
    pub fn preprocessor_define_list(&self) -> Vec<(&str, Option<&str>)> {
        self.preprocessor_defines
            .split([',', ';'])
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(|d| match d.split_once('=') {
                Some((name, value)) => (name.trim(), Some(value.trim())),
                None => (d, None),
            })
            .collect()
    }

    /// Whether the program performs skeletal animation.
    pub fn skeletal_animation_included(&self) -> bool {
        self.skeletal_animation
    }

    /// Marks the program as performing skeletal animation.
    pub fn set_skeletal_animation_included(&mut self, included: bool) {
        self.skeletal_animation = included;
    }

    /// Whether matrices are laid out column major.
    pub fn use_column_major_matrices(&self) -> bool {
        self.column_major_matrices
    }

    /// Sets the matrix layout.
    pub fn set_use_column_major_matrices(&mut self, column_major: bool) {
        self.column_major_matrices = column_major;
    }

    /// Checks that every uniform exists and every operand is reachable.
    pub fn validate(&self) -> Result<(), IrError> {
        if let Some(id) = self
            .uniforms
            .iter()
            .find(|id| !self.entry_point.pool().contains(**id))
        {
            return Err(IrError::UnknownParameter(*id));
        }
        self.entry_point.validate_references(&self.uniforms)
    }
}

/// The programs of one technique pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramSet {
    vertex: Program,
    fragment: Program,
    #[serde(default)]
    geometry: Option<Program>,
}

impl Default for ProgramSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramSet {
    /// Creates empty vertex and fragment programs.
    pub fn new() -> Self {
        Self {
            vertex: Program::new(ProgramType::Vertex),
            fragment: Program::new(ProgramType::Fragment),
            geometry: None,
        }
    }

    /// The vertex program.
    pub fn vertex(&self) -> &Program {
        &self.vertex
    }

    /// The vertex program, mutable.
    pub fn vertex_mut(&mut self) -> &mut Program {
        &mut self.vertex
    }

    /// The fragment program.
    pub fn fragment(&self) -> &Program {
        &self.fragment
    }

    /// The fragment program, mutable.
    pub fn fragment_mut(&mut self) -> &mut Program {
        &mut self.fragment
    }

    /// Both rasterisation stages at once.
    pub fn vertex_and_fragment_mut(&mut self) -> (&mut Program, &mut Program) {
        (&mut self.vertex, &mut self.fragment)
    }

    /// The geometry program, if any.
    pub fn geometry(&self) -> Option<&Program> {
        self.geometry.as_ref()
    }

    /// The geometry program, mutable.
    pub fn geometry_mut(&mut self) -> Option<&mut Program> {
        self.geometry.as_mut()
    }

    /// Adds or replaces the geometry program.
    pub fn set_geometry(&mut self, program: Option<Program>) {
        self.geometry = program;
    }

    /// Every program of the set, vertex first.
    pub fn programs(&self) -> impl Iterator<Item = &Program> {
        [Some(&self.vertex), self.geometry.as_ref(), Some(&self.fragment)]
            .into_iter()
            .flatten()
    }

    /// Validates every program of the set.
    pub fn validate(&self) -> Result<(), IrError> {
        self.programs().try_for_each(Program::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        atom::{group_order, FunctionAtom},
        parameter::{Content, Semantic},
    };

    #[test]
    fn test_entry_point_kind_follows_program_type() {
        let vs = Program::new(ProgramType::Vertex);
        let fs = Program::new(ProgramType::Fragment);
        assert_eq!(vs.entry_point().kind(), FunctionKind::VertexMain);
        assert_eq!(fs.entry_point().kind(), FunctionKind::PixelMain);
        assert_eq!(vs.entry_point().description(), "Vertex Program Entry point");
    }

    #[test]
    fn test_explicit_uniform_resolution() {
        let mut p = Program::new(ProgramType::Fragment);
        let first = p
            .resolve_parameter(GpuConstantType::Float4, None, Variability::GLOBAL, "gColour", None)
            .unwrap();
        let second = p
            .resolve_parameter(GpuConstantType::Float4, None, Variability::GLOBAL, "gColour", None)
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(p.parameter(first).name(), "gColour0");
        assert_eq!(p.parameter(second).name(), "gColour1");

        let again = p
            .resolve_parameter(GpuConstantType::Float4, Some(1), Variability::GLOBAL, "gColour", None)
            .unwrap();
        assert_eq!(again, second);

        let sampler = p
            .resolve_parameter(GpuConstantType::Sampler2D, Some(0), Variability::GLOBAL, "", None)
            .unwrap();
        assert_eq!(p.parameter(sampler).name(), "gSampler2D_0");
        assert_eq!(p.parameters().len(), 3);
    }

    #[test]
    fn test_auto_uniform_resolution() {
        let mut p = Program::new(ProgramType::Vertex);
        let a = p
            .resolve_auto_parameter_int(AutoConstantType::WorldviewprojMatrix, 0, None)
            .unwrap();
        let b = p
            .resolve_auto_parameter_int(AutoConstantType::WorldviewprojMatrix, 0, None)
            .unwrap();
        let light = p
            .resolve_auto_parameter_int(AutoConstantType::LightPositionViewSpace, 3, None)
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(p.parameter(a).name(), "worldviewproj_matrix");
        assert_eq!(p.parameter(a).constant_type(), GpuConstantType::Matrix4x4);
        assert_eq!(p.parameter(light).name(), "light_position_view_space3");
        assert_eq!(
            p.get_parameter_by_auto_type(AutoConstantType::LightPositionViewSpace),
            Some(light)
        );

        // Auto uniforms do not count towards explicit indices.
        let explicit = p
            .resolve_parameter(GpuConstantType::Matrix4x4, None, Variability::GLOBAL, "gMatrix", None)
            .unwrap();
        assert_eq!(p.parameter(explicit).index(), 0);
    }

    #[test]
    fn test_named_uniform_type_mismatch() {
        let mut p = Program::new(ProgramType::Vertex);
        let id = p
            .resolve_named_parameter("worldViewProj", GpuConstantType::Matrix4x4, Variability::PER_OBJECT, None)
            .unwrap();
        assert_eq!(
            p.resolve_named_parameter("worldViewProj", GpuConstantType::Matrix4x4, Variability::GLOBAL, None),
            Some(id)
        );
        assert!(p
            .resolve_named_parameter("worldViewProj", GpuConstantType::Float4, Variability::GLOBAL, None)
            .is_none());
        assert!(p
            .add_parameter(Parameter::new_uniform(
                GpuConstantType::Float1,
                "worldViewProj",
                0,
                Variability::GLOBAL,
                None
            ))
            .is_err());
    }

    #[test]
    fn test_dependencies_ignore_duplicates() {
        let mut p = Program::new(ProgramType::Vertex);
        p.add_dependency("FFPLib_Common");
        p.add_dependency("FFPLib_Transform");
        p.add_dependency("FFPLib_Common");
        assert_eq!(p.dependencies(), ["FFPLib_Common", "FFPLib_Transform"]);
        assert_eq!(p.dependency_count(), 2);
    }

    #[test]
    fn test_preprocessor_define_list() {
        let mut p = Program::new(ProgramType::Fragment);
        p.set_preprocessor_defines("USE_FOG, LIGHT_COUNT=3;;SHADOWS = 1");
        assert_eq!(
            p.preprocessor_define_list(),
            vec![
                ("USE_FOG", None),
                ("LIGHT_COUNT", Some("3")),
                ("SHADOWS", Some("1"))
            ]
        );
    }

    #[test]
    fn test_uniform_operands_validate() {
        let mut p = Program::new(ProgramType::Vertex);
        let mvp = p
            .resolve_auto_parameter_int(AutoConstantType::WorldviewprojMatrix, 0, None)
            .unwrap();
        let f = p.entry_point_mut();
        let pos_in = f
            .resolve_input_parameter(Semantic::Position, Some(0), Content::PositionObjectSpace, GpuConstantType::Float4)
            .unwrap();
        let pos_out = f
            .resolve_output_parameter(Semantic::Position, Some(0), Content::PositionProjectiveSpace, GpuConstantType::Float4)
            .unwrap();
        let mut atom = FunctionAtom::invocation("FFP_Transform", "void", group_order::VS_TRANSFORM);
        atom.push_operand(f.in_operand(mvp));
        atom.push_operand(f.in_operand(pos_in));
        atom.push_operand(f.out_operand(pos_out));
        f.add_atom_instance(atom);
        assert!(p.validate().is_ok());

        p.remove_parameter(mvp);
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_program_set_iteration() {
        let mut set = ProgramSet::new();
        assert_eq!(set.programs().count(), 2);
        set.set_geometry(Some(Program::new(ProgramType::Geometry)));
        let types: Vec<ProgramType> = set.programs().map(Program::program_type).collect();
        assert_eq!(
            types,
            [ProgramType::Vertex, ProgramType::Geometry, ProgramType::Fragment]
        );
        assert!(set.validate().is_ok());
    }
}
