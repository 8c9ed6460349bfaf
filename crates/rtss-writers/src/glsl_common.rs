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

//! Emission shared by the desktop GLSL and GLSL ES writers.

use crate::{
    dialect::GlslDialect,
    error::WriterError,
    library::{discover_function_dependencies, FunctionLibraryCache},
    settings::WriterSettings,
    writer::{
        array_suffix, type_name, unsupported_stage, write_atoms, write_preprocessor_defines,
        write_program_title, write_section_title,
    },
};
use ahash::AHashMap;
use rtss_core::{
    atom::SourceDialect,
    parameter::{Content, Parameter, ParameterId, Semantic},
    Program, ProgramType,
};
use std::fmt::Write;

/// Library whose functions rely on `transpose`, missing from GLSL ES 1.00.
const TEXTURING_LIBRARY: &str = "FFPLib_Texturing";

const TRANSPOSE_HELPER: &str = "\
void transpose(in mat4 m, out mat4 o)
{
    for (int i = 0; i < 4; i++)
    {
        for (int j = 0; j < 4; j++)
        {
            o[j][i] = m[i][j];
        }
    }
}
";

/// Attribute name the engine binds a vertex stream of this content to.
fn vertex_attribute_name(content: Content) -> Option<String> {
    let name = match content {
        Content::PositionObjectSpace => "vertex",
        Content::NormalObjectSpace => "normal",
        Content::TangentObjectSpace => "tangent",
        Content::BinormalObjectSpace => "binormal",
        Content::BlendIndices => "blendIndices",
        Content::BlendWeights => "blendWeights",
        Content::ColorDiffuse => "colour",
        Content::ColorSpecular => "secondary_colour",
        Content::TextureCoordinate(index) => return Some(format!("uv{index}")),
        _ => return None,
    };
    Some(name.to_string())
}

/// Vertex outputs are prefixed `o`, fragment inputs `i`; the linker matches
/// varyings by name so fragment inputs take the vertex spelling.
fn varying_name(param: &Parameter) -> String {
    match param.name().strip_prefix('i') {
        Some(rest) => format!("o{rest}"),
        None => param.name().to_string(),
    }
}

pub(crate) struct GlslEmitter<'a> {
    dialect: GlslDialect,
    libraries: &'a FunctionLibraryCache,
}

impl<'a> GlslEmitter<'a> {
    pub(crate) fn new(dialect: GlslDialect, libraries: &'a FunctionLibraryCache) -> Self {
        Self { dialect, libraries }
    }

    fn uses_in_out(&self) -> bool {
        WriterSettings::uses_in_out(self.dialect.version(), self.dialect.is_es())
    }

    /// `highp `/`mediump ` on GLSL ES float data, nothing elsewhere.
    fn precision(&self, param: &Parameter) -> &'static str {
        if !self.dialect.is_es() || !param.is_float() {
            return "";
        }
        if param.is_high_precision() {
            "highp "
        } else {
            "mediump "
        }
    }

    fn declaration(&self, param: &Parameter, name: &str) -> Result<String, WriterError> {
        Ok(format!(
            "{}{} {}{}",
            self.precision(param),
            type_name(&self.dialect, param)?,
            name,
            array_suffix(param)
        ))
    }

    pub(crate) fn write(&self, out: &mut dyn Write, program: &Program) -> Result<(), WriterError> {
        let language = self.dialect.language();
        if program.program_type() == ProgramType::Geometry {
            return Err(unsupported_stage(language, program));
        }
        program.validate()?;

        if self.dialect.is_es() && self.dialect.version() >= 300 {
            writeln!(out, "#version {} es", self.dialect.version())?;
        } else {
            writeln!(out, "#version {}", self.dialect.version())?;
        }
        if self.dialect.is_es() {
            writeln!(out, "precision highp float;")?;
            writeln!(out, "precision highp int;")?;
            writeln!(out, "precision lowp sampler2D;")?;
            writeln!(out, "precision lowp samplerCube;")?;
        }
        write_program_title(out, program, language)?;
        writeln!(out)?;
        write_preprocessor_defines(out, program)?;
        writeln!(out)?;

        self.write_dependencies(out, program)?;
        writeln!(out)?;

        write_section_title(out, "GLOBAL PARAMETERS")?;
        let entry = program.entry_point();
        for id in program.parameters() {
            let param = entry.parameter(*id);
            writeln!(out, "uniform {};", self.declaration(param, param.name())?)?;
        }
        writeln!(out)?;

        write_section_title(out, "MAIN")?;
        self.write_main(out, program)
    }

    fn write_dependencies(&self, out: &mut dyn Write, program: &Program) -> Result<(), WriterError> {
        write_section_title(out, "PROGRAM DEPENDENCIES")?;
        if self.dialect.is_es()
            && self.dialect.version() < 300
            && program.dependencies().iter().any(|d| d == TEXTURING_LIBRARY)
        {
            writeln!(out, "{TRANSPOSE_HELPER}")?;
        }

        let libraries = self
            .libraries
            .load_dependencies(program, self.dialect.language())?;
        for library in &libraries {
            for define in library.defines() {
                writeln!(out, "{define}")?;
            }
        }
        for function in discover_function_dependencies(program, &libraries)? {
            writeln!(out, "{}", function.source())?;
        }
        Ok(())
    }

    fn write_main(&self, out: &mut dyn Write, program: &Program) -> Result<(), WriterError> {
        let entry = program.entry_point();
        let stage = program.program_type();
        let (input_keyword, output_keyword) = match (self.uses_in_out(), stage) {
            (true, _) => ("in", "out"),
            (false, ProgramType::Vertex) => ("attribute", "varying"),
            (false, _) => ("varying", "varying"),
        };
        let mut aliases: AHashMap<ParameterId, String> = AHashMap::new();
        let mut extra_locals: Vec<ParameterId> = Vec::new();

        for id in entry.input_parameters() {
            let param = entry.parameter(*id);
            let name = match stage {
                ProgramType::Vertex => vertex_attribute_name(param.content())
                    .unwrap_or_else(|| param.name().to_string()),
                ProgramType::Fragment => {
                    if param.content() == Content::PositionProjectiveSpace {
                        aliases.insert(*id, "gl_FragCoord".to_string());
                        continue;
                    }
                    if param.semantic() == Semantic::FrontFacing {
                        aliases.insert(*id, "(gl_FrontFacing ? 1.0 : -1.0)".to_string());
                        continue;
                    }
                    varying_name(param)
                }
                ProgramType::Geometry => return Err(unsupported_stage(self.dialect.language(), program)),
            };
            writeln!(out, "{input_keyword} {};", self.declaration(param, &name)?)?;
            aliases.insert(*id, name);
        }

        let legacy_fragment_output = !self.uses_in_out();
        for id in entry.output_parameters() {
            let param = entry.parameter(*id);
            match stage {
                ProgramType::Vertex
                    if param.content() == Content::PositionProjectiveSpace
                        || param.semantic() == Semantic::Position =>
                {
                    aliases.insert(*id, "gl_Position".to_string());
                }
                ProgramType::Fragment if param.semantic() == Semantic::Color => {
                    let name = match (legacy_fragment_output, param.index()) {
                        (true, 0) => "gl_FragColor".to_string(),
                        (true, index) => format!("gl_FragData[{index}]"),
                        (false, 0) => "fragColour".to_string(),
                        (false, index) => format!("fragColour{index}"),
                    };
                    if !legacy_fragment_output {
                        writeln!(out, "out {};", self.declaration(param, &name)?)?;
                    }
                    aliases.insert(*id, name);
                }
                ProgramType::Fragment if legacy_fragment_output => {
                    log::warn!(
                        "Fragment output '{}' has no GLSL {} equivalent, kept as a local",
                        param.name(),
                        self.dialect.version()
                    );
                    extra_locals.push(*id);
                }
                _ => {
                    writeln!(out, "{output_keyword} {};", self.declaration(param, param.name())?)?;
                }
            }
        }
        writeln!(out)?;

        writeln!(out, "void main() {{")?;
        for id in entry.local_parameters().iter().chain(&extra_locals) {
            let param = entry.parameter(*id);
            writeln!(out, "\t{};", self.declaration(param, param.name())?)?;
        }
        writeln!(out)?;

        // Stage inputs and uniforms are read only.
        let uniforms = program.parameters();
        let inputs = entry.input_parameters();
        write_atoms(
            out,
            program,
            &self.dialect,
            &mut aliases,
            &|id| inputs.contains(&id) || uniforms.contains(&id),
            &|param, name| self.declaration(param, name),
        )?;
        writeln!(out, "}}")?;
        Ok(())
    }
}
