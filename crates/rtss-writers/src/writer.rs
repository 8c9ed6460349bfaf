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

//! The writer interface and helpers shared by every target.

use crate::error::WriterError;
use ahash::{AHashMap, AHashSet};
use rtss_core::{
    atom::{EmitContext, SourceDialect},
    parameter::{AutoConstant, GpuConstantType, Parameter, ParameterId, Variability},
    Program, ProgramType,
};
use serde::Serialize;
use std::fmt::{self, Write};

/// Turns a [`Program`] into source text of one target language.
///
/// Writers never modify the program; emitting twice gives the same text.
pub trait ProgramWriter: Send + Sync {
    /// Language name the writer is registered under.
    fn target_language(&self) -> &str;

    /// Writes the complete source of `program` into `out`.
    fn write_source_code(&self, out: &mut dyn Write, program: &Program) -> Result<(), WriterError>;
}

/// Description of one uniform, for binding after the GPU program is created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniformDescriptor {
    /// Declared name.
    pub name: String,
    /// Data type.
    pub constant_type: GpuConstantType,
    /// Element count for arrays.
    pub array_size: Option<usize>,
    /// Engine value bound automatically, if any.
    pub auto_constant: Option<AutoConstant>,
    /// How often the value changes.
    pub variability: Variability,
}

impl UniformDescriptor {
    /// Describes a uniform parameter.
    pub fn from_parameter(param: &Parameter) -> Self {
        Self {
            name: param.name().to_string(),
            constant_type: param.constant_type(),
            array_size: param.array_size(),
            auto_constant: param.auto_constant().copied(),
            variability: param.variability(),
        }
    }
}

/// Output of [`ProgramWriterManager::generate`](crate::ProgramWriterManager::generate).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedProgram {
    /// Stage of the program.
    pub program_type: ProgramType,
    /// Target language.
    pub language: String,
    /// Entry point name in the source.
    pub entry_point: String,
    /// Complete source text.
    pub source: String,
    /// Uniforms in declaration order.
    pub uniforms: Vec<UniformDescriptor>,
    /// Library dependencies, in dependency order.
    pub dependencies: Vec<String>,
    /// Whether skinning code is included.
    pub skeletal_animation: bool,
    /// Matrix packing expected by the uniforms.
    pub column_major_matrices: bool,
}

impl GeneratedProgram {
    pub(crate) fn new(program: &Program, language: &str, source: String) -> Self {
        Self {
            program_type: program.program_type(),
            language: language.to_string(),
            entry_point: program.entry_point().name().to_string(),
            source,
            uniforms: program
                .parameters()
                .iter()
                .map(|id| UniformDescriptor::from_parameter(program.parameter(*id)))
                .collect(),
            dependencies: program.dependencies().to_vec(),
            skeletal_animation: program.skeletal_animation_included(),
            column_major_matrices: program.use_column_major_matrices(),
        }
    }
}

const RULE: &str = "//-----------------------------------------------------------------------------";

/// Banner naming the program type and language.
pub(crate) fn write_program_title(out: &mut dyn Write, program: &Program, language: &str) -> fmt::Result {
    writeln!(out, "{RULE}")?;
    writeln!(out, "// Program Type: {}", program.program_type().description())?;
    writeln!(out, "// Language: {language}")?;
    writeln!(out, "// Created by the RTSS program writers. DO NOT MODIFY")?;
    writeln!(out, "{RULE}")
}

/// Section banner.
pub(crate) fn write_section_title(out: &mut dyn Write, title: &str) -> fmt::Result {
    writeln!(out, "{RULE}")?;
    writeln!(out, "//                         {title}")?;
    writeln!(out, "{RULE}")
}

/// `#define` lines from the program's preprocessor defines.
pub(crate) fn write_preprocessor_defines(out: &mut dyn Write, program: &Program) -> fmt::Result {
    for (name, value) in program.preprocessor_define_list() {
        match value {
            Some(value) => writeln!(out, "#define {name} {value}")?,
            None => writeln!(out, "#define {name}")?,
        }
    }
    Ok(())
}

/// Target spelling of the parameter type.
pub(crate) fn type_name(dialect: &dyn SourceDialect, param: &Parameter) -> Result<&'static str, WriterError> {
    dialect
        .type_name(param.constant_type())
        .ok_or_else(|| WriterError::UnsupportedType {
            language: dialect.language().to_string(),
            constant_type: param.constant_type(),
            parameter: param.name().to_string(),
        })
}

/// `[n]` for arrays, empty otherwise.
pub(crate) fn array_suffix(param: &Parameter) -> String {
    param.array_size().map(|size| format!("[{size}]")).unwrap_or_default()
}

/// Rejects a program stage the target cannot express.
pub(crate) fn unsupported_stage(language: &str, program: &Program) -> WriterError {
    WriterError::UnsupportedProgramType {
        language: language.to_string(),
        program_type: program.program_type(),
    }
}

/// Writes the sorted atoms of the entry point, one tab-indented statement
/// per line.
///
/// Parameters for which `read_only` holds are copied into a `local_<name>`
/// variable, declared through `declare`, right before their first write.
pub(crate) fn write_atoms(
    out: &mut dyn Write,
    program: &Program,
    dialect: &dyn SourceDialect,
    aliases: &mut AHashMap<ParameterId, String>,
    read_only: &dyn Fn(ParameterId) -> bool,
    declare: &dyn Fn(&Parameter, &str) -> Result<String, WriterError>,
) -> Result<(), WriterError> {
    let entry = program.entry_point();
    let mut copied: AHashSet<ParameterId> = AHashSet::new();
    for atom in entry.sorted_atom_instances() {
        for operand in atom.operands() {
            let id = operand.parameter();
            if !operand.semantic().is_write() || copied.contains(&id) || !read_only(id) {
                continue;
            }
            let param = entry.parameter(id);
            let local = format!("local_{}", param.name());
            let current = aliases
                .get(&id)
                .cloned()
                .unwrap_or_else(|| param.name().to_string());
            writeln!(out, "\t{} = {};", declare(param, &local)?, current)?;
            aliases.insert(id, local);
            copied.insert(id);
        }

        let ctx = EmitContext::new(entry.pool(), dialect).with_aliases(aliases);
        write!(out, "\t")?;
        atom.write_source_code(out, &ctx)?;
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtss_core::parameter::AutoConstantType;

    #[test]
    fn test_generated_program_lists_uniforms() {
        let mut program = Program::new(ProgramType::Vertex);
        program
            .resolve_auto_parameter_real(AutoConstantType::WorldviewprojMatrix, 0.0, None)
            .unwrap();
        program
            .resolve_named_parameter("gTint", GpuConstantType::Float4, Variability::GLOBAL, Some(2))
            .unwrap();
        program.add_dependency("FFPLib_Common");

        let generated = GeneratedProgram::new(&program, "hlsl", String::new());
        assert_eq!(generated.entry_point, "main");
        assert_eq!(generated.dependencies, ["FFPLib_Common"]);
        assert_eq!(generated.uniforms.len(), 2);
        assert!(generated.uniforms[0].auto_constant.is_some());
        assert_eq!(generated.uniforms[1].name, "gTint");
        assert_eq!(generated.uniforms[1].array_size, Some(2));
    }

    #[test]
    fn test_program_title() {
        let program = Program::new(ProgramType::Fragment);
        let mut text = String::new();
        write_program_title(&mut text, &program, "glsl").unwrap();
        assert!(text.contains("// Program Type: Fragment Program\n"));
        assert!(text.contains("// Language: glsl\n"));
    }
}
