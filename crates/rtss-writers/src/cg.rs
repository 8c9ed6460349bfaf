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

//! Cg writer.

use crate::{
    dialect::HlslDialect,
    error::WriterError,
    hlsl::{semantic_names, write_includes, write_uniforms, Direction, SemanticTarget},
    writer::{
        array_suffix, type_name, unsupported_stage, write_atoms, write_preprocessor_defines,
        write_program_title, write_section_title, ProgramWriter,
    },
};
use ahash::AHashMap;
use rtss_core::{
    parameter::{Parameter, ParameterId},
    Program, ProgramType,
};
use std::fmt::Write;

/// Emits Cg with stage parameters passed as `in`/`out` arguments of `main`.
#[derive(Debug, Clone)]
pub struct CgProgramWriter {
    dialect: HlslDialect,
}

impl Default for CgProgramWriter {
    fn default() -> Self {
        Self {
            dialect: HlslDialect::cg(),
        }
    }
}

impl CgProgramWriter {
    /// Language name of this writer.
    pub const TARGET_LANGUAGE: &'static str = "cg";

    /// Creates the writer.
    pub fn new() -> Self {
        Self::default()
    }

    fn main_arguments(&self, program: &Program) -> Result<Vec<String>, WriterError> {
        let entry = program.entry_point();
        let mut arguments = Vec::new();
        for (keyword, direction, ids) in [
            ("in", Direction::Input, entry.input_parameters()),
            ("out", Direction::Output, entry.output_parameters()),
        ] {
            let params: Vec<&Parameter> = ids.iter().map(|id| entry.parameter(*id)).collect();
            let semantics = semantic_names(SemanticTarget::Cg, program.program_type(), direction, &params);
            for (param, semantic) in params.iter().zip(semantics) {
                arguments.push(format!(
                    "{keyword} {} {}{} : {semantic}",
                    type_name(&self.dialect, param)?,
                    param.name(),
                    array_suffix(param)
                ));
            }
        }
        Ok(arguments)
    }
}

impl ProgramWriter for CgProgramWriter {
    fn target_language(&self) -> &str {
        Self::TARGET_LANGUAGE
    }

    fn write_source_code(&self, out: &mut dyn Write, program: &Program) -> Result<(), WriterError> {
        if program.program_type() == ProgramType::Geometry {
            return Err(unsupported_stage(Self::TARGET_LANGUAGE, program));
        }
        program.validate()?;

        write_program_title(out, program, Self::TARGET_LANGUAGE)?;
        write_preprocessor_defines(out, program)?;
        writeln!(out)?;

        write_includes(out, program, Self::TARGET_LANGUAGE)?;
        writeln!(out)?;

        write_section_title(out, "GLOBAL PARAMETERS")?;
        write_uniforms(out, program, &self.dialect)?;
        writeln!(out)?;

        write_section_title(out, "MAIN")?;
        let entry = program.entry_point();
        let arguments = self.main_arguments(program)?;
        writeln!(out, "void {}(", entry.name())?;
        writeln!(out, "\t {}", arguments.join(",\n\t "))?;
        writeln!(out, ")")?;
        writeln!(out, "{{")?;
        for id in entry.local_parameters() {
            let param = entry.parameter(*id);
            writeln!(
                out,
                "\t{} {}{};",
                type_name(&self.dialect, param)?,
                param.name(),
                array_suffix(param)
            )?;
        }
        writeln!(out)?;

        let uniforms = program.parameters();
        let mut aliases: AHashMap<ParameterId, String> = AHashMap::new();
        write_atoms(
            out,
            program,
            &self.dialect,
            &mut aliases,
            &|id| uniforms.contains(&id),
            &|param, name| Ok(format!("{} {}", type_name(&self.dialect, param)?, name)),
        )?;
        writeln!(out, "}}")?;
        Ok(())
    }
}
