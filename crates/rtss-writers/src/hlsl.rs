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

//! HLSL writer.

use crate::{
    dialect::HlslDialect,
    error::WriterError,
    writer::{
        array_suffix, type_name, unsupported_stage, write_atoms, write_preprocessor_defines,
        write_program_title, write_section_title, ProgramWriter,
    },
};
use ahash::AHashMap;
use rtss_core::{
    parameter::{Parameter, ParameterId, Semantic},
    Program, ProgramType,
};
use std::fmt::Write;

/// Which target a semantic string is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SemanticTarget {
    Hlsl,
    Cg,
}

/// Which side of the stage a parameter sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Input,
    Output,
}

fn indexed(base: &str, index: u32) -> String {
    if index == 0 {
        base.to_string()
    } else {
        format!("{base}{index}")
    }
}

/// Binding semantics for a stage parameter list.
///
/// Parameters without a semantic take the `TEXCOORD` slots no other parameter
/// of the list uses, handed out in (content, index) order so a vertex output
/// and the matching fragment input get the same slot whatever their position
/// in the list.
pub(crate) fn semantic_names(
    target: SemanticTarget,
    stage: ProgramType,
    direction: Direction,
    params: &[&Parameter],
) -> Vec<String> {
    let mut used: Vec<u32> = params
        .iter()
        .filter(|p| p.semantic() == Semantic::TextureCoordinates)
        .map(|p| p.index())
        .collect();

    let mut unknown: Vec<usize> = (0..params.len())
        .filter(|&i| params[i].semantic() == Semantic::Unknown)
        .collect();
    unknown.sort_by_key(|&i| (params[i].content(), params[i].index()));
    let mut free_slots: AHashMap<usize, u32> = AHashMap::new();
    for position in unknown {
        let slot = (0..).find(|i| !used.contains(i)).unwrap_or_default();
        used.push(slot);
        free_slots.insert(position, slot);
    }

    params
        .iter()
        .enumerate()
        .map(|(position, p)| {
            let index = p.index();
            match p.semantic() {
                Semantic::Position => match (target, stage, direction) {
                    (SemanticTarget::Hlsl, ProgramType::Vertex, Direction::Input) => "POSITION".to_string(),
                    (SemanticTarget::Hlsl, _, _) => "SV_Position".to_string(),
                    (SemanticTarget::Cg, ProgramType::Fragment, Direction::Input) => "WPOS".to_string(),
                    (SemanticTarget::Cg, _, _) => "POSITION".to_string(),
                },
                Semantic::BlendWeights => indexed("BLENDWEIGHT", index),
                Semantic::BlendIndices => indexed("BLENDINDICES", index),
                Semantic::Normal => indexed("NORMAL", index),
                Semantic::Binormal => indexed("BINORMAL", index),
                Semantic::Tangent => indexed("TANGENT", index),
                Semantic::Color => match (target, stage, direction) {
                    (SemanticTarget::Hlsl, ProgramType::Fragment, Direction::Output) => {
                        format!("SV_Target{index}")
                    }
                    _ => format!("COLOR{index}"),
                },
                Semantic::TextureCoordinates => format!("TEXCOORD{index}"),
                Semantic::FrontFacing => match target {
                    SemanticTarget::Hlsl => "SV_IsFrontFace".to_string(),
                    SemanticTarget::Cg => "FACE".to_string(),
                },
                Semantic::Unknown => format!("TEXCOORD{}", free_slots.get(&position).copied().unwrap_or_default()),
            }
        })
        .collect()
}

/// Uniform declarations shared by HLSL and Cg. Samplers are bound to the
/// register of their texture unit.
pub(crate) fn write_uniforms(
    out: &mut dyn Write,
    program: &Program,
    dialect: &HlslDialect,
) -> Result<(), WriterError> {
    let entry = program.entry_point();
    for id in program.parameters() {
        let param = entry.parameter(*id);
        let ty = type_name(dialect, param)?;
        if param.is_sampler() {
            writeln!(
                out,
                "uniform {ty} {} : register(s{});",
                param.name(),
                param.index()
            )?;
        } else {
            writeln!(out, "uniform {ty} {}{};", param.name(), array_suffix(param))?;
        }
    }
    Ok(())
}

/// `#include` line per library dependency.
pub(crate) fn write_includes(out: &mut dyn Write, program: &Program, extension: &str) -> Result<(), WriterError> {
    write_section_title(out, "PROGRAM DEPENDENCIES")?;
    for library in program.dependencies() {
        writeln!(out, "#include \"{library}.{extension}\"")?;
    }
    Ok(())
}

/// Emits Shader Model 4 style HLSL with input and output structs.
#[derive(Debug, Clone, Default)]
pub struct HlslProgramWriter {
    dialect: HlslDialect,
}

impl HlslProgramWriter {
    /// Language name of this writer.
    pub const TARGET_LANGUAGE: &'static str = "hlsl";

    /// Creates the writer.
    pub fn new() -> Self {
        Self::default()
    }

    fn write_struct(
        &self,
        out: &mut dyn Write,
        name: &str,
        program: &Program,
        direction: Direction,
    ) -> Result<(), WriterError> {
        let entry = program.entry_point();
        let ids = match direction {
            Direction::Input => entry.input_parameters(),
            Direction::Output => entry.output_parameters(),
        };
        let params: Vec<&Parameter> = ids.iter().map(|id| entry.parameter(*id)).collect();
        let semantics = semantic_names(SemanticTarget::Hlsl, program.program_type(), direction, &params);

        writeln!(out, "struct {name}")?;
        writeln!(out, "{{")?;
        for (param, semantic) in params.iter().zip(&semantics) {
            writeln!(
                out,
                "\t{} {}{} : {};",
                type_name(&self.dialect, param)?,
                param.name(),
                array_suffix(param),
                semantic
            )?;
        }
        writeln!(out, "}};")?;
        writeln!(out)?;
        Ok(())
    }
}

impl ProgramWriter for HlslProgramWriter {
    fn target_language(&self) -> &str {
        Self::TARGET_LANGUAGE
    }

    fn write_source_code(&self, out: &mut dyn Write, program: &Program) -> Result<(), WriterError> {
        let prefix = match program.program_type() {
            ProgramType::Vertex => "VS",
            ProgramType::Fragment => "PS",
            ProgramType::Geometry => return Err(unsupported_stage(Self::TARGET_LANGUAGE, program)),
        };
        program.validate()?;

        write_program_title(out, program, Self::TARGET_LANGUAGE)?;
        let packing = if program.use_column_major_matrices() {
            "column_major"
        } else {
            "row_major"
        };
        writeln!(out, "#pragma pack_matrix({packing})")?;
        write_preprocessor_defines(out, program)?;
        writeln!(out)?;

        write_includes(out, program, Self::TARGET_LANGUAGE)?;
        writeln!(out)?;

        write_section_title(out, "GLOBAL PARAMETERS")?;
        write_uniforms(out, program, &self.dialect)?;
        writeln!(out)?;

        write_section_title(out, "MAIN")?;
        let input_struct = format!("{prefix}_INPUT");
        let output_struct = format!("{prefix}_OUTPUT");
        self.write_struct(out, &input_struct, program, Direction::Input)?;
        self.write_struct(out, &output_struct, program, Direction::Output)?;

        let entry = program.entry_point();
        let mut aliases: AHashMap<ParameterId, String> = AHashMap::new();
        for id in entry.input_parameters() {
            aliases.insert(*id, format!("input.{}", entry.parameter(*id).name()));
        }
        for id in entry.output_parameters() {
            aliases.insert(*id, format!("output.{}", entry.parameter(*id).name()));
        }

        writeln!(out, "{output_struct} {}({input_struct} input)", entry.name())?;
        writeln!(out, "{{")?;
        writeln!(out, "\t{output_struct} output;")?;
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

        // Globals are constant in shader model 4.
        let uniforms = program.parameters();
        write_atoms(
            out,
            program,
            &self.dialect,
            &mut aliases,
            &|id| uniforms.contains(&id),
            &|param, name| Ok(format!("{} {}", type_name(&self.dialect, param)?, name)),
        )?;
        writeln!(out, "\treturn output;")?;
        writeln!(out, "}}")?;
        Ok(())
    }
}
