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

//! Command line front end: loads a RON program set, packs its varyings and
//! writes the shader source for one target language.

use anyhow::{Context, Result};
use clap::Parser;
use rtss_core::{
    processor::ProgramProcessor, settings::ProcessorSettings, ProgramSet, ProgramType,
};
use rtss_writers::{GeneratedProgram, ProgramWriterManager, WriterSettings};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Parser)]
#[command(version, about = "Generate shader source from a RON program set")]
struct Args {
    /// RON file holding the program set.
    input: PathBuf,

    /// Target language: glsl, glsles, hlsl or cg.
    #[arg(short, long, default_value = "glsl")]
    language: String,

    /// RON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory receiving one file per stage. Prints to stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep every varying in its own register.
    #[arg(long)]
    no_compact: bool,

    /// Additional shader library directory, searched after the configured ones.
    #[arg(short = 'I', long = "library-path")]
    library_paths: Vec<PathBuf>,
}

/// Contents of the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RtssConfig {
    processor: ProcessorSettings,
    writers: WriterSettings,
}

fn load_config(path: Option<&Path>) -> Result<RtssConfig> {
    let Some(path) = path else {
        return Ok(RtssConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    ron::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn load_program_set(path: &Path) -> Result<ProgramSet> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read program set {}", path.display()))?;
    let set: ProgramSet =
        ron::from_str(&text).with_context(|| format!("invalid program set {}", path.display()))?;
    set.validate()
        .with_context(|| format!("program set {} is inconsistent", path.display()))?;
    Ok(set)
}

fn stage_file_name(program: &GeneratedProgram) -> String {
    let stage = match program.program_type {
        ProgramType::Vertex => "vertex",
        ProgramType::Fragment => "fragment",
        ProgramType::Geometry => "geometry",
    };
    format!("{stage}.{}", program.language)
}

/// Runs the whole pipeline and returns the generated programs, vertex first.
fn run(args: &Args) -> Result<Vec<GeneratedProgram>> {
    let mut config = load_config(args.config.as_deref())?;
    config
        .writers
        .library_paths
        .extend(args.library_paths.iter().cloned());

    let mut set = load_program_set(&args.input)?;
    if args.no_compact {
        log::info!("Varying compaction disabled");
    } else {
        let processor = ProgramProcessor::new(config.processor.clone());
        if !processor.pre_create_gpu_programs(&mut set) {
            log::warn!(
                "Varyings still exceed {} texcoord slots after compaction",
                processor.max_texcoord_slots()
            );
        }
    }

    let manager = ProgramWriterManager::new(config.writers);
    let generated = manager
        .generate_set(&set, &args.language)
        .with_context(|| format!("failed to generate {} source", args.language))?;

    match &args.output {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            for program in &generated {
                let path = dir.join(stage_file_name(program));
                fs::write(&path, &program.source)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                log::info!("Wrote {}", path.display());
            }
        }
        None => {
            for program in &generated {
                println!("{}", program.source);
            }
        }
    }
    Ok(generated)
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    run(&args)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtss_core::{
        atom::{group_order, FunctionAtom},
        parameter::{Content, GpuConstantType, Semantic, Variability},
    };

    fn sample_set() -> ProgramSet {
        let mut set = ProgramSet::new();
        let (vertex, fragment) = set.vertex_and_fragment_mut();

        let wvp = vertex
            .resolve_named_parameter(
                "worldViewProj",
                GpuConstantType::Matrix4x4,
                Variability::PER_OBJECT,
                None,
            )
            .unwrap();
        let vs = vertex.entry_point_mut();
        let position_in = vs
            .resolve_input_parameter(
                Semantic::Position,
                Some(0),
                Content::PositionObjectSpace,
                GpuConstantType::Float4,
            )
            .unwrap();
        let position_out = vs
            .resolve_output_parameter(
                Semantic::Position,
                Some(0),
                Content::PositionProjectiveSpace,
                GpuConstantType::Float4,
            )
            .unwrap();
        vs.add_atom_instance(FunctionAtom::builtin(
            "mul",
            [vs.in_operand(wvp), vs.in_operand(position_in)],
            vs.out_operand(position_out),
            group_order::VS_TRANSFORM,
        ));

        for index in 0..2 {
            let uv_in = vs
                .resolve_input_parameter(
                    Semantic::TextureCoordinates,
                    Some(index),
                    Content::TextureCoordinate(index as u8),
                    GpuConstantType::Float2,
                )
                .unwrap();
            let uv_out = vs
                .resolve_output_parameter(
                    Semantic::TextureCoordinates,
                    Some(index),
                    Content::TextureCoordinate(index as u8),
                    GpuConstantType::Float2,
                )
                .unwrap();
            vs.add_atom_instance(FunctionAtom::assignment(
                vs.out_operand(uv_out),
                vs.in_operand(uv_in),
                group_order::VS_TEXTURING,
            ));
        }

        let fs = fragment.entry_point_mut();
        let colour = fs
            .resolve_output_parameter(Semantic::Color, Some(0), Content::ColorDiffuse, GpuConstantType::Float4)
            .unwrap();
        let mut uvs = Vec::new();
        for index in 0..2 {
            uvs.push(
                fs.resolve_input_parameter(
                    Semantic::TextureCoordinates,
                    Some(index),
                    Content::TextureCoordinate(index as u8),
                    GpuConstantType::Float2,
                )
                .unwrap(),
            );
        }
        let sum = fs.resolve_local_parameter("lSum", GpuConstantType::Float2).unwrap();
        fs.add_atom_instance(FunctionAtom::binary_op(
            '+',
            fs.in_operand(uvs[0]),
            fs.in_operand(uvs[1]),
            fs.out_operand(sum),
            group_order::PS_TEXTURING,
        ));
        let xy = fs
            .out_operand_masked(colour, rtss_core::operand::OpMask::XY)
            .unwrap();
        fs.add_atom_instance(FunctionAtom::assignment(
            xy,
            fs.in_operand(sum),
            group_order::PS_COLOUR_END,
        ));
        set
    }

    fn write_set(dir: &Path) -> PathBuf {
        let path = dir.join("set.ron");
        let text = ron::ser::to_string_pretty(&sample_set(), ron::ser::PrettyConfig::default()).unwrap();
        fs::write(&path, text).unwrap();
        path
    }

    fn args(input: PathBuf, language: &str) -> Args {
        Args {
            input,
            language: language.to_string(),
            config: None,
            output: None,
            no_compact: false,
            library_paths: Vec::new(),
        }
    }

    #[test]
    fn test_config_defaults_and_overrides() {
        let config: RtssConfig =
            ron::from_str("(processor: (max_texcoord_slots: 4), writers: (glsl_version: 120))").unwrap();
        assert_eq!(config.processor.max_texcoord_slots, 4);
        assert_eq!(config.writers.glsl_version, 120);
        assert_eq!(config.writers.glsles_version, 100);

        let defaults = load_config(None).unwrap();
        assert_eq!(defaults.processor, ProcessorSettings::default());
    }

    #[test]
    fn test_run_writes_one_file_per_stage() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_set(dir.path());
        let out_dir = dir.path().join("out");
        let mut args = args(input, "glsl");
        args.output = Some(out_dir.clone());

        let generated = run(&args).unwrap();
        assert_eq!(generated.len(), 2);

        let vertex = fs::read_to_string(out_dir.join("vertex.glsl")).unwrap();
        assert!(vertex.contains("gl_Position = worldViewProj * vertex;"));
        // Two float2 texcoords share one register after compaction.
        assert!(vertex.contains("out vec4 oTexcoord4_0;"));
        assert!(!vertex.contains("oTexcoord2_1"));

        let fragment = fs::read_to_string(out_dir.join("fragment.glsl")).unwrap();
        assert!(fragment.contains("in vec4 oTexcoord4_0;"));
        assert!(fragment.contains("fragColour.xy = lSum;"));
    }

    #[test]
    fn test_no_compact_keeps_varyings() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(write_set(dir.path()), "hlsl");
        args.no_compact = true;

        let generated = run(&args).unwrap();
        assert!(generated[0].source.contains("float2 oTexcoord2_0 : TEXCOORD0;"));
        assert!(generated[0].source.contains("float2 oTexcoord2_1 : TEXCOORD1;"));
    }

    #[test]
    fn test_missing_input_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.ron");
        let err = run(&args(missing, "glsl")).unwrap_err();
        assert!(err.to_string().contains("missing.ron"));
    }

    #[test]
    fn test_unknown_language_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&args(write_set(dir.path()), "metal")).unwrap_err();
        assert!(format!("{err:#}").contains("metal"));
    }
}
