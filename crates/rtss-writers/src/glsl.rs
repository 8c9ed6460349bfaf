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

//! Desktop GLSL writer.

use crate::{
    dialect::GlslDialect, error::WriterError, glsl_common::GlslEmitter, library::FunctionLibraryCache,
    writer::ProgramWriter,
};
use rtss_core::Program;
use std::{fmt::Write, sync::Arc};

/// Emits desktop GLSL; library functions are inlined.
///
/// Versions below 130 use `attribute`/`varying` and `gl_FragColor`; later
/// versions declare `in`/`out` variables and a `fragColour` output. Geometry
/// programs are rejected.
#[derive(Debug, Clone)]
pub struct GlslProgramWriter {
    dialect: GlslDialect,
    libraries: Arc<FunctionLibraryCache>,
}

impl GlslProgramWriter {
    /// Language name of this writer.
    pub const TARGET_LANGUAGE: &'static str = "glsl";

    /// Creates a writer for `#version {version}`.
    pub fn new(version: u32, libraries: Arc<FunctionLibraryCache>) -> Self {
        Self {
            dialect: GlslDialect::desktop(version),
            libraries,
        }
    }

    /// The emitted `#version`.
    pub fn version(&self) -> u32 {
        self.dialect.version()
    }
}

impl ProgramWriter for GlslProgramWriter {
    fn target_language(&self) -> &str {
        Self::TARGET_LANGUAGE
    }

    fn write_source_code(&self, out: &mut dyn Write, program: &Program) -> Result<(), WriterError> {
        GlslEmitter::new(self.dialect, &self.libraries).write(out, program)
    }
}
