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

//! GLSL ES writer.

use crate::{
    dialect::GlslDialect, error::WriterError, glsl_common::GlslEmitter, library::FunctionLibraryCache,
    writer::ProgramWriter,
};
use rtss_core::Program;
use std::{fmt::Write, sync::Arc};

/// Emits GLSL ES with default precision statements and per declaration
/// `highp`/`mediump` qualifiers. Geometry programs are rejected.
#[derive(Debug, Clone)]
pub struct GlslEsProgramWriter {
    dialect: GlslDialect,
    libraries: Arc<FunctionLibraryCache>,
}

impl GlslEsProgramWriter {
    /// Language name of this writer.
    pub const TARGET_LANGUAGE: &'static str = "glsles";

    /// Creates a writer for `#version {version}`.
    pub fn new(version: u32, libraries: Arc<FunctionLibraryCache>) -> Self {
        Self {
            dialect: GlslDialect::es(version),
            libraries,
        }
    }
}

impl ProgramWriter for GlslEsProgramWriter {
    fn target_language(&self) -> &str {
        Self::TARGET_LANGUAGE
    }

    fn write_source_code(&self, out: &mut dyn Write, program: &Program) -> Result<(), WriterError> {
        GlslEmitter::new(self.dialect, &self.libraries).write(out, program)
    }
}
