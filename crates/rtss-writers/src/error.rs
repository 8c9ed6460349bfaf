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

//! Errors raised while emitting shader source.

use rtss_core::{parameter::GpuConstantType, IrError, ProgramType};
use std::{fmt, io};
use thiserror::Error;

/// Failures of a program writer.
#[derive(Debug, Error)]
pub enum WriterError {
    /// The target has no shader stage of this type.
    #[error("{language} writer does not support {program_type:?} programs")]
    UnsupportedProgramType {
        /// Target language of the writer.
        language: String,
        /// Rejected program type.
        program_type: ProgramType,
    },
    /// The target has no spelling for this data type.
    #[error("{language} has no type for {constant_type:?} (parameter '{parameter}')")]
    UnsupportedType {
        /// Target language of the writer.
        language: String,
        /// Rejected data type.
        constant_type: GpuConstantType,
        /// Parameter carrying the type.
        parameter: String,
    },
    /// A library source could not be opened.
    #[error("failed to load shader library '{name}'")]
    LibraryNotFound {
        /// File name that was searched.
        name: String,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// Library functions call each other in a cycle.
    #[error("library functions call each other in a cycle: {0}")]
    CyclicLibraryDependency(String),
    /// No writer is registered under this name.
    #[error("no program writer registered for language '{0}'")]
    UnsupportedLanguage(String),
    /// The program is structurally invalid.
    #[error(transparent)]
    Ir(#[from] IrError),
    /// Writing into the output failed.
    #[error("failed to format shader source")]
    Format(#[from] fmt::Error),
}
