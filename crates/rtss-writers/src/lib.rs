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

//! Source writers turning shader programs into GLSL, GLSL ES, HLSL or Cg.
//!
//! A [`manager::ProgramWriterManager`] maps target language names to writer
//! factories. The GLSL family inlines the library functions a program calls,
//! read once per process through a [`library::FunctionLibraryCache`]; HLSL and
//! Cg reference the libraries with `#include`.

#![warn(missing_docs)]

pub mod cg;
pub mod dialect;
pub mod error;
pub mod glsl;
pub mod glsles;
pub mod hlsl;
pub mod library;
pub mod manager;
pub mod settings;
pub mod writer;

mod glsl_common;

pub use self::error::WriterError;
pub use self::manager::ProgramWriterManager;
pub use self::settings::WriterSettings;
pub use self::writer::{GeneratedProgram, ProgramWriter, UniformDescriptor};
