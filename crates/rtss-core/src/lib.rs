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

//! Intermediate representation of generated shader programs.
//!
//! Programs are assembled from typed [`parameter::Parameter`]s and ordered
//! [`atom::FunctionAtom`]s. Before the GPU programs are created, the
//! [`processor::ProgramProcessor`] packs the varyings shared by the vertex and
//! fragment stages into as few interpolator registers as possible. Source
//! text is produced by the writers of the `rtss-writers` crate.

#![warn(missing_docs)]

pub mod atom;
pub mod error;
pub mod function;
pub mod gpu_params;
pub mod operand;
pub mod parameter;
pub mod processor;
pub mod program;
pub mod settings;

pub use self::error::{IrError, OperandError, ProcessorError};
pub use self::function::{Function, FunctionKind};
pub use self::program::{Program, ProgramSet, ProgramType};
