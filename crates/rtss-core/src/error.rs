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

//! Error types of the shader intermediate representation.

use crate::{
    operand::OpSemantic,
    parameter::{ParameterId, Semantic},
};
use thiserror::Error;

/// Structural errors raised while building a [`Function`](crate::function::Function)
/// or a [`Program`](crate::program::Program).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IrError {
    /// Another parameter of the same list already uses this semantic and index.
    #[error("duplicate parameter '{name}' for semantic {semantic:?} index {index}")]
    DuplicateParameter {
        /// Name of the rejected parameter.
        name: String,
        /// Semantic shared with the existing parameter.
        semantic: Semantic,
        /// Index shared with the existing parameter.
        index: u32,
    },
    /// Another parameter of the same list already uses this name.
    #[error("duplicate parameter name '{0}'")]
    DuplicateName(String),
    /// A handle does not belong to the parameter pool of this function.
    #[error("unknown parameter handle {0:?}")]
    UnknownParameter(ParameterId),
    /// An atom operand references a parameter that is not reachable from any
    /// parameter list of the program.
    #[error("atom {atom} operand {operand} references unlisted parameter '{name}'")]
    DanglingOperand {
        /// Position of the atom in the atom list.
        atom: usize,
        /// Position of the operand inside the atom.
        operand: usize,
        /// Name of the referenced parameter.
        name: String,
    },
    /// A vertex entry point has no position output.
    #[error("entry point '{0}' does not output a position")]
    MissingPositionOutput(String),
}

/// Operand construction failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum OperandError {
    /// The component mask selects no component at all.
    #[error("operand mask must select at least one component")]
    EmptyMask,
    /// A typed operand wrapper received an operand of the wrong direction.
    #[error("expected an operand of direction {expected:?}, found {found:?}")]
    DirectionMismatch {
        /// Direction required by the wrapper.
        expected: OpSemantic,
        /// Direction carried by the operand.
        found: OpSemantic,
    },
}

/// Internal failures of the varying compaction pass.
///
/// None of these are reachable for well formed programs; running over the
/// register budget is reported through
/// [`CompactionReport`](crate::processor::CompactionReport) instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProcessorError {
    /// A merged register was asked to take more than four components.
    #[error("merged register overflow: {used} + {requested} components")]
    FloatOverflow {
        /// Components already placed.
        used: usize,
        /// Components of the rejected source.
        requested: usize,
    },
    /// A merged register was asked to take more than four sources.
    #[error("merged register already holds four sources")]
    SourceOverflow,
    /// Shifting a mask to its destination offset dropped components.
    #[error("operand mask {mask:#06b} cannot be shifted by {offset} components")]
    MaskOverflow {
        /// Mask bits of the operand being redirected.
        mask: u8,
        /// Destination component offset.
        offset: u32,
    },
    /// Operand construction failed while generating copy code.
    #[error(transparent)]
    Operand(#[from] OperandError),
    /// Rebuilding a parameter list failed.
    #[error(transparent)]
    Ir(#[from] IrError),
}
