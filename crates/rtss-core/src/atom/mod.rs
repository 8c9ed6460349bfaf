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

//! The instruction level of the intermediate representation.
//!
//! A function body is a list of [`FunctionAtom`]s. Every atom carries a group
//! execution order; atoms are stably sorted by it before emission so
//! independently contributed code lands in a predictable place.

mod emit;

pub use self::emit::*;

use crate::operand::{In, Operand, Out};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Group execution order values used by the built in stages.
pub mod group_order {
    /// Vertex stage: first statements.
    pub const VS_PRE_PROCESS: i32 = 0;
    /// Vertex stage: position transform.
    pub const VS_TRANSFORM: i32 = 100;
    /// Vertex stage: colour.
    pub const VS_COLOUR: i32 = 200;
    /// Vertex stage: lighting.
    pub const VS_LIGHTING: i32 = 300;
    /// Vertex stage: texture coordinates.
    pub const VS_TEXTURING: i32 = 400;
    /// Vertex stage: fog.
    pub const VS_FOG: i32 = 500;
    /// Vertex stage: last statements.
    pub const VS_POST_PROCESS: i32 = 2000;

    /// Fragment stage: first statements.
    pub const PS_PRE_PROCESS: i32 = 0;
    /// Fragment stage: colour setup.
    pub const PS_COLOUR_BEGIN: i32 = 100;
    /// Fragment stage: texture sampling.
    pub const PS_SAMPLING: i32 = 150;
    /// Fragment stage: texture blending.
    pub const PS_TEXTURING: i32 = 200;
    /// Fragment stage: colour finish.
    pub const PS_COLOUR_END: i32 = 300;
    /// Fragment stage: fog.
    pub const PS_FOG: i32 = 400;
    /// Fragment stage: last statements.
    pub const PS_POST_PROCESS: i32 = 500;
}

/// The instruction an atom performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AtomKind {
    /// Call of a library function: `name(args...);`.
    Invocation {
        /// Called function.
        function_name: String,
        /// Declared return type, informational.
        return_type: String,
    },
    /// `lhs = rhs;` with operands `[rhs, lhs]`.
    Assignment,
    /// `out = sample(sampler, coords);` with operands `[sampler, coords, out]`.
    SampleTexture,
    /// `out = a <op> b;` with operands `[a, b, out]`.
    BinaryOp(char),
    /// `out = f(args...);` with the output operand last.
    Builtin(String),
}

/// One instruction of a function body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionAtom {
    kind: AtomKind,
    group_order: i32,
    operands: Vec<Operand>,
}

impl FunctionAtom {
    /// Call of `function_name`; operands are pushed afterwards.
    pub fn invocation(
        function_name: impl Into<String>,
        return_type: impl Into<String>,
        group_order: i32,
    ) -> Self {
        Self {
            kind: AtomKind::Invocation {
                function_name: function_name.into(),
                return_type: return_type.into(),
            },
            group_order,
            operands: Vec::new(),
        }
    }

    /// `lhs = rhs;`
    pub fn assignment(lhs: Out, rhs: In, group_order: i32) -> Self {
        Self {
            kind: AtomKind::Assignment,
            group_order,
            operands: vec![rhs.into(), lhs.into()],
        }
    }

    /// `out = sample(sampler, coords);`
    pub fn sample_texture(sampler: In, coords: In, out: Out, group_order: i32) -> Self {
        Self {
            kind: AtomKind::SampleTexture,
            group_order,
            operands: vec![sampler.into(), coords.into(), out.into()],
        }
    }

    /// `out = a <op> b;`
    pub fn binary_op(op: char, a: In, b: In, out: Out, group_order: i32) -> Self {
        Self {
            kind: AtomKind::BinaryOp(op),
            group_order,
            operands: vec![a.into(), b.into(), out.into()],
        }
    }

    /// `out = name(args...);`
    pub fn builtin(
        name: impl Into<String>,
        args: impl IntoIterator<Item = In>,
        out: Out,
        group_order: i32,
    ) -> Self {
        let mut operands: Vec<Operand> = args.into_iter().map(Operand::from).collect();
        operands.push(out.into());
        Self {
            kind: AtomKind::Builtin(name.into()),
            group_order,
            operands,
        }
    }

    /// The instruction.
    pub fn kind(&self) -> &AtomKind {
        &self.kind
    }

    /// Name of the called function, the operator, or `=` for assignments.
    pub fn function_name(&self) -> String {
        match &self.kind {
            AtomKind::Invocation { function_name, .. } => function_name.clone(),
            AtomKind::Assignment => "=".to_string(),
            AtomKind::SampleTexture => "sample".to_string(),
            AtomKind::BinaryOp(op) => op.to_string(),
            AtomKind::Builtin(name) => name.clone(),
        }
    }

    /// Sort key among the atoms of a function.
    pub fn group_execution_order(&self) -> i32 {
        self.group_order
    }

    /// Moves the atom to another group.
    pub fn set_group_execution_order(&mut self, group_order: i32) {
        self.group_order = group_order;
    }

    /// Operands in emission order.
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub(crate) fn operands_mut(&mut self) -> &mut [Operand] {
        &mut self.operands
    }

    /// Appends an operand.
    pub fn push_operand(&mut self, operand: impl Into<Operand>) {
        self.operands.push(operand.into());
    }

    /// Replaces the operand list.
    pub fn set_operands(&mut self, operands: Vec<Operand>) {
        self.operands = operands;
    }

    /// Prints the atom as one statement, without indentation or newline.
    pub fn write_source_code(&self, out: &mut dyn fmt::Write, ctx: &EmitContext<'_>) -> fmt::Result {
        let ops = &self.operands;
        match &self.kind {
            AtomKind::Invocation { function_name, .. } => {
                write!(out, "{}({});", function_name, ctx.operand_list(ops))
            }
            AtomKind::Assignment => {
                let [rhs, lhs] = ops.as_slice() else {
                    return Err(fmt::Error);
                };
                write!(out, "{} = {};", ctx.operand_text(lhs), ctx.operand_text(rhs))
            }
            AtomKind::SampleTexture => {
                let [sampler, coords, target] = ops.as_slice() else {
                    return Err(fmt::Error);
                };
                let sampler_type = ctx
                    .pool()
                    .get(sampler.parameter())
                    .map(|p| p.constant_type())
                    .unwrap_or_default();
                write!(
                    out,
                    "{} = {}({}, {});",
                    ctx.operand_text(target),
                    ctx.dialect().texture_sample_function(sampler_type),
                    ctx.operand_text(sampler),
                    ctx.operand_text(coords)
                )
            }
            AtomKind::BinaryOp(op) => {
                let [a, b, target] = ops.as_slice() else {
                    return Err(fmt::Error);
                };
                let is_matrix = |operand: &Operand| {
                    ctx.pool()
                        .get(operand.parameter())
                        .is_some_and(|p| p.constant_type().is_matrix())
                };
                let (a_text, b_text) = (ctx.operand_text(a), ctx.operand_text(b));
                let expression = if *op == '*' && (is_matrix(a) || is_matrix(b)) {
                    ctx.dialect().builtin_call("mul", &[a_text, b_text])
                } else {
                    format!("{a_text} {op} {b_text}")
                };
                write!(out, "{} = {};", ctx.operand_text(target), expression)
            }
            AtomKind::Builtin(name) => {
                let Some((target, args)) = ops.split_last() else {
                    return Err(fmt::Error);
                };
                let args: Vec<String> = args.iter().map(|a| ctx.operand_text(a)).collect();
                write!(
                    out,
                    "{} = {};",
                    ctx.operand_text(target),
                    ctx.dialect().builtin_call(name, &args)
                )
            }
        }
    }
}
