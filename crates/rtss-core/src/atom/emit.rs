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

//! Target specific spelling used while emitting atoms.

use crate::{
    operand::{OpMask, Operand},
    parameter::{ConstValue, GpuConstantType, ParameterId, ParameterPool},
};
use ahash::AHashMap;

/// Target language details an atom needs to print itself.
///
/// Implemented by every program writer.
pub trait SourceDialect {
    /// Name of the target language (`glsl`, `hlsl`, ...).
    fn language(&self) -> &str;

    /// Spelling of a data type, `None` if the target has no such type.
    fn type_name(&self, constant_type: GpuConstantType) -> Option<&'static str>;

    /// Texture lookup function for a sampler type.
    fn texture_sample_function(&self, sampler: GpuConstantType) -> &'static str;

    /// Inline literal in constructor syntax.
    fn constant_literal(&self, value: &ConstValue) -> String {
        let components = value
            .components()
            .iter()
            .map(|c| format!("{c:?}"))
            .collect::<Vec<_>>()
            .join(", ");
        match value {
            ConstValue::Float(_) => components,
            _ => {
                let ty = self
                    .type_name(value.constant_type())
                    .unwrap_or("float4");
                format!("{ty}({components})")
            }
        }
    }

    /// Call of a builtin function. `mul` is the matrix product.
    fn builtin_call(&self, name: &str, args: &[String]) -> String {
        format!("{}({})", name, args.join(", "))
    }
}

/// Everything an atom reads while printing itself.
pub struct EmitContext<'a> {
    pool: &'a ParameterPool,
    dialect: &'a dyn SourceDialect,
    aliases: Option<&'a AHashMap<ParameterId, String>>,
}

impl<'a> EmitContext<'a> {
    /// Creates a context printing parameters under their own names.
    pub fn new(pool: &'a ParameterPool, dialect: &'a dyn SourceDialect) -> Self {
        Self {
            pool,
            dialect,
            aliases: None,
        }
    }

    /// Prints the given parameters under replacement names.
    #[must_use]
    pub fn with_aliases(mut self, aliases: &'a AHashMap<ParameterId, String>) -> Self {
        self.aliases = Some(aliases);
        self
    }

    /// The target dialect.
    pub fn dialect(&self) -> &dyn SourceDialect {
        self.dialect
    }

    /// The parameter pool the operands point into.
    pub fn pool(&self) -> &ParameterPool {
        self.pool
    }

    /// Name a parameter is printed under.
    pub fn parameter_name(&self, id: ParameterId) -> String {
        if let Some(alias) = self.aliases.and_then(|aliases| aliases.get(&id)) {
            return alias.clone();
        }
        match self.pool.get(id) {
            Some(param) => param.name().to_string(),
            None => format!("unresolved_{}", id.0),
        }
    }

    /// Operand text: literal, or name plus swizzle when the mask differs from
    /// the natural components of the parameter. `OpMask::ALL` is the whole
    /// parameter and never gets a swizzle.
    pub fn operand_text(&self, operand: &Operand) -> String {
        let Some(param) = self.pool.get(operand.parameter()) else {
            return self.parameter_name(operand.parameter());
        };
        if let Some(value) = param.const_value() {
            return self.dialect.constant_literal(value);
        }

        let mut text = self.parameter_name(operand.parameter());
        let ty = param.constant_type();
        let mask = operand.mask().resolved_for(ty);
        if ty.is_vector() && mask != OpMask::for_type(ty) {
            text.push('.');
            text.push_str(&mask.swizzle());
        }
        text
    }

    /// Comma separated operand list with array brackets opened whenever the
    /// next operand sits deeper and closed when it sits shallower.
    pub fn operand_list(&self, operands: &[Operand]) -> String {
        let mut text = String::new();
        let mut iter = operands.iter().peekable();
        while let Some(operand) = iter.next() {
            text.push_str(&self.operand_text(operand));
            let current = operand.indirection_level();
            match iter.peek() {
                Some(next) if next.indirection_level() > current => {
                    for _ in current..next.indirection_level() {
                        text.push('[');
                    }
                }
                Some(next) => {
                    for _ in next.indirection_level()..current {
                        text.push(']');
                    }
                    text.push_str(", ");
                }
                None => {
                    for _ in 0..current {
                        text.push(']');
                    }
                }
            }
        }
        text
    }
}
