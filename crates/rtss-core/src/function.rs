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

//! Functions: parameter lists plus an ordered body of atoms.

use crate::{
    atom::FunctionAtom,
    error::{IrError, OperandError},
    operand::{In, InOut, OpMask, OpSemantic, Operand, Out},
    parameter::{
        ConstValue, Content, GpuConstantType, Parameter, ParameterFactory, ParameterId,
        ParameterPool, Semantic,
    },
};
use serde::{Deserialize, Serialize};

/// Role of a function in its program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FunctionKind {
    /// A helper function.
    #[default]
    Internal,
    /// Entry point of a vertex program.
    VertexMain,
    /// Entry point of a fragment program.
    PixelMain,
    /// Entry point of a geometry program.
    GeometryMain,
}

#[derive(Clone, Copy)]
enum Direction {
    Input,
    Output,
}

/// A function of a shader program.
///
/// The function owns the [`ParameterPool`] every operand of its body points
/// into. A parameter is listed at most once among inputs, outputs and locals;
/// pool slots not listed anywhere are either literals or uniforms owned by the
/// enclosing program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    name: String,
    description: String,
    kind: FunctionKind,
    pool: ParameterPool,
    inputs: Vec<ParameterId>,
    outputs: Vec<ParameterId>,
    locals: Vec<ParameterId>,
    atoms: Vec<FunctionAtom>,
}

impl Function {
    /// Creates an empty function.
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: FunctionKind) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            pool: ParameterPool::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            locals: Vec::new(),
            atoms: Vec::new(),
        }
    }

    /// The function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The human readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The role of the function.
    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    /// The parameter arena.
    pub fn pool(&self) -> &ParameterPool {
        &self.pool
    }

    /// Looks up a parameter.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this function.
    pub fn parameter(&self, id: ParameterId) -> &Parameter {
        &self.pool[id]
    }

    /// Looks up a parameter for modification.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this function.
    pub fn parameter_mut(&mut self, id: ParameterId) -> &mut Parameter {
        &mut self.pool[id]
    }

    /// Stage inputs.
    pub fn input_parameters(&self) -> &[ParameterId] {
        &self.inputs
    }

    /// Stage outputs.
    pub fn output_parameters(&self) -> &[ParameterId] {
        &self.outputs
    }

    /// Locals.
    pub fn local_parameters(&self) -> &[ParameterId] {
        &self.locals
    }

    // --- Resolution ---

    /// Finds or creates a stage input.
    ///
    /// `index` of `None` means the next index free for `semantic`.
    pub fn resolve_input_parameter(
        &mut self,
        semantic: Semantic,
        index: Option<u32>,
        content: Content,
        constant_type: GpuConstantType,
    ) -> Option<ParameterId> {
        resolve_stage_parameter(
            &mut self.pool,
            &mut self.inputs,
            Direction::Input,
            semantic,
            index,
            content,
            constant_type,
        )
    }

    /// Finds or creates a stage output, see [`Function::resolve_input_parameter`].
    pub fn resolve_output_parameter(
        &mut self,
        semantic: Semantic,
        index: Option<u32>,
        content: Content,
        constant_type: GpuConstantType,
    ) -> Option<ParameterId> {
        resolve_stage_parameter(
            &mut self.pool,
            &mut self.outputs,
            Direction::Output,
            semantic,
            index,
            content,
            constant_type,
        )
    }

    /// Finds a local by name or creates it. A local of that name with another
    /// type is a failure.
    pub fn resolve_local_parameter(&mut self, name: &str, constant_type: GpuConstantType) -> Option<ParameterId> {
        if let Some(id) = find_by_name(&self.pool, &self.locals, name) {
            if self.pool[id].constant_type() == constant_type {
                return Some(id);
            }
            log::warn!(
                "Function '{}': local '{}' already declared with type {:?}",
                self.name,
                name,
                self.pool[id].constant_type()
            );
            return None;
        }
        let id = self.pool.insert(Parameter::new(
            constant_type,
            name,
            Semantic::Unknown,
            0,
            Content::Unknown,
        ));
        self.locals.push(id);
        Some(id)
    }

    /// Finds a local by content, or creates one named after its semantic and index.
    pub fn resolve_local_parameter_by_content(
        &mut self,
        semantic: Semantic,
        index: u32,
        content: Content,
        constant_type: GpuConstantType,
    ) -> Option<ParameterId> {
        if content != Content::Unknown {
            if let Some(id) = find_by_content(&self.pool, &self.locals, content, constant_type) {
                return Some(id);
            }
        }
        let name = format!("l{:?}_{}", semantic, index);
        if find_by_name(&self.pool, &self.locals, &name).is_some() {
            log::warn!("Function '{}': local '{}' already declared", self.name, name);
            return None;
        }
        let id = self
            .pool
            .insert(Parameter::new(constant_type, name, semantic, index, content));
        self.locals.push(id);
        Some(id)
    }

    /// Returns the shared slot of an inline literal, creating it on first use.
    pub fn resolve_const_parameter(&mut self, value: ConstValue) -> ParameterId {
        let existing = self.pool.iter().find_map(|(id, p)| {
            p.const_value()
                .filter(|v| v.same_literal(&value))
                .map(|_| id)
        });
        existing.unwrap_or_else(|| self.pool.insert(Parameter::new_constant(value)))
    }

    // --- Lookup ---

    /// Input with the given semantic and index.
    pub fn get_input_parameter_by_semantic(&self, semantic: Semantic, index: u32) -> Option<ParameterId> {
        find_by_semantic(&self.pool, &self.inputs, semantic, index)
    }

    /// Output with the given semantic and index.
    pub fn get_output_parameter_by_semantic(&self, semantic: Semantic, index: u32) -> Option<ParameterId> {
        find_by_semantic(&self.pool, &self.outputs, semantic, index)
    }

    /// Input with the given content and type.
    pub fn get_input_parameter_by_content(&self, content: Content, constant_type: GpuConstantType) -> Option<ParameterId> {
        find_by_content(&self.pool, &self.inputs, content, constant_type)
    }

    /// Output with the given content and type.
    pub fn get_output_parameter_by_content(&self, content: Content, constant_type: GpuConstantType) -> Option<ParameterId> {
        find_by_content(&self.pool, &self.outputs, content, constant_type)
    }

    /// Any listed parameter with the given name.
    pub fn get_parameter_by_name(&self, name: &str) -> Option<ParameterId> {
        find_by_name(&self.pool, &self.inputs, name)
            .or_else(|| find_by_name(&self.pool, &self.outputs, name))
            .or_else(|| find_by_name(&self.pool, &self.locals, name))
    }

    // --- List maintenance ---

    /// Adds a stage input.
    pub fn add_input_parameter(&mut self, parameter: Parameter) -> Result<ParameterId, IrError> {
        check_stage_uniqueness(&self.pool, &self.inputs, &parameter)?;
        let id = self.pool.insert(parameter);
        self.inputs.push(id);
        Ok(id)
    }

    /// Adds a stage output.
    pub fn add_output_parameter(&mut self, parameter: Parameter) -> Result<ParameterId, IrError> {
        check_stage_uniqueness(&self.pool, &self.outputs, &parameter)?;
        let id = self.pool.insert(parameter);
        self.outputs.push(id);
        Ok(id)
    }

    /// Adds a local.
    pub fn add_local_parameter(&mut self, parameter: Parameter) -> Result<ParameterId, IrError> {
        if find_by_name(&self.pool, &self.locals, parameter.name()).is_some() {
            return Err(IrError::DuplicateName(parameter.name().to_string()));
        }
        let id = self.pool.insert(parameter);
        self.locals.push(id);
        Ok(id)
    }

    /// Removes an input from the input list. The pool slot stays valid.
    pub fn delete_input_parameter(&mut self, id: ParameterId) -> bool {
        remove_id(&mut self.inputs, id)
    }

    /// Removes an output from the output list. The pool slot stays valid.
    pub fn delete_output_parameter(&mut self, id: ParameterId) -> bool {
        remove_id(&mut self.outputs, id)
    }

    /// Removes a local from the local list. The pool slot stays valid.
    pub fn delete_local_parameter(&mut self, id: ParameterId) -> bool {
        remove_id(&mut self.locals, id)
    }

    /// Clears the input list.
    pub fn delete_all_input_parameters(&mut self) {
        self.inputs.clear();
    }

    /// Clears the output list.
    pub fn delete_all_output_parameters(&mut self) {
        self.outputs.clear();
    }

    /// Allocates a pool slot without listing it.
    pub(crate) fn allocate(&mut self, parameter: Parameter) -> ParameterId {
        self.pool.insert(parameter)
    }

    pub(crate) fn push_input_id(&mut self, id: ParameterId) {
        self.inputs.push(id);
    }

    pub(crate) fn push_output_id(&mut self, id: ParameterId) {
        self.outputs.push(id);
    }

    /// `true` if `id` is listed as input, output or local.
    pub fn is_listed(&self, id: ParameterId) -> bool {
        self.inputs.contains(&id) || self.outputs.contains(&id) || self.locals.contains(&id)
    }

    // --- Operands ---

    /// Read operand over the natural components of the parameter.
    pub fn in_operand(&self, id: ParameterId) -> In {
        In::new(Operand::for_parameter(id, &self.pool[id], OpSemantic::In))
    }

    /// Write operand over the natural components of the parameter.
    pub fn out_operand(&self, id: ParameterId) -> Out {
        Out::new(Operand::for_parameter(id, &self.pool[id], OpSemantic::Out))
    }

    /// Read/write operand over the natural components of the parameter.
    pub fn inout_operand(&self, id: ParameterId) -> InOut {
        InOut::new(Operand::for_parameter(id, &self.pool[id], OpSemantic::InOut))
    }

    /// Read operand over `mask`.
    pub fn in_operand_masked(&self, id: ParameterId, mask: OpMask) -> Result<In, OperandError> {
        In::try_from(Operand::new(id, OpSemantic::In, mask)?)
    }

    /// Write operand over `mask`.
    pub fn out_operand_masked(&self, id: ParameterId, mask: OpMask) -> Result<Out, OperandError> {
        Out::try_from(Operand::new(id, OpSemantic::Out, mask)?)
    }

    // --- Atoms ---

    /// Appends an atom.
    pub fn add_atom_instance(&mut self, atom: FunctionAtom) {
        self.atoms.push(atom);
    }

    /// Removes the atom at `index`.
    pub fn delete_atom_instance(&mut self, index: usize) -> Option<FunctionAtom> {
        (index < self.atoms.len()).then(|| self.atoms.remove(index))
    }

    /// Atoms in insertion (or last sorted) order.
    pub fn atom_instances(&self) -> &[FunctionAtom] {
        &self.atoms
    }

    pub(crate) fn atom_instances_mut(&mut self) -> &mut Vec<FunctionAtom> {
        &mut self.atoms
    }

    /// Stably sorts the atoms by group execution order.
    pub fn sort_atom_instances(&mut self) {
        self.atoms.sort_by_key(FunctionAtom::group_execution_order);
    }

    /// Stably sorted view of the atoms, leaving the function untouched.
    pub fn sorted_atom_instances(&self) -> Vec<&FunctionAtom> {
        let mut atoms: Vec<&FunctionAtom> = self.atoms.iter().collect();
        atoms.sort_by_key(|atom| atom.group_execution_order());
        atoms
    }

    // --- Validation ---

    /// Checks that every operand points at a listed parameter, a literal or
    /// one of `extra` (the program uniforms).
    pub fn validate_references(&self, extra: &[ParameterId]) -> Result<(), IrError> {
        for list in [&self.inputs, &self.outputs, &self.locals] {
            if let Some(id) = list.iter().find(|id| !self.pool.contains(**id)) {
                return Err(IrError::UnknownParameter(*id));
            }
        }
        for (atom_index, atom) in self.atoms.iter().enumerate() {
            for (operand_index, operand) in atom.operands().iter().enumerate() {
                let id = operand.parameter();
                let Some(param) = self.pool.get(id) else {
                    return Err(IrError::UnknownParameter(id));
                };
                if !param.is_constant() && !self.is_listed(id) && !extra.contains(&id) {
                    return Err(IrError::DanglingOperand {
                        atom: atom_index,
                        operand: operand_index,
                        name: param.name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Checks that a vertex entry point outputs a position.
    pub fn validate_entry_point(&self) -> Result<(), IrError> {
        if self.kind == FunctionKind::VertexMain
            && !self
                .outputs
                .iter()
                .any(|id| self.pool[*id].semantic() == Semantic::Position)
        {
            return Err(IrError::MissingPositionOutput(self.name.clone()));
        }
        Ok(())
    }
}

fn find_by_name(pool: &ParameterPool, list: &[ParameterId], name: &str) -> Option<ParameterId> {
    list.iter().copied().find(|id| pool[*id].name() == name)
}

fn find_by_semantic(
    pool: &ParameterPool,
    list: &[ParameterId],
    semantic: Semantic,
    index: u32,
) -> Option<ParameterId> {
    list.iter()
        .copied()
        .find(|id| pool[*id].semantic() == semantic && pool[*id].index() == index)
}

fn find_by_content(
    pool: &ParameterPool,
    list: &[ParameterId],
    content: Content,
    constant_type: GpuConstantType,
) -> Option<ParameterId> {
    list.iter()
        .copied()
        .find(|id| pool[*id].content() == content && pool[*id].constant_type() == constant_type)
}

fn next_free_index(pool: &ParameterPool, list: &[ParameterId], semantic: Semantic) -> u32 {
    list.iter()
        .map(|id| &pool[*id])
        .filter(|p| p.semantic() == semantic)
        .map(|p| p.index() + 1)
        .max()
        .unwrap_or(0)
}

fn check_stage_uniqueness(pool: &ParameterPool, list: &[ParameterId], parameter: &Parameter) -> Result<(), IrError> {
    if parameter.semantic() != Semantic::Unknown
        && find_by_semantic(pool, list, parameter.semantic(), parameter.index()).is_some()
    {
        return Err(IrError::DuplicateParameter {
            name: parameter.name().to_string(),
            semantic: parameter.semantic(),
            index: parameter.index(),
        });
    }
    if find_by_name(pool, list, parameter.name()).is_some() {
        return Err(IrError::DuplicateName(parameter.name().to_string()));
    }
    Ok(())
}

fn remove_id(list: &mut Vec<ParameterId>, id: ParameterId) -> bool {
    match list.iter().position(|existing| *existing == id) {
        Some(position) => {
            list.remove(position);
            true
        }
        None => false,
    }
}

fn resolve_stage_parameter(
    pool: &mut ParameterPool,
    list: &mut Vec<ParameterId>,
    direction: Direction,
    semantic: Semantic,
    index: Option<u32>,
    content: Content,
    constant_type: GpuConstantType,
) -> Option<ParameterId> {
    if content != Content::Unknown {
        if let Some(id) = find_by_content(pool, list, content, constant_type) {
            return Some(id);
        }
    }

    let index = match index {
        Some(index) => {
            if let Some(id) = find_by_semantic(pool, list, semantic, index) {
                if pool[id].constant_type() == constant_type {
                    return Some(id);
                }
                log::warn!(
                    "Parameter '{}' ({:?} {}) requested as {:?} but declared as {:?}",
                    pool[id].name(),
                    semantic,
                    index,
                    constant_type,
                    pool[id].constant_type()
                );
                return None;
            }
            index
        }
        None => next_free_index(pool, list, semantic),
    };

    let created = match direction {
        Direction::Input => ParameterFactory::create_in(semantic, index, content, constant_type),
        Direction::Output => ParameterFactory::create_out(semantic, index, content, constant_type),
    };
    let Some(param) = created else {
        log::warn!(
            "Cannot create an {} parameter for semantic {:?} with type {:?}",
            match direction {
                Direction::Input => "input",
                Direction::Output => "output",
            },
            semantic,
            constant_type
        );
        return None;
    };
    if find_by_name(pool, list, param.name()).is_some() {
        log::warn!("Parameter name '{}' already in use", param.name());
        return None;
    }
    let id = pool.insert(param);
    list.push(id);
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::group_order;

    fn vertex_main() -> Function {
        Function::new("main", "Vertex Program Entry point", FunctionKind::VertexMain)
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut f = vertex_main();
        let a = f
            .resolve_output_parameter(
                Semantic::TextureCoordinates,
                Some(0),
                Content::TextureCoordinate(0),
                GpuConstantType::Float2,
            )
            .unwrap();
        let b = f
            .resolve_output_parameter(
                Semantic::TextureCoordinates,
                Some(0),
                Content::TextureCoordinate(0),
                GpuConstantType::Float2,
            )
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(f.output_parameters().len(), 1);
        assert_eq!(f.parameter(a).name(), "oTexcoord2_0");
    }

    #[test]
    fn test_resolve_type_mismatch_fails() {
        let mut f = vertex_main();
        f.resolve_output_parameter(
            Semantic::TextureCoordinates,
            Some(1),
            Content::Unknown,
            GpuConstantType::Float2,
        )
        .unwrap();
        let clash = f.resolve_output_parameter(
            Semantic::TextureCoordinates,
            Some(1),
            Content::Unknown,
            GpuConstantType::Float3,
        );
        assert!(clash.is_none());
        assert_eq!(f.output_parameters().len(), 1);
    }

    #[test]
    fn test_next_available_index() {
        let mut f = vertex_main();
        for expected in 0..3u32 {
            let id = f
                .resolve_output_parameter(
                    Semantic::TextureCoordinates,
                    None,
                    Content::Unknown,
                    GpuConstantType::Float1,
                )
                .unwrap();
            assert_eq!(f.parameter(id).index(), expected);
        }
        let id = f
            .resolve_output_parameter(Semantic::Color, None, Content::Unknown, GpuConstantType::Float4)
            .unwrap();
        assert_eq!(f.parameter(id).index(), 0);
    }

    #[test]
    fn test_content_lookup_wins() {
        let mut f = vertex_main();
        let normal = f
            .resolve_input_parameter(
                Semantic::Normal,
                Some(0),
                Content::NormalObjectSpace,
                GpuConstantType::Float3,
            )
            .unwrap();
        let again = f
            .resolve_input_parameter(
                Semantic::Normal,
                None,
                Content::NormalObjectSpace,
                GpuConstantType::Float3,
            )
            .unwrap();
        assert_eq!(normal, again);
    }

    #[test]
    fn test_duplicate_parameters_are_rejected() {
        let mut f = vertex_main();
        f.add_output_parameter(ParameterFactory::out_position(0)).unwrap();
        let err = f
            .add_output_parameter(ParameterFactory::out_position(0))
            .unwrap_err();
        assert!(matches!(err, IrError::DuplicateParameter { index: 0, .. }));

        let unknown = Parameter::new(
            GpuConstantType::Float4,
            "oPos_0",
            Semantic::Unknown,
            0,
            Content::Unknown,
        );
        assert_eq!(
            f.add_output_parameter(unknown),
            Err(IrError::DuplicateName("oPos_0".to_string()))
        );

        f.resolve_local_parameter("tmp", GpuConstantType::Float4).unwrap();
        assert!(f.resolve_local_parameter("tmp", GpuConstantType::Float2).is_none());
        let dup = Parameter::new(
            GpuConstantType::Float4,
            "tmp",
            Semantic::Unknown,
            0,
            Content::Unknown,
        );
        assert!(f.add_local_parameter(dup).is_err());
    }

    #[test]
    fn test_const_parameters_are_shared_and_unlisted() {
        let mut f = vertex_main();
        let a = f.resolve_const_parameter(ConstValue::Vec4([1.0, 1.0, 1.0, 1.0]));
        let b = f.resolve_const_parameter(ConstValue::Vec4([1.0, 1.0, 1.0, 1.0]));
        let c = f.resolve_const_parameter(ConstValue::Float(1.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!f.is_listed(a));
    }

    #[test]
    fn test_sort_is_stable() {
        let mut f = vertex_main();
        let out = f.add_output_parameter(ParameterFactory::out_position(0)).unwrap();
        let names = ["a", "b", "c", "d", "e"];
        let groups = [
            group_order::VS_TEXTURING,
            group_order::VS_TRANSFORM,
            group_order::VS_TEXTURING,
            group_order::VS_PRE_PROCESS,
            group_order::VS_TRANSFORM,
        ];
        for (name, group) in names.iter().zip(groups) {
            let mut atom = FunctionAtom::invocation(*name, "void", group);
            atom.push_operand(f.out_operand(out));
            f.add_atom_instance(atom);
        }

        let view: Vec<String> = f
            .sorted_atom_instances()
            .iter()
            .map(|a| a.function_name())
            .collect();
        assert_eq!(view, ["d", "b", "e", "a", "c"]);
        assert_eq!(f.atom_instances()[0].function_name(), "a");

        f.sort_atom_instances();
        let sorted: Vec<String> = f.atom_instances().iter().map(|a| a.function_name()).collect();
        assert_eq!(sorted, view);
    }

    #[test]
    fn test_validation_catches_dangling_operands() {
        let mut f = vertex_main();
        let pos = f
            .resolve_output_parameter(
                Semantic::Position,
                Some(0),
                Content::PositionProjectiveSpace,
                GpuConstantType::Float4,
            )
            .unwrap();
        let one = f.resolve_const_parameter(ConstValue::Vec4([0.0, 0.0, 0.0, 1.0]));
        f.add_atom_instance(FunctionAtom::assignment(
            f.out_operand(pos),
            f.in_operand(one),
            group_order::VS_TRANSFORM,
        ));
        assert!(f.validate_references(&[]).is_ok());
        assert!(f.validate_entry_point().is_ok());

        f.delete_output_parameter(pos);
        assert!(matches!(
            f.validate_references(&[]),
            Err(IrError::DanglingOperand { atom: 0, operand: 1, .. })
        ));
        assert_eq!(
            f.validate_entry_point(),
            Err(IrError::MissingPositionOutput("main".to_string()))
        );
    }

    #[test]
    fn test_masked_operands() {
        let mut f = vertex_main();
        let id = f.resolve_local_parameter("tmp", GpuConstantType::Float4).unwrap();
        assert!(f.in_operand_masked(id, OpMask::NONE).is_err());
        let op: Operand = f.out_operand_masked(id, OpMask::Z).unwrap().into();
        assert_eq!(op.mask(), OpMask::Z);
        assert_eq!(f.inout_operand(id).into_inner().semantic(), OpSemantic::InOut);
    }
}
