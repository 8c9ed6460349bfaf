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

//! Cross stage passes run before the GPU programs are created.
//!
//! The main pass packs the texture coordinate varyings shared by the vertex
//! and fragment programs into as few registers as possible. References are
//! rewritten in place through the parameter handles of each function.

mod merge;

pub use self::merge::*;

use crate::{
    atom::{group_order, FunctionAtom},
    error::{IrError, ProcessorError},
    function::Function,
    gpu_params::SharedGpuParameters,
    operand::{In, OpSemantic, Operand, Out},
    parameter::{Content, ParameterFactory, ParameterId, Semantic},
    program::{Program, ProgramSet},
    settings::{CompactPolicy, ProcessorSettings},
};
use ahash::AHashMap;

/// Outcome of a compaction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionReport {
    /// Texture coordinate outputs before the pass.
    pub slots_before: usize,
    /// Texture coordinate outputs after the pass.
    pub slots_after: usize,
    /// Floats carried by the texture coordinate outputs.
    pub floats: usize,
    /// Whether registers were rewritten.
    pub merged: bool,
    /// Parameters spread over more than one register.
    pub split_parameters: usize,
    /// Whether the result fits the configured hardware limits.
    pub within_limits: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Stage {
    Vertex,
    Fragment,
}

#[derive(Clone, Copy)]
enum Redirect {
    Merged { destination: ParameterId, offset: u32 },
    Local(ParameterId),
}

/// Runs the cross stage passes over a [`ProgramSet`].
#[derive(Debug, Clone, Default)]
pub struct ProgramProcessor {
    settings: ProcessorSettings,
}

impl ProgramProcessor {
    /// Creates a processor.
    pub fn new(settings: ProcessorSettings) -> Self {
        Self { settings }
    }

    /// The active settings.
    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    /// Number of texture coordinate registers.
    pub fn max_texcoord_slots(&self) -> usize {
        self.settings.max_texcoord_slots
    }

    /// Number of floats the texture coordinate registers hold.
    pub fn max_texcoord_floats(&self) -> usize {
        self.settings.max_texcoord_floats()
    }

    /// Runs the compaction pass. Returns `false` when the result does not fit
    /// the hardware limits or the pass failed; the programs stay usable for a
    /// fallback either way.
    pub fn pre_create_gpu_programs(&self, set: &mut ProgramSet) -> bool {
        let (vertex, fragment) = set.vertex_and_fragment_mut();
        match self.compact_vs_outputs(vertex.entry_point_mut(), fragment.entry_point_mut()) {
            Ok(report) => {
                if !report.within_limits {
                    log::warn!(
                        "Processor: {} texcoord slots ({} floats) exceed the limit of {}",
                        report.slots_after,
                        report.floats,
                        self.max_texcoord_slots()
                    );
                }
                report.within_limits
            }
            Err(e) => {
                log::error!("Processor: varying compaction failed: {}", e);
                false
            }
        }
    }

    /// Binds the uniforms of every program to their compiled counterparts.
    pub fn post_create_gpu_programs(
        &self,
        set: &mut ProgramSet,
        vertex_params: &SharedGpuParameters,
        fragment_params: &SharedGpuParameters,
    ) -> usize {
        let (vertex, fragment) = set.vertex_and_fragment_mut();
        self.bind_auto_parameters(vertex, vertex_params) + self.bind_auto_parameters(fragment, fragment_params)
    }

    /// Binds every uniform of `program` present in `params`.
    ///
    /// Auto constants are registered as named auto constants; explicit
    /// uniforms add their variability. Names the GPU program does not know
    /// are skipped. Returns the number of bound uniforms.
    pub fn bind_auto_parameters(&self, program: &mut Program, params: &SharedGpuParameters) -> usize {
        let mut bound = 0;
        for id in program.parameters().to_vec() {
            let param = program.parameter_mut(id);
            let name = param.name().to_string();

            let known = match params.read() {
                Ok(guard) => guard.find_named_constant(&name).is_some(),
                Err(_) => {
                    log::warn!("Processor: GPU parameters lock poisoned");
                    return bound;
                }
            };
            if !known {
                log::debug!("Processor: uniform '{}' not used by the GPU program", name);
                continue;
            }

            match params.write() {
                Ok(mut guard) => match param.auto_constant() {
                    Some(auto_constant) => guard.set_named_auto_constant(&name, *auto_constant),
                    None => guard.add_variability(&name, param.variability()),
                },
                Err(_) => {
                    log::warn!("Processor: GPU parameters lock poisoned");
                    return bound;
                }
            }
            if param.bind(params) {
                bound += 1;
            }
        }
        bound
    }

    /// Packs the texture coordinate outputs of `vs` and the matching inputs of `fs`.
    ///
    /// On error neither function is modified.
    pub fn compact_vs_outputs(&self, vs: &mut Function, fs: &mut Function) -> Result<CompactionReport, ProcessorError> {
        let (slots, floats) = count_vs_texcoord_outputs(vs);
        let max_slots = self.max_texcoord_slots();
        let mut report = CompactionReport {
            slots_before: slots,
            slots_after: slots,
            floats,
            merged: false,
            split_parameters: 0,
            within_limits: floats <= self.max_texcoord_floats() && slots <= max_slots,
        };

        if floats > self.max_texcoord_floats() {
            log::warn!(
                "Processor: {} texcoord floats exceed the limit of {}, packing as much as possible",
                floats,
                self.max_texcoord_floats()
            );
        }
        if slots <= 1 {
            return Ok(report);
        }
        if self.settings.compact_policy == CompactPolicy::Low && slots <= max_slots {
            log::debug!("Processor: {} texcoord slots fit, low policy skips packing", slots);
            return Ok(report);
        }

        let mut table = build_texcoord_table(vs.pool(), vs.output_parameters());
        let mut vs_plan = merge_parameters(&mut table, self.settings.compact_policy, max_slots)?;
        if !vs_plan.iter().any(|m| m.source_count() > 1) {
            log::debug!("Processor: no register takes more than one source, nothing to pack");
            return Ok(report);
        }

        // Both stages are rewritten on copies and only committed together.
        let mut fs_plan = mirror_plan(&vs_plan, vs, fs);
        let mut packed_vs = vs.clone();
        let mut packed_fs = fs.clone();
        let vs_leftovers = apply_plan(&mut packed_vs, &mut vs_plan, Stage::Vertex, &[])?;
        apply_plan(&mut packed_fs, &mut fs_plan, Stage::Fragment, &vs_leftovers)?;
        *vs = packed_vs;
        *fs = packed_fs;

        let (slots_after, _) = count_vs_texcoord_outputs(vs);
        report.slots_after = slots_after;
        report.merged = true;
        report.split_parameters = split_parameter_count(&vs_plan);
        report.within_limits = floats <= self.max_texcoord_floats() && slots_after <= max_slots;
        log::debug!(
            "Processor: packed {} texcoord slots into {}",
            report.slots_before,
            report.slots_after
        );
        Ok(report)
    }
}

/// Number of texture coordinate outputs of a vertex entry point and their
/// total float count.
pub fn count_vs_texcoord_outputs(vs: &Function) -> (usize, usize) {
    count_texcoord_parameters(vs.pool(), vs.output_parameters())
}

fn split_parameter_count(plan: &[MergeParameter]) -> usize {
    let mut split: Vec<ParameterId> = plan
        .iter()
        .flat_map(|m| m.sources())
        .filter(|s| s.split)
        .map(|s| s.parameter)
        .collect();
    split.sort();
    split.dedup();
    split.len()
}

/// Builds the fragment plan matching `vs_plan` by texture coordinate index.
fn mirror_plan(vs_plan: &[MergeParameter], vs: &Function, fs: &Function) -> Vec<MergeParameter> {
    vs_plan
        .iter()
        .map(|merged| {
            merged.mirror(|vs_id| {
                let vs_param = vs.parameter(vs_id);
                let fs_id =
                    fs.get_input_parameter_by_semantic(Semantic::TextureCoordinates, vs_param.index())?;
                let fs_param = fs.parameter(fs_id);
                if fs_param.constant_type() != vs_param.constant_type() {
                    log::warn!(
                        "Processor: fragment input '{}' is {:?} but vertex output '{}' is {:?}",
                        fs_param.name(),
                        fs_param.constant_type(),
                        vs_param.name(),
                        vs_param.constant_type()
                    );
                    return None;
                }
                Some(fs_id)
            })
        })
        .collect()
}

/// Applies a plan to one function and returns the old to new index map of the
/// texture coordinates that were not packed.
fn apply_plan(
    func: &mut Function,
    plan: &mut [MergeParameter],
    stage: Stage,
    leftover_indices: &[(u32, u32)],
) -> Result<Vec<(u32, u32)>, ProcessorError> {
    for (i, merged) in plan.iter_mut().enumerate() {
        let ty = merged.destination_type();
        let param = match stage {
            Stage::Vertex => ParameterFactory::out_texcoord(ty, i as u32, Content::Unknown),
            Stage::Fragment => ParameterFactory::in_texcoord(ty, i as u32, Content::Unknown),
        };
        if let Some(param) = param {
            merged.set_destination(func.allocate(param));
        }
    }

    let locals = generate_local_split_parameters(func, plan)?;
    let references = build_parameter_reference_map(func, plan);
    replace_parameters_references(func, plan, &locals, &references)?;
    let leftovers = rebuild_parameter_list(func, plan, stage, leftover_indices);
    add_split_copy_atoms(func, plan, stage, &locals)?;
    Ok(leftovers)
}

/// Creates one `lsplit_<name>` local per split source.
fn generate_local_split_parameters(
    func: &mut Function,
    plan: &[MergeParameter],
) -> Result<AHashMap<ParameterId, ParameterId>, ProcessorError> {
    let mut locals = AHashMap::new();
    for source in plan.iter().flat_map(|m| m.sources()).filter(|s| s.split) {
        if locals.contains_key(&source.parameter) {
            continue;
        }
        let original = func.parameter(source.parameter);
        let name = format!("lsplit_{}", original.name());
        let ty = original.constant_type();
        let local = func
            .resolve_local_parameter(&name, ty)
            .ok_or(IrError::DuplicateName(name))?;
        locals.insert(source.parameter, local);
    }
    Ok(locals)
}

/// Positions `(atom, operand)` of every operand referencing a source of the plan.
fn build_parameter_reference_map(
    func: &Function,
    plan: &[MergeParameter],
) -> AHashMap<ParameterId, Vec<(usize, usize)>> {
    let mut references: AHashMap<ParameterId, Vec<(usize, usize)>> = AHashMap::new();
    for source in plan.iter().flat_map(|m| m.sources()) {
        references.entry(source.parameter).or_default();
    }
    for (atom_index, atom) in func.atom_instances().iter().enumerate() {
        for (operand_index, operand) in atom.operands().iter().enumerate() {
            if let Some(positions) = references.get_mut(&operand.parameter()) {
                positions.push((atom_index, operand_index));
            }
        }
    }
    references
}

/// Redirects whole sources to their register with a shifted mask and split
/// sources to their local with the mask unchanged.
///
/// Every new operand is computed before the first one is written, so a
/// failure leaves the atoms untouched.
fn replace_parameters_references(
    func: &mut Function,
    plan: &[MergeParameter],
    locals: &AHashMap<ParameterId, ParameterId>,
    references: &AHashMap<ParameterId, Vec<(usize, usize)>>,
) -> Result<(), ProcessorError> {
    let mut redirects: AHashMap<ParameterId, Redirect> = AHashMap::new();
    for merged in plan {
        let Some(destination) = merged.destination() else {
            continue;
        };
        for source in merged.sources() {
            let redirect = match locals.get(&source.parameter) {
                Some(local) => Redirect::Local(*local),
                None => Redirect::Merged {
                    destination,
                    offset: source.destination_mask.first_component(),
                },
            };
            redirects.insert(source.parameter, redirect);
        }
    }

    let mut edits = Vec::new();
    for (parameter, positions) in references {
        let Some(redirect) = redirects.get(parameter) else {
            continue;
        };
        let source_type = func.parameter(*parameter).constant_type();
        for &(atom_index, operand_index) in positions {
            let mask = func.atom_instances()[atom_index].operands()[operand_index].mask();
            let edit = match *redirect {
                Redirect::Local(local) => (local, mask),
                Redirect::Merged { destination, offset } => {
                    let shifted = mask
                        .resolved_for(source_type)
                        .shifted(offset)
                        .ok_or(ProcessorError::MaskOverflow {
                            mask: mask.bits(),
                            offset,
                        })?;
                    (destination, shifted)
                }
            };
            edits.push((atom_index, operand_index, edit));
        }
    }

    let atoms = func.atom_instances_mut();
    for (atom_index, operand_index, (target, mask)) in edits {
        atoms[atom_index].operands_mut()[operand_index].redirect(target, mask);
    }
    Ok(())
}

/// Replaces the packed sources by the merged registers in the stage list and
/// moves the unpacked texture coordinates behind them.
fn rebuild_parameter_list(
    func: &mut Function,
    plan: &[MergeParameter],
    stage: Stage,
    leftover_indices: &[(u32, u32)],
) -> Vec<(u32, u32)> {
    for source in plan.iter().flat_map(|m| m.sources()) {
        match stage {
            Stage::Vertex => func.delete_output_parameter(source.parameter),
            Stage::Fragment => func.delete_input_parameter(source.parameter),
        };
    }

    let list = match stage {
        Stage::Vertex => func.output_parameters(),
        Stage::Fragment => func.input_parameters(),
    };
    let mut leftovers: Vec<ParameterId> = list
        .iter()
        .copied()
        .filter(|id| func.parameter(*id).semantic() == Semantic::TextureCoordinates)
        .collect();
    leftovers.sort_by_key(|id| func.parameter(*id).index());

    let mut next_index = plan.len() as u32 + leftover_indices.len() as u32;
    let mut remapped = Vec::new();
    for id in leftovers {
        let old_index = func.parameter(id).index();
        let new_index = match leftover_indices.iter().find(|(old, _)| *old == old_index) {
            Some((_, new)) => *new,
            None if stage == Stage::Vertex => {
                let index = plan.len() as u32 + remapped.len() as u32;
                remapped.push((old_index, index));
                index
            }
            None => {
                log::warn!(
                    "Processor: fragment input '{}' has no vertex counterpart",
                    func.parameter(id).name()
                );
                let index = next_index;
                next_index += 1;
                index
            }
        };
        reindex_texcoord(func, id, new_index, stage);
    }

    for merged in plan {
        if let Some(destination) = merged.destination() {
            match stage {
                Stage::Vertex => func.push_output_id(destination),
                Stage::Fragment => func.push_input_id(destination),
            }
        }
    }
    remapped
}

fn reindex_texcoord(func: &mut Function, id: ParameterId, index: u32, stage: Stage) {
    let param = func.parameter_mut(id);
    if param.index() == index {
        return;
    }
    if let Some(count) = param.constant_type().float_count() {
        let prefix = match stage {
            Stage::Vertex => 'o',
            Stage::Fragment => 'i',
        };
        param.set_name(format!("{prefix}Texcoord{count}_{index}"));
    }
    param.set_index(index);
}

/// Copies split values between their local and the register pieces: local to
/// register after the vertex body, register to local before the fragment body.
fn add_split_copy_atoms(
    func: &mut Function,
    plan: &[MergeParameter],
    stage: Stage,
    locals: &AHashMap<ParameterId, ParameterId>,
) -> Result<(), ProcessorError> {
    for merged in plan {
        let Some(destination) = merged.destination() else {
            continue;
        };
        for source in merged.sources().iter().filter(|s| s.split) {
            let Some(local) = locals.get(&source.parameter).copied() else {
                continue;
            };
            let atom = match stage {
                Stage::Vertex => FunctionAtom::assignment(
                    Out::try_from(Operand::new(destination, OpSemantic::Out, source.destination_mask)?)?,
                    In::try_from(Operand::new(local, OpSemantic::In, source.source_mask)?)?,
                    group_order::VS_POST_PROCESS,
                ),
                Stage::Fragment => FunctionAtom::assignment(
                    Out::try_from(Operand::new(local, OpSemantic::Out, source.source_mask)?)?,
                    In::try_from(Operand::new(destination, OpSemantic::In, source.destination_mask)?)?,
                    group_order::PS_PRE_PROCESS,
                ),
            };
            func.add_atom_instance(atom);
        }
    }
    Ok(())
}
