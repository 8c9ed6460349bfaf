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

//! End to end runs of the varying compaction pass over vertex/fragment pairs.

use ahash::AHashMap;
use approx::assert_relative_eq;
use rtss_core::{
    atom::{group_order, AtomKind},
    atom::FunctionAtom,
    function::Function,
    operand::{In, OpMask, OpSemantic, Operand, Out},
    parameter::{ConstValue, Content, GpuConstantType, ParameterId, Semantic},
    processor::ProgramProcessor,
    program::ProgramSet,
    settings::{CompactPolicy, ProcessorSettings},
};

type Registers = AHashMap<ParameterId, [f32; 4]>;

/// Executes the assignment atoms of `func` over a register file.
fn execute(func: &Function, registers: &mut Registers) {
    for atom in func.sorted_atom_instances() {
        match (atom.kind(), atom.operands()) {
            (AtomKind::Assignment, [rhs, lhs]) => {
                let values = read(func, registers, rhs);
                write(func, registers, lhs, &values);
            }
            (kind, _) => panic!("unexpected atom {kind:?}"),
        }
    }
}

fn read(func: &Function, registers: &Registers, operand: &Operand) -> Vec<f32> {
    let param = func.parameter(operand.parameter());
    let source = match param.const_value() {
        Some(value) => {
            let mut padded = [0.0; 4];
            padded[..value.components().len()].copy_from_slice(value.components());
            padded
        }
        None => registers
            .get(&operand.parameter())
            .copied()
            .unwrap_or([0.0; 4]),
    };
    let mask = operand.mask().resolved_for(param.constant_type());
    (0..4)
        .filter(|i| mask.bits() & (1 << i) != 0)
        .map(|i| source[i])
        .collect()
}

fn write(func: &Function, registers: &mut Registers, operand: &Operand, values: &[f32]) {
    let mask = operand
        .mask()
        .resolved_for(func.parameter(operand.parameter()).constant_type());
    let target = registers.entry(operand.parameter()).or_insert([0.0; 4]);
    let mut values = values.iter();
    for i in 0..4 {
        if mask.bits() & (1 << i) != 0 {
            target[i] = *values.next().expect("mask wider than value");
        }
    }
}

/// Copies every vertex texcoord output to the fragment input with the same index.
fn interpolate(vs: &Function, fs: &Function, vs_registers: &Registers) -> Registers {
    let mut fs_registers = Registers::new();
    for id in vs.output_parameters() {
        let param = vs.parameter(*id);
        if param.semantic() != Semantic::TextureCoordinates {
            continue;
        }
        if let Some(fs_id) =
            fs.get_input_parameter_by_semantic(Semantic::TextureCoordinates, param.index())
        {
            fs_registers.insert(fs_id, vs_registers.get(id).copied().unwrap_or([0.0; 4]));
        }
    }
    fs_registers
}

struct Varying {
    vs: ParameterId,
    fs: ParameterId,
    fs_result: ParameterId,
    value: Vec<f32>,
}

/// Builds a vertex/fragment pair where the vertex stage writes literals into
/// texcoord outputs and the fragment stage copies each input into a local.
fn build(values: &[&[f32]]) -> (ProgramSet, Vec<Varying>) {
    build_with(values, false)
}

/// Same as [`build`]; with `whole_masks` every operand uses `OpMask::ALL`
/// instead of the components of its parameter type.
fn build_with(values: &[&[f32]], whole_masks: bool) -> (ProgramSet, Vec<Varying>) {
    let write_to = |func: &Function, id: ParameterId| {
        if whole_masks {
            Out::new(Operand::new(id, OpSemantic::Out, OpMask::ALL).unwrap())
        } else {
            func.out_operand(id)
        }
    };
    let read_from = |func: &Function, id: ParameterId| {
        if whole_masks {
            In::new(Operand::new(id, OpSemantic::In, OpMask::ALL).unwrap())
        } else {
            func.in_operand(id)
        }
    };
    let mut set = ProgramSet::new();
    let mut varyings = Vec::new();
    let (vertex, fragment) = set.vertex_and_fragment_mut();
    let vs = vertex.entry_point_mut();
    let fs = fragment.entry_point_mut();

    vs.resolve_output_parameter(
        Semantic::Position,
        Some(0),
        Content::PositionProjectiveSpace,
        GpuConstantType::Float4,
    )
    .unwrap();

    for (i, value) in values.iter().enumerate() {
        let ty = GpuConstantType::float_vector(value.len()).unwrap();
        let index = Some(i as u32);
        let vs_id = vs
            .resolve_output_parameter(Semantic::TextureCoordinates, index, Content::Unknown, ty)
            .unwrap();
        let fs_id = fs
            .resolve_input_parameter(Semantic::TextureCoordinates, index, Content::Unknown, ty)
            .unwrap();
        let literal = match value.len() {
            1 => ConstValue::Float(value[0]),
            2 => ConstValue::Vec2([value[0], value[1]]),
            3 => ConstValue::Vec3([value[0], value[1], value[2]]),
            _ => ConstValue::Vec4([value[0], value[1], value[2], value[3]]),
        };
        let constant = vs.resolve_const_parameter(literal);
        vs.add_atom_instance(FunctionAtom::assignment(
            write_to(vs, vs_id),
            read_from(vs, constant),
            group_order::VS_TEXTURING,
        ));

        let fs_result = fs.resolve_local_parameter(&format!("result{i}"), ty).unwrap();
        fs.add_atom_instance(FunctionAtom::assignment(
            write_to(fs, fs_result),
            read_from(fs, fs_id),
            group_order::PS_TEXTURING,
        ));

        varyings.push(Varying {
            vs: vs_id,
            fs: fs_id,
            fs_result,
            value: value.to_vec(),
        });
    }
    (set, varyings)
}

fn run_pipeline(set: &ProgramSet) -> Registers {
    let vs = set.vertex().entry_point();
    let fs = set.fragment().entry_point();
    let mut vs_registers = Registers::new();
    execute(vs, &mut vs_registers);
    let mut fs_registers = interpolate(vs, fs, &vs_registers);
    execute(fs, &mut fs_registers);
    fs_registers
}

fn assert_values_survive(set: &ProgramSet, varyings: &[Varying]) {
    let fs = set.fragment().entry_point();
    let registers = run_pipeline(set);
    for varying in varyings {
        let stored = registers
            .get(&varying.fs_result)
            .copied()
            .unwrap_or([0.0; 4]);
        let ty = fs.parameter(varying.fs_result).constant_type();
        assert_eq!(ty.float_count(), Some(varying.value.len()));
        for (got, expected) in stored.iter().zip(&varying.value) {
            assert_relative_eq!(*got, *expected);
        }
    }
}

fn assert_no_reference_to(func: &Function, removed: &[ParameterId]) {
    for atom in func.atom_instances() {
        for operand in atom.operands() {
            assert!(
                !removed.contains(&operand.parameter()),
                "operand still references {:?}",
                operand.parameter()
            );
        }
    }
}

#[test]
fn test_mixed_widths_leave_no_dangling_operands() {
    let (mut set, varyings) = build(&[&[0.5], &[1.0, 2.0], &[3.0, 4.0, 5.0]]);
    let processor = ProgramProcessor::default();
    assert!(processor.pre_create_gpu_programs(&mut set));

    set.validate().unwrap();
    let vs_removed: Vec<ParameterId> = varyings.iter().map(|v| v.vs).collect();
    let fs_removed: Vec<ParameterId> = varyings.iter().map(|v| v.fs).collect();
    assert_no_reference_to(set.vertex().entry_point(), &vs_removed);
    assert_no_reference_to(set.fragment().entry_point(), &fs_removed);
    for id in &vs_removed {
        assert!(!set.vertex().entry_point().is_listed(*id));
    }

    // float1 + float3 fill one register, the float2 takes a second one.
    let vs = set.vertex().entry_point();
    let texcoords: Vec<GpuConstantType> = vs
        .output_parameters()
        .iter()
        .map(|id| vs.parameter(*id))
        .filter(|p| p.semantic() == Semantic::TextureCoordinates)
        .map(|p| p.constant_type())
        .collect();
    assert_eq!(texcoords, [GpuConstantType::Float4, GpuConstantType::Float2]);
    assert_values_survive(&set, &varyings);
}

#[test]
fn test_float3_lands_in_yzw_and_reads_back() {
    let (mut set, varyings) = build(&[&[0.25], &[0.1, 0.2, 0.3]]);
    let before = run_pipeline(&set);
    assert_relative_eq!(before[&varyings[1].fs_result][2], 0.3);

    let processor = ProgramProcessor::default();
    assert!(processor.pre_create_gpu_programs(&mut set));

    let vs = set.vertex().entry_point();
    let write = vs
        .atom_instances()
        .iter()
        .map(|a| a.operands()[1])
        .find(|op| vs.parameter(op.parameter()).constant_type() == GpuConstantType::Float4 && op.mask().float_count() == 3)
        .expect("float3 write redirected to the merged register");
    assert_eq!(write.mask(), OpMask::from_bits(0b1110));
    assert_eq!(vs.parameter(write.parameter()).name(), "oTexcoord4_0");

    assert_values_survive(&set, &varyings);
}

#[test]
fn test_position_and_uv_use_two_registers() {
    let mut set = ProgramSet::new();
    let (vertex, fragment) = set.vertex_and_fragment_mut();
    let vs = vertex.entry_point_mut();
    vs.resolve_output_parameter(
        Semantic::TextureCoordinates,
        Some(0),
        Content::PositionWorldSpace,
        GpuConstantType::Float3,
    )
    .unwrap();
    vs.resolve_output_parameter(
        Semantic::TextureCoordinates,
        Some(1),
        Content::TextureCoordinate(0),
        GpuConstantType::Float2,
    )
    .unwrap();
    let fs = fragment.entry_point_mut();
    fs.resolve_input_parameter(
        Semantic::TextureCoordinates,
        Some(0),
        Content::PositionWorldSpace,
        GpuConstantType::Float3,
    )
    .unwrap();
    fs.resolve_input_parameter(
        Semantic::TextureCoordinates,
        Some(1),
        Content::TextureCoordinate(0),
        GpuConstantType::Float2,
    )
    .unwrap();

    let processor = ProgramProcessor::default();
    let (vertex, fragment) = set.vertex_and_fragment_mut();
    let report = processor
        .compact_vs_outputs(vertex.entry_point_mut(), fragment.entry_point_mut())
        .unwrap();
    assert_eq!(report.floats, 5);
    assert_eq!(report.slots_after, 2);
    assert!(!report.merged);
    assert!(report.within_limits);
}

#[test]
fn test_four_scalars_pack_without_splits() {
    let (mut set, varyings) = build(&[&[1.0], &[2.0], &[3.0], &[4.0]]);
    let processor = ProgramProcessor::default();
    let (vertex, fragment) = set.vertex_and_fragment_mut();
    let report = processor
        .compact_vs_outputs(vertex.entry_point_mut(), fragment.entry_point_mut())
        .unwrap();
    assert!(report.merged);
    assert_eq!(report.slots_before, 4);
    assert_eq!(report.slots_after, 1);
    assert_eq!(report.split_parameters, 0);

    let vs = set.vertex().entry_point();
    assert!(vs.local_parameters().is_empty());
    let register = vs
        .output_parameters()
        .iter()
        .copied()
        .find(|id| vs.parameter(*id).semantic() == Semantic::TextureCoordinates)
        .unwrap();
    assert_eq!(vs.parameter(register).constant_type(), GpuConstantType::Float4);

    let mut masks: Vec<u8> = vs
        .atom_instances()
        .iter()
        .map(|a| a.operands()[1])
        .filter(|op| op.parameter() == register)
        .map(|op| op.mask().bits())
        .collect();
    masks.sort();
    assert_eq!(masks, [0b0001, 0b0010, 0b0100, 0b1000]);

    assert_eq!(set.fragment().entry_point().local_parameters().len(), varyings.len());
    assert_values_survive(&set, &varyings);
}

#[test]
fn test_split_parameter_round_trips_through_locals() {
    let (mut set, varyings) = build(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], &[7.0, 8.0]]);
    let processor = ProgramProcessor::default();
    let (vertex, fragment) = set.vertex_and_fragment_mut();
    let report = processor
        .compact_vs_outputs(vertex.entry_point_mut(), fragment.entry_point_mut())
        .unwrap();
    assert!(report.merged);
    assert_eq!(report.slots_after, 2);
    assert_eq!(report.split_parameters, 1);

    let vs = set.vertex().entry_point();
    let fs = set.fragment().entry_point();
    assert!(vs.get_parameter_by_name("lsplit_oTexcoord2_2").is_some());
    assert!(fs.get_parameter_by_name("lsplit_iTexcoord2_2").is_some());
    assert!(vs
        .atom_instances()
        .iter()
        .any(|a| a.group_execution_order() == group_order::VS_POST_PROCESS));
    assert!(fs
        .atom_instances()
        .iter()
        .any(|a| a.group_execution_order() == group_order::PS_PRE_PROCESS));

    set.validate().unwrap();
    assert_values_survive(&set, &varyings);
}

#[test]
fn test_medium_policy_keeps_values_without_splits() {
    let (mut set, varyings) = build(&[&[1.0, 2.0, 3.0], &[4.0], &[5.0, 6.0], &[7.0, 8.0, 9.0]]);
    let processor = ProgramProcessor::new(ProcessorSettings {
        compact_policy: CompactPolicy::Medium,
        ..Default::default()
    });
    let (vertex, fragment) = set.vertex_and_fragment_mut();
    let report = processor
        .compact_vs_outputs(vertex.entry_point_mut(), fragment.entry_point_mut())
        .unwrap();
    assert!(report.merged);
    assert_eq!(report.split_parameters, 0);
    assert!(set.vertex().entry_point().local_parameters().is_empty());
    assert_values_survive(&set, &varyings);
}

#[test]
fn test_compaction_is_deterministic() {
    let values: &[&[f32]] = &[&[0.1], &[0.2, 0.3], &[0.4, 0.5, 0.6], &[0.7], &[0.8, 0.9]];
    let processor = ProgramProcessor::default();

    let (mut first, _) = build(values);
    let (mut second, _) = build(values);
    processor.pre_create_gpu_programs(&mut first);
    processor.pre_create_gpu_programs(&mut second);

    let names = |set: &ProgramSet| -> Vec<String> {
        let vs = set.vertex().entry_point();
        vs.output_parameters()
            .iter()
            .map(|id| vs.parameter(*id).name().to_string())
            .collect()
    };
    assert_eq!(names(&first), names(&second));
    assert_eq!(
        first.vertex().entry_point().atom_instances(),
        second.vertex().entry_point().atom_instances()
    );
}

#[test]
fn test_whole_parameter_masks_are_packed() {
    let (mut set, varyings) = build_with(&[&[0.5], &[1.0, 2.0, 3.0]], true);
    assert!(ProgramProcessor::default().pre_create_gpu_programs(&mut set));
    set.validate().unwrap();
    assert_values_survive(&set, &varyings);

    let vs = set.vertex().entry_point();
    let float3_write = vs
        .atom_instances()
        .iter()
        .map(|atom| atom.operands()[1])
        .find(|op| op.mask() == OpMask::from_bits(0b1110))
        .expect("float3 write shifted behind the float1");
    assert_eq!(vs.parameter(float3_write.parameter()).name(), "oTexcoord4_0");
}

#[test]
fn test_whole_parameter_masks_survive_splits() {
    let (mut set, varyings) = build_with(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], &[7.0, 8.0]], true);
    let processor = ProgramProcessor::default();
    let (vs, fs) = set.vertex_and_fragment_mut();
    let report = processor
        .compact_vs_outputs(vs.entry_point_mut(), fs.entry_point_mut())
        .unwrap();
    assert_eq!(report.split_parameters, 1);
    set.validate().unwrap();
    assert_values_survive(&set, &varyings);
}

#[test]
fn test_failed_compaction_leaves_programs_untouched() {
    let (mut set, varyings) = build(&[&[0.5], &[1.0, 2.0, 3.0]]);
    // Writing w of a float3 cannot be shifted behind the float1 it shares a
    // register with.
    {
        let vs = set.vertex_mut().entry_point_mut();
        let constant = vs.resolve_const_parameter(ConstValue::Float(9.0));
        let target = Out::new(Operand::new(varyings[1].vs, OpSemantic::Out, OpMask::W).unwrap());
        vs.add_atom_instance(FunctionAtom::assignment(
            target,
            vs.in_operand(constant),
            group_order::VS_FOG,
        ));
    }
    let vs_outputs = set.vertex().entry_point().output_parameters().to_vec();
    let fs_inputs = set.fragment().entry_point().input_parameters().to_vec();
    let vs_atoms = set.vertex().entry_point().atom_instances().to_vec();
    let fs_atoms = set.fragment().entry_point().atom_instances().to_vec();

    assert!(!ProgramProcessor::default().pre_create_gpu_programs(&mut set));

    set.validate().unwrap();
    assert_eq!(set.vertex().entry_point().output_parameters(), vs_outputs.as_slice());
    assert_eq!(set.fragment().entry_point().input_parameters(), fs_inputs.as_slice());
    assert_eq!(set.vertex().entry_point().atom_instances(), vs_atoms.as_slice());
    assert_eq!(set.fragment().entry_point().atom_instances(), fs_atoms.as_slice());
    assert!(set.vertex().entry_point().local_parameters().is_empty());
    assert_values_survive(&set, &varyings);
}
