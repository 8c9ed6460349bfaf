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

//! Planning of packed texture coordinate registers.
//!
//! Candidates are bucketed by component count, then drained by predefined
//! combinations that fill one register exactly. Whatever is left goes through
//! the simple combinations (medium policy) or the reminder packer, which may
//! split a parameter across two registers.

use crate::{
    error::ProcessorError,
    operand::OpMask,
    parameter::{GpuConstantType, ParameterId, ParameterPool, Semantic},
    settings::CompactPolicy,
};

/// Candidates per component count: row `n` holds the float`n+1` parameters.
pub type TexcoordTable = [Vec<ParameterId>; 4];

/// One original parameter, or one piece of it, placed in a merged register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSource {
    /// The original parameter.
    pub parameter: ParameterId,
    /// Components of the original value carried by this piece.
    pub source_mask: OpMask,
    /// Components of the merged register holding them.
    pub destination_mask: OpMask,
    /// `true` when the parameter is spread over more than one register.
    pub split: bool,
}

/// A packed register and the sources that fill it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeParameter {
    sources: Vec<MergeSource>,
    used_floats: usize,
    destination: Option<ParameterId>,
}

impl MergeParameter {
    /// Maximum number of sources one register takes.
    pub const MAX_SOURCES: usize = 4;

    /// Places `source_mask` of `parameter` in the next free components.
    pub fn add_source(&mut self, parameter: ParameterId, source_mask: OpMask, split: bool) -> Result<(), ProcessorError> {
        if self.sources.len() >= Self::MAX_SOURCES {
            return Err(ProcessorError::SourceOverflow);
        }
        let requested = source_mask.float_count();
        if self.used_floats + requested > 4 {
            return Err(ProcessorError::FloatOverflow {
                used: self.used_floats,
                requested,
            });
        }
        let destination_mask = OpMask::for_float_count(requested)
            .shifted(self.used_floats as u32)
            .ok_or(ProcessorError::MaskOverflow {
                mask: source_mask.bits(),
                offset: self.used_floats as u32,
            })?;
        self.sources.push(MergeSource {
            parameter,
            source_mask,
            destination_mask,
            split,
        });
        self.used_floats += requested;
        Ok(())
    }

    /// Builds the matching register of the other stage. Sources `map` cannot
    /// translate are dropped; the register keeps its width.
    pub fn mirror(&self, map: impl Fn(ParameterId) -> Option<ParameterId>) -> Self {
        Self {
            sources: self
                .sources
                .iter()
                .filter_map(|s| {
                    map(s.parameter).map(|parameter| MergeSource { parameter, ..*s })
                })
                .collect(),
            used_floats: self.used_floats,
            destination: None,
        }
    }

    /// The placed sources, in component order.
    pub fn sources(&self) -> &[MergeSource] {
        &self.sources
    }

    /// Number of placed sources.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Number of occupied components.
    pub fn used_float_count(&self) -> usize {
        self.used_floats
    }

    /// Number of free components.
    pub fn free_float_count(&self) -> usize {
        4 - self.used_floats
    }

    /// Type of the packed register.
    pub fn destination_type(&self) -> GpuConstantType {
        GpuConstantType::float_vector(self.used_floats).unwrap_or(GpuConstantType::Float4)
    }

    /// The packed register, once created.
    pub fn destination(&self) -> Option<ParameterId> {
        self.destination
    }

    pub(crate) fn set_destination(&mut self, id: ParameterId) {
        self.destination = Some(id);
    }
}

/// How many float1..float4 parameters fill one register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MergeCombination {
    counts: [usize; 4],
}

impl MergeCombination {
    /// A combination of `float1` scalars, `float2`, `float3` and `float4` vectors.
    pub const fn new(float1: usize, float2: usize, float3: usize, float4: usize) -> Self {
        Self {
            counts: [float1, float2, float3, float4],
        }
    }

    /// Combinations that fill a register exactly, in the order they are tried.
    pub fn predefined() -> Vec<Self> {
        vec![
            Self::new(1, 0, 1, 0),
            Self::new(2, 1, 0, 0),
            Self::new(4, 0, 0, 0),
            Self::new(0, 2, 0, 0),
            Self::new(0, 0, 0, 1),
        ]
    }

    /// Split free combinations used for the leftovers under the low and medium
    /// policies.
    pub fn simple() -> Vec<Self> {
        vec![
            Self::new(0, 0, 1, 0),
            Self::new(1, 1, 0, 0),
            Self::new(0, 1, 0, 0),
            Self::new(3, 0, 0, 0),
            Self::new(2, 0, 0, 0),
            Self::new(1, 0, 0, 0),
        ]
    }

    /// Parameters taken per component count.
    pub fn counts(&self) -> [usize; 4] {
        self.counts
    }

    /// Components used by the combination.
    pub fn float_count(&self) -> usize {
        self.counts
            .iter()
            .enumerate()
            .map(|(row, count)| (row + 1) * count)
            .sum()
    }

    /// Destination components of each placed parameter, in placement order
    /// (smaller parameters first).
    pub fn destination_masks(&self) -> Vec<OpMask> {
        let mut offset = 0u32;
        let mut masks = Vec::new();
        for (row, count) in self.counts.iter().enumerate() {
            for _ in 0..*count {
                if let Some(mask) = OpMask::for_float_count(row + 1).shifted(offset) {
                    masks.push(mask);
                }
                offset += row as u32 + 1;
            }
        }
        masks
    }

    /// `true` if `table` holds enough parameters of every arity.
    pub fn fits(&self, table: &TexcoordTable) -> bool {
        self.counts
            .iter()
            .zip(table.iter())
            .all(|(count, row)| row.len() >= *count)
    }

    /// Takes the parameters from the back of each row and packs them.
    pub fn apply(&self, table: &mut TexcoordTable) -> Result<Option<MergeParameter>, ProcessorError> {
        if !self.fits(table) {
            return Ok(None);
        }
        let mut merged = MergeParameter::default();
        for (row, count) in self.counts.iter().enumerate() {
            for _ in 0..*count {
                if let Some(id) = table[row].pop() {
                    merged.add_source(id, OpMask::for_float_count(row + 1), false)?;
                }
            }
        }
        Ok(Some(merged))
    }
}

/// Number of texture coordinate outputs and their total float count.
pub fn count_texcoord_parameters(pool: &ParameterPool, list: &[ParameterId]) -> (usize, usize) {
    list.iter()
        .map(|id| &pool[*id])
        .filter(|p| p.semantic() == Semantic::TextureCoordinates)
        .fold((0, 0), |(slots, floats), p| {
            (slots + 1, floats + p.constant_type().component_count())
        })
}

/// Buckets the float vector texture coordinates of `list` by component count.
pub fn build_texcoord_table(pool: &ParameterPool, list: &[ParameterId]) -> TexcoordTable {
    let mut table: TexcoordTable = Default::default();
    for id in list {
        let param = &pool[*id];
        if param.semantic() != Semantic::TextureCoordinates {
            continue;
        }
        match param.constant_type().float_count() {
            Some(count) => table[count - 1].push(*id),
            None => log::debug!(
                "Texcoord '{}' of type {:?} is not a merge candidate",
                param.name(),
                param.constant_type()
            ),
        }
    }
    table
}

/// Plans the packed registers for every candidate in `table`.
pub fn merge_parameters(
    table: &mut TexcoordTable,
    policy: CompactPolicy,
    max_slots: usize,
) -> Result<Vec<MergeParameter>, ProcessorError> {
    let mut merged = Vec::new();
    merge_by_combinations(table, &MergeCombination::predefined(), &mut merged)?;

    if matches!(policy, CompactPolicy::Low | CompactPolicy::Medium) {
        let [float1, float2, float3, float4] = [table[0].len(), table[1].len(), table[2].len(), table[3].len()];
        debug_assert!(
            float2 <= 1 && float4 == 0 && (float2 == 1 || float1 <= 3),
            "predefined combinations left {float1} float1, {float2} float2, {float4} float4"
        );
        let required = float3 + usize::from(float2 > 0) + usize::from(float1 > 0 && float2 == 0);
        if merged.len() + required <= max_slots {
            merge_by_combinations(table, &MergeCombination::simple(), &mut merged)?;
        }
    }

    if table.iter().any(|row| !row.is_empty()) {
        merge_reminders(table, &mut merged)?;
    }
    Ok(merged)
}

fn merge_by_combinations(
    table: &mut TexcoordTable,
    combinations: &[MergeCombination],
    merged: &mut Vec<MergeParameter>,
) -> Result<(), ProcessorError> {
    for combination in combinations {
        while let Some(parameter) = combination.apply(table)? {
            merged.push(parameter);
        }
    }
    Ok(())
}

/// Packs the leftovers into `ceil(floats / 4)` registers.
///
/// The first pass seeds each register with the largest remaining parameter.
/// The second pass places the rest in register order and splits a parameter
/// when it does not fit whole.
fn merge_reminders(table: &mut TexcoordTable, merged: &mut Vec<MergeParameter>) -> Result<(), ProcessorError> {
    let floats: usize = table
        .iter()
        .enumerate()
        .map(|(row, ids)| (row + 1) * ids.len())
        .sum();
    let slot_count = floats.div_ceil(4);
    let base = merged.len();

    for _ in 0..slot_count {
        for row in (0..4).rev() {
            if let Some(id) = table[row].pop() {
                let mut parameter = MergeParameter::default();
                parameter.add_source(id, OpMask::for_float_count(row + 1), false)?;
                merged.push(parameter);
                break;
            }
        }
    }

    for row in (0..4).rev() {
        while let Some(id) = table[row].pop() {
            let mut remaining = row + 1;
            let mut offset = 0u32;
            let mut pieces = Vec::new();
            for slot in base..merged.len() {
                if remaining == 0 {
                    break;
                }
                let free = merged[slot].free_float_count();
                if free == 0 || merged[slot].source_count() >= MergeParameter::MAX_SOURCES {
                    continue;
                }
                let take = free.min(remaining);
                pieces.push((slot, piece_mask(take, offset)?));
                offset += take as u32;
                remaining -= take;
            }
            if remaining > 0 {
                merged.push(MergeParameter::default());
                pieces.push((merged.len() - 1, piece_mask(remaining, offset)?));
            }

            let split = pieces.len() > 1;
            for (slot, mask) in pieces {
                merged[slot].add_source(id, mask, split)?;
            }
        }
    }
    Ok(())
}

fn piece_mask(count: usize, offset: u32) -> Result<OpMask, ProcessorError> {
    let mask = OpMask::for_float_count(count);
    mask.shifted(offset).ok_or(ProcessorError::MaskOverflow {
        mask: mask.bits(),
        offset,
    })
}
