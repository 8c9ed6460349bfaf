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

//! Usage site references to parameters.
//!
//! An [`Operand`] names a parameter, the direction it is accessed in, which
//! components are touched and how deep it sits inside array brackets.

use crate::{
    error::OperandError,
    parameter::{GpuConstantType, Parameter, ParameterId},
};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::{BitOr, BitOrAssign},
};

/// Set of vector components (x, y, z, w) touched by an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpMask {
    bits: u8,
}

impl OpMask {
    /// No component.
    pub const NONE: Self = Self { bits: 0 };
    /// The x component.
    pub const X: Self = Self { bits: 1 << 0 };
    /// The y component.
    pub const Y: Self = Self { bits: 1 << 1 };
    /// The z component.
    pub const Z: Self = Self { bits: 1 << 2 };
    /// The w component.
    pub const W: Self = Self { bits: 1 << 3 };
    /// x and y.
    pub const XY: Self = Self { bits: 0b0011 };
    /// x, y and z.
    pub const XYZ: Self = Self { bits: 0b0111 };
    /// Every component.
    pub const ALL: Self = Self { bits: 0b1111 };

    /// Builds a mask from raw bits; bits above w are dropped.
    pub const fn from_bits(bits: u8) -> Self {
        Self { bits: bits & 0b1111 }
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u8 {
        self.bits
    }

    /// Returns `true` if no component is selected.
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Returns `true` if every component of `other` is selected.
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// Number of selected components.
    pub const fn float_count(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Position of the first selected component, 4 for an empty mask.
    pub const fn first_component(&self) -> u32 {
        if self.bits == 0 {
            4
        } else {
            self.bits.trailing_zeros()
        }
    }

    /// The `count` leading components (`x`, `xy`, `xyz`, `xyzw`).
    pub const fn for_float_count(count: usize) -> Self {
        match count {
            0 => Self::NONE,
            1 => Self::X,
            2 => Self::XY,
            3 => Self::XYZ,
            _ => Self::ALL,
        }
    }

    /// The components implied by a data type.
    pub fn for_type(constant_type: GpuConstantType) -> Self {
        Self::for_float_count(constant_type.component_count())
    }

    /// `ALL` addresses the whole parameter; resolves it to the components of
    /// `constant_type`. Other masks are returned unchanged.
    pub fn resolved_for(self, constant_type: GpuConstantType) -> Self {
        if self == Self::ALL {
            Self::for_type(constant_type)
        } else {
            self
        }
    }

    /// Moves every component `offset` places towards w. Returns `None` if a
    /// component would fall past w.
    pub fn shifted(&self, offset: u32) -> Option<Self> {
        let shifted = (self.bits as u32).checked_shl(offset)?;
        if shifted > 0b1111 {
            return None;
        }
        Some(Self { bits: shifted as u8 })
    }

    /// Swizzle letters of the selected components, in xyzw order.
    pub fn swizzle(&self) -> String {
        ['x', 'y', 'z', 'w']
            .iter()
            .enumerate()
            .filter(|(i, _)| self.bits & (1 << i) != 0)
            .map(|(_, c)| *c)
            .collect()
    }
}

impl Default for OpMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl BitOr for OpMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self {
            bits: self.bits | rhs.bits,
        }
    }
}

impl BitOrAssign for OpMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.bits |= rhs.bits;
    }
}

impl fmt::Display for OpMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.swizzle())
    }
}

/// Direction an operand is accessed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpSemantic {
    /// Read only.
    In,
    /// Written only.
    Out,
    /// Read and written.
    InOut,
}

impl OpSemantic {
    /// `true` if the operand is written.
    pub fn is_write(self) -> bool {
        matches!(self, Self::Out | Self::InOut)
    }
}

/// A reference to a parameter from inside an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredOperand")]
pub struct Operand {
    parameter: ParameterId,
    semantic: OpSemantic,
    mask: OpMask,
    indirection_level: u16,
}

/// Deserialized form of [`Operand`], checked by [`Operand::new`].
#[derive(Deserialize)]
struct StoredOperand {
    parameter: ParameterId,
    semantic: OpSemantic,
    mask: OpMask,
    #[serde(default)]
    indirection_level: u16,
}

impl TryFrom<StoredOperand> for Operand {
    type Error = OperandError;

    fn try_from(stored: StoredOperand) -> Result<Self, Self::Error> {
        let mask = OpMask::from_bits(stored.mask.bits());
        Ok(Operand::new(stored.parameter, stored.semantic, mask)?.with_indirection(stored.indirection_level))
    }
}

impl Operand {
    /// Creates an operand. An empty mask is rejected.
    pub fn new(parameter: ParameterId, semantic: OpSemantic, mask: OpMask) -> Result<Self, OperandError> {
        if mask.is_empty() {
            return Err(OperandError::EmptyMask);
        }
        Ok(Self {
            parameter,
            semantic,
            mask,
            indirection_level: 0,
        })
    }

    /// Creates an operand touching exactly the components of `param`'s type.
    pub fn for_parameter(id: ParameterId, param: &Parameter, semantic: OpSemantic) -> Self {
        Self {
            parameter: id,
            semantic,
            mask: OpMask::for_type(param.constant_type()),
            indirection_level: 0,
        }
    }

    /// Places the operand `level` array brackets deep.
    #[must_use]
    pub fn with_indirection(mut self, level: u16) -> Self {
        self.indirection_level = level;
        self
    }

    /// The referenced parameter.
    pub fn parameter(&self) -> ParameterId {
        self.parameter
    }

    /// The access direction.
    pub fn semantic(&self) -> OpSemantic {
        self.semantic
    }

    /// The component mask.
    pub fn mask(&self) -> OpMask {
        self.mask
    }

    /// The array nesting depth.
    pub fn indirection_level(&self) -> u16 {
        self.indirection_level
    }

    /// Resets the mask to the components of `param`'s type.
    pub fn set_mask_to_param_type(&mut self, param: &Parameter) {
        self.mask = OpMask::for_type(param.constant_type());
    }

    /// Number of components selected by `mask`.
    pub fn float_count(mask: OpMask) -> usize {
        mask.float_count()
    }

    pub(crate) fn redirect(&mut self, parameter: ParameterId, mask: OpMask) {
        self.parameter = parameter;
        self.mask = mask;
    }
}

macro_rules! directed_operand {
    ($name:ident, $semantic:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name(Operand);

        impl $name {
            /// Wraps `operand`.
            ///
            /// # Panics
            ///
            /// Panics if the operand has another direction.
            pub fn new(operand: Operand) -> Self {
                match Self::try_from(operand) {
                    Ok(wrapped) => wrapped,
                    Err(e) => panic!("{e}"),
                }
            }

            /// Unwraps the operand.
            pub fn into_inner(self) -> Operand {
                self.0
            }
        }

        impl TryFrom<Operand> for $name {
            type Error = OperandError;

            fn try_from(operand: Operand) -> Result<Self, Self::Error> {
                if operand.semantic() != OpSemantic::$semantic {
                    return Err(OperandError::DirectionMismatch {
                        expected: OpSemantic::$semantic,
                        found: operand.semantic(),
                    });
                }
                Ok(Self(operand))
            }
        }

        impl From<$name> for Operand {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

directed_operand!(In, In, "An operand that is only read.");
directed_operand!(Out, Out, "An operand that is only written.");
directed_operand!(InOut, InOut, "An operand that is read and written.");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::{Content, Semantic};

    fn float2() -> Parameter {
        Parameter::new(
            GpuConstantType::Float2,
            "uv",
            Semantic::TextureCoordinates,
            0,
            Content::Unknown,
        )
    }

    #[test]
    fn test_empty_mask_is_rejected() {
        let result = Operand::new(ParameterId(0), OpSemantic::In, OpMask::NONE);
        assert_eq!(result, Err(OperandError::EmptyMask));
    }

    #[test]
    fn test_float_count_is_popcount() {
        assert_eq!(Operand::float_count(OpMask::X | OpMask::Z), 2);
        assert_eq!(Operand::float_count(OpMask::ALL), 4);
        assert_eq!(Operand::float_count(OpMask::NONE), 0);
    }

    #[test]
    fn test_mask_follows_parameter_type() {
        let param = float2();
        let mut op = Operand::new(ParameterId(0), OpSemantic::In, OpMask::W).unwrap();
        op.set_mask_to_param_type(&param);
        assert_eq!(op.mask(), OpMask::XY);
        assert_eq!(OpMask::for_type(GpuConstantType::Matrix4x4), OpMask::ALL);
        assert_eq!(OpMask::for_type(GpuConstantType::Float3), OpMask::XYZ);
    }

    #[test]
    fn test_shift_and_swizzle() {
        assert_eq!(OpMask::XYZ.shifted(1), Some(OpMask::from_bits(0b1110)));
        assert_eq!(OpMask::XYZ.shifted(2), None);
        assert_eq!(OpMask::from_bits(0b1010).swizzle(), "yw");
        assert_eq!(OpMask::from_bits(0b0110).first_component(), 1);
        assert_eq!(OpMask::from_bits(0xF3), OpMask::XY);
    }

    #[test]
    fn test_all_mask_resolves_to_parameter_components() {
        assert_eq!(OpMask::ALL.resolved_for(GpuConstantType::Float3), OpMask::XYZ);
        assert_eq!(OpMask::ALL.resolved_for(GpuConstantType::Float1), OpMask::X);
        assert_eq!(OpMask::Y.resolved_for(GpuConstantType::Float3), OpMask::Y);
        assert_eq!(
            OpMask::ALL.resolved_for(GpuConstantType::Float3).shifted(1),
            Some(OpMask::from_bits(0b1110))
        );
    }

    #[test]
    fn test_deserialize_checks_mask() {
        let empty = "(parameter: (0), semantic: Out, mask: (bits: 0), indirection_level: 0)";
        assert!(ron::from_str::<Operand>(empty).is_err());

        let valid = "(parameter: (2), semantic: In, mask: (bits: 3), indirection_level: 1)";
        let op: Operand = ron::from_str(valid).unwrap();
        assert_eq!(op.parameter(), ParameterId(2));
        assert_eq!(op.mask(), OpMask::XY);
        assert_eq!(op.indirection_level(), 1);

        let stored = ron::to_string(&op).unwrap();
        assert_eq!(ron::from_str::<Operand>(&stored).unwrap(), op);
    }

    #[test]
    fn test_direction_wrappers() {
        let op = Operand::new(ParameterId(3), OpSemantic::Out, OpMask::ALL).unwrap();
        assert!(Out::try_from(op).is_ok());
        assert_eq!(
            In::try_from(op),
            Err(OperandError::DirectionMismatch {
                expected: OpSemantic::In,
                found: OpSemantic::Out,
            })
        );
        assert_eq!(Operand::from(Out::new(op)).parameter(), ParameterId(3));
    }

    #[test]
    #[should_panic]
    fn test_in_new_panics_on_output_operand() {
        let op = Operand::new(ParameterId(0), OpSemantic::Out, OpMask::ALL).unwrap();
        let _ = In::new(op);
    }
}
