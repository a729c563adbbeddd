//! Type classification
//!
//! Pure queries over the [`TypeTable`]: what scalar a type bottoms out in,
//! how wide that scalar is, and whether a type transitively holds a given
//! scalar or a physical storage buffer pointer. Type graphs are acyclic by
//! construction (pointers are never followed by the containment queries), so
//! every query terminates.
use spvinstr::{
    Id,
    spirv::{Op, StorageClass},
    types::TypeTable,
};
use strum::{EnumIs, IntoStaticStr};

use crate::utils::error::FinalizeResult;

/// Class of a type declaration, one per `OpType*` opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs, IntoStaticStr)]
pub enum TypeClass {
    Void,
    Bool,
    Int,
    Float,
    Vector,
    Matrix,
    Array,
    RuntimeArray,
    Struct,
    Pointer,
    ForwardPointer,
    Function,
    Image,
    Sampler,
    SampledImage,
    Opaque,
}

impl TypeClass {
    pub fn of(op: Op) -> Option<Self> {
        let class = match op {
            Op::TypeVoid => TypeClass::Void,
            Op::TypeBool => TypeClass::Bool,
            Op::TypeInt => TypeClass::Int,
            Op::TypeFloat => TypeClass::Float,
            Op::TypeVector => TypeClass::Vector,
            Op::TypeMatrix => TypeClass::Matrix,
            Op::TypeArray => TypeClass::Array,
            Op::TypeRuntimeArray => TypeClass::RuntimeArray,
            Op::TypeStruct => TypeClass::Struct,
            Op::TypePointer => TypeClass::Pointer,
            Op::TypeForwardPointer => TypeClass::ForwardPointer,
            Op::TypeFunction => TypeClass::Function,
            Op::TypeImage => TypeClass::Image,
            Op::TypeSampler => TypeClass::Sampler,
            Op::TypeSampledImage => TypeClass::SampledImage,
            Op::TypeOpaque => TypeClass::Opaque,
            _ => return None,
        };
        Some(class)
    }

    /// Scalar kind for `Int`/`Float`.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            TypeClass::Int => Some(ScalarKind::Int),
            TypeClass::Float => Some(ScalarKind::Float),
            _ => None,
        }
    }
}

/// Numeric scalar kinds that carry a bit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Int,
    Float,
}

/// Result of [`TypeClassifier::characterize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BasicType {
    pub class: TypeClass,
    /// Bit width for `Int`/`Float`, `0` otherwise.
    pub width: u32,
}

impl BasicType {
    #[inline]
    pub fn is_scalar(&self, kind: ScalarKind, width: u32) -> bool {
        self.class.scalar_kind() == Some(kind) && self.width == width
    }
}

#[derive(Clone, Copy)]
pub struct TypeClassifier<'a> {
    types: &'a TypeTable,
}

impl<'a> TypeClassifier<'a> {
    pub fn new(types: &'a TypeTable) -> Self {
        Self { types }
    }

    pub fn class_of(&self, ty: Id) -> FinalizeResult<TypeClass> {
        let decl = self.types.resolve(ty)?;
        Ok(TypeClass::of(decl.op()).ok_or(spvinstr::Error::NotAType { id: ty, op: decl.op() })?)
    }

    /// Type reached by unwrapping vectors, matrices, arrays, runtime arrays
    /// and pointers, along with its class.
    fn innermost(&self, mut ty: Id) -> FinalizeResult<(Id, TypeClass)> {
        loop {
            let class = self.class_of(ty)?;
            let decl = self.types.resolve(ty)?;
            ty = match class {
                TypeClass::Vector | TypeClass::Matrix | TypeClass::Array | TypeClass::RuntimeArray => {
                    decl.id_operand(0)?
                }
                TypeClass::Pointer => decl.id_operand(1)?,
                _ => return Ok((ty, class)),
            };
        }
    }

    /// Class of the type `ty` bottoms out in.
    pub fn basic_class(&self, ty: Id) -> FinalizeResult<TypeClass> {
        Ok(self.innermost(ty)?.1)
    }

    /// Bit width of the scalar `ty` bottoms out in; `None` unless that
    /// scalar is an `Int` or `Float`.
    pub fn scalar_width(&self, ty: Id) -> FinalizeResult<Option<u32>> {
        let (leaf, class) = self.innermost(ty)?;
        match class {
            TypeClass::Int | TypeClass::Float => {
                Ok(Some(self.types.resolve(leaf)?.literal_operand(0)?))
            }
            _ => Ok(None),
        }
    }

    /// Basic class and scalar width in a single walk.
    pub fn characterize(&self, ty: Id) -> FinalizeResult<BasicType> {
        let (leaf, class) = self.innermost(ty)?;
        let width = match class {
            TypeClass::Int | TypeClass::Float => self.types.resolve(leaf)?.literal_operand(0)?,
            _ => 0,
        };
        Ok(BasicType { class, width })
    }

    /// Whether `ty`, or any member, element or component of it, is a scalar
    /// of `kind` and `width`. Pointers are opaque to this query.
    pub fn contains_scalar(&self, ty: Id, kind: ScalarKind, width: u32) -> FinalizeResult<bool> {
        let decl = self.types.resolve(ty)?;
        match self.class_of(ty)? {
            class @ (TypeClass::Int | TypeClass::Float) => {
                Ok(class.scalar_kind() == Some(kind) && decl.literal_operand(0)? == width)
            }
            TypeClass::Struct => {
                for member in decl.id_operands() {
                    if self.contains_scalar(member, kind, width)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            TypeClass::Vector | TypeClass::Matrix | TypeClass::Array | TypeClass::RuntimeArray => {
                self.contains_scalar(decl.id_operand(0)?, kind, width)
            }
            _ => Ok(false),
        }
    }

    /// Whether `ty` is a physical storage buffer pointer, or an array or
    /// struct holding one at any depth.
    pub fn contains_physical_pointer_or_array(&self, ty: Id) -> FinalizeResult<bool> {
        let decl = self.types.resolve(ty)?;
        match self.class_of(ty)? {
            TypeClass::Pointer => {
                let (storage_class, _) = self.types.pointer_parts(ty)?;
                Ok(storage_class == Some(StorageClass::PhysicalStorageBuffer))
            }
            TypeClass::Array | TypeClass::RuntimeArray => {
                self.contains_physical_pointer_or_array(decl.id_operand(0)?)
            }
            TypeClass::Struct => {
                for member in decl.id_operands() {
                    if self.contains_physical_pointer_or_array(member)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            _ => Ok(false),
        }
    }
}
