//! `Expression`: the sum of every expression variant the language defines.

use crate::models::arena::{ExprId, ItemId, TypeId};
use crate::models::id::Id;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorKind {
    Attribute,
    AttributeAssign,
    BitAnd,
    BitOr,
    BitXor,
    Call,
    Cast,
    Coerce,
    Deref,
    Div,
    Equal,
    Greater,
    Less,
    HasAttribute,
    IncrPrefix,
    IncrPostfix,
    DecrPrefix,
    DecrPostfix,
    Index,
    IndexAssign,
    LogicalAnd,
    LogicalOr,
    Not,
    MethodCall,
    Plus,
    Minus,
    Mult,
    Mod,
    Power,
    PlusAssign,
    MinusAssign,
    ShiftLeft,
    ShiftRight,
    SignNeg,
    SignPos,
    Size,
}

impl OperatorKind {
    /// Assignment-flavored operators: destination side tracked under
    /// `SerializingUpdate` only during Serializing contexts.
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            OperatorKind::AttributeAssign
                | OperatorKind::PlusAssign
                | OperatorKind::MinusAssign
                | OperatorKind::IndexAssign
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParserStateKind {
    Self_,
    DollarDollar,
    Parameter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Constant {
    Integer(i64),
    Bool(bool),
    Double(u64), // bit pattern, for Eq/Hash-friendly storage
    String(String),
    Bytes(Vec<u8>),
    Enum { label: String, value: i64 },
    Tuple(Vec<ExprId>),
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    Assign {
        target: ExprId,
        value: ExprId,
    },
    Conditional {
        cond: ExprId,
        then_branch: ExprId,
        else_branch: ExprId,
    },
    Constant(Constant),
    /// A regex or bytes constructor attached to a `Ctor` field.
    Ctor {
        pattern: String,
    },
    /// A call target reference (function declaration wrapper, used as a
    /// scope value and as the callee of an `Operator(Call, ..)`).
    Function(Id),
    /// Unresolved name reference; replaced in place by the ID resolver.
    Id(Id),
    Lambda {
        param: Id,
        body: ExprId,
    },
    ListComprehension {
        element: ExprId,
        list: ExprId,
        cond: Option<ExprId>,
    },
    MemberAttribute {
        target: ExprId,
        attribute: Id,
    },
    Operator {
        kind: OperatorKind,
        operands: Vec<ExprId>,
    },
    ParserState {
        kind: ParserStateKind,
        id: Option<Id>,
        unit: Option<TypeId>,
        ty: TypeId,
    },
    /// A resolved reference to a type (used as a scope value for `Type`
    /// declarations and as the operand of `Cast`/`Coerce`).
    Type(TypeId),
    /// A resolved reference to a transform declaration.
    Transform(Id),
    /// A fresh variable introduced by lambda-variable rewriting, or a
    /// `Variable` unit item reference.
    Variable(Id),
    Find {
        list: ExprId,
        cond: ExprId,
        found: ExprId,
        not_found: ExprId,
    },
    /// Placeholder for a field whose `Unknown` type has not yet been
    /// rewritten by the ID resolver into one of the variants above.
    Unresolved(Id),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExprNode {
    pub kind: ExprKind,
    pub ty: Option<TypeId>,
}

impl ExprNode {
    pub fn new(kind: ExprKind) -> Self {
        Self { kind, ty: None }
    }

    pub fn with_type(kind: ExprKind, ty: TypeId) -> Self {
        Self { kind, ty: Some(ty) }
    }
}

/// Shared by C7 (dependency analysis) and C8 (compaction): whether this
/// expression references the item currently being examined directly
/// (used to decide field ordering — container elements reuse `ItemId`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRef(pub ItemId);
