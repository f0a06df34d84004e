use core::fmt;

/// A decoded instruction with all operands widened to their declared types.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instruction {
    Nil,
    PushSelf,
    True,
    False,
    PushInt { value: i32 },
    PushFloat { value: f32 },
    PushChar { idx: u16 },
    PushLiteral { idx: u16 },
    PushGlobal { idx: u16 },
    PushField { idx: u16 },
    PushLocal { delta: u16, idx: u16 },
    PushArray { count: u16 },
    StoreField { idx: u16 },
    StoreLocal { delta: u16, idx: u16 },
    Pop,
    Send { argc: u8, selector_idx: u16 },
    SendSuper { argc: u8, selector_idx: u16 },
    Block { idx: u16 },
    BlockReturn,
    Return,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "Nil"),
            Self::PushSelf => write!(f, "PushSelf"),
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::PushInt { value } => write!(f, "PushInt {value}"),
            Self::PushFloat { value } => write!(f, "PushFloat {value}"),
            Self::PushChar { idx } => write!(f, "PushChar #{idx}"),
            Self::PushLiteral { idx } => write!(f, "PushLiteral #{idx}"),
            Self::PushGlobal { idx } => write!(f, "PushGlobal #{idx}"),
            Self::PushField { idx } => write!(f, "PushField {idx}"),
            Self::PushLocal { delta, idx } => {
                write!(f, "PushLocal {delta}[{idx}]")
            }
            Self::PushArray { count } => write!(f, "PushArray {count}"),
            Self::StoreField { idx } => write!(f, "StoreField {idx}"),
            Self::StoreLocal { delta, idx } => {
                write!(f, "StoreLocal {delta}[{idx}]")
            }
            Self::Pop => write!(f, "Pop"),
            Self::Send { argc, selector_idx } => {
                write!(f, "Send {argc} #{selector_idx}")
            }
            Self::SendSuper { argc, selector_idx } => {
                write!(f, "SendSuper {argc} #{selector_idx}")
            }
            Self::Block { idx } => write!(f, "Block #{idx}"),
            Self::BlockReturn => write!(f, "BlockReturn"),
            Self::Return => write!(f, "Return"),
        }
    }
}
