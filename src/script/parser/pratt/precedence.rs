//! Binding power levels for the Pratt parser

pub const BP_LOWEST: u8 = 0;
pub const BP_OR: u8 = 2;
pub const BP_AND: u8 = 3;
pub const BP_EQ: u8 = 4;
pub const BP_CMP: u8 = 5;
pub const BP_ADD: u8 = 6;
pub const BP_MUL: u8 = 7;
pub const BP_UNARY: u8 = 8;
pub const BP_CALL: u8 = 9;
pub const BP_HIGHEST: u8 = 10;
