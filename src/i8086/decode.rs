use super::AluOp;

/// How an operand slot of an opcode is decoded, before resolution into a
/// concrete location. Fixed-register variants name the register
/// directly; the ModR/M variants are filled in during the ModR/M stage.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum OperandSpec {
    // Word registers, ModR/M numbering.
    Ax,
    Cx,
    Dx,
    Bx,
    Sp,
    Bp,
    Si,
    Di,
    // Segment registers.
    Es,
    Cs,
    Ss,
    Ds,
    // Byte registers.
    Al,
    Cl,
    Dl,
    Bl,
    Ah,
    Ch,
    Dh,
    Bh,
    /// Immediate at the opcode's width.
    Imm,
    /// Byte immediate sign-extended to a word (the 0x83 group).
    Imm8,
    /// The r/m side of a ModR/M byte.
    Rm,
    /// The reg side of a ModR/M byte.
    Reg,
    /// The reg side selects a segment register.
    SReg,
    /// A 16-bit direct offset fetched after the opcode.
    Addr,
    /// A far segment:offset pointer fetched after the opcode.
    SegOff,
    /// DS:SI string source (segment-overridable).
    StrSrc,
    /// ES:DI string destination (never overridable).
    StrDst,
    None,
}

impl OperandSpec {
    #[inline]
    pub fn is_immediate(self) -> bool {
        matches!(self, OperandSpec::Imm | OperandSpec::Imm8)
    }
}

/// Operation family dispatched at the execute stage.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum OpKind {
    Alu(AluOp),
    Test,
    /// Arithmetic-immediate group 0x80..0x83; the ModR/M reg field
    /// selects the operation from `GROUP_IMM`.
    Grp1,
    /// Shift/rotate group 0xD0..0xD3.
    Grp2,
    Mov,
    Xchg,
    Lea,
    Lds,
    Les,
    Inc,
    Dec,
    Push,
    Pop,
    PushF,
    PopF,
    Sahf,
    Lahf,
    Cbw,
    Cwd,
    Daa,
    Das,
    Aaa,
    Aas,
    Jcc,
    Loopnz,
    Loopz,
    Loop,
    Jcxz,
    CallNear,
    CallFar,
    RetNear,
    RetNearImm,
    RetFar,
    RetFarImm,
    JmpNear,
    JmpShort,
    JmpFar,
    Movs,
    Cmps,
    Stos,
    Lods,
    Scas,
    Wait,
    Hlt,
    Clc,
    Stc,
    Cmc,
    Cli,
    Sti,
    Cld,
    Std,
    /// Prefix bytes get real entries but are consumed before dispatch.
    Prefix,
    Undefined,
}

/// The ModR/M byte split into its mode, register, and r/m fields.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct ModRmByte(pub u8);

impl ModRmByte {
    #[inline]
    pub fn mode(self) -> u8 {
        self.0 >> 6
    }

    #[inline]
    pub fn reg(self) -> u8 {
        (self.0 >> 3) & 0b111
    }

    #[inline]
    pub fn rm(self) -> u8 {
        self.0 & 0b111
    }
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct Opcode {
    pub name: &'static str,
    pub kind: OpKind,
    pub dst: OperandSpec,
    pub src: OperandSpec,
    pub word: bool,
    pub string_op: bool,
}

const fn op(name: &'static str, kind: OpKind, dst: OperandSpec, src: OperandSpec, word: bool) -> Opcode {
    Opcode {
        name,
        kind,
        dst,
        src,
        word,
        string_op: false,
    }
}

const fn strop(name: &'static str, kind: OpKind, dst: OperandSpec, src: OperandSpec, word: bool) -> Opcode {
    Opcode {
        name,
        kind,
        dst,
        src,
        word,
        string_op: true,
    }
}

const fn prefix(name: &'static str) -> Opcode {
    op(name, OpKind::Prefix, OperandSpec::None, OperandSpec::None, false)
}

const fn undefined() -> Opcode {
    op("???", OpKind::Undefined, OperandSpec::None, OperandSpec::None, false)
}

/// Operations selected by the ModR/M reg field for opcodes 0x80..0x83.
pub(crate) static GROUP_IMM: [(&str, AluOp); 8] = [
    ("ADD", AluOp::Add),
    ("OR", AluOp::Or),
    ("ADC", AluOp::Adc),
    ("SBB", AluOp::Sbb),
    ("AND", AluOp::And),
    ("SUB", AluOp::Sub),
    ("XOR", AluOp::Xor),
    ("CMP", AluOp::Cmp),
];

use AluOp::*;
use OpKind::*;
use OperandSpec::*;

/// Root decode table keyed by the first post-prefix byte. Undecoded
/// regions (INT/IRET, IN/OUT, the 0xF6/0xFE groups, the coprocessor
/// escapes) are explicit undefined entries so a stray byte faults the
/// CPU instead of being reinterpreted. 0x60..0x6F and 0xC0/C1/C8/C9
/// decode as the aliases the silicon implements.
#[rustfmt::skip]
pub(crate) static OP_TABLE: [Opcode; 256] = [
    // 0x00
    op("ADD", Alu(Add), Rm, Reg, false),
    op("ADD", Alu(Add), Rm, Reg, true),
    op("ADD", Alu(Add), Reg, Rm, false),
    op("ADD", Alu(Add), Reg, Rm, true),
    op("ADD", Alu(Add), Al, Imm, false),
    op("ADD", Alu(Add), Ax, Imm, true),
    op("PUSH", Push, Es, None, true),
    op("POP", Pop, Es, None, true),
    // 0x08
    op("OR", Alu(Or), Rm, Reg, false),
    op("OR", Alu(Or), Rm, Reg, true),
    op("OR", Alu(Or), Reg, Rm, false),
    op("OR", Alu(Or), Reg, Rm, true),
    op("OR", Alu(Or), Al, Imm, false),
    op("OR", Alu(Or), Ax, Imm, true),
    op("PUSH", Push, Cs, None, true),
    op("POP", Pop, Cs, None, true),
    // 0x10
    op("ADC", Alu(Adc), Rm, Reg, false),
    op("ADC", Alu(Adc), Rm, Reg, true),
    op("ADC", Alu(Adc), Reg, Rm, false),
    op("ADC", Alu(Adc), Reg, Rm, true),
    op("ADC", Alu(Adc), Al, Imm, false),
    op("ADC", Alu(Adc), Ax, Imm, true),
    op("PUSH", Push, Ss, None, true),
    op("POP", Pop, Ss, None, true),
    // 0x18
    op("SBB", Alu(Sbb), Rm, Reg, false),
    op("SBB", Alu(Sbb), Rm, Reg, true),
    op("SBB", Alu(Sbb), Reg, Rm, false),
    op("SBB", Alu(Sbb), Reg, Rm, true),
    op("SBB", Alu(Sbb), Al, Imm, false),
    op("SBB", Alu(Sbb), Ax, Imm, true),
    op("PUSH", Push, Ds, None, true),
    op("POP", Pop, Ds, None, true),
    // 0x20
    op("AND", Alu(And), Rm, Reg, false),
    op("AND", Alu(And), Rm, Reg, true),
    op("AND", Alu(And), Reg, Rm, false),
    op("AND", Alu(And), Reg, Rm, true),
    op("AND", Alu(And), Al, Imm, false),
    op("AND", Alu(And), Ax, Imm, true),
    prefix("ES:"),
    op("DAA", Daa, None, None, false),
    // 0x28
    op("SUB", Alu(Sub), Rm, Reg, false),
    op("SUB", Alu(Sub), Rm, Reg, true),
    op("SUB", Alu(Sub), Reg, Rm, false),
    op("SUB", Alu(Sub), Reg, Rm, true),
    op("SUB", Alu(Sub), Al, Imm, false),
    op("SUB", Alu(Sub), Ax, Imm, true),
    prefix("CS:"),
    op("DAS", Das, None, None, false),
    // 0x30
    op("XOR", Alu(Xor), Rm, Reg, false),
    op("XOR", Alu(Xor), Rm, Reg, true),
    op("XOR", Alu(Xor), Reg, Rm, false),
    op("XOR", Alu(Xor), Reg, Rm, true),
    op("XOR", Alu(Xor), Al, Imm, false),
    op("XOR", Alu(Xor), Ax, Imm, true),
    prefix("SS:"),
    op("AAA", Aaa, None, None, false),
    // 0x38
    op("CMP", Alu(Cmp), Rm, Reg, false),
    op("CMP", Alu(Cmp), Rm, Reg, true),
    op("CMP", Alu(Cmp), Reg, Rm, false),
    op("CMP", Alu(Cmp), Reg, Rm, true),
    op("CMP", Alu(Cmp), Al, Imm, false),
    op("CMP", Alu(Cmp), Ax, Imm, true),
    prefix("DS:"),
    op("AAS", Aas, None, None, false),
    // 0x40
    op("INC", Inc, Ax, None, true),
    op("INC", Inc, Cx, None, true),
    op("INC", Inc, Dx, None, true),
    op("INC", Inc, Bx, None, true),
    op("INC", Inc, Sp, None, true),
    op("INC", Inc, Bp, None, true),
    op("INC", Inc, Si, None, true),
    op("INC", Inc, Di, None, true),
    // 0x48
    op("DEC", Dec, Ax, None, true),
    op("DEC", Dec, Cx, None, true),
    op("DEC", Dec, Dx, None, true),
    op("DEC", Dec, Bx, None, true),
    op("DEC", Dec, Sp, None, true),
    op("DEC", Dec, Bp, None, true),
    op("DEC", Dec, Si, None, true),
    op("DEC", Dec, Di, None, true),
    // 0x50
    op("PUSH", Push, Ax, None, true),
    op("PUSH", Push, Cx, None, true),
    op("PUSH", Push, Dx, None, true),
    op("PUSH", Push, Bx, None, true),
    op("PUSH", Push, Sp, None, true),
    op("PUSH", Push, Bp, None, true),
    op("PUSH", Push, Si, None, true),
    op("PUSH", Push, Di, None, true),
    // 0x58
    op("POP", Pop, Ax, None, true),
    op("POP", Pop, Cx, None, true),
    op("POP", Pop, Dx, None, true),
    op("POP", Pop, Bx, None, true),
    op("POP", Pop, Sp, None, true),
    op("POP", Pop, Bp, None, true),
    op("POP", Pop, Si, None, true),
    op("POP", Pop, Di, None, true),
    // 0x60: undocumented aliases of the conditional jumps.
    op("JO", Jcc, None, Imm, false),
    op("JNO", Jcc, None, Imm, false),
    op("JB", Jcc, None, Imm, false),
    op("JNB", Jcc, None, Imm, false),
    op("JE", Jcc, None, Imm, false),
    op("JNE", Jcc, None, Imm, false),
    op("JBE", Jcc, None, Imm, false),
    op("JA", Jcc, None, Imm, false),
    // 0x68
    op("JS", Jcc, None, Imm, false),
    op("JNS", Jcc, None, Imm, false),
    op("JP", Jcc, None, Imm, false),
    op("JNP", Jcc, None, Imm, false),
    op("JL", Jcc, None, Imm, false),
    op("JGE", Jcc, None, Imm, false),
    op("JLE", Jcc, None, Imm, false),
    op("JG", Jcc, None, Imm, false),
    // 0x70
    op("JO", Jcc, None, Imm, false),
    op("JNO", Jcc, None, Imm, false),
    op("JB", Jcc, None, Imm, false),
    op("JNB", Jcc, None, Imm, false),
    op("JE", Jcc, None, Imm, false),
    op("JNE", Jcc, None, Imm, false),
    op("JBE", Jcc, None, Imm, false),
    op("JA", Jcc, None, Imm, false),
    // 0x78
    op("JS", Jcc, None, Imm, false),
    op("JNS", Jcc, None, Imm, false),
    op("JP", Jcc, None, Imm, false),
    op("JNP", Jcc, None, Imm, false),
    op("JL", Jcc, None, Imm, false),
    op("JGE", Jcc, None, Imm, false),
    op("JLE", Jcc, None, Imm, false),
    op("JG", Jcc, None, Imm, false),
    // 0x80
    op("GRP1", Grp1, Rm, Imm, false),
    op("GRP1", Grp1, Rm, Imm, true),
    op("GRP1", Grp1, Rm, Imm, false),
    op("GRP1", Grp1, Rm, Imm8, true),
    op("TEST", Test, Rm, Reg, false),
    op("TEST", Test, Rm, Reg, true),
    op("XCHG", Xchg, Rm, Reg, false),
    op("XCHG", Xchg, Rm, Reg, true),
    // 0x88
    op("MOV", Mov, Rm, Reg, false),
    op("MOV", Mov, Rm, Reg, true),
    op("MOV", Mov, Reg, Rm, false),
    op("MOV", Mov, Reg, Rm, true),
    op("MOV", Mov, Rm, SReg, true),
    op("LEA", Lea, Reg, Rm, true),
    op("MOV", Mov, SReg, Rm, true),
    op("POP", Pop, Rm, None, true),
    // 0x90
    op("NOP", Xchg, Ax, Ax, true),
    op("XCHG", Xchg, Ax, Cx, true),
    op("XCHG", Xchg, Ax, Dx, true),
    op("XCHG", Xchg, Ax, Bx, true),
    op("XCHG", Xchg, Ax, Sp, true),
    op("XCHG", Xchg, Ax, Bp, true),
    op("XCHG", Xchg, Ax, Si, true),
    op("XCHG", Xchg, Ax, Di, true),
    // 0x98
    op("CBW", Cbw, None, None, false),
    op("CWD", Cwd, None, None, true),
    op("CALL", CallFar, None, SegOff, true),
    op("WAIT", Wait, None, None, false),
    op("PUSHF", PushF, None, None, true),
    op("POPF", PopF, None, None, true),
    op("SAHF", Sahf, None, None, false),
    op("LAHF", Lahf, None, None, false),
    // 0xA0
    op("MOV", Mov, Al, Addr, false),
    op("MOV", Mov, Ax, Addr, true),
    op("MOV", Mov, Addr, Al, false),
    op("MOV", Mov, Addr, Ax, true),
    strop("MOVSB", Movs, StrDst, StrSrc, false),
    strop("MOVSW", Movs, StrDst, StrSrc, true),
    strop("CMPSB", Cmps, StrSrc, StrDst, false),
    strop("CMPSW", Cmps, StrSrc, StrDst, true),
    // 0xA8
    op("TEST", Test, Al, Imm, false),
    op("TEST", Test, Ax, Imm, true),
    strop("STOSB", Stos, StrDst, Al, false),
    strop("STOSW", Stos, StrDst, Ax, true),
    strop("LODSB", Lods, Al, StrSrc, false),
    strop("LODSW", Lods, Ax, StrSrc, true),
    strop("SCASB", Scas, Al, StrDst, false),
    strop("SCASW", Scas, Ax, StrDst, true),
    // 0xB0
    op("MOV", Mov, Al, Imm, false),
    op("MOV", Mov, Cl, Imm, false),
    op("MOV", Mov, Dl, Imm, false),
    op("MOV", Mov, Bl, Imm, false),
    op("MOV", Mov, Ah, Imm, false),
    op("MOV", Mov, Ch, Imm, false),
    op("MOV", Mov, Dh, Imm, false),
    op("MOV", Mov, Bh, Imm, false),
    // 0xB8
    op("MOV", Mov, Ax, Imm, true),
    op("MOV", Mov, Cx, Imm, true),
    op("MOV", Mov, Dx, Imm, true),
    op("MOV", Mov, Bx, Imm, true),
    op("MOV", Mov, Sp, Imm, true),
    op("MOV", Mov, Bp, Imm, true),
    op("MOV", Mov, Si, Imm, true),
    op("MOV", Mov, Di, Imm, true),
    // 0xC0: aliases of 0xC2/0xC3.
    op("RET", RetNearImm, None, Imm, true),
    op("RET", RetNear, None, None, true),
    op("RET", RetNearImm, None, Imm, true),
    op("RET", RetNear, None, None, true),
    op("LES", Les, Reg, Rm, true),
    op("LDS", Lds, Reg, Rm, true),
    op("MOV", Mov, Rm, Imm, false),
    op("MOV", Mov, Rm, Imm, true),
    // 0xC8: aliases of 0xCA/0xCB.
    op("RETF", RetFarImm, None, Imm, true),
    op("RETF", RetFar, None, None, true),
    op("RETF", RetFarImm, None, Imm, true),
    op("RETF", RetFar, None, None, true),
    undefined(), // INT3
    undefined(), // INT imm8
    undefined(), // INTO
    undefined(), // IRET
    // 0xD0
    op("GRP2", Grp2, Rm, None, false),
    op("GRP2", Grp2, Rm, None, true),
    op("GRP2", Grp2, Rm, None, false),
    op("GRP2", Grp2, Rm, None, true),
    undefined(), // AAM
    undefined(), // AAD
    undefined(), // SALC
    undefined(), // XLAT
    // 0xD8: coprocessor escapes.
    undefined(),
    undefined(),
    undefined(),
    undefined(),
    undefined(),
    undefined(),
    undefined(),
    undefined(),
    // 0xE0
    op("LOOPNZ", Loopnz, None, Imm, false),
    op("LOOPZ", Loopz, None, Imm, false),
    op("LOOP", Loop, None, Imm, false),
    op("JCXZ", Jcxz, None, Imm, false),
    undefined(), // IN AL, imm8
    undefined(), // IN AX, imm8
    undefined(), // OUT imm8, AL
    undefined(), // OUT imm8, AX
    // 0xE8
    op("CALL", CallNear, None, Imm, true),
    op("JMP", JmpNear, None, Imm, true),
    op("JMP", JmpFar, None, SegOff, true),
    op("JMP", JmpShort, None, Imm, false),
    undefined(), // IN AL, DX
    undefined(), // IN AX, DX
    undefined(), // OUT DX, AL
    undefined(), // OUT DX, AX
    // 0xF0
    prefix("LOCK"),
    undefined(),
    prefix("REPNZ"),
    prefix("REPZ"),
    op("HLT", Hlt, None, None, false),
    op("CMC", Cmc, None, None, false),
    undefined(), // GRP3 byte
    undefined(), // GRP3 word
    // 0xF8
    op("CLC", Clc, None, None, false),
    op("STC", Stc, None, None, false),
    op("CLI", Cli, None, None, false),
    op("STI", Sti, None, None, false),
    op("CLD", Cld, None, None, false),
    op("STD", Std, None, None, false),
    undefined(), // GRP4
    undefined(), // GRP5
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modrm_fields_unpack() {
        let m = ModRmByte(0b01_011_110);
        assert_eq!(m.mode(), 0b01);
        assert_eq!(m.reg(), 0b011);
        assert_eq!(m.rm(), 0b110);
    }

    #[test]
    fn prefix_bytes_have_table_entries() {
        for byte in [0x26u8, 0x2E, 0x36, 0x3E, 0xF0, 0xF2, 0xF3] {
            assert_eq!(OP_TABLE[byte as usize].kind, OpKind::Prefix);
        }
    }

    #[test]
    fn undocumented_jcc_range_mirrors_the_documented_one() {
        for i in 0x60..0x70usize {
            assert_eq!(OP_TABLE[i].kind, OP_TABLE[i + 0x10].kind);
            assert_eq!(OP_TABLE[i].name, OP_TABLE[i + 0x10].name);
        }
    }

    #[test]
    fn string_ops_are_flagged() {
        for i in [0xA4usize, 0xA5, 0xA6, 0xA7, 0xAA, 0xAB, 0xAC, 0xAD, 0xAE, 0xAF] {
            assert!(OP_TABLE[i].string_op);
        }
        assert!(!OP_TABLE[0xA0].string_op);
        assert!(!OP_TABLE[0x90].string_op);
    }

    #[test]
    fn group_one_covers_all_reg_encodings() {
        let names: Vec<&str> = GROUP_IMM.iter().map(|e| e.0).collect();
        assert_eq!(
            names,
            ["ADD", "OR", "ADC", "SBB", "AND", "SUB", "XOR", "CMP"]
        );
    }
}
