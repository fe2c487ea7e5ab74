//! Instruction handlers. Operands arrive already resolved; each handler
//! reads through the location abstraction, computes, writes back,
//! updates flags, and charges cycles keyed on the operand categories.

use crate::bus::Bus;

use super::bitops;
use super::cpu::{Cpu, Fault};
use super::decode::{ModRmByte, OpKind, GROUP_IMM, OP_TABLE};
use super::flags::{
    af, cf16_add, cf16_sub, cf8_add, cf8_sub, of16_add, of16_sub, of8_add, of8_sub, pf, sf16, sf8,
    zf16, zf8,
};
use super::Width::{self, W16, W8};
use super::{ea, sext, AluOp, Operand, OperandCategory, Register, SReg};

fn alu_cycles(dst: OperandCategory, src: OperandCategory, writeback: bool) -> u32 {
    use OperandCategory::*;
    match (dst, src) {
        (Accumulator | Register | SegReg, Immediate) => 4,
        (Memory, Immediate) => {
            if writeback {
                17
            } else {
                10
            }
        }
        (Accumulator | Register, Memory) => 9,
        (Memory, _) => {
            if writeback {
                16
            } else {
                9
            }
        }
        _ => 3,
    }
}

fn mov_cycles(dst: OperandCategory, src: OperandCategory) -> u32 {
    use OperandCategory::*;
    match (dst, src) {
        (Accumulator, Memory) | (Memory, Accumulator) => 10,
        (Memory, Immediate) => 10,
        (_, Immediate) => 4,
        (_, Memory) => 8,
        (Memory, _) => 9,
        _ => 2,
    }
}

fn xchg_cycles(dst: OperandCategory, src: OperandCategory) -> u32 {
    use OperandCategory::*;
    match (dst, src) {
        (Memory, _) | (_, Memory) => 17,
        (Accumulator, _) | (_, Accumulator) => 3,
        _ => 4,
    }
}

impl Cpu {
    pub(crate) fn dispatch(&mut self, kind: OpKind, bus: &mut impl Bus) {
        match kind {
            OpKind::Alu(op) => self.op_alu(bus, op),
            OpKind::Test => self.op_test(bus),
            OpKind::Grp1 => self.op_grp1(bus),
            OpKind::Grp2 => self.op_grp2(bus),
            OpKind::Mov => self.op_mov(bus),
            OpKind::Xchg => self.op_xchg(bus),
            OpKind::Lea => self.op_lea(bus),
            OpKind::Lds => self.op_load_far_pointer(bus, SReg::DS),
            OpKind::Les => self.op_load_far_pointer(bus, SReg::ES),
            OpKind::Inc => self.op_inc(bus),
            OpKind::Dec => self.op_dec(bus),
            OpKind::Push => self.op_push(bus),
            OpKind::Pop => self.op_pop(bus),
            OpKind::PushF => self.op_pushf(bus),
            OpKind::PopF => self.op_popf(bus),
            OpKind::Sahf => self.op_sahf(),
            OpKind::Lahf => self.op_lahf(),
            OpKind::Cbw => self.op_cbw(),
            OpKind::Cwd => self.op_cwd(),
            OpKind::Daa => self.op_daa(),
            OpKind::Das => self.op_das(),
            OpKind::Aaa => self.op_aaa(),
            OpKind::Aas => self.op_aas(),
            OpKind::Jcc => self.op_jcc(),
            OpKind::Loopnz => self.op_loopnz(),
            OpKind::Loopz => self.op_loopz(),
            OpKind::Loop => self.op_loop(),
            OpKind::Jcxz => self.op_jcxz(),
            OpKind::CallNear => self.op_call_near(bus),
            OpKind::CallFar => self.op_call_far(bus),
            OpKind::RetNear => self.op_ret_near(bus, false),
            OpKind::RetNearImm => self.op_ret_near(bus, true),
            OpKind::RetFar => self.op_ret_far(bus, false),
            OpKind::RetFarImm => self.op_ret_far(bus, true),
            OpKind::JmpNear => self.op_jmp_near(),
            OpKind::JmpShort => self.op_jmp_short(),
            OpKind::JmpFar => self.op_jmp_far(),
            OpKind::Movs => self.op_movs(bus),
            OpKind::Cmps => self.op_cmps(bus),
            OpKind::Stos => self.op_stos(bus),
            OpKind::Lods => self.op_lods(bus),
            OpKind::Scas => self.op_scas(bus),
            OpKind::Wait => self.op_wait(),
            OpKind::Hlt => self.op_hlt(),
            OpKind::Clc => self.op_set_flag(|cpu| cpu.register_file.set_cf(false)),
            OpKind::Stc => self.op_set_flag(|cpu| cpu.register_file.set_cf(true)),
            OpKind::Cmc => self.op_cmc(),
            OpKind::Cli => self.op_set_flag(|cpu| cpu.set_if(false)),
            OpKind::Sti => self.op_set_flag(|cpu| cpu.set_if(true)),
            OpKind::Cld => self.op_set_flag(|cpu| cpu.set_df(false)),
            OpKind::Std => self.op_set_flag(|cpu| cpu.set_df(true)),
            OpKind::Prefix => unreachable!("prefix bytes are consumed before dispatch"),
            OpKind::Undefined => self.op_undefined(),
        }
    }

    fn width(&self) -> Width {
        if OP_TABLE[self.opcode as usize].word {
            W16
        } else {
            W8
        }
    }

    fn set_if(&mut self, v: bool) {
        let flags = self.register_file.get_flags();
        let flags = if v {
            flags | super::FLAG_IF
        } else {
            flags & !super::FLAG_IF
        };
        self.register_file.set_flags(flags);
    }

    fn set_df(&mut self, v: bool) {
        let flags = self.register_file.get_flags();
        let flags = if v {
            flags | super::FLAG_DF
        } else {
            flags & !super::FLAG_DF
        };
        self.register_file.set_flags(flags);
    }

    /// Shared ALU: computes at the given width and updates CF/PF/AF/ZF/
    /// SF/OF per operation class. CMP shares the subtract path.
    pub(crate) fn alu(&mut self, func: AluOp, a: u16, b: u16, w: Width) -> u16 {
        let carry = self.register_file.get_cf();
        let mut res = match func {
            AluOp::Add => a.wrapping_add(b),
            AluOp::Or => a | b,
            AluOp::Adc => a.wrapping_add(b).wrapping_add(carry as u16),
            AluOp::Sbb => a.wrapping_sub(b).wrapping_sub(carry as u16),
            AluOp::And => a & b,
            AluOp::Sub | AluOp::Cmp => a.wrapping_sub(b),
            AluOp::Xor => a ^ b,
        };
        res &= w.mask();

        match func {
            AluOp::Add => self.update_flags_add(res, a, b, false, w),
            AluOp::Adc => self.update_flags_add(res, a, b, carry, w),
            AluOp::Sub | AluOp::Cmp => self.update_flags_sub(res, a, b, false, w),
            AluOp::Sbb => self.update_flags_sub(res, a, b, carry, w),
            AluOp::Or | AluOp::And | AluOp::Xor => self.update_flags_logic(res, w),
        }

        res
    }

    fn update_flags_add(&mut self, res: u16, dst: u16, src: u16, carry: bool, w: Width) {
        let rf = &mut self.register_file;
        match w {
            W8 => {
                rf.set_cf(cf8_add(dst, src, carry));
                rf.set_of(of8_add(res, dst, src));
                rf.set_zf(zf8(res));
                rf.set_sf(sf8(res));
            }
            W16 => {
                rf.set_cf(cf16_add(dst, src, carry));
                rf.set_of(of16_add(res, dst, src));
                rf.set_zf(zf16(res));
                rf.set_sf(sf16(res));
            }
        }
        rf.set_af(af(res, dst, src));
        rf.set_pf(pf(res));
    }

    fn update_flags_sub(&mut self, res: u16, dst: u16, src: u16, borrow: bool, w: Width) {
        let rf = &mut self.register_file;
        match w {
            W8 => {
                rf.set_cf(cf8_sub(dst, src, borrow));
                rf.set_of(of8_sub(res, dst, src));
                rf.set_zf(zf8(res));
                rf.set_sf(sf8(res));
            }
            W16 => {
                rf.set_cf(cf16_sub(dst, src, borrow));
                rf.set_of(of16_sub(res, dst, src));
                rf.set_zf(zf16(res));
                rf.set_sf(sf16(res));
            }
        }
        rf.set_af(af(res, dst, src));
        rf.set_pf(pf(res));
    }

    fn update_flags_logic(&mut self, res: u16, w: Width) {
        let rf = &mut self.register_file;
        rf.set_cf(false);
        rf.set_of(false);
        rf.set_af(false);
        match w {
            W8 => {
                rf.set_zf(zf8(res));
                rf.set_sf(sf8(res));
            }
            W16 => {
                rf.set_zf(zf16(res));
                rf.set_sf(sf16(res));
            }
        }
        rf.set_pf(pf(res));
    }

    fn op_alu(&mut self, bus: &mut impl Bus, func: AluOp) {
        let w = self.width();
        let (dst, src) = (self.destination, self.source);
        let a = self.loc_read(bus, dst, w);
        let b = self.loc_read(bus, src, w);
        let res = self.alu(func, a, b, w);

        let writeback = func != AluOp::Cmp;
        if writeback {
            self.loc_write(bus, dst, w, res);
        }
        self.cycles += alu_cycles(dst.category(), src.category(), writeback);
    }

    fn op_test(&mut self, bus: &mut impl Bus) {
        let w = self.width();
        let (dst, src) = (self.destination, self.source);
        let a = self.loc_read(bus, dst, w);
        let b = self.loc_read(bus, src, w);
        self.alu(AluOp::And, a, b, w);
        self.cycles += alu_cycles(dst.category(), src.category(), false);
    }

    fn op_grp1(&mut self, bus: &mut impl Bus) {
        let reg = self.modrm.unwrap_or(ModRmByte(0)).reg();
        let (_, func) = GROUP_IMM[reg as usize];
        self.op_alu(bus, func);
    }

    fn op_grp2(&mut self, bus: &mut impl Bus) {
        let func = self.modrm.unwrap_or(ModRmByte(0)).reg();
        let by_cl = self.opcode & 0b10 != 0;
        let count = if by_cl { self.register_file.get8(1) } else { 1 };
        let w = self.width();
        let dst = self.destination;

        self.cycles += match (by_cl, dst.is_memory()) {
            (false, false) => 2,
            (false, true) => 15,
            (true, false) => 8 + 4 * count as u32,
            (true, true) => 20 + 4 * count as u32,
        };
        if count == 0 {
            return;
        }

        let src = self.loc_read(bus, dst, w);
        let cf = self.register_file.get_cf();
        let (res, cf) = match func {
            0b000 => bitops::rol(src, count, cf, w),
            0b001 => bitops::ror(src, count, cf, w),
            0b010 => bitops::rcl(src, count, cf, w),
            0b011 => bitops::rcr(src, count, cf, w),
            0b100 => bitops::shl(src, count, cf, w),
            0b101 => bitops::shr(src, count, cf, w),
            0b110 => bitops::setmo(src, count, cf, w),
            _ => bitops::sar(src, count, cf, w),
        };
        let of = func != 0b110
            && match w {
                W8 => sf8(res) != sf8(src),
                W16 => sf16(res) != sf16(src),
            };

        self.loc_write(bus, dst, w, res);
        let rf = &mut self.register_file;
        rf.set_of(of);
        rf.set_cf(cf);
        if func >= 0b100 {
            match w {
                W8 => {
                    rf.set_zf(zf8(res));
                    rf.set_sf(sf8(res));
                }
                W16 => {
                    rf.set_zf(zf16(res));
                    rf.set_sf(sf16(res));
                }
            }
            rf.set_pf(pf(res));
        }
    }

    fn op_mov(&mut self, bus: &mut impl Bus) {
        let w = self.width();
        let (dst, src) = (self.destination, self.source);
        let v = self.loc_read(bus, src, w);
        self.loc_write(bus, dst, w, v);
        self.cycles += mov_cycles(dst.category(), src.category());
    }

    fn op_xchg(&mut self, bus: &mut impl Bus) {
        let w = self.width();
        let (dst, src) = (self.destination, self.source);
        let a = self.loc_read(bus, dst, w);
        let b = self.loc_read(bus, src, w);
        self.loc_write(bus, dst, w, b);
        self.loc_write(bus, src, w, a);
        self.cycles += xchg_cycles(dst.category(), src.category());
    }

    /// Writes the pre-segment effective address, not its contents.
    fn op_lea(&mut self, bus: &mut impl Bus) {
        let ofs = self.ea_offset;
        self.loc_write(bus, self.destination, W16, ofs);
        self.cycles += 2;
    }

    fn op_load_far_pointer(&mut self, bus: &mut impl Bus, seg: SReg) {
        debug_assert!(self.source.is_memory());
        let addr = match self.source {
            Operand::Mem(a) | Operand::Str(a) => a,
            _ => return,
        };
        let ofs = self.loc_read(bus, Operand::Mem(addr), W16);
        let seg_v = self.loc_read(bus, Operand::Mem(addr.wrapping_add(2) & 0xFFFFF), W16);
        self.loc_write(bus, self.destination, W16, ofs);
        self.register_file.set_sreg(seg, seg_v);
        self.cycles += 16;
    }

    // INC and DEC leave CF untouched.
    fn op_inc(&mut self, bus: &mut impl Bus) {
        let w = self.width();
        let dst = self.destination;
        let a = self.loc_read(bus, dst, w);
        let res = a.wrapping_add(1) & w.mask();
        self.loc_write(bus, dst, w, res);

        let rf = &mut self.register_file;
        match w {
            W8 => {
                rf.set_of(of8_add(res, a, 1));
                rf.set_zf(zf8(res));
                rf.set_sf(sf8(res));
            }
            W16 => {
                rf.set_of(of16_add(res, a, 1));
                rf.set_zf(zf16(res));
                rf.set_sf(sf16(res));
            }
        }
        rf.set_af(af(res, a, 1));
        rf.set_pf(pf(res));
        self.cycles += 2;
    }

    fn op_dec(&mut self, bus: &mut impl Bus) {
        let w = self.width();
        let dst = self.destination;
        let a = self.loc_read(bus, dst, w);
        let res = a.wrapping_sub(1) & w.mask();
        self.loc_write(bus, dst, w, res);

        let rf = &mut self.register_file;
        match w {
            W8 => {
                rf.set_of(of8_sub(res, a, 1));
                rf.set_zf(zf8(res));
                rf.set_sf(sf8(res));
            }
            W16 => {
                rf.set_of(of16_sub(res, a, 1));
                rf.set_zf(zf16(res));
                rf.set_sf(sf16(res));
            }
        }
        rf.set_af(af(res, a, 1));
        rf.set_pf(pf(res));
        self.cycles += 2;
    }

    fn op_push(&mut self, bus: &mut impl Bus) {
        // SP moves before the value is read, so PUSH SP stores the
        // decremented pointer (8086 behavior).
        let sp = self.register_file.get(Register::SP).wrapping_sub(2);
        self.register_file.set(Register::SP, sp);
        let v = self.loc_read(bus, self.destination, W16);
        let addr = ea(self.register_file.get(Register::SS), sp);
        self.loc_write(bus, Operand::Mem(addr), W16, v);

        self.cycles += match self.destination.category() {
            OperandCategory::SegReg => 10,
            OperandCategory::Memory => 16,
            _ => 11,
        };
    }

    fn op_pop(&mut self, bus: &mut impl Bus) {
        let v = self.pop_word(bus);
        self.loc_write(bus, self.destination, W16, v);
        self.cycles += match self.destination.category() {
            OperandCategory::Memory => 17,
            _ => 8,
        };
    }

    fn op_pushf(&mut self, bus: &mut impl Bus) {
        let flags = self.register_file.get_flags();
        self.push_word(bus, flags);
        self.cycles += 10;
    }

    fn op_popf(&mut self, bus: &mut impl Bus) {
        let flags = self.pop_word(bus);
        self.register_file.set_flags(flags);
        self.cycles += 8;
    }

    /// AH -> SF:ZF:x:AF:x:PF:x:CF, the native low-byte flag layout.
    fn op_sahf(&mut self) {
        let ah = self.register_file.get8(4) as u16;
        let rf = &mut self.register_file;
        rf.set_sf(ah & super::FLAG_SF != 0);
        rf.set_zf(ah & super::FLAG_ZF != 0);
        rf.set_af(ah & super::FLAG_AF != 0);
        rf.set_pf(ah & super::FLAG_PF != 0);
        rf.set_cf(ah & super::FLAG_CF != 0);
        self.cycles += 4;
    }

    fn op_lahf(&mut self) {
        let flags = self.register_file.get_flags() as u8;
        self.register_file.set8(4, flags);
        self.cycles += 4;
    }

    fn op_cbw(&mut self) {
        let al = self.register_file.get8(0);
        self.register_file.set(Register::AX, sext(al));
        self.cycles += 2;
    }

    fn op_cwd(&mut self) {
        let ax = self.register_file.get(Register::AX);
        let dx = if ax & 0x8000 != 0 { 0xFFFF } else { 0x0000 };
        self.register_file.set(Register::DX, dx);
        self.cycles += 5;
    }

    fn op_daa(&mut self) {
        let old_al = self.register_file.get8(0);
        let old_af = self.register_file.get_af();
        let old_cf = self.register_file.get_cf();

        let mut al = old_al;
        let mut af = false;
        let mut cf = false;

        // The high-digit threshold loosens when a low-digit adjust was
        // already pending.
        let threshold = if old_af { 0x9F } else { 0x99 };

        if old_al & 0x0F > 9 || old_af {
            al = al.wrapping_add(0x06);
            af = true;
        }
        if old_al > threshold || old_cf {
            al = al.wrapping_add(0x60);
            cf = true;
        }

        self.register_file.set8(0, al);
        self.finish_bcd_byte(al, af, cf);
    }

    fn op_das(&mut self) {
        let old_al = self.register_file.get8(0);
        let old_af = self.register_file.get_af();
        let old_cf = self.register_file.get_cf();

        let mut al = old_al;
        let mut af = false;
        let mut cf = false;

        let threshold = if old_af { 0x9F } else { 0x99 };

        if old_al & 0x0F > 9 || old_af {
            al = al.wrapping_sub(0x06);
            af = true;
        }
        if old_al > threshold || old_cf {
            al = al.wrapping_sub(0x60);
            cf = true;
        }

        self.register_file.set8(0, al);
        self.finish_bcd_byte(al, af, cf);
    }

    fn op_aaa(&mut self) {
        let ax = self.register_file.get(Register::AX);
        let mut adjusted = false;

        let mut res = ax;
        if ax & 0x0F > 9 || self.register_file.get_af() {
            let al = (ax as u8).wrapping_add(6) as u16;
            let ah = ((ax >> 8) as u8).wrapping_add(1) as u16;
            res = (ah << 8) | al;
            adjusted = true;
        }
        res &= 0xFF0F;

        self.register_file.set(Register::AX, res);
        self.finish_bcd_byte(res as u8, adjusted, adjusted);
    }

    fn op_aas(&mut self) {
        let ax = self.register_file.get(Register::AX);
        let mut adjusted = false;

        let mut res = ax;
        if ax & 0x0F > 9 || self.register_file.get_af() {
            let al = (ax as u8).wrapping_sub(6) as u16;
            let ah = ((ax >> 8) as u8).wrapping_sub(1) as u16;
            res = (ah << 8) | al;
            adjusted = true;
        }
        res &= 0xFF0F;

        self.register_file.set(Register::AX, res);
        self.finish_bcd_byte(res as u8, adjusted, adjusted);
    }

    /// Common tail of the BCD adjusts: PF/ZF/SF follow AL, OF is left
    /// as whatever the previous operation produced (documented
    /// undefined).
    fn finish_bcd_byte(&mut self, al: u8, af: bool, cf: bool) {
        let rf = &mut self.register_file;
        rf.set_cf(cf);
        rf.set_af(af);
        rf.set_zf(zf8(al as u16));
        rf.set_sf(sf8(al as u16));
        rf.set_pf(pf(al as u16));
        self.cycles += 4;
    }

    fn op_jcc(&mut self) {
        let offset = sext(self.immediate as u8);
        let cond = (self.opcode >> 1) & 0b111;
        let negate = self.opcode & 1 != 0;

        let rf = &self.register_file;
        let mut take = match cond {
            0b000 => rf.get_of(),
            0b001 => rf.get_cf(),
            0b010 => rf.get_zf(),
            0b011 => rf.get_cf() | rf.get_zf(),
            0b100 => rf.get_sf(),
            0b101 => rf.get_pf(),
            0b110 => rf.get_sf() ^ rf.get_of(),
            _ => (rf.get_sf() ^ rf.get_of()) | rf.get_zf(),
        };
        if negate {
            take = !take;
        }

        if take {
            let target = self.current_ip.wrapping_add(offset);
            self.jump(target);
            self.cycles += 16;
        } else {
            self.cycles += 4;
        }
    }

    fn op_loopnz(&mut self) {
        let offset = sext(self.immediate as u8);
        let cx = self.register_file.get(Register::CX).wrapping_sub(1);
        self.register_file.set(Register::CX, cx);
        if cx != 0 && !self.register_file.get_zf() {
            let target = self.current_ip.wrapping_add(offset);
            self.jump(target);
            self.cycles += 19;
        } else {
            self.cycles += 5;
        }
    }

    fn op_loopz(&mut self) {
        let offset = sext(self.immediate as u8);
        let cx = self.register_file.get(Register::CX).wrapping_sub(1);
        self.register_file.set(Register::CX, cx);
        if cx != 0 && self.register_file.get_zf() {
            let target = self.current_ip.wrapping_add(offset);
            self.jump(target);
            self.cycles += 18;
        } else {
            self.cycles += 6;
        }
    }

    fn op_loop(&mut self) {
        let offset = sext(self.immediate as u8);
        let cx = self.register_file.get(Register::CX).wrapping_sub(1);
        self.register_file.set(Register::CX, cx);
        if cx != 0 {
            let target = self.current_ip.wrapping_add(offset);
            self.jump(target);
            self.cycles += 17;
        } else {
            self.cycles += 5;
        }
    }

    fn op_jcxz(&mut self) {
        let offset = sext(self.immediate as u8);
        if self.register_file.get(Register::CX) == 0 {
            let target = self.current_ip.wrapping_add(offset);
            self.jump(target);
            self.cycles += 18;
        } else {
            self.cycles += 6;
        }
    }

    fn op_call_near(&mut self, bus: &mut impl Bus) {
        let rel = self.immediate as u16;
        let ret = self.current_ip;
        self.push_word(bus, ret);
        self.jump(ret.wrapping_add(rel));
        self.cycles += 19;
    }

    fn op_call_far(&mut self, bus: &mut impl Bus) {
        let ofs = self.immediate as u16;
        let seg = (self.immediate >> 16) as u16;
        let cs = self.register_file.get(Register::CS);
        self.push_word(bus, cs);
        let ret = self.current_ip;
        self.push_word(bus, ret);
        self.jump_far(seg, ofs);
        self.cycles += 28;
    }

    fn op_ret_near(&mut self, bus: &mut impl Bus, with_imm: bool) {
        let target = self.pop_word(bus);
        if with_imm {
            let sp = self
                .register_file
                .get(Register::SP)
                .wrapping_add(self.immediate as u16);
            self.register_file.set(Register::SP, sp);
        }
        self.jump(target);
        self.cycles += if with_imm { 20 } else { 16 };
    }

    fn op_ret_far(&mut self, bus: &mut impl Bus, with_imm: bool) {
        let target = self.pop_word(bus);
        let seg = self.pop_word(bus);
        if with_imm {
            let sp = self
                .register_file
                .get(Register::SP)
                .wrapping_add(self.immediate as u16);
            self.register_file.set(Register::SP, sp);
        }
        self.jump_far(seg, target);
        self.cycles += if with_imm { 25 } else { 26 };
    }

    fn op_jmp_near(&mut self) {
        let rel = self.immediate as u16;
        let target = self.current_ip.wrapping_add(rel);
        self.jump(target);
        self.cycles += 15;
    }

    fn op_jmp_short(&mut self) {
        let rel = sext(self.immediate as u8);
        let target = self.current_ip.wrapping_add(rel);
        self.jump(target);
        self.cycles += 15;
    }

    fn op_jmp_far(&mut self) {
        let ofs = self.immediate as u16;
        let seg = (self.immediate >> 16) as u16;
        self.jump_far(seg, ofs);
        self.cycles += 15;
    }

    fn string_delta(&self, w: Width) -> i16 {
        let delta = if self.register_file.get_df() { -1 } else { 1 };
        match w {
            W8 => delta,
            W16 => 2 * delta,
        }
    }

    fn advance_si(&mut self, delta: i16) {
        let si = self.register_file.get(Register::SI).wrapping_add_signed(delta);
        self.register_file.set(Register::SI, si);
    }

    fn advance_di(&mut self, delta: i16) {
        let di = self.register_file.get(Register::DI).wrapping_add_signed(delta);
        self.register_file.set(Register::DI, di);
    }

    fn op_movs(&mut self, bus: &mut impl Bus) {
        let w = self.width();
        let v = self.loc_read(bus, self.source, w);
        self.loc_write(bus, self.destination, w, v);
        let delta = self.string_delta(w);
        self.advance_si(delta);
        self.advance_di(delta);
        self.cycles += if self.repeat { 17 } else { 18 };
    }

    fn op_cmps(&mut self, bus: &mut impl Bus) {
        let w = self.width();
        let a = self.loc_read(bus, self.destination, w);
        let b = self.loc_read(bus, self.source, w);
        self.alu(AluOp::Cmp, a, b, w);
        let delta = self.string_delta(w);
        self.advance_si(delta);
        self.advance_di(delta);
        self.cycles += 22;
    }

    fn op_stos(&mut self, bus: &mut impl Bus) {
        let w = self.width();
        let v = self.loc_read(bus, self.source, w);
        self.loc_write(bus, self.destination, w, v);
        self.advance_di(self.string_delta(w));
        self.cycles += if self.repeat { 10 } else { 11 };
    }

    fn op_lods(&mut self, bus: &mut impl Bus) {
        let w = self.width();
        let v = self.loc_read(bus, self.source, w);
        self.loc_write(bus, self.destination, w, v);
        self.advance_si(self.string_delta(w));
        self.cycles += if self.repeat { 13 } else { 12 };
    }

    fn op_scas(&mut self, bus: &mut impl Bus) {
        let w = self.width();
        let a = self.loc_read(bus, self.destination, w);
        let b = self.loc_read(bus, self.source, w);
        self.alu(AluOp::Cmp, a, b, w);
        self.advance_di(self.string_delta(w));
        self.cycles += 15;
    }

    fn op_wait(&mut self) {
        self.waiting = true;
        self.cycles += 3;
    }

    fn op_hlt(&mut self) {
        log::trace!("halted at {:04X}", self.current_ip);
        self.halted = true;
        self.cycles += 2;
    }

    fn op_set_flag(&mut self, set: fn(&mut Cpu)) {
        set(self);
        self.cycles += 2;
    }

    fn op_cmc(&mut self) {
        let cf = self.register_file.get_cf();
        self.register_file.set_cf(!cf);
        self.cycles += 2;
    }

    fn op_undefined(&mut self) {
        log::warn!(
            "undefined opcode {:02X} at {:04X}:{:04X}",
            self.opcode,
            self.register_file.get(Register::CS),
            self.current_ip
        );
        self.fault = Some(Fault::UndefinedOpcode(self.opcode));
        self.halted = true;
    }
}
