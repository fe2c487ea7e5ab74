use crate::bus::Bus;

use super::decode::{ModRmByte, OpKind, OperandSpec, OP_TABLE};
use super::queue::PrefetchQueue;
use super::register_file::RegisterFile;
use super::{ea, sext, Operand, Register, SReg, Width};

/// Decode pipeline stage. Each `clock` tick runs the stages as far as
/// the prefetch queue allows; a stage that needs more bytes parks the
/// machine until the BIU catches up.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum Stage {
    #[default]
    Ready,
    FetchModrm,
    FetchImm,
    FetchAddress,
    DecodeLoc,
    Executing,
}

/// Group 1 instruction prefixes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum G1Prefix {
    Lock,
    Repnz,
    Repz,
}

/// Architecturally visible execution faults. The CPU latches the first
/// fault and halts deterministically until the next reset.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    UndefinedOpcode(u8),
}

/// An 8086-class CPU stepped one clock tick at a time.
///
/// Every tick first advances the bus interface unit (one step of the
/// 4-cycle prefetch transaction against `CS:IP`), then the execution
/// unit (burning owed cycles, or feeding the staged decoder from the
/// prefetch queue). The bus is borrowed per call; the CPU owns
/// everything else.
pub struct Cpu {
    pub(crate) register_file: RegisterFile,

    /// Prefetch pointer: the next byte the BIU will fetch.
    pub(crate) ip: u16,
    /// Architectural instruction pointer, advanced once per byte the
    /// decoder consumes. Relative branches are taken from here.
    pub(crate) current_ip: u16,

    pub(crate) queue: PrefetchQueue,
    /// Ticks remaining in the current prefetch bus transaction.
    pub(crate) biu_cycles: u8,
    /// Execution cycles owed before the EU decodes again. Wide enough
    /// for a worst-case repeated string charge.
    pub(crate) cycles: u32,

    pub(crate) stage: Stage,
    pub(crate) opcode: u8,
    pub(crate) modrm: Option<ModRmByte>,
    pub(crate) disp_lo: Option<u8>,
    pub(crate) disp_hi: Option<u8>,
    pub(crate) imm_lo: Option<u8>,
    pub(crate) imm_hi: Option<u8>,
    pub(crate) segofs_lo: Option<u8>,
    pub(crate) segofs_hi: Option<u8>,
    /// Composed immediate; far pointers pack segment:offset here.
    pub(crate) immediate: u32,
    /// The 16-bit effective address before segment addition (LEA reads
    /// this rather than the linearized address).
    pub(crate) ea_offset: u16,
    pub(crate) rm_operand: Operand,
    pub(crate) reg_operand: Operand,
    pub(crate) prefix_g1: Option<G1Prefix>,
    pub(crate) prefix_g2: Option<SReg>,
    pub(crate) repeat: bool,
    pub(crate) modrm_is_segreg: bool,
    pub(crate) destination: Operand,
    pub(crate) source: Operand,

    pub(crate) halted: bool,
    pub(crate) fault: Option<Fault>,
    /// The modeled TEST pin sampled by WAIT.
    pub(crate) test_input: bool,
    pub(crate) waiting: bool,
    pub(crate) retired: u64,
}

impl Cpu {
    pub fn new() -> Self {
        let mut cpu = Self {
            register_file: RegisterFile::default(),
            ip: 0,
            current_ip: 0,
            queue: PrefetchQueue::default(),
            biu_cycles: 3,
            cycles: 0,
            stage: Stage::Ready,
            opcode: 0,
            modrm: None,
            disp_lo: None,
            disp_hi: None,
            imm_lo: None,
            imm_hi: None,
            segofs_lo: None,
            segofs_hi: None,
            immediate: 0,
            ea_offset: 0,
            rm_operand: Operand::None,
            reg_operand: Operand::None,
            prefix_g1: None,
            prefix_g2: None,
            repeat: false,
            modrm_is_segreg: false,
            destination: Operand::None,
            source: Operand::None,
            halted: false,
            fault: None,
            test_input: false,
            waiting: false,
            retired: 0,
        };
        cpu.reset();
        cpu
    }

    /// Return to the power-on state: CS=FFFF, everything else zero, the
    /// prefetch queue empty and the first bus transaction three ticks
    /// out. The TEST input is an external line and keeps its level.
    pub fn reset(&mut self) {
        self.register_file = RegisterFile::default();
        self.register_file.set(Register::CS, 0xFFFF);
        self.ip = 0;
        self.current_ip = 0;
        self.queue.flush();
        self.biu_cycles = 3;
        self.cycles = 0;
        self.halted = false;
        self.fault = None;
        self.waiting = false;
        self.retired = 0;
        self.reset_decode_state();
    }

    /// Advance one CPU clock tick: one BIU sub-step, then at most one
    /// EU sub-step.
    pub fn clock(&mut self, bus: &mut impl Bus) {
        if self.halted {
            return;
        }

        // The BIU keeps fetching unless the queue is full. A word
        // arrives every fourth tick; fetching at an odd IP yields one
        // useful byte, with the cursor parked on the high half.
        if !self.queue.is_full() {
            self.biu_cycles -= 1;
            if self.biu_cycles == 0 {
                let cs = self.register_file.get(Register::CS);
                let word = bus.read_word(ea(cs, self.ip));
                let odd = self.ip & 1 != 0;
                self.queue.push(word, odd);
                self.ip = self.ip.wrapping_add(if odd { 1 } else { 2 });
                self.biu_cycles = 4;
            }
        }

        // WAIT parks the EU in 5-cycle stalls while TEST is asserted.
        if self.waiting {
            if self.test_input {
                if self.cycles == 0 {
                    self.cycles = 5;
                }
            } else {
                self.waiting = false;
            }
        }

        if self.cycles > 0 {
            self.cycles -= 1;
            return;
        }
        if self.queue.is_empty() {
            return;
        }

        loop {
            let next = match self.stage {
                Stage::Ready => self.stage_ready(),
                Stage::FetchModrm => self.stage_fetch_modrm(),
                Stage::FetchImm => self.stage_fetch_imm(),
                Stage::FetchAddress => self.stage_fetch_address(),
                Stage::DecodeLoc => self.stage_decode_loc(),
                Stage::Executing => {
                    self.stage_execute(bus);
                    None
                }
            };
            match next {
                Some(stage) => self.stage = stage,
                None => return,
            }
        }
    }

    /// Clock until one instruction retires (or the CPU halts). Test
    /// and tooling convenience; the emulation loop itself uses `clock`.
    pub fn step(&mut self, bus: &mut impl Bus) {
        let target = self.retired + 1;
        while self.retired < target && !self.halted {
            self.clock(bus);
        }
    }

    fn stage_ready(&mut self) -> Option<Stage> {
        let byte = self.dequeue_byte();

        // Prefixes chain onto the following instruction and cost two
        // ticks each (this one plus one owed).
        match byte {
            0xF0 => {
                self.prefix_g1 = Some(G1Prefix::Lock);
                self.cycles = 1;
                return None;
            }
            0xF2 => {
                self.prefix_g1 = Some(G1Prefix::Repnz);
                self.repeat = true;
                self.cycles = 1;
                return None;
            }
            0xF3 => {
                self.prefix_g1 = Some(G1Prefix::Repz);
                self.repeat = true;
                self.cycles = 1;
                return None;
            }
            0x26 => {
                self.prefix_g2 = Some(SReg::ES);
                self.cycles = 1;
                return None;
            }
            0x2E => {
                self.prefix_g2 = Some(SReg::CS);
                self.cycles = 1;
                return None;
            }
            0x36 => {
                self.prefix_g2 = Some(SReg::SS);
                self.cycles = 1;
                return None;
            }
            0x3E => {
                self.prefix_g2 = Some(SReg::DS);
                self.cycles = 1;
                return None;
            }
            _ => {}
        }

        self.opcode = byte;
        let entry = &OP_TABLE[byte as usize];

        // A repeat prefix on a non-string opcode has no effect.
        if self.repeat && !entry.string_op {
            self.repeat = false;
        }

        Some(if entry.dst == OperandSpec::Rm || entry.src == OperandSpec::Rm {
            Stage::FetchModrm
        } else if entry.src.is_immediate() {
            Stage::FetchImm
        } else if entry.dst == OperandSpec::Addr
            || entry.src == OperandSpec::Addr
            || entry.src == OperandSpec::SegOff
        {
            Stage::FetchAddress
        } else {
            Stage::DecodeLoc
        })
    }

    fn stage_fetch_modrm(&mut self) -> Option<Stage> {
        if self.modrm.is_none() {
            if self.queue.is_empty() {
                return None;
            }
            self.modrm = Some(ModRmByte(self.dequeue_byte()));
        }
        let modrm = self.modrm.unwrap_or(ModRmByte(0));
        let entry = &OP_TABLE[self.opcode as usize];
        let (word, dst, src) = (entry.word, entry.dst, entry.src);
        // LEA never issues a bus cycle for its operand: it pays a flat
        // charge in its handler, not the addressing cost.
        let charge_ea = entry.kind != OpKind::Lea;

        let direct = modrm.mode() == 0b00 && modrm.rm() == 0b110;
        let wants_disp_lo = matches!(modrm.mode(), 0b01 | 0b10) || direct;
        let wants_disp_hi = modrm.mode() == 0b10 || direct;
        if wants_disp_lo && self.disp_lo.is_none() {
            if self.queue.is_empty() {
                return None;
            }
            self.disp_lo = Some(self.dequeue_byte());
        }
        if wants_disp_hi && self.disp_hi.is_none() {
            if self.queue.is_empty() {
                return None;
            }
            self.disp_hi = Some(self.dequeue_byte());
        }
        let disp_lo = self.disp_lo.unwrap_or(0);
        let disp_hi = self.disp_hi.unwrap_or(0);

        self.modrm_is_segreg = dst == OperandSpec::SReg || src == OperandSpec::SReg;
        self.reg_operand = if self.modrm_is_segreg {
            Operand::SegReg(modrm.reg() & 0b11)
        } else if word {
            Operand::Reg16(modrm.reg())
        } else {
            Operand::Reg8(modrm.reg())
        };

        if modrm.mode() == 0b11 {
            self.rm_operand = if word {
                Operand::Reg16(modrm.rm())
            } else {
                Operand::Reg8(modrm.rm())
            };
        } else {
            let rf = &self.register_file;
            let (base, default_seg, cost) = match modrm.rm() {
                0b000 => (rf.get(Register::BX).wrapping_add(rf.get(Register::SI)), SReg::DS, 7),
                0b001 => (rf.get(Register::BX).wrapping_add(rf.get(Register::DI)), SReg::DS, 8),
                0b010 => (rf.get(Register::BP).wrapping_add(rf.get(Register::SI)), SReg::SS, 8),
                0b011 => (rf.get(Register::BP).wrapping_add(rf.get(Register::DI)), SReg::SS, 7),
                0b100 => (rf.get(Register::SI), SReg::DS, 5),
                0b101 => (rf.get(Register::DI), SReg::DS, 5),
                0b110 if direct => (((disp_hi as u16) << 8) | disp_lo as u16, SReg::DS, 6),
                0b110 => (rf.get(Register::BP), SReg::SS, 5),
                _ => (rf.get(Register::BX), SReg::DS, 5),
            };
            if charge_ea {
                self.cycles += cost;
            }

            let mut ofs = base;
            match modrm.mode() {
                0b01 => {
                    ofs = ofs.wrapping_add(sext(disp_lo));
                    if charge_ea {
                        self.cycles += 4;
                    }
                }
                0b10 => {
                    ofs = ofs.wrapping_add(((disp_hi as u16) << 8) | disp_lo as u16);
                    if charge_ea {
                        self.cycles += 4;
                    }
                }
                _ => {}
            }

            let seg = self.prefix_g2.unwrap_or(default_seg);
            self.ea_offset = ofs;
            self.rm_operand = Operand::Mem(ea(self.register_file.get_sreg(seg), ofs));
        }

        Some(if src.is_immediate() {
            Stage::FetchImm
        } else {
            Stage::DecodeLoc
        })
    }

    fn stage_fetch_imm(&mut self) -> Option<Stage> {
        let entry = &OP_TABLE[self.opcode as usize];
        if self.imm_lo.is_none() {
            if self.queue.is_empty() {
                return None;
            }
            self.imm_lo = Some(self.dequeue_byte());
        }
        let lo = self.imm_lo.unwrap_or(0);

        if entry.word && entry.src == OperandSpec::Imm {
            if self.imm_hi.is_none() {
                if self.queue.is_empty() {
                    return None;
                }
                self.imm_hi = Some(self.dequeue_byte());
            }
            self.immediate = ((self.imm_hi.unwrap_or(0) as u32) << 8) | lo as u32;
        } else if entry.src == OperandSpec::Imm8 {
            self.immediate = sext(lo) as u32;
        } else {
            self.immediate = lo as u32;
        }

        Some(Stage::DecodeLoc)
    }

    fn stage_fetch_address(&mut self) -> Option<Stage> {
        let entry = &OP_TABLE[self.opcode as usize];
        if self.imm_lo.is_none() {
            if self.queue.is_empty() {
                return None;
            }
            self.imm_lo = Some(self.dequeue_byte());
        }
        if self.imm_hi.is_none() {
            if self.queue.is_empty() {
                return None;
            }
            self.imm_hi = Some(self.dequeue_byte());
        }
        let ofs = ((self.imm_hi.unwrap_or(0) as u32) << 8) | self.imm_lo.unwrap_or(0) as u32;

        if entry.src == OperandSpec::SegOff {
            if self.segofs_lo.is_none() {
                if self.queue.is_empty() {
                    return None;
                }
                self.segofs_lo = Some(self.dequeue_byte());
            }
            if self.segofs_hi.is_none() {
                if self.queue.is_empty() {
                    return None;
                }
                self.segofs_hi = Some(self.dequeue_byte());
            }
            self.immediate = ((self.segofs_hi.unwrap_or(0) as u32) << 24)
                | ((self.segofs_lo.unwrap_or(0) as u32) << 16)
                | ofs;
        } else {
            self.immediate = ofs;
        }

        Some(Stage::DecodeLoc)
    }

    fn stage_decode_loc(&mut self) -> Option<Stage> {
        let entry = &OP_TABLE[self.opcode as usize];
        self.destination = self.resolve_operand(entry.dst);
        self.source = self.resolve_operand(entry.src);
        Some(Stage::Executing)
    }

    fn stage_execute(&mut self, bus: &mut impl Bus) {
        let entry = &OP_TABLE[self.opcode as usize];
        if entry.string_op && self.repeat {
            // The whole repeat loop runs inside this tick; interrupt
            // sampling between iterations is not modeled.
            loop {
                let cx = self.register_file.get(Register::CX);
                if cx == 0 {
                    break;
                }
                self.register_file.set(Register::CX, cx.wrapping_sub(1));
                self.destination = self.resolve_operand(entry.dst);
                self.source = self.resolve_operand(entry.src);
                self.dispatch(entry.kind, bus);
                if matches!(entry.kind, OpKind::Cmps | OpKind::Scas) {
                    let zf = self.register_file.get_zf();
                    match self.prefix_g1 {
                        Some(G1Prefix::Repz) if !zf => break,
                        Some(G1Prefix::Repnz) if zf => break,
                        _ => {}
                    }
                }
            }
        } else {
            self.dispatch(entry.kind, bus);
        }

        // The dispatching tick itself counts against the charge.
        self.cycles = self.cycles.saturating_sub(1);
        self.retired += 1;
        self.reset_decode_state();
    }

    pub(crate) fn resolve_operand(&self, spec: OperandSpec) -> Operand {
        use OperandSpec as S;
        match spec {
            S::Ax => Operand::Reg16(0),
            S::Cx => Operand::Reg16(1),
            S::Dx => Operand::Reg16(2),
            S::Bx => Operand::Reg16(3),
            S::Sp => Operand::Reg16(4),
            S::Bp => Operand::Reg16(5),
            S::Si => Operand::Reg16(6),
            S::Di => Operand::Reg16(7),
            S::Es => Operand::SegReg(0),
            S::Cs => Operand::SegReg(1),
            S::Ss => Operand::SegReg(2),
            S::Ds => Operand::SegReg(3),
            S::Al => Operand::Reg8(0),
            S::Cl => Operand::Reg8(1),
            S::Dl => Operand::Reg8(2),
            S::Bl => Operand::Reg8(3),
            S::Ah => Operand::Reg8(4),
            S::Ch => Operand::Reg8(5),
            S::Dh => Operand::Reg8(6),
            S::Bh => Operand::Reg8(7),
            S::Imm | S::Imm8 | S::SegOff => Operand::Imm(self.immediate),
            S::Rm => self.rm_operand,
            S::Reg | S::SReg => self.reg_operand,
            S::Addr => {
                let seg = self.prefix_g2.unwrap_or(SReg::DS);
                Operand::Mem(ea(self.register_file.get_sreg(seg), self.immediate as u16))
            }
            S::StrSrc => {
                let seg = self.prefix_g2.unwrap_or(SReg::DS);
                Operand::Str(ea(
                    self.register_file.get_sreg(seg),
                    self.register_file.get(Register::SI),
                ))
            }
            S::StrDst => Operand::Str(ea(
                self.register_file.get_sreg(SReg::ES),
                self.register_file.get(Register::DI),
            )),
            S::None => Operand::None,
        }
    }

    /// Read through a resolved location. Word-wide memory access at an
    /// odd address pays the extra bus transaction.
    pub(crate) fn loc_read(&mut self, bus: &impl Bus, loc: Operand, w: Width) -> u16 {
        match loc {
            Operand::Reg8(i) => self.register_file.get8(i) as u16,
            Operand::Reg16(i) => self.register_file.get16(i),
            Operand::SegReg(i) => self.register_file.get_sreg_idx(i),
            Operand::Mem(a) | Operand::Str(a) => match w {
                Width::W8 => bus.read_byte(a) as u16,
                Width::W16 => {
                    if a & 1 != 0 {
                        self.cycles += 4;
                    }
                    bus.read_word(a)
                }
            },
            Operand::Imm(v) => v as u16 & w.mask(),
            Operand::None => 0,
        }
    }

    pub(crate) fn loc_write(&mut self, bus: &mut impl Bus, loc: Operand, w: Width, v: u16) {
        match loc {
            Operand::Reg8(i) => self.register_file.set8(i, v as u8),
            Operand::Reg16(i) => self.register_file.set16(i, v),
            Operand::SegReg(i) => self.register_file.set_sreg_idx(i, v),
            Operand::Mem(a) | Operand::Str(a) => match w {
                Width::W8 => bus.write_byte(a, v as u8),
                Width::W16 => {
                    if a & 1 != 0 {
                        self.cycles += 4;
                    }
                    bus.write_word(a, v);
                }
            },
            Operand::Imm(_) | Operand::None => {}
        }
    }

    pub(crate) fn push_word(&mut self, bus: &mut impl Bus, v: u16) {
        let sp = self.register_file.get(Register::SP).wrapping_sub(2);
        self.register_file.set(Register::SP, sp);
        let addr = ea(self.register_file.get(Register::SS), sp);
        self.loc_write(bus, Operand::Mem(addr), Width::W16, v);
    }

    pub(crate) fn pop_word(&mut self, bus: &mut impl Bus) -> u16 {
        let sp = self.register_file.get(Register::SP);
        let addr = ea(self.register_file.get(Register::SS), sp);
        let v = self.loc_read(bus, Operand::Mem(addr), Width::W16);
        self.register_file.set(Register::SP, sp.wrapping_add(2));
        v
    }

    /// Retarget execution within the current code segment. Flushes the
    /// prefetch queue and restarts the BIU with the flush penalty.
    pub(crate) fn jump(&mut self, target: u16) {
        log::trace!(
            "control transfer to {:04X}:{:04X}",
            self.register_file.get(Register::CS),
            target
        );
        self.ip = target;
        self.current_ip = target;
        self.queue.flush();
        self.biu_cycles = 4;
    }

    pub(crate) fn jump_far(&mut self, seg: u16, target: u16) {
        self.register_file.set(Register::CS, seg);
        self.jump(target);
    }

    fn dequeue_byte(&mut self) -> u8 {
        let byte = self.queue.dequeue();
        self.current_ip = self.current_ip.wrapping_add(1);
        byte
    }

    /// Invalidate all per-instruction scratch so stale operands can
    /// never leak into the next instruction.
    fn reset_decode_state(&mut self) {
        self.stage = Stage::Ready;
        self.opcode = 0;
        self.modrm = None;
        self.disp_lo = None;
        self.disp_hi = None;
        self.imm_lo = None;
        self.imm_hi = None;
        self.segofs_lo = None;
        self.segofs_hi = None;
        self.immediate = 0;
        self.ea_offset = 0;
        self.rm_operand = Operand::None;
        self.reg_operand = Operand::None;
        self.destination = Operand::None;
        self.source = Operand::None;
        self.prefix_g1 = None;
        self.prefix_g2 = None;
        self.repeat = false;
        self.modrm_is_segreg = false;
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

// Architectural register access, primarily for host setup and tests.
impl Cpu {
    pub fn set_ax(&mut self, v: u16) {
        self.register_file.set(Register::AX, v);
    }

    pub fn set_al(&mut self, v: u8) {
        self.register_file.set8(0, v);
    }

    pub fn set_ah(&mut self, v: u8) {
        self.register_file.set8(4, v);
    }

    pub fn set_cx(&mut self, v: u16) {
        self.register_file.set(Register::CX, v);
    }

    pub fn set_dx(&mut self, v: u16) {
        self.register_file.set(Register::DX, v);
    }

    pub fn set_bx(&mut self, v: u16) {
        self.register_file.set(Register::BX, v);
    }

    pub fn set_sp(&mut self, v: u16) {
        self.register_file.set(Register::SP, v);
    }

    pub fn set_bp(&mut self, v: u16) {
        self.register_file.set(Register::BP, v);
    }

    pub fn set_si(&mut self, v: u16) {
        self.register_file.set(Register::SI, v);
    }

    pub fn set_di(&mut self, v: u16) {
        self.register_file.set(Register::DI, v);
    }

    pub fn set_es(&mut self, v: u16) {
        self.register_file.set(Register::ES, v);
    }

    pub fn set_cs(&mut self, v: u16) {
        self.register_file.set(Register::CS, v);
    }

    pub fn set_ss(&mut self, v: u16) {
        self.register_file.set(Register::SS, v);
    }

    pub fn set_ds(&mut self, v: u16) {
        self.register_file.set(Register::DS, v);
    }

    /// Retarget the instruction pointer. Drops any prefetched bytes so
    /// both the BIU and the decoder see the new stream.
    pub fn set_ip(&mut self, v: u16) {
        self.ip = v;
        self.current_ip = v;
        self.queue.flush();
    }

    pub fn set_flags(&mut self, v: u16) {
        self.register_file.set_flags(v);
    }

    pub fn get_ax(&self) -> u16 {
        self.register_file.get(Register::AX)
    }

    pub fn get_al(&self) -> u8 {
        self.register_file.get8(0)
    }

    pub fn get_ah(&self) -> u8 {
        self.register_file.get8(4)
    }

    pub fn get_cx(&self) -> u16 {
        self.register_file.get(Register::CX)
    }

    pub fn get_dx(&self) -> u16 {
        self.register_file.get(Register::DX)
    }

    pub fn get_bx(&self) -> u16 {
        self.register_file.get(Register::BX)
    }

    pub fn get_sp(&self) -> u16 {
        self.register_file.get(Register::SP)
    }

    pub fn get_bp(&self) -> u16 {
        self.register_file.get(Register::BP)
    }

    pub fn get_si(&self) -> u16 {
        self.register_file.get(Register::SI)
    }

    pub fn get_di(&self) -> u16 {
        self.register_file.get(Register::DI)
    }

    pub fn get_es(&self) -> u16 {
        self.register_file.get(Register::ES)
    }

    pub fn get_cs(&self) -> u16 {
        self.register_file.get(Register::CS)
    }

    pub fn get_ss(&self) -> u16 {
        self.register_file.get(Register::SS)
    }

    pub fn get_ds(&self) -> u16 {
        self.register_file.get(Register::DS)
    }

    /// The architectural instruction pointer (not the prefetch cursor).
    pub fn get_ip(&self) -> u16 {
        self.current_ip
    }

    pub fn get_flags(&self) -> u16 {
        self.register_file.get_flags()
    }

    pub fn prefetch_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    /// Drive the modeled TEST pin sampled by WAIT.
    pub fn set_test_input(&mut self, asserted: bool) {
        self.test_input = asserted;
    }

    pub fn instructions_retired(&self) -> u64 {
        self.retired
    }

    /// Execution cycles still owed by the last dispatched instruction.
    pub fn pending_cycles(&self) -> u32 {
        self.cycles
    }
}
