use stilgar::bus::ram_bus::RamBus;
use stilgar::i8086::Cpu;

/// Reset CPU with `code` loaded at F000:FFF0 (physical 0xFFFF0) and
/// CS:IP pointing at it.
pub fn boot(code: &[u8]) -> (Cpu, RamBus) {
    let mut cpu = Cpu::new();
    let mut bus = RamBus::default();
    cpu.set_cs(0xF000);
    cpu.set_ip(0xFFF0);
    bus.load(0xFFFF0, code);
    (cpu, bus)
}

pub fn flag(cpu: &Cpu, mask: u16) -> bool {
    cpu.get_flags() & mask != 0
}
