//! Runner for SingleStepTests-style CPU test suites
//! (https://github.com/SingleStepTests/8088): per-opcode gzipped JSON
//! files, each test giving initial registers/memory, the instruction
//! bytes, and the expected final state after one instruction.
//!
//! Usage: 8086-test-runner [test-directory]

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use stilgar::bus::ram_bus::RamBus;
use stilgar::bus::Bus;
use stilgar::i8086::{Cpu, FLAG_MASK};

#[derive(Debug, Deserialize)]
struct Metadata {
    opcodes: BTreeMap<String, OpcodeMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OpcodeMetadata {
    Single(TestMetadata),
    Group { reg: BTreeMap<String, TestMetadata> },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct TestMetadata {
    #[allow(dead_code)]
    status: String,
    flags_mask: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct Test {
    name: String,
    bytes: Vec<u8>,
    #[serde(rename = "initial")]
    initial_state: State,
    #[serde(rename = "final")]
    expected_state: State,
}

#[derive(Debug, Deserialize)]
struct State {
    regs: Registers,
    ram: Vec<(u32, u8)>,
}

/// Register images. The initial state carries every register; the
/// expected state only lists the ones the instruction may change.
#[derive(Debug, Default, Deserialize)]
struct Registers {
    ax: Option<u16>,
    bx: Option<u16>,
    cx: Option<u16>,
    dx: Option<u16>,
    cs: Option<u16>,
    ss: Option<u16>,
    ds: Option<u16>,
    es: Option<u16>,
    sp: Option<u16>,
    bp: Option<u16>,
    si: Option<u16>,
    di: Option<u16>,
    ip: Option<u16>,
    flags: Option<u16>,
}

const REG_NAMES: [&str; 13] = [
    "AX", "BX", "CX", "DX", "CS", "SS", "DS", "ES", "SP", "BP", "SI", "DI", "IP",
];

fn apply_initial_state(cpu: &mut Cpu, bus: &mut RamBus, state: &State) {
    let r = &state.regs;
    cpu.set_ax(r.ax.unwrap_or(0));
    cpu.set_bx(r.bx.unwrap_or(0));
    cpu.set_cx(r.cx.unwrap_or(0));
    cpu.set_dx(r.dx.unwrap_or(0));
    cpu.set_cs(r.cs.unwrap_or(0));
    cpu.set_ss(r.ss.unwrap_or(0));
    cpu.set_ds(r.ds.unwrap_or(0));
    cpu.set_es(r.es.unwrap_or(0));
    cpu.set_sp(r.sp.unwrap_or(0));
    cpu.set_bp(r.bp.unwrap_or(0));
    cpu.set_si(r.si.unwrap_or(0));
    cpu.set_di(r.di.unwrap_or(0));
    cpu.set_ip(r.ip.unwrap_or(0));
    cpu.set_flags(r.flags.unwrap_or(0));

    for &(addr, v) in &state.ram {
        bus.write_byte(addr, v);
    }
}

fn register_values(cpu: &Cpu) -> [u16; 13] {
    [
        cpu.get_ax(),
        cpu.get_bx(),
        cpu.get_cx(),
        cpu.get_dx(),
        cpu.get_cs(),
        cpu.get_ss(),
        cpu.get_ds(),
        cpu.get_es(),
        cpu.get_sp(),
        cpu.get_bp(),
        cpu.get_si(),
        cpu.get_di(),
        cpu.get_ip(),
    ]
}

fn expected_values(regs: &Registers) -> [Option<u16>; 13] {
    [
        regs.ax, regs.bx, regs.cx, regs.dx, regs.cs, regs.ss, regs.ds, regs.es, regs.sp, regs.bp,
        regs.si, regs.di, regs.ip,
    ]
}

fn flags_string(flags: u16) -> String {
    const NAMES: [(u16, char); 9] = [
        (1 << 11, 'O'),
        (1 << 10, 'D'),
        (1 << 9, 'I'),
        (1 << 8, 'T'),
        (1 << 7, 'S'),
        (1 << 6, 'Z'),
        (1 << 4, 'A'),
        (1 << 2, 'P'),
        (1 << 0, 'C'),
    ];
    NAMES
        .iter()
        .map(|&(mask, c)| if flags & mask != 0 { c } else { '-' })
        .collect()
}

fn run_test(test: &Test, flags_mask: u16) -> bool {
    let mut cpu = Cpu::new();
    let mut bus = RamBus::default();

    apply_initial_state(&mut cpu, &mut bus, &test.initial_state);
    cpu.step(&mut bus);

    let mut failures = Vec::new();

    let actual = register_values(&cpu);
    for (i, expected) in expected_values(&test.expected_state.regs).iter().enumerate() {
        if let Some(expected) = expected {
            if *expected != actual[i] {
                failures.push(format!(
                    "{} is {:04X}, expected {:04X}",
                    REG_NAMES[i], actual[i], expected
                ));
            }
        }
    }

    if let Some(expected_flags) = test.expected_state.regs.flags {
        let got = cpu.get_flags();
        if expected_flags & flags_mask != got & flags_mask {
            failures.push(format!(
                "FLAGS are {:04X} [{}], expected {:04X} [{}] (mask {:04X})",
                got,
                flags_string(got),
                expected_flags,
                flags_string(expected_flags),
                flags_mask,
            ));
        }
    }

    for &(addr, expected) in &test.expected_state.ram {
        let got = bus.read_byte(addr);
        if got != expected {
            failures.push(format!(
                "[{:06X}] is {:02X}, expected {:02X}",
                addr, got, expected
            ));
        }
    }

    if failures.is_empty() {
        return true;
    }

    let bytes: Vec<String> = test.bytes.iter().map(|b| format!("{b:02X}")).collect();
    println!("FAIL {} ({})", test.name, bytes.join(" "));
    for failure in failures {
        println!("    {failure}");
    }
    false
}

/// Parse "{op:02X}.json.gz" or "{op:02X}.{reg}.json.gz".
fn parse_file_name(name: &str) -> Option<(u8, Option<u8>)> {
    let base = name.strip_suffix(".json.gz")?;
    let (op, reg) = match base.split_once('.') {
        Some((op, reg)) => (op, Some(reg.parse().ok()?)),
        None => (base, None),
    };
    Some((u8::from_str_radix(op, 16).ok()?, reg))
}

fn load_tests(path: &Path) -> Result<Vec<Test>, Box<dyn std::error::Error>> {
    let file = std::fs::File::open(path)?;
    let mut json = String::new();
    flate2::read::GzDecoder::new(file).read_to_string(&mut json)?;
    Ok(serde_json::from_str(&json)?)
}

fn flags_mask_for(metadata: &Metadata, op: u8, reg: Option<u8>) -> u16 {
    let entry = metadata.opcodes.get(&format!("{op:02X}"));
    let test_metadata = match (entry, reg) {
        (Some(OpcodeMetadata::Single(m)), _) => Some(m),
        (Some(OpcodeMetadata::Group { reg: by_reg }), Some(r)) => by_reg.get(&r.to_string()),
        _ => None,
    };
    test_metadata
        .and_then(|m| m.flags_mask)
        .unwrap_or(FLAG_MASK)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("single-step-tests"));

    let metadata_json = std::fs::read_to_string(dir.join("metadata.json"))?;
    let metadata: Metadata = serde_json::from_str(&metadata_json)?;

    let mut entries: Vec<PathBuf> = std::fs::read_dir(&dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.to_string_lossy().ends_with(".json.gz"))
        .collect();
    entries.sort();

    let mut executed = 0u32;
    let mut passed = 0u32;

    for path in entries {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let Some((op, reg)) = parse_file_name(&name) else {
            continue;
        };
        let flags_mask = flags_mask_for(&metadata, op, reg);

        println!("Running {name}");
        for test in load_tests(&path)? {
            executed += 1;
            if run_test(&test, flags_mask) {
                passed += 1;
            }
        }
    }

    println!("Passed {passed}/{executed} tests");
    if passed != executed {
        std::process::exit(1);
    }
    Ok(())
}
