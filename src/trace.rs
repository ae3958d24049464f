use crate::instruction::Instruction;
use crate::{ADDRESS_BITS, NUM_CORES};
use color_eyre::eyre::{self, eyre, WrapErr};
use rayon::prelude::*;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Path of the trace file for one core: `<folder>/<base>_<core>.data`.
#[must_use]
pub fn trace_file_path(folder: &Path, base: &str, core: usize) -> PathBuf {
    folder.join(format!("{base}_{core}.data"))
}

/// Reads the per-core trace files for all cores, one file per core, in
/// parallel. The whole load fails on the first missing file or malformed
/// record; no partial results are returned.
pub fn load_traces(folder: &Path, base: &str) -> eyre::Result<Vec<Vec<Instruction>>> {
    (0..NUM_CORES)
        .into_par_iter()
        .map(|core| {
            let path = trace_file_path(folder, base, core);
            load_trace_file(&path)
                .wrap_err_with(|| format!("failed to load trace {}", path.display()))
        })
        .collect()
}

/// Parses one newline-separated `<opcode> <hex-value>` trace file.
pub fn load_trace_file(path: &Path) -> eyre::Result<Vec<Instruction>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut instructions = Vec::new();
    for (line_idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = parse_record(line)
            .wrap_err_with(|| format!("bad record on line {}: {line:?}", line_idx + 1))?;
        instructions.push(record);
    }
    log::debug!(
        "loaded {} instructions from {}",
        instructions.len(),
        path.display()
    );
    Ok(instructions)
}

/// One trace record. The value is hexadecimal for every opcode, compute
/// cycle counts included.
fn parse_record(line: &str) -> eyre::Result<Instruction> {
    let mut tokens = line.split_whitespace();
    let (Some(opcode), Some(value)) = (tokens.next(), tokens.next()) else {
        return Err(eyre!("expected `<opcode> <value>`"));
    };
    match opcode {
        "0" => Ok(Instruction::Load(address(parse_hex(value)?)?)),
        "1" => Ok(Instruction::Store(address(parse_hex(value)?)?)),
        "2" => Ok(Instruction::Compute(parse_hex(value)?)),
        other => Err(eyre!("unknown opcode {other:?}")),
    }
}

fn parse_hex(token: &str) -> eyre::Result<u64> {
    u64::from_str_radix(token.trim_start_matches("0x"), 16)
        .wrap_err_with(|| format!("bad hex value {token:?}"))
}

fn address(value: u64) -> eyre::Result<u32> {
    u32::try_from(value).wrap_err_with(|| {
        format!("address {value:#x} exceeds the {ADDRESS_BITS}-bit address space")
    })
}
