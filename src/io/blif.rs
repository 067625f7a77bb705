//! I/O for BLIF (Berkeley Logic Interchange Format) files.
//!
//! Overall statement shape: `.model`/`.inputs`/`.outputs`/`.latch`/
//! `.names`/`.end`, a name table built in one pass, gates resolved in a
//! second. Each `.names` cube set is matched against the known
//! primitive functions (AND/OR/NAND/NOR/XOR/XNOR/BUF/NOT/constant) by
//! full truth-table comparison, since a fault site needs a named
//! primitive, not an opaque function table.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};

use crate::error::{AtpgError, Result};
use crate::netlist::{GateKind, Netlist, Node, ParsedGate};

use super::utils::split_tokens;

enum Statement {
    Inputs(Vec<String>),
    Outputs(Vec<String>),
    Latch { input: String, output: String },
    Names { args: Vec<String>, cubes: Vec<(String, bool)> },
}

fn parse_statements<R: Read>(r: R) -> Result<Vec<Statement>> {
    let mut out = Vec::new();
    let mut cur_args: Option<Vec<String>> = None;
    let mut cur_cubes: Vec<(String, bool)> = Vec::new();

    fn flush(out: &mut Vec<Statement>, args: Option<Vec<String>>, cubes: Vec<(String, bool)>) {
        if let Some(args) = args {
            out.push(Statement::Names { args, cubes });
        }
    }

    for line in BufReader::new(r).lines() {
        let raw = line?;
        let t = raw.trim();
        if t.is_empty() || t.starts_with('#') {
            continue;
        }
        if let Some(rest) = t.strip_prefix(".names") {
            flush(&mut out, cur_args.take(), std::mem::take(&mut cur_cubes));
            cur_args = Some(split_tokens(rest, &[' ', '\t']));
            continue;
        }
        if let Some(rest) = t.strip_prefix(".inputs") {
            flush(&mut out, cur_args.take(), std::mem::take(&mut cur_cubes));
            out.push(Statement::Inputs(split_tokens(rest, &[' ', '\t'])));
            continue;
        }
        if let Some(rest) = t.strip_prefix(".outputs") {
            flush(&mut out, cur_args.take(), std::mem::take(&mut cur_cubes));
            out.push(Statement::Outputs(split_tokens(rest, &[' ', '\t'])));
            continue;
        }
        if let Some(rest) = t.strip_prefix(".latch") {
            flush(&mut out, cur_args.take(), std::mem::take(&mut cur_cubes));
            let toks = split_tokens(rest, &[' ', '\t']);
            if toks.len() < 2 {
                return Err(AtpgError::NetlistInvalid(format!(
                    "malformed .latch statement: {}",
                    t
                )));
            }
            out.push(Statement::Latch {
                input: toks[0].clone(),
                output: toks[1].clone(),
            });
            continue;
        }
        if t.starts_with(".model") || t.starts_with(".end") || t.starts_with(".exdc") {
            continue;
        }
        if t.starts_with('.') {
            return Err(AtpgError::UnsupportedGate(format!(
                "unsupported BLIF directive: {}",
                t
            )));
        }
        if cur_args.is_none() {
            return Err(AtpgError::NetlistInvalid(format!(
                "cube line outside any .names block: {}",
                t
            )));
        }
        let toks: Vec<&str> = t.split_whitespace().collect();
        let (pattern, out_bit) = match toks.len() {
            1 => ("", toks[0]),
            2 => (toks[0], toks[1]),
            _ => {
                return Err(AtpgError::NetlistInvalid(format!(
                    "malformed .names cube: {}",
                    t
                )))
            }
        };
        cur_cubes.push((pattern.to_string(), out_bit == "1"));
    }
    flush(&mut out, cur_args.take(), cur_cubes);
    Ok(out)
}

/// Expand a `.names` cube set (on-set rows only, `-` as don't-care) into
/// a dense truth table indexed by `sum(bit_i << i)` over the `n` inputs,
/// then match it against the known primitive functions. Falls back to
/// `UnsupportedGate` for anything else (a generic multi-output PLA or a
/// function with no single-primitive equivalent).
fn infer_gate(n_inputs: usize, cubes: &[(String, bool)]) -> Result<GateKind> {
    if n_inputs == 0 {
        // `.names out` with a single cube "1" (or "0") declares a
        // constant; `cubes` is then a single nullary row.
        let is_one = cubes.iter().any(|(_, v)| *v);
        return Ok(if is_one { GateKind::Const1 } else { GateKind::Const0 });
    }
    let rows = 1usize << n_inputs;
    let mut table = vec![false; rows];
    for (pattern, val) in cubes {
        if !*val {
            continue;
        }
        expand_cube(pattern, n_inputs, &mut |row| table[row] = true);
    }

    let popcount = |x: usize| x.count_ones() as usize;
    let all_ones = rows - 1;
    let candidate = |f: &dyn Fn(usize) -> bool| -> bool { (0..rows).all(|r| table[r] == f(r)) };

    if n_inputs == 1 {
        if candidate(&|r| r == 1) {
            return Ok(GateKind::Buf);
        }
        if candidate(&|r| r == 0) {
            return Ok(GateKind::Not);
        }
        if table.iter().all(|&b| b) {
            return Ok(GateKind::Const1);
        }
        if table.iter().all(|&b| !b) {
            return Ok(GateKind::Const0);
        }
    } else {
        if candidate(&|r| r == all_ones) {
            return Ok(GateKind::And);
        }
        if candidate(&|r| r != all_ones) {
            return Ok(GateKind::Nand);
        }
        if candidate(&|r| r != 0) {
            return Ok(GateKind::Or);
        }
        if candidate(&|r| r == 0) {
            return Ok(GateKind::Nor);
        }
        if candidate(&|r| popcount(r) % 2 == 1) {
            return Ok(GateKind::Xor);
        }
        if candidate(&|r| popcount(r) % 2 == 0) {
            return Ok(GateKind::Xnor);
        }
    }
    Err(AtpgError::UnsupportedGate(format!(
        "BLIF .names function over {} inputs matches no supported primitive",
        n_inputs
    )))
}

/// Expand a cube pattern (`0`/`1`/`-` per input position) into every
/// matching row index, calling `set` on each.
fn expand_cube(pattern: &str, n_inputs: usize, set: &mut impl FnMut(usize)) {
    debug_assert_eq!(pattern.len(), n_inputs);
    let chars: Vec<char> = pattern.chars().collect();
    let mut dash_positions = Vec::new();
    let mut base = 0usize;
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '1' => base |= 1 << i,
            '0' => {}
            '-' => dash_positions.push(i),
            _ => {}
        }
    }
    let combos = 1usize << dash_positions.len();
    for mask in 0..combos {
        let mut row = base;
        for (k, &pos) in dash_positions.iter().enumerate() {
            if (mask >> k) & 1 != 0 {
                row |= 1 << pos;
            }
        }
        set(row);
    }
}

/// Read a netlist in BLIF format.
pub fn read_blif<R: Read>(r: R) -> Result<Vec<ParsedGate>> {
    let statements = parse_statements(r)?;

    let mut inputs: Vec<String> = Vec::new();
    let mut outputs: Vec<String> = Vec::new();
    for s in &statements {
        match s {
            Statement::Inputs(v) => inputs.extend(v.iter().cloned()),
            Statement::Outputs(v) => outputs.extend(v.iter().cloned()),
            _ => {}
        }
    }

    let mut declared: HashMap<String, ()> = HashMap::new();
    let mut gates: Vec<ParsedGate> = Vec::new();
    for name in &inputs {
        gates.push(ParsedGate::new(name, GateKind::PrimaryInput, Vec::new()));
        declared.insert(name.clone(), ());
    }

    for s in &statements {
        match s {
            Statement::Inputs(_) | Statement::Outputs(_) => {}
            Statement::Latch { input, output } => {
                if declared.insert(output.clone(), ()).is_some() {
                    return Err(AtpgError::NetlistInvalid(format!(
                        "signal '{}' is defined twice",
                        output
                    )));
                }
                gates.push(ParsedGate::new_dff(
                    output,
                    GateKind::DffOutput,
                    Vec::new(),
                    output,
                ));
                gates.push(ParsedGate::new_dff(
                    format!("{}$D", output),
                    GateKind::DffInput,
                    vec![input.clone()],
                    output,
                ));
            }
            Statement::Names { args, cubes } => {
                if args.is_empty() {
                    return Err(AtpgError::NetlistInvalid(
                        ".names statement with no output".to_string(),
                    ));
                }
                let out_name = args.last().unwrap().clone();
                let fanin = args[..args.len() - 1].to_vec();
                if declared.insert(out_name.clone(), ()).is_some() {
                    return Err(AtpgError::NetlistInvalid(format!(
                        "signal '{}' is defined twice",
                        out_name
                    )));
                }
                let kind = infer_gate(fanin.len(), cubes)?;
                gates.push(ParsedGate::new(out_name, kind, fanin));
            }
        }
    }

    for o in &outputs {
        gates.push(ParsedGate::new(
            format!("{}$PO", o),
            GateKind::PrimaryOutput,
            vec![o.clone()],
        ));
    }

    Ok(gates)
}

/// Write `net` in BLIF format: one `.names` statement per combinational
/// gate (matching the primitive's on-set exactly, no don't-cares), one
/// `.latch` per register.
pub fn write_blif<W: Write>(w: &mut W, net: &Netlist) -> Result<()> {
    writeln!(w, ".model netlist")?;
    let input_names: Vec<String> = net.inputs().iter().map(|&i| display_name(net.node(i))).collect();
    writeln!(w, ".inputs {}", input_names.join(" "))?;
    let output_names: Vec<String> = net
        .outputs()
        .iter()
        .map(|&o| display_name(net.node(o)))
        .collect();
    writeln!(w, ".outputs {}", output_names.join(" "))?;

    for &(d, q) in net.dffs() {
        let driver = net.node(d).fanin[0];
        writeln!(
            w,
            ".latch {} {}",
            display_name(net.node(driver)),
            display_name(net.node(q))
        )?;
    }

    for node in net.nodes() {
        match node.kind {
            GateKind::PrimaryInput
            | GateKind::PrimaryOutput
            | GateKind::DffInput
            | GateKind::DffOutput => continue,
            GateKind::Const0 => {
                writeln!(w, ".names {}", display_name(node))?;
            }
            GateKind::Const1 => {
                writeln!(w, ".names {}", display_name(node))?;
                writeln!(w, "1")?;
            }
            _ => {
                let arg_names: Vec<String> = node.fanin.iter().map(|&f| display_name(net.node(f))).collect();
                writeln!(w, ".names {} {}", arg_names.join(" "), display_name(node))?;
                write_cubes(w, node.kind, node.fanin.len())?;
            }
        }
    }
    writeln!(w, ".end")?;
    Ok(())
}

fn write_cubes<W: Write>(w: &mut W, kind: GateKind, n: usize) -> Result<()> {
    match kind {
        GateKind::Buf => writeln!(w, "1 1")?,
        GateKind::Not => writeln!(w, "0 1")?,
        GateKind::And => writeln!(w, "{} 1", "1".repeat(n))?,
        GateKind::Nand => writeln!(w, "{} 0", "1".repeat(n))?,
        GateKind::Or => writeln!(w, "{} 0", "0".repeat(n))?,
        GateKind::Nor => writeln!(w, "{} 1", "0".repeat(n))?,
        GateKind::Xor | GateKind::Xnor => {
            for row in 0..(1usize << n) {
                let parity = (row.count_ones() as usize) % 2 == 1;
                let want = if kind == GateKind::Xor { parity } else { !parity };
                if want {
                    let bits: String = (0..n).map(|i| if (row >> i) & 1 != 0 { '1' } else { '0' }).collect();
                    writeln!(w, "{} 1", bits)?;
                }
            }
        }
        _ => unreachable!("gate kind has no .names cube representation"),
    }
    Ok(())
}

fn display_name(node: &Node) -> String {
    node.name.clone().unwrap_or_else(|| node.id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_simple_and() {
        let blif = "
.model top
.inputs a b
.outputs y
.names a b y
11 1
.end
";
        let gates = read_blif(blif.as_bytes()).unwrap();
        let net = Netlist::build(gates).unwrap();
        assert_eq!(net.inputs().len(), 2);
        assert_eq!(net.outputs().len(), 1);
        let and_node = net.nodes().iter().find(|n| n.kind == GateKind::And);
        assert!(and_node.is_some());
    }

    #[test]
    fn test_read_xor_full_expansion() {
        let blif = "
.model top
.inputs a b
.outputs y
.names a b y
10 1
01 1
.end
";
        let gates = read_blif(blif.as_bytes()).unwrap();
        let net = Netlist::build(gates).unwrap();
        assert!(net.nodes().iter().any(|n| n.kind == GateKind::Xor));
    }

    #[test]
    fn test_read_latch() {
        let blif = "
.model top
.inputs clk_in
.outputs q
.latch d q
.names clk_in d
1 1
.end
";
        let gates = read_blif(blif.as_bytes()).unwrap();
        let net = Netlist::build(gates).unwrap();
        assert_eq!(net.dffs().len(), 1);
    }

    #[test]
    fn test_write_then_read_roundtrip() {
        let blif = "
.model top
.inputs a b
.outputs y
.names a b y
11 1
.end
";
        let gates = read_blif(blif.as_bytes()).unwrap();
        let net = Netlist::build(gates).unwrap();
        let mut buf = Vec::new();
        write_blif(&mut buf, &net).unwrap();
        let rewritten = String::from_utf8(buf).unwrap();
        let gates2 = read_blif(rewritten.as_bytes()).unwrap();
        let net2 = Netlist::build(gates2).unwrap();
        assert_eq!(net.stats().nb_nodes, net2.stats().nb_nodes);
    }
}
