//! I/O for ISCAS-89 `.bench` files.
//!
//! Statement collection into `(name, keyword, args)` triples, then a
//! single resolution pass against a name table, building [`ParsedGate`]s
//! with the flat [`GateKind`] set. `DFF(d)` (the only sequential
//! primitive ISCAS-89 bench files use) is split into a `DffOutput` (the
//! statement name itself, a PPI) paired with a synthetic `DffInput` sink
//! for `d` (a PPO).

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};

use crate::error::{AtpgError, Result};
use crate::netlist::{GateKind, Netlist, Node, ParsedGate};

use super::utils::{bench_keyword, split_tokens};

fn gate_kind(keyword: &str) -> Option<GateKind> {
    match keyword {
        "AND" => Some(GateKind::And),
        "NAND" => Some(GateKind::Nand),
        "OR" => Some(GateKind::Or),
        "NOR" => Some(GateKind::Nor),
        "XOR" => Some(GateKind::Xor),
        "XNOR" => Some(GateKind::Xnor),
        "BUF" | "BUFF" => Some(GateKind::Buf),
        "NOT" | "INV" => Some(GateKind::Not),
        _ => None,
    }
}

/// Read a netlist in `.bench` format, as used by the ISCAS-89
/// benchmarks. Statements look like:
/// ```text
///     # This is a comment
///     INPUT(i0)
///     INPUT(i1)
///     x0 = AND(i0, i1)
///     x1 = NAND(x0, i1)
///     x6 = gnd
///     x7 = vdd
///     f1 = DFF(x1)
///     OUTPUT(x0)
/// ```
/// `f1`'s statement both declares a PPI named `f1` and, via the
/// synthetic `f1$D` sink, a PPO fed by `x1`.
pub fn read_bench<R: Read>(r: R) -> Result<Vec<ParsedGate>> {
    let mut inputs: Vec<String> = Vec::new();
    let mut outputs: Vec<String> = Vec::new();
    let mut statements: Vec<(String, String, Vec<String>)> = Vec::new();

    for line in BufReader::new(r).lines() {
        let line = line?;
        let t = line.trim();
        if t.is_empty() || t.starts_with('#') {
            continue;
        }
        if !t.contains('=') {
            let parts = split_tokens(t, &['(', ')']);
            if parts.len() != 2 {
                return Err(AtpgError::NetlistInvalid(format!(
                    "malformed .bench directive: {}",
                    t
                )));
            }
            match parts[0].to_uppercase().as_str() {
                "INPUT" | "PINPUT" => inputs.push(parts[1].clone()),
                "OUTPUT" | "POUTPUT" => outputs.push(parts[1].clone()),
                other => {
                    return Err(AtpgError::NetlistInvalid(format!(
                        "unknown .bench directive: {}",
                        other
                    )))
                }
            }
        } else {
            let parts = split_tokens(t, &['=', '(', ',', ')']);
            if parts.len() < 2 {
                return Err(AtpgError::NetlistInvalid(format!(
                    "malformed .bench statement: {}",
                    t
                )));
            }
            let name = parts[0].clone();
            let keyword = parts[1].to_uppercase();
            let args = parts[2..].to_vec();
            statements.push((name, keyword, args));
        }
    }

    let mut gates: Vec<ParsedGate> = Vec::new();
    let mut declared: HashMap<String, ()> = HashMap::new();
    for name in &inputs {
        gates.push(ParsedGate::new(name, GateKind::PrimaryInput, Vec::new()));
        declared.insert(name.clone(), ());
    }

    // ABC-style naming for constant signals: referenced only if present
    // in a statement's argument list, so collect them lazily by
    // scanning every statement's args up front.
    let mut needs_vdd = false;
    let mut needs_gnd = false;
    for (_, keyword, args) in &statements {
        if keyword == "VDD" {
            needs_vdd = true;
        }
        if keyword == "VSS" || keyword == "GND" {
            needs_gnd = true;
        }
        for a in args {
            if a == "vdd" {
                needs_vdd = true;
            }
            if a == "gnd" {
                needs_gnd = true;
            }
        }
    }
    if needs_vdd && !declared.contains_key("vdd") {
        gates.push(ParsedGate::new("vdd", GateKind::Const1, Vec::new()));
        declared.insert("vdd".to_string(), ());
    }
    if needs_gnd && !declared.contains_key("gnd") {
        gates.push(ParsedGate::new("gnd", GateKind::Const0, Vec::new()));
        declared.insert("gnd".to_string(), ());
    }

    for (name, keyword, args) in &statements {
        if declared.insert(name.clone(), ()).is_some() {
            return Err(AtpgError::NetlistInvalid(format!(
                "signal '{}' is defined twice",
                name
            )));
        }
        match keyword.as_str() {
            "DFF" => {
                if args.len() != 1 {
                    return Err(AtpgError::NetlistInvalid(format!(
                        "DFF '{}' needs exactly one argument",
                        name
                    )));
                }
                gates.push(ParsedGate::new_dff(
                    name,
                    GateKind::DffOutput,
                    Vec::new(),
                    name,
                ));
                gates.push(ParsedGate::new_dff(
                    format!("{}$D", name),
                    GateKind::DffInput,
                    vec![args[0].clone()],
                    name,
                ));
            }
            // A bare constant statement like `x7 = gnd` parses as a
            // zero-argument "keyword" equal to the constant's own name.
            "VDD" => gates.push(ParsedGate::new(name, GateKind::Const1, Vec::new())),
            "GND" | "VSS" => gates.push(ParsedGate::new(name, GateKind::Const0, Vec::new())),
            other => {
                if let Some(kind) = gate_kind(other) {
                    if kind.min_arity() > args.len() {
                        return Err(AtpgError::NetlistInvalid(format!(
                            "'{}' ({}) needs at least {} inputs",
                            name,
                            other,
                            kind.min_arity()
                        )));
                    }
                    gates.push(ParsedGate::new(name, kind, args.clone()));
                } else {
                    return Err(AtpgError::UnsupportedGate(other.to_string()));
                }
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

/// Write `net` in `.bench` format. `PrimaryOutput`/`DffInput` nodes are
/// transparent wires in this representation, so their own statement is
/// skipped and the `OUTPUT`/DFF statement references their single fanin
/// directly.
pub fn write_bench<W: Write>(w: &mut W, net: &Netlist) -> Result<()> {
    writeln!(w, "# .bench (ISCAS-89) file")?;
    writeln!(w, "# Generated by this crate's netlist writer")?;
    for &i in net.inputs() {
        writeln!(w, "INPUT({})", display_name(net.node(i)))?;
    }
    writeln!(w)?;
    for &o in net.outputs() {
        let driver = net.node(o).fanin[0];
        writeln!(w, "OUTPUT({})", display_name(net.node(driver)))?;
    }
    writeln!(w)?;
    for node in net.nodes() {
        match node.kind {
            GateKind::PrimaryInput | GateKind::PrimaryOutput | GateKind::DffInput => continue,
            GateKind::DffOutput => {
                let d = net
                    .dffs()
                    .iter()
                    .find(|&&(_, q)| q == node.id)
                    .map(|&(d, _)| d)
                    .expect("DffOutput always has a paired DffInput");
                let driver = net.node(d).fanin[0];
                writeln!(w, "{} = DFF({})", display_name(node), display_name(net.node(driver)))?;
            }
            GateKind::Const0 => writeln!(w, "{} = gnd", display_name(node))?,
            GateKind::Const1 => writeln!(w, "{} = vdd", display_name(node))?,
            _ => {
                let args = node
                    .fanin
                    .iter()
                    .map(|&f| display_name(net.node(f)))
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(w, "{} = {}({})", display_name(node), bench_keyword(node.kind), args)?;
            }
        }
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
    fn test_basic_readwrite() {
        let example = "# .bench (ISCAS) file
INPUT(i0)
INPUT(i1)

OUTPUT(x0)
OUTPUT(x1)
OUTPUT(x2)
OUTPUT(x3)
OUTPUT(x4)
OUTPUT(x5)
OUTPUT(x6)

x0 = AND(i0, i1)
x1 = NAND(i0, i1)
x2 = OR(i0, i1)
x3 = NOR(i0, i1)
x4 = XOR(i0, i1)
x5 = BUF(i0)
x6 = NOT(i1)
x7 = NOT(x2)
";
        let gates = read_bench(example.as_bytes()).unwrap();
        let net = Netlist::build(gates).unwrap();
        assert_eq!(net.inputs().len(), 2);
        assert_eq!(net.outputs().len(), 7);

        let mut buf = Vec::new();
        write_bench(&mut buf, &net).unwrap();
        let rewritten = String::from_utf8(buf).unwrap();
        assert!(rewritten.contains("INPUT(i0)"));
    }

    #[test]
    fn test_dff_roundtrip() {
        let example = "
INPUT(ci)
OUTPUT(q)
q = DFF(ci)
";
        let gates = read_bench(example.as_bytes()).unwrap();
        let net = Netlist::build(gates).unwrap();
        assert_eq!(net.dffs().len(), 1);
        assert_eq!(net.ppis().len(), 2);
    }

    #[test]
    fn test_undefined_signal_errors() {
        let example = "
INPUT(i0)
OUTPUT(x0)
x0 = AND(i0, missing)
";
        let gates = read_bench(example.as_bytes()).unwrap();
        assert!(Netlist::build(gates).is_err());
    }
}
