//! Lifts a parsed `.kicad_sym` tree into `symbol_name -> SymbolDefinition`.
//!
//! Library files are read-only inputs (spec: "`.kicad_sym` — library files;
//! read-only") so this parser only needs the structural read path, not the
//! span-preserving write path `kicad-io` uses for schematics.

use std::collections::HashMap;

use sexpr_codec::{ListNode, Tree};

use crate::error::{Result, SymbolLibraryError};
use crate::types::{ElectricalType, PinDefinition, SymbolDefinition};

pub fn parse_library(path: &str, tree: &Tree) -> Result<HashMap<String, SymbolDefinition>> {
    let root = tree.root.as_list().ok_or_else(|| SymbolLibraryError::MalformedSymbol {
        path: path.to_string(),
        symbol: String::new(),
        reason: "top-level form is not a list".to_string(),
    })?;

    let mut out = HashMap::new();
    for child in root.fields("symbol") {
        let def = parse_symbol(path, child)?;
        out.insert(def.name.clone(), def);
    }
    Ok(out)
}

fn parse_symbol(path: &str, list: &ListNode) -> Result<SymbolDefinition> {
    let name = list
        .atom(1)
        .map(|a| a.as_str().to_string())
        .ok_or_else(|| SymbolLibraryError::MalformedSymbol {
            path: path.to_string(),
            symbol: "<unnamed>".to_string(),
            reason: "missing symbol name atom".to_string(),
        })?;

    let extends = list.field("extends").and_then(|l| l.atom(1)).map(|a| a.as_str().to_string());

    let default_footprint = list
        .fields("property")
        .find(|p| p.atom(1).map(|a| a.as_str()) == Some("Footprint"))
        .and_then(|p| p.atom(2))
        .map(|a| a.as_str().to_string())
        .filter(|s| !s.is_empty());

    let mut pins = Vec::new();
    let mut max_unit = 1u32;
    let mut power_pins = 0usize;
    let mut total_pins = 0usize;

    for sub in list.fields("symbol") {
        let sub_name = sub.atom(1).map(|a| a.as_str()).unwrap_or("");
        let unit = unit_from_subsymbol_name(sub_name).unwrap_or(1);
        max_unit = max_unit.max(unit);

        for pin in sub.fields("pin") {
            let electrical_type = pin
                .atom(1)
                .map(|a| ElectricalType::from_kicad_str(a.as_str()))
                .unwrap_or(ElectricalType::Unspecified);
            let position = pin
                .field("at")
                .map(|at| {
                    (
                        at.atom(1).and_then(|a| a.as_f64()).unwrap_or(0.0),
                        at.atom(2).and_then(|a| a.as_f64()).unwrap_or(0.0),
                    )
                })
                .unwrap_or((0.0, 0.0));
            let number = pin
                .field("number")
                .and_then(|n| n.atom(1))
                .map(|a| a.as_str().to_string())
                .unwrap_or_default();
            let pin_name = pin
                .field("name")
                .and_then(|n| n.atom(1))
                .map(|a| a.as_str().to_string())
                .unwrap_or_default();

            total_pins += 1;
            if matches!(electrical_type, ElectricalType::PowerIn | ElectricalType::PowerOut) {
                power_pins += 1;
            }

            pins.push(PinDefinition {
                number,
                name: pin_name,
                electrical_type,
                position,
                unit,
            });
        }
    }

    let power = total_pins > 0 && power_pins == total_pins || name.starts_with('#');

    Ok(SymbolDefinition::new(
        name,
        extends,
        max_unit,
        power,
        default_footprint,
        pins,
    ))
}

/// Sub-unit symbols are named `<Parent>_<unit>_<style>`, e.g. `R_0_1`. Unit
/// `0` means "shared across all units" and is not itself a distinct unit.
fn unit_from_subsymbol_name(name: &str) -> Option<u32> {
    let mut parts = name.rsplitn(3, '_');
    let _style = parts.next()?;
    let unit_str = parts.next()?;
    let unit: u32 = unit_str.parse().ok()?;
    if unit == 0 {
        None
    } else {
        Some(unit)
    }
}
