//! Rebuild the netlist of a sheet and print the net of each identifier
//! given on the command line.
//!
//! cargo run --example net_query -- tests/fixtures/board/root.kicad_sch Producer:OUT label:D0

use schemverify::analyzer::SchematicData;
use schemverify::{parse_schematic, NetBuilder, VerifyError};
use std::path::Path;

fn main() -> Result<(), VerifyError> {
    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .unwrap_or_else(|| "tests/fixtures/board/root.kicad_sch".to_string());

    let schematic = parse_schematic(Path::new(&path))?;
    let netlist = NetBuilder::build(&SchematicData::from_schematic(&schematic));
    println!("{}: {} net(s)", path, netlist.len());

    let queries: Vec<String> = args.collect();
    if queries.is_empty() {
        for (i, net) in netlist.nets().iter().enumerate() {
            let members: Vec<&str> = net.iter().map(String::as_str).collect();
            println!("  net {}: {}", i, members.join(", "));
        }
        return Ok(());
    }

    for id in &queries {
        match netlist.net_of(id) {
            Some(net) => {
                let members: Vec<&str> = net.iter().map(String::as_str).collect();
                println!("  {} -> {}", id, members.join(", "));
            }
            None => println!("  {} -> not found in any net", id),
        }
    }
    Ok(())
}
