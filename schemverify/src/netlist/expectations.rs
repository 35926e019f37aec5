//! Board-level connectivity assertions checked against a built [`Netlist`].

use serde::{Deserialize, Serialize};

use super::Netlist;

/// Pairs that must share a net, identifiers that must appear in some net,
/// and pairs that must never share one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionTable {
    pub expected: Vec<(String, String)>,
    pub required: Vec<String>,
    pub isolated: Vec<(String, String)>,
}

impl ConnectionTable {
    pub fn is_empty(&self) -> bool {
        self.expected.is_empty() && self.required.is_empty() && self.isolated.is_empty()
    }

    /// Root-sheet wiring of the 8-byte RAM prototype.
    pub fn ram_prototype() -> Self {
        let mut expected = Vec::new();

        for i in 0..8 {
            let decoder = format!("Address Decoder:SEL{}", i);
            expected.push((decoder.clone(), format!("Write Clk Gen:SEL{}", i)));
            expected.push((decoder, format!("Read OE Gen:SEL{}", i)));
        }
        expected.push((
            "Control Logic:WRITE_ACTIVE".to_string(),
            "Write Clk Gen:WRITE_ACTIVE".to_string(),
        ));
        expected.push((
            "Control Logic:READ_EN".to_string(),
            "Read OE Gen:READ_EN".to_string(),
        ));
        for i in 0..8 {
            expected.push((
                format!("Write Clk Gen:WRITE_CLK_{}", i),
                format!("Byte {}:WRITE_CLK", i),
            ));
        }
        for i in 0..8 {
            expected.push((
                format!("Read OE Gen:BUF_OE_{}", i),
                format!("Byte {}:BUF_OE", i),
            ));
        }
        // data bus: every byte's D<bit> pin rides the shared D<bit> label
        for bit in 0..8 {
            for byte in 0..8 {
                expected.push((format!("label:D{}", bit), format!("Byte {}:D{}", byte, bit)));
            }
        }

        let mut required: Vec<String> = (0..3).map(|i| format!("Address Decoder:A{}", i)).collect();
        required.extend(["nCE", "nOE", "nWE"].iter().map(|s| format!("Control Logic:{}", s)));

        let isolated = [
            ("Address Decoder:A0", "Address Decoder:A1"),
            ("Address Decoder:A0", "Address Decoder:A2"),
            ("Address Decoder:A1", "Address Decoder:A2"),
            ("Control Logic:nCE", "Control Logic:nOE"),
            ("Control Logic:nCE", "Control Logic:nWE"),
            ("Control Logic:nOE", "Control Logic:nWE"),
            ("Address Decoder:SEL0", "Address Decoder:SEL1"),
            ("Address Decoder:SEL0", "Address Decoder:SEL7"),
            ("Write Clk Gen:WRITE_CLK_0", "Write Clk Gen:WRITE_CLK_1"),
            ("Write Clk Gen:WRITE_CLK_0", "Write Clk Gen:WRITE_CLK_7"),
            ("Read OE Gen:BUF_OE_0", "Read OE Gen:BUF_OE_1"),
            ("Read OE Gen:BUF_OE_0", "Read OE Gen:BUF_OE_7"),
            ("label:D0", "Address Decoder:A0"),
            ("label:D0", "Control Logic:nCE"),
            ("Control Logic:WRITE_ACTIVE", "Control Logic:READ_EN"),
        ]
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();

        Self {
            expected,
            required,
            isolated,
        }
    }
}

/// Expected pairs anchored on a label read as "`<b>` not on label `<text>` net".
pub fn check_netlist(netlist: &Netlist, table: &ConnectionTable) -> Vec<String> {
    let mut issues = Vec::new();

    for (a, b) in &table.expected {
        if netlist.on_same_net(a, b) {
            continue;
        }
        match a.strip_prefix("label:") {
            Some(text) => issues.push(format!("{} not on label {} net", b, text)),
            None => issues.push(format!("{} not connected to {}", a, b)),
        }
    }
    for id in &table.required {
        if !netlist.id_exists(id) {
            issues.push(format!("{} not found in any net", id));
        }
    }
    for (a, b) in &table.isolated {
        if netlist.on_same_net(a, b) {
            issues.push(format!("NET MERGE: {} and {} on same net!", a, b));
        }
    }

    issues
}
