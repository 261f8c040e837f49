use std::fmt::{self, Write};

use crate::router::RouterSnapshot;

/// Human-readable status of one router: neighbors, LSDB summary, routes.
pub fn render_status(snapshot: &RouterSnapshot) -> String {
    let mut output = String::new();
    // writing into a String cannot fail
    let _ = write_status(&mut output, snapshot);
    output
}

fn write_status(output: &mut String, snapshot: &RouterSnapshot) -> fmt::Result {
    writeln!(output, "Router {} ({})", snapshot.id, snapshot.protocol)?;
    writeln!(output)?;

    writeln!(output, "Neighbor Information:")?;
    writeln!(output, "{:<20} {:<10} {:<12} {:<8} {:<12}",
             "Router ID", "State", "Interface", "Level", "Last Hello")?;
    writeln!(output, "{}", "-".repeat(66))?;
    if snapshot.neighbors.is_empty() {
        writeln!(output, "No neighbors found")?;
    }
    for neighbor in &snapshot.neighbors {
        let level = neighbor.level.map(|l| l.to_string()).unwrap_or_else(|| "-".to_string());
        writeln!(output, "{:<20} {:<10} {:<12} {:<8} {:<12}",
                 neighbor.router_id,
                 neighbor.state.as_str(),
                 neighbor.interface,
                 level,
                 format!("{}s ago", neighbor.since_last_hello.as_secs()))?;
    }
    writeln!(output)?;

    writeln!(output, "Link State Database ({} records):", snapshot.lsdb.len())?;
    writeln!(output, "{:<20} {:<10} {:<8}", "Origin", "Sequence", "Links")?;
    writeln!(output, "{}", "-".repeat(40))?;
    for record in &snapshot.lsdb {
        writeln!(output, "{:<20} {:<10} {:<8}", record.origin, record.sequence, record.links.len())?;
    }
    writeln!(output)?;

    writeln!(output, "Routing Table:")?;
    writeln!(output, "{:<18} {:<15} {:<12} {:<8}",
             "Destination", "Next Hop", "Interface", "Cost")?;
    writeln!(output, "{}", "-".repeat(60))?;
    if snapshot.routing_table.is_empty() {
        writeln!(output, "No routes found")?;
    }
    for route in snapshot.routing_table.iter() {
        writeln!(output, "{:<18} {:<15} {:<12} {:<8}",
                 route.prefix(), route.next_hop, route.interface, route.cost)?;
    }

    Ok(())
}
