use anyhow::{bail, Result};
use balring_core::{reflect_and_reverse, Traversal};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(after_help = EXAMPLES_TEXT)]
pub struct Traverse {
    #[arg(long, short = 'n', help = "Number of ring positions")]
    pub nodes: usize,

    #[arg(
        long,
        short = 'l',
        help = "Number of positions to generate. Default: 10 times the ring size plus 8"
    )]
    pub length: Option<usize>,

    #[arg(
        long,
        default_value_t = false,
        help = "Also print the sequence reflected around the midpoint and reversed"
    )]
    pub reflect: bool,

    #[arg(long, value_parser = ["json"], help = "Output format: json (default: plain)")]
    pub output: Option<String>,
}

const EXAMPLES_TEXT: &str = r#"
EXAMPLES:
    # Visiting order on a 9 position ring
    balring-cli traverse --nodes 9 --length 17

    # Include the reflected and reversed sequence
    balring-cli traverse --nodes 17 --reflect

    # Machine readable output
    balring-cli traverse --nodes 5 --length 12 --output json
"#;

pub fn handle_traverse(traverse: Traverse) -> Result<()> {
    if traverse.nodes == 0 {
        bail!("--nodes must be at least 1");
    }

    let length = traverse.length.unwrap_or(traverse.nodes * 10 + 8);
    let mut traversal = Traversal::new(traverse.nodes);
    let run = traversal.generate(length);
    let reflected = traverse
        .reflect
        .then(|| reflect_and_reverse(&run.sequence, traverse.nodes));

    if matches!(traverse.output.as_deref(), Some("json")) {
        let mut value = serde_json::json!({
            "nodes": traverse.nodes,
            "k": traversal.k(),
            "sequence": run.sequence,
            "visits": run.visits,
        });
        if let Some(reflected) = reflected {
            value["reflected"] = serde_json::json!(reflected);
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Ring size: {}, k: {}", traverse.nodes, traversal.k());
    println!("Sequence: {}", join(&run.sequence));
    println!("Visits:");
    for (position, count) in &run.visits {
        println!("Position {}: {}", position, count);
    }
    if let Some(reflected) = reflected {
        println!("Reflected and reversed: {}", join(&reflected));
    }

    Ok(())
}

fn join(sequence: &[usize]) -> String {
    sequence
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
