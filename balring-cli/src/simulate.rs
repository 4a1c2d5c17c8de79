use anyhow::{Context, Result};
use balring_core::config::{DEFAULT_LOWER_BOUND, DEFAULT_UPPER_BOUND, DEFAULT_VARIANCE_FACTOR};
use balring_core::{
    NodeId, Ring, RingConfig, RingError, RingHandle, RingReport, RingWorker, TracingSink,
};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(after_help = EXAMPLES_TEXT)]
pub struct Simulate {
    #[arg(
        long,
        short = 'c',
        help = "YAML file with `ring` and `simulation` sections. Flags override file values."
    )]
    pub config: Option<PathBuf>,

    #[arg(long, short = 'n', help = "Start with nodes 0..N. Default: 3")]
    pub nodes: Option<u64>,

    #[arg(long, help = "Max keys per node. Default: 35")]
    pub upper_bound: Option<usize>,

    #[arg(long, help = "Nodes dropping below this many keys are removed. Default: 5")]
    pub lower_bound: Option<usize>,

    #[arg(long, help = "Load skew tolerated between placement candidates. Default: 2")]
    pub variance_factor: Option<usize>,

    #[arg(
        long,
        help = "Fail insertions on a full ring instead of creating nodes"
    )]
    pub no_auto_create: bool,

    #[arg(long, short = 'k', help = "Keys inserted before the workload. Default: 246")]
    pub keys: Option<usize>,

    #[arg(long, short = 'i', help = "Random join/leave/move actions to run. Default: 5000")]
    pub iterations: Option<usize>,

    #[arg(long, short = 's', help = "Seed for the workload. Random when omitted")]
    pub seed: Option<u64>,

    #[arg(
        long,
        default_value_t = false,
        help = "Log every ring event through tracing (set RUST_LOG=debug to see key traffic)"
    )]
    pub trace_events: bool,

    #[arg(long, value_parser = ["json"], help = "Output format: json (default: plain)")]
    pub output: Option<String>,
}

const EXAMPLES_TEXT: &str = r#"
EXAMPLES:
    # Default ring: nodes 0..3, bounds 35/5, variance 2, 246 keys, 5000 actions
    balring-cli simulate --seed 42

    # Tight bounds on ten nodes
    balring-cli simulate --nodes 10 --upper-bound 10 --lower-bound 3 --keys 100 --iterations 200

    # Load settings from a file and print JSON
    balring-cli simulate --config ring.yaml --output json

    # Watch membership changes
    RUST_LOG=info balring-cli simulate --trace-events --iterations 100
"#;

/// Settings file layout
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulationFile {
    #[serde(default = "default_ring")]
    pub ring: RingConfig,
    #[serde(default)]
    pub simulation: SimulationSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulationSettings {
    #[serde(default = "default_keys")]
    pub keys: usize,
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_ring() -> RingConfig {
    RingConfig::new(
        0..3,
        DEFAULT_UPPER_BOUND,
        DEFAULT_LOWER_BOUND,
        DEFAULT_VARIANCE_FACTOR,
    )
}

fn default_keys() -> usize {
    246
}

fn default_iterations() -> usize {
    5000
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            keys: default_keys(),
            iterations: default_iterations(),
            seed: None,
        }
    }
}

impl Default for SimulationFile {
    fn default() -> Self {
        Self {
            ring: default_ring(),
            simulation: SimulationSettings::default(),
        }
    }
}

impl SimulationFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Applies command-line flags on top of the file values
    pub fn apply_overrides(&mut self, args: &Simulate) {
        if let Some(nodes) = args.nodes {
            self.ring.initial_nodes = (0..nodes).collect();
        }
        if let Some(upper_bound) = args.upper_bound {
            self.ring.upper_bound = upper_bound;
        }
        if let Some(lower_bound) = args.lower_bound {
            self.ring.lower_bound = lower_bound;
        }
        if let Some(variance_factor) = args.variance_factor {
            self.ring.variance_factor = variance_factor;
        }
        if args.no_auto_create {
            self.ring.auto_create_nodes = false;
        }
        if let Some(keys) = args.keys {
            self.simulation.keys = keys;
        }
        if let Some(iterations) = args.iterations {
            self.simulation.iterations = iterations;
        }
        if args.seed.is_some() {
            self.simulation.seed = args.seed;
        }
    }
}

/// How many of each workload action actually changed the ring
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ActionCounts {
    pub joins: usize,
    pub leaves: usize,
    pub moves: usize,
    /// Actions with nothing to act on: an empty ring, no eligible target, or no capacity
    pub skipped: usize,
}

#[derive(Debug, Serialize)]
struct SimulationOutcome {
    seed: u64,
    before: RingReport,
    after: RingReport,
    actions: ActionCounts,
}

pub async fn handle_simulate(simulate: Simulate) -> Result<()> {
    let mut settings = match &simulate.config {
        Some(path) => SimulationFile::load(path)?,
        None => SimulationFile::default(),
    };
    settings.apply_overrides(&simulate);

    let seed = settings
        .simulation
        .seed
        .unwrap_or_else(|| rand::rng().random());
    let mut ring: Ring<String> =
        Ring::new(settings.ring.clone()).context("invalid ring configuration")?;
    let upper_bound = ring.config().upper_bound;
    if simulate.trace_events {
        ring = ring.with_event_sink(TracingSink);
    }

    info!(
        seed,
        keys = settings.simulation.keys,
        iterations = settings.simulation.iterations,
        "starting simulation"
    );

    let (handle, worker) = RingWorker::spawn(ring);
    let mut workload = Workload::new(StdRng::seed_from_u64(seed), upper_bound);

    workload.fill(&handle, settings.simulation.keys).await?;
    let before = handle.report().await?;

    let actions = workload
        .run(&handle, settings.simulation.iterations)
        .await?;

    handle.shutdown().await?;
    let ring = worker.await.context("ring worker task failed")?;
    let after = ring.report();

    info!(
        nodes = after.nodes.len(),
        keys = after.total_keys,
        "simulation finished"
    );

    let outcome = SimulationOutcome {
        seed,
        before,
        after,
        actions,
    };

    if matches!(simulate.output.as_deref(), Some("json")) {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("Seed: {}", outcome.seed);
        println!("Before simulation:\n{}\n", outcome.before);
        println!(
            "After {} actions (joins: {}, leaves: {}, moves: {}, skipped: {}):\n{}",
            settings.simulation.iterations,
            outcome.actions.joins,
            outcome.actions.leaves,
            outcome.actions.moves,
            outcome.actions.skipped,
            outcome.after
        );
        if let (Some(min), Some(max)) = (outcome.after.min_load(), outcome.after.max_load()) {
            println!("Load range: {} to {} keys per node", min, max);
        }
    }

    Ok(())
}

/// Random client traffic: keys join, leave, or move to another node.
struct Workload {
    rng: StdRng,
    upper_bound: usize,
    live_keys: Vec<String>,
    next_key: u64,
}

impl Workload {
    fn new(rng: StdRng, upper_bound: usize) -> Self {
        Self {
            rng,
            upper_bound,
            live_keys: Vec::new(),
            next_key: 0,
        }
    }

    fn fresh_key(&mut self) -> String {
        let key = format!("key{}", self.next_key);
        self.next_key += 1;
        key
    }

    async fn fill(&mut self, handle: &RingHandle<String>, count: usize) -> Result<()> {
        for _ in 0..count {
            let key = self.fresh_key();
            handle
                .insert_key(key.clone())
                .await
                .with_context(|| format!("failed to place {}", key))?;
            self.live_keys.push(key);
        }
        Ok(())
    }

    async fn run(&mut self, handle: &RingHandle<String>, iterations: usize) -> Result<ActionCounts> {
        let mut counts = ActionCounts::default();

        for _ in 0..iterations {
            let applied = match self.rng.random_range(0..3) {
                0 => {
                    let applied = self.join(handle).await?;
                    counts.joins += usize::from(applied);
                    applied
                }
                1 => {
                    let applied = self.leave(handle).await?;
                    counts.leaves += usize::from(applied);
                    applied
                }
                _ => {
                    let applied = self.relocate(handle).await?;
                    counts.moves += usize::from(applied);
                    applied
                }
            };

            if !applied {
                counts.skipped += 1;
            }
        }

        Ok(counts)
    }

    async fn join(&mut self, handle: &RingHandle<String>) -> Result<bool> {
        let key = self.fresh_key();
        match handle.insert_key(key.clone()).await {
            Ok(node) => {
                debug!(key = %key, node_id = %node, "client joined");
                self.live_keys.push(key);
                Ok(true)
            }
            Err(RingError::NoCapacityAvailable) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn leave(&mut self, handle: &RingHandle<String>) -> Result<bool> {
        if self.live_keys.is_empty() {
            return Ok(false);
        }
        let idx = self.rng.random_range(0..self.live_keys.len());
        let key = self.live_keys.swap_remove(idx);
        let node = handle.remove_key(key.clone()).await?;
        debug!(key = %key, node_id = %node, "client left");
        Ok(true)
    }

    /// Remaps a random key onto a random other node that still has room.
    async fn relocate(&mut self, handle: &RingHandle<String>) -> Result<bool> {
        if self.live_keys.is_empty() {
            return Ok(false);
        }
        let key = self.live_keys[self.rng.random_range(0..self.live_keys.len())].clone();
        let current = handle.lookup(key.clone()).await?;
        let report = handle.report().await?;

        let candidates: Vec<NodeId> = report
            .nodes
            .iter()
            .filter(|n| n.node != current && n.load < self.upper_bound)
            .map(|n| n.node)
            .collect();
        if candidates.is_empty() {
            return Ok(false);
        }

        let target = candidates[self.rng.random_range(0..candidates.len())];
        handle.remap(key.clone(), target).await?;
        debug!(key = %key, from = %current, to = %target, "client moved");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        simulate: Simulate,
    }

    fn args(flags: &[&str]) -> Simulate {
        let mut argv = vec!["simulate"];
        argv.extend_from_slice(flags);
        TestCli::parse_from(argv).simulate
    }

    #[test]
    fn test_defaults_without_file() {
        let settings = SimulationFile::default();
        assert_eq!(settings.ring.initial_nodes, vec![0, 1, 2]);
        assert_eq!(settings.ring.upper_bound, 35);
        assert_eq!(settings.ring.lower_bound, 5);
        assert_eq!(settings.simulation.keys, 246);
        assert_eq!(settings.simulation.iterations, 5000);
        assert_eq!(settings.simulation.seed, None);
    }

    #[test]
    fn test_yaml_fills_missing_sections() {
        let yaml = r#"
ring:
  initial_nodes: [4, 5]
  upper_bound: 12
simulation:
  seed: 9
"#;
        let settings: SimulationFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.ring.initial_nodes, vec![4, 5]);
        assert_eq!(settings.ring.upper_bound, 12);
        assert_eq!(settings.ring.lower_bound, DEFAULT_LOWER_BOUND);
        assert_eq!(settings.simulation.keys, 246);
        assert_eq!(settings.simulation.seed, Some(9));

        let empty: SimulationFile = serde_yaml::from_str("{}").unwrap();
        assert_eq!(empty, SimulationFile::default());
    }

    #[test]
    fn test_flags_override_file_values() {
        let mut settings = SimulationFile::default();
        settings.apply_overrides(&args(&[
            "--nodes",
            "5",
            "--upper-bound",
            "10",
            "--keys",
            "20",
            "--seed",
            "3",
            "--no-auto-create",
        ]));

        assert_eq!(settings.ring.initial_nodes, vec![0, 1, 2, 3, 4]);
        assert_eq!(settings.ring.upper_bound, 10);
        assert_eq!(settings.ring.lower_bound, DEFAULT_LOWER_BOUND);
        assert!(!settings.ring.auto_create_nodes);
        assert_eq!(settings.simulation.keys, 20);
        assert_eq!(settings.simulation.iterations, 5000);
        assert_eq!(settings.simulation.seed, Some(3));
    }

    #[tokio::test]
    async fn test_workload_keeps_keys_conserved() {
        let ring: Ring<String> = Ring::new(RingConfig::new(0..3, 10, 2, 2)).unwrap();
        let (handle, worker) = RingWorker::spawn(ring);
        let mut workload = Workload::new(StdRng::seed_from_u64(11), 10);

        workload.fill(&handle, 30).await.unwrap();
        let counts = workload.run(&handle, 300).await.unwrap();
        assert_eq!(counts.joins + counts.leaves + counts.moves + counts.skipped, 300);

        let report = handle.report().await.unwrap();
        assert_eq!(report.total_keys, workload.live_keys.len());
        assert_eq!(report.total_load(), workload.live_keys.len());

        handle.shutdown().await.unwrap();
        let ring = worker.await.unwrap();
        for key in &workload.live_keys {
            assert!(ring.contains_key(key));
        }
    }
}
