//! lightflow - scenario runner
//!
//! Builds one pipeline per light from a scenario file (or the built-in
//! demo), dims the group pulse by pulse on a virtual clock and prints the
//! light levels after each pulse.
//!
//! ```text
//! lightflow [SCENARIO.toml] [--json]
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use lightflow::{
    config::ScenarioFile,
    device::{Device, DeviceId, SimulatedLight},
    dim::{DimAction, DimDirection, DimGroup},
    pipeline::{LightBinding, NodeContext, Pipeline, TimeoutNode, TransitionNode},
    scheduler::VirtualScheduler,
    types::{Parameters, Transition},
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// A light driven through its pipeline: the group writes the pipeline's
/// default value and reads the light's actual state.
struct PipelineLight {
    light: Arc<SimulatedLight>,
    pipeline: Arc<Pipeline<Transition>>,
}

impl Device for PipelineLight {
    fn id(&self) -> DeviceId {
        self.light.id()
    }

    fn parameters(&self) -> Parameters {
        self.light.parameters()
    }

    fn apply_transition(&self, transition: &Transition) {
        self.pipeline.set_default(Some(transition.clone()));
    }

    fn children(&self) -> Vec<Arc<dyn Device>> {
        Vec::new()
    }
}

#[derive(Serialize)]
struct PulseReport {
    at_ms: u128,
    direction: DimDirection,
    actions: Vec<(DeviceId, DimAction)>,
    levels: BTreeMap<DeviceId, f64>,
}

/// Run a light scenario on a virtual clock and print per-pulse levels.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scenario file (TOML); the built-in demo runs when omitted
    scenario: Option<PathBuf>,

    /// Print the pulse reports as JSON
    #[arg(long)]
    json: bool,
}

fn run(scenario: &ScenarioFile) -> Result<Vec<PulseReport>> {
    let scheduler = Arc::new(VirtualScheduler::new());

    let mut lights = Vec::new();
    let mut pipelines = Vec::new();
    let mut bindings = Vec::new();
    let mut members: Vec<Arc<dyn Device>> = Vec::new();

    for config in &scenario.lights {
        let light = Arc::new(SimulatedLight::new(config.id.as_str(), config.initial()));
        let ctx = NodeContext::new(config.id.as_str(), scheduler.clone(), scenario.engine.clone());

        let pipeline = Arc::new(Pipeline::new(config.id.clone()));
        pipeline.set_default(Some(Transition::instant(config.initial())));
        pipeline.register_node(TimeoutNode::wrap_idle(&ctx, TransitionNode::new(&ctx)));
        bindings.push(LightBinding::bind(pipeline.clone(), light.clone()));

        if scenario.group.members.contains(&config.id) {
            members.push(Arc::new(PipelineLight {
                light: light.clone(),
                pipeline: pipeline.clone(),
            }));
        }
        lights.push(light);
        pipelines.push(pipeline);
    }

    let order: Vec<DeviceId> = scenario
        .group
        .effective_dim_order()
        .iter()
        .map(|id| DeviceId::from(id.as_str()))
        .collect();
    let group = DimGroup::new(&members, &order, scenario.engine.dim.clone())
        .with_context(|| format!("building group '{}'", scenario.group.name))?;

    let mut reports = Vec::new();
    for pulse in &scenario.pulses {
        for _ in 0..pulse.count {
            let actions = group.pulse(pulse.direction);
            scheduler.advance_by(Duration::from_millis(pulse.interval_ms));
            reports.push(PulseReport {
                at_ms: scheduler.elapsed().as_millis(),
                direction: pulse.direction,
                actions,
                levels: lights.iter().map(|l| (l.id(), l.brightness())).collect(),
            });
        }
    }

    drop(bindings);
    for pipeline in &pipelines {
        let report = pipeline.dispose();
        if !report.is_clean() {
            tracing::warn!("Pipeline '{}' left {} failures on dispose", pipeline.name(), report.failures.len());
        }
    }
    Ok(reports)
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,lightflow=debug")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let scenario = match &args.scenario {
        Some(path) => ScenarioFile::load(path).with_context(|| format!("loading scenario {}", path.display()))?,
        None => {
            tracing::info!("No scenario given, running the built-in demo");
            ScenarioFile::demo()
        }
    };

    tracing::info!(
        "Running group '{}' with {} lights and {} pulse runs",
        scenario.group.name,
        scenario.lights.len(),
        scenario.pulses.len()
    );
    let reports = run(&scenario)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            let levels: Vec<String> = report
                .levels
                .iter()
                .map(|(id, b)| format!("{}={:>3}", id, b))
                .collect();
            println!("{:>6}ms {:<8} {}", report.at_ms, report.direction.to_string(), levels.join(" "));
        }
    }
    Ok(())
}
