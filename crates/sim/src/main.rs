mod config;
mod simulation;

use anyhow::Result;
use clap::Parser;

use config::SimConfig;
use simulation::Simulation;
use stance::PacketLossSimulation;

#[derive(Parser)]
#[command(name = "stance-sim")]
#[command(about = "Headless authority/client run of the posture and weapon state machines")]
struct Args {
    #[arg(short, long, default_value_t = 60)]
    tick_rate: u32,

    #[arg(short, long, default_value_t = 12.0, help = "Simulated seconds")]
    duration: f32,

    #[arg(long, default_value_t = 0x5EED)]
    seed: u64,

    #[arg(long, help = "Enable packet loss and latency simulation")]
    simulate_packet_loss: bool,

    #[arg(long, default_value_t = 0.0, help = "Packet loss percentage (0-100)")]
    loss_percent: f32,

    #[arg(long, default_value_t = 0, help = "Minimum latency in ms")]
    min_latency: u32,

    #[arg(long, default_value_t = 0, help = "Maximum latency in ms")]
    max_latency: u32,

    #[arg(long, default_value_t = 0, help = "Jitter in ms")]
    jitter: u32,

    #[arg(long, help = "Spawn under a ceiling too low to stand up")]
    low_ceiling: bool,

    #[arg(long, help = "Weapon rounds per minute")]
    rpm: Option<f32>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let network = args.simulate_packet_loss.then(|| PacketLossSimulation {
        enabled: true,
        loss_rate: (args.loss_percent / 100.0).clamp(0.0, 1.0),
        min_latency_ms: args.min_latency,
        max_latency_ms: args.max_latency,
        jitter_ms: args.jitter,
    });

    let mut config = SimConfig {
        tick_rate: args.tick_rate,
        duration: args.duration,
        seed: args.seed,
        network,
        low_ceiling: args.low_ceiling,
        ..Default::default()
    };
    if let Some(rpm) = args.rpm {
        config.weapon.rpm = rpm;
    }

    log::info!(
        "running {:.1}s at {} Hz (seed {:#x})",
        config.duration,
        config.tick_rate,
        config.seed
    );

    let summary = Simulation::new(config)?.run()?;

    log::info!(
        "{} ticks ({:.2}s), {} rejected inputs, owner rtt {:.0} ms",
        summary.ticks,
        summary.sim_time,
        summary.rejected_inputs,
        summary.owner_rtt * 1000.0
    );
    for peer in &summary.peers {
        log::info!(
            "[{:>8}] posture {:?} sprinting {} clip {:?} weapon {:?} shots {} walked {:.1}m",
            peer.name,
            peer.posture,
            peer.sprinting,
            peer.clip,
            peer.weapon_state,
            peer.shots,
            peer.distance
        );
    }

    Ok(())
}
