mod arena;
mod debug;
mod effects;
mod hitzone;
mod physics;
mod projectile;
mod session;

use clap::Parser;
use effects::RecordingEffects;
use glam::Vec3;
use hitzone::{HitCapsule, HitTarget, RemotePlayer};
use log::info;
use session::DuelSession;
use shared::{BulletData, HitZone, ImpactKind, Packet, PlayerId, ServerBulletId};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tokio::time::interval;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Simulated server round-trip latency in milliseconds
    #[arg(short = 'l', long, default_value = "80")]
    fake_ping: u64,

    /// Number of shots the scripted player fires
    #[arg(short = 's', long, default_value = "6")]
    shots: u32,

    /// Tick rate (updates per second)
    #[arg(short = 't', long, default_value = "60")]
    tick_rate: u32,
}

/// Stand-in authority for offline runs: assigns bullet ids, echoes shots
/// back after half the configured latency and rules on every other shot.
struct LoopbackServer {
    local_player: PlayerId,
    latency: Duration,
    next_bullet_id: ServerBulletId,
    pending: VecDeque<(Instant, Packet)>,
}

impl LoopbackServer {
    fn new(local_player: PlayerId, latency: Duration) -> Self {
        Self {
            local_player,
            latency,
            next_bullet_id: 1,
            pending: VecDeque::new(),
        }
    }

    /// Accepts a serialized client packet, exactly as the wire would.
    fn submit(&mut self, data: &[u8]) {
        let packet = match bincode::deserialize::<Packet>(data) {
            Ok(packet) => packet,
            Err(e) => {
                log::warn!("Loopback server dropped malformed packet: {}", e);
                return;
            }
        };

        if let Packet::ShootIntent {
            origin,
            direction,
            is_pellet,
        } = packet
        {
            let server_id = self.next_bullet_id;
            self.next_bullet_id += 1;
            let now = Instant::now();

            self.pending.push_back((
                now + self.latency / 2,
                Packet::ShotEcho {
                    player_id: self.local_player,
                    server_id,
                    bullet: BulletData {
                        origin,
                        direction,
                        is_pellet,
                    },
                },
            ));

            // Every other bullet is ruled a hit on the practice dummy.
            if server_id % 2 == 0 {
                self.pending.push_back((
                    now + self.latency,
                    Packet::BulletImpact {
                        server_id,
                        kind: ImpactKind::Player,
                        target_id: Some(2),
                        position: origin + direction * 12.0,
                        hit_zone: Some(HitZone::Head),
                    },
                ));
            }
        }
    }

    fn poll(&mut self) -> Vec<Packet> {
        let now = Instant::now();
        let mut due = Vec::new();
        while let Some((deadline, _)) = self.pending.front() {
            if *deadline > now {
                break;
            }
            if let Some((_, packet)) = self.pending.pop_front() {
                due.push(packet);
            }
        }
        due
    }

    fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting duel demo...");
    info!("Simulated latency: {}ms", args.fake_ping);

    let sink = Rc::new(RefCell::new(RecordingEffects::default()));
    let mut session = DuelSession::new(1, Box::new(Rc::clone(&sink)));
    let mut server = LoopbackServer::new(1, Duration::from_millis(args.fake_ping));

    // Duel setup: an arena around the origin and a practice dummy 12m out.
    session.handle_packet(Packet::ArenaAssign {
        index: 0,
        center: Vec3::ZERO,
        radius: 15.0,
        height: 6.0,
    });
    session.register_target(HitTarget::Remote(RemotePlayer {
        id: 2,
        hitbox: Some(HitCapsule::standard(Vec3::new(0.0, 0.0, 12.0))),
    }));
    session.set_debug_mode(true);
    info!(
        "Arena ready: {} bodies, {} debug meshes",
        session.physics().body_count(),
        session.physics().debug_mesh_count()
    );
    session.set_debug_mode(false);

    let dt = 1.0 / args.tick_rate as f32;
    let mut ticker = interval(Duration::from_millis(1000 / args.tick_rate as u64));

    let muzzle = Vec3::new(0.0, 1.6, 0.0);
    let aim = Vec3::Z;
    let mut shots_fired = 0u32;
    let mut tick = 0u64;
    let mut effects_printed = 0usize;
    let started = Instant::now();

    loop {
        ticker.tick().await;
        tick += 1;

        // The scripted player squeezes the trigger twice a second.
        if shots_fired < args.shots && tick % (args.tick_rate as u64 / 2).max(1) == 0 {
            let intent = session.fire_shot(muzzle, aim);
            server.submit(&bincode::serialize(&intent)?);
            shots_fired += 1;
        }

        for packet in server.poll() {
            session.handle_packet(packet);
        }

        session.update(dt);

        {
            let effects = sink.borrow();
            for effect in &effects.requests[effects_printed..] {
                info!("Effect: {:?} at {:?}", effect.kind, effect.position);
            }
            effects_printed = effects.requests.len();
        }

        let done = shots_fired == args.shots
            && server.is_idle()
            && session.projectiles().live_count() == 0;
        if done || started.elapsed() > Duration::from_secs(30) {
            break;
        }
    }

    let effects = sink.borrow();
    info!(
        "Done: {} shots, {} impacts, {} hit confirmations, {} effects total",
        shots_fired,
        effects.count_of(effects::EffectKind::Impact),
        effects.hit_audio_count(),
        effects.requests.len()
    );
    drop(effects);

    session.cleanup();
    Ok(())
}
