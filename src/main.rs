//! Nebula Strike headless demo
//!
//! Stands in for the game-logic collaborator: a patrolling player ship, a
//! marching enemy grid, pooled projectiles and particle bursts, all driven
//! through the fixed-timestep scheduler with real wall-clock timestamps. No
//! rendering; `render` logs a status line instead.
//!
//! Usage: `nebula-strike [tuning.json]` (RUST_LOG=info for the status feed)

use std::collections::HashMap;
use std::time::{Duration, Instant};

use glam::Vec2;
use log::{debug, info, warn};
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use nebula_strike::consts::MS_PER_SEC;
use nebula_strike::sim::{
    CallbackError, CollisionWorld, Entity, EntityId, EntityKind, IdAllocator, ObjectPool,
    Scheduler, SimError, Simulation, Size, SlotId,
};
use nebula_strike::tuning::{PoolTuning, Tuning};

/// World bounds (world units)
const WORLD_W: f32 = 800.0;
const WORLD_H: f32 = 600.0;

const PLAYER_Y: f32 = 560.0;
const PLAYER_PATROL_HZ: f32 = 0.2;
const FIRE_INTERVAL_MS: f64 = 350.0;
const PROJECTILE_SPEED: f32 = 420.0;
const ENEMY_SPEED: f32 = 60.0;
const ENEMY_DESCENT: f32 = 10.0;
const ENEMY_COLS: usize = 6;
const ENEMY_ROWS: usize = 3;
const PARTICLE_TTL_MS: f64 = 600.0;
const DEMO_DURATION_MS: f64 = 10_000.0;

/// All demo game state; implements [`Simulation`] for the scheduler.
struct DemoGame {
    rng: Pcg32,
    ids: IdAllocator,
    collisions: CollisionWorld,
    player: Entity,
    enemies: Vec<Entity>,
    enemy_dir: f32,
    projectiles: ObjectPool<Entity>,
    particles: ObjectPool<Entity>,
    /// Entity id -> pool slot for live projectiles (release needs the slot)
    projectile_slots: HashMap<EntityId, SlotId>,
    /// Remaining lifetime per live particle
    particle_ttl: HashMap<SlotId, f64>,
    enemy_size: Size,
    fire_cooldown_ms: f64,
    elapsed_ms: f64,
    wave: u32,
    score: u32,
    renders: u64,
}

/// Pool factory/reset pair for a transient entity kind. The placeholder id
/// is overwritten with a fresh one on every acquire.
fn entity_pool(tuning: PoolTuning, kind: EntityKind, size: Size) -> ObjectPool<Entity> {
    ObjectPool::new(
        tuning.initial_size,
        tuning.max_size,
        move || Entity::new(EntityId(u32::MAX), kind, Vec2::ZERO, size),
        |e| {
            e.active = false;
            e.pos = Vec2::ZERO;
            e.vel = Vec2::ZERO;
        },
    )
}

impl DemoGame {
    fn new(tuning: &Tuning, seed: u64) -> Result<Self, SimError> {
        let player_size = Size::new(30.0, 16.0)?;
        let enemy_size = Size::new(24.0, 16.0)?;
        let projectile_size = Size::new(3.0, 8.0)?;
        let particle_size = Size::new(2.0, 2.0)?;

        let mut ids = IdAllocator::new();
        let mut collisions = CollisionWorld::new();
        let player = Entity::new(
            ids.next_id(),
            EntityKind::Player,
            Vec2::new(WORLD_W / 2.0, PLAYER_Y),
            player_size,
        );
        collisions.register(player.id);

        let mut game = DemoGame {
            rng: Pcg32::seed_from_u64(seed),
            ids,
            collisions,
            player,
            enemies: Vec::new(),
            enemy_dir: 1.0,
            projectiles: entity_pool(tuning.projectile_pool, EntityKind::Projectile, projectile_size),
            particles: entity_pool(tuning.particle_pool, EntityKind::Particle, particle_size),
            projectile_slots: HashMap::new(),
            particle_ttl: HashMap::new(),
            enemy_size,
            fire_cooldown_ms: 0.0,
            elapsed_ms: 0.0,
            wave: 0,
            score: 0,
            renders: 0,
        };
        game.spawn_wave();
        Ok(game)
    }

    fn spawn_wave(&mut self) {
        self.wave += 1;
        for row in 0..ENEMY_ROWS {
            for col in 0..ENEMY_COLS {
                let pos = Vec2::new(
                    80.0 + col as f32 * 60.0,
                    60.0 + row as f32 * 40.0,
                );
                let mut enemy =
                    Entity::new(self.ids.next_id(), EntityKind::Enemy, pos, self.enemy_size);
                enemy.vel = Vec2::new(self.enemy_dir * ENEMY_SPEED, 0.0);
                self.collisions.register(enemy.id);
                self.enemies.push(enemy);
            }
        }
        info!("wave {} spawned ({} enemies)", self.wave, self.enemies.len());
    }

    /// Demo stand-in for player input: patrol side to side and fire on a
    /// fixed cadence.
    fn steer_and_fire(&mut self, step_ms: f64) {
        let t = (self.elapsed_ms / MS_PER_SEC) as f32;
        let phase = t * PLAYER_PATROL_HZ * std::f32::consts::TAU;
        self.player.pos.x = WORLD_W / 2.0 + phase.sin() * (WORLD_W / 2.0 - 60.0);

        self.fire_cooldown_ms -= step_ms;
        if self.fire_cooldown_ms <= 0.0 {
            self.fire_cooldown_ms += FIRE_INTERVAL_MS;
            self.fire();
        }
    }

    fn fire(&mut self) {
        let slot = self.projectiles.acquire();
        let id = self.ids.next_id();
        if let Some(p) = self.projectiles.get_mut(slot) {
            p.id = id;
            p.pos = self.player.pos + Vec2::new(14.0, -10.0);
            p.vel = Vec2::new(0.0, -PROJECTILE_SPEED);
            p.active = true;
        }
        self.collisions.register(id);
        self.projectile_slots.insert(id, slot);
    }

    fn despawn_projectile(&mut self, id: EntityId) {
        if let Some(slot) = self.projectile_slots.remove(&id) {
            self.collisions.unregister(id);
            self.projectiles.release(slot);
        }
    }

    fn spawn_burst(&mut self, at: Vec2) {
        for _ in 0..4 {
            let slot = self.particles.acquire();
            let id = self.ids.next_id();
            let vel = Vec2::new(
                self.rng.random_range(-80.0..80.0),
                self.rng.random_range(-120.0..20.0),
            );
            if let Some(p) = self.particles.get_mut(slot) {
                p.id = id;
                p.pos = at;
                p.vel = vel;
                p.active = true;
            }
            // Particles are cosmetic: never registered for collision
            self.particle_ttl.insert(slot, PARTICLE_TTL_MS);
        }
    }

    fn march_enemies(&mut self, dt: f32) {
        let mut flip = false;
        for e in self.enemies.iter_mut().filter(|e| e.active) {
            e.vel.x = self.enemy_dir * ENEMY_SPEED;
            e.integrate(dt);
            if e.pos.x < 20.0 || e.pos.x + e.size.width() > WORLD_W - 20.0 {
                flip = true;
            }
        }
        if flip {
            self.enemy_dir = -self.enemy_dir;
            for e in self.enemies.iter_mut().filter(|e| e.active) {
                e.pos.y += ENEMY_DESCENT;
            }
        }
    }

    fn hit_enemy(&mut self, enemy_id: EntityId, projectile_id: EntityId) {
        let Some(enemy) = self.enemies.iter_mut().find(|e| e.id == enemy_id) else {
            return;
        };
        if !enemy.active {
            // Already destroyed by another projectile this tick
            return;
        }
        let at = enemy.pos;
        enemy.deactivate();
        self.collisions.unregister(enemy_id);
        self.despawn_projectile(projectile_id);
        self.score += 10;
        self.spawn_burst(at);
        debug!("enemy {enemy_id:?} down, score {}", self.score);
    }

    fn resolve_collisions(&mut self) {
        // Snapshot of everything collidable; pairs are resolved against the
        // live structures afterwards
        let mut snapshot: Vec<Entity> = Vec::with_capacity(1 + self.enemies.len());
        snapshot.push(self.player.clone());
        snapshot.extend(self.enemies.iter().cloned());
        snapshot.extend(self.projectiles.iter_active().map(|(_, e)| e.clone()));

        let pairs = self.collisions.evaluate(&snapshot);
        for (a, b) in pairs {
            let kind = |id: EntityId| snapshot.iter().find(|e| e.id == id).map(|e| e.kind);
            match (kind(a), kind(b)) {
                (Some(EntityKind::Projectile), Some(EntityKind::Enemy)) => self.hit_enemy(b, a),
                (Some(EntityKind::Enemy), Some(EntityKind::Projectile)) => self.hit_enemy(a, b),
                (Some(EntityKind::Player), Some(EntityKind::Enemy))
                | (Some(EntityKind::Enemy), Some(EntityKind::Player)) => {
                    warn!("player rammed by an enemy (demo ignores damage)");
                }
                _ => {}
            }
        }
    }

    fn expire_transients(&mut self, step_ms: f64, dt: f32) {
        // Projectiles despawn off the top of the world
        let mut gone: Vec<EntityId> = Vec::new();
        for (_, p) in self.projectiles.iter_active_mut() {
            p.integrate(dt);
            if p.pos.y + p.size.height() < 0.0 {
                gone.push(p.id);
            }
        }
        for id in gone {
            self.despawn_projectile(id);
        }

        // Particles fade out on a timer
        let mut expired: Vec<SlotId> = Vec::new();
        for (slot, p) in self.particles.iter_active_mut() {
            p.integrate(dt);
            let ttl = self.particle_ttl.entry(slot).or_insert(0.0);
            *ttl -= step_ms;
            if *ttl <= 0.0 || p.pos.y > WORLD_H {
                expired.push(slot);
            }
        }
        for slot in expired {
            self.particles.release(slot);
            self.particle_ttl.remove(&slot);
        }
    }

    fn check_wave_cleared(&mut self) {
        if self.enemies.is_empty() || self.enemies.iter().any(|e| e.active) {
            return;
        }
        info!(
            "wave {} cleared; projectile pool reuse {:.0}%, particle pool reuse {:.0}%",
            self.wave,
            self.projectiles.stats().hit_rate() * 100.0,
            self.particles.stats().hit_rate() * 100.0,
        );
        self.enemies.clear();
        // Whole-state reset between waves
        self.particles.release_all();
        self.particle_ttl.clear();
        self.spawn_wave();
    }
}

impl Simulation for DemoGame {
    fn update(&mut self, step_ms: f64) -> Result<(), CallbackError> {
        let dt = (step_ms / MS_PER_SEC) as f32;
        self.elapsed_ms += step_ms;

        self.steer_and_fire(step_ms);
        self.march_enemies(dt);
        self.expire_transients(step_ms, dt);
        self.resolve_collisions();
        self.check_wave_cleared();
        Ok(())
    }

    fn render(&mut self) -> Result<(), CallbackError> {
        self.renders += 1;
        if self.renders % 60 == 0 {
            info!(
                "t={:5.1}s wave {} score {} | enemies {} projectiles {} particles {}",
                self.elapsed_ms / MS_PER_SEC,
                self.wave,
                self.score,
                self.enemies.iter().filter(|e| e.active).count(),
                self.projectiles.active_len(),
                self.particles.active_len(),
            );
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let tuning = match std::env::args().nth(1) {
        Some(path) => Tuning::from_json(&std::fs::read_to_string(path)?)?,
        None => Tuning::default(),
    };

    let mut game = DemoGame::new(&tuning, 0xC0FFEE)?;
    let mut scheduler: Scheduler = tuning.scheduler.build()?;

    let t0 = Instant::now();
    let now_ms = move || t0.elapsed().as_secs_f64() * MS_PER_SEC;

    scheduler.start(now_ms());
    info!(
        "demo running at {:.0} Hz for {:.0}s",
        MS_PER_SEC / scheduler.fixed_step_ms(),
        DEMO_DURATION_MS / MS_PER_SEC
    );

    // Scripted pause window, to show logic freezing while frames keep coming
    let mut did_pause = false;
    let mut did_resume = false;

    while scheduler.wants_frame() {
        let now = now_ms();
        if now >= DEMO_DURATION_MS {
            scheduler.stop();
            break;
        }
        if !did_pause && now >= 4_000.0 {
            scheduler.pause()?;
            did_pause = true;
            info!("paused (frames still consumed, logic frozen)");
        }
        if did_pause && !did_resume && now >= 5_000.0 {
            scheduler.resume()?;
            did_resume = true;
            info!("resumed");
        }

        scheduler.frame(now, &mut game)?;
        std::thread::sleep(Duration::from_millis(8));
    }

    info!(
        "demo finished: wave {}, score {}, projectile pool {:?}, particle pool {:?}",
        game.wave,
        game.score,
        game.projectiles.stats(),
        game.particles.stats(),
    );
    Ok(())
}
