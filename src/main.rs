use std::env;

use anyhow::{Context, Result};
use glam::Vec3;
use log::info;

use animal_controller::core::{ModeId, StatId};
use animal_controller::engine::game_loop::GameLoop;
use animal_controller::engine::physics::{LayerMask, PhysicsWorld};
use animal_controller::game::animal::{AnimalEvent, AnimalProfile, AnimationEvent};

const BUNDLED_PROFILE: &str = include_str!("../profiles/wyvern.toml");

/// Simulated seconds the demo runs for
const RUN_TIME: f32 = 8.0;
/// Host frame length; the loop slices it into fixed steps
const FRAME_TIME: f32 = 1.0 / 30.0;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting animal controller demo...");

    let profile = match env::args().nth(1) {
        Some(path) => AnimalProfile::load(&path).with_context(|| format!("loading {path}"))?,
        None => AnimalProfile::from_toml_str(BUNDLED_PROFILE)?,
    };
    let mut animal = profile.build()?;

    let mut world = PhysicsWorld::new();
    world.add_ground(0.0, 50.0, LayerMask::GROUND);
    animal.kinematics.set_position(Vec3::new(0.0, 10.0, 0.0));

    let mut game_loop = GameLoop::new();
    let mut fly_pressed = false;
    let mut fly_released = false;
    let mut attacked = false;
    let mut attack_ended = false;

    while game_loop.simulated_time() < RUN_TIME {
        let updates = game_loop.begin_frame(FRAME_TIME);
        for _ in 0..updates {
            animal.tick(&world, game_loop.fixed_timestep());
        }

        let now = animal.time();

        // Scripted host input: take off mid-fall, glide, drop, then bite
        if !fly_pressed && now >= 0.5 {
            fly_pressed = true;
            animal.set_input("Fly", true);
        }
        if !fly_released && now >= 2.5 {
            fly_released = true;
            animal.set_input("Fly", false);
        }
        if !attacked && now >= 6.0 {
            attacked = true;
            animal.set_input("Attack1", true);
            animal.set_input("Attack1", false);
        }
        if attacked && !attack_ended && now >= 6.6 {
            attack_ended = true;
            let ability = animal
                .modes()
                .get(ModeId::ATTACK1)
                .and_then(|mode| mode.active_ability_index());
            if let Some(ability) = ability {
                animal.post(AnimationEvent::TagExited {
                    mode: ModeId::ATTACK1,
                    ability,
                    next_ability: None,
                });
            }
        }
        animal.sync_animation_tags();

        for event in animal.drain_events() {
            match event {
                AnimalEvent::StateChanged { from, to } => {
                    info!("[{now:.2}s] state {from:?} -> {to:?}")
                }
                AnimalEvent::Landed { distance, status } => {
                    info!("[{now:.2}s] landed after {distance:.2}m (status {status:?})")
                }
                other => info!("[{now:.2}s] {other:?}"),
            }
        }
    }

    let position = animal.kinematics.position;
    info!(
        "Demo finished after {} updates: {} at ({:.2}, {:.2}, {:.2}), health {:?}",
        game_loop.update_count(),
        animal.name,
        position.x,
        position.y,
        position.z,
        animal.stats.value(StatId::HEALTH),
    );

    Ok(())
}
