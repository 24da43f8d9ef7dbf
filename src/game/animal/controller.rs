// Animal: owns the mode system and the locomotion state machine and runs
// them once per simulation tick

use std::collections::VecDeque;

use log::{debug, info};

use super::animator::{Animator, AnimatorRequest};
use super::events::{AnimalEvent, AnimationEvent, TaskOwner, TimedTask};
use super::kinematics::Kinematics;
use super::reactions::ForceReaction;
use super::stats::Stats;
use super::zone::{Zone, ZoneKind};
use crate::core::{GameRng, ModeId, StateId};
use crate::engine::input::InputSource;
use crate::engine::physics::PhysicsQuery;
use crate::engine::scheduler::Scheduler;
use crate::game::modes::{AbilityChoice, AbilityStatus, Mode, ModeEnv, ModeSystem};
use crate::game::states::{LocomotionState, StateContext, StateMachine};

/// Rounds of request/tag ping-pong `sync_animation_tags` runs before giving up
const MAX_SYNC_ROUNDS: usize = 8;

/// Borrow the animal's mode collaborators without touching `modes`
macro_rules! mode_env {
    ($animal:ident) => {
        ModeEnv {
            state: $animal.states.active_state(),
            enabled: $animal.enabled,
            lock_input: $animal.lock_input,
            zone: $animal.zone.as_ref(),
            scheduler: &mut $animal.scheduler,
            animator: &mut $animal.animator,
            rng: &mut $animal.rng,
            events: &mut $animal.events,
            time: $animal.time,
            debug: $animal.debug_modes,
        }
    };
}

/// Borrow the animal's state collaborators without touching `states`
macro_rules! state_ctx {
    ($animal:ident, $physics:expr, $dt:expr) => {
        StateContext {
            kinematics: &mut $animal.kinematics,
            physics: $physics,
            animator: &mut $animal.animator,
            input: &mut $animal.input,
            rng: &mut $animal.rng,
            stats: &mut $animal.stats,
            events: &mut $animal.events,
            time: $animal.time,
            delta_time: $dt,
            in_zone: $animal.zone.is_some(),
            last_state: $animal.states.last_state(),
        }
    };
}

/// A controllable animal
#[derive(Debug)]
pub struct Animal {
    /// Display name
    pub name: String,

    // Body
    pub kinematics: Kinematics,
    pub animator: Animator,
    pub stats: Stats,
    input: InputSource,
    rng: GameRng,

    // Decision making
    scheduler: Scheduler<TaskOwner, TimedTask>,
    modes: ModeSystem,
    states: StateMachine,
    zone: Option<Zone>,

    // Messages
    inbox: VecDeque<AnimationEvent>,
    events: Vec<AnimalEvent>,

    /// Seconds since creation
    time: f32,
    enabled: bool,
    /// Ignore mode inputs
    pub lock_input: bool,
    /// Verbose mode admission traces
    pub debug_modes: bool,
}

impl Animal {
    pub fn new(
        name: &str,
        kinematics: Kinematics,
        modes: Vec<Mode>,
        states: Vec<Box<dyn LocomotionState>>,
        stats: Stats,
        rng: GameRng,
    ) -> Self {
        let mut animal = Self {
            name: name.to_string(),
            kinematics,
            animator: Animator::new(),
            stats,
            input: InputSource::new(),
            rng,
            scheduler: Scheduler::new(),
            modes: ModeSystem::new(modes),
            states: StateMachine::new(states),
            zone: None,
            inbox: VecDeque::new(),
            events: Vec::new(),
            time: 0.0,
            enabled: true,
            lock_input: false,
            debug_modes: false,
        };

        let mut env = mode_env!(animal);
        animal.modes.awake(&mut env);
        animal.states.awake(animal.time, &mut animal.rng);
        info!(
            "Animal '{}' ready: {} modes, {} states",
            animal.name,
            animal.modes.modes().len(),
            animal.states.states().count()
        );
        animal
    }

    /// Advance the animal by one simulation step
    pub fn tick(&mut self, physics: &dyn PhysicsQuery, dt: f32) {
        self.time += dt;
        if !self.enabled {
            return;
        }

        self.run_due_tasks();
        self.dispatch_input();
        self.process_animation_events();

        let mut ctx = state_ctx!(self, physics, dt);
        let changed = self.states.update(&mut ctx, self.modes.sleeping_from());
        if let Some((_, to)) = changed {
            let mut env = mode_env!(self);
            self.modes.on_state_changed(to, &mut env);
        }

        self.kinematics.integrate(dt);
        self.animator.vertical_speed = self.kinematics.vertical_speed_modifier;
    }

    fn run_due_tasks(&mut self) {
        for task in self.scheduler.poll(self.time) {
            match task {
                TimedTask::CooldownElapsed(mode) => {
                    let mut env = mode_env!(self);
                    self.modes.on_cooldown_elapsed(mode, &mut env);
                }
                TimedTask::AbilityTimeout { mode, ability } => {
                    let mut env = mode_env!(self);
                    self.modes.on_ability_timeout(mode, ability, &mut env);
                }
                TimedTask::ForceReactionEnded { exit_drag } => {
                    let falling = self.states.active_id() == Some(StateId::FALL);
                    ForceReaction::finish(&mut self.kinematics, falling, exit_drag);
                }
            }
        }
    }

    /// Route pending input edges to the modes and states bound to them
    fn dispatch_input(&mut self) {
        for edge in self.input.drain_edges() {
            let bound: Vec<ModeId> = self
                .modes
                .modes()
                .iter()
                .filter(|m| m.input.as_deref() == Some(edge.name.as_str()))
                .map(|m| m.id)
                .collect();
            for id in bound {
                let mut env = mode_env!(self);
                self.modes.activate_by_input(id, edge.value, &mut env);
            }
            self.states.on_input(&edge.name, edge.value);
        }
    }

    /// Set a named input and dispatch it right away
    pub fn set_input(&mut self, name: &str, value: bool) {
        if self.input.set_input(name, value) && self.enabled {
            self.dispatch_input();
        }
    }

    pub fn input_value(&self, name: &str) -> bool {
        self.input.value(name)
    }

    // Animation layer

    /// Queue a notification from the animation layer
    pub fn post(&mut self, event: AnimationEvent) {
        self.inbox.push_back(event);
    }

    pub fn process_animation_events(&mut self) {
        while let Some(event) = self.inbox.pop_front() {
            let mut env = mode_env!(self);
            match event {
                AnimationEvent::TagEntered { mode } => self.modes.tag_enter(mode, &mut env),
                AnimationEvent::TagExited {
                    mode,
                    ability,
                    next_ability,
                } => self.modes.tag_exit(mode, ability, next_ability, &mut env),
                AnimationEvent::ModeStateMove {
                    mode,
                    normalized_time,
                    in_transition,
                } => self.modes.on_mode_state_move(mode, normalized_time, in_transition),
            }
        }
    }

    /// Turn pending animator requests into tag events right away, as an
    /// animation layer with zero-length transitions would
    pub fn sync_animation_tags(&mut self) {
        for _ in 0..MAX_SYNC_ROUNDS {
            let requests = self.animator.drain_requests();
            if requests.is_empty() {
                return;
            }
            for request in requests {
                let event = match request {
                    AnimatorRequest::Prepare { mode, .. } => AnimationEvent::TagEntered { mode },
                    AnimatorRequest::ExitMode { mode, ability } => AnimationEvent::TagExited {
                        mode,
                        ability,
                        next_ability: None,
                    },
                };
                self.post(event);
            }
            self.process_animation_events();
        }
        debug!("animator requests still pending after {} rounds", MAX_SYNC_ROUNDS);
    }

    // Modes

    pub fn modes(&self) -> &ModeSystem {
        &self.modes
    }

    pub fn mode_try_activate(&mut self, id: ModeId, ability: i32) -> bool {
        let mut env = mode_env!(self);
        self.modes.try_activate(id, ability, &mut env)
    }

    pub fn mode_try_activate_with_status(
        &mut self,
        id: ModeId,
        choice: AbilityChoice,
        status: AbilityStatus,
        time: f32,
    ) -> bool {
        let mut env = mode_env!(self);
        self.modes.try_activate_with_status(id, choice, status, time, &mut env)
    }

    pub fn mode_force_activate(&mut self, id: ModeId, choice: AbilityChoice) -> bool {
        let mut env = mode_env!(self);
        self.modes.force_activate(id, choice, &mut env)
    }

    /// Interrupt whatever mode is playing
    pub fn mode_interrupt(&mut self) -> bool {
        let mut env = mode_env!(self);
        self.modes.interrupt(&mut env)
    }

    pub fn mode_disable(&mut self, id: ModeId) {
        let mut env = mode_env!(self);
        self.modes.disable(id, &mut env);
    }

    pub fn mode_enable(&mut self, id: ModeId) {
        self.modes.enable(id);
    }

    pub fn set_ability_index(&mut self, id: ModeId, choice: AbilityChoice) {
        let mut env = mode_env!(self);
        self.modes.set_ability_index(id, choice, &mut env);
    }

    // States

    pub fn states(&self) -> &StateMachine {
        &self.states
    }

    /// First state of concrete type `T`
    pub fn state<T: 'static>(&self) -> Option<&T> {
        self.states.find::<T>()
    }

    pub fn state_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.states.find_mut::<T>()
    }

    pub fn active_state(&self) -> StateId {
        self.states.active_state()
    }

    pub fn set_state_enabled(&mut self, id: StateId, enabled: bool) {
        self.states.set_enabled(id, enabled);
    }

    /// Switch to state `id` regardless of its activation rules
    pub fn state_force_activate(&mut self, id: StateId, physics: &dyn PhysicsQuery) -> bool {
        let mut ctx = state_ctx!(self, physics, 0.0);
        let changed = self.states.force_activate(id, &mut ctx);
        if changed {
            let mut env = mode_env!(self);
            self.modes.on_state_changed(id, &mut env);
        }
        changed
    }

    // Zones and reactions

    pub fn zone(&self) -> Option<&Zone> {
        self.zone.as_ref()
    }

    pub fn enter_zone(&mut self, zone: Zone) {
        if zone.kind == ZoneKind::Mode {
            let mut env = mode_env!(self);
            self.modes.set_ability_index(zone.mode, zone.ability_index, &mut env);
        }
        debug!("{} entered a {:?} zone", self.name, zone.kind);
        self.zone = Some(zone);
    }

    pub fn exit_zone(&mut self) {
        let Some(zone) = self.zone.take() else {
            return;
        };
        if zone.kind == ZoneKind::Mode {
            let mut env = mode_env!(self);
            self.modes.reset_ability_index(zone.mode, &mut env);
        }
    }

    /// Push the animal with an external force for `reaction.time` seconds
    pub fn react(&mut self, reaction: &ForceReaction) {
        if !self.enabled {
            return;
        }
        reaction.apply(&mut self.kinematics);
        if self.states.active_id() == Some(StateId::FALL) {
            self.states.on_external_force();
        }
        self.scheduler.schedule(
            self.time,
            reaction.time,
            TaskOwner::Reaction,
            TimedTask::ForceReactionEnded {
                exit_drag: reaction.exit_drag,
            },
        );
    }

    // Lifecycle

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabling drops every timed task and stops all modes
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled && self.enabled {
            self.scheduler.clear();
            let mut env = mode_env!(self);
            self.modes.stop_all(&mut env);
            info!("Animal '{}' disabled", self.name);
        }
        self.enabled = enabled;
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending()
    }

    /// Take everything that happened since the last call
    pub fn drain_events(&mut self) -> Vec<AnimalEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    use crate::game::animal::reactions::DirectionSpace;
    use crate::game::animal::testing::PlaneWorld;
    use crate::game::modes::{Ability, ModeOutcome};
    use crate::game::states::{Fall, Fly, Locomotion};

    const DT: f32 = 1.0 / 60.0;

    fn states() -> Vec<Box<dyn LocomotionState>> {
        vec![
            Box::new(Locomotion::new()),
            Box::new(Fall::default()),
            Box::new(Fly::default()),
        ]
    }

    fn animal_at(height: f32, modes: Vec<Mode>) -> Animal {
        let mut kinematics = Kinematics::default();
        kinematics.set_position(Vec3::new(0.0, height, 0.0));
        Animal::new(
            "Test",
            kinematics,
            modes,
            states(),
            Stats::standard(100.0, 100.0),
            GameRng::from_seed(5),
        )
    }

    fn attack() -> Mode {
        Mode::new(ModeId::ATTACK1, "Attack1")
            .with_input("Attack1")
            .with_cooldown(0.5)
            .with_ability(Ability::new("Bite", 1))
            .with_default_index(AbilityChoice::Fixed(1))
    }

    fn run(animal: &mut Animal, world: &PlaneWorld, seconds: f32) {
        let steps = (seconds / DT).round() as usize;
        for _ in 0..steps {
            animal.tick(world, DT);
        }
    }

    #[test]
    fn test_falls_and_lands_on_ground() {
        let world = PlaneWorld::flat(0.0);
        let mut animal = animal_at(10.0, vec![]);

        animal.tick(&world, DT);
        assert_eq!(animal.active_state(), StateId::FALL);

        run(&mut animal, &world, 3.0);
        assert_eq!(animal.active_state(), StateId::LOCOMOTION);

        let events = animal.drain_events();
        let landed = events.iter().find_map(|e| match e {
            AnimalEvent::Landed { distance, .. } => Some(*distance),
            _ => None,
        });
        let distance = landed.expect("no landing event");
        assert!(distance > 9.5 && distance < 10.6, "fell {}", distance);
        assert!(events.contains(&AnimalEvent::StateChanged {
            from: StateId::LOCOMOTION,
            to: StateId::FALL,
        }));
        assert!(events.contains(&AnimalEvent::StateChanged {
            from: StateId::FALL,
            to: StateId::LOCOMOTION,
        }));
        assert!(animal.kinematics.position.y.abs() < 1e-3);
    }

    #[test]
    fn test_grounded_animal_stays_in_locomotion() {
        let world = PlaneWorld::flat(0.0);
        let mut animal = animal_at(0.0, vec![]);
        run(&mut animal, &world, 1.0);

        assert_eq!(animal.active_state(), StateId::LOCOMOTION);
        assert!(animal.drain_events().iter().all(|e| !matches!(e, AnimalEvent::StateChanged { .. })));
    }

    #[test]
    fn test_attack_input_plays_ability() {
        let world = PlaneWorld::flat(0.0);
        let mut animal = animal_at(0.0, vec![attack()]);
        animal.tick(&world, DT);

        animal.set_input("Attack1", true);
        assert_eq!(animal.modes().preparing_mode(), Some(ModeId::ATTACK1));

        animal.post(AnimationEvent::TagEntered {
            mode: ModeId::ATTACK1,
        });
        animal.process_animation_events();
        assert_eq!(animal.modes().active_mode(), Some(ModeId::ATTACK1));
        assert_eq!(animal.animator.mode_value, 1001);
        assert!(animal.pending_tasks() > 0);

        animal.post(AnimationEvent::TagExited {
            mode: ModeId::ATTACK1,
            ability: 1,
            next_ability: None,
        });
        animal.process_animation_events();
        assert!(animal.modes().playing_mode().is_none());

        let events = animal.drain_events();
        assert!(events.contains(&AnimalEvent::ModeEntered {
            mode: ModeId::ATTACK1,
            ability: 1,
        }));
        assert!(events.contains(&AnimalEvent::ModeExited {
            mode: ModeId::ATTACK1,
            outcome: ModeOutcome::Completed,
        }));
    }

    #[test]
    fn test_cooldown_runs_on_the_animal_clock() {
        let world = PlaneWorld::flat(0.0);
        let mut animal = animal_at(0.0, vec![attack()]);

        animal.set_input("Attack1", true);
        animal.sync_animation_tags();
        assert!(animal.modes().get(ModeId::ATTACK1).unwrap().in_cooldown());

        run(&mut animal, &world, 0.25);
        assert!(animal.modes().get(ModeId::ATTACK1).unwrap().in_cooldown());

        run(&mut animal, &world, 0.5);
        assert!(!animal.modes().get(ModeId::ATTACK1).unwrap().in_cooldown());
    }

    #[test]
    fn test_disabling_cancels_timed_tasks() {
        let world = PlaneWorld::flat(0.0);
        let mut animal = animal_at(0.0, vec![attack()]);
        animal.set_input("Attack1", true);
        animal.sync_animation_tags();
        assert!(animal.pending_tasks() > 0);

        animal.set_enabled(false);
        assert_eq!(animal.pending_tasks(), 0);
        let mode = animal.modes().get(ModeId::ATTACK1).unwrap();
        assert!(!mode.in_cooldown());
        assert!(!mode.is_playing());
        assert_eq!(animal.modes().active_mode(), None);
        assert_eq!(animal.modes().outcome(), ModeOutcome::ForceExit);

        run(&mut animal, &world, 1.0);
        assert_eq!(animal.pending_tasks(), 0);
    }

    #[test]
    fn test_mode_activates_again_after_reenable() {
        let world = PlaneWorld::flat(0.0);
        let mut animal = animal_at(0.0, vec![attack()]);
        animal.set_input("Attack1", true);
        animal.sync_animation_tags();
        animal.set_input("Attack1", false);
        assert!(animal.modes().get(ModeId::ATTACK1).unwrap().in_cooldown());

        animal.set_enabled(false);
        animal.set_enabled(true);
        run(&mut animal, &world, 1.0);
        assert!(!animal.modes().get(ModeId::ATTACK1).unwrap().in_cooldown());

        animal.set_input("Attack1", true);
        animal.sync_animation_tags();
        let mode = animal.modes().get(ModeId::ATTACK1).unwrap();
        assert!(mode.is_playing());
        assert!(mode.in_cooldown());
        assert_eq!(animal.modes().active_mode(), Some(ModeId::ATTACK1));
    }

    #[test]
    fn test_fly_take_off_and_release() {
        let world = PlaneWorld::flat(0.0);
        let mut animal = animal_at(10.0, vec![]);
        animal.tick(&world, DT);

        animal.set_input("Fly", true);
        animal.tick(&world, DT);
        assert_eq!(animal.active_state(), StateId::FLY);
        assert!(!animal.kinematics.use_gravity);

        let height = animal.kinematics.position.y;
        run(&mut animal, &world, 1.0);
        assert_eq!(animal.active_state(), StateId::FLY);
        assert!((animal.kinematics.position.y - height).abs() < 0.2);

        animal.set_input("Fly", false);
        animal.tick(&world, DT);
        assert_eq!(animal.active_state(), StateId::FALL);
        assert!(!animal.kinematics.free_movement);

        run(&mut animal, &world, 3.0);
        assert_eq!(animal.active_state(), StateId::LOCOMOTION);
    }

    #[test]
    fn test_force_reaction_restarts_fall_distance() {
        let world = PlaneWorld::flat(0.0);
        let mut animal = animal_at(30.0, vec![]);
        run(&mut animal, &world, 0.5);
        assert!(animal.state::<Fall>().unwrap().fall_current_distance() > 0.5);

        let reaction = ForceReaction {
            direction: Vec3::X,
            space: DirectionSpace::World,
            time: 0.2,
            ..ForceReaction::default()
        };
        animal.react(&reaction);
        assert_eq!(animal.state::<Fall>().unwrap().fall_current_distance(), 0.0);
        assert!(animal.kinematics.has_external_force());

        run(&mut animal, &world, 0.3);
        assert!(!animal.kinematics.has_external_force());
        assert!(animal.kinematics.use_gravity);
        assert_eq!(animal.pending_tasks(), 0);
    }

    #[test]
    fn test_zone_drives_mode_ability() {
        let world = PlaneWorld::flat(0.0);
        let mode = attack().with_ability(Ability::new("Roar", 2));
        let mut animal = animal_at(0.0, vec![mode]);
        animal.tick(&world, DT);

        animal.enter_zone(Zone::mode(ModeId::ATTACK1, 2, AbilityStatus::Forever));
        assert_eq!(
            animal.modes().get(ModeId::ATTACK1).unwrap().ability_index,
            AbilityChoice::Fixed(2)
        );

        animal.set_input("Attack1", true);
        animal.sync_animation_tags();
        let mode = animal.modes().playing_mode().unwrap();
        assert_eq!(mode.active_ability_index(), Some(2));
        assert!(animal
            .drain_events()
            .contains(&AnimalEvent::ZoneActivated { mode: ModeId::ATTACK1 }));

        animal.exit_zone();
        assert_eq!(
            animal.modes().get(ModeId::ATTACK1).unwrap().ability_index,
            AbilityChoice::Fixed(1)
        );
    }

    #[test]
    fn test_forced_state_and_mode() {
        let world = PlaneWorld::flat(0.0);
        let mut animal = animal_at(0.0, vec![attack()]);
        animal.tick(&world, DT);
        assert!(!animal.mode_interrupt());

        assert!(animal.state_force_activate(StateId::FLY, &world));
        assert_eq!(animal.active_state(), StateId::FLY);
        assert!(!animal.kinematics.use_gravity);
        assert!(!animal.state_force_activate(StateId::FLY, &world));

        assert!(animal.mode_force_activate(ModeId::ATTACK1, AbilityChoice::Fixed(1)));
        animal.sync_animation_tags();
        assert!(animal.mode_interrupt());
        animal.sync_animation_tags();
        assert!(animal.modes().playing_mode().is_none());
        assert_eq!(animal.modes().outcome(), ModeOutcome::Interrupted);
    }

    #[test]
    fn test_locked_input_is_ignored() {
        let mut animal = animal_at(0.0, vec![attack()]);
        animal.lock_input = true;
        animal.set_input("Attack1", true);
        assert!(!animal.modes().is_preparing());
    }
}
