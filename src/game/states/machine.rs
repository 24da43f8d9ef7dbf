// Priority-ordered locomotion state machine

use log::debug;

use super::{LocomotionState, StateContext};
use crate::core::{GameRng, ModeId, StateId};
use crate::game::animal::events::AnimalEvent;

/// Owns the states of an animal and the active-state slot
#[derive(Debug, Default)]
pub struct StateMachine {
    /// Sorted by priority, highest first
    states: Vec<Box<dyn LocomotionState>>,
    active: Option<usize>,
    last_state: Option<StateId>,
    state_time: f32,
}

impl StateMachine {
    pub fn new(mut states: Vec<Box<dyn LocomotionState>>) -> Self {
        states.sort_by(|a, b| b.core().priority.cmp(&a.core().priority));
        Self {
            states,
            active: None,
            last_state: None,
            state_time: 0.0,
        }
    }

    pub fn states(&self) -> impl Iterator<Item = &dyn LocomotionState> {
        self.states.iter().map(|s| s.as_ref())
    }

    fn index_of(&self, id: StateId) -> Option<usize> {
        self.states.iter().position(|s| s.core().id == id)
    }

    pub fn get(&self, id: StateId) -> Option<&dyn LocomotionState> {
        self.index_of(id).map(|i| self.states[i].as_ref())
    }

    pub fn get_mut(&mut self, id: StateId) -> Option<&mut (dyn LocomotionState + 'static)> {
        match self.index_of(id) {
            Some(i) => Some(self.states[i].as_mut()),
            None => None,
        }
    }

    /// First state of concrete type `T`
    pub fn find<T: 'static>(&self) -> Option<&T> {
        self.states.iter().find_map(|s| s.as_any().downcast_ref::<T>())
    }

    pub fn find_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.states
            .iter_mut()
            .find_map(|s| s.as_any_mut().downcast_mut::<T>())
    }

    /// Id of the active state, if the machine has started
    pub fn active_id(&self) -> Option<StateId> {
        self.active.map(|i| self.states[i].core().id)
    }

    /// Id of the active state, or the lowest state before the first tick
    pub fn active_state(&self) -> StateId {
        self.active_id()
            .or_else(|| self.states.last().map(|s| s.core().id))
            .unwrap_or(StateId::LOCOMOTION)
    }

    pub fn last_state(&self) -> StateId {
        self.last_state.unwrap_or_else(|| self.active_state())
    }

    /// Seconds spent in the active state
    pub fn state_time(&self) -> f32 {
        self.state_time
    }

    pub fn set_enabled(&mut self, id: StateId, enabled: bool) {
        if let Some(i) = self.index_of(id) {
            self.states[i].core_mut().enabled = enabled;
        }
    }

    pub fn awake(&mut self, time: f32, rng: &mut GameRng) {
        for state in &mut self.states {
            state.awake(time, rng);
        }
    }

    /// Activate the lowest enabled state without a transition event
    fn start(&mut self, ctx: &mut StateContext<'_>) {
        let Some(i) = self.states.iter().rposition(|s| s.core().enabled) else {
            return;
        };
        self.active = Some(i);
        self.state_time = 0.0;

        let state = &mut self.states[i];
        state.activate(ctx);
        state.core_mut().in_core_animation = true;
        ctx.animator.set_state(state.core().id);
        debug!("starting in state {}", state.core().name);
    }

    /// Run one tick: move and exit-check the active state, then look for a
    /// state that wants to take over. Returns the transition, if any.
    pub fn update(
        &mut self,
        ctx: &mut StateContext<'_>,
        sleeping_from: Option<ModeId>,
    ) -> Option<(StateId, StateId)> {
        if self.active.is_none() {
            self.start(ctx);
        }
        let active = self.active?;
        ctx.last_state = self.last_state();

        self.state_time += ctx.delta_time;
        self.states[active].on_state_move(ctx);
        self.states[active].try_exit_state(ctx);

        let mut changed = None;
        if let Some(next) = self.scan(active, ctx, sleeping_from) {
            changed = self.transition(next, ctx);
        }

        let current = self.active.unwrap_or(active);
        ctx.kinematics.speed_direction = self.states[current].speed_direction(ctx.kinematics);
        changed
    }

    fn scan(
        &mut self,
        active: usize,
        ctx: &mut StateContext<'_>,
        sleeping_from: Option<ModeId>,
    ) -> Option<usize> {
        if self.states[active].core().is_persistent {
            return None;
        }

        for i in 0..self.states.len() {
            if i == active {
                if self.states[active].core().ignore_lower_states {
                    return None;
                }
                continue;
            }

            let core = self.states[i].core();
            if !core.enabled || core.sleeps_for(sleeping_from) {
                continue;
            }
            if self.states[i].try_activate(ctx) {
                return Some(i);
            }
        }
        None
    }

    fn transition(&mut self, to: usize, ctx: &mut StateContext<'_>) -> Option<(StateId, StateId)> {
        let from = self.active?;
        if from == to {
            return None;
        }

        let outgoing = &mut self.states[from];
        let from_id = outgoing.core().id;
        outgoing.exit_state(ctx);
        outgoing.restore_animal_on_exit(ctx);
        outgoing.reset_state_values();
        outgoing.core_mut().in_core_animation = false;

        self.last_state = Some(from_id);
        ctx.last_state = from_id;
        self.active = Some(to);
        self.state_time = 0.0;

        let incoming = &mut self.states[to];
        let to_id = incoming.core().id;
        incoming.activate(ctx);
        incoming.core_mut().in_core_animation = true;

        ctx.animator.set_state(to_id);
        ctx.events.push(AnimalEvent::StateChanged {
            from: from_id,
            to: to_id,
        });
        if incoming.core().debug {
            debug!("state {} -> {}", from_id, to_id);
        }
        Some((from_id, to_id))
    }

    /// Switch to `id` regardless of activation rules
    pub fn force_activate(&mut self, id: StateId, ctx: &mut StateContext<'_>) -> bool {
        let Some(to) = self.index_of(id) else {
            return false;
        };
        if self.active.is_none() {
            self.start(ctx);
        }
        self.transition(to, ctx).is_some()
    }

    /// Route an input edge to every state bound to `name`
    pub fn on_input(&mut self, name: &str, value: bool) {
        let active = self.active;
        for (i, state) in self.states.iter_mut().enumerate() {
            if state.core().input.as_deref() == Some(name) {
                state.on_input(value, active == Some(i));
            }
        }
    }

    pub fn on_external_force(&mut self) {
        if let Some(i) = self.active {
            self.states[i].on_external_force();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    use crate::engine::input::InputSource;
    use crate::game::animal::animator::Animator;
    use crate::game::animal::kinematics::Kinematics;
    use crate::game::animal::stats::Stats;
    use crate::game::animal::testing::PlaneWorld;
    use crate::game::states::{Locomotion, StateCore, StateProfile};

    #[derive(Debug)]
    struct StubState {
        core: StateCore,
        wants: bool,
        exits: u32,
    }

    impl StubState {
        fn boxed(id: u32, priority: i32, profile: StateProfile) -> Box<dyn LocomotionState> {
            Box::new(Self {
                core: StateCore::new(StateId::new(id), "Stub", priority, profile).with_input("Stub"),
                wants: false,
                exits: 0,
            })
        }
    }

    impl LocomotionState for StubState {
        fn core(&self) -> &StateCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut StateCore {
            &mut self.core
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }

        fn try_activate(&mut self, _ctx: &mut StateContext<'_>) -> bool {
            self.wants || self.core.input_value
        }

        fn exit_state(&mut self, _ctx: &mut StateContext<'_>) {
            self.exits += 1;
        }
    }

    struct Fixture {
        kinematics: Kinematics,
        world: PlaneWorld,
        animator: Animator,
        input: InputSource,
        rng: GameRng,
        stats: Stats,
        events: Vec<AnimalEvent>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                kinematics: Kinematics::default(),
                world: PlaneWorld::flat(0.0),
                animator: Animator::new(),
                input: InputSource::new(),
                rng: GameRng::from_seed(1),
                stats: Stats::new(),
                events: Vec::new(),
            }
        }

        fn ctx(&mut self) -> StateContext<'_> {
            StateContext {
                kinematics: &mut self.kinematics,
                physics: &self.world,
                animator: &mut self.animator,
                input: &mut self.input,
                rng: &mut self.rng,
                stats: &mut self.stats,
                events: &mut self.events,
                time: 0.0,
                delta_time: 0.1,
                in_zone: false,
                last_state: StateId::LOCOMOTION,
            }
        }
    }

    fn stub_mut(machine: &mut StateMachine) -> &mut StubState {
        machine.find_mut::<StubState>().unwrap()
    }

    #[test]
    fn test_starts_in_lowest_state_without_event() {
        let mut fx = Fixture::new();
        let mut machine = StateMachine::new(vec![
            Box::new(Locomotion::new()),
            StubState::boxed(50, 4, StateProfile::default()),
        ]);
        assert_eq!(machine.active_state(), StateId::LOCOMOTION);

        assert_eq!(machine.update(&mut fx.ctx(), None), None);
        assert_eq!(machine.active_id(), Some(StateId::LOCOMOTION));
        assert!(fx.events.is_empty());
    }

    #[test]
    fn test_higher_state_takes_over() {
        let mut fx = Fixture::new();
        let mut machine = StateMachine::new(vec![
            Box::new(Locomotion::new()),
            StubState::boxed(50, 4, StateProfile::default()),
        ]);
        machine.update(&mut fx.ctx(), None);

        stub_mut(&mut machine).wants = true;
        let changed = machine.update(&mut fx.ctx(), None);

        assert_eq!(changed, Some((StateId::LOCOMOTION, StateId::new(50))));
        assert_eq!(machine.last_state(), StateId::LOCOMOTION);
        assert_eq!(fx.animator.state, StateId::new(50));
        assert_eq!(
            fx.events,
            vec![AnimalEvent::StateChanged {
                from: StateId::LOCOMOTION,
                to: StateId::new(50),
            }]
        );
    }

    #[test]
    fn test_ignore_lower_states_holds_active() {
        let mut fx = Fixture::new();
        let profile = StateProfile {
            ignore_lower_states: true,
            grounded: Some(false),
            ..StateProfile::default()
        };
        let mut machine = StateMachine::new(vec![
            Box::new(Locomotion::new()),
            StubState::boxed(50, 4, profile),
        ]);
        machine.update(&mut fx.ctx(), None);
        stub_mut(&mut machine).wants = true;
        machine.update(&mut fx.ctx(), None);

        stub_mut(&mut machine).wants = false;
        fx.kinematics.grounded = true;
        assert_eq!(machine.update(&mut fx.ctx(), None), None);
        assert_eq!(machine.active_id(), Some(StateId::new(50)));

        stub_mut(&mut machine).allow_exit();
        assert!(machine.update(&mut fx.ctx(), None).is_some());
        assert_eq!(machine.active_id(), Some(StateId::LOCOMOTION));
        assert_eq!(machine.find::<StubState>().unwrap().exits, 1);
    }

    #[test]
    fn test_persistent_state_blocks_everything() {
        let mut fx = Fixture::new();
        let persistent = StateProfile {
            persistent: true,
            ..StateProfile::default()
        };
        let mut machine = StateMachine::new(vec![
            Box::new(Locomotion::new()),
            StubState::boxed(50, 0, persistent),
        ]);
        machine.update(&mut fx.ctx(), None);
        assert_eq!(machine.active_id(), Some(StateId::new(50)));

        // Locomotion wants in (grounded) but the persistent state holds
        assert!(fx.kinematics.grounded);
        assert_eq!(machine.update(&mut fx.ctx(), None), None);
        assert_eq!(machine.active_id(), Some(StateId::new(50)));
    }

    #[test]
    fn test_sleeping_and_disabled_states_are_skipped() {
        let mut fx = Fixture::new();
        let mut machine = StateMachine::new(vec![
            Box::new(Locomotion::new()),
            StubState::boxed(50, 4, StateProfile::default()),
        ]);
        machine.update(&mut fx.ctx(), None);
        let stub = stub_mut(&mut machine);
        stub.wants = true;
        stub.core.sleep_from_mode = vec![ModeId::ATTACK1];

        assert_eq!(machine.update(&mut fx.ctx(), Some(ModeId::ATTACK1)), None);

        machine.set_enabled(StateId::new(50), false);
        assert_eq!(machine.update(&mut fx.ctx(), None), None);

        machine.set_enabled(StateId::new(50), true);
        assert!(machine.update(&mut fx.ctx(), None).is_some());
    }

    #[test]
    fn test_input_routes_by_name() {
        let mut fx = Fixture::new();
        let mut machine = StateMachine::new(vec![
            Box::new(Locomotion::new()),
            StubState::boxed(50, 4, StateProfile::default()),
        ]);
        machine.update(&mut fx.ctx(), None);

        machine.on_input("Other", true);
        assert_eq!(machine.update(&mut fx.ctx(), None), None);

        machine.on_input("Stub", true);
        assert!(machine.update(&mut fx.ctx(), None).is_some());
    }

    #[test]
    fn test_force_activate() {
        let mut fx = Fixture::new();
        let mut machine = StateMachine::new(vec![
            Box::new(Locomotion::new()),
            StubState::boxed(50, 4, StateProfile::default()),
        ]);

        assert!(machine.force_activate(StateId::new(50), &mut fx.ctx()));
        assert_eq!(machine.active_id(), Some(StateId::new(50)));
        assert!(!machine.force_activate(StateId::new(50), &mut fx.ctx()));
        assert!(!machine.force_activate(StateId::FLY, &mut fx.ctx()));
    }
}
