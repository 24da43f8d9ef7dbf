// Admission control and lifecycle for every mode of one animal

use log::{debug, warn};

use super::ability::AbilityStatus;
use super::mode::{AbilityChoice, Mode, ModeOutcome};
use crate::core::{GameRng, ModeId, StateId};
use crate::engine::scheduler::Scheduler;
use crate::game::animal::animator::{Animator, AnimatorRequest, ModeStatus};
use crate::game::animal::events::{AnimalEvent, TaskOwner, TimedTask};
use crate::game::animal::zone::Zone;

/// Collaborators borrowed from the animal for one mode operation
pub struct ModeEnv<'a> {
    /// Active locomotion state
    pub state: StateId,
    pub enabled: bool,
    pub lock_input: bool,
    pub zone: Option<&'a Zone>,
    pub scheduler: &'a mut Scheduler<TaskOwner, TimedTask>,
    pub animator: &'a mut Animator,
    pub rng: &'a mut GameRng,
    pub events: &'a mut Vec<AnimalEvent>,
    pub time: f32,
    /// Verbose admission traces
    pub debug: bool,
}

macro_rules! trace {
    ($env:expr, $mode:expr, $($arg:tt)*) => {
        if $env.debug {
            debug!("mode {}: {}", $mode, format!($($arg)*));
        }
    };
}

/// All modes of an animal plus the single active-mode slot.
///
/// A mode goes through prepared (waiting for its animation tag), playing
/// (tag entered) and back. Only one mode is in the active slot at a time
/// and only the active mode can be playing.
#[derive(Debug, Clone, Default)]
pub struct ModeSystem {
    modes: Vec<Mode>,
    /// Index of the playing mode
    active: Option<usize>,
    /// Index of the mode waiting for its tag enter
    preparing: Option<usize>,
    outcome: ModeOutcome,
    mode_time: f32,
    /// Mode currently putting states to sleep
    sleeping_from: Option<ModeId>,
}

impl ModeSystem {
    pub fn new(modes: Vec<Mode>) -> Self {
        Self {
            modes,
            ..Self::default()
        }
    }

    /// Prime every mode so it starts available
    pub fn awake(&mut self, env: &mut ModeEnv<'_>) {
        for mode in &mut self.modes {
            mode.activation_time = -2.0 * mode.cooldown;
            mode.in_cooldown = false;
            env.events.push(AnimalEvent::AbilityIndexChanged {
                mode: mode.id,
                choice: mode.ability_index,
            });
        }
    }

    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    pub fn get(&self, id: ModeId) -> Option<&Mode> {
        self.modes.iter().find(|m| m.id == id)
    }

    pub fn get_mut(&mut self, id: ModeId) -> Option<&mut Mode> {
        self.modes.iter_mut().find(|m| m.id == id)
    }

    fn index_of(&self, id: ModeId) -> Option<usize> {
        self.modes.iter().position(|m| m.id == id)
    }

    /// The mode in the active slot, if it is playing
    pub fn playing_mode(&self) -> Option<&Mode> {
        self.active
            .and_then(|i| self.modes.get(i))
            .filter(|m| m.playing)
    }

    pub fn active_mode(&self) -> Option<ModeId> {
        self.active.map(|i| self.modes[i].id)
    }

    pub fn preparing_mode(&self) -> Option<ModeId> {
        self.preparing.map(|i| self.modes[i].id)
    }

    pub fn is_preparing(&self) -> bool {
        self.preparing.is_some()
    }

    pub fn outcome(&self) -> ModeOutcome {
        self.outcome
    }

    pub fn sleeping_from(&self) -> Option<ModeId> {
        self.sleeping_from
    }

    /// Normalized time of the playing mode's animation
    pub fn mode_time(&self) -> f32 {
        self.mode_time
    }

    pub fn playing_count(&self) -> usize {
        self.modes.iter().filter(|m| m.playing).count()
    }

    /// Select the ability a mode plays next
    pub fn set_ability_index(&mut self, id: ModeId, choice: AbilityChoice, env: &mut ModeEnv<'_>) {
        if let Some(mode) = self.get_mut(id) {
            mode.ability_index = choice;
            env.events.push(AnimalEvent::AbilityIndexChanged { mode: id, choice });
        }
    }

    /// Restore the configured default ability unless a zone is driving it
    pub fn reset_ability_index(&mut self, id: ModeId, env: &mut ModeEnv<'_>) {
        if env.zone.is_some() {
            return;
        }
        if let Some(choice) = self.get(id).map(|m| m.default_index) {
            self.set_ability_index(id, choice, env);
        }
    }

    /// Edge-triggered input for a mode. A rising edge tries the selected
    /// ability (or the zone's ability); a falling edge stops a
    /// `HoldInputDown` ability.
    pub fn activate_by_input(&mut self, id: ModeId, value: bool, env: &mut ModeEnv<'_>) {
        let Some(i) = self.index_of(id) else {
            return;
        };
        let mode = &mut self.modes[i];
        if !mode.active || !env.enabled || env.lock_input || mode.input_value == value {
            return;
        }
        mode.input_value = value;

        if !value {
            if mode.playing && mode.check_status(AbilityStatus::HoldInputDown) {
                trace!(env, id, "hold released, interrupting");
                self.interrupt(env);
            }
            return;
        }

        match env.zone.filter(|zone| zone.drives_mode(id)) {
            Some(zone) => {
                let choice = self.modes[i].ability_index;
                let Some(pos) = self.get_try_ability(i, choice, env) else {
                    return;
                };
                let properties = &mut self.modes[i].abilities[pos].properties;
                properties.status = zone.ability_status;
                if zone.ability_status == AbilityStatus::ActiveByTime {
                    properties.hold_by_time = zone.ability_time;
                }

                if self.try_activate_at(i, pos, env) {
                    env.animator.set_mode_power(zone.mode_float);
                    env.events.push(AnimalEvent::ZoneActivated { mode: id });
                }
            }
            None => {
                self.try_activate_current(id, env);
            }
        }
    }

    /// Resolve a choice to a position in the mode's ability list. Stores the
    /// choice as the mode's ability index.
    fn get_try_ability(
        &mut self,
        i: usize,
        choice: AbilityChoice,
        env: &mut ModeEnv<'_>,
    ) -> Option<usize> {
        let preparing = self.preparing.is_some();
        let mode = &mut self.modes[i];
        if !mode.active {
            return None;
        }

        mode.ability_index = choice;
        env.events.push(AnimalEvent::AbilityIndexChanged {
            mode: mode.id,
            choice,
        });

        if choice == AbilityChoice::None || preparing {
            return None;
        }
        if mode.abilities.is_empty() {
            warn!("mode {} has no abilities to activate", mode.id);
            return None;
        }

        let index = match choice {
            AbilityChoice::Fixed(index) => index,
            _ => mode.abilities[env.rng.index(mode.abilities.len())?].index,
        };

        let pos = mode.ability_position(index);
        if pos.is_none() {
            trace!(env, mode.id, "no ability with index {}", index);
        }
        pos
    }

    /// Try the mode's currently selected ability
    pub fn try_activate_current(&mut self, id: ModeId, env: &mut ModeEnv<'_>) -> bool {
        match self.get(id).map(|m| m.ability_index) {
            Some(choice) => self.try_activate_index(id, choice, env),
            None => false,
        }
    }

    pub fn try_activate(&mut self, id: ModeId, ability: i32, env: &mut ModeEnv<'_>) -> bool {
        self.try_activate_index(id, AbilityChoice::Fixed(ability), env)
    }

    pub fn try_activate_index(
        &mut self,
        id: ModeId,
        choice: AbilityChoice,
        env: &mut ModeEnv<'_>,
    ) -> bool {
        let Some(i) = self.index_of(id) else {
            return false;
        };
        match self.get_try_ability(i, choice, env) {
            Some(pos) => self.try_activate_at(i, pos, env),
            None => false,
        }
    }

    /// Try an ability with its status overridden. The hold time is only
    /// used by `ActiveByTime`.
    pub fn try_activate_with_status(
        &mut self,
        id: ModeId,
        choice: AbilityChoice,
        status: AbilityStatus,
        time: f32,
        env: &mut ModeEnv<'_>,
    ) -> bool {
        let Some(i) = self.index_of(id) else {
            return false;
        };
        let Some(pos) = self.get_try_ability(i, choice, env) else {
            return false;
        };

        let properties = &mut self.modes[i].abilities[pos].properties;
        properties.status = status;
        if status == AbilityStatus::ActiveByTime {
            properties.hold_by_time = time;
        }
        self.try_activate_at(i, pos, env)
    }

    /// Admission control for ability `pos` of mode `i`
    fn try_activate_at(&mut self, i: usize, pos: usize, env: &mut ModeEnv<'_>) -> bool {
        let mode = &self.modes[i];
        let id = mode.id;
        let ability = &mode.abilities[pos];

        if !ability.active {
            trace!(env, id, "ability {} is disabled", ability.name);
            return false;
        }
        if ability.blocked_by_state(env.state) {
            trace!(env, id, "state {} blocks ability {}", env.state, ability.name);
            return false;
        }

        let mut transition_from = 0;
        if mode.playing {
            let current = mode.active_ability_index();
            let new_index = ability.index;
            if current == Some(new_index) && mode.check_status(AbilityStatus::Toggle) {
                trace!(env, id, "toggle off");
                self.modes[i].input_value = false;
                self.interrupt(env);
                return false;
            }

            match current.filter(|c| ability.can_transition_from(*c)) {
                Some(current) => {
                    trace!(env, id, "transition from ability {} to {}", current, new_index);
                    transition_from = current;
                    self.reset_mode(i, env);
                    self.clear_active_slot(env);
                }
                None if !mode.has_cooldown() => {
                    trace!(env, id, "already playing without cooldown");
                    return false;
                }
                None if !mode.in_cooldown => {
                    self.reset_mode(i, env);
                    self.clear_active_slot(env);
                }
                None => {}
            }
        } else if let Some(other) = self.active.filter(|&a| a != i && self.modes[a].playing) {
            let other_mode = &self.modes[other];
            let preempts = mode.priority > other_mode.priority
                && mode.ignore_lower_modes
                && !mode.in_cooldown;

            if preempts {
                trace!(env, id, "interrupting lower priority mode {}", other_mode.id);
                self.reset_mode(other, env);
                self.modes[other].input_value = false;
                self.clear_active_slot(env);
            } else if !other_mode.has_cooldown() {
                trace!(env, id, "mode {} must finish first", other_mode.id);
                return false;
            } else if !other_mode.in_cooldown {
                self.reset_mode(other, env);
                self.clear_active_slot(env);
            } else {
                trace!(env, id, "waiting for the cooldown of mode {}", other_mode.id);
                return false;
            }
        }

        if self.modes[i].in_cooldown {
            trace!(env, id, "in cooldown");
            return false;
        }

        self.prepare(i, pos, transition_from, env);
        true
    }

    fn prepare(&mut self, i: usize, pos: usize, transition_from: i32, env: &mut ModeEnv<'_>) {
        let mode = &mut self.modes[i];
        mode.active_ability = Some(pos);
        let ability = mode.abilities[pos].index;

        self.preparing = Some(i);
        self.outcome = ModeOutcome::Prepared;
        env.animator.set_mode(mode.id, ability, transition_from);
        env.animator.request(AnimatorRequest::Prepare {
            mode: mode.id,
            ability,
        });
        trace!(env, mode.id, "ability {} prepared", mode.abilities[pos].name);
    }

    /// The animation of the prepared ability has started
    pub fn tag_enter(&mut self, id: ModeId, env: &mut ModeEnv<'_>) {
        let Some(i) = self.index_of(id) else {
            return;
        };
        let mode = &mut self.modes[i];
        let Some(ability) = mode.active_ability() else {
            return;
        };
        if mode.playing {
            return;
        }
        let ability_index = ability.index;
        let status = ability.status();
        let hold_by_time = ability.properties.hold_by_time;

        self.active = Some(i);
        if self.preparing == Some(i) {
            self.preparing = None;
        }
        mode.playing = true;
        self.sleeping_from = Some(id);
        self.outcome = ModeOutcome::Playing;
        env.events.push(AnimalEvent::AbilityEntered {
            mode: id,
            ability: ability_index,
        });
        env.events.push(AnimalEvent::ModeEntered {
            mode: id,
            ability: ability_index,
        });
        mode.activation_time = env.time;

        let animator_status = match status {
            AbilityStatus::PlayOneTime => ModeStatus::OneTime,
            AbilityStatus::ActiveByTime => {
                env.scheduler.schedule(
                    env.time,
                    hold_by_time,
                    TaskOwner::Mode(id),
                    TimedTask::AbilityTimeout {
                        mode: id,
                        ability: ability_index,
                    },
                );
                mode.input_value = false;
                ModeStatus::Loop
            }
            AbilityStatus::Toggle => {
                mode.input_value = false;
                ModeStatus::Loop
            }
            AbilityStatus::HoldInputDown | AbilityStatus::Forever => ModeStatus::Loop,
        };
        debug!("mode {} entered with ability {} ({:?})", id, ability_index, status);

        if mode.has_cooldown() {
            env.scheduler.cancel_where(|owner, task| {
                *owner == TaskOwner::Mode(id) && matches!(task, TimedTask::CooldownElapsed(_))
            });
            mode.in_cooldown = true;
            env.scheduler.schedule(
                env.time,
                mode.cooldown,
                TaskOwner::Mode(id),
                TimedTask::CooldownElapsed(id),
            );
        }
        env.animator.set_mode_status(animator_status);
    }

    /// The animation of `ability` has ended. `next` names an ability of the
    /// same mode the animation goes into directly.
    pub fn tag_exit(&mut self, id: ModeId, ability: i32, next: Option<i32>, env: &mut ModeEnv<'_>) {
        let Some(i) = self.index_of(id) else {
            return;
        };
        if self.active != Some(i) || self.modes[i].active_ability_index() != Some(ability) {
            trace!(env, id, "ignoring stale exit of ability {}", ability);
            return;
        }

        debug!("mode {} exited ability {} ({:?})", id, ability, self.outcome);
        self.reset_mode(i, env);
        self.clear_active_slot(env);
        if self.modes[i].reset_to_default {
            self.reset_ability_index(id, env);
        }

        match next {
            Some(next) => {
                self.modes[i].in_transition = false;
                if self.try_activate_index(id, AbilityChoice::Fixed(next), env) {
                    self.tag_enter(id, env);
                }
            }
            None if self.modes[i].input_value => {
                self.try_activate_current(id, env);
            }
            None => {}
        }
    }

    /// Idempotent teardown of mode `i`
    fn reset_mode(&mut self, i: usize, env: &mut ModeEnv<'_>) {
        if self.active == Some(i) {
            self.sleeping_from = None;
            if !matches!(self.outcome, ModeOutcome::Interrupted | ModeOutcome::ForceExit) {
                self.outcome = ModeOutcome::Completed;
            }
        }
        if self.preparing == Some(i) {
            self.preparing = None;
        }

        let mode = &mut self.modes[i];
        let id = mode.id;
        if mode.playing {
            if let Some(ability) = mode.active_ability_index() {
                env.events.push(AnimalEvent::AbilityExited { mode: id, ability });
            }
            env.events.push(AnimalEvent::ModeExited {
                mode: id,
                outcome: self.outcome,
            });
        }
        mode.playing = false;
        mode.active_ability = None;

        env.scheduler.cancel_where(|owner, task| {
            *owner == TaskOwner::Mode(id) && matches!(task, TimedTask::AbilityTimeout { .. })
        });
    }

    /// Empty the active slot so another mode can play
    fn clear_active_slot(&mut self, env: &mut ModeEnv<'_>) {
        self.active = None;
        env.animator.clear_mode();
        self.mode_time = 0.0;
    }

    /// Ask the animation layer to leave the playing ability. The mode is
    /// reset once the tag exit arrives.
    pub fn interrupt(&mut self, env: &mut ModeEnv<'_>) -> bool {
        let Some(mode) = self.playing_mode() else {
            return false;
        };
        let Some(ability) = mode.active_ability_index() else {
            return false;
        };
        let id = mode.id;

        self.outcome = ModeOutcome::Interrupted;
        env.animator.set_mode_status(ModeStatus::Interrupted);
        env.animator.request(AnimatorRequest::ExitMode { mode: id, ability });
        trace!(env, id, "interrupted ability {}", ability);
        true
    }

    /// Tear down whatever mode is active and try `choice` on mode `id`
    pub fn force_activate(&mut self, id: ModeId, choice: AbilityChoice, env: &mut ModeEnv<'_>) -> bool {
        if let Some(pending) = self.preparing {
            self.reset_mode(pending, env);
            env.animator.clear_mode();
        }
        if let Some(active) = self.active {
            trace!(env, id, "forcing mode {} to exit", self.modes[active].id);
            self.outcome = ModeOutcome::ForceExit;
            self.reset_mode(active, env);
            self.clear_active_slot(env);
        }
        self.try_activate_index(id, choice, env)
    }

    /// Release a mode whose cooldown has passed while its input is held
    pub fn check_active_mode(&mut self, id: ModeId, env: &mut ModeEnv<'_>) {
        let Some(i) = self.index_of(id) else {
            return;
        };
        let mode = &self.modes[i];
        if mode.has_cooldown() && !mode.in_cooldown && mode.input_value {
            let was_active = self.active == Some(i);
            self.reset_mode(i, env);
            if was_active {
                self.clear_active_slot(env);
            }
        }
    }

    /// Disable a mode. Its timed tasks are dropped and a playing looped
    /// ability is interrupted; a one-time ability is left to finish.
    pub fn disable(&mut self, id: ModeId, env: &mut ModeEnv<'_>) {
        let Some(i) = self.index_of(id) else {
            return;
        };
        let mode = &mut self.modes[i];
        mode.active = false;
        mode.input_value = false;
        mode.in_cooldown = false;
        env.scheduler.cancel_owner(&TaskOwner::Mode(id));

        if mode.playing && !mode.check_status(AbilityStatus::PlayOneTime) {
            self.interrupt(env);
        }
    }

    /// Force every mode back to idle and out of cooldown. Held inputs are
    /// kept. Expects the caller to have dropped the scheduled tasks.
    pub fn stop_all(&mut self, env: &mut ModeEnv<'_>) {
        if self.playing_mode().is_some() {
            self.outcome = ModeOutcome::ForceExit;
        }
        for i in 0..self.modes.len() {
            self.reset_mode(i, env);
            let mode = &mut self.modes[i];
            mode.in_cooldown = false;
            mode.in_transition = false;
        }
        self.preparing = None;
        if self.active.is_some() {
            self.clear_active_slot(env);
        }
    }

    pub fn enable(&mut self, id: ModeId) {
        if let Some(mode) = self.get_mut(id) {
            mode.active = true;
        }
    }

    /// Per-frame animation progress of a mode
    pub fn on_mode_state_move(&mut self, id: ModeId, normalized_time: f32, in_transition: bool) {
        let Some(i) = self.index_of(id) else {
            return;
        };
        self.modes[i].in_transition = in_transition;
        if self.active == Some(i) {
            self.mode_time = normalized_time;
        }
    }

    /// Stop a playing ability the new locomotion state does not allow
    pub fn on_state_changed(&mut self, state: StateId, env: &mut ModeEnv<'_>) {
        let blocked = self
            .playing_mode()
            .and_then(|m| m.active_ability())
            .map_or(false, |a| a.blocked_by_state(state));
        if blocked {
            self.interrupt(env);
        }
    }

    pub fn on_cooldown_elapsed(&mut self, id: ModeId, env: &mut ModeEnv<'_>) {
        let Some(i) = self.index_of(id) else {
            return;
        };
        if !self.modes[i].in_cooldown {
            return;
        }
        self.modes[i].in_cooldown = false;
        trace!(env, id, "cooldown elapsed");

        if self.modes[i].input_value {
            self.try_activate_current(id, env);
        }

        // Modes that were waiting on this cooldown
        let waiting: Vec<ModeId> = self
            .modes
            .iter()
            .filter(|m| m.id != id && m.active && m.input_value && !m.playing)
            .map(|m| m.id)
            .collect();
        for other in waiting {
            if self.is_preparing() {
                break;
            }
            self.try_activate_current(other, env);
        }
    }

    pub fn on_ability_timeout(&mut self, id: ModeId, ability: i32, env: &mut ModeEnv<'_>) {
        let current = self
            .playing_mode()
            .filter(|m| m.id == id)
            .and_then(|m| m.active_ability_index());
        if current == Some(ability) {
            trace!(env, id, "active time over");
            self.interrupt(env);
        }
    }
}
