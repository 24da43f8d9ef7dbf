// Data-driven animal profiles loaded from TOML

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::controller::Animal;
use super::kinematics::{Kinematics, KinematicsConfig};
use super::stats::{Stat, Stats};
use crate::core::{GameRng, IdRegistry, ModeId, StatId, StateId};
use crate::game::modes::{
    Ability, AbilityChoice, AbilityStatus, AffectStates, Mode, ModeProperties,
};
use crate::game::states::{
    Fall, FallConfig, Fly, FlyConfig, Locomotion, LocomotionState, StateCore,
};

/// Profile loading errors
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Failed to read profile {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid profile: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unknown state: {0}")]
    UnknownState(String),

    #[error("Unknown mode: {0}")]
    UnknownMode(String),

    #[error("Unknown stat: {0}")]
    UnknownStat(String),

    #[error("Mode {mode} has two abilities with index {index}")]
    DuplicateAbility { mode: String, index: i32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilitySettings {
    pub name: String,
    pub index: i32,
    pub active: bool,
    pub status: AbilityStatus,
    pub hold_by_time: f32,
    pub affect: AffectStates,
    /// State names the `affect` filter applies to
    pub affect_states: Vec<String>,
    pub transition_from: Vec<i32>,
}

impl Default for AbilitySettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            index: 0,
            active: true,
            status: AbilityStatus::default(),
            hold_by_time: 0.0,
            affect: AffectStates::default(),
            affect_states: Vec::new(),
            transition_from: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeSettings {
    pub name: String,
    pub input: Option<String>,
    pub active: bool,
    pub priority: i32,
    pub cooldown: f32,
    pub ignore_lower_modes: bool,
    pub default_index: AbilityChoice,
    pub reset_to_default: bool,
    pub allow_rotation: bool,
    pub allow_movement: bool,
    pub abilities: Vec<AbilitySettings>,
}

impl Default for ModeSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            input: None,
            active: true,
            priority: 0,
            cooldown: 0.0,
            ignore_lower_modes: false,
            default_index: AbilityChoice::Random,
            reset_to_default: false,
            allow_rotation: false,
            allow_movement: false,
            abilities: Vec::new(),
        }
    }
}

impl ModeSettings {
    fn build(
        &self,
        modes: &mut IdRegistry<ModeId>,
        states: &IdRegistry<StateId>,
    ) -> Result<Mode, ProfileError> {
        let mut mode = Mode::new(modes.intern(&self.name), &self.name);
        mode.input = self.input.clone();
        mode.active = self.active;
        mode.priority = self.priority;
        mode.cooldown = self.cooldown.max(0.0);
        mode.ignore_lower_modes = self.ignore_lower_modes;
        mode.ability_index = self.default_index;
        mode.default_index = self.default_index;
        mode.reset_to_default = self.reset_to_default;
        mode.allow_rotation = self.allow_rotation;
        mode.allow_movement = self.allow_movement;

        let mut seen = HashSet::new();
        for settings in &self.abilities {
            if !seen.insert(settings.index) {
                return Err(ProfileError::DuplicateAbility {
                    mode: self.name.clone(),
                    index: settings.index,
                });
            }
            let affect_states = settings
                .affect_states
                .iter()
                .map(|name| {
                    states
                        .get(name)
                        .ok_or_else(|| ProfileError::UnknownState(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;

            let mut ability = Ability::new(&settings.name, settings.index);
            ability.active = settings.active;
            ability.properties = ModeProperties {
                status: settings.status,
                hold_by_time: settings.hold_by_time,
                affect: settings.affect,
                affect_states,
                transition_from: settings.transition_from.clone(),
            };
            mode.abilities.push(ability);
        }

        if mode.abilities.is_empty() {
            warn!("Mode '{}' has no abilities", self.name);
        }
        Ok(mode)
    }
}

/// Settings shared by every state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateSettings {
    pub enabled: bool,
    /// Overrides the built-in priority
    pub priority: Option<i32>,
    /// Overrides the built-in input name
    pub input: Option<String>,
    /// Mode names that put the state to sleep
    pub sleep_from_mode: Vec<String>,
    pub debug: bool,
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: None,
            input: None,
            sleep_from_mode: Vec::new(),
            debug: false,
        }
    }
}

impl StateSettings {
    fn apply(&self, core: &mut StateCore, modes: &IdRegistry<ModeId>) -> Result<(), ProfileError> {
        core.enabled = self.enabled;
        if let Some(priority) = self.priority {
            core.priority = priority;
        }
        if let Some(input) = &self.input {
            core.input = Some(input.clone());
        }
        core.debug = self.debug;
        core.sleep_from_mode = self
            .sleep_from_mode
            .iter()
            .map(|name| {
                modes
                    .get(name)
                    .ok_or_else(|| ProfileError::UnknownMode(name.clone()))
            })
            .collect::<Result<_, _>>()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FallSettings {
    #[serde(flatten)]
    pub state: StateSettings,
    /// Stat reduced by fall damage
    pub damage_stat: Option<String>,
    #[serde(flatten)]
    pub config: FallConfig,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlySettings {
    #[serde(flatten)]
    pub state: StateSettings,
    #[serde(flatten)]
    pub config: FlyConfig,
}

/// Locomotion is always present; fall and fly only when listed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatesProfile {
    pub locomotion: StateSettings,
    pub fall: Option<FallSettings>,
    pub fly: Option<FlySettings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsProfile {
    pub health: f32,
    pub stamina: f32,
}

impl Default for StatsProfile {
    fn default() -> Self {
        Self {
            health: 100.0,
            stamina: 100.0,
        }
    }
}

/// Everything needed to build an animal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimalProfile {
    pub name: String,
    /// Fixed random seed; entropy when absent
    pub seed: Option<u64>,
    pub debug_modes: bool,
    pub body: KinematicsConfig,
    pub stats: StatsProfile,
    pub modes: Vec<ModeSettings>,
    pub states: StatesProfile,
}

impl Default for AnimalProfile {
    fn default() -> Self {
        Self {
            name: "Animal".to_string(),
            seed: None,
            debug_modes: false,
            body: KinematicsConfig::default(),
            stats: StatsProfile::default(),
            modes: Vec::new(),
            states: StatesProfile::default(),
        }
    }
}

impl AnimalProfile {
    /// Load a profile from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let profile = Self::from_toml_str(&text)?;
        info!("Loaded profile '{}' from {}", profile.name, path.display());
        Ok(profile)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ProfileError> {
        Ok(toml::from_str(text)?)
    }

    /// Build a ready animal
    pub fn build(&self) -> Result<Animal, ProfileError> {
        let mut mode_ids = IdRegistry::modes();
        let state_ids = IdRegistry::states();
        let stat_ids = IdRegistry::stats();

        let modes = self
            .modes
            .iter()
            .map(|settings| settings.build(&mut mode_ids, &state_ids))
            .collect::<Result<Vec<_>, _>>()?;
        let states = self.build_states(&mode_ids, &stat_ids)?;

        let mut stats = Stats::new();
        stats.insert(Stat::new(StatId::HEALTH, self.stats.health));
        stats.insert(Stat::new(StatId::STAMINA, self.stats.stamina));

        let rng = match self.seed {
            Some(seed) => GameRng::from_seed(seed),
            None => GameRng::from_entropy(),
        };

        let mut animal = Animal::new(
            &self.name,
            Kinematics::new(self.body.clone()),
            modes,
            states,
            stats,
            rng,
        );
        animal.debug_modes = self.debug_modes;
        Ok(animal)
    }

    fn build_states(
        &self,
        modes: &IdRegistry<ModeId>,
        stats: &IdRegistry<StatId>,
    ) -> Result<Vec<Box<dyn LocomotionState>>, ProfileError> {
        let mut states: Vec<Box<dyn LocomotionState>> = Vec::new();

        let mut locomotion = Locomotion::new();
        self.states.locomotion.apply(locomotion.core_mut(), modes)?;
        states.push(Box::new(locomotion));

        if let Some(settings) = &self.states.fall {
            let mut config = settings.config.clone();
            if let Some(name) = &settings.damage_stat {
                let stat = stats
                    .get(name)
                    .ok_or_else(|| ProfileError::UnknownStat(name.clone()))?;
                config.affect_stat = Some(stat);
            }
            let mut fall = Fall::new(config);
            settings.state.apply(fall.core_mut(), modes)?;
            states.push(Box::new(fall));
        }

        if let Some(settings) = &self.states.fly {
            let mut fly = Fly::new(settings.config.clone());
            settings.state.apply(fly.core_mut(), modes)?;
            states.push(Box::new(fly));
        }

        Ok(states)
    }
}
