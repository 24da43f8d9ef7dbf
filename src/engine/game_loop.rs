/// Game loop timing and control system
///
/// Implements a fixed timestep loop driven by supplied frame times rather
/// than the wall clock, so a whole session can be replayed deterministically.
/// The controller logic runs at a consistent rate no matter how frames are
/// sliced.

/// Target update rate (60 updates per second)
pub const FIXED_TIMESTEP: f32 = 1.0 / 60.0;

/// Maximum number of fixed steps per frame to prevent spiral of death
const MAX_STEPS_PER_FRAME: u32 = 5;

/// Game loop timing state
#[derive(Debug)]
pub struct GameLoop {
    /// Length of one fixed update in seconds
    timestep: f32,

    /// Accumulated time for fixed timestep updates
    accumulator: f32,

    /// Simulated time consumed by fixed updates
    simulated_time: f32,

    /// Whether the loop is paused
    paused: bool,

    /// Current frame number
    frame_count: u64,

    /// Total updates executed
    update_count: u64,

    /// Frames whose steps were capped by `MAX_STEPS_PER_FRAME`
    dropped_frames: u64,
}

impl GameLoop {
    /// Create a new game loop at the default 60 Hz rate
    pub fn new() -> Self {
        Self::with_timestep(FIXED_TIMESTEP)
    }

    /// Create a game loop with a custom fixed timestep
    pub fn with_timestep(timestep: f32) -> Self {
        Self {
            timestep: timestep.max(f32::EPSILON),
            accumulator: 0.0,
            simulated_time: 0.0,
            paused: false,
            frame_count: 0,
            update_count: 0,
            dropped_frames: 0,
        }
    }

    /// Begin a new frame of `frame_time` seconds, returns the number of fixed
    /// updates to run
    pub fn begin_frame(&mut self, frame_time: f32) -> u32 {
        self.frame_count += 1;

        // If paused, don't accumulate time for updates
        if self.paused {
            return 0;
        }

        self.accumulator += frame_time.max(0.0);

        let mut updates = 0;
        while self.accumulator >= self.timestep && updates < MAX_STEPS_PER_FRAME {
            self.accumulator -= self.timestep;
            updates += 1;
        }

        // Drop the backlog instead of bursting on the next frame
        if self.accumulator >= self.timestep {
            self.accumulator %= self.timestep;
            self.dropped_frames += 1;
            log::warn!("Frame {} exceeded {} fixed steps", self.frame_count, MAX_STEPS_PER_FRAME);
        }

        self.simulated_time += updates as f32 * self.timestep;
        self.update_count += updates as u64;
        updates
    }

    /// Get the fixed timestep (in seconds)
    pub fn fixed_timestep(&self) -> f32 {
        self.timestep
    }

    /// Interpolation alpha between fixed steps
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.timestep
    }

    /// Simulated seconds consumed by fixed updates
    pub fn simulated_time(&self) -> f32 {
        self.simulated_time
    }

    /// Get total number of frames begun
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get total number of updates executed
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Check if the loop is paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pause the loop
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            log::info!("Simulation paused");
        }
    }

    /// Resume the loop
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            // Reset accumulator to prevent update burst
            self.accumulator = 0.0;
            log::info!("Simulation resumed");
        }
    }

    /// Toggle pause state
    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }
}

impl Default for GameLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_game_loop_creation() {
        let game_loop = GameLoop::new();
        assert_eq!(game_loop.frame_count(), 0);
        assert_eq!(game_loop.update_count(), 0);
        assert!(!game_loop.is_paused());
        assert_relative_eq!(game_loop.fixed_timestep(), 1.0 / 60.0);
    }

    #[test]
    fn test_toggle_pause() {
        let mut game_loop = GameLoop::new();

        game_loop.toggle_pause();
        assert!(game_loop.is_paused());

        game_loop.toggle_pause();
        assert!(!game_loop.is_paused());
    }

    #[test]
    fn test_paused_no_updates() {
        let mut game_loop = GameLoop::new();
        game_loop.pause();

        assert_eq!(game_loop.begin_frame(0.5), 0);
        assert_eq!(game_loop.frame_count(), 1);
    }

    #[test]
    fn test_update_accumulation() {
        let mut game_loop = GameLoop::with_timestep(0.25);

        assert_eq!(game_loop.begin_frame(0.1), 0);
        assert_eq!(game_loop.begin_frame(0.2), 1);
        assert_eq!(game_loop.begin_frame(0.5), 2);
        assert_relative_eq!(game_loop.simulated_time(), 0.75);
        assert_relative_eq!(game_loop.alpha(), 0.2, epsilon = 1e-5);
    }

    #[test]
    fn test_max_steps_limit() {
        let mut game_loop = GameLoop::with_timestep(0.1);

        let updates = game_loop.begin_frame(3.0);
        assert_eq!(updates, MAX_STEPS_PER_FRAME);
        assert_eq!(game_loop.dropped_frames(), 1);
        assert!(game_loop.alpha() < 1.0);
    }
}
