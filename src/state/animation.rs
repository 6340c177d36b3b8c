//! Animation clips with timed triggers
//!
//! Only the timing of a clip matters to the simulation. A clip carries
//! markers at normalized times; advancing the player reports every marker
//! crossed so the owner's state can react (the axe hits the tree, the
//! sword lands, the death animation ends).

/// Marker delivered to the current state via `State::on_trigger`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerId {
    HarvestHit,
    AttackHit,
    DeathComplete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: &'static str,
    /// Seconds per cycle
    pub duration: f32,
    pub looping: bool,
    /// `(normalized_time, trigger)` pairs, times in `[0, 1]`
    pub triggers: Vec<(f32, TriggerId)>,
}

impl AnimationClip {
    pub fn new(name: &'static str, duration: f32, looping: bool) -> Self {
        Self {
            name,
            duration,
            looping,
            triggers: Vec::new(),
        }
    }

    pub fn with_trigger(mut self, normalized_time: f32, trigger: TriggerId) -> Self {
        self.triggers.push((normalized_time.clamp(0.0, 1.0), trigger));
        self
    }

    pub fn idle() -> Self {
        Self::new("Idle", 2.0, true)
    }

    pub fn run() -> Self {
        Self::new("Run", 1.0, true)
    }

    /// Looping chop, one hit per cycle
    pub fn harvest(hit_time: f32) -> Self {
        Self::new("Harvest", 1.0, true).with_trigger(hit_time, TriggerId::HarvestHit)
    }

    /// One swing, the hit lands at the end
    pub fn attack(duration: f32) -> Self {
        Self::new("Attack", duration, false).with_trigger(1.0, TriggerId::AttackHit)
    }

    pub fn death() -> Self {
        Self::new("Die", 1.5, false).with_trigger(1.0, TriggerId::DeathComplete)
    }
}

/// Plays one clip at a time
#[derive(Debug, Clone, Default)]
pub struct AnimationPlayer {
    clip: Option<AnimationClip>,
    time: f32,
    finished: bool,
}

impl AnimationPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a clip from the beginning, replacing the current one
    pub fn play(&mut self, clip: AnimationClip) {
        self.clip = Some(clip);
        self.time = 0.0;
        self.finished = false;
    }

    pub fn stop(&mut self) {
        self.clip = None;
        self.time = 0.0;
        self.finished = false;
    }

    pub fn current(&self) -> Option<&'static str> {
        self.clip.as_ref().map(|c| c.name)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advance by `dt`, returning the triggers crossed in order
    pub fn advance(&mut self, dt: f32) -> Vec<TriggerId> {
        let Some(clip) = &self.clip else {
            return Vec::new();
        };
        if self.finished {
            return Vec::new();
        }

        if clip.duration <= 0.0 {
            // Degenerate clip: everything fires at once
            let all: Vec<TriggerId> = clip.triggers.iter().map(|&(_, t)| t).collect();
            if !clip.looping {
                self.finished = true;
            }
            return all;
        }

        let mut fired: Vec<(f32, TriggerId)> = Vec::new();

        let start = self.time;
        let mut end = start + dt.max(0.0);
        if !clip.looping {
            end = end.min(clip.duration);
        }

        let first_cycle = (start / clip.duration).floor() as i64;
        let last_cycle = (end / clip.duration).floor() as i64;
        for cycle in first_cycle..=last_cycle {
            let base = cycle as f32 * clip.duration;
            for &(at, trigger) in &clip.triggers {
                let t = base + at * clip.duration;
                if t > start && t <= end {
                    fired.push((t, trigger));
                }
            }
        }

        if clip.looping {
            self.time = end % clip.duration;
        } else {
            self.time = end;
            if end >= clip.duration {
                self.finished = true;
            }
        }

        fired.sort_by(|a, b| a.0.total_cmp(&b.0));
        fired.into_iter().map(|(_, t)| t).collect()
    }
}
