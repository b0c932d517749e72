use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};

/// Random source for the chance opcodes. May be predictable for tests or
/// truly random for gameplay.
pub struct ScriptRand {
    rng: Box<dyn RngCore>,
}

impl ScriptRand {
    pub fn new_uniform() -> Self {
        ScriptRand {
            rng: Box::new(rand::thread_rng()),
        }
    }

    pub fn new_predictable(seed: u64) -> Self {
        ScriptRand {
            rng: Box::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Roll in [0, range); a non-positive range always yields 0
    pub fn roll(&mut self, range: i32) -> i32 {
        if range <= 0 {
            return 0;
        }
        self.rng.gen_range(0..range)
    }
}
