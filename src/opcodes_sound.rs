//! Sound and music handlers. The play-and-wait opcode is the canonical
//! cooperative wait: start the sound on one tick, then poll the mixer
//! once per tick until it reports silence.

use crate::instruction::WaitPhase;
use crate::interpreter::{ExecutionResult, ScriptInterpreter};
use crate::script::ScriptError;

/// Lowest volume the set-volume curve can reach
const VOLUME_FLOOR: i32 = -10_000;

impl ScriptInterpreter {
    /// 0x1E: fire-and-forget playback
    pub(crate) fn op_play_sound(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        self.mixer.play_sound(args[0], args[1] != 0, args[2]);
        Ok(ExecutionResult::Advance)
    }

    /// 0x1F: start the sound, then hold this line until it finishes
    pub(crate) fn op_play_sound_and_wait(
        &mut self,
        args: &[i32],
    ) -> Result<ExecutionResult, ScriptError> {
        let (resource, looping, volume) = (args[0], args[1], args[2]);

        match self.wait_phase()? {
            WaitPhase::Idle => {
                self.mixer.play_sound(resource, looping != 0, volume);
                self.set_wait_phase(WaitPhase::Waiting)?;
                Ok(ExecutionResult::Suspend)
            }
            WaitPhase::Waiting => {
                if self.mixer.is_playing(resource) {
                    Ok(ExecutionResult::Suspend)
                } else {
                    self.set_wait_phase(WaitPhase::Idle)?;
                    Ok(ExecutionResult::Advance)
                }
            }
        }
    }

    /// 0x20: stop a resource if it is still audible
    pub(crate) fn op_stop_sound(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        if self.mixer.is_playing(args[0]) {
            self.mixer.stop_sound(args[0]);
        }
        Ok(ExecutionResult::Advance)
    }

    /// 0x21
    pub(crate) fn op_stop_object_sounds(
        &mut self,
        args: &[i32],
    ) -> Result<ExecutionResult, ScriptError> {
        self.mixer.stop_object_sounds(args[0]);
        Ok(ExecutionResult::Advance)
    }

    /// 0x22
    pub(crate) fn op_change_music(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        self.mixer.change_music(args[0], args[1] != 0);
        Ok(ExecutionResult::Advance)
    }

    /// 0x23
    pub(crate) fn op_stop_music(&mut self) -> Result<ExecutionResult, ScriptError> {
        self.mixer.stop_music();
        Ok(ExecutionResult::Advance)
    }

    /// 0x24: attenuation grows with the square of the delta, floored
    pub(crate) fn op_set_volume(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        let delta = args[1];
        let volume = (-(delta.saturating_mul(delta))).max(VOLUME_FLOOR);
        self.mixer.set_volume(args[0], volume.min(0));
        Ok(ExecutionResult::Advance)
    }
}
