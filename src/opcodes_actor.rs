//! Actor and object handlers, including the suspend-until patterns that
//! park a script while an animation runs out.

use crate::instruction::WaitPhase;
use crate::interpreter::{ExecutionResult, ScriptInterpreter};
use crate::script::ScriptError;

impl ScriptInterpreter {
    /// 0x12
    pub(crate) fn op_hide_actor(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        self.world.hide_actor(args[0]);
        Ok(ExecutionResult::Advance)
    }

    /// 0x13
    pub(crate) fn op_show_actor(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        self.world.show_actor(args[0]);
        Ok(ExecutionResult::Advance)
    }

    /// 0x14
    pub(crate) fn op_set_actor_position(
        &mut self,
        args: &[i32],
    ) -> Result<ExecutionResult, ScriptError> {
        self.world
            .set_actor_position(args[0], args[1], args[2], args[3]);
        Ok(ExecutionResult::Advance)
    }

    /// 0x15
    pub(crate) fn op_disable_actor(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        self.world.disable_actor(args[0]);
        Ok(ExecutionResult::Advance)
    }

    /// 0x16
    pub(crate) fn op_enable_actor(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        self.world.enable_actor(args[0]);
        Ok(ExecutionResult::Advance)
    }

    /// 0x33
    pub(crate) fn op_actor_face_object(
        &mut self,
        args: &[i32],
    ) -> Result<ExecutionResult, ScriptError> {
        self.world.actor_face_object(args[0], args[1]);
        Ok(ExecutionResult::Advance)
    }

    /// 0x34
    pub(crate) fn op_change_actor_status(
        &mut self,
        args: &[i32],
    ) -> Result<ExecutionResult, ScriptError> {
        self.world.set_actor_status(args[0], args[1]);
        Ok(ExecutionResult::Advance)
    }

    /// 0x0F: start an object animation; when the wait operand is set,
    /// park the script until the animation is no longer running.
    pub(crate) fn op_play_animation(
        &mut self,
        args: &[i32],
    ) -> Result<ExecutionResult, ScriptError> {
        let (object, wait, mode) = (args[0], args[1], args[2]);

        if wait == 0 {
            self.world.start_animation(object, mode);
            return Ok(ExecutionResult::Advance);
        }

        match self.wait_phase()? {
            WaitPhase::Idle => {
                self.world.start_animation(object, mode);
                self.set_wait_phase(WaitPhase::Waiting)?;
                Ok(ExecutionResult::Suspend)
            }
            WaitPhase::Waiting => {
                if self.world.animation_running(object) {
                    Ok(ExecutionResult::Suspend)
                } else {
                    self.set_wait_phase(WaitPhase::Idle)?;
                    Ok(ExecutionResult::Advance)
                }
            }
        }
    }

    /// 0x17: staged reveal. Each tick bumps the script's counter and the
    /// object's build stage; when the counter has run its course the
    /// object is enabled for good.
    pub(crate) fn op_enable_object(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        let (object, step) = (args[0], args[1].max(1));
        let counter = self.current_script_ref()?.counter;

        if counter >= 3 * step - 1 {
            self.current_script_mut()?.counter = 0;
            self.world.set_object_stage(object, 0);
            self.world.enable_object(object);
            Ok(ExecutionResult::Advance)
        } else {
            self.current_script_mut()?.counter = counter + 1;
            self.world.set_object_stage(object, counter / step + 1);
            Ok(ExecutionResult::Suspend)
        }
    }

    /// 0x18
    pub(crate) fn op_disable_object(
        &mut self,
        args: &[i32],
    ) -> Result<ExecutionResult, ScriptError> {
        self.world.disable_object(args[0]);
        Ok(ExecutionResult::Advance)
    }

    /// 0x19
    pub(crate) fn op_remove_object(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        if args[0] != 0 {
            self.world.remove_object(args[0]);
        }
        Ok(ExecutionResult::Advance)
    }

    /// 0x1A: rewind an object's animation to its first frame
    pub(crate) fn op_reset_animation(
        &mut self,
        args: &[i32],
    ) -> Result<ExecutionResult, ScriptError> {
        self.world.set_object_frame(args[0], 0);
        Ok(ExecutionResult::Advance)
    }

    /// 0x1B: pin an object to a frame, enabled or not
    pub(crate) fn op_set_object_frame(
        &mut self,
        args: &[i32],
    ) -> Result<ExecutionResult, ScriptError> {
        let (object, frame, enabled) = (args[0], args[1], args[2]);
        if enabled != 0 {
            self.world.enable_object(object);
        } else {
            self.world.disable_object(object);
        }
        self.world.set_object_frame(object, frame);
        Ok(ExecutionResult::Advance)
    }

    /// 0x1C: park until the object reaches the given frame (-1 means its
    /// last frame)
    pub(crate) fn op_wait_object_frame(
        &mut self,
        args: &[i32],
    ) -> Result<ExecutionResult, ScriptError> {
        let object = args[0];
        let frame = if args[1] == -1 {
            self.world.object_frame_count(object) - 1
        } else {
            args[1]
        };

        if self.world.object_frame(object) != frame {
            Ok(ExecutionResult::Suspend)
        } else {
            Ok(ExecutionResult::Advance)
        }
    }

    /// 0x1D: park until the object's animation sits on its last frame
    pub(crate) fn op_wait_animation_end(
        &mut self,
        args: &[i32],
    ) -> Result<ExecutionResult, ScriptError> {
        let object = args[0];
        if self.world.object_frame(object) == self.world.object_frame_count(object) - 1 {
            Ok(ExecutionResult::Advance)
        } else {
            Ok(ExecutionResult::Suspend)
        }
    }
}
