//! Control-flow handlers: return, the condition family, end-if, the
//! jump family, scratch cells, world flags, and queue control.
//!
//! Conditions here are skip-style: an unmet condition deepens the skip
//! counter and the loop ignores following instructions until the
//! matching end-if. The jump-style variants request a validated jump
//! instead.

use crate::interpreter::{ExecutionResult, ScriptInterpreter};
use crate::script::ScriptError;
use log::warn;

/// Comparison modes shared by the scratch and object-frame tests
fn compare(mode: i32, lhs: i32, rhs: i32) -> bool {
    match mode {
        1 => lhs != rhs,
        2 => lhs < rhs,
        3 => lhs > rhs,
        4 => lhs <= rhs,
        5 => lhs >= rhs,
        _ => lhs == rhs,
    }
}

impl ScriptInterpreter {
    /// 0x00: terminal instruction; the queue advances
    pub(crate) fn op_return(&mut self) -> Result<ExecutionResult, ScriptError> {
        Ok(ExecutionResult::Done)
    }

    /// 0x01: condition on a world flag
    pub(crate) fn op_if_world_flag(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        let expected = args[1] != 0;
        if self.world.flag(args[0]) != expected {
            self.fail_condition();
        }
        Ok(ExecutionResult::Advance)
    }

    /// 0x02: condition on an actor standing at exact coordinates
    pub(crate) fn op_if_actor_at(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        let (x, y) = self.world.actor_position(args[0]);
        if x != args[1] || y != args[2] {
            self.fail_condition();
        }
        Ok(ExecutionResult::Advance)
    }

    /// 0x03: condition on a sound resource's playing state
    pub(crate) fn op_if_sound_playing(
        &mut self,
        args: &[i32],
    ) -> Result<ExecutionResult, ScriptError> {
        let expected = args[1] != 0;
        if self.mixer.is_playing(args[0]) != expected {
            self.fail_condition();
        }
        Ok(ExecutionResult::Advance)
    }

    /// 0x04: condition met when roll(range) < threshold
    pub(crate) fn op_if_random(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        if self.rand.roll(args[0]) >= args[1] {
            self.fail_condition();
        }
        Ok(ExecutionResult::Advance)
    }

    /// 0x05: condition comparing a script scratch cell
    pub(crate) fn op_if_scratch(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        match self.scratch_cell(args[0])? {
            Some(lhs) if compare(args[2], lhs, args[1]) => {}
            _ => self.fail_condition(),
        }
        Ok(ExecutionResult::Advance)
    }

    /// 0x06: condition comparing an object's current frame
    pub(crate) fn op_if_object_frame(
        &mut self,
        args: &[i32],
    ) -> Result<ExecutionResult, ScriptError> {
        let frame = self.world.object_frame(args[0]);
        if !compare(args[2], frame, args[1]) {
            self.fail_condition();
        }
        Ok(ExecutionResult::Advance)
    }

    /// 0x07: close one condition level. Executes even while skipping;
    /// that is what unwinds the skip.
    pub(crate) fn op_end_if(&mut self) -> Result<ExecutionResult, ScriptError> {
        self.close_condition();
        Ok(ExecutionResult::Advance)
    }

    /// 0x08: unconditional jump (validated by the loop)
    pub(crate) fn op_jump(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        Ok(self.jump_result(args[0]))
    }

    /// 0x09
    pub(crate) fn op_set_world_flag(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        if args[0] >= 0 {
            self.world.set_flag(args[0], true);
        }
        Ok(ExecutionResult::Advance)
    }

    /// 0x0A
    pub(crate) fn op_clear_world_flag(
        &mut self,
        args: &[i32],
    ) -> Result<ExecutionResult, ScriptError> {
        if args[0] >= 0 {
            self.world.set_flag(args[0], false);
        }
        Ok(ExecutionResult::Advance)
    }

    /// 0x0B
    pub(crate) fn op_toggle_world_flag(
        &mut self,
        args: &[i32],
    ) -> Result<ExecutionResult, ScriptError> {
        if args[0] >= 0 {
            self.world.toggle_flag(args[0]);
        }
        Ok(ExecutionResult::Advance)
    }

    /// 0x0C: jump when the flag state matches the expectation
    pub(crate) fn op_jump_if_world_flag(
        &mut self,
        args: &[i32],
    ) -> Result<ExecutionResult, ScriptError> {
        if args[0] < 0 {
            return Ok(ExecutionResult::Advance);
        }
        let expected = args[1] != 0;
        if self.world.flag(args[0]) == expected {
            return Ok(self.jump_result(args[2]));
        }
        Ok(ExecutionResult::Advance)
    }

    /// 0x10: no-op landing pad for jumps
    pub(crate) fn op_anchor(&mut self) -> Result<ExecutionResult, ScriptError> {
        Ok(ExecutionResult::Advance)
    }

    /// 0x25: jump when the resource's playing state matches
    pub(crate) fn op_jump_if_sound_playing(
        &mut self,
        args: &[i32],
    ) -> Result<ExecutionResult, ScriptError> {
        let expected = args[2] != 0;
        if self.mixer.is_playing(args[0]) == expected {
            return Ok(self.jump_result(args[1]));
        }
        Ok(ExecutionResult::Advance)
    }

    /// 0x2D: jump unless this run concerns the named actor (-1 means the
    /// player). Lets one script serve several actors with per-actor
    /// sections.
    pub(crate) fn op_jump_if_actor(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        let target = if args[0] == -1 {
            self.world.player_index()
        } else {
            args[0]
        };
        if self.current_entry()?.actor_index != target {
            return Ok(self.jump_result(args[1]));
        }
        Ok(ExecutionResult::Advance)
    }

    /// 0x2E: write a scratch cell, optionally with a random value in
    /// [0, value)
    pub(crate) fn op_set_scratch(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        let value = if args[2] != 0 {
            self.rand.roll(args[1])
        } else {
            args[1]
        };
        let cell = args[0];
        match self.valid_cell(cell) {
            Some(cell) => self.current_script_mut()?.scratch[cell] = value,
            None => warn!("set_scratch: no such cell {}", cell),
        }
        Ok(ExecutionResult::Advance)
    }

    /// 0x2F: jump unless the scratch cell comparison holds
    pub(crate) fn op_jump_if_scratch(
        &mut self,
        args: &[i32],
    ) -> Result<ExecutionResult, ScriptError> {
        match self.scratch_cell(args[0])? {
            Some(lhs) if compare(args[2], lhs, args[1]) => Ok(ExecutionResult::Advance),
            _ => Ok(self.jump_result(args[3])),
        }
    }

    /// 0x30: suppress all new enqueues until released. The in-flight
    /// script is unaffected.
    pub(crate) fn op_hold_queue(&mut self) -> Result<ExecutionResult, ScriptError> {
        self.queue_suppressed = true;
        Ok(ExecutionResult::Advance)
    }

    /// 0x31
    pub(crate) fn op_release_queue(&mut self) -> Result<ExecutionResult, ScriptError> {
        self.queue_suppressed = false;
        Ok(ExecutionResult::Advance)
    }

    /// 0x32: schedule a follow-on script for an actor
    pub(crate) fn op_queue_script(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        if args[0] < 0 {
            warn!("queue_script: negative script index {}", args[0]);
            return Ok(ExecutionResult::Advance);
        }
        self.queue_script(args[0] as usize, args[1]);
        Ok(ExecutionResult::Advance)
    }

    /// 0x35: jump unless roll(range) < threshold
    pub(crate) fn op_jump_random(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        if self.rand.roll(args[0]) < args[1] {
            return Ok(ExecutionResult::Advance);
        }
        Ok(self.jump_result(args[2]))
    }

    fn valid_cell(&self, cell: i32) -> Option<usize> {
        if (0..2).contains(&cell) {
            Some(cell as usize)
        } else {
            None
        }
    }

    fn scratch_cell(&self, cell: i32) -> Result<Option<i32>, ScriptError> {
        match self.valid_cell(cell) {
            Some(cell) => Ok(Some(self.current_script_ref()?.scratch[cell])),
            None => {
                warn!("no such scratch cell {}", cell);
                Ok(None)
            }
        }
    }
}
