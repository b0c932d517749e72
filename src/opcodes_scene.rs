//! Cursor, palette, screen, timing, and scene-transition handlers.

use crate::instruction::WaitPhase;
use crate::interpreter::{ExecutionResult, ScriptInterpreter};
use crate::script::ScriptError;
use log::debug;

/// Palette steps the fade-to-grey sequence walks through
const FADE_STEPS: i32 = 22;

impl ScriptInterpreter {
    /// 0x0D
    pub(crate) fn op_hide_cursor(&mut self) -> Result<ExecutionResult, ScriptError> {
        self.stage.hide_cursor();
        Ok(ExecutionResult::Advance)
    }

    /// 0x0E
    pub(crate) fn op_show_cursor(&mut self) -> Result<ExecutionResult, ScriptError> {
        self.stage.show_cursor();
        Ok(ExecutionResult::Advance)
    }

    /// 0x11: reposition the scene viewport. Instant when speed is zero;
    /// otherwise kick off a scroll and park until the world reports it
    /// settled.
    pub(crate) fn op_move_scene(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        let (x, y, speed) = (args[0], args[1], args[2]);

        if speed < 1 {
            self.world.set_scene_origin(x, y);
            return Ok(ExecutionResult::Advance);
        }

        match self.wait_phase()? {
            WaitPhase::Idle => {
                self.world.begin_scene_scroll(x, y, speed);
                self.set_wait_phase(WaitPhase::Waiting)?;
                Ok(ExecutionResult::Suspend)
            }
            WaitPhase::Waiting => {
                if self.world.scene_scrolling() {
                    Ok(ExecutionResult::Suspend)
                } else {
                    self.set_wait_phase(WaitPhase::Idle)?;
                    Ok(ExecutionResult::Advance)
                }
            }
        }
    }

    /// 0x26: hold this line for a number of ticks. The elapsed count
    /// lives in the second operand slot, so the wait survives
    /// suspension by construction.
    pub(crate) fn op_delay(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        let ticks = args[0];
        if ticks <= 0 {
            return Ok(ExecutionResult::Advance);
        }

        let elapsed = args[1];
        if elapsed >= ticks {
            self.set_operand(1, 0)?;
            Ok(ExecutionResult::Advance)
        } else {
            self.set_operand(1, elapsed + 1)?;
            Ok(ExecutionResult::Suspend)
        }
    }

    /// 0x27: one-shot palette fade
    pub(crate) fn op_palette_fade(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        self.stage.palette_fade(args[0], args[1], args[2]);
        Ok(ExecutionResult::Advance)
    }

    /// 0x28: walk the palette to grey one step per tick, then clear the
    /// screen and hand control to the host. The progress counter lives
    /// in the first operand slot.
    pub(crate) fn op_fade_to_grey(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        if self.wait_phase()? == WaitPhase::Idle {
            self.stage.grey_palette();
            self.set_wait_phase(WaitPhase::Waiting)?;
        }

        let progress = args[0];
        if progress >= FADE_STEPS {
            self.set_operand(0, 0)?;
            self.set_wait_phase(WaitPhase::Idle)?;
            self.stage.clear_screen();
            Ok(ExecutionResult::Exit { resume_next: true })
        } else {
            self.stage.update_palette(progress);
            self.set_operand(0, progress + 1)?;
            Ok(ExecutionResult::Suspend)
        }
    }

    /// 0x29
    pub(crate) fn op_set_palette(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        self.stage.set_palette(args[0]);
        Ok(ExecutionResult::Advance)
    }

    /// 0x2A
    pub(crate) fn op_clear_screen(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        if args[0] != 0 {
            self.stage.clear_screen();
        }
        Ok(ExecutionResult::Advance)
    }

    /// 0x2B: record the scene to load and hand control to the host. The
    /// host reads the index with `take_delayed_scene` after the tick
    /// reports an exit.
    pub(crate) fn op_change_scene(&mut self, args: &[i32]) -> Result<ExecutionResult, ScriptError> {
        debug!("scene change to {} (entry {})", args[0], args[1]);
        self.delayed_scene = Some(args[0]);
        Ok(ExecutionResult::Exit { resume_next: true })
    }

    /// 0x2C: ask the host to shut down
    pub(crate) fn op_quit(&mut self) -> Result<ExecutionResult, ScriptError> {
        self.stage.quit();
        Ok(ExecutionResult::Exit { resume_next: false })
    }
}
