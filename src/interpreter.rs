//! The script processor: one logical thread of script execution, driven
//! one tick per host frame.
//!
//! A tick runs as many instructions of the current script as it can and
//! stops the moment a handler needs to wait on something external
//! (suspension), asks the host to take over (exit), or the queue runs
//! dry. Suspension is not a coroutine: it is the current line plus
//! whatever state handlers left in their operand slots, preserved across
//! host-driven ticks.

use crate::config::Config;
use crate::instruction::{Instruction, WaitPhase};
use crate::opcode_table::{self, OpcodeKind, OpcodeTable};
use crate::queue::{QueueEntry, ScriptQueue};
use crate::rng::ScriptRand;
use crate::script::{Script, ScriptError, ScriptStore};
use crate::trace::DispatchStats;
use crate::variables::Globals;
use crate::world::{Mixer, Stage, WorldModel};
use log::{debug, error, warn};

/// Result of executing one instruction. Handlers steer the loop with
/// this instead of toggling loop-internal flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Move to the next line
    Advance,
    /// Request a jump; the loop validates the landing site before
    /// honoring it (see `jump_to`)
    JumpTo(u32),
    /// Stop the tick, keep the current line; the same instruction is
    /// re-executed on the next tick
    Suspend,
    /// The script is finished; the queue advances
    Done,
    /// Stop the tick and report to the host (scene change, quit).
    /// `resume_next` picks the line execution resumes at if this script
    /// set survives the host's reaction.
    Exit { resume_next: bool },
}

/// Processor state as observable between ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    /// No current script; ticks are no-ops
    Idle,
    /// A current script is parked mid-execution awaiting the next tick
    Suspended,
}

/// The script interpreter core. Owns the opcode table, the scene's
/// script store, the execution queue, and the global variable table;
/// reaches the rest of the engine only through the injected collaborator
/// traits.
pub struct ScriptInterpreter {
    table: OpcodeTable,
    pub store: ScriptStore,
    pub globals: Globals,
    queue: ScriptQueue,
    pub(crate) world: Box<dyn WorldModel>,
    pub(crate) mixer: Box<dyn Mixer>,
    pub(crate) stage: Box<dyn Stage>,
    pub(crate) rand: ScriptRand,
    stats: DispatchStats,
    config: Config,

    current: Option<QueueEntry>,
    current_line: u32,
    skip_depth: u32,
    pub(crate) queue_suppressed: bool,
    pub(crate) delayed_scene: Option<i32>,
    exit_requested: bool,
    in_tick: bool,
}

impl ScriptInterpreter {
    pub fn new(
        store: ScriptStore,
        world: Box<dyn WorldModel>,
        mixer: Box<dyn Mixer>,
        stage: Box<dyn Stage>,
        config: Config,
    ) -> Self {
        let rand = match config.rng_seed {
            Some(seed) => ScriptRand::new_predictable(seed),
            None => ScriptRand::new_uniform(),
        };
        let globals = Globals::new(config.global_words, config.global_bytes);

        ScriptInterpreter {
            table: OpcodeTable::new(),
            store,
            globals,
            queue: ScriptQueue::new(),
            world,
            mixer,
            stage,
            rand,
            stats: DispatchStats::new(),
            config,
            current: None,
            current_line: 0,
            skip_depth: 0,
            queue_suppressed: false,
            delayed_scene: None,
            exit_requested: false,
            in_tick: false,
        }
    }

    /// Request a run of `script_index` on behalf of `actor_index`.
    ///
    /// If the processor is idle the request becomes current immediately;
    /// otherwise it waits its turn in FIFO order. While queuing is
    /// suppressed (see the hold-queue opcode) requests are dropped
    /// without affecting the in-flight script.
    pub fn queue_script(&mut self, script_index: usize, actor_index: i32) {
        if self.queue_suppressed {
            debug!("queue suppressed; dropping script {}", script_index);
            return;
        }
        if script_index >= self.store.len() {
            warn!(
                "ignoring request for script {} (store holds {})",
                script_index,
                self.store.len()
            );
            return;
        }

        let entry = QueueEntry {
            script_index,
            actor_index,
        };

        if self.current.is_some() {
            self.queue.push(entry);
        } else {
            debug!(
                "script {} now current (actor {})",
                script_index, actor_index
            );
            self.current = Some(entry);
            self.current_line = 0;
            self.skip_depth = 0;
        }
    }

    /// Whether a run of `script_index` is pending in the queue. Does not
    /// consider the current script.
    pub fn is_queued(&self, script_index: usize) -> bool {
        self.queue.contains(script_index)
    }

    /// Run one tick. Returns true when a handler requested an exit this
    /// tick (scene change or quit) so the host can react before ticking
    /// again. A tick with no current script is a no-op.
    pub fn tick(&mut self) -> bool {
        if self.in_tick {
            debug_assert!(false, "tick() re-entered in violation of the host contract");
            error!("tick() re-entered; ignoring the nested call");
            return false;
        }
        if self.current.is_none() {
            return false;
        }

        self.in_tick = true;
        self.exit_requested = false;
        self.run_current();
        self.in_tick = false;

        self.exit_requested
    }

    /// Scene teardown: drop the queue and all scripts, return to Idle.
    /// The global variable table survives (it is process-wide, not
    /// scene-scoped); restart hosts clear it separately.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.store.clear();
        self.current = None;
        self.current_line = 0;
        self.skip_depth = 0;
        self.queue_suppressed = false;
        self.delayed_scene = None;
        self.exit_requested = false;
        self.stats.clear();
    }

    /// Replace the scene's scripts, resetting the processor first
    pub fn install_scripts(&mut self, store: ScriptStore) {
        self.reset();
        self.store = store;
    }

    /// The scene index recorded by a change-scene opcode, if any.
    /// Cleared by the read.
    pub fn take_delayed_scene(&mut self) -> Option<i32> {
        self.delayed_scene.take()
    }

    pub fn state(&self) -> ProcessorState {
        if self.current.is_some() {
            ProcessorState::Suspended
        } else {
            ProcessorState::Idle
        }
    }

    pub fn current_script(&self) -> Option<usize> {
        self.current.map(|e| e.script_index)
    }

    pub fn current_line(&self) -> u32 {
        self.current_line
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queue_suppressed(&self) -> bool {
        self.queue_suppressed
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    // ---- the fetch/decode/dispatch cycle ----

    fn run_current(&mut self) {
        let mut executed: u32 = 0;

        while let Some(entry) = self.current {
            if executed >= self.config.max_instructions_per_tick {
                error!(
                    "script {}: {} instructions without yielding; forcing suspension",
                    entry.script_index, executed
                );
                break;
            }
            executed += 1;

            let script = entry.script_index;
            let line = self.current_line as usize;

            // fetch
            let opcode = match self
                .store
                .scripts
                .get(script)
                .and_then(|s| s.lines.get(line))
            {
                Some(inst) => inst.opcode,
                None => {
                    error!(
                        "{}; aborting script",
                        ScriptError::LineOutOfRange { script, line }
                    );
                    self.finish_current();
                    continue;
                }
            };

            let meta = match self.table.lookup(opcode, script, line) {
                Ok(meta) => meta,
                Err(e) => {
                    error!("{}; aborting script", e);
                    self.finish_current();
                    continue;
                }
            };

            // condition skip: everything but the return/jump family is
            // inert while a condition is unmet; skipped conditions nest
            if self.skip_depth > 0 && !opcode_table::always_executes(opcode) {
                debug!(
                    "[0x{:02X}] {} skipped (depth {})",
                    opcode, meta.name, self.skip_depth
                );
                if opcode_table::is_condition_opcode(opcode) {
                    self.skip_depth += 1;
                }
                self.current_line += 1;
                continue;
            }

            // decode the declared operand count's worth of operands
            let args = match self.resolve_args(script, line, meta.arity as usize) {
                Ok(args) => args,
                Err(e) => {
                    error!(
                        "script {} line {}: {}; aborting script",
                        script, line, e
                    );
                    self.finish_current();
                    continue;
                }
            };

            debug!(
                "[0x{:02X}] {} {:?} (script {} line {})",
                opcode, meta.name, args, script, line
            );
            self.stats.record(meta.name);

            match self.dispatch(meta.kind, &args) {
                Ok(ExecutionResult::Advance) => self.current_line += 1,
                Ok(ExecutionResult::JumpTo(target)) => self.jump_to(target),
                Ok(ExecutionResult::Suspend) => break,
                Ok(ExecutionResult::Done) => self.finish_current(),
                Ok(ExecutionResult::Exit { resume_next }) => {
                    if resume_next {
                        self.current_line += 1;
                    }
                    self.exit_requested = true;
                    break;
                }
                Err(e) => {
                    error!(
                        "script {} aborted at line {}: {}",
                        script, line, e
                    );
                    self.finish_current();
                }
            }
        }
    }

    /// Honor a validated jump, or terminate the script. A jump may only
    /// land on the designated no-op opcode or on opcode 0; landing
    /// anywhere else would drop execution into the middle of a live,
    /// possibly stateful instruction, so the script ends instead.
    fn jump_to(&mut self, target: u32) {
        let entry = match self.current {
            Some(e) => e,
            None => {
                debug_assert!(false, "jump_to with no current script");
                error!("jump_to with no current script; host contract violated");
                return;
            }
        };

        let landing = self
            .store
            .scripts
            .get(entry.script_index)
            .and_then(|s| s.lines.get(target as usize))
            .map(|inst| inst.opcode);

        match landing {
            Some(op) if opcode_table::is_safe_jump_target(op) => {
                self.current_line = target;
            }
            Some(op) => {
                debug!(
                    "script {}: jump target line {} holds live opcode 0x{:02X}; ending script",
                    entry.script_index, target, op
                );
                self.finish_current();
            }
            None => {
                warn!(
                    "script {}: jump target {} out of range; ending script",
                    entry.script_index, target
                );
                self.finish_current();
            }
        }
    }

    /// The current script is over: pull the next queued entry onto the
    /// processor, or go idle.
    fn finish_current(&mut self) {
        self.skip_depth = 0;
        self.current_line = 0;
        self.current = self.queue.pop();
        match self.current {
            Some(e) => debug!(
                "script {} now current (actor {})",
                e.script_index, e.actor_index
            ),
            None => debug!("processor idle"),
        }
    }

    fn resolve_args(
        &self,
        script: usize,
        line: usize,
        arity: usize,
    ) -> Result<Vec<i32>, ScriptError> {
        let inst = self
            .store
            .scripts
            .get(script)
            .and_then(|s| s.lines.get(line))
            .ok_or(ScriptError::LineOutOfRange { script, line })?;

        let mut args = Vec::with_capacity(arity);
        for operand in inst.operands.iter().take(arity) {
            args.push(operand.resolve(&self.globals)?);
        }
        Ok(args)
    }

    fn dispatch(
        &mut self,
        kind: OpcodeKind,
        args: &[i32],
    ) -> Result<ExecutionResult, ScriptError> {
        use OpcodeKind::*;

        match kind {
            Return => self.op_return(),
            IfWorldFlag => self.op_if_world_flag(args),
            IfActorAt => self.op_if_actor_at(args),
            IfSoundPlaying => self.op_if_sound_playing(args),
            IfRandom => self.op_if_random(args),
            IfScratch => self.op_if_scratch(args),
            IfObjectFrame => self.op_if_object_frame(args),
            EndIf => self.op_end_if(),
            Jump => self.op_jump(args),
            SetWorldFlag => self.op_set_world_flag(args),
            ClearWorldFlag => self.op_clear_world_flag(args),
            ToggleWorldFlag => self.op_toggle_world_flag(args),
            JumpIfWorldFlag => self.op_jump_if_world_flag(args),
            HideCursor => self.op_hide_cursor(),
            ShowCursor => self.op_show_cursor(),
            PlayAnimation => self.op_play_animation(args),
            Anchor => self.op_anchor(),
            MoveScene => self.op_move_scene(args),
            HideActor => self.op_hide_actor(args),
            ShowActor => self.op_show_actor(args),
            SetActorPosition => self.op_set_actor_position(args),
            DisableActor => self.op_disable_actor(args),
            EnableActor => self.op_enable_actor(args),
            EnableObject => self.op_enable_object(args),
            DisableObject => self.op_disable_object(args),
            RemoveObject => self.op_remove_object(args),
            ResetAnimation => self.op_reset_animation(args),
            SetObjectFrame => self.op_set_object_frame(args),
            WaitObjectFrame => self.op_wait_object_frame(args),
            WaitAnimationEnd => self.op_wait_animation_end(args),
            PlaySound => self.op_play_sound(args),
            PlaySoundAndWait => self.op_play_sound_and_wait(args),
            StopSound => self.op_stop_sound(args),
            StopObjectSounds => self.op_stop_object_sounds(args),
            ChangeMusic => self.op_change_music(args),
            StopMusic => self.op_stop_music(),
            SetVolume => self.op_set_volume(args),
            JumpIfSoundPlaying => self.op_jump_if_sound_playing(args),
            Delay => self.op_delay(args),
            PaletteFade => self.op_palette_fade(args),
            FadeToGrey => self.op_fade_to_grey(args),
            SetPalette => self.op_set_palette(args),
            ClearScreen => self.op_clear_screen(args),
            ChangeScene => self.op_change_scene(args),
            Quit => self.op_quit(),
            JumpIfActor => self.op_jump_if_actor(args),
            SetScratch => self.op_set_scratch(args),
            JumpIfScratch => self.op_jump_if_scratch(args),
            HoldQueue => self.op_hold_queue(),
            ReleaseQueue => self.op_release_queue(),
            QueueScript => self.op_queue_script(args),
            ActorFaceObject => self.op_actor_face_object(args),
            ChangeActorStatus => self.op_change_actor_status(args),
            JumpRandom => self.op_jump_random(args),
        }
    }

    // ---- helpers for the opcode handlers ----

    /// The queue entry being executed
    pub(crate) fn current_entry(&self) -> Result<QueueEntry, ScriptError> {
        self.current.ok_or(ScriptError::NoCurrentScript)
    }

    fn current_instruction_mut(&mut self) -> Result<&mut Instruction, ScriptError> {
        let entry = self.current.ok_or(ScriptError::NoCurrentScript)?;
        let line = self.current_line as usize;
        self.store
            .scripts
            .get_mut(entry.script_index)
            .and_then(|s| s.lines.get_mut(line))
            .ok_or(ScriptError::LineOutOfRange {
                script: entry.script_index,
                line,
            })
    }

    /// Store through one operand of the executing instruction (in place
    /// for immediates, write-through for variable references)
    pub(crate) fn set_operand(&mut self, index: usize, value: i32) -> Result<(), ScriptError> {
        let entry = self.current.ok_or(ScriptError::NoCurrentScript)?;
        let line = self.current_line as usize;
        let inst = self
            .store
            .scripts
            .get_mut(entry.script_index)
            .and_then(|s| s.lines.get_mut(line))
            .ok_or(ScriptError::LineOutOfRange {
                script: entry.script_index,
                line,
            })?;
        inst.operands[index].store(&mut self.globals, value)
    }

    pub(crate) fn wait_phase(&self) -> Result<WaitPhase, ScriptError> {
        let entry = self.current.ok_or(ScriptError::NoCurrentScript)?;
        let line = self.current_line as usize;
        self.store
            .scripts
            .get(entry.script_index)
            .and_then(|s| s.lines.get(line))
            .map(|inst| inst.phase)
            .ok_or(ScriptError::LineOutOfRange {
                script: entry.script_index,
                line,
            })
    }

    pub(crate) fn set_wait_phase(&mut self, phase: WaitPhase) -> Result<(), ScriptError> {
        self.current_instruction_mut()?.phase = phase;
        Ok(())
    }

    /// The executing script's scalar cells (counter, scratch)
    pub(crate) fn current_script_mut(&mut self) -> Result<&mut Script, ScriptError> {
        let entry = self.current.ok_or(ScriptError::NoCurrentScript)?;
        self.store
            .scripts
            .get_mut(entry.script_index)
            .ok_or(ScriptError::NoCurrentScript)
    }

    pub(crate) fn current_script_ref(&self) -> Result<&Script, ScriptError> {
        let entry = self.current.ok_or(ScriptError::NoCurrentScript)?;
        self.store
            .scripts
            .get(entry.script_index)
            .ok_or(ScriptError::NoCurrentScript)
    }

    /// An unmet condition: deepen the skip
    pub(crate) fn fail_condition(&mut self) {
        self.skip_depth += 1;
    }

    /// Pop one skip level (the end-if handler)
    pub(crate) fn close_condition(&mut self) {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
        }
    }

    /// Turn a script-supplied line operand into a jump request. Negative
    /// lines are malformed and end the script, same as an unsafe landing.
    pub(crate) fn jump_result(&self, target: i32) -> ExecutionResult {
        if target < 0 {
            warn!("negative jump target {}; ending script", target);
            ExecutionResult::Done
        } else {
            ExecutionResult::JumpTo(target as u32)
        }
    }
}
