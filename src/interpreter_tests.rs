mod tests {
    use crate::config::Config;
    use crate::instruction::{Instruction, OperandKind, WaitPhase};
    use crate::interpreter::{ProcessorState, ScriptInterpreter};
    use crate::script::{Script, ScriptStore};
    use crate::world::{Mixer, Stage, WorldModel};
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::rc::Rc;
    use test_log::test;

    // opcode numbers used by the literal test scripts
    const OP_RETURN: u32 = 0x00;
    const OP_IF_WORLD_FLAG: u32 = 0x01;
    const OP_END_IF: u32 = 0x07;
    const OP_JUMP: u32 = 0x08;
    const OP_SET_WORLD_FLAG: u32 = 0x09;
    const OP_PLAY_ANIMATION: u32 = 0x0F;
    const OP_ANCHOR: u32 = 0x10;
    const OP_ENABLE_OBJECT: u32 = 0x17;
    const OP_WAIT_OBJECT_FRAME: u32 = 0x1C;
    const OP_PLAY_SOUND_AND_WAIT: u32 = 0x1F;
    const OP_DELAY: u32 = 0x26;
    const OP_CHANGE_SCENE: u32 = 0x2B;
    const OP_QUIT: u32 = 0x2C;
    const OP_HOLD_QUEUE: u32 = 0x30;

    #[derive(Default)]
    struct WorldState {
        flags: HashSet<i32>,
        flag_ops: Vec<(i32, bool)>,
        actor_positions: HashMap<i32, (i32, i32)>,
        object_frames: HashMap<i32, i32>,
        object_frame_counts: HashMap<i32, i32>,
        animation_answers: VecDeque<bool>,
        animations_started: Vec<(i32, i32)>,
        objects_enabled: Vec<i32>,
        object_stages: Vec<(i32, i32)>,
        player: i32,
    }

    #[derive(Clone, Default)]
    struct MockWorld {
        state: Rc<RefCell<WorldState>>,
    }

    impl WorldModel for MockWorld {
        fn flag(&self, flag: i32) -> bool {
            self.state.borrow().flags.contains(&flag)
        }
        fn set_flag(&mut self, flag: i32, on: bool) {
            let mut state = self.state.borrow_mut();
            state.flag_ops.push((flag, on));
            if on {
                state.flags.insert(flag);
            } else {
                state.flags.remove(&flag);
            }
        }
        fn toggle_flag(&mut self, flag: i32) {
            let on = !self.flag(flag);
            self.set_flag(flag, on);
        }
        fn player_index(&self) -> i32 {
            self.state.borrow().player
        }
        fn actor_position(&self, actor: i32) -> (i32, i32) {
            self.state
                .borrow()
                .actor_positions
                .get(&actor)
                .copied()
                .unwrap_or((0, 0))
        }
        fn set_actor_position(&mut self, actor: i32, x: i32, y: i32, _direction: i32) {
            self.state.borrow_mut().actor_positions.insert(actor, (x, y));
        }
        fn show_actor(&mut self, _actor: i32) {}
        fn hide_actor(&mut self, _actor: i32) {}
        fn enable_actor(&mut self, _actor: i32) {}
        fn disable_actor(&mut self, _actor: i32) {}
        fn set_actor_status(&mut self, _actor: i32, _status: i32) {}
        fn actor_face_object(&mut self, _actor: i32, _object: i32) {}
        fn object_frame(&self, object: i32) -> i32 {
            self.state
                .borrow()
                .object_frames
                .get(&object)
                .copied()
                .unwrap_or(0)
        }
        fn object_frame_count(&self, object: i32) -> i32 {
            self.state
                .borrow()
                .object_frame_counts
                .get(&object)
                .copied()
                .unwrap_or(10)
        }
        fn set_object_frame(&mut self, object: i32, frame: i32) {
            self.state.borrow_mut().object_frames.insert(object, frame);
        }
        fn enable_object(&mut self, object: i32) {
            self.state.borrow_mut().objects_enabled.push(object);
        }
        fn disable_object(&mut self, _object: i32) {}
        fn remove_object(&mut self, _object: i32) {}
        fn set_object_stage(&mut self, object: i32, stage: i32) {
            self.state.borrow_mut().object_stages.push((object, stage));
        }
        fn start_animation(&mut self, object: i32, mode: i32) {
            self.state.borrow_mut().animations_started.push((object, mode));
        }
        fn animation_running(&self, _object: i32) -> bool {
            self.state
                .borrow_mut()
                .animation_answers
                .pop_front()
                .unwrap_or(false)
        }
        fn set_scene_origin(&mut self, _x: i32, _y: i32) {}
        fn begin_scene_scroll(&mut self, _x: i32, _y: i32, _speed: i32) {}
        fn scene_scrolling(&self) -> bool {
            false
        }
    }

    #[derive(Default)]
    struct MixerState {
        started: Vec<(i32, bool, i32)>,
        stopped: Vec<i32>,
        playing_answers: VecDeque<bool>,
    }

    #[derive(Clone, Default)]
    struct MockMixer {
        state: Rc<RefCell<MixerState>>,
    }

    impl Mixer for MockMixer {
        fn play_sound(&mut self, resource: i32, looping: bool, volume: i32) {
            self.state.borrow_mut().started.push((resource, looping, volume));
        }
        fn stop_sound(&mut self, resource: i32) {
            self.state.borrow_mut().stopped.push(resource);
        }
        fn is_playing(&self, _resource: i32) -> bool {
            self.state
                .borrow_mut()
                .playing_answers
                .pop_front()
                .unwrap_or(false)
        }
        fn stop_object_sounds(&mut self, _object: i32) {}
        fn change_music(&mut self, _resource: i32, _fade: bool) {}
        fn stop_music(&mut self) {}
        fn set_volume(&mut self, _resource: i32, _volume: i32) {}
    }

    #[derive(Default)]
    struct StageState {
        calls: Vec<String>,
    }

    #[derive(Clone, Default)]
    struct MockStage {
        state: Rc<RefCell<StageState>>,
    }

    impl Stage for MockStage {
        fn show_cursor(&mut self) {
            self.state.borrow_mut().calls.push("show_cursor".into());
        }
        fn hide_cursor(&mut self) {
            self.state.borrow_mut().calls.push("hide_cursor".into());
        }
        fn clear_screen(&mut self) {
            self.state.borrow_mut().calls.push("clear_screen".into());
        }
        fn set_palette(&mut self, palette: i32) {
            self.state.borrow_mut().calls.push(format!("palette {}", palette));
        }
        fn palette_fade(&mut self, _start: i32, _step: i32, _count: i32) {
            self.state.borrow_mut().calls.push("palette_fade".into());
        }
        fn grey_palette(&mut self) {
            self.state.borrow_mut().calls.push("grey_palette".into());
        }
        fn update_palette(&mut self, step: i32) {
            self.state.borrow_mut().calls.push(format!("fade_step {}", step));
        }
        fn quit(&mut self) {
            self.state.borrow_mut().calls.push("quit".into());
        }
    }

    fn test_config() -> Config {
        Config {
            max_instructions_per_tick: 500,
            rng_seed: Some(7),
            ..Config::default()
        }
    }

    fn inst(opcode: u32, args: &[i32]) -> Instruction {
        let mut inst = Instruction::zeroed();
        inst.opcode = opcode;
        for (i, a) in args.iter().enumerate() {
            inst.operands[i].raw = *a;
        }
        inst
    }

    fn script(lines: &[Instruction]) -> Script {
        let mut script = Script::empty();
        for (i, line) in lines.iter().enumerate() {
            script.lines[i] = line.clone();
        }
        script
    }

    fn build(scripts: Vec<Script>) -> (ScriptInterpreter, MockWorld, MockMixer, MockStage) {
        let world = MockWorld::default();
        let mixer = MockMixer::default();
        let stage = MockStage::default();
        let interp = ScriptInterpreter::new(
            ScriptStore { scripts },
            Box::new(world.clone()),
            Box::new(mixer.clone()),
            Box::new(stage.clone()),
            test_config(),
        );
        (interp, world, mixer, stage)
    }

    /// [set_world_flag <flag>, return]
    fn flag_script(flag: i32) -> Script {
        script(&[
            inst(OP_SET_WORLD_FLAG, &[flag]),
            inst(OP_RETURN, &[]),
        ])
    }

    #[test]
    fn test_single_current_invariant() {
        let (mut interp, _world, _mixer, _stage) = build(vec![flag_script(1), flag_script(2)]);

        // idle processor: the first request bypasses the queue
        interp.queue_script(0, 0);
        assert_eq!(interp.current_script(), Some(0));
        assert_eq!(interp.queue_len(), 0);

        // busy processor: the second request waits its turn
        interp.queue_script(1, 0);
        assert_eq!(interp.current_script(), Some(0));
        assert_eq!(interp.queue_len(), 1);
    }

    #[test]
    fn test_fifo_fairness_straight_line() {
        let (mut interp, world, _mixer, _stage) =
            build(vec![flag_script(10), flag_script(20), flag_script(30)]);

        interp.queue_script(0, 0);
        interp.queue_script(1, 0);
        interp.queue_script(2, 0);

        // straight-line scripts all finish within one tick, in order
        assert!(!interp.tick());
        assert_eq!(interp.state(), ProcessorState::Idle);
        let ops = world.state.borrow().flag_ops.clone();
        assert_eq!(ops, vec![(10, true), (20, true), (30, true)]);
    }

    #[test]
    fn test_fifo_fairness_across_suspension() {
        // A waits two ticks before flagging; B must not start early
        let a = script(&[
            inst(OP_DELAY, &[2, 0]),
            inst(OP_SET_WORLD_FLAG, &[1]),
            inst(OP_RETURN, &[]),
        ]);
        let b = flag_script(2);
        let (mut interp, world, _mixer, _stage) = build(vec![a, b]);

        interp.queue_script(0, 0);
        interp.queue_script(1, 0);

        interp.tick();
        interp.tick();
        assert!(world.state.borrow().flag_ops.is_empty());
        assert_eq!(interp.current_script(), Some(0));

        interp.tick();
        assert_eq!(interp.state(), ProcessorState::Idle);
        let ops = world.state.borrow().flag_ops.clone();
        assert_eq!(ops, vec![(1, true), (2, true)]);
    }

    #[test]
    fn test_suspend_resume_idempotence() {
        let waiting = script(&[
            inst(OP_WAIT_OBJECT_FRAME, &[3, 5]),
            inst(OP_RETURN, &[]),
        ]);
        let (mut interp, world, _mixer, _stage) = build(vec![waiting]);

        interp.queue_script(0, 9);
        interp.tick();
        assert_eq!(interp.state(), ProcessorState::Suspended);
        assert_eq!(interp.current_line(), 0);

        // the exact same instruction is re-fetched, operands untouched
        interp.tick();
        assert_eq!(interp.current_line(), 0);
        let operands = interp.store.scripts[0].lines[0].operands;
        assert_eq!(operands[0].raw, 3);
        assert_eq!(operands[1].raw, 5);

        world.state.borrow_mut().object_frames.insert(3, 5);
        interp.tick();
        assert_eq!(interp.state(), ProcessorState::Idle);
    }

    #[test]
    fn test_condition_skip_nesting() {
        // both conditions unmet: depth reaches 2, OpX skipped, OpY runs
        let lines = script(&[
            inst(OP_IF_WORLD_FLAG, &[1, 1]),
            inst(OP_IF_WORLD_FLAG, &[2, 1]),
            inst(OP_SET_WORLD_FLAG, &[50]),
            inst(OP_END_IF, &[]),
            inst(OP_END_IF, &[]),
            inst(OP_SET_WORLD_FLAG, &[60]),
            inst(OP_RETURN, &[]),
        ]);
        let (mut interp, world, _mixer, _stage) = build(vec![lines]);

        interp.queue_script(0, 0);
        interp.tick();

        assert_eq!(interp.state(), ProcessorState::Idle);
        let state = world.state.borrow();
        assert!(!state.flags.contains(&50));
        assert!(state.flags.contains(&60));
    }

    #[test]
    fn test_condition_met_runs_body() {
        let lines = script(&[
            inst(OP_IF_WORLD_FLAG, &[1, 1]),
            inst(OP_SET_WORLD_FLAG, &[50]),
            inst(OP_END_IF, &[]),
            inst(OP_RETURN, &[]),
        ]);
        let (mut interp, world, _mixer, _stage) = build(vec![lines]);

        let mut handle = world.clone();
        handle.set_flag(1, true);
        interp.queue_script(0, 0);
        interp.tick();

        assert!(world.state.borrow().flags.contains(&50));
    }

    #[test]
    fn test_return_executes_inside_skip() {
        // the return family is immune to condition skipping
        let lines = script(&[
            inst(OP_IF_WORLD_FLAG, &[1, 1]),
            inst(OP_SET_WORLD_FLAG, &[50]),
            inst(OP_RETURN, &[]),
            inst(OP_END_IF, &[]),
            inst(OP_SET_WORLD_FLAG, &[60]),
            inst(OP_RETURN, &[]),
        ]);
        let (mut interp, world, _mixer, _stage) = build(vec![lines]);

        interp.queue_script(0, 0);
        interp.tick();

        assert_eq!(interp.state(), ProcessorState::Idle);
        let state = world.state.borrow();
        assert!(!state.flags.contains(&50));
        assert!(!state.flags.contains(&60));
    }

    #[test]
    fn test_invalid_opcode_recovery() {
        let broken = script(&[inst(0xFE, &[])]);
        let next = flag_script(7);
        let (mut interp, world, _mixer, _stage) = build(vec![broken, next]);

        interp.queue_script(0, 0);
        interp.queue_script(1, 0);
        assert!(!interp.tick());

        // the broken script aborted; the queue proceeded
        assert_eq!(interp.state(), ProcessorState::Idle);
        assert!(world.state.borrow().flags.contains(&7));
    }

    #[test]
    fn test_sound_wait_scenario() {
        let lines = script(&[
            inst(OP_PLAY_SOUND_AND_WAIT, &[5, 0, 0]),
            inst(OP_RETURN, &[]),
        ]);
        let (mut interp, _world, mixer, _stage) = build(vec![lines]);

        mixer
            .state
            .borrow_mut()
            .playing_answers
            .extend([true, false]);

        interp.queue_script(0, 0);

        // tick 1: the sound starts and the script parks on the wait
        interp.tick();
        assert_eq!(interp.state(), ProcessorState::Suspended);
        assert_eq!(interp.current_line(), 0);
        assert_eq!(mixer.state.borrow().started, vec![(5, false, 0)]);
        assert_eq!(
            interp.store.scripts[0].lines[0].phase,
            WaitPhase::Waiting
        );

        // tick 2: still audible
        interp.tick();
        assert_eq!(interp.state(), ProcessorState::Suspended);
        assert_eq!(interp.current_line(), 0);

        // tick 3: silence; the wait ends and the return runs this tick
        interp.tick();
        assert_eq!(interp.state(), ProcessorState::Idle);
        // started exactly once
        assert_eq!(mixer.state.borrow().started.len(), 1);
    }

    #[test]
    fn test_jump_safety_net_terminates_script() {
        // target line holds a live opcode: the script ends instead of jumping
        let lines = script(&[
            inst(OP_JUMP, &[2]),
            inst(OP_SET_WORLD_FLAG, &[9]),
            inst(OP_SET_WORLD_FLAG, &[10]),
            inst(OP_RETURN, &[]),
        ]);
        let (mut interp, world, _mixer, _stage) = build(vec![lines]);

        interp.queue_script(0, 0);
        interp.tick();

        assert_eq!(interp.state(), ProcessorState::Idle);
        assert!(world.state.borrow().flag_ops.is_empty());
    }

    #[test]
    fn test_jump_to_anchor_continues() {
        let lines = script(&[
            inst(OP_JUMP, &[2]),
            inst(OP_SET_WORLD_FLAG, &[9]),
            inst(OP_ANCHOR, &[]),
            inst(OP_SET_WORLD_FLAG, &[10]),
            inst(OP_RETURN, &[]),
        ]);
        let (mut interp, world, _mixer, _stage) = build(vec![lines]);

        interp.queue_script(0, 0);
        interp.tick();

        assert_eq!(interp.state(), ProcessorState::Idle);
        let state = world.state.borrow();
        assert!(!state.flags.contains(&9));
        assert!(state.flags.contains(&10));
    }

    #[test]
    fn test_jump_to_padding_is_honored() {
        // opcode 0 is a legal landing; the zero-fill line returns
        let lines = script(&[inst(OP_JUMP, &[40]), inst(OP_SET_WORLD_FLAG, &[9])]);
        let (mut interp, world, _mixer, _stage) = build(vec![lines]);

        interp.queue_script(0, 0);
        interp.tick();

        assert_eq!(interp.state(), ProcessorState::Idle);
        assert!(world.state.borrow().flag_ops.is_empty());
    }

    #[test]
    fn test_jump_out_of_range_terminates() {
        let lines = script(&[inst(OP_JUMP, &[5000])]);
        let (mut interp, _world, _mixer, _stage) = build(vec![lines]);

        interp.queue_script(0, 0);
        interp.tick();
        assert_eq!(interp.state(), ProcessorState::Idle);
    }

    #[test]
    fn test_suppressed_enqueue() {
        let holder = script(&[
            inst(OP_HOLD_QUEUE, &[]),
            inst(OP_DELAY, &[5, 0]),
            inst(OP_RETURN, &[]),
        ]);
        let other = flag_script(3);
        let (mut interp, _world, _mixer, _stage) = build(vec![holder, other]);

        interp.queue_script(0, 0);
        interp.tick();
        assert!(interp.queue_suppressed());
        assert_eq!(interp.current_script(), Some(0));

        // while suppressed, requests vanish without touching anything
        interp.queue_script(1, 0);
        assert_eq!(interp.queue_len(), 0);
        assert_eq!(interp.current_script(), Some(0));
        assert_eq!(interp.current_line(), 1);
    }

    #[test]
    fn test_tick_budget_forces_suspension() {
        // lines 1-2 jump back and forth forever within one tick
        let lines = script(&[
            inst(OP_JUMP, &[1]),
            inst(OP_ANCHOR, &[]),
            inst(OP_JUMP, &[1]),
        ]);
        let (mut interp, _world, _mixer, _stage) = build(vec![lines]);

        interp.queue_script(0, 0);
        assert!(!interp.tick());

        // forcibly parked, not crashed and not terminated
        assert_eq!(interp.state(), ProcessorState::Suspended);
    }

    #[test]
    fn test_change_scene_reports_exit_and_index() {
        let lines = script(&[
            inst(OP_CHANGE_SCENE, &[4, 1]),
            inst(OP_RETURN, &[]),
        ]);
        let (mut interp, _world, _mixer, _stage) = build(vec![lines]);

        interp.queue_script(0, 0);
        assert!(interp.tick());
        assert_eq!(interp.take_delayed_scene(), Some(4));
        assert_eq!(interp.take_delayed_scene(), None);
        // execution parked past the change-scene line
        assert_eq!(interp.current_line(), 1);
    }

    #[test]
    fn test_exit_preserves_queue_and_current() {
        let quitter = script(&[inst(OP_QUIT, &[])]);
        let follower = flag_script(3);
        let (mut interp, _world, _mixer, stage) = build(vec![quitter, follower]);

        interp.queue_script(0, 0);
        interp.queue_script(1, 0);

        assert!(interp.tick());
        assert_eq!(interp.current_script(), Some(0));
        assert_eq!(interp.queue_len(), 1);
        assert_eq!(stage.state.borrow().calls, vec!["quit".to_string()]);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let lines = script(&[
            inst(OP_DELAY, &[10, 0]),
            inst(OP_RETURN, &[]),
        ]);
        let (mut interp, _world, _mixer, _stage) = build(vec![lines, flag_script(1)]);

        interp.queue_script(0, 0);
        interp.queue_script(1, 0);
        interp.tick();
        assert_eq!(interp.state(), ProcessorState::Suspended);

        interp.reset();
        assert_eq!(interp.state(), ProcessorState::Idle);
        assert_eq!(interp.queue_len(), 0);
        assert!(interp.store.is_empty());
        assert!(!interp.tick());
    }

    #[test]
    fn test_queue_request_for_missing_script_is_dropped() {
        let (mut interp, _world, _mixer, _stage) = build(vec![flag_script(1)]);
        interp.queue_script(99, 0);
        assert_eq!(interp.state(), ProcessorState::Idle);
        assert_eq!(interp.queue_len(), 0);
    }

    #[test]
    fn test_is_queued() {
        let (mut interp, _world, _mixer, _stage) =
            build(vec![flag_script(1), flag_script(2), flag_script(3)]);
        interp.queue_script(0, 0);
        interp.queue_script(2, 0);
        assert!(interp.is_queued(2));
        assert!(!interp.is_queued(1));
        // the current script is not "queued"
        assert!(!interp.is_queued(0));
    }

    #[test]
    fn test_global_word_operand_resolution() {
        // the flag number comes out of the variable table
        let mut line = inst(OP_SET_WORLD_FLAG, &[3]);
        line.operands[0].kind = OperandKind::GlobalWord;
        let lines = script(&[line, inst(OP_RETURN, &[])]);
        let (mut interp, world, _mixer, _stage) = build(vec![lines]);

        interp.globals.set_word(3, 77).unwrap();
        interp.queue_script(0, 0);
        interp.tick();

        assert!(world.state.borrow().flags.contains(&77));
    }

    #[test]
    fn test_operand_write_through_to_global() {
        // the delay's elapsed counter lives in the variable table
        let mut line = inst(OP_DELAY, &[2, 0]);
        line.operands[1].kind = OperandKind::GlobalWord;
        // W[4] holds the elapsed count
        line.operands[1].raw = 4;
        let lines = script(&[line, inst(OP_RETURN, &[])]);
        let (mut interp, _world, _mixer, _stage) = build(vec![lines]);

        interp.queue_script(0, 0);
        interp.tick();
        assert_eq!(interp.globals.word(4).unwrap(), 1);
        // the slot itself still holds the variable index
        assert_eq!(interp.store.scripts[0].lines[0].operands[1].raw, 4);

        interp.tick();
        assert_eq!(interp.globals.word(4).unwrap(), 2);
    }

    #[test]
    fn test_play_animation_wait_pattern() {
        let lines = script(&[
            inst(OP_PLAY_ANIMATION, &[6, 1, 0]),
            inst(OP_RETURN, &[]),
        ]);
        let (mut interp, world, _mixer, _stage) = build(vec![lines]);

        world.state.borrow_mut().animation_answers.extend([true]);
        interp.queue_script(0, 0);

        interp.tick();
        assert_eq!(interp.state(), ProcessorState::Suspended);
        assert_eq!(world.state.borrow().animations_started, vec![(6, 0)]);

        interp.tick(); // still running
        assert_eq!(interp.state(), ProcessorState::Suspended);

        interp.tick(); // finished
        assert_eq!(interp.state(), ProcessorState::Idle);
        assert_eq!(interp.store.scripts[0].lines[0].phase, WaitPhase::Idle);
        // the animation was started exactly once
        assert_eq!(world.state.borrow().animations_started.len(), 1);
    }

    #[test]
    fn test_enable_object_staged_reveal() {
        let lines = script(&[
            inst(OP_ENABLE_OBJECT, &[8, 2]),
            inst(OP_RETURN, &[]),
        ]);
        let (mut interp, world, _mixer, _stage) = build(vec![lines]);

        interp.queue_script(0, 0);
        let mut ticks = 0;
        while interp.state() == ProcessorState::Suspended || ticks == 0 {
            interp.tick();
            ticks += 1;
            assert!(ticks < 20, "staged reveal never finished");
        }

        assert_eq!(world.state.borrow().objects_enabled, vec![8]);
        // counter reset for the next run of this script
        assert_eq!(interp.store.scripts[0].counter, 0);
        assert!(!world.state.borrow().object_stages.is_empty());
    }
}
