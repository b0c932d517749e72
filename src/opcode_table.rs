use crate::script::ScriptError;

/// Number of opcodes the table covers; anything at or past this is an
/// InvalidOpcode at execution time
pub const OPCODE_TABLE_SIZE: usize = 0x36;

/// Opcodes strictly below this (and above Return) are the Boolean
/// condition family: when skipped inside an unmet condition they deepen
/// the skip instead of executing.
pub const COND_OPCODE_LIMIT: u32 = 0x07;

/// The terminal/return opcode (also the zero-fill padding value)
pub const OPCODE_RETURN: u32 = 0x00;

/// The designated no-op landing opcode for jump targets
pub const OPCODE_ANCHOR: u32 = 0x10;

/// Dispatch tags, one per table slot. The interpreter matches on these;
/// the numeric opcode is only used for table lookup and the
/// classification predicates below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeKind {
    Return,
    IfWorldFlag,
    IfActorAt,
    IfSoundPlaying,
    IfRandom,
    IfScratch,
    IfObjectFrame,
    EndIf,
    Jump,
    SetWorldFlag,
    ClearWorldFlag,
    ToggleWorldFlag,
    JumpIfWorldFlag,
    HideCursor,
    ShowCursor,
    PlayAnimation,
    Anchor,
    MoveScene,
    HideActor,
    ShowActor,
    SetActorPosition,
    DisableActor,
    EnableActor,
    EnableObject,
    DisableObject,
    RemoveObject,
    ResetAnimation,
    SetObjectFrame,
    WaitObjectFrame,
    WaitAnimationEnd,
    PlaySound,
    PlaySoundAndWait,
    StopSound,
    StopObjectSounds,
    ChangeMusic,
    StopMusic,
    SetVolume,
    JumpIfSoundPlaying,
    Delay,
    PaletteFade,
    FadeToGrey,
    SetPalette,
    ClearScreen,
    ChangeScene,
    Quit,
    JumpIfActor,
    SetScratch,
    JumpIfScratch,
    HoldQueue,
    ReleaseQueue,
    QueueScript,
    ActorFaceObject,
    ChangeActorStatus,
    JumpRandom,
}

/// One table slot: dispatch tag, mnemonic, and declared operand count
#[derive(Debug, Clone, Copy)]
pub struct OpcodeEntry {
    pub kind: OpcodeKind,
    pub name: &'static str,
    pub arity: u8,
}

/// The opcode dispatch table. Built once at interpreter construction and
/// immutable afterwards; lookup is a plain index so it can run on every
/// fetch.
pub struct OpcodeTable {
    entries: Vec<OpcodeEntry>,
}

macro_rules! add_opcode {
    ($entries:expr, $kind:ident, $name:expr, $arity:expr) => {
        $entries.push(OpcodeEntry {
            kind: OpcodeKind::$kind,
            name: $name,
            arity: $arity,
        });
    };
}

impl OpcodeTable {
    pub fn new() -> Self {
        let mut e = Vec::with_capacity(OPCODE_TABLE_SIZE);

        // 0x00-0x08: control flow and the condition family
        add_opcode!(e, Return, "return", 0);
        add_opcode!(e, IfWorldFlag, "if_world_flag", 2);
        add_opcode!(e, IfActorAt, "if_actor_at", 3);
        add_opcode!(e, IfSoundPlaying, "if_sound_playing", 2);
        add_opcode!(e, IfRandom, "if_random", 2);
        add_opcode!(e, IfScratch, "if_scratch", 3);
        add_opcode!(e, IfObjectFrame, "if_object_frame", 3);
        add_opcode!(e, EndIf, "end_if", 0);
        add_opcode!(e, Jump, "jump", 1);

        // 0x09-0x0C: world flags
        add_opcode!(e, SetWorldFlag, "set_world_flag", 1);
        add_opcode!(e, ClearWorldFlag, "clear_world_flag", 1);
        add_opcode!(e, ToggleWorldFlag, "toggle_world_flag", 1);
        add_opcode!(e, JumpIfWorldFlag, "jump_if_world_flag", 3);

        // 0x0D-0x11: cursor, animation, landing pad, scene motion
        add_opcode!(e, HideCursor, "hide_cursor", 0);
        add_opcode!(e, ShowCursor, "show_cursor", 0);
        add_opcode!(e, PlayAnimation, "play_animation", 3);
        add_opcode!(e, Anchor, "anchor", 0);
        add_opcode!(e, MoveScene, "move_scene", 3);

        // 0x12-0x16: actors
        add_opcode!(e, HideActor, "hide_actor", 1);
        add_opcode!(e, ShowActor, "show_actor", 1);
        add_opcode!(e, SetActorPosition, "set_actor_position", 4);
        add_opcode!(e, DisableActor, "disable_actor", 1);
        add_opcode!(e, EnableActor, "enable_actor", 1);

        // 0x17-0x1D: objects and the frame waits
        add_opcode!(e, EnableObject, "enable_object", 2);
        add_opcode!(e, DisableObject, "disable_object", 1);
        add_opcode!(e, RemoveObject, "remove_object", 1);
        add_opcode!(e, ResetAnimation, "reset_animation", 1);
        add_opcode!(e, SetObjectFrame, "set_object_frame", 3);
        add_opcode!(e, WaitObjectFrame, "wait_object_frame", 2);
        add_opcode!(e, WaitAnimationEnd, "wait_animation_end", 1);

        // 0x1E-0x25: sound and music
        add_opcode!(e, PlaySound, "play_sound", 3);
        add_opcode!(e, PlaySoundAndWait, "play_sound_and_wait", 3);
        add_opcode!(e, StopSound, "stop_sound", 1);
        add_opcode!(e, StopObjectSounds, "stop_object_sounds", 1);
        add_opcode!(e, ChangeMusic, "change_music", 2);
        add_opcode!(e, StopMusic, "stop_music", 0);
        add_opcode!(e, SetVolume, "set_volume", 2);
        add_opcode!(e, JumpIfSoundPlaying, "jump_if_sound_playing", 3);

        // 0x26-0x2C: timing, palette, screen, scene exit
        add_opcode!(e, Delay, "delay", 2);
        add_opcode!(e, PaletteFade, "palette_fade", 3);
        add_opcode!(e, FadeToGrey, "fade_to_grey", 1);
        add_opcode!(e, SetPalette, "set_palette", 1);
        add_opcode!(e, ClearScreen, "clear_screen", 1);
        add_opcode!(e, ChangeScene, "change_scene", 2);
        add_opcode!(e, Quit, "quit", 0);

        // 0x2D-0x35: queue, context, scratch cells, actor extras
        add_opcode!(e, JumpIfActor, "jump_if_actor", 2);
        add_opcode!(e, SetScratch, "set_scratch", 3);
        add_opcode!(e, JumpIfScratch, "jump_if_scratch", 4);
        add_opcode!(e, HoldQueue, "hold_queue", 0);
        add_opcode!(e, ReleaseQueue, "release_queue", 0);
        add_opcode!(e, QueueScript, "queue_script", 2);
        add_opcode!(e, ActorFaceObject, "actor_face_object", 2);
        add_opcode!(e, ChangeActorStatus, "change_actor_status", 2);
        add_opcode!(e, JumpRandom, "jump_random", 3);

        debug_assert_eq!(e.len(), OPCODE_TABLE_SIZE);
        OpcodeTable { entries: e }
    }

    /// O(1) lookup by opcode number. Out-of-table opcodes are the
    /// recoverable InvalidOpcode case; callers abort the script, not the
    /// process.
    pub fn lookup(&self, opcode: u32, script: usize, line: usize) -> Result<OpcodeEntry, ScriptError> {
        self.entries
            .get(opcode as usize)
            .copied()
            .ok_or(ScriptError::InvalidOpcode {
                opcode,
                script,
                line,
            })
    }

    /// Mnemonic for an opcode, if it is in the table
    pub fn name(&self, opcode: u32) -> Option<&'static str> {
        self.entries.get(opcode as usize).map(|e| e.name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for OpcodeTable {
    fn default() -> Self {
        OpcodeTable::new()
    }
}

/// Boolean condition family membership (see COND_OPCODE_LIMIT)
pub fn is_condition_opcode(opcode: u32) -> bool {
    opcode > OPCODE_RETURN && opcode < COND_OPCODE_LIMIT
}

/// Opcodes that execute even while a condition skip is active: the
/// unconditional return/jump family and the skip terminator itself.
pub fn always_executes(opcode: u32) -> bool {
    matches!(opcode, 0x00 | 0x07 | 0x08)
}

/// A jump may only land on the designated no-op opcode or on opcode 0;
/// anything else terminates the jumping script instead.
pub fn is_safe_jump_target(opcode: u32) -> bool {
    opcode == OPCODE_RETURN || opcode == OPCODE_ANCHOR
}
