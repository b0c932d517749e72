//! Collaborator traits the opcode handlers reach the engine through.
//!
//! The interpreter core never touches actors, objects, sound, or the
//! screen directly; it is constructed with one implementation of each of
//! these traits. All calls are synchronous and their effects are visible
//! within the same tick. The Null implementations at the bottom log at
//! debug level and answer with inert defaults, so the binary and the
//! integration tests can run without an engine attached.

use log::debug;
use std::collections::{HashMap, HashSet};

/// Game-world state: flags, actors, objects, and scene motion
pub trait WorldModel {
    // flags
    fn flag(&self, flag: i32) -> bool;
    fn set_flag(&mut self, flag: i32, on: bool);
    fn toggle_flag(&mut self, flag: i32);

    // actors
    fn player_index(&self) -> i32;
    fn actor_position(&self, actor: i32) -> (i32, i32);
    fn set_actor_position(&mut self, actor: i32, x: i32, y: i32, direction: i32);
    fn show_actor(&mut self, actor: i32);
    fn hide_actor(&mut self, actor: i32);
    fn enable_actor(&mut self, actor: i32);
    fn disable_actor(&mut self, actor: i32);
    fn set_actor_status(&mut self, actor: i32, status: i32);
    fn actor_face_object(&mut self, actor: i32, object: i32);

    // objects
    fn object_frame(&self, object: i32) -> i32;
    fn object_frame_count(&self, object: i32) -> i32;
    fn set_object_frame(&mut self, object: i32, frame: i32);
    fn enable_object(&mut self, object: i32);
    fn disable_object(&mut self, object: i32);
    fn remove_object(&mut self, object: i32);
    /// Build-up stage used by the staged-reveal opcode (0 = fully shown)
    fn set_object_stage(&mut self, object: i32, stage: i32);
    fn start_animation(&mut self, object: i32, mode: i32);
    fn animation_running(&self, object: i32) -> bool;

    // scene motion
    fn set_scene_origin(&mut self, x: i32, y: i32);
    fn begin_scene_scroll(&mut self, x: i32, y: i32, speed: i32);
    fn scene_scrolling(&self) -> bool;
}

/// Sound and music playback
pub trait Mixer {
    fn play_sound(&mut self, resource: i32, looping: bool, volume: i32);
    fn stop_sound(&mut self, resource: i32);
    fn is_playing(&self, resource: i32) -> bool;
    fn stop_object_sounds(&mut self, object: i32);
    fn change_music(&mut self, resource: i32, fade: bool);
    fn stop_music(&mut self);
    fn set_volume(&mut self, resource: i32, volume: i32);
}

/// Cursor, palette, and screen control
pub trait Stage {
    fn show_cursor(&mut self);
    fn hide_cursor(&mut self);
    fn clear_screen(&mut self);
    fn set_palette(&mut self, palette: i32);
    fn palette_fade(&mut self, start: i32, step: i32, count: i32);
    fn grey_palette(&mut self);
    fn update_palette(&mut self, step: i32);
    fn quit(&mut self);
}

/// Headless world: remembers flags and actor positions so scripted logic
/// is observable, defaults everything else.
#[derive(Default)]
pub struct NullWorld {
    flags: HashSet<i32>,
    actor_positions: HashMap<i32, (i32, i32)>,
}

impl NullWorld {
    pub fn new() -> Self {
        NullWorld::default()
    }
}

impl WorldModel for NullWorld {
    fn flag(&self, flag: i32) -> bool {
        self.flags.contains(&flag)
    }

    fn set_flag(&mut self, flag: i32, on: bool) {
        debug!("world: flag {} <- {}", flag, on);
        if on {
            self.flags.insert(flag);
        } else {
            self.flags.remove(&flag);
        }
    }

    fn toggle_flag(&mut self, flag: i32) {
        let on = !self.flag(flag);
        self.set_flag(flag, on);
    }

    fn player_index(&self) -> i32 {
        0
    }

    fn actor_position(&self, actor: i32) -> (i32, i32) {
        self.actor_positions.get(&actor).copied().unwrap_or((0, 0))
    }

    fn set_actor_position(&mut self, actor: i32, x: i32, y: i32, direction: i32) {
        debug!(
            "world: actor {} -> ({}, {}) facing {}",
            actor, x, y, direction
        );
        self.actor_positions.insert(actor, (x, y));
    }

    fn show_actor(&mut self, actor: i32) {
        debug!("world: show actor {}", actor);
    }

    fn hide_actor(&mut self, actor: i32) {
        debug!("world: hide actor {}", actor);
    }

    fn enable_actor(&mut self, actor: i32) {
        debug!("world: enable actor {}", actor);
    }

    fn disable_actor(&mut self, actor: i32) {
        debug!("world: disable actor {}", actor);
    }

    fn set_actor_status(&mut self, actor: i32, status: i32) {
        debug!("world: actor {} status {}", actor, status);
    }

    fn actor_face_object(&mut self, actor: i32, object: i32) {
        debug!("world: actor {} faces object {}", actor, object);
    }

    fn object_frame(&self, _object: i32) -> i32 {
        0
    }

    fn object_frame_count(&self, _object: i32) -> i32 {
        1
    }

    fn set_object_frame(&mut self, object: i32, frame: i32) {
        debug!("world: object {} frame {}", object, frame);
    }

    fn enable_object(&mut self, object: i32) {
        debug!("world: enable object {}", object);
    }

    fn disable_object(&mut self, object: i32) {
        debug!("world: disable object {}", object);
    }

    fn remove_object(&mut self, object: i32) {
        debug!("world: remove object {}", object);
    }

    fn set_object_stage(&mut self, object: i32, stage: i32) {
        debug!("world: object {} stage {}", object, stage);
    }

    fn start_animation(&mut self, object: i32, mode: i32) {
        debug!("world: animate object {} mode {}", object, mode);
    }

    fn animation_running(&self, _object: i32) -> bool {
        false
    }

    fn set_scene_origin(&mut self, x: i32, y: i32) {
        debug!("world: scene origin ({}, {})", x, y);
    }

    fn begin_scene_scroll(&mut self, x: i32, y: i32, speed: i32) {
        debug!("world: scroll to ({}, {}) speed {}", x, y, speed);
    }

    fn scene_scrolling(&self) -> bool {
        false
    }
}

/// Headless mixer: logs requests; nothing is ever playing
#[derive(Default)]
pub struct NullMixer;

impl NullMixer {
    pub fn new() -> Self {
        NullMixer
    }
}

impl Mixer for NullMixer {
    fn play_sound(&mut self, resource: i32, looping: bool, volume: i32) {
        debug!(
            "mixer: play {} looping={} volume={}",
            resource, looping, volume
        );
    }

    fn stop_sound(&mut self, resource: i32) {
        debug!("mixer: stop {}", resource);
    }

    fn is_playing(&self, _resource: i32) -> bool {
        false
    }

    fn stop_object_sounds(&mut self, object: i32) {
        debug!("mixer: stop sounds of object {}", object);
    }

    fn change_music(&mut self, resource: i32, fade: bool) {
        debug!("mixer: music {} fade={}", resource, fade);
    }

    fn stop_music(&mut self) {
        debug!("mixer: stop music");
    }

    fn set_volume(&mut self, resource: i32, volume: i32) {
        debug!("mixer: volume of {} <- {}", resource, volume);
    }
}

/// Headless stage: logs requests
#[derive(Default)]
pub struct NullStage;

impl NullStage {
    pub fn new() -> Self {
        NullStage
    }
}

impl Stage for NullStage {
    fn show_cursor(&mut self) {
        debug!("stage: show cursor");
    }

    fn hide_cursor(&mut self) {
        debug!("stage: hide cursor");
    }

    fn clear_screen(&mut self) {
        debug!("stage: clear screen");
    }

    fn set_palette(&mut self, palette: i32) {
        debug!("stage: palette {}", palette);
    }

    fn palette_fade(&mut self, start: i32, step: i32, count: i32) {
        debug!("stage: fade start={} step={} count={}", start, step, count);
    }

    fn grey_palette(&mut self) {
        debug!("stage: grey palette");
    }

    fn update_palette(&mut self, step: i32) {
        debug!("stage: fade step {}", step);
    }

    fn quit(&mut self) {
        debug!("stage: quit requested");
    }
}
